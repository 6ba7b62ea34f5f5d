//! Unit tests for configuration loading and derivation.
//!
//! - `helpers`: Shared test utilities
//! - `precedence`: Layer precedence tests
//! - `derivation`: API key resolution and component configuration tests
//! - `validation`: Configuration consistency validation tests

mod helpers;
mod precedence;
