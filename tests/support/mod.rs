//! Shared utilities for behavioural tests.

pub mod runtime;
