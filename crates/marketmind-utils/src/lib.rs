//! Shared utilities for marketmind
//!
//! This crate provides the pieces every marketmind binary and library needs
//! but that carry no market semantics: tracing setup and environment lookups.

pub mod env;
pub mod logging;

pub use env::{env_flag, env_var};
pub use logging::{init_tracing, init_tracing_with};
