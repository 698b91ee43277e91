//! Configuration module for the payment gateway.
//!
//! Handles loading and validating gateway configuration from TOML files,
//! and loading secret material from owner-only files or the environment.

mod secrets;
mod settings;

pub use secrets::*;
pub use settings::*;
