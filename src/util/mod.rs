//! Shared utilities

pub mod config;
pub mod env;
pub mod process;

pub use config::{Config, Settings};
pub use env::EnvironmentMap;
