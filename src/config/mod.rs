//! Configuration loading and models
//!
//! The YAML surface is a single `llm` map: `use` names the enabled
//! families, and each family name maps to one key entry or a sequence of
//! them. An environment fallback can stand in for the file.

pub mod loader;
pub mod models;

pub use models::{ClientConfig, ProviderEntry};
