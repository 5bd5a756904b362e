//! Shared types, error taxonomy, and configuration for the Contex routing
//! engine crates.

pub mod config;
pub mod error;
pub mod hash;
pub mod types;
pub mod value;

pub use config::{AppConfig, EngineConfig};
pub use error::{ContexError, ContexResult};
pub use types::*;
pub use value::NormalizedValue;
