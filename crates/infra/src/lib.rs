//! Infrastructure layer: persistence, services, event pipeline, config.

pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod services;
pub mod store;

pub use config::EngineConfig;
pub use engine::{RemanejamentoEngine, Stores};
pub use error::{EngineError, EngineResult};

#[cfg(test)]
mod integration_tests;
