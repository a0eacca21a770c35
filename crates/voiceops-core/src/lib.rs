pub mod audit;
pub mod collaborators;
pub mod config;
pub mod connectors;
pub mod context;
pub mod elapsed;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod pending;
pub mod pipeline;
pub mod plan;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Result, VoiceOpsError};
