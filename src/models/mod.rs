//! Data models for the message channel, environments, context and local config.

pub mod context;
pub mod envelope;
pub mod environment;
pub mod local_config;

pub use context::*;
pub use envelope::*;
pub use environment::*;
pub use local_config::*;
