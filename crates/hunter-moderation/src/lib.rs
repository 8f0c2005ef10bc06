//! Moderation gateway.
//!
//! Screens text through an external moderation service while enforcing a
//! global request-rate ceiling and caching verdicts by content hash.

pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod types;

pub use client::{Classifier, ModerationClient};
pub use config::ModerationConfig;
pub use error::{ModerationError, ModerationResult};
pub use gateway::{cache_key, GatewayStats, ModerationGateway};
pub use types::{ModerationEntry, ModerationRequest, ModerationResponse};
