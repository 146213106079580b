//! # Core Runtime
//!
//! Shared infrastructure under the playback controller: the tracing setup,
//! the fail-fast bridge configuration, and the lifecycle event bus.
//!
//! Hosts assemble a [`config::CoreConfig`] once, hand it to `core-playback`,
//! and subscribe to [`events::EventBus`] for the moments worth showing a
//! user. Everything here is host-agnostic; platform specifics stay behind
//! the `bridge-traits` contracts.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
