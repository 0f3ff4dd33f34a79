#![forbid(unsafe_code)]
//! sleepmerge-exec: history store protocol, run orchestration and publishing.
//!
//! A run is strictly sequential: convert → merge into the store → publish.
//! Nothing here spawns threads or retries a stage.

pub mod failpoints;
pub mod metrics;
pub mod publish;
pub mod runtime;
pub mod store;

pub use publish::{publisher_from_config, Publisher, PublishError};
pub use runtime::{Engine, ExecError};
pub use store::{HistoryStore, StoreOutcome};
