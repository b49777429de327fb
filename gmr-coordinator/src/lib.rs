//! GridMR coordinator.
//!
//! Accepts map/reduce jobs over HTTP, splits their input, dispatches map and
//! reduce tasks to worker pools picked by live load, and keeps every job's
//! state and result in memory.

pub mod api;
pub mod args;
pub mod config;
pub mod core;
pub mod dispatcher;
pub mod error;
pub mod jobs;
pub mod orchestrator;
pub mod shuffle;
pub mod splitter;
pub mod transport;
pub mod worker_info;
pub mod worker_registry;

pub use crate::config::CoordinatorConfig;
pub use crate::core::Coordinator;
