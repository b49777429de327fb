//! Reference GridMR worker.
//!
//! Serves `POST /map_task`, `POST /reduce_task` and `GET /status`, and runs
//! the transforms registered in the `workload` crate.

pub mod args;
pub mod core;
pub mod map;
pub mod reduce;

pub use crate::core::{router, MRWorker};
