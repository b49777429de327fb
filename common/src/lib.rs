//! Types shared by the GridMR coordinator, workers and client.
//!
//! Users submit raw text together with map and reduce logic descriptors;
//! the coordinator splits the text, fans the fragments out to map workers,
//! shuffles the intermediate values by key and fans them out again to
//! reduce workers. Everything here is plain data that travels over HTTP as
//! JSON, plus the stable key hash both sides of the shuffle agree on.

use std::hash::Hasher;

pub mod job;
pub mod protocol;

pub use job::{JobId, JobProgress, JobState};
pub use protocol::LogicDescriptor;

/////////////////////////////////////////////////////////////////////////////
// Shuffle hashing
/////////////////////////////////////////////////////////////////////////////

/// Hashes an intermediate key. Compute a reduce bucket for a given key
/// by calculating `ihash(key) % n_reduce`.
///
/// FNV with a fixed key, so the result never changes between runs.
pub fn ihash(key: &[u8]) -> u32 {
    let mut hasher = fnv::FnvHasher::with_key(0);
    hasher.write(key);
    (hasher.finish() & 0x7fff_ffff) as u32
}
