//! Bridge between host tooling and the locally-installed costa CLI agent.
//!
//! The CLI owns authentication and usage accounting for the remote service;
//! this crate invokes it as a JSON-producing subprocess and layers two
//! supervisors on top: a usage stream that polls `status` and fans snapshots
//! out to subscribers, and a one-shot login watch that polls until a started
//! login completes. Nothing here blocks the caller's thread, and no timer or
//! subprocess outlives a disconnect.

pub mod bridge;
pub mod config;
pub mod login_flow;
pub mod sched;
pub mod usage_stream;

pub use bridge::CostaCli;
