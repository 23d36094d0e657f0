//! Vanity search coordination.
//!
//! This module provides:
//! - Multi-threaded CPU workers racing on the same query
//! - The single-flight coordinator and its `Idle -> Running -> terminal` state machine
//! - Throttled progress events and cooperative cancellation

mod coordinator;
mod cpu;
mod state;

pub use coordinator::{CancelToken, SearchCoordinator, SearchHandle, SearchOptions};
pub use crossbeam_channel::RecvTimeoutError;
pub use state::{SearchEvent, SearchState, SearchStatus};
