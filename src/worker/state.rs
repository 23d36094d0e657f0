//! Search state machine types.

use std::fmt;

use crate::crypto::Keypair;
use crate::error::KeygenError;

/// Lifecycle of one search: `Idle -> Running -> {Found, Cancelled, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchStatus {
    /// No search has been started (or results were cleared)
    #[default]
    Idle,
    /// Workers are generating and testing keys
    Running,
    /// A matching keypair was found
    Found,
    /// Cancellation was requested and observed
    Cancelled,
    /// Key generation failed; the search was abandoned
    Failed,
}

impl SearchStatus {
    /// Returns true for states a search never leaves.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SearchStatus::Found | SearchStatus::Cancelled | SearchStatus::Failed
        )
    }
}

impl fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchStatus::Idle => write!(f, "idle"),
            SearchStatus::Running => write!(f, "running"),
            SearchStatus::Found => write!(f, "found"),
            SearchStatus::Cancelled => write!(f, "cancelled"),
            SearchStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Snapshot of a search.
///
/// `result` is `Some` exactly when `status` is `Found`, and `error` exactly
/// when it is `Failed`. `progress` is a display hint only: it never decides
/// termination.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchState {
    pub status: SearchStatus,
    /// Keys generated so far, summed over all workers
    pub attempts: u64,
    /// Coarse liveness indicator in `0..=100`
    pub progress: u8,
    pub result: Option<Keypair>,
    pub error: Option<KeygenError>,
}

impl SearchState {
    /// State of a freshly started search.
    pub(crate) fn running() -> Self {
        Self {
            status: SearchStatus::Running,
            ..Self::default()
        }
    }
}

/// Notification emitted by a running search.
///
/// A search emits zero or more `Progress` events followed by exactly one
/// terminal event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
    Progress { attempts: u64, progress: u8 },
    Found { keypair: Keypair, attempts: u64 },
    Cancelled { attempts: u64 },
    Failed { error: KeygenError, attempts: u64 },
}

impl SearchEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SearchEvent::Progress { .. })
    }
}

/// Maps an attempt count to a 0-99 liveness figure.
///
/// The value is the probability (in percent) that a search of this
/// difficulty would already have succeeded, so it climbs quickly at first and
/// flattens out. It is capped below 100; only `Found` reports 100.
pub(crate) fn progress_for(attempts: u64, expected_attempts: f64) -> u8 {
    if attempts == 0 || expected_attempts <= 0.0 {
        return 0;
    }
    let probability = 1.0 - (-(attempts as f64) / expected_attempts).exp();
    (probability * 100.0).floor().clamp(0.0, 99.0) as u8
}
