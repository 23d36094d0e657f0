//! CPU-based worker for vanity address search.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use tracing::debug;

use crate::crypto::Keypair;
use crate::error::KeygenError;
use crate::matcher::SearchQuery;

/// Attempts a worker accumulates locally before publishing them.
pub(crate) const FLUSH_INTERVAL: u64 = 64;

/// Why a worker left its loop.
#[derive(Debug)]
pub(crate) enum WorkerExit {
    /// This worker generated a matching keypair
    Matched(Keypair),
    /// The stop flag was raised (cancel, or another worker finished the search)
    Stopped,
    /// The entropy source failed
    Failed(KeygenError),
}

/// Sent once by each worker when it exits.
#[derive(Debug)]
pub(crate) struct WorkerReport {
    pub worker_id: usize,
    pub exit: WorkerExit,
}

/// A CPU worker that generates and tests keypairs.
pub(crate) struct CpuWorker {
    /// Worker ID
    id: usize,
    /// The constraint to match against
    query: SearchQuery,
    /// Channel for the exit report
    report_tx: Sender<WorkerReport>,
    /// Shared stop flag
    stop_flag: Arc<AtomicBool>,
    /// Shared attempt counter
    attempts: Arc<AtomicU64>,
}

impl CpuWorker {
    pub(crate) fn new(
        id: usize,
        query: SearchQuery,
        report_tx: Sender<WorkerReport>,
        stop_flag: Arc<AtomicBool>,
        attempts: Arc<AtomicU64>,
    ) -> Self {
        Self {
            id,
            query,
            report_tx,
            stop_flag,
            attempts,
        }
    }

    /// Runs the worker loop and reports how it ended.
    ///
    /// Each iteration generates one keypair, counts it, tests it, and only
    /// then looks at the stop flag. A worker therefore finishes at most one
    /// iteration after the flag is raised, and a match found in that
    /// iteration is still reported.
    pub(crate) fn run(&self) {
        let exit = self.search();
        debug!(worker = self.id, exit = exit_kind(&exit), "worker finished");

        // The coordinator may already be gone if its handle was dropped.
        let _ = self.report_tx.send(WorkerReport {
            worker_id: self.id,
            exit,
        });
    }

    fn search(&self) -> WorkerExit {
        let mut pending = 0u64;

        let exit = loop {
            let keypair = match Keypair::generate() {
                Ok(keypair) => keypair,
                Err(e) => break WorkerExit::Failed(e),
            };
            pending += 1;

            if self.query.matches(keypair.address()) {
                break WorkerExit::Matched(keypair);
            }

            if self.stop_flag.load(Ordering::Relaxed) {
                break WorkerExit::Stopped;
            }

            if pending == FLUSH_INTERVAL {
                self.attempts.fetch_add(pending, Ordering::Relaxed);
                pending = 0;
            }
        };

        self.attempts.fetch_add(pending, Ordering::Relaxed);
        exit
    }
}

fn exit_kind(exit: &WorkerExit) -> &'static str {
    match exit {
        WorkerExit::Matched(_) => "matched",
        WorkerExit::Stopped => "stopped",
        WorkerExit::Failed(_) => "failed",
    }
}

#[cfg(test)]
mod tests {
    use crossbeam_channel::unbounded;

    use super::*;

    fn spawn_worker(query: SearchQuery, stop_flag: Arc<AtomicBool>) -> (Arc<AtomicU64>, WorkerReport) {
        let (tx, rx) = unbounded();
        let attempts = Arc::new(AtomicU64::new(0));
        let worker = CpuWorker::new(7, query, tx, stop_flag, attempts.clone());
        let handle = std::thread::spawn(move || worker.run());
        let report = rx.recv().unwrap();
        handle.join().unwrap();
        (attempts, report)
    }

    #[test]
    fn test_worker_reports_match() {
        let query = SearchQuery::new(Some("f"), None, false).unwrap();
        let (attempts, report) = spawn_worker(query.clone(), Arc::new(AtomicBool::new(false)));

        assert_eq!(report.worker_id, 7);
        match report.exit {
            WorkerExit::Matched(keypair) => assert!(query.matches(keypair.address())),
            other => panic!("unexpected exit: {:?}", other),
        }
        assert!(attempts.load(Ordering::Relaxed) >= 1);
    }

    #[test]
    fn test_worker_stops_after_one_iteration_when_flagged() {
        let query = SearchQuery::new(None, Some("0123456789abcdef"), false).unwrap();
        let (attempts, report) = spawn_worker(query, Arc::new(AtomicBool::new(true)));

        assert!(matches!(report.exit, WorkerExit::Stopped));
        assert_eq!(attempts.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_unconstrained_matches_first_key() {
        let (attempts, report) = spawn_worker(SearchQuery::any(), Arc::new(AtomicBool::new(true)));
        assert!(matches!(report.exit, WorkerExit::Matched(_)));
        assert_eq!(attempts.load(Ordering::Relaxed), 1);
    }
}
