//! Search coordination: worker threads, first-match-wins, progress and cancellation.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::KeygenError;
use crate::matcher::SearchQuery;

use super::cpu::{CpuWorker, WorkerExit, WorkerReport};
use super::state::{progress_for, SearchEvent, SearchState, SearchStatus};

/// Tunables for a [`SearchCoordinator`].
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Number of worker threads racing on the same query
    pub workers: usize,
    /// Minimum spacing between progress events
    pub progress_interval: Duration,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            progress_interval: Duration::from_millis(250),
        }
    }
}

/// Requests cooperative cancellation of one search.
///
/// Cheap to clone; safe to trigger from any thread (e.g. a signal handler).
#[derive(Debug, Clone)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Asks the workers to stop at their next iteration boundary.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns true once the search has been asked to stop, for any reason.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// State shared between the workers, the monitor thread and the handle.
struct SearchRun {
    query: SearchQuery,
    expected_attempts: f64,
    stop_flag: Arc<AtomicBool>,
    attempts: Arc<AtomicU64>,
    started: Instant,
    inner: Mutex<RunInner>,
}

struct RunInner {
    state: SearchState,
    elapsed: Option<Duration>,
}

impl SearchRun {
    fn new(query: SearchQuery) -> Self {
        Self {
            expected_attempts: query.estimated_attempts(),
            query,
            stop_flag: Arc::new(AtomicBool::new(false)),
            attempts: Arc::new(AtomicU64::new(0)),
            started: Instant::now(),
            inner: Mutex::new(RunInner {
                state: SearchState::running(),
                elapsed: None,
            }),
        }
    }

    fn stop(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }

    fn status(&self) -> SearchStatus {
        self.inner.lock().state.status
    }

    fn snapshot(&self) -> SearchState {
        let inner = self.inner.lock();
        let mut state = inner.state.clone();
        if state.status == SearchStatus::Running {
            state.attempts = self.attempts.load(Ordering::Relaxed);
        }
        state
    }

    fn elapsed(&self) -> Duration {
        self.inner
            .lock()
            .elapsed
            .unwrap_or_else(|| self.started.elapsed())
    }

    /// Records a progress tick. Returns the event to emit, if attempts moved.
    fn tick(&self, last_attempts: &mut u64) -> Option<SearchEvent> {
        let attempts = self.attempts.load(Ordering::Relaxed);
        if attempts == *last_attempts {
            return None;
        }
        *last_attempts = attempts;

        let progress = progress_for(attempts, self.expected_attempts);
        let mut inner = self.inner.lock();
        if inner.state.status != SearchStatus::Running {
            return None;
        }
        inner.state.attempts = attempts;
        inner.state.progress = progress;
        Some(SearchEvent::Progress { attempts, progress })
    }

    /// Moves the run into its terminal state and returns the terminal event.
    fn finish(&self, decisive: Option<WorkerExit>) -> SearchEvent {
        let attempts = self.attempts.load(Ordering::Relaxed);
        let mut inner = self.inner.lock();
        inner.elapsed = Some(self.started.elapsed());

        let state = &mut inner.state;
        state.attempts = attempts;
        match decisive {
            Some(WorkerExit::Matched(keypair)) => {
                state.status = SearchStatus::Found;
                state.progress = 100;
                state.result = Some(keypair.clone());
                SearchEvent::Found { keypair, attempts }
            }
            Some(WorkerExit::Failed(error)) => {
                state.status = SearchStatus::Failed;
                state.progress = 0;
                state.error = Some(error.clone());
                SearchEvent::Failed { error, attempts }
            }
            Some(WorkerExit::Stopped) | None => {
                state.status = SearchStatus::Cancelled;
                state.progress = 0;
                SearchEvent::Cancelled { attempts }
            }
        }
    }
}

/// Runs at most one vanity search at a time and tracks its state.
///
/// Each [`start`](Self::start) spawns `workers` threads that independently
/// generate and test keys, plus a monitor thread that owns the state
/// transitions. The first worker to report a match wins; later matches are
/// discarded.
pub struct SearchCoordinator {
    options: SearchOptions,
    current: Mutex<Option<Arc<SearchRun>>>,
}

impl SearchCoordinator {
    /// Creates a coordinator in the `Idle` state.
    pub fn new(options: SearchOptions) -> Self {
        Self {
            options,
            current: Mutex::new(None),
        }
    }

    /// Returns the options searches are started with.
    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Starts a search for `query`.
    ///
    /// Fails with [`KeygenError::AlreadyRunning`] while a previous search is
    /// still in flight. Otherwise the previous state is replaced by a fresh
    /// `Running` state with zero attempts.
    pub fn start(&self, query: SearchQuery) -> Result<SearchHandle, KeygenError> {
        if self.options.workers == 0 {
            return Err(KeygenError::InvalidArgument(
                "search needs at least one worker".into(),
            ));
        }
        if self.options.progress_interval.is_zero() {
            return Err(KeygenError::InvalidArgument(
                "progress interval must be greater than zero".into(),
            ));
        }

        let mut current = self.current.lock();
        if let Some(run) = current.as_ref() {
            if run.status() == SearchStatus::Running {
                return Err(KeygenError::AlreadyRunning);
            }
        }

        let run = Arc::new(SearchRun::new(query));
        info!(
            query = %run.query,
            workers = self.options.workers,
            expected_attempts = run.expected_attempts,
            "search started"
        );

        let (report_tx, report_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();

        let workers = match spawn_workers(self.options.workers, &run, report_tx) {
            Ok(workers) => workers,
            Err(e) => {
                warn!(error = %e, "failed to start search");
                let _ = run.finish(Some(WorkerExit::Failed(e.clone())));
                *current = Some(run);
                return Err(e);
            }
        };

        let monitor = {
            let run = run.clone();
            let interval = self.options.progress_interval;
            thread::Builder::new()
                .name("vanity-monitor".into())
                .spawn(move || monitor(run, report_rx, event_tx, workers, interval))
        };
        let monitor = match monitor {
            Ok(handle) => handle,
            Err(e) => {
                // Workers exit on the stop flag; their reports go nowhere.
                run.stop();
                let e = KeygenError::ThreadSpawn(e.to_string());
                let _ = run.finish(Some(WorkerExit::Failed(e.clone())));
                *current = Some(run);
                return Err(e);
            }
        };

        *current = Some(run.clone());
        Ok(SearchHandle {
            run,
            events: event_rx,
            monitor: Some(monitor),
        })
    }

    /// Requests cancellation of the in-flight search, if any.
    pub fn cancel(&self) {
        if let Some(run) = self.current.lock().as_ref() {
            run.stop();
        }
    }

    /// Returns a snapshot of the latest search, or `Idle` if there is none.
    pub fn state(&self) -> SearchState {
        self.current
            .lock()
            .as_ref()
            .map(|run| run.snapshot())
            .unwrap_or_default()
    }

    /// Returns true while a search is in flight.
    pub fn is_running(&self) -> bool {
        self.current
            .lock()
            .as_ref()
            .map_or(false, |run| run.status() == SearchStatus::Running)
    }

    /// Discards the result of the last search and returns to `Idle`.
    pub fn clear(&self) -> Result<(), KeygenError> {
        let mut current = self.current.lock();
        if let Some(run) = current.as_ref() {
            if run.status() == SearchStatus::Running {
                return Err(KeygenError::AlreadyRunning);
            }
        }
        *current = None;
        Ok(())
    }
}

impl Default for SearchCoordinator {
    fn default() -> Self {
        Self::new(SearchOptions::default())
    }
}

/// The caller's end of one running search.
///
/// Dropping the handle cancels the search and waits for its threads.
pub struct SearchHandle {
    run: Arc<SearchRun>,
    events: Receiver<SearchEvent>,
    monitor: Option<JoinHandle<()>>,
}

impl SearchHandle {
    /// Requests cooperative cancellation. Returns immediately.
    ///
    /// The search may still finish as `Found` if a worker matched in the
    /// iteration during which the request arrived.
    pub fn cancel(&self) {
        self.run.stop();
    }

    /// Returns a token that can cancel this search from elsewhere.
    pub fn cancel_token(&self) -> CancelToken {
        CancelToken(self.run.stop_flag.clone())
    }

    /// Progress and terminal events, in emission order.
    pub fn events(&self) -> &Receiver<SearchEvent> {
        &self.events
    }

    /// Waits up to `timeout` for the next event.
    ///
    /// `Timeout` means the search is still going; `Disconnected` means the
    /// terminal event has already been delivered and nothing more will come.
    pub fn next_event(&self, timeout: Duration) -> Result<SearchEvent, RecvTimeoutError> {
        self.events.recv_timeout(timeout)
    }

    /// Returns a snapshot of the search state.
    pub fn state(&self) -> SearchState {
        self.run.snapshot()
    }

    pub fn query(&self) -> &SearchQuery {
        &self.run.query
    }

    /// Time since start, frozen once the search has finished.
    pub fn elapsed(&self) -> Duration {
        self.run.elapsed()
    }

    /// Average generation rate over the search so far.
    pub fn keys_per_second(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.state().attempts as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Blocks until the search reaches a terminal state and returns it.
    pub fn wait(mut self) -> SearchState {
        self.join();
        self.run.snapshot()
    }

    fn join(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            let _ = monitor.join();
        }
    }
}

impl Drop for SearchHandle {
    fn drop(&mut self) {
        if self.monitor.is_some() {
            self.cancel();
            self.join();
        }
    }
}

fn spawn_workers(
    num_workers: usize,
    run: &Arc<SearchRun>,
    report_tx: Sender<WorkerReport>,
) -> Result<Vec<JoinHandle<()>>, KeygenError> {
    let mut handles = Vec::with_capacity(num_workers);
    for id in 0..num_workers {
        let worker = CpuWorker::new(
            id,
            run.query.clone(),
            report_tx.clone(),
            run.stop_flag.clone(),
            run.attempts.clone(),
        );

        let spawned = thread::Builder::new()
            .name(format!("vanity-worker-{}", id))
            .spawn(move || worker.run());

        match spawned {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                run.stop();
                for handle in handles {
                    let _ = handle.join();
                }
                return Err(KeygenError::ThreadSpawn(e.to_string()));
            }
        }
    }
    Ok(handles)
}

/// Collects worker exits, emits throttled progress, and finalizes the run.
fn monitor(
    run: Arc<SearchRun>,
    reports: Receiver<WorkerReport>,
    events: Sender<SearchEvent>,
    workers: Vec<JoinHandle<()>>,
    interval: Duration,
) {
    let mut remaining = workers.len();
    let mut decisive: Option<WorkerExit> = None;
    let mut last_attempts = 0u64;
    let mut next_tick = Instant::now() + interval;

    while remaining > 0 {
        let wait = next_tick.saturating_duration_since(Instant::now());
        match reports.recv_timeout(wait) {
            Ok(report) => {
                remaining -= 1;
                match report.exit {
                    WorkerExit::Stopped => {}
                    exit if decisive.is_none() => {
                        debug!(worker = report.worker_id, "worker settled the search");
                        run.stop();
                        decisive = Some(exit);
                    }
                    _ => debug!(worker = report.worker_id, "discarding late result"),
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                next_tick = Instant::now() + interval;
                if let Some(event) = run.tick(&mut last_attempts) {
                    let _ = events.send(event);
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    for handle in workers {
        let _ = handle.join();
    }

    let event = run.finish(decisive);
    match &event {
        SearchEvent::Found { keypair, attempts } => info!(
            address = %keypair.address(),
            attempts,
            elapsed_ms = run.elapsed().as_millis() as u64,
            "search found a match"
        ),
        SearchEvent::Failed { error, attempts } => {
            warn!(error = %error, attempts, "search failed")
        }
        SearchEvent::Cancelled { attempts } => info!(attempts, "search cancelled"),
        SearchEvent::Progress { .. } => {}
    }
    let _ = events.send(event);
}

#[cfg(test)]
mod tests {
    use std::thread::sleep;

    use super::*;
    use crate::worker::cpu::FLUSH_INTERVAL;

    const IMPROBABLE_SUFFIX: &str = "0123456789";

    fn coordinator(workers: usize) -> SearchCoordinator {
        SearchCoordinator::new(SearchOptions {
            workers,
            progress_interval: Duration::from_millis(10),
        })
    }

    fn improbable() -> SearchQuery {
        SearchQuery::new(None, Some(IMPROBABLE_SUFFIX), false).unwrap()
    }

    #[test]
    fn test_search_finds_match() {
        let coordinator = coordinator(2);
        let query = SearchQuery::new(Some("0xa"), None, false).unwrap();
        let state = coordinator.start(query.clone()).unwrap().wait();

        assert_eq!(state.status, SearchStatus::Found);
        assert_eq!(state.progress, 100);
        assert!(state.attempts >= 1);
        assert!(state.error.is_none());
        let keypair = state.result.expect("found search carries a result");
        assert!(query.matches(keypair.address()));
        assert!(keypair.address().to_checksum().to_lowercase().starts_with("0xa"));
        assert_eq!(coordinator.state().status, SearchStatus::Found);
    }

    #[test]
    fn test_every_found_address_satisfies_query() {
        let coordinator = coordinator(1);
        for (i, hex) in "0123456789abcdef".chars().cycle().take(1000).enumerate() {
            let constraint = hex.to_string();
            let query = if i % 2 == 0 {
                SearchQuery::new(Some(&constraint), None, false)
            } else {
                SearchQuery::new(None, Some(&constraint), false)
            }
            .unwrap();

            let state = coordinator.start(query.clone()).unwrap().wait();
            assert_eq!(state.status, SearchStatus::Found);
            let keypair = state.result.unwrap();
            assert!(query.matches(keypair.address()));

            let text = keypair.address().to_checksum().to_lowercase();
            if i % 2 == 0 {
                assert!(text.starts_with(&format!("0x{}", constraint)));
            } else {
                assert!(text.ends_with(&constraint));
            }
        }
    }

    #[test]
    fn test_case_sensitive_prefix() {
        let coordinator = coordinator(2);
        for _ in 0..3 {
            let query = SearchQuery::new(Some("0xAB"), None, true).unwrap();
            let state = coordinator.start(query).unwrap().wait();
            let keypair = state.result.unwrap();
            assert!(keypair.address().to_checksum().starts_with("0xAB"));
        }
    }

    #[test]
    fn test_cancel_is_observed_within_bounded_iterations() {
        let workers = 2;
        let coordinator = coordinator(workers);
        let handle = coordinator.start(improbable()).unwrap();
        sleep(Duration::from_millis(100));

        handle.cancel();
        let at_cancel = handle.state().attempts;
        let state = handle.wait();

        assert_eq!(state.status, SearchStatus::Cancelled);
        assert_eq!(state.progress, 0);
        assert!(state.result.is_none());
        assert!(state.attempts >= at_cancel);
        // Unpublished attempts plus the iteration in flight, per worker.
        assert!(state.attempts - at_cancel <= workers as u64 * 2 * FLUSH_INTERVAL);
        assert!(!coordinator.is_running());
    }

    #[test]
    fn test_second_start_is_rejected_while_running() {
        let coordinator = coordinator(1);
        let handle = coordinator.start(improbable()).unwrap();
        assert!(coordinator.is_running());

        assert!(matches!(
            coordinator.start(SearchQuery::any()),
            Err(KeygenError::AlreadyRunning)
        ));
        assert!(matches!(
            coordinator.clear(),
            Err(KeygenError::AlreadyRunning)
        ));

        coordinator.cancel();
        assert_eq!(handle.wait().status, SearchStatus::Cancelled);

        let state = coordinator.start(SearchQuery::any()).unwrap().wait();
        assert_eq!(state.status, SearchStatus::Found);
        assert_eq!(state.attempts, 1);
    }

    #[test]
    fn test_events_end_with_single_terminal() {
        let coordinator = coordinator(2);
        let handle = coordinator.start(improbable()).unwrap();

        let mut progress_seen = Vec::new();
        while progress_seen.len() < 3 {
            match handle.next_event(Duration::from_secs(5)) {
                Ok(SearchEvent::Progress { attempts, progress }) => {
                    assert!(progress <= 99);
                    progress_seen.push(attempts);
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }
        assert!(progress_seen.windows(2).all(|w| w[0] < w[1]));

        let token = handle.cancel_token();
        token.cancel();
        assert!(token.is_cancelled());

        let mut terminal = Vec::new();
        while let Ok(event) = handle.next_event(Duration::from_secs(5)) {
            if event.is_terminal() {
                terminal.push(event);
            } else {
                assert!(terminal.is_empty(), "progress after terminal event");
            }
        }
        assert_eq!(terminal.len(), 1);
        assert!(matches!(terminal[0], SearchEvent::Cancelled { .. }));
        assert_eq!(
            handle.next_event(Duration::from_millis(10)),
            Err(RecvTimeoutError::Disconnected)
        );
    }

    #[test]
    fn test_next_event_times_out_while_running() {
        let coordinator = SearchCoordinator::new(SearchOptions {
            workers: 1,
            progress_interval: Duration::from_secs(60),
        });
        let handle = coordinator.start(improbable()).unwrap();
        assert_eq!(
            handle.next_event(Duration::from_millis(20)),
            Err(RecvTimeoutError::Timeout)
        );
        handle.cancel();
    }

    #[test]
    fn test_generation_failure_is_terminal() {
        let run = SearchRun::new(improbable());
        let error = KeygenError::EntropyExhausted("source closed".into());
        let event = run.finish(Some(WorkerExit::Failed(error.clone())));

        assert!(matches!(
            &event,
            SearchEvent::Failed { error: e, .. } if *e == error
        ));
        assert!(event.is_terminal());

        let state = run.snapshot();
        assert_eq!(state.status, SearchStatus::Failed);
        assert_eq!(state.error, Some(error));
        assert!(state.result.is_none());
        assert_eq!(state.progress, 0);
    }

    #[test]
    fn test_clear_returns_to_idle() {
        let coordinator = coordinator(1);
        assert_eq!(coordinator.state(), SearchState::default());

        coordinator.start(SearchQuery::any()).unwrap().wait();
        assert_eq!(coordinator.state().status, SearchStatus::Found);

        coordinator.clear().unwrap();
        assert_eq!(coordinator.state().status, SearchStatus::Idle);
        assert!(coordinator.state().result.is_none());
    }

    #[test]
    fn test_dropping_handle_cancels() {
        let coordinator = coordinator(2);
        let handle = coordinator.start(improbable()).unwrap();
        drop(handle);

        let state = coordinator.state();
        assert_eq!(state.status, SearchStatus::Cancelled);
        assert!(!coordinator.is_running());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let coordinator = coordinator(0);
        assert!(matches!(
            coordinator.start(SearchQuery::any()),
            Err(KeygenError::InvalidArgument(_))
        ));
        assert_eq!(coordinator.state().status, SearchStatus::Idle);
    }
}
