//! Main-thread dispatcher (spec.md §4.2, C2).
//!
//! Serializes arbitrary closures onto a single dedicated worker thread that
//! stands in for the CAD UI thread: while the UI is up, every job funnels
//! through one bounded channel and the worker drains it tick by tick, so at
//! most one job ever runs at a time. While the UI is down, [`Dispatcher::submit`]
//! runs the job inline on the caller's thread instead — matching
//! `ui_available()` capability detection rather than probing for a GUI
//! toolkit library (spec.md §4.2, §9).
//!
//! ## No true cancellation
//!
//! A timed-out job cannot be force-killed: interrupting CAD mid-operation
//! would corrupt the document model. [`Dispatcher::submit`] returns
//! [`cadmcp_core::BridgeError::Timeout`] to the caller and drops its
//! completion channel; the job keeps running on the worker thread and its
//! eventual result is silently discarded when the send fails. Document this
//! loudly — do not pretend otherwise.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cadmcp_core::{BridgeError, BridgeResult};
use crossbeam_channel::{Receiver, Sender, TrySendError};

/// Recommended bounded-queue capacity (spec.md §4.2).
pub const DEFAULT_QUEUE_CAPACITY: usize = 128;

/// Recommended UI-thread tick interval (spec.md §4.2).
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(50);

type Job = Box<dyn FnOnce() + Send>;

/// Serializes work onto a single worker thread, with a headless fast path.
pub struct Dispatcher {
    tx: Sender<Job>,
    ui_available: Arc<dyn Fn() -> bool + Send + Sync>,
    capacity: usize,
    shutdown: Arc<AtomicBool>,
}

impl Dispatcher {
    /// Spawn the worker thread and build a dispatcher around it.
    ///
    /// `ui_available` is queried on every [`submit`](Self::submit) call; it
    /// should be backed by the script runtime's own `ui_available()`, never
    /// by probing for a GUI toolkit's presence (spec.md §4.2, §9).
    pub fn new(
        capacity: usize,
        tick_interval: Duration,
        ui_available: Arc<dyn Fn() -> bool + Send + Sync>,
    ) -> Self {
        let (tx, rx): (Sender<Job>, Receiver<Job>) = crossbeam_channel::bounded(capacity);
        let shutdown = Arc::new(AtomicBool::new(false));
        let worker_shutdown = shutdown.clone();

        std::thread::Builder::new()
            .name("cadmcp-ui-thread".into())
            .spawn(move || {
                while !worker_shutdown.load(Ordering::Relaxed) {
                    match rx.recv_timeout(tick_interval) {
                        Ok(job) => job(),
                        Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
                        Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .expect("failed to spawn cadmcp-ui-thread");

        Self {
            tx,
            ui_available,
            capacity,
            shutdown,
        }
    }

    /// Build a dispatcher with the spec's recommended defaults.
    pub fn with_defaults(ui_available: Arc<dyn Fn() -> bool + Send + Sync>) -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY, DEFAULT_TICK_INTERVAL, ui_available)
    }

    /// Bounded-queue capacity this dispatcher was built with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Run `job` to completion, serialized behind any other in-flight job,
    /// and return its result — or time out.
    ///
    /// Callable from any thread. When the UI is down, `job` runs inline on
    /// the calling thread (no queue hop). When the UI is up, `job` is
    /// enqueued for the worker thread and this call awaits its completion
    /// signal with a `timeout` deadline.
    pub async fn submit<T, F>(&self, job: F, timeout: Duration) -> BridgeResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        if !(self.ui_available)() {
            return Ok(job());
        }

        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel::<T>();
        let boxed: Job = Box::new(move || {
            let result = job();
            // Abandoned replies (receiver dropped after a timeout) are
            // expected and intentionally ignored.
            let _ = reply_tx.send(result);
        });

        match self.tx.try_send(boxed) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                return Err(BridgeError::Overloaded {
                    capacity: self.capacity,
                })
            }
            Err(TrySendError::Disconnected(_)) => {
                return Err(BridgeError::Internal(
                    "dispatcher worker thread is gone".into(),
                ))
            }
        }

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(BridgeError::Internal(
                "dispatcher worker thread dropped the reply channel".into(),
            )),
            Err(_) => Err(BridgeError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Stop the worker thread after its current job (if any) finishes.
    /// Queued-but-not-started jobs are dropped without running.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn always_ui() -> Arc<dyn Fn() -> bool + Send + Sync> {
        Arc::new(|| true)
    }

    #[tokio::test]
    async fn submit_runs_job_and_returns_result() {
        let d = Dispatcher::with_defaults(always_ui());
        let out = d.submit(|| 1 + 2, Duration::from_secs(1)).await.unwrap();
        assert_eq!(out, 3);
    }

    #[tokio::test]
    async fn headless_submit_runs_inline() {
        let d = Dispatcher::with_defaults(Arc::new(|| false));
        let tid_before = std::thread::current().id();
        let tid_after = d
            .submit(|| std::thread::current().id(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(tid_before, tid_after);
    }

    #[tokio::test]
    async fn timeout_returns_timeout_kind_and_job_keeps_running() {
        let d = Dispatcher::with_defaults(always_ui());
        let flag = Arc::new(Mutex::new(false));
        let flag2 = flag.clone();
        let err = d
            .submit(
                move || {
                    std::thread::sleep(Duration::from_millis(150));
                    *flag2.lock().unwrap() = true;
                },
                Duration::from_millis(20),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), cadmcp_core::ErrorKind::Timeout);
        // give the abandoned job time to finish in the background
        std::thread::sleep(Duration::from_millis(300));
        assert!(*flag.lock().unwrap());
    }

    #[tokio::test]
    async fn overloaded_when_queue_is_full() {
        // Capacity 1, and the worker is kept busy by a long-running first job
        // so the second `try_send` observes a full queue.
        let d = Arc::new(Dispatcher::new(1, Duration::from_millis(50), always_ui()));
        let (started_tx, started_rx) = std::sync::mpsc::channel::<()>();
        let d1 = d.clone();
        let blocker_handle = tokio::spawn(async move {
            d1.submit(
                move || {
                    started_tx.send(()).unwrap();
                    std::thread::sleep(Duration::from_millis(500));
                },
                Duration::from_secs(2),
            )
            .await
        });
        started_rx.recv().unwrap();

        // fill the queue behind the blocker
        let d2 = d.clone();
        let queued = tokio::spawn(async move { d2.submit(|| (), Duration::from_secs(2)).await });
        // give the queued job's try_send a chance to run before we probe overflow
        tokio::time::sleep(Duration::from_millis(20)).await;
        let overflow = d.submit(|| (), Duration::from_millis(100)).await;
        queued.abort();
        assert!(matches!(
            overflow,
            Err(e) if e.kind() == cadmcp_core::ErrorKind::Overloaded
        ));
        blocker_handle.abort();
    }
}
