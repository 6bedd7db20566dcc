//! Execution Engine (spec.md §4.3, C3).
//!
//! Turns a script string into an [`ExecutionResult`] with proper capture and
//! classification: submits the script to the [`Dispatcher`] (C2), times the
//! call, caps stdout/stderr, and translates timeouts and script failures
//! into the uniform error envelope (spec.md §7).

pub mod methods;

use std::sync::Arc;
use std::time::{Duration, Instant};

use cadmcp_core::{BridgeError, ErrorKind, ExecutionResult};
use cadmcp_dispatcher::Dispatcher;
use cadmcp_runtime::{RunOutcome, ScriptFailure, ScriptRuntime};

/// Default cap on captured stdout/stderr, per spec.md §4.3 point 7.
pub const DEFAULT_MAX_CAPTURE_BYTES: usize = 1024 * 1024;

const TRUNCATION_MARKER: &str = "\n...[truncated]";

pub struct ExecutionEngine {
    dispatcher: Dispatcher,
    runtime: Arc<dyn ScriptRuntime>,
    max_capture_bytes: usize,
}

impl ExecutionEngine {
    pub fn new(runtime: Arc<dyn ScriptRuntime>) -> Self {
        Self::with_capture_limit(runtime, DEFAULT_MAX_CAPTURE_BYTES)
    }

    pub fn with_capture_limit(runtime: Arc<dyn ScriptRuntime>, max_capture_bytes: usize) -> Self {
        let rt = runtime.clone();
        let dispatcher = Dispatcher::with_defaults(Arc::new(move || rt.ui_available()));
        Self {
            dispatcher,
            runtime,
            max_capture_bytes,
        }
    }

    /// `true` iff the CAD process's graphical shell is up — delegates
    /// straight to the runtime capability, never to toolkit probing
    /// (spec.md §4.2, §9).
    pub fn ui_available(&self) -> bool {
        self.runtime.ui_available()
    }

    /// Run `script` end to end and build its envelope.
    pub async fn execute(&self, script: &str, timeout_ms: u64) -> ExecutionResult {
        let start = Instant::now();
        let runtime = self.runtime.clone();
        let script = script.to_string();

        let outcome = self
            .dispatcher
            .submit(
                move || runtime.run(&script),
                Duration::from_millis(timeout_ms),
            )
            .await;

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(Ok(RunOutcome {
                result,
                stdout,
                stderr,
            })) => ExecutionResult::success(
                result,
                self.cap(stdout),
                self.cap(stderr),
                elapsed_ms,
            ),
            Ok(Err(ScriptFailure {
                exception_type,
                message,
                traceback,
                stdout,
                stderr,
            })) => ExecutionResult::error(
                ErrorKind::ScriptError,
                format!("{exception_type}: {message}"),
                traceback,
                self.cap(stdout),
                self.cap(stderr),
                elapsed_ms,
            ),
            Err(dispatch_err) => self.dispatch_error_result(dispatch_err, elapsed_ms),
        }
    }

    fn dispatch_error_result(&self, err: BridgeError, elapsed_ms: f64) -> ExecutionResult {
        ExecutionResult::error(
            err.kind(),
            err.to_string(),
            err.traceback().map(str::to_string),
            String::new(),
            String::new(),
            elapsed_ms,
        )
    }

    fn cap(&self, mut s: String) -> String {
        if s.len() > self.max_capture_bytes {
            s.truncate(self.max_capture_bytes);
            s.push_str(TRUNCATION_MARKER);
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadmcp_runtime::RhaiScriptRuntime;

    fn engine() -> ExecutionEngine {
        ExecutionEngine::new(Arc::new(RhaiScriptRuntime::new()))
    }

    #[tokio::test]
    async fn simple_execute_succeeds() {
        let e = engine();
        let r = e.execute("let _result_ = 1 + 2;", 5_000).await;
        assert!(r.success);
        assert_eq!(r.result, serde_json::json!(3));
        assert!(r.elapsed_ms >= 0.0);
    }

    #[tokio::test]
    async fn script_error_is_surfaced_as_script_error_envelope() {
        let e = engine();
        let r = e.execute(r#"throw "boom";"#, 5_000).await;
        assert!(!r.success);
        assert_eq!(r.error_kind, Some(ErrorKind::ScriptError));
        assert!(r.error_message.unwrap().contains("boom"));
        assert!(r.error_traceback.unwrap().contains("<cadmcp-script>"));
    }

    #[tokio::test]
    async fn timeout_is_honored_within_bounds() {
        let e = engine();
        let start = Instant::now();
        let r = e.execute("loop { }", 500).await;
        let elapsed = start.elapsed();
        assert!(!r.success);
        assert_eq!(r.error_kind, Some(ErrorKind::Timeout));
        assert!(elapsed >= Duration::from_millis(500));
        assert!(elapsed < Duration::from_secs(6));
    }

    #[tokio::test]
    async fn envelope_always_has_exactly_one_of_result_or_error() {
        let e = engine();
        let ok = e.execute("let _result_ = 1;", 1_000).await;
        assert!(ok.is_well_formed());
        let bad = e.execute("throw \"x\";", 1_000).await;
        assert!(bad.is_well_formed());
    }
}
