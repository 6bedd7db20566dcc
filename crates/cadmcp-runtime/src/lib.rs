//! Script Runtime capability (spec.md §4.1, C1).
//!
//! An implementation provides two operations: `run` executes a script
//! string in the CAD process's interpreter and returns the value assigned
//! to the designated return slot plus captured stdout/stderr, and
//! `ui_available` reports whether the CAD process's graphical shell and
//! event loop are up. Everything above this trait (C2 onward) is generic
//! over it.

pub mod rhai_runtime;
pub mod state;

#[cfg(feature = "embedded-runtime")]
pub mod pyo3_runtime;

use serde_json::Value;

/// The value, stdout, and stderr produced by one successful script run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub result: Value,
    pub stdout: String,
    pub stderr: String,
}

/// A script raised during execution. Carries enough to build a `ScriptError`
/// envelope (spec.md §7): the exception's type name, its message, and a
/// formatted traceback naming the synthetic source.
#[derive(Debug, Clone)]
pub struct ScriptFailure {
    pub exception_type: String,
    pub message: String,
    pub traceback: Option<String>,
    /// stdout/stderr captured before the script raised, if any.
    pub stdout: String,
    pub stderr: String,
}

/// The external contract an implementation of "the CAD process's
/// interpreter" must provide.
///
/// `run` must only be called from the UI thread when the UI is up — callers
/// (the execution engine, via the dispatcher) are responsible for that
/// discipline; this trait does not enforce it.
pub trait ScriptRuntime: Send + Sync {
    /// Execute `script`, returning the return-slot value plus captured
    /// output, or a [`ScriptFailure`] if the script raised.
    fn run(&self, script: &str) -> Result<RunOutcome, ScriptFailure>;

    /// `true` iff the CAD process was started with its graphical shell and
    /// the event loop is running. Must be a direct capability query, never
    /// inferred from whether a GUI toolkit library is merely loaded.
    fn ui_available(&self) -> bool;
}

pub use rhai_runtime::RhaiScriptRuntime;
