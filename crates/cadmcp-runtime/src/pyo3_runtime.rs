//! `embedded-runtime` feature: drives an already-initialized Python
//! interpreter in-process via `pyo3`.
//!
//! This is the production implementation a real CAD workbench loads: the
//! CAD process already has a live Python interpreter (CPython embedded in
//! the host application), and this runtime just borrows the GIL to run
//! scripts against it. It is `#[non_exhaustive]`-documented as requiring
//! that host precondition — constructing it does not itself start an
//! interpreter (see spec.md §9 Open Question on embedded mode).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pyo3::prelude::*;
use pyo3::types::PyDict;
use serde_json::Value;

use crate::{RunOutcome, ScriptFailure};

const DEFAULT_RETURN_SLOT: &str = "_result_";

/// Executes scripts against an already-running CPython interpreter via
/// `pyo3::Python::with_gil`.
///
/// # Preconditions
///
/// The host process must have initialized Python before this runtime is
/// constructed (true of every CAD process this bridge targets; not true of
/// a bare Rust test binary, which is why `RhaiScriptRuntime` is the default
/// everywhere else). Constructing this runtime without an initialized
/// interpreter is a configuration error surfaced at startup, not silently
/// tolerated at call time.
pub struct PyO3ScriptRuntime {
    return_slot: String,
    ui_available: Arc<AtomicBool>,
    module_aliases: Vec<(String, String)>,
}

impl PyO3ScriptRuntime {
    /// `module_aliases` are `(alias, python_module_name)` pairs bound into
    /// every script's globals, e.g. `[("App", "FreeCAD"), ("Gui", "FreeCADGui")]`.
    pub fn new(module_aliases: Vec<(String, String)>, ui_available: bool) -> Self {
        Self {
            return_slot: DEFAULT_RETURN_SLOT.to_string(),
            ui_available: Arc::new(AtomicBool::new(ui_available)),
            module_aliases,
        }
    }

    pub fn set_ui_available(&self, available: bool) {
        self.ui_available.store(available, Ordering::SeqCst);
    }
}

impl crate::ScriptRuntime for PyO3ScriptRuntime {
    fn run(&self, script: &str) -> Result<RunOutcome, ScriptFailure> {
        Python::with_gil(|py| {
            let globals = PyDict::new(py);
            for (alias, module_name) in &self.module_aliases {
                match PyModule::import(py, module_name.as_str()) {
                    Ok(module) => {
                        let _ = globals.set_item(alias, module);
                    }
                    Err(e) => {
                        return Err(ScriptFailure {
                            exception_type: "ImportError".into(),
                            message: format!("failed to bind {alias} = {module_name}: {e}"),
                            traceback: None,
                            stdout: String::new(),
                            stderr: String::new(),
                        })
                    }
                }
            }

            let (stdout, stderr) = capture_streams(py);

            let run_result =
                py.run(std::ffi::CString::new(script).unwrap().as_c_str(), Some(&globals), None);

            let (stdout_text, stderr_text) = restore_and_read_streams(py, stdout, stderr);

            match run_result {
                Ok(()) => {
                    let result = globals
                        .get_item(&self.return_slot)
                        .ok()
                        .flatten()
                        .map(|v| pyobject_to_json(&v))
                        .unwrap_or(Value::Null);
                    Ok(RunOutcome {
                        result,
                        stdout: stdout_text,
                        stderr: stderr_text,
                    })
                }
                Err(e) => {
                    let exception_type = e
                        .get_type(py)
                        .name()
                        .map(|n| n.to_string())
                        .unwrap_or_else(|_| "Exception".to_string());
                    let traceback = e.traceback(py).and_then(|tb| tb.format().ok());
                    Err(ScriptFailure {
                        exception_type,
                        message: e.to_string(),
                        traceback,
                        stdout: stdout_text,
                        stderr: stderr_text,
                    })
                }
            }
        })
    }

    fn ui_available(&self) -> bool {
        self.ui_available.load(Ordering::SeqCst)
    }
}

/// Redirects `sys.stdout`/`sys.stderr` to in-memory `io.StringIO` buffers
/// for the duration of one script, scoped so restoration happens on every
/// exit path (spec.md §4.3 point 3a, §9 "Stdout/stderr capture").
fn capture_streams(py: Python<'_>) -> (Py<PyAny>, Py<PyAny>) {
    let sys = py.import("sys").expect("sys module always available");
    let io = py.import("io").expect("io module always available");
    let old_stdout = sys.getattr("stdout").unwrap().unbind();
    let old_stderr = sys.getattr("stderr").unwrap().unbind();
    let new_stdout = io.call_method0("StringIO").unwrap();
    let new_stderr = io.call_method0("StringIO").unwrap();
    sys.setattr("stdout", &new_stdout).ok();
    sys.setattr("stderr", &new_stderr).ok();
    (old_stdout, old_stderr)
}

fn restore_and_read_streams(py: Python<'_>, old_stdout: Py<PyAny>, old_stderr: Py<PyAny>) -> (String, String) {
    let sys = py.import("sys").expect("sys module always available");
    let cur_stdout = sys.getattr("stdout").unwrap();
    let cur_stderr = sys.getattr("stderr").unwrap();
    let stdout_text: String = cur_stdout
        .call_method0("getvalue")
        .and_then(|v| v.extract())
        .unwrap_or_default();
    let stderr_text: String = cur_stderr
        .call_method0("getvalue")
        .and_then(|v| v.extract())
        .unwrap_or_default();
    sys.setattr("stdout", old_stdout).ok();
    sys.setattr("stderr", old_stderr).ok();
    // Buffer-size capping is the execution engine's job (spec.md §4.3 point
    // 7), applied uniformly regardless of which ScriptRuntime produced the
    // output, so it isn't duplicated here.
    (stdout_text, stderr_text)
}

fn pyobject_to_json(obj: &Bound<'_, PyAny>) -> Value {
    if let Ok(v) = obj.extract::<bool>() {
        return Value::Bool(v);
    }
    if let Ok(v) = obj.extract::<i64>() {
        return Value::from(v);
    }
    if let Ok(v) = obj.extract::<f64>() {
        return Value::from(v);
    }
    if let Ok(v) = obj.extract::<String>() {
        return Value::String(v);
    }
    if let Ok(v) = obj.extract::<Vec<Bound<'_, PyAny>>>() {
        return Value::Array(v.iter().map(pyobject_to_json).collect());
    }
    // Fall back to the object's Python `repr()` for anything we don't
    // have a direct JSON mapping for.
    obj.repr()
        .map(|r| Value::String(r.to_string()))
        .unwrap_or(Value::Null)
}
