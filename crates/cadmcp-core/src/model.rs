//! Wire-level data model shared by every transport (spec.md §3).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::ErrorKind;

/// Default per-call script timeout, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Methods an [`ExecutionRequest`] may name. Only `Execute` carries a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Execute,
    GetDocuments,
    GetActiveDocument,
    GetObject,
    GetVersion,
    GetConsoleOutput,
    Ping,
}

/// A per-connection monotonically increasing request id allocator.
///
/// Never reused within a process lifetime (spec.md §4.5 "Request identity").
#[derive(Debug, Default)]
pub struct RequestIdAllocator(AtomicU64);

impl RequestIdAllocator {
    pub fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    /// Allocate the next id. Ids start at 1 and never repeat for this
    /// allocator's lifetime.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

/// Immutable request envelope consumed exactly once by the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub id: u64,
    pub method: Method,
    #[serde(default)]
    pub params: Value,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl ExecutionRequest {
    pub fn execute(id: u64, script: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            id,
            method: Method::Execute,
            params: serde_json::json!({ "script": script.into() }),
            timeout_ms,
        }
    }

    /// The script carried by an `execute` request, if any.
    pub fn script(&self) -> Option<&str> {
        if self.method != Method::Execute {
            return None;
        }
        self.params.get("script").and_then(Value::as_str)
    }
}

/// Immutable result envelope. Exactly one of `{success=true, error_kind=None}`
/// / `{success=false, error_kind=Some}` ever holds (spec.md §3 invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub result: Value,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    pub elapsed_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_traceback: Option<String>,
}

impl ExecutionResult {
    pub fn success(result: Value, stdout: String, stderr: String, elapsed_ms: f64) -> Self {
        Self {
            success: true,
            result,
            stdout,
            stderr,
            elapsed_ms,
            error_kind: None,
            error_message: None,
            error_traceback: None,
        }
    }

    pub fn error(
        kind: ErrorKind,
        message: impl Into<String>,
        traceback: Option<String>,
        stdout: String,
        stderr: String,
        elapsed_ms: f64,
    ) -> Self {
        Self {
            success: false,
            result: Value::Null,
            stdout,
            stderr,
            elapsed_ms,
            error_kind: Some(kind),
            error_message: Some(message.into()),
            error_traceback: traceback,
        }
    }

    /// `true` iff this result upholds the envelope-exclusivity invariant.
    pub fn is_well_formed(&self) -> bool {
        self.success == self.error_kind.is_none()
    }
}

/// Per-client connection lifecycle (spec.md §3, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

/// Summary of one open CAD document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub name: String,
    pub label: String,
    pub modified: bool,
    pub objects: u32,
}

/// Detail view of a single CAD object inside a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDetails {
    pub name: String,
    pub type_id: String,
    pub label: String,
    pub properties: serde_json::Map<String, Value>,
    pub visible: bool,
}

/// Version/capability banner returned by `get_version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub bridge_version: String,
    pub protocol_version: u32,
    pub cad_version: Option<String>,
    pub ui_available: bool,
}

/// Severity tag on one line of captured CAD console output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleLevel {
    Message,
    Warning,
    Error,
    Log,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleLine {
    pub level: ConsoleLevel,
    pub text: String,
}

/// Parameter/return schema and registration metadata for one MCP tool
/// (spec.md §3, §4.6). The script template itself lives alongside the
/// descriptor in `cadmcp-tools` to keep this crate free of the `rhai`/`pyo3`
/// dependency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub category: String,
    pub description: String,
    pub requires_ui: bool,
    pub input_schema: Value,
}

/// URI-pattern-keyed read-only endpoint (spec.md §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub uri_pattern: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_never_repeat() {
        let alloc = RequestIdAllocator::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(alloc.next()));
        }
    }

    #[test]
    fn envelope_exclusivity_holds_for_success() {
        let r = ExecutionResult::success(Value::from(3), String::new(), String::new(), 1.2);
        assert!(r.is_well_formed());
    }

    #[test]
    fn envelope_exclusivity_holds_for_error() {
        let r = ExecutionResult::error(
            ErrorKind::Timeout,
            "timed out",
            None,
            String::new(),
            String::new(),
            5.0,
        );
        assert!(r.is_well_formed());
    }
}
