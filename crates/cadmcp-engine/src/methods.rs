//! Canned method bodies shared by both transport servers (spec.md §4.4,
//! §9 "factor the method handlers once and have the transport layers adapt
//! frames to calls").
//!
//! `execute` runs the caller-supplied script verbatim through
//! [`ExecutionEngine`]; every other XML-RPC/JSON-line method is implemented
//! here as a purpose-built script against the `app` binding, executed the
//! same way, so `cadmcp-xmlrpc` and `cadmcp-jsonline` differ only in framing.

use std::sync::Arc;

use cadmcp_core::{
    BridgeError, BridgeResult, ConsoleLevel, ConsoleLine, DocumentSummary, ExecutionResult,
    ObjectDetails, VersionInfo,
};
use serde_json::Value;

use crate::ExecutionEngine;

const SIDE_CHANNEL_TIMEOUT_MS: u64 = 10_000;

/// Safe-repr a string for embedding in an internal Rhai script: Rhai's
/// `Debug`-style string literal syntax doubles as a safe literal escape,
/// the same trick `cadmcp-tools::safe_repr` formalizes for tool templates.
fn repr(s: &str) -> String {
    format!("{s:?}")
}

/// Shared implementation of the non-`execute` bridge methods, parameterized
/// over the engine that actually runs scripts on the UI thread.
pub struct BridgeMethods {
    engine: Arc<ExecutionEngine>,
}

impl BridgeMethods {
    pub fn new(engine: Arc<ExecutionEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<ExecutionEngine> {
        &self.engine
    }

    /// `execute(script, timeout_ms?)` — the only method that carries a
    /// caller-supplied script (spec.md §4.4).
    pub async fn execute(&self, script: &str, timeout_ms: u64) -> ExecutionResult {
        self.engine.execute(script, timeout_ms).await
    }

    pub async fn ping(&self) -> BridgeResult<&'static str> {
        let r = self
            .engine
            .execute(r#"let _result_ = "pong";"#, 2_000)
            .await;
        self.unwrap_value(r).map(|_| "pong")
    }

    pub async fn get_documents(&self) -> BridgeResult<Vec<DocumentSummary>> {
        let r = self
            .engine
            .execute("let _result_ = app.list_documents();", SIDE_CHANNEL_TIMEOUT_MS)
            .await;
        let v = self.unwrap_value(r)?;
        serde_json::from_value(v)
            .map_err(|e| BridgeError::Internal(format!("malformed get_documents result: {e}")))
    }

    pub async fn get_active_document(&self) -> BridgeResult<Option<DocumentSummary>> {
        let r = self
            .engine
            .execute("let _result_ = app.active_document();", SIDE_CHANNEL_TIMEOUT_MS)
            .await;
        let v = self.unwrap_value(r)?;
        if v.is_null() {
            return Ok(None);
        }
        serde_json::from_value(v)
            .map(Some)
            .map_err(|e| BridgeError::Internal(format!("malformed active document result: {e}")))
    }

    pub async fn get_object(&self, doc: &str, name: &str) -> BridgeResult<ObjectDetails> {
        let script = format!(
            "let _result_ = app.get_properties({}, {});",
            repr(doc),
            repr(name)
        );
        let r = self.engine.execute(&script, SIDE_CHANNEL_TIMEOUT_MS).await;
        let v = self.unwrap_value(r)?;
        serde_json::from_value(v)
            .map_err(|e| BridgeError::Internal(format!("malformed object details: {e}")))
    }

    pub async fn get_console_output(&self, lines: i64) -> BridgeResult<Vec<ConsoleLine>> {
        let script = format!("let _result_ = app.console_output({lines});");
        let r = self.engine.execute(&script, SIDE_CHANNEL_TIMEOUT_MS).await;
        let v = self.unwrap_value(r)?;
        let raw: Vec<String> = serde_json::from_value(v).unwrap_or_default();
        Ok(raw
            .into_iter()
            .map(|text| ConsoleLine {
                level: ConsoleLevel::Log,
                text,
            })
            .collect())
    }

    pub async fn get_version(&self) -> BridgeResult<VersionInfo> {
        Ok(VersionInfo {
            bridge_version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: 1,
            cad_version: None,
            ui_available: self.engine.ui_available(),
        })
    }

    fn unwrap_value(&self, r: ExecutionResult) -> BridgeResult<Value> {
        if r.success {
            Ok(r.result)
        } else {
            Err(BridgeError::ScriptError {
                exception_type: r.error_kind.map(|k| k.to_string()).unwrap_or_default(),
                message: r.error_message.unwrap_or_default(),
                traceback: r.error_traceback,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadmcp_runtime::RhaiScriptRuntime;

    fn methods() -> BridgeMethods {
        BridgeMethods::new(Arc::new(ExecutionEngine::new(Arc::new(
            RhaiScriptRuntime::new(),
        ))))
    }

    #[tokio::test]
    async fn ping_replies_pong() {
        assert_eq!(methods().ping().await.unwrap(), "pong");
    }

    #[tokio::test]
    async fn get_documents_round_trips_with_create() {
        let m = methods();
        let created = m
            .execute(r#"app.new_document("Part");"#, 5_000)
            .await;
        assert!(created.success);
        let docs = m.get_documents().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].name, "Part");
    }
}
