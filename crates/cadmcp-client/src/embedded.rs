//! Embedded client: loads the CAD runtime into the current process and
//! calls it directly — no dispatcher hop over a transport because there is
//! no separate UI process to reach (spec.md §4.5).
//!
//! Only available where the CAD shared library is ABI-compatible with the
//! host interpreter; its absence is a configuration error surfaced at
//! startup (`cadmcp-config::BridgeConfig`), never discovered lazily at call
//! time (spec.md §9 Open Question).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use cadmcp_core::{
    BridgeError, BridgeResult, ConsoleLine, DocumentSummary, ExecutionResult, ObjectDetails,
    VersionInfo,
};
use cadmcp_engine::ExecutionEngine;

use crate::BridgeClient;

pub struct EmbeddedClient {
    engine: Arc<ExecutionEngine>,
    connected: AtomicBool,
}

impl EmbeddedClient {
    pub fn new(engine: Arc<ExecutionEngine>) -> Self {
        Self {
            engine,
            connected: AtomicBool::new(false),
        }
    }

    async fn call(&self, script: &str, timeout_ms: u64) -> BridgeResult<serde_json::Value> {
        let result = self.engine.execute(script, timeout_ms).await;
        if result.success {
            Ok(result.result)
        } else {
            Err(BridgeError::ScriptError {
                exception_type: result.error_kind.map(|k| k.to_string()).unwrap_or_default(),
                message: result.error_message.unwrap_or_default(),
                traceback: result.error_traceback,
            })
        }
    }
}

#[async_trait]
impl BridgeClient for EmbeddedClient {
    async fn connect(&self) -> BridgeResult<()> {
        self.ping().await?;
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> BridgeResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn execute(&self, script: &str, timeout_ms: u64) -> BridgeResult<ExecutionResult> {
        if !self.is_connected() {
            return Err(BridgeError::NotConnected);
        }
        Ok(self.engine.execute(script, timeout_ms).await)
    }

    async fn get_documents(&self) -> BridgeResult<Vec<DocumentSummary>> {
        let v = self
            .call("let _result_ = app.list_documents();", 5_000)
            .await?;
        Ok(serde_json::from_value(v).unwrap_or_default())
    }

    async fn get_active_document(&self) -> BridgeResult<Option<DocumentSummary>> {
        let v = self
            .call("let _result_ = app.active_document();", 5_000)
            .await?;
        Ok(serde_json::from_value(v).unwrap_or(None))
    }

    async fn get_object(&self, doc: &str, name: &str) -> BridgeResult<ObjectDetails> {
        let script = format!(
            "let _result_ = app.get_properties({}, {});",
            rhai_repr(doc),
            rhai_repr(name)
        );
        let v = self.call(&script, 5_000).await?;
        serde_json::from_value(v)
            .map_err(|e| BridgeError::Internal(format!("malformed object details: {e}")))
    }

    async fn get_console_output(&self, n: i64) -> BridgeResult<Vec<ConsoleLine>> {
        let script = format!("let _result_ = app.console_output({n});");
        let v = self.call(&script, 5_000).await?;
        let lines: Vec<String> = serde_json::from_value(v).unwrap_or_default();
        Ok(lines
            .into_iter()
            .map(|text| ConsoleLine {
                level: cadmcp_core::ConsoleLevel::Log,
                text,
            })
            .collect())
    }

    async fn get_version(&self) -> BridgeResult<VersionInfo> {
        Ok(VersionInfo {
            bridge_version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: 1,
            cad_version: None,
            ui_available: self.engine.ui_available(),
        })
    }

    async fn ping(&self) -> BridgeResult<()> {
        self.call("let _result_ = \"pong\";", 2_000).await?;
        Ok(())
    }

    fn ui_available(&self) -> bool {
        self.engine.ui_available()
    }
}

/// Rhai string literal repr for embedding a caller-supplied string safely
/// (mirrors `cadmcp-tools::safe_repr`, duplicated here to avoid this crate
/// depending on the tool registry).
fn rhai_repr(s: &str) -> String {
    format!("{s:?}")
}
