//! XML-RPC server (spec.md §4.4, C4, port X, default 9875).
//!
//! Exposes `execute`, `get_documents`, `get_active_document`, `get_object`,
//! `get_version`, `get_console_output`, and `ping` over standard XML-RPC
//! encoding on HTTP/1.1, backed by the same [`cadmcp_engine::ExecutionEngine`]
//! instance the JSON-line server (`cadmcp-jsonline`) uses — the method
//! bodies themselves live once in [`cadmcp_engine::methods::BridgeMethods`];
//! this crate only adapts XML-RPC frames to calls on it (spec.md §9
//! "factor the method handlers once").
//!
//! Binds to loopback only by default (spec.md §4.4 "Binding policy"); no
//! authentication is performed, by design — this is a local-machine tool.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use cadmcp_engine::methods::BridgeMethods;
use dxr::{Fault, TryToValue, Value};
use dxr_server::{async_trait as dxr_async_trait, Handler, RouteBuilder};

/// Default XML-RPC port (spec.md §6 `XMLRPC_PORT`).
pub const DEFAULT_PORT: u16 = 9875;

fn internal_fault(message: impl std::fmt::Display) -> Fault {
    Fault::new(500, message.to_string())
}

fn bridge_error_fault(e: cadmcp_core::BridgeError) -> Fault {
    Fault::new(
        match e.kind() {
            cadmcp_core::ErrorKind::Timeout => 408,
            cadmcp_core::ErrorKind::NotConnected => 503,
            cadmcp_core::ErrorKind::Overloaded => 503,
            cadmcp_core::ErrorKind::UIUnavailable => 409,
            _ => 500,
        },
        format!("{}: {}", e.kind(), e),
    )
}

struct PingHandler;

#[dxr_async_trait]
impl Handler for PingHandler {
    async fn handle(&self, _params: Vec<Value>) -> Result<Value, Fault> {
        "pong".try_to_value().map_err(internal_fault)
    }
}

struct ExecuteHandler(Arc<BridgeMethods>);

#[dxr_async_trait]
impl Handler for ExecuteHandler {
    async fn handle(&self, params: Vec<Value>) -> Result<Value, Fault> {
        let mut iter = params.into_iter();
        let script: String = iter
            .next()
            .ok_or_else(|| internal_fault("execute requires a script argument"))
            .and_then(|v| dxr::TryFromValue::try_from_value(&v).map_err(internal_fault))?;
        let timeout_ms: u64 = match iter.next() {
            Some(v) => i32::try_from_value(&v).map_err(internal_fault)? as u64,
            None => cadmcp_core::DEFAULT_TIMEOUT_MS,
        };

        let result = self.0.execute(&script, timeout_ms).await;
        let mut map = std::collections::BTreeMap::new();
        map.insert("success".to_string(), result.success.try_to_value().map_err(internal_fault)?);
        map.insert(
            "value".to_string(),
            json_to_value(&result.result).try_to_value().map_err(internal_fault)?,
        );
        map.insert("stdout".to_string(), result.stdout.try_to_value().map_err(internal_fault)?);
        map.insert("stderr".to_string(), result.stderr.try_to_value().map_err(internal_fault)?);
        map.insert(
            "execution_time_ms".to_string(),
            result.elapsed_ms.try_to_value().map_err(internal_fault)?,
        );
        if let Some(kind) = result.error_kind {
            map.insert("error_kind".to_string(), kind.to_string().try_to_value().map_err(internal_fault)?);
        }
        if let Some(msg) = result.error_message {
            map.insert("error_message".to_string(), msg.try_to_value().map_err(internal_fault)?);
        }
        if let Some(tb) = result.error_traceback {
            map.insert("error_traceback".to_string(), tb.try_to_value().map_err(internal_fault)?);
        }
        map.try_to_value().map_err(internal_fault)
    }
}

struct GetDocumentsHandler(Arc<BridgeMethods>);

#[dxr_async_trait]
impl Handler for GetDocumentsHandler {
    async fn handle(&self, _params: Vec<Value>) -> Result<Value, Fault> {
        let docs = self.0.get_documents().await.map_err(bridge_error_fault)?;
        docs.iter()
            .map(document_summary_value)
            .collect::<Result<Vec<_>, _>>()?
            .try_to_value()
            .map_err(internal_fault)
    }
}

struct GetActiveDocumentHandler(Arc<BridgeMethods>);

#[dxr_async_trait]
impl Handler for GetActiveDocumentHandler {
    async fn handle(&self, _params: Vec<Value>) -> Result<Value, Fault> {
        match self.0.get_active_document().await.map_err(bridge_error_fault)? {
            Some(doc) => document_summary_value(&doc),
            None => std::collections::BTreeMap::<String, Value>::new()
                .try_to_value()
                .map_err(internal_fault),
        }
    }
}

struct GetObjectHandler(Arc<BridgeMethods>);

#[dxr_async_trait]
impl Handler for GetObjectHandler {
    async fn handle(&self, params: Vec<Value>) -> Result<Value, Fault> {
        let mut iter = params.into_iter();
        let doc: String = iter
            .next()
            .ok_or_else(|| internal_fault("get_object requires doc, name"))
            .and_then(|v| dxr::TryFromValue::try_from_value(&v).map_err(internal_fault))?;
        let name: String = iter
            .next()
            .ok_or_else(|| internal_fault("get_object requires doc, name"))
            .and_then(|v| dxr::TryFromValue::try_from_value(&v).map_err(internal_fault))?;
        let obj = self.0.get_object(&doc, &name).await.map_err(bridge_error_fault)?;

        let mut map = std::collections::BTreeMap::new();
        map.insert("name".to_string(), obj.name.try_to_value().map_err(internal_fault)?);
        map.insert("type_id".to_string(), obj.type_id.try_to_value().map_err(internal_fault)?);
        map.insert("label".to_string(), obj.label.try_to_value().map_err(internal_fault)?);
        map.insert("visible".to_string(), obj.visible.try_to_value().map_err(internal_fault)?);
        map.insert(
            "properties".to_string(),
            json_to_value(&serde_json::Value::Object(obj.properties))
                .try_to_value()
                .map_err(internal_fault)?,
        );
        map.try_to_value().map_err(internal_fault)
    }
}

struct GetVersionHandler(Arc<BridgeMethods>);

#[dxr_async_trait]
impl Handler for GetVersionHandler {
    async fn handle(&self, _params: Vec<Value>) -> Result<Value, Fault> {
        let v = self.0.get_version().await.map_err(bridge_error_fault)?;
        let mut map = std::collections::BTreeMap::new();
        map.insert("bridge_version".to_string(), v.bridge_version.try_to_value().map_err(internal_fault)?);
        map.insert("protocol_version".to_string(), (v.protocol_version as i32).try_to_value().map_err(internal_fault)?);
        map.insert(
            "cad_version".to_string(),
            v.cad_version.unwrap_or_default().try_to_value().map_err(internal_fault)?,
        );
        map.insert("ui_available".to_string(), v.ui_available.try_to_value().map_err(internal_fault)?);
        map.try_to_value().map_err(internal_fault)
    }
}

struct GetConsoleOutputHandler(Arc<BridgeMethods>);

#[dxr_async_trait]
impl Handler for GetConsoleOutputHandler {
    async fn handle(&self, params: Vec<Value>) -> Result<Value, Fault> {
        let lines: i64 = match params.first() {
            Some(v) => i32::try_from_value(v).map_err(internal_fault)? as i64,
            None => 0,
        };
        let out = self.0.get_console_output(lines).await.map_err(bridge_error_fault)?;
        out.iter()
            .map(|l| l.text.clone())
            .collect::<Vec<_>>()
            .try_to_value()
            .map_err(internal_fault)
    }
}

fn document_summary_value(d: &cadmcp_core::DocumentSummary) -> Result<Value, Fault> {
    let mut map = std::collections::BTreeMap::new();
    map.insert("name".to_string(), d.name.clone().try_to_value().map_err(internal_fault)?);
    map.insert("label".to_string(), d.label.clone().try_to_value().map_err(internal_fault)?);
    map.insert("modified".to_string(), d.modified.try_to_value().map_err(internal_fault)?);
    map.insert("objects".to_string(), (d.objects as i32).try_to_value().map_err(internal_fault)?);
    map.try_to_value().map_err(internal_fault)
}

/// Best-effort `serde_json::Value` -> `dxr::Value` conversion for the
/// free-form `value`/`properties` fields XML-RPC has no native type for.
fn json_to_value(v: &serde_json::Value) -> DxrJson {
    DxrJson(v.clone())
}

/// Newtype so `json_to_value` can implement [`TryToValue`] without this
/// crate needing a blanket impl over `serde_json::Value` (orphan rules).
struct DxrJson(serde_json::Value);

impl TryToValue for DxrJson {
    fn try_to_value(&self) -> Result<Value, dxr::DxrError> {
        match &self.0 {
            serde_json::Value::Null => "null".try_to_value(),
            serde_json::Value::Bool(b) => b.try_to_value(),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    (i as i32).try_to_value()
                } else {
                    n.as_f64().unwrap_or_default().try_to_value()
                }
            }
            serde_json::Value::String(s) => s.try_to_value(),
            serde_json::Value::Array(a) => a
                .iter()
                .map(|v| DxrJson(v.clone()).try_to_value())
                .collect::<Result<Vec<_>, _>>()?
                .try_to_value(),
            serde_json::Value::Object(o) => o
                .iter()
                .map(|(k, v)| Ok((k.clone(), DxrJson(v.clone()).try_to_value()?)))
                .collect::<Result<std::collections::BTreeMap<_, _>, dxr::DxrError>>()?
                .try_to_value(),
        }
    }
}

/// Build the axum router for the XML-RPC server, with every method wired
/// to the same [`BridgeMethods`] instance the JSON-line server shares.
pub fn router(methods: Arc<BridgeMethods>) -> axum::Router {
    let route = RouteBuilder::new()
        .add_method("ping", Box::new(PingHandler))
        .add_method("execute", Box::new(ExecuteHandler(methods.clone())))
        .add_method("get_documents", Box::new(GetDocumentsHandler(methods.clone())))
        .add_method(
            "get_active_document",
            Box::new(GetActiveDocumentHandler(methods.clone())),
        )
        .add_method("get_object", Box::new(GetObjectHandler(methods.clone())))
        .add_method("get_version", Box::new(GetVersionHandler(methods.clone())))
        .add_method(
            "get_console_output",
            Box::new(GetConsoleOutputHandler(methods)),
        )
        .build();

    axum::Router::new().route("/", route)
}

/// Bind and serve the XML-RPC server on `addr` until the process exits.
///
/// `addr` should be a loopback address unless the operator has explicitly
/// opted into a wider bind (spec.md §4.4 "Binding policy"); this function
/// does not itself enforce that — callers (the adapter's lifecycle code)
/// make that policy decision.
pub async fn serve(addr: SocketAddr, methods: Arc<BridgeMethods>) -> std::io::Result<()> {
    let app = router(methods);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "xmlrpc server listening");
    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadmcp_engine::ExecutionEngine;
    use cadmcp_runtime::RhaiScriptRuntime;

    fn methods() -> Arc<BridgeMethods> {
        Arc::new(BridgeMethods::new(Arc::new(ExecutionEngine::new(Arc::new(
            RhaiScriptRuntime::new(),
        )))))
    }

    #[tokio::test]
    async fn ping_handler_replies_pong() {
        let handler = PingHandler;
        let v = handler.handle(vec![]).await.unwrap();
        let s: String = dxr::TryFromValue::try_from_value(&v).unwrap();
        assert_eq!(s, "pong");
    }

    #[tokio::test]
    async fn execute_handler_builds_result_map() {
        let handler = ExecuteHandler(methods());
        let v = handler
            .handle(vec!["let _result_ = 1 + 2;".try_to_value().unwrap()])
            .await
            .unwrap();
        let map: std::collections::BTreeMap<String, Value> =
            dxr::TryFromValue::try_from_value(&v).unwrap();
        let success: bool = dxr::TryFromValue::try_from_value(map.get("success").unwrap()).unwrap();
        assert!(success);
    }
}
