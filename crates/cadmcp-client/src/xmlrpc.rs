//! XML-RPC client: one pooled HTTP connection to the bridge's XML-RPC
//! server (C4's port X), the default transport (spec.md §4.5, §6 `MODE`).
//!
//! Each call is an HTTP POST carrying the transport's standard method-call
//! encoding; server-side faults are translated into [`BridgeError`] with
//! `error_kind` lifted from the fault body when the fault string encodes a
//! recognizable kind, `Internal` otherwise.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use cadmcp_core::{
    BridgeError, BridgeResult, ConsoleLevel, ConsoleLine, DocumentSummary, ExecutionResult,
    ObjectDetails, VersionInfo,
};
use dxr::{DxrError, TryFromValue, TryToValue, Value};
use dxr_client::{Client, ClientBuilder, Url};
use parking_lot::Mutex;

use crate::{transport_deadline, BridgeClient, HealthPolicy};

/// `dxr_client` does not expose connection state directly, so the client
/// tracks it itself: considered connected only after the handshake in
/// [`BridgeClient::connect`] succeeds (spec.md §4.5 "Handshake").
pub struct XmlRpcClient {
    client: Client,
    connected: AtomicBool,
    ui_available: AtomicBool,
    health: HealthPolicy,
    health_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl XmlRpcClient {
    pub fn new(host: impl AsRef<str>, port: u16) -> BridgeResult<std::sync::Arc<Self>> {
        let url: Url = format!("http://{}:{port}/RPC2", host.as_ref())
            .parse()
            .map_err(|e| BridgeError::ConfigInvalid(format!("invalid xmlrpc url: {e}")))?;
        let client = ClientBuilder::new(url)
            .user_agent("cadmcp-bridge")
            .build();
        let this = std::sync::Arc::new(Self {
            client,
            connected: AtomicBool::new(false),
            ui_available: AtomicBool::new(false),
            health: HealthPolicy::default(),
            health_task: Mutex::new(None),
        });
        this.spawn_health_task();
        Ok(this)
    }

    async fn call<P, R>(&self, method: &str, params: P, timeout: Duration) -> BridgeResult<R>
    where
        P: dxr::TryToParams + Send,
        R: TryFromValue,
    {
        if !self.is_connected() && method != "ping" && method != "get_version" {
            return Err(BridgeError::NotConnected);
        }

        match tokio::time::timeout(timeout, self.client.call(method, params)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(classify_dxr_error(e)),
            Err(_) => Err(BridgeError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Started once from [`XmlRpcClient::new`]; see the matching note on
    /// `SocketClient::spawn_health_task` for why it isn't started from
    /// `connect` (a `&self` trait method, no `Arc<Self>` to clone there).
    fn spawn_health_task(self: &std::sync::Arc<Self>) {
        let me = self.clone();
        let handle = tokio::spawn(async move {
            let mut consecutive_failures = 0u32;
            loop {
                tokio::time::sleep(me.health.interval).await;
                if BridgeClient::ping(me.as_ref()).await.is_err() {
                    consecutive_failures += 1;
                    if consecutive_failures >= me.health.failures_before_disconnect {
                        me.connected.store(false, Ordering::SeqCst);
                    }
                } else {
                    consecutive_failures = 0;
                }
            }
        });
        *self.health_task.lock() = Some(handle);
    }
}

#[async_trait]
impl BridgeClient for XmlRpcClient {
    async fn connect(&self) -> BridgeResult<()> {
        let _: String = self
            .call("ping", (), Duration::from_secs(5))
            .await
            .map_err(|_| BridgeError::ConnectionLost("ping handshake failed".into()))?;
        self.connected.store(true, Ordering::SeqCst);
        let version = self.get_version().await?;
        self.ui_available
            .store(version.ui_available, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> BridgeResult<()> {
        if let Some(h) = self.health_task.lock().take() {
            h.abort();
        }
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn execute(&self, script: &str, timeout_ms: u64) -> BridgeResult<ExecutionResult> {
        let raw: std::collections::BTreeMap<String, Value> = self
            .call(
                "execute",
                (script.to_string(), timeout_ms as i32),
                transport_deadline(timeout_ms),
            )
            .await
            .map_err(|e| BridgeError::ConnectionLost(e.to_string()))?;
        decode_execute_map(raw)
    }

    async fn get_documents(&self) -> BridgeResult<Vec<DocumentSummary>> {
        let raw: Vec<std::collections::BTreeMap<String, Value>> = self
            .call("get_documents", (), Duration::from_secs(10))
            .await?;
        raw.into_iter().map(decode_document_summary).collect()
    }

    async fn get_active_document(&self) -> BridgeResult<Option<DocumentSummary>> {
        let raw: Value = self
            .call("get_active_document", (), Duration::from_secs(10))
            .await?;
        if raw.as_struct().map(|m| m.is_empty()).unwrap_or(true) {
            return Ok(None);
        }
        let map: std::collections::BTreeMap<String, Value> =
            TryFromValue::try_from_value(&raw).map_err(protocol_err)?;
        decode_document_summary(map).map(Some)
    }

    async fn get_object(&self, doc: &str, name: &str) -> BridgeResult<ObjectDetails> {
        let raw: std::collections::BTreeMap<String, Value> = self
            .call(
                "get_object",
                (doc.to_string(), name.to_string()),
                Duration::from_secs(10),
            )
            .await?;
        decode_object_details(raw)
    }

    async fn get_console_output(&self, n: i64) -> BridgeResult<Vec<ConsoleLine>> {
        let raw: Vec<String> = self
            .call(
                "get_console_output",
                (n as i32,),
                Duration::from_secs(10),
            )
            .await?;
        Ok(raw
            .into_iter()
            .map(|text| ConsoleLine {
                level: ConsoleLevel::Log,
                text,
            })
            .collect())
    }

    async fn get_version(&self) -> BridgeResult<VersionInfo> {
        let raw: std::collections::BTreeMap<String, Value> = self
            .call("get_version", (), Duration::from_secs(5))
            .await?;
        Ok(VersionInfo {
            bridge_version: string_field(&raw, "bridge_version").unwrap_or_default(),
            protocol_version: int_field(&raw, "protocol_version").unwrap_or(1) as u32,
            cad_version: string_field(&raw, "cad_version"),
            ui_available: bool_field(&raw, "ui_available"),
        })
    }

    async fn ping(&self) -> BridgeResult<()> {
        let reply: String = self.call("ping", (), Duration::from_secs(5)).await?;
        if reply == "pong" {
            Ok(())
        } else {
            Err(BridgeError::ProtocolError(format!(
                "unexpected ping reply: {reply}"
            )))
        }
    }

    fn ui_available(&self) -> bool {
        self.ui_available.load(Ordering::SeqCst)
    }
}

fn protocol_err(e: impl std::fmt::Display) -> BridgeError {
    BridgeError::ProtocolError(format!("malformed xmlrpc value: {e}"))
}

fn string_field(m: &std::collections::BTreeMap<String, Value>, key: &str) -> Option<String> {
    m.get(key).and_then(|v| String::try_from_value(v).ok())
}

fn int_field(m: &std::collections::BTreeMap<String, Value>, key: &str) -> Option<i64> {
    m.get(key)
        .and_then(|v| i32::try_from_value(v).ok().map(i64::from))
}

fn bool_field(m: &std::collections::BTreeMap<String, Value>, key: &str) -> bool {
    m.get(key)
        .and_then(|v| bool::try_from_value(v).ok())
        .unwrap_or(false)
}

fn decode_document_summary(
    m: std::collections::BTreeMap<String, Value>,
) -> BridgeResult<DocumentSummary> {
    Ok(DocumentSummary {
        name: string_field(&m, "name").ok_or_else(|| protocol_err("missing name"))?,
        label: string_field(&m, "label").unwrap_or_default(),
        modified: bool_field(&m, "modified"),
        objects: int_field(&m, "objects").unwrap_or(0) as u32,
    })
}

fn decode_object_details(
    m: std::collections::BTreeMap<String, Value>,
) -> BridgeResult<ObjectDetails> {
    let properties = m
        .get("properties")
        .map(value_to_json_object)
        .unwrap_or_default();
    Ok(ObjectDetails {
        name: string_field(&m, "name").ok_or_else(|| protocol_err("missing name"))?,
        type_id: string_field(&m, "type_id").unwrap_or_default(),
        label: string_field(&m, "label").unwrap_or_default(),
        properties,
        visible: bool_field(&m, "visible"),
    })
}

/// Build the `execute` result envelope directly from the reply map rather
/// than round-tripping through JSON, since the XML-RPC wire has no native
/// JSON representation (spec.md §6 "result map with keys success, value,
/// stdout, stderr, execution_time_ms").
fn decode_execute_map(
    m: std::collections::BTreeMap<String, Value>,
) -> BridgeResult<ExecutionResult> {
    let success = bool_field(&m, "success");
    let stdout = string_field(&m, "stdout").unwrap_or_default();
    let stderr = string_field(&m, "stderr").unwrap_or_default();
    let elapsed_ms = m
        .get("execution_time_ms")
        .and_then(|v| f64::try_from_value(v).ok())
        .unwrap_or(0.0);

    if success {
        let result = m
            .get("value")
            .map(value_to_json)
            .unwrap_or(serde_json::Value::Null);
        Ok(ExecutionResult::success(result, stdout, stderr, elapsed_ms))
    } else {
        let kind = string_field(&m, "error_kind")
            .and_then(|s| parse_error_kind(&s))
            .unwrap_or(cadmcp_core::ErrorKind::ScriptError);
        let message = string_field(&m, "error_message").unwrap_or_default();
        let traceback = string_field(&m, "error_traceback");
        Ok(ExecutionResult::error(
            kind,
            message,
            traceback,
            stdout,
            stderr,
            elapsed_ms,
        ))
    }
}

fn parse_error_kind(s: &str) -> Option<cadmcp_core::ErrorKind> {
    use cadmcp_core::ErrorKind::*;
    Some(match s {
        "ConfigInvalid" => ConfigInvalid,
        "NotConnected" => NotConnected,
        "ConnectionLost" => ConnectionLost,
        "Timeout" => Timeout,
        "Overloaded" => Overloaded,
        "UIUnavailable" => UIUnavailable,
        "ScriptError" => ScriptError,
        "ProtocolError" => ProtocolError,
        "Internal" => Internal,
        _ => return None,
    })
}

/// Best-effort conversion of a `dxr::Value` into `serde_json::Value`,
/// for the free-form `value`/`properties` fields the execute/get_object
/// replies carry.
fn value_to_json(v: &Value) -> serde_json::Value {
    if let Ok(b) = bool::try_from_value(v) {
        return serde_json::Value::Bool(b);
    }
    if let Ok(i) = i32::try_from_value(v) {
        return serde_json::json!(i);
    }
    if let Ok(f) = f64::try_from_value(v) {
        return serde_json::json!(f);
    }
    if let Ok(s) = String::try_from_value(v) {
        return serde_json::Value::String(s);
    }
    if let Ok(arr) = Vec::<Value>::try_from_value(v) {
        return serde_json::Value::Array(arr.iter().map(value_to_json).collect());
    }
    if let Ok(map) = std::collections::BTreeMap::<String, Value>::try_from_value(v) {
        return serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        );
    }
    serde_json::Value::Null
}

fn value_to_json_object(v: &Value) -> serde_json::Map<String, serde_json::Value> {
    match value_to_json(v) {
        serde_json::Value::Object(m) => m,
        _ => serde_json::Map::new(),
    }
}

fn classify_dxr_error(e: DxrError) -> BridgeError {
    match e {
        DxrError::Fault(fault) => {
            let kind = parse_error_kind(fault.string()).unwrap_or(cadmcp_core::ErrorKind::Internal);
            match kind {
                cadmcp_core::ErrorKind::Internal => {
                    BridgeError::Internal(format!("xmlrpc fault {}: {}", fault.code(), fault.string()))
                }
                other => BridgeError::ScriptError {
                    exception_type: other.to_string(),
                    message: fault.string().to_string(),
                    traceback: None,
                },
            }
        }
        other => BridgeError::ConnectionLost(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_round_trips_through_wire_string() {
        assert_eq!(
            parse_error_kind("Timeout"),
            Some(cadmcp_core::ErrorKind::Timeout)
        );
        assert_eq!(parse_error_kind("NotARealKind"), None);
    }
}
