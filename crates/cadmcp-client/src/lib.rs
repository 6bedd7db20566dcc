//! Bridge Clients (spec.md §4.5, C5): three implementations of one
//! client-side interface to the execution engine, chosen at startup by
//! `cadmcp-config::BridgeMode`.

pub mod embedded;
pub mod socket;
pub mod xmlrpc;

pub use embedded::EmbeddedClient;
pub use socket::SocketClient;
pub use xmlrpc::XmlRpcClient;

use async_trait::async_trait;
use cadmcp_core::{
    BridgeResult, ConsoleLine, DocumentSummary, ExecutionResult, ObjectDetails, VersionInfo,
};

/// Uniform client-side interface to the execution engine regardless of
/// transport (spec.md §4.5).
#[async_trait]
pub trait BridgeClient: Send + Sync {
    /// Run a `ping`/`get_version` handshake; only on success is the client
    /// considered connected.
    async fn connect(&self) -> BridgeResult<()>;

    async fn disconnect(&self) -> BridgeResult<()>;

    fn is_connected(&self) -> bool;

    async fn execute(&self, script: &str, timeout_ms: u64) -> BridgeResult<ExecutionResult>;

    async fn get_documents(&self) -> BridgeResult<Vec<DocumentSummary>>;

    async fn get_active_document(&self) -> BridgeResult<Option<DocumentSummary>>;

    async fn get_object(&self, doc: &str, name: &str) -> BridgeResult<ObjectDetails>;

    async fn get_console_output(&self, n: i64) -> BridgeResult<Vec<ConsoleLine>>;

    async fn get_version(&self) -> BridgeResult<VersionInfo>;

    async fn ping(&self) -> BridgeResult<()>;

    fn ui_available(&self) -> bool;
}

/// Health-check cadence and failure budget shared by every transport
/// implementation (spec.md §4.5 "Reconnect policy").
#[derive(Debug, Clone, Copy)]
pub struct HealthPolicy {
    pub interval: std::time::Duration,
    pub failures_before_disconnect: u32,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            interval: std::time::Duration::from_secs(5),
            failures_before_disconnect: 3,
        }
    }
}

/// The transport-level deadline a client imposes over an in-script timeout,
/// strictly greater so the client observes a clean `Timeout` envelope
/// rather than a transport-level one when the script overruns (spec.md
/// §4.5 "Per-call timeout").
pub fn transport_deadline(script_timeout_ms: u64) -> std::time::Duration {
    std::time::Duration::from_millis(script_timeout_ms + 5_000)
}
