//! Socket client: one open TCP connection to the line-delimited JSON-RPC
//! server (C4's port Y), multiplexing requests by id over a single reader
//! task (spec.md §4.5).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cadmcp_core::{
    BridgeError, BridgeResult, ConnectionState, ConsoleLine, ConsoleLevel, DocumentSummary,
    ExecutionResult, JsonLineOutcome, JsonLineRequest, JsonLineResponse, ObjectDetails,
    RequestIdAllocator, VersionInfo,
};
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::oneshot;

use crate::{transport_deadline, BridgeClient, HealthPolicy};

type Waiters = Arc<DashMap<u64, oneshot::Sender<JsonLineOutcome>>>;

struct Connection {
    // A tokio mutex, not parking_lot's, so the guard can be held across the
    // `.await` inside `write_all` without making the enclosing future !Send.
    writer: Arc<tokio::sync::Mutex<OwnedWriteHalf>>,
    reader_task: tokio::task::JoinHandle<()>,
}

pub struct SocketClient {
    host: String,
    port: u16,
    ids: RequestIdAllocator,
    waiters: Waiters,
    state: Mutex<ConnectionState>,
    conn: Mutex<Option<Connection>>,
    ui_available: AtomicBool,
    health: HealthPolicy,
    health_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl SocketClient {
    pub fn new(host: impl Into<String>, port: u16) -> Arc<Self> {
        let this = Arc::new(Self {
            host: host.into(),
            port,
            ids: RequestIdAllocator::new(),
            waiters: Arc::new(DashMap::new()),
            state: Mutex::new(ConnectionState::Disconnected),
            conn: Mutex::new(None),
            ui_available: AtomicBool::new(false),
            health: HealthPolicy::default(),
            health_task: Mutex::new(None),
        });
        this.spawn_health_task();
        this
    }

    fn set_state(&self, s: ConnectionState) {
        *self.state.lock() = s;
    }

    async fn dial(&self) -> BridgeResult<Connection> {
        let stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|e| BridgeError::ConnectionLost(format!("connect failed: {e}")))?;
        let (read_half, write_half) = stream.into_split();
        let waiters = self.waiters.clone();
        let reader_task = tokio::spawn(async move {
            let mut lines = BufReader::new(read_half).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if let Ok(resp) = serde_json::from_str::<JsonLineResponse>(&line) {
                            if let Some((_, tx)) = waiters.remove(&resp.id) {
                                let _ = tx.send(resp.outcome);
                            }
                        } else {
                            tracing::warn!(%line, "malformed json-line frame from bridge server");
                        }
                    }
                    Ok(None) | Err(_) => break,
                }
            }
            // EOF or read error: wake every pending caller with ConnectionLost.
            for entry in waiters.iter() {
                let id = *entry.key();
                if let Some((_, tx)) = waiters.remove(&id) {
                    let _ = tx.send(JsonLineOutcome::Error {
                        error: cadmcp_core::JsonLineError {
                            kind: cadmcp_core::ErrorKind::ConnectionLost,
                            message: "connection closed".into(),
                            traceback: None,
                        },
                    });
                }
            }
        });

        Ok(Connection {
            writer: Arc::new(tokio::sync::Mutex::new(write_half)),
            reader_task,
        })
    }

    async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
        timeout: Duration,
    ) -> BridgeResult<serde_json::Value> {
        if !self.is_connected() {
            return Err(BridgeError::NotConnected);
        }

        let id = self.ids.next();
        let (tx, rx) = oneshot::channel();
        self.waiters.insert(id, tx);

        let req = JsonLineRequest {
            id,
            method: method.to_string(),
            params,
        };
        let mut line = serde_json::to_string(&req)
            .map_err(|e| BridgeError::ProtocolError(format!("failed to encode request: {e}")))?;
        line.push('\n');

        if let Err(e) = self.write_line(&line).await {
            self.waiters.remove(&id);
            return Err(e);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(JsonLineOutcome::Result { result })) => Ok(result),
            Ok(Ok(JsonLineOutcome::Error { error })) => Err(BridgeError::ScriptError {
                exception_type: error.kind.to_string(),
                message: error.message,
                traceback: error.traceback,
            }),
            Ok(Err(_)) => Err(BridgeError::ConnectionLost(
                "reply channel dropped".into(),
            )),
            Err(_) => {
                self.waiters.remove(&id);
                Err(BridgeError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }

    async fn write_line(&self, line: &str) -> BridgeResult<()> {
        let bytes = line.as_bytes().to_vec();
        // Re-acquire the writer for the actual async write; parking_lot
        // guards can't cross an .await point, so this scope is intentionally
        // short-lived per write.
        let fut = {
            let guard = self.conn.lock();
            let Some(conn) = guard.as_ref() else {
                return Err(BridgeError::NotConnected);
            };
            let mut writer = conn.writer.lock();
            writer.write_all(&bytes)
        };
        fut.await
            .map_err(|e| BridgeError::ConnectionLost(format!("write failed: {e}")))
    }

    /// Started once from [`SocketClient::new`] (not from `connect`, which
    /// only takes `&self` as the trait requires) and runs for the client's
    /// whole lifetime: pings before the first successful `connect()` just
    /// find `NotConnected` and count as failures against an
    /// already-`Disconnected` state, a no-op; after `connect()` succeeds
    /// they detect transport death and flip the state back down.
    fn spawn_health_task(self: &Arc<Self>) {
        let me = self.clone();
        let handle = tokio::spawn(async move {
            let mut consecutive_failures = 0u32;
            loop {
                tokio::time::sleep(me.health.interval).await;
                if me.ping().await.is_err() {
                    consecutive_failures += 1;
                    if consecutive_failures >= me.health.failures_before_disconnect {
                        me.set_state(ConnectionState::Disconnected);
                        *me.conn.lock() = None;
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
impl BridgeClient for SocketClient {
    async fn connect(&self) -> BridgeResult<()> {
        self.set_state(ConnectionState::Connecting);
        let connection = self.dial().await.map_err(|e| {
            self.set_state(ConnectionState::Disconnected);
            e
        })?;
        *self.conn.lock() = Some(connection);
        self.set_state(ConnectionState::Connected);

        match self.ping().await {
            Ok(()) => {
                let version = self.get_version().await?;
                self.ui_available.store(version.ui_available, Ordering::SeqCst);
                Ok(())
            }
            Err(e) => {
                self.set_state(ConnectionState::Disconnected);
                *self.conn.lock() = None;
                Err(e)
            }
        }
    }

    async fn disconnect(&self) -> BridgeResult<()> {
        self.set_state(ConnectionState::Closing);
        if let Some(h) = self.health_task.lock().take() {
            h.abort();
        }
        if let Some(conn) = self.conn.lock().take() {
            conn.reader_task.abort();
        }
        self.set_state(ConnectionState::Disconnected);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        *self.state.lock() == ConnectionState::Connected
    }

    async fn execute(&self, script: &str, timeout_ms: u64) -> BridgeResult<ExecutionResult> {
        let v = self
            .call(
                "execute",
                serde_json::json!({ "script": script, "timeout_ms": timeout_ms }),
                transport_deadline(timeout_ms),
            )
            .await;
        match v {
            Ok(value) => serde_json::from_value(value)
                .map_err(|e| BridgeError::ProtocolError(format!("malformed execute result: {e}"))),
            Err(BridgeError::ScriptError {
                exception_type,
                message,
                traceback,
            }) => Ok(ExecutionResult::error(
                cadmcp_core::ErrorKind::ScriptError,
                format!("{exception_type}: {message}"),
                traceback,
                String::new(),
                String::new(),
                0.0,
            )),
            Err(e) => Err(BridgeError::ConnectionLost(e.to_string())),
        }
    }

    async fn get_documents(&self) -> BridgeResult<Vec<DocumentSummary>> {
        let v = self
            .call("get_documents", serde_json::Value::Null, Duration::from_secs(10))
            .await?;
        serde_json::from_value(v).map_err(|e| BridgeError::ProtocolError(e.to_string()))
    }

    async fn get_active_document(&self) -> BridgeResult<Option<DocumentSummary>> {
        let v = self
            .call(
                "get_active_document",
                serde_json::Value::Null,
                Duration::from_secs(10),
            )
            .await?;
        if v.is_null() {
            Ok(None)
        } else {
            serde_json::from_value(v)
                .map(Some)
                .map_err(|e| BridgeError::ProtocolError(e.to_string()))
        }
    }

    async fn get_object(&self, doc: &str, name: &str) -> BridgeResult<ObjectDetails> {
        let v = self
            .call(
                "get_object",
                serde_json::json!({ "doc": doc, "name": name }),
                Duration::from_secs(10),
            )
            .await?;
        serde_json::from_value(v).map_err(|e| BridgeError::ProtocolError(e.to_string()))
    }

    async fn get_console_output(&self, n: i64) -> BridgeResult<Vec<ConsoleLine>> {
        let v = self
            .call(
                "get_console_output",
                serde_json::json!({ "lines": n }),
                Duration::from_secs(10),
            )
            .await?;
        let lines: Vec<String> = serde_json::from_value(v).unwrap_or_default();
        Ok(lines
            .into_iter()
            .map(|text| ConsoleLine {
                level: ConsoleLevel::Log,
                text,
            })
            .collect())
    }

    async fn get_version(&self) -> BridgeResult<VersionInfo> {
        let v = self
            .call("get_version", serde_json::Value::Null, Duration::from_secs(5))
            .await?;
        serde_json::from_value(v).map_err(|e| BridgeError::ProtocolError(e.to_string()))
    }

    async fn ping(&self) -> BridgeResult<()> {
        self.call("ping", serde_json::Value::Null, Duration::from_secs(5))
            .await?;
        Ok(())
    }

    fn ui_available(&self) -> bool {
        self.ui_available.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn ids_are_unique_across_n_allocations(n in 1u32..2000) {
            let ids = RequestIdAllocator::new();
            let mut seen = std::collections::HashSet::new();
            for _ in 0..n {
                prop_assert!(seen.insert(ids.next()));
            }
        }
    }
}
