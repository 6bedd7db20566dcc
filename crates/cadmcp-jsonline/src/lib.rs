//! Line-delimited JSON-RPC server (spec.md §4.4, C4, port Y, default 9876).
//!
//! One request object per `\n`-terminated line, one response line per
//! request. Multiple requests may be in flight on one connection; a
//! per-connection fan-in task dispatches each to
//! [`cadmcp_engine::methods::BridgeMethods`] — the same shared method
//! bodies the XML-RPC server (`cadmcp-xmlrpc`) adapts — and writes
//! responses back as they complete, matched by `id` (spec.md §4.4).
//!
//! Closing the client side closes the server side cleanly: a read error or
//! EOF on the connection tears down its fan-in task and write loop.

use std::net::SocketAddr;
use std::sync::Arc;

use cadmcp_core::{BridgeError, ErrorKind, JsonLineRequest, JsonLineResponse};
use cadmcp_engine::methods::BridgeMethods;
use futures::SinkExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::{Framed, LinesCodec};

/// Default line-JSON port (spec.md §6 `SOCKET_PORT`).
pub const DEFAULT_PORT: u16 = 9876;

/// Bind and accept connections on `addr` until the process exits.
pub async fn serve(addr: SocketAddr, methods: Arc<BridgeMethods>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "json-line server listening");
    loop {
        let (stream, peer) = listener.accept().await?;
        let methods = methods.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, methods).await {
                tracing::warn!(%peer, error = %e, "json-line connection ended with an error");
            }
        });
    }
}

/// Drive one connection: a reader loop that spawns one task per request
/// (so slow scripts don't block other in-flight requests on the same
/// connection) and a writer loop serializing responses onto the socket.
async fn handle_connection(
    stream: TcpStream,
    methods: Arc<BridgeMethods>,
) -> Result<(), std::io::Error> {
    use futures::StreamExt;

    let framed = Framed::new(stream, LinesCodec::new());
    let (mut sink, mut stream) = framed.split();
    let (tx, mut rx) = mpsc::channel::<JsonLineResponse>(cadmcp_dispatcher_queue_hint());

    let writer = tokio::spawn(async move {
        while let Some(resp) = rx.recv().await {
            let line = match serde_json::to_string(&resp) {
                Ok(l) => l,
                Err(e) => {
                    tracing::error!(error = %e, "failed to encode json-line response");
                    continue;
                }
            };
            if sink.send(line).await.is_err() {
                break;
            }
        }
    });

    while let Some(line) = stream.next().await {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        let req: JsonLineRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                // Malformed frame: spec.md §7 ProtocolError is terminal for
                // the connection, but we can't know the offending `id`, so
                // respond with id 0 and close.
                let _ = tx
                    .send(JsonLineResponse::err(
                        0,
                        ErrorKind::ProtocolError,
                        format!("malformed request line: {e}"),
                        None,
                    ))
                    .await;
                break;
            }
        };

        let methods = methods.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let response = dispatch(&methods, req).await;
            let _ = tx.send(response).await;
        });
    }

    drop(tx);
    let _ = writer.await;
    Ok(())
}

/// A bounded mpsc capacity matching the dispatcher's own recommended queue
/// depth (spec.md §4.2), so a burst of in-flight requests on one connection
/// applies the same backpressure shape as the dispatcher itself.
fn cadmcp_dispatcher_queue_hint() -> usize {
    cadmcp_dispatcher::DEFAULT_QUEUE_CAPACITY
}

async fn dispatch(methods: &Arc<BridgeMethods>, req: JsonLineRequest) -> JsonLineResponse {
    let id = req.id;
    match req.method.as_str() {
        "ping" => match methods.ping().await {
            Ok(pong) => JsonLineResponse::ok(id, serde_json::json!(pong)),
            Err(e) => err_response(id, e),
        },
        "execute" => {
            let script = req
                .params
                .get("script")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let timeout_ms = req
                .params
                .get("timeout_ms")
                .and_then(|v| v.as_u64())
                .unwrap_or(cadmcp_core::DEFAULT_TIMEOUT_MS);
            let result = methods.execute(&script, timeout_ms).await;
            match serde_json::to_value(&result) {
                Ok(v) => JsonLineResponse::ok(id, v),
                Err(e) => JsonLineResponse::err(
                    id,
                    ErrorKind::Internal,
                    format!("failed to encode execute result: {e}"),
                    None,
                ),
            }
        }
        "get_documents" => match methods.get_documents().await {
            Ok(docs) => ok_json(id, &docs),
            Err(e) => err_response(id, e),
        },
        "get_active_document" => match methods.get_active_document().await {
            Ok(doc) => ok_json(id, &doc),
            Err(e) => err_response(id, e),
        },
        "get_object" => {
            let doc = req.params.get("doc").and_then(|v| v.as_str()).unwrap_or_default();
            let name = req.params.get("name").and_then(|v| v.as_str()).unwrap_or_default();
            match methods.get_object(doc, name).await {
                Ok(obj) => ok_json(id, &obj),
                Err(e) => err_response(id, e),
            }
        }
        "get_console_output" => {
            let lines = req.params.get("lines").and_then(|v| v.as_i64()).unwrap_or(0);
            match methods.get_console_output(lines).await {
                Ok(out) => ok_json(id, &out.into_iter().map(|l| l.text).collect::<Vec<_>>()),
                Err(e) => err_response(id, e),
            }
        }
        "get_version" => match methods.get_version().await {
            Ok(v) => ok_json(id, &v),
            Err(e) => err_response(id, e),
        },
        other => JsonLineResponse::err(
            id,
            ErrorKind::ProtocolError,
            format!("unknown method '{other}'"),
            None,
        ),
    }
}

fn ok_json(id: u64, value: &impl serde::Serialize) -> JsonLineResponse {
    match serde_json::to_value(value) {
        Ok(v) => JsonLineResponse::ok(id, v),
        Err(e) => JsonLineResponse::err(id, ErrorKind::Internal, e.to_string(), None),
    }
}

fn err_response(id: u64, e: BridgeError) -> JsonLineResponse {
    JsonLineResponse::err(id, e.kind(), e.to_string(), e.traceback().map(str::to_string))
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
    async fn dispatch_ping_ok() {
        let resp = dispatch(&methods(), JsonLineRequest {
            id: 1,
            method: "ping".into(),
            params: serde_json::Value::Null,
        })
        .await;
        assert_eq!(resp.id, 1);
        matches!(resp.outcome, cadmcp_core::JsonLineOutcome::Result { .. });
    }

    #[tokio::test]
    async fn dispatch_unknown_method_is_protocol_error() {
        let resp = dispatch(&methods(), JsonLineRequest {
            id: 2,
            method: "frobnicate".into(),
            params: serde_json::Value::Null,
        })
        .await;
        match resp.outcome {
            cadmcp_core::JsonLineOutcome::Error { error } => {
                assert_eq!(error.kind, ErrorKind::ProtocolError);
            }
            _ => panic!("expected error outcome"),
        }
    }

    #[tokio::test]
    async fn dispatch_execute_round_trips_result() {
        let resp = dispatch(&methods(), JsonLineRequest {
            id: 3,
            method: "execute".into(),
            params: serde_json::json!({ "script": "let _result_ = 1 + 2;" }),
        })
        .await;
        match resp.outcome {
            cadmcp_core::JsonLineOutcome::Result { result } => {
                assert_eq!(result["success"], serde_json::json!(true));
                assert_eq!(result["result"], serde_json::json!(3));
            }
            other => panic!("expected result outcome, got {other:?}"),
        }
    }
}
