//! `bridge-server` (spec.md §4.8, §6, C8): the MCP-facing half of the
//! bridge. Loads configuration, connects a bridge client with retry, wires
//! the tool/resource catalogs onto a `turbomcp_server::ServerBuilder`, and
//! serves stdio or HTTP until a shutdown signal drains it.
//!
//! Mirrors the teacher's `demo/src/main.rs` shape (build tool(s), build
//! server, `run_stdio().await`) generalized from one hand-written tool to
//! the full data-driven catalog, and extended with the connect-retry and
//! signal-draining lifecycle spec.md §4.9 describes.

mod handlers;

use std::sync::Arc;
use std::time::Duration;

use cadmcp_client::{BridgeClient, EmbeddedClient, SocketClient, XmlRpcClient};
use cadmcp_config::{BridgeConfig, BridgeMode, RetryBudget};
use cadmcp_engine::ExecutionEngine;
use cadmcp_resources::ResourceRegistry;
use cadmcp_runtime::RhaiScriptRuntime;
use cadmcp_tools::ToolRegistry;
use turbomcp_server::ServerBuilder;

const EXIT_CONFIG_INVALID: i32 = 1;
const EXIT_CONNECT_FAILED: i32 = 2;
const EXIT_SERVER_ERROR: i32 = 3;

fn init_tracing() {
    // stdout is reserved for JSON-RPC framing on the stdio transport
    // (grounded in the teacher demo's "CRITICAL: NO LOGGING" stdout
    // constraint); every transport logs to stderr unconditionally so the
    // stdio case is never at risk of a stray log line corrupting a frame.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

/// Build the bridge client named by `config.mode` (spec.md §4.5, §6 `MODE`).
fn build_client(config: &BridgeConfig) -> anyhow::Result<Arc<dyn BridgeClient>> {
    Ok(match config.mode {
        BridgeMode::Xmlrpc => {
            XmlRpcClient::new(&config.host, config.xmlrpc_port)? as Arc<dyn BridgeClient>
        }
        BridgeMode::Socket => {
            SocketClient::new(&config.host, config.socket_port) as Arc<dyn BridgeClient>
        }
        BridgeMode::Embedded => {
            let runtime = Arc::new(RhaiScriptRuntime::new());
            let engine = Arc::new(ExecutionEngine::new(runtime));
            Arc::new(EmbeddedClient::new(engine)) as Arc<dyn BridgeClient>
        }
    })
}

/// Connect `client`, retrying per the budget in SPEC_FULL.md §5 (250ms
/// initial, doubling, capped 5s, 10 attempts ≈27s) before giving up.
async fn connect_with_retry(client: &Arc<dyn BridgeClient>, budget: RetryBudget) -> bool {
    for attempt in 1..=budget.max_attempts {
        match client.connect().await {
            Ok(()) => return true,
            Err(e) => {
                tracing::warn!(attempt, error = %e, "bridge connect attempt failed");
                if attempt < budget.max_attempts {
                    tokio::time::sleep(budget.delay_for(attempt)).await;
                }
            }
        }
    }
    false
}

/// SIGINT or (on unix) SIGTERM — whichever arrives first triggers the
/// drain-then-stop lifecycle transition (spec.md §4.9 `[Ready]
/// --(shutdown signal)--> [Draining]`).
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {},
            _ = sigterm.recv() => {},
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await;
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    init_tracing();

    let config = match BridgeConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("configuration invalid: {e}");
            return std::process::ExitCode::from(EXIT_CONFIG_INVALID as u8);
        }
    };

    let client = match build_client(&config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to construct bridge client: {e}");
            return std::process::ExitCode::from(EXIT_CONFIG_INVALID as u8);
        }
    };

    if !connect_with_retry(&client, RetryBudget::default()).await {
        eprintln!("bridge connect retry budget exhausted");
        return std::process::ExitCode::from(EXIT_CONNECT_FAILED as u8);
    }
    tracing::info!(mode = ?config.mode, "bridge connected");

    let tools = Arc::new(ToolRegistry::full());
    let resources = Arc::new(ResourceRegistry::full());

    let mut builder = ServerBuilder::new()
        .name("cadmcp-bridge")
        .version(env!("CARGO_PKG_VERSION"))
        .description("MCP bridge onto a CAD application's scripting console");

    for (name, handler) in handlers::tool_handlers(&tools, &client, config.timeout.as_millis() as u64)
    {
        builder = match builder.tool(name, handler) {
            Ok(b) => b,
            Err(e) => {
                eprintln!("failed to register tool handler: {e}");
                return std::process::ExitCode::from(EXIT_SERVER_ERROR as u8);
            }
        };
    }

    for (uri, handler) in
        handlers::resource_handlers(&tools, &resources, &client, config.timeout.as_millis() as u64)
    {
        builder = match builder.resource(uri, handler) {
            Ok(b) => b,
            Err(e) => {
                eprintln!("failed to register resource handler: {e}");
                return std::process::ExitCode::from(EXIT_SERVER_ERROR as u8);
            }
        };
    }

    let server = builder.build();

    let run_result = if let Some(addr) = config.http_addr {
        tracing::info!(%addr, "serving MCP over HTTP");
        tokio::select! {
            res = server.run_http(addr) => res,
            () = shutdown_signal() => {
                tracing::info!("shutdown signal received, draining");
                Ok(())
            }
        }
    } else {
        tracing::info!("serving MCP over stdio");
        tokio::select! {
            res = server.run_stdio() => res,
            () = shutdown_signal() => {
                tracing::info!("shutdown signal received, draining");
                Ok(())
            }
        }
    };

    let disconnected = tokio::time::timeout(Duration::from_secs(5), client.disconnect()).await;
    if disconnected.is_err() {
        tracing::warn!("shutdown deadline exceeded before bridge disconnect completed");
    }

    match run_result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("server error: {e}");
            std::process::ExitCode::from(EXIT_SERVER_ERROR as u8)
        }
    }
}
