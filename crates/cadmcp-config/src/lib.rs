//! Configuration & Lifecycle (spec.md §4.9, §6, C9).
//!
//! Process-level immutable state loaded once at startup. Every field mirrors
//! one of the six environment variables in spec.md §6; `clap`'s `env`
//! attribute gives the documented precedence of explicit flag > env var >
//! default for free, matching the teacher's own CLI-over-env pattern.

use std::time::Duration;

use cadmcp_core::{BridgeError, BridgeResult};
use clap::{Parser, ValueEnum};

/// Bridge client transport selection (spec.md §6 `MODE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "lower")]
pub enum BridgeMode {
    Xmlrpc,
    Socket,
    Embedded,
}

impl Default for BridgeMode {
    fn default() -> Self {
        Self::Xmlrpc
    }
}

/// `bridge-server` takes no positional arguments; every flag is a CLI
/// override of the identically-named environment variable (spec.md §6, §7).
#[derive(Debug, Clone, Parser)]
#[command(name = "bridge-server", about = "CAD MCP bridge adapter")]
pub struct CliArgs {
    /// Bridge client selection.
    #[arg(long, env = "MODE", default_value = "xmlrpc")]
    pub mode: BridgeMode,

    /// Remote host for the socket/xmlrpc client.
    #[arg(long, env = "HOST", default_value = "localhost")]
    pub host: String,

    /// Port X, the XML-RPC server/client port.
    #[arg(long = "xmlrpc-port", env = "XMLRPC_PORT", default_value_t = 9875)]
    pub xmlrpc_port: u16,

    /// Port Y, the line-JSON server/client port.
    #[arg(long = "socket-port", env = "SOCKET_PORT", default_value_t = 9876)]
    pub socket_port: u16,

    /// Default per-call script timeout, in milliseconds.
    #[arg(long = "timeout-ms", env = "TIMEOUT_MS", default_value_t = 30_000)]
    pub timeout_ms: u64,

    /// Filesystem path to the CAD shared library (embedded mode only).
    #[arg(long = "runtime-path", env = "RUNTIME_PATH")]
    pub runtime_path: Option<String>,

    /// Optional HTTP bind address; when present the adapter runs the HTTP
    /// MCP transport instead of stdio.
    #[arg(long = "http-addr", env = "HTTP_ADDR")]
    pub http_addr: Option<String>,
}

/// Validated, immutable configuration derived from [`CliArgs`].
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub mode: BridgeMode,
    pub host: String,
    pub xmlrpc_port: u16,
    pub socket_port: u16,
    pub timeout: Duration,
    pub runtime_path: Option<String>,
    pub http_addr: Option<std::net::SocketAddr>,
}

impl BridgeConfig {
    /// Validate `args`, producing `ConfigInvalid` (spec.md §7) on the first
    /// violation.
    pub fn from_args(args: CliArgs) -> BridgeResult<Self> {
        if args.host.trim().is_empty() {
            return Err(BridgeError::ConfigInvalid("HOST must not be empty".into()));
        }
        if args.timeout_ms == 0 {
            return Err(BridgeError::ConfigInvalid(
                "TIMEOUT_MS must be a positive integer".into(),
            ));
        }
        if args.mode == BridgeMode::Embedded && args.runtime_path.is_none() {
            tracing::warn!(
                "MODE=embedded with no RUNTIME_PATH set; relying on auto-detection"
            );
        }

        let http_addr = match &args.http_addr {
            Some(raw) => Some(raw.parse().map_err(|e| {
                BridgeError::ConfigInvalid(format!("HTTP_ADDR '{raw}' is not a socket address: {e}"))
            })?),
            None => None,
        };

        Ok(Self {
            mode: args.mode,
            host: args.host,
            xmlrpc_port: args.xmlrpc_port,
            socket_port: args.socket_port,
            timeout: Duration::from_millis(args.timeout_ms),
            runtime_path: args.runtime_path,
            http_addr,
        })
    }

    /// Parse from `std::env`/`argv` and validate in one step.
    pub fn load() -> BridgeResult<Self> {
        Self::from_args(CliArgs::parse())
    }
}

/// Exponential-backoff connect-retry budget (SPEC_FULL.md §5, resolving the
/// spec's `[Connecting]` retry-budget Open Question): 250ms initial delay,
/// doubling, capped at 5s, 10 attempts max (~27s total) before `Failed`.
#[derive(Debug, Clone, Copy)]
pub struct RetryBudget {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            max_attempts: 10,
        }
    }
}

impl RetryBudget {
    /// The delay before attempt `attempt` (1-indexed).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let millis = self.initial_delay.as_millis() as u64 * 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(millis).min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(mode: BridgeMode, host: &str, timeout_ms: u64) -> CliArgs {
        CliArgs {
            mode,
            host: host.to_string(),
            xmlrpc_port: 9875,
            socket_port: 9876,
            timeout_ms,
            runtime_path: None,
            http_addr: None,
        }
    }

    #[test]
    fn empty_host_is_config_invalid() {
        let err = BridgeConfig::from_args(args(BridgeMode::Xmlrpc, "", 30_000)).unwrap_err();
        assert_eq!(err.kind(), cadmcp_core::ErrorKind::ConfigInvalid);
    }

    #[test]
    fn zero_timeout_is_config_invalid() {
        let err = BridgeConfig::from_args(args(BridgeMode::Xmlrpc, "localhost", 0)).unwrap_err();
        assert_eq!(err.kind(), cadmcp_core::ErrorKind::ConfigInvalid);
    }

    #[test]
    fn valid_args_produce_config() {
        let cfg = BridgeConfig::from_args(args(BridgeMode::Socket, "localhost", 5_000)).unwrap();
        assert_eq!(cfg.mode, BridgeMode::Socket);
        assert_eq!(cfg.timeout, Duration::from_millis(5_000));
    }

    #[test]
    fn retry_budget_doubles_and_caps() {
        let b = RetryBudget::default();
        assert_eq!(b.delay_for(1), Duration::from_millis(250));
        assert_eq!(b.delay_for(2), Duration::from_millis(500));
        assert_eq!(b.delay_for(4), Duration::from_millis(2_000));
        assert_eq!(b.delay_for(20), Duration::from_secs(5));
    }
}
