//! Shared types and error kinds for the CAD MCP bridge.
//!
//! Every other `cadmcp-*` crate depends on this one for the wire-level data
//! model (spec §3) and the single symbolic [`error::ErrorKind`] vocabulary
//! (spec §7) so that `error_kind` is identical across the XML-RPC, JSON-line,
//! and MCP surfaces.

pub mod error;
pub mod model;
pub mod wire;

pub use error::{BridgeError, BridgeResult, ErrorKind};
pub use model::{
    ConnectionState, ConsoleLevel, ConsoleLine, DocumentSummary, ExecutionRequest,
    ExecutionResult, Method, ObjectDetails, RequestIdAllocator, ResourceDescriptor,
    ToolDescriptor, VersionInfo, DEFAULT_TIMEOUT_MS,
};
pub use wire::{JsonLineError, JsonLineOutcome, JsonLineRequest, JsonLineResponse};
