//! Line-delimited JSON-RPC wire shapes (spec.md §4.4, §6), shared by the
//! `cadmcp-jsonline` server and the socket half of `cadmcp-client` so both
//! sides serialize/deserialize the identical frame.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ErrorKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonLineRequest {
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonLineError {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonLineResponse {
    pub id: u64,
    #[serde(flatten)]
    pub outcome: JsonLineOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonLineOutcome {
    Result { result: Value },
    Error { error: JsonLineError },
}

impl JsonLineResponse {
    pub fn ok(id: u64, result: Value) -> Self {
        Self {
            id,
            outcome: JsonLineOutcome::Result { result },
        }
    }

    pub fn err(id: u64, kind: ErrorKind, message: impl Into<String>, traceback: Option<String>) -> Self {
        Self {
            id,
            outcome: JsonLineOutcome::Error {
                error: JsonLineError {
                    kind,
                    message: message.into(),
                    traceback,
                },
            },
        }
    }
}
