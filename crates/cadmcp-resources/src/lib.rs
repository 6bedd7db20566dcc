//! Resource Registry (spec.md §4.7, C7).
//!
//! Each resource is a URI pattern (`{name}`-style placeholders) paired with
//! a read function that builds a small script, runs it through the bridge,
//! and serializes the payload as a JSON string — the same script-template
//! discipline `cadmcp-tools` uses for tools. The one exception is
//! `cadmcp://capabilities`, which needs no script at all: it's a manifest
//! assembled directly from the tool and resource registries so the
//! discovery surface can never drift out of sync with what's actually
//! registered (spec.md §4.7 "MUST be kept in sync with the registries").

use std::collections::BTreeMap;

use cadmcp_client::BridgeClient;
use cadmcp_core::ResourceDescriptor;
use cadmcp_tools::ToolRegistry;
use serde_json::{Map, Value};

pub const CAPABILITIES_URI: &str = "cadmcp://capabilities";

#[derive(Debug, Clone, thiserror::Error)]
pub enum ResourceError {
    #[error("no resource matches uri '{0}'")]
    NoMatch(String),
    #[error("{0}")]
    Bridge(String),
    #[error("resource produced no structured payload")]
    NoPayload,
}

pub type ResourceReaderFn = fn(&BTreeMap<String, String>) -> String;

pub struct ResourceEntry {
    pub descriptor: ResourceDescriptor,
    pub reader: ResourceReaderFn,
}

/// Split a `{name}`-style URI pattern into a literal/placeholder segment
/// list, matched against an incoming URI one `/`-delimited segment at a
/// time.
fn match_pattern(pattern: &str, uri: &str) -> Option<BTreeMap<String, String>> {
    let pattern_segments: Vec<&str> = pattern.split('/').collect();
    let uri_segments: Vec<&str> = uri.split('/').collect();
    if pattern_segments.len() != uri_segments.len() {
        return None;
    }
    let mut captures = BTreeMap::new();
    for (p, u) in pattern_segments.iter().zip(uri_segments.iter()) {
        if let Some(name) = p.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            captures.insert(name.to_string(), u.to_string());
        } else if p != u {
            return None;
        }
    }
    Some(captures)
}

fn documents_list(_c: &BTreeMap<String, String>) -> String {
    "let docs = app.list_documents();\nlet _result_ = #{ documents: docs };".to_string()
}

fn document_detail(c: &BTreeMap<String, String>) -> String {
    let name = c.get("name").cloned().unwrap_or_default();
    format!(
        "let _result_ = app.document_info({});",
        cadmcp_tools::safe_repr::string(&name)
    )
}

fn console_output(_c: &BTreeMap<String, String>) -> String {
    "let out = app.console_output(200);\nlet _result_ = #{ lines: out };".to_string()
}

fn errors(_c: &BTreeMap<String, String>) -> String {
    "let errs = app.errors();\nlet _result_ = #{ errors: errs };".to_string()
}

fn macros_list(_c: &BTreeMap<String, String>) -> String {
    "let names = app.list_macros();\nlet _result_ = #{ macros: names };".to_string()
}

/// `true` iff `uri` matches `pattern`'s `{name}`-style placeholders. Exposed
/// so the MCP adapter (C8) can implement `ResourceHandler::exists` without
/// re-deriving the dispatch table's own matching logic.
pub fn matches_uri(pattern: &str, uri: &str) -> bool {
    match_pattern(pattern, uri).is_some()
}

pub struct ResourceRegistry {
    entries: Vec<ResourceEntry>,
}

impl ResourceRegistry {
    pub fn new(entries: Vec<ResourceEntry>) -> Self {
        Self { entries }
    }

    /// The built-in catalog (spec.md §4.7): document listing/detail,
    /// console output, errors, and the stored-macro list. The
    /// `cadmcp://capabilities` manifest is listed here too, for
    /// discoverability, but [`ResourceRegistry::read`] special-cases it.
    pub fn full() -> Self {
        Self::new(vec![
            ResourceEntry {
                descriptor: ResourceDescriptor {
                    uri_pattern: CAPABILITIES_URI.to_string(),
                    description: "Manifest of every registered tool and resource.".to_string(),
                },
                reader: documents_list, // unused: special-cased in `read`
            },
            ResourceEntry {
                descriptor: ResourceDescriptor {
                    uri_pattern: "cadmcp://documents".to_string(),
                    description: "List every open document.".to_string(),
                },
                reader: documents_list,
            },
            ResourceEntry {
                descriptor: ResourceDescriptor {
                    uri_pattern: "cadmcp://documents/{name}".to_string(),
                    description: "Summary detail for a single document.".to_string(),
                },
                reader: document_detail,
            },
            ResourceEntry {
                descriptor: ResourceDescriptor {
                    uri_pattern: "cadmcp://console".to_string(),
                    description: "The last 200 lines of captured console output.".to_string(),
                },
                reader: console_output,
            },
            ResourceEntry {
                descriptor: ResourceDescriptor {
                    uri_pattern: "cadmcp://errors".to_string(),
                    description: "Every error-level console line seen so far.".to_string(),
                },
                reader: errors,
            },
            ResourceEntry {
                descriptor: ResourceDescriptor {
                    uri_pattern: "cadmcp://macros".to_string(),
                    description: "List every stored macro name.".to_string(),
                },
                reader: macros_list,
            },
        ])
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&self, uri: &str) -> Option<(&ResourceEntry, BTreeMap<String, String>)> {
        self.entries
            .iter()
            .find_map(|e| match_pattern(&e.descriptor.uri_pattern, uri).map(|c| (e, c)))
    }

    /// Build the `cadmcp://capabilities` manifest: every tool descriptor
    /// from `tools`, every resource descriptor from `self`, serialized as
    /// one JSON object (spec.md §4.7).
    pub fn capabilities_manifest(&self, tools: &ToolRegistry) -> Value {
        let tool_list: Vec<Value> = tools
            .descriptors()
            .map(|d| serde_json::to_value(d).unwrap_or(Value::Null))
            .collect();
        let resource_list: Vec<Value> = self
            .descriptors()
            .map(|d| serde_json::to_value(d).unwrap_or(Value::Null))
            .collect();
        let mut manifest = Map::new();
        manifest.insert("tools".into(), Value::Array(tool_list));
        manifest.insert("resources".into(), Value::Array(resource_list));
        Value::Object(manifest)
    }

    /// Read `uri`, returning its payload serialized as a JSON string
    /// (spec.md §4.7 "returns the payload as a JSON string").
    pub async fn read(
        &self,
        client: &dyn BridgeClient,
        tools: &ToolRegistry,
        uri: &str,
        timeout_ms: u64,
    ) -> Result<String, ResourceError> {
        if uri == CAPABILITIES_URI {
            let manifest = self.capabilities_manifest(tools);
            return serde_json::to_string(&manifest).map_err(|e| ResourceError::Bridge(e.to_string()));
        }

        let Some((entry, captures)) = self.find(uri) else {
            return Err(ResourceError::NoMatch(uri.to_string()));
        };
        let script = (entry.reader)(&captures);
        let result = client
            .execute(&script, timeout_ms)
            .await
            .map_err(|e| ResourceError::Bridge(e.to_string()))?;
        if !result.success {
            return Err(ResourceError::Bridge(
                result.error_message.unwrap_or_default(),
            ));
        }
        if !result.result.is_object() {
            return Err(ResourceError::NoPayload);
        }
        serde_json::to_string(&result.result).map_err(|e| ResourceError::Bridge(e.to_string()))
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use cadmcp_client::EmbeddedClient;
    use cadmcp_engine::ExecutionEngine;
    use cadmcp_runtime::RhaiScriptRuntime;

    fn client() -> EmbeddedClient {
        EmbeddedClient::new(Arc::new(ExecutionEngine::new(Arc::new(
            RhaiScriptRuntime::new(),
        ))))
    }

    #[test]
    fn match_pattern_extracts_placeholder() {
        let captures = match_pattern("cadmcp://documents/{name}", "cadmcp://documents/Part").unwrap();
        assert_eq!(captures.get("name").unwrap(), "Part");
    }

    #[test]
    fn match_pattern_rejects_segment_count_mismatch() {
        assert!(match_pattern("cadmcp://documents/{name}", "cadmcp://documents").is_none());
    }

    #[tokio::test]
    async fn capabilities_manifest_is_superset_of_both_registries() {
        let resources = ResourceRegistry::full();
        let tools = ToolRegistry::full();
        let client = client();
        client.connect().await.unwrap();

        let payload = resources
            .read(&client, &tools, CAPABILITIES_URI, 5_000)
            .await
            .unwrap();
        let manifest: Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(manifest["tools"].as_array().unwrap().len(), tools.len());
        assert_eq!(
            manifest["resources"].as_array().unwrap().len(),
            resources.len()
        );
    }

    #[tokio::test]
    async fn documents_resource_round_trips_with_create() {
        let resources = ResourceRegistry::full();
        let tools = ToolRegistry::full();
        let client = client();
        client.connect().await.unwrap();
        client
            .execute(r#"app.new_document("Part");"#, 5_000)
            .await
            .unwrap();

        let payload = resources
            .read(&client, &tools, "cadmcp://documents", 5_000)
            .await
            .unwrap();
        let parsed: Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(parsed["documents"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_uri_is_no_match() {
        let resources = ResourceRegistry::full();
        let tools = ToolRegistry::full();
        let client = client();
        client.connect().await.unwrap();
        let err = resources
            .read(&client, &tools, "cadmcp://unknown", 5_000)
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::NoMatch(_)));
    }
}
