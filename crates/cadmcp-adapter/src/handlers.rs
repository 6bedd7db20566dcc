//! Handler adapters (spec.md §4.8, C8): every [`ToolDescriptor`]/
//! [`ResourceDescriptor`] in the registries becomes one `turbomcp_server`
//! handler, wired to the shared bridge client. The teacher's
//! `demo/src/main.rs` registers one `FunctionToolHandler` per literal tool;
//! here the registries are large and data-driven, so one generic handler
//! type wraps every descriptor instead.

use std::sync::Arc;

use async_trait::async_trait;
use cadmcp_client::BridgeClient;
use cadmcp_core::{ResourceDescriptor, ToolDescriptor};
use cadmcp_resources::ResourceRegistry;
use cadmcp_tools::ToolRegistry;
use serde_json::{Map, Value};
use turbomcp_protocol::types::{
    CallToolRequest, CallToolResult, ContentBlock, ReadResourceRequest, ReadResourceResult,
    Resource, ResourceContent, TextContent, TextResourceContents, Tool, ToolInputSchema,
};
use turbomcp_protocol::RequestContext;
use turbomcp_server::handlers::{ResourceHandler, ToolHandler};
use turbomcp_server::{ServerError, ServerResult};

/// `ToolDescriptor::input_schema` is already JSON-Schema shaped
/// (`cadmcp_tools::registry::schema`); this just reshapes it into the
/// concrete struct `turbomcp_protocol` wants on the wire.
fn to_input_schema(schema: &Value) -> ToolInputSchema {
    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .map(|o| o.iter().map(|(k, v)| (k.clone(), v.clone())).collect());
    let required = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .filter(|v: &Vec<String>| !v.is_empty());
    ToolInputSchema {
        schema_type: "object".to_string(),
        properties,
        required,
        additional_properties: Some(true),
    }
}

/// Build a `CallToolResult` from the dict `cadmcp_tools::invoke` returns.
/// spec.md §4.8: "each tool returns its `dict` verbatim to the MCP
/// client" — a tool-level failure is still a successful MCP call, just with
/// `isError` set and the dict echoed as both text and structured content.
fn dict_to_call_result(dict: Value) -> CallToolResult {
    let is_error = matches!(dict.get("success"), Some(Value::Bool(false)));
    let text = serde_json::to_string(&dict).unwrap_or_else(|_| "{}".to_string());
    CallToolResult {
        content: vec![ContentBlock::Text(TextContent {
            text,
            annotations: None,
            meta: None,
        })],
        is_error: Some(is_error),
        structured_content: Some(dict),
        _meta: None,
    }
}

pub struct RegistryToolHandler {
    descriptor: ToolDescriptor,
    tools: Arc<ToolRegistry>,
    client: Arc<dyn BridgeClient>,
    timeout_ms: u64,
}

impl RegistryToolHandler {
    pub fn new(
        descriptor: ToolDescriptor,
        tools: Arc<ToolRegistry>,
        client: Arc<dyn BridgeClient>,
        timeout_ms: u64,
    ) -> Self {
        Self {
            descriptor,
            tools,
            client,
            timeout_ms,
        }
    }
}

#[async_trait]
impl ToolHandler for RegistryToolHandler {
    async fn handle(
        &self,
        request: CallToolRequest,
        _ctx: RequestContext,
    ) -> ServerResult<CallToolResult> {
        let params = match request.arguments {
            Some(args) => Value::Object(args.into_iter().collect::<Map<String, Value>>()),
            None => Value::Null,
        };
        let dict = cadmcp_tools::invoke(
            &self.tools,
            self.client.as_ref(),
            &self.descriptor.name,
            params,
            self.timeout_ms,
        )
        .await;
        Ok(dict_to_call_result(dict))
    }

    fn tool_definition(&self) -> Tool {
        Tool {
            name: self.descriptor.name.clone(),
            title: None,
            description: Some(self.descriptor.description.clone()),
            input_schema: to_input_schema(&self.descriptor.input_schema),
            output_schema: None,
            annotations: None,
            meta: None,
        }
    }
}

pub struct RegistryResourceHandler {
    descriptor: ResourceDescriptor,
    tools: Arc<ToolRegistry>,
    resources: Arc<ResourceRegistry>,
    client: Arc<dyn BridgeClient>,
    timeout_ms: u64,
}

impl RegistryResourceHandler {
    pub fn new(
        descriptor: ResourceDescriptor,
        tools: Arc<ToolRegistry>,
        resources: Arc<ResourceRegistry>,
        client: Arc<dyn BridgeClient>,
        timeout_ms: u64,
    ) -> Self {
        Self {
            descriptor,
            tools,
            resources,
            client,
            timeout_ms,
        }
    }
}

#[async_trait]
impl ResourceHandler for RegistryResourceHandler {
    async fn handle(
        &self,
        request: ReadResourceRequest,
        _ctx: turbomcp_core::RequestContext,
    ) -> ServerResult<ReadResourceResult> {
        let payload = self
            .resources
            .read(
                self.client.as_ref(),
                &self.tools,
                &request.uri,
                self.timeout_ms,
            )
            .await
            .map_err(|e| ServerError::Handler {
                message: e.to_string(),
                context: Some(request.uri.clone()),
            })?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContent::Text(TextResourceContents {
                uri: request.uri,
                mime_type: Some("application/json".to_string()),
                text: payload,
                meta: None,
            })],
            _meta: None,
        })
    }

    fn resource_definition(&self) -> Resource {
        Resource {
            name: self.descriptor.uri_pattern.clone(),
            title: None,
            uri: self.descriptor.uri_pattern.clone(),
            description: Some(self.descriptor.description.clone()),
            mime_type: Some("application/json".to_string()),
            annotations: None,
            size: None,
            meta: None,
        }
    }

    async fn exists(&self, uri: &str) -> bool {
        cadmcp_resources::matches_uri(&self.descriptor.uri_pattern, uri)
    }
}

/// Build one [`RegistryToolHandler`] per catalog entry, named for the
/// `ServerBuilder::tool` registration loop in `main`.
pub fn tool_handlers(
    tools: &Arc<ToolRegistry>,
    client: &Arc<dyn BridgeClient>,
    timeout_ms: u64,
) -> Vec<(String, RegistryToolHandler)> {
    tools
        .descriptors()
        .map(|d| {
            (
                d.name.clone(),
                RegistryToolHandler::new(d.clone(), tools.clone(), client.clone(), timeout_ms),
            )
        })
        .collect()
}

/// Build one [`RegistryResourceHandler`] per catalog entry.
pub fn resource_handlers(
    tools: &Arc<ToolRegistry>,
    resources: &Arc<ResourceRegistry>,
    client: &Arc<dyn BridgeClient>,
    timeout_ms: u64,
) -> Vec<(String, RegistryResourceHandler)> {
    resources
        .descriptors()
        .map(|d| {
            (
                d.uri_pattern.clone(),
                RegistryResourceHandler::new(
                    d.clone(),
                    tools.clone(),
                    resources.clone(),
                    client.clone(),
                    timeout_ms,
                ),
            )
        })
        .collect()
}
