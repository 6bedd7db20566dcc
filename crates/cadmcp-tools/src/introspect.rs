//! Introspect category (spec.md §4.6): read-only queries over the active
//! document, console, and connection health.

use serde_json::{Map, Value};

use crate::registry::{optional_i64, optional_str, require_str, TemplateResult};
use crate::safe_repr as repr;

fn list_objects(p: &Map<String, Value>) -> TemplateResult {
    let doc = optional_str(p, "document").unwrap_or("");
    Ok(format!(
        "let objs = app.list_objects({});\nlet _result_ = #{{ objects: objs }};",
        repr::string(doc)
    ))
}

fn search_objects(p: &Map<String, Value>) -> TemplateResult {
    let doc = optional_str(p, "document").unwrap_or("");
    let pattern = require_str(p, "pattern")?;
    Ok(format!(
        "let objs = app.search_objects({}, {});\nlet _result_ = #{{ objects: objs }};",
        repr::string(doc),
        repr::string(pattern),
    ))
}

fn get_object_properties(p: &Map<String, Value>) -> TemplateResult {
    let doc = optional_str(p, "document").unwrap_or("");
    let name = require_str(p, "name")?;
    Ok(format!(
        "let _result_ = app.get_properties({}, {});",
        repr::string(doc),
        repr::string(name),
    ))
}

fn get_console_output(p: &Map<String, Value>) -> TemplateResult {
    let lines = optional_i64(p, "lines", 50);
    Ok(format!(
        "let out = app.console_output({lines});\nlet _result_ = #{{ lines: out }};"
    ))
}

fn get_errors(_p: &Map<String, Value>) -> TemplateResult {
    Ok("let errs = app.errors();\nlet _result_ = #{ errors: errs };".to_string())
}

fn get_version(_p: &Map<String, Value>) -> TemplateResult {
    Ok(format!(
        "let _result_ = #{{ bridge_version: {}, protocol_version: 1, ui_available: ui_available }};",
        repr::string(env!("CARGO_PKG_VERSION")),
    ))
}

fn ping(_p: &Map<String, Value>) -> TemplateResult {
    Ok("let _result_ = #{ status: \"pong\" };".to_string())
}

fn ping_ui(_p: &Map<String, Value>) -> TemplateResult {
    Ok(
        "if !ui_available {\n  let _result_ = #{ success: false, error: \"GUI not available — ping_ui\" };\n} else {\n  gui.fit_all();\n  let _result_ = #{ status: \"pong\", ui: true };\n}"
            .to_string(),
    )
}

crate::define_tools! {
    category: "introspect",
    tools: [
        {
            name: "list_objects",
            description: "List every object in a document.",
            requires_ui: false,
            params: [ { name: "document", ty: "string", required: false } ],
            template: list_objects,
        },
        {
            name: "search_objects",
            description: "Search a document's objects by name or label substring.",
            requires_ui: false,
            params: [
                { name: "document", ty: "string", required: false },
                { name: "pattern", ty: "string", required: true },
            ],
            template: search_objects,
        },
        {
            name: "get_object_properties",
            description: "Return an object's full property set.",
            requires_ui: false,
            params: [
                { name: "document", ty: "string", required: false },
                { name: "name", ty: "string", required: true },
            ],
            template: get_object_properties,
        },
        {
            name: "get_console_output",
            description: "Return the last N lines of captured console output.",
            requires_ui: false,
            params: [ { name: "lines", ty: "integer", required: false } ],
            template: get_console_output,
        },
        {
            name: "get_errors",
            description: "Return every error-level console line seen so far.",
            requires_ui: false,
            params: [],
            template: get_errors,
        },
        {
            name: "get_version",
            description: "Return the bridge and protocol version banner.",
            requires_ui: false,
            params: [],
            template: get_version,
        },
        {
            name: "ping",
            description: "Round-trip check that the bridge executes scripts at all.",
            requires_ui: false,
            params: [],
            template: ping,
        },
        {
            name: "ping_ui",
            description: "Round-trip check that the GUI module is reachable.",
            requires_ui: true,
            params: [],
            template: ping_ui,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use cadmcp_client::{BridgeClient, EmbeddedClient};
    use cadmcp_engine::ExecutionEngine;
    use cadmcp_runtime::RhaiScriptRuntime;

    #[tokio::test]
    async fn ping_replies_pong() {
        let registry = crate::registry::ToolRegistry::new(all());
        let client = EmbeddedClient::new(Arc::new(ExecutionEngine::new(Arc::new(
            RhaiScriptRuntime::new(),
        ))));
        client.connect().await.unwrap();
        let result = crate::registry::invoke(&registry, &client, "ping", Value::Null, 5_000).await;
        assert_eq!(result["status"], "pong");
    }

    #[tokio::test]
    async fn get_errors_reflects_logged_errors() {
        let registry = crate::registry::ToolRegistry::new(all());
        let client = EmbeddedClient::new(Arc::new(ExecutionEngine::new(Arc::new(
            RhaiScriptRuntime::new(),
        ))));
        client.connect().await.unwrap();
        client
            .execute(r#"app.new_document("Part");"#, 5_000)
            .await
            .unwrap();
        let result =
            crate::registry::invoke(&registry, &client, "get_errors", Value::Null, 5_000).await;
        assert_eq!(result["errors"].as_array().unwrap().len(), 0);
    }
}
