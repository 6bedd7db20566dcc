//! Documents category (spec.md §4.6): document lifecycle tools, backed by
//! `app.*` bindings in `cadmcp_runtime::rhai_runtime::AppHandle`.

use serde_json::{Map, Value};

use crate::registry::{optional_str, require_str, TemplateResult};
use crate::safe_repr as repr;

fn create_document(p: &Map<String, Value>) -> TemplateResult {
    let name = require_str(p, "name")?;
    Ok(format!(
        "let name = app.new_document({});\nlet _result_ = app.document_info(name);",
        repr::string(name)
    ))
}

fn open_document(p: &Map<String, Value>) -> TemplateResult {
    let path = require_str(p, "path")?;
    Ok(format!(
        "let name = app.open_document({});\nlet _result_ = app.document_info(name);",
        repr::string(path)
    ))
}

fn save_document(p: &Map<String, Value>) -> TemplateResult {
    let doc = optional_str(p, "document").unwrap_or("");
    Ok(format!(
        "let name = app.save_document({});\nlet _result_ = app.document_info(name);",
        repr::string(doc)
    ))
}

fn close_document(p: &Map<String, Value>) -> TemplateResult {
    let name = require_str(p, "name")?;
    Ok(format!(
        "app.close_document({});\nlet _result_ = #{{ closed: {} }};",
        repr::string(name),
        repr::string(name)
    ))
}

fn list_documents(_p: &Map<String, Value>) -> TemplateResult {
    Ok("let docs = app.list_documents();\nlet _result_ = #{ documents: docs };".to_string())
}

fn activate_document(p: &Map<String, Value>) -> TemplateResult {
    let name = require_str(p, "name")?;
    Ok(format!(
        "app.activate_document({});\nlet _result_ = app.document_info({});",
        repr::string(name),
        repr::string(name)
    ))
}

fn get_active_document(_p: &Map<String, Value>) -> TemplateResult {
    Ok("let _result_ = #{ active: app.active_document() };".to_string())
}

fn get_document_info(p: &Map<String, Value>) -> TemplateResult {
    let doc = optional_str(p, "document").unwrap_or("");
    Ok(format!(
        "let _result_ = app.document_info({});",
        repr::string(doc)
    ))
}

crate::define_tools! {
    category: "documents",
    tools: [
        {
            name: "create_document",
            description: "Create a new, empty CAD document and make it active.",
            requires_ui: false,
            params: [ { name: "name", ty: "string", required: true } ],
            template: create_document,
        },
        {
            name: "open_document",
            description: "Open an existing document from a file path.",
            requires_ui: false,
            params: [ { name: "path", ty: "string", required: true } ],
            template: open_document,
        },
        {
            name: "save_document",
            description: "Save a document, defaulting to the active one.",
            requires_ui: false,
            params: [ { name: "document", ty: "string", required: false } ],
            template: save_document,
        },
        {
            name: "close_document",
            description: "Close an open document by name.",
            requires_ui: false,
            params: [ { name: "name", ty: "string", required: true } ],
            template: close_document,
        },
        {
            name: "list_documents",
            description: "List every open document.",
            requires_ui: false,
            params: [],
            template: list_documents,
        },
        {
            name: "activate_document",
            description: "Make a document the active one.",
            requires_ui: false,
            params: [ { name: "name", ty: "string", required: true } ],
            template: activate_document,
        },
        {
            name: "get_active_document",
            description: "Return the currently active document, if any.",
            requires_ui: false,
            params: [],
            template: get_active_document,
        },
        {
            name: "get_document_info",
            description: "Return summary details for a document, defaulting to the active one.",
            requires_ui: false,
            params: [ { name: "document", ty: "string", required: false } ],
            template: get_document_info,
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

    fn client() -> EmbeddedClient {
        EmbeddedClient::new(Arc::new(ExecutionEngine::new(Arc::new(
            RhaiScriptRuntime::new(),
        ))))
    }

    #[tokio::test]
    async fn create_then_list_round_trips() {
        let registry = crate::registry::ToolRegistry::new(all());
        let client = client();
        client.connect().await.unwrap();

        let created = crate::registry::invoke(
            &registry,
            &client,
            "create_document",
            serde_json::json!({ "name": "Part" }),
            5_000,
        )
        .await;
        assert_eq!(created["name"], "Part");

        let listed = crate::registry::invoke(
            &registry,
            &client,
            "list_documents",
            Value::Null,
            5_000,
        )
        .await;
        assert_eq!(listed["documents"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_required_param_short_circuits_without_bridge_call() {
        let registry = crate::registry::ToolRegistry::new(all());
        let client = client();
        let result = crate::registry::invoke(
            &registry,
            &client,
            "create_document",
            serde_json::json!({}),
            5_000,
        )
        .await;
        assert_eq!(result["success"], Value::Bool(false));
        assert!(!client.is_connected());
    }
}
