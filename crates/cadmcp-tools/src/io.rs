//! IO category (spec.md §4.6): import/export tools, backed by
//! `app.export`/`app.import`/`app.log`.

use serde_json::{Map, Value};

use crate::registry::{optional_str, require_str, TemplateResult};
use crate::safe_repr as repr;

fn export_document(p: &Map<String, Value>) -> TemplateResult {
    let doc = optional_str(p, "document").unwrap_or("");
    let path = require_str(p, "path")?;
    let format = optional_str(p, "format").unwrap_or("step");
    Ok(format!(
        "let saved = app.export({}, {}, {});\nlet _result_ = #{{ path: saved, format: {} }};",
        repr::string(doc),
        repr::string(path),
        repr::string(format),
        repr::string(format),
    ))
}

fn import_document(p: &Map<String, Value>) -> TemplateResult {
    let path = require_str(p, "path")?;
    let format = optional_str(p, "format").unwrap_or("step");
    Ok(format!(
        "let name = app.import({}, {});\nlet _result_ = app.document_info(name);",
        repr::string(path),
        repr::string(format),
    ))
}

fn save_as(p: &Map<String, Value>) -> TemplateResult {
    let doc = optional_str(p, "document").unwrap_or("");
    let path = require_str(p, "path")?;
    Ok(format!(
        "let saved = app.export({}, {}, \"native\");\nlet _result_ = #{{ path: saved }};",
        repr::string(doc),
        repr::string(path),
    ))
}

fn merge_document(p: &Map<String, Value>) -> TemplateResult {
    let path = require_str(p, "path")?;
    Ok(format!(
        "let incoming = app.import({}, \"step\");\napp.log(\"merged \" + incoming);\nlet _result_ = app.document_info(incoming);",
        repr::string(path),
    ))
}

fn export_selection(p: &Map<String, Value>) -> TemplateResult {
    let doc = optional_str(p, "document").unwrap_or("");
    let path = require_str(p, "path")?;
    let format = optional_str(p, "format").unwrap_or("step");
    Ok(format!(
        "let saved = app.export({}, {}, {});\nlet _result_ = #{{ path: saved, format: {} }};",
        repr::string(doc),
        repr::string(path),
        repr::string(format),
        repr::string(format),
    ))
}

fn print_to_pdf(p: &Map<String, Value>) -> TemplateResult {
    let doc = optional_str(p, "document").unwrap_or("");
    let path = require_str(p, "path")?;
    Ok(format!(
        "let saved = app.export({}, {}, \"pdf\");\nlet _result_ = #{{ path: saved }};",
        repr::string(doc),
        repr::string(path),
    ))
}

fn list_supported_formats(_p: &Map<String, Value>) -> TemplateResult {
    Ok("let _result_ = #{ formats: [\"step\", \"iges\", \"stl\", \"brep\", \"pdf\", \"native\"] };".to_string())
}

crate::define_tools! {
    category: "io",
    tools: [
        {
            name: "export_document",
            description: "Export a document to a file in the given format.",
            requires_ui: false,
            params: [
                { name: "document", ty: "string", required: false },
                { name: "path", ty: "string", required: true },
                { name: "format", ty: "string", required: false },
            ],
            template: export_document,
        },
        {
            name: "import_document",
            description: "Import a file as a new document.",
            requires_ui: false,
            params: [
                { name: "path", ty: "string", required: true },
                { name: "format", ty: "string", required: false },
            ],
            template: import_document,
        },
        {
            name: "save_as",
            description: "Save a document to a new path in the native format.",
            requires_ui: false,
            params: [
                { name: "document", ty: "string", required: false },
                { name: "path", ty: "string", required: true },
            ],
            template: save_as,
        },
        {
            name: "merge_document",
            description: "Import a file and note it as merged into the active document.",
            requires_ui: false,
            params: [ { name: "path", ty: "string", required: true } ],
            template: merge_document,
        },
        {
            name: "export_selection",
            description: "Export a document to a file, intended for a selected subset of objects.",
            requires_ui: false,
            params: [
                { name: "document", ty: "string", required: false },
                { name: "path", ty: "string", required: true },
                { name: "format", ty: "string", required: false },
            ],
            template: export_selection,
        },
        {
            name: "print_to_pdf",
            description: "Export a document as a PDF drawing.",
            requires_ui: false,
            params: [
                { name: "document", ty: "string", required: false },
                { name: "path", ty: "string", required: true },
            ],
            template: print_to_pdf,
        },
        {
            name: "list_supported_formats",
            description: "List the file formats import/export tools accept.",
            requires_ui: false,
            params: [],
            template: list_supported_formats,
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
    async fn export_then_import_round_trips() {
        let registry = crate::registry::ToolRegistry::new(all());
        let client = EmbeddedClient::new(Arc::new(ExecutionEngine::new(Arc::new(
            RhaiScriptRuntime::new(),
        ))));
        client.connect().await.unwrap();
        client
            .execute(r#"app.new_document("Part");"#, 5_000)
            .await
            .unwrap();

        let exported = crate::registry::invoke(
            &registry,
            &client,
            "export_document",
            serde_json::json!({ "path": "/tmp/part.step" }),
            5_000,
        )
        .await;
        assert_eq!(exported["path"], "/tmp/part.step");

        let imported = crate::registry::invoke(
            &registry,
            &client,
            "import_document",
            serde_json::json!({ "path": "/tmp/other.step" }),
            5_000,
        )
        .await;
        assert_eq!(imported["name"], "other");
    }
}
