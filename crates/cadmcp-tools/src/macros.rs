//! Macros category (spec.md §4.6): stored-script CRUD, backed by
//! `app.list_macros`/`app.run_macro`/`app.create_macro`/`app.delete_macro`.

use serde_json::{Map, Value};

use crate::registry::{require_str, TemplateResult};
use crate::safe_repr as repr;

fn list_macros(_p: &Map<String, Value>) -> TemplateResult {
    Ok("let names = app.list_macros();\nlet _result_ = #{ macros: names };".to_string())
}

fn run_macro(p: &Map<String, Value>) -> TemplateResult {
    let name = require_str(p, "name")?;
    Ok(format!(
        "let msg = app.run_macro({});\nlet _result_ = #{{ name: {}, ran: msg }};",
        repr::string(name),
        repr::string(name),
    ))
}

fn create_macro(p: &Map<String, Value>) -> TemplateResult {
    let name = require_str(p, "name")?;
    let code = require_str(p, "code")?;
    Ok(format!(
        "app.create_macro({}, {});\nlet _result_ = #{{ created: {} }};",
        repr::string(name),
        repr::string(code),
        repr::string(name),
    ))
}

fn delete_macro(p: &Map<String, Value>) -> TemplateResult {
    let name = require_str(p, "name")?;
    Ok(format!(
        "app.delete_macro({});\nlet _result_ = #{{ deleted: {} }};",
        repr::string(name),
        repr::string(name),
    ))
}

crate::define_tools! {
    category: "macros",
    tools: [
        {
            name: "list_macros",
            description: "List every stored macro name.",
            requires_ui: false,
            params: [],
            template: list_macros,
        },
        {
            name: "run_macro",
            description: "Run a previously stored macro by name.",
            requires_ui: false,
            params: [ { name: "name", ty: "string", required: true } ],
            template: run_macro,
        },
        {
            name: "create_macro",
            description: "Store a named macro's source code.",
            requires_ui: false,
            params: [
                { name: "name", ty: "string", required: true },
                { name: "code", ty: "string", required: true },
            ],
            template: create_macro,
        },
        {
            name: "delete_macro",
            description: "Delete a stored macro by name.",
            requires_ui: false,
            params: [ { name: "name", ty: "string", required: true } ],
            template: delete_macro,
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
    async fn create_then_run_then_delete_macro() {
        let registry = crate::registry::ToolRegistry::new(all());
        let client = EmbeddedClient::new(Arc::new(ExecutionEngine::new(Arc::new(
            RhaiScriptRuntime::new(),
        ))));
        client.connect().await.unwrap();

        let created = crate::registry::invoke(
            &registry,
            &client,
            "create_macro",
            serde_json::json!({ "name": "demo", "code": "app.log(\"hi\");" }),
            5_000,
        )
        .await;
        assert_eq!(created["created"], "demo");

        let ran = crate::registry::invoke(
            &registry,
            &client,
            "run_macro",
            serde_json::json!({ "name": "demo" }),
            5_000,
        )
        .await;
        assert_eq!(ran["name"], "demo");

        let deleted = crate::registry::invoke(
            &registry,
            &client,
            "delete_macro",
            serde_json::json!({ "name": "demo" }),
            5_000,
        )
        .await;
        assert_eq!(deleted["deleted"], "demo");
    }
}
