//! Modeling category (spec.md §4.6): boolean, transform, and property
//! editing tools, backed by `app.boolean_op`/`app.transform_object`/
//! `app.set_property`/`app.delete_object`.

use serde_json::{Map, Value};

use crate::registry::{optional_bool, optional_f64, optional_str, require_str, TemplateResult};
use crate::safe_repr as repr;

fn boolean(p: &Map<String, Value>, op: &str) -> TemplateResult {
    let doc = optional_str(p, "document").unwrap_or("");
    let a = require_str(p, "base")?;
    let b = require_str(p, "tool")?;
    Ok(format!(
        "let name = app.boolean_op({}, {}, {}, {});\nlet _result_ = app.get_properties({}, name);",
        repr::string(doc),
        repr::string(op),
        repr::string(a),
        repr::string(b),
        repr::string(doc),
    ))
}

fn boolean_union(p: &Map<String, Value>) -> TemplateResult {
    boolean(p, "union")
}

fn boolean_cut(p: &Map<String, Value>) -> TemplateResult {
    boolean(p, "cut")
}

fn boolean_intersection(p: &Map<String, Value>) -> TemplateResult {
    boolean(p, "intersection")
}

fn translate_object(p: &Map<String, Value>) -> TemplateResult {
    let doc = optional_str(p, "document").unwrap_or("");
    let name = require_str(p, "name")?;
    let dx = optional_f64(p, "dx", 0.0);
    let dy = optional_f64(p, "dy", 0.0);
    let dz = optional_f64(p, "dz", 0.0);
    Ok(format!(
        "app.transform_object({}, {}, {}, {}, {});\nlet _result_ = app.get_properties({}, {});",
        repr::string(doc),
        repr::string(name),
        repr::number(dx),
        repr::number(dy),
        repr::number(dz),
        repr::string(doc),
        repr::string(name),
    ))
}

fn set_numeric_property(p: &Map<String, Value>, key: &str, param: &str, default: f64) -> TemplateResult {
    let doc = optional_str(p, "document").unwrap_or("");
    let name = require_str(p, "name")?;
    let value = optional_f64(p, param, default);
    Ok(format!(
        "app.set_property({}, {}, {}, {});\nlet _result_ = app.get_properties({}, {});",
        repr::string(doc),
        repr::string(name),
        repr::string(key),
        repr::number(value),
        repr::string(doc),
        repr::string(name),
    ))
}

fn scale_object(p: &Map<String, Value>) -> TemplateResult {
    set_numeric_property(p, "scale", "factor", 1.0)
}

fn rotate_object(p: &Map<String, Value>) -> TemplateResult {
    set_numeric_property(p, "rotation_deg", "angle", 0.0)
}

fn mirror_object(p: &Map<String, Value>) -> TemplateResult {
    let doc = optional_str(p, "document").unwrap_or("");
    let name = require_str(p, "name")?;
    let plane = optional_str(p, "plane").unwrap_or("XY");
    Ok(format!(
        "app.set_property({}, {}, \"mirror_plane\", {});\nlet _result_ = app.get_properties({}, {});",
        repr::string(doc),
        repr::string(name),
        repr::string(plane),
        repr::string(doc),
        repr::string(name),
    ))
}

fn rename_object(p: &Map<String, Value>) -> TemplateResult {
    let doc = optional_str(p, "document").unwrap_or("");
    let name = require_str(p, "name")?;
    let label = require_str(p, "label")?;
    Ok(format!(
        "app.set_property({}, {}, \"display_label\", {});\nlet _result_ = app.get_properties({}, {});",
        repr::string(doc),
        repr::string(name),
        repr::string(label),
        repr::string(doc),
        repr::string(name),
    ))
}

fn delete_object(p: &Map<String, Value>) -> TemplateResult {
    let doc = optional_str(p, "document").unwrap_or("");
    let name = require_str(p, "name")?;
    Ok(format!(
        "app.delete_object({}, {});\nlet _result_ = #{{ deleted: {} }};",
        repr::string(doc),
        repr::string(name),
        repr::string(name),
    ))
}

fn set_object_property(p: &Map<String, Value>) -> TemplateResult {
    let doc = optional_str(p, "document").unwrap_or("");
    let name = require_str(p, "name")?;
    let key = require_str(p, "key")?;
    let value = optional_f64(p, "value", 0.0);
    Ok(format!(
        "app.set_property({}, {}, {}, {});\nlet _result_ = app.get_properties({}, {});",
        repr::string(doc),
        repr::string(name),
        repr::string(key),
        repr::number(value),
        repr::string(doc),
        repr::string(name),
    ))
}

fn set_object_visibility(p: &Map<String, Value>) -> TemplateResult {
    let doc = optional_str(p, "document").unwrap_or("");
    let name = require_str(p, "name")?;
    let visible = optional_bool(p, "visible", true);
    Ok(format!(
        "app.set_visibility({}, {}, {});\nlet _result_ = app.get_properties({}, {});",
        repr::string(doc),
        repr::string(name),
        repr::boolean(visible),
        repr::string(doc),
        repr::string(name),
    ))
}

crate::define_tools! {
    category: "modeling",
    tools: [
        {
            name: "boolean_union",
            description: "Fuse two objects into one.",
            requires_ui: false,
            params: [
                { name: "document", ty: "string", required: false },
                { name: "base", ty: "string", required: true },
                { name: "tool", ty: "string", required: true },
            ],
            template: boolean_union,
        },
        {
            name: "boolean_cut",
            description: "Subtract the tool object from the base object.",
            requires_ui: false,
            params: [
                { name: "document", ty: "string", required: false },
                { name: "base", ty: "string", required: true },
                { name: "tool", ty: "string", required: true },
            ],
            template: boolean_cut,
        },
        {
            name: "boolean_intersection",
            description: "Keep only the overlap of two objects.",
            requires_ui: false,
            params: [
                { name: "document", ty: "string", required: false },
                { name: "base", ty: "string", required: true },
                { name: "tool", ty: "string", required: true },
            ],
            template: boolean_intersection,
        },
        {
            name: "translate_object",
            description: "Move an object by a relative offset.",
            requires_ui: false,
            params: [
                { name: "document", ty: "string", required: false },
                { name: "name", ty: "string", required: true },
                { name: "dx", ty: "number", required: false },
                { name: "dy", ty: "number", required: false },
                { name: "dz", ty: "number", required: false },
            ],
            template: translate_object,
        },
        {
            name: "scale_object",
            description: "Set an object's uniform scale factor.",
            requires_ui: false,
            params: [
                { name: "document", ty: "string", required: false },
                { name: "name", ty: "string", required: true },
                { name: "factor", ty: "number", required: false },
            ],
            template: scale_object,
        },
        {
            name: "rotate_object",
            description: "Set an object's rotation, in degrees.",
            requires_ui: false,
            params: [
                { name: "document", ty: "string", required: false },
                { name: "name", ty: "string", required: true },
                { name: "angle", ty: "number", required: false },
            ],
            template: rotate_object,
        },
        {
            name: "mirror_object",
            description: "Mirror an object about a named plane.",
            requires_ui: false,
            params: [
                { name: "document", ty: "string", required: false },
                { name: "name", ty: "string", required: true },
                { name: "plane", ty: "string", required: false },
            ],
            template: mirror_object,
        },
        {
            name: "rename_object",
            description: "Set an object's display label.",
            requires_ui: false,
            params: [
                { name: "document", ty: "string", required: false },
                { name: "name", ty: "string", required: true },
                { name: "label", ty: "string", required: true },
            ],
            template: rename_object,
        },
        {
            name: "delete_object",
            description: "Remove an object from a document.",
            requires_ui: false,
            params: [
                { name: "document", ty: "string", required: false },
                { name: "name", ty: "string", required: true },
            ],
            template: delete_object,
        },
        {
            name: "set_object_property",
            description: "Set an arbitrary numeric property on an object.",
            requires_ui: false,
            params: [
                { name: "document", ty: "string", required: false },
                { name: "name", ty: "string", required: true },
                { name: "key", ty: "string", required: true },
                { name: "value", ty: "number", required: false },
            ],
            template: set_object_property,
        },
        {
            name: "set_object_visibility",
            description: "Show or hide an object.",
            requires_ui: false,
            params: [
                { name: "document", ty: "string", required: false },
                { name: "name", ty: "string", required: true },
                { name: "visible", ty: "boolean", required: false },
            ],
            template: set_object_visibility,
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

    async fn client_with_two_objects() -> (EmbeddedClient, String, String) {
        let client = EmbeddedClient::new(Arc::new(ExecutionEngine::new(Arc::new(
            RhaiScriptRuntime::new(),
        ))));
        client.connect().await.unwrap();
        client
            .execute(r#"app.new_document("Part");"#, 5_000)
            .await
            .unwrap();
        let a = client
            .execute(r#"let _result_ = app.add_object("", "Box", "A");"#, 5_000)
            .await
            .unwrap();
        let b = client
            .execute(r#"let _result_ = app.add_object("", "Box", "B");"#, 5_000)
            .await
            .unwrap();
        (
            client,
            a.result.as_str().unwrap().to_string(),
            b.result.as_str().unwrap().to_string(),
        )
    }

    #[tokio::test]
    async fn boolean_union_creates_fused_object() {
        let (client, a, b) = client_with_two_objects().await;
        let registry = crate::registry::ToolRegistry::new(all());
        let result = crate::registry::invoke(
            &registry,
            &client,
            "boolean_union",
            serde_json::json!({ "base": a, "tool": b }),
            5_000,
        )
        .await;
        assert_eq!(result["type_id"], "union");
    }

    #[tokio::test]
    async fn delete_object_removes_it() {
        let (client, a, _b) = client_with_two_objects().await;
        let registry = crate::registry::ToolRegistry::new(all());
        let result = crate::registry::invoke(
            &registry,
            &client,
            "delete_object",
            serde_json::json!({ "name": a.clone() }),
            5_000,
        )
        .await;
        assert_eq!(result["deleted"], a);
    }
}
