//! Primitives category (spec.md §4.6): solid-primitive creation tools,
//! backed by `app.add_object`/`app.transform_object`/`app.set_property`.

use serde_json::{Map, Value};

use crate::registry::{optional_f64, optional_str, require_f64, TemplateResult};
use crate::safe_repr as repr;

fn place_and_size(p: &Map<String, Value>, type_id: &str, size_params: &[(&str, f64)]) -> String {
    let doc = optional_str(p, "document").unwrap_or("");
    let label = optional_str(p, "label").unwrap_or(type_id);
    let mut script = format!(
        "let name = app.add_object({}, {}, {});\n",
        repr::string(doc),
        repr::string(type_id),
        repr::string(label)
    );
    for (key, value) in size_params {
        script.push_str(&format!(
            "app.set_property({}, name, {}, {});\n",
            repr::string(doc),
            repr::string(key),
            repr::number(*value)
        ));
    }
    let dx = optional_f64(p, "x", 0.0);
    let dy = optional_f64(p, "y", 0.0);
    let dz = optional_f64(p, "z", 0.0);
    if dx != 0.0 || dy != 0.0 || dz != 0.0 {
        script.push_str(&format!(
            "app.transform_object({}, name, {}, {}, {});\n",
            repr::string(doc),
            repr::number(dx),
            repr::number(dy),
            repr::number(dz)
        ));
    }
    script.push_str(&format!(
        "let _result_ = app.get_properties({}, name);",
        repr::string(doc)
    ));
    script
}

fn create_box(p: &Map<String, Value>) -> TemplateResult {
    Ok(place_and_size(
        p,
        "Box",
        &[
            ("length", optional_f64(p, "length", 10.0)),
            ("width", optional_f64(p, "width", 10.0)),
            ("height", optional_f64(p, "height", 10.0)),
        ],
    ))
}

fn create_cylinder(p: &Map<String, Value>) -> TemplateResult {
    Ok(place_and_size(
        p,
        "Cylinder",
        &[
            ("radius", optional_f64(p, "radius", 5.0)),
            ("height", optional_f64(p, "height", 10.0)),
        ],
    ))
}

fn create_sphere(p: &Map<String, Value>) -> TemplateResult {
    Ok(place_and_size(p, "Sphere", &[("radius", optional_f64(p, "radius", 5.0))]))
}

fn create_cone(p: &Map<String, Value>) -> TemplateResult {
    Ok(place_and_size(
        p,
        "Cone",
        &[
            ("radius1", optional_f64(p, "radius1", 5.0)),
            ("radius2", optional_f64(p, "radius2", 0.0)),
            ("height", optional_f64(p, "height", 10.0)),
        ],
    ))
}

fn create_torus(p: &Map<String, Value>) -> TemplateResult {
    Ok(place_and_size(
        p,
        "Torus",
        &[
            ("radius1", optional_f64(p, "radius1", 10.0)),
            ("radius2", optional_f64(p, "radius2", 2.0)),
        ],
    ))
}

fn create_wedge(p: &Map<String, Value>) -> TemplateResult {
    Ok(place_and_size(
        p,
        "Wedge",
        &[
            ("xmin", optional_f64(p, "xmin", 0.0)),
            ("xmax", optional_f64(p, "xmax", 10.0)),
            ("zmin", optional_f64(p, "zmin", 0.0)),
            ("zmax", optional_f64(p, "zmax", 10.0)),
        ],
    ))
}

fn create_plane(p: &Map<String, Value>) -> TemplateResult {
    Ok(place_and_size(
        p,
        "Plane",
        &[
            ("length", optional_f64(p, "length", 10.0)),
            ("width", optional_f64(p, "width", 10.0)),
        ],
    ))
}

fn create_line(p: &Map<String, Value>) -> TemplateResult {
    let x2 = require_f64(p, "x2")?;
    let y2 = require_f64(p, "y2")?;
    let z2 = optional_f64(p, "z2", 0.0);
    Ok(place_and_size(p, "Line", &[("x2", x2), ("y2", y2), ("z2", z2)]))
}

fn create_circle(p: &Map<String, Value>) -> TemplateResult {
    Ok(place_and_size(p, "Circle", &[("radius", optional_f64(p, "radius", 5.0))]))
}

crate::define_tools! {
    category: "primitives",
    tools: [
        {
            name: "create_box",
            description: "Create a rectangular box primitive.",
            requires_ui: false,
            params: [
                { name: "document", ty: "string", required: false },
                { name: "label", ty: "string", required: false },
                { name: "length", ty: "number", required: false },
                { name: "width", ty: "number", required: false },
                { name: "height", ty: "number", required: false },
                { name: "x", ty: "number", required: false },
                { name: "y", ty: "number", required: false },
                { name: "z", ty: "number", required: false },
            ],
            template: create_box,
        },
        {
            name: "create_cylinder",
            description: "Create a cylinder primitive.",
            requires_ui: false,
            params: [
                { name: "document", ty: "string", required: false },
                { name: "label", ty: "string", required: false },
                { name: "radius", ty: "number", required: false },
                { name: "height", ty: "number", required: false },
                { name: "x", ty: "number", required: false },
                { name: "y", ty: "number", required: false },
                { name: "z", ty: "number", required: false },
            ],
            template: create_cylinder,
        },
        {
            name: "create_sphere",
            description: "Create a sphere primitive.",
            requires_ui: false,
            params: [
                { name: "document", ty: "string", required: false },
                { name: "label", ty: "string", required: false },
                { name: "radius", ty: "number", required: false },
                { name: "x", ty: "number", required: false },
                { name: "y", ty: "number", required: false },
                { name: "z", ty: "number", required: false },
            ],
            template: create_sphere,
        },
        {
            name: "create_cone",
            description: "Create a cone (or frustum) primitive.",
            requires_ui: false,
            params: [
                { name: "document", ty: "string", required: false },
                { name: "label", ty: "string", required: false },
                { name: "radius1", ty: "number", required: false },
                { name: "radius2", ty: "number", required: false },
                { name: "height", ty: "number", required: false },
                { name: "x", ty: "number", required: false },
                { name: "y", ty: "number", required: false },
                { name: "z", ty: "number", required: false },
            ],
            template: create_cone,
        },
        {
            name: "create_torus",
            description: "Create a torus primitive.",
            requires_ui: false,
            params: [
                { name: "document", ty: "string", required: false },
                { name: "label", ty: "string", required: false },
                { name: "radius1", ty: "number", required: false },
                { name: "radius2", ty: "number", required: false },
                { name: "x", ty: "number", required: false },
                { name: "y", ty: "number", required: false },
                { name: "z", ty: "number", required: false },
            ],
            template: create_torus,
        },
        {
            name: "create_wedge",
            description: "Create a wedge primitive.",
            requires_ui: false,
            params: [
                { name: "document", ty: "string", required: false },
                { name: "label", ty: "string", required: false },
                { name: "xmin", ty: "number", required: false },
                { name: "xmax", ty: "number", required: false },
                { name: "zmin", ty: "number", required: false },
                { name: "zmax", ty: "number", required: false },
                { name: "x", ty: "number", required: false },
                { name: "y", ty: "number", required: false },
                { name: "z", ty: "number", required: false },
            ],
            template: create_wedge,
        },
        {
            name: "create_plane",
            description: "Create a flat planar face primitive.",
            requires_ui: false,
            params: [
                { name: "document", ty: "string", required: false },
                { name: "label", ty: "string", required: false },
                { name: "length", ty: "number", required: false },
                { name: "width", ty: "number", required: false },
                { name: "x", ty: "number", required: false },
                { name: "y", ty: "number", required: false },
                { name: "z", ty: "number", required: false },
            ],
            template: create_plane,
        },
        {
            name: "create_line",
            description: "Create a line segment primitive from the origin to (x2, y2, z2).",
            requires_ui: false,
            params: [
                { name: "document", ty: "string", required: false },
                { name: "label", ty: "string", required: false },
                { name: "x2", ty: "number", required: true },
                { name: "y2", ty: "number", required: true },
                { name: "z2", ty: "number", required: false },
                { name: "x", ty: "number", required: false },
                { name: "y", ty: "number", required: false },
                { name: "z", ty: "number", required: false },
            ],
            template: create_line,
        },
        {
            name: "create_circle",
            description: "Create a circle (edge) primitive.",
            requires_ui: false,
            params: [
                { name: "document", ty: "string", required: false },
                { name: "label", ty: "string", required: false },
                { name: "radius", ty: "number", required: false },
                { name: "x", ty: "number", required: false },
                { name: "y", ty: "number", required: false },
                { name: "z", ty: "number", required: false },
            ],
            template: create_circle,
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
    async fn create_box_produces_properties() {
        let registry = crate::registry::ToolRegistry::new(all());
        let client = EmbeddedClient::new(Arc::new(ExecutionEngine::new(Arc::new(
            RhaiScriptRuntime::new(),
        ))));
        client.connect().await.unwrap();
        client
            .execute(r#"app.new_document("Part");"#, 5_000)
            .await
            .unwrap();

        let result = crate::registry::invoke(
            &registry,
            &client,
            "create_box",
            serde_json::json!({ "length": 20.0 }),
            5_000,
        )
        .await;
        assert_eq!(result["properties"]["length"], 20.0);
        assert_eq!(result["type_id"], "Box");
    }
}
