//! Tool Registry & Codegen (spec.md §4.6, C6).
//!
//! A [`ToolEntry`] pairs a [`cadmcp_core::ToolDescriptor`] with a script
//! template function. [`invoke`] implements the dispatch contract verbatim:
//! schema validation without touching the bridge, UI-gating short-circuit,
//! script build, call, and envelope unwrap.

use std::collections::HashMap;

use cadmcp_client::BridgeClient;
use cadmcp_core::ToolDescriptor;
use serde_json::{Map, Value};

/// A template-build-time failure: a missing/malformed parameter the schema
/// validation pass didn't already catch, or a structural problem with the
/// template itself. Surfaced as a local error dict — the bridge is never
/// called (spec.md §4.6 "Dispatch").
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct ToolError(pub String);

impl ToolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub type TemplateResult = Result<String, ToolError>;
pub type ToolTemplateFn = fn(&Map<String, Value>) -> TemplateResult;

/// One parameter's name/type/required-ness, used to build both the MCP
/// input schema and the local validation pass (spec.md §3 "parameter
/// schema (names, types, defaults, nullability)").
pub struct ParamSpec {
    pub name: &'static str,
    pub ty: &'static str,
    pub required: bool,
}

/// Build a JSON-Schema-shaped `input_schema` value from a param table.
pub fn schema(params: &[ParamSpec]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for p in params {
        properties.insert(
            p.name.to_string(),
            serde_json::json!({ "type": json_schema_type(p.ty) }),
        );
        if p.required {
            required.push(Value::String(p.name.to_string()));
        }
    }
    serde_json::json!({
        "type": "object",
        "properties": Value::Object(properties),
        "required": Value::Array(required),
    })
}

fn json_schema_type(ty: &str) -> &'static str {
    match ty {
        "integer" => "integer",
        "number" => "number",
        "boolean" => "boolean",
        "array" => "array",
        _ => "string",
    }
}

pub struct ToolEntry {
    pub descriptor: ToolDescriptor,
    pub template: ToolTemplateFn,
}

/// The full tool catalog, keyed by name. Built once at startup from every
/// category module's `all()` and handed to the MCP adapter (C8) to build
/// one handler per descriptor, and to the resource registry (C7) to build
/// the `capabilities` manifest (spec.md §4.7 — "always a superset... and
/// vice versa").
pub struct ToolRegistry {
    entries: HashMap<String, ToolEntry>,
}

impl ToolRegistry {
    pub fn new(entries: Vec<ToolEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|e| (e.descriptor.name.clone(), e))
                .collect(),
        }
    }

    /// The full built-in catalog (spec.md §4.6, SPEC_FULL.md §4.6): every
    /// category module's table, assembled once.
    pub fn full() -> Self {
        let mut entries = Vec::new();
        entries.extend(crate::documents::all());
        entries.extend(crate::primitives::all());
        entries.extend(crate::modeling::all());
        entries.extend(crate::viewing::all());
        entries.extend(crate::io::all());
        entries.extend(crate::macros::all());
        entries.extend(crate::introspect::all());
        Self::new(entries)
    }

    pub fn get(&self, name: &str) -> Option<&ToolEntry> {
        self.entries.get(name)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.entries.values().map(|e| &e.descriptor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Validate `params` against `schema` without calling the bridge. Returns
/// the first violation found, matching spec.md §4.6's "on violation return
/// `{"success": false, "error": "<what is wrong>"}` without calling the
/// bridge."
pub fn validate_params(schema: &Value, params: &Value) -> Result<(), String> {
    let obj = match params {
        Value::Object(o) => o,
        Value::Null => &Map::new(),
        _ => return Err("params must be a JSON object".to_string()),
    };

    let required = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_str).collect::<Vec<_>>())
        .unwrap_or_default();
    for name in &required {
        if !obj.contains_key(*name) {
            return Err(format!("missing required parameter '{name}'"));
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };
    for (key, value) in obj {
        let Some(expected) = properties.get(key).and_then(|p| p.get("type")).and_then(Value::as_str) else {
            continue;
        };
        if !type_matches(expected, value) {
            return Err(format!(
                "parameter '{key}' must be of type {expected}, got {}",
                type_name(value)
            ));
        }
    }
    Ok(())
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        _ => true,
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// `invoke(tool_name, params) -> dict` (spec.md §4.6 "Dispatch").
pub async fn invoke(
    registry: &ToolRegistry,
    client: &dyn BridgeClient,
    tool_name: &str,
    params: Value,
    timeout_ms: u64,
) -> Value {
    let Some(entry) = registry.get(tool_name) else {
        return error_dict(format!("unknown tool '{tool_name}'"));
    };

    if let Err(reason) = validate_params(&entry.descriptor.input_schema, &params) {
        return error_dict(reason);
    }

    if entry.descriptor.requires_ui && !client.ui_available() {
        return error_dict(format!(
            "GUI not available — {}",
            entry.descriptor.name
        ));
    }

    let obj = match &params {
        Value::Object(o) => o.clone(),
        _ => Map::new(),
    };

    let script = match (entry.template)(&obj) {
        Ok(s) => s,
        Err(e) => return error_dict(e.0),
    };

    match client.execute(&script, timeout_ms).await {
        Ok(result) if result.success => match result.result {
            Value::Object(_) => result.result,
            _ => error_dict("tool produced no structured result"),
        },
        Ok(result) => {
            let mut dict = Map::new();
            dict.insert("success".into(), Value::Bool(false));
            dict.insert(
                "error".into(),
                Value::String(result.error_message.unwrap_or_default()),
            );
            if let Some(tb) = result.error_traceback {
                dict.insert("traceback".into(), Value::String(tb));
            }
            Value::Object(dict)
        }
        Err(e) => {
            let mut dict = Map::new();
            dict.insert("success".into(), Value::Bool(false));
            dict.insert("error".into(), Value::String(e.to_string()));
            Value::Object(dict)
        }
    }
}

fn error_dict(message: impl Into<String>) -> Value {
    let mut dict = Map::new();
    dict.insert("success".into(), Value::Bool(false));
    dict.insert("error".into(), Value::String(message.into()));
    Value::Object(dict)
}

/// Pull a required string parameter, already schema-validated, but
/// templates stay defensive since they may be exercised directly in tests
/// without going through [`validate_params`].
pub fn require_str<'a>(p: &'a Map<String, Value>, key: &str) -> Result<&'a str, ToolError> {
    p.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::new(format!("missing or non-string parameter '{key}'")))
}

pub fn optional_str<'a>(p: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    p.get(key).and_then(Value::as_str)
}

pub fn require_f64(p: &Map<String, Value>, key: &str) -> Result<f64, ToolError> {
    p.get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| ToolError::new(format!("missing or non-numeric parameter '{key}'")))
}

pub fn optional_f64(p: &Map<String, Value>, key: &str, default: f64) -> f64 {
    p.get(key).and_then(Value::as_f64).unwrap_or(default)
}

pub fn optional_bool(p: &Map<String, Value>, key: &str, default: bool) -> bool {
    p.get(key).and_then(Value::as_bool).unwrap_or(default)
}

pub fn optional_i64(p: &Map<String, Value>, key: &str, default: i64) -> i64 {
    p.get(key).and_then(Value::as_i64).unwrap_or(default)
}

/// Declares one category module's tool table (spec.md §4.6, SPEC_FULL.md
/// §4.6 "declarative `define_tools!` macro"). Expands to a single `all()`
/// function returning every [`ToolEntry`] in the category; each tool's
/// template is a plain function in the same module, not a macro-generated
/// closure, so it stays readable and independently testable.
#[macro_export]
macro_rules! define_tools {
    (
        category: $category:expr,
        tools: [
            $(
                {
                    name: $name:expr,
                    description: $desc:expr,
                    requires_ui: $requires_ui:expr,
                    params: [ $( { name: $pname:expr, ty: $pty:expr, required: $preq:expr } ),* $(,)? ],
                    template: $template_fn:ident $(,)?
                }
            ),* $(,)?
        ]
    ) => {
        /// Every tool descriptor this category contributes to the catalog.
        pub fn all() -> Vec<$crate::registry::ToolEntry> {
            vec![
                $(
                    $crate::registry::ToolEntry {
                        descriptor: cadmcp_core::ToolDescriptor {
                            name: $name.to_string(),
                            category: $category.to_string(),
                            description: $desc.to_string(),
                            requires_ui: $requires_ui,
                            input_schema: $crate::registry::schema(&[
                                $( $crate::registry::ParamSpec { name: $pname, ty: $pty, required: $preq } ),*
                            ]),
                        },
                        template: $template_fn,
                    }
                ),*
            ]
        }
    };
}
