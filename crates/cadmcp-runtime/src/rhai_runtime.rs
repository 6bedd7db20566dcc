//! [`RhaiScriptRuntime`]: the default `ScriptRuntime` used in examples, docs,
//! and the test suite, standing in for an actual CAD Python interpreter.
//!
//! Binds a small `app` object (document/object CRUD) and a `gui` object
//! (view operations) into every script's scope, backed by a persistent
//! [`CadState`] so that e.g. `create_document` followed by `list_documents`
//! observes the same document set a real CAD session would.

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rhai::{Array, Dynamic, Engine, EvalAltResult, Map, Scope};
use serde_json::{Map as JsonMap, Value};

use crate::state::CadState;
use crate::{RunOutcome, ScriptFailure};

const DEFAULT_RETURN_SLOT: &str = "_result_";
const SYNTHETIC_SOURCE: &str = "<cadmcp-script>";

thread_local! {
    // Per-calling-thread stdout/stderr capture (spec.md §4.3 point 3a).
    // Thread-local rather than a single shared buffer because headless
    // `submit` runs jobs inline on the caller's thread — several scripts
    // can genuinely be executing concurrently on different threads in that
    // mode, and each needs its own capture scoped to its own call.
    static STDOUT_BUF: RefCell<String> = RefCell::new(String::new());
    static STDERR_BUF: RefCell<String> = RefCell::new(String::new());
}

/// Thin, cloneable handle to the shared document store, registered as a
/// custom Rhai type so scripts can call `app.new_document("Box")` etc.
#[derive(Clone)]
struct AppHandle(Arc<Mutex<CadState>>);

fn rhai_err(msg: impl Into<String>) -> Box<EvalAltResult> {
    EvalAltResult::ErrorRuntime(msg.into().into(), rhai::Position::NONE).into()
}

fn doc_summary_map(name: &str, doc: &crate::state::CadDocument) -> Map {
    let mut m = Map::new();
    m.insert("name".into(), Dynamic::from(name.to_string()));
    m.insert("label".into(), Dynamic::from(doc.label.clone()));
    m.insert("modified".into(), Dynamic::from(doc.modified));
    m.insert(
        "objects".into(),
        Dynamic::from(doc.objects.len() as i64),
    );
    m
}

fn object_map(o: &crate::state::CadObject) -> Map {
    let mut m = Map::new();
    m.insert("name".into(), Dynamic::from(o.name.clone()));
    m.insert("type_id".into(), Dynamic::from(o.type_id.clone()));
    m.insert("label".into(), Dynamic::from(o.label.clone()));
    m.insert("visible".into(), Dynamic::from(o.visible));
    m.insert(
        "properties".into(),
        json_to_dynamic(&Value::Object(o.properties.clone())),
    );
    m
}

impl AppHandle {
    fn new_document(&mut self, name: &str) -> Result<String, Box<EvalAltResult>> {
        self.0
            .lock()
            .create_document(name)
            .map(|()| name.to_string())
            .map_err(rhai_err)
    }

    fn open_document(&mut self, path: &str) -> Result<String, Box<EvalAltResult>> {
        let name = std::path::Path::new(path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(path)
            .to_string();
        self.0
            .lock()
            .create_document(&name)
            .map(|()| name.clone())
            .map_err(rhai_err)
    }

    fn close_document(&mut self, name: &str) -> Result<(), Box<EvalAltResult>> {
        self.0.lock().close_document(name).map_err(rhai_err)
    }

    fn activate_document(&mut self, name: &str) -> Result<(), Box<EvalAltResult>> {
        let mut state = self.0.lock();
        if !state.documents.contains_key(name) {
            return Err(rhai_err(format!("no such document '{name}'")));
        }
        state.active = Some(name.to_string());
        Ok(())
    }

    fn save_document(&mut self, doc: &str) -> Result<String, Box<EvalAltResult>> {
        let doc = if doc.is_empty() { None } else { Some(doc) };
        self.0.lock().save_document(doc).map_err(rhai_err)
    }

    fn document_info(&mut self, doc: &str) -> Result<Dynamic, Box<EvalAltResult>> {
        let doc = if doc.is_empty() { None } else { Some(doc) };
        let state = self.0.lock();
        let (name, document) = state.resolve(doc).map_err(rhai_err)?;
        Ok(Dynamic::from_map(doc_summary_map(name, document)))
    }

    fn list_documents(&mut self) -> Array {
        self.0
            .lock()
            .documents
            .iter()
            .map(|(name, doc)| Dynamic::from_map(doc_summary_map(name, doc)))
            .collect()
    }

    fn active_document(&mut self) -> Dynamic {
        let state = self.0.lock();
        match state.active.as_deref() {
            Some(name) => state
                .documents
                .get(name)
                .map(|doc| Dynamic::from_map(doc_summary_map(name, doc)))
                .unwrap_or(Dynamic::UNIT),
            None => Dynamic::UNIT,
        }
    }

    fn add_object(
        &mut self,
        doc: &str,
        type_id: &str,
        label: &str,
    ) -> Result<String, Box<EvalAltResult>> {
        let doc = if doc.is_empty() { None } else { Some(doc) };
        self.0
            .lock()
            .add_object(doc, type_id, label)
            .map_err(rhai_err)
    }

    fn list_objects(&mut self, doc: &str) -> Result<Array, Box<EvalAltResult>> {
        let doc = if doc.is_empty() { None } else { Some(doc) };
        let state = self.0.lock();
        let (_, document) = state.resolve(doc).map_err(rhai_err)?;
        Ok(document
            .objects
            .values()
            .map(|o| Dynamic::from_map(object_map(o)))
            .collect())
    }

    fn search_objects(&mut self, doc: &str, pattern: &str) -> Result<Array, Box<EvalAltResult>> {
        let doc = if doc.is_empty() { None } else { Some(doc) };
        let state = self.0.lock();
        let (_, document) = state.resolve(doc).map_err(rhai_err)?;
        Ok(document
            .objects
            .values()
            .filter(|o| o.name.contains(pattern) || o.label.contains(pattern))
            .map(|o| Dynamic::from_map(object_map(o)))
            .collect())
    }

    fn get_properties(&mut self, doc: &str, name: &str) -> Result<Dynamic, Box<EvalAltResult>> {
        let doc = if doc.is_empty() { None } else { Some(doc) };
        let state = self.0.lock();
        let (_, document) = state.resolve(doc).map_err(rhai_err)?;
        let obj = document
            .objects
            .get(name)
            .ok_or_else(|| rhai_err(format!("no such object '{name}'")))?;
        Ok(Dynamic::from_map(object_map(obj)))
    }

    fn set_property(
        &mut self,
        doc: &str,
        name: &str,
        key: &str,
        value: Dynamic,
    ) -> Result<(), Box<EvalAltResult>> {
        let doc = if doc.is_empty() { None } else { Some(doc) };
        let mut state = self.0.lock();
        let (_, document) = state.resolve_mut(doc).map_err(rhai_err)?;
        let obj = document
            .objects
            .get_mut(name)
            .ok_or_else(|| rhai_err(format!("no such object '{name}'")))?;
        obj.properties.insert(key.to_string(), dynamic_to_json(&value));
        document.modified = true;
        Ok(())
    }

    fn set_visibility(
        &mut self,
        doc: &str,
        name: &str,
        visible: bool,
    ) -> Result<(), Box<EvalAltResult>> {
        let doc = if doc.is_empty() { None } else { Some(doc) };
        let mut state = self.0.lock();
        let (_, document) = state.resolve_mut(doc).map_err(rhai_err)?;
        let obj = document
            .objects
            .get_mut(name)
            .ok_or_else(|| rhai_err(format!("no such object '{name}'")))?;
        obj.visible = visible;
        Ok(())
    }

    fn boolean_op(
        &mut self,
        doc: &str,
        op: &str,
        a: &str,
        b: &str,
    ) -> Result<String, Box<EvalAltResult>> {
        let doc_opt = if doc.is_empty() { None } else { Some(doc) };
        {
            let state = self.0.lock();
            let (_, document) = state.resolve(doc_opt).map_err(rhai_err)?;
            for n in [a, b] {
                if !document.objects.contains_key(n) {
                    return Err(rhai_err(format!("no such object '{n}'")));
                }
            }
        }
        self.0
            .lock()
            .add_object(doc_opt, op, &format!("{op}({a},{b})"))
            .map_err(rhai_err)
    }

    fn transform_object(
        &mut self,
        doc: &str,
        name: &str,
        dx: f64,
        dy: f64,
        dz: f64,
    ) -> Result<(), Box<EvalAltResult>> {
        let doc = if doc.is_empty() { None } else { Some(doc) };
        let mut state = self.0.lock();
        let (_, document) = state.resolve_mut(doc).map_err(rhai_err)?;
        let obj = document
            .objects
            .get_mut(name)
            .ok_or_else(|| rhai_err(format!("no such object '{name}'")))?;
        obj.properties.insert(
            "placement".into(),
            serde_json::json!({ "dx": dx, "dy": dy, "dz": dz }),
        );
        document.modified = true;
        Ok(())
    }

    fn delete_object(&mut self, doc: &str, name: &str) -> Result<(), Box<EvalAltResult>> {
        let doc = if doc.is_empty() { None } else { Some(doc) };
        self.0.lock().delete_object(doc, name).map_err(rhai_err)
    }

    fn export(&mut self, doc: &str, path: &str, _fmt: &str) -> Result<String, Box<EvalAltResult>> {
        let doc = if doc.is_empty() { None } else { Some(doc) };
        let state = self.0.lock();
        state.resolve(doc).map_err(rhai_err)?;
        Ok(path.to_string())
    }

    fn import(&mut self, path: &str, _fmt: &str) -> Result<String, Box<EvalAltResult>> {
        self.open_document(path)
    }

    fn list_macros(&mut self) -> Array {
        self.0
            .lock()
            .macros
            .keys()
            .map(|k| Dynamic::from(k.clone()))
            .collect()
    }

    fn run_macro(&mut self, name: &str) -> Result<String, Box<EvalAltResult>> {
        let state = self.0.lock();
        if !state.macros.contains_key(name) {
            return Err(rhai_err(format!("no such macro '{name}'")));
        }
        Ok(format!("ran macro '{name}'"))
    }

    fn create_macro(&mut self, name: &str, code: &str) {
        self.0
            .lock()
            .macros
            .insert(name.to_string(), code.to_string());
    }

    fn delete_macro(&mut self, name: &str) -> Result<(), Box<EvalAltResult>> {
        self.0
            .lock()
            .macros
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| rhai_err(format!("no such macro '{name}'")))
    }

    fn console_output(&mut self, n: i64) -> Array {
        let state = self.0.lock();
        let take = if n <= 0 { state.console.len() } else { n as usize };
        state
            .console
            .iter()
            .rev()
            .take(take)
            .rev()
            .map(|(level, text)| Dynamic::from(format!("[{level:?}] {text}")))
            .collect()
    }

    fn log(&mut self, text: &str) {
        self.0
            .lock()
            .log(cadmcp_core::ConsoleLevel::Message, text.to_string());
    }

    fn errors(&mut self) -> Array {
        self.0
            .lock()
            .console
            .iter()
            .filter(|(level, _)| *level == cadmcp_core::ConsoleLevel::Error)
            .map(|(_, text)| Dynamic::from(text.clone()))
            .collect()
    }
}

/// Thin handle to the GUI module, bound as `gui` only when
/// [`RhaiScriptRuntime`]'s `ui_available` flag is set — never when headless
/// (spec.md §4.1 "the GUI module if UI is up").
#[derive(Clone)]
struct GuiHandle(Arc<Mutex<CadState>>);

impl GuiHandle {
    fn fit_all(&mut self) {
        self.0
            .lock()
            .log(cadmcp_core::ConsoleLevel::Message, "fit_all");
    }

    fn set_view(&mut self, name: &str) {
        self.0
            .lock()
            .log(cadmcp_core::ConsoleLevel::Message, format!("set_view({name})"));
    }

    fn screenshot(&mut self, path: &str) -> String {
        self.0.lock().log(
            cadmcp_core::ConsoleLevel::Message,
            format!("screenshot -> {path}"),
        );
        path.to_string()
    }

    fn toggle_visibility(
        &mut self,
        doc: &str,
        name: &str,
        visible: bool,
    ) -> Result<(), Box<EvalAltResult>> {
        let doc = if doc.is_empty() { None } else { Some(doc) };
        let mut state = self.0.lock();
        let (_, document) = state.resolve_mut(doc).map_err(rhai_err)?;
        let obj = document
            .objects
            .get_mut(name)
            .ok_or_else(|| rhai_err(format!("no such object '{name}'")))?;
        obj.visible = visible;
        Ok(())
    }

    fn set_color(
        &mut self,
        doc: &str,
        name: &str,
        color: &str,
    ) -> Result<(), Box<EvalAltResult>> {
        let doc = if doc.is_empty() { None } else { Some(doc) };
        let mut state = self.0.lock();
        let (_, document) = state.resolve_mut(doc).map_err(rhai_err)?;
        let obj = document
            .objects
            .get_mut(name)
            .ok_or_else(|| rhai_err(format!("no such object '{name}'")))?;
        obj.properties
            .insert("color".into(), Value::String(color.to_string()));
        Ok(())
    }

    fn zoom(&mut self, factor: f64) {
        self.0
            .lock()
            .log(cadmcp_core::ConsoleLevel::Message, format!("zoom({factor})"));
    }

    fn axonometric(&mut self) {
        self.0
            .lock()
            .log(cadmcp_core::ConsoleLevel::Message, "axonometric");
    }

    fn section_view(&mut self, doc: &str, plane: &str) -> Result<(), Box<EvalAltResult>> {
        let doc_opt = if doc.is_empty() { None } else { Some(doc) };
        let mut state = self.0.lock();
        state.resolve(doc_opt).map_err(rhai_err)?;
        state.log(
            cadmcp_core::ConsoleLevel::Message,
            format!("section_view({plane})"),
        );
        Ok(())
    }
}

/// The Rhai-backed [`crate::ScriptRuntime`], the default in examples, docs,
/// and the test suite (SPEC_FULL.md §4.1).
pub struct RhaiScriptRuntime {
    engine: Engine,
    state: Arc<Mutex<CadState>>,
    ui_available: Arc<AtomicBool>,
    return_slot: String,
}

impl RhaiScriptRuntime {
    pub fn new() -> Self {
        Self::with_return_slot(DEFAULT_RETURN_SLOT)
    }

    pub fn with_return_slot(return_slot: impl Into<String>) -> Self {
        let state = Arc::new(Mutex::new(CadState::new()));
        let mut engine = Engine::new();
        engine.set_max_expr_depths(128, 128);
        engine
            .register_type_with_name::<AppHandle>("App")
            .register_fn("new_document", AppHandle::new_document)
            .register_fn("open_document", AppHandle::open_document)
            .register_fn("close_document", AppHandle::close_document)
            .register_fn("activate_document", AppHandle::activate_document)
            .register_fn("save_document", AppHandle::save_document)
            .register_fn("document_info", AppHandle::document_info)
            .register_fn("list_documents", AppHandle::list_documents)
            .register_fn("active_document", AppHandle::active_document)
            .register_fn("add_object", AppHandle::add_object)
            .register_fn("list_objects", AppHandle::list_objects)
            .register_fn("search_objects", AppHandle::search_objects)
            .register_fn("get_properties", AppHandle::get_properties)
            .register_fn("set_property", AppHandle::set_property)
            .register_fn("set_visibility", AppHandle::set_visibility)
            .register_fn("boolean_op", AppHandle::boolean_op)
            .register_fn("transform_object", AppHandle::transform_object)
            .register_fn("delete_object", AppHandle::delete_object)
            .register_fn("export", AppHandle::export)
            .register_fn("import", AppHandle::import)
            .register_fn("list_macros", AppHandle::list_macros)
            .register_fn("run_macro", AppHandle::run_macro)
            .register_fn("create_macro", AppHandle::create_macro)
            .register_fn("delete_macro", AppHandle::delete_macro)
            .register_fn("console_output", AppHandle::console_output)
            .register_fn("log", AppHandle::log)
            .register_fn("errors", AppHandle::errors)
            .register_type_with_name::<GuiHandle>("Gui")
            .register_fn("fit_all", GuiHandle::fit_all)
            .register_fn("set_view", GuiHandle::set_view)
            .register_fn("screenshot", GuiHandle::screenshot)
            .register_fn("toggle_visibility", GuiHandle::toggle_visibility)
            .register_fn("set_color", GuiHandle::set_color)
            .register_fn("zoom", GuiHandle::zoom)
            .register_fn("axonometric", GuiHandle::axonometric)
            .register_fn("section_view", GuiHandle::section_view);

        // Redirect `print`/`debug` into the calling thread's capture
        // buffers instead of the process's real stdout/stderr (spec.md
        // §4.3 point 3a); `ExecutionEngine::execute` reads them back out
        // through `run`'s `RunOutcome`/`ScriptFailure`.
        engine.on_print(|s| {
            STDOUT_BUF.with(|buf| {
                let mut buf = buf.borrow_mut();
                buf.push_str(s);
                buf.push('\n');
            });
        });
        engine.on_debug(|s, src, pos| {
            STDERR_BUF.with(|buf| {
                let mut buf = buf.borrow_mut();
                match src {
                    Some(src) => buf.push_str(&format!("[{src}:{pos:?}] {s}\n")),
                    None => buf.push_str(&format!("[{pos:?}] {s}\n")),
                }
            });
        });

        Self {
            engine,
            state,
            ui_available: Arc::new(AtomicBool::new(true)),
            return_slot: return_slot.into(),
        }
    }

    /// Toggle whether `ui_available()` reports true, for headless-gating
    /// tests (spec.md §8).
    pub fn set_ui_available(&self, available: bool) {
        self.ui_available.store(available, Ordering::SeqCst);
    }

    fn fresh_scope(&self) -> Scope<'static> {
        let mut scope = Scope::new();
        scope.push("app", AppHandle(self.state.clone()));
        let ui_up = self.ui_available.load(Ordering::SeqCst);
        scope.push("ui_available", Dynamic::from(ui_up));
        // The GUI module is only bound when the UI is up (spec.md §4.1),
        // mirroring a real CAD process where the Python binding for the
        // graphical shell is absent in headless runs.
        if ui_up {
            scope.push("gui", GuiHandle(self.state.clone()));
        }
        scope
    }
}

impl Default for RhaiScriptRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl crate::ScriptRuntime for RhaiScriptRuntime {
    fn run(&self, script: &str) -> Result<RunOutcome, ScriptFailure> {
        STDOUT_BUF.with(|b| b.borrow_mut().clear());
        STDERR_BUF.with(|b| b.borrow_mut().clear());

        let mut scope = self.fresh_scope();

        let ast = match self.engine.compile(script) {
            Ok(mut ast) => {
                ast.set_source(SYNTHETIC_SOURCE);
                ast
            }
            Err(e) => {
                return Err(ScriptFailure {
                    exception_type: "SyntaxError".into(),
                    message: e.to_string(),
                    traceback: Some(format!("{SYNTHETIC_SOURCE}: {e}")),
                    stdout: String::new(),
                    stderr: String::new(),
                })
            }
        };

        let outcome = self.engine.run_ast_with_scope(&mut scope, &ast);
        let stdout = STDOUT_BUF.with(|b| std::mem::take(&mut *b.borrow_mut()));
        let stderr = STDERR_BUF.with(|b| std::mem::take(&mut *b.borrow_mut()));

        match outcome {
            Ok(()) => {
                let result = scope
                    .get_value::<Dynamic>(&self.return_slot)
                    .map(|d| dynamic_to_json(&d))
                    .unwrap_or(Value::Null);
                Ok(RunOutcome {
                    result,
                    stdout,
                    stderr,
                })
            }
            Err(e) => {
                let (exception_type, message) = classify_rhai_error(&e);
                Err(ScriptFailure {
                    exception_type,
                    message,
                    traceback: Some(format!("{SYNTHETIC_SOURCE}: {e}")),
                    stdout,
                    stderr,
                })
            }
        }
    }

    fn ui_available(&self) -> bool {
        self.ui_available.load(Ordering::SeqCst)
    }
}

fn classify_rhai_error(e: &EvalAltResult) -> (String, String) {
    let kind = match e {
        EvalAltResult::ErrorRuntime(..) => "RuntimeError",
        EvalAltResult::ErrorArithmetic(..) => "ArithmeticError",
        EvalAltResult::ErrorArrayBounds(..) | EvalAltResult::ErrorStringBounds(..) => "IndexError",
        EvalAltResult::ErrorIndexingType(..) => "TypeError",
        EvalAltResult::ErrorMismatchDataType(..) => "TypeMismatch",
        EvalAltResult::ErrorVariableNotFound(..) => "NameError",
        EvalAltResult::ErrorFunctionNotFound(..) => "FunctionNotFound",
        EvalAltResult::ErrorTerminated(..) => "Terminated",
        _ => "ScriptError",
    };
    (kind.to_string(), e.to_string())
}

/// Convert a Rhai [`Dynamic`] into a [`serde_json::Value`], the boundary
/// every return-slot read crosses.
fn dynamic_to_json(d: &Dynamic) -> Value {
    if d.is_unit() {
        return Value::Null;
    }
    if let Some(b) = d.clone().try_cast::<bool>() {
        return Value::Bool(b);
    }
    if let Some(i) = d.clone().try_cast::<i64>() {
        return Value::from(i);
    }
    if let Some(f) = d.clone().try_cast::<f64>() {
        return Value::from(f);
    }
    if let Ok(s) = d.clone().into_immutable_string() {
        return Value::String(s.to_string());
    }
    if let Some(arr) = d.clone().try_cast::<Array>() {
        return Value::Array(arr.iter().map(dynamic_to_json).collect());
    }
    if let Some(map) = d.clone().try_cast::<Map>() {
        let mut out = JsonMap::new();
        for (k, v) in map.iter() {
            out.insert(k.to_string(), dynamic_to_json(v));
        }
        return Value::Object(out);
    }
    Value::String(d.to_string())
}

/// The reverse conversion, used when a script hands a JSON value into
/// `set_property`.
fn json_to_dynamic(v: &Value) -> Dynamic {
    match v {
        Value::Null => Dynamic::UNIT,
        Value::Bool(b) => Dynamic::from(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Dynamic::from(i)
            } else {
                Dynamic::from(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => Dynamic::from(s.clone()),
        Value::Array(a) => Dynamic::from_array(a.iter().map(json_to_dynamic).collect()),
        Value::Object(o) => {
            let mut m = Map::new();
            for (k, v) in o {
                m.insert(k.as_str().into(), json_to_dynamic(v));
            }
            Dynamic::from_map(m)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScriptRuntime;

    #[test]
    fn simple_arithmetic_roundtrips_through_return_slot() {
        let rt = RhaiScriptRuntime::new();
        let out = rt.run("let _result_ = 1 + 2;").unwrap();
        assert_eq!(out.result, Value::from(3));
    }

    #[test]
    fn script_error_is_classified() {
        let rt = RhaiScriptRuntime::new();
        let err = rt.run("throw \"boom\";").unwrap_err();
        assert!(err.message.contains("boom"));
        assert!(err.traceback.unwrap().contains("<cadmcp-script>"));
    }

    #[test]
    fn document_lifecycle_round_trips() {
        let rt = RhaiScriptRuntime::new();
        rt.run(r#"app.new_document("Part");"#).unwrap();
        let out = rt
            .run(r#"let docs = app.list_documents(); let _result_ = docs.len();"#)
            .unwrap();
        assert_eq!(out.result, Value::from(1));
    }

    #[test]
    fn print_is_captured_into_stdout_not_the_real_stream() {
        let rt = RhaiScriptRuntime::new();
        let out = rt.run(r#"print("hello"); let _result_ = 1;"#).unwrap();
        assert_eq!(out.stdout, "hello\n");
        assert!(out.stderr.is_empty());
    }

    #[test]
    fn debug_is_captured_into_stderr() {
        let rt = RhaiScriptRuntime::new();
        let out = rt.run(r#"debug("trace me"); let _result_ = 1;"#).unwrap();
        assert!(out.stderr.contains("trace me"));
    }

    #[test]
    fn capture_buffers_do_not_leak_across_calls() {
        let rt = RhaiScriptRuntime::new();
        let first = rt.run(r#"print("first"); let _result_ = 1;"#).unwrap();
        assert_eq!(first.stdout, "first\n");
        let second = rt.run("let _result_ = 2;").unwrap();
        assert!(second.stdout.is_empty());
    }

    #[test]
    fn ui_available_defaults_true_and_is_toggleable() {
        let rt = RhaiScriptRuntime::new();
        assert!(<RhaiScriptRuntime as ScriptRuntime>::ui_available(&rt));
        rt.set_ui_available(false);
        assert!(!<RhaiScriptRuntime as ScriptRuntime>::ui_available(&rt));
    }
}
