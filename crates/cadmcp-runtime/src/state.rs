//! In-memory stand-in for "the CAD process's document tree".
//!
//! A real CAD installation keeps this state inside its own C++/Python
//! object model; for local development, examples, and the test suite this
//! small store gives [`crate::rhai_runtime::RhaiScriptRuntime`] something
//! real to mutate so tool templates (in `cadmcp-tools`) can be exercised
//! end to end without a CAD installation.

use std::collections::BTreeMap;

use cadmcp_core::ConsoleLevel;
use serde_json::{Map, Value};

#[derive(Debug, Clone)]
pub struct CadObject {
    pub name: String,
    pub type_id: String,
    pub label: String,
    pub properties: Map<String, Value>,
    pub visible: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CadDocument {
    pub label: String,
    pub modified: bool,
    pub objects: BTreeMap<String, CadObject>,
}

/// The full mutable state of the simulated CAD process: open documents,
/// which one is active, and the captured console log.
#[derive(Debug, Default)]
pub struct CadState {
    pub documents: BTreeMap<String, CadDocument>,
    pub active: Option<String>,
    pub console: Vec<(ConsoleLevel, String)>,
    pub macros: BTreeMap<String, String>,
    next_object_id: u64,
}

impl CadState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_document(&mut self, name: &str) -> Result<(), String> {
        if self.documents.contains_key(name) {
            return Err(format!("document '{name}' already exists"));
        }
        self.documents.insert(
            name.to_string(),
            CadDocument {
                label: name.to_string(),
                ..Default::default()
            },
        );
        self.active = Some(name.to_string());
        self.log(ConsoleLevel::Message, format!("created document '{name}'"));
        Ok(())
    }

    pub fn close_document(&mut self, name: &str) -> Result<(), String> {
        if self.documents.remove(name).is_none() {
            return Err(format!("no such document '{name}'"));
        }
        if self.active.as_deref() == Some(name) {
            self.active = self.documents.keys().next().cloned();
        }
        Ok(())
    }

    pub fn save_document(&mut self, name: Option<&str>) -> Result<String, String> {
        let (key, doc) = self.resolve_mut(name)?;
        doc.modified = false;
        self.log(ConsoleLevel::Message, format!("saved document '{key}'"));
        Ok(key)
    }

    pub fn resolve<'a>(&'a self, name: Option<&str>) -> Result<(&'a str, &'a CadDocument), String> {
        let key = match name {
            Some(n) => n,
            None => self
                .active
                .as_deref()
                .ok_or_else(|| "no active document".to_string())?,
        };
        let doc = self
            .documents
            .get(key)
            .ok_or_else(|| format!("no such document '{key}'"))?;
        Ok((key, doc))
    }

    pub fn resolve_mut(&mut self, name: Option<&str>) -> Result<(String, &mut CadDocument), String> {
        let key = match name {
            Some(n) => n.to_string(),
            None => self
                .active
                .clone()
                .ok_or_else(|| "no active document".to_string())?,
        };
        let doc = self
            .documents
            .get_mut(&key)
            .ok_or_else(|| format!("no such document '{key}'"))?;
        Ok((key, doc))
    }

    pub fn add_object(
        &mut self,
        doc: Option<&str>,
        type_id: &str,
        label: &str,
    ) -> Result<String, String> {
        self.next_object_id += 1;
        let name = format!("{type_id}{:03}", self.next_object_id);
        let (_, document) = self.resolve_mut(doc)?;
        document.objects.insert(
            name.clone(),
            CadObject {
                name: name.clone(),
                type_id: type_id.to_string(),
                label: label.to_string(),
                properties: Map::new(),
                visible: true,
            },
        );
        document.modified = true;
        Ok(name)
    }

    pub fn delete_object(&mut self, doc: Option<&str>, name: &str) -> Result<(), String> {
        let (_, document) = self.resolve_mut(doc)?;
        if document.objects.remove(name).is_none() {
            return Err(format!("no such object '{name}'"));
        }
        document.modified = true;
        Ok(())
    }

    pub fn log(&mut self, level: ConsoleLevel, text: impl Into<String>) {
        self.console.push((level, text.into()));
    }
}
