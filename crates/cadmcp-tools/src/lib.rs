//! Tool Registry & Codegen (spec.md §4.6, C6).
//!
//! ~80 MCP tool descriptors, grouped into seven categories, each backed by
//! a script template against the `app`/`gui` bindings `cadmcp-runtime`
//! exposes. [`registry::invoke`] is the single entry point both the MCP
//! adapter (C8) and this crate's own tests drive: schema validation and
//! UI-gating happen before the bridge is ever called, matching spec.md
//! §4.6's dispatch algorithm.

pub mod registry;
pub mod safe_repr;

pub mod documents;
pub mod introspect;
pub mod io;
pub mod macros;
pub mod modeling;
pub mod primitives;
pub mod viewing;

pub use registry::{invoke, ToolEntry, ToolError, ToolRegistry};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_catalog_has_expected_category_counts() {
        let registry = ToolRegistry::full();
        assert_eq!(documents::all().len(), 8);
        assert_eq!(primitives::all().len(), 9);
        assert_eq!(modeling::all().len(), 11);
        assert_eq!(viewing::all().len(), 8);
        assert_eq!(io::all().len(), 7);
        assert_eq!(macros::all().len(), 4);
        assert_eq!(introspect::all().len(), 8);
        assert_eq!(registry.len(), 55);
    }

    #[test]
    fn every_tool_name_is_unique() {
        let registry = ToolRegistry::full();
        let mut names: Vec<&str> = registry.descriptors().map(|d| d.name.as_str()).collect();
        let before = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), before, "duplicate tool name in catalog");
    }

    #[test]
    fn every_viewing_tool_requires_ui() {
        for descriptor in viewing::all() {
            assert!(descriptor.descriptor.requires_ui, "{} should require UI", descriptor.descriptor.name);
        }
    }

    #[test]
    fn no_non_viewing_tool_requires_ui_except_ping_ui() {
        for descriptor in documents::all()
            .into_iter()
            .chain(primitives::all())
            .chain(modeling::all())
            .chain(io::all())
            .chain(macros::all())
        {
            assert!(!descriptor.descriptor.requires_ui);
        }
        let introspect = introspect::all();
        let ui_gated: Vec<_> = introspect
            .iter()
            .filter(|e| e.descriptor.requires_ui)
            .map(|e| e.descriptor.name.as_str())
            .collect();
        assert_eq!(ui_gated, vec!["ping_ui"]);
    }
}
