//! Cross-unit registry of reconstructed declarations.
//!
//! Compilation units are fed in one at a time. Every declaration is keyed
//! by the identity of the DIE that defines it, so a header type seen by many
//! units (or defined once in a type unit and referenced from many units) is
//! reconstructed once and merged with every later sighting.

use crate::entity::{Entity, EntityKind, Namespace, ParseContext};
use crate::options::ReconstructOptions;
use crate::source_file::SourceFile;
use dwarfdecl_dwarf::path::{common_path, join_paths, normalize};
use dwarfdecl_dwarf::{AttrValue, DieKey, DieTree, NodeId};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Where a registered entity lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityLocation {
    pub file: String,
    pub line: u64,
    pub index: usize,
}

#[derive(Debug, Default)]
pub struct Registry {
    options: ReconstructOptions,
    base_dir: String,
    files: BTreeMap<String, SourceFile>,
    entries: HashMap<DieKey, EntityLocation>,
}

impl Registry {
    pub fn new(options: ReconstructOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Common directory of every compilation unit seen so far.
    pub fn base_dir(&self) -> &str {
        &self.base_dir
    }

    /// Source files keyed by normalized absolute path.
    pub fn source_files(&self) -> &BTreeMap<String, SourceFile> {
        &self.files
    }

    /// Number of distinct DIE identities registered.
    pub fn identities(&self) -> usize {
        self.entries.len()
    }

    pub fn entity(&self, location: &EntityLocation) -> Option<&Entity> {
        self.files
            .get(&location.file)?
            .get(location.line, location.index)
    }

    fn entity_mut(&mut self, location: &EntityLocation) -> Option<&mut Entity> {
        self.files
            .get_mut(&location.file)?
            .get_mut(location.line, location.index)
    }

    /// Entity registered for the DIE with `key`.
    pub fn lookup(&self, key: DieKey) -> Option<&Entity> {
        self.entity(self.entries.get(&key)?)
    }

    /// Collect the declarations of the compilation unit rooted at
    /// `unit_root`.
    ///
    /// Units without a name or compilation directory, and nodes that are
    /// not unit roots, are ignored.
    pub fn update(&mut self, tree: &DieTree, unit_root: NodeId) {
        if !tree.is_unit_root(unit_root) {
            debug!("Ignoring non-root node {:?}", tree.key(unit_root));
            return;
        }
        let unit = tree.unit_of(unit_root);
        let (Some(name), Some(comp_dir)) = (unit.name.as_deref(), unit.comp_dir.as_deref()) else {
            debug!("Ignoring unit at {:?} without name or compilation directory", tree.key(unit_root));
            return;
        };

        let source = join_paths(comp_dir, name);
        let candidate = common_path(&source, comp_dir);
        if self.base_dir.is_empty() {
            self.base_dir = candidate.clone();
        }
        self.base_dir = common_path(&self.base_dir, &candidate);

        let options = self.options.clone();
        let cx = ParseContext::new(tree, &options);
        let mut namespaces: Vec<Namespace> = Vec::new();
        self.walk(&cx, unit_root, &mut namespaces);
    }

    fn walk(&mut self, cx: &ParseContext<'_>, node: NodeId, namespaces: &mut Vec<Namespace>) {
        let tree = cx.tree();
        for &child in tree.children(node) {
            if tree.tag(child) == gimli::DW_TAG_namespace {
                namespaces.push(Namespace::parse(tree, child));
                self.walk(cx, child, namespaces);
                namespaces.pop();
                continue;
            }

            let resolved = tree.resolve_type_unit(child);
            let Some(location) = self.get_or_create(cx, resolved, namespaces) else {
                continue;
            };
            if resolved != child {
                // The local declaration may still carry unit-specific
                // attributes the type unit lacks.
                if let Some(existing) = self.entity_mut(&location) {
                    let local = Entity::parse(cx, existing.kind(), child);
                    existing.merge(local);
                }
            }
        }
    }

    /// The entity registered for `node`, re-parsed into the existing one
    /// when already known, or created when `node` is a named declaration
    /// with a source location.
    pub fn get_or_create(
        &mut self,
        cx: &ParseContext<'_>,
        node: NodeId,
        namespaces: &[Namespace],
    ) -> Option<EntityLocation> {
        let tree = cx.tree();
        let key = tree.key(node);

        if let Some(location) = self.entries.get(&key).cloned() {
            if let Some(existing) = self.entity_mut(&location) {
                let again = Entity::parse(cx, existing.kind(), node);
                existing.merge(again);
            }
            return Some(location);
        }

        let kind = EntityKind::for_declaration(tree.tag(node))?;
        if kind.requires_name() && !tree.has_attr(node, gimli::DW_AT_name) {
            return None;
        }
        let file = match tree.attr(node, gimli::DW_AT_decl_file) {
            Some(AttrValue::String(file)) => normalize(file),
            _ => return None,
        };
        let line = tree.udata(node, gimli::DW_AT_decl_line)?;

        let mut entity = Entity::parse(cx, kind, node);
        if !entity.is_renderable() {
            debug!("Skipping {:?} at {}:{}: nothing to write", kind, file, line);
            return None;
        }
        entity.decl_mut().namespaces = namespaces.to_vec();

        let cap = self.options.max_entries_per_line;
        let source = self
            .files
            .entry(file.clone())
            .or_insert_with(|| SourceFile::new(cap));

        let index = match source.find_same(line, &entity) {
            Some(index) => {
                if let Some(existing) = source.get_mut(line, index) {
                    existing.merge(entity);
                }
                index
            }
            None => match source.add(line, entity) {
                Some(index) => index,
                None => {
                    debug!("Dropping declaration at {}:{}: line is full", file, line);
                    return None;
                }
            },
        };

        let location = EntityLocation { file, line, index };
        self.entries.insert(key, location.clone());
        Some(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwarfdecl_dwarf::TreeBuilder;

    #[test]
    fn test_base_dir_narrows_across_units() {
        let mut b = TreeBuilder::new();
        let first = b.compile_unit("src/a.cpp", "/home/dev/proj");
        let second = b.compile_unit("/home/dev/lib/b.cpp", "/home/dev/lib");
        let tree = b.finish();

        let mut registry = Registry::new(ReconstructOptions::default());
        registry.update(&tree, first);
        assert_eq!(registry.base_dir(), "/home/dev/proj");
        registry.update(&tree, second);
        assert_eq!(registry.base_dir(), "/home/dev");
    }

    #[test]
    fn test_units_without_names_and_non_roots_are_ignored() {
        let mut b = TreeBuilder::new();
        let (tu_root, tu_type) = b.type_unit(1, gimli::DW_TAG_structure_type);
        b.name(tu_type, "T").decl(tu_type, "/src/t.h", 1);
        let cu = b.compile_unit("a.cpp", "/src");
        let s = b.child(cu, gimli::DW_TAG_structure_type);
        b.name(s, "S").decl(s, "/src/s.h", 1);
        let tree = b.finish();

        let mut registry = Registry::new(ReconstructOptions::default());
        registry.update(&tree, tu_root);
        registry.update(&tree, s);
        assert_eq!(registry.identities(), 0);
        assert_eq!(registry.base_dir(), "");
    }

    #[test]
    fn test_requires_name_file_and_line_directly() {
        let mut b = TreeBuilder::new();
        let cu = b.compile_unit("a.cpp", "/src");
        let decl = b.child(cu, gimli::DW_TAG_subprogram);
        b.name(decl, "run").decl(decl, "/src/run.h", 3);
        let def = b.child(cu, gimli::DW_TAG_subprogram);
        b.reference(def, gimli::DW_AT_specification, decl);
        let nameless = b.child(cu, gimli::DW_TAG_structure_type);
        b.decl(nameless, "/src/run.h", 5);
        let tree = b.finish();

        let mut registry = Registry::new(ReconstructOptions::default());
        registry.update(&tree, cu);
        assert_eq!(registry.identities(), 1);
        assert!(registry.lookup(tree.key(decl)).is_some());
        assert!(registry.lookup(tree.key(def)).is_none());
    }

    #[test]
    fn test_namespaces_are_recorded() {
        let mut b = TreeBuilder::new();
        let cu = b.compile_unit("a.cpp", "/src");
        let int = b.base_type(cu, "int", 4, gimli::DW_ATE_signed);
        let outer = b.child(cu, gimli::DW_TAG_namespace);
        b.name(outer, "outer");
        let anon = b.child(outer, gimli::DW_TAG_namespace);
        let td = b.child(anon, gimli::DW_TAG_typedef);
        b.name(td, "Id").type_ref(td, int).decl(td, "/src/id.h", 4);
        let tree = b.finish();

        let mut registry = Registry::new(ReconstructOptions::default());
        registry.update(&tree, cu);
        let entity = registry.lookup(tree.key(td)).unwrap();
        assert_eq!(entity.namespaces(), [Namespace::new("outer"), Namespace::new("")]);
    }

    #[test]
    fn test_inline_namespace_is_recorded() {
        let mut b = TreeBuilder::new();
        let cu = b.compile_unit("a.cpp", "/src");
        let int = b.base_type(cu, "int", 4, gimli::DW_ATE_signed);
        let v1 = b.child(cu, gimli::DW_TAG_namespace);
        b.name(v1, "v1").flag(v1, gimli::DW_AT_export_symbols);
        let td = b.child(v1, gimli::DW_TAG_typedef);
        b.name(td, "Id").type_ref(td, int).decl(td, "/src/id.h", 4);
        let tree = b.finish();

        let mut registry = Registry::new(ReconstructOptions::default());
        registry.update(&tree, cu);
        let entity = registry.lookup(tree.key(td)).unwrap();
        assert!(entity.namespaces()[0].is_inline);
        assert_eq!(
            registry.source_files()["/src/id.h"].to_source(),
            "inline namespace v1 {\nusing Id = int;\n} // namespace v1\n"
        );
    }

    #[test]
    fn test_variables_and_imports_at_namespace_scope() {
        let mut b = TreeBuilder::new();
        let cu = b.compile_unit("a.cpp", "/src");
        let int = b.base_type(cu, "int", 4, gimli::DW_ATE_signed);
        let app = b.child(cu, gimli::DW_TAG_namespace);
        b.name(app, "app");
        let counter = b.child(app, gimli::DW_TAG_variable);
        b.name(counter, "counter")
            .type_ref(counter, int)
            .flag(counter, gimli::DW_AT_external)
            .decl(counter, "/src/app.h", 3);
        let using = b.child(cu, gimli::DW_TAG_imported_module);
        b.reference(using, gimli::DW_AT_import, app)
            .decl(using, "/src/app.h", 6);
        let anon = b.child(cu, gimli::DW_TAG_namespace);
        let implicit = b.child(cu, gimli::DW_TAG_imported_module);
        b.reference(implicit, gimli::DW_AT_import, anon)
            .decl(implicit, "/src/app.h", 8);
        let tree = b.finish();

        let mut registry = Registry::new(ReconstructOptions::default());
        registry.update(&tree, cu);
        assert_eq!(registry.identities(), 2);
        assert_eq!(
            registry.source_files()["/src/app.h"].to_source(),
            "namespace app {\nextern int counter;\n} // namespace app\n\nusing namespace app;\n"
        );
    }
}
