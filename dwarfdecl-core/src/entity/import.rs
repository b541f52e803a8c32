use super::{Decl, ParseContext};
use dwarfdecl_dwarf::NodeId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ImportKind {
    /// `using namespace target;`
    #[default]
    Directive,
    /// `using target;`
    Declaration,
    /// `namespace name = target;`
    Alias(String),
}

/// A using-directive, using-declaration or namespace alias.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Import {
    pub decl: Decl,
    pub kind: ImportKind,
    /// Qualified name of the imported entity; empty when it cannot be
    /// spelled.
    pub target: String,
}

impl Import {
    pub fn parse(cx: &ParseContext<'_>, node: NodeId) -> Self {
        let tree = cx.tree();
        let imported = cx.target(node, gimli::DW_AT_import);
        let imports_namespace =
            imported.is_some_and(|target| tree.tag(target) == gimli::DW_TAG_namespace);

        let kind = match (tree.tag(node), tree.short_name(node)) {
            (gimli::DW_TAG_imported_module, _) => ImportKind::Directive,
            (_, Some(alias)) if imports_namespace => ImportKind::Alias(alias.to_string()),
            _ => ImportKind::Declaration,
        };

        // Compilers import anonymous namespaces implicitly.
        let target = imported
            .filter(|&target| tree.short_name(target).is_some())
            .map(|target| cx.printer().qualified_name(target))
            .filter(|name| !name.contains("(anonymous"))
            .unwrap_or_default();

        Import {
            decl: Decl::parse(tree, node),
            kind,
            target,
        }
    }

    pub fn merge(&mut self, other: Import) {
        self.decl.merge(other.decl);
        if self.target.is_empty() {
            self.kind = other.kind;
            self.target = other.target;
        }
    }

    pub fn to_source(&self) -> String {
        match &self.kind {
            ImportKind::Directive => format!("using namespace {};", self.target),
            ImportKind::Declaration if self.target.contains("::") => {
                format!("using {};", self.target)
            }
            ImportKind::Declaration => format!("using ::{};", self.target),
            ImportKind::Alias(name) => format!("namespace {} = {};", name, self.target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ReconstructOptions;
    use dwarfdecl_dwarf::TreeBuilder;

    #[test]
    fn test_import_forms() {
        let mut b = TreeBuilder::new();
        let cu = b.compile_unit("a.cpp", "/src");
        let outer = b.child(cu, gimli::DW_TAG_namespace);
        b.name(outer, "outer");
        let inner = b.child(outer, gimli::DW_TAG_namespace);
        b.name(inner, "detail");
        let helper = b.child(inner, gimli::DW_TAG_subprogram);
        b.name(helper, "helper");
        let printf = b.child(cu, gimli::DW_TAG_subprogram);
        b.name(printf, "printf");
        let anon = b.child(cu, gimli::DW_TAG_namespace);

        let directive = b.child(cu, gimli::DW_TAG_imported_module);
        b.reference(directive, gimli::DW_AT_import, inner);
        let member = b.child(cu, gimli::DW_TAG_imported_declaration);
        b.reference(member, gimli::DW_AT_import, helper);
        let global = b.child(cu, gimli::DW_TAG_imported_declaration);
        b.reference(global, gimli::DW_AT_import, printf);
        let alias = b.child(cu, gimli::DW_TAG_imported_declaration);
        b.name(alias, "od").reference(alias, gimli::DW_AT_import, inner);
        let implicit = b.child(cu, gimli::DW_TAG_imported_module);
        b.reference(implicit, gimli::DW_AT_import, anon);
        let tree = b.finish();
        let options = ReconstructOptions::default();
        let cx = ParseContext::new(&tree, &options);

        let render = |node| Import::parse(&cx, node).to_source();
        assert_eq!(render(directive), "using namespace outer::detail;");
        assert_eq!(render(member), "using outer::detail::helper;");
        assert_eq!(render(global), "using ::printf;");
        assert_eq!(render(alias), "namespace od = outer::detail;");
        assert!(Import::parse(&cx, implicit).target.is_empty());
    }
}
