use super::{Decl, ParseContext};
use dwarfdecl_dwarf::{DieKey, NodeId};

/// `using` alias, or a `typedef` wrapping an anonymous definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Typedef {
    pub decl: Decl,
    /// Alias names declared by this declaration, in first-seen order.
    pub names: Vec<String>,
    pub target: String,
    /// The target is an anonymous aggregate or enum spelled out in full, so
    /// the declaration has to use `typedef` syntax.
    pub inline_definition: bool,
    /// Identity of the inlined anonymous type, shared by every alias of the
    /// same declaration.
    pub inline_source: Option<DieKey>,
}

impl Typedef {
    pub fn parse(cx: &ParseContext<'_>, node: NodeId) -> Self {
        let tree = cx.tree();
        let mut typedef = Typedef {
            decl: Decl::parse(tree, node),
            ..Default::default()
        };
        if let Some(name) = tree.short_name(node) {
            typedef.names.push(name.to_string());
        }

        let target = cx.target(node, gimli::DW_AT_type);
        match target.and_then(|t| cx.inline_definition(t).map(|text| (t, text))) {
            Some((target, text)) => {
                typedef.target = text;
                typedef.inline_definition = true;
                typedef.inline_source = Some(tree.key(target));
            }
            None => typedef.target = cx.type_name(node),
        }
        typedef
    }

    pub fn merge(&mut self, other: Typedef) {
        self.decl.merge(other.decl);
        for name in other.names {
            if !self.names.contains(&name) {
                self.names.push(name);
            }
        }
        if self.target.is_empty() {
            self.target = other.target;
            self.inline_definition = other.inline_definition;
            self.inline_source = other.inline_source;
        }
    }

    /// Aliases of one anonymous definition declared together, or the same
    /// alias seen twice.
    pub fn same_declaration(&self, other: &Typedef) -> bool {
        match (self.inline_source, other.inline_source) {
            (Some(a), Some(b)) => a == b,
            _ => self.names.first() == other.names.first() && self.target == other.target,
        }
    }

    pub fn to_source(&self) -> String {
        if self.inline_definition {
            format!("typedef {} {};", self.target, self.names.join(", "))
        } else {
            let name = self.names.first().map(String::as_str).unwrap_or("");
            format!("using {} = {};", name, self.target)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ReconstructOptions;
    use dwarfdecl_dwarf::TreeBuilder;

    #[test]
    fn test_plain_alias() {
        let mut b = TreeBuilder::new();
        let cu = b.compile_unit("a.cpp", "/src");
        let int = b.base_type(cu, "unsigned int", 4, gimli::DW_ATE_unsigned);
        let td = b.child(cu, gimli::DW_TAG_typedef);
        b.name(td, "u32").type_ref(td, int);
        let tree = b.finish();
        let options = ReconstructOptions::default();
        let cx = ParseContext::new(&tree, &options);

        assert_eq!(Typedef::parse(&cx, td).to_source(), "using u32 = unsigned int;");
    }

    #[test]
    fn test_anonymous_struct_alias_list() {
        let mut b = TreeBuilder::new();
        let cu = b.compile_unit("a.c", "/src");
        let int = b.base_type(cu, "int", 4, gimli::DW_ATE_signed);
        let anon = b.child(cu, gimli::DW_TAG_structure_type);
        b.udata(anon, gimli::DW_AT_byte_size, 4).decl(anon, "/src/a.h", 2);
        let x = b.child(anon, gimli::DW_TAG_member);
        b.name(x, "x").type_ref(x, int).decl(x, "/src/a.h", 2);
        let first = b.child(cu, gimli::DW_TAG_typedef);
        b.name(first, "Point").type_ref(first, anon);
        let second = b.child(cu, gimli::DW_TAG_typedef);
        b.name(second, "PointAlias").type_ref(second, anon);
        let tree = b.finish();
        let options = ReconstructOptions::default();
        let cx = ParseContext::new(&tree, &options);

        let mut a = Typedef::parse(&cx, first);
        let c = Typedef::parse(&cx, second);
        assert!(a.same_declaration(&c));
        a.merge(c);
        assert_eq!(
            a.to_source(),
            "typedef struct {\n    int x;\n} Point, PointAlias;"
        );
    }

    #[test]
    fn test_merge_keeps_first_target_and_dedups_names() {
        let mut a = Typedef {
            names: vec!["A".into()],
            target: "int".into(),
            ..Default::default()
        };
        a.merge(Typedef {
            names: vec!["A".into()],
            target: "long".into(),
            ..Default::default()
        });
        assert_eq!(a.names, vec!["A".to_string()]);
        assert_eq!(a.to_source(), "using A = int;");
    }
}
