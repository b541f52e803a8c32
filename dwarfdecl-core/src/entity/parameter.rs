use super::{Decl, ParseContext};
use dwarfdecl_dwarf::{NodeId, TypeName};

/// A function parameter, or `...` for unspecified parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameter {
    pub decl: Decl,
    pub name: String,
    pub type_name: TypeName,
}

impl Parameter {
    pub fn parse(cx: &ParseContext<'_>, node: NodeId) -> Self {
        let tree = cx.tree();
        if tree.tag(node) == gimli::DW_TAG_unspecified_parameters {
            return Self::variadic();
        }
        Parameter {
            decl: Decl::parse(tree, node),
            name: tree.short_name(node).unwrap_or_default().to_string(),
            type_name: cx.split_type(node),
        }
    }

    pub fn variadic() -> Self {
        Parameter {
            type_name: TypeName::plain("..."),
            ..Default::default()
        }
    }

    pub fn merge(&mut self, other: Parameter) {
        self.decl.merge(other.decl);
        if self.name.is_empty() {
            self.name = other.name;
        }
        if self.type_name.before.is_empty() {
            self.type_name = other.type_name;
        }
    }

    pub fn to_source(&self) -> String {
        self.type_name.declare(&self.name)
    }
}
