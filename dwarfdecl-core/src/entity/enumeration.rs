use super::{Decl, ParseContext};
use crate::value::ConstValue;
use dwarfdecl_dwarf::NodeId;

#[derive(Debug, Clone, PartialEq)]
pub struct Enumerator {
    pub name: String,
    pub value: ConstValue,
}

/// Enumeration type, scoped or not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enum {
    pub decl: Decl,
    pub name: String,
    pub base_type: Option<String>,
    pub enumerators: Vec<Enumerator>,
    pub is_scoped: bool,
}

impl Enum {
    pub fn parse(cx: &ParseContext<'_>, node: NodeId) -> Self {
        let tree = cx.tree();
        let base_type = tree
            .reference(node, gimli::DW_AT_type)
            .map(|ty| cx.printer().type_name(Some(ty)));

        let enumerators = tree
            .children(node)
            .iter()
            .filter(|&&child| tree.tag(child) == gimli::DW_TAG_enumerator)
            .filter_map(|&child| {
                let value = tree
                    .attr(child, gimli::DW_AT_const_value)
                    .and_then(ConstValue::from_attr)?;
                Some(Enumerator {
                    name: tree.short_name(child).unwrap_or_default().to_string(),
                    value,
                })
            })
            .collect();

        Enum {
            decl: Decl::parse(tree, node),
            name: tree.short_name(node).unwrap_or_default().to_string(),
            base_type,
            enumerators,
            is_scoped: tree.flag(node, gimli::DW_AT_enum_class),
        }
    }

    pub fn merge(&mut self, other: Enum) {
        self.decl.merge(other.decl);
        if self.name.is_empty() {
            self.name = other.name;
        }
        if self.base_type.is_none() {
            self.base_type = other.base_type;
        }
        if self.enumerators.is_empty() {
            self.enumerators = other.enumerators;
        }
        self.is_scoped |= other.is_scoped;
    }

    pub fn to_source(&self) -> String {
        let mut out = String::from("enum");
        if self.is_scoped {
            out.push_str(" class");
        }
        if !self.name.is_empty() {
            out.push(' ');
            out.push_str(&self.name);
        }
        if let Some(base) = &self.base_type {
            out.push_str(" : ");
            out.push_str(base);
        }
        out.push_str(" {\n");
        for e in &self.enumerators {
            out.push_str(&format!("    {} = {},\n", e.name, e.value));
        }
        out.push_str("};");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ReconstructOptions;
    use dwarfdecl_dwarf::{AttrValue, TreeBuilder};

    #[test]
    fn test_scoped_enum_with_base() {
        let mut b = TreeBuilder::new();
        let cu = b.compile_unit("a.cpp", "/src");
        let int = b.base_type(cu, "int", 4, gimli::DW_ATE_signed);
        let e = b.child(cu, gimli::DW_TAG_enumeration_type);
        b.name(e, "Color").type_ref(e, int).flag(e, gimli::DW_AT_enum_class);
        for (name, value) in [("Red", AttrValue::Signed(-1)), ("Green", AttrValue::Unsigned(7))] {
            let item = b.child(e, gimli::DW_TAG_enumerator);
            b.name(item, name).attr(item, gimli::DW_AT_const_value, value);
        }
        let tree = b.finish();
        let options = ReconstructOptions::default();
        let cx = ParseContext::new(&tree, &options);

        assert_eq!(
            Enum::parse(&cx, e).to_source(),
            "enum class Color : int {\n    Red = -1,\n    Green = 7,\n};"
        );
    }

    #[test]
    fn test_merge_fills_only_empty_enumerators() {
        let mut a = Enum {
            name: "E".into(),
            ..Default::default()
        };
        let b = Enum {
            name: "Other".into(),
            enumerators: vec![Enumerator {
                name: "A".into(),
                value: ConstValue::Unsigned(0),
            }],
            ..Default::default()
        };
        a.merge(b.clone());
        a.merge(Enum {
            enumerators: vec![],
            ..b
        });
        assert_eq!(a.to_source(), "enum E {\n    A = 0,\n};");
    }
}
