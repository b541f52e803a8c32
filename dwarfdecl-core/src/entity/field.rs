use super::{Decl, ParseContext};
use crate::value::{format_default_value, ConstValue};
use dwarfdecl_dwarf::{NodeId, TypeName};

/// Data member of an aggregate, including static data members, or a
/// variable declared at namespace scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Field {
    pub decl: Decl,
    pub name: String,
    pub type_name: TypeName,
    /// Byte offset within the enclosing aggregate.
    pub member_location: Option<u64>,
    pub bit_size: Option<u64>,
    pub default_value: Option<ConstValue>,
    pub is_static: bool,
    pub is_mutable: bool,
    /// Declared at namespace scope rather than inside an aggregate.
    pub is_variable: bool,
    pub is_extern: bool,
}

impl Field {
    pub fn parse(cx: &ParseContext<'_>, node: NodeId) -> Self {
        let tree = cx.tree();

        let type_name = match cx
            .target(node, gimli::DW_AT_type)
            .and_then(|ty| cx.inline_definition(ty))
        {
            Some(definition) => TypeName::plain(definition),
            None => cx.split_type(node),
        };

        let member_location = tree.udata(node, gimli::DW_AT_data_member_location).or_else(|| {
            tree.udata(node, gimli::DW_AT_data_bit_offset)
                .filter(|_| !tree.has_attr(node, gimli::DW_AT_bit_size))
                .map(|bits| bits / 8)
        });

        Field {
            decl: Decl::parse(tree, node),
            name: tree.short_name(node).unwrap_or_default().to_string(),
            type_name,
            member_location,
            bit_size: tree.udata(node, gimli::DW_AT_bit_size),
            default_value: tree
                .attr(node, gimli::DW_AT_const_value)
                .and_then(ConstValue::from_attr),
            is_static: tree.tag(node) == gimli::DW_TAG_variable
                || tree.flag(node, gimli::DW_AT_external),
            is_mutable: tree.flag(node, gimli::DW_AT_mutable),
            is_variable: false,
            is_extern: false,
        }
    }

    /// A namespace-scope variable: `extern` when it has external linkage,
    /// `static` otherwise.
    pub fn parse_variable(cx: &ParseContext<'_>, node: NodeId) -> Self {
        let external = cx.tree().flag(node, gimli::DW_AT_external);
        Field {
            member_location: None,
            is_static: !external,
            is_extern: external,
            is_variable: true,
            ..Field::parse(cx, node)
        }
    }

    pub fn merge(&mut self, other: Field) {
        self.decl.merge(other.decl);
        if self.name.is_empty() {
            self.name = other.name;
        }
        if self.type_name.before.is_empty() {
            self.type_name = other.type_name;
        }
        self.member_location = self.member_location.or(other.member_location);
        self.bit_size = self.bit_size.or(other.bit_size);
        self.default_value = self.default_value.or(other.default_value);
        self.is_static |= other.is_static;
        self.is_mutable |= other.is_mutable;
        self.is_variable |= other.is_variable;
        self.is_extern |= other.is_extern;
        if self.is_extern {
            self.is_static = false;
        }
    }

    pub fn to_source(&self) -> String {
        let mut out = String::new();
        if self.is_extern {
            out.push_str("extern ");
        } else if self.is_static {
            out.push_str("static ");
        }
        if self.is_mutable {
            out.push_str("mutable ");
        }
        out.push_str(&self.type_name.declare(&self.name));
        if let Some(bits) = self.bit_size {
            out.push_str(&format!(" : {bits}"));
        }
        if let Some(value) = self.default_value {
            out.push_str(" = ");
            out.push_str(&format_default_value(&self.type_name.before, value));
        }
        out.push(';');
        if let Some(offset) = self.member_location {
            out.push_str(&format!(" // +{offset}"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ReconstructOptions;
    use dwarfdecl_dwarf::{AttrValue, TreeBuilder};

    #[test]
    fn test_field_forms() {
        let mut b = TreeBuilder::new();
        let cu = b.compile_unit("a.cpp", "/src");
        let uint = b.base_type(cu, "unsigned int", 4, gimli::DW_ATE_unsigned);
        let float = b.base_type(cu, "float", 4, gimli::DW_ATE_float);
        let cfloat = b.modifier(cu, gimli::DW_TAG_const_type, Some(float));
        let class = b.child(cu, gimli::DW_TAG_structure_type);

        let flags = b.child(class, gimli::DW_TAG_member);
        b.name(flags, "flags")
            .type_ref(flags, uint)
            .udata(flags, gimli::DW_AT_data_member_location, 8)
            .udata(flags, gimli::DW_AT_bit_size, 3);
        let scale = b.child(class, gimli::DW_TAG_member);
        b.name(scale, "scale")
            .type_ref(scale, cfloat)
            .flag(scale, gimli::DW_AT_external)
            .attr(scale, gimli::DW_AT_const_value, AttrValue::Unsigned(1.5f32.to_bits() as u64));
        let cache = b.child(class, gimli::DW_TAG_member);
        b.name(cache, "cache")
            .type_ref(cache, uint)
            .flag(cache, gimli::DW_AT_mutable)
            .udata(cache, gimli::DW_AT_data_bit_offset, 96);
        let tree = b.finish();
        let options = ReconstructOptions::default();
        let cx = ParseContext::new(&tree, &options);

        assert_eq!(
            Field::parse(&cx, flags).to_source(),
            "unsigned int flags : 3; // +8"
        );
        assert_eq!(
            Field::parse(&cx, scale).to_source(),
            "static const float scale = 1.5;"
        );
        assert_eq!(
            Field::parse(&cx, cache).to_source(),
            "mutable unsigned int cache; // +12"
        );
    }

    #[test]
    fn test_namespace_scope_variables() {
        let mut b = TreeBuilder::new();
        let cu = b.compile_unit("a.cpp", "/src");
        let int = b.base_type(cu, "int", 4, gimli::DW_ATE_signed);
        let counter = b.child(cu, gimli::DW_TAG_variable);
        b.name(counter, "counter")
            .type_ref(counter, int)
            .flag(counter, gimli::DW_AT_external);
        let hidden = b.child(cu, gimli::DW_TAG_variable);
        b.name(hidden, "hidden").type_ref(hidden, int);
        let tree = b.finish();
        let options = ReconstructOptions::default();
        let cx = ParseContext::new(&tree, &options);

        assert_eq!(
            Field::parse_variable(&cx, counter).to_source(),
            "extern int counter;"
        );
        assert_eq!(
            Field::parse_variable(&cx, hidden).to_source(),
            "static int hidden;"
        );
    }

    #[test]
    fn test_anonymous_union_member_is_inlined() {
        let mut b = TreeBuilder::new();
        let cu = b.compile_unit("a.cpp", "/src");
        let int = b.base_type(cu, "int", 4, gimli::DW_ATE_signed);
        let float = b.base_type(cu, "float", 4, gimli::DW_ATE_float);
        let outer = b.child(cu, gimli::DW_TAG_structure_type);
        let un = b.child(outer, gimli::DW_TAG_union_type);
        b.decl(un, "/src/a.h", 4);
        for (name, ty) in [("i", int), ("f", float)] {
            let m = b.child(un, gimli::DW_TAG_member);
            b.name(m, name).type_ref(m, ty).decl(m, "/src/a.h", 5);
        }
        let member = b.child(outer, gimli::DW_TAG_member);
        b.name(member, "value").type_ref(member, un);
        let tree = b.finish();
        let options = ReconstructOptions::default();
        let cx = ParseContext::new(&tree, &options);

        assert_eq!(
            Field::parse(&cx, member).to_source(),
            "union {\n    int i;\n    float f;\n} value;"
        );
    }

    #[test]
    fn test_inline_depth_limit_falls_back_to_type_name() {
        let mut b = TreeBuilder::new();
        let cu = b.compile_unit("a.cpp", "/src");
        let outer = b.child(cu, gimli::DW_TAG_structure_type);
        let anon = b.child(cu, gimli::DW_TAG_structure_type);
        let member = b.child(outer, gimli::DW_TAG_member);
        b.name(member, "inner").type_ref(member, anon);
        let tree = b.finish();
        let options = ReconstructOptions {
            max_inline_depth: 0,
            ..Default::default()
        };
        let cx = ParseContext::new(&tree, &options);

        assert_eq!(
            Field::parse(&cx, member).to_source(),
            "(anonymous struct) inner;"
        );
    }
}
