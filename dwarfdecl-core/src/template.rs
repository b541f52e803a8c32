//! Template parameter clauses.

use crate::entity::ParseContext;
use dwarfdecl_dwarf::NodeId;

/// `template <...>` clause built from the template parameter children of
/// `node`, or `None` when it has none.
pub fn template_clause(cx: &ParseContext<'_>, node: NodeId) -> Option<String> {
    let tree = cx.tree();
    let mut params = Vec::new();
    for &child in tree.children(node) {
        let name = tree.short_name(child).unwrap_or_default();
        let param = match tree.tag(child) {
            gimli::DW_TAG_template_type_parameter => format!("typename {name}"),
            gimli::DW_TAG_template_value_parameter => {
                let ty = cx.split_type(child);
                ty.declare(name)
            }
            gimli::DW_TAG_GNU_template_parameter_pack => format!("typename... {name}"),
            gimli::DW_TAG_GNU_template_template_param => {
                format!("template<typename> class {name}")
            }
            _ => continue,
        };
        params.push(param.trim_end().to_string());
    }

    if params.is_empty() {
        None
    } else {
        Some(format!("template <{}>", params.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ReconstructOptions;
    use dwarfdecl_dwarf::TreeBuilder;

    #[test]
    fn test_every_parameter_kind() {
        let mut b = TreeBuilder::new();
        let cu = b.compile_unit("a.cpp", "/src");
        let int = b.base_type(cu, "int", 4, gimli::DW_ATE_signed);
        let class = b.child(cu, gimli::DW_TAG_class_type);
        b.name(class, "Box<int, 4>");
        let t = b.child(class, gimli::DW_TAG_template_type_parameter);
        b.name(t, "T").type_ref(t, int);
        let n = b.child(class, gimli::DW_TAG_template_value_parameter);
        b.name(n, "N").type_ref(n, int).udata(n, gimli::DW_AT_const_value, 4);
        let pack = b.child(class, gimli::DW_TAG_GNU_template_parameter_pack);
        b.name(pack, "Ts");
        let tt = b.child(class, gimli::DW_TAG_GNU_template_template_param);
        b.name(tt, "TT");
        let tree = b.finish();
        let options = ReconstructOptions::default();
        let cx = ParseContext::new(&tree, &options);

        assert_eq!(
            template_clause(&cx, class).as_deref(),
            Some("template <typename T, int N, typename... Ts, template<typename> class TT>")
        );
    }

    #[test]
    fn test_no_parameters() {
        let mut b = TreeBuilder::new();
        let cu = b.compile_unit("a.cpp", "/src");
        let s = b.child(cu, gimli::DW_TAG_structure_type);
        let tree = b.finish();
        let options = ReconstructOptions::default();
        let cx = ParseContext::new(&tree, &options);

        assert_eq!(template_clause(&cx, s), None);
    }
}
