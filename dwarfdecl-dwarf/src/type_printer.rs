//! C++ spelling of DWARF types.
//!
//! Types are printed as a declarator pair: the text that goes before a
//! declared name and the text that goes after it, so `int (*cb)(char)` and
//! `char buf[16]` can be assembled around their names.

use crate::die::{AttrValue, DieTree, NodeId};
use std::cell::RefCell;
use std::collections::HashSet;
use tracing::debug;

/// Default nesting limit for type expressions.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// A type split around the position of a declared name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeName {
    pub before: String,
    pub after: String,
}

impl TypeName {
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            before: name.into(),
            after: String::new(),
        }
    }

    /// The type on its own, e.g. `int (*)(char)`.
    pub fn joined(&self) -> String {
        format!("{}{}", self.before, self.after)
    }

    /// The type declaring `name`, e.g. `int (*cb)(char)`.
    pub fn declare(&self, name: &str) -> String {
        if name.is_empty() {
            return self.joined();
        }
        if self.before.is_empty() || self.before.ends_with(&['*', '&', '('][..]) {
            format!("{}{}{}", self.before, name, self.after)
        } else {
            format!("{} {}{}", self.before, name, self.after)
        }
    }
}

/// Prints type DIEs of a [`DieTree`] as C++ type expressions.
#[derive(Debug)]
pub struct TypePrinter<'a> {
    tree: &'a DieTree,
    max_depth: usize,
    in_progress: RefCell<HashSet<NodeId>>,
}

impl<'a> TypePrinter<'a> {
    pub fn new(tree: &'a DieTree) -> Self {
        Self::with_max_depth(tree, DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(tree: &'a DieTree, max_depth: usize) -> Self {
        Self {
            tree,
            max_depth,
            in_progress: RefCell::new(HashSet::new()),
        }
    }

    /// Full spelling of the type at `node`; `None` is `void`.
    pub fn type_name(&self, node: Option<NodeId>) -> String {
        self.split(node).joined()
    }

    /// Spelling of the type at `node` split around a declarator name.
    pub fn split(&self, node: Option<NodeId>) -> TypeName {
        self.render(node, 0)
    }

    /// Name of a named entity prefixed with its enclosing namespaces and
    /// aggregates.
    pub fn qualified_name(&self, node: NodeId) -> String {
        let node = self.tree.resolve_type_unit(node);
        let mut scopes = Vec::new();
        let mut current = self.tree.parent(node);
        while let Some(scope) = current {
            let tag = self.tree.tag(scope);
            match tag {
                gimli::DW_TAG_namespace => scopes.push(
                    self.tree
                        .short_name(scope)
                        .unwrap_or("(anonymous namespace)")
                        .to_string(),
                ),
                gimli::DW_TAG_structure_type
                | gimli::DW_TAG_class_type
                | gimli::DW_TAG_union_type
                | gimli::DW_TAG_enumeration_type => match self.tree.short_name(scope) {
                    Some(name) => scopes.push(name.to_string()),
                    None => scopes.push(anonymous_name(tag).to_string()),
                },
                _ => break,
            }
            current = self.tree.parent(scope);
        }
        scopes.reverse();
        scopes.push(self.local_name(node));
        scopes.join("::")
    }

    fn local_name(&self, node: NodeId) -> String {
        match self.tree.short_name(node) {
            Some(name) => name.to_string(),
            None => anonymous_name(self.tree.tag(node)).to_string(),
        }
    }

    fn render(&self, node: Option<NodeId>, depth: usize) -> TypeName {
        let Some(node) = node else {
            return TypeName::plain("void");
        };
        let node = self.tree.resolve_type_unit(node);

        if depth >= self.max_depth || self.in_progress.borrow().contains(&node) {
            debug!("Type nesting limit reached at {:?}", self.tree.key(node));
            return TypeName::plain(self.local_name(node));
        }

        self.in_progress.borrow_mut().insert(node);
        let inner = || self.render(self.tree.reference(node, gimli::DW_AT_type), depth + 1);
        let rendered = match self.tree.tag(node) {
            gimli::DW_TAG_pointer_type => self.pointer_like(inner(), node, "*"),
            gimli::DW_TAG_reference_type => self.pointer_like(inner(), node, "&"),
            gimli::DW_TAG_rvalue_reference_type => self.pointer_like(inner(), node, "&&"),
            gimli::DW_TAG_ptr_to_member_type => {
                let class = self
                    .tree
                    .reference(node, gimli::DW_AT_containing_type)
                    .map(|c| self.qualified_name(c))
                    .unwrap_or_default();
                self.pointer_like(inner(), node, &format!("{class}::*"))
            }
            gimli::DW_TAG_const_type => self.qualify(inner(), node, "const"),
            gimli::DW_TAG_volatile_type => self.qualify(inner(), node, "volatile"),
            gimli::DW_TAG_restrict_type => self.qualify(inner(), node, "__restrict"),
            gimli::DW_TAG_atomic_type => {
                let inner = inner();
                TypeName {
                    before: format!("_Atomic({})", inner.joined()),
                    after: String::new(),
                }
            }
            gimli::DW_TAG_array_type => {
                let inner = inner();
                let dims = self.array_dimensions(node);
                TypeName {
                    before: inner.before,
                    after: format!("{dims}{}", inner.after),
                }
            }
            gimli::DW_TAG_subroutine_type => {
                let ret = inner();
                let params = self.parameter_list(node, depth);
                TypeName {
                    before: ret.before,
                    after: format!("({params}){}", ret.after),
                }
            }
            gimli::DW_TAG_unspecified_type => {
                TypeName::plain(self.tree.short_name(node).unwrap_or("void"))
            }
            _ => TypeName::plain(self.qualified_name(node)),
        };
        self.in_progress.borrow_mut().remove(&node);
        rendered
    }

    /// Pointers, references and pointers to members wrap their pointee,
    /// adding parentheses around the marker when the pointee is an array or
    /// a function.
    fn pointer_like(&self, pointee: TypeName, node: NodeId, marker: &str) -> TypeName {
        let needs_parens = self
            .tree
            .reference(node, gimli::DW_AT_type)
            .map(|t| self.tree.resolve_type_unit(t))
            .map(|t| {
                matches!(
                    self.tree.tag(t),
                    gimli::DW_TAG_array_type | gimli::DW_TAG_subroutine_type
                )
            })
            .unwrap_or(false);

        if needs_parens {
            TypeName {
                before: format!("{} ({marker}", pointee.before),
                after: format!("){}", pointee.after),
            }
        } else {
            TypeName {
                before: attach(&pointee.before, marker),
                after: pointee.after,
            }
        }
    }

    /// cv-qualifiers go after a pointer declarator and before anything else.
    fn qualify(&self, inner: TypeName, node: NodeId, qualifier: &str) -> TypeName {
        let target_is_indirect = self
            .tree
            .reference(node, gimli::DW_AT_type)
            .map(|t| self.tree.resolve_type_unit(t))
            .map(|t| {
                matches!(
                    self.tree.tag(t),
                    gimli::DW_TAG_pointer_type
                        | gimli::DW_TAG_reference_type
                        | gimli::DW_TAG_rvalue_reference_type
                        | gimli::DW_TAG_ptr_to_member_type
                )
            })
            .unwrap_or(false);

        if target_is_indirect {
            TypeName {
                before: attach(&inner.before, qualifier),
                after: inner.after,
            }
        } else {
            TypeName {
                before: format!("{qualifier} {}", inner.before),
                after: inner.after,
            }
        }
    }

    fn array_dimensions(&self, node: NodeId) -> String {
        let mut dims = String::new();
        for &child in self.tree.children(node) {
            if self.tree.tag(child) != gimli::DW_TAG_subrange_type {
                continue;
            }
            let count = self.tree.udata(child, gimli::DW_AT_count).or_else(|| {
                match self.tree.attr(child, gimli::DW_AT_upper_bound) {
                    Some(AttrValue::Unsigned(upper)) => upper.checked_add(1),
                    Some(AttrValue::Signed(upper)) if *upper >= 0 => Some(*upper as u64 + 1),
                    _ => None,
                }
            });
            match count {
                Some(count) => dims.push_str(&format!("[{count}]")),
                None => dims.push_str("[]"),
            }
        }
        if dims.is_empty() {
            dims.push_str("[]");
        }
        dims
    }

    fn parameter_list(&self, node: NodeId, depth: usize) -> String {
        let mut params = Vec::new();
        for &child in self.tree.children(node) {
            match self.tree.tag(child) {
                gimli::DW_TAG_formal_parameter => {
                    if self.tree.flag(child, gimli::DW_AT_artificial) {
                        continue;
                    }
                    let ty = self.render(self.tree.reference(child, gimli::DW_AT_type), depth + 1);
                    params.push(ty.joined());
                }
                gimli::DW_TAG_unspecified_parameters => params.push("...".to_string()),
                _ => {}
            }
        }
        params.join(", ")
    }
}

fn attach(before: &str, marker: &str) -> String {
    if before.ends_with(&['*', '&'][..]) {
        format!("{before}{marker}")
    } else {
        format!("{before} {marker}")
    }
}

fn anonymous_name(tag: gimli::DwTag) -> &'static str {
    match tag {
        gimli::DW_TAG_structure_type => "(anonymous struct)",
        gimli::DW_TAG_class_type => "(anonymous class)",
        gimli::DW_TAG_union_type => "(anonymous union)",
        gimli::DW_TAG_enumeration_type => "(anonymous enum)",
        gimli::DW_TAG_namespace => "(anonymous namespace)",
        _ => "(unnamed)",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TreeBuilder;

    #[test]
    fn test_pointer_and_qualifiers() {
        let mut b = TreeBuilder::new();
        let cu = b.compile_unit("a.cpp", "/src");
        let int = b.base_type(cu, "int", 4, gimli::DW_ATE_signed);
        let cint = b.modifier(cu, gimli::DW_TAG_const_type, Some(int));
        let ptr = b.modifier(cu, gimli::DW_TAG_pointer_type, Some(cint));
        let cptr = b.modifier(cu, gimli::DW_TAG_const_type, Some(ptr));
        let pp = b.modifier(cu, gimli::DW_TAG_pointer_type, Some(ptr));
        let void_ptr = b.modifier(cu, gimli::DW_TAG_pointer_type, None);
        let rref = b.modifier(cu, gimli::DW_TAG_rvalue_reference_type, Some(int));
        let tree = b.finish();
        let printer = TypePrinter::new(&tree);

        assert_eq!(printer.type_name(Some(ptr)), "const int *");
        assert_eq!(printer.type_name(Some(cptr)), "const int *const");
        assert_eq!(printer.type_name(Some(pp)), "const int **");
        assert_eq!(printer.type_name(Some(void_ptr)), "void *");
        assert_eq!(printer.type_name(Some(rref)), "int &&");
        assert_eq!(printer.type_name(None), "void");
        assert_eq!(printer.split(Some(ptr)).declare("p"), "const int *p");
    }

    #[test]
    fn test_function_pointer_and_array_declarators() {
        let mut b = TreeBuilder::new();
        let cu = b.compile_unit("a.cpp", "/src");
        let chr = b.base_type(cu, "char", 1, gimli::DW_ATE_signed_char);
        let func = b.child(cu, gimli::DW_TAG_subroutine_type);
        let p = b.child(func, gimli::DW_TAG_formal_parameter);
        b.type_ref(p, chr);
        b.child(func, gimli::DW_TAG_unspecified_parameters);
        let fptr = b.modifier(cu, gimli::DW_TAG_pointer_type, Some(func));
        let arr = b.modifier(cu, gimli::DW_TAG_array_type, Some(chr));
        let sub = b.child(arr, gimli::DW_TAG_subrange_type);
        b.udata(sub, gimli::DW_AT_upper_bound, 15);
        let arr_ptr = b.modifier(cu, gimli::DW_TAG_pointer_type, Some(arr));
        let tree = b.finish();
        let printer = TypePrinter::new(&tree);

        assert_eq!(printer.split(Some(fptr)).declare("cb"), "void (*cb)(char, ...)");
        assert_eq!(printer.type_name(Some(fptr)), "void (*)(char, ...)");
        assert_eq!(printer.split(Some(arr)).declare("buf"), "char buf[16]");
        assert_eq!(printer.split(Some(arr_ptr)).declare("p"), "char (*p)[16]");
    }

    #[test]
    fn test_qualified_names() {
        let mut b = TreeBuilder::new();
        let cu = b.compile_unit("a.cpp", "/src");
        let ns = b.child(cu, gimli::DW_TAG_namespace);
        b.name(ns, "outer");
        let anon = b.child(ns, gimli::DW_TAG_namespace);
        let class = b.child(anon, gimli::DW_TAG_class_type);
        b.name(class, "Widget");
        let nested = b.child(class, gimli::DW_TAG_structure_type);
        let tree = b.finish();
        let printer = TypePrinter::new(&tree);

        assert_eq!(
            printer.qualified_name(class),
            "outer::(anonymous namespace)::Widget"
        );
        assert_eq!(
            printer.type_name(Some(nested)),
            "outer::(anonymous namespace)::Widget::(anonymous struct)"
        );
    }

    #[test]
    fn test_member_pointer_and_type_unit_target() {
        let mut b = TreeBuilder::new();
        let (_, tu_type) = b.type_unit(0x42, gimli::DW_TAG_structure_type);
        b.name(tu_type, "Node");
        let cu = b.compile_unit("a.cpp", "/src");
        let int = b.base_type(cu, "int", 4, gimli::DW_ATE_signed);
        let decl = b.child(cu, gimli::DW_TAG_structure_type);
        b.signature(decl, 0x42);
        let ptr = b.modifier(cu, gimli::DW_TAG_pointer_type, Some(decl));
        let member_ptr = b.modifier(cu, gimli::DW_TAG_ptr_to_member_type, Some(int));
        b.reference(member_ptr, gimli::DW_AT_containing_type, decl);
        let tree = b.finish();
        let printer = TypePrinter::new(&tree);

        assert_eq!(printer.type_name(Some(ptr)), "Node *");
        assert_eq!(printer.split(Some(member_ptr)).declare("pm"), "int Node::*pm");
    }

    #[test]
    fn test_self_referential_type_terminates() {
        let mut b = TreeBuilder::new();
        let cu = b.compile_unit("a.cpp", "/src");
        let a = b.child(cu, gimli::DW_TAG_pointer_type);
        let c = b.modifier(cu, gimli::DW_TAG_const_type, Some(a));
        b.type_ref(a, c);
        let tree = b.finish();
        let printer = TypePrinter::new(&tree);

        // Malformed input, only termination matters
        let _ = printer.type_name(Some(a));
    }
}
