use super::{template_prefix, Decl, Parameter, ParseContext};
use crate::template::template_clause;
use dwarfdecl_dwarf::{DieTree, NodeId, TypeName};

/// `DW_AT_virtuality`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Virtuality {
    #[default]
    None,
    Virtual,
    PureVirtual,
}

impl Virtuality {
    pub fn from_dwarf(value: u64) -> Self {
        match value {
            1 => Virtuality::Virtual,
            2 => Virtuality::PureVirtual,
            _ => Virtuality::None,
        }
    }
}

/// A free function or a member function declaration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Function {
    pub decl: Decl,
    pub name: String,
    pub linkage_name: Option<String>,
    pub return_type: TypeName,
    pub parameters: Vec<Parameter>,
    pub template_params: Option<String>,
    pub is_member: bool,
    /// A member function with an implicit object parameter; member
    /// functions without one are static.
    pub has_this: bool,
    pub is_const: bool,
    pub is_explicit: bool,
    pub is_defaulted: bool,
    pub is_deleted: bool,
    pub virtuality: Virtuality,
    /// Declared `inline`, as recorded by `DW_AT_inline`.
    pub is_inline: bool,
    pub is_noreturn: bool,
    /// Constructors, destructors and conversion operators are declared
    /// without a return type, whether or not they carry a linkage name.
    /// Constructors have no `DW_AT_type` and would otherwise print as
    /// returning `void`.
    pub omits_return_type: bool,
}

impl Function {
    pub fn parse(cx: &ParseContext<'_>, node: NodeId, is_member: bool) -> Self {
        let tree = cx.tree();
        let name = tree.short_name(node).unwrap_or_default().to_string();
        let mut function = Function {
            decl: Decl::parse(tree, node),
            linkage_name: tree.linkage_name(node).map(str::to_string),
            return_type: cx
                .printer()
                .split(tree.reference_recursive(node, gimli::DW_AT_type)),
            template_params: template_clause(cx, node),
            is_member,
            is_explicit: tree.flag(node, gimli::DW_AT_explicit),
            is_defaulted: is_defaulted(tree, node),
            is_deleted: tree.flag(node, gimli::DW_AT_deleted),
            virtuality: tree
                .udata(node, gimli::DW_AT_virtuality)
                .map(Virtuality::from_dwarf)
                .unwrap_or_default(),
            is_inline: is_declared_inline(tree, node),
            is_noreturn: tree.flag(node, gimli::DW_AT_noreturn),
            omits_return_type: is_conversion_operator(&name)
                || (is_member && is_structor(tree, node, &name)),
            name,
            ..Default::default()
        };

        let mut first = true;
        for &child in tree.children(node) {
            match tree.tag(child) {
                gimli::DW_TAG_formal_parameter => {
                    if tree.flag(child, gimli::DW_AT_artificial) {
                        if is_member && first {
                            function.has_this = true;
                            function.is_const = this_points_to_const(cx, child);
                        }
                    } else {
                        function.parameters.push(Parameter::parse(cx, child));
                    }
                    first = false;
                }
                gimli::DW_TAG_unspecified_parameters => {
                    function.parameters.push(Parameter::variadic())
                }
                _ => {}
            }
        }
        function
    }

    pub fn is_static(&self) -> bool {
        self.is_member && !self.has_this
    }

    pub fn merge(&mut self, other: Function) {
        self.decl.merge(other.decl);
        if self.name.is_empty() {
            self.name = other.name;
        }
        if self.linkage_name.is_none() {
            self.linkage_name = other.linkage_name;
        }
        if self.return_type.before.is_empty() {
            self.return_type = other.return_type;
        }
        if self.parameters.is_empty() {
            self.parameters = other.parameters;
        }
        if self.template_params.is_none() {
            self.template_params = other.template_params;
        }
        if self.virtuality == Virtuality::None {
            self.virtuality = other.virtuality;
        }
        self.is_member |= other.is_member;
        self.has_this |= other.has_this;
        self.is_const |= other.is_const;
        self.is_explicit |= other.is_explicit;
        self.is_defaulted |= other.is_defaulted;
        self.is_deleted |= other.is_deleted;
        self.is_inline |= other.is_inline;
        self.is_noreturn |= other.is_noreturn;
        self.omits_return_type |= other.omits_return_type;
    }

    /// Overloads share a name, so they are told apart by linkage name when
    /// both sides have one and by their parameter lists otherwise.
    pub fn same_declaration(&self, other: &Function) -> bool {
        if self.name != other.name {
            return false;
        }
        match (&self.linkage_name, &other.linkage_name) {
            (Some(a), Some(b)) => a == b,
            _ => {
                self.parameters.len() == other.parameters.len()
                    && self
                        .parameters
                        .iter()
                        .zip(&other.parameters)
                        .all(|(a, b)| a.type_name == b.type_name)
            }
        }
    }

    pub fn to_source(&self) -> String {
        let mut out = template_prefix(&self.template_params);
        if self.is_noreturn {
            out.push_str("[[noreturn]] ");
        }
        if self.is_static() {
            out.push_str("static ");
        }
        if self.is_inline {
            out.push_str("inline ");
        }
        if self.virtuality != Virtuality::None {
            out.push_str("virtual ");
        }

        let params: Vec<String> = self.parameters.iter().map(Parameter::to_source).collect();
        let mut declarator = String::new();
        if self.is_explicit {
            declarator.push_str("explicit ");
        }
        declarator.push_str(&format!("{}({})", self.name, params.join(", ")));
        if self.is_const {
            declarator.push_str(" const");
        }

        if self.omits_return_type {
            out.push_str(&declarator);
        } else {
            let return_type = if self.return_type.before.is_empty() {
                TypeName::plain("void")
            } else {
                self.return_type.clone()
            };
            out.push_str(&return_type.declare(&declarator));
        }

        if self.virtuality == Virtuality::PureVirtual {
            out.push_str(" = 0");
        }
        if self.is_defaulted {
            out.push_str(" = default");
        }
        if self.is_deleted {
            out.push_str(" = delete");
        }
        out.push(';');
        out
    }
}

/// `DW_AT_defaulted` with `DW_DEFAULTED_no` does not count.
fn is_defaulted(tree: &DieTree, node: NodeId) -> bool {
    match tree.attr(node, gimli::DW_AT_defaulted) {
        Some(value) => value.as_unsigned() != Some(gimli::DW_DEFAULTED_no.0 as u64),
        None => false,
    }
}

/// `DW_INL_declared_not_inlined` or `DW_INL_declared_inlined`; functions
/// the compiler inlined on its own were not written `inline`.
fn is_declared_inline(tree: &DieTree, node: NodeId) -> bool {
    matches!(
        tree.udata(node, gimli::DW_AT_inline),
        Some(v) if v == gimli::DW_INL_declared_not_inlined.0 as u64
            || v == gimli::DW_INL_declared_inlined.0 as u64
    )
}

fn is_conversion_operator(name: &str) -> bool {
    const ALLOCATION: [&str; 5] = [
        "operator new",
        "operator new[]",
        "operator delete",
        "operator delete[]",
        "operator co_await",
    ];
    name.starts_with("operator ") && !ALLOCATION.contains(&name)
}

/// Constructor or destructor of the aggregate enclosing `node`.
fn is_structor(tree: &DieTree, node: NodeId, name: &str) -> bool {
    if name.starts_with('~') {
        return true;
    }
    let Some(parent) = tree.parent(node) else {
        return false;
    };
    match tree.short_name(parent) {
        Some(class) => {
            let class = class.split('<').next().unwrap_or(class);
            !class.is_empty() && class == name.split('<').next().unwrap_or(name)
        }
        None => false,
    }
}

/// Whether the implicit object parameter is a pointer to a const object.
fn this_points_to_const(cx: &ParseContext<'_>, this_param: NodeId) -> bool {
    let tree = cx.tree();
    cx.target(this_param, gimli::DW_AT_type)
        .filter(|&ptr| tree.tag(ptr) == gimli::DW_TAG_pointer_type)
        .and_then(|ptr| cx.target(ptr, gimli::DW_AT_type))
        .map(|pointee| tree.tag(pointee) == gimli::DW_TAG_const_type)
        .unwrap_or(false)
}
