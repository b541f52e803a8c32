//! Reconstructed declarations.
//!
//! Every declaration kind is parsed from a DIE into a plain value and can
//! render itself as C++ text. Parsing the same declaration again (from
//! another compilation unit, or from a declaration stub of a type-unit
//! definition) produces a second value that is folded into the first with
//! [`Entity::merge`]: scalars keep their first value, containers are only
//! filled while empty, and boolean properties are or-ed.

mod aggregate;
mod enumeration;
mod field;
mod function;
mod import;
mod parameter;
mod typedef;

pub use aggregate::{Aggregate, AggregateKind, BaseClass};
pub use enumeration::{Enum, Enumerator};
pub use field::Field;
pub use function::{Function, Virtuality};
pub use import::{Import, ImportKind};
pub use parameter::Parameter;
pub use typedef::Typedef;

use crate::options::ReconstructOptions;
use dwarfdecl_dwarf::{DieTree, DwTag, NodeId, TypeName, TypePrinter};
use std::cell::Cell;
use tracing::debug;

/// C++ member access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Public,
    Protected,
    Private,
}

impl Access {
    /// Decode a `DW_AT_accessibility` value.
    pub fn from_dwarf(value: u64) -> Option<Self> {
        match value {
            1 => Some(Access::Public),
            2 => Some(Access::Protected),
            3 => Some(Access::Private),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Access::Public => "public",
            Access::Protected => "protected",
            Access::Private => "private",
        }
    }
}

/// One enclosing namespace of a declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Namespace {
    /// Empty for an anonymous namespace.
    pub name: String,
    /// `inline namespace`, marked by `DW_AT_export_symbols`.
    pub is_inline: bool,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_inline: false,
        }
    }

    pub fn parse(tree: &DieTree, node: NodeId) -> Self {
        let name = tree.short_name(node).unwrap_or_default().to_string();
        Self {
            is_inline: !name.is_empty() && tree.flag(node, gimli::DW_AT_export_symbols),
            name,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_empty()
    }
}

/// Properties every declaration carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decl {
    /// Enclosing namespaces, outermost first.
    pub namespaces: Vec<Namespace>,
    pub access: Option<Access>,
}

impl Decl {
    pub(crate) fn parse(tree: &DieTree, node: NodeId) -> Self {
        Self {
            namespaces: Vec::new(),
            access: tree
                .udata(node, gimli::DW_AT_accessibility)
                .and_then(Access::from_dwarf),
        }
    }

    pub(crate) fn merge(&mut self, other: Decl) {
        if self.namespaces.is_empty() {
            self.namespaces = other.namespaces;
        }
        if self.access.is_none() {
            self.access = other.access;
        }
    }
}

/// Which entity a DIE is parsed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Typedef,
    Parameter,
    Function { is_member: bool },
    Enum,
    Field,
    /// Variable declared at namespace scope.
    Variable,
    Import,
    Aggregate(AggregateKind),
}

impl EntityKind {
    /// Kind of a declaration that can stand on its own at file or
    /// namespace scope.
    pub fn for_declaration(tag: DwTag) -> Option<Self> {
        match tag {
            gimli::DW_TAG_typedef => Some(EntityKind::Typedef),
            gimli::DW_TAG_subprogram => Some(EntityKind::Function { is_member: false }),
            gimli::DW_TAG_enumeration_type => Some(EntityKind::Enum),
            gimli::DW_TAG_variable => Some(EntityKind::Variable),
            gimli::DW_TAG_imported_module | gimli::DW_TAG_imported_declaration => {
                Some(EntityKind::Import)
            }
            _ => AggregateKind::from_tag(tag).map(EntityKind::Aggregate),
        }
    }

    /// `using namespace` directives carry no name of their own.
    pub fn requires_name(self) -> bool {
        self != EntityKind::Import
    }
}

/// State shared while parsing declarations out of one [`DieTree`].
pub struct ParseContext<'a> {
    tree: &'a DieTree,
    printer: TypePrinter<'a>,
    options: &'a ReconstructOptions,
    inline_depth: Cell<usize>,
}

impl<'a> ParseContext<'a> {
    pub fn new(tree: &'a DieTree, options: &'a ReconstructOptions) -> Self {
        Self {
            tree,
            printer: TypePrinter::new(tree),
            options,
            inline_depth: Cell::new(0),
        }
    }

    pub fn tree(&self) -> &'a DieTree {
        self.tree
    }

    pub fn printer(&self) -> &TypePrinter<'a> {
        &self.printer
    }

    pub fn options(&self) -> &ReconstructOptions {
        self.options
    }

    /// The node `at` refers to, with type-unit declarations resolved.
    pub(crate) fn target(&self, node: NodeId, at: gimli::DwAt) -> Option<NodeId> {
        self.tree
            .reference(node, at)
            .map(|target| self.tree.resolve_type_unit(target))
    }

    pub(crate) fn type_name(&self, node: NodeId) -> String {
        self.printer.type_name(self.tree.reference(node, gimli::DW_AT_type))
    }

    pub(crate) fn split_type(&self, node: NodeId) -> TypeName {
        self.printer.split(self.tree.reference(node, gimli::DW_AT_type))
    }

    /// Whether `node` is an aggregate or enum without a name, the kind of
    /// type that is spelled out where it is used.
    pub(crate) fn is_anonymous_type(&self, node: NodeId) -> bool {
        let tag = self.tree.tag(node);
        (tag == gimli::DW_TAG_enumeration_type || AggregateKind::from_tag(tag).is_some())
            && self.tree.short_name(node).is_none()
    }

    /// Full definition of an anonymous aggregate or enum, without the
    /// trailing `;`, ready to be used in place of a type name.
    pub(crate) fn inline_definition(&self, node: NodeId) -> Option<String> {
        if !self.is_anonymous_type(node) {
            return None;
        }
        let kind = EntityKind::for_declaration(self.tree.tag(node))?;
        let depth = self.inline_depth.get();
        if depth >= self.options.max_inline_depth {
            debug!(
                "Not inlining anonymous type at {:?}: nesting limit {} reached",
                self.tree.key(node),
                self.options.max_inline_depth
            );
            return None;
        }

        self.inline_depth.set(depth + 1);
        let entity = Entity::parse(self, kind, node);
        self.inline_depth.set(depth);

        let mut text = entity.to_source();
        if text.ends_with(';') {
            text.pop();
        }
        Some(text)
    }
}

/// A reconstructed declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Typedef(Typedef),
    Parameter(Parameter),
    Function(Function),
    Enum(Enum),
    Field(Field),
    Import(Import),
    Aggregate(Aggregate),
}

impl Entity {
    /// Parse `node` as an entity of `kind`.
    pub fn parse(cx: &ParseContext<'_>, kind: EntityKind, node: NodeId) -> Self {
        match kind {
            EntityKind::Typedef => Entity::Typedef(Typedef::parse(cx, node)),
            EntityKind::Parameter => Entity::Parameter(Parameter::parse(cx, node)),
            EntityKind::Function { is_member } => {
                Entity::Function(Function::parse(cx, node, is_member))
            }
            EntityKind::Enum => Entity::Enum(Enum::parse(cx, node)),
            EntityKind::Field => Entity::Field(Field::parse(cx, node)),
            EntityKind::Variable => Entity::Field(Field::parse_variable(cx, node)),
            EntityKind::Import => Entity::Import(Import::parse(cx, node)),
            EntityKind::Aggregate(kind) => Entity::Aggregate(Aggregate::parse(cx, kind, node)),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Typedef(_) => EntityKind::Typedef,
            Entity::Parameter(_) => EntityKind::Parameter,
            Entity::Function(f) => EntityKind::Function {
                is_member: f.is_member,
            },
            Entity::Enum(_) => EntityKind::Enum,
            Entity::Field(f) if f.is_variable => EntityKind::Variable,
            Entity::Field(_) => EntityKind::Field,
            Entity::Import(_) => EntityKind::Import,
            Entity::Aggregate(a) => EntityKind::Aggregate(a.kind),
        }
    }

    /// Fold a later parse of the same declaration into this one.
    pub fn merge(&mut self, other: Entity) {
        match (self, other) {
            (Entity::Typedef(a), Entity::Typedef(b)) => a.merge(b),
            (Entity::Parameter(a), Entity::Parameter(b)) => a.merge(b),
            (Entity::Function(a), Entity::Function(b)) => a.merge(b),
            (Entity::Enum(a), Entity::Enum(b)) => a.merge(b),
            (Entity::Field(a), Entity::Field(b)) => a.merge(b),
            (Entity::Import(a), Entity::Import(b)) => a.merge(b),
            (Entity::Aggregate(a), Entity::Aggregate(b)) => a.merge(b),
            (this, other) => debug!(
                "Ignoring merge of {:?} into {:?} '{}'",
                other.kind(),
                this.kind(),
                this.name()
            ),
        }
    }

    pub fn to_source(&self) -> String {
        match self {
            Entity::Typedef(t) => t.to_source(),
            Entity::Parameter(p) => p.to_source(),
            Entity::Function(f) => f.to_source(),
            Entity::Enum(e) => e.to_source(),
            Entity::Field(f) => f.to_source(),
            Entity::Import(i) => i.to_source(),
            Entity::Aggregate(a) => a.to_source(),
        }
    }

    pub fn decl(&self) -> &Decl {
        match self {
            Entity::Typedef(t) => &t.decl,
            Entity::Parameter(p) => &p.decl,
            Entity::Function(f) => &f.decl,
            Entity::Enum(e) => &e.decl,
            Entity::Field(f) => &f.decl,
            Entity::Import(i) => &i.decl,
            Entity::Aggregate(a) => &a.decl,
        }
    }

    pub fn decl_mut(&mut self) -> &mut Decl {
        match self {
            Entity::Typedef(t) => &mut t.decl,
            Entity::Parameter(p) => &mut p.decl,
            Entity::Function(f) => &mut f.decl,
            Entity::Enum(e) => &mut e.decl,
            Entity::Field(f) => &mut f.decl,
            Entity::Import(i) => &mut i.decl,
            Entity::Aggregate(a) => &mut a.decl,
        }
    }

    pub fn namespaces(&self) -> &[Namespace] {
        &self.decl().namespaces
    }

    pub fn access(&self) -> Option<Access> {
        self.decl().access
    }

    /// Declared name; the first alias for typedefs.
    pub fn name(&self) -> &str {
        match self {
            Entity::Typedef(t) => t.names.first().map(String::as_str).unwrap_or(""),
            Entity::Parameter(p) => &p.name,
            Entity::Function(f) => &f.name,
            Entity::Enum(e) => &e.name,
            Entity::Field(f) => &f.name,
            Entity::Import(i) => &i.target,
            Entity::Aggregate(a) => &a.name,
        }
    }

    /// Whether the parse produced something that can be written out.
    pub fn is_renderable(&self) -> bool {
        match self {
            Entity::Import(i) => !i.target.is_empty(),
            _ => true,
        }
    }

    /// Whether `other` declares the same thing as `self`, so that two
    /// different DIEs describing one source declaration collapse into one.
    /// Declarations in different namespaces never match.
    pub fn same_declaration(&self, other: &Entity) -> bool {
        if self.namespaces() != other.namespaces() {
            return false;
        }
        match (self, other) {
            (Entity::Typedef(a), Entity::Typedef(b)) => a.same_declaration(b),
            (Entity::Function(a), Entity::Function(b)) => a.same_declaration(b),
            (Entity::Aggregate(a), Entity::Aggregate(b)) => {
                a.kind == b.kind && !a.name.is_empty() && a.name == b.name
            }
            (Entity::Enum(a), Entity::Enum(b)) => !a.name.is_empty() && a.name == b.name,
            (Entity::Field(a), Entity::Field(b)) => {
                a.is_variable == b.is_variable && !a.name.is_empty() && a.name == b.name
            }
            (Entity::Import(a), Entity::Import(b)) => a.kind == b.kind && a.target == b.target,
            (Entity::Parameter(a), Entity::Parameter(b)) => a.name == b.name,
            _ => false,
        }
    }
}

/// Render `// template <...>` on its own line when a clause is present.
pub(crate) fn template_prefix(clause: &Option<String>) -> String {
    match clause {
        Some(clause) => format!("// {clause}\n"),
        None => String::new(),
    }
}
