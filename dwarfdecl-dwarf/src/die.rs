//! Owned, arena-backed view of the debugging information entries of an object.
//!
//! The loader copies every unit into a [`DieTree`] once, with string forms
//! resolved, file indices turned into paths and references normalized to
//! [`DieKey`]s. Everything downstream navigates this tree instead of the
//! borrowed `gimli` structures, which keeps the reconstruction code free of
//! reader lifetimes and lets tests build trees by hand.

use gimli::{DwAt, DwTag};
use std::collections::{HashMap, HashSet};

/// Which section family a unit came from.
///
/// Offsets are only unique within a family, so identity needs both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnitClass {
    /// `.debug_info` compile/partial units
    Info,
    /// `.debug_types` units, or `DW_UT_type` units of `.debug_info`
    Type,
}

/// Stable identity of a DIE within one loaded object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DieKey {
    pub class: UnitClass,
    pub offset: u64,
}

impl DieKey {
    pub fn new(class: UnitClass, offset: u64) -> Self {
        Self { class, offset }
    }
}

/// Index of a DIE inside its [`DieTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a unit inside its [`DieTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(u32);

/// Attribute payload after loading.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Constant data forms other than `sdata`, and decoded enumerations
    /// such as accessibility or virtuality.
    Unsigned(u64),
    /// `DW_FORM_sdata`
    Signed(i64),
    Flag(bool),
    /// String forms, and `DW_AT_decl_file` resolved to an absolute path.
    String(String),
    /// Reference to another DIE of the same object.
    Ref(DieKey),
    /// `DW_FORM_ref_sig8` reference to a type unit.
    Signature(u64),
    /// Expression or block bytes that could not be folded to a constant.
    Block(Vec<u8>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Unsigned view of a constant; negative `sdata` values do not convert.
    pub fn as_unsigned(&self) -> Option<u64> {
        match *self {
            AttrValue::Unsigned(v) => Some(v),
            AttrValue::Signed(v) if v >= 0 => Some(v as u64),
            AttrValue::Flag(b) => Some(b as u64),
            _ => None,
        }
    }
}

/// A single debugging information entry.
#[derive(Debug, Clone)]
pub struct Die {
    pub key: DieKey,
    pub unit: UnitId,
    pub tag: DwTag,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub attrs: Vec<(DwAt, AttrValue)>,
}

/// Per-unit metadata.
#[derive(Debug, Clone)]
pub struct UnitInfo {
    pub id: UnitId,
    pub class: UnitClass,
    pub root: NodeId,
    pub name: Option<String>,
    pub comp_dir: Option<String>,
    pub type_signature: Option<u64>,
}

impl UnitInfo {
    pub fn is_type_unit(&self) -> bool {
        self.class == UnitClass::Type
    }
}

/// All DIEs of an object, with identity and signature lookups.
#[derive(Debug, Default, Clone)]
pub struct DieTree {
    dies: Vec<Die>,
    units: Vec<UnitInfo>,
    by_key: HashMap<DieKey, NodeId>,
    signatures: HashMap<u64, DieKey>,
}

impl DieTree {
    pub(crate) fn push_unit(
        &mut self,
        class: UnitClass,
        root_key: DieKey,
        root_tag: DwTag,
        type_signature: Option<u64>,
    ) -> (UnitId, NodeId) {
        let id = UnitId(self.units.len() as u32);
        let root = NodeId(self.dies.len() as u32);
        self.units.push(UnitInfo {
            id,
            class,
            root,
            name: None,
            comp_dir: None,
            type_signature,
        });
        self.push_die(id, root_key, root_tag, None);
        (id, root)
    }

    pub(crate) fn push_die(
        &mut self,
        unit: UnitId,
        key: DieKey,
        tag: DwTag,
        parent: Option<NodeId>,
    ) -> NodeId {
        let id = NodeId(self.dies.len() as u32);
        self.dies.push(Die {
            key,
            unit,
            tag,
            parent,
            children: Vec::new(),
            attrs: Vec::new(),
        });
        if let Some(parent) = parent {
            self.dies[parent.index()].children.push(id);
        }
        self.by_key.insert(key, id);
        id
    }

    pub(crate) fn push_attr(&mut self, node: NodeId, at: DwAt, value: AttrValue) {
        let unit = self.dies[node.index()].unit;
        if self.units[unit.0 as usize].root == node {
            match at {
                gimli::DW_AT_name => self.units[unit.0 as usize].name = value.as_str().map(str::to_string),
                gimli::DW_AT_comp_dir => {
                    self.units[unit.0 as usize].comp_dir = value.as_str().map(str::to_string)
                }
                _ => {}
            }
        }
        self.dies[node.index()].attrs.push((at, value));
    }

    pub(crate) fn register_signature(&mut self, signature: u64, type_die: DieKey) {
        self.signatures.insert(signature, type_die);
    }

    pub fn len(&self) -> usize {
        self.dies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dies.is_empty()
    }

    /// Every unit in load order.
    pub fn units(&self) -> &[UnitInfo] {
        &self.units
    }

    pub fn compile_units(&self) -> impl Iterator<Item = &UnitInfo> {
        self.units.iter().filter(|u| !u.is_type_unit())
    }

    pub fn type_units(&self) -> impl Iterator<Item = &UnitInfo> {
        self.units.iter().filter(|u| u.is_type_unit())
    }

    pub fn die(&self, node: NodeId) -> &Die {
        &self.dies[node.index()]
    }

    pub fn node(&self, key: DieKey) -> Option<NodeId> {
        self.by_key.get(&key).copied()
    }

    pub fn key(&self, node: NodeId) -> DieKey {
        self.die(node).key
    }

    pub fn tag(&self, node: NodeId) -> DwTag {
        self.die(node).tag
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.die(node).parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.die(node).children
    }

    pub fn unit_of(&self, node: NodeId) -> &UnitInfo {
        &self.units[self.die(node).unit.0 as usize]
    }

    /// Whether `node` is the root DIE of its unit.
    pub fn is_unit_root(&self, node: NodeId) -> bool {
        self.unit_of(node).root == node
    }

    /// Attribute carried directly by `node`.
    pub fn attr(&self, node: NodeId, at: DwAt) -> Option<&AttrValue> {
        self.die(node)
            .attrs
            .iter()
            .find(|(name, _)| *name == at)
            .map(|(_, value)| value)
    }

    pub fn has_attr(&self, node: NodeId, at: DwAt) -> bool {
        self.attr(node, at).is_some()
    }

    /// Attribute of `node`, falling back through `DW_AT_specification` and
    /// `DW_AT_abstract_origin` chains.
    pub fn attr_recursive(&self, node: NodeId, at: DwAt) -> Option<&AttrValue> {
        let mut visited = HashSet::new();
        let mut pending = vec![node];
        while let Some(current) = pending.pop() {
            if !visited.insert(current) {
                continue;
            }
            if let Some(value) = self.attr(current, at) {
                return Some(value);
            }
            for link in [gimli::DW_AT_abstract_origin, gimli::DW_AT_specification] {
                if let Some(next) = self.reference(current, link) {
                    pending.push(next);
                }
            }
        }
        None
    }

    /// `DW_AT_name`, looking through declaration links.
    pub fn short_name(&self, node: NodeId) -> Option<&str> {
        self.attr_recursive(node, gimli::DW_AT_name)
            .and_then(AttrValue::as_str)
    }

    pub fn linkage_name(&self, node: NodeId) -> Option<&str> {
        self.attr_recursive(node, gimli::DW_AT_linkage_name)
            .or_else(|| self.attr_recursive(node, gimli::DW_AT_MIPS_linkage_name))
            .and_then(AttrValue::as_str)
    }

    /// Absolute declaration file path, looking through declaration links.
    pub fn decl_file(&self, node: NodeId) -> Option<&str> {
        self.attr_recursive(node, gimli::DW_AT_decl_file)
            .and_then(AttrValue::as_str)
    }

    pub fn decl_line(&self, node: NodeId) -> Option<u64> {
        self.attr_recursive(node, gimli::DW_AT_decl_line)
            .and_then(AttrValue::as_unsigned)
    }

    pub fn udata(&self, node: NodeId, at: DwAt) -> Option<u64> {
        self.attr(node, at).and_then(AttrValue::as_unsigned)
    }

    /// Flag semantics: present and not an explicit `false`.
    pub fn flag(&self, node: NodeId, at: DwAt) -> bool {
        !matches!(self.attr(node, at), None | Some(AttrValue::Flag(false)))
    }

    /// Follow a reference-class attribute of `node`.
    pub fn reference(&self, node: NodeId, at: DwAt) -> Option<NodeId> {
        self.follow(node, self.attr(node, at)?)
    }

    /// Like [`DieTree::reference`], looking through declaration links.
    pub fn reference_recursive(&self, node: NodeId, at: DwAt) -> Option<NodeId> {
        self.follow(node, self.attr_recursive(node, at)?)
    }

    fn follow(&self, node: NodeId, value: &AttrValue) -> Option<NodeId> {
        match value {
            AttrValue::Ref(key) => {
                // ref_addr into a DWARF 5 type unit carries a plain section offset
                let target = self.node(*key).or_else(|| match key.class {
                    UnitClass::Info => self.node(DieKey::new(UnitClass::Type, key.offset)),
                    UnitClass::Type => None,
                });
                if target.is_none() {
                    tracing::debug!("Dangling reference {:?} from {:?}", key, self.key(node));
                }
                target
            }
            AttrValue::Signature(sig) => self.signature_target(*sig),
            _ => None,
        }
    }

    /// Type DIE of the type unit carrying `signature`.
    pub fn signature_target(&self, signature: u64) -> Option<NodeId> {
        self.signatures
            .get(&signature)
            .and_then(|key| self.node(*key))
    }

    /// The definition a `DW_AT_signature` declaration stands for, or `node`
    /// itself when it carries no signature or the type unit is missing.
    pub fn resolve_type_unit(&self, node: NodeId) -> NodeId {
        match self.attr(node, gimli::DW_AT_signature) {
            Some(AttrValue::Signature(sig)) => self.signature_target(*sig).unwrap_or(node),
            Some(AttrValue::Ref(key)) => self.node(*key).unwrap_or(node),
            _ => node,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TreeBuilder;

    #[test]
    fn test_recursive_lookup_follows_specification() {
        let mut b = TreeBuilder::new();
        let cu = b.compile_unit("main.cpp", "/src");
        let decl = b.child(cu, gimli::DW_TAG_subprogram);
        b.name(decl, "run").decl(decl, "/src/run.h", 4);
        let def = b.child(cu, gimli::DW_TAG_subprogram);
        b.reference(def, gimli::DW_AT_specification, decl);
        let tree = b.finish();

        assert_eq!(tree.short_name(def), Some("run"));
        assert_eq!(tree.decl_line(def), Some(4));
        assert!(!tree.has_attr(def, gimli::DW_AT_name));
    }

    #[test]
    fn test_recursive_lookup_survives_cycles() {
        let mut b = TreeBuilder::new();
        let cu = b.compile_unit("main.cpp", "/src");
        let a = b.child(cu, gimli::DW_TAG_subprogram);
        let c = b.child(cu, gimli::DW_TAG_subprogram);
        b.reference(a, gimli::DW_AT_specification, c);
        b.reference(c, gimli::DW_AT_abstract_origin, a);
        let tree = b.finish();

        assert_eq!(tree.short_name(a), None);
    }

    #[test]
    fn test_type_unit_resolution() {
        let mut b = TreeBuilder::new();
        let (_, tu_type) = b.type_unit(0xfeed, gimli::DW_TAG_structure_type);
        b.name(tu_type, "Foo").decl(tu_type, "/src/foo.h", 3);
        let cu = b.compile_unit("main.cpp", "/src");
        let decl = b.child(cu, gimli::DW_TAG_structure_type);
        b.signature(decl, 0xfeed);
        let orphan = b.child(cu, gimli::DW_TAG_structure_type);
        b.signature(orphan, 0xdead);
        let tree = b.finish();

        assert_eq!(tree.resolve_type_unit(decl), tu_type);
        assert_eq!(tree.resolve_type_unit(orphan), orphan);
        assert_eq!(tree.resolve_type_unit(cu), cu);
        assert_eq!(tree.key(tu_type).class, UnitClass::Type);
        assert_eq!(tree.type_units().count(), 1);
        assert_eq!(tree.compile_units().count(), 1);
    }

    #[test]
    fn test_unit_metadata_and_flags() {
        let mut b = TreeBuilder::new();
        let cu = b.compile_unit("lib/a.cpp", "/build");
        let v = b.child(cu, gimli::DW_TAG_member);
        b.attr(v, gimli::DW_AT_external, AttrValue::Flag(true))
            .attr(v, gimli::DW_AT_mutable, AttrValue::Flag(false))
            .attr(v, gimli::DW_AT_byte_size, AttrValue::Signed(-1));
        let tree = b.finish();

        let unit = tree.unit_of(v);
        assert_eq!(unit.name.as_deref(), Some("lib/a.cpp"));
        assert_eq!(unit.comp_dir.as_deref(), Some("/build"));
        assert!(tree.is_unit_root(cu));
        assert!(tree.flag(v, gimli::DW_AT_external));
        assert!(!tree.flag(v, gimli::DW_AT_mutable));
        assert_eq!(tree.udata(v, gimli::DW_AT_byte_size), None);
        assert_eq!(tree.parent(v), Some(cu));
    }
}
