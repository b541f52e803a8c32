//! Incremental construction of a [`DieTree`].
//!
//! The object loader drives the low-level methods with the offsets it reads;
//! tests use the convenience methods, which hand out synthetic offsets.

use crate::die::{AttrValue, DieKey, DieTree, NodeId, UnitClass, UnitId};
use gimli::{DwAt, DwTag};

/// Builds a [`DieTree`] one unit and one DIE at a time.
#[derive(Debug)]
pub struct TreeBuilder {
    tree: DieTree,
    next_info_offset: u64,
    next_type_offset: u64,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            tree: DieTree::default(),
            next_info_offset: 0xb,
            next_type_offset: 0x17,
        }
    }

    fn next_key(&mut self, class: UnitClass) -> DieKey {
        let counter = match class {
            UnitClass::Info => &mut self.next_info_offset,
            UnitClass::Type => &mut self.next_type_offset,
        };
        let offset = *counter;
        *counter += 1;
        DieKey::new(class, offset)
    }

    /// Start a unit whose root DIE lives at `root_key`.
    pub fn begin_unit(
        &mut self,
        class: UnitClass,
        root_key: DieKey,
        root_tag: DwTag,
        type_signature: Option<u64>,
    ) -> (UnitId, NodeId) {
        self.tree.push_unit(class, root_key, root_tag, type_signature)
    }

    /// Append a DIE with a known key under `parent`, within `unit`.
    pub fn push(&mut self, unit: UnitId, key: DieKey, tag: DwTag, parent: NodeId) -> NodeId {
        self.tree.push_die(unit, key, tag, Some(parent))
    }

    /// Record that the type unit with `signature` defines the DIE at `key`.
    pub fn map_signature(&mut self, signature: u64, key: DieKey) -> &mut Self {
        self.tree.register_signature(signature, key);
        self
    }

    /// Compile unit with a name and compilation directory.
    pub fn compile_unit(&mut self, name: &str, comp_dir: &str) -> NodeId {
        let key = self.next_key(UnitClass::Info);
        let (_, root) = self.begin_unit(UnitClass::Info, key, gimli::DW_TAG_compile_unit, None);
        self.attr(root, gimli::DW_AT_name, AttrValue::String(name.to_string()))
            .attr(root, gimli::DW_AT_comp_dir, AttrValue::String(comp_dir.to_string()));
        root
    }

    /// Type unit carrying `signature`, returning its root and its type DIE.
    pub fn type_unit(&mut self, signature: u64, type_tag: DwTag) -> (NodeId, NodeId) {
        let key = self.next_key(UnitClass::Type);
        let (_, root) =
            self.begin_unit(UnitClass::Type, key, gimli::DW_TAG_type_unit, Some(signature));
        let type_die = self.child(root, type_tag);
        let type_key = self.tree.key(type_die);
        self.map_signature(signature, type_key);
        (root, type_die)
    }

    /// Child of `parent` in the same unit, with a fresh offset.
    pub fn child(&mut self, parent: NodeId, tag: DwTag) -> NodeId {
        let unit = self.tree.die(parent).unit;
        let class = self.tree.unit_of(parent).class;
        let key = self.next_key(class);
        self.push(unit, key, tag, parent)
    }

    pub fn attr(&mut self, node: NodeId, at: DwAt, value: AttrValue) -> &mut Self {
        self.tree.push_attr(node, at, value);
        self
    }

    pub fn name(&mut self, node: NodeId, name: &str) -> &mut Self {
        self.attr(node, gimli::DW_AT_name, AttrValue::String(name.to_string()))
    }

    pub fn decl(&mut self, node: NodeId, file: &str, line: u64) -> &mut Self {
        self.attr(node, gimli::DW_AT_decl_file, AttrValue::String(file.to_string()))
            .attr(node, gimli::DW_AT_decl_line, AttrValue::Unsigned(line))
    }

    pub fn flag(&mut self, node: NodeId, at: DwAt) -> &mut Self {
        self.attr(node, at, AttrValue::Flag(true))
    }

    pub fn udata(&mut self, node: NodeId, at: DwAt, value: u64) -> &mut Self {
        self.attr(node, at, AttrValue::Unsigned(value))
    }

    pub fn reference(&mut self, node: NodeId, at: DwAt, target: NodeId) -> &mut Self {
        let key = self.tree.key(target);
        self.attr(node, at, AttrValue::Ref(key))
    }

    /// `DW_AT_type` pointing at `target`.
    pub fn type_ref(&mut self, node: NodeId, target: NodeId) -> &mut Self {
        self.reference(node, gimli::DW_AT_type, target)
    }

    /// `DW_AT_signature` declaration of a type unit's type.
    pub fn signature(&mut self, node: NodeId, signature: u64) -> &mut Self {
        self.attr(node, gimli::DW_AT_signature, AttrValue::Signature(signature))
    }

    /// Named base type under `parent`.
    pub fn base_type(&mut self, parent: NodeId, name: &str, size: u64, encoding: gimli::DwAte) -> NodeId {
        let node = self.child(parent, gimli::DW_TAG_base_type);
        self.name(node, name)
            .udata(node, gimli::DW_AT_byte_size, size)
            .udata(node, gimli::DW_AT_encoding, encoding.0 as u64);
        node
    }

    /// Modifier type (pointer, const, reference, ...) wrapping `target`.
    pub fn modifier(&mut self, parent: NodeId, tag: DwTag, target: Option<NodeId>) -> NodeId {
        let node = self.child(parent, tag);
        if let Some(target) = target {
            self.type_ref(node, target);
        }
        node
    }

    pub fn tree(&self) -> &DieTree {
        &self.tree
    }

    pub fn finish(self) -> DieTree {
        self.tree
    }
}
