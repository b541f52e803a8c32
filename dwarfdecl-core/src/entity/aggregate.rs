use super::{template_prefix, Access, Decl, Entity, EntityKind, ParseContext};
use crate::template::template_clause;
use dwarfdecl_dwarf::path::normalize;
use dwarfdecl_dwarf::{DwTag, NodeId};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AggregateKind {
    Class,
    #[default]
    Struct,
    Union,
}

impl AggregateKind {
    pub fn from_tag(tag: DwTag) -> Option<Self> {
        match tag {
            gimli::DW_TAG_class_type => Some(AggregateKind::Class),
            gimli::DW_TAG_structure_type => Some(AggregateKind::Struct),
            gimli::DW_TAG_union_type => Some(AggregateKind::Union),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            AggregateKind::Class => "class",
            AggregateKind::Struct => "struct",
            AggregateKind::Union => "union",
        }
    }

    /// Access of members and bases that carry no explicit accessibility.
    pub fn default_access(self) -> Access {
        match self {
            AggregateKind::Class => Access::Private,
            AggregateKind::Struct | AggregateKind::Union => Access::Public,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseClass {
    pub access: Access,
    pub is_virtual: bool,
    pub type_name: String,
}

/// A class, struct or union definition with its members grouped by the
/// source line they were declared on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregate {
    pub decl: Decl,
    pub kind: AggregateKind,
    pub name: String,
    pub byte_size: Option<u64>,
    pub base_classes: Vec<BaseClass>,
    pub members: BTreeMap<u64, Vec<Entity>>,
    pub template_params: Option<String>,
}

impl Aggregate {
    pub fn parse(cx: &ParseContext<'_>, kind: AggregateKind, node: NodeId) -> Self {
        let tree = cx.tree();
        let mut aggregate = Aggregate {
            decl: Decl::parse(tree, node),
            kind,
            name: tree.short_name(node).unwrap_or_default().to_string(),
            byte_size: tree.udata(node, gimli::DW_AT_byte_size),
            template_params: template_clause(cx, node),
            ..Default::default()
        };

        let own_file = tree.decl_file(node).map(normalize);
        let inlined = inlined_types(cx, node);
        let cap = cx.options().max_entries_per_line;

        for &child in tree.children(node) {
            let child = tree.resolve_type_unit(child);

            // Members declared in another file come from macro or include
            // tricks and would land on a meaningless line.
            if let (Some(own), Some(theirs)) = (&own_file, tree.decl_file(child)) {
                if normalize(theirs) != *own {
                    continue;
                }
            }

            let tag = tree.tag(child);
            let member_kind = match tag {
                gimli::DW_TAG_inheritance => {
                    aggregate.base_classes.push(BaseClass {
                        access: tree
                            .udata(child, gimli::DW_AT_accessibility)
                            .and_then(Access::from_dwarf)
                            .unwrap_or(kind.default_access()),
                        is_virtual: tree.udata(child, gimli::DW_AT_virtuality).unwrap_or(0) > 0,
                        type_name: cx.type_name(child),
                    });
                    continue;
                }
                gimli::DW_TAG_member | gimli::DW_TAG_variable => EntityKind::Field,
                gimli::DW_TAG_typedef => EntityKind::Typedef,
                gimli::DW_TAG_subprogram => EntityKind::Function { is_member: true },
                gimli::DW_TAG_enumeration_type if !inlined.contains(&child) => EntityKind::Enum,
                _ => match AggregateKind::from_tag(tag) {
                    Some(nested) if !inlined.contains(&child) => EntityKind::Aggregate(nested),
                    _ => continue,
                },
            };

            let Some(line) = tree.decl_line(child).filter(|&line| line > 0) else {
                continue;
            };
            let bucket = aggregate.members.entry(line).or_default();
            if bucket.len() >= cap {
                debug!(
                    "Dropping member of '{}' on line {}: {} entries already",
                    aggregate.name, line, cap
                );
                continue;
            }
            bucket.push(Entity::parse(cx, member_kind, child));
        }

        for bucket in aggregate.members.values_mut() {
            bucket.dedup_by(|later, earlier| later.to_source() == earlier.to_source());
        }
        aggregate
    }

    /// Member lines missing from `self` are taken from `other`, even when
    /// `self` already has members; lines already present are never
    /// replaced, so a repeat parse changes nothing.
    pub fn merge(&mut self, other: Aggregate) {
        self.decl.merge(other.decl);
        if self.name.is_empty() {
            self.name = other.name;
        }
        self.byte_size = self.byte_size.or(other.byte_size);
        if self.base_classes.is_empty() {
            self.base_classes = other.base_classes;
        }
        if self.template_params.is_none() {
            self.template_params = other.template_params;
        }
        // Lines already present keep their first parse.
        for (line, bucket) in other.members {
            self.members.entry(line).or_insert(bucket);
        }
    }

    pub fn to_source(&self) -> String {
        let default_access = self.kind.default_access();
        let mut out = template_prefix(&self.template_params);
        out.push_str(self.kind.keyword());
        if !self.name.is_empty() {
            out.push(' ');
            out.push_str(&self.name);
        }

        if !self.base_classes.is_empty() {
            let bases: Vec<String> = self
                .base_classes
                .iter()
                .map(|base| {
                    let mut parts = Vec::new();
                    if base.access != default_access {
                        parts.push(base.access.as_str());
                    }
                    if base.is_virtual {
                        parts.push("virtual");
                    }
                    parts.push(&base.type_name);
                    parts.join(" ")
                })
                .collect();
            out.push_str(" : ");
            out.push_str(&bases.join(", "));
        }
        out.push_str(" {\n");

        let mut current_access = default_access;
        let mut first_line = true;
        for bucket in self.members.values() {
            for member in bucket {
                let access = member.access().unwrap_or(default_access);
                if access != current_access {
                    if !first_line {
                        out.push('\n');
                    }
                    out.push_str(access.as_str());
                    out.push_str(":\n");
                    current_access = access;
                }
                for line in member.to_source().lines() {
                    if !line.is_empty() {
                        out.push_str("    ");
                        out.push_str(line);
                    }
                    out.push('\n');
                }
            }
            first_line = false;
        }
        out.push_str("};");

        if let (false, Some(size)) = (self.name.is_empty(), self.byte_size) {
            out.push_str(&format!("\nstatic_assert(sizeof({}) == {});", self.name, size));
        }
        out
    }
}

/// Anonymous aggregates and enums used as the type of a data member; they
/// are spelled out at every member using them instead of as nested
/// definitions, even when more than one member shares the type.
fn inlined_types(cx: &ParseContext<'_>, node: NodeId) -> HashSet<NodeId> {
    let tree = cx.tree();
    tree.children(node)
        .iter()
        .map(|&child| tree.resolve_type_unit(child))
        .filter(|&child| {
            matches!(
                tree.tag(child),
                gimli::DW_TAG_member | gimli::DW_TAG_variable
            )
        })
        .filter_map(|child| cx.target(child, gimli::DW_AT_type))
        .filter(|&ty| cx.is_anonymous_type(ty))
        .collect()
}
