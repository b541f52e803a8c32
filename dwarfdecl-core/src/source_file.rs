//! Declarations collected for one source file, rendered as a header.

use crate::entity::{Entity, Namespace};
use std::collections::BTreeMap;

/// The entities declared in one source file, grouped by line.
#[derive(Debug, Clone)]
pub struct SourceFile {
    lines: BTreeMap<u64, Vec<Entity>>,
    max_entries_per_line: usize,
}

impl SourceFile {
    pub fn new(max_entries_per_line: usize) -> Self {
        Self {
            lines: BTreeMap::new(),
            max_entries_per_line,
        }
    }

    /// Append `entity` to `line`, returning its index within the line, or
    /// `None` when the line is already full.
    pub fn add(&mut self, line: u64, entity: Entity) -> Option<usize> {
        let bucket = self.lines.entry(line).or_default();
        if bucket.len() >= self.max_entries_per_line {
            return None;
        }
        bucket.push(entity);
        Some(bucket.len() - 1)
    }

    /// Index of an entity on `line` declaring the same thing as `entity` in
    /// the same namespace.
    pub fn find_same(&self, line: u64, entity: &Entity) -> Option<usize> {
        self.lines
            .get(&line)?
            .iter()
            .position(|existing| existing.same_declaration(entity))
    }

    pub fn get(&self, line: u64, index: usize) -> Option<&Entity> {
        self.lines.get(&line)?.get(index)
    }

    pub fn get_mut(&mut self, line: u64, index: usize) -> Option<&mut Entity> {
        self.lines.get_mut(&line)?.get_mut(index)
    }

    /// Number of entities in the file.
    pub fn len(&self) -> usize {
        self.lines.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render every entity in line order, opening and closing namespace
    /// blocks as the namespace path changes between entities.
    pub fn to_source(&self) -> String {
        let mut out = String::new();
        let mut open: Vec<Namespace> = Vec::new();
        let mut first_line = true;

        for bucket in self.lines.values() {
            for (index, entity) in bucket.iter().enumerate() {
                let wanted = entity.namespaces();
                let shared = open
                    .iter()
                    .zip(wanted)
                    .take_while(|(a, b)| a == b)
                    .count();

                while open.len() > shared {
                    if let Some(ns) = open.pop() {
                        out.push_str(&close_namespace(&ns));
                    }
                }
                // Blank line between line groups
                if index == 0 && !first_line {
                    out.push('\n');
                }
                first_line = false;
                for ns in &wanted[shared..] {
                    out.push_str(&open_namespace(ns));
                    open.push(ns.clone());
                }

                out.push_str(&entity.to_source());
                out.push('\n');
            }
        }

        while let Some(ns) = open.pop() {
            out.push_str(&close_namespace(&ns));
        }
        out
    }
}

fn open_namespace(ns: &Namespace) -> String {
    match (ns.is_anonymous(), ns.is_inline) {
        (true, _) => "namespace {\n".to_string(),
        (false, true) => format!("inline namespace {} {{\n", ns.name),
        (false, false) => format!("namespace {} {{\n", ns.name),
    }
}

fn close_namespace(ns: &Namespace) -> String {
    if ns.is_anonymous() {
        "} // namespace\n".to_string()
    } else {
        format!("}} // namespace {}\n", ns.name)
    }
}
