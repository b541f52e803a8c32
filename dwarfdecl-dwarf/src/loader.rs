//! Object file loading: maps a file, loads its DWARF sections and copies
//! every unit into an owned [`DieTree`].

use crate::builder::TreeBuilder;
use crate::die::{AttrValue, DieKey, DieTree, NodeId, UnitClass, UnitId};
use crate::errors::{DwarfError, Result};
use crate::path::resolve_file_path;
use gimli::{EndianSlice, Reader, RunTimeEndian, UnitSectionOffset, UnitType};
use object::{Object, ObjectSection};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use tracing::{debug, warn};

type Slice<'d> = EndianSlice<'d, RunTimeEndian>;

/// Load the debugging information of the object file at `path`.
pub fn load_file(path: &Path) -> Result<DieTree> {
    let file = File::open(path).map_err(DwarfError::from)?;
    // SAFETY: the mapping is only read while this function runs; the tree
    // owns copies of everything it needs.
    let mmap = unsafe { memmap2::MmapOptions::new().map(&file).map_err(DwarfError::from)? };
    let object = object::File::parse(&*mmap).map_err(DwarfError::from)?;

    let tree = load_object(&object)?;
    if tree.units().is_empty() {
        return Err(DwarfError::NoDebugInfo {
            path: path.to_path_buf(),
        }
        .into());
    }
    debug!(
        "Loaded {} DIEs in {} units from {}",
        tree.len(),
        tree.units().len(),
        path.display()
    );
    Ok(tree)
}

/// Load the debugging information of an already parsed object file.
pub fn load_object(object: &object::File<'_>) -> Result<DieTree> {
    let endian = if object.is_little_endian() {
        RunTimeEndian::Little
    } else {
        RunTimeEndian::Big
    };
    let sections = load_dwarf_sections(object)?;
    let dwarf = sections.borrow(|section| EndianSlice::new(Cow::as_ref(section), endian));
    load_dwarf(&dwarf)
}

/// Load DWARF sections using gimli
fn load_dwarf_sections<'data>(
    object: &object::File<'data>,
) -> Result<gimli::DwarfSections<Cow<'data, [u8]>>> {
    let load_section = |id: gimli::SectionId| -> std::result::Result<Cow<'data, [u8]>, gimli::Error> {
        Ok(object
            .section_by_name(id.name())
            .and_then(|section| section.uncompressed_data().ok())
            .unwrap_or(Cow::Borrowed(&[][..])))
    };
    Ok(gimli::DwarfSections::load(load_section).map_err(DwarfError::from)?)
}

/// Copy every unit of `dwarf` into a [`DieTree`].
///
/// Type units are loaded first so their signatures are known by the time
/// compile units are walked. A unit that fails to parse is skipped with a
/// warning; whatever was read of it stays in the tree.
pub fn load_dwarf(dwarf: &gimli::Dwarf<Slice<'_>>) -> Result<DieTree> {
    let mut headers = Vec::new();
    let mut type_units = dwarf.type_units();
    while let Some(header) = type_units.next().map_err(DwarfError::from)? {
        headers.push(header);
    }
    let mut units = dwarf.units();
    while let Some(header) = units.next().map_err(DwarfError::from)? {
        headers.push(header);
    }

    let mut builder = TreeBuilder::new();
    for header in headers {
        let offset = section_offset(header.offset());
        if let Err(e) = load_unit(dwarf, header, &mut builder) {
            warn!("Skipping unreadable unit at offset {:#x}: {}", offset, e);
        }
    }
    Ok(builder.finish())
}

fn section_offset(offset: UnitSectionOffset) -> u64 {
    match offset {
        UnitSectionOffset::DebugInfoOffset(o) => o.0 as u64,
        UnitSectionOffset::DebugTypesOffset(o) => o.0 as u64,
    }
}

fn load_unit<'d>(
    dwarf: &gimli::Dwarf<Slice<'d>>,
    header: gimli::UnitHeader<Slice<'d>>,
    builder: &mut TreeBuilder,
) -> Result<()> {
    let base = section_offset(header.offset());
    let (class, signature, type_offset) = match header.type_() {
        UnitType::Type {
            type_signature,
            type_offset,
        }
        | UnitType::SplitType {
            type_signature,
            type_offset,
        } => (UnitClass::Type, Some(type_signature.0), Some(type_offset)),
        _ => (UnitClass::Info, None, None),
    };

    let unit = dwarf.unit(header).map_err(DwarfError::from)?;
    let files = file_table(dwarf, &unit);
    let mut entries = unit.entries_tree(None).map_err(DwarfError::from)?;
    let root = entries.root().map_err(DwarfError::from)?;

    let root_key = DieKey::new(class, base + root.entry().offset().0 as u64);
    let (unit_id, root_id) = builder.begin_unit(class, root_key, root.entry().tag(), signature);
    if let (Some(signature), Some(type_offset)) = (signature, type_offset) {
        builder.map_signature(signature, DieKey::new(class, base + type_offset.0 as u64));
    }

    let loader = UnitLoader {
        dwarf,
        unit: &unit,
        unit_id,
        class,
        base,
        files,
    };
    loader.load_attrs(builder, root_id, root.entry())?;
    loader.load_children(builder, root, root_id)
}

/// Map of line-program file index to absolute path.
fn file_table(dwarf: &gimli::Dwarf<Slice<'_>>, unit: &gimli::Unit<Slice<'_>>) -> HashMap<u64, String> {
    let mut files = HashMap::new();
    let Some(program) = unit.line_program.as_ref() else {
        return files;
    };
    let header = program.header();
    let version = header.version();
    let comp_dir = unit
        .comp_dir
        .map(|dir| dir.to_string_lossy().into_owned())
        .unwrap_or_default();

    let directories: Vec<String> = header
        .include_directories()
        .iter()
        .map(|dir| {
            dwarf
                .attr_string(unit, *dir)
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
        .collect();

    // DWARF 5 file tables are 0-based, earlier versions 1-based.
    let first_index = if version >= 5 { 0 } else { 1 };
    for (i, file) in header.file_names().iter().enumerate() {
        let Ok(name) = dwarf.attr_string(unit, file.path_name()) else {
            continue;
        };
        let path = resolve_file_path(
            version,
            &comp_dir,
            &directories,
            file.directory_index(),
            &name.to_string_lossy(),
        );
        files.insert(first_index + i as u64, path);
    }
    files
}

struct UnitLoader<'d, 'u> {
    dwarf: &'u gimli::Dwarf<Slice<'d>>,
    unit: &'u gimli::Unit<Slice<'d>>,
    unit_id: UnitId,
    class: UnitClass,
    base: u64,
    files: HashMap<u64, String>,
}

impl<'d, 'u> UnitLoader<'d, 'u> {
    fn load_children(
        &self,
        builder: &mut TreeBuilder,
        node: gimli::EntriesTreeNode<'_, '_, '_, Slice<'d>>,
        parent: NodeId,
    ) -> Result<()> {
        let mut children = node.children();
        while let Some(child) = children.next().map_err(DwarfError::from)? {
            let entry = child.entry();
            let key = DieKey::new(self.class, self.base + entry.offset().0 as u64);
            let id = builder.push(self.unit_id, key, entry.tag(), parent);
            self.load_attrs(builder, id, entry)?;
            self.load_children(builder, child, id)?;
        }
        Ok(())
    }

    fn load_attrs(
        &self,
        builder: &mut TreeBuilder,
        node: NodeId,
        entry: &gimli::DebuggingInformationEntry<'_, '_, Slice<'d>>,
    ) -> Result<()> {
        let mut attrs = entry.attrs();
        while let Some(attr) = attrs.next().map_err(DwarfError::from)? {
            if let Some(value) = self.convert(&attr) {
                builder.attr(node, attr.name(), value);
            }
        }
        Ok(())
    }

    fn convert(&self, attr: &gimli::Attribute<Slice<'d>>) -> Option<AttrValue> {
        use gimli::AttributeValue as V;

        let value = attr.value();
        match attr.name() {
            gimli::DW_AT_decl_file => {
                let index = match value {
                    V::FileIndex(index) => Some(index),
                    _ => attr.udata_value(),
                }?;
                return match self.files.get(&index) {
                    Some(path) => Some(AttrValue::String(path.clone())),
                    None => {
                        debug!("Unknown file index {} in unit at {:#x}", index, self.base);
                        None
                    }
                };
            }
            gimli::DW_AT_data_member_location => match value {
                V::Exprloc(expr) => {
                    return Some(match eval_member_offset_expr(expr.0.slice()) {
                        Some(offset) => AttrValue::Unsigned(offset),
                        None => AttrValue::Block(expr.0.slice().to_vec()),
                    })
                }
                V::Block(block) => {
                    return Some(match eval_member_offset_expr(block.slice()) {
                        Some(offset) => AttrValue::Unsigned(offset),
                        None => AttrValue::Block(block.slice().to_vec()),
                    })
                }
                _ => {}
            },
            _ => {}
        }

        let converted = match value {
            V::Udata(v) => AttrValue::Unsigned(v),
            V::Data1(v) => AttrValue::Unsigned(v as u64),
            V::Data2(v) => AttrValue::Unsigned(v as u64),
            V::Data4(v) => AttrValue::Unsigned(v as u64),
            V::Data8(v) => AttrValue::Unsigned(v),
            V::Sdata(v) => AttrValue::Signed(v),
            V::Flag(v) => AttrValue::Flag(v),
            V::UnitRef(offset) => {
                AttrValue::Ref(DieKey::new(self.class, self.base + offset.0 as u64))
            }
            V::DebugInfoRef(offset) => AttrValue::Ref(DieKey::new(UnitClass::Info, offset.0 as u64)),
            V::DebugTypesRef(signature) => AttrValue::Signature(signature.0),
            V::Accessibility(access) => AttrValue::Unsigned(access.0 as u64),
            V::Virtuality(virtuality) => AttrValue::Unsigned(virtuality.0 as u64),
            V::Encoding(encoding) => AttrValue::Unsigned(encoding.0 as u64),
            V::Language(lang) => AttrValue::Unsigned(lang.0 as u64),
            V::Inline(inline) => AttrValue::Unsigned(inline.0 as u64),
            V::Visibility(visibility) => AttrValue::Unsigned(visibility.0 as u64),
            V::CallingConvention(cc) => AttrValue::Unsigned(cc.0 as u64),
            V::FileIndex(index) => AttrValue::Unsigned(index),
            V::Exprloc(expr) => AttrValue::Block(expr.0.slice().to_vec()),
            V::Block(block) => AttrValue::Block(block.slice().to_vec()),
            V::String(_)
            | V::DebugStrRef(_)
            | V::DebugStrRefSup(_)
            | V::DebugLineStrRef(_)
            | V::DebugStrOffsetsIndex(_) => {
                let s = self.dwarf.attr_string(self.unit, value).ok()?;
                AttrValue::String(s.to_string_lossy().into_owned())
            }
            _ => return None,
        };
        Some(converted)
    }
}

/// Fold a `DW_AT_data_member_location` expression that is a single constant.
fn eval_member_offset_expr(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() {
        return None;
    }
    // LEB128 operands do not depend on byte order
    let mut rdr = gimli::EndianSlice::new(bytes, gimli::LittleEndian);
    let value = match rdr.read_u8().ok()? {
        0x10 => rdr.read_uleb128().ok(),                   // DW_OP_constu
        0x11 => rdr.read_sleb128().ok().map(|v| v as u64), // DW_OP_consts
        0x23 => rdr.read_uleb128().ok(),                   // DW_OP_plus_uconst
        _ => None,
    }?;
    // Ensure no trailing ops
    if rdr.is_empty() {
        Some(value)
    } else {
        None
    }
}
