//! dwarfdecl DWARF library
//!
//! Loads the debugging information of an object file into an owned tree of
//! DIEs and prints DWARF types as C++ type expressions.

pub mod builder;
pub mod die;
pub mod errors;
pub mod loader;
pub mod path;
pub mod type_printer;

pub use builder::TreeBuilder;
pub use die::{AttrValue, Die, DieKey, DieTree, NodeId, UnitClass, UnitId, UnitInfo};
pub use errors::{DwarfError, Result};
pub use loader::{load_dwarf, load_file, load_object};
pub use type_printer::{TypeName, TypePrinter};

// Re-export gimli constants that consumers match on
pub use gimli::{constants, DwAt, DwTag};
