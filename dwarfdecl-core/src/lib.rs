//! dwarfdecl core
//!
//! Turns the debug-information tree of a compiled program back into C++
//! declarations grouped by the source file that declared them.
//!
//! Feed every compilation unit root to [`Registry::update`], then render the
//! [`SourceFile`]s returned by [`Registry::source_files`].

pub mod entity;
pub mod options;
pub mod registry;
pub mod source_file;
pub mod template;
pub mod value;

pub use entity::{
    Access, Aggregate, AggregateKind, BaseClass, Decl, Entity, EntityKind, Enum, Enumerator,
    Field, Function, Import, ImportKind, Namespace, Parameter, ParseContext, Typedef, Virtuality,
};
pub use options::ReconstructOptions;
pub use registry::{EntityLocation, Registry};
pub use source_file::SourceFile;
pub use value::ConstValue;
