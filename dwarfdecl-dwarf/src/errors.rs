//! Error types for the DWARF loading library

use std::path::PathBuf;

/// Error types for the library
#[derive(thiserror::Error, Debug)]
pub enum DwarfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("DWARF parsing error: {0}")]
    Gimli(#[from] gimli::Error),
    #[error("Object file error: {0}")]
    Object(#[from] object::Error),
    #[error("No debugging information found in {path}")]
    NoDebugInfo { path: PathBuf },
}

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;
