use anyhow::{Context, Result};
use dwarfdecl_core::Registry;
use dwarfdecl_dwarf::path::{escapes_base, relative_to, under_root};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::cleanup::Cleanup;

/// A source file that will be regenerated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    /// Normalized absolute path recorded by the compiler
    pub source: String,
    /// Path below the build root
    pub relative: String,
    pub destination: PathBuf,
}

/// Map every collected source file under `base_dir` to its place in
/// `output_dir`. Files outside the build root (system and third-party
/// headers) are left out.
pub fn plan(registry: &Registry, base_dir: &str, output_dir: &Path) -> Vec<PlannedFile> {
    let mut planned = Vec::new();
    for (source, file) in registry.source_files() {
        if file.is_empty() {
            continue;
        }
        let relative = match relative_to(source, base_dir) {
            Some(relative) if relative != "." && !escapes_base(&relative) => relative,
            _ => {
                debug!("Skipping {} outside of {}", source, base_dir);
                continue;
            }
        };
        planned.push(PlannedFile {
            source: source.clone(),
            destination: under_root(output_dir, &relative),
            relative,
        });
    }
    planned
}

/// Render and write the planned files, returning how many were written.
pub fn write_files(
    registry: &Registry,
    planned: &[PlannedFile],
    cleanup: Option<&Cleanup>,
) -> Result<usize> {
    let total = planned.len();
    for (i, file) in planned.iter().enumerate() {
        let Some(source) = registry.source_files().get(&file.source) else {
            continue;
        };
        let mut text = source.to_source();
        if let Some(cleanup) = cleanup {
            text = cleanup.apply(&text);
        }

        if let Some(parent) = file.destination.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory '{}'", parent.display())
            })?;
        }
        fs::write(&file.destination, text)
            .with_context(|| format!("Failed to write '{}'", file.destination.display()))?;
        info!("[{}/{}] Generated {}", i + 1, total, file.relative);
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwarfdecl_core::ReconstructOptions;
    use dwarfdecl_dwarf::{constants, TreeBuilder};

    fn registry() -> Registry {
        let mut b = TreeBuilder::new();
        let cu = b.compile_unit("src/main.cpp", "/work/game");
        let int = b.base_type(cu, "int", 4, constants::DW_ATE_signed);
        for (name, file) in [
            ("Score", "/work/game/src/score.h"),
            ("Level", "/work/game/include/level.h"),
            ("size_t", "/usr/include/stddef.h"),
        ] {
            let td = b.child(cu, constants::DW_TAG_typedef);
            b.name(td, name).type_ref(td, int).decl(td, file, 3);
        }
        let tree = b.finish();

        let mut registry = Registry::new(ReconstructOptions::default());
        registry.update(&tree, cu);
        registry
    }

    #[test]
    fn test_plan_mirrors_build_root() {
        let registry = registry();
        assert_eq!(registry.base_dir(), "/work/game");

        let planned = plan(&registry, registry.base_dir(), Path::new("/tmp/out"));
        let relative: Vec<&str> = planned.iter().map(|f| f.relative.as_str()).collect();
        assert_eq!(relative, ["include/level.h", "src/score.h"]);
        assert_eq!(planned[1].destination, PathBuf::from("/tmp/out/src/score.h"));
    }

    #[test]
    fn test_write_files() {
        let registry = registry();
        let dir = tempfile::tempdir().unwrap();
        let planned = plan(&registry, "/work/game/src", dir.path());
        assert_eq!(planned.len(), 1);

        let written = write_files(&registry, &planned, None).unwrap();
        assert_eq!(written, 1);
        let text = fs::read_to_string(dir.path().join("score.h")).unwrap();
        assert_eq!(text, "using Score = int;\n");
    }
}
