//! dwarfdecl
//!
//! Regenerates approximate C++ headers from the DWARF debugging information
//! of a compiled binary, one header per original source file.

mod cleanup;
mod config;
mod logging;
mod output;

use anyhow::{Context, Result};
use dwarfdecl_core::Registry;
use dwarfdecl_dwarf::path::{escapes_base, relative_to};
use dwarfdecl_dwarf::{DieTree, UnitInfo};
use tracing::{info, warn};

use crate::cleanup::Cleanup;
use crate::config::{Args, Config, MergedConfig};

fn main() -> Result<()> {
    let parsed_args = Args::parse_args();

    let config = match &parsed_args.config {
        Some(path) => Config::load_with_explicit_path(path)?,
        None => Config::load()?,
    };
    let merged = MergedConfig::new(parsed_args, config);

    if let Err(e) = logging::initialize_logging(&merged) {
        eprintln!("Failed to initialize logging: {e:#}");
    }

    run(&merged)
}

fn run(config: &MergedConfig) -> Result<()> {
    let cleanup = if config.cleanup_enabled {
        Some(Cleanup::new(&config.replacements)?)
    } else {
        None
    };

    info!("Loading debug information from \"{}\"", config.input.display());
    let tree = dwarfdecl_dwarf::load_file(&config.input)
        .with_context(|| format!("Failed to load '{}'", config.input.display()))?;

    let registry = reconstruct(&tree, config);
    let base_dir = config
        .base_dir
        .clone()
        .unwrap_or_else(|| registry.base_dir().to_string());
    info!("Build root: {}", base_dir);

    let planned = output::plan(&registry, &base_dir, &config.output_dir);
    if planned.is_empty() {
        warn!("No declarations found under {}", base_dir);
    }

    if config.dry_run {
        for file in &planned {
            println!("{}", file.relative);
        }
        return Ok(());
    }

    let written = output::write_files(&registry, &planned, cleanup.as_ref())?;
    info!(
        "Done! {} files generated in: {}",
        written,
        config.output_dir.display()
    );
    Ok(())
}

/// Feed every compilation unit to a fresh registry, in tree order.
fn reconstruct(tree: &DieTree, config: &MergedConfig) -> Registry {
    let mut registry = Registry::new(config.reconstruct.clone());
    let units: Vec<&UnitInfo> = tree.compile_units().collect();
    let total = units.len();

    for (i, unit) in units.iter().enumerate() {
        let name = unit.name.as_deref().unwrap_or("<unnamed>");
        if let (Some(base), Some(comp_dir)) = (&config.base_dir, unit.comp_dir.as_deref()) {
            if !is_under(comp_dir, base) {
                info!("[{}/{}] Skipping compile unit {} in {}", i + 1, total, name, comp_dir);
                continue;
            }
        }
        info!("[{}/{}] Parsing compile unit {}", i + 1, total, name);
        registry.update(tree, unit.root);
    }
    registry
}

fn is_under(path: &str, base: &str) -> bool {
    relative_to(path, base).is_some_and(|relative| !escapes_base(&relative))
}
