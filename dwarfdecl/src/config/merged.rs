use std::path::PathBuf;

use crate::config::settings::Replacement;
use crate::config::{Config, ParsedArgs};
use dwarfdecl_core::ReconstructOptions;

/// Final merged configuration that combines command line arguments and config file settings
/// Command line arguments take priority over config file settings
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    /// Explicit build root; computed from the compilation units when unset
    pub base_dir: Option<String>,
    pub dry_run: bool,

    // Logging
    /// `EnvFilter` directives
    pub log_filter: String,
    pub log_file: Option<PathBuf>,
    pub quiet: bool,

    pub reconstruct: ReconstructOptions,

    // Post-processing
    pub cleanup_enabled: bool,
    pub replacements: Vec<Replacement>,
}

impl MergedConfig {
    /// Create merged configuration from parsed arguments and config file
    pub fn new(args: ParsedArgs, config: Config) -> Self {
        let output_dir = args
            .output
            .or(config.output.directory)
            .unwrap_or_else(|| default_output_dir(&args.path));

        // Priority: 1. --log-level, 2. RUST_LOG, 3. config file
        let log_filter = match (args.log_level, args.env_filter) {
            (Some(level), _) => level.to_string(),
            (None, Some(directives)) => directives,
            (None, None) => config.general.log_level.to_string(),
        };

        let reconstruct = ReconstructOptions {
            max_entries_per_line: args
                .max_entries_per_line
                .unwrap_or(config.reconstruct.max_entries_per_line),
            max_inline_depth: config.reconstruct.max_inline_depth,
        };

        Self {
            input: args.path,
            output_dir,
            base_dir: args.base_dir.or(config.output.base_dir),
            dry_run: args.dry_run,
            log_filter,
            log_file: args.log_file.or(config.general.log_file),
            quiet: args.quiet,
            reconstruct,
            cleanup_enabled: args.cleanup && config.cleanup.enabled,
            replacements: config.cleanup.replacements,
        }
    }
}

/// `out` beside the input file
fn default_output_dir(input: &std::path::Path) -> PathBuf {
    input
        .parent()
        .map(|dir| dir.join("out"))
        .unwrap_or_else(|| PathBuf::from("out"))
}
