use crate::config::settings::LogLevel;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dwarfdecl")]
#[command(about = "Regenerate C++ headers from the DWARF debugging information of a binary")]
#[command(version)]
pub struct Args {
    /// Executable, shared library, object or separate debug file to read
    pub path: PathBuf,

    /// Build root the compiler ran under. Headers are laid out relative to
    /// it, and compilation units outside it are skipped.
    /// Default: the common directory of all compilation units
    #[arg(long, value_name = "DIR")]
    pub base_dir: Option<String>,

    /// Output directory for generated headers (default: `out` next to PATH)
    #[arg(long, short = 'o', value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Specify custom configuration file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Most declarations kept for one source line
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub max_entries_per_line: Option<u64>,

    /// Keep compiler spellings of standard library types as they are
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub no_cleanup: bool,

    /// List the headers that would be generated without writing them
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub dry_run: bool,

    /// Set log level.
    /// Priority: 1. Command line args, 2. RUST_LOG env var, 3. Config file (default: warn)
    #[arg(long, value_name = "LEVEL", value_enum)]
    pub log_level: Option<LogLevel>,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Disable logging completely
    #[arg(long, short = 'q', action = clap::ArgAction::SetTrue)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedArgs {
    pub path: PathBuf,
    pub base_dir: Option<String>,
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub max_entries_per_line: Option<usize>,
    pub cleanup: bool,
    pub dry_run: bool,
    pub log_level: Option<LogLevel>,
    /// Filter directives taken from RUST_LOG
    pub env_filter: Option<String>,
    pub log_file: Option<PathBuf>,
    pub quiet: bool,
}

impl Args {
    /// Parse the process arguments
    pub fn parse_args() -> ParsedArgs {
        Self::parse().into_parsed(std::env::var("RUST_LOG").ok())
    }

    pub fn into_parsed(self, rust_log: Option<String>) -> ParsedArgs {
        ParsedArgs {
            path: self.path,
            base_dir: self.base_dir,
            output: self.output,
            config: self.config,
            max_entries_per_line: self
                .max_entries_per_line
                .map(|n| usize::try_from(n).unwrap_or(usize::MAX)),
            cleanup: !self.no_cleanup,
            dry_run: self.dry_run,
            log_level: self.log_level,
            env_filter: rust_log.filter(|s| !s.trim().is_empty()),
            log_file: self.log_file,
            quiet: self.quiet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> ParsedArgs {
        Args::try_parse_from(argv).unwrap().into_parsed(None)
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["dwarfdecl", "libgame.so"]);
        assert_eq!(args.path, PathBuf::from("libgame.so"));
        assert!(args.cleanup);
        assert!(!args.dry_run);
        assert!(!args.quiet);
        assert_eq!(args.log_level, None);
        assert_eq!(args.max_entries_per_line, None);
    }

    #[test]
    fn test_all_flags() {
        let args = parse(&[
            "dwarfdecl",
            "a.out",
            "--base-dir",
            "/build",
            "-o",
            "headers",
            "--max-entries-per-line",
            "4",
            "--no-cleanup",
            "--dry-run",
            "--log-level",
            "debug",
            "-q",
        ]);
        assert_eq!(args.base_dir.as_deref(), Some("/build"));
        assert_eq!(args.output, Some(PathBuf::from("headers")));
        assert_eq!(args.max_entries_per_line, Some(4));
        assert!(!args.cleanup);
        assert!(args.dry_run);
        assert_eq!(args.log_level, Some(LogLevel::Debug));
        assert!(args.quiet);
    }

    #[test]
    fn test_rejects_zero_cap_and_unknown_level() {
        assert!(Args::try_parse_from(["dwarfdecl", "a.out", "--max-entries-per-line", "0"]).is_err());
        assert!(Args::try_parse_from(["dwarfdecl", "a.out", "--log-level", "loud"]).is_err());
    }

    #[test]
    fn test_blank_rust_log_is_ignored() {
        let args = Args::try_parse_from(["dwarfdecl", "a.out"])
            .unwrap()
            .into_parsed(Some("  ".to_string()));
        assert_eq!(args.env_filter, None);
    }
}
