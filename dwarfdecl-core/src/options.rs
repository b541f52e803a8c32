/// Tunables of the reconstruction engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconstructOptions {
    /// Most declarations kept for a single source line, both in a file and
    /// inside an aggregate body. Lines beyond this are usually macro
    /// expansions.
    pub max_entries_per_line: usize,
    /// How deeply anonymous aggregates are inlined into the declarations
    /// that use them.
    pub max_inline_depth: usize,
}

impl Default for ReconstructOptions {
    fn default() -> Self {
        Self {
            max_entries_per_line: 16,
            max_inline_depth: 8,
        }
    }
}
