/// Knobs for a single translation.
///
/// Part of the shader cache key, so every field must be `Hash`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompilerOptions {
    /// Name of the generated entry point.
    pub entry_point: String,
    /// Abort on the first coverage gap instead of recording a diagnostic.
    pub strict_coverage: bool,
    /// Emit `OpName` for registers and resources.
    pub debug_names: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            entry_point: "main".to_owned(),
            strict_coverage: false,
            debug_names: true,
        }
    }
}

impl CompilerOptions {
    pub fn strict() -> Self {
        Self {
            strict_coverage: true,
            ..Self::default()
        }
    }
}
