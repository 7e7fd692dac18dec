//! Effective compiler options after config expansion.

use camino::Utf8PathBuf;

/// Module system the project compiles to.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ModuleKind {
    #[default]
    CommonJs,
    Es2015,
    EsNext,
}

impl ModuleKind {
    /// Parse the `compilerOptions.module` spelling, case-insensitively.
    /// Unknown values fall back to the default.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "es2015" | "es6" => ModuleKind::Es2015,
            "esnext" | "es2020" | "es2022" | "node16" | "nodenext" => ModuleKind::EsNext,
            _ => ModuleKind::CommonJs,
        }
    }
}

/// The subset of compiler options the workspace core acts on. Everything
/// else in a config file is accepted and ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompilerOptions {
    pub module: ModuleKind,
    /// Normalized lowercase `target`, when given.
    pub target: Option<String>,
    pub allow_js: bool,
    pub strict: bool,
    /// Emit module-resolution traces through the logger.
    pub trace_resolution: bool,
    /// Base directory for non-relative module resolution, absolute.
    pub base_url: Option<Utf8PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_kind_parse_is_case_insensitive() {
        assert_eq!(ModuleKind::parse("CommonJS"), ModuleKind::CommonJs);
        assert_eq!(ModuleKind::parse("ES6"), ModuleKind::Es2015);
        assert_eq!(ModuleKind::parse("NodeNext"), ModuleKind::EsNext);
        assert_eq!(ModuleKind::parse("umd"), ModuleKind::CommonJs);
    }
}
