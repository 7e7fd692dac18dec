//! Contracts between the workspace core and the language-analysis engine.
//!
//! The core never analyzes source itself; it feeds files to an engine that
//! satisfies the traits here. [`SimpleAnalyzer`] is a built-in implementation
//! good enough for structural queries and for exercising the core end to end.
//! A real incremental type checker plugs in behind the same seams.

pub mod config;
pub mod options;
pub mod resolve;
pub mod scan;
mod simple;

use std::sync::Arc;

use camino::Utf8Path;
use camino::Utf8PathBuf;

pub use config::ParsedProjectConfig;
pub use config::RawCompilerOptions;
pub use config::RawProjectConfig;
pub use options::CompilerOptions;
pub use options::ModuleKind;
pub use scan::FileReferences;
pub use simple::SimpleAnalyzer;

/// A config file that could not be parsed or expanded.
///
/// Carries the config path and the underlying parser message; the session
/// that hit it stays uninitialized and retries on the next call.
#[derive(Debug, Clone, thiserror::Error)]
#[error("failed to parse {path}: {message}")]
pub struct ConfigError {
    pub path: Utf8PathBuf,
    pub message: String,
}

impl ConfigError {
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Outcome of module or type-directive resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    pub resolved_file_name: Utf8PathBuf,
    /// True when the target lives under a `node_modules` tree.
    pub is_external_library: bool,
}

/// File-content access the analyzer needs during resolution and config
/// expansion. The virtual file store implements this; tests may substitute
/// in-memory maps.
pub trait ResolutionHost: Send + Sync {
    fn file_exists(&self, path: &Utf8Path) -> bool;
    fn read_file(&self, path: &Utf8Path) -> Option<Arc<str>>;
    /// Every file path currently known to the workspace.
    fn known_files(&self) -> Vec<Utf8PathBuf>;
}

/// The host contract a compiler session exposes to its language service:
/// which files are staged, at which versions, with what content.
pub trait LanguageServiceHost: Send + Sync {
    fn current_directory(&self) -> Utf8PathBuf;
    fn compilation_settings(&self) -> CompilerOptions;
    /// Staged file paths, in staging order.
    fn script_file_names(&self) -> Vec<Utf8PathBuf>;
    /// Per-file version string; changes whenever the file content changes.
    fn script_version(&self, path: &Utf8Path) -> String;
    /// Current content, or `None` when the workspace has never seen the file.
    fn script_snapshot(&self, path: &Utf8Path) -> Option<Arc<str>>;
    /// Whole-project version string; changes on any staging or edit event.
    fn project_version(&self) -> String;
}

/// The analyzer's view of a program built from the staged files.
pub trait Program: Send + Sync {
    fn has_file(&self, path: &Utf8Path) -> bool;
    fn file_names(&self) -> Vec<Utf8PathBuf>;
}

/// One language-service instance per compiler session.
pub trait LanguageService: Send + Sync {
    /// The current program, rebuilt lazily when the host's project version
    /// moves. `None` when the engine declines to produce one.
    fn program(&self) -> Option<Arc<dyn Program>>;
}

/// Shared parse cache. One registry serves every session in a workspace so
/// that a file staged into several projects is parsed once per content.
pub trait DocumentRegistry: Send + Sync {
    /// Register `text` for `path`, returning a key stable for identical
    /// content.
    fn acquire(&self, path: &Utf8Path, text: &Arc<str>) -> u64;
    /// Number of distinct documents currently cached.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The language-analysis engine. Factories plus the handful of stateless
/// services the workspace core consumes.
pub trait Analyzer: Send + Sync {
    fn create_document_registry(&self) -> Arc<dyn DocumentRegistry>;

    fn create_language_service(
        &self,
        host: Arc<dyn LanguageServiceHost>,
        registry: Arc<dyn DocumentRegistry>,
    ) -> Arc<dyn LanguageService>;

    /// Parse raw config-file text (`tsconfig.json` dialect: comments and
    /// trailing commas allowed) into its serde model.
    fn parse_config_text(&self, path: &Utf8Path, text: &str)
        -> Result<RawProjectConfig, ConfigError>;

    /// Expand a raw config against `root`: effective compiler options plus
    /// the expected file set claimed by `files`/`include`/`exclude`.
    fn parse_config(
        &self,
        raw: &RawProjectConfig,
        config_path: &Utf8Path,
        root: &Utf8Path,
        host: &dyn ResolutionHost,
    ) -> Result<ParsedProjectConfig, ConfigError>;

    /// Resolve an import specifier from `containing_file`.
    fn resolve_module(
        &self,
        specifier: &str,
        containing_file: &Utf8Path,
        options: &CompilerOptions,
        host: &dyn ResolutionHost,
    ) -> Option<ResolvedModule>;

    /// Resolve a `/// <reference types="..."/>` directive.
    fn resolve_type_directive(
        &self,
        name: &str,
        containing_file: &Utf8Path,
        options: &CompilerOptions,
        host: &dyn ResolutionHost,
    ) -> Option<ResolvedModule>;

    /// Extract imports and triple-slash references without parsing.
    fn preprocess(&self, text: &str) -> FileReferences;

    /// Path of the default library for the given options.
    fn default_lib_path(&self, options: &CompilerOptions) -> Utf8PathBuf;
}
