//! Built-in analyzer implementation.
//!
//! [`SimpleAnalyzer`] answers the structural half of the analyzer contract
//! (config expansion, reference extraction, resolution, program membership)
//! without any semantic analysis. Its program model is a snapshot of the
//! host's staged file list, rebuilt when the host's project version moves.

use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;
use std::sync::Arc;
use std::sync::Mutex;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use dashmap::DashSet;
use rustc_hash::FxHashSet;

use crate::config;
use crate::options::CompilerOptions;
use crate::scan;
use crate::Analyzer;
use crate::ConfigError;
use crate::DocumentRegistry;
use crate::FileReferences;
use crate::LanguageService;
use crate::LanguageServiceHost;
use crate::Program;
use crate::RawProjectConfig;
use crate::ResolutionHost;
use crate::ResolvedModule;

#[derive(Debug, Default)]
pub struct SimpleAnalyzer;

impl SimpleAnalyzer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Analyzer for SimpleAnalyzer {
    fn create_document_registry(&self) -> Arc<dyn DocumentRegistry> {
        Arc::new(HashedDocumentRegistry::default())
    }

    fn create_language_service(
        &self,
        host: Arc<dyn LanguageServiceHost>,
        registry: Arc<dyn DocumentRegistry>,
    ) -> Arc<dyn LanguageService> {
        Arc::new(SnapshotLanguageService {
            host,
            registry,
            cache: Mutex::new(None),
        })
    }

    fn parse_config_text(
        &self,
        path: &Utf8Path,
        text: &str,
    ) -> Result<RawProjectConfig, ConfigError> {
        config::parse_config_text(path, text)
    }

    fn parse_config(
        &self,
        raw: &RawProjectConfig,
        config_path: &Utf8Path,
        root: &Utf8Path,
        host: &dyn ResolutionHost,
    ) -> Result<config::ParsedProjectConfig, ConfigError> {
        config::parse_config(raw, config_path, root, host)
    }

    fn resolve_module(
        &self,
        specifier: &str,
        containing_file: &Utf8Path,
        options: &CompilerOptions,
        host: &dyn ResolutionHost,
    ) -> Option<ResolvedModule> {
        crate::resolve::resolve_module(specifier, containing_file, options, host)
    }

    fn resolve_type_directive(
        &self,
        name: &str,
        containing_file: &Utf8Path,
        options: &CompilerOptions,
        host: &dyn ResolutionHost,
    ) -> Option<ResolvedModule> {
        crate::resolve::resolve_type_directive(name, containing_file, options, host)
    }

    fn preprocess(&self, text: &str) -> FileReferences {
        scan::preprocess(text)
    }

    fn default_lib_path(&self, options: &CompilerOptions) -> Utf8PathBuf {
        let target = options.target.as_deref().unwrap_or("es5");
        Utf8PathBuf::from(format!("/lib/lib.{target}.d.ts"))
    }
}

/// Content-hash keyed parse cache shared across sessions.
#[derive(Default)]
struct HashedDocumentRegistry {
    documents: DashSet<u64>,
}

impl DocumentRegistry for HashedDocumentRegistry {
    fn acquire(&self, _path: &Utf8Path, text: &Arc<str>) -> u64 {
        let key = content_hash(text);
        self.documents.insert(key);
        key
    }

    fn len(&self) -> usize {
        self.documents.len()
    }
}

fn content_hash(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

struct SnapshotLanguageService {
    host: Arc<dyn LanguageServiceHost>,
    registry: Arc<dyn DocumentRegistry>,
    cache: Mutex<Option<(String, Arc<SnapshotProgram>)>>,
}

impl LanguageService for SnapshotLanguageService {
    fn program(&self) -> Option<Arc<dyn Program>> {
        let version = self.host.project_version();
        let mut cache = self.cache.lock().expect("program cache poisoned");
        if let Some((cached_version, program)) = cache.as_ref() {
            if *cached_version == version {
                return Some(program.clone());
            }
        }

        let file_names = self.host.script_file_names();
        let mut files = FxHashSet::default();
        for path in &file_names {
            if let Some(text) = self.host.script_snapshot(path) {
                self.registry.acquire(path, &text);
            }
            files.insert(path.clone());
        }
        let program = Arc::new(SnapshotProgram {
            files,
            ordered: file_names,
        });
        *cache = Some((version, program.clone()));
        Some(program)
    }
}

struct SnapshotProgram {
    files: FxHashSet<Utf8PathBuf>,
    ordered: Vec<Utf8PathBuf>,
}

impl Program for SnapshotProgram {
    fn has_file(&self, path: &Utf8Path) -> bool {
        self.files.contains(path)
    }

    fn file_names(&self) -> Vec<Utf8PathBuf> {
        self.ordered.clone()
    }
}
