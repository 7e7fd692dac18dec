//! The compiler-host adapter a session exposes to its language service.
//!
//! [`SessionHost`] is the thin bridge between the VFS world (URIs, shared
//! version counters) and the analyzer's host contract (paths, version
//! strings, snapshots). Staging is append-only: a path added here stays
//! until the whole session is reset.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::RwLock;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use tsls_analyzer::Analyzer;
use tsls_analyzer::CompilerOptions;
use tsls_analyzer::LanguageServiceHost;
use tsls_source::paths;
use tsls_workspace::VersionMap;
use tsls_workspace::Vfs;

/// Line terminator handed to the analyzer, independent of the host OS.
const NEWLINE: &str = "\n";

pub struct SessionHost {
    root: Utf8PathBuf,
    options: CompilerOptions,
    vfs: Arc<Vfs>,
    versions: VersionMap,
    analyzer: Arc<dyn Analyzer>,
    /// Staged paths in staging order. Append-only.
    file_names: RwLock<Vec<Utf8PathBuf>>,
    project_version: AtomicU64,
    complete: AtomicBool,
}

impl SessionHost {
    #[must_use]
    pub fn new(
        root: Utf8PathBuf,
        options: CompilerOptions,
        vfs: Arc<Vfs>,
        versions: VersionMap,
        analyzer: Arc<dyn Analyzer>,
    ) -> Self {
        Self {
            root,
            options,
            vfs,
            versions,
            analyzer,
            file_names: RwLock::new(Vec::new()),
            project_version: AtomicU64::new(1),
            complete: AtomicBool::new(false),
        }
    }

    /// Stage a file and bump the project version. Callers check staging
    /// beforehand; duplicates are tolerated, not deduplicated.
    pub fn add_file(&self, path: &Utf8Path) {
        self.file_names
            .write()
            .expect("staged files poisoned")
            .push(path.to_owned());
        self.inc_project_version();
    }

    #[must_use]
    pub fn contains(&self, path: &Utf8Path) -> bool {
        self.file_names
            .read()
            .expect("staged files poisoned")
            .iter()
            .any(|staged| staged == path)
    }

    pub fn inc_project_version(&self) {
        self.project_version.fetch_add(1, Ordering::SeqCst);
    }

    #[must_use]
    pub fn project_version_value(&self) -> u64 {
        self.project_version.load(Ordering::SeqCst)
    }

    /// Mark that every expected file has been staged. One-way.
    pub fn set_complete(&self) {
        self.complete.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn newline(&self) -> &'static str {
        NEWLINE
    }

    /// Default-library path for this session's options, forward-slashed.
    #[must_use]
    pub fn default_lib_path(&self) -> Utf8PathBuf {
        let lib = self.analyzer.default_lib_path(&self.options);
        Utf8PathBuf::from(paths::slashed(&lib))
    }

    fn uri_for(&self, path: &Utf8Path) -> Option<url::Url> {
        self.vfs
            .uri_for_path(path)
            .or_else(|| paths::path_to_url(path))
    }
}

impl LanguageServiceHost for SessionHost {
    fn current_directory(&self) -> Utf8PathBuf {
        self.root.clone()
    }

    fn compilation_settings(&self) -> CompilerOptions {
        self.options.clone()
    }

    fn script_file_names(&self) -> Vec<Utf8PathBuf> {
        self.file_names
            .read()
            .expect("staged files poisoned")
            .clone()
    }

    fn script_version(&self, path: &Utf8Path) -> String {
        match self.uri_for(path) {
            Some(uri) => self.versions.get_or_seed(&uri).to_string(),
            None => "1".to_string(),
        }
    }

    fn script_snapshot(&self, path: &Utf8Path) -> Option<Arc<str>> {
        let uri = self.uri_for(path)?;
        self.vfs.get_content(&uri)
    }

    fn project_version(&self) -> String {
        self.project_version_value().to_string()
    }
}

#[cfg(test)]
mod tests {
    use tsls_analyzer::SimpleAnalyzer;
    use url::Url;

    use super::*;

    fn host() -> (SessionHost, Arc<Vfs>, VersionMap) {
        let vfs = Arc::new(Vfs::new());
        let versions = VersionMap::new();
        let host = SessionHost::new(
            Utf8PathBuf::from("/w"),
            CompilerOptions::default(),
            vfs.clone(),
            versions.clone(),
            Arc::new(SimpleAnalyzer::new()),
        );
        (host, vfs, versions)
    }

    #[test]
    fn add_file_appends_and_bumps_project_version() {
        let (host, _, _) = host();
        let before = host.project_version_value();

        host.add_file(Utf8Path::new("/w/a.ts"));
        host.add_file(Utf8Path::new("/w/b.ts"));

        assert_eq!(
            host.script_file_names(),
            vec![Utf8PathBuf::from("/w/a.ts"), Utf8PathBuf::from("/w/b.ts")]
        );
        assert_eq!(host.project_version_value(), before + 2);
    }

    #[test]
    fn script_version_seeds_unknown_files_to_one() {
        let (host, _, versions) = host();
        assert_eq!(host.script_version(Utf8Path::new("/w/a.ts")), "1");
        // The seed is stored in the shared map.
        let uri = Url::parse("file:///w/a.ts").unwrap();
        assert_eq!(versions.get(&uri), Some(1));
    }

    #[test]
    fn script_version_reflects_change_intake_bumps() {
        let (host, _, versions) = host();
        let uri = Url::parse("file:///w/a.ts").unwrap();
        versions.bump(&uri);
        versions.bump(&uri);
        assert_eq!(host.script_version(Utf8Path::new("/w/a.ts")), "2");
    }

    #[test]
    fn snapshot_is_absent_for_unknown_files() {
        let (host, vfs, _) = host();
        assert!(host.script_snapshot(Utf8Path::new("/w/a.ts")).is_none());

        vfs.add(Url::parse("file:///w/a.ts").unwrap(), "export {};");
        assert_eq!(
            &*host.script_snapshot(Utf8Path::new("/w/a.ts")).unwrap(),
            "export {};"
        );
    }

    #[test]
    fn newline_is_always_line_feed() {
        let (host, _, _) = host();
        assert_eq!(host.newline(), "\n");
    }

    #[test]
    fn default_lib_path_comes_from_the_analyzer() {
        let (host, _, _) = host();
        assert_eq!(
            host.default_lib_path(),
            Utf8PathBuf::from("/lib/lib.es5.d.ts")
        );
    }

    #[test]
    fn complete_flag_is_one_way() {
        let (host, _, _) = host();
        assert!(!host.is_complete());
        host.set_complete();
        assert!(host.is_complete());
    }
}
