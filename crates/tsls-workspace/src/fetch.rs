//! Content fetching into the VFS.
//!
//! A [`Fetcher`] materializes file content into the [`Vfs`]: the whole
//! structure-file skeleton at once, or one URI at a time. Implementations
//! must deduplicate work internally: concurrent callers for the same URI
//! share one underlying fetch, and a successful fetch is never repeated.
//!
//! [`LocalFetcher`] is the disk-backed implementation used when the
//! workspace lives on the same machine.

use std::sync::Arc;

use async_trait::async_trait;
use camino::Utf8PathBuf;
use tracing::debug;
use tsls_source::classify;
use tsls_source::paths;
use url::Url;

use crate::fs::FileSystem;
use crate::signal::MemoMap;
use crate::signal::MemoSlot;
use crate::signal::SignalError;
use crate::vfs::Vfs;

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Populate the VFS with every structure file the backing store knows:
    /// project configs, root-level declaration files, and `package.json`s.
    async fn ensure_structure(&self) -> Result<(), SignalError>;

    /// Populate a single URI. Completes once the content is in the VFS.
    async fn ensure(&self, uri: &Url) -> Result<(), SignalError>;
}

/// Disk-backed fetcher rooted at a local directory.
pub struct LocalFetcher {
    root: Utf8PathBuf,
    vfs: Arc<Vfs>,
    disk: Arc<dyn FileSystem>,
    structure: MemoSlot<()>,
    files: MemoMap<Url, ()>,
}

impl LocalFetcher {
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>, vfs: Arc<Vfs>, disk: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            vfs,
            disk,
            structure: MemoSlot::new(),
            files: MemoMap::default(),
        }
    }
}

#[async_trait]
impl Fetcher for LocalFetcher {
    async fn ensure_structure(&self) -> Result<(), SignalError> {
        let signal = self.structure.get_or_spawn(|| {
            let root = self.root.clone();
            let vfs = self.vfs.clone();
            let disk = self.disk.clone();
            async move {
                let mut known = 0usize;
                let mut fetched = 0usize;
                for path in disk.walk_files(&root) {
                    let Some(uri) = paths::path_to_url(&path) else {
                        continue;
                    };
                    known += 1;
                    let is_structure = classify::is_config_file(&path)
                        || classify::is_package_json(&path)
                        || classify::is_global_declaration(&path, &root);
                    if !is_structure {
                        // The listing alone; content stays unfetched.
                        vfs.register(uri);
                        continue;
                    }
                    let text = disk.read_to_string(&path).map_err(|err| {
                        SignalError::new(format!("failed to read {path}: {err}"))
                    })?;
                    vfs.add(uri, text);
                    fetched += 1;
                }
                debug!(known, fetched, root = %root, "workspace structure fetched");
                Ok(())
            }
        });
        signal.wait().await
    }

    async fn ensure(&self, uri: &Url) -> Result<(), SignalError> {
        let signal = self.files.get_or_spawn(uri.clone(), || {
            let uri = uri.clone();
            let vfs = self.vfs.clone();
            let disk = self.disk.clone();
            async move {
                if vfs.is_populated(&uri) {
                    return Ok(());
                }
                let path = paths::url_to_path(&uri)
                    .ok_or_else(|| SignalError::new(format!("not a file uri: {uri}")))?;
                let text = disk
                    .read_to_string(&path)
                    .map_err(|err| SignalError::new(format!("failed to read {path}: {err}")))?;
                vfs.add(uri, text);
                Ok(())
            }
        });
        signal.wait().await
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use camino::Utf8Path;

    use super::*;

    /// In-memory file system that counts reads.
    #[derive(Default)]
    struct CountingFs {
        files: std::collections::HashMap<Utf8PathBuf, String>,
        reads: AtomicUsize,
    }

    impl CountingFs {
        fn with(files: &[(&str, &str)]) -> Self {
            Self {
                files: files
                    .iter()
                    .map(|(p, c)| (Utf8PathBuf::from(*p), (*c).to_string()))
                    .collect(),
                reads: AtomicUsize::new(0),
            }
        }
    }

    impl FileSystem for CountingFs {
        fn read_to_string(&self, path: &Utf8Path) -> io::Result<String> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "missing"))
        }

        fn is_file(&self, path: &Utf8Path) -> bool {
            self.files.contains_key(path)
        }

        fn walk_files(&self, root: &Utf8Path) -> Vec<Utf8PathBuf> {
            self.files
                .keys()
                .filter(|p| p.starts_with(root))
                .cloned()
                .collect()
        }
    }

    fn uri(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn structure_fetch_pulls_configs_globals_and_manifests() {
        let fs = Arc::new(CountingFs::with(&[
            ("/w/tsconfig.json", "{}"),
            ("/w/globals.d.ts", "declare var g: number;"),
            ("/w/package.json", "{}"),
            ("/w/src/a.ts", "export {};"),
            ("/w/src/nested.d.ts", "declare var n: number;"),
        ]));
        let vfs = Arc::new(Vfs::new());
        let fetcher = LocalFetcher::new("/w", vfs.clone(), fs);

        fetcher.ensure_structure().await.unwrap();

        assert!(vfs.is_populated(&uri("file:///w/tsconfig.json")));
        assert!(vfs.is_populated(&uri("file:///w/globals.d.ts")));
        assert!(vfs.is_populated(&uri("file:///w/package.json")));
        // Plain sources and nested declarations are listed but not fetched.
        assert!(vfs.has_file(&uri("file:///w/src/a.ts")));
        assert!(!vfs.is_populated(&uri("file:///w/src/a.ts")));
        assert!(!vfs.is_populated(&uri("file:///w/src/nested.d.ts")));
    }

    #[tokio::test]
    async fn ensure_reads_each_uri_once() {
        let fs = Arc::new(CountingFs::with(&[("/w/a.ts", "export {};")]));
        let vfs = Arc::new(Vfs::new());
        let fetcher = LocalFetcher::new("/w", vfs.clone(), fs.clone());

        let u = uri("file:///w/a.ts");
        fetcher.ensure(&u).await.unwrap();
        fetcher.ensure(&u).await.unwrap();

        assert_eq!(fs.reads.load(Ordering::SeqCst), 1);
        assert!(vfs.has_file(&u));
    }

    #[tokio::test]
    async fn failed_ensure_is_retried() {
        let fs = Arc::new(CountingFs::with(&[]));
        let vfs = Arc::new(Vfs::new());
        let fetcher = LocalFetcher::new("/w", vfs, fs.clone());

        let u = uri("file:///w/missing.ts");
        fetcher.ensure(&u).await.unwrap_err();
        fetcher.ensure(&u).await.unwrap_err();

        // Two attempts hit the disk twice; errors are not memoized.
        assert_eq!(fs.reads.load(Ordering::SeqCst), 2);
    }
}
