//! The workspace project manager.
//!
//! [`ProjectManager`] is the facade the LSP dispatcher talks to. It owns the
//! router and wires the four materialization pipelines over the fetcher:
//! each pipeline is one memoized multicast signal that fetches the structure
//! listing first, then the scope's file contents concurrently. Change
//! notifications flow through here into the VFS, the shared version map,
//! and the owning session.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::Mutex;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use rustc_hash::FxHashSet;
use tokio::task::JoinSet;
use tracing::debug;
use tracing::warn;
use tsls_analyzer::Analyzer;
use tsls_analyzer::ResolutionHost;
use tsls_source::classify;
use tsls_source::paths;
use tsls_source::ConfigKind;
use tsls_workspace::Fetcher;
use tsls_workspace::MemoMap;
use tsls_workspace::MemoSlot;
use tsls_workspace::Signal;
use tsls_workspace::SignalError;
use tsls_workspace::VersionMap;
use tsls_workspace::Vfs;
use url::Url;

use crate::error::ProjectError;
use crate::router::ProjectRouter;
use crate::session::Session;
use crate::session::SessionContext;

/// Default recursion depth for [`ProjectManager::ensure_referenced_files`].
pub const DEFAULT_REFERENCE_DEPTH: u32 = 30;

struct ManagerInner {
    root: Utf8PathBuf,
    vfs: Arc<Vfs>,
    fetcher: Arc<dyn Fetcher>,
    analyzer: Arc<dyn Analyzer>,
    versions: VersionMap,
    router: Arc<ProjectRouter>,
    module_structure: MemoSlot<()>,
    own_files: MemoSlot<()>,
    all_files: MemoSlot<()>,
    referenced: MemoMap<Url, Vec<Url>>,
}

#[derive(Clone)]
pub struct ProjectManager {
    inner: Arc<ManagerInner>,
}

impl ProjectManager {
    #[must_use]
    pub fn new(
        root: impl Into<Utf8PathBuf>,
        vfs: Arc<Vfs>,
        fetcher: Arc<dyn Fetcher>,
        analyzer: Arc<dyn Analyzer>,
        trace_resolution: bool,
    ) -> Self {
        let root = paths::trimmed_dir(&root.into());
        let ctx = Arc::new(SessionContext {
            workspace_root: root.clone(),
            vfs: vfs.clone(),
            versions: VersionMap::new(),
            registry: analyzer.create_document_registry(),
            analyzer: analyzer.clone(),
            trace_resolution,
        });
        let router = ProjectRouter::new(ctx.clone());

        Self {
            inner: Arc::new(ManagerInner {
                root,
                vfs,
                fetcher,
                analyzer,
                versions: ctx.versions.clone(),
                router,
                module_structure: MemoSlot::new(),
                own_files: MemoSlot::new(),
                all_files: MemoSlot::new(),
                referenced: MemoMap::default(),
            }),
        }
    }

    // ---- queries ---------------------------------------------------------

    /// Every session, js map first, then ts.
    #[must_use]
    pub fn configurations(&self) -> Vec<Arc<Session>> {
        self.inner.router.all_configurations()
    }

    /// The owning session for a path; kind inferred from the path when not
    /// given.
    #[must_use]
    pub fn configuration_if_exists(
        &self,
        path: &Utf8Path,
        kind: Option<ConfigKind>,
    ) -> Option<Arc<Session>> {
        self.inner.router.configuration_if_exists(path, kind)
    }

    /// Throwing variant of [`ProjectManager::configuration_if_exists`].
    pub fn configuration_for(
        &self,
        path: &Utf8Path,
        kind: Option<ConfigKind>,
    ) -> Result<Arc<Session>, ProjectError> {
        self.inner.router.configuration(path, kind)
    }

    /// The session owning the file a URI denotes.
    #[must_use]
    pub fn parent_configuration_for(
        &self,
        uri: &Url,
        kind: Option<ConfigKind>,
    ) -> Option<Arc<Session>> {
        let path = paths::url_to_path(uri)?;
        self.inner.router.configuration_if_exists(&path, kind)
    }

    /// Every session rooted under the directory a URI denotes.
    #[must_use]
    pub fn child_configurations_under(&self, uri: &Url) -> Vec<Arc<Session>> {
        let Some(path) = paths::url_to_path(uri) else {
            return Vec::new();
        };
        self.inner.router.child_configurations(&path)
    }

    /// Whether the workspace knows this path at all.
    #[must_use]
    pub fn has_file(&self, path: &Utf8Path) -> bool {
        self.inner.vfs.file_exists(path)
    }

    /// The workspace root all routing is anchored at.
    #[must_use]
    pub fn remote_root(&self) -> &Utf8Path {
        &self.inner.root
    }

    /// The shared virtual file store.
    #[must_use]
    pub fn fs(&self) -> Arc<Vfs> {
        self.inner.vfs.clone()
    }

    // ---- materialization pipelines ---------------------------------------

    /// Materialize the workspace skeleton: the structure listing, then every
    /// config, root-level declaration, and `package.json` file. Completion
    /// resets every session and clears the referenced-files cache.
    pub async fn ensure_module_structure(&self) -> Result<(), ProjectError> {
        let signal = scope_signal(
            &self.inner,
            &self.inner.module_structure,
            is_structure_file,
            true,
        );
        Ok(signal.wait().await?)
    }

    /// Materialize every source, config, and `package.json` file outside
    /// `node_modules`.
    pub async fn ensure_own_files(&self) -> Result<(), ProjectError> {
        let signal = scope_signal(&self.inner, &self.inner.own_files, is_own_file, false);
        Ok(signal.wait().await?)
    }

    /// Materialize every source, config, and `package.json` file anywhere,
    /// dependencies included.
    pub async fn ensure_all_files(&self) -> Result<(), ProjectError> {
        let signal = scope_signal(&self.inner, &self.inner.all_files, is_any_file, false);
        Ok(signal.wait().await?)
    }

    /// Materialize the transitive references of `uri` up to `max_depth`
    /// hops, returning every URI the walk reached beyond the input. A
    /// branch whose resolution fails is logged and skipped; the walk itself
    /// never aborts.
    pub async fn ensure_referenced_files(
        &self,
        uri: &Url,
        max_depth: u32,
    ) -> Result<Vec<Url>, ProjectError> {
        self.ensure_module_structure().await?;

        let visited = Arc::new(Mutex::new(FxHashSet::default()));
        visited.lock().expect("visited set poisoned").insert(uri.clone());
        walk_references(self.inner.clone(), uri.clone(), max_depth, visited.clone()).await;

        let visited = visited.lock().expect("visited set poisoned");
        let mut reached: Vec<Url> = visited.iter().filter(|v| *v != uri).cloned().collect();
        reached.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(reached)
    }

    /// Force the next [`ProjectManager::ensure_module_structure`] to run a
    /// fresh pipeline.
    pub fn invalidate_module_structure(&self) {
        self.inner.module_structure.invalidate();
    }

    /// Drop one URI's cached reference resolution, or all of them.
    pub fn invalidate_referenced_files(&self, uri: Option<&Url>) {
        match uri {
            Some(uri) => self.inner.referenced.invalidate(uri),
            None => self.inner.referenced.clear(),
        }
    }

    // ---- change intake ---------------------------------------------------

    /// Open is a change with the full text.
    pub fn did_open(&self, uri: &Url, text: &str) -> Result<(), ProjectError> {
        self.did_change(uri, text)
    }

    /// Record new content for an open document, bump its version, and stage
    /// it into the owning session.
    pub fn did_change(&self, uri: &Url, text: &str) -> Result<(), ProjectError> {
        self.inner.vfs.did_change(uri, text);
        self.inner.versions.bump(uri);

        let Some(path) = paths::url_to_path(uri) else {
            return Ok(());
        };
        let Some(session) = self.inner.router.configuration_if_exists(&path, None) else {
            return Ok(());
        };
        session.ensure_config_file()?;
        session.ensure_source_file(&path)?;
        session.bump_project_version();
        Ok(())
    }

    /// Close the document. Reads revert to fetched content; nothing is
    /// unstaged.
    pub fn did_close(&self, uri: &Url) -> Result<(), ProjectError> {
        self.inner.vfs.did_close(uri);
        self.inner.versions.bump(uri);

        let Some(path) = paths::url_to_path(uri) else {
            return Ok(());
        };
        let Some(session) = self.inner.router.configuration_if_exists(&path, None) else {
            return Ok(());
        };
        session.ensure_config_file()?;
        session.bump_project_version();
        Ok(())
    }

    /// Save notification; content is already current.
    pub fn did_save(&self, uri: &Url) {
        self.inner.vfs.did_save(uri);
    }

    /// Tear down the router's VFS subscription.
    pub fn dispose(&self) {
        self.inner.router.dispose();
    }
}

// ---- scope filters -------------------------------------------------------

fn is_structure_file(path: &Utf8Path, root: &Utf8Path) -> bool {
    classify::is_config_file(path)
        || classify::is_package_json(path)
        || classify::is_global_declaration(path, root)
}

fn is_own_file(path: &Utf8Path, root: &Utf8Path) -> bool {
    !classify::in_node_modules(path) && is_any_file(path, root)
}

fn is_any_file(path: &Utf8Path, _root: &Utf8Path) -> bool {
    classify::is_source_file(path)
        || classify::is_config_file(path)
        || classify::is_package_json(path)
}

// ---- pipeline machinery --------------------------------------------------

/// One scoped pipeline: the structure fetch is a barrier, then the scope's
/// per-URI fetches run concurrently. Memoized in `slot` with the
/// retract-on-error contract.
fn scope_signal(
    inner: &Arc<ManagerInner>,
    slot: &MemoSlot<()>,
    keep: fn(&Utf8Path, &Utf8Path) -> bool,
    reset_after: bool,
) -> Signal<()> {
    let inner = inner.clone();
    slot.get_or_spawn(move || async move {
        inner.fetcher.ensure_structure().await?;

        let mut fetches: JoinSet<Result<(), SignalError>> = JoinSet::new();
        for uri in inner.vfs.uris() {
            let Some(path) = paths::url_to_path(&uri) else {
                continue;
            };
            if !keep(&path, &inner.root) {
                continue;
            }
            let fetcher = inner.fetcher.clone();
            fetches.spawn(async move { fetcher.ensure(&uri).await });
        }
        while let Some(joined) = fetches.join_next().await {
            joined.map_err(|err| SignalError::new(format!("fetch task failed: {err}")))??;
        }

        if reset_after {
            inner.router.reset_all();
            inner.referenced.clear();
            debug!("module structure ensured; sessions reset");
        }
        Ok(())
    })
}

type WalkFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Depth-first concurrent reference walk. The shared visited set guarantees
/// each URI is expanded at most once per top-level call; failed branches
/// log and contribute nothing.
fn walk_references(
    inner: Arc<ManagerInner>,
    uri: Url,
    depth: u32,
    visited: Arc<Mutex<FxHashSet<Url>>>,
) -> WalkFuture {
    Box::pin(async move {
        if depth == 0 {
            return;
        }

        let referenced = match resolve_referenced_files(&inner, &uri).await {
            Ok(referenced) => referenced,
            Err(err) => {
                warn!(%uri, error = %err, "skipping unresolvable references");
                return;
            }
        };

        let fresh: Vec<Url> = {
            let mut visited = visited.lock().expect("visited set poisoned");
            referenced
                .into_iter()
                .filter(|reference| visited.insert(reference.clone()))
                .collect()
        };

        let mut branches = JoinSet::new();
        for reference in fresh {
            branches.spawn(walk_references(
                inner.clone(),
                reference,
                depth - 1,
                visited.clone(),
            ));
        }
        while branches.join_next().await.is_some() {}
    })
}

/// The URIs directly referenced by `uri`: resolved imports, triple-slash
/// path references, and type directives. Memoized per URI; evicted before
/// an error surfaces.
async fn resolve_referenced_files(
    inner: &Arc<ManagerInner>,
    uri: &Url,
) -> Result<Vec<Url>, SignalError> {
    let signal = inner.referenced.get_or_spawn(uri.clone(), || {
        let inner = inner.clone();
        let uri = uri.clone();
        async move { compute_referenced_files(&inner, &uri).await }
    });
    signal.wait().await
}

async fn compute_referenced_files(
    inner: &Arc<ManagerInner>,
    uri: &Url,
) -> Result<Vec<Url>, SignalError> {
    inner.fetcher.ensure(uri).await?;

    let path = paths::url_to_path(uri)
        .ok_or_else(|| SignalError::new(format!("not a file uri: {uri}")))?;
    let session = inner
        .router
        .configuration_if_exists(&path, None)
        .ok_or_else(|| SignalError::new(format!("no configuration for {path}")))?;
    session
        .ensure_basic_files()
        .map_err(|err| SignalError::new(err.to_string()))?;

    let text = inner
        .vfs
        .get_content(uri)
        .ok_or_else(|| SignalError::new(format!("{uri} has no content")))?;
    let references = inner.analyzer.preprocess(&text);
    let options = session.options();
    let host: &dyn ResolutionHost = &*inner.vfs;

    let mut out = Vec::new();
    for import in &references.imports {
        if let Some(resolved) = inner.analyzer.resolve_module(import, &path, &options, host) {
            out.push(paths::url_like(uri, &resolved.resolved_file_name));
        }
    }
    for reference in &references.referenced_paths {
        let dir = path.parent().map_or("/", Utf8Path::as_str);
        // Join order: workspace root, then the referencing directory, then
        // the reference itself.
        let joined = if path.as_str().contains('\\') {
            paths::windows_resolve(&[inner.root.as_str(), dir, reference])
        } else {
            paths::posix_resolve(&[inner.root.as_str(), dir, reference])
        };
        out.push(paths::url_like(uri, &joined));
    }
    for directive in &references.type_directives {
        if let Some(resolved) =
            inner
                .analyzer
                .resolve_type_directive(directive, &path, &options, host)
        {
            out.push(paths::url_like(uri, &resolved.resolved_file_name));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use async_trait::async_trait;
    use tsls_analyzer::LanguageServiceHost;
    use tsls_analyzer::SimpleAnalyzer;

    use super::*;

    /// Fetcher over a scripted file map. Deliberately unmemoized so tests
    /// can count how often the pipelines actually reach for content.
    struct ScriptedFetcher {
        vfs: Arc<Vfs>,
        files: HashMap<Url, String>,
        structure_calls: AtomicUsize,
        ensure_calls: Mutex<Vec<Url>>,
        fail: Mutex<HashSet<Url>>,
    }

    impl ScriptedFetcher {
        fn new(vfs: Arc<Vfs>, files: &[(&str, &str)]) -> Arc<Self> {
            Arc::new(Self {
                vfs,
                files: files
                    .iter()
                    .map(|(u, t)| (Url::parse(u).unwrap(), (*t).to_string()))
                    .collect(),
                structure_calls: AtomicUsize::new(0),
                ensure_calls: Mutex::new(Vec::new()),
                fail: Mutex::new(HashSet::new()),
            })
        }

        fn fail_on(&self, uri: &str) {
            self.fail.lock().unwrap().insert(Url::parse(uri).unwrap());
        }

        fn clear_failures(&self) {
            self.fail.lock().unwrap().clear();
        }

        fn ensure_count(&self, uri: &str) -> usize {
            let uri = Url::parse(uri).unwrap();
            self.ensure_calls
                .lock()
                .unwrap()
                .iter()
                .filter(|called| **called == uri)
                .count()
        }

        fn total_ensures(&self) -> usize {
            self.ensure_calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn ensure_structure(&self) -> Result<(), SignalError> {
            self.structure_calls.fetch_add(1, Ordering::SeqCst);
            for uri in self.files.keys() {
                self.vfs.register(uri.clone());
            }
            Ok(())
        }

        async fn ensure(&self, uri: &Url) -> Result<(), SignalError> {
            self.ensure_calls.lock().unwrap().push(uri.clone());
            if self.fail.lock().unwrap().contains(uri) {
                return Err(SignalError::new(format!("scripted failure for {uri}")));
            }
            match self.files.get(uri) {
                Some(text) => {
                    self.vfs.add(uri.clone(), text.as_str());
                    Ok(())
                }
                None => Err(SignalError::new(format!("unknown uri {uri}"))),
            }
        }
    }

    fn manager_with(files: &[(&str, &str)]) -> (ProjectManager, Arc<ScriptedFetcher>) {
        let vfs = Arc::new(Vfs::new());
        let fetcher = ScriptedFetcher::new(vfs.clone(), files);
        let manager = ProjectManager::new(
            "/root",
            vfs,
            fetcher.clone(),
            Arc::new(SimpleAnalyzer::new()),
            false,
        );
        (manager, fetcher)
    }

    fn uri(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn fallback_only_workspace_routes_and_walks() {
        let (manager, _) = manager_with(&[
            ("file:///root/a.ts", "export const x = 1;"),
            ("file:///root/b.ts", "import {x} from './a';"),
        ]);

        manager
            .did_open(&uri("file:///root/b.ts"), "import {x} from './a';")
            .unwrap();
        let session = manager
            .configuration_for(Utf8Path::new("/root/b.ts"), None)
            .unwrap();
        assert!(session.is_fallback());
        assert_eq!(session.kind(), ConfigKind::Ts);

        let reached = manager
            .ensure_referenced_files(&uri("file:///root/b.ts"), 1)
            .await
            .unwrap();
        assert_eq!(reached, vec![uri("file:///root/a.ts")]);
    }

    #[tokio::test]
    async fn two_changes_bump_file_and_project_versions() {
        let (manager, _) = manager_with(&[("file:///root/a.ts", "let x = 0;")]);
        let u = uri("file:///root/a.ts");

        manager.did_change(&u, "let x = 1;").unwrap();
        let session = manager
            .configuration_if_exists(Utf8Path::new("/root/a.ts"), None)
            .unwrap();
        let project_version_after_first = session.host().unwrap().project_version_value();

        manager.did_change(&u, "let x = 2;").unwrap();

        assert_eq!(manager.fs().get_content(&u).as_deref(), Some("let x = 2;"));
        assert_eq!(
            session.host().unwrap().script_version(Utf8Path::new("/root/a.ts")),
            "2"
        );
        assert!(session.host().unwrap().project_version_value() > project_version_after_first);
    }

    #[tokio::test]
    async fn close_keeps_staging_and_bumps_versions() {
        let (manager, _) = manager_with(&[]);
        let u = uri("file:///root/a.ts");

        manager.did_open(&u, "let x = 1;").unwrap();
        let session = manager
            .configuration_if_exists(Utf8Path::new("/root/a.ts"), None)
            .unwrap();
        let pv_open = session.host().unwrap().project_version_value();

        manager.did_close(&u).unwrap();

        let host = session.host().unwrap();
        assert!(host.contains(Utf8Path::new("/root/a.ts")));
        assert!(host.project_version_value() > pv_open);
        assert_eq!(
            host.script_version(Utf8Path::new("/root/a.ts")),
            "2"
        );
    }

    #[tokio::test]
    async fn failed_structure_pipeline_is_retried_fresh() {
        let (manager, fetcher) = manager_with(&[
            ("file:///root/tsconfig.json", "{}"),
            ("file:///root/a.ts", "export {};"),
        ]);
        fetcher.fail_on("file:///root/tsconfig.json");

        manager.ensure_module_structure().await.unwrap_err();
        assert_eq!(fetcher.structure_calls.load(Ordering::SeqCst), 1);

        // The failed signal was evicted; the retry runs a fresh pipeline.
        manager.ensure_module_structure().await.unwrap_err();
        assert_eq!(fetcher.structure_calls.load(Ordering::SeqCst), 2);

        fetcher.clear_failures();
        manager.ensure_module_structure().await.unwrap();
        assert_eq!(fetcher.structure_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn import_cycles_terminate_with_single_visits() {
        let (manager, fetcher) = manager_with(&[
            ("file:///root/a.ts", "import './b';"),
            ("file:///root/b.ts", "import './a';"),
        ]);

        let reached = manager
            .ensure_referenced_files(&uri("file:///root/a.ts"), DEFAULT_REFERENCE_DEPTH)
            .await
            .unwrap();

        assert_eq!(reached, vec![uri("file:///root/b.ts")]);
        assert_eq!(fetcher.ensure_count("file:///root/a.ts"), 1);
        assert_eq!(fetcher.ensure_count("file:///root/b.ts"), 1);
    }

    #[tokio::test]
    async fn depth_zero_walks_nothing() {
        let (manager, fetcher) = manager_with(&[("file:///root/b.ts", "import './a';")]);

        let reached = manager
            .ensure_referenced_files(&uri("file:///root/b.ts"), 0)
            .await
            .unwrap();

        assert!(reached.is_empty());
        assert_eq!(fetcher.ensure_count("file:///root/b.ts"), 0);
    }

    #[tokio::test]
    async fn unresolvable_branches_do_not_abort_the_walk() {
        let (manager, fetcher) = manager_with(&[
            (
                "file:///root/a.ts",
                "import './gone';\nimport './b';",
            ),
            ("file:///root/b.ts", "export {};"),
            ("file:///root/gone.ts", "export {};"),
        ]);
        fetcher.fail_on("file:///root/gone.ts");

        let reached = manager
            .ensure_referenced_files(&uri("file:///root/a.ts"), DEFAULT_REFERENCE_DEPTH)
            .await
            .unwrap();

        // The failing branch is logged and skipped; the healthy one lands.
        assert!(reached.contains(&uri("file:///root/b.ts")));
        assert!(reached.contains(&uri("file:///root/gone.ts")));
    }

    #[tokio::test]
    async fn ensure_all_files_is_idempotent_while_memoized() {
        let (manager, fetcher) = manager_with(&[
            ("file:///root/a.ts", "export {};"),
            ("file:///root/b.ts", "export {};"),
        ]);

        manager.ensure_all_files().await.unwrap();
        let fetches_after_first = fetcher.total_ensures();
        assert!(fetches_after_first > 0);

        manager.ensure_all_files().await.unwrap();
        assert_eq!(fetcher.total_ensures(), fetches_after_first);
    }

    #[tokio::test]
    async fn own_files_scope_skips_node_modules() {
        let (manager, _) = manager_with(&[
            ("file:///root/a.ts", "export {};"),
            ("file:///root/node_modules/dep/index.ts", "export {};"),
        ]);

        manager.ensure_own_files().await.unwrap();
        let vfs = manager.fs();
        assert!(vfs.is_populated(&uri("file:///root/a.ts")));
        assert!(!vfs.is_populated(&uri("file:///root/node_modules/dep/index.ts")));

        manager.ensure_all_files().await.unwrap();
        assert!(vfs.is_populated(&uri("file:///root/node_modules/dep/index.ts")));
    }

    #[tokio::test]
    async fn module_structure_completion_resets_sessions_and_reference_cache() {
        let (manager, fetcher) = manager_with(&[
            ("file:///root/a.ts", "export {};"),
            ("file:///root/b.ts", "import './a';"),
        ]);

        manager
            .ensure_referenced_files(&uri("file:///root/b.ts"), 1)
            .await
            .unwrap();
        assert_eq!(fetcher.ensure_count("file:///root/b.ts"), 1);

        let session = manager
            .configuration_if_exists(Utf8Path::new("/root/b.ts"), None)
            .unwrap();
        assert!(session.is_initialized());

        manager.invalidate_module_structure();
        manager.ensure_module_structure().await.unwrap();
        assert!(!session.is_initialized());

        // The reference cache was cleared with the reset: the next walk
        // recomputes instead of reusing the cached resolution.
        manager
            .ensure_referenced_files(&uri("file:///root/b.ts"), 1)
            .await
            .unwrap();
        assert_eq!(fetcher.ensure_count("file:///root/b.ts"), 2);
    }

    #[tokio::test]
    async fn invalidate_referenced_files_drops_single_entries() {
        let (manager, fetcher) = manager_with(&[("file:///root/b.ts", "export {};")]);

        manager
            .ensure_referenced_files(&uri("file:///root/b.ts"), 1)
            .await
            .unwrap();
        manager
            .ensure_referenced_files(&uri("file:///root/b.ts"), 1)
            .await
            .unwrap();
        assert_eq!(fetcher.ensure_count("file:///root/b.ts"), 1);

        manager.invalidate_referenced_files(Some(&uri("file:///root/b.ts")));
        manager
            .ensure_referenced_files(&uri("file:///root/b.ts"), 1)
            .await
            .unwrap();
        assert_eq!(fetcher.ensure_count("file:///root/b.ts"), 2);
    }

    #[tokio::test]
    async fn config_discovery_flows_through_the_pipeline() {
        let (manager, _) = manager_with(&[
            ("file:///root/tsconfig.json", "{\"compilerOptions\": {}}"),
            ("file:///root/pkg/tsconfig.json", "{}"),
            ("file:///root/pkg/sub/x.ts", "export {};"),
        ]);

        manager.ensure_module_structure().await.unwrap();

        let session = manager
            .configuration_for(Utf8Path::new("/root/pkg/sub/x.ts"), None)
            .unwrap();
        assert_eq!(session.root(), Utf8Path::new("/root/pkg"));
        assert!(!session.is_fallback());

        let parent = manager
            .parent_configuration_for(&uri("file:///root/pkg/sub/x.ts"), None)
            .unwrap();
        assert_eq!(parent.root(), Utf8Path::new("/root/pkg"));

        let children = manager.child_configurations_under(&uri("file:///root/pkg"));
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].root(), Utf8Path::new("/root/pkg"));
    }

    #[tokio::test]
    async fn triple_slash_references_use_root_joined_dirname() {
        let (manager, _) = manager_with(&[
            (
                "file:///root/src/b.ts",
                "/// <reference path=\"../globals.d.ts\" />\nexport {};",
            ),
            ("file:///root/globals.d.ts", "declare var g: number;"),
        ]);

        let reached = manager
            .ensure_referenced_files(&uri("file:///root/src/b.ts"), 1)
            .await
            .unwrap();

        // posix-resolved from ["/root", "/root/src", "../globals.d.ts"]
        assert_eq!(reached, vec![uri("file:///root/globals.d.ts")]);
    }
}
