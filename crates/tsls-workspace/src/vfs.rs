//! The in-memory virtual file store.
//!
//! The store knows two things about a file: that it *exists* in the backing
//! workspace (registered from the structure listing) and, separately, its
//! *content* once a fetcher has populated it. Editor overlays form a third
//! layer that wins on read. The store is the single source of truth for
//! content; sessions never cache text themselves.
//!
//! The first time a URI gains fetched content, `added` subscribers run
//! synchronously; the project router materializes new sessions from that
//! hook.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::RwLock;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use dashmap::DashMap;
use tsls_analyzer::ResolutionHost;
use tsls_source::paths;
use url::Url;

type AddedCallback = Arc<dyn Fn(&Url, &str) + Send + Sync>;

/// Handle for removing an `added` subscription.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SubscriptionId(u64);

/// Thread-safe URI-to-content store with editor overlays.
#[derive(Default)]
pub struct Vfs {
    /// Every URI the backing store knows; `None` until content is fetched.
    fetched: DashMap<Url, Option<Arc<str>>>,
    /// Open-editor content, wins over `fetched` on read.
    overlays: DashMap<Url, Arc<str>>,
    /// Path index over every known URI.
    by_path: DashMap<Utf8PathBuf, Url>,
    subscribers: RwLock<Vec<(u64, AddedCallback)>>,
    next_subscription: AtomicU64,
}

impl Vfs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `uri` known without content, as the structure listing does for
    /// files that have not been fetched yet. Never fires `added`.
    pub fn register(&self, uri: Url) {
        if let Some(path) = paths::url_to_path(&uri) {
            self.by_path.insert(path, uri.clone());
        }
        self.fetched.entry(uri).or_insert(None);
    }

    /// Record fetched content for `uri`. The first population runs the
    /// `added` subscribers synchronously; refetches just replace content.
    pub fn add(&self, uri: Url, text: impl Into<Arc<str>>) {
        let text = text.into();
        if let Some(path) = paths::url_to_path(&uri) {
            self.by_path.insert(path, uri.clone());
        }
        let first_population = !matches!(
            self.fetched.insert(uri.clone(), Some(text.clone())),
            Some(Some(_))
        );
        if first_population {
            let subscribers: Vec<AddedCallback> = self
                .subscribers
                .read()
                .expect("vfs subscribers poisoned")
                .iter()
                .map(|(_, cb)| cb.clone())
                .collect();
            for subscriber in subscribers {
                subscriber(&uri, &text);
            }
        }
    }

    /// Current content: overlay first, then fetched. `None` for unknown
    /// URIs *and* for known files whose content has not been fetched.
    #[must_use]
    pub fn get_content(&self, uri: &Url) -> Option<Arc<str>> {
        if let Some(overlay) = self.overlays.get(uri) {
            return Some(overlay.clone());
        }
        self.fetched.get(uri).and_then(|entry| entry.clone())
    }

    /// Whether the URI is known to the workspace, populated or not.
    #[must_use]
    pub fn has_file(&self, uri: &Url) -> bool {
        self.overlays.contains_key(uri) || self.fetched.contains_key(uri)
    }

    /// Whether content is available for the URI.
    #[must_use]
    pub fn is_populated(&self, uri: &Url) -> bool {
        self.overlays.contains_key(uri)
            || self.fetched.get(uri).is_some_and(|entry| entry.is_some())
    }

    /// Every known URI, fetched or overlay-only. Order is unspecified.
    #[must_use]
    pub fn uris(&self) -> Vec<Url> {
        let mut uris: Vec<Url> = self.fetched.iter().map(|e| e.key().clone()).collect();
        for entry in self.overlays.iter() {
            if !self.fetched.contains_key(entry.key()) {
                uris.push(entry.key().clone());
            }
        }
        uris
    }

    /// The known URI for a path, if any.
    #[must_use]
    pub fn uri_for_path(&self, path: &Utf8Path) -> Option<Url> {
        self.by_path.get(path).map(|entry| entry.clone())
    }

    /// Install editor content for `uri`.
    pub fn did_open(&self, uri: &Url, text: &str) {
        self.did_change(uri, text);
    }

    /// Replace editor content for `uri`.
    pub fn did_change(&self, uri: &Url, text: &str) {
        if let Some(path) = paths::url_to_path(uri) {
            self.by_path.insert(path, uri.clone());
        }
        self.overlays.insert(uri.clone(), Arc::from(text));
    }

    /// Drop editor content; reads fall back to fetched content.
    pub fn did_close(&self, uri: &Url) {
        self.overlays.remove(uri);
        if !self.fetched.contains_key(uri) {
            if let Some(path) = paths::url_to_path(uri) {
                self.by_path.remove(&path);
            }
        }
    }

    /// Save notification; content is already current, nothing to do.
    pub fn did_save(&self, _uri: &Url) {}

    /// Run `callback` on every future first population.
    pub fn subscribe_added(
        &self,
        callback: impl Fn(&Url, &str) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self.next_subscription.fetch_add(1, Ordering::SeqCst);
        self.subscribers
            .write()
            .expect("vfs subscribers poisoned")
            .push((id, Arc::new(callback)));
        SubscriptionId(id)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers
            .write()
            .expect("vfs subscribers poisoned")
            .retain(|(existing, _)| *existing != id.0);
    }
}

impl ResolutionHost for Vfs {
    fn file_exists(&self, path: &Utf8Path) -> bool {
        self.by_path
            .get(path)
            .is_some_and(|uri| self.has_file(uri.value()))
    }

    fn read_file(&self, path: &Utf8Path) -> Option<Arc<str>> {
        let uri = self.by_path.get(path)?.clone();
        self.get_content(&uri)
    }

    fn known_files(&self) -> Vec<Utf8PathBuf> {
        self.by_path
            .iter()
            .filter(|entry| self.has_file(entry.value()))
            .map(|entry| entry.key().clone())
            .collect()
    }
}
