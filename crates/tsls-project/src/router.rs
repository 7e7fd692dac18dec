//! Routing files to their owning project session.
//!
//! The router keeps one directory-to-session map per [`ConfigKind`]. It is
//! born with a fallback session per kind at the trimmed workspace root, and
//! grows a real session whenever a config file's content first enters the
//! VFS. The fallback of a kind is evicted the moment a real config of that
//! kind appears, and never comes back.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;
use std::sync::Weak;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use tracing::debug;
use tsls_source::classify;
use tsls_source::paths;
use tsls_source::ConfigKind;
use tsls_workspace::SubscriptionId;
use url::Url;

use crate::config::fallback_raw_config;
use crate::error::ProjectError;
use crate::session::Session;
use crate::session::SessionContext;

#[derive(Default)]
struct KindMap {
    sessions: BTreeMap<Utf8PathBuf, Arc<Session>>,
    /// Whether the entry at the workspace root is still the fallback.
    fallback_live: bool,
}

#[derive(Default)]
struct RouterMaps {
    ts: KindMap,
    js: KindMap,
}

impl RouterMaps {
    fn map(&self, kind: ConfigKind) -> &KindMap {
        match kind {
            ConfigKind::Ts => &self.ts,
            ConfigKind::Js => &self.js,
        }
    }

    fn map_mut(&mut self, kind: ConfigKind) -> &mut KindMap {
        match kind {
            ConfigKind::Ts => &mut self.ts,
            ConfigKind::Js => &mut self.js,
        }
    }
}

pub struct ProjectRouter {
    ctx: Arc<SessionContext>,
    /// Trimmed workspace root; the key fallbacks live under.
    root: Utf8PathBuf,
    maps: RwLock<RouterMaps>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl ProjectRouter {
    /// Build the router, install both fallbacks, and subscribe to VFS
    /// `added` events for config discovery.
    pub fn new(ctx: Arc<SessionContext>) -> Arc<Self> {
        let root = paths::trimmed_dir(&ctx.workspace_root);
        let router = Arc::new(Self {
            ctx: ctx.clone(),
            root: root.clone(),
            maps: RwLock::new(RouterMaps::default()),
            subscription: Mutex::new(None),
        });

        {
            let mut maps = router.maps.write().expect("router maps poisoned");
            for kind in [ConfigKind::Ts, ConfigKind::Js] {
                let session = Arc::new(Session::new(
                    ctx.clone(),
                    kind,
                    root.clone(),
                    None,
                    Some(fallback_raw_config(kind)),
                ));
                let map = maps.map_mut(kind);
                map.sessions.insert(root.clone(), session);
                map.fallback_live = true;
            }
        }

        let weak: Weak<ProjectRouter> = Arc::downgrade(&router);
        let id = ctx.vfs.subscribe_added(move |uri, content| {
            if let Some(router) = weak.upgrade() {
                router.on_added(uri, content);
            }
        });
        *router.subscription.lock().expect("subscription poisoned") = Some(id);

        router
    }

    /// React to a file's content arriving in the VFS: a non-empty config
    /// file outside `node_modules` becomes a session.
    fn on_added(&self, uri: &Url, content: &str) {
        if content.is_empty() {
            return;
        }
        let Some(path) = paths::url_to_path(uri) else {
            return;
        };
        let Some(kind) = ConfigKind::from_config_file(&path) else {
            return;
        };
        if classify::in_node_modules(&path) {
            return;
        }
        let Some(dir) = path.parent() else {
            return;
        };
        let dir = paths::trimmed_dir(dir);

        let session = Arc::new(Session::new(
            self.ctx.clone(),
            kind,
            dir.clone(),
            Some(path.clone()),
            None,
        ));

        let mut maps = self.maps.write().expect("router maps poisoned");
        let map = maps.map_mut(kind);
        if map.fallback_live {
            if dir != self.root {
                map.sessions.remove(&self.root);
            }
            map.fallback_live = false;
        }
        debug!(config = %path, kind = kind.as_str(), "project session created");
        map.sessions.insert(dir, session);
    }

    /// The session owning `path`: nearest enclosing directory in the kind's
    /// map, else the entry at the trimmed root.
    #[must_use]
    pub fn configuration_if_exists(
        &self,
        path: &Utf8Path,
        kind: Option<ConfigKind>,
    ) -> Option<Arc<Session>> {
        let kind = kind.unwrap_or_else(|| ConfigKind::from_path(path));
        let maps = self.maps.read().expect("router maps poisoned");
        let map = maps.map(kind);

        let mut dir: Option<Utf8PathBuf> = path.parent().map(paths::trimmed_dir);
        while let Some(current) = dir {
            if let Some(session) = map.sessions.get(&current) {
                return Some(session.clone());
            }
            if current == self.root {
                break;
            }
            dir = current.parent().map(paths::trimmed_dir);
        }
        map.sessions.get(&self.root).cloned()
    }

    /// Throwing variant of [`ProjectRouter::configuration_if_exists`].
    pub fn configuration(
        &self,
        path: &Utf8Path,
        kind: Option<ConfigKind>,
    ) -> Result<Arc<Session>, ProjectError> {
        self.configuration_if_exists(path, kind)
            .ok_or_else(|| ProjectError::ConfigNotFound {
                path: path.to_owned(),
            })
    }

    /// Every session whose directory sits under `dir`, both kinds.
    #[must_use]
    pub fn child_configurations(&self, dir: &Utf8Path) -> Vec<Arc<Session>> {
        let prefix = paths::trimmed_dir(dir);
        let maps = self.maps.read().expect("router maps poisoned");
        maps.js
            .sessions
            .iter()
            .chain(maps.ts.sessions.iter())
            .filter(|(key, _)| key.starts_with(&prefix))
            .map(|(_, session)| session.clone())
            .collect()
    }

    /// Every session, js map first, then ts.
    #[must_use]
    pub fn all_configurations(&self) -> Vec<Arc<Session>> {
        let maps = self.maps.read().expect("router maps poisoned");
        maps.js
            .sessions
            .values()
            .chain(maps.ts.sessions.values())
            .cloned()
            .collect()
    }

    /// Reset every session, as module-structure invalidation does.
    pub fn reset_all(&self) {
        for session in self.all_configurations() {
            session.reset();
        }
    }

    #[must_use]
    pub fn workspace_root(&self) -> &Utf8Path {
        &self.root
    }

    /// Tear down the VFS subscription. Sessions stay queryable.
    pub fn dispose(&self) {
        if let Some(id) = self.subscription.lock().expect("subscription poisoned").take() {
            self.ctx.vfs.unsubscribe(id);
        }
    }
}
