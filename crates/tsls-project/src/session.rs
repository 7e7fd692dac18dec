//! Per-configuration compiler sessions.
//!
//! A [`Session`] wraps one project configuration (a real `tsconfig.json` /
//! `jsconfig.json`, or the synthetic fallback at the workspace root) and
//! stages files into its analyzer in three tiers: config only, basic
//! (globals and declarations), and all expected files. Tier flags and the
//! staged file list only ever grow until [`Session::reset`].

use std::sync::Arc;
use std::sync::Mutex;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use rustc_hash::FxHashSet;
use tracing::debug;
use tracing::error;
use tsls_analyzer::Analyzer;
use tsls_analyzer::CompilerOptions;
use tsls_analyzer::DocumentRegistry;
use tsls_analyzer::LanguageService;
use tsls_analyzer::Program;
use tsls_analyzer::RawProjectConfig;
use tsls_analyzer::ResolutionHost;
use tsls_source::classify;
use tsls_source::ConfigKind;
use tsls_workspace::VersionMap;
use tsls_workspace::Vfs;

use crate::error::ProjectError;
use crate::host::SessionHost;

/// Workspace-wide collaborators shared by every session.
pub struct SessionContext {
    pub workspace_root: Utf8PathBuf,
    pub vfs: Arc<Vfs>,
    pub versions: VersionMap,
    pub registry: Arc<dyn DocumentRegistry>,
    pub analyzer: Arc<dyn Analyzer>,
    /// Force module-resolution tracing in every session.
    pub trace_resolution: bool,
}

#[derive(Default)]
struct SessionState {
    initialized: bool,
    ensured_basic_files: bool,
    ensured_all_files: bool,
    host: Option<Arc<SessionHost>>,
    service: Option<Arc<dyn LanguageService>>,
    expected_files: FxHashSet<Utf8PathBuf>,
    options: CompilerOptions,
}

pub struct Session {
    ctx: Arc<SessionContext>,
    kind: ConfigKind,
    /// Directory this session governs; the trimmed workspace root for
    /// fallbacks.
    root: Utf8PathBuf,
    /// Path of the config file, `None` for a fallback session.
    config_path: Option<Utf8PathBuf>,
    /// Pre-baked config for fallback sessions.
    prebaked: Option<RawProjectConfig>,
    state: Mutex<SessionState>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("kind", &self.kind)
            .field("root", &self.root)
            .field("config_path", &self.config_path)
            .finish()
    }
}

impl Session {
    #[must_use]
    pub fn new(
        ctx: Arc<SessionContext>,
        kind: ConfigKind,
        root: Utf8PathBuf,
        config_path: Option<Utf8PathBuf>,
        prebaked: Option<RawProjectConfig>,
    ) -> Self {
        Self {
            ctx,
            kind,
            root,
            config_path,
            prebaked,
            state: Mutex::new(SessionState::default()),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ConfigKind {
        self.kind
    }

    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    #[must_use]
    pub fn config_path(&self) -> Option<&Utf8Path> {
        self.config_path.as_deref()
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.config_path.is_none()
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    /// Effective compiler options; default until the session initializes.
    #[must_use]
    pub fn options(&self) -> CompilerOptions {
        self.lock().options.clone()
    }

    #[must_use]
    pub fn host(&self) -> Option<Arc<SessionHost>> {
        self.lock().host.clone()
    }

    #[must_use]
    pub fn expected_files(&self) -> FxHashSet<Utf8PathBuf> {
        self.lock().expected_files.clone()
    }

    /// Idempotent initialization: parse the config, compute the expected
    /// file set, and build the host and language service. A parse failure
    /// leaves the session uninitialized; the next call retries.
    pub fn ensure_config_file(&self) -> Result<(), ProjectError> {
        let mut state = self.lock();
        if state.initialized {
            return Ok(());
        }

        match self.initialize(&mut state) {
            Ok(()) => Ok(()),
            Err(err) => {
                error!(root = %self.root, error = %err, "session init failed");
                Err(err)
            }
        }
    }

    fn initialize(&self, state: &mut SessionState) -> Result<(), ProjectError> {
        let config_path = self
            .config_path
            .clone()
            .unwrap_or_else(|| self.root.join("tsconfig.json"));

        let raw = if let Some(prebaked) = &self.prebaked {
            prebaked.clone()
        } else {
            let text = self
                .ctx
                .vfs
                .read_file(&config_path)
                .ok_or_else(|| ProjectError::ConfigParse {
                    path: config_path.clone(),
                    message: "config file has no content in the workspace".to_string(),
                })?;
            self.ctx
                .analyzer
                .parse_config_text(&config_path, &text)?
        };

        let parsed =
            self.ctx
                .analyzer
                .parse_config(&raw, &config_path, &self.root, &*self.ctx.vfs)?;

        let mut options = parsed.options;
        if self.kind == ConfigKind::Js {
            options.allow_js = true;
        }
        if self.ctx.trace_resolution {
            options.trace_resolution = true;
        }

        let host = Arc::new(SessionHost::new(
            self.root.clone(),
            options.clone(),
            self.ctx.vfs.clone(),
            self.ctx.versions.clone(),
            self.ctx.analyzer.clone(),
        ));
        let service = self
            .ctx
            .analyzer
            .create_language_service(host.clone(), self.ctx.registry.clone());

        state.expected_files = parsed.file_names.into_iter().collect();
        state.options = options;
        state.host = Some(host);
        state.service = Some(service);
        state.initialized = true;
        debug!(root = %self.root, kind = self.kind.as_str(), "session initialized");
        Ok(())
    }

    /// Stage the globally visible declaration files plus this project's own
    /// declaration files.
    pub fn ensure_basic_files(&self) -> Result<(), ProjectError> {
        self.ensure_config_file()?;
        let mut state = self.lock();
        if state.ensured_basic_files {
            return Ok(());
        }

        for uri in self.ctx.vfs.uris() {
            let Some(path) = tsls_source::paths::url_to_path(&uri) else {
                continue;
            };
            let wanted = classify::is_global_declaration(&path, &self.ctx.workspace_root)
                || (classify::is_declaration_file(&path) && state.expected_files.contains(&path));
            if wanted {
                Self::stage(&state, &path);
            }
        }

        state.ensured_basic_files = true;
        Ok(())
    }

    /// Stage a single file, as change intake does for the edited document.
    pub fn ensure_source_file(&self, path: &Utf8Path) -> Result<(), ProjectError> {
        self.ensure_config_file()?;
        let state = self.lock();
        Self::stage(&state, path);
        Ok(())
    }

    /// Stage every file in the expected set and mark the host complete.
    pub fn ensure_all_files(&self) -> Result<(), ProjectError> {
        self.ensure_config_file()?;
        let mut state = self.lock();
        if state.ensured_all_files {
            return Ok(());
        }
        if state.host.as_ref().is_some_and(|host| host.is_complete()) {
            state.ensured_all_files = true;
            return Ok(());
        }

        let expected: Vec<Utf8PathBuf> = state.expected_files.iter().cloned().collect();
        for path in expected {
            Self::stage(&state, &path);
        }
        if let Some(host) = &state.host {
            host.set_complete();
        }
        state.ensured_all_files = true;
        Ok(())
    }

    /// Stage `path` unless the current program already contains it.
    fn stage(state: &SessionState, path: &Utf8Path) {
        let (Some(host), Some(service)) = (&state.host, &state.service) else {
            return;
        };
        let in_program = service
            .program()
            .is_some_and(|program| program.has_file(path));
        if !in_program {
            host.add_file(path);
        }
    }

    /// Bump the project version without staging, as close/change intake
    /// does after routing.
    pub fn bump_project_version(&self) {
        if let Some(host) = &self.lock().host {
            host.inc_project_version();
        }
    }

    /// The analyzer's current program, or `None` while uninitialized.
    #[must_use]
    pub fn program(&self) -> Option<Arc<dyn Program>> {
        self.lock().service.as_ref()?.program()
    }

    /// Drop everything derived from the config: tier flags, expected files,
    /// host, and language service. The next ensure call re-initializes.
    pub fn reset(&self) {
        let mut state = self.lock();
        *state = SessionState::default();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().expect("session state poisoned")
    }
}
