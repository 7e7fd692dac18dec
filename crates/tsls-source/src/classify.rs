//! Filename-convention classification.
//!
//! The router, sessions, and materialization pipelines all route on the same
//! handful of filename tests: is this a project config, a declaration file, a
//! `package.json`, a source file at all? Keeping them here keeps the answers
//! consistent.

use camino::Utf8Path;

/// Which of the two parallel project worlds a file belongs to.
///
/// `tsconfig.json` governs the TypeScript world, `jsconfig.json` the
/// JavaScript one; a file with neither nearby is routed by extension.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ConfigKind {
    Ts,
    Js,
}

impl ConfigKind {
    /// Infer the kind for an arbitrary workspace path.
    ///
    /// `jsconfig.json` and `.js`/`.jsx` sources are [`ConfigKind::Js`];
    /// everything else, including `tsconfig.json` itself, is
    /// [`ConfigKind::Ts`].
    #[must_use]
    pub fn from_path(path: &Utf8Path) -> Self {
        if path.file_name() == Some("jsconfig.json") {
            return ConfigKind::Js;
        }
        match path.extension() {
            Some("js" | "jsx") => ConfigKind::Js,
            _ => ConfigKind::Ts,
        }
    }

    /// The kind a config file declares, or `None` if the path is not a
    /// config file.
    #[must_use]
    pub fn from_config_file(path: &Utf8Path) -> Option<Self> {
        match path.file_name() {
            Some("tsconfig.json") => Some(ConfigKind::Ts),
            Some("jsconfig.json") => Some(ConfigKind::Js),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKind::Ts => "ts",
            ConfigKind::Js => "js",
        }
    }
}

/// `tsconfig.json` or `jsconfig.json`, anywhere in the tree.
#[must_use]
pub fn is_config_file(path: &Utf8Path) -> bool {
    ConfigKind::from_config_file(path).is_some()
}

/// `package.json`, anywhere in the tree.
#[must_use]
pub fn is_package_json(path: &Utf8Path) -> bool {
    path.file_name() == Some("package.json")
}

/// An ambient declaration file (`*.d.ts` / `*.d.tsx`).
#[must_use]
pub fn is_declaration_file(path: &Utf8Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.ends_with(".d.ts") || name.ends_with(".d.tsx"))
}

/// A declaration file sitting directly under the workspace root, visible to
/// every project in the workspace.
#[must_use]
pub fn is_global_declaration(path: &Utf8Path, workspace_root: &Utf8Path) -> bool {
    is_declaration_file(path) && path.parent() == Some(workspace_root)
}

/// Any JS/TS source file this system analyzes.
#[must_use]
pub fn is_source_file(path: &Utf8Path) -> bool {
    matches!(path.extension(), Some("ts" | "tsx" | "js" | "jsx"))
}

/// Whether any component of the path is a `node_modules` directory.
#[must_use]
pub fn in_node_modules(path: &Utf8Path) -> bool {
    path.components().any(|c| c.as_str() == "node_modules")
}
