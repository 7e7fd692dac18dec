//! `tsconfig.json` / `jsconfig.json` parsing and expansion.
//!
//! Raw configs are the serde model of the on-disk JSON (json5 dialect, since
//! real config files carry comments). Expansion turns a raw config into
//! effective [`CompilerOptions`] plus the expected file set: the workspace
//! files its `files`/`include`/`exclude` patterns claim.

use camino::Utf8Path;
use camino::Utf8PathBuf;
use globset::Glob;
use globset::GlobSet;
use globset::GlobSetBuilder;
use serde::Deserialize;
use tsls_source::classify;

use crate::options::CompilerOptions;
use crate::options::ModuleKind;
use crate::ConfigError;
use crate::ResolutionHost;

/// Directories TypeScript excludes when a config has no `exclude` of its own.
const DEFAULT_EXCLUDES: &[&str] = &["node_modules", "bower_components", "jspm_packages"];

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RawProjectConfig {
    pub compiler_options: RawCompilerOptions,
    pub files: Option<Vec<String>>,
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RawCompilerOptions {
    pub module: Option<String>,
    pub target: Option<String>,
    pub allow_js: Option<bool>,
    pub strict: Option<bool>,
    pub trace_resolution: Option<bool>,
    pub base_url: Option<String>,
}

/// A raw config expanded against a concrete root directory.
#[derive(Clone, Debug)]
pub struct ParsedProjectConfig {
    pub options: CompilerOptions,
    /// Absolute paths of the files the config claims, sorted.
    pub file_names: Vec<Utf8PathBuf>,
}

/// Parse config-file text. Empty or whitespace-only text is a valid empty
/// config, matching how editors surface just-created files.
pub fn parse_config_text(path: &Utf8Path, text: &str) -> Result<RawProjectConfig, ConfigError> {
    if text.trim().is_empty() {
        return Ok(RawProjectConfig::default());
    }
    json5::from_str(text).map_err(|err| ConfigError::new(path, err.to_string()))
}

/// Expand `raw` against `root`, matching include/exclude patterns over the
/// files the host currently knows.
pub fn parse_config(
    raw: &RawProjectConfig,
    config_path: &Utf8Path,
    root: &Utf8Path,
    host: &dyn ResolutionHost,
) -> Result<ParsedProjectConfig, ConfigError> {
    let options = effective_options(&raw.compiler_options, root);

    let mut file_names: Vec<Utf8PathBuf> = Vec::new();

    if let Some(files) = &raw.files {
        for file in files {
            let path = if Utf8Path::new(file).is_absolute() {
                Utf8PathBuf::from(file)
            } else {
                root.join(file)
            };
            file_names.push(path);
        }
    }

    let include = match &raw.include {
        Some(patterns) => patterns.clone(),
        // An explicit `files` list with no `include` claims nothing more.
        None if raw.files.is_some() => Vec::new(),
        None => vec!["**/*".to_string()],
    };

    if !include.is_empty() {
        let include_set = build_globset(config_path, &include)?;
        let exclude_patterns = match &raw.exclude {
            Some(patterns) => patterns.clone(),
            None => DEFAULT_EXCLUDES.iter().map(|s| (*s).to_string()).collect(),
        };
        let exclude_set = build_globset(config_path, &exclude_patterns)?;

        for path in host.known_files() {
            let Ok(rel) = path.strip_prefix(root) else {
                continue;
            };
            if !included_by_options(&path, &options) {
                continue;
            }
            if include_set.is_match(rel.as_std_path()) && !exclude_set.is_match(rel.as_std_path())
            {
                file_names.push(path);
            }
        }
    }

    file_names.sort();
    file_names.dedup();

    Ok(ParsedProjectConfig {
        options,
        file_names,
    })
}

fn effective_options(raw: &RawCompilerOptions, root: &Utf8Path) -> CompilerOptions {
    CompilerOptions {
        module: raw
            .module
            .as_deref()
            .map(ModuleKind::parse)
            .unwrap_or_default(),
        target: raw
            .target
            .as_deref()
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty()),
        allow_js: raw.allow_js.unwrap_or(false),
        strict: raw.strict.unwrap_or(false),
        trace_resolution: raw.trace_resolution.unwrap_or(false),
        base_url: raw.base_url.as_deref().map(|b| {
            if Utf8Path::new(b).is_absolute() {
                Utf8PathBuf::from(b)
            } else {
                root.join(b)
            }
        }),
    }
}

fn included_by_options(path: &Utf8Path, options: &CompilerOptions) -> bool {
    if classify::is_declaration_file(path) {
        return true;
    }
    match path.extension() {
        Some("ts" | "tsx") => true,
        Some("js" | "jsx") => options.allow_js,
        _ => false,
    }
}

fn build_globset(config_path: &Utf8Path, patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let normalized = normalize_glob_pattern(pattern);
        if normalized.is_empty() {
            continue;
        }
        let glob = Glob::new(&normalized).map_err(|err| {
            ConfigError::new(config_path, format!("invalid pattern '{pattern}': {err}"))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|err| ConfigError::new(config_path, err.to_string()))
}

/// Canonicalize a config glob: forward slashes, no `./` or leading `/`, and
/// bare directory names claim their whole subtree, as `tsconfig` patterns do.
fn normalize_glob_pattern(pattern: &str) -> String {
    let mut normalized = pattern.trim().replace('\\', "/");
    while let Some(rest) = normalized.strip_prefix("./") {
        normalized = rest.to_string();
    }
    let normalized = normalized.trim_start_matches('/');

    if normalized.is_empty() || contains_glob_magic(normalized) {
        return normalized.to_string();
    }
    let trimmed = normalized.trim_end_matches('/');
    if Utf8Path::new(trimmed).extension().is_some() || trimmed.ends_with(".d.ts") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/**/*")
    }
}

fn contains_glob_magic(pattern: &str) -> bool {
    pattern.chars().any(|c| matches!(c, '*' | '?' | '[' | ']' | '{' | '}'))
}
