//! Module and type-directive resolution against a [`ResolutionHost`].
//!
//! Follows the Node-style algorithm the source language uses: relative
//! specifiers probe extensions then index files; bare specifiers walk
//! `node_modules` directories upward; type directives look in `@types`.
//! Everything is answered from the host's view of the workspace, so files
//! that have not been materialized yet simply fail to resolve (softly).

use camino::Utf8Path;
use camino::Utf8PathBuf;
use tracing::trace;
use tsls_source::classify;
use tsls_source::paths;

use crate::options::CompilerOptions;
use crate::ResolutionHost;
use crate::ResolvedModule;

/// Probe order for extensionless specifiers, mirroring the source
/// language's resolver.
const EXTENSIONS: &[&str] = &["ts", "tsx", "d.ts", "js", "jsx"];

pub fn resolve_module(
    specifier: &str,
    containing_file: &Utf8Path,
    options: &CompilerOptions,
    host: &dyn ResolutionHost,
) -> Option<ResolvedModule> {
    if options.trace_resolution {
        trace!(specifier, containing = %containing_file, "resolving module");
    }

    if is_relative(specifier) {
        let dir = containing_file.parent()?;
        let base = paths::posix_resolve(&[dir.as_str(), specifier]);
        return probe_file_or_directory(&base, host).map(|path| ResolvedModule {
            is_external_library: classify::in_node_modules(&path),
            resolved_file_name: path,
        });
    }

    if let Some(base_url) = &options.base_url {
        let base = paths::posix_resolve(&[base_url.as_str(), specifier]);
        if let Some(path) = probe_file_or_directory(&base, host) {
            return Some(ResolvedModule {
                is_external_library: classify::in_node_modules(&path),
                resolved_file_name: path,
            });
        }
    }

    resolve_in_node_modules(specifier, containing_file, host)
}

pub fn resolve_type_directive(
    name: &str,
    containing_file: &Utf8Path,
    options: &CompilerOptions,
    host: &dyn ResolutionHost,
) -> Option<ResolvedModule> {
    if options.trace_resolution {
        trace!(name, containing = %containing_file, "resolving type directive");
    }

    for dir in ancestors(containing_file) {
        let types_dir = dir.join("node_modules").join("@types").join(name);
        if let Some(path) = probe_package(&types_dir, host) {
            return Some(ResolvedModule {
                resolved_file_name: path,
                is_external_library: true,
            });
        }
    }
    None
}

fn is_relative(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../") || specifier.starts_with('/')
}

/// Probe `base` as a file (exact, then with each extension appended), then
/// as a directory (`package.json` entry points, then index files).
fn probe_file_or_directory(base: &Utf8Path, host: &dyn ResolutionHost) -> Option<Utf8PathBuf> {
    if has_source_extension(base) && host.file_exists(base) {
        return Some(base.to_owned());
    }
    for ext in EXTENSIONS {
        let candidate = Utf8PathBuf::from(format!("{base}.{ext}"));
        if host.file_exists(&candidate) {
            return Some(candidate);
        }
    }
    probe_package(base, host)
}

/// Probe a package directory: `package.json` `types`/`typings`/`main`
/// fields, then `index.*`.
fn probe_package(dir: &Utf8Path, host: &dyn ResolutionHost) -> Option<Utf8PathBuf> {
    let manifest = dir.join("package.json");
    if let Some(text) = host.read_file(&manifest) {
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(&text) {
            for field in ["types", "typings", "main"] {
                let Some(entry) = json.get(field).and_then(|v| v.as_str()) else {
                    continue;
                };
                let target = paths::posix_resolve(&[dir.as_str(), entry]);
                if host.file_exists(&target) {
                    return Some(target);
                }
                for ext in EXTENSIONS {
                    let candidate = Utf8PathBuf::from(format!("{target}.{ext}"));
                    if host.file_exists(&candidate) {
                        return Some(candidate);
                    }
                }
            }
        }
    }

    for ext in EXTENSIONS {
        let candidate = dir.join(format!("index.{ext}"));
        if host.file_exists(&candidate) {
            return Some(candidate);
        }
    }
    None
}

fn resolve_in_node_modules(
    specifier: &str,
    containing_file: &Utf8Path,
    host: &dyn ResolutionHost,
) -> Option<ResolvedModule> {
    for dir in ancestors(containing_file) {
        let base = dir.join("node_modules").join(specifier);
        if let Some(path) = probe_file_or_directory(&base, host) {
            return Some(ResolvedModule {
                resolved_file_name: path,
                is_external_library: true,
            });
        }
    }
    None
}

fn ancestors(path: &Utf8Path) -> impl Iterator<Item = &Utf8Path> {
    path.ancestors().skip(1)
}

fn has_source_extension(path: &Utf8Path) -> bool {
    classify::is_source_file(path) || path.extension() == Some("json")
}
