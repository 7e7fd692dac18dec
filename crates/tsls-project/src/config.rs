//! Synthetic fallback configurations.
//!
//! A workspace with no config files still routes every file somewhere: the
//! router installs one fallback session per [`ConfigKind`] at the trimmed
//! workspace root, configured as if a minimal config file sat there.

use tsls_analyzer::RawCompilerOptions;
use tsls_analyzer::RawProjectConfig;
use tsls_source::ConfigKind;

/// The config object a fallback session is born with: CommonJS modules and
/// the kind's whole source tree.
#[must_use]
pub fn fallback_raw_config(kind: ConfigKind) -> RawProjectConfig {
    let include = match kind {
        ConfigKind::Ts => "**/*.{ts,tsx}",
        ConfigKind::Js => "**/*.{js,jsx}",
    };
    RawProjectConfig {
        compiler_options: RawCompilerOptions {
            module: Some("commonjs".to_string()),
            allow_js: (kind == ConfigKind::Js).then_some(true),
            ..RawCompilerOptions::default()
        },
        include: Some(vec![include.to_string()]),
        files: None,
        exclude: None,
    }
}

#[cfg(test)]
mod tests {
    use tsls_analyzer::ModuleKind;

    use super::*;

    #[test]
    fn js_fallback_allows_js() {
        let raw = fallback_raw_config(ConfigKind::Js);
        assert_eq!(raw.compiler_options.allow_js, Some(true));
        assert_eq!(raw.include, Some(vec!["**/*.{js,jsx}".to_string()]));
    }

    #[test]
    fn ts_fallback_is_commonjs_without_js() {
        let raw = fallback_raw_config(ConfigKind::Ts);
        assert_eq!(raw.compiler_options.allow_js, None);
        assert_eq!(
            ModuleKind::parse(raw.compiler_options.module.as_deref().unwrap()),
            ModuleKind::CommonJs
        );
    }
}
