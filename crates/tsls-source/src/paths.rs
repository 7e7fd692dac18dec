//! URL/path conversion utilities.
//!
//! All public API in this workspace speaks `file://`-style URLs; internals
//! speak [`Utf8PathBuf`] with forward slashes. These helpers are the single
//! place where the two meet, handling percent-encoding and Windows drive
//! letters.

use camino::Utf8Path;
use camino::Utf8PathBuf;
use url::Url;

/// Convert a `file://` URL to a [`Utf8PathBuf`].
///
/// Handles percent-encoding and Windows drive paths (`/C:/...`). Returns
/// `None` for non-file schemes or undecodable paths.
#[must_use]
pub fn url_to_path(url: &Url) -> Option<Utf8PathBuf> {
    if url.scheme() != "file" {
        return None;
    }

    let path = percent_encoding::percent_decode_str(url.path())
        .decode_utf8()
        .ok()?;

    // Strip the leading '/' from Windows drive paths like /C:/...
    let bytes = path.as_bytes();
    let path: &str = if bytes.len() >= 3
        && bytes[0] == b'/'
        && bytes[1].is_ascii_alphabetic()
        && bytes[2] == b':'
    {
        &path[1..]
    } else {
        &path
    };

    Some(Utf8PathBuf::from(path))
}

/// Convert an absolute path to a `file://` URL.
///
/// The path does not need to exist; virtual and not-yet-fetched files get
/// URLs too. Returns `None` for relative paths.
#[must_use]
pub fn path_to_url(path: &Utf8Path) -> Option<Url> {
    if !path.is_absolute() {
        return None;
    }
    Url::from_file_path(path.as_std_path()).ok()
}

/// Produce a URL for `path` carrying the scheme and host of `template`.
///
/// Resolution yields workspace paths; callers need them as URLs addressed
/// the same way the triggering URI was (remote workspaces use non-`file`
/// schemes).
#[must_use]
pub fn url_like(template: &Url, path: &Utf8Path) -> Url {
    let mut url = template.clone();
    url.set_path(&slashed(path));
    url.set_query(None);
    url.set_fragment(None);
    url
}

/// The path with every separator as a forward slash.
#[must_use]
pub fn slashed(path: &Utf8Path) -> String {
    path.as_str().replace('\\', "/")
}

/// A directory path without its trailing slash, as the router keys it.
///
/// The filesystem root `/` is kept as-is; it has no trimmed form.
#[must_use]
pub fn trimmed_dir(path: &Utf8Path) -> Utf8PathBuf {
    let s = path.as_str();
    if s.len() > 1 && (s.ends_with('/') || s.ends_with('\\')) {
        Utf8PathBuf::from(&s[..s.len() - 1])
    } else {
        path.to_owned()
    }
}

/// Resolve `segments` left to right with POSIX semantics: an absolute
/// segment restarts resolution, a relative one appends. `.` and `..`
/// components are folded. Mirrors `path.posix.resolve`.
#[must_use]
pub fn posix_resolve(segments: &[&str]) -> Utf8PathBuf {
    let mut parts: Vec<&str> = Vec::new();
    for segment in segments {
        if segment.starts_with('/') {
            parts.clear();
        }
        for component in segment.split('/') {
            match component {
                "" | "." => {}
                ".." => {
                    parts.pop();
                }
                other => parts.push(other),
            }
        }
    }
    Utf8PathBuf::from(format!("/{}", parts.join("/")))
}

/// Windows-flavored variant of [`posix_resolve`]: both separators split,
/// and a drive-letter or UNC-style segment restarts resolution.
#[must_use]
pub fn windows_resolve(segments: &[&str]) -> Utf8PathBuf {
    let is_absolute = |s: &str| {
        s.starts_with('\\')
            || s.starts_with('/')
            || (s.len() >= 2 && s.as_bytes()[1] == b':' && s.as_bytes()[0].is_ascii_alphabetic())
    };

    let mut prefix = String::new();
    let mut parts: Vec<&str> = Vec::new();
    for segment in segments {
        if is_absolute(segment) {
            parts.clear();
            prefix.clear();
            if segment.len() >= 2 && segment.as_bytes()[1] == b':' {
                prefix.push_str(&segment[..2]);
            }
        }
        let body = segment.strip_prefix(prefix.as_str()).unwrap_or(segment);
        for component in body.split(['/', '\\']) {
            match component {
                "" | "." => {}
                ".." => {
                    parts.pop();
                }
                other => parts.push(other),
            }
        }
    }
    Utf8PathBuf::from(format!("{prefix}\\{}", parts.join("\\")))
}
