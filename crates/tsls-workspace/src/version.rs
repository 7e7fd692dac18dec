//! Shared per-URI version counters.

use std::sync::Arc;

use dashmap::DashMap;
use url::Url;

/// Monotonic version per URI, shared read-only by every compiler session
/// and bumped only by change intake.
#[derive(Clone, Debug, Default)]
pub struct VersionMap {
    inner: Arc<DashMap<Url, u64>>,
}

impl VersionMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current version, or `None` if the URI has never been seen.
    #[must_use]
    pub fn get(&self, uri: &Url) -> Option<u64> {
        self.inner.get(uri).map(|v| *v)
    }

    /// Current version, seeding unseen URIs to `1`.
    pub fn get_or_seed(&self, uri: &Url) -> u64 {
        *self.inner.entry(uri.clone()).or_insert(1)
    }

    /// Increment and return the version. Unseen URIs go straight to `1`.
    pub fn bump(&self, uri: &Url) -> u64 {
        let mut entry = self.inner.entry(uri.clone()).or_insert(0);
        *entry += 1;
        *entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn seed_is_one_and_sticky() {
        let versions = VersionMap::new();
        let u = uri("file:///w/a.ts");
        assert_eq!(versions.get(&u), None);
        assert_eq!(versions.get_or_seed(&u), 1);
        assert_eq!(versions.get(&u), Some(1));
    }

    #[test]
    fn bump_increments_by_exactly_one() {
        let versions = VersionMap::new();
        let u = uri("file:///w/a.ts");
        assert_eq!(versions.bump(&u), 1);
        assert_eq!(versions.bump(&u), 2);
        assert_eq!(versions.get(&u), Some(2));
    }
}
