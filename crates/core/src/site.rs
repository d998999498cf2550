//! Sites, site URIs and the site registry.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Numeric, installation-scoped site id.
pub type SiteId = u32;

/// A page URI belonging to a site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SiteUri {
    pub site_id: SiteId,
    /// Path of the page relative to the site root, without leading slash.
    pub uri: String,
}

impl SiteUri {
    pub fn new(site_id: SiteId, uri: impl Into<String>) -> Self {
        Self {
            site_id,
            uri: uri.into(),
        }
    }
}

impl std::fmt::Display for SiteUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.site_id, self.uri)
    }
}

impl std::str::FromStr for SiteUri {
    type Err = String;

    /// Parse `<site-id>:<uri>`. The uri part may be empty (site home page).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, uri) = s
            .split_once(':')
            .ok_or_else(|| format!("expected <site-id>:<uri>, got '{}'", s))?;
        let site_id = id
            .trim()
            .parse::<SiteId>()
            .map_err(|_| format!("invalid site id '{}'", id))?;
        Ok(Self::new(site_id, uri.trim().trim_start_matches('/')))
    }
}

/// Partition `uris` by owning site. Sites come out in ascending id order;
/// within a site the input order is kept.
pub fn group_by_site<I>(uris: I) -> BTreeMap<SiteId, Vec<SiteUri>>
where
    I: IntoIterator<Item = SiteUri>,
{
    let mut groups: BTreeMap<SiteId, Vec<SiteUri>> = BTreeMap::new();
    for uri in uris {
        groups.entry(uri.site_id).or_default().push(uri);
    }
    groups
}

/// Maps between numeric site ids and stable site UIDs.
pub trait SiteRegistry: Send + Sync {
    fn uid_for(&self, site_id: SiteId) -> Option<String>;
    fn site_id_for(&self, uid: &str) -> Option<SiteId>;
}

/// A fixed registry, typically built from the `[sites]` config table.
#[derive(Debug, Clone, Default)]
pub struct StaticSiteRegistry {
    by_uid: BTreeMap<String, SiteId>,
    by_id: HashMap<SiteId, String>,
}

impl StaticSiteRegistry {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, SiteId)>,
        S: Into<String>,
    {
        let mut registry = Self::default();
        for (uid, id) in entries {
            let uid = uid.into();
            registry.by_id.insert(id, uid.clone());
            registry.by_uid.insert(uid, id);
        }
        registry
    }
}

impl SiteRegistry for StaticSiteRegistry {
    fn uid_for(&self, site_id: SiteId) -> Option<String> {
        self.by_id.get(&site_id).cloned()
    }

    fn site_id_for(&self, uid: &str) -> Option<SiteId> {
        self.by_uid.get(uid).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_by_site() {
        let uris = vec![
            SiteUri::new(2, "docs/intro"),
            SiteUri::new(1, ""),
            SiteUri::new(2, "docs/setup"),
            SiteUri::new(1, "about"),
        ];
        let groups = group_by_site(uris);
        assert_eq!(groups.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(
            groups[&1],
            vec![SiteUri::new(1, ""), SiteUri::new(1, "about")]
        );
        assert_eq!(groups[&2].len(), 2);
        assert_eq!(groups[&2][0].uri, "docs/intro");
    }

    #[test]
    fn test_group_empty() {
        assert!(group_by_site(Vec::new()).is_empty());
    }

    #[test]
    fn test_parse_site_uri() {
        assert_eq!("3:blog/post".parse::<SiteUri>().unwrap(), SiteUri::new(3, "blog/post"));
        assert_eq!("1:/about".parse::<SiteUri>().unwrap(), SiteUri::new(1, "about"));
        assert_eq!("1:".parse::<SiteUri>().unwrap(), SiteUri::new(1, ""));
        assert!("blog/post".parse::<SiteUri>().is_err());
        assert!("x:post".parse::<SiteUri>().is_err());
    }

    #[test]
    fn test_static_registry() {
        let registry = StaticSiteRegistry::new([("blog", 1), ("docs", 2)]);
        assert_eq!(registry.uid_for(1).as_deref(), Some("blog"));
        assert_eq!(registry.site_id_for("docs"), Some(2));
        assert_eq!(registry.uid_for(9), None);
        assert_eq!(registry.site_id_for("shop"), None);
    }
}
