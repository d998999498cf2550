//! Artifact cache readers.
//!
//! The deployer only reads from the cache. An empty string means the page
//! is no longer cached and its deployed file should be removed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::warn;

use crate::file_sync::artifact_relative_path;
use crate::site::{SiteRegistry, SiteUri};

/// Supplies rendered page content per site URI.
pub trait ArtifactCache: Send + Sync {
    /// Cached content for `uri`, or an empty string when nothing is cached.
    fn get(&self, uri: &SiteUri) -> String;
}

/// Cache laid out on disk as `<root>/<site-uid>/<uri>/index.html`.
pub struct DirectoryCache<R> {
    root: PathBuf,
    registry: R,
}

impl<R: SiteRegistry> DirectoryCache<R> {
    pub fn new(root: impl Into<PathBuf>, registry: R) -> Self {
        Self {
            root: root.into(),
            registry,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every cached URI for the site `uid`, found by walking its directory.
    pub fn list(&self, uid: &str) -> Vec<SiteUri> {
        let Some(site_id) = self.registry.site_id_for(uid) else {
            return Vec::new();
        };
        let site_root = self.root.join(uid);
        let mut found = Vec::new();
        collect_pages(&site_root, &site_root, &mut |rel| {
            found.push(SiteUri::new(site_id, rel));
        });
        found.sort();
        found
    }
}

fn collect_pages(base: &Path, dir: &Path, found: &mut dyn FnMut(String)) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_pages(base, &path, found);
        } else if path.file_name().is_some_and(|n| n == "index.html") {
            let rel = path
                .parent()
                .and_then(|p| p.strip_prefix(base).ok())
                .map(|p| {
                    p.components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect::<Vec<_>>()
                        .join("/")
                })
                .unwrap_or_default();
            found(rel);
        }
    }
}

impl<R: SiteRegistry> ArtifactCache for DirectoryCache<R> {
    fn get(&self, uri: &SiteUri) -> String {
        let Some(uid) = self.registry.uid_for(uri.site_id) else {
            return String::new();
        };
        let path = self.root.join(uid).join(artifact_relative_path(&uri.uri));
        match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read cached page");
                String::new()
            }
        }
    }
}

/// In-memory cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    pages: RwLock<HashMap<SiteUri, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, uri: SiteUri, content: impl Into<String>) {
        if let Ok(mut pages) = self.pages.write() {
            pages.insert(uri, content.into());
        }
    }

    pub fn remove(&self, uri: &SiteUri) {
        if let Ok(mut pages) = self.pages.write() {
            pages.remove(uri);
        }
    }
}

impl ArtifactCache for MemoryCache {
    fn get(&self, uri: &SiteUri) -> String {
        self.pages
            .read()
            .ok()
            .and_then(|pages| pages.get(uri).cloned())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::StaticSiteRegistry;

    #[test]
    fn test_memory_cache() {
        let cache = MemoryCache::new();
        let uri = SiteUri::new(1, "about");
        assert_eq!(cache.get(&uri), "");
        cache.insert(uri.clone(), "<p>about</p>");
        assert_eq!(cache.get(&uri), "<p>about</p>");
        cache.remove(&uri);
        assert_eq!(cache.get(&uri), "");
    }

    #[test]
    fn test_directory_cache_reads_pages() {
        let dir = tempfile::tempdir().unwrap();
        let page = dir.path().join("blog/posts/hello/index.html");
        std::fs::create_dir_all(page.parent().unwrap()).unwrap();
        std::fs::write(&page, "<h1>hello</h1>").unwrap();
        std::fs::write(dir.path().join("blog/index.html"), "<h1>home</h1>").unwrap();

        let cache = DirectoryCache::new(dir.path(), StaticSiteRegistry::new([("blog", 1)]));
        assert_eq!(cache.get(&SiteUri::new(1, "posts/hello")), "<h1>hello</h1>");
        assert_eq!(cache.get(&SiteUri::new(1, "")), "<h1>home</h1>");
        assert_eq!(cache.get(&SiteUri::new(1, "missing")), "");
        assert_eq!(cache.get(&SiteUri::new(7, "posts/hello")), "");
    }

    #[test]
    fn test_directory_cache_lists_site() {
        let dir = tempfile::tempdir().unwrap();
        for rel in ["blog/index.html", "blog/a/index.html", "blog/a/b/index.html", "blog/a/style.css"] {
            let path = dir.path().join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "x").unwrap();
        }
        let cache = DirectoryCache::new(dir.path(), StaticSiteRegistry::new([("blog", 1)]));
        let listed: Vec<String> = cache.list("blog").into_iter().map(|u| u.uri).collect();
        assert_eq!(listed, vec!["", "a", "a/b"]);
        assert!(cache.list("unknown").is_empty());
    }
}
