//! Site adapter capability and registry
//!
//! Each content source is a [`SiteAdapter`] that turns a theme into a list of
//! [`Candidate`]s. Page parsing lives in the adapter implementations; the
//! acquisition pipeline only sees the candidates they return.

use crate::candidates::Candidate;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Turns a theme into candidate image URLs for one content source
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use wallpaper_dl::{Candidate, Result, SiteAdapter};
///
/// struct Gallery;
///
/// #[async_trait]
/// impl SiteAdapter for Gallery {
///     fn id(&self) -> &str {
///         "gallery.example"
///     }
///
///     async fn discover(&self, theme: &str) -> Result<Vec<Candidate>> {
///         Ok(vec![Candidate::new(format!("https://gallery.example/{theme}/1.jpg"))])
///     }
/// }
/// ```
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    /// Source identifier this adapter is registered under (e.g. "wallhaven.cc")
    fn id(&self) -> &str;

    /// Discover candidates for `theme`
    ///
    /// Order matters: it feeds the first-seen ordering of the candidate set.
    async fn discover(&self, theme: &str) -> Result<Vec<Candidate>>;
}

/// Adapters keyed by source identifier
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn SiteAdapter>>,
}

impl AdapterRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own id, replacing any previous one
    pub fn register(&mut self, adapter: Arc<dyn SiteAdapter>) {
        let id = adapter.id().to_string();
        if self.adapters.insert(id.clone(), adapter).is_some() {
            tracing::debug!(site = %id, "Replaced site adapter");
        }
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, adapter: Arc<dyn SiteAdapter>) -> Self {
        self.register(adapter);
        self
    }

    /// Adapter registered for `site`
    pub fn get(&self, site: &str) -> Option<Arc<dyn SiteAdapter>> {
        self.adapters.get(site).cloned()
    }

    /// Registered source identifiers, sorted
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Adapters for `sites`, in the requested order
    ///
    /// Unknown sites are warned about and skipped; repeated sites are used
    /// once. Fails when no requested site has an adapter.
    pub fn select(&self, sites: &[String]) -> Result<Vec<Arc<dyn SiteAdapter>>> {
        let mut selected: Vec<Arc<dyn SiteAdapter>> = Vec::with_capacity(sites.len());

        for site in sites {
            if selected.iter().any(|a| a.id() == site) {
                continue;
            }
            match self.get(site) {
                Some(adapter) => selected.push(adapter),
                None => tracing::warn!(
                    site = %site,
                    available = ?self.ids(),
                    "No adapter registered for site, skipping"
                ),
            }
        }

        if selected.is_empty() {
            return Err(Error::config(
                "sites",
                format!("none of the requested sites are supported: {:?}", sites),
            ));
        }
        Ok(selected)
    }
}

/// Adapter serving fixed candidate lists per theme
///
/// Useful for curated URL lists and for tests. Candidates are tagged with the
/// adapter id as their source.
#[derive(Debug, Clone)]
pub struct StaticAdapter {
    id: String,
    themes: HashMap<String, Vec<Candidate>>,
}

impl StaticAdapter {
    /// Adapter with no candidates
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            themes: HashMap::new(),
        }
    }

    /// Serve `candidates` for `theme` (appends to any existing list)
    pub fn with_theme(
        mut self,
        theme: impl Into<String>,
        candidates: impl IntoIterator<Item = Candidate>,
    ) -> Self {
        let source = self.id.clone();
        self.themes
            .entry(theme.into())
            .or_default()
            .extend(candidates.into_iter().map(|c| match c.source {
                Some(_) => c,
                None => c.with_source(source.clone()),
            }));
        self
    }
}

#[async_trait]
impl SiteAdapter for StaticAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    async fn discover(&self, theme: &str) -> Result<Vec<Candidate>> {
        Ok(self.themes.get(theme).cloned().unwrap_or_default())
    }
}
