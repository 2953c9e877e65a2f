//! Acquisition coordinator: discovery → dedup → pre-selection → download
//!
//! The coordinator owns a validated [`Config`], an [`AdapterRegistry`] and a
//! [`DownloadOrchestrator`]. It is the only place where candidate lists from
//! several sources meet.

use crate::candidates::{Candidate, CandidateSet, preselect};
use crate::config::{Config, RunSettings};
use crate::error::{Error, Result};
use crate::fetch::{FetchClient, Fetcher};
use crate::orchestrator::{DownloadOrchestrator, EVENT_CHANNEL_CAPACITY};
use crate::site::AdapterRegistry;
use crate::types::{AcquisitionPlan, AcquisitionSummary, Event};
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Top-level driver of an acquisition run
#[derive(Clone)]
pub struct Coordinator {
    config: Config,
    settings: RunSettings,
    registry: AdapterRegistry,
    orchestrator: DownloadOrchestrator,
    event_tx: broadcast::Sender<Event>,
}

impl Coordinator {
    /// Validate `config` and build the HTTP client
    ///
    /// Fails with [`Error::Config`] before any network or file work.
    pub fn new(config: Config, registry: AdapterRegistry) -> Result<Self> {
        let fetcher = Arc::new(FetchClient::new(config.fetch.clone())?);
        Self::with_fetcher(config, registry, fetcher)
    }

    /// Like [`new`](Self::new) but with a caller-supplied fetcher
    pub fn with_fetcher(
        config: Config,
        registry: AdapterRegistry,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self> {
        let settings = config.validate()?;
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let orchestrator = DownloadOrchestrator::with_events(fetcher, event_tx.clone());

        tracing::debug!(
            target_resolution = %settings.target,
            output_dir = %settings.output_dir.display(),
            workers = settings.workers,
            sites = ?config.sites,
            dry_run = config.dry_run,
            "Coordinator ready"
        );

        Ok(Self {
            config,
            settings,
            registry,
            orchestrator,
            event_tx,
        })
    }

    /// Subscribe to discovery and download events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Validated run settings
    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Configuration this coordinator was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Discover candidates for `themes` and select what to download
    ///
    /// All (theme, site) discoveries run concurrently; results are merged
    /// theme by theme in site order, so the plan does not depend on which
    /// adapter answers first. A failing adapter is reported and skipped.
    pub async fn plan(&self, themes: &[String]) -> Result<AcquisitionPlan> {
        if themes.is_empty() {
            return Err(Error::config("themes", "at least one theme is required"));
        }
        let adapters = self.registry.select(&self.config.sites)?;

        let discoveries = themes.iter().flat_map(|theme| {
            adapters.iter().map(move |adapter| async move {
                (theme, adapter.id(), adapter.discover(theme).await)
            })
        });

        let mut set = CandidateSet::new();
        for (theme, site, result) in join_all(discoveries).await {
            match result {
                Ok(candidates) => {
                    tracing::info!(site, theme = %theme, candidates = candidates.len(), "Discovered candidates");
                    self.emit(Event::SiteDiscovered {
                        site: site.to_string(),
                        theme: theme.clone(),
                        candidates: candidates.len(),
                    });
                    set.add(candidates);
                }
                Err(e) => {
                    tracing::warn!(site, theme = %theme, error = %e, "Site discovery failed");
                    self.emit(Event::SiteFailed {
                        site: site.to_string(),
                        theme: theme.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let cap = self
            .config
            .max_items_per_theme
            .map(|per_theme| per_theme.saturating_mul(themes.len()));
        Ok(self.select(set, cap))
    }

    /// Download pre-discovered candidate lists
    ///
    /// Each batch is one adapter's output; batches are merged in the order
    /// given. No per-theme cap applies here.
    pub async fn acquire(
        &self,
        batches: impl IntoIterator<Item = Vec<Candidate>>,
    ) -> Result<AcquisitionSummary> {
        let mut set = CandidateSet::new();
        for batch in batches {
            set.add(batch);
        }
        let plan = self.select(set, None);
        self.execute(plan).await
    }

    /// Plan for `themes`, then download unless this is a dry run
    pub async fn run(&self, themes: &[String]) -> Result<AcquisitionSummary> {
        let plan = self.plan(themes).await?;

        if self.config.dry_run {
            tracing::info!(
                selected = plan.candidates.len(),
                output_dir = %self.settings.output_dir.display(),
                "Dry run, nothing will be downloaded"
            );
            for candidate in &plan.candidates {
                tracing::info!(url = %candidate.url, "Would download");
            }
            let now = Utc::now();
            let mut summary = AcquisitionSummary::from_outcomes(Vec::new(), 0, now);
            summary.dry_run = true;
            apply_plan_counts(&mut summary, &plan);
            return Ok(summary);
        }

        self.execute(plan).await
    }

    async fn execute(&self, plan: AcquisitionPlan) -> Result<AcquisitionSummary> {
        let mut summary = self
            .orchestrator
            .run(
                &plan.candidates,
                Some(self.settings.target),
                &self.settings.output_dir,
                self.settings.workers,
            )
            .await?;
        apply_plan_counts(&mut summary, &plan);
        Ok(summary)
    }

    /// Dedup, hint-based pre-selection and the optional total cap
    fn select(&self, set: CandidateSet, cap: Option<usize>) -> AcquisitionPlan {
        let target = self.settings.target;
        let total_candidates = set.received();
        let duplicates_removed = set.duplicates_removed();
        let unique = set.len();

        let mut candidates = preselect(set.into_unique(), &target);
        if let Some(cap) = cap
            && candidates.len() > cap
        {
            tracing::debug!(cap, available = candidates.len(), "Applying per-theme cap");
            candidates.truncate(cap);
        }

        let filtered = unique - candidates.len();
        tracing::info!(
            total = total_candidates,
            duplicates_removed,
            filtered,
            selected = candidates.len(),
            target_resolution = %target,
            "Candidates planned"
        );
        self.emit(Event::Planned {
            total: total_candidates,
            selected: candidates.len(),
        });

        AcquisitionPlan {
            target,
            total_candidates,
            duplicates_removed,
            filtered,
            candidates,
        }
    }

    fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}

fn apply_plan_counts(summary: &mut AcquisitionSummary, plan: &AcquisitionPlan) {
    summary.total_candidates = plan.total_candidates;
    summary.duplicates_removed = plan.duplicates_removed;
    summary.filtered = plan.filtered;
    summary.unique = plan.candidates.len();
}
