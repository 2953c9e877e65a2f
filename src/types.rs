//! Core types for wallpaper-dl: per-candidate outcomes, run summaries and events

use crate::candidates::Candidate;
use crate::error::FailureKind;
use crate::resolution::{MatchCode, Resolution};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What happened to one candidate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// A satisfactory file was already on disk; nothing was fetched
    Skipped,
    /// Fetched, verified and written in this run
    Downloaded,
    /// Fetch, verification or write failed; nothing was left on disk
    Failed,
}

/// Result of processing a single candidate
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadOutcome {
    /// Candidate URL
    pub url: String,
    /// Skipped, downloaded or failed
    pub status: OutcomeStatus,
    /// Final file path (set for skipped and downloaded candidates)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Match against the target (None when no verification was requested)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_code: Option<MatchCode>,
    /// Failure reason (set for failed candidates)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureKind>,
}

impl DownloadOutcome {
    pub(crate) fn skipped(url: &str, path: PathBuf, match_code: Option<MatchCode>) -> Self {
        Self {
            url: url.to_string(),
            status: OutcomeStatus::Skipped,
            path: Some(path),
            match_code,
            error: None,
        }
    }

    pub(crate) fn downloaded(url: &str, path: PathBuf, match_code: Option<MatchCode>) -> Self {
        Self {
            url: url.to_string(),
            status: OutcomeStatus::Downloaded,
            path: Some(path),
            match_code,
            error: None,
        }
    }

    pub(crate) fn failed(url: &str, error: FailureKind) -> Self {
        Self {
            url: url.to_string(),
            status: OutcomeStatus::Failed,
            path: None,
            match_code: None,
            error: Some(error),
        }
    }

    /// Whether the target is satisfied on disk after this run
    pub fn is_accepted(&self) -> bool {
        self.status != OutcomeStatus::Failed
    }
}

/// Aggregate result of an acquisition run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AcquisitionSummary {
    /// Candidates received from all adapters, duplicates included
    pub total_candidates: usize,
    /// Exact-URL duplicates dropped by the candidate set
    pub duplicates_removed: usize,
    /// Candidates dropped before any fetch (size hint, listing selection, per-theme cap)
    pub filtered: usize,
    /// Unique candidates handed to the download stage
    pub unique: usize,
    /// Candidates handed to the worker pool (fetched at least once)
    pub dispatched: usize,
    /// Already satisfied on disk
    pub skipped: usize,
    /// Newly downloaded and verified
    pub downloaded: usize,
    /// Failed candidates
    pub failed: usize,
    /// Whether this was a planning-only run
    pub dry_run: bool,
    /// Per-candidate outcomes in submission order
    pub outcomes: Vec<DownloadOutcome>,
    /// When the download stage started
    pub started_at: DateTime<Utc>,
    /// When the download stage finished
    pub finished_at: DateTime<Utc>,
}

impl AcquisitionSummary {
    /// Build a summary from outcomes; candidate-set counters start at zero
    ///
    /// `dispatched` is the number of candidates that reached the worker pool;
    /// failures settled before dispatch (invalid or colliding filenames) are
    /// not part of it.
    pub(crate) fn from_outcomes(
        outcomes: Vec<DownloadOutcome>,
        dispatched: usize,
        started_at: DateTime<Utc>,
    ) -> Self {
        let count = |status| outcomes.iter().filter(|o| o.status == status).count();
        Self {
            total_candidates: outcomes.len(),
            duplicates_removed: 0,
            filtered: 0,
            unique: outcomes.len(),
            dispatched,
            skipped: count(OutcomeStatus::Skipped),
            downloaded: count(OutcomeStatus::Downloaded),
            failed: count(OutcomeStatus::Failed),
            dry_run: false,
            outcomes,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Candidates that were actually fetched
    pub fn attempted(&self) -> usize {
        self.dispatched
    }

    /// Percentage of attempted candidates that succeeded (100 when nothing was attempted)
    pub fn success_rate(&self) -> f64 {
        if self.attempted() == 0 {
            return 100.0;
        }
        self.downloaded as f64 / self.attempted() as f64 * 100.0
    }

    /// Percentage of unique candidates satisfied on disk after the run
    pub fn overall_rate(&self) -> f64 {
        if self.unique == 0 {
            return 0.0;
        }
        (self.downloaded + self.skipped) as f64 / self.unique as f64 * 100.0
    }

    /// Find the outcome recorded for `url`
    pub fn outcome(&self, url: &str) -> Option<&DownloadOutcome> {
        self.outcomes.iter().find(|o| o.url == url)
    }
}

/// Candidates selected for download, before anything is fetched
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AcquisitionPlan {
    /// Parsed target resolution
    pub target: Resolution,
    /// Candidates received from all adapters, duplicates included
    pub total_candidates: usize,
    /// Exact-URL duplicates dropped
    pub duplicates_removed: usize,
    /// Candidates dropped by size hints, listing selection or the per-theme cap
    pub filtered: usize,
    /// Candidates to hand to the download stage, in first-seen order
    pub candidates: Vec<Candidate>,
}

/// Event emitted during an acquisition run
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A site adapter returned candidates for a theme
    SiteDiscovered {
        /// Source identifier
        site: String,
        /// Theme searched
        theme: String,
        /// Number of candidates returned
        candidates: usize,
    },

    /// A site adapter failed for a theme
    SiteFailed {
        /// Source identifier
        site: String,
        /// Theme searched
        theme: String,
        /// Error message
        error: String,
    },

    /// Candidate lists were merged and filtered
    Planned {
        /// Candidates received, duplicates included
        total: usize,
        /// Candidates selected for download
        selected: usize,
    },

    /// A satisfactory file already exists
    Skipped {
        /// Candidate URL
        url: String,
        /// Existing file
        path: PathBuf,
    },

    /// A worker picked up a candidate
    Started {
        /// Candidate URL
        url: String,
    },

    /// A candidate was downloaded and verified
    Completed {
        /// Candidate URL
        url: String,
        /// Written file
        path: PathBuf,
        /// Verified match (None when verification was not requested)
        #[serde(skip_serializing_if = "Option::is_none")]
        match_code: Option<MatchCode>,
    },

    /// A candidate failed
    Failed {
        /// Candidate URL
        url: String,
        /// Failure reason
        error: String,
    },

    /// The download stage finished
    Finished {
        /// Newly downloaded
        downloaded: usize,
        /// Already satisfied
        skipped: usize,
        /// Failed
        failed: usize,
    },
}
