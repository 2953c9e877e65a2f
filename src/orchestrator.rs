//! Concurrent download orchestration
//!
//! [`DownloadOrchestrator::run`] brackets a bounded, parallel download phase
//! between two single-threaded phases:
//!
//! 1. **Pre-filter** (sequential): derive each candidate's filename, claim it,
//!    and skip candidates whose file already satisfies the target.
//! 2. **Dispatch** (parallel, `workers` at a time): fetch, write to a hidden
//!    `.part` file, verify, then rename over the final name. Rejected or
//!    failed content is removed, so only verified files ever appear under
//!    their final name.
//! 3. **Aggregate** (sequential): outcomes are placed back in submission
//!    order and counted into an [`AcquisitionSummary`].
//!
//! Per-candidate failures are recorded as outcomes; only configuration and
//! output-directory errors abort a run.

use crate::candidates::Candidate;
use crate::error::{Error, FailureKind, Result};
use crate::fetch::Fetcher;
use crate::resolution::{MatchCode, Resolution};
use crate::types::{AcquisitionSummary, DownloadOutcome, Event};
use crate::utils::{filename_for_url, partial_filename};
use crate::verify::verify_image_blocking;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Buffer size of the progress event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// A candidate that survived the pre-filter and needs fetching
struct DownloadJob {
    index: usize,
    url: String,
    final_path: PathBuf,
    part_path: PathBuf,
}

/// Drives fetch → verify → persist for a batch of candidates
#[derive(Clone)]
pub struct DownloadOrchestrator {
    fetcher: Arc<dyn Fetcher>,
    event_tx: broadcast::Sender<Event>,
}

impl DownloadOrchestrator {
    /// Orchestrator with its own event channel
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self::with_events(fetcher, event_tx)
    }

    /// Orchestrator publishing to an existing event channel
    pub fn with_events(fetcher: Arc<dyn Fetcher>, event_tx: broadcast::Sender<Event>) -> Self {
        Self { fetcher, event_tx }
    }

    /// Subscribe to progress events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Download `candidates` into `output_dir` with at most `workers` in flight
    ///
    /// With `target = None` no verification is done: existing files are
    /// skipped as-is and any 200 body is accepted.
    pub async fn run(
        &self,
        candidates: &[Candidate],
        target: Option<Resolution>,
        output_dir: &Path,
        workers: usize,
    ) -> Result<AcquisitionSummary> {
        if workers == 0 {
            return Err(Error::config("workers", "worker count must be at least 1"));
        }
        if output_dir.as_os_str().is_empty() {
            return Err(Error::config(
                "output_dir",
                "output directory path must not be empty",
            ));
        }
        tokio::fs::create_dir_all(output_dir).await?;

        let started_at = Utc::now();
        let (mut slots, jobs) = self.prefilter(candidates, target, output_dir).await;

        let dispatched = jobs.len();
        tracing::info!(
            candidates = candidates.len(),
            settled = slots.iter().flatten().count(),
            to_download = dispatched,
            workers,
            output_dir = %output_dir.display(),
            "Starting downloads"
        );

        for (index, outcome) in self.dispatch(jobs, target, workers).await {
            slots[index] = Some(outcome);
        }

        let outcomes: Vec<DownloadOutcome> = slots.into_iter().flatten().collect();
        let summary = AcquisitionSummary::from_outcomes(outcomes, dispatched, started_at);

        self.event_tx
            .send(Event::Finished {
                downloaded: summary.downloaded,
                skipped: summary.skipped,
                failed: summary.failed,
            })
            .ok();

        tracing::info!(
            downloaded = summary.downloaded,
            attempted = summary.attempted(),
            skipped = summary.skipped,
            failed = summary.failed,
            success_rate = format!("{:.1}%", summary.success_rate()),
            overall_rate = format!("{:.1}%", summary.overall_rate()),
            output_dir = %output_dir.display(),
            "Downloads finished"
        );

        Ok(summary)
    }

    /// Sequentially resolve filenames and skip already-satisfied candidates
    ///
    /// Returns one slot per candidate (filled for candidates settled here) and
    /// the jobs left for the worker pool.
    async fn prefilter(
        &self,
        candidates: &[Candidate],
        target: Option<Resolution>,
        output_dir: &Path,
    ) -> (Vec<Option<DownloadOutcome>>, Vec<DownloadJob>) {
        let mut slots = Vec::with_capacity(candidates.len());
        let mut jobs = Vec::new();
        let mut claimed: HashMap<String, &str> = HashMap::new();

        for (index, candidate) in candidates.iter().enumerate() {
            let url = candidate.url.as_str();

            let Some(filename) = filename_for_url(url) else {
                tracing::warn!(url, "Cannot derive a filename from URL");
                slots.push(Some(self.fail(url, FailureKind::InvalidFilename)));
                continue;
            };

            if let Some(owner) = claimed.get(&filename) {
                tracing::warn!(url, owner, filename, "Filename already claimed in this run");
                let kind = FailureKind::FilenameCollision {
                    owner: owner.to_string(),
                };
                slots.push(Some(self.fail(url, kind)));
                continue;
            }
            claimed.insert(filename.clone(), url);

            let final_path = output_dir.join(&filename);
            if let Some(outcome) = self.check_existing(url, &final_path, target).await {
                slots.push(Some(outcome));
                continue;
            }

            slots.push(None);
            jobs.push(DownloadJob {
                index,
                url: url.to_string(),
                part_path: output_dir.join(partial_filename(&filename, index)),
                final_path,
            });
        }

        (slots, jobs)
    }

    /// Skip outcome when `path` already satisfies the target
    async fn check_existing(
        &self,
        url: &str,
        path: &Path,
        target: Option<Resolution>,
    ) -> Option<DownloadOutcome> {
        let is_file = tokio::fs::metadata(path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        if !is_file {
            return None;
        }

        let match_code = match target {
            None => {
                tracing::debug!(path = %path.display(), "File exists (resolution not checked), skipping");
                None
            }
            Some(target) => match verify_image_blocking(path.to_path_buf(), target).await {
                Ok(code) => {
                    tracing::debug!(
                        path = %path.display(),
                        match_code = %code,
                        target = %target,
                        "File already satisfies target, skipping"
                    );
                    Some(code)
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Existing file does not satisfy target, will re-download"
                    );
                    return None;
                }
            },
        };

        self.event_tx
            .send(Event::Skipped {
                url: url.to_string(),
                path: path.to_path_buf(),
            })
            .ok();
        Some(DownloadOutcome::skipped(url, path.to_path_buf(), match_code))
    }

    /// Run jobs on a bounded pool of spawned workers
    async fn dispatch(
        &self,
        jobs: Vec<DownloadJob>,
        target: Option<Resolution>,
        workers: usize,
    ) -> Vec<(usize, DownloadOutcome)> {
        stream::iter(jobs)
            .map(|job| {
                let fetcher = Arc::clone(&self.fetcher);
                let event_tx = self.event_tx.clone();
                let index = job.index;
                let url = job.url.clone();
                async move {
                    let handle =
                        tokio::spawn(download_one(fetcher, job, target, event_tx.clone()));
                    let outcome = match handle.await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            tracing::error!(url = %url, error = %e, "Download worker failed");
                            let kind = FailureKind::Worker {
                                message: e.to_string(),
                            };
                            event_tx
                                .send(Event::Failed {
                                    url: url.clone(),
                                    error: kind.to_string(),
                                })
                                .ok();
                            DownloadOutcome::failed(&url, kind)
                        }
                    };
                    (index, outcome)
                }
            })
            .buffer_unordered(workers)
            .collect()
            .await
    }

    fn fail(&self, url: &str, kind: FailureKind) -> DownloadOutcome {
        self.event_tx
            .send(Event::Failed {
                url: url.to_string(),
                error: kind.to_string(),
            })
            .ok();
        DownloadOutcome::failed(url, kind)
    }
}

/// Fetch, persist and verify one candidate
async fn download_one(
    fetcher: Arc<dyn Fetcher>,
    job: DownloadJob,
    target: Option<Resolution>,
    event_tx: broadcast::Sender<Event>,
) -> DownloadOutcome {
    event_tx.send(Event::Started { url: job.url.clone() }).ok();

    match fetch_and_store(fetcher.as_ref(), &job, target).await {
        Ok(match_code) => {
            tracing::debug!(
                url = %job.url,
                path = %job.final_path.display(),
                match_code = ?match_code,
                "Downloaded"
            );
            event_tx
                .send(Event::Completed {
                    url: job.url.clone(),
                    path: job.final_path.clone(),
                    match_code,
                })
                .ok();
            DownloadOutcome::downloaded(&job.url, job.final_path.clone(), match_code)
        }
        Err(kind) => {
            tracing::warn!(url = %job.url, error = %kind, "Download failed");
            event_tx
                .send(Event::Failed {
                    url: job.url.clone(),
                    error: kind.to_string(),
                })
                .ok();
            DownloadOutcome::failed(&job.url, kind)
        }
    }
}

async fn fetch_and_store(
    fetcher: &dyn Fetcher,
    job: &DownloadJob,
    target: Option<Resolution>,
) -> std::result::Result<Option<MatchCode>, FailureKind> {
    let response = fetcher.fetch(&job.url).await?;

    if let Err(e) = tokio::fs::write(&job.part_path, &response.body).await {
        discard(&job.part_path).await;
        return Err(e.into());
    }

    let match_code = match target {
        Some(target) => match verify_image_blocking(job.part_path.clone(), target).await {
            Ok(code) => Some(code),
            Err(e) => {
                discard(&job.part_path).await;
                return Err(e.into());
            }
        },
        None => None,
    };

    if let Err(e) = tokio::fs::rename(&job.part_path, &job.final_path).await {
        discard(&job.part_path).await;
        return Err(e.into());
    }

    Ok(match_code)
}

/// Remove a partial or rejected file; a missing file is fine
async fn discard(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed rejected file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::error!(path = %path.display(), error = %e, "Failed to remove file"),
    }
}
