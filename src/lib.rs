//! # wallpaper-dl
//!
//! Resolution-aware wallpaper acquisition library.
//!
//! Given a target resolution and a set of themes, wallpaper-dl asks pluggable
//! site adapters for candidate image URLs, merges and deduplicates them, drops
//! candidates whose declared size cannot satisfy the target, and downloads
//! the rest with a bounded worker pool. Every downloaded file is decoded and
//! checked against the target before it is kept.
//!
//! ## Design Philosophy
//!
//! - **Library-first** - No CLI; embed it and bring your own adapters
//! - **Idempotent** - Files already satisfying the target are never refetched
//! - **Nothing half-written** - Rejected or failed downloads leave no file behind
//! - **Event-driven** - Consumers subscribe to progress events
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use wallpaper_dl::{AdapterRegistry, Candidate, Config, Coordinator, StaticAdapter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = StaticAdapter::new("curated").with_theme(
//!         "mountains",
//!         [Candidate::new("https://images.example.com/alps-5120x1440.jpg")],
//!     );
//!     let registry = AdapterRegistry::new().with(Arc::new(adapter));
//!
//!     let config = Config {
//!         sites: vec!["curated".to_string()],
//!         ..Default::default()
//!     };
//!     let coordinator = Coordinator::new(config, registry)?;
//!
//!     let mut events = coordinator.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let summary = coordinator.run(&["mountains".to_string()]).await?;
//!     println!(
//!         "{} downloaded, {} skipped, {} failed ({:.1}% success)",
//!         summary.downloaded,
//!         summary.skipped,
//!         summary.failed,
//!         summary.success_rate()
//!     );
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Candidate URLs, deduplication and hint-based pre-selection
pub mod candidates;
/// Configuration types
pub mod config;
/// Top-level acquisition driver
pub mod coordinator;
/// Error types
pub mod error;
/// HTTP fetching with retry and backoff
pub mod fetch;
/// Concurrent download, verification and persistence
pub mod orchestrator;
/// Target resolutions and match scoring
pub mod resolution;
/// Site adapter trait and registry
pub mod site;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;
/// Image dimension probing
pub mod verify;

// Re-export commonly used types
pub use candidates::{Candidate, CandidateSet};
pub use config::{Config, FetchConfig, RunSettings};
pub use coordinator::Coordinator;
pub use error::{Error, FailureKind, FetchError, Result, VerificationError};
pub use fetch::{FetchClient, FetchedResponse, Fetcher};
pub use orchestrator::DownloadOrchestrator;
pub use resolution::{MatchCode, Resolution};
pub use site::{AdapterRegistry, SiteAdapter, StaticAdapter};
pub use types::{AcquisitionPlan, AcquisitionSummary, DownloadOutcome, Event, OutcomeStatus};
