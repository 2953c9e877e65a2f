//! Candidate URLs and order-preserving deduplication
//!
//! Site adapters produce [`Candidate`]s; a [`CandidateSet`] merges the lists
//! from every adapter, dropping exact-URL duplicates while keeping global
//! first-seen order. [`preselect`] then uses declared size hints to discard
//! candidates before anything is fetched.

use crate::resolution::{MatchCode, Resolution, select_best};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A discovered URL believed to point at a downloadable image
///
/// Identity is the exact URL string (case-sensitive, no normalization).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Resolvable image URL
    pub url: String,

    /// Dimensions declared by the source, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_hint: Option<Resolution>,

    /// Groups size variants of the same wallpaper listing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing: Option<String>,

    /// Source identifier of the adapter that produced this candidate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Candidate {
    /// Candidate with no size hint or listing
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            size_hint: None,
            listing: None,
            source: None,
        }
    }

    /// Attach the dimensions the source declared for this image
    pub fn with_size_hint(mut self, hint: Resolution) -> Self {
        self.size_hint = Some(hint);
        self
    }

    /// Mark this candidate as one size variant of `listing`
    pub fn with_listing(mut self, listing: impl Into<String>) -> Self {
        self.listing = Some(listing.into());
        self
    }

    /// Record which adapter produced this candidate
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Score the size hint against `target` (None without a hint)
    pub fn hinted_match(&self, target: &Resolution) -> Option<MatchCode> {
        self.size_hint
            .map(|hint| target.evaluate(hint.width(), hint.height()))
    }
}

/// Order-preserving, exact-URL deduplicating collection of candidates
#[derive(Debug, Default)]
pub struct CandidateSet {
    seen: HashSet<String>,
    items: Vec<Candidate>,
    received: usize,
}

impl CandidateSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a batch of candidates; later duplicates are dropped silently
    pub fn add(&mut self, candidates: impl IntoIterator<Item = Candidate>) {
        for candidate in candidates {
            self.received += 1;
            if self.seen.insert(candidate.url.clone()) {
                self.items.push(candidate);
            }
        }
    }

    /// Unique candidates in global first-seen order
    pub fn unique(&self) -> &[Candidate] {
        &self.items
    }

    /// Consume the set, returning unique candidates in first-seen order
    pub fn into_unique(self) -> Vec<Candidate> {
        self.items
    }

    /// Total candidates passed to [`add`](Self::add), duplicates included
    pub fn received(&self) -> usize {
        self.received
    }

    /// Number of duplicates dropped so far
    pub fn duplicates_removed(&self) -> usize {
        self.received - self.items.len()
    }

    /// Number of unique candidates
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no candidate has been added
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Drop candidates whose declared size cannot satisfy `target`
///
/// - A candidate without a listing is kept unless its hint is Unacceptable.
/// - Candidates sharing a listing are reduced to the variant chosen by
///   [`select_best`]; it takes the position of the listing's first member.
///   When no hinted variant qualifies, the listing's unhinted variants are
///   kept instead (they are verified after download).
/// - Candidates without any hint always pass.
pub fn preselect(candidates: Vec<Candidate>, target: &Resolution) -> Vec<Candidate> {
    let mut groups: HashMap<String, Vec<Candidate>> = HashMap::new();
    let mut order: Vec<Result<Candidate, String>> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        match candidate.listing.clone() {
            Some(listing) => {
                let members = groups.entry(listing.clone()).or_default();
                if members.is_empty() {
                    order.push(Err(listing));
                }
                members.push(candidate);
            }
            None => order.push(Ok(candidate)),
        }
    }

    let mut kept = Vec::with_capacity(order.len());
    for slot in order {
        match slot {
            Ok(candidate) => match candidate.hinted_match(target) {
                Some(MatchCode::Unacceptable) => {
                    tracing::debug!(
                        url = %candidate.url,
                        target = %target,
                        "Dropping candidate with insufficient declared size"
                    );
                }
                _ => kept.push(candidate),
            },
            Err(listing) => {
                let members = groups.remove(&listing).unwrap_or_default();
                kept.extend(select_listing_variant(&listing, members, target));
            }
        }
    }
    kept
}

fn select_listing_variant(
    listing: &str,
    members: Vec<Candidate>,
    target: &Resolution,
) -> Vec<Candidate> {
    let chosen = select_best(&members, target, |c| {
        c.size_hint.map(|hint| (hint.width(), hint.height()))
    })
    .map(|(candidate, code)| (candidate.clone(), code));

    if let Some((candidate, code)) = chosen {
        tracing::debug!(
            listing,
            url = %candidate.url,
            match_code = %code,
            variants = members.len(),
            "Selected listing variant"
        );
        return vec![candidate];
    }

    let unhinted: Vec<Candidate> = members
        .into_iter()
        .filter(|c| c.size_hint.is_none())
        .collect();
    if unhinted.is_empty() {
        tracing::debug!(listing, target = %target, "No listing variant satisfies target");
    }
    unhinted
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn res(w: u32, h: u32) -> Resolution {
        Resolution::new(w, h).unwrap()
    }

    fn urls(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.url.as_str()).collect()
    }

    #[test]
    fn unique_preserves_first_seen_order() {
        let mut set = CandidateSet::new();
        set.add(["A", "B", "A", "C", "B"].map(Candidate::new));

        assert_eq!(urls(set.unique()), ["A", "B", "C"]);
        assert_eq!(set.received(), 5);
        assert_eq!(set.duplicates_removed(), 2);
    }

    #[test]
    fn order_spans_multiple_adds() {
        let mut set = CandidateSet::new();
        set.add(["x/2", "x/1"].map(Candidate::new));
        set.add(["x/3", "x/2"].map(Candidate::new));
        set.add(Vec::new());
        set.add(["x/1", "x/4"].map(Candidate::new));

        assert_eq!(urls(set.unique()), ["x/2", "x/1", "x/3", "x/4"]);
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn dedup_is_case_sensitive_and_unnormalized() {
        let mut set = CandidateSet::new();
        set.add(
            [
                "http://a/Img.jpg",
                "http://a/img.jpg",
                "http://a/img.jpg?",
                "http://a/img.jpg",
            ]
            .map(Candidate::new),
        );
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn first_occurrence_keeps_its_metadata() {
        let mut set = CandidateSet::new();
        set.add([Candidate::new("u").with_source("first")]);
        set.add([Candidate::new("u").with_source("second")]);
        assert_eq!(set.unique()[0].source.as_deref(), Some("first"));
    }

    #[test]
    fn empty_set() {
        let set = CandidateSet::new();
        assert!(set.is_empty());
        assert_eq!(set.duplicates_removed(), 0);
    }

    #[test]
    fn preselect_drops_undersized_hints_only() {
        let target = res(1920, 1080);
        let kept = preselect(
            vec![
                Candidate::new("small").with_size_hint(res(1280, 720)),
                Candidate::new("unknown"),
                Candidate::new("big").with_size_hint(res(3840, 2160)),
            ],
            &target,
        );
        assert_eq!(urls(&kept), ["unknown", "big"]);
    }

    #[test]
    fn preselect_picks_exact_variant_of_listing() {
        let target = res(800, 600);
        let kept = preselect(
            vec![
                Candidate::new("a-1600").with_size_hint(res(1600, 1200)).with_listing("a"),
                Candidate::new("other"),
                Candidate::new("a-800").with_size_hint(res(800, 600)).with_listing("a"),
            ],
            &target,
        );
        assert_eq!(urls(&kept), ["a-800", "other"]);
    }

    #[test]
    fn preselect_picks_smallest_larger_variant() {
        let target = res(1920, 1080);
        let kept = preselect(
            vec![
                Candidate::new("4k").with_size_hint(res(3840, 2160)).with_listing("w"),
                Candidate::new("1440p").with_size_hint(res(2560, 1440)).with_listing("w"),
                Candidate::new("720p").with_size_hint(res(1280, 720)).with_listing("w"),
            ],
            &target,
        );
        assert_eq!(urls(&kept), ["1440p"]);
    }

    #[test]
    fn preselect_falls_back_to_unhinted_variants() {
        let target = res(5120, 1440);
        let kept = preselect(
            vec![
                Candidate::new("small").with_size_hint(res(1920, 1080)).with_listing("w"),
                Candidate::new("original").with_listing("w"),
            ],
            &target,
        );
        assert_eq!(urls(&kept), ["original"]);

        let kept = preselect(
            vec![Candidate::new("small").with_size_hint(res(1920, 1080)).with_listing("w")],
            &target,
        );
        assert!(kept.is_empty());
    }
}
