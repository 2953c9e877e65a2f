//! Resolution targets and match scoring
//!
//! [`evaluate`] scores an image's dimensions against a target and
//! [`select_best`] picks one candidate out of several size variants.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Guard for ratios computed against a zero dimension
const EPSILON: f64 = 0.0001;

/// Per-dimension tolerance for an exact match (±5%)
const EXACT_TOLERANCE: f64 = 0.05;

/// Aspect ratio tolerance for a "similar aspect" match (±10%)
const ASPECT_TOLERANCE: f64 = 0.10;

/// Below this size results are usually sparse on wallpaper sites
const SMALL_WIDTH: u32 = 800;
const SMALL_HEIGHT: u32 = 600;

/// Target resolution requested by the caller
///
/// Both dimensions are always greater than zero. Parsed from `"WIDTHxHEIGHT"`:
///
/// ```
/// use wallpaper_dl::resolution::Resolution;
///
/// let target: Resolution = "5120x1440".parse().unwrap();
/// assert_eq!((target.width(), target.height()), (5120, 1440));
/// assert!("0x1080".parse::<Resolution>().is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Resolution {
    width: u32,
    height: u32,
}

impl Resolution {
    /// Create a resolution, rejecting zero dimensions
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::config(
                "resolution",
                format!("resolution dimensions must be positive: {}x{}", width, height),
            ));
        }
        Ok(Self { width, height })
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether this target is small enough that few sources will match it
    pub fn is_small(&self) -> bool {
        self.width < SMALL_WIDTH || self.height < SMALL_HEIGHT
    }

    /// Score `width`x`height` against this target
    pub fn evaluate(&self, width: u32, height: u32) -> MatchCode {
        evaluate(width, height, self.width, self.height)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let malformed = || {
            Error::config(
                "resolution",
                format!(
                    "invalid resolution format '{}', expected 'WIDTHxHEIGHT' (e.g. '1920x1080')",
                    s
                ),
            )
        };

        let normalized = s.trim().to_ascii_lowercase();
        let (w, h) = normalized.split_once('x').ok_or_else(malformed)?;
        let width: i64 = w.trim().parse().map_err(|_| malformed())?;
        let height: i64 = h.trim().parse().map_err(|_| malformed())?;

        if width <= 0 || height <= 0 {
            return Err(Error::config(
                "resolution",
                format!("resolution dimensions must be positive: {}", s),
            ));
        }

        let width = u32::try_from(width).map_err(|_| malformed())?;
        let height = u32::try_from(height).map_err(|_| malformed())?;
        Self::new(width, height)
    }
}

impl TryFrom<String> for Resolution {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Resolution> for String {
    fn from(r: Resolution) -> Self {
        r.to_string()
    }
}

/// Ordinal quality of a resolution match; higher is preferred
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum MatchCode {
    /// Smaller than the target in at least one dimension
    Unacceptable = 0,
    /// At least the target size, aspect ratio differs by more than 10%
    LargerAnyAspect = 1,
    /// At least the target size, aspect ratio within 10%
    LargerSimilarAspect = 2,
    /// Both dimensions within 5% of the target
    Exact = 3,
}

impl MatchCode {
    /// Numeric code (0-3)
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether the match is good enough to keep
    pub fn is_acceptable(self) -> bool {
        self > MatchCode::Unacceptable
    }

    /// Short description used in log messages
    pub fn describe(self) -> &'static str {
        match self {
            MatchCode::Exact => "exact match",
            MatchCode::LargerSimilarAspect => "similar aspect ratio",
            MatchCode::LargerAnyAspect => "larger resolution",
            MatchCode::Unacceptable => "insufficient resolution",
        }
    }
}

impl fmt::Display for MatchCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

fn within(ratio: f64, tolerance: f64) -> bool {
    (1.0 - tolerance..=1.0 + tolerance).contains(&ratio)
}

/// Score actual dimensions against target dimensions
///
/// Exact wins over everything: an image up to 5% smaller in either dimension
/// still counts as exact. Otherwise the image must be at least as large as
/// the target in both dimensions to be acceptable at all.
pub fn evaluate(width: u32, height: u32, target_width: u32, target_height: u32) -> MatchCode {
    let (w, h) = (f64::from(width), f64::from(height));
    let (tw, th) = (f64::from(target_width), f64::from(target_height));

    let width_match = within(w / tw.max(EPSILON), EXACT_TOLERANCE);
    let height_match = within(h / th.max(EPSILON), EXACT_TOLERANCE);
    if width_match && height_match {
        return MatchCode::Exact;
    }

    if width < target_width || height < target_height {
        return MatchCode::Unacceptable;
    }

    let target_ratio = tw / th.max(EPSILON);
    let actual_ratio = w / h.max(EPSILON);
    if within(actual_ratio / target_ratio.max(EPSILON), ASPECT_TOLERANCE) {
        MatchCode::LargerSimilarAspect
    } else {
        MatchCode::LargerAnyAspect
    }
}

/// Pick one item out of several size variants
///
/// Items for which `dimensions` returns `None` are not considered. The first
/// [`MatchCode::Exact`] item wins; otherwise the acceptable item with the
/// smallest area wins (earliest on ties). Returns `None` when nothing
/// qualifies.
pub fn select_best<'a, T>(
    items: &'a [T],
    target: &Resolution,
    dimensions: impl Fn(&T) -> Option<(u32, u32)>,
) -> Option<(&'a T, MatchCode)> {
    let mut best: Option<(&'a T, MatchCode, u64)> = None;

    for item in items {
        let Some((width, height)) = dimensions(item) else {
            continue;
        };
        let code = target.evaluate(width, height);
        match code {
            MatchCode::Exact => return Some((item, code)),
            MatchCode::Unacceptable => {}
            _ => {
                let area = u64::from(width) * u64::from(height);
                if best.is_none_or(|(_, _, best_area)| area < best_area) {
                    best = Some((item, code, area));
                }
            }
        }
    }

    best.map(|(item, code, _)| (item, code))
}
