//! Utility functions for deriving on-disk filenames from candidate URLs

/// Longest filename most filesystems accept
const MAX_FILENAME_LEN: usize = 255;

/// Characters replaced with `_` in derived filenames
///
/// `?` and `&` keep query strings from colliding with path syntax; the rest
/// are invalid on at least one common filesystem.
const UNSAFE_CHARS: &[char] = &['?', '&', '<', '>', ':', '"', '\\', '|', '*'];

/// Derive a deterministic filename from a URL
///
/// Takes everything after the last `/` (query string included) and replaces
/// unsafe characters with `_`. Control characters are removed and the result
/// is truncated to 255 bytes, keeping the extension when there is one.
///
/// Returns `None` when nothing usable remains (e.g. the URL ends with `/`).
///
/// # Examples
///
/// ```
/// use wallpaper_dl::utils::filename_for_url;
///
/// assert_eq!(
///     filename_for_url("https://example.com/img/sunset.jpg?w=5120&h=1440").as_deref(),
///     Some("sunset.jpg_w=5120_h=1440")
/// );
/// assert_eq!(filename_for_url("https://example.com/gallery/"), None);
/// ```
pub fn filename_for_url(url: &str) -> Option<String> {
    let basename = url.rsplit('/').next().unwrap_or(url);
    let sanitized = safe_filename(basename);

    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        return None;
    }
    Some(sanitized)
}

/// Replace unsafe characters, strip control characters and bound the length
pub fn safe_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if UNSAFE_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.len() <= MAX_FILENAME_LEN {
        return cleaned.to_string();
    }

    let (stem, ext) = match cleaned.rfind('.') {
        Some(idx) if idx > 0 && cleaned.len() - idx <= 16 => cleaned.split_at(idx),
        _ => (cleaned, ""),
    };
    let budget = MAX_FILENAME_LEN - ext.len();
    let mut end = budget.min(stem.len());
    while !stem.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &stem[..end], ext)
}

/// Hidden temporary name for `filename` while its download is in flight
///
/// `index` keeps names distinct even when long filenames share a truncated
/// prefix; the filename is shortened so the whole name stays within 255 bytes.
pub fn partial_filename(filename: &str, index: usize) -> String {
    let suffix = format!(".{}.part", index);
    let budget = MAX_FILENAME_LEN.saturating_sub(suffix.len() + 1);
    let mut end = budget.min(filename.len());
    while !filename.is_char_boundary(end) {
        end -= 1;
    }
    format!(".{}{}", &filename[..end], suffix)
}
