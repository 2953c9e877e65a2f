//! Image probing for downloaded and pre-existing files
//!
//! Only the image header is decoded; the format is sniffed from content so
//! sanitized filenames without a recognizable extension still work.

use crate::error::VerificationError;
use crate::resolution::{MatchCode, Resolution};
use std::path::{Path, PathBuf};

/// Read the pixel dimensions of the image at `path`
pub fn probe_dimensions(path: &Path) -> Result<(u32, u32), VerificationError> {
    let decode_error = |message: String| VerificationError::Decode {
        path: path.to_path_buf(),
        message,
    };

    image::ImageReader::open(path)
        .map_err(|e| decode_error(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| decode_error(e.to_string()))?
        .into_dimensions()
        .map_err(|e| decode_error(e.to_string()))
}

/// Probe `path` and score it against `target`
///
/// An Unacceptable match is returned as [`VerificationError::Unacceptable`].
pub fn verify_image(path: &Path, target: &Resolution) -> Result<MatchCode, VerificationError> {
    let (width, height) = probe_dimensions(path)?;
    let code = target.evaluate(width, height);
    if !code.is_acceptable() {
        return Err(VerificationError::Unacceptable {
            width,
            height,
            target: *target,
        });
    }
    tracing::debug!(
        path = %path.display(),
        width,
        height,
        target = %target,
        match_code = %code,
        "Image verified"
    );
    Ok(code)
}

/// [`verify_image`] on the blocking thread pool
pub async fn verify_image_blocking(
    path: PathBuf,
    target: Resolution,
) -> Result<MatchCode, VerificationError> {
    let probe_path = path.clone();
    tokio::task::spawn_blocking(move || verify_image(&probe_path, &target))
        .await
        .unwrap_or_else(|e| {
            Err(VerificationError::Decode {
                path,
                message: format!("image probe task failed: {}", e),
            })
        })
}
