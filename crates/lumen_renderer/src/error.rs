//! Error types for the renderer.

use thiserror::Error;

/// Errors reported by the renderer and its session façade.
///
/// Numeric degeneracies inside a path sample are never reported here; the
/// integrator zeroes them out locally.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("invalid camera: {0}")]
    InvalidCamera(String),

    #[error("samples per pixel must be at least 1")]
    InvalidSampleCount,

    #[error("invalid session configuration: {0}")]
    InvalidConfig(String),

    #[error("another render or reset call is in flight on this session")]
    RenderInProgress,

    #[error("failed to allocate buffers for {cells} pixels")]
    Allocation { cells: usize },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("image output error: {0}")]
    Image(#[from] image::ImageError),

    #[error("configuration parse error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Reject zero-sized or overflowing image dimensions, returning the pixel count.
pub(crate) fn checked_pixel_count(width: u32, height: u32) -> RenderResult<usize> {
    if width == 0 || height == 0 {
        return Err(RenderError::InvalidDimensions { width, height });
    }
    (width as usize)
        .checked_mul(height as usize)
        // Each pixel is also 4 output bytes.
        .filter(|n| n.checked_mul(4).is_some())
        .ok_or(RenderError::InvalidDimensions { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_pixel_count() {
        assert_eq!(checked_pixel_count(4, 3).unwrap(), 12);
        assert!(matches!(
            checked_pixel_count(0, 3),
            Err(RenderError::InvalidDimensions { width: 0, height: 3 })
        ));
        assert!(matches!(
            checked_pixel_count(7, 0),
            Err(RenderError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_error_messages() {
        let err = RenderError::InvalidDimensions { width: 0, height: 2 };
        assert_eq!(err.to_string(), "invalid image dimensions 0x2");
        assert_eq!(
            RenderError::RenderInProgress.to_string(),
            "another render or reset call is in flight on this session"
        );
    }
}
