// Error types for the resolution pipeline

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Screenshot path does not exist
    #[error("Image not found: {}", .0.display())]
    ImageNotFound(PathBuf),

    /// File exists but could not be decoded as an image
    #[error("Could not read image: {0}")]
    ImageUnreadable(String),

    /// Every QR cascade stage came up empty
    #[error("No QR code found in the image")]
    NoQrFound,

    /// URL does not belong to a supported platform
    #[error("Unknown platform for URL: {0}")]
    UnknownPlatform(String),

    /// URL is on a supported platform but has an unexpected shape
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Following a short link failed at the transport level
    #[error("Failed to resolve URL {url}: {reason}")]
    RedirectResolution { url: String, reason: String },

    /// Post was fetched but no media URL could be located in it
    #[error("Could not find video URL: {0}")]
    NoVideoFound(String),

    /// Post exists but is not a video (image post, article, ...)
    #[error("This post does not contain a video")]
    NotAVideo,

    /// Platform API answered but reported failure
    #[error("Platform API error: {0}")]
    ApiError(String),

    /// Network or extraction engine failure while locating the video
    #[error("Upstream request failed: {0}")]
    UpstreamError(String),

    /// External extraction engine is not installed
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Media transfer failed (non-2xx, broken stream)
    #[error("Download failed: {0}")]
    FetchFailure(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    /// Short machine-readable code, used in batch failure logs
    pub fn code(&self) -> &'static str {
        match self {
            Self::ImageNotFound(_) => "image_not_found",
            Self::ImageUnreadable(_) => "image_unreadable",
            Self::NoQrFound => "no_qr_found",
            Self::UnknownPlatform(_) => "unknown_platform",
            Self::InvalidUrl(_) => "invalid_url",
            Self::RedirectResolution { .. } => "redirect_resolution",
            Self::NoVideoFound(_) => "no_video_found",
            Self::NotAVideo => "not_a_video",
            Self::ApiError(_) => "api_error",
            Self::UpstreamError(_) => "upstream_error",
            Self::ToolNotFound(_) => "tool_not_found",
            Self::FetchFailure(_) => "fetch_failure",
            Self::Io(_) => "io",
        }
    }

    pub(crate) fn redirect(url: &str, reason: impl std::fmt::Display) -> Self {
        Self::RedirectResolution {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_context() {
        let err = DownloadError::UnknownPlatform("https://example.com/v/1".to_string());
        assert_eq!(err.to_string(), "Unknown platform for URL: https://example.com/v/1");

        let err = DownloadError::redirect("https://xhslink.com/a", "connection refused");
        assert!(err.to_string().contains("xhslink.com/a"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_codes_are_distinct_for_core_kinds() {
        let codes = [
            DownloadError::ImageNotFound(PathBuf::from("a.png")).code(),
            DownloadError::NoQrFound.code(),
            DownloadError::UnknownPlatform(String::new()).code(),
            DownloadError::redirect("u", "r").code(),
            DownloadError::NoVideoFound(String::new()).code(),
            DownloadError::ApiError(String::new()).code(),
            DownloadError::UpstreamError(String::new()).code(),
            DownloadError::FetchFailure(String::new()).code(),
        ];
        let mut unique = codes.to_vec();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), codes.len());
    }
}
