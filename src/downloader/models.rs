// Common data models for the resolution pipeline

use std::fmt;
use std::path::PathBuf;

/// Platforms a post URL can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformTag {
    Xiaohongshu,
    Weibo,
    Instagram,
}

impl PlatformTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Xiaohongshu => "xiaohongshu",
            Self::Weibo => "weibo",
            Self::Instagram => "instagram",
        }
    }

    /// Human-readable name for console output
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Xiaohongshu => "Xiaohongshu",
            Self::Weibo => "Weibo",
            Self::Instagram => "Instagram",
        }
    }

    /// Referer sent with the media transfer
    pub fn referer(&self) -> &'static str {
        match self {
            Self::Xiaohongshu => "https://www.xiaohongshu.com/",
            Self::Weibo => "https://m.weibo.cn/",
            Self::Instagram => "https://www.instagram.com/",
        }
    }

    /// Whether the platform's extraction path is known to rate-limit
    pub fn rate_limited(&self) -> bool {
        matches!(self, Self::Instagram)
    }
}

impl fmt::Display for PlatformTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A post URL bound to the platform it was classified as.
///
/// Only `platform::classify` constructs these, so the tag always agrees
/// with the domain fragment found in `url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostReference {
    url: String,
    platform: PlatformTag,
}

impl PostReference {
    pub(crate) fn new(url: String, platform: PlatformTag) -> Self {
        Self { url, platform }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn platform(&self) -> PlatformTag {
        self.platform
    }
}

/// Result of locating a video.
///
/// `media_url` is never empty: a locator that cannot find one returns an
/// error instead. `title` is already sanitized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaResolution {
    pub media_url: String,
    pub title: String,
    pub referer: String,
}

/// Pixel data handed to the QR decoder
#[derive(Debug, Clone)]
pub enum ImageSource {
    Path(PathBuf),
    Memory(Vec<u8>),
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&std::path::Path> for ImageSource {
    fn from(path: &std::path::Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

/// What the transfer collaborator is asked to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub media_url: String,
    pub destination: PathBuf,
    pub referer: Option<String>,
}

/// A fully resolved item, ready to hand to the transfer collaborator
#[derive(Debug, Clone)]
pub struct PlannedDownload {
    pub post: PostReference,
    pub media: MediaResolution,
    pub output_path: PathBuf,
}

impl PlannedDownload {
    pub fn transfer_request(&self) -> TransferRequest {
        TransferRequest {
            media_url: self.media.media_url.clone(),
            destination: self.output_path.clone(),
            referer: Some(self.media.referer.clone()),
        }
    }
}

/// Outcome of a completed download
#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    pub path: PathBuf,
    pub platform: PlatformTag,
    pub bytes: u64,
}

/// Network configuration shared by every HTTP client and the extraction engine
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Proxy URL (e.g., "socks5://127.0.0.1:1080" or "http://127.0.0.1:8080")
    pub proxy: Option<String>,

    /// Timeout in seconds, used where a stage has no timeout of its own
    pub timeout: Option<u32>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout: Some(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_tag_strings() {
        assert_eq!(PlatformTag::Xiaohongshu.to_string(), "xiaohongshu");
        assert_eq!(PlatformTag::Weibo.display_name(), "Weibo");
        assert_eq!(PlatformTag::Instagram.referer(), "https://www.instagram.com/");
    }

    #[test]
    fn test_only_instagram_is_rate_limited() {
        assert!(PlatformTag::Instagram.rate_limited());
        assert!(!PlatformTag::Weibo.rate_limited());
        assert!(!PlatformTag::Xiaohongshu.rate_limited());
    }

    #[test]
    fn test_planned_download_builds_transfer_request() {
        let planned = PlannedDownload {
            post: PostReference::new(
                "https://m.weibo.cn/status/4567890123456789".to_string(),
                PlatformTag::Weibo,
            ),
            media: MediaResolution {
                media_url: "https://f.video.weibocdn.com/v.mp4".to_string(),
                title: "clip".to_string(),
                referer: PlatformTag::Weibo.referer().to_string(),
            },
            output_path: PathBuf::from("/tmp/clip.mp4"),
        };

        let request = planned.transfer_request();
        assert_eq!(request.media_url, "https://f.video.weibocdn.com/v.mp4");
        assert_eq!(request.destination, PathBuf::from("/tmp/clip.mp4"));
        assert_eq!(request.referer.as_deref(), Some("https://m.weibo.cn/"));
    }
}
