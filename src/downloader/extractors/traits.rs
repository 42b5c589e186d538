// Locator and extraction-engine traits plus their shared types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::downloader::errors::DownloadError;
use crate::downloader::models::{MediaResolution, PlatformTag};

/// Turns a post URL into a directly fetchable media URL and a sanitized title.
///
/// One implementation per platform. Implementations keep only session
/// configuration (headers, cookies) between calls.
#[async_trait]
pub trait VideoLocator: Send + Sync {
    fn platform(&self) -> PlatformTag;

    async fn locate(&self, url: &str) -> Result<MediaResolution, DownloadError>;
}

/// Credential material handed to the extraction engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieSource {
    /// Browser profile to read cookies from (chrome, firefox, safari, ...)
    Browser(String),
    /// Netscape-format cookies.txt
    File(PathBuf),
}

impl fmt::Display for CookieSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Browser(name) => write!(f, "{}", name),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Format entry reported by the extraction engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineFormat {
    /// Format ID (e.g., "dash-1080p", "8")
    pub format_id: String,
    /// File extension (mp4, webm, m4a)
    pub ext: String,
    pub url: Option<String>,
    /// Video codec (avc1, vp9, none)
    pub vcodec: Option<String>,
    /// Audio codec (mp4a, opus, none)
    pub acodec: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl EngineFormat {
    /// MP4 carrying both audio and video in one stream.
    ///
    /// A missing codec field counts as present; only an explicit "none" excludes.
    pub fn is_progressive_mp4(&self) -> bool {
        self.ext == "mp4"
            && self.vcodec.as_deref() != Some("none")
            && self.acodec.as_deref() != Some("none")
    }
}

/// Structured info object returned by the extraction engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineInfo {
    pub id: Option<String>,
    pub description: Option<String>,
    pub channel: Option<String>,
    /// Engine's own pick when no format list is useful
    pub url: Option<String>,
    pub formats: Vec<EngineFormat>,
}

impl EngineInfo {
    /// First progressive MP4 with a URL, else the engine's default URL
    pub fn preferred_media_url(&self) -> Option<String> {
        self.formats
            .iter()
            .filter(|f| f.is_progressive_mp4())
            .find_map(|f| f.url.clone().filter(|u| !u.is_empty()))
            .or_else(|| self.url.clone().filter(|u| !u.is_empty()))
    }
}

/// General-purpose media-extraction engine (black box)
#[async_trait]
pub trait ExtractionEngine: Send + Sync {
    /// Name of the engine (for logging)
    fn name(&self) -> &'static str;

    async fn extract(
        &self,
        url: &str,
        cookies: Option<&CookieSource>,
    ) -> Result<EngineInfo, DownloadError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(ext: &str, vcodec: Option<&str>, acodec: Option<&str>, url: &str) -> EngineFormat {
        EngineFormat {
            format_id: format!("{}-{}", ext, url),
            ext: ext.to_string(),
            url: Some(url.to_string()),
            vcodec: vcodec.map(str::to_string),
            acodec: acodec.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_progressive_mp4_detection() {
        assert!(format("mp4", Some("avc1.64001F"), Some("mp4a.40.2"), "a").is_progressive_mp4());
        assert!(format("mp4", None, None, "a").is_progressive_mp4());
        assert!(!format("mp4", Some("avc1"), Some("none"), "a").is_progressive_mp4());
        assert!(!format("mp4", Some("none"), Some("mp4a"), "a").is_progressive_mp4());
        assert!(!format("webm", Some("vp9"), Some("opus"), "a").is_progressive_mp4());
    }

    #[test]
    fn test_preferred_media_url_picks_first_progressive() {
        let info = EngineInfo {
            url: Some("https://fallback".to_string()),
            formats: vec![
                format("mp4", Some("avc1"), Some("none"), "https://video-only"),
                format("m4a", Some("none"), Some("mp4a"), "https://audio-only"),
                format("mp4", Some("avc1"), Some("mp4a"), "https://muxed-1"),
                format("mp4", Some("avc1"), Some("mp4a"), "https://muxed-2"),
            ],
            ..Default::default()
        };
        assert_eq!(info.preferred_media_url().as_deref(), Some("https://muxed-1"));
    }

    #[test]
    fn test_preferred_media_url_falls_back_to_default() {
        let info = EngineInfo {
            url: Some("https://fallback".to_string()),
            formats: vec![format("mp4", Some("avc1"), Some("none"), "https://video-only")],
            ..Default::default()
        };
        assert_eq!(info.preferred_media_url().as_deref(), Some("https://fallback"));

        let empty = EngineInfo::default();
        assert_eq!(empty.preferred_media_url(), None);
    }

    #[test]
    fn test_engine_info_parses_sparse_json() {
        let info: EngineInfo = serde_json::from_str(
            r#"{"id":"C1a2","channel":"traveler","formats":[{"ext":"mp4","url":"https://x","vcodec":"avc1","acodec":"mp4a","filesize":12}],"extra":true}"#,
        )
        .unwrap();
        assert_eq!(info.id.as_deref(), Some("C1a2"));
        assert_eq!(info.formats.len(), 1);
        assert_eq!(info.preferred_media_url().as_deref(), Some("https://x"));
    }

    #[test]
    fn test_cookie_source_display() {
        assert_eq!(CookieSource::Browser("firefox".into()).to_string(), "firefox");
        assert_eq!(
            CookieSource::File(PathBuf::from("/tmp/cookies.txt")).to_string(),
            "/tmp/cookies.txt"
        );
    }
}
