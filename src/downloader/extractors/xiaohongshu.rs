// Xiaohongshu locator - page scraping
//
// Two page layouts are understood:
// - legacy: `window.__INITIAL_STATE__ = {...}` with a noteDetailMap
// - current: loose JSON fragments carrying `masterUrl` / `backupUrls`
// The structured parse runs first; pattern search is the fallback.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use super::traits::VideoLocator;
use crate::downloader::errors::DownloadError;
use crate::downloader::models::{MediaResolution, NetworkConfig, PlatformTag};
use crate::downloader::platform::is_short_link;
use crate::downloader::utils::{
    build_http_client, resolve_redirect, sanitize_filename_or, unescape_json_fragment,
};

/// Title used when a page carries none
pub const DEFAULT_TITLE: &str = "xhs_video";

const VIDEO_CDN: &str = "https://sns-video-bd.xhscdn.com";

lazy_static! {
    static ref INITIAL_STATE_RE: Regex =
        Regex::new(r"(?s)window\.__INITIAL_STATE__\s*=\s*(\{.*?\})\s*</script>").unwrap();
    static ref MASTER_URL_RE: Regex = Regex::new(r#""masterUrl"\s*:\s*"(http[^"]+)""#).unwrap();
    static ref BACKUP_URLS_RE: Regex =
        Regex::new(r#""backupUrls"\s*:\s*\[\s*"(http[^"]+)""#).unwrap();
    static ref TITLE_RE: Regex = Regex::new(r#""title"\s*:\s*"([^"]+)""#).unwrap();
    static ref UNDEFINED_RE: Regex = Regex::new(r":\s*undefined\b").unwrap();
}

#[derive(Debug, Clone)]
pub struct XiaohongshuConfig {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    /// Page fetch timeout in seconds
    pub page_timeout: u64,
    /// Short-link resolution timeout in seconds
    pub redirect_timeout: u64,
    pub network: NetworkConfig,
}

impl Default for XiaohongshuConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 16_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.0 Mobile/15E148 Safari/604.1".to_string(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
            accept_language: "zh-CN,zh;q=0.9,en;q=0.8".to_string(),
            page_timeout: 15,
            redirect_timeout: 10,
            network: NetworkConfig::default(),
        }
    }
}

impl XiaohongshuConfig {
    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }
}

pub struct XiaohongshuLocator {
    config: XiaohongshuConfig,
    client: reqwest::Client,
}

impl XiaohongshuLocator {
    pub fn new(config: XiaohongshuConfig) -> Result<Self, DownloadError> {
        let client = build_http_client(
            &[
                ("User-Agent", config.user_agent.as_str()),
                ("Accept", config.accept.as_str()),
                ("Accept-Language", config.accept_language.as_str()),
            ],
            config.page_timeout,
            &config.network,
        )?;
        Ok(Self { config, client })
    }

    async fn fetch_page(&self, url: &str) -> Result<String, DownloadError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::UpstreamError(format!("Xiaohongshu page {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::UpstreamError(format!(
                "Xiaohongshu page {} returned HTTP {}",
                url, status
            )));
        }

        response
            .text()
            .await
            .map_err(|e| DownloadError::UpstreamError(format!("Xiaohongshu page body: {}", e)))
    }
}

#[async_trait]
impl VideoLocator for XiaohongshuLocator {
    fn platform(&self) -> PlatformTag {
        PlatformTag::Xiaohongshu
    }

    async fn locate(&self, url: &str) -> Result<MediaResolution, DownloadError> {
        let page_url = if is_short_link(url) {
            tracing::debug!("Resolving Xiaohongshu short link: {}", url);
            resolve_redirect(&self.client, url, self.config.redirect_timeout).await?
        } else {
            url.to_string()
        };

        let html = self.fetch_page(&page_url).await?;
        tracing::debug!("Fetched Xiaohongshu page ({} bytes)", html.len());
        extract_from_html(&html)
    }
}

/// Locate the video in a Xiaohongshu page
pub fn extract_from_html(html: &str) -> Result<MediaResolution, DownloadError> {
    let (media_url, raw_title) = match from_initial_state(html) {
        Some(found) => {
            tracing::debug!("Video found in __INITIAL_STATE__");
            found
        }
        None => from_patterns(html).ok_or_else(|| {
            DownloadError::NoVideoFound(
                "no video URL in Xiaohongshu page (this might be an image post)".to_string(),
            )
        })?,
    };

    Ok(MediaResolution {
        media_url,
        title: sanitize_filename_or(&raw_title, DEFAULT_TITLE),
        referer: PlatformTag::Xiaohongshu.referer().to_string(),
    })
}

fn from_initial_state(html: &str) -> Option<(String, String)> {
    let raw = INITIAL_STATE_RE.captures(html)?.get(1)?.as_str();
    let cleaned = UNDEFINED_RE.replace_all(raw, ":null");
    let state: Value = serde_json::from_str(&cleaned).ok()?;

    state
        .pointer("/note/noteDetailMap")?
        .as_object()?
        .values()
        .find_map(|entry| {
            let note = entry.get("note")?;
            let video = note.get("video")?;
            let media_url = non_empty(video.pointer("/media/stream/h264/0/masterUrl"))
                .or_else(|| non_empty(video.get("url")))
                .or_else(|| {
                    non_empty(video.pointer("/consumer/originVideoKey"))
                        .map(|key| format!("{}/{}", VIDEO_CDN, key))
                })?;
            let title = non_empty(note.get("title")).unwrap_or_else(|| DEFAULT_TITLE.to_string());
            Some((media_url, title))
        })
}

fn from_patterns(html: &str) -> Option<(String, String)> {
    let raw_url = MASTER_URL_RE
        .captures(html)
        .or_else(|| BACKUP_URLS_RE.captures(html))?
        .get(1)?
        .as_str();

    let title = TITLE_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| unescape_json_fragment(m.as_str()))
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());

    Some((unescape_json_fragment(raw_url), title))
}

fn non_empty(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_master_url_pattern() {
        let html = r#"<script>{"video":{"masterUrl":"https://cdn.example/v.mp4"},"title":"My Trip"}</script>"#;
        let res = extract_from_html(html).unwrap();
        assert_eq!(res.media_url, "https://cdn.example/v.mp4");
        assert_eq!(res.title, "My Trip");
        assert_eq!(res.referer, "https://www.xiaohongshu.com/");
    }

    #[test]
    fn test_master_url_preferred_over_backup() {
        let html = r#"{"backupUrls":["https://backup.example/b.mp4"],"masterUrl":"https://cdn.example/m.mp4"}"#;
        assert_eq!(extract_from_html(html).unwrap().media_url, "https://cdn.example/m.mp4");
    }

    #[test]
    fn test_backup_urls_fallback() {
        let html = r#"{"backupUrls": ["https://backup.example/b.mp4", "https://backup.example/c.mp4"]}"#;
        let res = extract_from_html(html).unwrap();
        assert_eq!(res.media_url, "https://backup.example/b.mp4");
        assert_eq!(res.title, DEFAULT_TITLE);
    }

    #[test]
    fn test_initial_state_layout() {
        let html = r#"<html><script>window.__INITIAL_STATE__ = {"note":{"noteDetailMap":{"abc":{"note":{"title":"Old/Layout","desc":undefined,"video":{"media":{"stream":{"h264":[{"masterUrl":"https://state.example/h264.mp4"}]}}}}}}}}</script></html>"#;
        let res = extract_from_html(html).unwrap();
        assert_eq!(res.media_url, "https://state.example/h264.mp4");
        assert_eq!(res.title, "OldLayout");
    }

    #[test]
    fn test_initial_state_origin_key() {
        let html = r#"<script>window.__INITIAL_STATE__={"note":{"noteDetailMap":{"x":{"note":{"video":{"consumer":{"originVideoKey":"pre_post/abc"}}}}}}}</script>"#;
        let res = extract_from_html(html).unwrap();
        assert_eq!(res.media_url, "https://sns-video-bd.xhscdn.com/pre_post/abc");
        assert_eq!(res.title, DEFAULT_TITLE);
    }

    #[test]
    fn test_initial_state_without_video_falls_back_to_patterns() {
        let html = r#"<script>window.__INITIAL_STATE__={"note":{"noteDetailMap":{"x":{"note":{"title":"pics"}}}}}</script><script>{"masterUrl":"https://cdn.example/late.mp4"}</script>"#;
        assert_eq!(extract_from_html(html).unwrap().media_url, "https://cdn.example/late.mp4");
    }

    #[test]
    fn test_image_post_has_no_video() {
        let html = r#"<script>{"imageList":[{"url":"https://img.example/1.jpg"}],"title":"photos"}</script>"#;
        assert!(matches!(extract_from_html(html), Err(DownloadError::NoVideoFound(_))));
    }

    #[test]
    fn test_title_is_sanitized() {
        let html = r#"{"masterUrl":"https://cdn.example/v.mp4","title":"a:b?c"}"#;
        assert_eq!(extract_from_html(html).unwrap().title, "abc");
    }
}
