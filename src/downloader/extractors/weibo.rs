// Weibo locator - mobile status API

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use super::traits::VideoLocator;
use crate::downloader::errors::DownloadError;
use crate::downloader::models::{MediaResolution, NetworkConfig, PlatformTag};
use crate::downloader::utils::{build_http_client, sanitize_filename_or};

lazy_static! {
    /// Tried in order; the first capture wins
    static ref STATUS_ID_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"weibo\.com/\d+/(\d+)").unwrap(),
        Regex::new(r"weibo\.cn/status/(\d+)").unwrap(),
        Regex::new(r"/(\d{16,})").unwrap(),
    ];
}

#[derive(Debug, Clone)]
pub struct WeiboConfig {
    /// Scheme and host of the mobile API
    pub api_base: String,
    pub user_agent: String,
    pub referer: String,
    /// Request timeout in seconds
    pub timeout: u64,
    pub network: NetworkConfig,
}

impl Default for WeiboConfig {
    fn default() -> Self {
        Self {
            api_base: "https://m.weibo.cn".to_string(),
            user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 16_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.0 Mobile/15E148 Safari/604.1".to_string(),
            referer: PlatformTag::Weibo.referer().to_string(),
            timeout: 15,
            network: NetworkConfig::default(),
        }
    }
}

impl WeiboConfig {
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    ok: Option<i64>,
    msg: Option<String>,
    data: Option<Status>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Status {
    text: String,
    user: Option<User>,
    page_info: Option<PageInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct User {
    screen_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageInfo {
    #[serde(rename = "type")]
    kind: String,
    urls: Option<VariantUrls>,
    media_info: Option<MediaInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VariantUrls {
    mp4_720p_mp4: Option<String>,
    mp4_hd_mp4: Option<String>,
    mp4_ld_mp4: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MediaInfo {
    stream_url_hd: Option<String>,
    stream_url: Option<String>,
}

pub struct WeiboLocator {
    config: WeiboConfig,
    client: reqwest::Client,
}

impl WeiboLocator {
    pub fn new(config: WeiboConfig) -> Result<Self, DownloadError> {
        let client = build_http_client(
            &[
                ("User-Agent", config.user_agent.as_str()),
                ("Accept", "application/json, text/plain, */*"),
                ("Referer", config.referer.as_str()),
                ("X-Requested-With", "XMLHttpRequest"),
            ],
            config.timeout,
            &config.network,
        )?;
        Ok(Self { config, client })
    }

    async fn fetch_status(&self, status_id: &str) -> Result<StatusResponse, DownloadError> {
        let api_url = format!(
            "{}/statuses/show?id={}",
            self.config.api_base.trim_end_matches('/'),
            status_id
        );
        tracing::debug!("Weibo API: {}", api_url);

        let response = self
            .client
            .get(&api_url)
            .send()
            .await
            .map_err(|e| DownloadError::UpstreamError(format!("Weibo API: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::UpstreamError(format!(
                "Weibo API returned HTTP {}",
                status
            )));
        }

        response
            .json::<StatusResponse>()
            .await
            .map_err(|e| DownloadError::UpstreamError(format!("Weibo API response: {}", e)))
    }
}

#[async_trait]
impl VideoLocator for WeiboLocator {
    fn platform(&self) -> PlatformTag {
        PlatformTag::Weibo
    }

    async fn locate(&self, url: &str) -> Result<MediaResolution, DownloadError> {
        let status_id = extract_status_id(url)?;
        tracing::debug!("Weibo status id: {}", status_id);

        let response = self.fetch_status(&status_id).await?;
        resolution_from_status(response)
    }
}

/// Numeric status identifier from a post URL
pub fn extract_status_id(url: &str) -> Result<String, DownloadError> {
    STATUS_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(url).and_then(|c| c.get(1)))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| DownloadError::InvalidUrl(format!("no Weibo status id in {}", url)))
}

fn resolution_from_status(response: StatusResponse) -> Result<MediaResolution, DownloadError> {
    if response.ok != Some(1) {
        return Err(DownloadError::ApiError(
            response.msg.unwrap_or_else(|| "Unknown error".to_string()),
        ));
    }

    let status = response.data.unwrap_or_default();
    let page_info = status.page_info.unwrap_or_default();
    if page_info.kind != "video" {
        return Err(DownloadError::NotAVideo);
    }

    let urls = page_info.urls.unwrap_or_default();
    let media = page_info.media_info.unwrap_or_default();
    let media_url = [
        urls.mp4_720p_mp4,
        urls.mp4_hd_mp4,
        urls.mp4_ld_mp4,
        media.stream_url_hd,
        media.stream_url,
    ]
    .into_iter()
    .flatten()
    .find(|u| !u.is_empty())
    .ok_or_else(|| DownloadError::NoVideoFound("no playable stream in Weibo status".to_string()))?;

    let screen_name = status
        .user
        .map(|u| u.screen_name)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "weibo".to_string());

    Ok(MediaResolution {
        media_url,
        title: sanitize_filename_or(&status.text, &format!("weibo_{}", screen_name)),
        referer: PlatformTag::Weibo.referer().to_string(),
    })
}
