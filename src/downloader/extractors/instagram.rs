// Instagram locator - delegates to an extraction engine (yt-dlp)
//
// Instagram rate-limits anonymous extraction aggressively. The first attempt
// goes out without cookies; a rate-limit / login-wall failure gets exactly
// one retry with the configured cookie source.

use async_trait::async_trait;
use std::path::PathBuf;

use super::diagnostics::diagnose_error;
use super::traits::{CookieSource, EngineInfo, ExtractionEngine, VideoLocator};
use crate::downloader::errors::DownloadError;
use crate::downloader::models::{MediaResolution, PlatformTag};
use crate::downloader::utils::sanitize_filename_or;

/// Browser profile used for the retry when nothing else is configured
pub const FALLBACK_BROWSER: &str = "chrome";

#[derive(Debug, Clone, Default)]
pub struct InstagramConfig {
    /// Browser to read cookies from (chrome, firefox, safari, ...)
    pub cookies_from_browser: Option<String>,
    /// Netscape cookies.txt; takes precedence over the browser
    pub cookies_file: Option<PathBuf>,
}

impl InstagramConfig {
    pub fn with_cookies_from_browser(mut self, browser: impl Into<String>) -> Self {
        self.cookies_from_browser = Some(browser.into());
        self
    }

    pub fn with_cookies_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cookies_file = Some(path.into());
        self
    }

    /// Credential material for the retry attempt
    pub fn cookie_source(&self) -> CookieSource {
        if let Some(path) = &self.cookies_file {
            return CookieSource::File(path.clone());
        }
        CookieSource::Browser(
            self.cookies_from_browser
                .clone()
                .unwrap_or_else(|| FALLBACK_BROWSER.to_string()),
        )
    }
}

pub struct InstagramLocator {
    config: InstagramConfig,
    engine: Box<dyn ExtractionEngine>,
}

impl InstagramLocator {
    pub fn new(config: InstagramConfig, engine: Box<dyn ExtractionEngine>) -> Self {
        Self { config, engine }
    }

    async fn extract_with_retry(&self, url: &str) -> Result<EngineInfo, DownloadError> {
        let first = match self.engine.extract(url, None).await {
            Ok(info) => return Ok(info),
            Err(e) => e,
        };

        // Only the engine's own stderr is diagnosed; our error prefix and
        // other error kinds never trigger the cookie retry.
        let diagnosis = match &first {
            DownloadError::UpstreamError(stderr) => diagnose_error(stderr),
            _ => None,
        };
        let reason = match diagnosis {
            Some(reason) if reason.retry_with_cookies() => reason,
            _ => return Err(first),
        };

        let cookies = self.config.cookie_source();
        tracing::warn!(
            "{} on first attempt, retrying with cookies from {}",
            reason.description(),
            cookies
        );

        self.engine
            .extract(url, Some(&cookies))
            .await
            .map_err(|retry_err| match retry_err {
                DownloadError::UpstreamError(msg) => {
                    let hint = diagnose_error(&msg)
                        .map(|r| format!("\n{}", r.suggestion()))
                        .unwrap_or_default();
                    DownloadError::UpstreamError(format!("{}{}", msg, hint))
                }
                other => other,
            })
    }
}

#[async_trait]
impl VideoLocator for InstagramLocator {
    fn platform(&self) -> PlatformTag {
        PlatformTag::Instagram
    }

    async fn locate(&self, url: &str) -> Result<MediaResolution, DownloadError> {
        tracing::debug!("Extracting Instagram post with {}", self.engine.name());
        let info = self.extract_with_retry(url).await?;
        resolution_from_info(&info)
    }
}

fn resolution_from_info(info: &EngineInfo) -> Result<MediaResolution, DownloadError> {
    let media_url = info.preferred_media_url().ok_or_else(|| {
        DownloadError::NoVideoFound("extraction engine returned no playable format".to_string())
    })?;

    let label = [&info.channel, &info.id]
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .map(String::as_str)
        .unwrap_or("video");
    let fallback = format!("instagram_{}", label);

    Ok(MediaResolution {
        media_url,
        title: sanitize_filename_or(info.description.as_deref().unwrap_or(""), &fallback),
        referer: PlatformTag::Instagram.referer().to_string(),
    })
}
