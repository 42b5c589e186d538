// yt-dlp extraction engine - runs the native `yt-dlp` binary with --dump-json

use async_trait::async_trait;
use std::process::Command as StdCommand;

use super::traits::{CookieSource, EngineInfo, ExtractionEngine};
use crate::downloader::errors::DownloadError;
use crate::downloader::models::NetworkConfig;
use crate::downloader::utils::run_output_with_timeout;

/// Environment variable overriding binary discovery
pub const YTDLP_ENV: &str = "REEL_FETCH_YTDLP";

/// Default overall timeout for one extraction, in seconds
const EXTRACT_TIMEOUT: u64 = 90;

pub struct YtDlpEngine {
    ytdlp_path: String,
    network: NetworkConfig,
    timeout_secs: u64,
}

impl YtDlpEngine {
    pub fn new(network: NetworkConfig) -> Self {
        Self {
            ytdlp_path: find_ytdlp(),
            network,
            timeout_secs: EXTRACT_TIMEOUT,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.ytdlp_path = path.into();
        self
    }

    fn build_args(&self, url: &str, cookies: Option<&CookieSource>) -> Vec<String> {
        let socket_timeout = self.network.timeout.unwrap_or(30);
        let mut args = vec![
            "--dump-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            socket_timeout.to_string(),
        ];

        match cookies {
            Some(CookieSource::File(path)) => {
                args.push("--cookies".to_string());
                args.push(path.display().to_string());
            }
            Some(CookieSource::Browser(browser)) => {
                args.push("--cookies-from-browser".to_string());
                args.push(browser.clone());
            }
            None => {}
        }

        if let Some(proxy) = &self.network.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }

        args.push(url.to_string());
        args
    }

    fn parse_json(stdout: &[u8]) -> Result<EngineInfo, DownloadError> {
        serde_json::from_slice(stdout)
            .map_err(|e| DownloadError::UpstreamError(format!("Invalid yt-dlp JSON: {}", e)))
    }
}

#[async_trait]
impl ExtractionEngine for YtDlpEngine {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn extract(
        &self,
        url: &str,
        cookies: Option<&CookieSource>,
    ) -> Result<EngineInfo, DownloadError> {
        let args = self.build_args(url, cookies);
        tracing::debug!("{} {}", self.ytdlp_path, args.join(" "));

        let out = run_output_with_timeout(&self.ytdlp_path, args, self.timeout_secs).await?;
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(DownloadError::UpstreamError(stderr.trim().to_string()));
        }

        Self::parse_json(&out.stdout)
    }
}

/// Find yt-dlp binary: env override, common install paths, `which`, then bare name
pub fn find_ytdlp() -> String {
    if let Ok(path) = std::env::var(YTDLP_ENV) {
        if !path.trim().is_empty() {
            return path;
        }
    }

    let common_paths = [
        "/opt/homebrew/bin/yt-dlp", // Homebrew on Apple Silicon
        "/usr/local/bin/yt-dlp",    // Homebrew on Intel Mac
        "/usr/bin/yt-dlp",          // System installation
    ];

    for path in common_paths {
        if std::path::Path::new(path).exists() {
            return path.to_string();
        }
    }

    // Try to find via `which`
    if let Ok(output) = StdCommand::new("which").arg("yt-dlp").output() {
        if output.status.success() {
            if let Ok(path) = String::from_utf8(output.stdout) {
                let trimmed = path.trim();
                if !trimmed.is_empty() {
                    return trimmed.to_string();
                }
            }
        }
    }

    "yt-dlp".to_string()
}
