// Resolution orchestrator: decode -> classify -> locate -> output path -> transfer

use std::path::{Path, PathBuf};

use super::errors::DownloadError;
use super::extractors::{InstagramConfig, LocatorSet, WeiboConfig, XiaohongshuConfig};
use super::models::{DownloadOutcome, ImageSource, NetworkConfig, PlannedDownload};
use super::platform::{is_short_link, post_reference};
use super::qr::QrDecoder;
use super::traits::{ConsoleProgress, MediaTransfer, ProgressSink};
use super::transfer::{HttpTransfer, TransferConfig, DEVICE_USER_AGENT};
use super::utils::{build_http_client, format_size, output_path_for, resolve_redirect};

/// Decoded payloads shorter than this are treated as short links
pub const SHORT_LINK_THRESHOLD: usize = 50;

#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    pub network: NetworkConfig,
    pub xiaohongshu: XiaohongshuConfig,
    pub weibo: WeiboConfig,
    pub instagram: InstagramConfig,
    pub transfer: TransferConfig,
    pub short_link_threshold: usize,
    /// Timeout for resolving a decoded short link, in seconds
    pub redirect_timeout: u64,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            xiaohongshu: XiaohongshuConfig::default(),
            weibo: WeiboConfig::default(),
            instagram: InstagramConfig::default(),
            transfer: TransferConfig::default(),
            short_link_threshold: SHORT_LINK_THRESHOLD,
            redirect_timeout: 10,
        }
    }
}

impl DownloaderConfig {
    /// Apply one network configuration to every HTTP client
    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.xiaohongshu = self.xiaohongshu.with_network(network.clone());
        self.weibo = self.weibo.with_network(network.clone());
        self.transfer = self.transfer.with_network(network.clone());
        self.network = network;
        self
    }

    pub fn with_instagram(mut self, instagram: InstagramConfig) -> Self {
        self.instagram = instagram;
        self
    }

    pub fn with_weibo(mut self, weibo: WeiboConfig) -> Self {
        self.weibo = weibo;
        self
    }

    pub fn with_xiaohongshu(mut self, xiaohongshu: XiaohongshuConfig) -> Self {
        self.xiaohongshu = xiaohongshu;
        self
    }
}

pub struct Downloader {
    config: DownloaderConfig,
    decoder: QrDecoder,
    locators: LocatorSet,
    transfer: Box<dyn MediaTransfer>,
    progress: Box<dyn ProgressSink>,
    redirect_client: reqwest::Client,
}

impl Downloader {
    /// Production pipeline: rqrr cascade, platform locators, HTTP transfer
    pub fn new(config: DownloaderConfig) -> Result<Self, DownloadError> {
        let locators = LocatorSet::from_config(
            config.xiaohongshu.clone(),
            config.weibo.clone(),
            config.instagram.clone(),
            &config.network,
        )?;
        let transfer = HttpTransfer::new(&config.transfer)?;
        Self::with_parts(config, QrDecoder::new(), locators, Box::new(transfer))
    }

    pub fn with_parts(
        config: DownloaderConfig,
        decoder: QrDecoder,
        locators: LocatorSet,
        transfer: Box<dyn MediaTransfer>,
    ) -> Result<Self, DownloadError> {
        let redirect_client = build_http_client(
            &[("User-Agent", DEVICE_USER_AGENT)],
            config.redirect_timeout,
            &config.network,
        )?;
        Ok(Self {
            config,
            decoder,
            locators,
            transfer,
            progress: Box::new(ConsoleProgress),
            redirect_client,
        })
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Whether a decoded payload must be resolved before classification
    pub fn needs_redirect(&self, payload: &str) -> bool {
        is_short_link(payload) || payload.chars().count() < self.config.short_link_threshold
    }

    /// Decode the screenshot's QR code and resolve the post it points to
    pub async fn resolve_screenshot(
        &self,
        image: &ImageSource,
        output_dir: Option<&Path>,
    ) -> Result<PlannedDownload, DownloadError> {
        let payload = self.decoder.decode(image)?;
        tracing::info!("Decoded QR payload: {}", payload);

        let url = if self.needs_redirect(&payload) {
            resolve_redirect(&self.redirect_client, &payload, self.config.redirect_timeout).await?
        } else {
            payload
        };

        let dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => screenshot_dir(image)?,
        };
        self.plan(&url, &dir).await
    }

    /// Resolve a post URL given directly
    pub async fn resolve_url(
        &self,
        url: &str,
        output_dir: Option<&Path>,
    ) -> Result<PlannedDownload, DownloadError> {
        let dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => default_url_dir(),
        };
        self.plan(url, &dir).await
    }

    pub async fn download_from_screenshot(
        &self,
        image: &ImageSource,
        output_dir: Option<&Path>,
    ) -> Result<DownloadOutcome, DownloadError> {
        let plan = self.resolve_screenshot(image, output_dir).await?;
        self.execute(&plan).await
    }

    pub async fn download_from_url(
        &self,
        url: &str,
        output_dir: Option<&Path>,
    ) -> Result<DownloadOutcome, DownloadError> {
        let plan = self.resolve_url(url, output_dir).await?;
        self.execute(&plan).await
    }

    /// Hand a resolved item to the transfer collaborator
    pub async fn execute(&self, plan: &PlannedDownload) -> Result<DownloadOutcome, DownloadError> {
        if let Some(dir) = plan.output_path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        tracing::info!("Downloading to: {}", plan.output_path.display());
        let bytes = self
            .transfer
            .transfer(&plan.transfer_request(), self.progress.as_ref())
            .await?;

        tracing::info!(
            "Video saved to: {} ({})",
            plan.output_path.display(),
            format_size(bytes)
        );
        Ok(DownloadOutcome {
            path: plan.output_path.clone(),
            platform: plan.post.platform(),
            bytes,
        })
    }

    async fn plan(&self, url: &str, dir: &Path) -> Result<PlannedDownload, DownloadError> {
        let post = post_reference(url)?;
        tracing::info!("Platform: {}", post.platform().display_name());

        let media = self.locators.get(post.platform()).locate(post.url()).await?;
        tracing::info!("Title: {}", media.title);
        tracing::debug!("Media URL: {}", media.media_url);

        let output_path = output_path_for(dir, &media.title);
        Ok(PlannedDownload {
            post,
            media,
            output_path,
        })
    }
}

fn screenshot_dir(image: &ImageSource) -> Result<PathBuf, DownloadError> {
    match image {
        ImageSource::Path(path) => match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => Ok(parent.to_path_buf()),
            _ => Ok(std::env::current_dir()?),
        },
        ImageSource::Memory(_) => Ok(std::env::current_dir()?),
    }
}

fn default_url_dir() -> PathBuf {
    std::env::current_dir()
        .ok()
        .or_else(dirs::download_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}
