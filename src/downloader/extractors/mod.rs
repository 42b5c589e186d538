// Video locators - one per platform, selected by PlatformTag
//
// - Xiaohongshu: page scraping (structured state, then pattern search)
// - Weibo: mobile status API
// - Instagram: external extraction engine (yt-dlp) with a cookie retry

mod diagnostics;
mod instagram;
mod traits;
mod weibo;
mod xiaohongshu;
mod ytdlp;

pub use diagnostics::{diagnose_error, BlockingReason};
pub use instagram::{InstagramConfig, InstagramLocator, FALLBACK_BROWSER};
pub use traits::{CookieSource, EngineFormat, EngineInfo, ExtractionEngine, VideoLocator};
pub use weibo::{extract_status_id, WeiboConfig, WeiboLocator};
pub use xiaohongshu::{extract_from_html, XiaohongshuConfig, XiaohongshuLocator};
pub use ytdlp::{find_ytdlp, YtDlpEngine, YTDLP_ENV};

use crate::downloader::errors::DownloadError;
use crate::downloader::models::{NetworkConfig, PlatformTag};

/// One locator per platform
pub struct LocatorSet {
    xiaohongshu: Box<dyn VideoLocator>,
    weibo: Box<dyn VideoLocator>,
    instagram: Box<dyn VideoLocator>,
}

impl LocatorSet {
    pub fn new(
        xiaohongshu: Box<dyn VideoLocator>,
        weibo: Box<dyn VideoLocator>,
        instagram: Box<dyn VideoLocator>,
    ) -> Self {
        Self {
            xiaohongshu,
            weibo,
            instagram,
        }
    }

    /// Production locators sharing one network configuration
    pub fn from_config(
        xiaohongshu: XiaohongshuConfig,
        weibo: WeiboConfig,
        instagram: InstagramConfig,
        network: &NetworkConfig,
    ) -> Result<Self, DownloadError> {
        Ok(Self::new(
            Box::new(XiaohongshuLocator::new(xiaohongshu)?),
            Box::new(WeiboLocator::new(weibo)?),
            Box::new(InstagramLocator::new(
                instagram,
                Box::new(YtDlpEngine::new(network.clone())),
            )),
        ))
    }

    pub fn get(&self, platform: PlatformTag) -> &dyn VideoLocator {
        match platform {
            PlatformTag::Xiaohongshu => self.xiaohongshu.as_ref(),
            PlatformTag::Weibo => self.weibo.as_ref(),
            PlatformTag::Instagram => self.instagram.as_ref(),
        }
    }
}
