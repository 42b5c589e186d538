// Batch runner: per-item failure isolation and the Instagram delay gate

use async_trait::async_trait;
use reel_fetch_lib::downloader::extractors::{LocatorSet, VideoLocator};
use reel_fetch_lib::downloader::{
    run_batch, DownloadError, Downloader, DownloaderConfig, InputMode, MediaResolution,
    MediaTransfer, NoProgress, PlatformTag, ProgressSink, QrDecoder, RateLimitGate,
    TransferRequest,
};
use std::time::{Duration, Instant};

struct FixedLocator {
    platform: PlatformTag,
}

#[async_trait]
impl VideoLocator for FixedLocator {
    fn platform(&self) -> PlatformTag {
        self.platform
    }

    async fn locate(&self, url: &str) -> Result<MediaResolution, DownloadError> {
        if url.contains("broken") {
            return Err(DownloadError::NoVideoFound(url.to_string()));
        }
        Ok(MediaResolution {
            media_url: format!("https://cdn.example/{}.mp4", self.platform),
            title: self.platform.as_str().to_string(),
            referer: self.platform.referer().to_string(),
        })
    }
}

struct WriteTransfer;

#[async_trait]
impl MediaTransfer for WriteTransfer {
    fn name(&self) -> &'static str {
        "write"
    }

    async fn transfer(
        &self,
        request: &TransferRequest,
        _progress: &dyn ProgressSink,
    ) -> Result<u64, DownloadError> {
        tokio::fs::write(&request.destination, b"x").await?;
        Ok(1)
    }
}

fn downloader() -> Downloader {
    let locator = |platform| Box::new(FixedLocator { platform }) as Box<dyn VideoLocator>;
    Downloader::with_parts(
        DownloaderConfig::default(),
        QrDecoder::new(),
        LocatorSet::new(
            locator(PlatformTag::Xiaohongshu),
            locator(PlatformTag::Weibo),
            locator(PlatformTag::Instagram),
        ),
        Box::new(WriteTransfer),
    )
    .unwrap()
    .with_progress(Box::new(NoProgress))
}

#[tokio::test]
async fn test_failures_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = vec![
        "https://weibo.com/1/4567890123456789".to_string(),
        "https://example.com/not-supported".to_string(),
        "https://www.xiaohongshu.com/explore/broken".to_string(),
        "https://www.xiaohongshu.com/explore/ok".to_string(),
    ];

    let summary = run_batch(
        &downloader(),
        &inputs,
        InputMode::Url,
        Some(dir.path()),
        &RateLimitGate::disabled(),
    )
    .await;

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 2);
    assert!(!summary.all_succeeded());
    assert!(dir.path().join("weibo.mp4").exists());
    assert!(dir.path().join("xiaohongshu.mp4").exists());
}

#[tokio::test]
async fn test_missing_screenshots_count_as_failures() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = vec![
        dir.path().join("a.png").display().to_string(),
        dir.path().join("b.png").display().to_string(),
    ];

    let summary = run_batch(
        &downloader(),
        &inputs,
        InputMode::Screenshot,
        None,
        &RateLimitGate::disabled(),
    )
    .await;
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed, 2);
}

#[tokio::test]
async fn test_gate_applies_between_instagram_items_only() {
    let dir = tempfile::tempdir().unwrap();
    let gate = RateLimitGate::new(Duration::from_millis(200), Duration::from_millis(201));
    let inputs = vec![
        "https://www.instagram.com/reel/A/".to_string(),
        "https://www.instagram.com/reel/B/".to_string(),
        "https://weibo.com/1/4567890123456789".to_string(),
        "https://www.instagram.com/reel/C/".to_string(),
    ];

    let started = Instant::now();
    let summary = run_batch(&downloader(), &inputs, InputMode::Url, Some(dir.path()), &gate).await;
    let elapsed = started.elapsed();

    assert_eq!(summary.succeeded, 4);
    // Two pauses: after A and after B; none after the weibo item or the last item
    assert!(elapsed >= Duration::from_millis(400), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(1500), "{:?}", elapsed);
}
