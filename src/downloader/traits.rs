// Transfer collaborator and progress reporting seams

use async_trait::async_trait;
use std::io::Write;

use super::errors::DownloadError;
use super::models::TransferRequest;

/// Streams a media URL to disk
#[async_trait]
pub trait MediaTransfer: Send + Sync {
    /// Name of the transfer implementation (for logging)
    fn name(&self) -> &'static str;

    /// Fetch `request.media_url` into `request.destination`, returning bytes written
    async fn transfer(
        &self,
        request: &TransferRequest,
        progress: &dyn ProgressSink,
    ) -> Result<u64, DownloadError>;
}

/// Receives `(downloaded, total)` byte counts while a transfer runs
pub trait ProgressSink: Send + Sync {
    fn update(&self, downloaded: u64, total: Option<u64>);

    fn finish(&self) {}
}

/// Discards progress
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update(&self, _downloaded: u64, _total: Option<u64>) {}
}

/// Rewrites one stderr line: `Progress: 42.0%`
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleProgress;

impl ProgressSink for ConsoleProgress {
    fn update(&self, downloaded: u64, total: Option<u64>) {
        if let Some(percent) = percent(downloaded, total) {
            let mut stderr = std::io::stderr().lock();
            let _ = write!(stderr, "\rProgress: {:.1}%", percent);
            let _ = stderr.flush();
        }
    }

    fn finish(&self) {
        eprintln!();
    }
}

/// Percentage complete, if the total size is known
pub fn percent(downloaded: u64, total: Option<u64>) -> Option<f64> {
    match total {
        Some(total) if total > 0 => Some((downloaded as f64 / total as f64 * 100.0).min(100.0)),
        _ => None,
    }
}
