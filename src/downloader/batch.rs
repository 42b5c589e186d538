// Sequential batch runner with a delay gate for rate-limited platforms

use rand::Rng;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::errors::DownloadError;
use super::models::{DownloadOutcome, ImageSource};
use super::orchestrator::Downloader;

/// How inputs are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Screenshot paths containing a QR code
    Screenshot,
    /// Literal post URLs
    Url,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Random pause inserted after a successful item from a rate-limited platform
#[derive(Debug, Clone)]
pub struct RateLimitGate {
    min: Duration,
    max: Duration,
}

impl Default for RateLimitGate {
    fn default() -> Self {
        Self::new(Duration::from_secs(3), Duration::from_secs(6))
    }
}

impl RateLimitGate {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// No pause at all
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Draw a delay uniformly from `[min, max)`
    pub fn next_delay(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let millis = rand::rng().random_range(self.min.as_millis()..self.max.as_millis());
        Duration::from_millis(millis as u64)
    }

    async fn pause(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            tracing::info!("Waiting {:.1}s before the next request", delay.as_secs_f64());
            tokio::time::sleep(delay).await;
        }
    }
}

/// Process a single input
pub async fn process_input(
    downloader: &Downloader,
    input: &str,
    mode: InputMode,
    output_dir: Option<&Path>,
) -> Result<DownloadOutcome, DownloadError> {
    match mode {
        InputMode::Url => downloader.download_from_url(input, output_dir).await,
        InputMode::Screenshot => {
            let image = ImageSource::Path(PathBuf::from(input));
            downloader.download_from_screenshot(&image, output_dir).await
        }
    }
}

/// Process inputs strictly in order; one item's failure does not stop the rest
pub async fn run_batch(
    downloader: &Downloader,
    inputs: &[String],
    mode: InputMode,
    output_dir: Option<&Path>,
    gate: &RateLimitGate,
) -> BatchSummary {
    let mut summary = BatchSummary::default();

    for (i, input) in inputs.iter().enumerate() {
        tracing::info!("[{}/{}] Processing: {}", i + 1, inputs.len(), input);

        match process_input(downloader, input, mode, output_dir).await {
            Ok(outcome) => {
                summary.succeeded += 1;
                let is_last = i + 1 == inputs.len();
                if outcome.platform.rate_limited() && !is_last {
                    gate.pause().await;
                }
            }
            Err(e) => {
                summary.failed += 1;
                tracing::warn!(code = e.code(), "Failed to process {}: {}", input, e);
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_within_range() {
        let gate = RateLimitGate::default();
        for _ in 0..100 {
            let d = gate.next_delay();
            assert!(d >= Duration::from_secs(3) && d < Duration::from_secs(6), "{:?}", d);
        }
    }

    #[test]
    fn test_disabled_gate() {
        assert_eq!(RateLimitGate::disabled().next_delay(), Duration::ZERO);
    }

    #[test]
    fn test_summary() {
        assert!(BatchSummary { succeeded: 3, failed: 0 }.all_succeeded());
        assert!(!BatchSummary { succeeded: 3, failed: 1 }.all_succeeded());
    }
}
