// HTTP transfer - streams the media body to the destination file

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::errors::DownloadError;
use super::models::{NetworkConfig, TransferRequest};
use super::traits::{MediaTransfer, ProgressSink};
use super::utils::build_http_client;

/// Device identifier sent with every media request
pub const DEVICE_USER_AGENT: &str =
    "Mozilla/5.0 (iPhone; CPU iPhone OS 16_0 like Mac OS X) AppleWebKit/605.1.15";

#[derive(Debug, Clone)]
pub struct TransferConfig {
    pub user_agent: String,
    /// Whole-transfer timeout in seconds
    pub timeout: u64,
    pub network: NetworkConfig,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            user_agent: DEVICE_USER_AGENT.to_string(),
            timeout: 120,
            network: NetworkConfig::default(),
        }
    }
}

impl TransferConfig {
    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }
}

pub struct HttpTransfer {
    client: reqwest::Client,
}

impl HttpTransfer {
    pub fn new(config: &TransferConfig) -> Result<Self, DownloadError> {
        let client = build_http_client(
            &[("User-Agent", config.user_agent.as_str())],
            config.timeout,
            &config.network,
        )?;
        Ok(Self { client })
    }

    async fn stream_to_file(
        &self,
        request: &TransferRequest,
        progress: &dyn ProgressSink,
    ) -> Result<u64, DownloadError> {
        let mut req = self.client.get(&request.media_url);
        if let Some(referer) = &request.referer {
            req = req.header(reqwest::header::REFERER, referer);
        }

        let mut response = req
            .send()
            .await
            .map_err(|e| DownloadError::FetchFailure(format!("{}: {}", request.media_url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::FetchFailure(format!(
                "{} returned HTTP {}",
                request.media_url, status
            )));
        }

        let total = response.content_length();
        let mut file = tokio::fs::File::create(&request.destination).await?;

        // From here on the destination is ours; drop it if the body never completes
        match write_body(&mut response, &mut file, total, progress).await {
            Ok(downloaded) => Ok(downloaded),
            Err(e) => {
                drop(file);
                if let Err(rm) = tokio::fs::remove_file(&request.destination).await {
                    tracing::warn!(
                        "Could not remove partial file {}: {}",
                        request.destination.display(),
                        rm
                    );
                }
                Err(e)
            }
        }
    }
}

async fn write_body(
    response: &mut reqwest::Response,
    file: &mut tokio::fs::File,
    total: Option<u64>,
    progress: &dyn ProgressSink,
) -> Result<u64, DownloadError> {
    let mut downloaded = 0u64;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| DownloadError::FetchFailure(format!("stream interrupted: {}", e)))?
    {
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        progress.update(downloaded, total);
    }
    file.flush().await?;
    Ok(downloaded)
}

#[async_trait]
impl MediaTransfer for HttpTransfer {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn transfer(
        &self,
        request: &TransferRequest,
        progress: &dyn ProgressSink,
    ) -> Result<u64, DownloadError> {
        tracing::debug!("GET {} -> {}", request.media_url, request.destination.display());

        let result = self.stream_to_file(request, progress).await;
        progress.finish();
        result
    }
}
