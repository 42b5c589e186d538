// Downloader module - screenshot / URL to local video file

pub mod batch;
pub mod errors;
pub mod extractors;
pub mod models;
pub mod orchestrator;
pub mod platform;
pub mod qr;
pub mod traits;
pub mod transfer;
pub mod utils;

pub use batch::{process_input, run_batch, BatchSummary, InputMode, RateLimitGate};
pub use errors::DownloadError;
pub use models::{
    DownloadOutcome, ImageSource, MediaResolution, NetworkConfig, PlannedDownload, PlatformTag,
    PostReference, TransferRequest,
};
pub use orchestrator::{Downloader, DownloaderConfig};
pub use qr::{QrDecoder, QrStage};
pub use traits::{ConsoleProgress, MediaTransfer, NoProgress, ProgressSink};
pub use transfer::{HttpTransfer, TransferConfig};
