// Command-line surface

use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::downloader::extractors::InstagramConfig;
use crate::downloader::{
    process_input, run_batch, Downloader, DownloaderConfig, InputMode, NetworkConfig,
    RateLimitGate,
};

#[derive(Parser, Debug)]
#[command(
    name = "reel-fetch",
    version,
    about = "Download Xiaohongshu, Weibo and Instagram videos from QR screenshots or post URLs"
)]
pub struct Cli {
    /// Screenshot path(s), or post URL(s) with --url
    #[arg(required = true)]
    pub inputs: Vec<String>,

    /// Output directory (default: the screenshot's folder, or the current directory for URLs)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Treat inputs as post URLs instead of screenshots
    #[arg(short, long)]
    pub url: bool,

    /// Process several inputs one after another
    #[arg(short, long)]
    pub batch: bool,

    /// Browser to read Instagram cookies from (chrome, firefox, safari, ...)
    #[arg(long, value_name = "BROWSER")]
    pub cookies_from_browser: Option<String>,

    /// Netscape cookies.txt for Instagram
    #[arg(long, value_name = "FILE")]
    pub cookies: Option<PathBuf>,

    /// Proxy URL (http://host:port or socks5://host:port)
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    fn mode(&self) -> InputMode {
        if self.url {
            InputMode::Url
        } else {
            InputMode::Screenshot
        }
    }

    fn downloader_config(&self) -> DownloaderConfig {
        let mut instagram = InstagramConfig::default();
        if let Some(browser) = &self.cookies_from_browser {
            instagram = instagram.with_cookies_from_browser(browser.clone());
        }
        if let Some(file) = &self.cookies {
            instagram = instagram.with_cookies_file(file.clone());
        }

        DownloaderConfig::default()
            .with_network(NetworkConfig {
                proxy: self.proxy.clone(),
                ..NetworkConfig::default()
            })
            .with_instagram(instagram)
    }
}

/// Initialize tracing: `info` by default, `debug` with -v, RUST_LOG wins
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

pub fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.inputs.len() > 1 && !cli.batch {
        Cli::command()
            .error(
                clap::error::ErrorKind::ArgumentConflict,
                "multiple inputs require --batch",
            )
            .exit();
    }

    init_tracing(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> ExitCode {
    let downloader = match Downloader::new(cli.downloader_config()) {
        Ok(d) => d,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let mode = cli.mode();
    let output_dir = cli.output.as_deref();

    if cli.batch {
        let summary = run_batch(
            &downloader,
            &cli.inputs,
            mode,
            output_dir,
            &RateLimitGate::default(),
        )
        .await;
        println!(
            "Batch complete: {} succeeded, {} failed",
            summary.succeeded, summary.failed
        );
        return if summary.all_succeeded() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
    }

    match process_input(&downloader, &cli.inputs[0], mode, output_dir).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::extractors::CookieSource;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_batch_url_mode() {
        let cli = Cli::try_parse_from([
            "reel-fetch",
            "-b",
            "-u",
            "-o",
            "/tmp/out",
            "https://weibo.com/1/2",
            "https://www.instagram.com/p/x/",
        ])
        .unwrap();
        assert!(cli.batch);
        assert_eq!(cli.mode(), InputMode::Url);
        assert_eq!(cli.inputs.len(), 2);
        assert_eq!(cli.output, Some(PathBuf::from("/tmp/out")));
    }

    #[test]
    fn test_inputs_required() {
        assert!(Cli::try_parse_from(["reel-fetch"]).is_err());
    }

    #[test]
    fn test_credentials_and_proxy_reach_config() {
        let cli = Cli::try_parse_from([
            "reel-fetch",
            "--cookies-from-browser",
            "firefox",
            "--proxy",
            "socks5://127.0.0.1:1080",
            "shot.png",
        ])
        .unwrap();
        let config = cli.downloader_config();

        assert_eq!(cli.mode(), InputMode::Screenshot);
        assert_eq!(
            config.instagram.cookie_source(),
            CookieSource::Browser("firefox".to_string())
        );
        assert_eq!(config.network.proxy.as_deref(), Some("socks5://127.0.0.1:1080"));
        assert_eq!(
            config.weibo.network.proxy.as_deref(),
            Some("socks5://127.0.0.1:1080")
        );
    }
}
