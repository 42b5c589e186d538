// Helper functions shared by locators, the transfer and the orchestrator

use lazy_static::lazy_static;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

use crate::downloader::errors::DownloadError;
use crate::downloader::models::NetworkConfig;

/// Longest title (in characters) used as a file name
pub const MAX_TITLE_CHARS: usize = 50;

/// Title used when sanitizing leaves nothing
pub const FALLBACK_TITLE: &str = "video";

/// Extension of every downloaded file
pub const OUTPUT_EXTENSION: &str = "mp4";

lazy_static! {
    static ref HTML_TAG_RE: Regex = Regex::new(r"<[^>]+>").unwrap();
    static ref INVALID_CHARS_RE: Regex = Regex::new(r#"[<>:"/\\|?*\n\r]"#).unwrap();
}

/// Remove HTML tags, keeping the text between them
pub fn strip_html_tags(text: &str) -> String {
    HTML_TAG_RE.replace_all(text, "").into_owned()
}

/// Turn arbitrary text into a safe, bounded file name (without extension).
///
/// Strips HTML tags and path-breaking characters, trims, and keeps at most
/// `MAX_TITLE_CHARS` characters. Empty results become `FALLBACK_TITLE`.
pub fn sanitize_filename(text: &str) -> String {
    sanitize_filename_or(text, FALLBACK_TITLE)
}

/// Same as `sanitize_filename` with a caller-chosen replacement for empty results
pub fn sanitize_filename_or(text: &str, fallback: &str) -> String {
    let bounded = sanitize_bounded(text);
    if bounded.is_empty() {
        let fallback = sanitize_bounded(fallback);
        if fallback.is_empty() {
            FALLBACK_TITLE.to_string()
        } else {
            fallback
        }
    } else {
        bounded
    }
}

fn sanitize_bounded(text: &str) -> String {
    let without_tags = strip_html_tags(text);
    let cleaned = INVALID_CHARS_RE.replace_all(&without_tags, "");
    let bounded: String = cleaned.trim().chars().take(MAX_TITLE_CHARS).collect();
    bounded.trim_end().to_string()
}

/// First free path of the form `<stem>.<ext>`, `<stem>_1.<ext>`, `<stem>_2.<ext>`, ...
///
/// Only checks the filesystem at call time; nothing is reserved.
pub fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter: u32 = 1;
    loop {
        let candidate = parent.join(format!("{}_{}{}", stem, counter, ext));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// `<dir>/<title>.mp4`, suffixed until it does not collide
pub fn output_path_for(dir: &Path, title: &str) -> PathBuf {
    unique_path(&dir.join(format!("{}.{}", title, OUTPUT_EXTENSION)))
}

/// Human-readable file size ("3.4 MB", "512.0 KB")
pub fn format_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    }
}

/// Decode JSON string escapes (`\u002F`, `\/`, ...) in a value captured from page source.
///
/// Falls back to the raw text when it is not a valid JSON string body.
pub fn unescape_json_fragment(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{}\"", raw)).unwrap_or_else(|_| raw.to_string())
}

/// Build an HTTP client with session headers, a per-request timeout and the optional proxy
pub fn build_http_client(
    headers: &[(&str, &str)],
    timeout_secs: u64,
    network: &NetworkConfig,
) -> Result<reqwest::Client, DownloadError> {
    let mut header_map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| DownloadError::UpstreamError(format!("Invalid header name {}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| DownloadError::UpstreamError(format!("Invalid header value: {}", e)))?;
        header_map.insert(name, value);
    }

    let mut builder = reqwest::Client::builder()
        .default_headers(header_map)
        .timeout(Duration::from_secs(timeout_secs));

    if let Some(proxy_url) = network.proxy.as_deref() {
        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|e| DownloadError::InvalidUrl(format!("proxy {}: {}", proxy_url, e)))?;
        tracing::debug!(proxy = proxy_url, "Using proxy");
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| DownloadError::UpstreamError(format!("Failed to build HTTP client: {}", e)))
}

/// Follow redirects and return the final URL
pub async fn resolve_redirect(
    client: &reqwest::Client,
    url: &str,
    timeout_secs: u64,
) -> Result<String, DownloadError> {
    let response = client
        .get(url)
        .timeout(Duration::from_secs(timeout_secs))
        .send()
        .await
        .map_err(|e| DownloadError::redirect(url, e))?;

    let resolved = response.url().to_string();
    tracing::info!("Resolved URL: {}", resolved);
    Ok(resolved)
}

/// Run command with timeout, killing the child if it overruns
pub async fn run_output_with_timeout(
    program: &str,
    args: Vec<String>,
    timeout_secs: u64,
) -> Result<std::process::Output, DownloadError> {
    let mut child = TokioCommand::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| DownloadError::ToolNotFound(format!("Failed to start {}: {}", program, e)))?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| DownloadError::UpstreamError(format!("Failed to capture stdout from {}", program)))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| DownloadError::UpstreamError(format!("Failed to capture stderr from {}", program)))?;

    // Drain both pipes before waiting; a full pipe blocks the child
    let collect = async {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let (out_res, err_res) = tokio::join!(
            stdout_pipe.read_to_end(&mut stdout),
            stderr_pipe.read_to_end(&mut stderr)
        );
        out_res?;
        err_res?;
        let status = child.wait().await?;
        Ok::<_, std::io::Error>(std::process::Output { status, stdout, stderr })
    };

    match timeout(Duration::from_secs(timeout_secs), collect).await {
        Ok(output) => output.map_err(|e| DownloadError::UpstreamError(format!("{} failed: {}", program, e))),
        Err(_) => Err(DownloadError::UpstreamError(format!(
            "{} timed out after {}s",
            program, timeout_secs
        ))),
    }
}
