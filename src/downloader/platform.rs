// Platform classifier - maps a post URL to the platform that serves it

use super::errors::DownloadError;
use super::models::{PlatformTag, PostReference};

/// Domain fragments checked in order; first match wins
const DOMAIN_TABLE: &[(&str, PlatformTag)] = &[
    ("weibo.com", PlatformTag::Weibo),
    ("weibo.cn", PlatformTag::Weibo),
    ("xiaohongshu.com", PlatformTag::Xiaohongshu),
    ("xhslink.com", PlatformTag::Xiaohongshu),
    ("instagram.com", PlatformTag::Instagram),
];

/// Short-link hosts whose target must be found by following redirects
pub const SHORT_LINK_DOMAINS: &[&str] = &["xhslink.com"];

/// Classify a URL by case-insensitive substring match against the domain table.
///
/// The URL is not normalized or parsed, so a fragment anywhere in the string counts.
pub fn classify(url: &str) -> Result<PlatformTag, DownloadError> {
    let lower = url.to_lowercase();

    DOMAIN_TABLE
        .iter()
        .find(|(fragment, _)| lower.contains(fragment))
        .map(|(_, tag)| *tag)
        .ok_or_else(|| DownloadError::UnknownPlatform(url.to_string()))
}

/// Classify and bind the URL to its tag
pub fn post_reference(url: &str) -> Result<PostReference, DownloadError> {
    let platform = classify(url)?;
    Ok(PostReference::new(url.to_string(), platform))
}

/// Check if the URL points at a known short-link host
pub fn is_short_link(url: &str) -> bool {
    let lower = url.to_lowercase();
    SHORT_LINK_DOMAINS.iter().any(|d| lower.contains(d))
}
