// Failure diagnostics - classifies extraction engine errors
//
// Analyzes error messages to determine:
// - Type of blocking (rate limit, login wall, unavailable content, ...)
// - Whether a retry with cookies is worth it
// - What to tell the user when it still fails

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Status codes only count when the message reports them as an HTTP status;
    // post ids and shortcodes may contain the same digits.
    static ref HTTP_429_RE: Regex =
        Regex::new(r"(?:http error|status(?: code)?|response code)\s*:?\s*429\b").unwrap();
    static ref HTTP_403_RE: Regex =
        Regex::new(r"(?:http error|status(?: code)?|response code)\s*:?\s*403\b").unwrap();
}

/// Reasons why a platform might refuse an extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockingReason {
    /// Rate limiting (429 or platform-specific wording)
    RateLimited,

    /// Content requires a logged-in session
    LoginRequired,

    /// Platform reports the content as unavailable (often a disguised login wall)
    ContentUnavailable,

    /// Captcha / challenge pages
    BotDetection,

    /// HTTP 403 Forbidden - general access denied
    Http403Forbidden,

    /// Geographic restriction
    GeoBlocked,

    /// Network timeout (soft IP block)
    NetworkTimeout,

    /// Generic/unknown failure
    Unknown,
}

impl BlockingReason {
    /// Whether a second attempt with cookies should be made
    pub fn retry_with_cookies(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::LoginRequired | Self::ContentUnavailable
        )
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::RateLimited => "Rate limited by the platform",
            Self::LoginRequired => "Login required",
            Self::ContentUnavailable => "Requested content is not available",
            Self::BotDetection => "Bot detection triggered",
            Self::Http403Forbidden => "Access denied (HTTP 403)",
            Self::GeoBlocked => "Geographic restriction",
            Self::NetworkTimeout => "Network timeout (possible IP throttling)",
            Self::Unknown => "Unknown failure",
        }
    }

    /// What the user can try next
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::RateLimited => {
                "What to try:\n\
                 1) Wait 10-15 minutes\n\
                 2) Pass --cookies-from-browser with a logged-in browser\n\
                 3) Use a different IP (--proxy)"
            }
            Self::LoginRequired | Self::ContentUnavailable => {
                "What to try:\n\
                 1) Log in to the platform in your browser\n\
                 2) Pass --cookies-from-browser <browser> or --cookies <file>"
            }
            Self::BotDetection => {
                "What to try:\n\
                 1) Open the post in your browser and solve the challenge\n\
                 2) Retry with cookies from that browser"
            }
            Self::Http403Forbidden => {
                "What to try:\n\
                 1) Refresh your cookies (re-login)\n\
                 2) Use a proxy (--proxy)"
            }
            Self::GeoBlocked => {
                "What to try:\n\
                 1) Use a proxy in an allowed region (--proxy)"
            }
            Self::NetworkTimeout => {
                "What to try:\n\
                 1) Check your internet connection\n\
                 2) Try again later"
            }
            Self::Unknown => {
                "What to try:\n\
                 1) Check the post URL\n\
                 2) Update yt-dlp\n\
                 3) Try again later"
            }
        }
    }
}

/// Analyze error message and return blocking reason
pub fn diagnose_error(error: &str) -> Option<BlockingReason> {
    let lower = error.to_lowercase();

    // Check patterns in order of specificity

    if lower.contains("rate-limit")
        || lower.contains("rate limit")
        || lower.contains("too many requests")
        || HTTP_429_RE.is_match(&lower)
    {
        return Some(BlockingReason::RateLimited);
    }

    if lower.contains("login required")
        || lower.contains("login_required")
        || lower.contains("log in to")
        || lower.contains("without being logged-in")
        || lower.contains("for the authentication")
    {
        return Some(BlockingReason::LoginRequired);
    }

    if lower.contains("requested content is not available") {
        return Some(BlockingReason::ContentUnavailable);
    }

    if lower.contains("captcha")
        || lower.contains("checkpoint_required")
        || lower.contains("challenge_required")
        || lower.contains("unusual traffic")
    {
        return Some(BlockingReason::BotDetection);
    }

    if HTTP_403_RE.is_match(&lower) || lower.contains("forbidden") {
        return Some(BlockingReason::Http403Forbidden);
    }

    if lower.contains("not available in your country") || lower.contains("geo restrict") {
        return Some(BlockingReason::GeoBlocked);
    }

    if lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connection refused")
        || lower.contains("network unreachable")
    {
        return Some(BlockingReason::NetworkTimeout);
    }

    if !error.trim().is_empty() {
        return Some(BlockingReason::Unknown);
    }

    None
}
