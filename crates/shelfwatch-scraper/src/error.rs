use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("blocked at {url} (marker {marker:?})")]
    Blocked { url: String, marker: String },

    #[error("malformed price text {raw:?}")]
    MalformedPrice { raw: String },

    #[error("could not start acquisition session: {0}")]
    SessionAcquisition(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid selector \"{selector}\": {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("browser error: {0}")]
    Browser(String),

    #[error("timed out after {secs}s waiting for {what}")]
    Timeout { what: String, secs: u64 },

    #[error("failed to write crawl feed {path}: {source}")]
    FeedIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize crawl feed: {0}")]
    FeedSerialize(#[from] serde_json::Error),
}
