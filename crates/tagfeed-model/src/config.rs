use std::path::PathBuf;
use std::time::Duration;

/// Feed service the tag is appended to.
pub const DEFAULT_FEED_BASE_URL: &str = "https://medium.com/feed/tag/";

/// Where the rendered listing is written, relative to the working directory.
pub const DEFAULT_OUTPUT_PATH: &str = "index.html";

/// Node path selecting item titles.
pub const DEFAULT_TITLE_PATH: &str = "//item/title";

/// Node path selecting item links.
pub const DEFAULT_LINK_PATH: &str = "//item/link";

/// Everything one pipeline run needs, passed explicitly into each stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// Base URL; the tag is appended verbatim.
    pub feed_base_url: String,
    /// Output file, truncated on every successful run.
    pub output_path: PathBuf,
    /// Whole-request timeout. `None` lets the fetch block indefinitely.
    pub timeout: Option<Duration>,
    pub user_agent: String,
    /// Fail when the title and link node-sets differ in length instead of
    /// pairing them up to the shorter count.
    pub strict_pairing: bool,
    pub title_path: String,
    pub link_path: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            feed_base_url: DEFAULT_FEED_BASE_URL.to_string(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            timeout: None,
            user_agent: default_user_agent(),
            strict_pairing: false,
            title_path: DEFAULT_TITLE_PATH.to_string(),
            link_path: DEFAULT_LINK_PATH.to_string(),
        }
    }
}

impl FeedConfig {
    /// Start from the defaults with a different feed service.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            feed_base_url: base_url.into(),
            ..Self::default()
        }
    }
}

pub fn default_user_agent() -> String {
    format!("tagfeed/{} (feed listing tool)", env!("CARGO_PKG_VERSION"))
}
