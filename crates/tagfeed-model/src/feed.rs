/// A downloaded feed document, held entirely in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFeed {
    /// URL the request was issued against (before redirects). Only used to
    /// label diagnostics.
    pub source_url: String,
    /// Raw response body exactly as received.
    pub body: Vec<u8>,
    /// HTTP status of the final response.
    pub status: u16,
    /// RFC 3339 UTC timestamp taken when the transfer completed.
    pub fetched_at: String,
}

impl FetchedFeed {
    pub fn new(source_url: impl Into<String>, body: Vec<u8>, status: u16) -> Self {
        Self {
            source_url: source_url.into(),
            body,
            status,
            fetched_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Exact byte count of the body.
    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len_counts_body_bytes() {
        let feed = FetchedFeed::new("https://example.com/feed/tag/rust", b"<rss/>".to_vec(), 200);
        assert_eq!(feed.len(), 6);
        assert!(!feed.is_empty());
        assert!(chrono::DateTime::parse_from_rfc3339(&feed.fetched_at).is_ok());
    }

    #[test]
    fn test_empty_body() {
        let feed = FetchedFeed::new("https://example.com/", Vec::new(), 200);
        assert_eq!(feed.len(), 0);
        assert!(feed.is_empty());
    }
}
