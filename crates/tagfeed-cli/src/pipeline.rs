use std::path::PathBuf;

use tagfeed_acquire::FetchError;
use tagfeed_model::FeedConfig;
use tagfeed_parse::ParseError;
use tagfeed_render::RenderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to download feed for '{tag}': {source}")]
    Fetch {
        tag: String,
        #[source]
        source: FetchError,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl PipelineError {
    /// Process exit status for this failure. Usage errors (2) never get this
    /// far; clap exits on its own.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::Fetch { .. } => 1,
            PipelineError::Parse(ParseError::UnparsableDocument { .. }) => 3,
            PipelineError::Parse(ParseError::QueryExecution(_)) => 4,
            PipelineError::Parse(ParseError::CountMismatch { .. }) => 5,
            PipelineError::Render(_) => 6,
        }
    }
}

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub url: String,
    pub status: u16,
    pub bytes: usize,
    pub items: usize,
    pub output_path: PathBuf,
}

/// Fetch the feed for `tag`, extract its items and write the listing.
///
/// Stages run strictly in order and the first failure ends the run. The
/// output file is only opened once the feed has parsed, so a failed fetch or
/// a broken document leaves any previous listing in place.
pub async fn run(config: &FeedConfig, tag: &str) -> Result<PipelineReport, PipelineError> {
    let url = tagfeed_acquire::feed_url(&config.feed_base_url, tag);

    let feed = tagfeed_acquire::fetch(config, &url)
        .await
        .map_err(|source| PipelineError::Fetch {
            tag: tag.to_string(),
            source,
        })?;

    let parsed = tagfeed_parse::parse_with(&feed, config)?;
    let items = tagfeed_render::render(&config.output_path, &parsed.links, &parsed.titles)?;

    Ok(PipelineReport {
        url,
        status: feed.status,
        bytes: feed.len(),
        items,
        output_path: config.output_path.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rss(items: &[(&str, &str)]) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\"?>\n<rss version=\"2.0\"><channel><title>Tag</title><link>https://feeds/</link>\n",
        );
        for (title, link) in items {
            xml.push_str(&format!("<item><title>{title}</title><link>{link}</link></item>\n"));
        }
        xml.push_str("</channel></rss>\n");
        xml
    }

    async fn serve(tag: &str, body: impl Into<String>) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/feed/tag/{tag}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(body.into()))
            .mount(&server)
            .await;
        server
    }

    fn config_for(server: &MockServer, output: &Path) -> FeedConfig {
        FeedConfig {
            output_path: output.to_path_buf(),
            ..FeedConfig::with_base_url(format!("{}/feed/tag/", server.uri()))
        }
    }

    #[tokio::test]
    async fn test_run_writes_one_line_per_item() {
        let server = serve(
            "rust",
            rss(&[
                ("Ownership", "https://medium.com/p/1"),
                ("Lifetimes", "https://medium.com/p/2"),
                ("Traits", "https://medium.com/p/3"),
            ]),
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("index.html");

        let report = run(&config_for(&server, &output), "rust").await.unwrap();

        assert_eq!(report.items, 3);
        assert_eq!(report.url, format!("{}/feed/tag/rust", server.uri()));
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "<a href=\"https://medium.com/p/1\">Ownership</a><br>\n\
             <a href=\"https://medium.com/p/2\">Lifetimes</a><br>\n\
             <a href=\"https://medium.com/p/3\">Traits</a><br>\n"
        );
    }

    #[tokio::test]
    async fn test_zero_items_leaves_empty_file() {
        let server = serve("quiet", rss(&[])).await;
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("index.html");

        let report = run(&config_for(&server, &output), "quiet").await.unwrap();

        assert_eq!(report.items, 0);
        assert_eq!(fs::read(&output).unwrap(), b"");
    }

    #[tokio::test]
    async fn test_malformed_feed_leaves_output_untouched() {
        let server = serve("broken", "<rss><channel><item><title>x</channel>").await;
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("index.html");
        fs::write(&output, "previous run\n").unwrap();

        let err = run(&config_for(&server, &output), "broken").await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Parse(ParseError::UnparsableDocument { .. })
        ));
        assert_eq!(err.exit_code(), 3);
        assert_eq!(fs::read_to_string(&output).unwrap(), "previous run\n");
    }

    #[tokio::test]
    async fn test_transport_failure_writes_nothing() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("index.html");
        let config = FeedConfig {
            output_path: output.clone(),
            ..FeedConfig::with_base_url(format!("http://127.0.0.1:{port}/feed/tag/"))
        };

        let err = run(&config, "rust").await.unwrap_err();

        assert!(matches!(err, PipelineError::Fetch { .. }));
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("'rust'"));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_rerun_is_byte_identical() {
        let server = serve(
            "rust",
            rss(&[("A &amp; B", "https://x/1"), ("C", "https://x/2")]),
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("index.html");
        let config = config_for(&server, &output);

        run(&config, "rust").await.unwrap();
        let first = fs::read(&output).unwrap();
        run(&config, "rust").await.unwrap();
        let second = fs::read(&output).unwrap();

        assert_eq!(first, second);
        assert!(String::from_utf8(first).unwrap().contains(">A & B</a>"));
    }

    #[tokio::test]
    async fn test_count_mismatch_policy() {
        let body = "<rss><channel>\
            <item><title>A</title><link>https://x/1</link></item>\
            <item><title>B</title></item>\
            <item><title>C</title></item>\
            </channel></rss>";
        let server = serve("uneven", body).await;
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("index.html");

        let config = config_for(&server, &output);
        let report = run(&config, "uneven").await.unwrap();
        assert_eq!(report.items, 1);
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "<a href=\"https://x/1\">A</a><br>\n"
        );

        let strict = FeedConfig {
            strict_pairing: true,
            ..config
        };
        let err = run(&strict, "uneven").await.unwrap_err();
        assert_eq!(err.exit_code(), 5);
    }

    #[tokio::test]
    async fn test_bad_query_exit_code() {
        let server = serve("rust", rss(&[("A", "https://x/1")])).await;
        let dir = tempfile::tempdir().unwrap();
        let config = FeedConfig {
            title_path: "item/title".into(),
            ..config_for(&server, &dir.path().join("index.html"))
        };

        let err = run(&config, "rust").await.unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[tokio::test]
    async fn test_unwritable_output_exit_code() {
        let server = serve("rust", rss(&[("A", "https://x/1")])).await;
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("no-such-dir").join("index.html");

        let err = run(&config_for(&server, &output), "rust").await.unwrap_err();
        assert!(matches!(err, PipelineError::Render(RenderError::Open { .. })));
        assert_eq!(err.exit_code(), 6);
    }
}
