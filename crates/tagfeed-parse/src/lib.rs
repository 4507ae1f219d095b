use tagfeed_model::{FeedConfig, FetchedFeed, NodeSet, ParsedFeed};
use thiserror::Error;

mod document;
pub mod path;

pub use path::{NodePath, PathError};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unable to parse feed from {source_url}: {reason} (byte {position})")]
    UnparsableDocument {
        source_url: String,
        position: u64,
        reason: String,
    },

    #[error("unable to evaluate node query: {0}")]
    QueryExecution(#[from] PathError),

    #[error("feed from {source_url} has {titles} titles but {links} links")]
    CountMismatch {
        source_url: String,
        titles: usize,
        links: usize,
    },
}

/// Extract the title and link node-sets from a feed using the queries and
/// pairing policy in `config`.
pub fn parse_with(feed: &FetchedFeed, config: &FeedConfig) -> Result<ParsedFeed, ParseError> {
    let parsed = parse(feed, &config.title_path, &config.link_path)?;

    if config.strict_pairing && !parsed.is_balanced() {
        return Err(ParseError::CountMismatch {
            source_url: feed.source_url.clone(),
            titles: parsed.titles.len(),
            links: parsed.links.len(),
        });
    }

    Ok(parsed)
}

/// Parse the feed body as XML and evaluate both queries against it.
///
/// A document that is not well-formed is reported before any problem with
/// the queries. Finding nothing is not an error, and the two node-sets are
/// returned as found even if their lengths differ.
pub fn parse(
    feed: &FetchedFeed,
    title_query: &str,
    link_query: &str,
) -> Result<ParsedFeed, ParseError> {
    tracing::debug!(url = %feed.source_url, bytes = feed.len(), "Parsing feed");

    let queries = NodePath::compile(title_query)
        .and_then(|title| NodePath::compile(link_query).map(|link| (title, link)));

    let (title_path, link_path) = match queries {
        Ok(paths) => paths,
        Err(err) => {
            // Still report a broken document first.
            document::evaluate(&feed.body, &[]).map_err(|e| unparsable(feed, e))?;
            return Err(err.into());
        }
    };

    let mut sets = document::evaluate(&feed.body, &[&title_path, &link_path])
        .map_err(|e| unparsable(feed, e))?
        .into_iter();

    let titles = NodeSet {
        query: title_path.to_string(),
        nodes: sets.next().unwrap_or_default(),
    };
    let links = NodeSet {
        query: link_path.to_string(),
        nodes: sets.next().unwrap_or_default(),
    };

    tracing::info!(
        titles = titles.len(),
        links = links.len(),
        "Extracted feed items"
    );
    Ok(ParsedFeed { titles, links })
}

fn unparsable(feed: &FetchedFeed, err: document::SyntaxError) -> ParseError {
    ParseError::UnparsableDocument {
        source_url: feed.source_url.clone(),
        position: err.position,
        reason: err.reason,
    }
}
