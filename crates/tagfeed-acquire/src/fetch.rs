use std::collections::TryReserveError;

use reqwest::redirect;
use tagfeed_model::{FeedConfig, FetchedFeed};
use thiserror::Error;

/// Redirect hops followed before reqwest gives up.
const MAX_REDIRECTS: usize = 10;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to initialise HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("transfer from {url} failed: {source}")]
    Transfer {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error(
        "out of memory growing feed buffer for {url} \
         ({received} bytes received, {requested} more requested)"
    )]
    BufferExhausted {
        url: String,
        received: usize,
        requested: usize,
        #[source]
        source: TryReserveError,
    },
}

/// Download `url` in full.
///
/// Redirects are followed. The body is accumulated chunk by chunk; a failed
/// allocation aborts the transfer rather than returning what arrived so far.
///
/// Only transport problems are errors. A non-success status is logged and its
/// body returned unchanged, and an empty body is a valid (if useless) feed.
pub async fn fetch(config: &FeedConfig, url: &str) -> Result<FetchedFeed, FetchError> {
    let client = build_client(config)?;

    tracing::info!(url = %url, "Fetching feed");
    let mut response = client
        .get(url)
        .send()
        .await
        .map_err(|source| transfer_error(url, source))?;

    let status = response.status();
    if response.url().as_str() != url {
        tracing::debug!(from = %url, to = %response.url(), "Followed redirect");
    }
    if !status.is_success() {
        tracing::warn!(
            status = %status,
            url = %url,
            "Feed server returned a non-success status"
        );
    }

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|source| transfer_error(url, source))?
    {
        append_chunk(&mut body, &chunk).map_err(|source| FetchError::BufferExhausted {
            url: url.to_string(),
            received: body.len(),
            requested: chunk.len(),
            source,
        })?;
        tracing::trace!(chunk = chunk.len(), total = body.len(), "Received chunk");
    }

    tracing::info!(
        bytes = body.len(),
        status = status.as_u16(),
        "Received feed"
    );
    Ok(FetchedFeed::new(url, body, status.as_u16()))
}

fn build_client(config: &FeedConfig) -> Result<reqwest::Client, FetchError> {
    let mut builder = reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .redirect(redirect::Policy::limited(MAX_REDIRECTS));

    if let Some(timeout) = config.timeout {
        tracing::debug!(?timeout, "Request timeout set");
        builder = builder.timeout(timeout);
    }

    builder.build().map_err(FetchError::Client)
}

fn transfer_error(url: &str, source: reqwest::Error) -> FetchError {
    if source.is_timeout() {
        tracing::debug!(url = %url, "Request timed out");
    }
    FetchError::Transfer {
        url: url.to_string(),
        source,
    }
}

/// Grow `body` by exactly `chunk`, reporting allocation failure instead of
/// aborting the process.
fn append_chunk(body: &mut Vec<u8>, chunk: &[u8]) -> Result<(), TryReserveError> {
    body.try_reserve(chunk.len())?;
    body.extend_from_slice(chunk);
    Ok(())
}
