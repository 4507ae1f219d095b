use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tagfeed_model::{pair_items, FeedItem, NodeSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot open {} for writing: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed writing {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Write one anchor line per item to `path`, replacing whatever was there.
///
/// Returns the number of lines written.
pub fn render(path: &Path, links: &NodeSet, titles: &NodeSet) -> Result<usize, RenderError> {
    let file = File::create(path).map_err(|source| RenderError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut out = BufWriter::new(file);
    let written = write_anchors(&mut out, links, titles)
        .and_then(|n| out.flush().map(|_| n))
        .map_err(|source| RenderError::Write {
            path: path.to_path_buf(),
            source,
        })?;

    tracing::info!(path = %path.display(), items = written, "Wrote HTML listing");
    Ok(written)
}

/// Write the anchor lines for `titles`/`links` to any writer.
///
/// Pairing follows [`pair_items`]: it is driven by the title count and stops
/// at the first title without a link.
pub fn write_anchors<W: Write>(
    out: &mut W,
    links: &NodeSet,
    titles: &NodeSet,
) -> io::Result<usize> {
    if titles.len() != links.len() {
        tracing::warn!(
            titles = titles.len(),
            links = links.len(),
            "Title and link counts differ; pairing by position"
        );
    }

    let mut written = 0;
    for item in pair_items(links, titles) {
        write_anchor(out, item)?;
        written += 1;
    }

    if written < titles.len() {
        tracing::warn!(
            dropped = titles.len() - written,
            "Titles without a link were skipped"
        );
    }
    Ok(written)
}

// Text is embedded verbatim. A title or link containing markup ends up in
// the output as markup.
fn write_anchor<W: Write>(out: &mut W, item: FeedItem<'_>) -> io::Result<()> {
    writeln!(out, "<a href=\"{}\">{}</a><br>", item.link, item.title)
}
