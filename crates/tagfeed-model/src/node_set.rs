/// The text contents of every node one query matched, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSet {
    /// Query that produced this set, kept for log and error messages.
    pub query: String,
    pub nodes: Vec<String>,
}

impl NodeSet {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            nodes: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.nodes.get(index).map(String::as_str)
    }
}

/// One article: a title paired with the link at the same position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedItem<'a> {
    pub title: &'a str,
    pub link: &'a str,
}

/// Both node-sets extracted from a feed document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFeed {
    pub titles: NodeSet,
    pub links: NodeSet,
}

impl ParsedFeed {
    /// Whether every title has exactly one link at the same index.
    pub fn is_balanced(&self) -> bool {
        self.titles.len() == self.links.len()
    }

    /// Items paired by index. See [`pair_items`].
    pub fn items(&self) -> impl Iterator<Item = FeedItem<'_>> {
        pair_items(&self.links, &self.titles)
    }
}

/// Pair titles with links by position.
///
/// Iteration is driven by the title count. Pairing stops early at the first
/// title without a link, and links beyond the last title are never visited.
/// No attempt is made to re-align sets whose items were dropped in the
/// middle.
pub fn pair_items<'a>(
    links: &'a NodeSet,
    titles: &'a NodeSet,
) -> impl Iterator<Item = FeedItem<'a>> {
    titles
        .nodes
        .iter()
        .enumerate()
        .map_while(move |(i, title)| {
            links.get(i).map(|link| FeedItem {
                title: title.as_str(),
                link,
            })
        })
}
