//! Node paths: the small query language used to pick node-sets out of a feed.
//!
//! Two forms are understood:
//!
//! - `//item/title` matches a `title` whose parent is an `item`, at any depth.
//! - `/rss/channel/item/title` matches only that exact chain from the root.
//!
//! Steps are compared against element names as written in the document,
//! prefix included, without resolving namespaces.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

// The `Name` production of XML 1.0 (fifth edition).
const NAME_START: &str = concat!(
    r"A-Z_a-z:\x{C0}-\x{D6}\x{D8}-\x{F6}\x{F8}-\x{2FF}\x{370}-\x{37D}",
    r"\x{37F}-\x{1FFF}\x{200C}-\x{200D}\x{2070}-\x{218F}\x{2C00}-\x{2FEF}",
    r"\x{3001}-\x{D7FF}\x{F900}-\x{FDCF}\x{FDF0}-\x{FFFD}\x{10000}-\x{EFFFF}",
);
const NAME_REST: &str = r"\-.0-9\x{B7}\x{300}-\x{36F}\x{203F}-\x{2040}";

static XML_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^[{NAME_START}][{NAME_START}{NAME_REST}]*$")).expect("valid name regex")
});

/// Is `name` a legal XML element or attribute name?
pub(crate) fn is_xml_name(name: &str) -> bool {
    XML_NAME.is_match(name)
}

/// A compiled node path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePath {
    source: String,
    anchored: bool,
    steps: Vec<String>,
}

/// Why a query string could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid node path '{query}': {reason}")]
pub struct PathError {
    pub query: String,
    pub reason: String,
}

impl NodePath {
    pub fn compile(query: &str) -> Result<Self, PathError> {
        let fail = |reason: &str| PathError {
            query: query.to_string(),
            reason: reason.to_string(),
        };

        let (anchored, rest) = if let Some(rest) = query.strip_prefix("//") {
            (false, rest)
        } else if let Some(rest) = query.strip_prefix('/') {
            (true, rest)
        } else {
            return Err(fail("must start with '/' or '//'"));
        };

        if rest.is_empty() {
            return Err(fail("no steps"));
        }

        let mut steps = Vec::new();
        for step in rest.split('/') {
            if step.is_empty() {
                return Err(fail("empty step ('//' is only allowed at the start)"));
            }
            if !is_xml_name(step) {
                return Err(fail(&format!("'{step}' is not an element name")));
            }
            steps.push(step.to_string());
        }

        Ok(Self {
            source: query.to_string(),
            anchored,
            steps,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Does an element with this ancestry match? `stack` lists the open
    /// element names from the root down to and including the candidate.
    pub fn matches<S: AsRef<[u8]>>(&self, stack: &[S]) -> bool {
        let depth = stack.len();
        if depth < self.steps.len() || (self.anchored && depth != self.steps.len()) {
            return false;
        }
        let tail = &stack[depth - self.steps.len()..];
        tail.iter()
            .zip(&self.steps)
            .all(|(name, step)| name.as_ref() == step.as_bytes())
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack(names: &[&str]) -> Vec<Vec<u8>> {
        names.iter().map(|n| n.as_bytes().to_vec()).collect()
    }

    #[test]
    fn test_descendant_path() {
        let p = NodePath::compile("//item/title").unwrap();
        assert!(p.matches(&stack(&["rss", "channel", "item", "title"])));
        assert!(p.matches(&stack(&["item", "title"])));
        assert!(!p.matches(&stack(&["rss", "channel", "title"])));
        assert!(!p.matches(&stack(&["item", "media", "title"])));
        assert!(!p.matches(&stack(&["title"])));
    }

    #[test]
    fn test_anchored_path() {
        let p = NodePath::compile("/rss/channel/item/link").unwrap();
        assert!(p.matches(&stack(&["rss", "channel", "item", "link"])));
        assert!(!p.matches(&stack(&["feed", "rss", "channel", "item", "link"])));
    }

    #[test]
    fn test_prefixed_names_match_literally() {
        let p = NodePath::compile("//item/dc:creator").unwrap();
        assert!(p.matches(&stack(&["item", "dc:creator"])));
        assert!(!p.matches(&stack(&["item", "creator"])));

        let plain = NodePath::compile("//item/title").unwrap();
        assert!(!plain.matches(&stack(&["item", "media:title"])));
    }

    #[test]
    fn test_invalid_paths() {
        let cases = [
            "",
            "item/title",
            "/",
            "//",
            "//item//title",
            "//item/",
            "//item/ti tle",
            "//1item",
        ];
        for bad in cases {
            let err = NodePath::compile(bad).unwrap_err();
            assert_eq!(err.query, bad);
        }
    }

    #[test]
    fn test_xml_names() {
        for good in ["rss", "dc:creator", "_x", "a-b.c", "título", "名前", ":x"] {
            assert!(is_xml_name(good), "rejected {good:?}");
        }
        for bad in ["", "1rss", "-a", ".a", "a b", "a<b", "a&b", "a\"b"] {
            assert!(!is_xml_name(bad), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_display_round_trips_source() {
        let p = NodePath::compile("//item/link").unwrap();
        assert_eq!(p.to_string(), "//item/link");
        assert_eq!(p.as_str(), "//item/link");
    }
}
