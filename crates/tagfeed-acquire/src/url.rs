/// Build the request URL for a tag.
///
/// The tag is appended as-is. It is expected to already be URL-safe; nothing
/// is percent-encoded, and a base without a trailing slash simply runs into
/// the tag.
pub fn feed_url(base: &str, tag: &str) -> String {
    format!("{base}{tag}")
}
