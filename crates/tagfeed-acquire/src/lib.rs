//! Turns a topic tag into a downloaded feed document.

pub mod fetch;
pub mod url;

pub use fetch::{fetch, FetchError};
pub use url::feed_url;
