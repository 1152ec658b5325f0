//! Google News RSS search URLs.

use url::Url;

pub const SEARCH_ENDPOINT: &str = "https://news.google.com/rss/search";

/// Build the English-edition Google News RSS search URL for `query`.
pub fn search_url(query: &str) -> String {
    match Url::parse_with_params(
        SEARCH_ENDPOINT,
        &[("q", query), ("hl", "en-US"), ("gl", "US"), ("ceid", "US:en")],
    ) {
        Ok(url) => url.to_string(),
        Err(_) => SEARCH_ENDPOINT.to_string(),
    }
}
