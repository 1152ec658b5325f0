//! Merge-pool deduplication and recency ranking.

use crate::models::Headline;
use std::cmp::Reverse;
use std::collections::HashSet;

/// Drop repeats in arrival order, keyed by [`Headline::identity_key`].
pub fn dedupe_headlines(items: Vec<Headline>) -> Vec<Headline> {
    let mut seen: HashSet<String> = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.identity_key()))
        .collect()
}

/// Dedupe, sort newest first (stable; unparsable dates last), and keep `limit` items.
pub fn rank_headlines(items: Vec<Headline>, limit: usize) -> Vec<Headline> {
    let mut ranked = dedupe_headlines(items);
    ranked.sort_by_cached_key(|item| Reverse(item.timestamp()));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(title: &str, link: &str, date: &str) -> Headline {
        Headline::new(title, link, "Feed", date)
    }

    #[test]
    fn test_dedupe_by_link_and_title_date() {
        let items = vec![
            h("A", "https://a.example/1", "2025-05-01"),
            h("A again", "https://a.example/1/", "2025-05-02"),
            h("No link", "", "2025-05-03"),
            h("no LINK ", "", "2025-05-03"),
            h("No link", "", "2025-05-04"),
        ];
        let deduped = dedupe_headlines(items);
        let titles: Vec<&str> = deduped.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "No link", "No link"]);
    }

    #[test]
    fn test_rank_sorts_newest_first_and_keeps_ties_stable() {
        let items = vec![
            h("undated", "https://a.example/u", ""),
            h("old", "https://a.example/o", "Mon, 05 May 2025 08:00:00 GMT"),
            h("tie-1", "https://a.example/t1", "2025-05-06T12:00:00Z"),
            h("tie-2", "https://a.example/t2", "Tue, 06 May 2025 12:00:00 GMT"),
            h("garbage", "https://a.example/g", "sometime"),
        ];
        let ranked = rank_headlines(items, 10);
        let titles: Vec<&str> = ranked.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["tie-1", "tie-2", "old", "undated", "garbage"]);
    }

    #[test]
    fn test_rank_truncates_to_limit() {
        let items = (0..10)
            .map(|i| h(&format!("n{i}"), &format!("https://a.example/{i}"), ""))
            .collect();
        assert_eq!(rank_headlines(items, 4).len(), 4);
    }

    #[test]
    fn test_dedupe_is_idempotent() {
        let items = vec![
            h("A", "https://a.example/1", "2025-05-01"),
            h("B", "https://a.example/1", "2025-05-02"),
            h("C", "", "x"),
            h("c", "", "x"),
            h("D", "https://d.example/", "2025-05-03"),
        ];
        let once = rank_headlines(items, 20);
        let twice = rank_headlines(once.clone(), 20);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_two_feeds_sharing_a_link() {
        // feed A: 3 items, one link shared with feed B; feed B: 2 items.
        let feed_a = vec![
            h("a1", "https://news.example/a1", "2025-05-01T00:00:00Z"),
            h("shared", "https://news.example/shared", "2025-05-04T00:00:00Z"),
            h("a3", "https://news.example/a3", "2025-05-02T00:00:00Z"),
        ];
        let feed_b = vec![
            h("shared copy", "https://news.example/shared", "2025-05-04T00:00:00Z"),
            h("b2", "https://news.example/b2", "2025-05-05T00:00:00Z"),
        ];
        let pool: Vec<Headline> = feed_a.into_iter().chain(feed_b).collect();

        let ranked = rank_headlines(pool, 4);
        let titles: Vec<&str> = ranked.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["b2", "shared", "a3", "a1"]);
    }
}
