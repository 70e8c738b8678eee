//! Pagination metadata and paging links.
//!
//! The persistence contract owns pagination policy (it returns an already
//! paginated collection plus the total count); this module only derives
//! the `meta.count` member and the `self` / `first` / `last` / `prev` /
//! `next` links from that count and the request's page parameters.

use crate::query::QueryContext;
use serde_json::{Value, json};

/// Attach `meta.count` and paging links to a collection document.
///
/// A requested page size of zero suppresses the links (the collection is
/// explicitly unpaged) while still recording the count.
pub fn add_pagination_links(
    document: &mut Value,
    count: u64,
    query: &QueryContext,
    base_url: &str,
) {
    if !document.is_object() {
        return;
    }
    merge_meta(document, count);

    let page = query.page();
    if page.size == Some(0) {
        return;
    }
    let size = page.size();
    let number = page.number();
    let last = pages_for(count, size);

    let mut links = serde_json::Map::new();
    links.insert("self".to_owned(), json!(page_url(base_url, number, size)));
    links.insert("first".to_owned(), json!(page_url(base_url, 1, size)));
    links.insert("last".to_owned(), json!(page_url(base_url, last, size)));
    if number > 1 {
        links.insert(
            "prev".to_owned(),
            json!(page_url(base_url, (number - 1).min(last), size)),
        );
    }
    if number < last {
        links.insert("next".to_owned(), json!(page_url(base_url, number + 1, size)));
    }
    document["links"] = Value::Object(links);
}

/// Total number of pages for `count` items at `size` per page, minimum 1.
#[must_use]
pub fn pages_for(count: u64, size: u64) -> u64 {
    if size == 0 { 1 } else { count.div_ceil(size).max(1) }
}

fn merge_meta(document: &mut Value, count: u64) {
    match document.get_mut("meta").and_then(Value::as_object_mut) {
        Some(meta) => {
            meta.insert("count".to_owned(), json!(count));
        }
        None => {
            document["meta"] = json!({"count": count});
        }
    }
}

fn page_url(base_url: &str, number: u64, size: u64) -> String {
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{base_url}{separator}page[number]={number}&page[size]={size}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::query::PageParams;
    use proptest::prelude::*;
    use serde_json::json;

    fn paged(number: u64, size: u64) -> QueryContext {
        QueryContext::new().with_page(PageParams { number: Some(number), size: Some(size) })
    }

    #[test]
    fn count_and_links_reflect_the_collection() {
        let mut document = json!({"data": []});
        add_pagination_links(&mut document, 7, &paged(1, 3), "/articles");
        assert_eq!(document["meta"]["count"], 7);
        assert_eq!(document["links"]["last"], "/articles?page[number]=3&page[size]=3");
        assert_eq!(document["links"]["next"], "/articles?page[number]=2&page[size]=3");
        assert!(document["links"].get("prev").is_none());
    }

    #[test]
    fn middle_page_has_both_neighbours() {
        let mut document = json!({"data": []});
        add_pagination_links(&mut document, 7, &paged(2, 3), "/articles");
        assert_eq!(document["links"]["prev"], "/articles?page[number]=1&page[size]=3");
        assert_eq!(document["links"]["next"], "/articles?page[number]=3&page[size]=3");
    }

    #[test]
    fn zero_size_suppresses_links_but_keeps_count() {
        let mut document = json!({"data": []});
        add_pagination_links(&mut document, 7, &paged(1, 0), "/articles");
        assert_eq!(document["meta"]["count"], 7);
        assert!(document.get("links").is_none());
    }

    #[test]
    fn existing_meta_is_preserved() {
        let mut document = json!({"data": [], "meta": {"generated": true}});
        add_pagination_links(&mut document, 1, &paged(1, 3), "/articles");
        assert_eq!(document["meta"]["generated"], true);
        assert_eq!(document["meta"]["count"], 1);
    }

    #[test]
    fn query_separator_is_kept() {
        let mut document = json!({"data": []});
        add_pagination_links(&mut document, 1, &paged(1, 3), "/articles?sort=title");
        let self_link = document["links"]["self"].as_str().unwrap();
        assert!(self_link.starts_with("/articles?sort=title&page[number]=1"));
    }

    proptest! {
        #[test]
        fn page_math_never_loses_items(count in 0_u64..10_000, size in 1_u64..200) {
            let pages = pages_for(count, size);
            prop_assert!(pages >= 1);
            prop_assert!(pages * size >= count);
            prop_assert!((pages - 1) * size < count.max(1));
        }
    }
}
