//! Query-string parsing into the engine's query context.
//!
//! Translates the conventional JSON:API query grammar —
//! `include=author.bio,comments`, `sort=-created,title`,
//! `fields[articles]=title,body`, `page[number]=2&page[size]=30`,
//! `filter=[{"name":"title","op":"eq","val":"x"}]` and the
//! `filter[title]=x` equality shorthand — into a [`QueryContext`].
//!
//! Only syntax is handled here; semantic validation (unknown field or
//! include names) stays with the engine's schema adapter.

use apiary_core::error::JsonApiError;
use apiary_core::query::{FilterClause, FilterOp, PageParams, QueryContext, SortField, SortOrder};
use serde_json::Value;
use std::collections::BTreeMap;

/// Parse a raw query string into a [`QueryContext`].
///
/// Unrecognized parameters are ignored, as resource servers convention-
/// ally do.
///
/// # Errors
///
/// `BadRequest` (400) naming the parameter for malformed page numbers or
/// an unparseable `filter` document.
pub fn parse(raw: Option<&str>) -> Result<QueryContext, JsonApiError> {
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return Ok(QueryContext::new());
    };
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw)
        .map_err(|_| JsonApiError::bad_request("/", "Malformed query string"))?;

    let mut include = Vec::new();
    let mut sort = Vec::new();
    let mut filters = Vec::new();
    let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut page = PageParams::default();

    for (key, value) in pairs {
        match key.as_str() {
            "include" => {
                include.extend(split_list(&value));
            }
            "sort" => {
                sort.extend(split_list(&value).into_iter().map(|field| {
                    field.strip_prefix('-').map_or_else(
                        || SortField { field: field.clone(), order: SortOrder::Asc },
                        |stripped| SortField {
                            field: stripped.to_owned(),
                            order: SortOrder::Desc,
                        },
                    )
                }));
            }
            "page[number]" => page.number = Some(parse_page(&key, &value)?),
            "page[size]" => page.size = Some(parse_page(&key, &value)?),
            "filter" => {
                let clauses: Vec<FilterClause> = serde_json::from_str(&value).map_err(|_| {
                    JsonApiError::bad_request("/", "Parse error in the filter parameter")
                })?;
                filters.extend(clauses);
            }
            _ => {
                if let Some(type_name) = bracket_argument(&key, "fields") {
                    fields.entry(type_name.to_owned()).or_default().extend(split_list(&value));
                } else if let Some(field) = bracket_argument(&key, "filter") {
                    filters.push(FilterClause {
                        name: field.to_owned(),
                        op: FilterOp::Eq,
                        val: Value::String(value),
                    });
                }
            }
        }
    }

    let mut query = QueryContext::new()
        .with_include(include)
        .with_sort(sort)
        .with_filters(filters)
        .with_page(page);
    for (type_name, names) in fields {
        query = query.with_fields(type_name, names);
    }
    Ok(query)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

fn parse_page(key: &str, value: &str) -> Result<u64, JsonApiError> {
    value.parse().map_err(|_| {
        JsonApiError::bad_request("/", format!("{key} must be a non-negative integer"))
    })
}

fn bracket_argument<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    key.strip_prefix(prefix)?.strip_prefix('[')?.strip_suffix(']')
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_is_the_default_context() {
        assert_eq!(parse(None).unwrap(), QueryContext::new());
        assert_eq!(parse(Some("")).unwrap(), QueryContext::new());
    }

    #[test]
    fn include_sort_fields_and_page_parse() {
        let query = parse(Some(
            "include=author.bio,comments&sort=-created,title&fields[articles]=title,body&page[number]=2&page[size]=5",
        ))
        .unwrap();
        assert_eq!(query.include(), ["author.bio".to_owned(), "comments".to_owned()]);
        assert_eq!(query.sort()[0].order, SortOrder::Desc);
        assert_eq!(query.sort()[0].field, "created");
        assert_eq!(query.sort()[1].order, SortOrder::Asc);
        assert_eq!(
            query.fields_for("articles").unwrap(),
            ["title".to_owned(), "body".to_owned()]
        );
        assert_eq!(query.page().number(), 2);
        assert_eq!(query.page().size(), 5);
    }

    #[test]
    fn filter_json_grammar_parses() {
        let raw = r#"filter=[{"name":"title","op":"eq","val":"Typee"}]"#;
        let query = parse(Some(raw)).unwrap();
        assert_eq!(query.filters().len(), 1);
        assert_eq!(query.filters()[0].op, FilterOp::Eq);
    }

    #[test]
    fn filter_shorthand_is_an_equality_clause() {
        let query = parse(Some("filter[title]=Typee")).unwrap();
        assert_eq!(query.filters()[0].name, "title");
        assert_eq!(query.filters()[0].val, Value::String("Typee".to_owned()));
    }

    #[test]
    fn malformed_page_number_is_a_400() {
        let err = parse(Some("page[number]=soon")).unwrap_err();
        assert_eq!(err.status().as_u16(), 400);
    }

    #[test]
    fn malformed_filter_is_a_400() {
        let err = parse(Some("filter=not-json")).unwrap_err();
        assert_eq!(err.status().as_u16(), 400);
    }

    #[test]
    fn unknown_parameters_are_ignored() {
        let query = parse(Some("q=search&utm_source=x")).unwrap();
        assert_eq!(query, QueryContext::new());
    }
}
