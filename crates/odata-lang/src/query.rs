//! Assembles the five per-option parsers and the URL parser into one
//! `QueryOptions` bundle (spec §3), enforcing the configured length/count
//! limits from §6 before any parser sees the raw text.

use crate::limits::Limits;
use crate::options::{
    parse_compute, parse_expand_with_limit, parse_filter, parse_orderby, parse_search,
    parse_select, ComputeExpression, ExpandOption, OrderKey, SearchExpression,
};
use crate::url::{parse_raw_query, reject_unknown_system_options, RawOptions};
use odata_core::{Error, ParseNode, Result};

#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub filter: Option<ParseNode>,
    pub filter_raw: Option<String>,
    pub select: Option<Vec<String>>,
    pub order_by: Option<Vec<OrderKey>>,
    pub skip: Option<u32>,
    pub top: Option<u32>,
    pub count: bool,
    pub expand: Vec<ExpandOption>,
    pub compute: Vec<ComputeExpression>,
    pub search: Option<SearchExpression>,
}

fn check_len(value: &str, max: usize, option: &str) -> Result<()> {
    if value.len() > max {
        return Err(Error::LimitExceeded(format!("{option} exceeds maximum length of {max}")));
    }
    Ok(())
}

fn parse_bounded_u32(raw: &RawOptions, key: &str, max: u32, label: &str) -> Result<Option<u32>> {
    let Some(value) = raw.get(key) else { return Ok(None) };
    let parsed: u32 = value.parse().map_err(|_| Error::parse(format!("invalid {key}: {value}")))?;
    if parsed > max {
        return Err(Error::LimitExceeded(format!("{label} {parsed} exceeds maximum {max}")));
    }
    Ok(Some(parsed))
}

/// Parses a raw query string (after `?`) into a fully validated
/// `QueryOptions`. Semantic validation against entity metadata happens
/// afterward (§4.5) — this stage only concerns itself with syntax and the
/// configured size limits.
pub fn parse_query_options(raw_query: &str, limits: &Limits) -> Result<QueryOptions> {
    let raw = parse_raw_query(raw_query)?;
    reject_unknown_system_options(&raw)?;

    let mut options = QueryOptions::default();

    if let Some(filter) = raw.get("$filter") {
        check_len(filter, limits.max_filter_len, "$filter")?;
        options.filter = Some(parse_filter(filter)?);
        options.filter_raw = Some(filter.clone());
    }

    if let Some(select) = raw.get("$select") {
        check_len(select, limits.max_select_len, "$select")?;
        options.select = Some(parse_select(select)?);
    }

    if let Some(order_by) = raw.get("$orderby") {
        check_len(order_by, limits.max_orderby_len, "$orderby")?;
        options.order_by = Some(parse_orderby(order_by)?);
    }

    if let Some(search) = raw.get("$search") {
        check_len(search, limits.max_search_len, "$search")?;
        options.search = Some(parse_search(search)?);
    }

    if let Some(expand) = raw.get("$expand") {
        options.expand = parse_expand_with_limit(expand, limits.max_expand_depth)?;
    }

    if let Some(compute) = raw.get("$compute") {
        options.compute = parse_compute(compute)?;
    }

    options.skip = parse_bounded_u32(&raw, "$skip", limits.max_skip, "$skip")?;
    options.top = parse_bounded_u32(&raw, "$top", limits.max_top, "$top")?;

    if let Some(count) = raw.get("$count") {
        options.count = count.eq_ignore_ascii_case("true");
    }

    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_has_default_pagination() {
        let options = parse_query_options("", &Limits::default()).unwrap();
        assert!(options.filter.is_none());
        assert!(options.skip.is_none());
        assert!(options.top.is_none());
    }

    #[test]
    fn parses_filter_select_orderby_together() {
        let options = parse_query_options(
            "$filter=Age gt 18&$select=Name,Age&$orderby=Age desc&$top=10",
            &Limits::default(),
        )
        .unwrap();
        assert!(options.filter.is_some());
        assert_eq!(options.select.unwrap(), vec!["Name", "Age"]);
        assert_eq!(options.top, Some(10));
    }

    #[test]
    fn filter_over_length_limit_is_rejected() {
        let mut limits = Limits::default();
        limits.max_filter_len = 5;
        let err = parse_query_options("$filter=Age gt 18", &limits).unwrap_err();
        assert!(matches!(err, Error::LimitExceeded(_)));
    }

    #[test]
    fn top_over_configured_maximum_is_rejected() {
        let mut limits = Limits::default();
        limits.max_top = 100;
        let err = parse_query_options("$top=1000000", &limits).unwrap_err();
        assert!(matches!(err, Error::LimitExceeded(_)));
    }

    #[test]
    fn unknown_dollar_option_is_rejected() {
        assert!(parse_query_options("$bogus=1", &Limits::default()).is_err());
    }

    #[test]
    fn top_zero_is_valid() {
        let options = parse_query_options("$top=0", &Limits::default()).unwrap();
        assert_eq!(options.top, Some(0));
    }
}
