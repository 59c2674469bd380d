//! `$expand` (spec §4.4): identifier optionally followed by `(` sub-options
//! `)` where sub-options are `;`-separated `$option=value` pairs; recurses
//! on inner `$expand` up to a bounded depth (spec §4.9, default 5).

use crate::options::filter::parse_filter;
use crate::options::orderby::{parse_orderby, OrderKey};
use crate::options::select::parse_select;
use crate::text::split_top_level;
use odata_core::{Error, ParseNode, Result};

pub const DEFAULT_MAX_DEPTH: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct ExpandOption {
    pub property: String,
    pub filter: Option<ParseNode>,
    pub order_by: Option<Vec<OrderKey>>,
    pub select: Option<Vec<String>>,
    pub skip: Option<u32>,
    pub top: Option<u32>,
    pub count: bool,
    pub expand: Vec<ExpandOption>,
}

fn parse_one(clause: &str, remaining_depth: usize) -> Result<ExpandOption> {
    let clause = clause.trim();
    let (property, sub_options) = match clause.find('(') {
        None => (clause.to_string(), None),
        Some(idx) => {
            if !clause.ends_with(')') {
                return Err(Error::parse(format!("unbalanced $expand clause: {clause}")));
            }
            (clause[..idx].trim().to_string(), Some(&clause[idx + 1..clause.len() - 1]))
        }
    };
    if property.is_empty() {
        return Err(Error::parse("empty navigation property name in $expand"));
    }

    let mut option = ExpandOption { property, ..Default::default() };
    let Some(sub_options) = sub_options else {
        return Ok(option);
    };

    for pair in split_top_level(sub_options, &[';']) {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| Error::parse(format!("malformed $expand sub-option: {pair}")))?;
        let key = key.trim();
        let value = value.trim();
        match key {
            "$filter" => option.filter = Some(parse_filter(value)?),
            "$orderby" => option.order_by = Some(parse_orderby(value)?),
            "$select" => option.select = Some(parse_select(value)?),
            "$skip" => option.skip = Some(parse_nonneg(value, "$skip")?),
            "$top" => option.top = Some(parse_nonneg(value, "$top")?),
            "$count" => option.count = value.eq_ignore_ascii_case("true"),
            "$expand" => {
                if remaining_depth == 0 {
                    return Err(Error::LimitExceeded("expand depth exceeded".into()));
                }
                option.expand = parse_expand_at_depth(value, remaining_depth - 1)?;
            }
            other => return Err(Error::parse(format!("unknown $expand sub-option: {other}"))),
        }
    }
    Ok(option)
}

fn parse_nonneg(value: &str, option: &str) -> Result<u32> {
    value.parse::<u32>().map_err(|_| Error::parse(format!("invalid {option} value: {value}")))
}

fn parse_expand_at_depth(raw: &str, remaining_depth: usize) -> Result<Vec<ExpandOption>> {
    if raw.trim().is_empty() {
        return Err(Error::parse("empty $expand"));
    }
    split_top_level(raw, &[','])
        .into_iter()
        .map(|clause| parse_one(&clause, remaining_depth))
        .collect()
}

pub fn parse_expand(raw: &str) -> Result<Vec<ExpandOption>> {
    parse_expand_at_depth(raw, DEFAULT_MAX_DEPTH)
}

pub fn parse_expand_with_limit(raw: &str, max_depth: usize) -> Result<Vec<ExpandOption>> {
    parse_expand_at_depth(raw, max_depth)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_navigation_property() {
        let expand = parse_expand("FabOperacao").unwrap();
        assert_eq!(expand.len(), 1);
        assert_eq!(expand[0].property, "FabOperacao");
        assert!(expand[0].filter.is_none());
    }

    #[test]
    fn multiple_navigation_properties() {
        let expand = parse_expand("A,B").unwrap();
        assert_eq!(expand.len(), 2);
    }

    #[test]
    fn sub_options_are_semicolon_separated() {
        let expand = parse_expand("FabTarefa($filter=Ativo eq 'S';$orderby=ID desc;$top=3)").unwrap();
        let opt = &expand[0];
        assert!(opt.filter.is_some());
        assert_eq!(opt.top, Some(3));
        assert_eq!(opt.order_by.as_ref().unwrap()[0].property, "ID");
    }

    #[test]
    fn nested_expand_recurses() {
        let expand = parse_expand("A($expand=B)").unwrap();
        assert_eq!(expand[0].expand.len(), 1);
        assert_eq!(expand[0].expand[0].property, "B");
    }

    #[test]
    fn depth_limit_is_enforced() {
        // Depth 1 allows one level of nesting but not two.
        let err = parse_expand_with_limit("A($expand=B($expand=C))", 1).unwrap_err();
        assert!(matches!(err, Error::LimitExceeded(_)));
    }

    #[test]
    fn unbalanced_parens_is_parse_error() {
        assert!(parse_expand("A(").is_err());
    }
}
