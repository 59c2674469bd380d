//! `$compute` (spec §4.4): comma-separated `<expression> as <alias>`. Each
//! expression reuses the filter token space (spec: "converted to the filter
//! token space").

use crate::options::filter::lex_filter;
use crate::shunting::parse_expression;
use crate::text::split_top_level;
use odata_core::{Error, ParseNode, Result};

#[derive(Debug, Clone)]
pub struct ComputeExpression {
    pub raw: String,
    pub alias: String,
    pub parse_tree: ParseNode,
}

fn split_alias(clause: &str) -> Result<(&str, &str)> {
    let lower = clause.to_ascii_lowercase();
    let idx = lower
        .rfind(" as ")
        .ok_or_else(|| Error::parse(format!("$compute clause missing ' as ' alias: {clause}")))?;
    let expr = clause[..idx].trim();
    let alias = clause[idx + 4..].trim();
    if alias.is_empty() || !alias.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(Error::parse(format!("invalid $compute alias: {alias}")));
    }
    Ok((expr, alias))
}

pub fn parse_compute(raw: &str) -> Result<Vec<ComputeExpression>> {
    if raw.trim().is_empty() {
        return Err(Error::parse("empty $compute"));
    }
    let mut result = Vec::new();
    for clause in split_top_level(raw, &[',']) {
        let clause = clause.trim();
        if clause.is_empty() {
            continue;
        }
        let (expr, alias) = split_alias(clause)?;
        let tokens = lex_filter(expr)?;
        let parse_tree = parse_expression(tokens)?;
        result.push(ComputeExpression { raw: expr.to_string(), alias: alias.to_string(), parse_tree });
    }
    if result.is_empty() {
        return Err(Error::parse("empty $compute"));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_compute_clause() {
        let computed = parse_compute("Price mul Quantity as Total").unwrap();
        assert_eq!(computed.len(), 1);
        assert_eq!(computed[0].alias, "Total");
    }

    #[test]
    fn multiple_clauses_split_on_top_level_comma() {
        let computed = parse_compute("Price mul Quantity as Total, Price add 1 as Incremented").unwrap();
        assert_eq!(computed.len(), 2);
        assert_eq!(computed[1].alias, "Incremented");
    }

    #[test]
    fn comma_inside_function_call_does_not_split() {
        let computed = parse_compute("concat(Name,Surname) as FullName").unwrap();
        assert_eq!(computed.len(), 1);
        assert_eq!(computed[0].alias, "FullName");
    }

    #[test]
    fn missing_alias_is_rejected() {
        assert!(parse_compute("Price mul Quantity").is_err());
    }
}
