//! `$filter` (spec §4.4): standard OData operators and functions, producing
//! a boolean-valued expression tree over the shared filter token space.

use crate::kinds;
use crate::lexer::{mark_function_calls, numeric_token, Lexer, Rule};
use crate::shunting::parse_expression;
use odata_core::{Error, ParseNode, Result};
use std::sync::LazyLock;

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::new(r"\s+", crate::lexer::SKIP),
        Rule::new(r"'(?:[^']|'')*'", kinds::STRING),
        Rule::new(r"-?[0-9]+(\.[0-9]+)?([eE][-+]?[0-9]+)?", kinds::NUMBER),
        Rule::new(r"(?i)\b(and)\b", kinds::AND),
        Rule::new(r"(?i)\b(or)\b", kinds::OR),
        Rule::new(r"(?i)\b(not)\b", kinds::NOT),
        Rule::new(r"(?i)\b(eq)\b", kinds::EQ),
        Rule::new(r"(?i)\b(ne)\b", kinds::NE),
        Rule::new(r"(?i)\b(ge)\b", kinds::GE),
        Rule::new(r"(?i)\b(gt)\b", kinds::GT),
        Rule::new(r"(?i)\b(le)\b", kinds::LE),
        Rule::new(r"(?i)\b(lt)\b", kinds::LT),
        Rule::new(r"(?i)\b(add)\b", kinds::ADD),
        Rule::new(r"(?i)\b(sub)\b", kinds::SUB),
        Rule::new(r"(?i)\b(mul)\b", kinds::MUL),
        Rule::new(r"(?i)\b(div)\b", kinds::DIV),
        Rule::new(r"(?i)\b(mod)\b", kinds::MOD),
        Rule::new(r"(?i)\b(true|false)\b", kinds::BOOL),
        Rule::new(r"(?i)\b(null)\b", kinds::NULL),
        Rule::new(r"\(", kinds::LPAREN),
        Rule::new(r"\)", kinds::RPAREN),
        Rule::new(r",", kinds::COMMA),
        Rule::new(r"[A-Za-z_][A-Za-z0-9_/.]*", kinds::IDENT),
    ]
});

fn unquote(raw: &str) -> String {
    raw.trim_start_matches('\'').trim_end_matches('\'').replace("''", "'")
}

/// Lexes `raw` into the shared filter token space, marking function calls
/// and stripping string-literal quoting.
pub fn lex_filter(raw: &str) -> Result<Vec<odata_core::Token>> {
    let mut tokens = Lexer::new(raw, &RULES).tokenize()?;
    for tok in tokens.iter_mut() {
        match tok.kind {
            kinds::NUMBER => *tok = numeric_token(kinds::NUMBER, &tok.value),
            kinds::STRING => tok.value = unquote(&tok.value),
            _ => {}
        }
    }
    mark_function_calls(&mut tokens, kinds::IDENT, kinds::FUNCTION, kinds::LPAREN);
    Ok(tokens)
}

/// Parses a `$filter` expression into a boolean-valued tree.
pub fn parse_filter(raw: &str) -> Result<ParseNode> {
    if raw.trim().is_empty() {
        return Err(Error::parse("empty $filter"));
    }
    let tokens = lex_filter(raw)?;
    parse_expression(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_comparison() {
        let tree = parse_filter("Age gt 18").unwrap();
        assert_eq!(tree.token.kind, kinds::GT);
    }

    #[test]
    fn string_literal_is_unquoted() {
        let tree = parse_filter("Name eq 'John'").unwrap();
        assert_eq!(tree.children[1].token.value, "John");
    }

    #[test]
    fn doubled_quote_escape_inside_string_literal() {
        let tree = parse_filter("Name eq 'O''Brien'").unwrap();
        assert_eq!(tree.children[1].token.value, "O'Brien");
    }

    #[test]
    fn and_with_nested_comparisons() {
        let tree = parse_filter("Name eq 'John' and Age gt 18").unwrap();
        assert_eq!(tree.token.kind, kinds::AND);
    }

    #[test]
    fn function_call_contains() {
        let tree = parse_filter("contains(Name,'jo')").unwrap();
        assert_eq!(tree.token.kind, kinds::FUNCTION);
        assert_eq!(tree.token.value, "contains");
        assert_eq!(tree.children.len(), 2);
    }

    #[test]
    fn not_wraps_parenthesized_group() {
        let tree = parse_filter("not (Status eq 'draft')").unwrap();
        assert_eq!(tree.token.kind, kinds::NOT);
    }

    #[test]
    fn empty_filter_is_rejected() {
        assert!(parse_filter("").is_err());
    }
}
