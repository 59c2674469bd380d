//! Generic rule-ordered regex lexer (spec §4.1), shared by every one of the
//! five expression languages embedded in an OData URL. Each language supplies
//! its own ordered rule table; the scanning loop itself is written once.

use odata_core::{Error, Result, SemanticValue, Token};
use regex::Regex;
use std::sync::Arc;

/// Sentinel token kind meaning "drop this match" (whitespace, comments).
pub const SKIP: u16 = u16::MAX;

/// One lexer rule: a compiled pattern anchored at the start of the
/// remaining input, and the token kind it produces. Rule order encodes
/// precedence — keywords must be listed before the generic identifier rule,
/// quoted strings before bare terms, numbers (with optional type suffix)
/// before property names.
#[derive(Clone)]
pub struct Rule {
    pub pattern: Arc<Regex>,
    pub kind: u16,
}

impl Rule {
    pub fn new(pattern: &str, kind: u16) -> Self {
        let anchored = format!("^(?:{pattern})");
        Self { pattern: Arc::new(Regex::new(&anchored).expect("lexer rule must compile")), kind }
    }
}

/// Scans `input` against `rules` in order, taking the longest match from the
/// first rule that matches at the current position. Fails with
/// `Error::Lex` when no rule matches.
pub struct Lexer<'a> {
    input: &'a str,
    rules: &'a [Rule],
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str, rules: &'a [Rule]) -> Self {
        Self { input, rules, pos: 0 }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        while self.pos < self.input.len() {
            let remainder = &self.input[self.pos..];
            let trimmed = remainder.trim_start();
            self.pos += remainder.len() - trimmed.len();
            if self.pos >= self.input.len() {
                break;
            }
            let remainder = &self.input[self.pos..];

            let mut matched = false;
            for rule in self.rules {
                if let Some(m) = rule.pattern.find(remainder) {
                    if m.end() == 0 {
                        continue;
                    }
                    let text = &remainder[..m.end()];
                    self.pos += m.end();
                    matched = true;
                    if rule.kind != SKIP {
                        tokens.push(Token::new(rule.kind, text));
                    }
                    break;
                }
            }
            if !matched {
                return Err(Error::lex(
                    format!("no lexer rule matched starting at {remainder:?}"),
                    self.pos,
                ));
            }
        }
        Ok(tokens)
    }
}

/// Retags any identifier immediately followed by `(` as a function-call
/// token; the semantic analyzer (§4.5) later validates the name against a
/// known arity/signature table, so the lexer only needs the structural cue.
pub fn mark_function_calls(tokens: &mut [Token], ident_kind: u16, function_kind: u16, lparen_kind: u16) {
    for i in 0..tokens.len().saturating_sub(1) {
        if tokens[i].kind == ident_kind && tokens[i + 1].kind == lparen_kind {
            tokens[i].kind = function_kind;
        }
    }
}

/// Parses a numeric literal, preserving its typed value on the token so
/// later SQL binding does not re-parse the string form (spec §9
/// "semantic reference on literals").
pub fn numeric_token(kind: u16, text: &str) -> Token {
    let token = Token::new(kind, text);
    if let Ok(i) = text.parse::<i64>() {
        return token.with_semantic(SemanticValue::Int64(i));
    }
    if let Ok(f) = text.parse::<f64>() {
        return token.with_semantic(SemanticValue::Float64(f));
    }
    token
}

#[cfg(test)]
mod tests {
    use super::*;

    const WS: u16 = SKIP;
    const IDENT: u16 = 1;
    const NUMBER: u16 = 2;
    const OP: u16 = 3;

    fn test_rules() -> Vec<Rule> {
        vec![
            Rule::new(r"\s+", WS),
            Rule::new(r"[0-9]+(\.[0-9]+)?", NUMBER),
            Rule::new(r"eq|gt|lt", OP),
            Rule::new(r"[A-Za-z_][A-Za-z0-9_]*", IDENT),
        ]
    }

    #[test]
    fn skips_whitespace_and_emits_tokens_in_order() {
        let rules = test_rules();
        let tokens = Lexer::new("Age gt 18", &rules).tokenize().unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].value, "Age");
        assert_eq!(tokens[1].kind, OP);
        assert_eq!(tokens[2].value, "18");
    }

    #[test]
    fn fails_on_unmatched_input() {
        let rules = test_rules();
        let err = Lexer::new("Age @ 18", &rules).tokenize().unwrap_err();
        assert!(matches!(err, Error::Lex { .. }));
    }

    #[test]
    fn keyword_rule_takes_priority_over_identifier_when_listed_first() {
        let rules = vec![Rule::new(r"eq", OP), Rule::new(r"[A-Za-z]+", IDENT)];
        let tokens = Lexer::new("eq", &rules).tokenize().unwrap();
        assert_eq!(tokens[0].kind, OP);
    }

    #[test]
    fn numeric_token_preserves_int_semantic_value() {
        let token = numeric_token(NUMBER, "18");
        assert_eq!(token.semantic_reference, Some(SemanticValue::Int64(18)));
    }

    #[test]
    fn numeric_token_preserves_float_semantic_value() {
        let token = numeric_token(NUMBER, "18.5");
        assert_eq!(token.semantic_reference, Some(SemanticValue::Float64(18.5)));
    }
}
