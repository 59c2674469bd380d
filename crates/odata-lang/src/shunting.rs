//! Shared expression parser (spec §4.2): infix tokens → postfix (shunting
//! yard) → `ParseNode` tree. Used by the filter and compute languages, which
//! differ only in their lexer rule tables and post-processing.

use crate::kinds::{self, arity, is_operator, is_right_associative, precedence};
use odata_core::{Error, ParseNode, Result, SemanticValue, Token};

enum OpEntry {
    Operator(Token),
    LParen,
    /// A function call: the token, whether its opening paren has been
    /// consumed, the comma count seen so far, and the postfix output length
    /// at the moment the call opened (used to distinguish zero-arity calls).
    Call { token: Token, open_consumed: bool, commas: usize, output_len_at_open: usize },
}

fn infix_to_postfix(tokens: Vec<Token>) -> Result<Vec<Token>> {
    let mut output: Vec<Token> = Vec::new();
    let mut ops: Vec<OpEntry> = Vec::new();

    for tok in tokens {
        match tok.kind {
            kinds::IDENT | kinds::STRING | kinds::NUMBER | kinds::BOOL | kinds::NULL => {
                output.push(tok);
            }
            kinds::FUNCTION => {
                ops.push(OpEntry::Call {
                    token: tok,
                    open_consumed: false,
                    commas: 0,
                    output_len_at_open: output.len(),
                });
            }
            kinds::LPAREN => {
                if let Some(OpEntry::Call { open_consumed, .. }) = ops.last_mut() {
                    if !*open_consumed {
                        *open_consumed = true;
                        continue;
                    }
                }
                ops.push(OpEntry::LParen);
            }
            kinds::COMMA => loop {
                match ops.pop() {
                    Some(OpEntry::Operator(op)) => output.push(op),
                    Some(OpEntry::Call { token, commas, output_len_at_open, .. }) => {
                        ops.push(OpEntry::Call {
                            token,
                            open_consumed: true,
                            commas: commas + 1,
                            output_len_at_open,
                        });
                        break;
                    }
                    _ => return Err(Error::parse("comma outside a function call")),
                }
            },
            kinds::RPAREN => loop {
                match ops.pop() {
                    Some(OpEntry::Operator(op)) => output.push(op),
                    Some(OpEntry::LParen) => break,
                    Some(OpEntry::Call { mut token, commas, output_len_at_open, .. }) => {
                        let call_arity = if output.len() > output_len_at_open { commas + 1 } else { 0 };
                        token.semantic_reference = Some(SemanticValue::Int64(call_arity as i64));
                        output.push(token);
                        break;
                    }
                    None => return Err(Error::parse("mismatched parentheses")),
                }
            },
            kind if is_operator(kind) => {
                while let Some(OpEntry::Operator(top)) = ops.last() {
                    let should_pop = if is_right_associative(kind) {
                        precedence(top.kind) > precedence(kind)
                    } else {
                        precedence(top.kind) >= precedence(kind)
                    };
                    if !should_pop {
                        break;
                    }
                    if let Some(OpEntry::Operator(top)) = ops.pop() {
                        output.push(top);
                    }
                }
                ops.push(OpEntry::Operator(tok));
            }
            other => return Err(Error::parse(format!("unexpected token kind {other} in operator position"))),
        }
    }

    while let Some(entry) = ops.pop() {
        match entry {
            OpEntry::Operator(op) => output.push(op),
            OpEntry::LParen | OpEntry::Call { .. } => {
                return Err(Error::parse("mismatched parentheses"));
            }
        }
    }

    Ok(output)
}

/// Builds a `ParseNode` tree from a postfix token stream, popping operands
/// per each token's arity (functions carry their arity in
/// `semantic_reference`, stamped during `infix_to_postfix`).
fn postfix_to_tree(postfix: Vec<Token>) -> Result<ParseNode> {
    let mut stack: Vec<ParseNode> = Vec::new();

    for tok in postfix {
        let node_arity = if tok.kind == kinds::FUNCTION {
            match tok.semantic_reference {
                Some(SemanticValue::Int64(n)) => n as usize,
                _ => 0,
            }
        } else if is_operator(tok.kind) {
            arity(tok.kind)
        } else {
            0
        };

        if node_arity == 0 {
            stack.push(ParseNode::leaf(tok));
            continue;
        }

        if stack.len() < node_arity {
            return Err(Error::parse(format!(
                "operator '{}' expects {node_arity} operand(s), found {}",
                tok.value,
                stack.len()
            )));
        }
        let children = stack.split_off(stack.len() - node_arity);
        stack.push(ParseNode::new(tok, children));
    }

    if stack.len() != 1 {
        return Err(Error::parse("malformed expression: leftover or missing operands"));
    }
    Ok(stack.pop().unwrap())
}

/// Parses a token stream into a single expression tree.
pub fn parse_expression(tokens: Vec<Token>) -> Result<ParseNode> {
    if tokens.is_empty() {
        return Err(Error::parse("empty expression"));
    }
    let postfix = infix_to_postfix(tokens)?;
    postfix_to_tree(postfix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use odata_core::Token;

    fn ident(name: &str) -> Token {
        Token::new(kinds::IDENT, name)
    }
    fn op(kind: u16, text: &str) -> Token {
        Token::new(kind, text)
    }
    fn num(text: &str) -> Token {
        crate::lexer::numeric_token(kinds::NUMBER, text)
    }

    #[test]
    fn binary_comparison_builds_two_child_node() {
        let tokens = vec![ident("Age"), op(kinds::GT, "gt"), num("18")];
        let tree = parse_expression(tokens).unwrap();
        assert_eq!(tree.token.kind, kinds::GT);
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].token.value, "Age");
    }

    #[test]
    fn and_binds_looser_than_comparison_on_both_sides() {
        // Name eq 'John' and Age gt 18
        let tokens = vec![
            ident("Name"),
            op(kinds::EQ, "eq"),
            Token::new(kinds::STRING, "John"),
            op(kinds::AND, "and"),
            ident("Age"),
            op(kinds::GT, "gt"),
            num("18"),
        ];
        let tree = parse_expression(tokens).unwrap();
        assert_eq!(tree.token.kind, kinds::AND);
        assert_eq!(tree.children[0].token.kind, kinds::EQ);
        assert_eq!(tree.children[1].token.kind, kinds::GT);
    }

    #[test]
    fn not_is_unary() {
        let tokens = vec![op(kinds::NOT, "not"), ident("Active")];
        let tree = parse_expression(tokens).unwrap();
        assert_eq!(tree.token.kind, kinds::NOT);
        assert_eq!(tree.children.len(), 1);
    }

    #[test]
    fn function_call_arity_is_recorded() {
        // contains(Name, 'jo')
        let tokens = vec![
            op(kinds::FUNCTION, "contains"),
            op(kinds::LPAREN, "("),
            ident("Name"),
            op(kinds::COMMA, ","),
            Token::new(kinds::STRING, "jo"),
            op(kinds::RPAREN, ")"),
        ];
        let tree = parse_expression(tokens).unwrap();
        assert_eq!(tree.token.kind, kinds::FUNCTION);
        assert_eq!(tree.children.len(), 2);
    }

    #[test]
    fn zero_arity_function_call() {
        // now()
        let tokens =
            vec![op(kinds::FUNCTION, "now"), op(kinds::LPAREN, "("), op(kinds::RPAREN, ")")];
        let tree = parse_expression(tokens).unwrap();
        assert_eq!(tree.children.len(), 0);
    }

    #[test]
    fn mismatched_parens_is_parse_error() {
        let tokens = vec![op(kinds::LPAREN, "("), ident("Age")];
        assert!(parse_expression(tokens).is_err());
    }

    #[test]
    fn missing_operand_is_parse_error() {
        let tokens = vec![op(kinds::AND, "and"), ident("Age")];
        assert!(parse_expression(tokens).is_err());
    }

    #[test]
    fn parenthesized_grouping_changes_tree_shape() {
        // (X or Y) and Z
        let tokens = vec![
            op(kinds::LPAREN, "("),
            ident("X"),
            op(kinds::OR, "or"),
            ident("Y"),
            op(kinds::RPAREN, ")"),
            op(kinds::AND, "and"),
            ident("Z"),
        ];
        let tree = parse_expression(tokens).unwrap();
        assert_eq!(tree.token.kind, kinds::AND);
        assert_eq!(tree.children[0].token.kind, kinds::OR);
    }
}
