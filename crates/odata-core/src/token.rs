use serde::{Deserialize, Serialize};

/// A typed literal preserved alongside a token's source text so SQL binding
/// can use the original value instead of re-parsing the string form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SemanticValue {
    Int64(i64),
    Float64(f64),
    Bool(bool),
    Null,
}

/// A lexeme produced by the tokenizer. `kind` is an integer tag drawn from
/// one of the per-language token enumerations (filter, compute, search,
/// select, orderby, expand); languages share this single representation so
/// the expression parser can stay generic over all of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: u16,
    pub value: String,
    pub semantic_reference: Option<SemanticValue>,
}

impl Token {
    pub fn new(kind: u16, value: impl Into<String>) -> Self {
        Self { kind, value: value.into(), semantic_reference: None }
    }

    pub fn with_semantic(mut self, value: SemanticValue) -> Self {
        self.semantic_reference = Some(value);
        self
    }
}

/// A node in a parsed expression tree. Arity matches the token's
/// operator/function contract: binary operators carry two children, `not`
/// carries one, a function call carries exactly its declared arity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseNode {
    pub token: Token,
    pub children: Vec<ParseNode>,
}

impl ParseNode {
    pub fn leaf(token: Token) -> Self {
        Self { token, children: Vec::new() }
    }

    pub fn new(token: Token, children: Vec<ParseNode>) -> Self {
        Self { token, children }
    }

    pub fn arity(&self) -> usize {
        self.children.len()
    }

    /// Depth-first walk, parent before children.
    pub fn walk(&self, f: &mut impl FnMut(&ParseNode)) {
        f(self);
        for child in &self.children {
            child.walk(f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_has_no_children() {
        let node = ParseNode::leaf(Token::new(1, "Age"));
        assert_eq!(node.arity(), 0);
    }

    #[test]
    fn walk_visits_parent_before_children() {
        let left = ParseNode::leaf(Token::new(1, "a"));
        let right = ParseNode::leaf(Token::new(1, "b"));
        let root = ParseNode::new(Token::new(2, "and"), vec![left, right]);

        let mut seen = Vec::new();
        root.walk(&mut |n| seen.push(n.token.value.clone()));
        assert_eq!(seen, vec!["and", "a", "b"]);
    }

    #[test]
    fn semantic_reference_preserves_typed_literal() {
        let token = Token::new(3, "18").with_semantic(SemanticValue::Int64(18));
        assert_eq!(token.semantic_reference, Some(SemanticValue::Int64(18)));
    }
}
