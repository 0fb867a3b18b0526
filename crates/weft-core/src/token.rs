//! Token output for lexer-style rule sets.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::location::Span;

/// Numeric tag identifying a token class, assigned by the grammar author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenKind(pub u16);

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A converted token payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Flag(bool),
}

/// One token produced by repeatedly matching a root rule over input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Name of the rule that produced this token.
    pub rule: String,
    /// Class tag, if the rule declares one.
    pub kind: Option<TokenKind>,
    /// Captured text of the match.
    pub text: String,
    /// Converted payload, if the rule declares a converter.
    pub value: Option<TokenValue>,
    /// Input region the token covers.
    pub span: Span,
}
