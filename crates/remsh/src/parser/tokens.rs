//! Token types for the lexer

use std::fmt;

/// Kinds of tokens produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A word (command name, argument, redirection target)
    Word,

    /// Pipe (|)
    Pipe,

    /// Redirect input (<)
    RedirectIn,

    /// Redirect output (>)
    RedirectOut,

    /// Redirect output append (>>)
    RedirectAppend,

    /// Redirect stderr (2>)
    RedirectErr,

    /// Redirect stderr append (2>>)
    RedirectErrAppend,

    /// Duplicate stderr onto stdout (2>&1)
    RedirectErrToOut,

    /// Redirect both stdout and stderr (&> or >&)
    RedirectAll,

    /// And (&&)
    And,

    /// Or (||)
    Or,

    /// Semicolon (;)
    Semicolon,
}

impl TokenKind {
    /// Chain operators split a line into pipelines.
    pub fn is_chain_operator(self) -> bool {
        matches!(self, Self::And | Self::Or | Self::Semicolon)
    }

    /// Redirection operators consume the following word as a target,
    /// except `2>&1` which names no file.
    pub fn is_redirect(self) -> bool {
        matches!(
            self,
            Self::RedirectIn
                | Self::RedirectOut
                | Self::RedirectAppend
                | Self::RedirectErr
                | Self::RedirectErrAppend
                | Self::RedirectErrToOut
                | Self::RedirectAll
        )
    }
}

/// A token with its text and quoting flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Unquoted, unescaped text (for operators, the operator itself)
    pub value: String,
    pub kind: TokenKind,
    /// Set when any character of the word came from inside quotes
    pub quoted: bool,
}

impl Token {
    /// Create a word token.
    pub fn word(value: impl Into<String>, quoted: bool) -> Self {
        Self {
            value: value.into(),
            kind: TokenKind::Word,
            quoted,
        }
    }

    /// Create an operator token.
    pub fn operator(kind: TokenKind, text: &str) -> Self {
        Self {
            value: text.to_string(),
            kind,
            quoted: false,
        }
    }

    pub fn is_word(&self) -> bool {
        self.kind == TokenKind::Word
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}
