//! Error types for remsh
//!
//! One enum covers every stage of line execution:
//! - Lexical and syntax errors abort the whole line before anything runs
//! - Expansion and dispatch errors abort the pipeline they occur in
//! - Runtime errors (handler failures, redirection close failures) become the
//!   pipeline's result and feed the `&&` / `||` gating of the chain

use thiserror::Error;

/// Result type alias using remsh's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// remsh error types.
#[derive(Error, Debug)]
pub enum Error {
    /// Tokenizer failure (unterminated quote, trailing backslash).
    #[error("syntax error at column {column}: {message}")]
    Lex { message: String, column: usize },

    /// Parser failure naming the offending construct.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// Glob expansion could not resolve the pattern's directory.
    #[error("cannot expand '{pattern}': {reason}")]
    Expansion { pattern: String, reason: String },

    /// No handler registered under this name.
    #[error("command not found: {0}")]
    CommandNotFound(String),

    /// Remote path does not exist.
    #[error("{0}: no such file or directory")]
    NotFound(String),

    /// Remote path is a folder where a file was expected.
    #[error("{0}: is a directory")]
    IsDirectory(String),

    /// Remote path is a file where a folder was expected.
    #[error("{0}: not a directory")]
    NotADirectory(String),

    /// Remote path is already taken.
    #[error("{0}: already exists")]
    AlreadyExists(String),

    /// Handler finished unsuccessfully without a more specific cause.
    #[error("exit status {0}")]
    ExitStatus(i32),

    /// Handler was invoked with arguments it cannot accept.
    #[error("usage: {0}")]
    Usage(String),

    /// Failure of one segment inside a multi-segment pipeline.
    #[error("{command}: {source}")]
    Segment {
        command: String,
        #[source]
        source: Box<Error>,
    },

    /// I/O error from pipes or local streams.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Error reported by the remote storage backend.
    #[error("remote error: {0}")]
    Remote(String),

    /// The invocation was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// Internal error for unexpected failures.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a lexical error at a 1-based column.
    pub fn lex(message: impl Into<String>, column: usize) -> Self {
        Self::Lex {
            message: message.into(),
            column,
        }
    }

    /// Create a syntax error.
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax(message.into())
    }

    /// Tag an error with the command name of the segment that produced it.
    pub fn in_segment(self, command: impl Into<String>) -> Self {
        Self::Segment {
            command: command.into(),
            source: Box::new(self),
        }
    }

    /// Lexical errors abort the line before parsing.
    pub fn is_lexical(&self) -> bool {
        matches!(self, Self::Lex { .. })
    }

    /// Syntax errors abort the line before execution.
    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax(_))
    }

    /// Shell-style exit status: the handler's own status for
    /// [`Error::ExitStatus`], 2 for lexical and syntax errors, 127 for an
    /// unknown command, otherwise 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ExitStatus(code) => *code,
            Self::Segment { source, .. } => source.exit_code(),
            Self::Lex { .. } | Self::Syntax(_) => 2,
            Self::CommandNotFound(_) => 127,
            _ => 1,
        }
    }

    /// True when the error (or the segment error it wraps) is a missing path.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Segment { source, .. } => source.is_not_found(),
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
