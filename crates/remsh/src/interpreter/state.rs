//! Interpreter state types

use crate::error::Error;

/// Result of executing one command line.
#[derive(Debug, Default)]
pub struct ExecResult {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
    /// Error of the last pipeline that ran, if it failed
    pub error: Option<Error>,
}

impl ExecResult {
    /// Check if the result indicates success.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Shell-style exit code: 0 on success, else [`Error::exit_code`].
    pub fn exit_code(&self) -> i32 {
        match &self.error {
            None => 0,
            Some(err) => err.exit_code(),
        }
    }
}
