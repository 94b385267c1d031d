//! Logging helpers for remsh
//!
//! # Log Levels
//!
//! - **WARN**: Recoverable failures (background prefetch, preload of a subfolder)
//! - **DEBUG**: Line parsing, pipeline start, segment dispatch, cache fetches,
//!   redirection open/close, context switches
//! - **TRACE**: Token streams and per-argument expansion
//!
//! Command lines can carry object names users consider private, so raw line
//! content is only logged when explicitly enabled.

use std::borrow::Cow;

/// Configuration for logging behavior
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether to include raw line content in logs (default: false)
    pub log_line_content: bool,

    /// Maximum length of logged values before truncation (default: 200)
    pub max_value_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_line_content: false,
            max_value_length: 200,
        }
    }
}

impl LogConfig {
    /// Create a new log configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Log the text of every executed line
    pub fn log_line_content(mut self, enabled: bool) -> Self {
        self.log_line_content = enabled;
        self
    }

    /// Set maximum length for logged values
    pub fn max_value_length(mut self, len: usize) -> Self {
        self.max_value_length = len;
        self
    }

    /// Truncate value if it exceeds max length, on a char boundary.
    pub fn truncate<'a>(&self, value: &'a str) -> Cow<'a, str> {
        if value.len() <= self.max_value_length {
            return Cow::Borrowed(value);
        }
        let mut end = self.max_value_length;
        while end > 0 && !value.is_char_boundary(end) {
            end -= 1;
        }
        Cow::Owned(format!(
            "{}...[truncated {} bytes]",
            &value[..end],
            value.len() - end
        ))
    }
}

/// Escape characters that could forge extra log records.
pub fn sanitize_for_log(input: &str) -> String {
    input
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
        .chars()
        .filter(|c| !c.is_control())
        .collect()
}

/// Describe a command line for logging.
pub fn format_line_for_log(line: &str, tokens: usize, config: &LogConfig) -> String {
    if !config.log_line_content {
        return format!("[line: {} bytes, {} tokens]", line.len(), tokens);
    }
    config.truncate(&sanitize_for_log(line)).into_owned()
}
