//! Shell configuration

/// Default capacity of the byte pipe between two pipeline segments.
pub const DEFAULT_PIPE_BUFFER_SIZE: usize = 64 * 1024;

/// Tunables for a shell session.
#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Bytes buffered in each inter-segment pipe before the writer waits
    /// Default: 64 KiB
    pub pipe_buffer_size: usize,

    /// List the new working directory in the background after `cd`
    /// Default: true
    pub prefetch_on_cd: bool,

    /// Folder levels listed from the root when the session starts (0 = none)
    /// Default: 1
    pub preload_depth: usize,

    /// Expand wildcards inside quoted arguments too
    /// Default: false
    pub expand_quoted_globs: bool,

    /// Target of a bare `cd`
    /// Default: "/"
    pub home: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            pipe_buffer_size: DEFAULT_PIPE_BUFFER_SIZE,
            prefetch_on_cd: true,
            preload_depth: 1,
            expand_quoted_globs: false,
            home: "/".to_string(),
        }
    }
}

impl ShellConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the inter-segment pipe capacity (minimum 1 byte)
    pub fn pipe_buffer_size(mut self, size: usize) -> Self {
        self.pipe_buffer_size = size.max(1);
        self
    }

    /// Enable or disable background listing after `cd`
    pub fn prefetch_on_cd(mut self, enabled: bool) -> Self {
        self.prefetch_on_cd = enabled;
        self
    }

    /// Set how many folder levels to preload at session start
    pub fn preload_depth(mut self, depth: usize) -> Self {
        self.preload_depth = depth;
        self
    }

    /// Expand wildcards in quoted arguments
    pub fn expand_quoted_globs(mut self, enabled: bool) -> Self {
        self.expand_quoted_globs = enabled;
        self
    }

    /// Set the home folder
    pub fn home(mut self, home: impl Into<String>) -> Self {
        self.home = crate::paths::normalize(&home.into());
        self
    }
}
