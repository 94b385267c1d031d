//! Parsed command-line structures
//!
//! These types are the contract between the parser and anything that executes
//! or inspects a line: a [`CommandChain`] of [`Pipeline`]s, each a list of
//! [`Segment`]s.

/// A word after quote removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub text: String,
    /// Any part of the word was quoted in the source line
    pub quoted: bool,
}

impl Word {
    pub fn new(text: impl Into<String>, quoted: bool) -> Self {
        Self {
            text: text.into(),
            quoted,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Where a redirected output stream goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub path: String,
    pub append: bool,
}

/// One command invocation within a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub name: String,
    pub args: Vec<Word>,
    /// `< path`
    pub input: Option<String>,
    /// `> path` / `>> path` / `&> path`
    pub output: Option<OutputTarget>,
    /// `2> path` / `2>> path`
    pub error: Option<OutputTarget>,
    /// `2>&1` or `&>`: stderr follows stdout
    pub merge_stderr: bool,
}

impl Segment {
    /// Create a segment with no redirections.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            input: None,
            output: None,
            error: None,
            merge_stderr: false,
        }
    }

    /// Argument texts without quoting information.
    pub fn argv(&self) -> Vec<String> {
        self.args.iter().map(|w| w.text.clone()).collect()
    }

    pub fn has_redirects(&self) -> bool {
        self.input.is_some() || self.output.is_some() || self.error.is_some() || self.merge_stderr
    }
}

/// Segments joined by `|`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub segments: Vec<Segment>,
}

impl Pipeline {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Command names in order, for logging.
    pub fn names(&self) -> Vec<&str> {
        self.segments.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Operator following a pipeline in a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOperator {
    /// Last pipeline of the chain
    None,
    /// `&&`: next runs only on success
    And,
    /// `||`: next runs only on failure
    Or,
    /// `;`: next always runs
    Sequence,
}

impl ChainOperator {
    /// Whether the pipeline after this operator runs, given the outcome so far.
    pub fn allows_next(self, failed: bool) -> bool {
        match self {
            Self::And => !failed,
            Self::Or => failed,
            Self::Sequence | Self::None => true,
        }
    }
}

/// One pipeline plus the operator that follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLink {
    pub pipeline: Pipeline,
    pub operator: ChainOperator,
}

/// Pipelines joined by `&&`, `||` and `;`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandChain {
    pub links: Vec<ChainLink>,
}

impl CommandChain {
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}
