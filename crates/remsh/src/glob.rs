//! Wildcard expansion against the virtual cache
//!
//! Patterns support:
//! - `*` any run of characters, `?` exactly one
//! - `[abc]`, `[a-z]`, `[!x]` / `[^x]` character classes
//! - `{a,b}` alternatives
//!
//! Names starting with `.` only match a pattern component that starts with `.`.
//! Extended-glob forms (`!(..)`, `+(..)`, `@(..)`) are not supported and are
//! passed through untouched.

use tracing::trace;

use crate::cache::{loader, VirtualCache};
use crate::error::{Error, Result};
use crate::parser::Word;
use crate::paths;
use crate::remote::RemoteStore;

/// Whether an argument contains wildcard metacharacters.
pub fn is_pattern(arg: &str) -> bool {
    arg.contains(['*', '?', '[', '{'])
}

/// Whether an argument uses extended-glob syntax.
pub fn is_extglob(arg: &str) -> bool {
    ["!(", "+(", "@("].iter().any(|op| arg.contains(op))
}

/// Most alternatives a pattern's brace groups may expand to. Past this the
/// pattern is matched literally.
pub const MAX_BRACE_ALTERNATIVES: usize = 1024;

/// A path-component pattern with its brace groups expanded.
#[derive(Debug, Clone)]
pub struct Pattern {
    alternatives: Vec<Vec<char>>,
}

impl Pattern {
    pub fn new(pattern: &str) -> Self {
        Self {
            alternatives: expand_braces(pattern)
                .iter()
                .map(|alternative| alternative.chars().collect())
                .collect(),
        }
    }

    /// Whether `name` matches any alternative.
    pub fn matches(&self, name: &str) -> bool {
        let name: Vec<char> = name.chars().collect();
        let hidden = name.first() == Some(&'.');

        self.alternatives.iter().any(|pattern| {
            if hidden && pattern.first() != Some(&'.') {
                return false;
            }
            match_chars(pattern, &name)
        })
    }
}

/// Match one path component against a pattern.
///
/// ```
/// use remsh::glob::glob_match;
///
/// assert!(glob_match("*.txt", "notes.txt"));
/// assert!(glob_match("report-[0-9].{csv,md}", "report-3.md"));
/// assert!(!glob_match("*", ".hidden"));
/// ```
pub fn glob_match(pattern: &str, name: &str) -> bool {
    Pattern::new(pattern).matches(name)
}

/// Expand `{a,b}` alternatives into plain patterns, left to right.
///
/// A brace group without a top-level comma, or without a closing brace, is
/// literal. A pattern expanding past [`MAX_BRACE_ALTERNATIVES`] comes back
/// unexpanded.
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let mut out = Vec::new();
    if expand_into(pattern, &mut out) {
        out
    } else {
        vec![pattern.to_string()]
    }
}

/// Push the expansions of `pattern` onto `out`; false once the cap is hit.
fn expand_into(pattern: &str, out: &mut Vec<String>) -> bool {
    let chars: Vec<char> = pattern.chars().collect();

    for (open, _) in chars.iter().enumerate().filter(|(_, c)| **c == '{') {
        let Some((close, commas)) = brace_group(&chars, open) else {
            continue;
        };
        if commas.is_empty() {
            continue;
        }

        let prefix: String = chars[..open].iter().collect();
        let suffix: String = chars[close + 1..].iter().collect();
        let mut bounds = vec![open];
        bounds.extend(commas);
        bounds.push(close);

        return bounds.windows(2).all(|w| {
            let alternative: String = chars[w[0] + 1..w[1]].iter().collect();
            expand_into(&format!("{prefix}{alternative}{suffix}"), out)
        });
    }

    if out.len() >= MAX_BRACE_ALTERNATIVES {
        return false;
    }
    out.push(pattern.to_string());
    true
}

/// Closing index and top-level comma positions of the group opening at `open`.
fn brace_group(chars: &[char], open: usize) -> Option<(usize, Vec<usize>)> {
    let mut depth = 0usize;
    let mut commas = Vec::new();
    for (i, &c) in chars.iter().enumerate().skip(open) {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((i, commas));
                }
            }
            ',' if depth == 1 => commas.push(i),
            _ => {}
        }
    }
    None
}

/// Iterative matcher; backtracks only to the most recent `*`.
fn match_chars(pattern: &[char], name: &[char]) -> bool {
    let (mut p, mut n) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while n < name.len() {
        let step = match pattern.get(p) {
            Some('*') => {
                star = Some((p, n));
                p += 1;
                continue;
            }
            Some('?') => Some(1),
            Some('[') => match match_class(&pattern[p..], name[n]) {
                Some((true, len)) => Some(len),
                Some((false, _)) => None,
                // no closing bracket: literal '['
                None => (name[n] == '[').then_some(1),
            },
            Some('\\') if p + 1 < pattern.len() => (pattern[p + 1] == name[n]).then_some(2),
            Some(&c) => (c == name[n]).then_some(1),
            None => None,
        };

        match (step, star) {
            (Some(len), _) => {
                p += len;
                n += 1;
            }
            (None, Some((star_p, star_n))) => {
                p = star_p + 1;
                n = star_n + 1;
                star = Some((star_p, star_n + 1));
            }
            (None, None) => return false,
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Match `ch` against the class starting at `pattern[0] == '['`.
///
/// Returns whether it matched and how many pattern chars the class spans, or
/// `None` when the class is never closed.
fn match_class(pattern: &[char], ch: char) -> Option<(bool, usize)> {
    let negate = matches!(pattern.get(1), Some('!' | '^'));
    let first = if negate { 2 } else { 1 };
    let mut i = first;
    let mut matched = false;

    loop {
        let c = *pattern.get(i)?;
        if c == ']' && i > first {
            return Some((matched != negate, i + 1));
        }
        match (pattern.get(i + 1), pattern.get(i + 2)) {
            (Some('-'), Some(&end)) if end != ']' => {
                matched |= c <= ch && ch <= end;
                i += 3;
            }
            _ => {
                matched |= c == ch;
                i += 1;
            }
        }
    }
}

/// Expands wildcard arguments of one segment.
pub struct GlobExpander<'a> {
    cache: &'a VirtualCache,
    remote: &'a dyn RemoteStore,
    cwd: &'a str,
    expand_quoted: bool,
}

impl<'a> GlobExpander<'a> {
    pub fn new(
        cache: &'a VirtualCache,
        remote: &'a dyn RemoteStore,
        cwd: &'a str,
        expand_quoted: bool,
    ) -> Self {
        Self {
            cache,
            remote,
            cwd,
            expand_quoted,
        }
    }

    /// Expand every argument, keeping order.
    ///
    /// A pattern with no matches stays as written. Matches are sorted and keep
    /// the argument's relative or absolute form.
    pub async fn expand(&self, args: &[Word]) -> Result<Vec<String>> {
        let mut out = Vec::with_capacity(args.len());
        for word in args {
            let text = word.as_str();
            if !is_pattern(text) || is_extglob(text) || (word.quoted && !self.expand_quoted) {
                out.push(text.to_string());
                continue;
            }

            let matches = self.expand_pattern(text).await?;
            trace!(pattern = text, matches = matches.len(), "expanded argument");
            if matches.is_empty() {
                out.push(text.to_string());
            } else {
                out.extend(matches);
            }
        }
        Ok(out)
    }

    /// Walk the pattern one component at a time.
    ///
    /// Each candidate pairs the text shown to the command with the absolute
    /// folder it names.
    async fn expand_pattern(&self, pattern: &str) -> Result<Vec<String>> {
        let absolute = pattern.starts_with('/');
        let folders_only = pattern.ends_with('/');
        let components: Vec<&str> = pattern.split('/').filter(|c| !c.is_empty()).collect();
        let last = components.len().saturating_sub(1);

        let start = if absolute {
            ("/".to_string(), "/".to_string())
        } else {
            (String::new(), paths::normalize(self.cwd))
        };
        let mut candidates = vec![start];
        let mut wildcard_seen = false;

        for (i, component) in components.iter().enumerate() {
            let need_folder = i < last || folders_only;
            let mut next = Vec::new();

            if !is_pattern(component) {
                for (shown, dir) in candidates {
                    let target = paths::resolve(&dir, component);
                    // a literal after a wildcard must exist
                    if wildcard_seen && !self.exists(&dir, component, need_folder, pattern).await? {
                        continue;
                    }
                    next.push((display_join(&shown, component), target));
                }
            } else {
                wildcard_seen = true;
                for (shown, dir) in candidates {
                    if !self.load(&dir, pattern).await? {
                        continue;
                    }
                    for path in self.cache.match_glob(&dir, component) {
                        if need_folder && !self.cache.get(&path).is_some_and(|e| e.is_folder()) {
                            continue;
                        }
                        next.push((display_join(&shown, paths::file_name(&path)), path));
                    }
                }
            }

            candidates = next;
            if candidates.is_empty() {
                break;
            }
        }

        let mut matches: Vec<String> = candidates
            .into_iter()
            .map(|(shown, _)| if folders_only { format!("{shown}/") } else { shown })
            .collect();
        matches.sort();
        Ok(matches)
    }

    /// Load a folder's children. `false` if it is missing or not a folder.
    async fn load(&self, dir: &str, pattern: &str) -> Result<bool> {
        if self.cache.get(dir).is_some_and(|e| !e.is_folder()) {
            return Ok(false);
        }
        match loader::ensure_children(self.cache, self.remote, dir).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() || matches!(e, Error::NotADirectory(_)) => Ok(false),
            Err(e) => Err(Error::Expansion {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn exists(&self, dir: &str, name: &str, need_folder: bool, pattern: &str) -> Result<bool> {
        if name == "." || name == ".." {
            return Ok(true);
        }
        if !self.load(dir, pattern).await? {
            return Ok(false);
        }
        let path = paths::join(dir, name);
        Ok(self
            .cache
            .get(&path)
            .is_some_and(|e| !need_folder || e.is_folder()))
    }
}

fn display_join(shown: &str, name: &str) -> String {
    if shown.is_empty() {
        name.to_string()
    } else if shown.ends_with('/') {
        format!("{shown}{name}")
    } else {
        format!("{shown}/{name}")
    }
}
