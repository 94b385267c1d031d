//! Parser module for remsh
//!
//! Groups lexer tokens into a [`CommandChain`]: chain operators are split
//! first, then each group is split on `|` into segments, and each segment's
//! redirections are classified and position-checked.

mod ast;
mod lexer;
mod tokens;

pub use ast::*;
pub use lexer::{tokenize, Lexer};
pub use tokens::{Token, TokenKind};

use crate::error::{Error, Result};

/// Tokenize and parse one line.
pub fn parse_line(line: &str) -> Result<CommandChain> {
    let tokens = tokenize(line)?;
    parse_chain(&tokens)
}

/// Parse a token list into a command chain.
///
/// Empty groups next to a chain operator (`; ls`, `ls ;`) are dropped.
pub fn parse_chain(tokens: &[Token]) -> Result<CommandChain> {
    let mut links = Vec::new();
    let mut start = 0;

    for (i, token) in tokens.iter().enumerate() {
        let operator = match token.kind {
            TokenKind::And => ChainOperator::And,
            TokenKind::Or => ChainOperator::Or,
            TokenKind::Semicolon => ChainOperator::Sequence,
            _ => continue,
        };
        let group = &tokens[start..i];
        if !group.is_empty() {
            links.push(ChainLink {
                pipeline: parse_pipeline(group)?,
                operator,
            });
        }
        start = i + 1;
    }

    let rest = &tokens[start..];
    if !rest.is_empty() {
        links.push(ChainLink {
            pipeline: parse_pipeline(rest)?,
            operator: ChainOperator::None,
        });
    } else if let Some(last) = links.last_mut() {
        // `a ;` - nothing follows the trailing operator
        last.operator = ChainOperator::None;
    }

    Ok(CommandChain { links })
}

/// Parse a group without chain operators into a pipeline.
fn parse_pipeline(tokens: &[Token]) -> Result<Pipeline> {
    let slices: Vec<&[Token]> = tokens.split(|t| t.kind == TokenKind::Pipe).collect();

    if slices.iter().any(|s| s.is_empty()) {
        return Err(Error::syntax("unexpected token `|`"));
    }

    let last = slices.len() - 1;
    let segments = slices
        .iter()
        .enumerate()
        .map(|(index, slice)| parse_segment(slice, index, last))
        .collect::<Result<Vec<_>>>()?;

    Ok(Pipeline { segments })
}

/// Parse one segment's tokens. `index`/`last` locate it within its pipeline.
fn parse_segment(tokens: &[Token], index: usize, last: usize) -> Result<Segment> {
    let mut name: Option<String> = None;
    let mut segment = Segment::new("");
    let mut iter = tokens.iter();

    while let Some(token) = iter.next() {
        match token.kind {
            TokenKind::Word => {
                if name.is_none() {
                    name = Some(token.value.clone());
                } else {
                    segment.args.push(Word::new(token.value.clone(), token.quoted));
                }
            }
            TokenKind::RedirectErrToOut => {
                segment.merge_stderr = true;
                segment.error = None;
            }
            kind => {
                let op = token.value.as_str();
                if kind == TokenKind::RedirectIn && index != 0 {
                    return Err(Error::syntax(format!(
                        "input redirection '{op}' only allowed on first command of pipeline"
                    )));
                }
                if kind != TokenKind::RedirectIn && index != last {
                    return Err(Error::syntax(format!(
                        "output redirection '{op}' only allowed on last command of pipeline"
                    )));
                }

                let path = match iter.next() {
                    Some(t) if t.is_word() => t.value.clone(),
                    _ => return Err(Error::syntax(format!("missing filename after '{op}'"))),
                };

                match kind {
                    TokenKind::RedirectIn => segment.input = Some(path),
                    TokenKind::RedirectOut | TokenKind::RedirectAppend => {
                        segment.output = Some(OutputTarget {
                            path,
                            append: kind == TokenKind::RedirectAppend,
                        });
                    }
                    TokenKind::RedirectErr | TokenKind::RedirectErrAppend => {
                        segment.error = Some(OutputTarget {
                            path,
                            append: kind == TokenKind::RedirectErrAppend,
                        });
                        segment.merge_stderr = false;
                    }
                    TokenKind::RedirectAll => {
                        segment.output = Some(OutputTarget { path, append: false });
                        segment.error = None;
                        segment.merge_stderr = true;
                    }
                    other => {
                        return Err(Error::Internal(format!(
                            "unexpected {other:?} token in segment"
                        )));
                    }
                }
            }
        }
    }

    match name {
        Some(name) => {
            segment.name = name;
            Ok(segment)
        }
        None => Err(Error::syntax("missing command name")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_line_is_one_segment() {
        let chain = parse_line("ls -l /docs").unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.links[0].operator, ChainOperator::None);
        let pipeline = &chain.links[0].pipeline;
        assert_eq!(pipeline.len(), 1);
        assert_eq!(pipeline.segments[0].name, "ls");
        assert_eq!(pipeline.segments[0].argv(), vec!["-l", "/docs"]);
    }

    #[test]
    fn test_chain_operators_attach_to_preceding_pipeline() {
        let chain = parse_line("a && b || c ; d").unwrap();
        let ops: Vec<_> = chain.links.iter().map(|l| l.operator).collect();
        assert_eq!(
            ops,
            vec![
                ChainOperator::And,
                ChainOperator::Or,
                ChainOperator::Sequence,
                ChainOperator::None,
            ]
        );
    }

    #[test]
    fn test_empty_groups_dropped() {
        let chain = parse_line("; ls ;").unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.links[0].operator, ChainOperator::None);

        let chain = parse_line("").unwrap();
        assert!(chain.is_empty());
    }

    #[test]
    fn test_pipeline_segments() {
        let chain = parse_line("cat a.txt | grep x | wc").unwrap();
        assert_eq!(chain.links[0].pipeline.names(), vec!["cat", "grep", "wc"]);
    }

    #[test]
    fn test_empty_pipe_segment() {
        let err = parse_line("cmd1 | | cmd2").unwrap_err();
        assert!(err.is_syntax());
        assert!(err.to_string().contains("unexpected token"));

        assert!(parse_line("| cmd").is_err());
        assert!(parse_line("cmd |").is_err());
    }

    #[test]
    fn test_redirect_targets() {
        let chain = parse_line("sort < in.txt > out.txt 2>> err.log").unwrap();
        let seg = &chain.links[0].pipeline.segments[0];
        assert_eq!(seg.input.as_deref(), Some("in.txt"));
        assert_eq!(
            seg.output,
            Some(OutputTarget {
                path: "out.txt".into(),
                append: false
            })
        );
        assert_eq!(
            seg.error,
            Some(OutputTarget {
                path: "err.log".into(),
                append: true
            })
        );
        assert!(!seg.merge_stderr);
        assert!(seg.args.is_empty());
    }

    #[test]
    fn test_redirect_all_sets_merge() {
        let chain = parse_line("cmd &> all.log").unwrap();
        let seg = &chain.links[0].pipeline.segments[0];
        assert_eq!(seg.output.as_ref().unwrap().path, "all.log");
        assert!(seg.merge_stderr);

        let chain = parse_line("cmd >& all.log").unwrap();
        assert!(chain.links[0].pipeline.segments[0].merge_stderr);
    }

    #[test]
    fn test_last_stderr_redirect_wins() {
        let chain = parse_line("cmd 2> e.log 2>&1").unwrap();
        let seg = &chain.links[0].pipeline.segments[0];
        assert!(seg.merge_stderr);
        assert!(seg.error.is_none());

        let chain = parse_line("cmd 2>&1 2> e.log").unwrap();
        let seg = &chain.links[0].pipeline.segments[0];
        assert!(!seg.merge_stderr);
        assert!(seg.error.is_some());
    }

    #[test]
    fn test_merge_allowed_mid_pipeline() {
        let chain = parse_line("cmd 2>&1 | cat").unwrap();
        assert!(chain.links[0].pipeline.segments[0].merge_stderr);
    }

    #[test]
    fn test_input_redirect_only_first() {
        let chain = parse_line("cmd < in.txt | cmd2").unwrap();
        assert_eq!(chain.links[0].pipeline.len(), 2);

        let err = parse_line("cmd | cmd2 < in.txt").unwrap_err();
        assert!(err.to_string().contains("only allowed on first"));
        assert!(err.to_string().contains("'<'"));
    }

    #[test]
    fn test_output_redirect_only_last() {
        let err = parse_line("cmd1 > out.txt | cmd2").unwrap_err();
        assert!(err.to_string().contains("only allowed on last"));
        assert!(err.to_string().contains("'>'"));

        let err = parse_line("cmd1 2> e | cmd2").unwrap_err();
        assert!(err.to_string().contains("'2>'"));
    }

    #[test]
    fn test_missing_filename() {
        let err = parse_line("cmd >").unwrap_err();
        assert!(err.to_string().contains("missing filename after '>'"));

        let err = parse_line("cmd < && b").unwrap_err();
        assert!(err.to_string().contains("missing filename after '<'"));
    }

    #[test]
    fn test_missing_command_name() {
        let err = parse_line("> out.txt").unwrap_err();
        assert!(err.to_string().contains("missing command"));
    }

    #[test]
    fn test_quoted_flag_reaches_segment() {
        let chain = parse_line("rm '*.tmp' *.bak").unwrap();
        let args = &chain.links[0].pipeline.segments[0].args;
        assert!(args[0].quoted);
        assert!(!args[1].quoted);
    }
}
