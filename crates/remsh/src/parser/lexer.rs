//! Lexer for shell lines
//!
//! Turns one input line into words and operators. Quoting and escaping are
//! resolved here, so word tokens carry their final text plus a flag recording
//! whether any part of them was quoted.

use super::tokens::{Token, TokenKind};
use crate::error::{Error, Result};

/// Operators in match order. Longer forms sharing a prefix come first.
const OPERATORS: &[(&str, TokenKind)] = &[
    ("&&", TokenKind::And),
    ("||", TokenKind::Or),
    ("|", TokenKind::Pipe),
    (";", TokenKind::Semicolon),
    ("2>&1", TokenKind::RedirectErrToOut),
    ("2>>", TokenKind::RedirectErrAppend),
    ("2>", TokenKind::RedirectErr),
    ("&>", TokenKind::RedirectAll),
    (">&", TokenKind::RedirectAll),
    (">>", TokenKind::RedirectAppend),
    (">", TokenKind::RedirectOut),
    ("<", TokenKind::RedirectIn),
];

/// Characters a backslash may escape inside double quotes.
const DQUOTE_ESCAPABLE: &[char] = &['"', '\\', '$', '`'];

/// Tokenize a line. Any lexical error aborts the whole line.
pub fn tokenize(line: &str) -> Result<Vec<Token>> {
    Lexer::new(line).run()
}

/// Lexer for a single shell line.
pub struct Lexer<'a> {
    input: &'a str,
    /// Byte offset of the next unread character
    pos: usize,
    tokens: Vec<Token>,
    word: String,
    /// A word is in progress (possibly empty, e.g. after `''`)
    in_word: bool,
    quoted: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            tokens: Vec::new(),
            word: String::new(),
            in_word: false,
            quoted: false,
        }
    }

    /// Consume the input and return all tokens.
    pub fn run(mut self) -> Result<Vec<Token>> {
        while let Some(ch) = self.peek_char() {
            match ch {
                c if c.is_whitespace() => {
                    self.finish_word();
                    self.advance();
                }
                '\'' => self.read_single_quoted()?,
                '"' => self.read_double_quoted()?,
                '\\' => {
                    let column = self.column();
                    self.advance();
                    match self.advance() {
                        Some(escaped) => self.push(escaped),
                        None => return Err(Error::lex("trailing backslash", column)),
                    }
                }
                _ => match self.match_operator() {
                    Some((text, kind)) => {
                        self.finish_word();
                        self.pos += text.len();
                        self.tokens.push(Token::operator(kind, text));
                    }
                    None => {
                        self.push(ch);
                        self.advance();
                    }
                },
            }
        }

        self.finish_word();
        Ok(self.tokens)
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    /// 1-based column of the next unread character.
    fn column(&self) -> usize {
        self.input[..self.pos].chars().count() + 1
    }

    fn push(&mut self, ch: char) {
        self.word.push(ch);
        self.in_word = true;
    }

    fn finish_word(&mut self) {
        if self.in_word {
            let text = std::mem::take(&mut self.word);
            self.tokens.push(Token::word(text, self.quoted));
        }
        self.in_word = false;
        self.quoted = false;
    }

    fn match_operator(&self) -> Option<(&'static str, TokenKind)> {
        let rest = &self.input[self.pos..];
        OPERATORS
            .iter()
            // fd-prefixed forms only start a token: `a2>f` is `a2` then `>`
            .filter(|(text, _)| !(self.in_word && text.starts_with('2')))
            .find(|(text, _)| rest.starts_with(text))
            .copied()
    }

    fn read_single_quoted(&mut self) -> Result<()> {
        let column = self.column();
        self.advance();
        self.in_word = true;
        self.quoted = true;

        loop {
            match self.advance() {
                Some('\'') => return Ok(()),
                Some(ch) => self.word.push(ch),
                None => return Err(Error::lex("unterminated single quote", column)),
            }
        }
    }

    fn read_double_quoted(&mut self) -> Result<()> {
        let column = self.column();
        self.advance();
        self.in_word = true;
        self.quoted = true;

        loop {
            match self.advance() {
                Some('"') => return Ok(()),
                Some('\\') => match self.peek_char() {
                    Some(next) if DQUOTE_ESCAPABLE.contains(&next) => {
                        self.advance();
                        self.word.push(next);
                    }
                    // Other backslashes are literal inside double quotes
                    _ => self.word.push('\\'),
                },
                Some(ch) => self.word.push(ch),
                None => return Err(Error::lex("unterminated double quote", column)),
            }
        }
    }
}
