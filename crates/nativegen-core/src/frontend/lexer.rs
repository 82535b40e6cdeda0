//! Tokenizer for Java source text.
//!
//! Only what the declaration parser needs is distinguished: identifiers
//! (keywords included), literals, `...` and single-character punctuation.
//! Multi-character operators are left as runs of punctuation, which keeps
//! `>>` in nested generic arguments trivial to handle.

use crate::error::{Error, Result};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Tok {
    Ident(String),
    Str(String),
    Char(char),
    /// Numeric literal as written, underscores and suffix included
    Number(String),
    Ellipsis,
    Punct(char),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub(crate) tok: Tok,
    pub(crate) line: usize,
    pub(crate) column: usize,
}

impl Token {
    pub(crate) fn describe(&self) -> String {
        match &self.tok {
            Tok::Ident(s) => format!("'{s}'"),
            Tok::Str(_) => "string literal".to_string(),
            Tok::Char(_) => "character literal".to_string(),
            Tok::Number(n) => format!("'{n}'"),
            Tok::Ellipsis => "'...'".to_string(),
            Tok::Punct(c) => format!("'{c}'"),
            Tok::Eof => "end of file".to_string(),
        }
    }
}

struct Lexer<'a> {
    path: &'a Path,
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

/// Splits `source` into tokens, terminated by [`Tok::Eof`]
pub(crate) fn tokenize(path: &Path, source: &str) -> Result<Vec<Token>> {
    let mut lexer = Lexer {
        path,
        chars: source.chars().collect(),
        pos: 0,
        line: 1,
        column: 1,
    };
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.tok == Tok::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

impl<'a> Lexer<'a> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn error(&self, line: usize, column: usize, message: impl Into<String>) -> Error {
        Error::compilation(self.path, line, column, message)
    }

    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                (Some('/'), Some('*')) => {
                    let (line, column) = (self.line, self.column);
                    self.bump();
                    self.bump();
                    loop {
                        match (self.peek(), self.peek_at(1)) {
                            (Some('*'), Some('/')) => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            (Some(_), _) => {
                                self.bump();
                            }
                            (None, _) => {
                                return Err(self.error(line, column, "unterminated comment"));
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        self.skip_trivia()?;
        let (line, column) = (self.line, self.column);
        let Some(ch) = self.peek() else {
            return Ok(Token { tok: Tok::Eof, line, column });
        };

        let tok = if ch.is_alphabetic() || ch == '_' || ch == '$' {
            let mut ident = String::new();
            while let Some(c) = self.peek() {
                if c.is_alphanumeric() || c == '_' || c == '$' {
                    ident.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
            Tok::Ident(ident)
        } else if ch.is_ascii_digit() || (ch == '.' && self.peek_at(1).is_some_and(|c| c.is_ascii_digit())) {
            Tok::Number(self.number())
        } else if ch == '"' {
            if self.peek_at(1) == Some('"') && self.peek_at(2) == Some('"') {
                Tok::Str(self.text_block(line, column)?)
            } else {
                Tok::Str(self.string(line, column)?)
            }
        } else if ch == '\'' {
            Tok::Char(self.char_literal(line, column)?)
        } else if ch == '.' && self.peek_at(1) == Some('.') && self.peek_at(2) == Some('.') {
            self.bump();
            self.bump();
            self.bump();
            Tok::Ellipsis
        } else if ch == '\\' || ch == '#' || ch == '`' {
            return Err(self.error(line, column, format!("illegal character '{ch}'")));
        } else {
            self.bump();
            Tok::Punct(ch)
        };
        Ok(Token { tok, line, column })
    }

    fn number(&mut self) -> String {
        let mut text = String::new();
        let hex = self.peek() == Some('0') && matches!(self.peek_at(1), Some('x' | 'X'));
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                text.push(c);
                self.bump();
                let exponent = if hex { matches!(c, 'p' | 'P') } else { matches!(c, 'e' | 'E') };
                if exponent && matches!(self.peek(), Some('+' | '-')) {
                    if let Some(sign) = self.bump() {
                        text.push(sign);
                    }
                }
            } else {
                break;
            }
        }
        text
    }

    fn escape(&mut self, line: usize, column: usize) -> Result<char> {
        let Some(c) = self.bump() else {
            return Err(self.error(line, column, "unterminated escape sequence"));
        };
        Ok(match c {
            'n' => '\n',
            't' => '\t',
            'b' => '\u{8}',
            'r' => '\r',
            'f' => '\u{c}',
            's' => ' ',
            '"' => '"',
            '\'' => '\'',
            '\\' => '\\',
            'u' => {
                while self.peek() == Some('u') {
                    self.bump();
                }
                let mut code = 0u32;
                for _ in 0..4 {
                    let digit = self
                        .bump()
                        .and_then(|d| d.to_digit(16))
                        .ok_or_else(|| self.error(line, column, "malformed unicode escape"))?;
                    code = code * 16 + digit;
                }
                char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
            }
            '0'..='7' => {
                let mut code = c.to_digit(8).unwrap_or(0);
                let max_digits = if c <= '3' { 2 } else { 1 };
                for _ in 0..max_digits {
                    match self.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            code = code * 8 + d;
                            self.bump();
                        }
                        None => break,
                    }
                }
                char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
            }
            other => {
                return Err(self.error(line, column, format!("illegal escape character '\\{other}'")))
            }
        })
    }

    fn string(&mut self, line: usize, column: usize) -> Result<String> {
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(value),
                Some('\\') => value.push(self.escape(line, column)?),
                Some('\n') | None => {
                    return Err(self.error(line, column, "unterminated string literal"));
                }
                Some(c) => value.push(c),
            }
        }
    }

    fn text_block(&mut self, line: usize, column: usize) -> Result<String> {
        for _ in 0..3 {
            self.bump();
        }
        // The opening delimiter must be followed by a line terminator.
        while matches!(self.peek(), Some(' ' | '\t' | '\u{c}')) {
            self.bump();
        }
        if self.bump() != Some('\n') {
            return Err(self.error(line, column, "text block must start on a new line"));
        }
        let mut raw = String::new();
        loop {
            match self.peek() {
                Some('"') if self.peek_at(1) == Some('"') && self.peek_at(2) == Some('"') => {
                    for _ in 0..3 {
                        self.bump();
                    }
                    break;
                }
                Some('\\') => {
                    self.bump();
                    raw.push(self.escape(line, column)?);
                }
                Some(c) => {
                    raw.push(c);
                    self.bump();
                }
                None => return Err(self.error(line, column, "unterminated text block")),
            }
        }
        Ok(strip_indent(&raw))
    }

    fn char_literal(&mut self, line: usize, column: usize) -> Result<char> {
        self.bump();
        let value = match self.bump() {
            Some('\\') => self.escape(line, column)?,
            Some('\'') | Some('\n') | None => {
                return Err(self.error(line, column, "empty or unterminated character literal"));
            }
            Some(c) => c,
        };
        if self.bump() != Some('\'') {
            return Err(self.error(line, column, "unterminated character literal"));
        }
        Ok(value)
    }
}

/// Removes the common leading whitespace of a text block's lines
fn strip_indent(raw: &str) -> String {
    let lines: Vec<&str> = raw.split('\n').collect();
    let indent = lines
        .iter()
        .enumerate()
        .filter(|(i, l)| !l.trim().is_empty() || *i == lines.len() - 1)
        .map(|(_, l)| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| l.get(indent..).unwrap_or("").trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}
