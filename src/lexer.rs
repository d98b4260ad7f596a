// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt::{self, Debug, Formatter};
use core::iter::Peekable;
use core::str::CharIndices;
use std::rc::Rc;

use anyhow::{bail, Result};

/// A rule that could not be parsed.
///
/// Carried inside `anyhow::Error`; callers that need the position can
/// `downcast_ref::<SyntaxError>()`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("\n--> {rule}:{line}:{col}\n{}", caret_block(.line, .col, .source_line, .message))]
pub struct SyntaxError {
    pub rule: String,
    pub line: u32,
    pub col: u32,
    pub source_line: String,
    pub message: String,
}

fn caret_block(line: &u32, col: &u32, source_line: &str, message: &str) -> String {
    let line_str = format!("{line}");
    let line_num_width = line_str.len() + 1;
    let col_spaces = (*col as usize).saturating_sub(1);

    format!(
        "{:<line_num_width$}|\n\
         {:<line_num_width$}| {}\n\
         {:<line_num_width$}| {:<col_spaces$}^\n\
         error: {}",
        "", line, source_line, "", "", message
    )
}

struct SourceInternal {
    pub name: String,
    pub contents: String,
    pub lines: Vec<(u32, u32)>,
}

/// Text of one rule together with its line table.
#[derive(Clone)]
pub struct Source {
    src: Rc<SourceInternal>,
}

impl Debug for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        self.src.name.fmt(f)
    }
}

impl Source {
    pub fn from_contents(name: String, contents: String) -> Result<Source> {
        let max_size = u32::MAX as usize - 2;
        if contents.len() > max_size {
            bail!("rule {name} exceeds maximum allowed size {max_size}");
        }
        let mut lines = vec![];
        let mut prev_ch = ' ';
        let mut prev_pos = 0u32;
        let mut start = 0u32;
        for (i, ch) in contents.char_indices() {
            if ch == '\n' {
                let end = match prev_ch {
                    '\r' => prev_pos,
                    _ => i as u32,
                };
                lines.push((start, end));
                start = i as u32 + 1;
            }
            prev_ch = ch;
            prev_pos = i as u32;
        }

        if (start as usize) < contents.len() || contents.is_empty() {
            lines.push((start, contents.len() as u32));
        } else {
            let s = contents.len() as u32;
            lines.push((s, s));
        }
        Ok(Self {
            src: Rc::new(SourceInternal {
                name,
                contents,
                lines,
            }),
        })
    }

    pub fn name(&self) -> &String {
        &self.src.name
    }

    pub fn contents(&self) -> &String {
        &self.src.contents
    }

    pub fn line(&self, idx: u32) -> &str {
        let idx = idx as usize;
        if idx < self.src.lines.len() {
            let (start, end) = self.src.lines[idx];
            &self.src.contents[start as usize..end as usize]
        } else {
            ""
        }
    }

    pub fn syntax_error(&self, line: u32, col: u32, msg: &str) -> SyntaxError {
        SyntaxError {
            rule: self.src.name.clone(),
            line,
            col,
            source_line: self.line(line.saturating_sub(1)).to_string(),
            message: msg.to_string(),
        }
    }

    pub fn error(&self, line: u32, col: u32, msg: &str) -> anyhow::Error {
        anyhow::Error::new(self.syntax_error(line, col, msg))
    }
}

#[derive(Clone)]
pub struct Span {
    pub source: Source,
    pub line: u32,
    pub col: u32,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn text(&self) -> &str {
        &self.source.contents()[self.start as usize..self.end as usize]
    }

    pub fn error(&self, msg: &str) -> anyhow::Error {
        self.source.error(self.line, self.col, msg)
    }
}

impl Debug for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        let t = self.text().escape_debug().to_string();
        let max = 32;
        let (txt, trailer) = match t.char_indices().nth(max) {
            Some((cut, _)) => (&t[..cut], "..."),
            None => (t.as_str(), ""),
        };

        f.write_fmt(format_args!(
            "{}:{}:{}:{}, \"{}{}\"",
            self.line, self.col, self.start, self.end, txt, trailer
        ))
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TokenKind {
    Symbol,
    // Span excludes the quotes; escapes are still encoded.
    String,
    Number,
    Ident,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token(pub TokenKind, pub Span);

const TWO_CHAR_SYMBOLS: [&str; 8] = ["**", "//", "<<", ">>", "<=", ">=", "!=", "=="];

#[derive(Clone)]
pub struct Lexer<'source> {
    source: Source,
    iter: Peekable<CharIndices<'source>>,
    line: u32,
    col: u32,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source Source) -> Self {
        Self {
            source: source.clone(),
            iter: source.contents().char_indices().peekable(),
            line: 1,
            col: 1,
        }
    }

    fn peek(&mut self) -> (usize, char) {
        match self.iter.peek() {
            Some((index, chr)) => (*index, *chr),
            _ => (self.source.contents().len(), '\x00'),
        }
    }

    fn peekahead(&mut self, n: usize) -> (usize, char) {
        match self.iter.clone().nth(n) {
            Some((index, chr)) => (index, chr),
            _ => (self.source.contents().len(), '\x00'),
        }
    }

    fn token(&self, kind: TokenKind, line: u32, col: u32, start: usize, end: usize) -> Token {
        Token(
            kind,
            Span {
                source: self.source.clone(),
                line,
                col,
                start: start as u32,
                end: end as u32,
            },
        )
    }

    fn read_ident(&mut self) -> Result<Token> {
        let start = self.peek().0;
        let col = self.col;
        loop {
            let ch = self.peek().1;
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.iter.next();
            } else {
                break;
            }
        }
        let end = self.peek().0;
        self.col += (end - start) as u32;
        Ok(self.token(TokenKind::Ident, self.line, col, start, end))
    }

    fn read_digits(&mut self) {
        while self.peek().1.is_ascii_digit() {
            self.iter.next();
        }
    }

    // digits ['.' digits*] [('e'|'E') ['+'|'-'] digits]
    fn read_number(&mut self) -> Result<Token> {
        let (start, _) = self.peek();
        let col = self.col;
        self.read_digits();

        if self.peek().1 == '.' {
            self.iter.next();
            self.read_digits();
        }

        if matches!(self.peek().1, 'e' | 'E') {
            let (_, next) = self.peekahead(1);
            let has_exponent = next.is_ascii_digit()
                || (matches!(next, '+' | '-') && self.peekahead(2).1.is_ascii_digit());
            if has_exponent {
                self.iter.next();
                if matches!(self.peek().1, '+' | '-') {
                    self.iter.next();
                }
                self.read_digits();
            }
        }

        let end = self.peek().0;
        self.col += (end - start) as u32;

        let ch = self.peek().1;
        if ch == '_' || ch.is_ascii_alphanumeric() {
            return Err(self.source.error(self.line, self.col, "invalid number"));
        }

        Ok(self.token(TokenKind::Number, self.line, col, start, end))
    }

    fn read_string(&mut self) -> Result<Token> {
        let (line, col) = (self.line, self.col);
        let (_, quote) = self.peek();
        self.iter.next();
        self.col += 1;
        let (start, _) = self.peek();
        loop {
            let (_, ch) = self.peek();
            match ch {
                '\x00' | '\n' => {
                    return Err(self.source.error(line, col, "unterminated string literal"));
                }
                '\\' => {
                    self.iter.next();
                    self.col += 1;
                    let (_, esc) = self.peek();
                    let digits = match esc {
                        'x' => 2,
                        'u' => 4,
                        'U' => 8,
                        '\x00' | '\n' => continue,
                        _ => 0,
                    };
                    self.iter.next();
                    self.col += 1;
                    for _ in 0..digits {
                        if !self.peek().1.is_ascii_hexdigit() {
                            return Err(self.source.error(
                                self.line,
                                self.col,
                                "invalid hex escape sequence",
                            ));
                        }
                        self.iter.next();
                        self.col += 1;
                    }
                }
                c if c == quote => break,
                '\t' => {
                    self.iter.next();
                    self.col += 4;
                }
                _ => {
                    self.iter.next();
                    self.col += 1;
                }
            }
        }

        let (end, _) = self.peek();
        self.iter.next();
        self.col += 1;

        Ok(self.token(TokenKind::String, line, col, start, end))
    }

    fn skip_ws(&mut self) -> Result<()> {
        // A tab is considered 4 space characters.
        loop {
            match self.peek().1 {
                ' ' => self.col += 1,
                '\t' => self.col += 4,
                '\r' => {
                    if self.peekahead(1).1 != '\n' {
                        return Err(self.source.error(
                            self.line,
                            self.col,
                            "\\r must be followed by \\n",
                        ));
                    }
                }
                '\n' => {
                    self.col = 1;
                    self.line += 1;
                }
                _ => break,
            }
            self.iter.next();
        }
        Ok(())
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_ws()?;

        let (start, chr) = self.peek();
        let col = self.col;

        match chr {
            '\x00' if start == self.source.contents().len() => {
                Ok(self.token(TokenKind::Eof, self.line, col, start, start))
            }
            '"' | '\'' => self.read_string(),
            _ if chr.is_ascii_digit() => self.read_number(),
            _ if chr.is_ascii_alphabetic() || chr == '_' => self.read_ident(),
            _ => {
                let (_, next) = self.peekahead(1);
                let pair: String = [chr, next].iter().collect();
                let len = if TWO_CHAR_SYMBOLS.contains(&pair.as_str()) {
                    2
                } else if "{}[]()+-*/%&|^~<>,.=".contains(chr) {
                    1
                } else {
                    return Err(self.source.error(self.line, self.col, "invalid character"));
                };
                for _ in 0..len {
                    self.iter.next();
                }
                self.col += len as u32;
                Ok(self.token(TokenKind::Symbol, self.line, col, start, start + len))
            }
        }
    }
}

/// Decode the escapes of a string token's text.
///
/// Unknown escapes keep their backslash. Hex escapes have already been
/// validated by the lexer; an escape naming an invalid code point is an error.
pub fn unescape(raw: &str) -> core::result::Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let Some(esc) = chars.next() else {
            out.push('\\');
            break;
        };
        let digits = match esc {
            '\\' => {
                out.push('\\');
                continue;
            }
            '\'' | '"' => {
                out.push(esc);
                continue;
            }
            'n' => {
                out.push('\n');
                continue;
            }
            'r' => {
                out.push('\r');
                continue;
            }
            't' => {
                out.push('\t');
                continue;
            }
            'a' => {
                out.push('\x07');
                continue;
            }
            'b' => {
                out.push('\x08');
                continue;
            }
            'f' => {
                out.push('\x0c');
                continue;
            }
            'v' => {
                out.push('\x0b');
                continue;
            }
            '0' => {
                out.push('\0');
                continue;
            }
            'x' => 2,
            'u' => 4,
            'U' => 8,
            _ => {
                out.push('\\');
                out.push(esc);
                continue;
            }
        };
        let hex: String = chars.by_ref().take(digits).collect();
        let code = u32::from_str_radix(&hex, 16)
            .map_err(|_| format!("invalid escape \\{esc}{hex}"))?;
        match char::from_u32(code) {
            Some(c) => out.push(c),
            None => return Err(format!("invalid code point \\{esc}{hex}")),
        }
    }
    Ok(out)
}
