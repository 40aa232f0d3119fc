//! Formula tokenizer.

use std::fmt;

use strata_core::ExprError;

/// A lexical token of the formula language.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    /// Numeric literal.
    Number(f64),
    /// `#label#` reference to a field of the evaluated group.
    Placeholder(String),
    /// Function name.
    Ident(String),
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `^` or `**`
    Caret,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::Placeholder(label) => write!(f, "#{label}#"),
            Self::Ident(name) => f.write_str(name),
            Self::Plus => f.write_str("+"),
            Self::Minus => f.write_str("-"),
            Self::Star => f.write_str("*"),
            Self::Slash => f.write_str("/"),
            Self::Caret => f.write_str("^"),
            Self::LParen => f.write_str("("),
            Self::RParen => f.write_str(")"),
            Self::Comma => f.write_str(","),
        }
    }
}

/// Split a formula into tokens.
///
/// Whitespace outside placeholders is insignificant. A placeholder label
/// is any non-empty run of characters other than `#`.
pub fn tokenize(formula: &str) -> Result<Vec<Token>, ExprError> {
    let malformed = |reason: String| ExprError::Malformed {
        formula: formula.to_string(),
        reason,
    };
    let chars: Vec<char> = formula.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::Caret);
                i += 2;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Caret);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '#' => {
                let start = i + 1;
                let end = chars[start..]
                    .iter()
                    .position(|&ch| ch == '#')
                    .map(|p| start + p)
                    .ok_or_else(|| malformed(format!("unterminated placeholder at {i}")))?;
                if end == start {
                    return Err(malformed(format!("empty placeholder at {i}")));
                }
                tokens.push(Token::Placeholder(chars[start..end].iter().collect()));
                i = end + 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let (value, next) = number(&chars, i).ok_or_else(|| {
                    malformed(format!("invalid number at {i}"))
                })?;
                tokens.push(Token::Number(value));
                i = next;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(malformed(format!("unexpected character '{other}' at {i}"))),
        }
    }
    Ok(tokens)
}

/// Scan `digits [. digits] [(e|E) [+|-] digits]` starting at `start`.
fn number(chars: &[char], start: usize) -> Option<(f64, usize)> {
    let mut i = start;
    let digits = |i: &mut usize| {
        let from = *i;
        while *i < chars.len() && chars[*i].is_ascii_digit() {
            *i += 1;
        }
        *i - from
    };
    let mut mantissa = digits(&mut i);
    if chars.get(i) == Some(&'.') {
        i += 1;
        mantissa += digits(&mut i);
    }
    if mantissa == 0 {
        return None;
    }
    if matches!(chars.get(i), Some('e' | 'E')) {
        let mut j = i + 1;
        if matches!(chars.get(j), Some('+' | '-')) {
            j += 1;
        }
        if digits(&mut j) == 0 {
            return None;
        }
        i = j;
    }
    let text: String = chars[start..i].iter().collect();
    text.parse().ok().map(|v| (v, i))
}
