//! Statement tokenizer.
//!
//! Keywords are not recognised here: the parser decides from position whether
//! an identifier is a keyword, so `insert` is still a valid node name inside a
//! triple.

use crate::storage::is_bare_char;

use super::errors::{Span, SyntaxError};

/// Token kinds produced by [`tokenize`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// Unquoted identifier or number.
    Ident(String),
    /// Double-quoted string with escapes resolved.
    Str(String),
    /// Named variable such as `?x`; the payload excludes the `?`.
    Var(String),
    /// Anonymous wildcard `?`.
    Anonymous,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// `*`
    Star,
}

/// A token and where it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    /// What was read.
    pub kind: TokenKind,
    /// Byte range in the statement text.
    pub span: Span,
}

impl Token {
    /// Returns the identifier text when this token is an [`TokenKind::Ident`].
    pub fn ident(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Ident(text) => Some(text),
            _ => None,
        }
    }

    /// Case-insensitive keyword check.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.ident()
            .is_some_and(|text| text.eq_ignore_ascii_case(keyword))
    }
}

/// Splits `input` into tokens.
pub fn tokenize(input: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }
        let single = match ch {
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            ',' => Some(TokenKind::Comma),
            '*' => Some(TokenKind::Star),
            _ => None,
        };
        if let Some(kind) = single {
            chars.next();
            tokens.push(Token {
                kind,
                span: Span::new(start, start + 1),
            });
            continue;
        }

        match ch {
            '?' => {
                chars.next();
                let name = take_bare(&mut chars);
                let end = start + 1 + name.len();
                let kind = if name.is_empty() {
                    TokenKind::Anonymous
                } else {
                    TokenKind::Var(name)
                };
                tokens.push(Token {
                    kind,
                    span: Span::new(start, end),
                });
            }
            '"' => {
                chars.next();
                let mut value = String::new();
                let mut end = None;
                while let Some((idx, c)) = chars.next() {
                    match c {
                        '"' => {
                            end = Some(idx + 1);
                            break;
                        }
                        '\\' => match chars.next() {
                            Some((_, escaped @ ('"' | '\\'))) => value.push(escaped),
                            Some((idx, other)) => {
                                return Err(SyntaxError::new(
                                    format!("unsupported escape '\\{other}'"),
                                    Span::new(idx - 1, idx + other.len_utf8()),
                                ))
                            }
                            None => break,
                        },
                        other => value.push(other),
                    }
                }
                let Some(end) = end else {
                    return Err(SyntaxError::new(
                        "unterminated string literal",
                        Span::new(start, input.len()),
                    ));
                };
                tokens.push(Token {
                    kind: TokenKind::Str(value),
                    span: Span::new(start, end),
                });
            }
            c if is_bare_char(c) => {
                let text = take_bare(&mut chars);
                let end = start + text.len();
                tokens.push(Token {
                    kind: TokenKind::Ident(text),
                    span: Span::new(start, end),
                });
            }
            other => {
                return Err(SyntaxError::new(
                    format!("unexpected character '{other}'"),
                    Span::new(start, start + other.len_utf8()),
                ));
            }
        }
    }
    Ok(tokens)
}

fn take_bare<I>(chars: &mut std::iter::Peekable<I>) -> String
where
    I: Iterator<Item = (usize, char)>,
{
    let mut text = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if !is_bare_char(c) {
            break;
        }
        text.push(c);
        chars.next();
    }
    text
}
