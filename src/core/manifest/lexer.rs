//! Tokenizer for the `build.py` call syntax.

use miette::SourceSpan;

use super::ParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    Str(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Equals,
    Eof,
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("identifier `{}`", name),
            TokenKind::Str(_) => "string literal".to_string(),
            TokenKind::LParen => "`(`".to_string(),
            TokenKind::RParen => "`)`".to_string(),
            TokenKind::LBracket => "`[`".to_string(),
            TokenKind::RBracket => "`]`".to_string(),
            TokenKind::Comma => "`,`".to_string(),
            TokenKind::Equals => "`=`".to_string(),
            TokenKind::Eof => "end of file".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: SourceSpan,
}

pub fn tokenize(src: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '#' => {
                while let Some(&(_, c)) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '(' | ')' | '[' | ']' | ',' | '=' => {
                chars.next();
                let kind = match c {
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    '[' => TokenKind::LBracket,
                    ']' => TokenKind::RBracket,
                    ',' => TokenKind::Comma,
                    _ => TokenKind::Equals,
                };
                tokens.push(Token {
                    kind,
                    span: (start, 1).into(),
                });
            }
            '"' | '\'' => {
                let quote = c;
                chars.next();
                let mut value = String::new();
                let mut end = None;

                while let Some((idx, c)) = chars.next() {
                    match c {
                        c if c == quote => {
                            end = Some(idx + 1);
                            break;
                        }
                        '\n' => break,
                        '\\' => {
                            let Some((esc_idx, esc)) = chars.next() else {
                                break;
                            };
                            match esc {
                                'n' => value.push('\n'),
                                't' => value.push('\t'),
                                '\\' | '"' | '\'' => value.push(esc),
                                other => {
                                    return Err(ParseError::new(
                                        format!("unsupported escape sequence `\\{}`", other),
                                        (idx, esc_idx + other.len_utf8() - idx),
                                    ))
                                }
                            }
                        }
                        c => value.push(c),
                    }
                }

                let Some(end) = end else {
                    let line_end = src[start..].find('\n').map_or(src.len(), |n| start + n);
                    return Err(ParseError::new("unterminated string literal", (start, line_end - start))
                        .with_help("close the string with a matching quote on the same line"));
                };

                tokens.push(Token {
                    kind: TokenKind::Str(value),
                    span: (start, end - start).into(),
                });
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = start;
                while let Some(&(idx, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        end = idx + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token {
                    kind: TokenKind::Ident(src[start..end].to_string()),
                    span: (start, end - start).into(),
                });
            }
            other => {
                return Err(ParseError::new(
                    format!("unexpected character `{}`", other),
                    (start, other.len_utf8()),
                ));
            }
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        span: (src.len(), 0).into(),
    });

    Ok(tokens)
}
