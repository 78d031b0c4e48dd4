//! Recursive-descent parser producing raw rule declarations.
//!
//! ```text
//! file   := call*
//! call   := IDENT '(' [kwarg (',' kwarg)* [',']] ')'
//! kwarg  := IDENT '=' value
//! value  := STRING | '[' [STRING (',' STRING)* [',']] ']'
//! ```

use miette::SourceSpan;

use super::lexer::{Token, TokenKind};
use super::ParseError;
use crate::core::rule::RuleKind;

/// A string literal with its location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub value: String,
    pub span: SourceSpan,
}

/// A `librule`/`binrule` call before names and references are interpreted.
#[derive(Debug, Clone)]
pub struct RuleDecl {
    pub kind: Option<RuleKind>,
    pub span: SourceSpan,
    pub name: Option<Spanned>,
    pub sources: Vec<Spanned>,
    pub headers: Vec<Spanned>,
    pub deplibs: Vec<Spanned>,
    pub cflags: Vec<Spanned>,
    pub linkflags: Vec<Spanned>,
}

const LIST_KEYS: &[&str] = &["sources", "headers", "deplibs", "cflags", "linkflags"];

enum Value {
    Str(Spanned),
    List(Vec<Spanned>),
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> Result<Token, ParseError> {
        let token = self.advance();
        if token.kind == kind {
            Ok(token)
        } else {
            Err(ParseError::new(
                format!(
                    "expected {} {}, found {}",
                    kind.describe(),
                    context,
                    token.kind.describe()
                ),
                token.span,
            ))
        }
    }

    pub fn parse_file(&mut self) -> Result<Vec<RuleDecl>, ParseError> {
        let mut decls = Vec::new();
        while self.peek().kind != TokenKind::Eof {
            decls.push(self.parse_call()?);
        }
        Ok(decls)
    }

    fn parse_call(&mut self) -> Result<RuleDecl, ParseError> {
        let head = self.advance();
        let TokenKind::Ident(function) = &head.kind else {
            return Err(ParseError::new(
                format!("expected `librule` or `binrule`, found {}", head.kind.describe()),
                head.span,
            ));
        };
        let kind = RuleKind::from_function_name(function).ok_or_else(|| {
            ParseError::new(format!("unknown rule function `{}`", function), head.span)
                .with_help("only `librule(...)` and `binrule(...)` are supported")
        })?;

        self.expect(TokenKind::LParen, "after rule function")?;

        let mut decl = RuleDecl {
            kind: Some(kind),
            span: head.span,
            name: None,
            sources: Vec::new(),
            headers: Vec::new(),
            deplibs: Vec::new(),
            cflags: Vec::new(),
            linkflags: Vec::new(),
        };
        let mut seen: Vec<String> = Vec::new();

        loop {
            if self.peek().kind == TokenKind::RParen {
                break;
            }

            let key_token = self.advance();
            let TokenKind::Ident(key) = key_token.kind else {
                return Err(ParseError::new(
                    format!("expected keyword argument, found {}", key_token.kind.describe()),
                    key_token.span,
                ));
            };

            if seen.contains(&key) {
                return Err(ParseError::new(
                    format!("keyword argument `{}` repeated", key),
                    key_token.span,
                ));
            }

            self.expect(TokenKind::Equals, "after keyword")?;
            let value = self.parse_value()?;

            match (key.as_str(), value) {
                ("name", Value::Str(s)) => decl.name = Some(s),
                ("name", Value::List(_)) => {
                    return Err(ParseError::new("`name` must be a string", key_token.span))
                }
                (k, Value::List(items)) if LIST_KEYS.contains(&k) => match k {
                    "sources" => decl.sources = items,
                    "headers" => decl.headers = items,
                    "deplibs" => decl.deplibs = items,
                    "cflags" => decl.cflags = items,
                    _ => decl.linkflags = items,
                },
                (k, Value::Str(_)) if LIST_KEYS.contains(&k) => {
                    return Err(ParseError::new(
                        format!("`{}` must be a list of strings", k),
                        key_token.span,
                    )
                    .with_help(format!("write `{} = [\"...\"]`", k)))
                }
                (k, _) => {
                    return Err(ParseError::new(
                        format!("unknown keyword argument `{}` for `{}`", k, kind),
                        key_token.span,
                    )
                    .with_help("expected one of: name, sources, headers, deplibs, cflags, linkflags"))
                }
            }
            seen.push(key);

            if self.peek().kind == TokenKind::Comma {
                self.advance();
            } else {
                break;
            }
        }

        let close = self.expect(TokenKind::RParen, "to close the rule")?;
        let start = head.span.offset();
        decl.span = (start, close.span.offset() + 1 - start).into();
        Ok(decl)
    }

    fn parse_value(&mut self) -> Result<Value, ParseError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Str(value) => Ok(Value::Str(Spanned {
                value,
                span: token.span,
            })),
            TokenKind::LBracket => {
                let mut items = Vec::new();
                loop {
                    if self.peek().kind == TokenKind::RBracket {
                        break;
                    }
                    let item = self.advance();
                    match item.kind {
                        TokenKind::Str(value) => items.push(Spanned {
                            value,
                            span: item.span,
                        }),
                        other => {
                            return Err(ParseError::new(
                                format!("expected string in list, found {}", other.describe()),
                                item.span,
                            ))
                        }
                    }
                    if self.peek().kind == TokenKind::Comma {
                        self.advance();
                    } else {
                        break;
                    }
                }
                self.expect(TokenKind::RBracket, "to close the list")?;
                Ok(Value::List(items))
            }
            other => Err(ParseError::new(
                format!("expected string or list, found {}", other.describe()),
                token.span,
            )),
        }
    }
}
