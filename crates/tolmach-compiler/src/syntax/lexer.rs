//! Lexer for the grammar language.
//!
//! Logos does the recognition (the token rules live on
//! [`SyntaxKind`](super::kinds::SyntaxKind)); this module owns the
//! post-processing the parser depends on:
//!
//! - tokens are `(kind, span)` pairs — text is sliced from the source only
//!   when a tree node is built;
//! - string literals — single-quoted keyword literals and double-quoted
//!   import paths — are split into opening quote, content, and closing
//!   quote, so the parser can address the content token on its own and
//!   check that the delimiters match;
//! - runs of input no rule matches collapse into one `Garbage` token
//!   apiece, keeping the stream small on malformed documents.

use logos::Logos;
use rowan::{TextRange, TextSize};

use super::kinds::SyntaxKind;

/// A lexed token: kind plus byte range into the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: SyntaxKind,
    pub span: TextRange,
}

impl Token {
    /// The token's text, sliced out of the source it was lexed from.
    #[inline]
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        &source[std::ops::Range::<usize>::from(self.span)]
    }
}

fn range(start: usize, end: usize) -> TextRange {
    TextRange::new(TextSize::new(start as u32), TextSize::new(end as u32))
}

/// Tokenize a grammar document.
pub fn lex(source: &str) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::new();

    for (result, span) in SyntaxKind::lexer(source).spanned() {
        match result {
            Ok(SyntaxKind::StringLiteral) => {
                split_quoted(source, span.start, span.end, &mut out);
            }
            Ok(kind) => out.push(Token {
                kind,
                span: range(span.start, span.end),
            }),
            // Unrecognized input: grow the previous garbage token when it
            // is adjacent, otherwise open a new one.
            Err(()) => {
                let start = TextSize::new(span.start as u32);
                match out.last_mut() {
                    Some(last)
                        if last.kind == SyntaxKind::Garbage && last.span.end() == start =>
                    {
                        last.span =
                            TextRange::new(last.span.start(), TextSize::new(span.end as u32));
                    }
                    _ => out.push(Token {
                        kind: SyntaxKind::Garbage,
                        span: range(span.start, span.end),
                    }),
                }
            }
        }
    }

    out
}

/// `'model'` or `"./scanner"` → quote, content, quote. The content token
/// is absent for an empty literal; the quote kind follows the delimiter
/// character so the parser can insist both ends agree.
fn split_quoted(source: &str, start: usize, end: usize, out: &mut Vec<Token>) {
    let quote = if source.as_bytes()[start] == b'"' {
        SyntaxKind::DoubleQuote
    } else {
        SyntaxKind::SingleQuote
    };

    out.push(Token {
        kind: quote,
        span: range(start, start + 1),
    });
    if end - start > 2 {
        out.push(Token {
            kind: SyntaxKind::StrVal,
            span: range(start + 1, end - 1),
        });
    }
    out.push(Token {
        kind: quote,
        span: range(end - 1, end),
    });
}
