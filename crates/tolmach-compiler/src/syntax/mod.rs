//! Front-end for the grammar language.
//!
//! # Architecture
//!
//! This parser produces a lossless concrete syntax tree (CST) via Rowan's
//! green tree builder:
//!
//! - Zero-copy lexing: tokens carry spans, text sliced only when building
//!   tree nodes
//! - Trivia buffering: whitespace/comments collected, then attached as
//!   leading trivia
//! - Checkpoint-based wrapping: retroactively wrap nodes for cardinality
//!   suffixes and alternatives
//! - Explicit recovery: unknown tokens land in `Error` nodes; missing
//!   tokens emit a diagnostic without consuming, so the parent recovers
//!
//! The parser is resilient — it always produces a tree. Only fuel
//! exhaustion (exec or recursion) returns an actual error.

pub mod ast;

mod grammar;
mod kinds;
mod lexer;
mod parser;

#[cfg(test)]
mod lexer_tests;
#[cfg(test)]
mod parser_tests;

pub use kinds::{GrammarLang, SyntaxKind, SyntaxNode, SyntaxToken, TokenSet, token_sets};
pub use lexer::{Token, lex};
pub use parser::{ParseResult, Parser};
pub(crate) use parser::range_to_span;
