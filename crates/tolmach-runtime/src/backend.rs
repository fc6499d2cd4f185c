//! Backend selection behind a narrow capability surface.
//!
//! The two backends expose the same capability set; downstream code holds
//! a [`Backend`] chosen at construction and never inspects the tag again.
//! For any input accepted by the predictive backend, the LR backend
//! produces the same non-trivia leaf token sequence and root span; for any
//! input rejected by one, the other produces at least one diagnostic with
//! the same severity and span.

use crate::lr::{Edit, LrParser};
use crate::topdown::TopDownParser;
use crate::tree::SyntaxTree;

/// The narrow parser capability seen by services.
pub trait ParserAdapter {
    fn name(&self) -> &'static str;

    fn supports_incremental(&self) -> bool;

    /// Full parse; always returns a best-effort tree covering the input.
    fn parse(&self, text: &str) -> SyntaxTree;

    /// Incremental reparse; `None` when the backend does not support it
    /// and the caller should fall back to a full parse.
    fn reparse(&self, prev: &SyntaxTree, edits: &[Edit]) -> Option<SyntaxTree>;

    /// Token names acceptable at `offset`, for completion. The predictive
    /// backend does not track expectation sets and returns nothing.
    fn expected_tokens(&self, text: &str, offset: u32) -> Vec<String>;
}

/// Tagged backend variant, selected once at service construction.
pub enum Backend {
    TopDown(TopDownParser),
    Lr(LrParser),
}

impl ParserAdapter for Backend {
    fn name(&self) -> &'static str {
        match self {
            Backend::TopDown(_) => "top-down",
            Backend::Lr(_) => "lr",
        }
    }

    fn supports_incremental(&self) -> bool {
        matches!(self, Backend::Lr(_))
    }

    fn parse(&self, text: &str) -> SyntaxTree {
        match self {
            Backend::TopDown(parser) => parser.parse(text),
            Backend::Lr(parser) => parser.parse(text),
        }
    }

    fn reparse(&self, prev: &SyntaxTree, edits: &[Edit]) -> Option<SyntaxTree> {
        match self {
            Backend::TopDown(_) => None,
            Backend::Lr(parser) => Some(parser.reparse(prev, edits)),
        }
    }

    fn expected_tokens(&self, text: &str, offset: u32) -> Vec<String> {
        match self {
            Backend::TopDown(_) => Vec::new(),
            Backend::Lr(parser) => parser.expected_tokens(text, offset),
        }
    }
}
