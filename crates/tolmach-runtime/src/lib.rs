#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Dual parsing backends over one unified syntax tree.
//!
//! Either backend takes a document text and produces the same observable
//! output: a [`tree::SyntaxTree`] carrying spans, trivia, assignment
//! identity, and diagnostics; the [`ast`] module derives the abstract
//! syntax tree with container back-links and cross-reference descriptors.
//!
//! - [`topdown`] interprets the grammar model with bounded lookahead;
//! - [`lr`] drives generated parse tables and supports incremental
//!   reparse of edited regions.
//!
//! Downstream code selects a backend once, at construction, and sees only
//! the narrow [`backend::ParserAdapter`] capability surface afterwards.

pub mod ast;
pub mod backend;
pub mod lexer;
pub mod lr;
pub mod topdown;
pub mod tree;

#[cfg(test)]
mod ast_tests;
#[cfg(test)]
mod equivalence_tests;

pub use ast::{AstDocument, AstId, AstValue, RefDescriptor, build_ast};
pub use backend::{Backend, ParserAdapter};
pub use lexer::{DocToken, Tokenizer};
pub use lr::{Edit, LrParser};
pub use topdown::TopDownParser;
pub use tree::{NodeId, NodeKind, SyntaxNode, SyntaxTree};
