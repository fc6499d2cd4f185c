#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core data structures for the Tolmach language workbench.
//!
//! This crate is shared by the grammar compiler, both parser runtimes, and
//! the editor services. It holds:
//!
//! - the **grammar model**: a typed, serializable representation of grammar
//!   documents (rules, terminals, body expressions, and every extension);
//! - the **token classes** derived from a grammar's reachable rules;
//! - **diagnostics**: wire-format messages plus a collection/printer layer;
//! - the string [`Interner`] that backs all grammar-level names;
//! - the binary artifact envelope used by the ahead-of-time generator.

pub mod binary;
pub mod cancel;
pub mod diagnostics;
pub mod grammar;
pub mod line_index;
pub mod span;
pub mod tokens;

mod interner;

#[cfg(test)]
mod interner_tests;

pub use cancel::{Cancellation, Cancelled};
pub use diagnostics::{Diagnostic, Diagnostics, DiagnosticsPrinter, Severity, Stage};
pub use interner::{Interner, Symbol};
pub use line_index::LineIndex;
pub use span::Span;
