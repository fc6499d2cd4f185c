#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Tolmach grammar compiler: front-end, validation, and LR translation.
//!
//! This crate provides the grammar compilation pipeline:
//! - `syntax` - lexer, CST, and typed AST for the grammar language
//! - `model` - grammar model construction from the CST
//! - `validate` - grammar validation (batch diagnostics)
//! - `analysis` - FIRST sets and lookahead-ambiguity reporting
//! - `translate` - LR lowering: grammar text, field-map, keyword set
//! - `tablegen` - SLR(1) parse-table construction
//! - `artifacts` - the three persisted generator artifacts
//! - `stages` - high-level typestate facade
//!
//! # Example
//!
//! ```
//! use tolmach_compiler::GrammarSource;
//!
//! let parsed = GrammarSource::new(
//!     "entry Model: 'model' name=ID; \
//!      terminal ID: /[_a-zA-Z][a-zA-Z0-9_]*/; \
//!      hidden terminal WS: /\\s+/;",
//! )
//! .parse()
//! .expect("within fuel limits");
//!
//! let analyzed = parsed.analyze();
//! assert!(!analyzed.diagnostics().has_errors());
//! ```

pub mod analysis;
pub mod artifacts;
pub mod model;
pub mod stages;
pub mod syntax;
pub mod tablegen;
pub mod translate;
pub mod validate;

#[cfg(test)]
pub mod test_utils;

pub use stages::{GrammarAnalyzed, GrammarParsed, GrammarSource};
pub use tolmach_core::diagnostics::{Diagnostics, DiagnosticsPrinter, Severity, Stage};
pub use translate::Translation;

/// Errors that can occur during grammar parsing.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Execution fuel exhausted (too many parser operations).
    #[error("execution limit exceeded")]
    ExecFuelExhausted,

    /// Recursion fuel exhausted (input nested too deeply).
    #[error("recursion limit exceeded")]
    RecursionLimitExceeded,
}

/// Result type for compiler operations.
pub type Result<T> = std::result::Result<T, Error>;
