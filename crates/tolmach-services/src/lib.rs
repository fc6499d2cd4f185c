#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Editor services over the unified syntax tree.
//!
//! Every service here is coded against the syntax tree, the AST, and the
//! cross-document index — never against a backend's native form. Services
//! are resolved by name from a per-language registry; long-running
//! operations take a cancellation token and fail with `Cancelled` instead
//! of returning partial results.

pub mod commands;
pub mod documents;
pub mod folding;
pub mod highlight;
pub mod hover;
pub mod linker;
pub mod names;
pub mod registry;
pub mod signature;
pub mod symbols;

#[cfg(test)]
mod services_tests;

pub use documents::{Document, DocumentStore, IndexManager, SymbolEntry};
pub use linker::Linker;
pub use names::NameProvider;
pub use registry::{ServiceRegistry, service_names};

use tolmach_core::Cancelled;

/// Service-layer failures. Parse problems are diagnostics, not errors;
/// this enum covers cancellation and registry/command faults.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    #[error("unknown language `{0}`")]
    UnknownLanguage(String),

    #[error("unknown service `{language}.{service}`")]
    UnknownService { language: String, service: String },

    #[error("circular service resolution: {chain}")]
    CircularResolution { chain: String },

    #[error("unknown command `{0}`")]
    UnknownCommand(String),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
