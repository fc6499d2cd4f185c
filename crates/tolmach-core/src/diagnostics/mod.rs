//! Diagnostics infrastructure.
//!
//! Lexer and parser errors are collected, never raised: every parse returns
//! a tree and a diagnostic stream. Grammar validation surfaces its findings
//! as a batch before generation. This module provides the wire-format
//! message type, a collection with a builder-style reporting API, and a
//! renderer over `annotate-snippets`.

mod message;
mod printer;

#[cfg(test)]
mod tests;

pub use message::{Diagnostic, Fix, RelatedInfo, Severity, Stage};
pub use printer::DiagnosticsPrinter;

use crate::line_index::LineIndex;
use crate::span::Span;

/// Collection of diagnostic messages from lexing, parsing, and analysis.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    messages: Vec<Diagnostic>,
}

/// Builder for constructing a diagnostic message.
#[must_use = "diagnostic not emitted, call .emit()"]
pub struct DiagnosticBuilder<'a> {
    diagnostics: &'a mut Diagnostics,
    message: Diagnostic,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    pub fn report(
        &mut self,
        severity: Severity,
        stage: Stage,
        span: Span,
    ) -> DiagnosticBuilder<'_> {
        DiagnosticBuilder {
            diagnostics: self,
            message: Diagnostic::new(severity, stage, span),
        }
    }

    pub fn error(&mut self, stage: Stage, span: Span) -> DiagnosticBuilder<'_> {
        self.report(Severity::Error, stage, span)
    }

    pub fn warning(&mut self, stage: Stage, span: Span) -> DiagnosticBuilder<'_> {
        self.report(Severity::Warning, stage, span)
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.messages.iter()
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.messages
    }

    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.messages.extend(other.messages);
    }

    pub fn push(&mut self, message: Diagnostic) {
        self.messages.push(message);
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.messages
    }

    /// Fill the optional `line`/`column` wire fields from a line index.
    pub fn attach_positions(&mut self, index: &LineIndex) {
        for message in &mut self.messages {
            let pos = index.line_col(message.offset);
            message.line = Some(pos.line);
            message.column = Some(pos.column);
        }
    }

    pub fn printer<'d, 's>(&'d self) -> DiagnosticsPrinter<'d, 's> {
        DiagnosticsPrinter::new(self)
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<T: IntoIterator<Item = Diagnostic>>(iter: T) -> Self {
        Self {
            messages: iter.into_iter().collect(),
        }
    }
}

impl<'a> DiagnosticBuilder<'a> {
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message.message = msg.into();
        self
    }

    pub fn related_to(mut self, msg: impl Into<String>, span: Span) -> Self {
        self.message.related.push(RelatedInfo::new(span, msg));
        self
    }

    pub fn fix(mut self, description: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.message.fix = Some(Fix::new(replacement, description));
        self
    }

    pub fn emit(self) {
        self.diagnostics.messages.push(self.message);
    }
}
