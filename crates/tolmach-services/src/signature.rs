//! Signature help, go-to-type, and go-to-implementation.
//!
//! These services are skeletons by design: each resolves the declaration
//! under the cursor, then delegates to a language-specific collector for
//! the actual payload.

use tolmach_core::{Cancellation, Cancelled, Span};

use crate::documents::{Document, IndexManager, SymbolEntry};
use crate::highlight::declaration_at;
use crate::linker::Linker;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureInfo {
    pub label: String,
    pub documentation: Option<String>,
}

/// Language-specific signature source.
pub trait SignatureCollector {
    fn signatures(&self, declaration: &SymbolEntry) -> Vec<SignatureInfo>;
}

/// Language-specific target source for go-to style services.
pub trait TargetCollector {
    fn targets(&self, declaration: &SymbolEntry, index: &IndexManager) -> Vec<(String, Span)>;
}

/// Go-to-definition-like default: the declaration site itself.
pub struct DeclarationSite;

impl TargetCollector for DeclarationSite {
    fn targets(&self, declaration: &SymbolEntry, _index: &IndexManager) -> Vec<(String, Span)> {
        vec![(declaration.uri.clone(), declaration.name_span)]
    }
}

fn resolve_declaration<'i>(
    document: &Document,
    index: &'i IndexManager,
    linker: &mut Linker,
    offset: u32,
) -> Option<&'i SymbolEntry> {
    let key = declaration_at(document, index, linker, offset)?;
    index
        .symbols()
        .iter()
        .find(|s| s.uri == key.uri && s.name_span == key.name_span)
}

pub struct SignatureHelp {
    collector: Box<dyn SignatureCollector>,
}

impl SignatureHelp {
    pub fn new(collector: Box<dyn SignatureCollector>) -> Self {
        Self { collector }
    }

    pub fn help(
        &self,
        document: &Document,
        index: &IndexManager,
        linker: &mut Linker,
        offset: u32,
        cancel: &Cancellation,
    ) -> Result<Vec<SignatureInfo>, Cancelled> {
        cancel.check()?;
        let Some(declaration) = resolve_declaration(document, index, linker, offset) else {
            return Ok(Vec::new());
        };
        Ok(self.collector.signatures(declaration))
    }
}

pub struct TypeDefinition {
    collector: Box<dyn TargetCollector>,
}

impl TypeDefinition {
    pub fn new(collector: Box<dyn TargetCollector>) -> Self {
        Self { collector }
    }

    pub fn find(
        &self,
        document: &Document,
        index: &IndexManager,
        linker: &mut Linker,
        offset: u32,
        cancel: &Cancellation,
    ) -> Result<Vec<(String, Span)>, Cancelled> {
        cancel.check()?;
        let Some(declaration) = resolve_declaration(document, index, linker, offset) else {
            return Ok(Vec::new());
        };
        Ok(self.collector.targets(declaration, index))
    }
}

pub struct Implementation {
    collector: Box<dyn TargetCollector>,
}

impl Implementation {
    pub fn new(collector: Box<dyn TargetCollector>) -> Self {
        Self { collector }
    }

    pub fn find(
        &self,
        document: &Document,
        index: &IndexManager,
        linker: &mut Linker,
        offset: u32,
        cancel: &Cancellation,
    ) -> Result<Vec<(String, Span)>, Cancelled> {
        cancel.check()?;
        let Some(declaration) = resolve_declaration(document, index, linker, offset) else {
            return Ok(Vec::new());
        };
        Ok(self.collector.targets(declaration, index))
    }
}
