//! Versioned documents and the cross-document symbol index.
//!
//! A new parse replaces the document's tree; previously handed-out tree
//! handles stay valid for readers that kept them, because trees are
//! immutable and shared through `Arc`. The index is rebuilt per document
//! on demand; writers are serialized by the host's document manager and
//! readers observe a consistent snapshot per operation.

use std::sync::Arc;

use indexmap::IndexMap;

use tolmach_core::{Cancellation, Cancelled, LineIndex, Span, Symbol};
use tolmach_runtime::ast::{AstDocument, AstId, AstValue, RefDescriptor, build_ast_with_uri};
use tolmach_runtime::backend::ParserAdapter;
use tolmach_runtime::lr::Edit;
use tolmach_runtime::tree::SyntaxTree;

use crate::names::NameProvider;

/// One open document: text, version, tree, and AST.
#[derive(Clone)]
pub struct Document {
    pub uri: String,
    pub version: i32,
    tree: Arc<SyntaxTree>,
    ast: Arc<AstDocument>,
}

impl Document {
    pub fn tree(&self) -> &Arc<SyntaxTree> {
        &self.tree
    }

    pub fn ast(&self) -> &Arc<AstDocument> {
        &self.ast
    }

    pub fn text(&self) -> &str {
        self.tree.text()
    }

    pub fn line_index(&self) -> LineIndex {
        LineIndex::new(self.tree.text())
    }
}

/// The open-document table.
#[derive(Default)]
pub struct DocumentStore {
    documents: IndexMap<String, Document>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and store a document; a previous version is replaced.
    pub fn open(&mut self, uri: impl Into<String>, text: &str, parser: &dyn ParserAdapter) {
        let uri = uri.into();
        let tree = Arc::new(parser.parse(text));
        let ast = Arc::new(build_ast_with_uri(&tree, Some(uri.clone())));
        let version = self.documents.get(&uri).map_or(1, |d| d.version + 1);
        self.documents.insert(
            uri.clone(),
            Document {
                uri,
                version,
                tree,
                ast,
            },
        );
    }

    /// Apply edits through the backend's incremental path when it has
    /// one; otherwise reparse from scratch.
    pub fn update(&mut self, uri: &str, edits: &[Edit], parser: &dyn ParserAdapter) {
        let Some(existing) = self.documents.get(uri) else {
            return;
        };
        let tree = match parser.reparse(existing.tree(), edits) {
            Some(tree) => Arc::new(tree),
            None => {
                let new_text = apply_edits(existing.text(), edits);
                Arc::new(parser.parse(&new_text))
            }
        };
        let ast = Arc::new(build_ast_with_uri(&tree, Some(uri.to_string())));
        let version = existing.version + 1;
        self.documents.insert(
            uri.to_string(),
            Document {
                uri: uri.to_string(),
                version,
                tree,
                ast,
            },
        );
    }

    pub fn get(&self, uri: &str) -> Option<&Document> {
        self.documents.get(uri)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }
}

fn apply_edits(text: &str, edits: &[Edit]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize;
    for edit in edits {
        out.push_str(&text[cursor..edit.from as usize]);
        out.push_str(&edit.insert);
        cursor = edit.to as usize;
    }
    out.push_str(&text[cursor..]);
    out
}

/// One indexed declaration: a named AST node.
#[derive(Debug, Clone)]
pub struct SymbolEntry {
    pub uri: String,
    pub name: String,
    pub type_name: Symbol,
    pub ast: AstId,
    /// Span of the name leaf, for highlight and go-to.
    pub name_span: Span,
    /// Span of the whole declaration node.
    pub full_span: Span,
}

/// One indexed cross-reference occurrence.
#[derive(Debug, Clone)]
pub struct ReferenceEntry {
    pub uri: String,
    pub descriptor: RefDescriptor,
    pub owner: AstId,
    pub field: Symbol,
}

/// Process-wide mapping from documents to their symbols and references.
#[derive(Default)]
pub struct IndexManager {
    symbols: Vec<SymbolEntry>,
    references: Vec<ReferenceEntry>,
    /// Bumped on every (re-)index so caches can invalidate.
    generation: u64,
}

/// Cancellation is checked once per this many indexed nodes.
const CANCEL_CHECK_INTERVAL: usize = 64;

impl IndexManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Re-index one document, replacing its previous entries.
    pub fn index_document(
        &mut self,
        document: &Document,
        names: &NameProvider,
        cancel: &Cancellation,
    ) -> Result<(), Cancelled> {
        let mut symbols = Vec::new();
        let mut references = Vec::new();

        let ast = document.ast();
        let tree = document.tree();
        for (seen, node) in ast.iter().enumerate() {
            if seen % CANCEL_CHECK_INTERVAL == 0 {
                cancel.check()?;
            }

            if let Some(name) = names.name_of(&node) {
                let name_span = names
                    .name_leaf_span(tree, &node)
                    .unwrap_or_else(|| tree.node(node.syntax()).span());
                symbols.push(SymbolEntry {
                    uri: document.uri.clone(),
                    name: name.to_string(),
                    type_name: node.type_name(),
                    ast: node.id(),
                    name_span,
                    full_span: tree.node(node.syntax()).span(),
                });
            }

            for (field, value) in node.fields() {
                collect_references(document, node.id(), field, value, &mut references);
            }
        }

        // Swap in the new entries only after the walk completed; a
        // cancelled index leaves the previous snapshot intact.
        self.symbols.retain(|s| s.uri != document.uri);
        self.references.retain(|r| r.uri != document.uri);
        self.symbols.extend(symbols);
        self.references.extend(references);
        self.generation += 1;
        Ok(())
    }

    pub fn remove_document(&mut self, uri: &str) {
        self.symbols.retain(|s| s.uri != uri);
        self.references.retain(|r| r.uri != uri);
        self.generation += 1;
    }

    pub fn symbols(&self) -> &[SymbolEntry] {
        &self.symbols
    }

    pub fn references(&self) -> &[ReferenceEntry] {
        &self.references
    }

    pub fn symbols_in(&self, uri: &str) -> impl Iterator<Item = &SymbolEntry> {
        self.symbols.iter().filter(move |s| s.uri == uri)
    }

    pub fn references_in(&self, uri: &str) -> impl Iterator<Item = &ReferenceEntry> {
        self.references.iter().filter(move |r| r.uri == uri)
    }
}

fn collect_references(
    document: &Document,
    owner: AstId,
    field: Symbol,
    value: &AstValue,
    out: &mut Vec<ReferenceEntry>,
) {
    match value {
        AstValue::Reference(descriptor) => out.push(ReferenceEntry {
            uri: document.uri.clone(),
            descriptor: descriptor.clone(),
            owner,
            field,
        }),
        AstValue::List(items) => {
            for item in items {
                collect_references(document, owner, field, item, out);
            }
        }
        _ => {}
    }
}
