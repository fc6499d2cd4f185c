//! Document highlight and find-references.
//!
//! Both start the same way: locate the identifier under the cursor,
//! resolve it to a declaration (directly, or through the descriptor it
//! belongs to), then collect occurrence ranges — within the document for
//! highlight, across the indexed workspace for references.

use tolmach_core::tokens::is_identifier_like;
use tolmach_core::{Cancellation, Cancelled, Span};

use crate::documents::{Document, IndexManager};
use crate::linker::Linker;

/// Identity of a resolved declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DeclKey {
    pub uri: String,
    pub name_span: Span,
}

/// Resolve whatever is under the cursor to a declaration key.
pub(crate) fn declaration_at(
    document: &Document,
    index: &IndexManager,
    linker: &mut Linker,
    offset: u32,
) -> Option<DeclKey> {
    let tree = document.tree();
    let leaf = tree.find_declaration_node_at(offset, is_identifier_like)?;
    let span = leaf.span();

    // The cursor may sit on a declaration name…
    if let Some(symbol) = index
        .symbols_in(&document.uri)
        .find(|s| s.name_span == span)
    {
        return Some(DeclKey {
            uri: symbol.uri.clone(),
            name_span: symbol.name_span,
        });
    }

    // …or on a reference to one.
    let reference = index
        .references_in(&document.uri)
        .find(|r| r.descriptor.source_segment == span)?
        .clone();
    let symbol = linker.resolve(
        index,
        tree.interner(),
        &document.uri,
        &reference.descriptor,
    )?;
    Some(DeclKey {
        uri: symbol.uri.clone(),
        name_span: symbol.name_span,
    })
}

/// Ranges of a declaration and its references inside one document.
pub struct DocumentHighlight;

impl DocumentHighlight {
    pub fn highlights(
        &self,
        document: &Document,
        index: &IndexManager,
        linker: &mut Linker,
        offset: u32,
        cancel: &Cancellation,
    ) -> Result<Vec<Span>, Cancelled> {
        let Some(decl) = declaration_at(document, index, linker, offset) else {
            return Ok(Vec::new());
        };

        let mut ranges = Vec::new();
        if decl.uri == document.uri {
            ranges.push(decl.name_span);
        }

        let references: Vec<_> = index
            .references_in(&document.uri)
            .cloned()
            .collect();
        for reference in references {
            cancel.check()?;
            let resolved = linker.resolve(
                index,
                document.tree().interner(),
                &document.uri,
                &reference.descriptor,
            );
            if resolved.is_some_and(|s| s.uri == decl.uri && s.name_span == decl.name_span) {
                ranges.push(reference.descriptor.source_segment);
            }
        }

        ranges.sort_by_key(|span| span.offset);
        Ok(ranges)
    }
}

/// Workspace-wide reference search.
pub struct References;

impl References {
    pub fn find(
        &self,
        document: &Document,
        index: &IndexManager,
        linker: &mut Linker,
        offset: u32,
        include_declaration: bool,
        cancel: &Cancellation,
    ) -> Result<Vec<(String, Span)>, Cancelled> {
        let Some(decl) = declaration_at(document, index, linker, offset) else {
            return Ok(Vec::new());
        };

        let mut out = Vec::new();
        if include_declaration {
            out.push((decl.uri.clone(), decl.name_span));
        }

        let references: Vec<_> = index.references().to_vec();
        for reference in references {
            cancel.check()?;
            let resolved = linker.resolve(
                index,
                document.tree().interner(),
                &reference.uri,
                &reference.descriptor,
            );
            if resolved.is_some_and(|s| s.uri == decl.uri && s.name_span == decl.name_span) {
                out.push((reference.uri.clone(), reference.descriptor.source_segment));
            }
        }

        Ok(out)
    }
}
