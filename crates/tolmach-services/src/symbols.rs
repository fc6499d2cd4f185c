//! Document and workspace symbols.

use tolmach_core::{Cancellation, Cancelled, Span};
use tolmach_runtime::ast::{AstNode, AstValue};

use crate::documents::{Document, IndexManager, SymbolEntry};
use crate::names::NameProvider;

/// One entry in the document-symbol hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSymbol {
    pub name: String,
    /// Span of the whole declaration.
    pub span: Span,
    /// Span of the name leaf.
    pub selection: Span,
    pub children: Vec<DocumentSymbol>,
}

/// Recursive walk producing a hierarchy of named AST nodes.
pub struct DocumentSymbols;

impl DocumentSymbols {
    pub fn symbols(
        &self,
        document: &Document,
        names: &NameProvider,
        cancel: &Cancellation,
    ) -> Result<Vec<DocumentSymbol>, Cancelled> {
        let Some(root) = document.ast().root() else {
            return Ok(Vec::new());
        };
        self.collect(document, names, &root, cancel)
    }

    fn collect(
        &self,
        document: &Document,
        names: &NameProvider,
        node: &AstNode<'_>,
        cancel: &Cancellation,
    ) -> Result<Vec<DocumentSymbol>, Cancelled> {
        cancel.check()?;

        let mut nested = Vec::new();
        for (_, value) in node.fields() {
            self.collect_value(document, names, value, &mut nested, cancel)?;
        }

        // A named node owns its nested symbols; an anonymous one passes
        // them through to the nearest named ancestor.
        match names.name_of(node) {
            Some(name) => {
                let tree = document.tree();
                let syntax = tree.node(node.syntax());
                let selection = names
                    .name_leaf_span(tree, node)
                    .unwrap_or_else(|| syntax.span());
                Ok(vec![DocumentSymbol {
                    name: name.to_string(),
                    span: syntax.span(),
                    selection,
                    children: nested,
                }])
            }
            None => Ok(nested),
        }
    }

    fn collect_value(
        &self,
        document: &Document,
        names: &NameProvider,
        value: &AstValue,
        out: &mut Vec<DocumentSymbol>,
        cancel: &Cancellation,
    ) -> Result<(), Cancelled> {
        match value {
            AstValue::Node(id) => {
                let child = document.ast().node(*id);
                out.extend(self.collect(document, names, &child, cancel)?);
            }
            AstValue::List(items) => {
                for item in items {
                    self.collect_value(document, names, item, out, cancel)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Fuzzy workspace-wide symbol search.
pub struct WorkspaceSymbols;

impl WorkspaceSymbols {
    /// Lowercased subsequence match of `query` against every indexed
    /// name; cancellation is honored between matches.
    pub fn search<'i>(
        &self,
        index: &'i IndexManager,
        query: &str,
        cancel: &Cancellation,
    ) -> Result<Vec<&'i SymbolEntry>, Cancelled> {
        let query = query.to_lowercase();
        let mut out = Vec::new();

        for symbol in index.symbols() {
            cancel.check()?;
            if fuzzy_matches(&query, &symbol.name.to_lowercase()) {
                out.push(symbol);
            }
        }

        Ok(out)
    }
}

/// All query characters appear in the candidate, in order.
fn fuzzy_matches(query: &str, candidate: &str) -> bool {
    let mut chars = candidate.chars();
    query.chars().all(|q| chars.any(|c| c == q))
}

#[cfg(test)]
mod tests {
    use super::fuzzy_matches;

    #[test]
    fn fuzzy_subsequences() {
        assert!(fuzzy_matches("", "anything"));
        assert!(fuzzy_matches("alc", "alice"));
        assert!(fuzzy_matches("alice", "alice"));
        assert!(!fuzzy_matches("alx", "alice"));
        assert!(!fuzzy_matches("alice", "ali"));
    }
}
