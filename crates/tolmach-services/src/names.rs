//! The `NameProvider`: which assignment names an AST node, and where its
//! declaration leaf sits in the tree.

use tolmach_core::{Span, Symbol};
use tolmach_runtime::ast::{AstNode, AstValue};
use tolmach_runtime::tree::SyntaxTree;

/// Looks up the `name` field of AST nodes. The field symbol comes from
/// the grammar's interner; grammars without any `name` assignment simply
/// have no named nodes.
#[derive(Debug, Clone)]
pub struct NameProvider {
    name_field: Option<Symbol>,
}

impl NameProvider {
    /// Conventionally the field is called `name`.
    pub fn new(tree: &SyntaxTree) -> Self {
        Self {
            name_field: tree.interner().get("name"),
        }
    }

    pub fn with_field(name_field: Option<Symbol>) -> Self {
        Self { name_field }
    }

    /// The node's name, when it carries a textual `name` field.
    pub fn name_of<'a>(&self, node: &AstNode<'a>) -> Option<&'a str> {
        match node.field(self.name_field?)? {
            AstValue::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Span of the leaf that produced the node's name.
    pub fn name_leaf_span(&self, tree: &SyntaxTree, node: &AstNode<'_>) -> Option<Span> {
        let field = self.name_field?;
        let syntax = tree.node(node.syntax());
        syntax
            .descendants()
            .into_iter()
            .find(|n| {
                n.is_leaf()
                    && !n.is_trivia()
                    && n.assignment().is_some_and(|a| a.field == field)
            })
            .map(|n| n.span())
    }
}
