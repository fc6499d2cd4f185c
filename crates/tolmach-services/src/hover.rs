//! Hover: documentation comments attached to declarations.
//!
//! The hover content is the block-comment trivia immediately preceding
//! the hovered node (only whitespace trivia may intervene). Keyword
//! literals with such a comment render it too. `{@link Name}` occurrences
//! inside a comment render as absolute URI-qualified links resolved
//! against the index.

use tolmach_core::Span;
use tolmach_core::tokens::is_identifier_like;
use tolmach_runtime::tree::{NodeKind, SyntaxNode};

use crate::documents::{Document, IndexManager};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverResult {
    pub contents: String,
    pub span: Span,
}

pub struct Hover;

impl Hover {
    pub fn hover(
        &self,
        document: &Document,
        index: &IndexManager,
        offset: u32,
    ) -> Option<HoverResult> {
        let tree = document.tree();
        let leaf = tree
            .find_declaration_node_at(offset, is_identifier_like)
            .or_else(|| tree.find_leaf_at(offset))?;

        // Keywords document themselves; identifiers document their
        // enclosing declaration node.
        let anchor_offset = match leaf.kind() {
            NodeKind::Keyword(_) => leaf.offset(),
            _ => leaf
                .ancestors()
                .find(|n| matches!(n.kind(), NodeKind::Rule(_)))
                .map(|n| n.offset())
                .unwrap_or(leaf.offset()),
        };

        let comment = preceding_block_comment(tree.root(), anchor_offset)?;
        let contents = render_links(&clean_comment(&comment), index);

        Some(HoverResult {
            contents,
            span: leaf.span(),
        })
    }
}

/// The last block-comment trivia ending at or before `offset`, with only
/// whitespace trivia in between.
fn preceding_block_comment(root: SyntaxNode<'_>, offset: u32) -> Option<String> {
    let mut candidate: Option<String> = None;

    for node in root.descendants() {
        if !node.is_leaf() || node.end() > offset {
            continue;
        }
        if node.is_trivia() {
            let text = node.full_text();
            if text.starts_with("/*") {
                candidate = Some(text.to_string());
            } else if !text.trim().is_empty() {
                // A line comment in between detaches the block comment.
                candidate = None;
            }
        } else if !node.is_empty() {
            // Any token between the comment and the anchor detaches it.
            candidate = None;
        }
    }

    candidate
}

/// Strip `/* */` delimiters and per-line `*` gutters.
fn clean_comment(raw: &str) -> String {
    let inner = raw
        .trim_start_matches("/*")
        .trim_end_matches("*/")
        .trim();

    inner
        .lines()
        .map(|line| line.trim().trim_start_matches('*').trim())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// `{@link Name}` → `[Name](uri#Name)` when the index knows the name.
fn render_links(text: &str, index: &IndexManager) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("{@link ") {
        out.push_str(&rest[..start]);
        let tail = &rest[start + "{@link ".len()..];
        let Some(end) = tail.find('}') else {
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let name = tail[..end].trim();
        match index.symbols().iter().find(|s| s.name == name) {
            Some(symbol) => {
                out.push_str(&format!("[{name}]({}#{name})", symbol.uri));
            }
            None => {
                out.push_str(name);
            }
        }
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::clean_comment;

    #[test]
    fn comment_cleanup() {
        assert_eq!(clean_comment("/* plain */"), "plain");
        assert_eq!(
            clean_comment("/*\n * first\n * second\n */"),
            "first\nsecond"
        );
    }
}
