//! Folding ranges.
//!
//! Block nodes ending with a closing delimiter fold, as do multi-line
//! comments found in trivia; either way the fold covers
//! `{start_line, end_line - 1}` and only when it spans at least two full
//! lines. The LR backend does not surface comment tokens, so the comment
//! scan falls back to the document text when the tree carries no trivia.

use tolmach_core::{LineIndex, Span};

use crate::documents::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoldRange {
    pub start_line: u32,
    pub end_line: u32,
}

const CLOSING_DELIMITERS: [&str; 3] = [")", "]", "}"];

pub struct FoldingRange;

impl FoldingRange {
    pub fn ranges(&self, document: &Document) -> Vec<FoldRange> {
        let line_index = document.line_index();
        let tree = document.tree();
        let mut out = Vec::new();

        let mut saw_trivia = false;
        for node in tree.root().descendants() {
            if node.is_leaf() {
                if node.is_trivia() {
                    saw_trivia = true;
                    if is_block_comment(node.full_text()) {
                        push_fold(&mut out, &line_index, node.span());
                    }
                }
                continue;
            }

            let closes_with_delimiter = node
                .descendants()
                .into_iter()
                .filter(|n| n.is_leaf() && !n.is_trivia() && !n.is_empty())
                .next_back()
                .is_some_and(|last| CLOSING_DELIMITERS.contains(&last.full_text()));
            if closes_with_delimiter {
                push_fold(&mut out, &line_index, node.span());
            }
        }

        if !saw_trivia {
            self.scan_text_comments(document.text(), &line_index, &mut out);
        }

        out.sort_by_key(|f| (f.start_line, f.end_line));
        out.dedup();
        out
    }

    /// Text-level scan for `/* … */` comments, for trees without trivia.
    fn scan_text_comments(&self, text: &str, line_index: &LineIndex, out: &mut Vec<FoldRange>) {
        let mut search = 0;
        while let Some(start) = text[search..].find("/*") {
            let start = search + start;
            let Some(end) = text[start..].find("*/") else {
                break;
            };
            let end = start + end + 2;
            push_fold(
                out,
                line_index,
                Span::new(start as u32, (end - start) as u32),
            );
            search = end;
        }
    }
}

fn is_block_comment(text: &str) -> bool {
    text.starts_with("/*")
}

fn push_fold(out: &mut Vec<FoldRange>, line_index: &LineIndex, span: Span) {
    let start_line = line_index.line(span.offset);
    let end_line = line_index.line(span.end().saturating_sub(1).max(span.offset));
    if end_line - start_line >= 2 {
        out.push(FoldRange {
            start_line,
            end_line: end_line - 1,
        });
    }
}
