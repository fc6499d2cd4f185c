//! Test utilities: parsing helpers and CST dumps for snapshots.

use tolmach_core::diagnostics::Diagnostics;

use crate::syntax::{Parser, SyntaxNode, lex};

/// Parse a grammar source into a CST, panicking on fuel exhaustion.
pub fn parse_cst(source: &str) -> (SyntaxNode, Diagnostics) {
    let tokens = lex(source);
    let result = Parser::new(source, tokens)
        .parse()
        .expect("test inputs stay within fuel limits");
    (result.root, result.diagnostics)
}

/// Parse and assert the source produced no diagnostics; returns the dump.
pub fn expect_clean_cst(source: &str) -> String {
    let (root, diagnostics) = parse_cst(source);
    assert!(
        diagnostics.is_empty(),
        "unexpected diagnostics:\n{}",
        diagnostics.printer().source(source).render()
    );
    dump_cst(&root)
}

/// Indented kind/text rendering of a CST, trivia omitted.
pub fn dump_cst(node: &SyntaxNode) -> String {
    let mut out = String::new();
    dump_into(node, 0, &mut out);
    out
}

fn dump_into(node: &SyntaxNode, depth: usize, out: &mut String) {
    use std::fmt::Write;

    for _ in 0..depth {
        out.push_str("  ");
    }
    writeln!(out, "{:?}", node.kind()).unwrap();

    for element in node.children_with_tokens() {
        match element {
            rowan::NodeOrToken::Node(child) => dump_into(&child, depth + 1, out),
            rowan::NodeOrToken::Token(token) => {
                if token.kind().is_trivia() {
                    continue;
                }
                for _ in 0..(depth + 1) {
                    out.push_str("  ");
                }
                writeln!(out, "{:?} {:?}", token.kind(), token.text()).unwrap();
            }
        }
    }
}
