//! Grammar productions for the grammar language.
//!
//! This module implements all `parse_*` methods as an extension of
//! `Parser`, one module per production family.

mod blocks;
mod exprs;
mod items;

use super::kinds::SyntaxKind;
use super::parser::Parser;

impl Parser<'_> {
    pub(crate) fn parse_root(&mut self) {
        self.start_node(SyntaxKind::Root);

        while !self.should_stop() {
            if self.peek() == SyntaxKind::KwGrammar {
                self.parse_grammar_decl();
                continue;
            }
            if self.at_item_start() {
                self.parse_item();
                continue;
            }
            self.error("expected a rule, terminal, or grammar extension");
            self.synchronize_to_item();
        }

        self.eat_trivia();
        self.finish_node();
    }

    fn parse_grammar_decl(&mut self) {
        self.start_node(SyntaxKind::GrammarDecl);
        self.bump();
        self.expect_name("grammar name");
        self.expect(SyntaxKind::Semicolon, "`;`");
        self.finish_node();
    }
}
