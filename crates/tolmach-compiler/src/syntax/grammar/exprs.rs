//! Body expressions: alternatives, sequences, assignments, cardinality.
//!
//! Cardinality suffixes bind to the tightest preceding element; the parser
//! wraps retroactively via checkpoints. Assignments are recognized with
//! LL(2): a name followed by `=`, `+=`, or `?=`.

use crate::syntax::kinds::{SyntaxKind, token_sets};
use crate::syntax::parser::Parser;

impl Parser<'_> {
    /// `seq (| seq)*`, wrapped in `Alt` only when a pipe is present.
    pub(super) fn parse_alternative(&mut self) {
        if !self.enter_recursion() {
            return;
        }

        let checkpoint = self.checkpoint();
        self.parse_sequence();

        if self.peek() == SyntaxKind::Pipe {
            self.start_node_at(checkpoint, SyntaxKind::Alt);
            while self.eat(SyntaxKind::Pipe) {
                self.parse_sequence();
            }
            self.finish_node();
        }

        self.exit_recursion();
    }

    /// Zero or more elements; wrapped in `Seq` unless exactly one.
    /// An empty sequence is a valid alternative (epsilon).
    fn parse_sequence(&mut self) {
        let checkpoint = self.checkpoint();
        let mut count = 0;

        while self.at_set_peeked(token_sets::EXPR_FIRST) && !self.should_stop() {
            if !self.parse_element() {
                break;
            }
            count += 1;
        }

        if count != 1 {
            self.start_node_at(checkpoint, SyntaxKind::Seq);
            self.finish_node();
        }
    }

    fn at_set_peeked(&mut self, set: crate::syntax::kinds::TokenSet) -> bool {
        let kind = self.peek();
        set.contains(kind)
    }

    /// One element with optional cardinality suffixes.
    pub(super) fn parse_element(&mut self) -> bool {
        let checkpoint = self.checkpoint();
        if !self.parse_primary() {
            return false;
        }

        while token_sets::CARDINALITIES.contains(self.peek()) {
            self.start_node_at(checkpoint, SyntaxKind::Quantified);
            self.bump();
            self.finish_node();
        }

        true
    }

    fn parse_primary(&mut self) -> bool {
        match self.peek() {
            SyntaxKind::SingleQuote | SyntaxKind::DoubleQuote => {
                self.parse_literal();
                true
            }
            SyntaxKind::BracketOpen => {
                self.parse_cross_ref();
                true
            }
            SyntaxKind::BraceOpen => {
                self.parse_action();
                true
            }
            SyntaxKind::ParenOpen => {
                self.parse_paren();
                true
            }
            kind if kind.is_name() => {
                if token_sets::ASSIGN_OPS.contains(self.peek_nth(1)) {
                    self.parse_assignment();
                } else {
                    self.start_node(SyntaxKind::Ref);
                    self.eat_name();
                    self.finish_node();
                }
                true
            }
            _ => {
                self.error("expected an expression");
                false
            }
        }
    }

    /// `name = value`, `name += value`, `name ?= value`.
    fn parse_assignment(&mut self) {
        self.start_node(SyntaxKind::Assignment);
        self.eat_name();
        self.skip_trivia_to_buffer();
        debug_assert!(token_sets::ASSIGN_OPS.contains(self.current()));
        self.bump();

        if !self.parse_element() {
            self.error("expected a value after the assignment operator");
        }

        self.finish_node();
    }

    /// `'kw'` or `"kw"` — quote, content, quote.
    pub(super) fn parse_literal(&mut self) {
        self.start_node(SyntaxKind::Literal);
        let open = self.peek();
        if !(open == SyntaxKind::SingleQuote || open == SyntaxKind::DoubleQuote) {
            self.error("expected a string literal");
            self.finish_node();
            return;
        }
        self.bump();
        if self.at(SyntaxKind::StrVal) {
            self.bump();
        }
        if !self.eat(open) {
            self.error("unterminated string literal");
        }
        self.finish_node();
    }

    /// `[Target]` or `[Target : Token]`.
    fn parse_cross_ref(&mut self) {
        self.start_node(SyntaxKind::CrossRef);
        self.bump();
        self.expect_name("reference target");
        if self.eat(SyntaxKind::Colon) {
            self.expect_name("reference token");
        }
        self.expect(SyntaxKind::BracketClose, "`]`");
        self.finish_node();
    }

    /// `{Type}`, `{Type.field}`, or `{Type.field+=}`.
    fn parse_action(&mut self) {
        self.start_node(SyntaxKind::Action);
        self.bump();
        self.expect_name("action type");
        if self.eat(SyntaxKind::Dot) {
            self.expect_name("grafted field");
            self.skip_trivia_to_buffer();
            if self.at(SyntaxKind::Equals) || self.at(SyntaxKind::PlusEquals) {
                self.bump();
            }
        }
        self.expect(SyntaxKind::BraceClose, "`}`");
        self.finish_node();
    }

    fn parse_paren(&mut self) {
        self.start_node(SyntaxKind::Paren);
        self.bump();
        self.parse_alternative();
        self.expect(SyntaxKind::ParenClose, "`)`");
        self.finish_node();
    }
}
