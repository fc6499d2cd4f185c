//! Top-level items: rules and terminals.

use crate::syntax::kinds::SyntaxKind;
use crate::syntax::parser::Parser;

impl Parser<'_> {
    pub(super) fn parse_item(&mut self) {
        match self.peek() {
            SyntaxKind::KwTerminal | SyntaxKind::KwHidden => self.parse_terminal(),
            SyntaxKind::KwPrecedence => self.parse_prec_block(),
            SyntaxKind::KwConflicts => self.parse_conflicts(),
            SyntaxKind::KwSpecialize => self.parse_promotion(SyntaxKind::SpecializeBlock),
            SyntaxKind::KwExtend => self.parse_promotion(SyntaxKind::ExtendBlock),
            SyntaxKind::KwExternal => self.parse_external(),
            SyntaxKind::KwLocal => self.parse_local_tokens(),
            SyntaxKind::KwInfix => self.parse_infix(),
            _ => self.parse_rule(),
        }
    }

    /// `@anno(arg)* entry? Name (returns Type)? : body ;`
    fn parse_rule(&mut self) {
        self.start_node(SyntaxKind::Rule);

        while self.peek() == SyntaxKind::At {
            self.parse_annotation();
        }

        self.eat(SyntaxKind::KwEntry);

        self.expect_name("rule name");

        if self.eat(SyntaxKind::KwReturns) {
            self.expect_name("type name");
        }

        self.expect(SyntaxKind::Colon, "`:`");
        self.parse_alternative();
        if !self.expect(SyntaxKind::Semicolon, "`;`") {
            self.synchronize_to_item();
        }

        self.finish_node();
    }

    /// `@name` or `@name(arg)` where arg is an integer or a name.
    fn parse_annotation(&mut self) {
        self.start_node(SyntaxKind::Annotation);
        self.bump();
        self.expect_name("annotation name");

        if self.eat(SyntaxKind::ParenOpen) {
            self.skip_trivia_to_buffer();
            if self.at(SyntaxKind::Int) {
                self.bump();
            } else if !self.eat_name() {
                self.error("expected annotation argument");
            }
            self.expect(SyntaxKind::ParenClose, "`)`");
        }

        self.finish_node();
    }

    /// `hidden? terminal NAME : /regex/ ;`
    fn parse_terminal(&mut self) {
        self.start_node(SyntaxKind::Terminal);

        self.eat(SyntaxKind::KwHidden);
        self.expect(SyntaxKind::KwTerminal, "`terminal`");
        self.expect_name("terminal name");
        self.expect(SyntaxKind::Colon, "`:`");
        if !self.eat(SyntaxKind::RegexLiteral) {
            self.error("expected a terminal body `/…/`");
        }
        self.expect(SyntaxKind::Semicolon, "`;`");

        self.finish_node();
    }
}
