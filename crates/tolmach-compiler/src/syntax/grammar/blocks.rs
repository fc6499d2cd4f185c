//! Grammar extension blocks: precedence, conflicts, specialize/extend,
//! external tokens/context, local tokens, infix rules.

use crate::syntax::kinds::{SyntaxKind, token_sets};
use crate::syntax::parser::Parser;

impl Parser<'_> {
    /// `precedence { Name (left|right|nonassoc)? assoc? ; … }`
    pub(super) fn parse_prec_block(&mut self) {
        self.start_node(SyntaxKind::PrecBlock);
        self.bump();
        self.expect(SyntaxKind::BraceOpen, "`{`");

        while !self.block_done() {
            if self.peek().is_name() {
                self.parse_prec_level();
            } else {
                self.error_and_bump("expected a precedence level");
            }
        }

        self.expect(SyntaxKind::BraceClose, "`}`");
        self.finish_node();
    }

    fn parse_prec_level(&mut self) {
        self.start_node(SyntaxKind::PrecLevel);
        self.eat_name();
        self.skip_trivia_to_buffer();
        if matches!(
            self.peek(),
            SyntaxKind::KwLeft | SyntaxKind::KwRight | SyntaxKind::KwNonassoc
        ) {
            self.bump();
        }
        self.eat(SyntaxKind::KwAssoc);
        self.expect(SyntaxKind::Semicolon, "`;`");
        self.finish_node();
    }

    /// `conflicts { [A, B]; [A, C]; }`
    pub(super) fn parse_conflicts(&mut self) {
        self.start_node(SyntaxKind::ConflictsBlock);
        self.bump();
        self.expect(SyntaxKind::BraceOpen, "`{`");

        while !self.block_done() {
            if self.peek() == SyntaxKind::BracketOpen {
                self.parse_conflict_set();
            } else {
                self.error_and_bump("expected a conflict set `[A, B]`");
            }
        }

        self.expect(SyntaxKind::BraceClose, "`}`");
        self.finish_node();
    }

    fn parse_conflict_set(&mut self) {
        self.start_node(SyntaxKind::ConflictSet);
        self.bump();
        self.expect_name("rule name");
        while self.eat(SyntaxKind::Comma) {
            self.expect_name("rule name");
        }
        self.expect(SyntaxKind::BracketClose, "`]`");
        self.expect(SyntaxKind::Semicolon, "`;`");
        self.finish_node();
    }

    /// `specialize ID { "lit" => Kw; … }` / `extend ID { … }`
    pub(super) fn parse_promotion(&mut self, node: SyntaxKind) {
        self.start_node(node);
        self.bump();
        self.expect_name("token class");
        self.expect(SyntaxKind::BraceOpen, "`{`");

        while !self.block_done() {
            if matches!(
                self.peek(),
                SyntaxKind::SingleQuote | SyntaxKind::DoubleQuote
            ) {
                self.parse_mapping();
            } else {
                self.error_and_bump("expected a mapping `\"literal\" => Name`");
            }
        }

        self.expect(SyntaxKind::BraceClose, "`}`");
        self.finish_node();
    }

    fn parse_mapping(&mut self) {
        self.start_node(SyntaxKind::Mapping);
        self.parse_literal();
        self.expect(SyntaxKind::FatArrow, "`=>`");
        self.expect_name("promoted keyword class");
        self.expect(SyntaxKind::Semicolon, "`;`");
        self.finish_node();
    }

    /// `external tokens from "path" { A, B }` or
    /// `external context name from "path";`
    pub(super) fn parse_external(&mut self) {
        match self.peek_nth(1) {
            SyntaxKind::KwContext => self.parse_external_context(),
            _ => self.parse_external_tokens(),
        }
    }

    fn parse_external_tokens(&mut self) {
        self.start_node(SyntaxKind::ExternalTokens);
        self.bump();
        self.expect(SyntaxKind::KwTokens, "`tokens`");
        self.expect(SyntaxKind::KwFrom, "`from`");
        self.parse_literal();
        self.expect(SyntaxKind::BraceOpen, "`{`");
        self.expect_name("token name");
        while self.eat(SyntaxKind::Comma) {
            self.expect_name("token name");
        }
        self.expect(SyntaxKind::BraceClose, "`}`");
        self.finish_node();
    }

    fn parse_external_context(&mut self) {
        self.start_node(SyntaxKind::ExternalContext);
        self.bump();
        self.bump();
        self.expect_name("context name");
        self.expect(SyntaxKind::KwFrom, "`from`");
        self.parse_literal();
        self.expect(SyntaxKind::Semicolon, "`;`");
        self.finish_node();
    }

    /// `local tokens in Rule { T : /re/ ; @else Fallback; }`
    pub(super) fn parse_local_tokens(&mut self) {
        self.start_node(SyntaxKind::LocalTokens);
        self.bump();
        self.expect(SyntaxKind::KwTokens, "`tokens`");
        self.expect(SyntaxKind::KwIn, "`in`");
        self.expect_name("rule name");
        self.expect(SyntaxKind::BraceOpen, "`{`");

        while !self.block_done() {
            if self.peek() == SyntaxKind::At {
                self.parse_else_branch();
            } else if self.peek().is_name() {
                self.parse_local_token_def();
            } else {
                self.error_and_bump("expected a local token or `@else`");
            }
        }

        self.expect(SyntaxKind::BraceClose, "`}`");
        self.finish_node();
    }

    fn parse_local_token_def(&mut self) {
        self.start_node(SyntaxKind::LocalTokenDef);
        self.eat_name();
        self.expect(SyntaxKind::Colon, "`:`");
        if !self.eat(SyntaxKind::RegexLiteral) {
            self.error("expected a token body `/…/`");
        }
        self.expect(SyntaxKind::Semicolon, "`;`");
        self.finish_node();
    }

    fn parse_else_branch(&mut self) {
        self.start_node(SyntaxKind::ElseBranch);
        self.bump();
        self.expect(SyntaxKind::KwElse, "`else`");
        self.expect_name("fallback rule");
        self.expect(SyntaxKind::Semicolon, "`;`");
        self.finish_node();
    }

    /// `infix Name on Base : 'op' | 'op' > 'op' ;`
    pub(super) fn parse_infix(&mut self) {
        self.start_node(SyntaxKind::InfixDecl);
        self.bump();
        self.expect_name("infix rule name");
        self.expect(SyntaxKind::KwOn, "`on`");
        self.expect_name("base rule");
        self.expect(SyntaxKind::Colon, "`:`");

        self.parse_infix_group();
        while self.eat(SyntaxKind::Gt) {
            self.parse_infix_group();
        }

        self.expect(SyntaxKind::Semicolon, "`;`");
        self.finish_node();
    }

    fn parse_infix_group(&mut self) {
        self.start_node(SyntaxKind::InfixGroup);
        self.parse_literal();
        while self.eat(SyntaxKind::Pipe) {
            self.parse_literal();
        }
        self.finish_node();
    }

    /// At `}` or a stopping condition; shared loop guard for blocks.
    /// Bails out when a new top-level item clearly begins, so a missing `}`
    /// is reported by the caller's expect instead of swallowing the rest of
    /// the document.
    fn block_done(&mut self) -> bool {
        let kind = self.peek();
        kind == SyntaxKind::BraceClose
            || self.should_stop()
            || token_sets::BLOCK_BAIL.contains(kind)
    }
}
