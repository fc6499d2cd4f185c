//! The predictive top-down backend.
//!
//! Interprets the grammar model directly over the token stream. On each
//! alternative the interpreter peeks up to `max_lookahead` tokens to pick
//! a branch and never backtracks across a committed token; ambiguity at
//! the horizon was already reported at grammar-compile time and the first
//! viable branch wins here.
//!
//! Recovery on an unexpected token: report once per offset, then either
//! skip one token (when the next token satisfies the failed expectation)
//! or synthesize a zero-width error leaf and carry on. Hidden tokens are
//! buffered and attached as trivia before the next non-hidden leaf.

use std::sync::Arc;

use tolmach_core::diagnostics::{Diagnostics, Severity, Stage};
use tolmach_core::grammar::{
    AssignOp, AssignmentId, Cardinality, Expr, Grammar, InfixRule,
};
use tolmach_core::tokens::TokenSym;
use tolmach_core::{Interner, Span, Symbol};

use tolmach_compiler::analysis::{GrammarAnalysis, cross_ref_token};
use tolmach_compiler::stages::GrammarAnalyzed;

use crate::lexer::{DocToken, Tokenizer, TokenizerError};
use crate::tree::{NodeKind, SyntaxTree, TreeBuilder};

const MAX_RULE_DEPTH: u32 = 512;

/// The predictive backend: a grammar interpreter.
pub struct TopDownParser {
    grammar: Arc<Grammar>,
    analysis: Arc<GrammarAnalysis>,
    tokenizer: Tokenizer,
    interner: Arc<Interner>,
}

impl TopDownParser {
    pub fn new(analyzed: &GrammarAnalyzed) -> Result<Self, TokenizerError> {
        let tokenizer = Tokenizer::from_grammar(analyzed.grammar())?;
        Ok(Self {
            grammar: Arc::new(analyzed.grammar().clone()),
            analysis: Arc::new(analyzed.analysis().clone()),
            interner: Arc::new(analyzed.grammar().interner.clone()),
            tokenizer,
        })
    }

    /// Parse a document. Always returns a tree covering the input;
    /// failures are diagnostics on the root.
    pub fn parse(&self, text: &str) -> SyntaxTree {
        let mut diagnostics = Diagnostics::new();
        let tokens = self.tokenizer.tokenize(text, &mut diagnostics);

        let mut session = Session {
            parser: self,
            text,
            tokens,
            pos: 0,
            pending: Vec::new(),
            builder: TreeBuilder::new(),
            diagnostics,
            last_error_offset: None,
            last_consumed_end: 0,
            depth: 0,
        };
        session.run();

        let Session {
            builder,
            diagnostics,
            ..
        } = session;
        builder.finish(Arc::from(text), diagnostics.into_vec(), self.interner.clone())
    }
}

struct Session<'p> {
    parser: &'p TopDownParser,
    text: &'p str,
    tokens: Vec<DocToken>,
    pos: usize,
    /// Hidden tokens waiting to be attached before the next leaf.
    pending: Vec<DocToken>,
    builder: TreeBuilder,
    diagnostics: Diagnostics,
    last_error_offset: Option<u32>,
    last_consumed_end: u32,
    depth: u32,
}

impl<'p> Session<'p> {
    fn grammar(&self) -> &'p Grammar {
        &self.parser.grammar
    }

    fn run(&mut self) {
        let Some(entry) = self.grammar().entry_rule() else {
            self.builder.start_node(NodeKind::Error, 0);
            self.error_at(Span::empty(0), "grammar has no entry rule");
            self.builder.finish_node(self.text.len() as u32);
            return;
        };

        self.builder
            .start_node(NodeKind::Rule(entry.ast_type()), 0);
        self.eval(&entry.body.clone(), None);

        // Leftover input is wrapped in error leaves, one diagnostic.
        if self.peek().is_some() {
            let span = self.peek().map(|t| t.span).unwrap_or_default();
            self.error_at(span, "expected end of input");
            while let Some(token) = self.peek() {
                let token = *token;
                self.flush_pending();
                self.builder.leaf(NodeKind::Error, token.span, false, None);
                self.pos += 1;
            }
        }

        self.buffer_hidden();
        self.flush_pending();
        self.builder.finish_node(self.text.len() as u32);
    }

    // --- token plumbing -------------------------------------------------

    /// Move hidden tokens at the cursor into the pending trivia buffer.
    fn buffer_hidden(&mut self) {
        while let Some(token) = self.tokens.get(self.pos) {
            if !token.hidden {
                break;
            }
            self.pending.push(*token);
            self.pos += 1;
        }
    }

    fn flush_pending(&mut self) {
        for token in std::mem::take(&mut self.pending) {
            self.builder
                .leaf(NodeKind::from_token(token.sym), token.span, true, None);
        }
    }

    /// Current non-hidden token.
    fn peek(&mut self) -> Option<&DocToken> {
        self.buffer_hidden();
        self.tokens.get(self.pos)
    }

    /// Up to `n` upcoming non-hidden tokens.
    fn lookahead(&mut self, n: usize) -> Vec<DocToken> {
        self.buffer_hidden();
        self.tokens[self.pos..]
            .iter()
            .filter(|t| !t.hidden)
            .take(n)
            .copied()
            .collect()
    }

    fn token_text(&self, token: &DocToken) -> &'p str {
        &self.text[token.span.as_range()]
    }

    /// Whether a concrete token satisfies a grammar token. Identifier-like
    /// keywords match identifier tokens by text; `extend` classes match
    /// their base token by text.
    fn token_matches(&self, expected: TokenSym, token: &DocToken) -> bool {
        if expected == token.sym {
            return true;
        }
        let text = &self.text[token.span.as_range()];
        match (expected, token.sym) {
            (TokenSym::Keyword(lit), TokenSym::Terminal(_)) => {
                self.grammar().resolve(lit) == text
            }
            (TokenSym::Terminal(class), TokenSym::Terminal(_)) => {
                self.parser.tokenizer.extend_class(text) == Some(class)
            }
            _ => false,
        }
    }

    // --- prediction -----------------------------------------------------

    /// Endpoint bitmask: bit `i` set means the expression can consume
    /// exactly `i` of the lookahead tokens; the top bit saturates at the
    /// horizon and counts as viable.
    fn endpoints(&self, expr: &Expr, starts: u32, la: &[DocToken], depth: u32) -> u32 {
        if starts == 0 || depth > 64 {
            return 0;
        }
        let k = self.parser.analysis.max_lookahead.min(16) as u32;
        let cap_bit = 1u32 << k;

        match expr {
            Expr::Sequence(items) => {
                let mut current = starts;
                for item in items {
                    current = self.endpoints(item, current, la, depth + 1);
                    if current == 0 {
                        return 0;
                    }
                }
                current
            }
            Expr::Alternative(branches) => branches
                .iter()
                .fold(0, |acc, b| acc | self.endpoints(b, starts, la, depth + 1)),
            Expr::Repeat { inner, cardinality } => {
                let mut result = match cardinality {
                    Cardinality::OneOrMore => 0,
                    _ => starts,
                };
                let mut current = starts;
                // Each unroll consumes at least one token or stabilizes.
                for _ in 0..=k {
                    current = self.endpoints(inner, current, la, depth + 1);
                    let before = result;
                    result |= current;
                    if current == 0 || result == before {
                        break;
                    }
                }
                result
            }
            Expr::Assignment { inner, .. } => self.endpoints(inner, starts, la, depth + 1),
            Expr::Action { .. } => starts,
            Expr::Keyword(lit) => {
                self.token_endpoints(TokenSym::Keyword(*lit), starts, la, k, cap_bit)
            }
            Expr::TerminalRef(name) => {
                self.token_endpoints(TokenSym::Terminal(*name), starts, la, k, cap_bit)
            }
            Expr::CrossRef { token, .. } => match cross_ref_token(self.grammar(), *token) {
                Some(terminal) => {
                    self.token_endpoints(TokenSym::Terminal(terminal), starts, la, k, cap_bit)
                }
                None => 0,
            },
            Expr::RuleRef(name) => {
                if let Some(infix) = self.find_infix(*name) {
                    // Viability of an infix family is its base operand's.
                    let base = Expr::RuleRef(infix.base);
                    return self.endpoints(&base, starts, la, depth + 1);
                }
                match self.grammar().rule(*name) {
                    Some(rule) => self.endpoints(&rule.body, starts, la, depth + 1),
                    None => 0,
                }
            }
        }
    }

    fn token_endpoints(
        &self,
        expected: TokenSym,
        starts: u32,
        la: &[DocToken],
        k: u32,
        cap_bit: u32,
    ) -> u32 {
        let mut out = 0;
        for i in 0..=k {
            if starts & (1 << i) == 0 {
                continue;
            }
            if i == k {
                // Saturated: beyond the horizon everything is viable.
                out |= cap_bit;
            } else if let Some(token) = la.get(i as usize)
                && self.token_matches(expected, token)
            {
                out |= 1 << (i + 1);
            }
        }
        out
    }

    fn viable(&mut self, expr: &Expr) -> bool {
        let k = self.parser.analysis.max_lookahead.min(16);
        let la = self.lookahead(k);
        self.endpoints(expr, 1, &la, 0) != 0
    }

    fn find_infix(&self, name: Symbol) -> Option<&'p InfixRule> {
        self.parser.grammar.infixes.iter().find(|i| i.name == name)
    }

    // --- evaluation -----------------------------------------------------

    fn eval(&mut self, expr: &Expr, assign: Option<AssignmentId>) {
        match expr {
            Expr::Sequence(items) => {
                for item in items {
                    self.eval(item, assign);
                }
            }
            Expr::Alternative(branches) => {
                for branch in branches {
                    if self.viable(branch) {
                        self.eval(branch, assign);
                        return;
                    }
                }
                let (_, nullable) = self
                    .parser
                    .analysis
                    .first_of_expr(self.grammar(), expr);
                if !nullable {
                    self.fail_expectation("any matching alternative", None);
                }
            }
            Expr::Repeat { inner, cardinality } => match cardinality {
                Cardinality::Optional => {
                    if self.viable(inner) {
                        self.eval(inner, assign);
                    }
                }
                Cardinality::ZeroOrMore => self.eval_loop(inner, assign, false),
                Cardinality::OneOrMore => self.eval_loop(inner, assign, true),
            },
            Expr::Assignment { field, op, inner } => {
                let id = match inner.cross_ref_target() {
                    Some(target) => AssignmentId::reference(*field, *op, target),
                    None => AssignmentId::new(*field, *op),
                };
                self.eval(inner, Some(id));
            }
            Expr::Action { type_name, graft } => {
                let offset = self.cursor_offset();
                self.builder.action_marker(
                    *type_name,
                    offset,
                    graft.map(|(field, op)| AssignmentId::new(field, op)),
                );
            }
            Expr::Keyword(lit) => {
                let expected = TokenSym::Keyword(*lit);
                self.match_token(expected, NodeKind::Keyword(*lit), assign);
            }
            Expr::TerminalRef(name) => {
                let expected = TokenSym::Terminal(*name);
                self.match_token(expected, NodeKind::Terminal(*name), assign);
            }
            Expr::CrossRef { token, .. } => {
                match cross_ref_token(self.grammar(), *token) {
                    Some(terminal) => {
                        let expected = TokenSym::Terminal(terminal);
                        self.match_token(expected, NodeKind::Terminal(terminal), assign);
                    }
                    None => self.fail_expectation("a reference token", assign),
                }
            }
            Expr::RuleRef(name) => self.eval_rule_ref(*name, assign),
        }
    }

    fn eval_loop(&mut self, inner: &Expr, assign: Option<AssignmentId>, at_least_one: bool) {
        let mut first = true;
        loop {
            if !self.viable(inner) {
                if first && at_least_one {
                    self.fail_expectation("at least one repetition", assign);
                }
                return;
            }
            let before = self.pos;
            self.eval(inner, assign);
            first = false;
            if self.pos == before {
                // No progress: bail out instead of spinning.
                return;
            }
        }
    }

    fn eval_rule_ref(&mut self, name: Symbol, assign: Option<AssignmentId>) {
        if let Some(infix) = self.find_infix(name) {
            self.eval_infix(infix, assign);
            return;
        }

        let Some(rule) = self.grammar().rule(name) else {
            self.fail_expectation("a defined rule", assign);
            return;
        };

        if self.depth >= MAX_RULE_DEPTH {
            let span = Span::empty(self.cursor_offset());
            self.error_at(span, "rule nesting too deep");
            self.synthesize_error(assign);
            return;
        }

        self.buffer_hidden();
        self.flush_pending();
        let offset = self.cursor_offset();
        let id = self.builder.start_node(NodeKind::Rule(rule.ast_type()), offset);
        self.builder.set_assignment(id, assign);

        self.depth += 1;
        let body = rule.body.clone();
        self.eval(&body, None);
        self.depth -= 1;

        self.builder.finish_node(self.last_consumed_end);
    }

    /// Precedence climbing over the infix groups; groups are declared in
    /// strictly decreasing binding strength, so group 0 binds tightest and
    /// the outermost loop runs the weakest group. All levels are
    /// left-associative.
    fn eval_infix(&mut self, infix: &InfixRule, assign: Option<AssignmentId>) {
        let weakest = infix.groups.len();
        let checkpoint = self.sync_checkpoint();
        self.eval_infix_level(infix, weakest);

        // The whole expression's assignment lands on the resulting child.
        if assign.is_some() {
            self.builder
                .assign_first_nontrivia_from(checkpoint, assign);
        }
    }

    fn eval_infix_level(&mut self, infix: &InfixRule, level: usize) {
        if level == 0 {
            self.eval_rule_ref(infix.base, None);
            return;
        }
        let group = &infix.groups[level - 1];

        let checkpoint = self.sync_checkpoint();
        self.eval_infix_level(infix, level - 1);

        loop {
            let Some(op) = self.current_operator(group) else {
                return;
            };

            let left = self.interner_get("left");
            let operator = self.interner_get("operator");
            let right = self.interner_get("right");

            self.builder
                .wrap_from(checkpoint, NodeKind::Rule(infix.name));
            self.builder.assign_first_nontrivia_from(
                0,
                left.map(|f| AssignmentId::new(f, AssignOp::Single)),
            );

            self.match_token(
                TokenSym::Keyword(op),
                NodeKind::Keyword(op),
                operator.map(|f| AssignmentId::new(f, AssignOp::Single)),
            );

            let right_checkpoint = self.builder.checkpoint();
            self.eval_infix_level(infix, level - 1);
            self.builder.assign_first_nontrivia_from(
                right_checkpoint,
                right.map(|f| AssignmentId::new(f, AssignOp::Single)),
            );

            self.builder.finish_node(self.last_consumed_end);
        }
    }

    fn sync_checkpoint(&mut self) -> usize {
        self.buffer_hidden();
        self.flush_pending();
        self.builder.checkpoint()
    }

    fn interner_get(&self, name: &str) -> Option<Symbol> {
        self.parser.grammar.interner.get(name)
    }

    fn current_operator(&mut self, group: &[Symbol]) -> Option<Symbol> {
        let token = *self.peek()?;
        group
            .iter()
            .copied()
            .find(|&op| self.token_matches(TokenSym::Keyword(op), &token))
    }

    // --- matching & recovery --------------------------------------------

    fn match_token(
        &mut self,
        expected: TokenSym,
        kind: NodeKind,
        assign: Option<AssignmentId>,
    ) {
        let Some(token) = self.peek().copied() else {
            self.report_unexpected(None, expected);
            self.synthesize_error(assign);
            return;
        };

        if self.token_matches(expected, &token) {
            self.consume_as(kind, token, assign);
            return;
        }

        self.report_unexpected(Some(&token), expected);

        // Single-token repair: skip the offender when its successor
        // satisfies the expectation; otherwise synthesize.
        let next_matches = {
            let la = self.lookahead(2);
            la.get(1)
                .map(|next| self.token_matches(expected, next))
                .unwrap_or(false)
        };
        if next_matches {
            self.flush_pending();
            self.builder.leaf(NodeKind::Error, token.span, false, None);
            self.pos += 1;
            let replacement = *self.peek().expect("lookahead verified a successor");
            self.consume_as(kind, replacement, assign);
        } else {
            self.synthesize_error(assign);
        }
    }

    fn consume_as(&mut self, kind: NodeKind, token: DocToken, assign: Option<AssignmentId>) {
        self.flush_pending();
        self.builder.leaf(kind, token.span, false, assign);
        self.pos += 1;
        self.last_consumed_end = token.span.end();
    }

    fn synthesize_error(&mut self, assign: Option<AssignmentId>) {
        let offset = self.cursor_offset();
        self.builder
            .leaf(NodeKind::Error, Span::empty(offset), false, assign);
    }

    fn cursor_offset(&mut self) -> u32 {
        self.buffer_hidden();
        self.tokens
            .get(self.pos)
            .map(|t| t.span.offset)
            .unwrap_or(self.text.len() as u32)
    }

    fn fail_expectation(&mut self, what: &str, assign: Option<AssignmentId>) {
        let span = self
            .peek()
            .map(|t| t.span)
            .unwrap_or(Span::empty(self.text.len() as u32));
        self.error_at(span, format!("expected {what}"));
        self.synthesize_error(assign);
    }

    fn report_unexpected(&mut self, token: Option<&DocToken>, expected: TokenSym) {
        let expected_name = match expected {
            TokenSym::Keyword(lit) => format!("'{}'", self.grammar().resolve(lit)),
            TokenSym::Terminal(name) => self.grammar().resolve(name).to_string(),
        };
        let previous = if self.last_consumed_end > 0 {
            let end = self.last_consumed_end as usize;
            let start = self.text[..end]
                .rfind(|c: char| c.is_whitespace())
                .map(|i| i + 1)
                .unwrap_or(0);
            format!(" after `{}`", &self.text[start..end])
        } else {
            String::new()
        };

        match token {
            Some(token) => {
                let text = self.token_text(token).to_string();
                let span = token.span;
                self.error_at(
                    span,
                    format!("unexpected token `{text}`, expected {expected_name}{previous}"),
                );
            }
            None => {
                self.error_at(
                    Span::empty(self.text.len() as u32),
                    format!("unexpected end of input, expected {expected_name}{previous}"),
                );
            }
        }
    }

    fn error_at(&mut self, span: Span, message: impl Into<String>) {
        if self.last_error_offset == Some(span.offset) {
            return;
        }
        self.last_error_offset = Some(span.offset);
        self.diagnostics
            .report(Severity::Error, Stage::Parser, span)
            .message(message)
            .emit();
    }
}
