//! Parser state machine and low-level operations.
//!
//! Trivia tokens (whitespace, comments) are buffered and flushed as leading
//! trivia when starting a new node. This gives predictable trivia attachment
//! without backtracking. The parser is resilient: it always produces a tree;
//! only fuel exhaustion returns an actual error.

use rowan::{Checkpoint, GreenNode, GreenNodeBuilder, TextRange, TextSize};

use tolmach_core::diagnostics::{Diagnostics, Severity, Stage};
use tolmach_core::span::Span;

use super::kinds::{SyntaxKind, SyntaxNode, token_sets};
use super::lexer::Token;
use crate::Error;

const DEFAULT_EXEC_FUEL: u32 = 1_000_000;
const DEFAULT_MAX_DEPTH: u32 = 512;

/// Outcome of parsing a grammar document: a lossless CST plus diagnostics.
#[derive(Debug)]
pub struct ParseResult {
    pub root: SyntaxNode,
    pub diagnostics: Diagnostics,
}

pub struct Parser<'src> {
    pub(super) source: &'src str,
    pub(super) tokens: Vec<Token>,
    pub(super) pos: usize,
    pub(super) trivia_buffer: Vec<Token>,
    pub(super) builder: GreenNodeBuilder<'static>,
    pub(super) diagnostics: Diagnostics,
    pub(super) depth: u32,
    pub(super) last_diagnostic_pos: Option<TextSize>,
    exec_fuel_remaining: u32,
    max_depth: u32,
    fatal_error: Option<Error>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            trivia_buffer: Vec::with_capacity(4),
            builder: GreenNodeBuilder::new(),
            diagnostics: Diagnostics::new(),
            depth: 0,
            last_diagnostic_pos: None,
            exec_fuel_remaining: DEFAULT_EXEC_FUEL,
            max_depth: DEFAULT_MAX_DEPTH,
            fatal_error: None,
        }
    }

    pub fn with_exec_fuel(mut self, limit: u32) -> Self {
        self.exec_fuel_remaining = limit;
        self
    }

    pub fn with_recursion_limit(mut self, limit: u32) -> Self {
        self.max_depth = limit;
        self
    }

    pub fn parse(mut self) -> Result<ParseResult, Error> {
        self.parse_root();
        let (cst, diagnostics) = self.finish()?;
        Ok(ParseResult {
            root: SyntaxNode::new_root(cst),
            diagnostics,
        })
    }

    fn finish(mut self) -> Result<(GreenNode, Diagnostics), Error> {
        self.drain_trivia();
        if let Some(err) = self.fatal_error {
            return Err(err);
        }
        Ok((self.builder.finish(), self.diagnostics))
    }

    pub(super) fn has_fatal_error(&self) -> bool {
        self.fatal_error.is_some()
    }

    /// Returns `Error` at EOF (acts as sentinel).
    pub(super) fn current(&self) -> SyntaxKind {
        self.nth(0)
    }

    pub(super) fn nth(&self, lookahead: usize) -> SyntaxKind {
        self.tokens
            .get(self.pos + lookahead)
            .map_or(SyntaxKind::Error, |t| t.kind)
    }

    fn consume_exec_fuel(&mut self) {
        if self.exec_fuel_remaining == 0 {
            if self.fatal_error.is_none() {
                self.fatal_error = Some(Error::ExecFuelExhausted);
            }
            return;
        }
        self.exec_fuel_remaining -= 1;
    }

    pub(super) fn current_span(&self) -> TextRange {
        self.tokens
            .get(self.pos)
            .map_or_else(|| TextRange::empty(self.eof_offset()), |t| t.span)
    }

    pub(super) fn eof_offset(&self) -> TextSize {
        TextSize::from(self.source.len() as u32)
    }

    pub(super) fn eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub(super) fn should_stop(&self) -> bool {
        self.eof() || self.has_fatal_error()
    }

    pub(super) fn at(&self, kind: SyntaxKind) -> bool {
        self.current() == kind
    }

    pub(super) fn peek(&mut self) -> SyntaxKind {
        self.skip_trivia_to_buffer();
        self.current()
    }

    /// LL(k) lookahead past trivia.
    pub(super) fn peek_nth(&mut self, n: usize) -> SyntaxKind {
        self.skip_trivia_to_buffer();
        let mut count = 0;
        let mut pos = self.pos;
        while pos < self.tokens.len() {
            let kind = self.tokens[pos].kind;
            if !kind.is_trivia() {
                if count == n {
                    return kind;
                }
                count += 1;
            }
            pos += 1;
        }
        SyntaxKind::Error
    }

    pub(super) fn skip_trivia_to_buffer(&mut self) {
        while self.pos < self.tokens.len() && self.tokens[self.pos].kind.is_trivia() {
            self.trivia_buffer.push(self.tokens[self.pos]);
            self.pos += 1;
        }
    }

    pub(super) fn drain_trivia(&mut self) {
        for token in self.trivia_buffer.drain(..) {
            self.builder.token(token.kind.into(), token.text(self.source));
        }
    }

    pub(super) fn eat_trivia(&mut self) {
        self.skip_trivia_to_buffer();
        self.drain_trivia();
    }

    pub(super) fn start_node(&mut self, kind: SyntaxKind) {
        self.drain_trivia();
        self.builder.start_node(kind.into());
    }

    /// Wrap previously-parsed content using checkpoint.
    pub(super) fn start_node_at(&mut self, checkpoint: Checkpoint, kind: SyntaxKind) {
        self.builder.start_node_at(checkpoint, kind.into());
    }

    pub(super) fn finish_node(&mut self) {
        self.builder.finish_node();
    }

    pub(super) fn checkpoint(&mut self) -> Checkpoint {
        self.eat_trivia();
        self.builder.checkpoint()
    }

    /// Consume current token into tree. Buffered trivia is flushed first so
    /// tokens always land in source order.
    pub(super) fn bump(&mut self) {
        assert!(!self.eof(), "bump called at EOF");

        self.drain_trivia();
        self.consume_exec_fuel();

        let token = self.tokens[self.pos];
        self.builder
            .token(token.kind.into(), token.text(self.source));
        self.pos += 1;
    }

    /// Bump the current token but record it with a different kind.
    /// Contextual keywords are recorded as `Id` where they act as names.
    pub(super) fn bump_as(&mut self, kind: SyntaxKind) {
        assert!(!self.eof(), "bump_as called at EOF");

        self.drain_trivia();
        self.consume_exec_fuel();

        let token = self.tokens[self.pos];
        self.builder.token(kind.into(), token.text(self.source));
        self.pos += 1;
    }

    pub(super) fn eat(&mut self, kind: SyntaxKind) -> bool {
        self.skip_trivia_to_buffer();
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Eat a name token (identifier or contextual keyword), recording it as `Id`.
    pub(super) fn eat_name(&mut self) -> bool {
        self.skip_trivia_to_buffer();
        if self.current().is_name() {
            self.bump_as(SyntaxKind::Id);
            true
        } else {
            false
        }
    }

    /// On mismatch: emit diagnostic but don't consume (allows parent recovery).
    pub(super) fn expect(&mut self, kind: SyntaxKind, what: &str) -> bool {
        if self.eat(kind) {
            return true;
        }
        self.error(format!("expected {}", what));
        false
    }

    pub(super) fn expect_name(&mut self, what: &str) -> bool {
        if self.eat_name() {
            return true;
        }
        self.error(format!("expected {}", what));
        false
    }

    /// Emit a parser diagnostic at the current token. Deduplicated by
    /// position so cascades collapse into one message.
    pub(super) fn error(&mut self, message: impl Into<String>) {
        let range = self.current_span();
        let pos = range.start();
        if self.last_diagnostic_pos == Some(pos) {
            return;
        }
        self.last_diagnostic_pos = Some(pos);
        self.diagnostics
            .report(Severity::Error, Stage::Parser, range_to_span(range))
            .message(message)
            .emit();
    }

    pub(super) fn error_and_bump(&mut self, message: &str) {
        self.error(message);
        if !self.eof() {
            self.start_node(SyntaxKind::Error);
            self.bump();
            self.finish_node();
        }
    }

    pub(super) fn enter_recursion(&mut self) -> bool {
        if self.depth >= self.max_depth {
            if self.fatal_error.is_none() {
                self.fatal_error = Some(Error::RecursionLimitExceeded);
            }
            return false;
        }
        self.depth += 1;
        true
    }

    pub(super) fn exit_recursion(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub(super) fn at_item_start(&mut self) -> bool {
        let kind = self.peek();
        if kind.is_name() {
            // A bare name (identifier or contextual keyword) starts an
            // item only as `Name :` or `Name returns T :`.
            return matches!(
                self.peek_nth(1),
                SyntaxKind::Colon | SyntaxKind::KwReturns
            );
        }
        token_sets::ITEM_FIRST.contains(kind)
    }

    /// Skip to the start of the next top-level item.
    pub(super) fn synchronize_to_item(&mut self) {
        if self.should_stop() || self.at_item_start() {
            return;
        }

        self.start_node(SyntaxKind::Error);
        while !self.should_stop() {
            if self.at(SyntaxKind::Semicolon) {
                self.bump();
                break;
            }
            if self.at_item_start() {
                break;
            }
            self.bump();
            self.skip_trivia_to_buffer();
        }
        self.finish_node();
    }
}

pub(crate) fn range_to_span(range: TextRange) -> Span {
    Span::new(range.start().into(), range.len().into())
}
