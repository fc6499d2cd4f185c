//! The LR runtime adapter.
//!
//! Loads the generator artifacts (parse tables, field-map, keyword set)
//! plus an optional external context, and drives a shift/reduce engine
//! over the shared document tokenizer. Reductions build the unified
//! syntax tree: node productions create rule nodes, transparent
//! productions splice their children into the surrounding node, action
//! productions reduce to zero-width markers.
//!
//! `reparse` applies a sorted, disjoint edit list: the damaged region is
//! re-lexed and tokens outside it are reused from the previous tree; the
//! resulting tree is structurally equal to a from-scratch parse.

use std::collections::HashMap;
use std::sync::Arc;

use tolmach_core::diagnostics::{Diagnostics, Severity, Stage};
use tolmach_core::grammar::{AssignOp, AssignmentId};
use tolmach_core::tokens::TokenSym;
use tolmach_core::{Interner, Span};

use tolmach_compiler::artifacts::Artifacts;
use tolmach_compiler::tablegen::{Action, ParseTable, TokIdx};
use tolmach_compiler::translate::BuildKind;

use crate::lexer::{DocToken, Tokenizer, TokenizerError};
use crate::tree::{NodeKind, SyntaxTree, TreeBuilder};

/// One text edit: replace `[from, to)` with `insert`. Edit lists are
/// sorted and disjoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub from: u32,
    pub to: u32,
    pub insert: String,
}

/// Host-provided stateful lookahead hook, consulted before the tables.
pub trait ExternalContext: Send + Sync {
    /// Reclassify a token, or `None` to leave it alone.
    fn classify(&self, text: &str, token: &DocToken) -> Option<TokenSym>;
}

/// The LR backend: generated tables plus the shared tokenizer.
pub struct LrParser {
    tables: Arc<ParseTable>,
    tokenizer: Tokenizer,
    /// Production id → resolved assignment identities by child position.
    fields: HashMap<u32, Vec<(u32, AssignmentId)>>,
    interner: Arc<Interner>,
    context: Option<Box<dyn ExternalContext>>,
}

impl LrParser {
    pub fn new(artifacts: &Artifacts) -> Result<Self, TokenizerError> {
        let tokenizer = Tokenizer::from_tables(&artifacts.tables)?;

        // Resolve the field-map's wire strings against the artifact's
        // name table once, at load time.
        let interner = artifacts.tables.interner.clone();
        let mut fields = HashMap::new();
        for (prod, entries) in &artifacts.field_map.productions {
            let Ok(prod) = prod.parse::<u32>() else {
                continue;
            };
            let resolved: Vec<(u32, AssignmentId)> = entries
                .iter()
                .filter_map(|entry| {
                    let field = interner.get(&entry.name)?;
                    let op = match entry.op.as_str() {
                        "+=" => AssignOp::Append,
                        "?=" => AssignOp::Bool,
                        _ => AssignOp::Single,
                    };
                    let reference = entry
                        .reference
                        .as_deref()
                        .and_then(|name| interner.get(name));
                    Some((
                        entry.index,
                        AssignmentId {
                            field,
                            op,
                            reference,
                        },
                    ))
                })
                .collect();
            fields.insert(prod, resolved);
        }

        Ok(Self {
            tables: Arc::new(artifacts.tables.clone()),
            tokenizer,
            fields,
            interner: Arc::new(interner),
            context: None,
        })
    }

    pub fn with_external_context(mut self, context: Box<dyn ExternalContext>) -> Self {
        self.context = Some(context);
        self
    }

    /// Full parse.
    pub fn parse(&self, text: &str) -> SyntaxTree {
        let mut diagnostics = Diagnostics::new();
        let tokens = self.tokenizer.tokenize(text, &mut diagnostics);
        self.parse_tokens(text, tokens, diagnostics)
    }

    /// Incremental reparse: apply the edits, reuse tokens outside the
    /// damaged region, parse. Structural equality with a full parse of
    /// the edited text is guaranteed; node identity is not.
    pub fn reparse(&self, prev: &SyntaxTree, edits: &[Edit]) -> SyntaxTree {
        let new_text = apply_edits(prev.text(), edits);
        let mut diagnostics = Diagnostics::new();
        let tokens = self
            .incremental_tokens(prev, &new_text, edits)
            .unwrap_or_else(|| self.tokenizer.tokenize(&new_text, &mut diagnostics));
        self.parse_tokens(&new_text, tokens, diagnostics)
    }

    /// Token names shiftable at `offset`, for completion.
    pub fn expected_tokens(&self, text: &str, offset: u32) -> Vec<String> {
        let mut diagnostics = Diagnostics::new();
        let tokens = self.tokenizer.tokenize(text, &mut diagnostics);

        let mut states = vec![self.tables.start_state];
        let mut pos = 0;
        let mut fuel: u32 = 100_000;
        loop {
            if fuel == 0 {
                break;
            }
            fuel -= 1;
            let token = tokens[pos..]
                .iter()
                .position(|t| !t.hidden)
                .map(|i| pos + i)
                .filter(|&i| tokens[i].span.end() <= offset);
            let Some(index) = token else { break };
            let token = tokens[index];

            let state = *states.last().expect("state stack is never empty");
            let Some((tok_idx, _)) = self.classify(state, text, &token) else {
                break;
            };
            match self.tables.action(state, tok_idx) {
                Some(Action::Shift(next)) => {
                    states.push(next);
                    pos = index + 1;
                }
                Some(Action::Reduce(prod)) => {
                    let summary = &self.tables.productions[prod as usize];
                    if summary.rhs_len as usize >= states.len() {
                        break;
                    }
                    states.truncate(states.len() - summary.rhs_len as usize);
                    let state = *states.last().expect("state stack is never empty");
                    match self.tables.goto(state, summary.lhs) {
                        Some(next) => states.push(next),
                        None => break,
                    }
                }
                _ => break,
            }
        }

        let state = *states.last().expect("state stack is never empty");
        self.tables
            .expected_tokens(state)
            .into_iter()
            .map(|tok| match tok {
                TokenSym::Keyword(sym) => self.interner.resolve(sym).to_string(),
                TokenSym::Terminal(sym) => self.interner.resolve(sym).to_string(),
            })
            .collect()
    }

    // --- engine ---------------------------------------------------------

    fn parse_tokens(
        &self,
        text: &str,
        tokens: Vec<DocToken>,
        diagnostics: Diagnostics,
    ) -> SyntaxTree {
        let mut engine = Engine {
            parser: self,
            text,
            tokens,
            pos: 0,
            leading: Vec::new(),
            stack: vec![Slot {
                state: self.tables.start_state,
                items: Vec::new(),
            }],
            diagnostics,
            last_error_offset: None,
            last_consumed_end: 0,
            accepted: false,
        };
        engine.run();
        engine.finish()
    }

    /// Token classification under a state: external context first, then
    /// `extend` promotion, then grammar-listed keyword preference, then
    /// the token as lexed.
    fn classify(&self, state: u32, text: &str, token: &DocToken) -> Option<(TokIdx, NodeKind)> {
        let token_text = &text[token.span.as_range()];

        if let Some(context) = &self.context
            && let Some(sym) = context.classify(text, token)
            && let Some(idx) = self.tables.token_index(sym)
            && self.tables.action(state, idx).is_some()
        {
            return Some((idx, NodeKind::from_token(sym)));
        }

        if let TokenSym::Terminal(_) = token.sym {
            if let Some(class) = self.tokenizer.extend_class(token_text)
                && let Some(idx) = self.tables.token_index(TokenSym::Terminal(class))
                && self.tables.action(state, idx).is_some()
            {
                return Some((idx, NodeKind::Terminal(class)));
            }
            if let Some(sym) = self.interner.get(token_text)
                && let Some(idx) = self.tables.token_index(TokenSym::Keyword(sym))
                && self.tables.action(state, idx).is_some()
            {
                return Some((idx, NodeKind::Keyword(sym)));
            }
        }

        let idx = self.tables.token_index(token.sym)?;
        Some((idx, NodeKind::from_token(token.sym)))
    }

    /// Token reuse outside the damaged region. `None` falls back to a
    /// full lex: dirty previous trees and pathological overlaps are not
    /// worth the bookkeeping.
    fn incremental_tokens(
        &self,
        prev: &SyntaxTree,
        new_text: &str,
        edits: &[Edit],
    ) -> Option<Vec<DocToken>> {
        if !prev.diagnostics().is_empty() || edits.is_empty() {
            return None;
        }
        let old_tokens = tokens_of(prev)?;

        let damage_start = edits.first().map(|e| e.from)?;
        let damage_old_end = edits.last().map(|e| e.to)?;
        let delta: i64 = edits
            .iter()
            .map(|e| e.insert.len() as i64 - (e.to - e.from) as i64)
            .sum();
        let damage_new_end = (damage_old_end as i64 + delta).max(0) as u32;

        // Reusable prefix, with a one-token margin: an edit can extend
        // the token just before it.
        let mut prefix: Vec<DocToken> = old_tokens
            .iter()
            .take_while(|t| t.span.end() < damage_start)
            .copied()
            .collect();
        prefix.pop();

        // Shifted suffix candidates, strictly after the damage.
        let suffix: Vec<DocToken> = old_tokens
            .iter()
            .filter(|t| t.span.offset >= damage_old_end)
            .map(|t| DocToken {
                sym: t.sym,
                span: Span::new((t.span.offset as i64 + delta).max(0) as u32, t.span.len),
                hidden: t.hidden,
            })
            .collect();

        let mut tokens = prefix;
        let mut pos = tokens.last().map_or(0, |t| t.span.end()) as usize;
        let mut suffix_idx = 0;

        while pos < new_text.len() {
            while suffix_idx < suffix.len()
                && (suffix[suffix_idx].span.offset as usize) < pos
            {
                suffix_idx += 1;
            }
            if pos as u32 > damage_new_end
                && suffix_idx < suffix.len()
                && suffix[suffix_idx].span.offset as usize == pos
            {
                tokens.extend_from_slice(&suffix[suffix_idx..]);
                return Some(tokens);
            }

            let (sym, len, hidden) = self.tokenizer.next_token(new_text, pos)?;
            tokens.push(DocToken {
                sym,
                span: Span::new(pos as u32, len as u32),
                hidden,
            });
            pos += len;
        }

        Some(tokens)
    }
}

/// Tree under construction: reductions assemble these bottom-up.
#[derive(Debug, Clone)]
struct Pending {
    kind: NodeKind,
    span: Span,
    children: Vec<Pending>,
    assignment: Option<AssignmentId>,
    leaf: bool,
    trivia: bool,
    graft: Option<AssignmentId>,
}

impl Pending {
    fn leaf(kind: NodeKind, span: Span, trivia: bool) -> Self {
        Self {
            kind,
            span,
            children: Vec::new(),
            assignment: None,
            leaf: true,
            trivia,
            graft: None,
        }
    }
}

/// One parse-stack slot: a state plus the forest it covers.
struct Slot {
    state: u32,
    items: Vec<Pending>,
}

struct Engine<'e> {
    parser: &'e LrParser,
    text: &'e str,
    tokens: Vec<DocToken>,
    pos: usize,
    /// Trivia and skipped-error leaves waiting for the next shift.
    leading: Vec<Pending>,
    stack: Vec<Slot>,
    diagnostics: Diagnostics,
    last_error_offset: Option<u32>,
    last_consumed_end: u32,
    accepted: bool,
}

impl<'e> Engine<'e> {
    fn tables(&self) -> &'e ParseTable {
        &self.parser.tables
    }

    fn run(&mut self) {
        // Reduces do not consume input; the fuel bounds degenerate
        // epsilon-reduce cycles that broken tables could produce.
        let mut fuel: u32 = 1_000_000;
        loop {
            if fuel == 0 {
                let offset = self.cursor_offset();
                self.error_at(Span::empty(offset), "internal: parser made no progress");
                return;
            }
            fuel -= 1;

            self.buffer_hidden();
            let token = self.tokens.get(self.pos).copied();
            let state = self.stack.last().expect("stack never empty").state;

            let classified = token
                .as_ref()
                .and_then(|t| self.parser.classify(state, self.text, t));

            let tok_idx = match (&token, classified) {
                (Some(_), Some((idx, _))) => idx,
                (Some(token), None) => {
                    // Token unknown to the tables in any guise.
                    let token = *token;
                    self.report_unexpected(Some(&token));
                    self.skip_token(token);
                    continue;
                }
                (None, _) => tolmach_compiler::tablegen::EOF,
            };

            match self.tables().action(state, tok_idx) {
                Some(Action::Shift(next)) => {
                    let token = token.expect("shift implies a token");
                    let kind = classified.expect("shift implies classification").1;
                    let mut items = std::mem::take(&mut self.leading);
                    items.push(Pending::leaf(kind, token.span, false));
                    self.stack.push(Slot { state: next, items });
                    self.pos += 1;
                    self.last_consumed_end = token.span.end();
                }
                Some(Action::Reduce(prod)) => self.reduce(prod),
                Some(Action::Accept) => {
                    self.accepted = true;
                    return;
                }
                None => {
                    self.report_unexpected(token.as_ref());
                    match token {
                        Some(token) => self.skip_token(token),
                        None => return,
                    }
                }
            }
        }
    }

    fn buffer_hidden(&mut self) {
        while let Some(token) = self.tokens.get(self.pos) {
            if !token.hidden {
                break;
            }
            self.leading
                .push(Pending::leaf(NodeKind::from_token(token.sym), token.span, true));
            self.pos += 1;
        }
    }

    fn skip_token(&mut self, token: DocToken) {
        self.leading
            .push(Pending::leaf(NodeKind::Error, token.span, false));
        self.pos += 1;
    }

    fn cursor_offset(&self) -> u32 {
        self.tokens
            .get(self.pos)
            .map(|t| t.span.offset)
            .unwrap_or(self.text.len() as u32)
    }

    fn reduce(&mut self, prod: u32) {
        let summary = &self.tables().productions[prod as usize];
        let arity = summary.rhs_len as usize;

        if arity >= self.stack.len() {
            let offset = self.cursor_offset();
            self.error_at(Span::empty(offset), "internal: parse stack underflow");
            self.pos = self.tokens.len();
            return;
        }

        let at = self.stack.len() - arity;
        let mut slots: Vec<Vec<Pending>> = self
            .stack
            .drain(at..)
            .map(|slot| slot.items)
            .collect();

        // Assignment identities attach by child position; a transparent
        // group at a bound position spreads the identity over its items.
        if let Some(bindings) = self.parser.fields.get(&prod) {
            for &(index, id) in bindings {
                if let Some(slot) = slots.get_mut(index as usize) {
                    for item in slot.iter_mut().filter(|i| !i.trivia) {
                        item.assignment = Some(id);
                    }
                }
            }
        }

        let children: Vec<Pending> = slots.into_iter().flatten().collect();

        let items = match summary.build {
            BuildKind::Node(type_name) => {
                let span = cover_spans(&children)
                    .unwrap_or_else(|| Span::empty(self.cursor_offset()));
                vec![Pending {
                    kind: NodeKind::Rule(type_name),
                    span,
                    children,
                    assignment: None,
                    leaf: false,
                    trivia: false,
                    graft: None,
                }]
            }
            BuildKind::Transparent => children,
            BuildKind::Action { type_name, graft } => {
                let mut marker = Pending::leaf(
                    NodeKind::Action(type_name),
                    Span::empty(self.cursor_offset()),
                    false,
                );
                marker.graft = graft.map(|(field, op)| AssignmentId::new(field, op));
                let mut items = children;
                items.push(marker);
                items
            }
        };

        let state = self.stack.last().expect("stack never empty").state;
        let lhs = summary.lhs;
        match self.tables().goto(state, lhs) {
            Some(next) => self.stack.push(Slot { state: next, items }),
            None => {
                // Broken tables; fail the parse rather than spin.
                let offset = self.cursor_offset();
                self.error_at(Span::empty(offset), "internal: missing goto entry");
                self.stack.push(Slot {
                    state,
                    items: Vec::new(),
                });
                self.pos = self.tokens.len();
            }
        }
    }

    fn finish(mut self) -> SyntaxTree {
        // Leftover input past the accept point.
        if self.accepted {
            self.buffer_hidden();
            if let Some(token) = self.tokens.get(self.pos).copied() {
                self.error_at(token.span, "expected end of input");
                while let Some(token) = self.tokens.get(self.pos).copied() {
                    if token.hidden {
                        self.leading.push(Pending::leaf(
                            NodeKind::from_token(token.sym),
                            token.span,
                            true,
                        ));
                    } else {
                        self.leading
                            .push(Pending::leaf(NodeKind::Error, token.span, false));
                    }
                    self.pos += 1;
                }
            }
        } else {
            let span = self
                .tokens
                .get(self.pos)
                .map(|t| t.span)
                .unwrap_or(Span::empty(self.text.len() as u32));
            self.error_at(span, "unexpected end of input");
        }

        let trailing = std::mem::take(&mut self.leading);
        let mut collected: Vec<Pending> = self
            .stack
            .drain(..)
            .flat_map(|slot| slot.items)
            .collect();
        collected.extend(trailing);

        // The accepted entry node becomes the root and absorbs leading
        // and trailing trivia so the root spans the whole document.
        let entry = self.tables().entry_rule;
        let root_kind = NodeKind::Rule(
            collected
                .iter()
                .find_map(|item| match item.kind {
                    NodeKind::Rule(sym) if !item.leaf => Some(sym),
                    _ => None,
                })
                .unwrap_or(entry),
        );

        let root = if self.accepted
            && collected.iter().filter(|i| !i.trivia).count() == 1
            && collected
                .iter()
                .all(|i| i.trivia || matches!(i.kind, NodeKind::Rule(_)))
        {
            // Clean accept with no surrounding debris: the rule node is
            // the root, trivia folds into it.
            let node = collected
                .iter()
                .position(|i| !i.trivia)
                .expect("one non-trivia item");
            let mut node = collected.remove(node);
            let split = node_split(&collected, node.span.offset);
            let before: Vec<Pending> = collected.drain(..split).collect();
            node.children.splice(0..0, before);
            node.children.extend(collected);
            node
        } else {
            Pending {
                kind: root_kind,
                span: Span::new(0, self.text.len() as u32),
                children: collected,
                assignment: None,
                leaf: false,
                trivia: false,
                graft: None,
            }
        };

        let mut builder = TreeBuilder::new();
        emit_pending_root(&mut builder, &root, self.text.len() as u32);
        builder.finish(
            Arc::from(self.text),
            self.diagnostics.into_vec(),
            self.parser.interner.clone(),
        )
    }

    fn report_unexpected(&mut self, token: Option<&DocToken>) {
        let previous = if self.last_consumed_end > 0 {
            let end = self.last_consumed_end as usize;
            let start = self.text[..end]
                .rfind(|c: char| c.is_whitespace())
                .map(|i| i + 1)
                .unwrap_or(0);
            format!(" (after `{}`)", &self.text[start..end])
        } else {
            String::new()
        };

        match token {
            Some(token) => {
                let text = &self.text[token.span.as_range()];
                let span = token.span;
                let message = format!("unexpected token `{text}`{previous}");
                self.error_at(span, message);
            }
            None => {
                let span = Span::empty(self.text.len() as u32);
                self.error_at(span, format!("unexpected end of input{previous}"));
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

/// Items that precede `offset` belong before the root node's own children.
fn node_split(items: &[Pending], offset: u32) -> usize {
    items
        .iter()
        .position(|i| i.span.offset >= offset)
        .unwrap_or(items.len())
}

fn cover_spans(children: &[Pending]) -> Option<Span> {
    let mut spans = children.iter().map(|c| c.span);
    let first = spans.next()?;
    Some(spans.fold(first, Span::cover))
}

fn emit_pending_root(builder: &mut TreeBuilder, root: &Pending, text_len: u32) {
    let id = builder.start_node(root.kind, 0);
    builder.set_assignment(id, root.assignment);
    for child in &root.children {
        emit_pending(builder, child);
    }
    builder.finish_node(text_len);
}

fn emit_pending(builder: &mut TreeBuilder, node: &Pending) {
    if node.leaf {
        if let NodeKind::Action(type_name) = node.kind {
            builder.action_marker(type_name, node.span.offset, node.graft);
        } else {
            builder.leaf(node.kind, node.span, node.trivia, node.assignment);
        }
        return;
    }
    let id = builder.start_node(node.kind, node.span.offset);
    builder.set_assignment(id, node.assignment);
    for child in &node.children {
        emit_pending(builder, child);
    }
    builder.finish_node(node.span.end());
}

fn apply_edits(text: &str, edits: &[Edit]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize;
    for edit in edits {
        out.push_str(&text[cursor..edit.from as usize]);
        out.push_str(&edit.insert);
        cursor = edit.to as usize;
    }
    out.push_str(&text[cursor..]);
    out
}

/// Leaf tokens of a clean tree, trivia included; `None` when the tree
/// contains error or synthesized leaves, or identifier-like keyword
/// leaves. Those keywords were promoted contextually during the previous
/// parse, and the context on the far side of an edit may differ — the
/// full lexer re-derives them from scratch.
fn tokens_of(tree: &SyntaxTree) -> Option<Vec<DocToken>> {
    let mut out = Vec::new();
    collect(tree, tree.root(), &mut out)?;
    return Some(out);

    fn collect(
        tree: &SyntaxTree,
        node: crate::tree::SyntaxNode<'_>,
        out: &mut Vec<DocToken>,
    ) -> Option<()> {
        if node.is_leaf() {
            match node.kind() {
                NodeKind::Action(_) => return Some(()),
                NodeKind::Error => return None,
                NodeKind::Keyword(_)
                    if tolmach_core::tokens::is_identifier_like(node.full_text()) =>
                {
                    return None;
                }
                kind => {
                    out.push(DocToken {
                        sym: kind.as_token()?,
                        span: node.span(),
                        hidden: node.is_trivia(),
                    });
                    return Some(());
                }
            }
        }
        for child in node.children() {
            collect(tree, child, out)?;
        }
        Some(())
    }
}
