//! SLR(1) parse-table construction over the lowered productions.
//!
//! LR(0) item sets with FOLLOW-based reductions. Shift/reduce conflicts are
//! resolved by declared precedence and associativity; conflicts between
//! rules that share a conflict-set marker are silenced in favor of shifting
//! (or the earlier production on reduce/reduce). Anything else is reported
//! as a grammar-compile diagnostic and defaulted, never panicked over.

#[cfg(test)]
mod tablegen_tests;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use tolmach_core::diagnostics::{Diagnostics, Severity, Stage};
use tolmach_core::grammar::{Assoc, Grammar};
use tolmach_core::tokens::TokenSym;
use tolmach_core::{Interner, Span, Symbol};

use crate::translate::{BuildKind, LSym, LoweredGrammar, NtId};

/// Token index into [`ParseTable::tokens`]; index 0 is end-of-input.
pub type TokIdx = u32;

pub const EOF: TokIdx = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Shift(u32),
    Reduce(u32),
    Accept,
}

/// A terminal class carried inside the compiled tables so the LR runtime
/// is self-contained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalSpec {
    pub name: Symbol,
    pub regex: String,
    pub hidden: bool,
}

/// A keyword promotion carried inside the compiled tables. `specialize`
/// replaces the base token at the lexer; `extend` overlays it and is
/// applied contextually by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionSpec {
    pub literal: Symbol,
    pub class: Symbol,
    pub base: Symbol,
    pub specialize: bool,
}

/// Summary of a production as the runtime needs it: enough to pop the
/// stack and build a node, nothing more.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProdSummary {
    pub lhs: NtId,
    pub rhs_len: u32,
    pub build: BuildKind,
}

/// The compiled parse-table artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseTable {
    /// Per state: sorted `(token index, action)` pairs.
    pub actions: Vec<Vec<(TokIdx, Action)>>,
    /// Per state: sorted `(nonterminal, next state)` pairs.
    pub gotos: Vec<Vec<(NtId, u32)>>,
    pub productions: Vec<ProdSummary>,
    /// Token index space; index 0 is end-of-input (a placeholder entry).
    pub tokens: Vec<TokenSym>,
    pub start_state: u32,
    pub entry_rule: Symbol,
    pub terminals: Vec<TerminalSpec>,
    pub promotions: Vec<PromotionSpec>,
    /// Name table covering every symbol in the artifact.
    pub interner: Interner,
}

impl ParseTable {
    pub fn action(&self, state: u32, token: TokIdx) -> Option<Action> {
        let row = self.actions.get(state as usize)?;
        row.binary_search_by_key(&token, |(t, _)| *t)
            .ok()
            .map(|idx| row[idx].1)
    }

    pub fn goto(&self, state: u32, nt: NtId) -> Option<u32> {
        let row = self.gotos.get(state as usize)?;
        row.binary_search_by_key(&nt, |(n, _)| *n)
            .ok()
            .map(|idx| row[idx].1)
    }

    pub fn token_index(&self, token: TokenSym) -> Option<TokIdx> {
        self.tokens
            .iter()
            .position(|t| *t == token)
            .map(|idx| idx as TokIdx)
    }

    /// Tokens with any action in a state, end-of-input excluded.
    pub fn expected_tokens(&self, state: u32) -> Vec<TokenSym> {
        self.actions
            .get(state as usize)
            .map(|row| {
                row.iter()
                    .filter(|(tok, _)| *tok != EOF)
                    .map(|(tok, _)| self.tokens[*tok as usize])
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Build SLR(1) tables. Unresolved conflicts surface as diagnostics.
pub fn build_tables(
    grammar: &Grammar,
    lowered: &LoweredGrammar,
    diagnostics: &mut Diagnostics,
) -> ParseTable {
    Builder::new(grammar, lowered).run(diagnostics)
}

type Item = (u32, u32); // (production, dot)
type State = BTreeSet<Item>;

struct Builder<'a> {
    grammar: &'a Grammar,
    lowered: &'a LoweredGrammar,
    /// Productions including the augmented start at the end.
    rhs: Vec<Vec<LSym>>,
    lhs: Vec<NtId>,
    augmented: u32,
    tokens: Vec<TokenSym>,
    token_index: HashMap<TokenSym, TokIdx>,
    nt_count: usize,
}

impl<'a> Builder<'a> {
    fn new(grammar: &'a Grammar, lowered: &'a LoweredGrammar) -> Self {
        let nt_count = lowered.nonterminals.len() + 1;
        let augmented_nt = lowered.nonterminals.len() as NtId;

        let mut rhs: Vec<Vec<LSym>> =
            lowered.productions.iter().map(|p| p.rhs.clone()).collect();
        let mut lhs: Vec<NtId> = lowered.productions.iter().map(|p| p.lhs).collect();
        let augmented = rhs.len() as u32;
        rhs.push(vec![LSym::Nt(lowered.start)]);
        lhs.push(augmented_nt);

        // Token index space: EOF first, then appearance order.
        let mut tokens = vec![TokenSym::Terminal(Symbol::from_raw(u32::MAX))];
        let mut token_index = HashMap::new();
        for production in &rhs {
            for sym in production {
                if let LSym::Tok(tok) = sym
                    && !token_index.contains_key(tok)
                {
                    token_index.insert(*tok, tokens.len() as TokIdx);
                    tokens.push(*tok);
                }
            }
        }

        Self {
            grammar,
            lowered,
            rhs,
            lhs,
            augmented,
            tokens,
            token_index,
            nt_count,
        }
    }

    fn run(mut self, diagnostics: &mut Diagnostics) -> ParseTable {
        let (nullable, first) = self.first_sets();
        let follow = self.follow_sets(&nullable, &first);
        let (states, shifts, nt_gotos) = self.build_automaton();

        let mut actions: Vec<BTreeMap<TokIdx, Action>> = vec![BTreeMap::new(); states.len()];

        for (state_idx, transitions) in shifts.iter().enumerate() {
            for (&tok, &target) in transitions {
                self.insert_action(
                    &mut actions[state_idx],
                    tok,
                    Action::Shift(target),
                    state_idx,
                    diagnostics,
                );
            }
        }

        for (state_idx, state) in states.iter().enumerate() {
            for &(prod, dot) in state {
                if (dot as usize) < self.rhs[prod as usize].len() {
                    continue;
                }
                if prod == self.augmented {
                    actions[state_idx].insert(EOF, Action::Accept);
                    continue;
                }
                let lhs = self.lhs[prod as usize];
                for &tok in &follow[lhs as usize] {
                    self.insert_action(
                        &mut actions[state_idx],
                        tok,
                        Action::Reduce(prod),
                        state_idx,
                        diagnostics,
                    );
                }
            }
        }

        let productions = self
            .lowered
            .productions
            .iter()
            .map(|p| ProdSummary {
                lhs: p.lhs,
                rhs_len: p.rhs.len() as u32,
                build: p.build,
            })
            .collect();

        let terminals = self
            .grammar
            .terminals
            .iter()
            .map(|t| TerminalSpec {
                name: t.name,
                regex: t.regex.clone(),
                hidden: t.hidden,
            })
            .collect();

        let promotions = self
            .grammar
            .promotions
            .iter()
            .flat_map(|p| {
                let specialize =
                    p.mode == tolmach_core::grammar::PromotionMode::Specialize;
                let base = p.base;
                p.mappings
                    .iter()
                    .map(move |&(literal, class)| PromotionSpec {
                        literal,
                        class,
                        base,
                        specialize,
                    })
            })
            .collect();

        ParseTable {
            actions: actions
                .into_iter()
                .map(|row| row.into_iter().collect())
                .collect(),
            gotos: nt_gotos
                .into_iter()
                .map(|row| row.into_iter().collect())
                .collect(),
            productions,
            tokens: self.tokens,
            start_state: 0,
            entry_rule: self
                .grammar
                .entry_rule()
                .map(|r| r.name)
                .unwrap_or(Symbol::from_raw(0)),
            terminals,
            promotions,
            interner: self.grammar.interner.clone(),
        }
    }

    /// Nullability and FIRST over the lowered productions.
    fn first_sets(&self) -> (Vec<bool>, Vec<HashSet<TokIdx>>) {
        let mut nullable = vec![false; self.nt_count];
        let mut first: Vec<HashSet<TokIdx>> = vec![HashSet::new(); self.nt_count];

        loop {
            let mut changed = false;
            for (prod, rhs) in self.rhs.iter().enumerate() {
                let lhs = self.lhs[prod] as usize;
                let mut all_nullable = true;
                for sym in rhs {
                    match sym {
                        LSym::Tok(tok) => {
                            let idx = self.token_index[tok];
                            changed |= first[lhs].insert(idx);
                            all_nullable = false;
                        }
                        LSym::Nt(nt) => {
                            let nt = *nt as usize;
                            let added: Vec<_> = first[nt].iter().copied().collect();
                            for tok in added {
                                changed |= first[lhs].insert(tok);
                            }
                            if !nullable[nt] {
                                all_nullable = false;
                            }
                        }
                    }
                    if !all_nullable {
                        break;
                    }
                }
                if all_nullable && !nullable[lhs] {
                    nullable[lhs] = true;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        (nullable, first)
    }

    fn follow_sets(
        &self,
        nullable: &[bool],
        first: &[HashSet<TokIdx>],
    ) -> Vec<HashSet<TokIdx>> {
        let mut follow: Vec<HashSet<TokIdx>> = vec![HashSet::new(); self.nt_count];
        follow[self.lhs[self.augmented as usize] as usize].insert(EOF);
        follow[self.lowered.start as usize].insert(EOF);

        loop {
            let mut changed = false;
            for (prod, rhs) in self.rhs.iter().enumerate() {
                let lhs = self.lhs[prod] as usize;
                for (pos, sym) in rhs.iter().enumerate() {
                    let LSym::Nt(nt) = sym else { continue };
                    let nt = *nt as usize;

                    let mut tail_nullable = true;
                    for tail_sym in &rhs[pos + 1..] {
                        match tail_sym {
                            LSym::Tok(tok) => {
                                changed |= follow[nt].insert(self.token_index[tok]);
                                tail_nullable = false;
                            }
                            LSym::Nt(tail_nt) => {
                                let tail_nt = *tail_nt as usize;
                                let added: Vec<_> = first[tail_nt].iter().copied().collect();
                                for tok in added {
                                    changed |= follow[nt].insert(tok);
                                }
                                if !nullable[tail_nt] {
                                    tail_nullable = false;
                                }
                            }
                        }
                        if !tail_nullable {
                            break;
                        }
                    }

                    if tail_nullable {
                        let inherited: Vec<_> = follow[lhs].iter().copied().collect();
                        for tok in inherited {
                            changed |= follow[nt].insert(tok);
                        }
                    }
                }
            }
            if !changed {
                break;
            }
        }

        follow
    }

    /// LR(0) canonical collection plus shift and goto transitions.
    #[allow(clippy::type_complexity)]
    fn build_automaton(
        &self,
    ) -> (
        Vec<State>,
        Vec<BTreeMap<TokIdx, u32>>,
        Vec<BTreeMap<NtId, u32>>,
    ) {
        let start = self.closure([(self.augmented, 0)].into_iter().collect());
        let mut states = vec![start];
        let mut index: HashMap<State, u32> = HashMap::new();
        index.insert(states[0].clone(), 0);

        let mut shifts: Vec<BTreeMap<TokIdx, u32>> = vec![BTreeMap::new()];
        let mut gotos: Vec<BTreeMap<NtId, u32>> = vec![BTreeMap::new()];

        let mut work = 0;
        while work < states.len() {
            let state = states[work].clone();

            // Group kernel items by the symbol after the dot.
            let mut by_symbol: BTreeMap<LSymKey, State> = BTreeMap::new();
            for &(prod, dot) in &state {
                let rhs = &self.rhs[prod as usize];
                if (dot as usize) < rhs.len() {
                    by_symbol
                        .entry(LSymKey::from(rhs[dot as usize]))
                        .or_default()
                        .insert((prod, dot + 1));
                }
            }

            for (sym, kernel) in by_symbol {
                let next = self.closure(kernel);
                let target = match index.get(&next) {
                    Some(&idx) => idx,
                    None => {
                        let idx = states.len() as u32;
                        index.insert(next.clone(), idx);
                        states.push(next);
                        shifts.push(BTreeMap::new());
                        gotos.push(BTreeMap::new());
                        idx
                    }
                };
                match sym {
                    LSymKey::Tok(tok) => {
                        shifts[work].insert(self.token_index[&tok], target);
                    }
                    LSymKey::Nt(nt) => {
                        gotos[work].insert(nt, target);
                    }
                }
            }

            work += 1;
        }

        (states, shifts, gotos)
    }

    fn closure(&self, mut items: State) -> State {
        let mut queue: Vec<Item> = items.iter().copied().collect();
        while let Some((prod, dot)) = queue.pop() {
            let rhs = &self.rhs[prod as usize];
            let Some(LSym::Nt(nt)) = rhs.get(dot as usize) else {
                continue;
            };
            for (candidate, candidate_lhs) in self.lhs.iter().enumerate() {
                if *candidate_lhs == *nt {
                    let item = (candidate as u32, 0);
                    if items.insert(item) {
                        queue.push(item);
                    }
                }
            }
        }
        items
    }

    fn insert_action(
        &self,
        row: &mut BTreeMap<TokIdx, Action>,
        tok: TokIdx,
        action: Action,
        state: usize,
        diagnostics: &mut Diagnostics,
    ) {
        let Some(&existing) = row.get(&tok) else {
            row.insert(tok, action);
            return;
        };
        if existing == action {
            return;
        }

        let resolved = self.resolve_conflict(existing, action, tok, state, diagnostics);
        match resolved {
            Some(chosen) => {
                row.insert(tok, chosen);
            }
            None => {
                // Nonassociative collision: the entry becomes an error.
                row.remove(&tok);
            }
        }
    }

    /// Yacc-style resolution. Returns the surviving action, or `None` for
    /// a nonassociative collision.
    fn resolve_conflict(
        &self,
        existing: Action,
        incoming: Action,
        tok: TokIdx,
        state: usize,
        diagnostics: &mut Diagnostics,
    ) -> Option<Action> {
        use Action::*;

        let (shift, reduce) = match (existing, incoming) {
            (Shift(s), Reduce(r)) | (Reduce(r), Shift(s)) => (Some(s), r),
            (Reduce(a), Reduce(b)) => {
                let (first, second) = if a < b { (a, b) } else { (b, a) };
                if !self.share_marker(first, second) {
                    self.report_conflict(state, tok, "reduce/reduce", diagnostics);
                }
                return Some(Reduce(first));
            }
            (Accept, other) | (other, Accept) => {
                // Accept only ever lands on EOF; prefer it.
                let _ = other;
                return Some(Accept);
            }
            (a, _) => return Some(a),
        };
        let shift = shift.expect("shift/reduce pair");

        let token_level = match self.tokens[tok as usize] {
            TokenSym::Keyword(literal) => self.lowered.token_level(literal),
            TokenSym::Terminal(_) => None,
        };
        let prod_prec = self
            .lowered
            .productions
            .get(reduce as usize)
            .and_then(|p| p.prec);

        if let (Some(token_level), Some(prec)) = (token_level, prod_prec) {
            // Smaller level index binds tighter.
            return if prec.level < token_level {
                Some(Reduce(reduce))
            } else if prec.level > token_level {
                Some(Shift(shift))
            } else {
                match prec.assoc {
                    Assoc::Left => Some(Reduce(reduce)),
                    Assoc::Right => Some(Shift(shift)),
                    Assoc::NonAssoc => None,
                }
            };
        }

        if self.marked(reduce) {
            // Conflict-set markers silence the report; shifting matches
            // the longest-match default.
            return Some(Shift(shift));
        }

        self.report_conflict(state, tok, "shift/reduce", diagnostics);
        Some(Shift(shift))
    }

    fn marked(&self, prod: u32) -> bool {
        self.lowered
            .productions
            .get(prod as usize)
            .is_some_and(|p| !p.markers.is_empty())
    }

    fn share_marker(&self, a: u32, b: u32) -> bool {
        let (Some(pa), Some(pb)) = (
            self.lowered.productions.get(a as usize),
            self.lowered.productions.get(b as usize),
        ) else {
            return false;
        };
        pa.markers.iter().any(|m| pb.markers.contains(m))
    }

    fn report_conflict(
        &self,
        state: usize,
        tok: TokIdx,
        kind: &str,
        diagnostics: &mut Diagnostics,
    ) {
        let token_name = match self.tokens.get(tok as usize) {
            Some(TokenSym::Keyword(sym)) => format!("'{}'", self.grammar.resolve(*sym)),
            Some(TokenSym::Terminal(sym)) if tok != EOF => {
                self.grammar.resolve(*sym).to_string()
            }
            _ => "end of input".to_string(),
        };
        diagnostics
            .report(Severity::Error, Stage::Validation, Span::empty(0))
            .message(format!(
                "unresolved {kind} conflict on {token_name} (state {state}); \
                 declare precedence or a conflict set"
            ))
            .emit();
    }
}

/// `LSym` with a total order for deterministic state numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum LSymKey {
    Tok(TokenSym),
    Nt(NtId),
}

impl From<LSym> for LSymKey {
    fn from(sym: LSym) -> Self {
        match sym {
            LSym::Tok(tok) => LSymKey::Tok(tok),
            LSym::Nt(nt) => LSymKey::Nt(nt),
        }
    }
}
