//! FIRST-set computation and lookahead analysis.
//!
//! The predictive backend selects alternatives by peeking up to
//! `max_lookahead` tokens, so alternative ambiguity is a grammar-compile
//! finding, never a parse-time one. This module computes:
//!
//! - FIRST(1) + nullability per rule (fixpoint), consumed by the
//!   interpreter's branch selection;
//! - bounded FIRST-k sequence sets, used to flag alternatives that stay
//!   ambiguous at the lookahead horizon;
//! - left-recursion findings (the predictive backend cannot descend them).

use indexmap::{IndexMap, IndexSet};

use tolmach_core::diagnostics::{Diagnostics, Severity, Stage};
use tolmach_core::grammar::{Cardinality, Expr, Grammar};
use tolmach_core::tokens::TokenSym;
use tolmach_core::Symbol;

/// Default lookahead depth of the predictive backend.
pub const DEFAULT_MAX_LOOKAHEAD: usize = 3;

/// Bound on enumerated lookahead sequences per expression.
const MAX_SEQUENCES: usize = 256;

#[derive(Debug, Clone, Default)]
pub struct FirstInfo {
    pub tokens: IndexSet<TokenSym>,
    pub nullable: bool,
}

/// Precomputed lookahead data for a grammar.
#[derive(Debug, Clone)]
pub struct GrammarAnalysis {
    pub max_lookahead: usize,
    first: IndexMap<Symbol, FirstInfo>,
}

/// The terminal consumed by a cross-reference: the explicit token if given,
/// otherwise the grammar's `ID` terminal.
pub fn cross_ref_token(grammar: &Grammar, token: Option<Symbol>) -> Option<Symbol> {
    token.or_else(|| grammar.interner.get("ID"))
}

impl GrammarAnalysis {
    pub fn compute(
        grammar: &Grammar,
        max_lookahead: usize,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let mut analysis = Self {
            max_lookahead,
            first: IndexMap::new(),
        };

        for rule in &grammar.rules {
            analysis.first.insert(rule.name, FirstInfo::default());
        }
        for infix in &grammar.infixes {
            analysis.first.insert(infix.name, FirstInfo::default());
        }

        // Fixpoint: rule FIRST sets grow monotonically until stable.
        loop {
            let mut changed = false;
            for rule in &grammar.rules {
                let (tokens, nullable) = analysis.first_of_expr(grammar, &rule.body);
                let info = &mut analysis.first[&rule.name];
                let before = (info.tokens.len(), info.nullable);
                info.tokens.extend(tokens);
                info.nullable |= nullable;
                changed |= before != (info.tokens.len(), info.nullable);
            }
            for infix in &grammar.infixes {
                // An infix family starts like its base operand.
                let base = analysis
                    .first
                    .get(&infix.base)
                    .cloned()
                    .unwrap_or_default();
                let info = &mut analysis.first[&infix.name];
                let before = (info.tokens.len(), info.nullable);
                info.tokens.extend(base.tokens);
                info.nullable |= base.nullable;
                changed |= before != (info.tokens.len(), info.nullable);
            }
            if !changed {
                break;
            }
        }

        analysis.report_left_recursion(grammar, diagnostics);
        analysis.report_ambiguous_alternatives(grammar, diagnostics);
        analysis
    }

    pub fn first_of_rule(&self, rule: Symbol) -> Option<&FirstInfo> {
        self.first.get(&rule)
    }

    /// FIRST(1) + nullability of an expression under the current table.
    pub fn first_of_expr(&self, grammar: &Grammar, expr: &Expr) -> (IndexSet<TokenSym>, bool) {
        match expr {
            Expr::Sequence(items) => {
                let mut tokens = IndexSet::new();
                for item in items {
                    let (item_tokens, item_nullable) = self.first_of_expr(grammar, item);
                    tokens.extend(item_tokens);
                    if !item_nullable {
                        return (tokens, false);
                    }
                }
                (tokens, true)
            }
            Expr::Alternative(branches) => {
                let mut tokens = IndexSet::new();
                let mut nullable = false;
                for branch in branches {
                    let (branch_tokens, branch_nullable) = self.first_of_expr(grammar, branch);
                    tokens.extend(branch_tokens);
                    nullable |= branch_nullable;
                }
                (tokens, nullable)
            }
            Expr::Repeat { inner, cardinality } => {
                let (tokens, inner_nullable) = self.first_of_expr(grammar, inner);
                let nullable = match cardinality {
                    Cardinality::OneOrMore => inner_nullable,
                    _ => true,
                };
                (tokens, nullable)
            }
            Expr::Keyword(literal) => {
                (std::iter::once(TokenSym::Keyword(*literal)).collect(), false)
            }
            Expr::TerminalRef(name) => (std::iter::once(TokenSym::Terminal(*name)).collect(), false),
            Expr::RuleRef(name) => match self.first.get(name) {
                Some(info) => (info.tokens.clone(), info.nullable),
                None => (IndexSet::new(), false),
            },
            Expr::Assignment { inner, .. } => self.first_of_expr(grammar, inner),
            Expr::Action { .. } => (IndexSet::new(), true),
            Expr::CrossRef { token, .. } => match cross_ref_token(grammar, *token) {
                Some(terminal) => (std::iter::once(TokenSym::Terminal(terminal)).collect(), false),
                None => (IndexSet::new(), false),
            },
        }
    }

    /// Rules reachable at the leftmost position of a rule, nullable-aware.
    fn report_left_recursion(&self, grammar: &Grammar, diagnostics: &mut Diagnostics) {
        for rule in &grammar.rules {
            let mut active = IndexSet::new();
            if self.left_reaches(grammar, &rule.body, rule.name, &mut active) {
                diagnostics
                    .report(Severity::Warning, Stage::Validation, rule.span)
                    .message(format!(
                        "rule `{}` is left-recursive; the predictive backend cannot parse it",
                        grammar.resolve(rule.name)
                    ))
                    .emit();
            }
        }
    }

    fn left_reaches(
        &self,
        grammar: &Grammar,
        expr: &Expr,
        target: Symbol,
        active: &mut IndexSet<Symbol>,
    ) -> bool {
        match expr {
            Expr::Sequence(items) => {
                for item in items {
                    if self.left_reaches(grammar, item, target, active) {
                        return true;
                    }
                    let (_, nullable) = self.first_of_expr(grammar, item);
                    if !nullable {
                        return false;
                    }
                }
                false
            }
            Expr::Alternative(branches) => branches
                .iter()
                .any(|b| self.left_reaches(grammar, b, target, active)),
            Expr::Repeat { inner, .. } | Expr::Assignment { inner, .. } => {
                self.left_reaches(grammar, inner, target, active)
            }
            Expr::RuleRef(name) => {
                if *name == target {
                    return true;
                }
                if !active.insert(*name) {
                    return false;
                }
                let result = grammar
                    .rule(*name)
                    .is_some_and(|r| self.left_reaches(grammar, &r.body, target, active));
                active.swap_remove(name);
                result
            }
            _ => false,
        }
    }

    /// Flag alternatives whose branches share a complete lookahead window.
    fn report_ambiguous_alternatives(&self, grammar: &Grammar, diagnostics: &mut Diagnostics) {
        for rule in &grammar.rules {
            let mut alternatives = Vec::new();
            collect_alternatives(&rule.body, &mut alternatives);

            for branches in alternatives {
                let sequence_sets: Vec<IndexSet<Vec<TokenSym>>> = branches
                    .iter()
                    .map(|b| {
                        let mut active = IndexSet::new();
                        self.sequences(grammar, b, self.max_lookahead, &mut active)
                    })
                    .collect();

                for i in 0..sequence_sets.len() {
                    for j in (i + 1)..sequence_sets.len() {
                        if sequence_sets[i]
                            .iter()
                            .any(|seq| sequence_sets[j].contains(seq))
                        {
                            diagnostics
                                .report(Severity::Warning, Stage::Validation, rule.span)
                                .message(format!(
                                    "alternatives {} and {} of rule `{}` are ambiguous within \
                                     {} tokens of lookahead; the first alternative wins",
                                    i + 1,
                                    j + 1,
                                    grammar.resolve(rule.name),
                                    self.max_lookahead
                                ))
                                .emit();
                        }
                    }
                }
            }
        }
    }

    /// Bounded FIRST-k: token sequences of length <= k an expression can
    /// start with. Sequences shorter than k mean the expression can be
    /// consumed completely within the window. Cycles return no sequences.
    fn sequences(
        &self,
        grammar: &Grammar,
        expr: &Expr,
        k: usize,
        active: &mut IndexSet<Symbol>,
    ) -> IndexSet<Vec<TokenSym>> {
        if k == 0 {
            return std::iter::once(Vec::new()).collect();
        }
        match expr {
            Expr::Sequence(items) => {
                let mut current: IndexSet<Vec<TokenSym>> = std::iter::once(Vec::new()).collect();
                for item in items {
                    current = self.concat(grammar, current, item, k, active);
                    if current.iter().all(|s| s.len() == k) {
                        break;
                    }
                }
                current
            }
            Expr::Alternative(branches) => {
                let mut out = IndexSet::new();
                for branch in branches {
                    out.extend(self.sequences(grammar, branch, k, active));
                    if out.len() > MAX_SEQUENCES {
                        break;
                    }
                }
                out
            }
            Expr::Repeat { inner, cardinality } => {
                let mut out: IndexSet<Vec<TokenSym>> = IndexSet::new();
                if *cardinality != Cardinality::OneOrMore {
                    out.insert(Vec::new());
                }
                // Unroll up to k repetitions; deeper unrolls cannot add new
                // windows of length <= k.
                let mut current: IndexSet<Vec<TokenSym>> = std::iter::once(Vec::new()).collect();
                for _ in 0..k {
                    current = self.concat(grammar, current, inner, k, active);
                    let before = out.len();
                    out.extend(current.iter().cloned());
                    if out.len() == before || out.len() > MAX_SEQUENCES {
                        break;
                    }
                }
                out
            }
            Expr::Keyword(literal) => std::iter::once(vec![TokenSym::Keyword(*literal)]).collect(),
            Expr::TerminalRef(name) => std::iter::once(vec![TokenSym::Terminal(*name)]).collect(),
            Expr::CrossRef { token, .. } => match cross_ref_token(grammar, *token) {
                Some(terminal) => std::iter::once(vec![TokenSym::Terminal(terminal)]).collect(),
                None => IndexSet::new(),
            },
            Expr::Assignment { inner, .. } => self.sequences(grammar, inner, k, active),
            Expr::Action { .. } => std::iter::once(Vec::new()).collect(),
            Expr::RuleRef(name) => {
                if !active.insert(*name) {
                    return IndexSet::new();
                }
                let out = match grammar.rule(*name) {
                    Some(rule) => self.sequences(grammar, &rule.body, k, active),
                    None => IndexSet::new(),
                };
                active.swap_remove(name);
                out
            }
        }
    }

    fn concat(
        &self,
        grammar: &Grammar,
        prefixes: IndexSet<Vec<TokenSym>>,
        next: &Expr,
        k: usize,
        active: &mut IndexSet<Symbol>,
    ) -> IndexSet<Vec<TokenSym>> {
        let mut out = IndexSet::new();
        for prefix in prefixes {
            if prefix.len() >= k {
                out.insert(prefix);
                continue;
            }
            let remaining = k - prefix.len();
            for suffix in self.sequences(grammar, next, remaining, active) {
                let mut seq = prefix.clone();
                seq.extend(suffix);
                out.insert(seq);
                if out.len() > MAX_SEQUENCES {
                    return out;
                }
            }
        }
        out
    }
}

fn collect_alternatives<'e>(expr: &'e Expr, out: &mut Vec<&'e [Expr]>) {
    match expr {
        Expr::Alternative(branches) => {
            out.push(branches);
            for branch in branches {
                collect_alternatives(branch, out);
            }
        }
        Expr::Sequence(items) => {
            for item in items {
                collect_alternatives(item, out);
            }
        }
        Expr::Repeat { inner, .. } | Expr::Assignment { inner, .. } => {
            collect_alternatives(inner, out);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::ast;
    use crate::test_utils::parse_cst;

    fn analyzed(source: &str) -> (Grammar, GrammarAnalysis, Diagnostics) {
        let (root, parse_diags) = parse_cst(source);
        assert!(parse_diags.is_empty(), "unexpected parse errors");
        let mut diagnostics = Diagnostics::new();
        let root = ast::Root::cast(root).unwrap();
        let grammar = crate::model::build_grammar(&root, &mut diagnostics);
        let analysis = GrammarAnalysis::compute(&grammar, DEFAULT_MAX_LOOKAHEAD, &mut diagnostics);
        (grammar, analysis, diagnostics)
    }

    #[test]
    fn first_set_of_simple_rule() {
        let (grammar, analysis, diags) =
            analyzed("entry Model: 'model' name=ID; terminal ID: /[a-z]+/;");
        assert!(diags.is_empty());

        let entry = grammar.entry_rule().unwrap();
        let info = analysis.first_of_rule(entry.name).unwrap();
        assert!(!info.nullable);
        let kw = grammar.interner.get("model").unwrap();
        assert!(info.tokens.contains(&TokenSym::Keyword(kw)));
    }

    #[test]
    fn nullable_rules_propagate() {
        let (grammar, analysis, _) =
            analyzed("entry A: B 'end'; B: 'b'?; terminal ID: /[a-z]+/;");
        let b = grammar.interner.get("B").unwrap();
        assert!(analysis.first_of_rule(b).unwrap().nullable);

        let a = grammar.interner.get("A").unwrap();
        let info = analysis.first_of_rule(a).unwrap();
        // FIRST(A) includes both 'b' and 'end' because B is nullable.
        assert_eq!(info.tokens.len(), 2);
        assert!(!info.nullable);
    }

    #[test]
    fn left_recursion_is_flagged() {
        let (_, _, diags) = analyzed("entry E: E '+' | 'x';");
        assert!(
            diags
                .iter()
                .any(|d| d.message.contains("left-recursive"))
        );
    }

    #[test]
    fn ambiguous_alternatives_at_horizon_are_flagged() {
        // Both branches start with the same three keywords.
        let (_, _, diags) = analyzed("entry A: 'a' 'b' 'c' 'x' | 'a' 'b' 'c' 'y';");
        assert!(diags.iter().any(|d| d.message.contains("ambiguous")));
    }

    #[test]
    fn distinguishable_alternatives_are_quiet() {
        let (_, _, diags) = analyzed("entry A: 'a' x=ID | 'b' x=ID; terminal ID: /[a-z]+/;");
        assert!(diags.is_empty());
    }

    #[test]
    fn cross_ref_defaults_to_id_terminal() {
        let (grammar, analysis, _) = analyzed(
            "entry G: person=[Person]; Person: 'p' name=ID; terminal ID: /[a-z]+/;",
        );
        let g = grammar.interner.get("G").unwrap();
        let id = grammar.interner.get("ID").unwrap();
        let info = analysis.first_of_rule(g).unwrap();
        assert!(info.tokens.contains(&TokenSym::Terminal(id)));
    }
}
