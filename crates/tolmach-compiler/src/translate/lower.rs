//! Lowering of the grammar model into LR-compatible productions.
//!
//! Assignments are erased from the productions and recorded per child
//! position; cardinality and nested alternatives desugar into auxiliary
//! nonterminals (left-recursive for repetition, which LR prefers); actions
//! become epsilon productions that reduce to zero-width markers; infix
//! declarations expand into one binary production per operator group.

use serde::{Deserialize, Serialize};

use tolmach_core::Symbol;
use tolmach_core::grammar::{
    AssignOp, AssignmentId, Assoc, Cardinality, Expr, Grammar, InfixRule,
};
use tolmach_core::tokens::TokenSym;

use crate::analysis::cross_ref_token;

pub type NtId = u32;

/// A grammar symbol on the right-hand side of a production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LSym {
    Nt(NtId),
    Tok(TokenSym),
}

/// What a reduction builds in the syntax tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildKind {
    /// A rule node with the given kind.
    Node(Symbol),
    /// Children splice into the surrounding node.
    Transparent,
    /// A zero-width action marker.
    Action {
        type_name: Symbol,
        graft: Option<(Symbol, AssignOp)>,
    },
}

/// Assignment identity for one right-hand-side position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldBinding {
    pub index: u32,
    pub id: AssignmentId,
}

/// A precedence reference: index into the global level list (lower index
/// binds tighter) plus associativity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrecRef {
    pub level: usize,
    pub assoc: Assoc,
}

#[derive(Debug, Clone)]
pub struct Production {
    pub lhs: NtId,
    pub rhs: Vec<LSym>,
    pub build: BuildKind,
    pub fields: Vec<FieldBinding>,
    pub prec: Option<PrecRef>,
    pub dynamic_prec: i32,
    /// Conflict markers attached to this production (`conflict_A_B`).
    pub markers: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Nonterminal {
    pub name: String,
    /// The rule (or infix) this nonterminal came from; `None` for
    /// generated auxiliaries.
    pub origin: Option<Symbol>,
}

/// One entry in the global precedence order, strongest first.
#[derive(Debug, Clone)]
pub struct PrecedenceLevel {
    pub name: String,
    pub assoc: Assoc,
}

#[derive(Debug, Clone)]
pub struct LoweredGrammar {
    pub nonterminals: Vec<Nonterminal>,
    pub productions: Vec<Production>,
    pub start: NtId,
    /// Declared blocks concatenated, then infix levels, strongest first
    /// within each family.
    pub levels: Vec<PrecedenceLevel>,
    /// Keyword literal → precedence level index (from infix groups).
    pub token_levels: Vec<(Symbol, usize)>,
}

impl LoweredGrammar {
    pub fn nonterminal(&self, id: NtId) -> &Nonterminal {
        &self.nonterminals[id as usize]
    }

    pub fn productions_of(&self, nt: NtId) -> impl Iterator<Item = (usize, &Production)> {
        self.productions
            .iter()
            .enumerate()
            .filter(move |(_, p)| p.lhs == nt)
    }

    pub fn token_level(&self, literal: Symbol) -> Option<usize> {
        self.token_levels
            .iter()
            .find(|(sym, _)| *sym == literal)
            .map(|(_, level)| *level)
    }
}

pub fn lower_grammar(grammar: &Grammar) -> LoweredGrammar {
    let mut lowering = Lowering {
        grammar,
        nonterminals: Vec::new(),
        productions: Vec::new(),
        levels: Vec::new(),
        token_levels: Vec::new(),
        aux_counter: 0,
    };
    lowering.run()
}

struct Lowering<'g> {
    grammar: &'g Grammar,
    nonterminals: Vec<Nonterminal>,
    productions: Vec<Production>,
    levels: Vec<PrecedenceLevel>,
    token_levels: Vec<(Symbol, usize)>,
    aux_counter: u32,
}

impl<'g> Lowering<'g> {
    fn run(mut self) -> LoweredGrammar {
        self.collect_levels();

        // Allocate nonterminals for every rule and infix first so
        // references resolve in one pass.
        for rule in &self.grammar.rules {
            self.nonterminals.push(Nonterminal {
                name: self.grammar.resolve(rule.name).to_string(),
                origin: Some(rule.name),
            });
        }
        for infix in &self.grammar.infixes {
            self.nonterminals.push(Nonterminal {
                name: self.grammar.resolve(infix.name).to_string(),
                origin: Some(infix.name),
            });
        }

        let markers = self.conflict_markers();

        for (idx, rule) in self.grammar.rules.iter().enumerate() {
            let lhs = idx as NtId;
            let prec = rule.prec_marker.and_then(|m| self.level_ref(m));
            let rule_markers = markers_for(&markers, self.grammar, rule.name);

            for branch in top_level_branches(&rule.body) {
                let mut rhs = Vec::new();
                let mut fields = Vec::new();
                self.lower_into(branch, &mut rhs, &mut fields);
                self.productions.push(Production {
                    lhs,
                    rhs,
                    // Nodes carry the rule's AST type so tree consumers
                    // never need the grammar model.
                    build: BuildKind::Node(rule.ast_type()),
                    fields,
                    prec,
                    dynamic_prec: rule.dynamic_precedence.unwrap_or(0),
                    markers: rule_markers.clone(),
                });
            }
        }

        let rule_count = self.grammar.rules.len();
        let infixes: Vec<InfixRule> = self.grammar.infixes.clone();
        for (offset, infix) in infixes.iter().enumerate() {
            self.lower_infix(infix, (rule_count + offset) as NtId);
        }

        let start = self
            .grammar
            .entry_rule()
            .and_then(|entry| self.nt_of(entry.name))
            .unwrap_or(0);

        LoweredGrammar {
            nonterminals: self.nonterminals,
            productions: self.productions,
            start,
            levels: self.levels,
            token_levels: self.token_levels,
        }
    }

    /// Declared blocks concatenated, then `prec_<N>_<i>` per infix group.
    fn collect_levels(&mut self) {
        for block in &self.grammar.precedences {
            for level in &block.levels {
                self.levels.push(PrecedenceLevel {
                    name: self.grammar.resolve(level.name).to_string(),
                    assoc: level.assoc,
                });
            }
        }
        for infix in &self.grammar.infixes {
            for (group_idx, group) in infix.groups.iter().enumerate() {
                let level_idx = self.levels.len();
                self.levels.push(PrecedenceLevel {
                    name: format!(
                        "prec_{}_{}",
                        self.grammar.resolve(infix.name),
                        group_idx
                    ),
                    assoc: Assoc::Left,
                });
                for &op in group {
                    self.token_levels.push((op, level_idx));
                }
            }
        }
    }

    fn level_ref(&self, name: Symbol) -> Option<PrecRef> {
        let wanted = self.grammar.resolve(name);
        self.levels
            .iter()
            .position(|l| l.name == wanted)
            .map(|level| PrecRef {
                level,
                assoc: self.levels[level].assoc,
            })
    }

    /// `conflict_<A>_<B>` for every pair inside every declared set.
    fn conflict_markers(&self) -> Vec<(Symbol, Symbol, String)> {
        let mut markers = Vec::new();
        for set in &self.grammar.conflicts {
            for i in 0..set.rules.len() {
                for j in (i + 1)..set.rules.len() {
                    let a = set.rules[i];
                    let b = set.rules[j];
                    markers.push((
                        a,
                        b,
                        format!(
                            "conflict_{}_{}",
                            self.grammar.resolve(a),
                            self.grammar.resolve(b)
                        ),
                    ));
                }
            }
        }
        markers
    }

    fn nt_of(&self, name: Symbol) -> Option<NtId> {
        self.nonterminals
            .iter()
            .position(|nt| nt.origin == Some(name))
            .map(|idx| idx as NtId)
    }

    fn fresh_aux(&mut self, base: &str, suffix: &str) -> NtId {
        let id = self.nonterminals.len() as NtId;
        self.aux_counter += 1;
        self.nonterminals.push(Nonterminal {
            name: format!("{}__{}{}", base, suffix, self.aux_counter),
            origin: None,
        });
        id
    }

    /// Lower one expression into an rhs under construction.
    fn lower_into(&mut self, expr: &Expr, rhs: &mut Vec<LSym>, fields: &mut Vec<FieldBinding>) {
        match expr {
            Expr::Sequence(items) => {
                for item in items {
                    self.lower_into(item, rhs, fields);
                }
            }
            Expr::Alternative(_) | Expr::Repeat { .. } => {
                let sym = self.lower_single(expr);
                rhs.push(sym);
            }
            Expr::Keyword(literal) => rhs.push(LSym::Tok(TokenSym::Keyword(*literal))),
            Expr::TerminalRef(name) => rhs.push(LSym::Tok(TokenSym::Terminal(*name))),
            Expr::RuleRef(name) => match self.nt_of(*name) {
                Some(nt) => rhs.push(LSym::Nt(nt)),
                // Undefined references are validation errors; keep the
                // position stable with an impossible terminal.
                None => rhs.push(LSym::Tok(TokenSym::Terminal(*name))),
            },
            Expr::CrossRef { target: _, token } => {
                if let Some(terminal) = cross_ref_token(self.grammar, *token) {
                    rhs.push(LSym::Tok(TokenSym::Terminal(terminal)));
                }
            }
            Expr::Assignment { field, op, inner } => {
                let index = rhs.len() as u32;
                let reference = inner.cross_ref_target();
                let sym = self.lower_single(inner);
                rhs.push(sym);
                let id = match reference {
                    Some(target) => AssignmentId::reference(*field, *op, target),
                    None => AssignmentId::new(*field, *op),
                };
                fields.push(FieldBinding { index, id });
            }
            Expr::Action { type_name, graft } => {
                let nt = self.fresh_aux(self.grammar.resolve(*type_name), "action");
                self.productions.push(Production {
                    lhs: nt,
                    rhs: Vec::new(),
                    build: BuildKind::Action {
                        type_name: *type_name,
                        graft: *graft,
                    },
                    fields: Vec::new(),
                    prec: None,
                    dynamic_prec: 0,
                    markers: Vec::new(),
                });
                rhs.push(LSym::Nt(nt));
            }
        }
    }

    /// Lower an expression to exactly one grammar symbol, creating a
    /// transparent auxiliary when it spans more than one.
    fn lower_single(&mut self, expr: &Expr) -> LSym {
        match expr {
            Expr::Keyword(literal) => LSym::Tok(TokenSym::Keyword(*literal)),
            Expr::TerminalRef(name) => LSym::Tok(TokenSym::Terminal(*name)),
            Expr::RuleRef(name) => match self.nt_of(*name) {
                Some(nt) => LSym::Nt(nt),
                None => LSym::Tok(TokenSym::Terminal(*name)),
            },
            Expr::CrossRef { target: _, token } => {
                match cross_ref_token(self.grammar, *token) {
                    Some(terminal) => LSym::Tok(TokenSym::Terminal(terminal)),
                    None => LSym::Tok(TokenSym::Terminal(Symbol::from_raw(u32::MAX))),
                }
            }
            Expr::Alternative(branches) => {
                let nt = self.fresh_aux("alt", "b");
                for branch in branches {
                    let mut rhs = Vec::new();
                    let mut fields = Vec::new();
                    self.lower_into(branch, &mut rhs, &mut fields);
                    self.productions.push(Production {
                        lhs: nt,
                        rhs,
                        build: BuildKind::Transparent,
                        fields,
                        prec: None,
                        dynamic_prec: 0,
                        markers: Vec::new(),
                    });
                }
                LSym::Nt(nt)
            }
            Expr::Repeat { inner, cardinality } => {
                let nt = self.fresh_aux("rep", "r");
                let mut inner_rhs = Vec::new();
                let mut inner_fields = Vec::new();
                self.lower_into(inner, &mut inner_rhs, &mut inner_fields);

                match cardinality {
                    Cardinality::Optional => {
                        self.push_transparent(nt, Vec::new(), Vec::new());
                        self.push_transparent(nt, inner_rhs, inner_fields);
                    }
                    Cardinality::ZeroOrMore => {
                        self.push_transparent(nt, Vec::new(), Vec::new());
                        let mut rec = vec![LSym::Nt(nt)];
                        rec.extend(inner_rhs.iter().copied());
                        let rec_fields = shift_fields(&inner_fields, 1);
                        self.push_transparent(nt, rec, rec_fields);
                    }
                    Cardinality::OneOrMore => {
                        self.push_transparent(nt, inner_rhs.clone(), inner_fields.clone());
                        let mut rec = vec![LSym::Nt(nt)];
                        rec.extend(inner_rhs.iter().copied());
                        let rec_fields = shift_fields(&inner_fields, 1);
                        self.push_transparent(nt, rec, rec_fields);
                    }
                }
                LSym::Nt(nt)
            }
            Expr::Sequence(_) | Expr::Assignment { .. } | Expr::Action { .. } => {
                let nt = self.fresh_aux("grp", "g");
                let mut rhs = Vec::new();
                let mut fields = Vec::new();
                self.lower_into(expr, &mut rhs, &mut fields);
                self.push_transparent(nt, rhs, fields);
                LSym::Nt(nt)
            }
        }
    }

    fn push_transparent(&mut self, lhs: NtId, rhs: Vec<LSym>, fields: Vec<FieldBinding>) {
        self.productions.push(Production {
            lhs,
            rhs,
            build: BuildKind::Transparent,
            fields,
            prec: None,
            dynamic_prec: 0,
            markers: Vec::new(),
        });
    }

    /// `infix N on T` expands to `N → T` plus one `N → N op N` production
    /// per operator, carrying its group's precedence level. The binary
    /// productions build `N` nodes with `left`/`operator`/`right` fields.
    fn lower_infix(&mut self, infix: &InfixRule, lhs: NtId) {
        let base_sym = match self.nt_of(infix.base) {
            Some(nt) => LSym::Nt(nt),
            None => LSym::Tok(TokenSym::Terminal(infix.base)),
        };
        self.push_transparent(lhs, vec![base_sym], Vec::new());

        let base_level = self
            .levels
            .iter()
            .position(|l| l.name == format!("prec_{}_0", self.grammar.resolve(infix.name)))
            .unwrap_or(0);

        let left = self.intern_hint("left");
        let operator = self.intern_hint("operator");
        let right = self.intern_hint("right");

        for (group_idx, group) in infix.groups.iter().enumerate() {
            let level = base_level + group_idx;
            for &op in group {
                let fields = vec![
                    FieldBinding {
                        index: 0,
                        id: AssignmentId::new(left, AssignOp::Single),
                    },
                    FieldBinding {
                        index: 1,
                        id: AssignmentId::new(operator, AssignOp::Single),
                    },
                    FieldBinding {
                        index: 2,
                        id: AssignmentId::new(right, AssignOp::Single),
                    },
                ];
                self.productions.push(Production {
                    lhs,
                    rhs: vec![
                        LSym::Nt(lhs),
                        LSym::Tok(TokenSym::Keyword(op)),
                        LSym::Nt(lhs),
                    ],
                    build: BuildKind::Node(infix.name),
                    fields,
                    prec: Some(PrecRef {
                        level,
                        assoc: Assoc::Left,
                    }),
                    dynamic_prec: 0,
                    markers: Vec::new(),
                });
            }
        }
    }

    fn intern_hint(&self, name: &str) -> Symbol {
        // The infix field names are fixed; they were interned when the
        // model was built, or fall back to a reserved symbol.
        self.grammar
            .interner
            .get(name)
            .unwrap_or_else(|| Symbol::from_raw(u32::MAX - fixed_field_offset(name)))
    }
}

fn fixed_field_offset(name: &str) -> u32 {
    match name {
        "left" => 1,
        "operator" => 2,
        _ => 3,
    }
}

fn shift_fields(fields: &[FieldBinding], by: u32) -> Vec<FieldBinding> {
    fields
        .iter()
        .map(|f| FieldBinding {
            index: f.index + by,
            id: f.id,
        })
        .collect()
}

fn markers_for(
    markers: &[(Symbol, Symbol, String)],
    _grammar: &Grammar,
    rule: Symbol,
) -> Vec<String> {
    markers
        .iter()
        .filter(|(a, b, _)| *a == rule || *b == rule)
        .map(|(_, _, name)| name.clone())
        .collect()
}

/// Top-level alternative branches of a rule body.
fn top_level_branches(body: &Expr) -> Vec<&Expr> {
    match body {
        Expr::Alternative(branches) => branches.iter().collect(),
        other => vec![other],
    }
}
