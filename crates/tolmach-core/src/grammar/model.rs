//! Grammar model type definitions.

use serde::{Deserialize, Serialize};

use crate::interner::{Interner, Symbol};
use crate::span::Span;

/// A complete grammar document: rules, terminals, and extensions.
///
/// Definition order is preserved everywhere it is observable (rule lists,
/// precedence levels, promotion mappings).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Grammar {
    pub name: String,
    pub rules: Vec<RuleDef>,
    pub terminals: Vec<TerminalDef>,
    pub precedences: Vec<PrecedenceBlock>,
    pub conflicts: Vec<ConflictSet>,
    pub infixes: Vec<InfixRule>,
    pub promotions: Vec<KeywordPromotion>,
    pub external_tokens: Vec<ExternalTokens>,
    /// All declarations are kept so validation can flag duplicates; only
    /// the first one is meaningful.
    pub external_contexts: Vec<ExternalContext>,
    pub local_tokens: Vec<LocalTokens>,
    /// Name table for every symbol in the model.
    pub interner: Interner,
}

impl Grammar {
    /// The unique entry rule. Validation guarantees exactly one exists in a
    /// well-formed grammar; `None` only on broken input.
    pub fn entry_rule(&self) -> Option<&RuleDef> {
        self.rules.iter().find(|r| r.entry)
    }

    pub fn rule(&self, name: Symbol) -> Option<&RuleDef> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub fn terminal(&self, name: Symbol) -> Option<&TerminalDef> {
        self.terminals.iter().find(|t| t.name == name)
    }

    /// The single meaningful external context, if any.
    pub fn external_context(&self) -> Option<&ExternalContext> {
        self.external_contexts.first()
    }

    pub fn resolve(&self, sym: Symbol) -> &str {
        self.interner.resolve(sym)
    }
}

/// A parser rule: `entry? Name (returns Type)? : body ;` plus annotations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDef {
    pub name: Symbol,
    pub entry: bool,
    /// Explicit `returns` type; the AST tag defaults to the rule name.
    pub type_name: Option<Symbol>,
    pub body: Expr,
    /// `@dynamicPrecedence(N)` annotation.
    pub dynamic_precedence: Option<i32>,
    /// `@precMarker(Level)` annotation; must name a declared level.
    pub prec_marker: Option<Symbol>,
    pub span: Span,
}

impl RuleDef {
    /// The AST type tag this rule produces.
    pub fn ast_type(&self) -> Symbol {
        self.type_name.unwrap_or(self.name)
    }
}

/// A terminal: `hidden? terminal NAME : /regex/ ;`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalDef {
    pub name: Symbol,
    pub regex: String,
    /// Hidden terminals (whitespace, comments) become trivia.
    pub hidden: bool,
    pub span: Span,
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    /// `=` — single-valued field, later wins.
    Single,
    /// `+=` — ordered list field.
    Append,
    /// `?=` — boolean field, set `true` when matched.
    Bool,
}

impl AssignOp {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignOp::Single => "=",
            AssignOp::Append => "+=",
            AssignOp::Bool => "?=",
        }
    }
}

/// The assignment identity carried by a syntax-tree child: which grammar
/// feature produced it. Cross-reference assignments additionally record the
/// target rule so the AST builder can emit a reference descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentId {
    pub field: Symbol,
    pub op: AssignOp,
    pub reference: Option<Symbol>,
}

impl AssignmentId {
    pub fn new(field: Symbol, op: AssignOp) -> Self {
        Self {
            field,
            op,
            reference: None,
        }
    }

    pub fn reference(field: Symbol, op: AssignOp, target: Symbol) -> Self {
        Self {
            field,
            op,
            reference: Some(target),
        }
    }
}

/// Cardinality suffixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinality {
    /// `?`
    Optional,
    /// `*`
    ZeroOrMore,
    /// `+`
    OneOrMore,
}

/// Body expressions: a closed algebraic family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    /// Items matched in order.
    Sequence(Vec<Expr>),
    /// Ordered alternatives; the predictive backend selects by lookahead.
    Alternative(Vec<Expr>),
    /// `inner ?`, `inner *`, `inner +`.
    Repeat {
        inner: Box<Expr>,
        cardinality: Cardinality,
    },
    /// A keyword literal; the symbol holds the literal text.
    Keyword(Symbol),
    /// Reference to a parser rule.
    RuleRef(Symbol),
    /// Reference to a terminal.
    TerminalRef(Symbol),
    /// `name = expr`, `name += expr`, `name ?= expr`.
    Assignment {
        field: Symbol,
        op: AssignOp,
        inner: Box<Expr>,
    },
    /// Type-coercing reconstruction: `{Type}` retags the value under
    /// construction; `{Type.field}` additionally grafts the prior value
    /// into `field`.
    Action {
        type_name: Symbol,
        graft: Option<(Symbol, AssignOp)>,
    },
    /// `[Target]` or `[Target : TokenOrRule]`; produces a reference
    /// descriptor, not a parsed subtree. The text is consumed with `token`
    /// (defaulting to the grammar's ID terminal).
    CrossRef {
        target: Symbol,
        token: Option<Symbol>,
    },
}

impl Expr {
    /// Empty sequence, used as the neutral body.
    pub fn empty() -> Expr {
        Expr::Sequence(Vec::new())
    }

    /// The cross-reference target when this expression is a
    /// cross-reference, possibly under cardinality. Assignments consult
    /// this so `refs+=[Target]*` keeps its reference identity.
    pub fn cross_ref_target(&self) -> Option<Symbol> {
        match self {
            Expr::CrossRef { target, .. } => Some(*target),
            Expr::Repeat { inner, .. } => inner.cross_ref_target(),
            _ => None,
        }
    }
}

/// Associativity of a precedence level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Assoc {
    #[default]
    Left,
    Right,
    NonAssoc,
}

impl Assoc {
    pub fn as_str(self) -> &'static str {
        match self {
            Assoc::Left => "left",
            Assoc::Right => "right",
            Assoc::NonAssoc => "nonassoc",
        }
    }
}

/// One named level inside a `precedence { … }` block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecLevel {
    pub name: Symbol,
    pub assoc: Assoc,
    pub span: Span,
}

/// An ordered list of named precedence levels, strongest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecedenceBlock {
    pub levels: Vec<PrecLevel>,
    pub span: Span,
}

/// An unordered set of rule names whose productions tolerate each other's
/// LR conflicts; every pair inside the set gets a shared marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictSet {
    pub rules: Vec<Symbol>,
    pub span: Span,
}

/// `infix Name on Base : 'op' | 'op' > 'op' ;`
///
/// Groups are written tightest-first; `>` steps down one binding strength.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfixRule {
    pub name: Symbol,
    pub base: Symbol,
    /// Operator literals per level, declaration order.
    pub groups: Vec<Vec<Symbol>>,
    pub span: Span,
}

/// `specialize ID { "lit" => TokenClass; }` or `extend ID { … }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordPromotion {
    pub mode: PromotionMode,
    /// The identifier terminal the literals are promoted out of.
    pub base: Symbol,
    /// `(literal, promoted token class)` in declaration order.
    pub mappings: Vec<(Symbol, Symbol)>,
    pub span: Span,
}

/// Whether a promotion replaces the base token or overlays it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromotionMode {
    Specialize,
    Extend,
}

/// `external tokens from "path" { A, B }` — token names produced by a
/// host-provided tokenizer. The group's runtime name is derived from the
/// path's basename.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalTokens {
    pub path: String,
    pub names: Vec<Symbol>,
    pub span: Span,
}

/// `external context name from "path";` — at most one per grammar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalContext {
    pub name: Symbol,
    pub path: String,
    pub span: Span,
}

/// One terminal inside a `local tokens in Rule { … }` group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalToken {
    pub name: Symbol,
    pub regex: String,
    pub span: Span,
}

/// A terminal group scoped to a single rule, with an `@else` fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalTokens {
    pub rule: Symbol,
    pub tokens: Vec<LocalToken>,
    pub else_name: Symbol,
    pub span: Span,
}
