//! The grammar model: a typed, serializable representation of grammar
//! documents.
//!
//! The compiler front-end builds this model from grammar source; the
//! top-down backend interprets it directly; the LR translator lowers it
//! into generator artifacts. Names are interned in the grammar's own
//! [`Interner`](crate::Interner) so both backends agree on symbol identity.

mod model;
mod visit;

#[cfg(test)]
mod model_tests;

pub use model::{
    AssignOp, AssignmentId, Assoc, Cardinality, ConflictSet, Expr, ExternalContext,
    ExternalTokens, Grammar, InfixRule, KeywordPromotion, LocalToken, LocalTokens, PrecLevel,
    PrecedenceBlock, PromotionMode, RuleDef, TerminalDef,
};
pub use visit::{ExprVisitor, walk_expr};
