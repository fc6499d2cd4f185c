//! Depth-first walk over body expressions.
//!
//! Shared by the token-class builder (keyword collection), validation
//! (cross-ref targets), and the FIRST-set analysis.

use super::model::Expr;

/// Visitor over every expression in a body, pre-order.
pub trait ExprVisitor {
    fn visit(&mut self, expr: &Expr);
}

impl<F: FnMut(&Expr)> ExprVisitor for F {
    fn visit(&mut self, expr: &Expr) {
        self(expr);
    }
}

/// Walk `expr` and all nested expressions, calling the visitor pre-order.
pub fn walk_expr(expr: &Expr, visitor: &mut dyn ExprVisitor) {
    visitor.visit(expr);
    match expr {
        Expr::Sequence(items) | Expr::Alternative(items) => {
            for item in items {
                walk_expr(item, visitor);
            }
        }
        Expr::Repeat { inner, .. } | Expr::Assignment { inner, .. } => {
            walk_expr(inner, visitor);
        }
        Expr::Keyword(_)
        | Expr::RuleRef(_)
        | Expr::TerminalRef(_)
        | Expr::Action { .. }
        | Expr::CrossRef { .. } => {}
    }
}
