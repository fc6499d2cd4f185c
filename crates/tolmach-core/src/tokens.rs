//! Token classes derived from a grammar.
//!
//! One class per declared terminal, plus one keyword class per distinct
//! keyword literal encountered while walking rules reachable from the
//! entry. Keyword classes come first in the returned sequence, then
//! terminals with their hidden flag.
//!
//! A keyword whose literal matches the identifier shape is a *category of
//! the ID token*: the lexer prefers ID and the parser accepts the keyword
//! where its literal is listed.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::grammar::{Expr, Grammar, walk_expr};
use crate::interner::Symbol;

/// The identifier shape keyword literals are tested against.
pub const ID_REGEX: &str = "[A-Za-z_][A-Za-z0-9_]*";

/// Whether a literal matches [`ID_REGEX`].
pub fn is_identifier_like(literal: &str) -> bool {
    let mut chars = literal.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A document-level token kind: a keyword literal or a terminal class.
/// Keyword literals and terminal names live in different namespaces, so a
/// bare `Symbol` would conflate `'model'` with a terminal named `model`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TokenSym {
    Keyword(Symbol),
    Terminal(Symbol),
}

impl TokenSym {
    pub fn symbol(self) -> Symbol {
        match self {
            TokenSym::Keyword(s) | TokenSym::Terminal(s) => s,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenClassKind {
    /// A keyword literal; `id_category` marks identifier-like keywords.
    Keyword { id_category: bool },
    /// A declared terminal; hidden classes become trivia.
    Terminal { hidden: bool },
}

/// One token class. For keywords the name symbol holds the literal text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClass {
    pub name: Symbol,
    pub kind: TokenClassKind,
}

impl TokenClass {
    pub fn is_keyword(&self) -> bool {
        matches!(self.kind, TokenClassKind::Keyword { .. })
    }

    pub fn is_hidden(&self) -> bool {
        matches!(self.kind, TokenClassKind::Terminal { hidden: true })
    }
}

/// Derive the token-class sequence for a grammar.
pub fn build_token_classes(grammar: &Grammar) -> Vec<TokenClass> {
    let mut keywords: Vec<Symbol> = Vec::new();
    let mut seen: HashSet<Symbol> = HashSet::new();

    let mut visited: HashSet<Symbol> = HashSet::new();
    if let Some(entry) = grammar.entry_rule() {
        collect_from_rule(grammar, entry.name, &mut visited, &mut seen, &mut keywords);
    }

    let mut classes: Vec<TokenClass> = keywords
        .into_iter()
        .map(|literal| TokenClass {
            name: literal,
            kind: TokenClassKind::Keyword {
                id_category: is_identifier_like(grammar.resolve(literal)),
            },
        })
        .collect();

    classes.extend(grammar.terminals.iter().map(|t| TokenClass {
        name: t.name,
        kind: TokenClassKind::Terminal { hidden: t.hidden },
    }));

    classes
}

fn collect_from_rule(
    grammar: &Grammar,
    rule: Symbol,
    visited: &mut HashSet<Symbol>,
    seen: &mut HashSet<Symbol>,
    keywords: &mut Vec<Symbol>,
) {
    if !visited.insert(rule) {
        return;
    }

    // Infix declarations act as rules: their operators are keywords and
    // their base rule is reachable through them.
    if let Some(infix) = grammar.infixes.iter().find(|i| i.name == rule) {
        for group in &infix.groups {
            for &op in group {
                if seen.insert(op) {
                    keywords.push(op);
                }
            }
        }
        collect_from_rule(grammar, infix.base, visited, seen, keywords);
        return;
    }

    let Some(def) = grammar.rule(rule) else {
        return;
    };

    let mut referenced: Vec<Symbol> = Vec::new();
    walk_expr(&def.body, &mut |expr: &Expr| match expr {
        Expr::Keyword(lit) => {
            if seen.insert(*lit) {
                keywords.push(*lit);
            }
        }
        Expr::RuleRef(name) => referenced.push(*name),
        _ => {}
    });

    for name in referenced {
        collect_from_rule(grammar, name, visited, seen, keywords);
    }
}
