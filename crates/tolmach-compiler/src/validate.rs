//! Grammar validation.
//!
//! All findings are diagnostics, never exceptions; generation proceeds only
//! when no error-severity diagnostic exists. Runs over the grammar model,
//! after construction and before translation.

use std::collections::{HashMap, HashSet};

use tolmach_core::Span;
use tolmach_core::diagnostics::{Diagnostics, Severity, Stage};
use tolmach_core::grammar::{Expr, Grammar, walk_expr};

/// Run every validation pass, appending findings to `diagnostics`.
pub fn validate_grammar(grammar: &Grammar, diagnostics: &mut Diagnostics) {
    check_entry_rule(grammar, diagnostics);
    check_references(grammar, diagnostics);
    check_precedence_levels(grammar, diagnostics);
    check_prec_markers(grammar, diagnostics);
    check_promotions(grammar, diagnostics);
    check_external_contexts(grammar, diagnostics);
    check_conflict_sets(grammar, diagnostics);
    check_terminal_regexes(grammar, diagnostics);
}

fn error(diagnostics: &mut Diagnostics, span: Span, message: impl Into<String>) {
    diagnostics
        .report(Severity::Error, Stage::Validation, span)
        .message(message)
        .emit();
}

/// Exactly one entry rule per grammar.
fn check_entry_rule(grammar: &Grammar, diagnostics: &mut Diagnostics) {
    let mut entries = grammar.rules.iter().filter(|r| r.entry);

    if entries.next().is_none() {
        let span = grammar.rules.first().map_or(Span::empty(0), |r| r.span);
        error(diagnostics, span, "grammar has no entry rule");
        return;
    }

    for extra in entries {
        error(
            diagnostics,
            extra.span,
            format!(
                "duplicate entry rule `{}`; a grammar has exactly one",
                grammar.resolve(extra.name)
            ),
        );
    }
}

/// Rule references resolve; cross-reference targets name existing rules.
fn check_references(grammar: &Grammar, diagnostics: &mut Diagnostics) {
    let rule_names: HashSet<_> = grammar
        .rules
        .iter()
        .map(|r| r.name)
        .chain(grammar.infixes.iter().map(|i| i.name))
        .collect();

    for rule in &grammar.rules {
        let mut findings: Vec<(Span, String)> = Vec::new();
        walk_expr(&rule.body, &mut |expr: &Expr| match expr {
            Expr::RuleRef(name) if !rule_names.contains(name) => {
                findings.push((
                    rule.span,
                    format!("reference to undefined rule `{}`", grammar.resolve(*name)),
                ));
            }
            Expr::CrossRef { target, .. } if !rule_names.contains(target) => {
                findings.push((
                    rule.span,
                    format!(
                        "cross-reference to undefined rule `{}`",
                        grammar.resolve(*target)
                    ),
                ));
            }
            _ => {}
        });
        for (span, message) in findings {
            error(diagnostics, span, message);
        }
    }
}

/// Level names are unique within their block.
fn check_precedence_levels(grammar: &Grammar, diagnostics: &mut Diagnostics) {
    for block in &grammar.precedences {
        let mut seen = HashSet::new();
        for level in &block.levels {
            if !seen.insert(level.name) {
                error(
                    diagnostics,
                    level.span,
                    format!(
                        "duplicate precedence level `{}`",
                        grammar.resolve(level.name)
                    ),
                );
            }
        }
    }
}

/// `@precMarker(L)` must name a declared level.
fn check_prec_markers(grammar: &Grammar, diagnostics: &mut Diagnostics) {
    let declared: HashSet<_> = grammar
        .precedences
        .iter()
        .flat_map(|b| b.levels.iter().map(|l| l.name))
        .collect();

    for rule in &grammar.rules {
        if let Some(marker) = rule.prec_marker
            && !declared.contains(&marker)
        {
            error(
                diagnostics,
                rule.span,
                format!(
                    "`@precMarker({})` does not name a declared precedence level",
                    grammar.resolve(marker)
                ),
            );
        }
    }
}

/// A literal appears in at most one specialize/extend mapping per base
/// class; duplicates are warnings and the first mapping wins.
fn check_promotions(grammar: &Grammar, diagnostics: &mut Diagnostics) {
    let mut seen: HashMap<(tolmach_core::Symbol, tolmach_core::Symbol), Span> = HashMap::new();

    for promotion in &grammar.promotions {
        for &(literal, _) in &promotion.mappings {
            let key = (promotion.base, literal);
            if let Some(&first) = seen.get(&key) {
                diagnostics
                    .report(Severity::Warning, Stage::Validation, promotion.span)
                    .message(format!(
                        "duplicate promotion of `{}`; the first mapping wins",
                        grammar.resolve(literal)
                    ))
                    .related_to("first mapped here", first)
                    .emit();
            } else {
                seen.insert(key, promotion.span);
            }
        }
    }
}

/// At most one external context declaration per grammar.
fn check_external_contexts(grammar: &Grammar, diagnostics: &mut Diagnostics) {
    for extra in grammar.external_contexts.iter().skip(1) {
        error(
            diagnostics,
            extra.span,
            "multiple external context declarations; a grammar has at most one",
        );
    }
}

/// Conflict sets name existing rules.
fn check_conflict_sets(grammar: &Grammar, diagnostics: &mut Diagnostics) {
    let rule_names: HashSet<_> = grammar.rules.iter().map(|r| r.name).collect();

    for set in &grammar.conflicts {
        for name in &set.rules {
            if !rule_names.contains(name) {
                error(
                    diagnostics,
                    set.span,
                    format!(
                        "conflict set names undefined rule `{}`",
                        grammar.resolve(*name)
                    ),
                );
            }
        }
    }
}

/// Terminal bodies use the common regex subset; look-around and
/// backreferences are rejected with the engine's own message.
fn check_terminal_regexes(grammar: &Grammar, diagnostics: &mut Diagnostics) {
    let locals = grammar
        .local_tokens
        .iter()
        .flat_map(|g| g.tokens.iter().map(|t| (t.name, t.regex.as_str(), t.span)));
    let terminals = grammar
        .terminals
        .iter()
        .map(|t| (t.name, t.regex.as_str(), t.span));

    for (name, regex, span) in terminals.chain(locals) {
        if let Err(err) = regex_syntax::Parser::new().parse(regex) {
            error(
                diagnostics,
                span,
                format!(
                    "terminal `{}` has an unsupported body: {}",
                    grammar.resolve(name),
                    err
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::ast;
    use crate::test_utils::parse_cst;

    fn validated(source: &str) -> Diagnostics {
        let (root, parse_diags) = parse_cst(source);
        assert!(parse_diags.is_empty(), "unexpected parse errors");
        let mut diagnostics = Diagnostics::new();
        let root = ast::Root::cast(root).unwrap();
        let grammar = crate::model::build_grammar(&root, &mut diagnostics);
        validate_grammar(&grammar, &mut diagnostics);
        diagnostics
    }

    #[test]
    fn clean_grammar_passes() {
        let diags = validated(
            "entry Model: 'model' name=ID; terminal ID: /[_a-zA-Z][a-zA-Z0-9_]*/;",
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn missing_entry_rule() {
        let diags = validated("Model: 'model'; terminal ID: /[a-z]+/;");
        assert!(diags.has_errors());
    }

    #[test]
    fn duplicate_entry_rule() {
        let diags = validated("entry A: 'a'; entry B: 'b';");
        assert!(diags.has_errors());
    }

    #[test]
    fn undefined_rule_reference() {
        let diags = validated("entry A: x=Missing;");
        assert!(diags.has_errors());
    }

    #[test]
    fn undefined_cross_reference_target() {
        let diags = validated("entry A: x=[Ghost]; terminal ID: /[a-z]+/;");
        assert!(diags.has_errors());
    }

    #[test]
    fn duplicate_precedence_level_is_an_error() {
        let diags = validated("precedence { Add left; Add right; } entry A: 'a';");
        assert!(diags.has_errors());
    }

    #[test]
    fn unknown_prec_marker_is_an_error() {
        let diags = validated("@precMarker(Ghost) entry A: 'a';");
        assert!(diags.has_errors());
    }

    #[test]
    fn duplicate_promotion_is_a_warning() {
        let diags = validated(
            "entry A: t=ID; terminal ID: /[a-z]+/; \
             specialize ID { \"if\" => IfKeyword; } \
             extend ID { \"if\" => OtherKeyword; }",
        );
        assert!(!diags.has_errors());
        assert_eq!(diags.warning_count(), 1);
    }

    #[test]
    fn second_external_context_is_an_error() {
        let diags = validated(
            "entry A: 'a'; \
             external context one from \"./ctx-one\"; \
             external context two from \"./ctx-two\";",
        );
        assert!(diags.has_errors());
    }

    #[test]
    fn lookaround_regex_is_rejected() {
        let diags = validated("entry A: x=T; terminal T: /a(?=b)/;");
        assert!(diags.has_errors());
    }
}
