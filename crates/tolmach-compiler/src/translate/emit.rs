//! Deterministic emission of the LR grammar text.
//!
//! Section order: `@precedence`, `@top`, remaining rule productions (with
//! infix families and keyword promotions), then the `@tokens` block and the
//! external declarations. Assignments never appear in the text; they live
//! in the field-map.

use std::fmt::Write;

use tolmach_core::grammar::{Cardinality, Expr, Grammar, PromotionMode};

use super::lower::LoweredGrammar;
use crate::analysis::cross_ref_token;

pub(super) fn emit_grammar_text(grammar: &Grammar, lowered: &LoweredGrammar) -> String {
    let mut out = String::new();

    emit_precedence(grammar, lowered, &mut out);
    emit_rules(grammar, &mut out);
    emit_infixes(grammar, &mut out);
    emit_promotions(grammar, &mut out);
    emit_tokens_block(grammar, &mut out);
    emit_externals(grammar, &mut out);

    out
}

fn emit_precedence(_grammar: &Grammar, lowered: &LoweredGrammar, out: &mut String) {
    if lowered.levels.is_empty() {
        return;
    }
    let entries: Vec<String> = lowered
        .levels
        .iter()
        .map(|level| format!("{} @{}", level.name, level.assoc.as_str()))
        .collect();
    writeln!(out, "@precedence {{ {} }}", entries.join(", ")).unwrap();
    out.push('\n');
}

fn emit_rules(grammar: &Grammar, out: &mut String) {
    // The entry rule becomes the sole @top production, first.
    if let Some(entry) = grammar.entry_rule() {
        emit_rule(grammar, entry, true, out);
    }
    for rule in grammar.rules.iter().filter(|r| !r.entry) {
        emit_rule(grammar, rule, false, out);
    }
}

fn emit_rule(
    grammar: &Grammar,
    rule: &tolmach_core::grammar::RuleDef,
    top: bool,
    out: &mut String,
) {
    let name = grammar.resolve(rule.name);
    let keyword = if top { "@top " } else { "" };

    let attrs = match rule.dynamic_precedence {
        Some(value) => format!("[@dynamicPrecedence={value}]"),
        None => String::new(),
    };

    let mut prefix = String::new();
    if let Some(marker) = rule.prec_marker {
        write!(prefix, "!{} ", grammar.resolve(marker)).unwrap();
    }
    for marker in conflict_markers_of(grammar, rule.name) {
        write!(prefix, "~{marker} ").unwrap();
    }

    let branches: Vec<String> = match &rule.body {
        Expr::Alternative(branches) => branches
            .iter()
            .map(|b| format!("{}{}", prefix, render_expr(grammar, b)))
            .collect(),
        other => vec![format!("{}{}", prefix, render_expr(grammar, other))],
    };

    writeln!(
        out,
        "{keyword}{name}{attrs} {{ {} }}",
        branches.join(" | ")
    )
    .unwrap();
}

fn conflict_markers_of(grammar: &Grammar, rule: tolmach_core::Symbol) -> Vec<String> {
    let mut markers = Vec::new();
    for set in &grammar.conflicts {
        for i in 0..set.rules.len() {
            for j in (i + 1)..set.rules.len() {
                let a = set.rules[i];
                let b = set.rules[j];
                if a == rule || b == rule {
                    markers.push(format!(
                        "conflict_{}_{}",
                        grammar.resolve(a),
                        grammar.resolve(b)
                    ));
                }
            }
        }
    }
    markers
}

fn emit_infixes(grammar: &Grammar, out: &mut String) {
    for infix in &grammar.infixes {
        let name = grammar.resolve(infix.name);
        let base = grammar.resolve(infix.base);

        let mut branches = vec![base.to_string()];
        for (group_idx, group) in infix.groups.iter().enumerate() {
            for &op in group {
                branches.push(format!(
                    "{name} !prec_{name}_{group_idx} {} {name}",
                    quote(grammar.resolve(op))
                ));
            }
        }

        writeln!(out, "{name} {{ {} }}", branches.join(" | ")).unwrap();
    }
}

fn emit_promotions(grammar: &Grammar, out: &mut String) {
    for promotion in &grammar.promotions {
        let base = grammar.resolve(promotion.base);
        let directive = match promotion.mode {
            PromotionMode::Specialize => "@specialize",
            PromotionMode::Extend => "@extend",
        };
        for &(literal, target) in &promotion.mappings {
            let target_name = grammar.resolve(target);
            writeln!(
                out,
                "{target_name} {{ {directive}[@name={target_name}]<{base}, {}> }}",
                quote(grammar.resolve(literal))
            )
            .unwrap();
        }
    }
}

fn emit_tokens_block(grammar: &Grammar, out: &mut String) {
    // External and local token names are out of the common namespace.
    let excluded: Vec<_> = grammar
        .external_tokens
        .iter()
        .flat_map(|g| g.names.iter().copied())
        .chain(
            grammar
                .local_tokens
                .iter()
                .flat_map(|g| g.tokens.iter().map(|t| t.name)),
        )
        .collect();

    let terminals: Vec<_> = grammar
        .terminals
        .iter()
        .filter(|t| !excluded.contains(&t.name))
        .collect();
    if terminals.is_empty() {
        return;
    }

    out.push('\n');
    out.push_str("@tokens {\n");
    for terminal in terminals {
        writeln!(
            out,
            "  {} {{ /{}/ }}",
            grammar.resolve(terminal.name),
            terminal.regex
        )
        .unwrap();
    }
    out.push_str("}\n");
}

fn emit_externals(grammar: &Grammar, out: &mut String) {
    for group in &grammar.external_tokens {
        let names: Vec<&str> = group.names.iter().map(|n| grammar.resolve(*n)).collect();
        writeln!(
            out,
            "@external tokens {} from {} {{ {} }}",
            camel_case_basename(&group.path),
            quote(&group.path),
            names.join(", ")
        )
        .unwrap();
    }

    if let Some(context) = grammar.external_context() {
        writeln!(
            out,
            "@context {} from {}",
            grammar.resolve(context.name),
            quote(&context.path)
        )
        .unwrap();
    }

    for group in &grammar.local_tokens {
        let rule = grammar.resolve(group.rule);
        let mut body = String::new();
        for token in &group.tokens {
            write!(body, "{} {{ /{}/ }} ", grammar.resolve(token.name), token.regex).unwrap();
        }
        writeln!(out, "@local tokens {{ {body}@else {rule}Content }}").unwrap();
    }
}

/// Render a body expression with assignments erased.
fn render_expr(grammar: &Grammar, expr: &Expr) -> String {
    match expr {
        Expr::Sequence(items) => {
            let parts: Vec<String> = items
                .iter()
                .map(|item| render_expr(grammar, item))
                .filter(|part| !part.is_empty())
                .collect();
            parts.join(" ")
        }
        Expr::Alternative(branches) => {
            let parts: Vec<String> = branches
                .iter()
                .map(|branch| render_expr(grammar, branch))
                .collect();
            format!("({})", parts.join(" | "))
        }
        Expr::Repeat { inner, cardinality } => {
            let suffix = match cardinality {
                Cardinality::Optional => "?",
                Cardinality::ZeroOrMore => "*",
                Cardinality::OneOrMore => "+",
            };
            let rendered = render_expr(grammar, inner);
            if needs_parens(inner) {
                format!("({rendered}){suffix}")
            } else {
                format!("{rendered}{suffix}")
            }
        }
        Expr::Keyword(literal) => quote(grammar.resolve(*literal)),
        Expr::RuleRef(name) | Expr::TerminalRef(name) => grammar.resolve(*name).to_string(),
        Expr::Assignment { inner, .. } => render_expr(grammar, inner),
        Expr::Action { .. } => String::new(),
        Expr::CrossRef { token, .. } => cross_ref_token(grammar, *token)
            .map(|t| grammar.resolve(t).to_string())
            .unwrap_or_default(),
    }
}

fn needs_parens(expr: &Expr) -> bool {
    match expr {
        Expr::Sequence(items) => items.len() > 1,
        Expr::Alternative(_) => false, // already parenthesized
        Expr::Assignment { inner, .. } => needs_parens(inner),
        _ => false,
    }
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

fn camel_case_basename(path: &str) -> String {
    let basename = path
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(path)
        .trim_end_matches(".js")
        .trim_end_matches(".ts");

    let mut out = String::new();
    let mut upper_next = false;
    for c in basename.chars() {
        if c.is_ascii_alphanumeric() {
            if upper_next && !out.is_empty() {
                out.extend(c.to_uppercase());
            } else {
                out.push(c);
            }
            upper_next = false;
        } else {
            upper_next = true;
        }
    }
    out
}
