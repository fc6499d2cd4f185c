use super::*;
use crate::Interner;
use crate::span::Span;

fn tiny_grammar() -> Grammar {
    let mut interner = Interner::new();
    let model = interner.intern("Model");
    let id = interner.intern("ID");
    let kw = interner.intern("model");
    let name = interner.intern("name");

    Grammar {
        name: "tiny".into(),
        rules: vec![RuleDef {
            name: model,
            entry: true,
            type_name: None,
            body: Expr::Sequence(vec![
                Expr::Keyword(kw),
                Expr::Assignment {
                    field: name,
                    op: AssignOp::Single,
                    inner: Box::new(Expr::TerminalRef(id)),
                },
            ]),
            dynamic_precedence: None,
            prec_marker: None,
            span: Span::new(0, 30),
        }],
        terminals: vec![TerminalDef {
            name: id,
            regex: r"[_a-zA-Z][\w_]*".into(),
            hidden: false,
            span: Span::new(31, 20),
        }],
        interner,
        ..Grammar::default()
    }
}

#[test]
fn entry_rule_is_found() {
    let grammar = tiny_grammar();
    let entry = grammar.entry_rule().unwrap();
    assert_eq!(grammar.resolve(entry.name), "Model");
}

#[test]
fn ast_type_defaults_to_rule_name() {
    let grammar = tiny_grammar();
    let rule = &grammar.rules[0];
    assert_eq!(rule.ast_type(), rule.name);
}

#[test]
fn walk_visits_nested_assignments() {
    let grammar = tiny_grammar();
    let mut fields = Vec::new();
    walk_expr(&grammar.rules[0].body, &mut |expr: &Expr| {
        if let Expr::Assignment { field, .. } = expr {
            fields.push(*field);
        }
    });
    assert_eq!(fields.len(), 1);
    assert_eq!(grammar.resolve(fields[0]), "name");
}

#[test]
fn model_round_trips_through_postcard() {
    let grammar = tiny_grammar();
    let bytes = postcard::to_allocvec(&grammar).unwrap();
    let mut restored: Grammar = postcard::from_bytes(&bytes).unwrap();
    restored.interner.rehydrate();

    assert_eq!(restored.rules.len(), 1);
    assert_eq!(restored.resolve(restored.rules[0].name), "Model");
    assert!(restored.entry_rule().is_some());
}
