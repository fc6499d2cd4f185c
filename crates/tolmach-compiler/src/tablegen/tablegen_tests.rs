use tolmach_core::diagnostics::Diagnostics;
use tolmach_core::tokens::TokenSym;

use super::{Action, EOF, ParseTable, build_tables};
use crate::GrammarSource;
use crate::translate::lower_grammar;

fn tables_for(source: &str) -> (ParseTable, Diagnostics) {
    let analyzed = GrammarSource::new(source)
        .parse()
        .expect("within fuel limits")
        .analyze();
    assert!(
        analyzed.is_valid(),
        "grammar has errors:\n{}",
        analyzed.diagnostics().printer().source(source).render()
    );
    let lowered = lower_grammar(analyzed.grammar());
    let mut diagnostics = Diagnostics::new();
    let tables = build_tables(analyzed.grammar(), &lowered, &mut diagnostics);
    (tables, diagnostics)
}

#[test]
fn simple_grammar_builds_without_conflicts() {
    let (tables, diagnostics) = tables_for(
        "entry Model: 'model' name=ID; terminal ID: /[_a-zA-Z][a-zA-Z0-9_]*/;",
    );
    assert!(diagnostics.is_empty());
    assert!(tables.actions.len() >= 4);

    // State 0 shifts the leading keyword.
    let kw = tables.interner.get("model").unwrap();
    let kw_idx = tables.token_index(TokenSym::Keyword(kw)).unwrap();
    assert!(matches!(tables.action(0, kw_idx), Some(Action::Shift(_))));
}

#[test]
fn accept_lives_on_end_of_input() {
    let (tables, _) = tables_for("entry A: 'a';");
    let accepts = tables
        .actions
        .iter()
        .flat_map(|row| row.iter())
        .filter(|(tok, action)| *tok == EOF && *action == Action::Accept)
        .count();
    assert_eq!(accepts, 1);
}

#[test]
fn repetition_lowers_to_left_recursion_without_conflicts() {
    let (tables, diagnostics) = tables_for(
        "entry List: items+=Item*; Item: 'item' name=ID; terminal ID: /[a-z]+/;",
    );
    assert!(diagnostics.is_empty());
    assert!(!tables.actions.is_empty());
}

#[test]
fn infix_precedence_resolves_shift_reduce() {
    let (_, diagnostics) = tables_for(
        "infix Bin on Prim: '+' | '-' > '*' | '/'; \
         entry E: expr=Bin; Prim: val=ID; terminal ID: /[a-z]+/;",
    );
    assert!(
        diagnostics.is_empty(),
        "expected precedence to silence conflicts:\n{}",
        diagnostics.printer().render()
    );
}

#[test]
fn unresolved_ambiguity_is_reported() {
    // Dangling-else shaped: optional tail with no precedence declared.
    let (_, diagnostics) = tables_for(
        "entry S: st=St; St: 'if' c=ID 'then' t=St e=Else? | 'x'; Else: 'else' body=St; \
         terminal ID: /[a-z]+/;",
    );
    assert!(diagnostics.has_errors());
    assert!(
        diagnostics
            .iter()
            .any(|d| d.message.contains("shift/reduce"))
    );
}

#[test]
fn expected_tokens_reflect_the_state() {
    let (tables, _) = tables_for("entry A: 'a' x=ID; terminal ID: /[a-z]+/;");
    let expected = tables.expected_tokens(0);
    let kw = tables.interner.get("a").unwrap();
    assert!(expected.contains(&TokenSym::Keyword(kw)));
}
