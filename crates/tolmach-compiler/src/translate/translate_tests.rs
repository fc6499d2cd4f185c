use indoc::indoc;

use crate::GrammarSource;
use crate::translate::Translation;

fn translated(source: &str) -> Translation {
    let analyzed = GrammarSource::new(source)
        .parse()
        .expect("within fuel limits")
        .analyze();
    analyzed.translate()
}

#[test]
fn entry_rule_becomes_top() {
    let translation = translated(
        "entry Model: 'model' name=ID; terminal ID: /[_a-zA-Z][a-zA-Z0-9_]*/;",
    );
    assert!(translation.grammar_text.contains("@top Model"));
    assert!(!translation.diagnostics.has_errors());
}

#[test]
fn assignments_are_erased_from_the_text() {
    let translation = translated("entry Model: 'model' name=ID; terminal ID: /[a-z]+/;");
    assert!(!translation.grammar_text.contains("name="));
    assert!(translation.grammar_text.contains(r#""model" ID"#));
}

#[test]
fn field_map_records_assignment_identities() {
    let translation = translated("entry Model: 'model' name=ID; terminal ID: /[a-z]+/;");
    let entries = translation.field_map.entries(0);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].index, 1);
    assert_eq!(entries[0].name, "name");
    assert_eq!(entries[0].op, "=");
    assert!(entries[0].reference.is_none());
}

#[test]
fn cross_reference_kind_lives_in_the_field_map() {
    let translation = translated(
        "entry G: 'hello' person=[Person] '!'; \
         Person: 'person' name=ID; terminal ID: /[a-z]+/;",
    );
    // The text lowers the reference to its token form.
    assert!(translation.grammar_text.contains(r#""hello" ID "!""#));

    let entries = translation.field_map.entries(0);
    assert_eq!(entries[0].reference.as_deref(), Some("Person"));
}

#[test]
fn precedence_order_declared_then_infix_levels() {
    let translation = translated(indoc! {"
        precedence { Add left assoc; Mul left assoc; }
        infix Bin on Expr: '+' | '-' > '*' | '/';
        entry Expr: x=ID;
        terminal ID: /[a-z]+/;
    "});
    assert!(
        translation
            .grammar_text
            .contains("Add @left, Mul @left, prec_Bin_0 @left, prec_Bin_1 @left")
    );
    assert!(translation.grammar_text.starts_with("@precedence"));
}

#[test]
fn conflict_markers_attach_to_every_member_pair() {
    let translation = translated(indoc! {"
        conflicts { [A, B]; [A, C]; }
        entry A: 'a';
        B: 'b';
        C: 'c';
    "});
    let rule_a = translation
        .grammar_text
        .lines()
        .find(|l| l.contains("@top A"))
        .expect("rule A is emitted");
    assert!(rule_a.contains("~conflict_A_B"));
    assert!(rule_a.contains("~conflict_A_C"));

    let rule_b = translation
        .grammar_text
        .lines()
        .find(|l| l.starts_with("B "))
        .expect("rule B is emitted");
    assert!(rule_b.contains("~conflict_A_B"));
    assert!(!rule_b.contains("~conflict_A_C"));
}

#[test]
fn specialize_emits_promotion_rules_and_keywords() {
    let translation = translated(indoc! {r#"
        entry A: t=ID;
        terminal ID: /[a-z]+/;
        specialize ID { "if" => IfKeyword; "else" => ElseKeyword; }
    "#});
    assert!(
        translation
            .grammar_text
            .contains(r#"IfKeyword { @specialize[@name=IfKeyword]<ID, "if"> }"#)
    );
    assert!(translation.keyword_set.contains(&"if".to_string()));
    assert!(translation.keyword_set.contains(&"else".to_string()));
}

#[test]
fn extend_uses_the_extend_directive() {
    let translation = translated(indoc! {r#"
        entry A: t=ID;
        terminal ID: /[a-z]+/;
        extend ID { "while" => WhileKeyword; }
    "#});
    assert!(translation.grammar_text.contains("@extend[@name=WhileKeyword]"));
}

#[test]
fn external_tokens_use_camel_case_group_names() {
    let translation = translated(indoc! {r#"
        entry A: x=Indent;
        external tokens from "./indent-scanner" { Indent, Dedent }
    "#});
    assert!(
        translation
            .grammar_text
            .contains(r#"@external tokens indentScanner from "./indent-scanner" { Indent, Dedent }"#)
    );
}

#[test]
fn external_context_is_emitted_once() {
    let translation = translated(indoc! {r#"
        entry A: 'a';
        external context layout from "./layout-context";
    "#});
    assert!(
        translation
            .grammar_text
            .contains(r#"@context layout from "./layout-context""#)
    );
}

#[test]
fn local_tokens_emit_with_else_content() {
    let translation = translated(indoc! {r"
        entry A: x=Esc;
        local tokens in Str { Esc: /x/; @else StrChars; }
    "});
    assert!(translation.grammar_text.contains("@local tokens"));
    assert!(translation.grammar_text.contains("@else StrContent"));
}

#[test]
fn local_token_names_leave_the_tokens_block() {
    let translation = translated(indoc! {r"
        entry A: x=Esc y=ID;
        terminal ID: /[a-z]+/;
        local tokens in Str { Esc: /q/; @else StrChars; }
    "});
    let text = &translation.grammar_text;
    let start = text.find("@tokens {").expect("tokens block present");
    let end = start + text[start..].find('}').expect("tokens block closes");
    let tokens_block = &text[start..end];
    assert!(tokens_block.contains("ID"));
    assert!(!tokens_block.contains("Esc"));
}

#[test]
fn dynamic_precedence_attribute() {
    let translation = translated("@dynamicPrecedence(3) entry A: 'a';");
    assert!(translation.grammar_text.contains("A[@dynamicPrecedence=3]"));
}

#[test]
fn prec_marker_emits_bang() {
    let translation = translated(
        "precedence { Tight left; } @precMarker(Tight) entry A: 'a' 'b';",
    );
    assert!(translation.grammar_text.contains("!Tight"));
}

#[test]
fn tokens_block_follows_rule_productions() {
    let translation = translated("entry A: x=ID; terminal ID: /[a-z]+/;");
    let text = &translation.grammar_text;
    let top = text.find("@top").unwrap();
    let tokens = text.find("@tokens").unwrap();
    assert!(top < tokens);
}

#[test]
fn translation_is_deterministic() {
    let source = "precedence { P left; } entry A: 'a' x=ID | 'b'; terminal ID: /[a-z]+/;";
    let first = translated(source);
    let second = translated(source);
    assert_eq!(first.grammar_text, second.grammar_text);
    assert_eq!(first.field_map, second.field_map);
    assert_eq!(first.keyword_set, second.keyword_set);
}
