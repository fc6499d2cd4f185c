use indoc::indoc;

use crate::test_utils::{expect_clean_cst, parse_cst};

#[test]
fn entry_rule_with_assignment() {
    let output = expect_clean_cst("entry Model: 'model' name=ID;");

    insta::assert_snapshot!(output, @r#"
    Root
      Rule
        KwEntry "entry"
        Id "Model"
        Colon ":"
        Seq
          Literal
            SingleQuote "'"
            StrVal "model"
            SingleQuote "'"
          Assignment
            Id "name"
            Equals "="
            Ref
              Id "ID"
        Semicolon ";"
    "#);
}

#[test]
fn terminal_declarations() {
    let output = expect_clean_cst(indoc! {r"
        terminal ID: /[_a-zA-Z][a-zA-Z0-9_]*/;
        hidden terminal WS: /\s+/;
    "});

    insta::assert_snapshot!(output, @r#"
    Root
      Terminal
        KwTerminal "terminal"
        Id "ID"
        Colon ":"
        RegexLiteral "/[_a-zA-Z][a-zA-Z0-9_]*/"
        Semicolon ";"
      Terminal
        KwHidden "hidden"
        KwTerminal "terminal"
        Id "WS"
        Colon ":"
        RegexLiteral "/\\s+/"
        Semicolon ";"
    "#);
}

#[test]
fn alternatives_wrap_only_with_pipe() {
    let output = expect_clean_cst("Value: a=ID | b=NUM;");

    insta::assert_snapshot!(output, @r#"
    Root
      Rule
        Id "Value"
        Colon ":"
        Alt
          Assignment
            Id "a"
            Equals "="
            Ref
              Id "ID"
          Pipe "|"
          Assignment
            Id "b"
            Equals "="
            Ref
              Id "NUM"
        Semicolon ";"
    "#);
}

#[test]
fn cardinality_wraps_the_tightest_element() {
    // The suffix binds to the assignment's value, not the assignment.
    let output = expect_clean_cst("List: items+=Item*;");

    insta::assert_snapshot!(output, @r#"
    Root
      Rule
        Id "List"
        Colon ":"
        Assignment
          Id "items"
          PlusEquals "+="
          Quantified
            Ref
              Id "Item"
            Star "*"
        Semicolon ";"
    "#);
}

#[test]
fn cross_reference_with_explicit_token() {
    let output = expect_clean_cst("Greeting: 'hello' person=[Person : ID] '!';");
    assert!(output.contains("CrossRef"));
    assert!(output.contains("Id \"Person\""));
    assert!(output.contains("Id \"ID\""));
}

#[test]
fn action_with_graft() {
    let output = expect_clean_cst("Expr: Primary ({BinExpr.left} op='+' right=Primary)*;");
    assert!(output.contains("Action"));
    assert!(output.contains("Id \"BinExpr\""));
    assert!(output.contains("Id \"left\""));
}

#[test]
fn precedence_block_levels() {
    let output = expect_clean_cst(indoc! {"
        precedence { Add left assoc; Mul left assoc; Pow right; Cmp nonassoc; }
    "});

    insta::assert_snapshot!(output, @r#"
    Root
      PrecBlock
        KwPrecedence "precedence"
        BraceOpen "{"
        PrecLevel
          Id "Add"
          KwLeft "left"
          KwAssoc "assoc"
          Semicolon ";"
        PrecLevel
          Id "Mul"
          KwLeft "left"
          KwAssoc "assoc"
          Semicolon ";"
        PrecLevel
          Id "Pow"
          KwRight "right"
          Semicolon ";"
        PrecLevel
          Id "Cmp"
          KwNonassoc "nonassoc"
          Semicolon ";"
        BraceClose "}"
    "#);
}

#[test]
fn conflict_sets() {
    let output = expect_clean_cst("conflicts { [A, B]; [A, C]; }");
    assert_eq!(output.matches("ConflictSet").count(), 2);
}

#[test]
fn specialize_and_extend_blocks() {
    let output = expect_clean_cst(indoc! {r#"
        specialize ID { "if" => IfKeyword; "else" => ElseKeyword; }
        extend ID { "while" => WhileKeyword; }
    "#});
    assert!(output.contains("SpecializeBlock"));
    assert!(output.contains("ExtendBlock"));
    assert_eq!(output.matches("Mapping").count(), 3);
}

#[test]
fn external_tokens_and_context() {
    let output = expect_clean_cst(indoc! {r#"
        external tokens from "./scanner" { Indent, Dedent }
        external context layout from "./layout-context";
    "#});
    assert!(output.contains("ExternalTokens"));
    assert!(output.contains("ExternalContext"));
}

#[test]
fn local_tokens_with_else() {
    let output = expect_clean_cst(indoc! {r"
        local tokens in StringContent {
            Escape: /\\./;
            @else StringChar;
        }
    "});
    assert!(output.contains("LocalTokens"));
    assert!(output.contains("LocalTokenDef"));
    assert!(output.contains("ElseBranch"));
}

#[test]
fn infix_groups_step_down_with_gt() {
    let output = expect_clean_cst("infix Bin on Expr: '+' | '-' > '*' | '/';");
    assert_eq!(output.matches("InfixGroup").count(), 2);
}

#[test]
fn contextual_keywords_are_valid_names() {
    // `left` and `tokens` are block keywords but legal rule names.
    let output = expect_clean_cst("left: tokens=ID;");
    assert!(output.contains("Id \"left\""));
    assert!(output.contains("Id \"tokens\""));
}

#[test]
fn missing_semicolon_is_reported_once() {
    let (_, diagnostics) = parse_cst("Model: name=ID\nOther: x=ID;");
    assert!(diagnostics.has_errors());
}

#[test]
fn unexpected_token_recovers_to_next_item() {
    let (root, diagnostics) = parse_cst("%%% Model: name=ID;");
    assert!(diagnostics.has_errors());
    // The rule after the garbage still parses.
    let dump = crate::test_utils::dump_cst(&root);
    assert!(dump.contains("Id \"Model\""));
    assert!(dump.contains("Assignment"));
}

#[test]
fn always_produces_a_tree() {
    let (root, _) = parse_cst("entry : ; { ] )");
    assert_eq!(format!("{:?}", root.kind()), "Root");
}

#[test]
fn full_text_round_trips_through_the_cst() {
    let source = "entry Model: 'model' name=ID; // trailing\n";
    let (root, _) = parse_cst(source);
    assert_eq!(root.text().to_string(), source);
}
