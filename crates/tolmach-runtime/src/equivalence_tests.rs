//! Backend equivalence: the predictive and LR backends agree on leaf
//! token sequences, root spans, and accept/reject for the same grammar.

use indoc::indoc;

use tolmach_compiler::GrammarSource;
use tolmach_compiler::artifacts::Artifacts;
use tolmach_core::Stage;

use crate::ast::{AstValue, build_ast};
use crate::lr::{Edit, LrParser};
use crate::topdown::TopDownParser;
use crate::tree::SyntaxTree;

/// Build both backends, pushing the LR artifacts through their serialized
/// forms the way a generated package would load them.
fn backends(source: &str) -> (TopDownParser, LrParser) {
    let analyzed = GrammarSource::new(source)
        .parse()
        .expect("within fuel limits")
        .analyze();
    assert!(
        analyzed.is_valid(),
        "grammar has errors:\n{}",
        analyzed.diagnostics().printer().source(source).render()
    );
    let artifacts = analyzed.compile().expect("generator should succeed");
    let artifacts = Artifacts::load(
        &artifacts.encode_tables(),
        &artifacts.field_map_json(),
        &artifacts.keywords_json(),
    )
    .expect("artifacts round-trip");

    let topdown = TopDownParser::new(&analyzed).expect("terminals compile");
    let lr = LrParser::new(&artifacts).expect("terminals compile");
    (topdown, lr)
}

fn assert_equivalent(topdown: &TopDownParser, lr: &LrParser, input: &str) {
    let a = topdown.parse(input);
    let b = lr.parse(input);

    assert_eq!(
        a.leaf_tokens(),
        b.leaf_tokens(),
        "leaf token sequences diverge on {input:?}\n--- top-down\n{}\n--- lr\n{}",
        a.dump(),
        b.dump()
    );
    assert_eq!(a.root().offset(), b.root().offset());
    assert_eq!(a.root().end(), b.root().end());
    assert_eq!(
        a.diagnostics().is_empty(),
        b.diagnostics().is_empty(),
        "backends disagree on accept/reject for {input:?}"
    );
}

fn assert_covering(tree: &SyntaxTree, input: &str) {
    assert_eq!(tree.root().full_text(), input);
    assert_eq!(tree.root().offset(), 0);
    assert_eq!(tree.root().end(), input.len() as u32);

    // Leaf images concatenate back to the input, trivia included.
    let mut concat = String::new();
    collect_leaves(tree, &mut concat);
    assert_eq!(concat, input);
}

fn collect_leaves(tree: &SyntaxTree, out: &mut String) {
    fn walk(node: crate::tree::SyntaxNode<'_>, out: &mut String) {
        if node.is_leaf() {
            out.push_str(node.full_text());
            return;
        }
        for child in node.children() {
            walk(child, out);
        }
    }
    walk(tree.root(), out);
}

const MODEL_GRAMMAR: &str = r"entry Model: 'model' name=ID;
terminal ID: /[_a-zA-Z][\w_]*/;
hidden terminal WS: /\s+/;
";

#[test]
fn model_foo_accepted_by_both() {
    let (topdown, lr) = backends(MODEL_GRAMMAR);
    assert_equivalent(&topdown, &lr, "model foo");

    let tree = topdown.parse("model foo");
    assert!(tree.diagnostics().is_empty());
    assert_covering(&tree, "model foo");
    assert_eq!(tree.root().end(), 9);

    // Non-trivia leaves: the keyword, then the identifier.
    let names: Vec<String> = tree
        .leaf_tokens()
        .iter()
        .map(|t| tree.kind_name(crate::tree::NodeKind::from_token(*t)))
        .collect();
    assert_eq!(names, vec!["'model'", "ID"]);

    // The flat case is even structurally identical across backends.
    let lr_tree = lr.parse("model foo");
    assert!(tree.structural_eq(&lr_tree));

    insta::assert_snapshot!(tree.dump(), @r#"
    Model
      'model' "model"
      ID "foo"
    "#);
}

#[test]
fn model_ast_has_the_assigned_name() {
    let (topdown, lr) = backends(MODEL_GRAMMAR);

    for tree in [topdown.parse("model foo"), lr.parse("model foo")] {
        let ast = build_ast(&tree);
        let root = ast.root().expect("root rule node");
        assert_eq!(tree.resolve(root.type_name()), "Model");

        let name = tree.interner().get("name").unwrap();
        let Some(AstValue::Text(value)) = root.field(name) else {
            panic!("expected a text field, got {:?}", root.field(name));
        };
        assert_eq!(value, "foo");
    }
}

#[test]
fn invalid_input_rejected_by_both_at_the_same_span() {
    let (topdown, lr) = backends(MODEL_GRAMMAR);

    for tree in [topdown.parse("invalid"), lr.parse("invalid")] {
        assert_covering(&tree, "invalid");
        let first = &tree.diagnostics()[0];
        assert_eq!(first.source, Stage::Parser);
        assert_eq!(first.offset, 0);
        assert_eq!(first.length, 7);
    }
}

#[test]
fn specialized_keyword_wins_over_identifier() {
    let source = indoc! {r#"
        entry S: k=IfKeyword | i=ID;
        terminal ID: /[a-z]+/;
        specialize ID { "if" => IfKeyword; "else" => ElseKeyword; }
    "#};
    let (topdown, lr) = backends(source);
    assert_equivalent(&topdown, &lr, "if");
    assert_equivalent(&topdown, &lr, "x");

    let tree = topdown.parse("if");
    let names: Vec<String> = tree
        .leaf_tokens()
        .iter()
        .map(|t| tree.kind_name(crate::tree::NodeKind::from_token(*t)))
        .collect();
    assert_eq!(names, vec!["IfKeyword"]);
}

#[test]
fn cross_references_and_lists_agree() {
    let source = indoc! {r"
        entry Model: persons+=Person* greetings+=Greeting*;
        Person: 'person' name=ID;
        Greeting: 'hello' person=[Person] '!';
        terminal ID: /[_a-zA-Z][\w_]*/;
        hidden terminal WS: /\s+/;
    "};
    let (topdown, lr) = backends(source);
    let input = "person Alice\nhello Alice !";
    assert_equivalent(&topdown, &lr, input);

    for tree in [topdown.parse(input), lr.parse(input)] {
        assert_covering(&tree, input);
        let ast = build_ast(&tree);
        let root = ast.root().unwrap();

        let persons = tree.interner().get("persons").unwrap();
        let Some(AstValue::List(items)) = root.field(persons) else {
            panic!("expected a person list");
        };
        assert_eq!(items.len(), 1);

        let greetings = tree.interner().get("greetings").unwrap();
        let Some(AstValue::List(greets)) = root.field(greetings) else {
            panic!("expected a greeting list");
        };
        let AstValue::Node(greeting) = &greets[0] else {
            panic!("expected a node in the greeting list");
        };
        let person_field = tree.interner().get("person").unwrap();
        let Some(AstValue::Reference(descriptor)) = ast.node(*greeting).field(person_field)
        else {
            panic!("expected a reference descriptor");
        };
        assert_eq!(descriptor.target_name, "Alice");
        assert_eq!(tree.resolve(descriptor.target_kind), "Person");
    }
}

#[test]
fn infix_backends_agree_and_bind_by_declared_strength() {
    let source = indoc! {r"
        infix Bin on Prim: '+' | '-' > '*' | '/';
        entry E: expr=Bin;
        Prim: val=NUM;
        terminal NUM: /[0-9]+/;
        hidden terminal WS: /[ ]+/;
    "};
    let (topdown, lr) = backends(source);
    assert_equivalent(&topdown, &lr, "1 + 2 * 3");
    assert_equivalent(&topdown, &lr, "1 - 2 - 3");

    // Groups are declared in decreasing strength: '+' binds tighter, so
    // `1 + 2 * 3` groups as `(1 + 2) * 3` in both backends.
    for tree in [topdown.parse("1 + 2 * 3"), lr.parse("1 + 2 * 3")] {
        let ast = build_ast(&tree);
        let root = ast.root().unwrap();
        let expr = tree.interner().get("expr").unwrap();
        let operator = tree.interner().get("operator").unwrap();

        let Some(AstValue::Node(top)) = root.field(expr) else {
            panic!("expected the expression node");
        };
        let top = ast.node(*top);
        let Some(AstValue::Text(op)) = top.field(operator) else {
            panic!("expected the top operator");
        };
        assert_eq!(op, "*");
    }
}

#[test]
fn actions_retag_in_both_backends() {
    let source = indoc! {r"
        entry E: Prim ({Bin.left} op='+' right=Prim)*;
        Prim: val=NUM;
        terminal NUM: /[0-9]+/;
    "};
    let (topdown, lr) = backends(source);
    assert_equivalent(&topdown, &lr, "1+2+3");

    for tree in [topdown.parse("1+2+3"), lr.parse("1+2+3")] {
        let ast = build_ast(&tree);
        let root = ast.root().unwrap();
        assert_eq!(tree.resolve(root.type_name()), "Bin");

        let left = tree.interner().get("left").unwrap();
        let Some(AstValue::Node(inner)) = root.field(left) else {
            panic!("expected a grafted left operand");
        };
        assert_eq!(tree.resolve(ast.node(*inner).type_name()), "Bin");
    }
}

#[test]
fn empty_input_on_a_nullable_entry_is_clean() {
    let source = "entry List: items+=Item*; Item: 'item'; hidden terminal WS: /\\s+/;";
    let (topdown, lr) = backends(source);

    for tree in [topdown.parse(""), lr.parse("")] {
        assert!(tree.diagnostics().is_empty());
        assert_eq!(tree.root().offset(), 0);
        assert_eq!(tree.root().end(), 0);
        assert_eq!(tree.root().children().count(), 0);
    }
}

#[test]
fn whitespace_only_input_yields_trivia_children() {
    let source = "entry List: items+=Item*; Item: 'item'; hidden terminal WS: /\\s+/;";
    let (topdown, lr) = backends(source);

    for tree in [topdown.parse("   "), lr.parse("   ")] {
        assert!(tree.diagnostics().is_empty());
        assert_covering(&tree, "   ");
        assert!(tree.root().children().all(|c| c.is_trivia()));
        assert!(tree.root().children().count() > 0);
    }
}

#[test]
fn identifier_keywords_double_as_identifiers_elsewhere() {
    // `model` the keyword also lexes as a plain identifier where the
    // grammar expects ID.
    let (topdown, lr) = backends(MODEL_GRAMMAR);
    assert_equivalent(&topdown, &lr, "model model");

    let tree = topdown.parse("model model");
    assert!(tree.diagnostics().is_empty());
    let ast = build_ast(&tree);
    let name = tree.interner().get("name").unwrap();
    let Some(AstValue::Text(value)) = ast.root().unwrap().field(name) else {
        panic!("expected a name");
    };
    assert_eq!(value, "model");
}

#[test]
fn reparse_matches_a_full_parse() {
    let (_, lr) = backends(MODEL_GRAMMAR);

    let prev = lr.parse("model foo");
    let edited = lr.reparse(
        &prev,
        &[Edit {
            from: 6,
            to: 9,
            insert: "foobar".into(),
        }],
    );
    let full = lr.parse("model foobar");
    assert_eq!(edited.text(), "model foobar");
    assert!(edited.structural_eq(&full));
}

#[test]
fn reparse_handles_multiple_disjoint_edits() {
    let source = indoc! {r"
        entry Model: persons+=Person*;
        Person: 'person' name=ID;
        terminal ID: /[_a-zA-Z][\w_]*/;
        hidden terminal WS: /\s+/;
    "};
    let (_, lr) = backends(source);

    let prev = lr.parse("person a person b person c");
    let edits = vec![
        Edit {
            from: 7,
            to: 8,
            insert: "alice".into(),
        },
        Edit {
            from: 25,
            to: 26,
            insert: "carol".into(),
        },
    ];
    let edited = lr.reparse(&prev, &edits);
    let full = lr.parse("person alice person b person carol");
    assert_eq!(edited.text(), "person alice person b person carol");
    assert!(edited.structural_eq(&full));
}

#[test]
fn reparse_reuses_tokens_outside_the_damaged_region() {
    // No identifier-like keywords, so the token-reuse fast path applies.
    let source = indoc! {r"
        entry Sum: parts+=NUM*;
        terminal NUM: /[0-9]+/;
        hidden terminal WS: /[ ]+/;
    "};
    let (_, lr) = backends(source);

    let prev = lr.parse("1 2 3 4");
    let edited = lr.reparse(
        &prev,
        &[Edit {
            from: 4,
            to: 5,
            insert: "33".into(),
        }],
    );
    let full = lr.parse("1 2 33 4");
    assert_eq!(edited.text(), "1 2 33 4");
    assert!(edited.structural_eq(&full));
}

#[test]
fn reparse_of_a_dirty_tree_still_converges() {
    let (_, lr) = backends(MODEL_GRAMMAR);

    let prev = lr.parse("???");
    let edited = lr.reparse(
        &prev,
        &[Edit {
            from: 0,
            to: 3,
            insert: "model ok".into(),
        }],
    );
    let full = lr.parse("model ok");
    assert!(edited.structural_eq(&full));
    assert!(edited.diagnostics().is_empty());
}

#[test]
fn expected_tokens_at_offset() {
    let (_, lr) = backends(MODEL_GRAMMAR);

    let at_start = lr.expected_tokens("model foo", 0);
    assert!(at_start.contains(&"model".to_string()));

    let after_keyword = lr.expected_tokens("model foo", 6);
    assert!(after_keyword.contains(&"ID".to_string()));
}

#[test]
fn garbage_input_produces_lexer_diagnostics_and_a_tree() {
    let (topdown, lr) = backends(MODEL_GRAMMAR);

    for tree in [topdown.parse("model \u{1}\u{2}"), lr.parse("model \u{1}\u{2}")] {
        assert!(
            tree.diagnostics()
                .iter()
                .any(|d| d.source == Stage::Lexer)
        );
        assert_eq!(tree.root().full_text(), "model \u{1}\u{2}");
    }
}
