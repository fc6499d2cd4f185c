use indoc::indoc;

use tolmach_compiler::GrammarSource;

use crate::ast::{AstValue, build_ast, build_ast_with_uri};
use crate::topdown::TopDownParser;
use crate::tree::SyntaxTree;

fn parse(source: &str, input: &str) -> SyntaxTree {
    let analyzed = GrammarSource::new(source)
        .parse()
        .expect("within fuel limits")
        .analyze();
    assert!(analyzed.is_valid());
    TopDownParser::new(&analyzed)
        .expect("terminals compile")
        .parse(input)
}

const GRAMMAR: &str = indoc! {r"
    entry Model: persons+=Person* flag?='sealed'?;
    Person: 'person' name=ID;
    terminal ID: /[_a-zA-Z][\w_]*/;
    hidden terminal WS: /\s+/;
"};

#[test]
fn container_back_links_are_consistent() {
    let tree = parse(GRAMMAR, "person a person b sealed");
    let ast = build_ast(&tree);

    // Every contained node is reachable through its container's field at
    // its recorded index.
    for node in ast.iter() {
        let Some(container) = node.container() else {
            continue;
        };
        let property = node.container_property().expect("property set");
        let value = container.field(property).expect("field present");

        match node.container_index() {
            Some(index) => {
                let AstValue::List(items) = value else {
                    panic!("indexed child outside a list field");
                };
                assert_eq!(items[index], AstValue::Node(node.id()));
            }
            None => {
                assert_eq!(value, &AstValue::Node(node.id()));
            }
        }
    }
}

#[test]
fn append_children_record_their_index() {
    let tree = parse(GRAMMAR, "person a person b");
    let ast = build_ast(&tree);

    let persons = tree.interner().get("persons").unwrap();
    let Some(AstValue::List(items)) = ast.root().unwrap().field(persons) else {
        panic!("expected a list");
    };
    assert_eq!(items.len(), 2);

    for (index, item) in items.iter().enumerate() {
        let AstValue::Node(id) = item else {
            panic!("expected nodes");
        };
        let node = ast.node(*id);
        assert_eq!(node.container_index(), Some(index));
        assert_eq!(node.container_property(), Some(persons));
    }
}

#[test]
fn boolean_assignment_sets_true_when_matched() {
    let flag_of = |input: &str| {
        let tree = parse(GRAMMAR, input);
        let ast = build_ast(&tree);
        let flag = tree.interner().get("flag").unwrap();
        ast.root().unwrap().field(flag).cloned()
    };

    assert_eq!(flag_of("person a sealed"), Some(AstValue::Bool(true)));
    // A missing optional field is absent, not an error.
    assert_eq!(flag_of("person a"), None);
}

#[test]
fn later_single_assignment_wins() {
    let source = indoc! {r"
        entry Pair: 'pair' name=ID name=ID;
        terminal ID: /[a-z]+/;
        hidden terminal WS: /\s+/;
    "};
    let tree = parse(source, "pair first second");
    let ast = build_ast(&tree);

    let name = tree.interner().get("name").unwrap();
    assert_eq!(
        ast.root().unwrap().field(name),
        Some(&AstValue::Text("second".into()))
    );
}

#[test]
fn document_uri_lands_on_the_root() {
    let tree = parse(GRAMMAR, "person a");
    let ast = build_ast_with_uri(&tree, Some("file:///work/demo.tm".into()));
    assert_eq!(ast.uri(), Some("file:///work/demo.tm"));
}

#[test]
fn syntax_back_link_points_into_the_tree() {
    let tree = parse(GRAMMAR, "person a");
    let ast = build_ast(&tree);

    let persons = tree.interner().get("persons").unwrap();
    let Some(AstValue::List(items)) = ast.root().unwrap().field(persons) else {
        panic!("expected a list");
    };
    let AstValue::Node(person) = &items[0] else {
        panic!("expected a node");
    };
    let syntax = tree.node(ast.node(*person).syntax());
    assert_eq!(syntax.full_text(), "person a");
}
