//! End-to-end service behavior over both backends.

use indoc::indoc;

use tolmach_compiler::GrammarSource;
use tolmach_compiler::artifacts::Artifacts;
use tolmach_core::{Cancellation, Span};
use tolmach_runtime::backend::{Backend, ParserAdapter};
use tolmach_runtime::lr::LrParser;
use tolmach_runtime::topdown::TopDownParser;

use crate::documents::{DocumentStore, IndexManager};
use crate::folding::FoldingRange;
use crate::highlight::{DocumentHighlight, References};
use crate::hover::Hover;
use crate::linker::Linker;
use crate::names::NameProvider;
use crate::signature::{DeclarationSite, TypeDefinition};
use crate::symbols::{DocumentSymbols, WorkspaceSymbols};

const GREETER_GRAMMAR: &str = indoc! {r"
    entry Model: persons+=Person* greetings+=Greeting*;
    Person: 'person' name=ID;
    Greeting: 'hello' person=[Person] '!';
    terminal ID: /[_a-zA-Z][\w_]*/;
    hidden terminal WS: /\s+/;
    hidden terminal ML_COMMENT: /\/\*([^*]|\*[^\/])*\*\//;
"};

fn both_backends(source: &str) -> Vec<Backend> {
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

    vec![
        Backend::TopDown(TopDownParser::new(&analyzed).expect("terminals compile")),
        Backend::Lr(LrParser::new(&artifacts).expect("terminals compile")),
    ]
}

struct Fixture {
    store: DocumentStore,
    index: IndexManager,
    linker: Linker,
    names: NameProvider,
}

fn fixture(backend: &Backend, uri: &str, input: &str) -> Fixture {
    let mut store = DocumentStore::new();
    store.open(uri, input, backend);

    let document = store.get(uri).unwrap().clone();
    let names = NameProvider::new(document.tree());
    let mut index = IndexManager::new();
    index
        .index_document(&document, &names, &Cancellation::never())
        .expect("not cancelled");

    Fixture {
        store,
        index,
        linker: Linker::new(),
        names,
    }
}

const GREETER_INPUT: &str = "person Alice\nhello Alice !";

#[test]
fn highlight_covers_declaration_and_reference_for_both_backends() {
    for backend in both_backends(GREETER_GRAMMAR) {
        let mut fx = fixture(&backend, "file:///demo.tm", GREETER_INPUT);
        let document = fx.store.get("file:///demo.tm").unwrap().clone();

        // Cursor on the declaration name.
        let ranges = DocumentHighlight
            .highlights(
                &document,
                &fx.index,
                &mut fx.linker,
                8,
                &Cancellation::never(),
            )
            .unwrap();
        assert_eq!(
            ranges,
            vec![Span::new(7, 5), Span::new(19, 5)],
            "backend {}",
            backend.name()
        );

        // Cursor on the reference resolves to the same pair.
        let ranges = DocumentHighlight
            .highlights(
                &document,
                &fx.index,
                &mut fx.linker,
                20,
                &Cancellation::never(),
            )
            .unwrap();
        assert_eq!(ranges, vec![Span::new(7, 5), Span::new(19, 5)]);
    }
}

#[test]
fn references_honor_include_declaration() {
    for backend in both_backends(GREETER_GRAMMAR) {
        let mut fx = fixture(&backend, "file:///demo.tm", GREETER_INPUT);
        let document = fx.store.get("file:///demo.tm").unwrap().clone();

        let with_decl = References
            .find(
                &document,
                &fx.index,
                &mut fx.linker,
                8,
                true,
                &Cancellation::never(),
            )
            .unwrap();
        assert_eq!(with_decl.len(), 2);

        let without_decl = References
            .find(
                &document,
                &fx.index,
                &mut fx.linker,
                8,
                false,
                &Cancellation::never(),
            )
            .unwrap();
        assert_eq!(without_decl, vec![("file:///demo.tm".into(), Span::new(19, 5))]);
    }
}

#[test]
fn unresolved_reference_warns_with_a_suggestion() {
    let backend = &both_backends(GREETER_GRAMMAR)[0];
    let mut fx = fixture(backend, "file:///demo.tm", "person Alice\nhello Alicf !");
    let document = fx.store.get("file:///demo.tm").unwrap().clone();

    let reference = fx
        .index
        .references_in("file:///demo.tm")
        .next()
        .unwrap()
        .clone();
    let resolved = fx.linker.resolve(
        &fx.index,
        document.tree().interner(),
        "file:///demo.tm",
        &reference.descriptor,
    );
    assert!(resolved.is_none());

    let diagnostic = fx.linker.unresolved_diagnostic(
        &fx.index,
        document.tree().interner(),
        &reference.descriptor,
    );
    assert_eq!(diagnostic.severity, tolmach_core::Severity::Warning);
    assert!(diagnostic.message.contains("Alicf"));
    assert!(diagnostic.message.contains("did you mean `Alice`"));
}

#[test]
fn document_symbols_list_named_nodes() {
    for backend in both_backends(GREETER_GRAMMAR) {
        let fx = fixture(&backend, "file:///demo.tm", GREETER_INPUT);
        let document = fx.store.get("file:///demo.tm").unwrap().clone();

        let symbols = DocumentSymbols
            .symbols(&document, &fx.names, &Cancellation::never())
            .unwrap();
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "Alice");
        assert_eq!(symbols[0].selection, Span::new(7, 5));
    }
}

#[test]
fn workspace_symbols_fuzzy_match_and_cancel() {
    let backend = &both_backends(GREETER_GRAMMAR)[0];
    let fx = fixture(backend, "file:///demo.tm", GREETER_INPUT);

    let hits = WorkspaceSymbols
        .search(&fx.index, "ALI", &Cancellation::never())
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, "Alice");

    let cancelled = Cancellation::new();
    cancelled.cancel();
    assert!(WorkspaceSymbols.search(&fx.index, "a", &cancelled).is_err());
}

#[test]
fn folding_covers_braced_blocks() {
    let source = indoc! {r"
        entry Model: blocks+=Block*;
        Block: 'block' name=ID '{' items+=ID* '}';
        terminal ID: /[_a-zA-Z][\w_]*/;
        hidden terminal WS: /\s+/;
    "};
    let input = "block b {\n  x\n  y\n}";

    for backend in both_backends(source) {
        let fx = fixture(&backend, "file:///blocks.tm", input);
        let document = fx.store.get("file:///blocks.tm").unwrap().clone();

        let folds = FoldingRange.ranges(&document);
        assert!(
            folds
                .iter()
                .any(|f| f.start_line == 0 && f.end_line == 2),
            "missing block fold on backend {}: {folds:?}",
            backend.name()
        );
    }
}

#[test]
fn short_blocks_do_not_fold() {
    let source = indoc! {r"
        entry Model: blocks+=Block*;
        Block: 'block' name=ID '{' items+=ID* '}';
        terminal ID: /[_a-zA-Z][\w_]*/;
        hidden terminal WS: /\s+/;
    "};
    let backend = &both_backends(source)[0];
    let fx = fixture(backend, "file:///blocks.tm", "block b { x }");
    let document = fx.store.get("file:///blocks.tm").unwrap().clone();
    assert!(FoldingRange.ranges(&document).is_empty());
}

#[test]
fn hover_shows_the_preceding_doc_comment() {
    let backend = &both_backends(GREETER_GRAMMAR)[0];
    let input = "/* The greeter. */\nperson Alice\nhello Alice !";
    let fx = fixture(backend, "file:///demo.tm", input);
    let document = fx.store.get("file:///demo.tm").unwrap().clone();

    // Hovering the declaration name surfaces the comment.
    let hover = Hover.hover(&document, &fx.index, 27).unwrap();
    assert_eq!(hover.contents, "The greeter.");
}

#[test]
fn hover_renders_links_against_the_index() {
    let backend = &both_backends(GREETER_GRAMMAR)[0];
    let input = "/* See {@link Alice}. */\nperson Alice\nhello Alice !";
    let fx = fixture(backend, "file:///demo.tm", input);
    let document = fx.store.get("file:///demo.tm").unwrap().clone();

    let decl_offset = (input.find("person Alice").unwrap() + 8) as u32;
    let hover = Hover.hover(&document, &fx.index, decl_offset).unwrap();
    assert!(
        hover.contents.contains("[Alice](file:///demo.tm#Alice)"),
        "got {:?}",
        hover.contents
    );
}

#[test]
fn type_definition_skeleton_resolves_the_declaration() {
    let backend = &both_backends(GREETER_GRAMMAR)[0];
    let mut fx = fixture(backend, "file:///demo.tm", GREETER_INPUT);
    let document = fx.store.get("file:///demo.tm").unwrap().clone();

    let service = TypeDefinition::new(Box::new(DeclarationSite));
    let targets = service
        .find(
            &document,
            &fx.index,
            &mut fx.linker,
            20,
            &Cancellation::never(),
        )
        .unwrap();
    assert_eq!(targets, vec![("file:///demo.tm".into(), Span::new(7, 5))]);
}

#[test]
fn update_reparses_and_keeps_old_handles_valid() {
    for backend in both_backends(GREETER_GRAMMAR) {
        let mut store = DocumentStore::new();
        store.open("file:///demo.tm", GREETER_INPUT, &backend);
        let old_tree = store.get("file:///demo.tm").unwrap().tree().clone();

        store.update(
            "file:///demo.tm",
            &[tolmach_runtime::lr::Edit {
                from: 7,
                to: 12,
                insert: "Bob".into(),
            }],
            &backend,
        );

        let updated = store.get("file:///demo.tm").unwrap();
        assert_eq!(updated.version, 2);
        assert!(updated.text().starts_with("person Bob"));
        // The old handle still reads the old text.
        assert_eq!(old_tree.text(), GREETER_INPUT);
    }
}
