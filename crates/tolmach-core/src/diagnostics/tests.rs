use super::*;
use crate::span::Span;

#[test]
fn wire_format_is_exact() {
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .error(Stage::Parser, Span::new(0, 7))
        .message("unexpected token")
        .emit();

    let json = serde_json::to_string(&diagnostics.as_slice()[0]).unwrap();
    assert_eq!(
        json,
        r#"{"message":"unexpected token","offset":0,"length":7,"severity":"error","source":"parser"}"#
    );
}

#[test]
fn wire_format_carries_positions_once_attached() {
    let source = "first\ninvalid";
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .error(Stage::Parser, Span::new(6, 7))
        .message("unexpected token")
        .emit();
    diagnostics.attach_positions(&crate::LineIndex::new(source));

    let json = serde_json::to_string(&diagnostics.as_slice()[0]).unwrap();
    assert_eq!(
        json,
        r#"{"message":"unexpected token","offset":6,"length":7,"line":1,"column":0,"severity":"error","source":"parser"}"#
    );
}

#[test]
fn fixes_and_related_stay_off_the_wire() {
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .warning(Stage::Validation, Span::new(3, 2))
        .message("duplicate mapping")
        .related_to("first mapping here", Span::new(0, 2))
        .fix("remove the duplicate", "")
        .emit();

    let json = serde_json::to_string(&diagnostics.as_slice()[0]).unwrap();
    assert!(!json.contains("related"));
    assert!(!json.contains("fix"));
}

#[test]
fn has_errors_ignores_warnings() {
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .warning(Stage::Validation, Span::empty(0))
        .message("just a warning")
        .emit();

    assert!(!diagnostics.has_errors());
    assert_eq!(diagnostics.warning_count(), 1);

    diagnostics
        .error(Stage::Lexer, Span::empty(0))
        .message("now an error")
        .emit();
    assert!(diagnostics.has_errors());
}

#[test]
fn plain_rendering_without_source() {
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .error(Stage::Lexer, Span::new(2, 1))
        .message("unrecognized character")
        .emit();

    let rendered = diagnostics.printer().render();
    assert_eq!(rendered, "error at 2..3: unrecognized character");
}

#[test]
fn snippet_rendering_points_at_span() {
    let source = "model \u{1}x";
    let mut diagnostics = Diagnostics::new();
    diagnostics
        .error(Stage::Lexer, Span::new(6, 1))
        .message("unrecognized character")
        .emit();

    let rendered = diagnostics.printer().source(source).render();
    assert!(rendered.contains("unrecognized character"));
    assert!(rendered.contains("^"));
}
