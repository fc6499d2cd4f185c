use super::kinds::SyntaxKind;
use super::lexer::lex;

fn kinds(source: &str) -> Vec<SyntaxKind> {
    lex(source).into_iter().map(|t| t.kind).collect()
}

#[test]
fn punctuation_and_compound_operators() {
    use SyntaxKind::*;
    assert_eq!(
        kinds("= += ?= =>"),
        vec![
            Equals, Whitespace, PlusEquals, Whitespace, QuestionEquals, Whitespace, FatArrow
        ]
    );
}

#[test]
fn keywords_take_precedence_over_identifiers() {
    use SyntaxKind::*;
    assert_eq!(
        kinds("entry terminal entries"),
        vec![KwEntry, Whitespace, KwTerminal, Whitespace, Id]
    );
}

#[test]
fn regex_literal_is_not_a_comment() {
    use SyntaxKind::*;
    assert_eq!(kinds(r"/\s+/"), vec![RegexLiteral]);
    assert_eq!(kinds("// line"), vec![LineComment]);
    assert_eq!(kinds("/* block */"), vec![BlockComment]);
}

#[test]
fn regex_literal_with_escaped_slash() {
    let tokens = lex(r"/a\/b/");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, SyntaxKind::RegexLiteral);
}

#[test]
fn string_literals_split_into_quote_content_quote() {
    use SyntaxKind::*;
    assert_eq!(kinds("'model'"), vec![SingleQuote, StrVal, SingleQuote]);
    assert_eq!(kinds(r#""if""#), vec![DoubleQuote, StrVal, DoubleQuote]);
    // Empty literal has no content token.
    assert_eq!(kinds("''"), vec![SingleQuote, SingleQuote]);
}

#[test]
fn garbage_is_coalesced() {
    let source = "entry \u{1}\u{2}\u{3} Model";
    let tokens = lex(source);
    let garbage: Vec<_> = tokens
        .iter()
        .filter(|t| t.kind == SyntaxKind::Garbage)
        .collect();
    assert_eq!(garbage.len(), 1);
    assert_eq!(garbage[0].text(source), "\u{1}\u{2}\u{3}");
}

#[test]
fn spans_tile_the_source() {
    let source = "entry Model: 'model' name=ID;";
    let tokens = lex(source);
    let mut offset = 0u32;
    for token in &tokens {
        assert_eq!(u32::from(token.span.start()), offset);
        offset = token.span.end().into();
    }
    assert_eq!(offset as usize, source.len());
}
