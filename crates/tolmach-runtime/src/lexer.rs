//! Document tokenizer shared by both backends.
//!
//! Terminal classes compile to dense DFAs searched anchored at the cursor;
//! the longest match wins, with declaration order breaking ties. Keyword
//! literals that do not look like identifiers match directly; identifier-
//! like keywords lex as the base identifier terminal and are promoted by
//! the parsers where the grammar lists them. `specialize` promotions apply
//! unconditionally at the lexer. Unrecognized characters coalesce into
//! single garbage tokens with a lexer diagnostic each.

use std::collections::HashMap;

use regex_automata::dfa::{Automaton, dense};
use regex_automata::{Anchored, Input};

use tolmach_core::diagnostics::{Diagnostics, Severity, Stage};
use tolmach_core::grammar::{Grammar, PromotionMode};
use tolmach_core::tokens::TokenSym;
use tolmach_core::{Span, Symbol};

use tolmach_compiler::tablegen::ParseTable;

/// One document token. Hidden tokens become trivia in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocToken {
    pub sym: TokenSym,
    pub span: Span,
    pub hidden: bool,
}

struct CompiledTerminal {
    name: Symbol,
    dfa: dense::DFA<Vec<u32>>,
    hidden: bool,
}

/// Compiled tokenizer for one grammar.
pub struct Tokenizer {
    terminals: Vec<CompiledTerminal>,
    /// Non-identifier-like keyword literals, longest first.
    literal_keywords: Vec<(String, Symbol)>,
    /// `specialize` promotions: literal text → promoted class.
    specialize: HashMap<String, Symbol>,
    /// `extend` promotions: literal text → promoted class (contextual,
    /// applied by the parsers).
    extend: HashMap<String, Symbol>,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenizerError {
    #[error("terminal `{name}` failed to compile: {source}")]
    BadTerminal {
        name: String,
        source: Box<dense::BuildError>,
    },
}

impl Tokenizer {
    /// Build from the grammar model (the predictive backend's path).
    pub fn from_grammar(grammar: &Grammar) -> Result<Self, TokenizerError> {
        let terminals = grammar
            .terminals
            .iter()
            .map(|t| (t.name, t.regex.as_str(), t.hidden));
        let keywords = grammar_keywords(grammar);
        let promotions = grammar.promotions.iter().flat_map(|p| {
            let specialize = p.mode == PromotionMode::Specialize;
            p.mappings
                .iter()
                .map(move |&(lit, class)| (lit, class, specialize))
        });
        Self::build(
            |sym| grammar.resolve(sym).to_string(),
            terminals,
            keywords,
            promotions,
        )
    }

    /// Build from the compiled tables (the LR adapter's path).
    pub fn from_tables(tables: &ParseTable) -> Result<Self, TokenizerError> {
        let terminals = tables
            .terminals
            .iter()
            .map(|t| (t.name, t.regex.as_str(), t.hidden));
        let keywords = tables.tokens.iter().filter_map(|tok| match tok {
            TokenSym::Keyword(sym) => Some(*sym),
            TokenSym::Terminal(_) => None,
        });
        let promotions = tables
            .promotions
            .iter()
            .map(|p| (p.literal, p.class, p.specialize));
        Self::build(
            |sym| tables.interner.resolve(sym).to_string(),
            terminals,
            keywords,
            promotions,
        )
    }

    fn build<'a>(
        resolve: impl Fn(Symbol) -> String,
        terminals: impl Iterator<Item = (Symbol, &'a str, bool)>,
        keywords: impl Iterator<Item = Symbol>,
        promotions: impl Iterator<Item = (Symbol, Symbol, bool)>,
    ) -> Result<Self, TokenizerError> {
        let mut compiled = Vec::new();
        for (name, regex, hidden) in terminals {
            let dfa = dense::DFA::new(regex).map_err(|source| TokenizerError::BadTerminal {
                name: resolve(name),
                source: Box::new(source),
            })?;
            compiled.push(CompiledTerminal { name, dfa, hidden });
        }

        let mut literal_keywords: Vec<(String, Symbol)> = keywords
            .filter_map(|sym| {
                let text = resolve(sym);
                (!tolmach_core::tokens::is_identifier_like(&text)).then_some((text, sym))
            })
            .collect();
        literal_keywords.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let mut specialize = HashMap::new();
        let mut extend = HashMap::new();
        for (literal, class, is_specialize) in promotions {
            let text = resolve(literal);
            let target = if is_specialize {
                &mut specialize
            } else {
                &mut extend
            };
            // First mapping wins; duplicates were already warned about.
            target.entry(text).or_insert(class);
        }

        Ok(Self {
            terminals: compiled,
            literal_keywords,
            specialize,
            extend,
        })
    }

    /// Contextual promotion table for `extend` groups.
    pub fn extend_class(&self, text: &str) -> Option<Symbol> {
        self.extend.get(text).copied()
    }

    /// Longest match at `offset`: `(token, length, hidden)`.
    /// `None` means no rule matches the character at `offset`.
    pub fn next_token(&self, text: &str, offset: usize) -> Option<(TokenSym, usize, bool)> {
        let bytes = text.as_bytes();

        let mut best: Option<(TokenSym, usize, bool)> = None;
        for terminal in &self.terminals {
            if let Some(len) = dfa_match_len(&terminal.dfa, bytes, offset)
                && best.is_none_or(|(_, best_len, _)| len > best_len)
            {
                best = Some((TokenSym::Terminal(terminal.name), len, terminal.hidden));
            }
        }

        for (literal, sym) in &self.literal_keywords {
            if text[offset..].starts_with(literal.as_str()) {
                let len = literal.len();
                // Keywords beat terminal matches of the same length.
                if best.is_none_or(|(_, best_len, _)| len >= best_len) {
                    best = Some((TokenSym::Keyword(*sym), len, false));
                }
                break;
            }
        }

        // Specialized literals replace the base token unconditionally.
        if let Some((TokenSym::Terminal(_), len, hidden)) = best
            && let Some(&class) = self.specialize.get(&text[offset..offset + len])
        {
            best = Some((TokenSym::Terminal(class), len, hidden));
        }

        best
    }

    /// Tokenize a whole document. Unrecognized characters coalesce into
    /// garbage spans, one lexer diagnostic each; garbage carries no token.
    pub fn tokenize(&self, text: &str, diagnostics: &mut Diagnostics) -> Vec<DocToken> {
        let mut tokens = Vec::new();
        let mut offset = 0;
        let mut garbage_start: Option<usize> = None;

        while offset < text.len() {
            match self.next_token(text, offset) {
                Some((sym, len, hidden)) if len > 0 => {
                    if let Some(start) = garbage_start.take() {
                        self.report_garbage(start, offset, diagnostics);
                    }
                    tokens.push(DocToken {
                        sym,
                        span: Span::new(offset as u32, len as u32),
                        hidden,
                    });
                    offset += len;
                }
                _ => {
                    if garbage_start.is_none() {
                        garbage_start = Some(offset);
                    }
                    offset += text[offset..]
                        .chars()
                        .next()
                        .map_or(1, |c| c.len_utf8());
                }
            }
        }

        if let Some(start) = garbage_start.take() {
            self.report_garbage(start, text.len(), diagnostics);
        }

        tokens
    }

    fn report_garbage(&self, start: usize, end: usize, diagnostics: &mut Diagnostics) {
        diagnostics
            .report(
                Severity::Error,
                Stage::Lexer,
                Span::new(start as u32, (end - start) as u32),
            )
            .message("unrecognized character")
            .emit();
    }
}

/// Anchored longest-match search from `offset`; zero-length matches are
/// discarded so the lexer always makes progress.
fn dfa_match_len(dfa: &dense::DFA<Vec<u32>>, bytes: &[u8], offset: usize) -> Option<usize> {
    let input = Input::new(bytes).range(offset..).anchored(Anchored::Yes);
    match dfa.try_search_fwd(&input) {
        Ok(Some(half)) if half.offset() > offset => Some(half.offset() - offset),
        _ => None,
    }
}

/// Keyword literals reachable in the grammar, for the predictive path.
fn grammar_keywords(grammar: &Grammar) -> impl Iterator<Item = Symbol> + '_ {
    tolmach_core::tokens::build_token_classes(grammar)
        .into_iter()
        .filter(|c| c.is_keyword())
        .map(|c| c.name)
        .collect::<Vec<_>>()
        .into_iter()
}
