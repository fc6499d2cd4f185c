//! The LR translator: `grammar → { grammar_text, field_map, keyword_set,
//! diagnostics }`.
//!
//! A deterministic function over the grammar model. Validation runs first
//! and its findings ride along in the result; table generation downstream
//! proceeds only when no error-severity diagnostic exists.

mod emit;
mod lower;

#[cfg(test)]
mod translate_tests;

pub use lower::{
    BuildKind, FieldBinding, LSym, LoweredGrammar, Nonterminal, NtId, PrecRef, Production,
    lower_grammar,
};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use tolmach_core::diagnostics::Diagnostics;
use tolmach_core::grammar::Grammar;
use tolmach_core::tokens::{TokenClass, build_token_classes};

/// One field-map entry: assignment identity for a child position of a
/// lowered production. Cross-reference assignments carry their target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapEntry {
    pub index: u32,
    pub name: String,
    pub op: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// The field-map artifact: production id → assignment identities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMap {
    #[serde(flatten)]
    pub productions: IndexMap<String, Vec<FieldMapEntry>>,
}

impl FieldMap {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).expect("field map serialization should not fail")
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn entries(&self, production: usize) -> &[FieldMapEntry] {
        self.productions
            .get(&production.to_string())
            .map_or(&[], |v| v.as_slice())
    }
}

/// Output of the translator.
#[derive(Debug, Clone)]
pub struct Translation {
    pub grammar_text: String,
    pub field_map: FieldMap,
    pub keyword_set: Vec<String>,
    pub diagnostics: Diagnostics,
    /// The desugared productions behind the text; input to table
    /// generation.
    pub lowered: LoweredGrammar,
}

impl Translation {
    pub fn keywords_json(&self) -> String {
        serde_json::to_string_pretty(&self.keyword_set)
            .expect("keyword set serialization should not fail")
    }
}

/// Translate a grammar model into its LR artifacts.
pub fn translate(grammar: &Grammar) -> Translation {
    let mut diagnostics = Diagnostics::new();
    crate::validate::validate_grammar(grammar, &mut diagnostics);

    let token_classes = build_token_classes(grammar);
    let lowered = lower_grammar(grammar);
    let grammar_text = emit::emit_grammar_text(grammar, &lowered);
    let field_map = build_field_map(grammar, &lowered);
    let keyword_set = build_keyword_set(grammar, &token_classes);

    Translation {
        grammar_text,
        field_map,
        keyword_set,
        diagnostics,
        lowered,
    }
}

fn build_field_map(grammar: &Grammar, lowered: &LoweredGrammar) -> FieldMap {
    let mut productions = IndexMap::new();
    for (id, production) in lowered.productions.iter().enumerate() {
        if production.fields.is_empty() {
            continue;
        }
        let entries = production
            .fields
            .iter()
            .map(|binding| FieldMapEntry {
                index: binding.index,
                name: grammar.resolve(binding.id.field).to_string(),
                op: binding.id.op.as_str().to_string(),
                reference: binding
                    .id
                    .reference
                    .map(|target| grammar.resolve(target).to_string()),
            })
            .collect();
        productions.insert(id.to_string(), entries);
    }
    FieldMap { productions }
}

/// Keyword literals in token-class order, then promotion sources.
fn build_keyword_set(grammar: &Grammar, token_classes: &[TokenClass]) -> Vec<String> {
    let mut keywords: Vec<String> = token_classes
        .iter()
        .filter(|c| c.is_keyword())
        .map(|c| grammar.resolve(c.name).to_string())
        .collect();

    for promotion in &grammar.promotions {
        for &(literal, _) in &promotion.mappings {
            let text = grammar.resolve(literal);
            if !keywords.iter().any(|k| k == text) {
                keywords.push(text.to_string());
            }
        }
    }

    keywords
}
