//! The persisted generator artifacts.
//!
//! Three outputs, produced offline and loaded by the LR runtime adapter at
//! startup: the binary parse-table module (postcard payload in the common
//! artifact envelope), the field-map JSON, and the keywords JSON. The
//! runtime keeps no other on-disk state.

use tolmach_core::binary::{self, ArtifactError};
use tolmach_core::diagnostics::Diagnostics;

use crate::stages::GrammarAnalyzed;
use crate::tablegen::{self, ParseTable};
use crate::translate::FieldMap;

/// The artifact bundle as the LR adapter consumes it.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub tables: ParseTable,
    pub field_map: FieldMap,
    pub keywords: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Tables(#[from] ArtifactError),

    #[error("malformed JSON artifact: {0}")]
    Json(#[from] serde_json::Error),
}

impl Artifacts {
    /// Binary parse-table module.
    pub fn encode_tables(&self) -> Vec<u8> {
        binary::encode(&self.tables)
    }

    pub fn field_map_json(&self) -> String {
        self.field_map.to_json()
    }

    pub fn keywords_json(&self) -> String {
        serde_json::to_string_pretty(&self.keywords)
            .expect("keyword serialization should not fail")
    }

    /// Load the bundle back from its three serialized forms.
    pub fn load(
        tables_bin: &[u8],
        field_map_json: &str,
        keywords_json: &str,
    ) -> Result<Self, LoadError> {
        let mut tables: ParseTable = binary::decode(tables_bin)?;
        tables.interner.rehydrate();
        Ok(Self {
            tables,
            field_map: FieldMap::from_json(field_map_json)?,
            keywords: serde_json::from_str(keywords_json)?,
        })
    }
}

/// Run the generator: translation, then table construction. Proceeds only
/// when no error-severity diagnostic exists; otherwise the whole batch is
/// handed back.
pub fn compile(analyzed: &GrammarAnalyzed) -> Result<Artifacts, Diagnostics> {
    let translation = analyzed.translate();

    let mut diagnostics = Diagnostics::new();
    diagnostics.extend(translation.diagnostics.clone());

    if diagnostics.has_errors() {
        return Err(diagnostics);
    }

    let tables = tablegen::build_tables(analyzed.grammar(), &translation.lowered, &mut diagnostics);
    if diagnostics.has_errors() {
        return Err(diagnostics);
    }

    Ok(Artifacts {
        tables,
        field_map: translation.field_map,
        keywords: translation.keyword_set,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GrammarSource;

    fn artifacts_for(source: &str) -> Artifacts {
        let analyzed = GrammarSource::new(source)
            .parse()
            .expect("within fuel limits")
            .analyze();
        assert!(
            analyzed.is_valid(),
            "grammar has errors:\n{}",
            analyzed.diagnostics().printer().source(source).render()
        );
        analyzed.compile().expect("generator should succeed")
    }

    #[test]
    fn round_trip_through_serialized_forms() {
        let artifacts = artifacts_for(
            "entry Model: 'model' name=ID; \
             terminal ID: /[_a-zA-Z][a-zA-Z0-9_]*/; \
             hidden terminal WS: /[ \\t\\r\\n]+/;",
        );

        let bin = artifacts.encode_tables();
        let loaded = Artifacts::load(
            &bin,
            &artifacts.field_map_json(),
            &artifacts.keywords_json(),
        )
        .expect("load should succeed");

        assert_eq!(loaded.keywords, vec!["model".to_string()]);
        assert_eq!(loaded.tables.actions.len(), artifacts.tables.actions.len());
        assert_eq!(
            loaded.field_map.entries(0),
            artifacts.field_map.entries(0)
        );
    }

    #[test]
    fn corrupted_tables_are_rejected() {
        let artifacts = artifacts_for("entry A: 'a' x=ID; terminal ID: /[a-z]+/;");
        let mut bin = artifacts.encode_tables();
        let last = bin.len() - 1;
        bin[last] ^= 0x55;

        assert!(Artifacts::load(&bin, "{}", "[]").is_err());
    }

    #[test]
    fn invalid_grammar_stops_the_generator() {
        let analyzed = GrammarSource::new("entry A: x=Missing;")
            .parse()
            .unwrap()
            .analyze();
        let result = analyzed.compile();
        assert!(result.is_err());
        assert!(result.unwrap_err().has_errors());
    }
}
