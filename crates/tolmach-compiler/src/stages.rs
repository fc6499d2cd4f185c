//! Typestate facade over the compilation pipeline:
//! `GrammarSource → GrammarParsed → GrammarAnalyzed → Translation/Artifacts`.
//!
//! Each stage owns its inputs and accumulated diagnostics; fatal errors
//! (fuel exhaustion) use the outer `Result`, everything else is a
//! diagnostic.

use tolmach_core::LineIndex;
use tolmach_core::diagnostics::Diagnostics;
use tolmach_core::grammar::Grammar;
use tolmach_core::tokens::{TokenClass, build_token_classes};

use crate::analysis::{DEFAULT_MAX_LOOKAHEAD, GrammarAnalysis};
use crate::artifacts::Artifacts;
use crate::syntax::{Parser, SyntaxNode, ast, lex};
use crate::translate::Translation;
use crate::{Result, model, translate, validate};

const DEFAULT_PARSE_FUEL: u32 = 1_000_000;
const DEFAULT_MAX_DEPTH: u32 = 512;

/// Entry point: a grammar source plus configuration.
pub struct GrammarSource {
    source: String,
    max_lookahead: usize,
    parse_fuel: u32,
    max_depth: u32,
}

impl GrammarSource {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            max_lookahead: DEFAULT_MAX_LOOKAHEAD,
            parse_fuel: DEFAULT_PARSE_FUEL,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Lookahead depth the predictive backend may peek; ambiguity beyond
    /// it is a grammar-compile diagnostic.
    pub fn with_max_lookahead(mut self, depth: usize) -> Self {
        self.max_lookahead = depth.max(1);
        self
    }

    pub fn with_parse_fuel(mut self, fuel: u32) -> Self {
        self.parse_fuel = fuel;
        self
    }

    pub fn with_recursion_limit(mut self, limit: u32) -> Self {
        self.max_depth = limit;
        self
    }

    pub fn parse(self) -> Result<GrammarParsed> {
        let tokens = lex(&self.source);
        let result = Parser::new(&self.source, tokens)
            .with_exec_fuel(self.parse_fuel)
            .with_recursion_limit(self.max_depth)
            .parse()?;

        let mut diagnostics = result.diagnostics;
        diagnostics.attach_positions(&LineIndex::new(&self.source));

        Ok(GrammarParsed {
            source: self.source,
            max_lookahead: self.max_lookahead,
            root: result.root,
            diagnostics,
        })
    }
}

/// A parsed grammar document: lossless CST plus parse diagnostics.
#[derive(Debug)]
pub struct GrammarParsed {
    source: String,
    max_lookahead: usize,
    root: SyntaxNode,
    diagnostics: Diagnostics,
}

impl GrammarParsed {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &SyntaxNode {
        &self.root
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Build the grammar model, derive token classes, validate, and run the
    /// lookahead analysis.
    pub fn analyze(mut self) -> GrammarAnalyzed {
        let root = ast::Root::cast(self.root.clone()).expect("parser always produces Root");

        let mut grammar = model::build_grammar(&root, &mut self.diagnostics);
        if grammar.name.is_empty() {
            grammar.name = "grammar".to_string();
        }
        validate::validate_grammar(&grammar, &mut self.diagnostics);
        let analysis =
            GrammarAnalysis::compute(&grammar, self.max_lookahead, &mut self.diagnostics);
        let token_classes = build_token_classes(&grammar);

        self.diagnostics
            .attach_positions(&LineIndex::new(&self.source));

        GrammarAnalyzed {
            source: self.source,
            grammar,
            token_classes,
            analysis,
            diagnostics: self.diagnostics,
        }
    }
}

/// A validated grammar: model, token classes, and lookahead analysis.
#[derive(Debug)]
pub struct GrammarAnalyzed {
    source: String,
    grammar: Grammar,
    token_classes: Vec<TokenClass>,
    analysis: GrammarAnalysis,
    diagnostics: Diagnostics,
}

impl GrammarAnalyzed {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn token_classes(&self) -> &[TokenClass] {
        &self.token_classes
    }

    pub fn analysis(&self) -> &GrammarAnalysis {
        &self.analysis
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn is_valid(&self) -> bool {
        !self.diagnostics.has_errors()
    }

    /// Run the LR translator. Deterministic; validation findings ride
    /// along in the result.
    pub fn translate(&self) -> Translation {
        translate::translate(&self.grammar)
    }

    /// Produce the three generator artifacts. The generator proceeds only
    /// when no error-severity diagnostic exists; otherwise the batch is
    /// returned.
    pub fn compile(&self) -> std::result::Result<Artifacts, Diagnostics> {
        crate::artifacts::compile(self)
    }

    /// Decompose into the parts a runtime needs to interpret the grammar.
    pub fn into_runtime_parts(self) -> (Grammar, Vec<TokenClass>, GrammarAnalysis) {
        (self.grammar, self.token_classes, self.analysis)
    }
}
