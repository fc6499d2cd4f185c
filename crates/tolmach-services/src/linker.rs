//! Cross-reference resolution against the index.
//!
//! A descriptor transitions `unresolved → resolved | unresolvable`;
//! `unresolvable` is stable until the document re-indexes. Resolution is
//! on demand, per descriptor, with "did you mean" suggestions computed by
//! edit distance over the candidate names.

use std::collections::HashMap;

use tolmach_core::diagnostics::{Diagnostic, Severity, Stage};
use tolmach_core::{Interner, Span};
use tolmach_runtime::ast::RefDescriptor;

use crate::documents::{IndexManager, SymbolEntry};

/// Cached outcome per descriptor site.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Resolution {
    Resolved(usize),
    Unresolvable,
}

/// The linker: descriptor → declaration, cached until re-index.
#[derive(Default)]
pub struct Linker {
    cache: HashMap<(String, Span), Resolution>,
    generation: u64,
}

impl Linker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a descriptor from a document against the index. `None`
    /// means unresolvable; the verdict is cached until the index moves.
    pub fn resolve<'i>(
        &mut self,
        index: &'i IndexManager,
        interner: &Interner,
        uri: &str,
        descriptor: &RefDescriptor,
    ) -> Option<&'i SymbolEntry> {
        if self.generation != index.generation() {
            self.cache.clear();
            self.generation = index.generation();
        }

        let key = (uri.to_string(), descriptor.source_segment);
        if let Some(cached) = self.cache.get(&key) {
            return match cached {
                Resolution::Resolved(idx) => index.symbols().get(*idx),
                Resolution::Unresolvable => None,
            };
        }

        let target_kind = interner.resolve(descriptor.target_kind);
        let found = index.symbols().iter().position(|symbol| {
            symbol.name == descriptor.target_name
                && interner.resolve(symbol.type_name) == target_kind
        });

        match found {
            Some(idx) => {
                self.cache.insert(key, Resolution::Resolved(idx));
                index.symbols().get(idx)
            }
            None => {
                self.cache.insert(key, Resolution::Unresolvable);
                None
            }
        }
    }

    /// The warning squiggle for an unresolved descriptor, with a nearby
    /// candidate suggested when one exists.
    pub fn unresolved_diagnostic(
        &self,
        index: &IndexManager,
        interner: &Interner,
        descriptor: &RefDescriptor,
    ) -> Diagnostic {
        let target_kind = interner.resolve(descriptor.target_kind);
        let candidates: Vec<&str> = index
            .symbols()
            .iter()
            .filter(|s| interner.resolve(s.type_name) == target_kind)
            .map(|s| s.name.as_str())
            .collect();

        let suggestion = closest_match(&descriptor.target_name, &candidates, 2)
            .map(|c| format!("; did you mean `{c}`?"))
            .unwrap_or_default();

        let mut diagnostic = Diagnostic::new(
            Severity::Warning,
            Stage::Validation,
            descriptor.source_segment,
        );
        diagnostic.message = format!(
            "could not resolve reference to {target_kind} `{}`{suggestion}",
            descriptor.target_name
        );
        diagnostic
    }
}

/// Levenshtein distance with a single rolling row; the diagonal cell is
/// carried by hand.
fn edit_distance(from: &str, to: &str) -> usize {
    let to_chars: Vec<char> = to.chars().collect();
    if to_chars.is_empty() {
        return from.chars().count();
    }

    let mut row: Vec<usize> = (0..=to_chars.len()).collect();
    for (i, from_char) in from.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, &to_char) in to_chars.iter().enumerate() {
            let substitute = diagonal + usize::from(from_char != to_char);
            diagonal = row[j + 1];
            row[j + 1] = substitute.min(row[j] + 1).min(diagonal + 1);
        }
    }

    row[to_chars.len()]
}

/// The candidate nearest to `name`, if any lies within `max_distance`.
fn closest_match<'c>(name: &str, candidates: &[&'c str], max_distance: usize) -> Option<&'c str> {
    let mut best: Option<(&'c str, usize)> = None;
    for &candidate in candidates {
        let distance = edit_distance(name, candidate);
        if distance > max_distance {
            continue;
        }
        if best.is_none_or(|(_, best_distance)| distance < best_distance) {
            best = Some((candidate, distance));
        }
    }
    best.map(|(candidate, _)| candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_distance_basics() {
        assert_eq!(edit_distance("alice", "alice"), 0);
        assert_eq!(edit_distance("alice", "alicf"), 1);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("abc", ""), 3);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn closest_match_respects_the_cutoff() {
        let candidates = ["alice", "bob"];
        assert_eq!(closest_match("alcie", &candidates, 2), Some("alice"));
        assert_eq!(closest_match("zzzzz", &candidates, 2), None);
    }

    #[test]
    fn closest_match_prefers_the_nearer_candidate() {
        let candidates = ["alpha", "alphb"];
        assert_eq!(closest_match("alpha", &candidates, 2), Some("alpha"));
    }
}
