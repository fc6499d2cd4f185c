//! Byte spans over source text.
//!
//! The compiler front-end works in `rowan` text ranges; everything behind it
//! (grammar model, diagnostics, syntax trees, artifacts) uses this plain
//! serializable span so the core crate stays free of tree dependencies.

use serde::{Deserialize, Serialize};

/// A half-open byte range `[offset, offset + len)` into a source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub offset: u32,
    pub len: u32,
}

impl Span {
    #[inline]
    pub fn new(offset: u32, len: u32) -> Self {
        Self { offset, len }
    }

    /// Empty span at the given offset.
    #[inline]
    pub fn empty(offset: u32) -> Self {
        Self { offset, len: 0 }
    }

    #[inline]
    pub fn end(self) -> u32 {
        self.offset + self.len
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn contains(self, offset: u32) -> bool {
        self.offset <= offset && offset < self.end()
    }

    /// Smallest span covering both.
    pub fn cover(self, other: Span) -> Span {
        let start = self.offset.min(other.offset);
        let end = self.end().max(other.end());
        Span::new(start, end - start)
    }

    pub fn as_range(self) -> std::ops::Range<usize> {
        self.offset as usize..self.end() as usize
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.offset, self.end())
    }
}

impl From<std::ops::Range<usize>> for Span {
    fn from(range: std::ops::Range<usize>) -> Self {
        Span::new(range.start as u32, (range.end - range.start) as u32)
    }
}
