//! Syntax kinds for the grammar language.
//!
//! `SyntaxKind` serves dual roles: token kinds (from lexer) and node kinds
//! (from parser). Logos derives token recognition; node kinds lack
//! token/regex attributes. `GrammarLang` implements Rowan's `Language`
//! trait for tree construction.

#![allow(dead_code)] // Some items are for future use

use logos::Logos;
use rowan::Language;

/// All token and node kinds. Tokens first, then nodes, then `__LAST`
/// sentinel. `#[repr(u16)]` enables safe transmute in `kind_from_raw`.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum SyntaxKind {
    #[token("(")]
    ParenOpen = 0,

    #[token(")")]
    ParenClose,

    #[token("{")]
    BraceOpen,

    #[token("}")]
    BraceClose,

    #[token("[")]
    BracketOpen,

    #[token("]")]
    BracketClose,

    #[token(":")]
    Colon,

    #[token(";")]
    Semicolon,

    /// `+=` before `+` and `=` for correct precedence.
    #[token("+=")]
    PlusEquals,

    /// `?=` before `?` and `=`.
    #[token("?=")]
    QuestionEquals,

    /// `=>` before `=`.
    #[token("=>")]
    FatArrow,

    #[token("=")]
    Equals,

    #[token("|")]
    Pipe,

    #[token("*")]
    Star,

    #[token("+")]
    Plus,

    #[token("?")]
    Question,

    #[token(",")]
    Comma,

    #[token(".")]
    Dot,

    #[token("@")]
    At,

    #[token(">")]
    Gt,

    /// Terminal body `/…/`. The first body character may not be `*` so
    /// block comments never lex as regexes.
    #[regex(r"/(?:[^/\\\n*]|\\.)(?:[^/\\\n]|\\.)*/")]
    RegexLiteral,

    #[regex(r#""(?:[^"\\]|\\.)*""#)]
    #[regex(r"'(?:[^'\\]|\\.)*'")]
    #[doc(hidden)]
    StringLiteral, // Lexer-internal only

    DoubleQuote,
    SingleQuote,
    /// String content between quotes
    StrVal,

    #[regex(r"[0-9]+")]
    Int,

    #[token("grammar")]
    KwGrammar,

    #[token("entry")]
    KwEntry,

    #[token("terminal")]
    KwTerminal,

    #[token("hidden")]
    KwHidden,

    #[token("returns")]
    KwReturns,

    #[token("precedence")]
    KwPrecedence,

    #[token("conflicts")]
    KwConflicts,

    #[token("specialize")]
    KwSpecialize,

    #[token("extend")]
    KwExtend,

    #[token("external")]
    KwExternal,

    #[token("tokens")]
    KwTokens,

    #[token("context")]
    KwContext,

    #[token("local")]
    KwLocal,

    #[token("in")]
    KwIn,

    #[token("infix")]
    KwInfix,

    #[token("on")]
    KwOn,

    #[token("left")]
    KwLeft,

    #[token("right")]
    KwRight,

    #[token("nonassoc")]
    KwNonassoc,

    #[token("assoc")]
    KwAssoc,

    #[token("from")]
    KwFrom,

    #[token("else")]
    KwElse,

    /// Identifier. Defined after keywords so they take precedence.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Id,

    #[regex(r"[ \t]+")]
    Whitespace,

    #[token("\n")]
    #[token("\r\n")]
    Newline,

    #[regex(r"//[^\n]*", allow_greedy = true)]
    LineComment,

    #[regex(r"/\*(?:[^*]|\*[^/])*\*/")]
    BlockComment,

    /// Coalesced unrecognized characters
    Garbage,
    Error,

    // --- Node kinds (non-terminals) ---
    Root,
    GrammarDecl,
    Rule,
    Terminal,
    Annotation,
    PrecBlock,
    PrecLevel,
    ConflictsBlock,
    ConflictSet,
    SpecializeBlock,
    ExtendBlock,
    Mapping,
    ExternalTokens,
    ExternalContext,
    LocalTokens,
    LocalTokenDef,
    ElseBranch,
    InfixDecl,
    InfixGroup,
    Alt,
    Seq,
    Quantified,
    Assignment,
    CrossRef,
    Action,
    Literal,
    Ref,
    Paren,

    // Must be last - used for bounds checking in `kind_from_raw`
    #[doc(hidden)]
    __LAST,
}

use SyntaxKind::*;

impl SyntaxKind {
    #[inline]
    pub fn is_trivia(self) -> bool {
        matches!(self, Whitespace | Newline | LineComment | BlockComment)
    }

    #[inline]
    pub fn is_error(self) -> bool {
        matches!(self, Error | Garbage)
    }

    /// Contextual keywords double as plain names in declarations.
    #[inline]
    pub fn is_name(self) -> bool {
        matches!(
            self,
            Id | KwTokens | KwContext | KwLeft | KwRight | KwAssoc | KwOn | KwIn | KwFrom
        )
    }
}

impl From<SyntaxKind> for rowan::SyntaxKind {
    #[inline]
    fn from(kind: SyntaxKind) -> Self {
        Self(kind as u16)
    }
}

/// Language tag for Rowan's tree types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GrammarLang {}

impl Language for GrammarLang {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        assert!(raw.0 < __LAST as u16);
        // SAFETY: We've verified the value is in bounds, and SyntaxKind is repr(u16)
        unsafe { std::mem::transmute::<u16, SyntaxKind>(raw.0) }
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind.into()
    }
}

/// Type aliases for Rowan types parameterized by our language.
pub type SyntaxNode = rowan::SyntaxNode<GrammarLang>;
pub type SyntaxToken = rowan::SyntaxToken<GrammarLang>;
pub type SyntaxElement = rowan::NodeOrToken<SyntaxNode, SyntaxToken>;

/// 64-bit bitset of `SyntaxKind`s for O(1) membership testing.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TokenSet(u64);

impl TokenSet {
    /// Creates an empty token set.
    pub const EMPTY: TokenSet = TokenSet(0);

    /// Panics at compile time if any kind's discriminant >= 64.
    #[inline]
    pub const fn new(kinds: &[SyntaxKind]) -> Self {
        let mut bits = 0u64;
        let mut i = 0;
        while i < kinds.len() {
            let kind = kinds[i] as u16;
            assert!(kind < 64, "SyntaxKind value exceeds TokenSet capacity");
            bits |= 1 << kind;
            i += 1;
        }
        TokenSet(bits)
    }

    #[inline]
    pub const fn contains(&self, kind: SyntaxKind) -> bool {
        let kind = kind as u16;
        if kind >= 64 {
            return false;
        }
        self.0 & (1 << kind) != 0
    }

    #[inline]
    pub const fn union(self, other: TokenSet) -> TokenSet {
        TokenSet(self.0 | other.0)
    }
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut list = f.debug_set();
        for i in 0..64u16 {
            if self.0 & (1 << i) != 0 && i < __LAST as u16 {
                let kind: SyntaxKind = unsafe { std::mem::transmute(i) };
                list.entry(&kind);
            }
        }
        list.finish()
    }
}

/// Pre-defined token sets for the parser.
pub mod token_sets {
    use super::*;

    /// Names, including contextual keywords.
    pub const NAME: TokenSet = TokenSet::new(&[
        Id, KwTokens, KwContext, KwLeft, KwRight, KwAssoc, KwOn, KwIn, KwFrom,
    ]);

    /// FIRST set of a body expression.
    pub const EXPR_FIRST: TokenSet = TokenSet::new(&[
        ParenOpen,
        BracketOpen,
        BraceOpen,
        DoubleQuote,
        SingleQuote,
        Id,
        KwTokens,
        KwContext,
        KwLeft,
        KwRight,
        KwAssoc,
        KwOn,
        KwIn,
        KwFrom,
    ]);

    /// FIRST set of a top-level item.
    pub const ITEM_FIRST: TokenSet = TokenSet::new(&[
        At,
        KwGrammar,
        KwEntry,
        KwTerminal,
        KwHidden,
        KwPrecedence,
        KwConflicts,
        KwSpecialize,
        KwExtend,
        KwExternal,
        KwLocal,
        KwInfix,
        Id,
    ]);

    pub const CARDINALITIES: TokenSet = TokenSet::new(&[Question, Star, Plus]);

    pub const ASSIGN_OPS: TokenSet = TokenSet::new(&[Equals, PlusEquals, QuestionEquals]);

    pub const TRIVIA: TokenSet = TokenSet::new(&[Whitespace, Newline, LineComment, BlockComment]);

    /// Sync points when recovering inside a rule body.
    pub const BODY_RECOVERY: TokenSet = TokenSet::new(&[Semicolon, Pipe, ParenClose, BraceClose]);

    /// Sync points when recovering inside an extension block.
    pub const BLOCK_RECOVERY: TokenSet = TokenSet::new(&[Semicolon, BraceClose]);

    /// Unambiguous starts of a new top-level item; extension-block loops
    /// bail when they see one.
    pub const BLOCK_BAIL: TokenSet = TokenSet::new(&[
        KwGrammar,
        KwEntry,
        KwTerminal,
        KwHidden,
        KwPrecedence,
        KwConflicts,
        KwSpecialize,
        KwExtend,
        KwExternal,
        KwLocal,
        KwInfix,
    ]);
}
