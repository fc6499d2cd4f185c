//! Typed AST wrappers over CST nodes.
//!
//! Each struct wraps a `SyntaxNode` and provides typed accessors.
//! Cast is infallible for correct `SyntaxKind` - validation happens elsewhere.

use super::kinds::{SyntaxKind, SyntaxNode, SyntaxToken};

macro_rules! ast_node {
    ($name:ident, $kind:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(SyntaxNode);

        impl $name {
            pub fn cast(node: SyntaxNode) -> Option<Self> {
                (node.kind() == SyntaxKind::$kind).then(|| Self(node))
            }

            pub fn as_cst(&self) -> &SyntaxNode {
                &self.0
            }
        }
    };
}

ast_node!(Root, Root);
ast_node!(GrammarDecl, GrammarDecl);
ast_node!(RuleNode, Rule);
ast_node!(Annotation, Annotation);
ast_node!(TerminalNode, Terminal);
ast_node!(PrecBlock, PrecBlock);
ast_node!(PrecLevel, PrecLevel);
ast_node!(ConflictsBlock, ConflictsBlock);
ast_node!(ConflictSet, ConflictSet);
ast_node!(Mapping, Mapping);
ast_node!(ExternalTokensNode, ExternalTokens);
ast_node!(ExternalContextNode, ExternalContext);
ast_node!(LocalTokensNode, LocalTokens);
ast_node!(LocalTokenDef, LocalTokenDef);
ast_node!(ElseBranch, ElseBranch);
ast_node!(InfixDecl, InfixDecl);
ast_node!(InfixGroup, InfixGroup);
ast_node!(Alt, Alt);
ast_node!(Seq, Seq);
ast_node!(Quantified, Quantified);
ast_node!(Assignment, Assignment);
ast_node!(CrossRef, CrossRef);
ast_node!(Action, Action);
ast_node!(Literal, Literal);
ast_node!(Ref, Ref);
ast_node!(Paren, Paren);

/// `specialize` and `extend` blocks share their shape; the node kind keeps
/// them apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PromotionBlock(SyntaxNode);

impl PromotionBlock {
    pub fn cast(node: SyntaxNode) -> Option<Self> {
        matches!(
            node.kind(),
            SyntaxKind::SpecializeBlock | SyntaxKind::ExtendBlock
        )
        .then(|| Self(node))
    }

    pub fn as_cst(&self) -> &SyntaxNode {
        &self.0
    }

    pub fn is_extend(&self) -> bool {
        self.0.kind() == SyntaxKind::ExtendBlock
    }

    pub fn base_name(&self) -> Option<SyntaxToken> {
        nth_id(&self.0, 0)
    }

    pub fn mappings(&self) -> impl Iterator<Item = Mapping> + '_ {
        self.0.children().filter_map(Mapping::cast)
    }
}

fn nth_id(node: &SyntaxNode, n: usize) -> Option<SyntaxToken> {
    node.children_with_tokens()
        .filter_map(|it| it.into_token())
        .filter(|t| t.kind() == SyntaxKind::Id)
        .nth(n)
}

fn first_token(node: &SyntaxNode, kind: SyntaxKind) -> Option<SyntaxToken> {
    node.children_with_tokens()
        .filter_map(|it| it.into_token())
        .find(|t| t.kind() == kind)
}

fn has_token(node: &SyntaxNode, kind: SyntaxKind) -> bool {
    first_token(node, kind).is_some()
}

/// Body expression: any pattern that can appear in a rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GramExpr {
    Alt(Alt),
    Seq(Seq),
    Quantified(Quantified),
    Assignment(Assignment),
    CrossRef(CrossRef),
    Action(Action),
    Literal(Literal),
    Ref(Ref),
    Paren(Paren),
}

impl GramExpr {
    pub fn cast(node: SyntaxNode) -> Option<Self> {
        match node.kind() {
            SyntaxKind::Alt => Alt::cast(node).map(GramExpr::Alt),
            SyntaxKind::Seq => Seq::cast(node).map(GramExpr::Seq),
            SyntaxKind::Quantified => Quantified::cast(node).map(GramExpr::Quantified),
            SyntaxKind::Assignment => Assignment::cast(node).map(GramExpr::Assignment),
            SyntaxKind::CrossRef => CrossRef::cast(node).map(GramExpr::CrossRef),
            SyntaxKind::Action => Action::cast(node).map(GramExpr::Action),
            SyntaxKind::Literal => Literal::cast(node).map(GramExpr::Literal),
            SyntaxKind::Ref => Ref::cast(node).map(GramExpr::Ref),
            SyntaxKind::Paren => Paren::cast(node).map(GramExpr::Paren),
            _ => None,
        }
    }

    pub fn as_cst(&self) -> &SyntaxNode {
        match self {
            GramExpr::Alt(n) => n.as_cst(),
            GramExpr::Seq(n) => n.as_cst(),
            GramExpr::Quantified(n) => n.as_cst(),
            GramExpr::Assignment(n) => n.as_cst(),
            GramExpr::CrossRef(n) => n.as_cst(),
            GramExpr::Action(n) => n.as_cst(),
            GramExpr::Literal(n) => n.as_cst(),
            GramExpr::Ref(n) => n.as_cst(),
            GramExpr::Paren(n) => n.as_cst(),
        }
    }
}

impl Root {
    pub fn grammar_decl(&self) -> Option<GrammarDecl> {
        self.0.children().find_map(GrammarDecl::cast)
    }

    pub fn rules(&self) -> impl Iterator<Item = RuleNode> + '_ {
        self.0.children().filter_map(RuleNode::cast)
    }

    pub fn terminals(&self) -> impl Iterator<Item = TerminalNode> + '_ {
        self.0.children().filter_map(TerminalNode::cast)
    }

    pub fn prec_blocks(&self) -> impl Iterator<Item = PrecBlock> + '_ {
        self.0.children().filter_map(PrecBlock::cast)
    }

    pub fn conflicts_blocks(&self) -> impl Iterator<Item = ConflictsBlock> + '_ {
        self.0.children().filter_map(ConflictsBlock::cast)
    }

    pub fn promotions(&self) -> impl Iterator<Item = PromotionBlock> + '_ {
        self.0.children().filter_map(PromotionBlock::cast)
    }

    pub fn external_tokens(&self) -> impl Iterator<Item = ExternalTokensNode> + '_ {
        self.0.children().filter_map(ExternalTokensNode::cast)
    }

    pub fn external_contexts(&self) -> impl Iterator<Item = ExternalContextNode> + '_ {
        self.0.children().filter_map(ExternalContextNode::cast)
    }

    pub fn local_tokens(&self) -> impl Iterator<Item = LocalTokensNode> + '_ {
        self.0.children().filter_map(LocalTokensNode::cast)
    }

    pub fn infix_decls(&self) -> impl Iterator<Item = InfixDecl> + '_ {
        self.0.children().filter_map(InfixDecl::cast)
    }
}

impl GrammarDecl {
    pub fn name(&self) -> Option<SyntaxToken> {
        nth_id(&self.0, 0)
    }
}

impl RuleNode {
    pub fn annotations(&self) -> impl Iterator<Item = Annotation> + '_ {
        self.0.children().filter_map(Annotation::cast)
    }

    pub fn is_entry(&self) -> bool {
        has_token(&self.0, SyntaxKind::KwEntry)
    }

    pub fn name(&self) -> Option<SyntaxToken> {
        nth_id(&self.0, 0)
    }

    pub fn returns_type(&self) -> Option<SyntaxToken> {
        if has_token(&self.0, SyntaxKind::KwReturns) {
            nth_id(&self.0, 1)
        } else {
            None
        }
    }

    pub fn body(&self) -> Option<GramExpr> {
        self.0.children().find_map(GramExpr::cast)
    }
}

impl Annotation {
    pub fn name(&self) -> Option<SyntaxToken> {
        nth_id(&self.0, 0)
    }

    pub fn int_arg(&self) -> Option<SyntaxToken> {
        first_token(&self.0, SyntaxKind::Int)
    }

    pub fn name_arg(&self) -> Option<SyntaxToken> {
        nth_id(&self.0, 1)
    }
}

impl TerminalNode {
    pub fn is_hidden(&self) -> bool {
        has_token(&self.0, SyntaxKind::KwHidden)
    }

    pub fn name(&self) -> Option<SyntaxToken> {
        nth_id(&self.0, 0)
    }

    pub fn regex(&self) -> Option<SyntaxToken> {
        first_token(&self.0, SyntaxKind::RegexLiteral)
    }
}

impl PrecBlock {
    pub fn levels(&self) -> impl Iterator<Item = PrecLevel> + '_ {
        self.0.children().filter_map(PrecLevel::cast)
    }
}

impl PrecLevel {
    pub fn name(&self) -> Option<SyntaxToken> {
        nth_id(&self.0, 0)
    }

    pub fn assoc_token(&self) -> Option<SyntaxToken> {
        self.0
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .find(|t| {
                matches!(
                    t.kind(),
                    SyntaxKind::KwLeft | SyntaxKind::KwRight | SyntaxKind::KwNonassoc
                )
            })
    }
}

impl ConflictsBlock {
    pub fn sets(&self) -> impl Iterator<Item = ConflictSet> + '_ {
        self.0.children().filter_map(ConflictSet::cast)
    }
}

impl ConflictSet {
    pub fn names(&self) -> impl Iterator<Item = SyntaxToken> + '_ {
        self.0
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .filter(|t| t.kind() == SyntaxKind::Id)
    }
}

impl Mapping {
    pub fn literal(&self) -> Option<Literal> {
        self.0.children().find_map(Literal::cast)
    }

    pub fn target(&self) -> Option<SyntaxToken> {
        nth_id(&self.0, 0)
    }
}

impl ExternalTokensNode {
    pub fn path(&self) -> Option<Literal> {
        self.0.children().find_map(Literal::cast)
    }

    pub fn names(&self) -> impl Iterator<Item = SyntaxToken> + '_ {
        self.0
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .filter(|t| t.kind() == SyntaxKind::Id)
    }
}

impl ExternalContextNode {
    pub fn name(&self) -> Option<SyntaxToken> {
        nth_id(&self.0, 0)
    }

    pub fn path(&self) -> Option<Literal> {
        self.0.children().find_map(Literal::cast)
    }
}

impl LocalTokensNode {
    pub fn rule_name(&self) -> Option<SyntaxToken> {
        nth_id(&self.0, 0)
    }

    pub fn defs(&self) -> impl Iterator<Item = LocalTokenDef> + '_ {
        self.0.children().filter_map(LocalTokenDef::cast)
    }

    pub fn else_branch(&self) -> Option<ElseBranch> {
        self.0.children().find_map(ElseBranch::cast)
    }
}

impl LocalTokenDef {
    pub fn name(&self) -> Option<SyntaxToken> {
        nth_id(&self.0, 0)
    }

    pub fn regex(&self) -> Option<SyntaxToken> {
        first_token(&self.0, SyntaxKind::RegexLiteral)
    }
}

impl ElseBranch {
    pub fn name(&self) -> Option<SyntaxToken> {
        nth_id(&self.0, 0)
    }
}

impl InfixDecl {
    pub fn name(&self) -> Option<SyntaxToken> {
        nth_id(&self.0, 0)
    }

    pub fn base(&self) -> Option<SyntaxToken> {
        nth_id(&self.0, 1)
    }

    pub fn groups(&self) -> impl Iterator<Item = InfixGroup> + '_ {
        self.0.children().filter_map(InfixGroup::cast)
    }
}

impl InfixGroup {
    pub fn literals(&self) -> impl Iterator<Item = Literal> + '_ {
        self.0.children().filter_map(Literal::cast)
    }
}

impl Alt {
    pub fn alternatives(&self) -> impl Iterator<Item = GramExpr> + '_ {
        self.0.children().filter_map(GramExpr::cast)
    }
}

impl Seq {
    pub fn elements(&self) -> impl Iterator<Item = GramExpr> + '_ {
        self.0.children().filter_map(GramExpr::cast)
    }
}

impl Quantified {
    pub fn inner(&self) -> Option<GramExpr> {
        self.0.children().find_map(GramExpr::cast)
    }

    pub fn operator(&self) -> Option<SyntaxToken> {
        self.0
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .find(|t| {
                matches!(
                    t.kind(),
                    SyntaxKind::Question | SyntaxKind::Star | SyntaxKind::Plus
                )
            })
    }
}

impl Assignment {
    pub fn field(&self) -> Option<SyntaxToken> {
        nth_id(&self.0, 0)
    }

    pub fn operator(&self) -> Option<SyntaxToken> {
        self.0
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .find(|t| {
                matches!(
                    t.kind(),
                    SyntaxKind::Equals | SyntaxKind::PlusEquals | SyntaxKind::QuestionEquals
                )
            })
    }

    pub fn value(&self) -> Option<GramExpr> {
        self.0.children().find_map(GramExpr::cast)
    }
}

impl CrossRef {
    pub fn target(&self) -> Option<SyntaxToken> {
        nth_id(&self.0, 0)
    }

    pub fn token(&self) -> Option<SyntaxToken> {
        nth_id(&self.0, 1)
    }
}

impl Action {
    pub fn type_name(&self) -> Option<SyntaxToken> {
        nth_id(&self.0, 0)
    }

    pub fn graft_field(&self) -> Option<SyntaxToken> {
        nth_id(&self.0, 1)
    }

    pub fn graft_operator(&self) -> Option<SyntaxToken> {
        self.0
            .children_with_tokens()
            .filter_map(|it| it.into_token())
            .find(|t| matches!(t.kind(), SyntaxKind::Equals | SyntaxKind::PlusEquals))
    }
}

impl Literal {
    pub fn value(&self) -> Option<SyntaxToken> {
        first_token(&self.0, SyntaxKind::StrVal)
    }

    /// Literal content with escapes resolved; empty for `''`.
    pub fn text(&self) -> String {
        self.value()
            .map(|t| unescape(t.text()))
            .unwrap_or_default()
    }
}

impl Ref {
    pub fn name(&self) -> Option<SyntaxToken> {
        nth_id(&self.0, 0)
    }
}

impl Paren {
    pub fn inner(&self) -> Option<GramExpr> {
        self.0.children().find_map(GramExpr::cast)
    }
}

/// Resolve backslash escapes in literal content.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}
