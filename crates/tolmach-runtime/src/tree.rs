//! The unified syntax tree produced by either backend.
//!
//! Arena-backed: nodes live in a `Vec`, identified by [`NodeId`] indices;
//! parent links are indices, never owning pointers, so back-references can
//! never keep a disowned subtree alive. Trees are immutable once built and
//! owned by their document; a reparse produces a new tree.
//!
//! Every node carries its kind, span, leaf flag, trivia flag, and — for
//! children of rule nodes — the assignment identity that produced it. The
//! root owns the document text and the diagnostics of the parse.

use std::sync::Arc;

use tolmach_core::diagnostics::Diagnostic;
use tolmach_core::grammar::AssignmentId;
use tolmach_core::tokens::TokenSym;
use tolmach_core::{Interner, Span, Symbol};

/// Index of a node in its tree's arena. The root is always index 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Node kinds: rule nodes (tagged with the rule's AST type), token leaves,
/// zero-width action markers, and error nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Rule(Symbol),
    Terminal(Symbol),
    Keyword(Symbol),
    /// Type-coercing action marker; zero width, leaf.
    Action(Symbol),
    Error,
}

impl NodeKind {
    pub fn from_token(sym: TokenSym) -> Self {
        match sym {
            TokenSym::Keyword(s) => NodeKind::Keyword(s),
            TokenSym::Terminal(s) => NodeKind::Terminal(s),
        }
    }

    pub fn as_token(self) -> Option<TokenSym> {
        match self {
            NodeKind::Keyword(s) => Some(TokenSym::Keyword(s)),
            NodeKind::Terminal(s) => Some(TokenSym::Terminal(s)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub kind: NodeKind,
    pub span: Span,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub assignment: Option<AssignmentId>,
    pub leaf: bool,
    pub trivia: bool,
    /// Graft info on action markers.
    pub graft: Option<AssignmentId>,
}

/// An immutable syntax tree plus the text and diagnostics it was built
/// from.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    text: Arc<str>,
    nodes: Vec<NodeData>,
    diagnostics: Vec<Diagnostic>,
    interner: Arc<Interner>,
}

impl SyntaxTree {
    pub fn root(&self) -> SyntaxNode<'_> {
        SyntaxNode {
            tree: self,
            id: NodeId(0),
        }
    }

    pub fn node(&self, id: NodeId) -> SyntaxNode<'_> {
        debug_assert!((id.0 as usize) < self.nodes.len());
        SyntaxNode { tree: self, id }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    pub fn resolve(&self, sym: Symbol) -> &str {
        self.interner.resolve(sym)
    }

    /// Display name of a node kind.
    pub fn kind_name(&self, kind: NodeKind) -> String {
        match kind {
            NodeKind::Rule(s) | NodeKind::Terminal(s) | NodeKind::Action(s) => {
                self.resolve(s).to_string()
            }
            NodeKind::Keyword(s) => format!("'{}'", self.resolve(s)),
            NodeKind::Error => "error".to_string(),
        }
    }

    /// The leaf whose half-open span contains `offset`; at a boundary the
    /// latter leaf wins because spans are half-open.
    pub fn find_leaf_at(&self, offset: u32) -> Option<SyntaxNode<'_>> {
        let mut node = self.root();
        if !node.span().contains(offset) {
            return None;
        }

        'descend: loop {
            if node.is_leaf() {
                return Some(node);
            }
            for child in node.children() {
                if child.span().contains(offset) {
                    node = child;
                    continue 'descend;
                }
            }
            return None;
        }
    }

    /// The leaf under the cursor whose text matches `name_matcher`,
    /// looking one position left when the cursor sits at a word end.
    pub fn find_declaration_node_at(
        &self,
        offset: u32,
        name_matcher: impl Fn(&str) -> bool,
    ) -> Option<SyntaxNode<'_>> {
        let direct = self
            .find_leaf_at(offset)
            .filter(|leaf| name_matcher(leaf.full_text()));
        if direct.is_some() {
            return direct;
        }
        if offset == 0 {
            return None;
        }
        self.find_leaf_at(offset - 1)
            .filter(|leaf| name_matcher(leaf.full_text()))
    }

    /// Kinds of non-trivia token leaves, in source order. Action markers
    /// and error leaves are not tokens.
    pub fn leaf_tokens(&self) -> Vec<TokenSym> {
        let mut out = Vec::new();
        self.collect_leaf_tokens(NodeId(0), &mut out);
        out
    }

    fn collect_leaf_tokens(&self, id: NodeId, out: &mut Vec<TokenSym>) {
        let data = &self.nodes[id.0 as usize];
        if data.leaf {
            if !data.trivia
                && let Some(tok) = data.kind.as_token()
            {
                out.push(tok);
            }
            return;
        }
        for &child in &data.children {
            self.collect_leaf_tokens(child, out);
        }
    }

    /// Structural equality: kinds, spans, assignments, and shape — node
    /// identity is irrelevant. Diagnostics are not compared.
    pub fn structural_eq(&self, other: &SyntaxTree) -> bool {
        self.text == other.text && self.node_eq(other, NodeId(0), NodeId(0))
    }

    fn node_eq(&self, other: &SyntaxTree, a: NodeId, b: NodeId) -> bool {
        let da = &self.nodes[a.0 as usize];
        let db = &other.nodes[b.0 as usize];
        da.kind == db.kind
            && da.span == db.span
            && da.assignment == db.assignment
            && da.leaf == db.leaf
            && da.trivia == db.trivia
            && da.children.len() == db.children.len()
            && da
                .children
                .iter()
                .zip(&db.children)
                .all(|(&ca, &cb)| self.node_eq(other, ca, cb))
    }

    /// Indented debug rendering, trivia omitted.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_into(NodeId(0), 0, &mut out);
        out
    }

    fn dump_into(&self, id: NodeId, depth: usize, out: &mut String) {
        use std::fmt::Write;

        let node = self.node(id);
        if node.is_trivia() {
            return;
        }
        for _ in 0..depth {
            out.push_str("  ");
        }
        let name = self.kind_name(node.kind());
        if node.is_leaf() {
            writeln!(out, "{} {:?}", name, node.full_text()).unwrap();
        } else {
            writeln!(out, "{}", name).unwrap();
        }
        for child in node.children() {
            self.dump_into(child.id, depth + 1, out);
        }
    }
}

/// A cheap cursor into a tree.
#[derive(Debug, Clone, Copy)]
pub struct SyntaxNode<'t> {
    tree: &'t SyntaxTree,
    id: NodeId,
}

impl<'t> SyntaxNode<'t> {
    fn data(&self) -> &'t NodeData {
        &self.tree.nodes[self.id.0 as usize]
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'t SyntaxTree {
        self.tree
    }

    pub fn kind(&self) -> NodeKind {
        self.data().kind
    }

    pub fn span(&self) -> Span {
        self.data().span
    }

    pub fn offset(&self) -> u32 {
        self.data().span.offset
    }

    pub fn len(&self) -> u32 {
        self.data().span.len
    }

    pub fn is_empty(&self) -> bool {
        self.data().span.is_empty()
    }

    pub fn end(&self) -> u32 {
        self.data().span.end()
    }

    /// Text over the node's span, contained trivia included.
    pub fn full_text(&self) -> &'t str {
        &self.tree.text[self.data().span.as_range()]
    }

    pub fn is_leaf(&self) -> bool {
        self.data().leaf
    }

    pub fn is_trivia(&self) -> bool {
        self.data().trivia
    }

    /// The grammar feature that produced this child, if any.
    pub fn assignment(&self) -> Option<AssignmentId> {
        self.data().assignment
    }

    /// Graft assignment of an action marker.
    pub fn graft(&self) -> Option<AssignmentId> {
        self.data().graft
    }

    pub fn parent(&self) -> Option<SyntaxNode<'t>> {
        self.data().parent.map(|id| self.tree.node(id))
    }

    pub fn children(&self) -> impl Iterator<Item = SyntaxNode<'t>> + 't {
        let tree = self.tree;
        let ids: &'t [NodeId] = &self.data().children;
        ids.iter().map(move |&id| tree.node(id))
    }

    pub fn ancestors(&self) -> impl Iterator<Item = SyntaxNode<'t>> + 't {
        std::iter::successors(self.parent(), |node| node.parent())
    }

    /// Depth-first walk of the subtree, this node included.
    pub fn descendants(&self) -> Vec<SyntaxNode<'t>> {
        let mut out = Vec::new();
        let mut stack = vec![*self];
        while let Some(node) = stack.pop() {
            out.push(node);
            let children: Vec<_> = node.children().collect();
            for child in children.into_iter().rev() {
                stack.push(child);
            }
        }
        out
    }
}

/// Incremental builder used by both backends.
pub struct TreeBuilder {
    nodes: Vec<NodeData>,
    stack: Vec<NodeId>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            stack: Vec::new(),
        }
    }

    pub fn start_node(&mut self, kind: NodeKind, offset: u32) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let parent = self.stack.last().copied();
        self.nodes.push(NodeData {
            kind,
            span: Span::empty(offset),
            parent,
            children: Vec::new(),
            assignment: None,
            leaf: false,
            trivia: false,
            graft: None,
        });
        if let Some(parent) = parent {
            self.nodes[parent.0 as usize].children.push(id);
        }
        self.stack.push(id);
        id
    }

    pub fn finish_node(&mut self, end: u32) {
        let id = self.stack.pop().expect("finish_node without start_node");
        let node = &mut self.nodes[id.0 as usize];
        node.span = Span::new(node.span.offset, end.saturating_sub(node.span.offset));
    }

    pub fn set_assignment(&mut self, id: NodeId, assignment: Option<AssignmentId>) {
        self.nodes[id.0 as usize].assignment = assignment;
    }

    pub fn leaf(
        &mut self,
        kind: NodeKind,
        span: Span,
        trivia: bool,
        assignment: Option<AssignmentId>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let parent = self.stack.last().copied();
        self.nodes.push(NodeData {
            kind,
            span,
            parent,
            children: Vec::new(),
            assignment,
            leaf: true,
            trivia,
            graft: None,
        });
        if let Some(parent) = parent {
            self.nodes[parent.0 as usize].children.push(id);
        }
        id
    }

    /// Number of children of the currently open node; used with
    /// [`TreeBuilder::wrap_from`] to wrap retroactively.
    pub fn checkpoint(&self) -> usize {
        match self.stack.last() {
            Some(&open) => self.nodes[open.0 as usize].children.len(),
            None => 0,
        }
    }

    /// Adopt the open node's children from `checkpoint` onward into a new
    /// node, insert it in their place, and leave it open.
    pub fn wrap_from(&mut self, checkpoint: usize, kind: NodeKind) -> NodeId {
        let parent = *self.stack.last().expect("wrap_from without an open node");
        let adopted: Vec<NodeId> = self.nodes[parent.0 as usize]
            .children
            .drain(checkpoint..)
            .collect();

        let offset = adopted
            .first()
            .map(|&id| self.nodes[id.0 as usize].span.offset)
            .unwrap_or(0);

        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            kind,
            span: Span::empty(offset),
            parent: Some(parent),
            children: adopted.clone(),
            assignment: None,
            leaf: false,
            trivia: false,
            graft: None,
        });
        for &child in &adopted {
            self.nodes[child.0 as usize].parent = Some(id);
        }
        self.nodes[parent.0 as usize].children.push(id);
        self.stack.push(id);
        id
    }

    /// Set the assignment of the first non-trivia child of the open node
    /// at or after `checkpoint`.
    pub fn assign_first_nontrivia_from(
        &mut self,
        checkpoint: usize,
        assignment: Option<AssignmentId>,
    ) {
        let Some(&open) = self.stack.last() else {
            return;
        };
        let target = self.nodes[open.0 as usize]
            .children
            .iter()
            .skip(checkpoint)
            .copied()
            .find(|&id| !self.nodes[id.0 as usize].trivia);
        if let Some(id) = target {
            self.nodes[id.0 as usize].assignment = assignment;
        }
    }

    /// Zero-width action marker leaf.
    pub fn action_marker(
        &mut self,
        type_name: Symbol,
        offset: u32,
        graft: Option<AssignmentId>,
    ) -> NodeId {
        let id = self.leaf(NodeKind::Action(type_name), Span::empty(offset), false, None);
        self.nodes[id.0 as usize].graft = graft;
        id
    }

    pub fn finish(
        mut self,
        text: Arc<str>,
        diagnostics: Vec<Diagnostic>,
        interner: Arc<Interner>,
    ) -> SyntaxTree {
        assert!(self.stack.is_empty(), "unbalanced tree builder");
        assert!(!self.nodes.is_empty(), "empty tree");

        // The root spans the whole document, leading trivia included.
        let len = text.len() as u32;
        self.nodes[0].span = Span::new(0, len);

        SyntaxTree {
            text,
            nodes: self.nodes,
            diagnostics,
            interner,
        }
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> SyntaxTree {
        // Root(Model) over "model foo": keyword, trivia, identifier.
        let mut interner = Interner::new();
        let model_rule = interner.intern("Model");
        let kw = interner.intern("model");
        let ws = interner.intern("WS");
        let id = interner.intern("ID");
        let name = interner.intern("name");

        let mut builder = TreeBuilder::new();
        builder.start_node(NodeKind::Rule(model_rule), 0);
        builder.leaf(NodeKind::Keyword(kw), Span::new(0, 5), false, None);
        builder.leaf(NodeKind::Terminal(ws), Span::new(5, 1), true, None);
        builder.leaf(
            NodeKind::Terminal(id),
            Span::new(6, 3),
            false,
            Some(AssignmentId::new(name, tolmach_core::grammar::AssignOp::Single)),
        );
        builder.finish_node(9);
        builder.finish("model foo".into(), Vec::new(), Arc::new(interner))
    }

    #[test]
    fn root_covers_the_document() {
        let tree = sample_tree();
        assert_eq!(tree.root().offset(), 0);
        assert_eq!(tree.root().end(), 9);
        assert_eq!(tree.root().full_text(), "model foo");
    }

    #[test]
    fn children_are_ordered_and_carry_assignments() {
        let tree = sample_tree();
        let children: Vec<_> = tree.root().children().collect();
        assert_eq!(children.len(), 3);
        assert!(children[1].is_trivia());
        assert!(children[2].assignment().is_some());
        assert_eq!(children[2].full_text(), "foo");
    }

    #[test]
    fn leaf_tokens_skip_trivia() {
        let tree = sample_tree();
        assert_eq!(tree.leaf_tokens().len(), 2);
    }

    #[test]
    fn leaf_lookup_prefers_the_latter_at_boundaries() {
        let tree = sample_tree();
        // Offset 5 is the boundary between the keyword and the space.
        let leaf = tree.find_leaf_at(5).unwrap();
        assert!(leaf.is_trivia());
        let leaf = tree.find_leaf_at(6).unwrap();
        assert_eq!(leaf.full_text(), "foo");
    }

    #[test]
    fn declaration_lookup_checks_one_left_of_cursor() {
        let tree = sample_tree();
        let is_word = |s: &str| s.chars().all(|c| c.is_ascii_alphabetic());
        // Cursor at the very end of "foo".
        let leaf = tree.find_declaration_node_at(9, is_word).unwrap();
        assert_eq!(leaf.full_text(), "foo");
    }

    #[test]
    fn structural_equality_ignores_nothing_observable() {
        let a = sample_tree();
        let b = sample_tree();
        assert!(a.structural_eq(&b));
    }
}
