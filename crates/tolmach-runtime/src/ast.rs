//! AST construction from the syntax tree.
//!
//! One walk over the tree. Rule nodes become tagged values; each non-trivia
//! child is interpreted through its assignment identity: `=` assigns (later
//! wins), `+=` appends and records the index, `?=` sets a boolean, and
//! cross-reference assignments produce an unresolved descriptor instead of
//! a value. Action markers re-tag the value under construction and may
//! graft the prior value into one of their fields.
//!
//! The AST is arena-backed; container back-links are arena indices, never
//! owning pointers, so a disowned subtree can never be kept alive through
//! its parent.

use indexmap::IndexMap;

use tolmach_core::grammar::AssignOp;
use tolmach_core::{Span, Symbol};

use crate::tree::{NodeId, NodeKind, SyntaxNode, SyntaxTree};

/// Index of an AST node in its document's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AstId(pub u32);

/// An unresolved cross-reference: the target rule kind, the written name,
/// and the text segment it came from. Resolution is deferred to the
/// linker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefDescriptor {
    pub target_kind: Symbol,
    pub target_name: String,
    pub source_segment: Span,
}

/// A field value.
#[derive(Debug, Clone, PartialEq)]
pub enum AstValue {
    Node(AstId),
    Text(String),
    Bool(bool),
    Reference(RefDescriptor),
    List(Vec<AstValue>),
}

#[derive(Debug, Clone)]
struct AstNodeData {
    type_name: Symbol,
    fields: IndexMap<Symbol, AstValue>,
    container: Option<AstId>,
    container_property: Option<Symbol>,
    container_index: Option<usize>,
    syntax: NodeId,
}

/// The AST of one document: an arena of tagged values.
#[derive(Debug, Clone)]
pub struct AstDocument {
    nodes: Vec<AstNodeData>,
    root: Option<AstId>,
    uri: Option<String>,
}

impl AstDocument {
    pub fn root(&self) -> Option<AstNode<'_>> {
        self.root.map(|id| self.node(id))
    }

    pub fn node(&self, id: AstId) -> AstNode<'_> {
        debug_assert!((id.0 as usize) < self.nodes.len());
        AstNode { doc: self, id }
    }

    /// The owning document's URI (the root's `$document` back-link).
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = AstNode<'_>> {
        (0..self.nodes.len() as u32).map(|i| self.node(AstId(i)))
    }
}

/// A cheap cursor into an AST document.
#[derive(Debug, Clone, Copy)]
pub struct AstNode<'a> {
    doc: &'a AstDocument,
    id: AstId,
}

impl<'a> AstNode<'a> {
    fn data(&self) -> &'a AstNodeData {
        &self.doc.nodes[self.id.0 as usize]
    }

    pub fn id(&self) -> AstId {
        self.id
    }

    pub fn type_name(&self) -> Symbol {
        self.data().type_name
    }

    pub fn field(&self, name: Symbol) -> Option<&'a AstValue> {
        self.data().fields.get(&name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (Symbol, &'a AstValue)> {
        self.data().fields.iter().map(|(k, v)| (*k, v))
    }

    /// `$container`.
    pub fn container(&self) -> Option<AstNode<'a>> {
        self.data().container.map(|id| self.doc.node(id))
    }

    /// `$containerProperty`.
    pub fn container_property(&self) -> Option<Symbol> {
        self.data().container_property
    }

    /// `$containerIndex`, set for children of append assignments.
    pub fn container_index(&self) -> Option<usize> {
        self.data().container_index
    }

    /// `$syntaxNode` / `$cstNode`: the producing tree node.
    pub fn syntax(&self) -> NodeId {
        self.data().syntax
    }
}

/// Build the AST for a parsed document.
pub fn build_ast(tree: &SyntaxTree) -> AstDocument {
    build_ast_with_uri(tree, None)
}

pub fn build_ast_with_uri(tree: &SyntaxTree, uri: Option<String>) -> AstDocument {
    let mut builder = Builder { nodes: Vec::new() };

    let root = match tree.root().kind() {
        NodeKind::Rule(_) => Some(builder.build_node(tree.root())),
        _ => None,
    };

    let mut doc = AstDocument {
        nodes: builder.nodes,
        root,
        uri,
    };
    attach_containers(&mut doc);
    doc
}

struct Builder {
    nodes: Vec<AstNodeData>,
}

impl Builder {
    fn alloc(&mut self, type_name: Symbol, syntax: NodeId) -> AstId {
        let id = AstId(self.nodes.len() as u32);
        self.nodes.push(AstNodeData {
            type_name,
            fields: IndexMap::new(),
            container: None,
            container_property: None,
            container_index: None,
            syntax,
        });
        id
    }

    fn build_node(&mut self, node: SyntaxNode<'_>) -> AstId {
        let NodeKind::Rule(type_name) = node.kind() else {
            unreachable!("build_node is only called on rule nodes");
        };

        let mut current: Option<AstId> = None;

        for child in node.children() {
            if child.is_trivia() {
                continue;
            }
            match child.kind() {
                NodeKind::Action(action_type) => {
                    let fresh = self.alloc(action_type, node.id());
                    if let Some(graft) = child.graft()
                        && let Some(prior) = current
                    {
                        self.assign(fresh, graft.field, graft.op, AstValue::Node(prior));
                    }
                    current = Some(fresh);
                }
                NodeKind::Rule(_) => {
                    let value = self.build_node(child);
                    match child.assignment() {
                        Some(id) => {
                            let target = *current
                                .get_or_insert_with(|| self.alloc(type_name, node.id()));
                            self.assign(target, id.field, id.op, AstValue::Node(value));
                        }
                        // An unassigned rule call's result becomes the
                        // value under construction.
                        None => {
                            if current.is_none() {
                                current = Some(value);
                            }
                        }
                    }
                }
                NodeKind::Terminal(_) | NodeKind::Keyword(_) | NodeKind::Error => {
                    let Some(id) = child.assignment() else {
                        continue;
                    };
                    let target =
                        *current.get_or_insert_with(|| self.alloc(type_name, node.id()));
                    let value = match (id.reference, id.op) {
                        (_, AssignOp::Bool) => AstValue::Bool(true),
                        (Some(target_kind), _) => AstValue::Reference(RefDescriptor {
                            target_kind,
                            target_name: child.full_text().to_string(),
                            source_segment: child.span(),
                        }),
                        (None, _) => AstValue::Text(child.full_text().to_string()),
                    };
                    self.assign(target, id.field, id.op, value);
                }
            }
        }

        current.unwrap_or_else(|| self.alloc(type_name, node.id()))
    }

    fn assign(&mut self, target: AstId, field: Symbol, op: AssignOp, value: AstValue) {
        let fields = &mut self.nodes[target.0 as usize].fields;
        match op {
            // Later wins; the grammar disallows repeats.
            AssignOp::Single => {
                fields.insert(field, value);
            }
            AssignOp::Append => match fields.get_mut(&field) {
                Some(AstValue::List(items)) => items.push(value),
                _ => {
                    fields.insert(field, AstValue::List(vec![value]));
                }
            },
            AssignOp::Bool => {
                fields.insert(field, AstValue::Bool(true));
            }
        }
    }
}

/// Fill `$container` / `$containerProperty` / `$containerIndex` on every
/// child after construction.
fn attach_containers(doc: &mut AstDocument) {
    let mut links: Vec<(AstId, AstId, Symbol, Option<usize>)> = Vec::new();

    for (idx, node) in doc.nodes.iter().enumerate() {
        let parent = AstId(idx as u32);
        for (&field, value) in &node.fields {
            match value {
                AstValue::Node(child) => links.push((*child, parent, field, None)),
                AstValue::List(items) => {
                    for (i, item) in items.iter().enumerate() {
                        if let AstValue::Node(child) = item {
                            links.push((*child, parent, field, Some(i)));
                        }
                    }
                }
                _ => {}
            }
        }
    }

    for (child, parent, field, index) in links {
        let data = &mut doc.nodes[child.0 as usize];
        data.container = Some(parent);
        data.container_property = Some(field);
        data.container_index = index;
    }
}
