//! Augmented Nodes
//!
//! The raw tree is augmented into an arena of [`Node`]s indexed by
//! [`NodeId`]. Every node records its parent as an id, the slot it occupies
//! in the parent's children, and the variant the factory chose for it.
//!
//! Nodes carry no execution state. Counts come from a [`HitSource`] passed
//! to each query on the [`CoveredNode`] view.

mod builder;
mod factory;
mod variant;

pub use builder::{Context, LineHit, TreeBuilder};
pub use factory::NodeFactory;
pub use variant::{BranchKind, LoopTest, ShortCircuitOp, Variant};

use crate::hits::{HitSource, HitSourceError};
use crate::location::{Location, SourceSpan};
use crate::range::{self, ByteRange, RangeSet};
use crate::raw::Leaf;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a node, unique within its [`Context`]
///
/// Allocated in pre-order: a parent's id is smaller than any of its
/// descendants' ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// Create a new node ID
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the inner value
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A child of an augmented node
#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    /// Augmented sub-node
    Node(NodeId),
    /// Leaf passed through untouched
    Leaf(Leaf),
}

/// An augmented node in the arena
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Unique id
    pub id: NodeId,
    /// Construct tag of the raw node
    pub kind: String,
    /// Variant chosen by the factory
    pub variant: Variant,
    /// Parent, absent for the root
    pub parent: Option<NodeId>,
    /// Index of this node in its parent's children
    pub slot: usize,
    /// Ordered children
    pub children: Vec<Child>,
    /// Source location
    pub location: Option<Location>,
}

/// Traversal order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// Self before children
    Pre,
    /// Children before self
    #[default]
    Post,
}

/// An augmented tree for one source unit
#[derive(Debug, Clone)]
pub struct CoveredTree {
    nodes: Vec<Node>,
    base: u32,
}

impl CoveredTree {
    pub(crate) fn from_parts(nodes: Vec<Node>, base: u32) -> Self {
        Self { nodes, base }
    }

    /// Number of nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True for a tree without nodes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The root node
    #[must_use]
    pub fn root(&self) -> Option<CoveredNode<'_>> {
        self.nodes.first().map(|n| CoveredNode { tree: self, node: n })
    }

    /// Raw access to an arena entry
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        let idx = id.0.checked_sub(self.base)? as usize;
        self.nodes.get(idx)
    }

    /// View of a node
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<CoveredNode<'_>> {
        self.get(id).map(|node| CoveredNode { tree: self, node })
    }

    /// Iterate all nodes in id (pre-order) sequence
    pub fn iter(&self) -> impl Iterator<Item = CoveredNode<'_>> {
        self.nodes.iter().map(|node| CoveredNode { tree: self, node })
    }

    /// Walk the whole tree; each call starts a fresh traversal
    #[must_use]
    pub fn walk(&self, order: Order) -> Walk<'_> {
        Walk::new(self, self.root().map(|r| r.id()), order)
    }

    /// Walk the constructs that participate in branch coverage
    pub fn walk_branches(&self, order: Order) -> impl Iterator<Item = CoveredNode<'_>> {
        self.walk(order).filter(|n| n.variant().is_branch())
    }
}

/// Borrowed view of one node with the coverage query API
#[derive(Clone, Copy)]
pub struct CoveredNode<'t> {
    tree: &'t CoveredTree,
    node: &'t Node,
}

impl fmt::Debug for CoveredNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoveredNode")
            .field("id", &self.node.id)
            .field("kind", &self.display_kind())
            .field("range", &self.range())
            .finish()
    }
}

impl<'t> CoveredNode<'t> {
    /// Node id
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.node.id
    }

    /// Construct tag
    #[must_use]
    pub fn kind(&self) -> &'t str {
        &self.node.kind
    }

    /// Variant chosen at construction
    #[must_use]
    pub fn variant(&self) -> Variant {
        self.node.variant
    }

    /// Underlying arena entry
    #[must_use]
    pub fn raw(&self) -> &'t Node {
        self.node
    }

    /// The tree this node belongs to
    #[must_use]
    pub fn tree(&self) -> &'t CoveredTree {
        self.tree
    }

    /// Parent node, absent for the root
    #[must_use]
    pub fn parent(&self) -> Option<CoveredNode<'t>> {
        self.node.parent.and_then(|p| self.tree.node(p))
    }

    /// Source location
    #[must_use]
    pub fn location(&self) -> Option<&'t Location> {
        self.node.location.as_ref()
    }

    /// Span of the whole expression
    #[must_use]
    pub fn span(&self) -> Option<SourceSpan> {
        self.node.location.map(|l| l.expression)
    }

    /// `[start, end)` of the expression, absent for synthetic nodes
    #[must_use]
    pub fn range(&self) -> Option<ByteRange> {
        self.node.location.map(|l| l.range())
    }

    /// `kind`, or `kind[Variant]` when the variant is specialized and its
    /// name differs from the kind
    #[must_use]
    pub fn display_kind(&self) -> String {
        let variant = self.node.variant;
        if variant == Variant::Generic || self.node.kind.eq_ignore_ascii_case(variant.name()) {
            self.node.kind.clone()
        } else {
            format!("{}[{}]", self.node.kind, variant.name())
        }
    }

    /// Ordered children, nodes and leaves
    #[must_use]
    pub fn children(&self) -> &'t [Child] {
        &self.node.children
    }

    /// Children that are augmented nodes
    pub fn children_nodes(&self) -> impl Iterator<Item = CoveredNode<'t>> + 't {
        let tree = self.tree;
        let node: &'t Node = self.node;
        node.children.iter().filter_map(move |c| match c {
            Child::Node(id) => tree.node(*id),
            Child::Leaf(_) => None,
        })
    }

    /// The node in child slot `slot`, if the slot holds a node
    #[must_use]
    pub fn child_at(&self, slot: usize) -> Option<CoveredNode<'t>> {
        match self.node.children.get(slot)? {
            Child::Node(id) => self.tree.node(*id),
            Child::Leaf(_) => None,
        }
    }

    /// Offsets owned by this node and none of its direct children
    #[must_use]
    pub fn proper_range(&self) -> RangeSet {
        let Some(own) = self.range() else {
            return RangeSet::new();
        };
        range::subtract(own, self.children_nodes().filter_map(|c| c.range()))
    }

    /// False for purely syntactic markers
    #[must_use]
    pub fn is_executable(&self) -> bool {
        self.node.variant.is_executable()
    }

    /// Raw count recorded for this node's exact range
    pub fn recorded_hits(&self, hits: &dyn HitSource) -> Result<Option<u64>, HitSourceError> {
        match self.range() {
            Some(range) => hits.hits_for_range(range),
            None => Ok(None),
        }
    }

    /// Number of times this node was reached
    pub fn run_count(&self, hits: &dyn HitSource) -> Result<u64, HitSourceError> {
        match self.node.variant {
            Variant::Marker => Ok(0),
            Variant::Sequence => match self.first_located_child() {
                Some(first) => first.run_count(hits),
                None => Ok(self.recorded_hits(hits)?.unwrap_or(0)),
            },
            _ => Ok(self.recorded_hits(hits)?.unwrap_or(0)),
        }
    }

    /// Number of times control passed through to completion
    pub fn full_run_count(&self, hits: &dyn HitSource) -> Result<u64, HitSourceError> {
        match self.node.variant {
            Variant::Marker => Ok(0),
            Variant::Sequence => match self.last_located_child() {
                Some(last) => last.full_run_count(hits),
                None => self.completed_runs(hits),
            },
            _ => self.completed_runs(hits),
        }
    }

    /// Executable and reached at least once
    pub fn was_executed(&self, hits: &dyn HitSource) -> Result<bool, HitSourceError> {
        Ok(self.is_executable() && self.run_count(hits)? > 0)
    }

    /// Number of non-local exits (raise, return, break...) out of this node
    pub fn interrupt_count(&self, hits: &dyn HitSource) -> Result<u64, HitSourceError> {
        let runs = self.run_count(hits)?;
        let full = self.full_run_count(hits)?;
        Ok(runs.saturating_sub(full))
    }

    /// Depth-first walk of this subtree; each call starts a fresh traversal
    #[must_use]
    pub fn walk(&self, order: Order) -> Walk<'t> {
        Walk::new(self.tree, Some(self.node.id), order)
    }

    /// Walk of the branch constructs in this subtree
    pub fn walk_branches(&self, order: Order) -> impl Iterator<Item = CoveredNode<'t>> {
        self.walk(order).filter(|n| n.variant().is_branch())
    }

    fn completed_runs(&self, hits: &dyn HitSource) -> Result<u64, HitSourceError> {
        let runs = self.run_count(hits)?;
        let completions = match self.range() {
            Some(range) => hits.completions_for_range(range)?,
            None => None,
        };
        Ok(completions.map_or(runs, |c| c.min(runs)))
    }

    fn first_located_child(&self) -> Option<CoveredNode<'t>> {
        self.children_nodes().find(|c| c.location().is_some())
    }

    fn last_located_child(&self) -> Option<CoveredNode<'t>> {
        self.children_nodes().filter(|c| c.location().is_some()).last()
    }
}

/// Depth-first traversal with an explicit stack
#[derive(Debug, Clone)]
pub struct Walk<'t> {
    tree: &'t CoveredTree,
    order: Order,
    // (node, children already pushed)
    stack: Vec<(NodeId, bool)>,
}

impl<'t> Walk<'t> {
    fn new(tree: &'t CoveredTree, start: Option<NodeId>, order: Order) -> Self {
        Self {
            tree,
            order,
            stack: start.map(|id| (id, false)).into_iter().collect(),
        }
    }

    fn push_children(&mut self, node: &CoveredNode<'t>) {
        let children: Vec<NodeId> = node.children_nodes().map(|c| c.id()).collect();
        self.stack
            .extend(children.into_iter().rev().map(|id| (id, false)));
    }
}

impl<'t> Iterator for Walk<'t> {
    type Item = CoveredNode<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((id, expanded)) = self.stack.pop() {
            let node = self.tree.node(id)?;
            match self.order {
                Order::Pre => {
                    self.push_children(&node);
                    return Some(node);
                }
                Order::Post if expanded => return Some(node),
                Order::Post => {
                    self.stack.push((id, true));
                    self.push_children(&node);
                }
            }
        }
        None
    }
}
