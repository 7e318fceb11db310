//! Tree Builder
//!
//! Augments a raw tree into a [`CoveredTree`], threading one [`Context`]
//! through the whole construction.

use super::factory::NodeFactory;
use super::variant::Variant;
use super::{Child, CoveredTree, Node, NodeId};
use crate::raw::{RawChild, RawNode};
use std::collections::BTreeMap;

/// Hit state of one line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineHit {
    /// Highest run count of a node starting on the line
    pub hits: u64,
    /// Some executable node starting on the line never ran
    pub partial: bool,
}

/// Per-unit state: the id counter and the line-hit table
///
/// Create one per analysed source unit and drop it once the unit's result
/// has been extracted.
#[derive(Debug, Default)]
pub struct Context {
    next_id: u32,
    line_hits: BTreeMap<u32, LineHit>,
}

impl Context {
    /// Create a fresh context
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id; ids are never reused
    pub fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Number of ids allocated so far
    #[must_use]
    pub fn allocated(&self) -> u32 {
        self.next_id
    }

    /// Record a node's run count on a line, keeping the highest count
    pub fn line_hit(&mut self, line: u32, runs: u64) {
        let entry = self.line_hits.entry(line).or_default();
        entry.hits = entry.hits.max(runs);
    }

    /// Flag a line as holding an executable node that never ran
    pub fn mark_uncovered(&mut self, line: u32) {
        self.line_hits.entry(line).or_default().partial = true;
    }

    /// Current line-hit table
    #[must_use]
    pub fn line_hits(&self) -> &BTreeMap<u32, LineHit> {
        &self.line_hits
    }

    /// Move the line-hit table out, leaving it empty
    pub fn take_line_hits(&mut self) -> BTreeMap<u32, LineHit> {
        std::mem::take(&mut self.line_hits)
    }
}

/// Builds a [`CoveredTree`] from a raw tree
#[derive(Debug)]
pub struct TreeBuilder<'c> {
    context: &'c mut Context,
    nodes: Vec<Node>,
    base: u32,
}

impl<'c> TreeBuilder<'c> {
    /// Create a builder allocating ids from `context`
    #[must_use]
    pub fn new(context: &'c mut Context) -> Self {
        let base = context.allocated();
        Self {
            context,
            nodes: Vec::new(),
            base,
        }
    }

    /// Augment the whole tree rooted at `raw`
    #[must_use]
    pub fn build(mut self, raw: &RawNode) -> CoveredTree {
        self.nodes.reserve(raw.subtree_len());
        self.augment(raw, None, 0);
        tracing::debug!(nodes = self.nodes.len(), root = %raw.kind, "augmented tree");
        CoveredTree::from_parts(self.nodes, self.base)
    }

    fn augment(&mut self, raw: &RawNode, parent: Option<ParentRef>, slot: usize) -> NodeId {
        let variant = NodeFactory::variant_for(parent.map(|p| p.variant), raw, slot);
        let id = NodeId::new(self.context.allocate_id());
        let index = self.nodes.len();

        // reserve the slot first so ids follow pre-order
        self.nodes.push(Node {
            id,
            kind: raw.kind.clone(),
            variant,
            parent: parent.map(|p| p.id),
            slot,
            children: Vec::new(),
            location: raw.location,
        });

        let this = ParentRef { id, variant };
        let mut children = Vec::with_capacity(raw.children.len());
        for (i, child) in raw.children.iter().enumerate() {
            children.push(match child {
                RawChild::Node(node) => Child::Node(self.augment(node, Some(this), i)),
                RawChild::Leaf(leaf) => Child::Leaf(leaf.clone()),
            });
        }
        self.nodes[index].children = children;
        id
    }
}

#[derive(Debug, Clone, Copy)]
struct ParentRef {
    id: NodeId,
    variant: Variant,
}
