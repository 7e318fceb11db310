//! Node Factory
//!
//! Picks the variant for a raw node in two stages: the parent resolves the
//! child by kind and position, then the chosen variant may reclassify itself
//! from the child's own shape. Unknown kinds resolve to [`Variant::Generic`].

use super::variant::{LoopTest, ShortCircuitOp, Variant};
use crate::raw::RawNode;

/// Variant resolution
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeFactory;

impl NodeFactory {
    /// Resolve a child of `parent` (the root has no parent)
    #[must_use]
    pub fn resolve(parent: Option<Variant>, kind: &str, child_index: usize) -> Variant {
        match (parent, kind) {
            (Some(Variant::Case), "when") if child_index >= 1 => Variant::When,
            (
                Some(Variant::Loop {
                    test: LoopTest::PostTest,
                    ..
                }),
                "kwbegin" | "begin",
            ) if child_index == 1 => Variant::Sequence,
            _ => Self::by_kind(kind),
        }
    }

    /// Static kind table
    #[must_use]
    pub fn by_kind(kind: &str) -> Variant {
        match kind {
            "if" | "ternary" => Variant::IF,
            "unless" => Variant::UNLESS,
            "case" => Variant::Case,
            "and" => Variant::ShortCircuit {
                op: ShortCircuitOp::And,
                lhs: 0,
                rhs: 1,
            },
            "or" => Variant::ShortCircuit {
                op: ShortCircuitOp::Or,
                lhs: 0,
                rhs: 1,
            },
            "csend" => Variant::SafeNavigation { receiver: 0 },
            "while" => Variant::Loop {
                test: LoopTest::PreTest,
                negated: false,
            },
            "until" => Variant::Loop {
                test: LoopTest::PreTest,
                negated: true,
            },
            "while_post" => Variant::Loop {
                test: LoopTest::PostTest,
                negated: false,
            },
            "until_post" => Variant::Loop {
                test: LoopTest::PostTest,
                negated: true,
            },
            "begin" | "kwbegin" => Variant::Sequence,
            "args" | "arg" | "restarg" | "kwrestarg" | "blockarg" | "shadowarg" | "end"
            | "then" | "do" => Variant::Marker,
            _ => {
                tracing::trace!(kind, "no specialized variant, using generic");
                Variant::Generic
            }
        }
    }

    /// Let the chosen variant refine itself from the raw node.
    /// `None` keeps the resolved variant.
    #[must_use]
    pub fn reclassify(resolved: Variant, raw: &RawNode) -> Option<Variant> {
        if resolved != Variant::Generic {
            return None;
        }
        match raw.kind.as_str() {
            "binary" | "operator_assignment" => Self::operator_variant(raw),
            "call" | "send" if raw.string_leaves().any(|s| s == "&.") => {
                first_node_slot(raw).map(|receiver| Variant::SafeNavigation { receiver })
            }
            _ => None,
        }
    }

    /// Resolve then reclassify
    #[must_use]
    pub fn variant_for(parent: Option<Variant>, raw: &RawNode, child_index: usize) -> Variant {
        let resolved = Self::resolve(parent, &raw.kind, child_index);
        Self::reclassify(resolved, raw).unwrap_or(resolved)
    }

    fn operator_variant(raw: &RawNode) -> Option<Variant> {
        let op = raw.string_leaves().find_map(|s| match s {
            "&&" | "and" | "&&=" => Some(ShortCircuitOp::And),
            "||" | "or" | "||=" => Some(ShortCircuitOp::Or),
            _ => None,
        })?;
        let mut slots = raw
            .children
            .iter()
            .enumerate()
            .filter(|(_, c)| c.as_node().is_some())
            .map(|(i, _)| i);
        let lhs = slots.next()?;
        let rhs = slots.next()?;
        Some(Variant::ShortCircuit { op, lhs, rhs })
    }
}

fn first_node_slot(raw: &RawNode) -> Option<usize> {
    raw.children.iter().position(|c| c.as_node().is_some())
}
