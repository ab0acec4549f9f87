//! Positional reconciliation of a fresh aggregation response against the existing forest.
//!
//! The new buckets and the old nodes are walked in lock-step, depth first, by position. A
//! node survives when the bucket at its position has the same key, the same level and the
//! same leafness; it then takes the new counts and keeps everything the analyst did to it.
//! Any other node at that position is replaced by a fresh collapsed one, and nodes past the
//! end of the incoming list are dropped.

use triage_query::{GroupPath, GroupResult};

use crate::node::{GroupNode, child_field};

/// Shared inputs and outputs of one reconciliation pass.
pub struct Pass<'a> {
    /// Group-by fields, outermost first.
    pub group_by: &'a [String],
    /// Page size for nodes created in this pass.
    pub page_size: usize,
    /// Paths of replaced or dropped nodes that had a fetch outstanding or polling.
    pub cancelled: Vec<GroupPath>,
}

/// Reconciles one sibling list in place.
///
/// `field` is the group-by field the incoming buckets are keyed by and `parent` the path of
/// the node that owns the list.
pub fn reconcile_level(
    existing: &mut Vec<GroupNode>,
    incoming: &[GroupResult],
    parent: &GroupPath,
    field: &str,
    level: usize,
    pass: &mut Pass<'_>,
) {
    for (position, result) in incoming.iter().enumerate() {
        match existing.get_mut(position) {
            Some(node) if node.matches(result, level) => {
                node.total = result.total;
                node.score = result.score;
                match child_field(result, level, pass.group_by) {
                    Some(child) if !result.is_leaf() => {
                        let path = node.path.clone();
                        reconcile_level(
                            &mut node.children,
                            result.children(),
                            &path,
                            child,
                            level + 1,
                            pass,
                        );
                    }
                    _ => node.children.clear(),
                }
            }
            Some(node) => {
                node.subscribed_paths(&mut pass.cancelled);
                *node = fresh(result, parent, field, level, pass);
            }
            None => existing.push(fresh(result, parent, field, level, pass)),
        }
    }

    if existing.len() > incoming.len() {
        for stale in existing.drain(incoming.len()..) {
            stale.subscribed_paths(&mut pass.cancelled);
        }
    }
}

/// Builds a new node for a bucket at the given position.
fn fresh(
    result: &GroupResult,
    parent: &GroupPath,
    field: &str,
    level: usize,
    pass: &Pass<'_>,
) -> GroupNode {
    GroupNode::from_result(
        result,
        parent.child(field, &result.key),
        level,
        pass.page_size,
        pass.group_by,
    )
}
