//! Sibling lookup and branch switching.
//!
//! These are pure functions over a conversation log and its derived
//! branches; `ConversationTree` applies their results to its active branch
//! pointer. Unknown node ids produce empty results instead of errors.

use serde::{Deserialize, Serialize};

use crate::branch::Branch;
use crate::data::ConversationData;

/// Which neighbouring sibling to move to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Previous,
    Next,
}

/// Outcome of a successful move between siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchSwitch {
    /// Sibling that was moved to.
    pub selected: String,
    /// Branch to activate, `None` when no branch could be matched and the
    /// active branch stays as it is.
    pub branch: Option<String>,
}

/// Children of `node_id`'s parent, including `node_id` itself.
pub fn siblings<'a>(data: &'a ConversationData, node_id: &str) -> &'a [String] {
    data.node(node_id)
        .and_then(|node| node.parent.as_deref())
        .and_then(|parent| data.node(parent))
        .map(|parent| parent.children.as_slice())
        .unwrap_or(&[])
}

/// Position of `node_id` among its siblings, `0` when it has none.
pub fn sibling_index(data: &ConversationData, node_id: &str) -> usize {
    siblings(data, node_id)
        .iter()
        .position(|id| id == node_id)
        .unwrap_or(0)
}

/// Compute the move from `node_id` to its neighbouring sibling.
///
/// Returns `None` when the node is unknown, its parent is not a divergence
/// point, or the move would run past either end of the sibling list.
pub fn switch_branch(
    data: &ConversationData,
    branches: &[Branch],
    direction: Direction,
    node_id: &str,
) -> Option<BranchSwitch> {
    let parent_id = data.node(node_id)?.parent.as_deref()?;
    if !branches
        .iter()
        .any(|b| b.parent.as_deref() == Some(parent_id))
    {
        return None;
    }

    let children = siblings(data, node_id);
    let index = children.iter().position(|id| id == node_id)?;
    let target = match direction {
        Direction::Previous => index.checked_sub(1)?,
        Direction::Next => index + 1,
    };
    let selected = children.get(target)?.clone();

    if let Some(branch) = branches.iter().find(|b| {
        b.branch_start_node_id == selected && b.parent.as_deref() == Some(parent_id)
    }) {
        return Some(BranchSwitch {
            branch: Some(branch.branch_start_node_id.clone()),
            selected,
        });
    }

    // The selected sibling never diverged, so it lives on the branch that
    // was current before the split. That branch is the one still holding
    // divergence bookkeeping for every other sibling.
    let others: Vec<&String> = children.iter().filter(|c| **c != selected).collect();
    let branch = branches
        .iter()
        .filter(|b| !b.branch_children.is_empty())
        .find(|b| others.iter().all(|c| b.branch_children.contains(c)))
        .map(|b| b.branch_start_node_id.clone());

    Some(BranchSwitch { selected, branch })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branch::derive_branches;
    use crate::data::Node;

    fn data(nodes: &[(&str, Option<&str>)]) -> ConversationData {
        let mut data = ConversationData::default();
        for (id, parent) in nodes {
            data.mapping.push(Node {
                id: id.to_string(),
                message: None,
                parent: parent.map(String::from),
                children: vec![],
            });
            if let Some(parent) = parent {
                if let Some(p) = data.node_mut(parent) {
                    p.children.push(id.to_string());
                }
            }
        }
        data
    }

    #[test]
    fn siblings_of_unknown_node_are_empty() {
        let data = data(&[("a", None)]);
        assert!(siblings(&data, "missing").is_empty());
        assert!(siblings(&data, "a").is_empty());
    }

    #[test]
    fn siblings_in_creation_order() {
        let data = data(&[("a", None), ("b", Some("a")), ("c", Some("a"))]);
        assert_eq!(siblings(&data, "c"), ["b", "c"]);
        assert_eq!(sibling_index(&data, "c"), 1);
    }

    #[test]
    fn no_switch_without_divergence() {
        let data = data(&[("a", None), ("b", Some("a"))]);
        let branches = derive_branches(&data.mapping);
        assert_eq!(switch_branch(&data, &branches, Direction::Next, "b"), None);
    }

    #[test]
    fn switch_to_diverged_sibling() {
        let data = data(&[("a", None), ("b", Some("a")), ("c", Some("a"))]);
        let branches = derive_branches(&data.mapping);
        let switch = switch_branch(&data, &branches, Direction::Next, "b").unwrap();
        assert_eq!(switch.selected, "c");
        assert_eq!(switch.branch.as_deref(), Some("c"));
    }

    #[test]
    fn switch_back_reattaches_trunk() {
        let data = data(&[("a", None), ("b", Some("a")), ("c", Some("a"))]);
        let branches = derive_branches(&data.mapping);
        let switch = switch_branch(&data, &branches, Direction::Previous, "c").unwrap();
        assert_eq!(switch.selected, "b");
        assert_eq!(switch.branch.as_deref(), Some("a"));
    }

    #[test]
    fn moving_past_either_end_is_none() {
        let data = data(&[("a", None), ("b", Some("a")), ("c", Some("a"))]);
        let branches = derive_branches(&data.mapping);
        assert_eq!(switch_branch(&data, &branches, Direction::Previous, "b"), None);
        assert_eq!(switch_branch(&data, &branches, Direction::Next, "c"), None);
    }
}
