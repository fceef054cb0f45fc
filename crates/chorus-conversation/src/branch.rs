//! Branch derivation from the flat node log.
//!
//! Branches are recomputed from `mapping` in creation order:
//!
//! 1. a node without a parent starts a new branch;
//! 2. a node whose parent is the tail of an existing branch extends it;
//! 3. otherwise the parent sits mid-branch, so a new branch is created from
//!    a copy of that branch up to and including the parent, plus the node.
//!    The new branch's start id is recorded in the source branch's
//!    `branch_children`.
//!
//! The result depends only on `mapping`, so deriving twice yields the same
//! branches.

use serde::Serialize;
use tracing::warn;

use crate::data::Node;

/// A maximal linear path through the node graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    /// First node unique to this branch. Equals the root id for a trunk.
    pub branch_start_node_id: String,
    /// Root of the lineage this branch was copied from.
    pub node_start_id: String,
    /// Every node on the path, root first.
    pub node_ids: Vec<String>,
    /// Divergence point this branch split from, `None` for a trunk.
    pub parent: Option<String>,
    /// Start ids of branches that diverged from a node of this branch.
    pub branch_children: Vec<String>,
}

impl Branch {
    fn trunk(root_id: &str) -> Self {
        Self {
            branch_start_node_id: root_id.to_string(),
            node_start_id: root_id.to_string(),
            node_ids: vec![root_id.to_string()],
            parent: None,
            branch_children: Vec::new(),
        }
    }

    pub fn is_trunk(&self) -> bool {
        self.parent.is_none()
    }

    pub fn tail(&self) -> Option<&str> {
        self.node_ids.last().map(String::as_str)
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.node_ids.iter().any(|id| id == node_id)
    }

    pub fn len(&self) -> usize {
        self.node_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }
}

/// Rebuild every branch from the node log.
pub fn derive_branches(mapping: &[Node]) -> Vec<Branch> {
    let mut branches: Vec<Branch> = Vec::new();

    for node in mapping {
        let Some(parent_id) = node.parent.as_deref() else {
            branches.push(Branch::trunk(&node.id));
            continue;
        };

        if let Some(branch) = branches.iter_mut().find(|b| b.tail() == Some(parent_id)) {
            branch.node_ids.push(node.id.clone());
            continue;
        }

        let source = branches.iter().position(|b| b.contains(parent_id));
        match source {
            Some(index) => {
                let source = &mut branches[index];
                let cut = source
                    .node_ids
                    .iter()
                    .position(|id| id == parent_id)
                    .map_or(source.node_ids.len(), |p| p + 1);
                let mut node_ids = source.node_ids[..cut].to_vec();
                node_ids.push(node.id.clone());
                source.branch_children.push(node.id.clone());

                let diverged = Branch {
                    branch_start_node_id: node.id.clone(),
                    node_start_id: source.node_start_id.clone(),
                    node_ids,
                    parent: Some(parent_id.to_string()),
                    branch_children: Vec::new(),
                };
                branches.push(diverged);
            }
            None => {
                // Only reachable for logs that were not built through
                // append; keep the node visible as its own lineage.
                warn!(node_id = %node.id, parent = %parent_id, "node parent missing from log");
                branches.push(Branch::trunk(&node.id));
            }
        }
    }

    branches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, parent: Option<&str>) -> Node {
        Node {
            id: id.into(),
            message: None,
            parent: parent.map(String::from),
            children: vec![],
        }
    }

    #[test]
    fn empty_log_has_no_branches() {
        assert!(derive_branches(&[]).is_empty());
    }

    #[test]
    fn linear_log_is_one_trunk() {
        let mapping = vec![node("a", None), node("b", Some("a")), node("c", Some("b"))];
        let branches = derive_branches(&mapping);
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].branch_start_node_id, "a");
        assert_eq!(branches[0].node_ids, vec!["a", "b", "c"]);
        assert!(branches[0].is_trunk());
    }

    #[test]
    fn mid_branch_parent_copies_prefix() {
        let mapping = vec![
            node("a", None),
            node("b", Some("a")),
            node("c", Some("b")),
            node("d", Some("a")),
        ];
        let branches = derive_branches(&mapping);
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[0].branch_children, vec!["d"]);
        assert_eq!(branches[1].branch_start_node_id, "d");
        assert_eq!(branches[1].node_start_id, "a");
        assert_eq!(branches[1].node_ids, vec!["a", "d"]);
        assert_eq!(branches[1].parent.as_deref(), Some("a"));
    }

    #[test]
    fn diverged_branch_keeps_growing() {
        let mapping = vec![
            node("a", None),
            node("b", Some("a")),
            node("d", Some("a")),
            node("e", Some("d")),
        ];
        let branches = derive_branches(&mapping);
        assert_eq!(branches.len(), 2);
        assert_eq!(branches[1].node_ids, vec!["a", "d", "e"]);
    }

    #[test]
    fn divergence_from_a_diverged_branch() {
        let mapping = vec![
            node("a", None),
            node("b", Some("a")),
            node("c", Some("a")),
            node("d", Some("c")),
            node("e", Some("c")),
        ];
        let branches = derive_branches(&mapping);
        assert_eq!(branches.len(), 3);
        assert_eq!(branches[1].branch_children, vec!["e"]);
        assert_eq!(branches[2].node_ids, vec!["a", "c", "e"]);
        assert_eq!(branches[2].parent.as_deref(), Some("c"));
    }

    #[test]
    fn derivation_is_idempotent() {
        let mapping = vec![
            node("a", None),
            node("b", Some("a")),
            node("c", Some("a")),
            node("d", Some("b")),
            node("e", Some("a")),
        ];
        assert_eq!(derive_branches(&mapping), derive_branches(&mapping));
    }

    #[test]
    fn orphan_node_is_not_lost() {
        let mapping = vec![node("a", None), node("x", Some("missing"))];
        let branches = derive_branches(&mapping);
        assert!(branches.iter().any(|b| b.contains("x")));
    }
}
