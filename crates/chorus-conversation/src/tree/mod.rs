//! The conversation tree: an append-only node log plus the active branch.

use chorus_common::new_id;
use chrono::Utc;
use tracing::{debug, warn};

use crate::branch::{derive_branches, Branch};
use crate::data::{ConversationData, Node};
use crate::message::NewMessage;
use crate::navigator::{self, Direction};


/// Owns one `ConversationData` and the pointer to its active branch.
///
/// The active branch is identified by its `branch_start_node_id`. It is
/// computed lazily from the most recent node until something selects a
/// branch explicitly, and is forced to the new node's branch on append.
#[derive(Debug, Clone, Default)]
pub struct ConversationTree {
    data: ConversationData,
    active_branch: Option<String>,
}

impl ConversationTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(title: impl Into<String>) -> Self {
        Self::from_data(ConversationData::new(title))
    }

    pub fn from_data(data: ConversationData) -> Self {
        Self {
            data,
            active_branch: None,
        }
    }

    pub fn data(&self) -> &ConversationData {
        &self.data
    }

    pub fn into_data(self) -> ConversationData {
        self.data
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.data.node(id)
    }

    /// Append one node holding `message`.
    ///
    /// The parent is `parent` when given and known, otherwise the most
    /// recently appended node; an empty log makes the node the root.
    pub fn add_message(&mut self, message: NewMessage, parent: Option<&str>) -> Node {
        let parent_id = match parent {
            Some(id) if self.data.node(id).is_some() => Some(id.to_string()),
            Some(id) => {
                warn!(parent = %id, "unknown parent node, appending to latest node");
                self.latest_node_id()
            }
            None => self.latest_node_id(),
        };

        let now = Utc::now();
        let id = new_id();
        let node = Node {
            id: id.clone(),
            message: Some(message.into_message(id.clone(), now)),
            parent: parent_id.clone(),
            children: Vec::new(),
        };
        self.data.mapping.push(node.clone());

        match parent_id {
            Some(ref parent_id) => {
                if let Some(parent) = self.data.node_mut(parent_id) {
                    parent.children.push(id.clone());
                }
            }
            None => self.data.root_node_id = Some(id.clone()),
        }
        self.data.current_node_id = Some(id.clone());
        self.data.update_time = now;

        self.update_branch(Some(&id), true);
        debug!(node_id = %id, parent = ?parent_id, "appended conversation node");
        node
    }

    /// Every branch derived from the log, in creation order.
    pub fn branches(&self) -> Vec<Branch> {
        derive_branches(&self.data.mapping)
    }

    /// Start id of the active branch.
    pub fn active_branch(&self) -> Option<String> {
        match self.active_branch {
            Some(ref id) => Some(id.clone()),
            None => self.branch_ending_at(self.latest_node_id().as_deref()?),
        }
    }

    /// Nodes on the active branch, root first.
    pub fn nodes(&self) -> Vec<&Node> {
        let Some(active) = self.active_branch() else {
            return Vec::new();
        };
        self.branches()
            .into_iter()
            .find(|b| b.branch_start_node_id == active)
            .map(|b| {
                b.node_ids
                    .iter()
                    .filter_map(|id| self.data.node(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Last node on the active branch, the natural parent for a follow-up.
    pub fn active_tail(&self) -> Option<String> {
        self.nodes().last().map(|n| n.id.clone())
    }

    /// Children of `node_id`'s parent. Empty for unknown nodes and roots.
    pub fn get_siblings(&self, node_id: &str) -> Vec<String> {
        navigator::siblings(&self.data, node_id).to_vec()
    }

    pub fn sibling_index(&self, node_id: &str) -> usize {
        navigator::sibling_index(&self.data, node_id)
    }

    /// Move from `node_id` to its previous or next sibling.
    ///
    /// Returns the selected sibling's id, or `None` (active branch
    /// unchanged) when there is nowhere to move.
    pub fn change_branch(&mut self, direction: Direction, node_id: &str) -> Option<String> {
        self.update_branch(None, false);

        let branches = self.branches();
        let switch = navigator::switch_branch(&self.data, &branches, direction, node_id)?;
        match switch.branch {
            Some(branch) => {
                debug!(selected = %switch.selected, branch = %branch, "switched branch");
                self.active_branch = Some(branch);
            }
            None => {
                warn!(selected = %switch.selected, "no branch matches selected sibling");
            }
        }
        Some(switch.selected)
    }

    /// Recompute the active branch. Without `force` an already selected
    /// branch is kept.
    fn update_branch(&mut self, node_id: Option<&str>, force: bool) {
        if self.active_branch.is_some() && !force {
            return;
        }
        let node_id = match node_id {
            Some(id) => Some(id.to_string()),
            None => self.latest_node_id(),
        };
        if let Some(branch) = node_id.as_deref().and_then(|id| self.branch_ending_at(id)) {
            self.active_branch = Some(branch);
        }
    }

    fn branch_ending_at(&self, node_id: &str) -> Option<String> {
        self.branches()
            .into_iter()
            .find(|b| b.tail() == Some(node_id))
            .map(|b| b.branch_start_node_id)
    }

    fn latest_node_id(&self) -> Option<String> {
        self.data.mapping.last().map(|n| n.id.clone())
    }
}
