//! Branching conversation history.
//!
//! A conversation is an append-only log of nodes (`ConversationData::mapping`).
//! Regenerating a reply adds a sibling under the same parent, and the set of
//! linear branches is derived from the log on demand. `ConversationTree`
//! owns one log plus the pointer to the active branch; the functions in
//! [`navigator`] compute sibling sets and branch switches over it.

pub mod branch;
pub mod data;
pub mod message;
pub mod navigator;
pub mod store;
pub mod tree;

pub use branch::{derive_branches, Branch};
pub use data::{ConversationData, Node};
pub use message::{Message, NewMessage, Role};
pub use navigator::{BranchSwitch, Direction};
pub use store::{ConversationStore, MemoryStore, StoreError};
pub use tree::ConversationTree;
