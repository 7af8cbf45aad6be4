//! Object Explorer Tree
//!
//! Each connection's materialized subtree lives in a [`TreeArena`]: nodes are
//! addressed by [`NodeId`], parent and child links are ids rather than owning
//! pointers, and a path index gives O(1) lookup by node path.

pub mod arena;
pub mod node;
pub mod path;

pub use arena::TreeArena;
pub use node::{NodeId, TreeNode};
