//! Dynamic bounding-volume hierarchy with stackless traversal links.
//!
//! Each collision space keeps two forests: a static one that only changes on
//! insert/remove, and a mobile one refit every tick. Nodes carry escape and
//! last-left-ancestor links so every walk (pre-order, post-order refit, dual
//! overlap search, ray cast) runs without recursion or an explicit stack.

pub mod forest;
pub mod node;
pub mod refit;
pub mod traversal;

pub use forest::{Forest, ForestKind, NodeView, Preorder};
pub use node::{Branch, Leaf, Links, MobileData, NodeId};
pub use traversal::{dual_traversal, run_leaf_algo, self_traversal, DualCursor};
