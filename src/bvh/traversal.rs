//! Stackless overlap search between two subtrees.
//!
//! The dual traversal behaves like the recursive scheme
//!
//! ```text
//! visit(a, b):
//!     if !overlap(a, b): return
//!     both leaves      -> report
//!     one leaf         -> scan the other subtree
//!     level(a) <= level(b) -> visit(a.0, b); visit(a.1, b)
//!     otherwise            -> visit(a, b.0); visit(a, b.1)
//! ```
//!
//! but keeps only the current cursor pair. Splits alternate between the two
//! sides, so the pending right-hand branches of the implicit recursion are
//! exactly the escape targets of the left-child ancestors of both cursors.
//! The deepest of them is found from the remaining chain length (RCL) of each
//! cursor's last left-child ancestor, and the other cursor is rewound to the
//! depth it had when that split happened.

use crate::bounds::BoundingVolume;
use crate::bvh::forest::Forest;
use crate::bvh::node::NodeId;
use crate::error::Result;
use crate::utils::allocator::GenerationalId;

/// Scans subtree `subtree` of `forest` for leaves overlapping `leaf_bv`,
/// following `children[0]` on overlap and escape links otherwise.
pub fn run_leaf_algo<B, X, F>(
    leaf_bv: &B,
    forest: &Forest<B, X>,
    subtree: NodeId,
    report: &mut F,
) -> Result<()>
where
    B: BoundingVolume,
    F: FnMut(GenerationalId) -> Result<()>,
{
    let stop = forest.links(subtree).escape;
    let mut node = subtree;
    loop {
        if forest.bv(node).intersects(leaf_bv) {
            match forest.children(node) {
                Some([left, _]) => {
                    node = left;
                    continue;
                }
                None => {
                    if let NodeId::Leaf(leaf) = node {
                        report(leaf)?;
                    }
                }
            }
        }
        match forest.links(node).escape {
            Some(next) if Some(next) != stop => node = next,
            _ => break,
        }
    }
    Ok(())
}

/// Cursor pair of a dual traversal together with the depths of the two
/// subtree roots it started from.
#[derive(Debug, Clone, Copy)]
pub struct DualCursor {
    a: NodeId,
    b: NodeId,
    base_a: u32,
    base_b: u32,
}

impl DualCursor {
    pub fn new<B: BoundingVolume, XA, XB>(
        fa: &Forest<B, XA>,
        a: NodeId,
        fb: &Forest<B, XB>,
        b: NodeId,
    ) -> Self {
        Self {
            a,
            b,
            base_a: fa.depth(a),
            base_b: fb.depth(b),
        }
    }

    /// Handles the current pair and moves to the next one. Returns `false`
    /// once the traversal is complete.
    pub fn run_stackless_algo_iteration<B, XA, XB, F>(
        &mut self,
        fa: &Forest<B, XA>,
        fb: &Forest<B, XB>,
        sink: &mut F,
    ) -> Result<bool>
    where
        B: BoundingVolume,
        F: FnMut(GenerationalId, GenerationalId) -> Result<()>,
    {
        let bv_a = fa.bv(self.a);
        let bv_b = fb.bv(self.b);
        if bv_a.intersects(bv_b) {
            match (self.a, self.b) {
                (NodeId::Leaf(x), NodeId::Leaf(y)) => sink(x, y)?,
                (NodeId::Leaf(x), NodeId::Branch(_)) => {
                    run_leaf_algo(bv_a, fb, self.b, &mut |y| sink(x, y))?;
                }
                (NodeId::Branch(_), NodeId::Leaf(y)) => {
                    run_leaf_algo(bv_b, fa, self.a, &mut |x| sink(x, y))?;
                }
                (NodeId::Branch(a), NodeId::Branch(b)) => {
                    let level_a = fa.depth(self.a) - self.base_a;
                    let level_b = fb.depth(self.b) - self.base_b;
                    if level_a <= level_b {
                        self.a = fa.branches[a].children[0];
                    } else {
                        self.b = fb.branches[b].children[0];
                    }
                    return Ok(true);
                }
            }
        }
        Ok(self.advance(fa, fb))
    }

    /// Moves to the next pending pair of the implicit recursion.
    fn advance<B: BoundingVolume, XA, XB>(
        &mut self,
        fa: &Forest<B, XA>,
        fb: &Forest<B, XB>,
    ) -> bool {
        let pending_a = pending_split(fa, self.a, self.base_a);
        let pending_b = pending_split(fb, self.b, self.base_b);

        // A split producing level `l` of side a happened at recursion depth
        // `2l - 2`, one producing level `l` of side b at `2l - 1`.
        let take_a = match (pending_a, pending_b) {
            (None, None) => return false,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (Some((level_a, _)), Some((level_b, _))) => 2 * level_a > 2 * level_b + 1,
        };

        if take_a {
            let Some((level, right)) = pending_a else {
                return false;
            };
            self.a = right;
            self.b = fb.ancestor_at_depth(self.b, self.base_b + level - 1);
        } else {
            let Some((level, right)) = pending_b else {
                return false;
            };
            self.b = right;
            self.a = fa.ancestor_at_depth(self.a, self.base_a + level);
        }
        true
    }
}

/// Level (relative to `base`) of the deepest left-child ancestor-or-self of
/// `node` below the subtree root, and its right sibling.
fn pending_split<B: BoundingVolume, X>(
    forest: &Forest<B, X>,
    node: NodeId,
    base: u32,
) -> Option<(u32, NodeId)> {
    let ancestor = forest.links(node).last_left_ancestor?;
    let branch = &forest.branches[ancestor];
    let depth = branch.links.depth;
    (depth >= base).then(|| (depth + 1 - base, branch.children[1]))
}

/// Reports every overlapping leaf pair `(x, y)` with `x` under `a` in `fa`
/// and `y` under `b` in `fb`, each exactly once.
pub fn dual_traversal<B, XA, XB, F>(
    fa: &Forest<B, XA>,
    a: NodeId,
    fb: &Forest<B, XB>,
    b: NodeId,
    sink: &mut F,
) -> Result<()>
where
    B: BoundingVolume,
    F: FnMut(GenerationalId, GenerationalId) -> Result<()>,
{
    debug_assert!(
        !fa.depths_dirty() && !fb.depths_dirty(),
        "depths must be repaired before traversal"
    );
    let mut cursor = DualCursor::new(fa, a, fb, b);
    while cursor.run_stackless_algo_iteration(fa, fb, sink)? {}
    Ok(())
}

/// Reports every overlapping pair of distinct leaves of `forest` exactly once
/// by crossing the two children of each branch.
pub fn self_traversal<B, X, F>(forest: &Forest<B, X>, sink: &mut F) -> Result<()>
where
    B: BoundingVolume,
    F: FnMut(GenerationalId, GenerationalId) -> Result<()>,
{
    let mut cursor = forest.root();
    while let Some(node) = cursor {
        match forest.children(node) {
            Some([left, right]) => {
                dual_traversal(forest, left, forest, right, sink)?;
                cursor = Some(left);
            }
            None => cursor = forest.links(node).escape,
        }
    }
    Ok(())
}
