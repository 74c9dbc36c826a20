//! Per-tick refit of the mobile forest.

use log::trace;

use crate::bounds::BoundingVolume;
use crate::bvh::forest::Forest;
use crate::bvh::node::{MobileData, NodeId};
use crate::error::Result;
use crate::utils::allocator::GenerationalId;
use crate::world::MobilityInterface;

impl<B: BoundingVolume> Forest<B, MobileData<B>> {
    /// Applies pending mobility deltas and refits every branch bottom-up.
    ///
    /// The walk is a stackless post-order: it starts at the leftmost leaf and
    /// after each node either moves to the leftmost leaf of its right sibling
    /// or up to its parent. Leaves whose precise volume escaped their fattened
    /// volume are collected in `reinsert` and re-inserted after the walk with
    /// a freshly fattened volume. Returns the number of re-inserted leaves.
    pub fn refit_due_to_update<M>(
        &mut self,
        mobility: &mut M,
        fatten_factor: f32,
        reinsert: &mut Vec<GenerationalId>,
    ) -> Result<usize>
    where
        M: MobilityInterface<B::Vector> + ?Sized,
    {
        reinsert.clear();
        let Some(root) = self.root() else {
            return Ok(0);
        };

        let mut node = self.leftmost_leaf(root);
        loop {
            match node {
                NodeId::Leaf(leaf) => self.refit_leaf(leaf, mobility, reinsert),
                NodeId::Branch(branch) => self.reduce_sah_and_refit(branch),
            }
            let Some(parent) = self.links(node).parent else {
                break;
            };
            let [left, right] = self.branches[parent].children;
            node = if node == left {
                self.leftmost_leaf(right)
            } else {
                NodeId::Branch(parent)
            };
        }

        for &leaf in reinsert.iter() {
            self.detach_leaf(leaf)?;
            let entry = &mut self.leaves[leaf];
            entry.extra.fattened = entry.bv.fattened(fatten_factor);
            let id = entry.id;
            self.insert_leaf(leaf)?;
            trace!("reinserted {id:?} into the mobile forest");
        }
        Ok(reinsert.len())
    }

    fn leftmost_leaf(&self, mut node: NodeId) -> NodeId {
        while let Some([left, _]) = self.children(node) {
            node = left;
        }
        node
    }

    fn refit_leaf<M>(
        &mut self,
        leaf: GenerationalId,
        mobility: &mut M,
        reinsert: &mut Vec<GenerationalId>,
    ) where
        M: MobilityInterface<B::Vector> + ?Sized,
    {
        let entry = &mut self.leaves[leaf];
        let Some(delta) = mobility.take_delta(entry.id) else {
            return;
        };
        entry.primitive.transform(&delta);
        entry.bv = B::from_aabb(&entry.primitive.aabb());
        if !entry.extra.fattened.contains(&entry.bv) {
            reinsert.push(leaf);
        }
    }

    /// Recombines the volume of `branch`, first trying two grandchild swaps
    /// ("rolls") when both children are branches and keeping the one with
    /// the smallest summed child surface.
    pub(crate) fn reduce_sah_and_refit(&mut self, branch: GenerationalId) {
        let [left, right] = self.branches[branch].children;
        if let (NodeId::Branch(lb), NodeId::Branch(rb)) = (left, right) {
            let [ll, lr] = self.branches[lb].children;
            let [rl, rr] = self.branches[rb].children;
            let surface = |a: NodeId, b: NodeId| self.bv(a).combine(self.bv(b)).surface();

            let base = self.bv(left).surface() + self.bv(right).surface();
            // Roll 1 swaps `ll` with `rl`, roll 2 swaps `ll` with `rr`.
            let roll_1 = surface(rl, lr) + surface(ll, rr);
            let roll_2 = surface(rr, lr) + surface(rl, ll);

            if roll_1 < base && roll_1 <= roll_2 {
                self.swap_grandchildren(lb, rb, 0);
            } else if roll_2 < base {
                self.swap_grandchildren(lb, rb, 1);
            }
        }
        let combined = self.bv(left).combine(self.bv(right));
        self.branches[branch].bv = combined;
    }

    /// Swaps the left child of `lb` with child `slot` of `rb`. Both moved
    /// subtrees stay at the same depth.
    fn swap_grandchildren(&mut self, lb: GenerationalId, rb: GenerationalId, slot: usize) {
        let from_left = self.branches[lb].children[0];
        let from_right = self.branches[rb].children[slot];
        self.branches[lb].children[0] = from_right;
        self.branches[rb].children[slot] = from_left;
        self.set_parent_of(from_right, lb);
        self.set_parent_of(from_left, rb);

        for branch in [lb, rb] {
            let [a, b] = self.branches[branch].children;
            let combined = self.bv(a).combine(self.bv(b));
            self.branches[branch].bv = combined;
            self.relink_children(branch);
        }
    }

    fn set_parent_of(&mut self, node: NodeId, parent: GenerationalId) {
        match node {
            NodeId::Leaf(id) => self.leaves[id].links.parent = Some(parent),
            NodeId::Branch(id) => self.branches[id].links.parent = Some(parent),
        }
    }
}
