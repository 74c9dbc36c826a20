use log::debug;

use crate::bounds::BoundingVolume;
use crate::bvh::node::{Branch, Leaf, Links, NodeId};
use crate::collision::contact::LmntId;
use crate::collision::primitive::CollisionPrimitive;
use crate::error::{CollisionError, Result};
use crate::utils::allocator::{GenerationalId, Pool};

/// Which of the two forests of a collision space a leaf belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForestKind {
    Static,
    Mobile,
}

impl ForestKind {
    fn pool_names(self) -> (&'static str, &'static str) {
        match self {
            ForestKind::Static => ("static leaves", "static branches"),
            ForestKind::Mobile => ("mobile leaves", "mobile branches"),
        }
    }
}

/// Dynamic bounding-volume hierarchy over leaves carrying `X` as extra data.
///
/// Leaves and branches live in fixed-capacity pools; a forest of `n` leaves
/// never needs more than `n - 1` branches.
#[derive(Debug, Clone)]
pub struct Forest<B: BoundingVolume, X> {
    kind: ForestKind,
    pub(crate) leaves: Pool<Leaf<B, X>>,
    pub(crate) branches: Pool<Branch<B>>,
    root: Option<NodeId>,
    depths_dirty: bool,
}

impl<B: BoundingVolume, X> Forest<B, X> {
    pub fn with_capacity(kind: ForestKind, capacity: usize) -> Self {
        let (leaf_pool, branch_pool) = kind.pool_names();
        Self {
            kind,
            leaves: Pool::with_capacity(leaf_pool, capacity),
            branches: Pool::with_capacity(branch_pool, capacity.saturating_sub(1)),
            root: None,
            depths_dirty: false,
        }
    }

    pub fn kind(&self) -> ForestKind {
        self.kind
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn root_view(&self) -> Option<NodeView<'_, B, X>> {
        self.root.map(|id| NodeView { forest: self, id })
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    pub fn capacity(&self) -> usize {
        self.leaves.capacity()
    }

    pub fn leaf(&self, id: GenerationalId) -> Option<&Leaf<B, X>> {
        self.leaves.get(id)
    }

    pub fn contains_leaf(&self, id: GenerationalId) -> bool {
        self.leaves.is_valid(id)
    }

    pub fn leaves(&self) -> impl Iterator<Item = (GenerationalId, &Leaf<B, X>)> + '_ {
        self.leaves.iter()
    }

    /// Forgets the collision key of every leaf.
    pub(crate) fn clear_last_collisions(&mut self) {
        for leaf in self.leaves.values_mut() {
            leaf.last_collision = None;
        }
    }

    pub fn node(&self, id: NodeId) -> Option<NodeView<'_, B, X>> {
        let valid = match id {
            NodeId::Leaf(leaf) => self.leaves.is_valid(leaf),
            NodeId::Branch(branch) => self.branches.is_valid(branch),
        };
        valid.then_some(NodeView { forest: self, id })
    }

    /// Stackless pre-order walk over every node, following `children[0]` and
    /// escape links only.
    pub fn preorder(&self) -> Preorder<'_, B, X> {
        Preorder {
            forest: self,
            next: self.root,
        }
    }

    /// Whether depths are stale since the last structural edit.
    pub fn depths_dirty(&self) -> bool {
        self.depths_dirty
    }

    /// Recomputes every node depth if a structural edit happened since the
    /// last call. Traversals require up-to-date depths.
    pub fn ensure_depths(&mut self) {
        if !self.depths_dirty {
            return;
        }
        let mut cursor = self.root;
        while let Some(node) = cursor {
            let depth = match self.links(node).parent {
                Some(parent) => self.branches[parent].links.depth + 1,
                None => 0,
            };
            self.links_mut(node).depth = depth;
            cursor = self.next_preorder(node);
        }
        self.depths_dirty = false;
    }

    /// Adds a leaf holding `primitive` with bounding volume `bv`.
    pub fn insert(
        &mut self,
        bv: B,
        id: LmntId,
        primitive: CollisionPrimitive<B::Vector>,
        extra: X,
    ) -> Result<GenerationalId> {
        let leaf = self.leaves.acquire(Leaf::new(bv, id, primitive, extra))?;
        if let Err(err) = self.insert_leaf(leaf) {
            self.leaves.release(leaf)?;
            return Err(err);
        }
        debug!("{:?} forest: inserted {:?} as {:?}", self.kind, id, leaf);
        Ok(leaf)
    }

    /// Removes a leaf and returns it. Every branch of the forest stays with two children.
    pub fn remove(&mut self, leaf: GenerationalId) -> Result<Leaf<B, X>> {
        if !self.leaves.is_valid(leaf) {
            return Err(CollisionError::InvalidHandle(leaf));
        }
        self.detach_leaf(leaf)?;
        let removed = self.leaves.release(leaf)?;
        debug!("{:?} forest: removed {:?}", self.kind, removed.id);
        Ok(removed)
    }

    pub(crate) fn bv(&self, node: NodeId) -> &B {
        match node {
            NodeId::Leaf(id) => &self.leaves[id].bv,
            NodeId::Branch(id) => &self.branches[id].bv,
        }
    }

    pub(crate) fn links(&self, node: NodeId) -> &Links {
        match node {
            NodeId::Leaf(id) => &self.leaves[id].links,
            NodeId::Branch(id) => &self.branches[id].links,
        }
    }

    fn links_mut(&mut self, node: NodeId) -> &mut Links {
        match node {
            NodeId::Leaf(id) => &mut self.leaves[id].links,
            NodeId::Branch(id) => &mut self.branches[id].links,
        }
    }

    pub(crate) fn children(&self, node: NodeId) -> Option<[NodeId; 2]> {
        node.as_branch().map(|id| self.branches[id].children)
    }

    pub(crate) fn depth(&self, node: NodeId) -> u32 {
        self.links(node).depth
    }

    fn next_preorder(&self, node: NodeId) -> Option<NodeId> {
        match self.children(node) {
            Some([left, _]) => Some(left),
            None => self.links(node).escape,
        }
    }

    /// Ancestor-or-self of `node` at `depth`.
    pub(crate) fn ancestor_at_depth(&self, mut node: NodeId, depth: u32) -> NodeId {
        while self.depth(node) > depth {
            match self.links(node).parent {
                Some(parent) => node = NodeId::Branch(parent),
                None => break,
            }
        }
        node
    }

    /// Sets the escape and last-left-ancestor links of `node` and of every
    /// node on its right spine.
    fn set_spine(
        &mut self,
        node: NodeId,
        escape: Option<NodeId>,
        last_left_ancestor: Option<GenerationalId>,
    ) {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            let links = self.links_mut(current);
            links.escape = escape;
            links.last_left_ancestor = last_left_ancestor;
            cursor = self.children(current).map(|[_, right]| right);
        }
    }

    /// Re-derives the links below `branch` from its own links.
    pub(crate) fn relink_children(&mut self, branch: GenerationalId) {
        let [left, right] = self.branches[branch].children;
        let links = self.branches[branch].links;
        self.set_spine(left, Some(right), Some(branch));
        self.set_spine(right, links.escape, links.last_left_ancestor);
    }

    fn set_parent(&mut self, node: NodeId, parent: Option<GenerationalId>) {
        self.links_mut(node).parent = parent;
    }

    fn replace_child(&mut self, branch: GenerationalId, old: NodeId, new: NodeId) {
        let children = &mut self.branches[branch].children;
        if children[0] == old {
            children[0] = new;
        } else {
            debug_assert_eq!(children[1], old, "node is not a child of its parent");
            children[1] = new;
        }
    }

    /// Recombines bounding volumes from `start` up to the root.
    fn refit_ancestors(&mut self, start: Option<GenerationalId>) {
        let mut cursor = start;
        while let Some(branch) = cursor {
            let [left, right] = self.branches[branch].children;
            let combined = self.bv(left).combine(self.bv(right));
            let node = &mut self.branches[branch];
            node.bv = combined;
            cursor = node.links.parent;
        }
    }

    /// Cheapest sibling for a new leaf following the surface-area heuristic.
    fn find_new_node_sibling(&self, root: NodeId, leaf_bv: &B) -> NodeId {
        let mut node = root;
        while let Some([left, right]) = self.children(node) {
            let bv = self.bv(node);
            let combined_surface = bv.combine(leaf_bv).surface();
            let cost = 2.0 * combined_surface;
            let inheritance = 2.0 * (combined_surface - bv.surface());

            let cost_left = self.bv(left).combine(leaf_bv).surface() + inheritance;
            let cost_right = self.bv(right).combine(leaf_bv).surface() + inheritance;

            if cost < cost_left && cost < cost_right {
                break;
            }
            node = if cost_left < cost_right { left } else { right };
        }
        node
    }

    /// Links an acquired but detached leaf into the tree.
    pub(crate) fn insert_leaf(&mut self, leaf: GenerationalId) -> Result<()> {
        let node = NodeId::Leaf(leaf);
        self.depths_dirty = true;
        let Some(root) = self.root else {
            self.leaves[leaf].links = Links::default();
            self.root = Some(node);
            return Ok(());
        };

        let leaf_bv = self.leaves[leaf].bv;
        let sibling = self.find_new_node_sibling(root, &leaf_bv);
        let sibling_links = *self.links(sibling);
        let combined = self.bv(sibling).combine(&leaf_bv);
        let branch = self.branches.acquire(Branch {
            bv: combined,
            children: [sibling, node],
            links: Links {
                parent: sibling_links.parent,
                escape: sibling_links.escape,
                last_left_ancestor: sibling_links.last_left_ancestor,
                depth: sibling_links.depth,
            },
        })?;
        self.set_parent(sibling, Some(branch));
        self.set_parent(node, Some(branch));

        match sibling_links.parent {
            Some(parent) => {
                self.replace_child(parent, sibling, NodeId::Branch(branch));
                self.relink_children(parent);
            }
            None => {
                self.root = Some(NodeId::Branch(branch));
                self.set_spine(NodeId::Branch(branch), None, None);
            }
        }
        self.relink_children(branch);
        self.refit_ancestors(sibling_links.parent);
        Ok(())
    }

    /// Unlinks a leaf from the tree without releasing it.
    pub(crate) fn detach_leaf(&mut self, leaf: GenerationalId) -> Result<()> {
        let node = NodeId::Leaf(leaf);
        self.depths_dirty = true;
        let Some(parent) = self.leaves[leaf].links.parent else {
            debug_assert_eq!(self.root, Some(node), "orphan leaf is not the root");
            self.root = None;
            self.leaves[leaf].links = Links::default();
            return Ok(());
        };

        let [left, right] = self.branches[parent].children;
        let sibling = if left == node { right } else { left };
        let grandparent = self.branches[parent].links.parent;
        self.set_parent(sibling, grandparent);

        match grandparent {
            Some(grandparent) => {
                self.replace_child(grandparent, NodeId::Branch(parent), sibling);
                self.relink_children(grandparent);
                self.refit_ancestors(Some(grandparent));
            }
            None => {
                self.root = Some(sibling);
                self.set_spine(sibling, None, None);
            }
        }
        self.branches.release(parent)?;
        self.leaves[leaf].links = Links::default();
        Ok(())
    }
}

/// Read-only view of a forest node.
#[derive(Debug)]
pub struct NodeView<'a, B: BoundingVolume, X> {
    forest: &'a Forest<B, X>,
    id: NodeId,
}

impl<B: BoundingVolume, X> Clone for NodeView<'_, B, X> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: BoundingVolume, X> Copy for NodeView<'_, B, X> {}

impl<'a, B: BoundingVolume, X> NodeView<'a, B, X> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn bv(&self) -> &'a B {
        self.forest.bv(self.id)
    }

    pub fn links(&self) -> &'a Links {
        self.forest.links(self.id)
    }

    pub fn depth(&self) -> u32 {
        self.links().depth
    }

    pub fn is_leaf(&self) -> bool {
        self.id.is_leaf()
    }

    pub fn leaf(&self) -> Option<&'a Leaf<B, X>> {
        self.id.as_leaf().map(|id| &self.forest.leaves[id])
    }

    pub fn children(&self) -> Option<[NodeView<'a, B, X>; 2]> {
        let forest = self.forest;
        forest
            .children(self.id)
            .map(|ids| ids.map(|id| NodeView { forest, id }))
    }

    pub fn parent(&self) -> Option<NodeView<'a, B, X>> {
        let forest = self.forest;
        self.links().parent.map(|id| NodeView {
            forest,
            id: NodeId::Branch(id),
        })
    }

    pub fn escape(&self) -> Option<NodeView<'a, B, X>> {
        let forest = self.forest;
        self.links().escape.map(|id| NodeView { forest, id })
    }
}

/// Iterator returned by [`Forest::preorder`].
pub struct Preorder<'a, B: BoundingVolume, X> {
    forest: &'a Forest<B, X>,
    next: Option<NodeId>,
}

impl<'a, B: BoundingVolume, X> Iterator for Preorder<'a, B, X> {
    type Item = NodeView<'a, B, X>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        self.next = self.forest.next_preorder(id);
        Some(NodeView {
            forest: self.forest,
            id,
        })
    }
}
