use crate::bounds::BoundingVolume;
use crate::collision::contact::{LmntId, PairKey};
use crate::collision::primitive::CollisionPrimitive;
use crate::collision::sat::SatSpace;
use crate::utils::allocator::GenerationalId;

/// Handle of a forest node. Leaves and branches live in separate pools, so
/// the variant also says which pool the id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    Leaf(GenerationalId),
    Branch(GenerationalId),
}

impl NodeId {
    pub fn is_leaf(self) -> bool {
        matches!(self, NodeId::Leaf(_))
    }

    pub fn as_leaf(self) -> Option<GenerationalId> {
        match self {
            NodeId::Leaf(id) => Some(id),
            NodeId::Branch(_) => None,
        }
    }

    pub fn as_branch(self) -> Option<GenerationalId> {
        match self {
            NodeId::Branch(id) => Some(id),
            NodeId::Leaf(_) => None,
        }
    }
}

/// Structural links of a node.
///
/// `escape` is the next node of a pre-order walk once this node's subtree
/// is exhausted. `last_left_ancestor` is the parent of the nearest
/// ancestor-or-self that is a left child, so `escape` always equals that
/// branch's right child. Both are `None` on the root's right spine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Links {
    pub parent: Option<GenerationalId>,
    pub escape: Option<NodeId>,
    pub last_left_ancestor: Option<GenerationalId>,
    pub depth: u32,
}

/// Extra state carried by mobile leaves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MobileData<B> {
    /// Enlarged volume; the leaf is re-inserted once its precise volume leaves it.
    pub fattened: B,
}

#[derive(Debug, Clone)]
pub struct Leaf<B: BoundingVolume, X> {
    pub(crate) bv: B,
    pub(crate) id: LmntId,
    pub(crate) primitive: CollisionPrimitive<B::Vector>,
    pub(crate) links: Links,
    pub(crate) last_collision: Option<PairKey>,
    pub(crate) extra: X,
}

impl<B: BoundingVolume, X> Leaf<B, X> {
    pub(crate) fn new(
        bv: B,
        id: LmntId,
        primitive: CollisionPrimitive<B::Vector>,
        extra: X,
    ) -> Self {
        Self {
            bv,
            id,
            primitive,
            links: Links::default(),
            last_collision: None,
            extra,
        }
    }

    /// Precise bounding volume of the primitive.
    pub fn bv(&self) -> &B {
        &self.bv
    }

    pub fn id(&self) -> LmntId {
        self.id
    }

    pub fn primitive(&self) -> &CollisionPrimitive<B::Vector> {
        &self.primitive
    }

    pub fn links(&self) -> &Links {
        &self.links
    }

    /// Key of a collision involving this leaf confirmed by the latest
    /// narrow phase, if any.
    pub fn last_collision(&self) -> Option<PairKey> {
        self.last_collision
    }

    pub fn extra(&self) -> &X {
        &self.extra
    }

    pub fn into_primitive(self) -> CollisionPrimitive<B::Vector> {
        self.primitive
    }

    pub(crate) fn parts_mut(&mut self) -> LeafMut<'_, B::Vector> {
        LeafMut {
            id: self.id,
            primitive: &mut self.primitive,
            last_collision: &mut self.last_collision,
        }
    }
}

/// Mutable narrow-phase view of a leaf, independent of the forest's extra data.
pub(crate) struct LeafMut<'a, V: SatSpace> {
    pub id: LmntId,
    pub primitive: &'a mut CollisionPrimitive<V>,
    pub last_collision: &'a mut Option<PairKey>,
}

#[derive(Debug, Clone)]
pub struct Branch<B> {
    pub(crate) bv: B,
    pub(crate) children: [NodeId; 2],
    pub(crate) links: Links,
}

impl<B> Branch<B> {
    pub fn bv(&self) -> &B {
        &self.bv
    }

    pub fn children(&self) -> [NodeId; 2] {
        self.children
    }

    pub fn links(&self) -> &Links {
        &self.links
    }
}
