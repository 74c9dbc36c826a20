use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use crate::utils::math::SpaceVector;

/// Maximum number of points kept in a [`ContactManifold`].
pub const MAX_CONTACT_POINTS: usize = 8;

/// Identifies a scene element: model index plus instance index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct LmntId {
    pub model_idx: u32,
    pub instance_idx: u32,
}

impl LmntId {
    pub fn new(model_idx: u32, instance_idx: u32) -> Self {
        Self {
            model_idx,
            instance_idx,
        }
    }
}

/// Unordered pair of element ids in canonical order (`first <= second`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey {
    first: LmntId,
    second: LmntId,
}

impl PairKey {
    pub fn new(a: LmntId, b: LmntId) -> Self {
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    pub fn first(&self) -> LmntId {
        self.first
    }

    pub fn second(&self) -> LmntId {
        self.second
    }

    pub fn involves(&self, id: LmntId) -> bool {
        self.first == id || self.second == id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactPoint<V> {
    pub position: V,
    pub depth: f32,
}

/// Contact normal (pointing from the pair's first element to its second),
/// deepest penetration and up to [`MAX_CONTACT_POINTS`] contact points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactManifold<V> {
    pub normal: V,
    pub depth: f32,
    pub points: ArrayVec<ContactPoint<V>, MAX_CONTACT_POINTS>,
}

impl<V: SpaceVector> Default for ContactManifold<V> {
    fn default() -> Self {
        Self {
            normal: V::ZERO,
            depth: 0.0,
            points: ArrayVec::new(),
        }
    }
}

impl<V: SpaceVector> ContactManifold<V> {
    pub fn clear(&mut self) {
        self.normal = V::ZERO;
        self.depth = 0.0;
        self.points.clear();
    }

    /// Appends a point and keeps `depth` at the deepest one. Points beyond
    /// capacity are dropped.
    pub fn push_point(&mut self, position: V, depth: f32) {
        if self.points.try_push(ContactPoint { position, depth }).is_ok() {
            self.depth = if self.points.len() == 1 {
                depth
            } else {
                self.depth.max(depth)
            };
        }
    }

    /// Single-point manifold.
    pub fn set_single(&mut self, normal: V, position: V, depth: f32) {
        self.clear();
        self.normal = normal;
        self.push_point(position, depth);
    }

    pub fn flip(&mut self) {
        self.normal = -self.normal;
    }
}

/// Lifecycle of a colliding pair in the collision record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionState {
    Start,
    Persist,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionData<V> {
    pub key: PairKey,
    pub manifold: ContactManifold<V>,
    pub state: CollisionState,
}

impl<V: SpaceVector> CollisionData<V> {
    pub fn new(key: PairKey, manifold: ContactManifold<V>) -> Self {
        Self {
            key,
            manifold,
            state: CollisionState::Start,
        }
    }
}

/// Per-tick output: pairs that started colliding and pairs that stopped.
///
/// Both buffers are reserved at construction and refilled in place every tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollisionsData<V> {
    pub collisions: Vec<CollisionData<V>>,
    pub detachments: Vec<CollisionData<V>>,
}

impl<V: SpaceVector> CollisionsData<V> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            collisions: Vec::with_capacity(capacity),
            detachments: Vec::with_capacity(capacity),
        }
    }

    pub fn collisions_count(&self) -> usize {
        self.collisions.len()
    }

    pub fn detachments_count(&self) -> usize {
        self.detachments.len()
    }

    pub fn clear(&mut self) {
        self.collisions.clear();
        self.detachments.clear();
    }
}
