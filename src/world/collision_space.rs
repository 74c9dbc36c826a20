//! One dimensionality's worth of collision state: a static and a mobile
//! forest, the collision record and the reusable per-tick buffers.

use std::time::Duration;

use log::{debug, trace};

use crate::bounds::{Aabb, BoundingVolume};
use crate::bvh::forest::{Forest, ForestKind};
use crate::bvh::node::{Leaf, LeafMut, MobileData};
use crate::bvh::traversal::{dual_traversal, self_traversal};
use crate::collision::contact::{CollisionsData, ContactManifold, LmntId, PairKey};
use crate::collision::primitive::CollisionPrimitive;
use crate::collision::queries::{cast_forest, RayCollisionData, RayQuery};
use crate::collision::record::CollisionRecord;
use crate::collision::sat::SatSpace;
use crate::collision::shapes::Shape;
use crate::config::SpaceConfig;
use crate::error::{CollisionError, Result};
use crate::utils::allocator::GenerationalId;
use crate::utils::profiling::{ScopedTimer, TickStats};
use crate::world::mobility::MobilityInterface;

/// Handle of a leaf in either forest of a [`CollisionSpace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LeafHandle {
    pub forest: ForestKind,
    pub id: GenerationalId,
}

/// Broad-phase pair, ordered so that `first` holds the smaller element id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub first: LeafHandle,
    pub second: LeafHandle,
    pub key: PairKey,
}

pub struct CollisionSpace<V: SatSpace, B: BoundingVolume<Vector = V> = Aabb<V>> {
    config: SpaceConfig,
    static_forest: Forest<B, ()>,
    mobile_forest: Forest<B, MobileData<B>>,
    record: CollisionRecord<V>,
    candidates: Vec<Candidate>,
    output: CollisionsData<V>,
    reinsert: Vec<GenerationalId>,
    manifold: ContactManifold<V>,
    stats: TickStats,
}

impl<V: SatSpace, B: BoundingVolume<Vector = V>> CollisionSpace<V, B> {
    /// Reserves every pool and buffer up front; nothing grows afterwards.
    pub fn new(config: SpaceConfig) -> Self {
        Self {
            config,
            static_forest: Forest::with_capacity(ForestKind::Static, config.static_capacity),
            mobile_forest: Forest::with_capacity(ForestKind::Mobile, config.mobile_capacity),
            record: CollisionRecord::with_capacity(config.max_collisions),
            candidates: Vec::with_capacity(config.max_candidates),
            output: CollisionsData::with_capacity(config.max_collisions),
            reinsert: Vec::with_capacity(config.mobile_capacity),
            manifold: ContactManifold::default(),
            stats: TickStats::default(),
        }
    }

    pub fn config(&self) -> &SpaceConfig {
        &self.config
    }

    pub fn static_forest(&self) -> &Forest<B, ()> {
        &self.static_forest
    }

    pub fn mobile_forest(&self) -> &Forest<B, MobileData<B>> {
        &self.mobile_forest
    }

    pub fn record(&self) -> &CollisionRecord<V> {
        &self.record
    }

    /// Candidates found by the most recent broad phase.
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Output of the most recent [`collisions_data`](Self::collisions_data) call.
    pub fn last_collisions(&self) -> &CollisionsData<V> {
        &self.output
    }

    pub fn stats(&self) -> &TickStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.static_forest.len() + self.mobile_forest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts an element that never moves.
    pub fn insert_static(&mut self, id: LmntId, shape: Shape<V>) -> Result<LeafHandle> {
        let bv = B::from_aabb(&shape.aabb());
        let leaf = self.static_forest.insert(bv, id, CollisionPrimitive::new(shape), ())?;
        Ok(LeafHandle {
            forest: ForestKind::Static,
            id: leaf,
        })
    }

    /// Inserts an element whose motion is reported through a [`MobilityInterface`].
    pub fn insert_mobile(&mut self, id: LmntId, shape: Shape<V>) -> Result<LeafHandle> {
        let bv = B::from_aabb(&shape.aabb());
        let extra = MobileData {
            fattened: bv.fattened(self.config.fatten_factor),
        };
        let leaf = self.mobile_forest.insert(bv, id, CollisionPrimitive::new(shape), extra)?;
        Ok(LeafHandle {
            forest: ForestKind::Mobile,
            id: leaf,
        })
    }

    /// Removes an element and hands its primitive back. Pairs it took part in
    /// are reported as detachments by the next [`collisions_data`](Self::collisions_data).
    pub fn remove(&mut self, handle: LeafHandle) -> Result<CollisionPrimitive<V>> {
        let primitive = match handle.forest {
            ForestKind::Static => self.static_forest.remove(handle.id)?.into_primitive(),
            ForestKind::Mobile => self.mobile_forest.remove(handle.id)?.into_primitive(),
        };
        Ok(primitive)
    }

    pub fn primitive(&self, handle: LeafHandle) -> Option<&CollisionPrimitive<V>> {
        match handle.forest {
            ForestKind::Static => self.static_forest.leaf(handle.id).map(Leaf::primitive),
            ForestKind::Mobile => self.mobile_forest.leaf(handle.id).map(Leaf::primitive),
        }
    }

    /// Precise bounding volume of a leaf.
    pub fn bv(&self, handle: LeafHandle) -> Option<&B> {
        match handle.forest {
            ForestKind::Static => self.static_forest.leaf(handle.id).map(Leaf::bv),
            ForestKind::Mobile => self.mobile_forest.leaf(handle.id).map(Leaf::bv),
        }
    }

    pub fn element_id(&self, handle: LeafHandle) -> Option<LmntId> {
        match handle.forest {
            ForestKind::Static => self.static_forest.leaf(handle.id).map(Leaf::id),
            ForestKind::Mobile => self.mobile_forest.leaf(handle.id).map(Leaf::id),
        }
    }

    pub fn last_collision(&self, handle: LeafHandle) -> Option<PairKey> {
        match handle.forest {
            ForestKind::Static => self.static_forest.leaf(handle.id).and_then(Leaf::last_collision),
            ForestKind::Mobile => self.mobile_forest.leaf(handle.id).and_then(Leaf::last_collision),
        }
    }

    /// First stage of a tick: moves mobile elements and refits the mobile
    /// forest. Returns the number of leaves that had to be re-inserted.
    pub fn refit_due_to_update<M>(&mut self, mobility: &mut M) -> Result<usize>
    where
        M: MobilityInterface<V> + ?Sized,
    {
        self.stats.reset();
        let reinserted = {
            let _timer = ScopedTimer::new(&mut self.stats.refit_time);
            self.mobile_forest
                .refit_due_to_update(mobility, self.config.fatten_factor, &mut self.reinsert)?
        };
        self.stats.reinserted = reinserted;
        Ok(reinserted)
    }

    /// Broad phase: collects every overlapping mobile-mobile and
    /// mobile-static leaf pair into the candidate buffer.
    pub fn find_candidates(&mut self) -> Result<usize> {
        self.static_forest.ensure_depths();
        self.mobile_forest.ensure_depths();
        self.candidates.clear();

        let limit = self.config.max_candidates;
        let mobiles = &self.mobile_forest;
        let statics = &self.static_forest;
        let candidates = &mut self.candidates;

        let Some(mobile_root) = mobiles.root() else {
            return Ok(0);
        };

        self_traversal(mobiles, &mut |x, y| {
            push_candidate(
                candidates,
                limit,
                (mobile_handle(x), mobiles.leaves[x].id),
                (mobile_handle(y), mobiles.leaves[y].id),
            )
        })?;

        if let Some(static_root) = statics.root() {
            dual_traversal(mobiles, mobile_root, statics, static_root, &mut |x, y| {
                push_candidate(
                    candidates,
                    limit,
                    (mobile_handle(x), mobiles.leaves[x].id),
                    (static_handle(y), statics.leaves[y].id),
                )
            })?;
        }
        Ok(self.candidates.len())
    }

    /// Runs the exact test on every candidate and records confirmed contacts.
    /// Every leaf's collision key is reset first, so afterwards it names a
    /// pair confirmed in this pass or nothing. Returns the number of
    /// colliding pairs found.
    pub fn narrow_phase(&mut self) -> Result<usize> {
        self.static_forest.clear_last_collisions();
        self.mobile_forest.clear_last_collisions();
        let mut hits = 0;
        for index in 0..self.candidates.len() {
            let candidate = self.candidates[index];
            let Some((first, second)) = leaf_pair_mut(
                &mut self.static_forest,
                &mut self.mobile_forest,
                candidate.first,
                candidate.second,
            ) else {
                continue;
            };

            self.manifold.clear();
            if !first
                .primitive
                .test_collision(second.primitive, second.id, Some(&mut self.manifold))
            {
                continue;
            }
            self.record.insert_or_fetch(candidate.key, &self.manifold)?;
            *first.last_collision = Some(candidate.key);
            *second.last_collision = Some(candidate.key);
            hits += 1;
        }
        Ok(hits)
    }

    /// Runs the broad and narrow phases and returns the pairs that started or
    /// stopped colliding since the previous call.
    pub fn collisions_data(&mut self) -> Result<&CollisionsData<V>> {
        let mut broad_phase_time = Duration::ZERO;
        let candidates = {
            let _timer = ScopedTimer::new(&mut broad_phase_time);
            self.find_candidates()?
        };
        self.stats.broad_phase_time = broad_phase_time;

        let mut narrow_phase_time = Duration::ZERO;
        {
            let _timer = ScopedTimer::new(&mut narrow_phase_time);
            self.narrow_phase()?;
            self.record.drain_into(&mut self.output)?;
        }
        self.stats.narrow_phase_time = narrow_phase_time;

        self.stats.candidate_count = candidates;
        self.stats.collision_count = self.output.collisions_count();
        self.stats.detachment_count = self.output.detachments_count();
        trace!(
            "{} candidates, {} new collisions, {} detachments",
            candidates,
            self.stats.collision_count,
            self.stats.detachment_count
        );
        Ok(&self.output)
    }

    /// Full tick: refit followed by [`collisions_data`](Self::collisions_data).
    pub fn tick<M>(&mut self, mobility: &mut M) -> Result<&CollisionsData<V>>
    where
        M: MobilityInterface<V> + ?Sized,
    {
        self.refit_due_to_update(mobility)?;
        self.collisions_data()?;
        self.stats.report();
        Ok(&self.output)
    }

    /// Nearest element hit by the picking ray from `origin` along
    /// `direction`, across both forests.
    pub fn ray_collision_data(&self, origin: V, direction: V) -> RayCollisionData {
        let mut best = RayCollisionData::default();
        let query = RayQuery::new(origin, direction, self.config.ray_length);

        let static_bv = self.static_forest.root_view().map(|view| *view.bv());
        let mobile_bv = self.mobile_forest.root_view().map(|view| *view.bv());
        let bounds = match (static_bv, mobile_bv) {
            (Some(a), Some(b)) => a.combine(&b),
            (Some(bv), None) | (None, Some(bv)) => bv,
            (None, None) => return best,
        };
        if !bounds.intersects_segment(query.origin, query.end()) {
            return best;
        }

        cast_forest(&query, &self.static_forest, &mut best);
        cast_forest(&query, &self.mobile_forest, &mut best);
        if best.has_collided {
            debug!(
                "ray hit ({}, {}) at t={}",
                best.model_idx, best.instance_idx, best.t
            );
        }
        best
    }
}

fn mobile_handle(id: GenerationalId) -> LeafHandle {
    LeafHandle {
        forest: ForestKind::Mobile,
        id,
    }
}

fn static_handle(id: GenerationalId) -> LeafHandle {
    LeafHandle {
        forest: ForestKind::Static,
        id,
    }
}

fn push_candidate(
    candidates: &mut Vec<Candidate>,
    limit: usize,
    a: (LeafHandle, LmntId),
    b: (LeafHandle, LmntId),
) -> Result<()> {
    if candidates.len() >= limit {
        return Err(CollisionError::CapacityExhausted {
            pool: "broad-phase candidates",
            capacity: limit,
        });
    }
    let (first, second) = if a.1 <= b.1 { (a.0, b.0) } else { (b.0, a.0) };
    candidates.push(Candidate {
        first,
        second,
        key: PairKey::new(a.1, b.1),
    });
    Ok(())
}

/// Borrows the two leaves of a candidate mutably. Static-static pairs are
/// never produced by the broad phase and yield `None`, as do stale handles.
fn leaf_pair_mut<'a, B: BoundingVolume>(
    statics: &'a mut Forest<B, ()>,
    mobiles: &'a mut Forest<B, MobileData<B>>,
    first: LeafHandle,
    second: LeafHandle,
) -> Option<(LeafMut<'a, B::Vector>, LeafMut<'a, B::Vector>)> {
    match (first.forest, second.forest) {
        (ForestKind::Mobile, ForestKind::Mobile) => {
            let (a, b) = mobiles.leaves.get2_mut(first.id, second.id)?;
            Some((a.parts_mut(), b.parts_mut()))
        }
        (ForestKind::Mobile, ForestKind::Static) => Some((
            mobiles.leaves.get_mut(first.id)?.parts_mut(),
            statics.leaves.get_mut(second.id)?.parts_mut(),
        )),
        (ForestKind::Static, ForestKind::Mobile) => Some((
            statics.leaves.get_mut(first.id)?.parts_mut(),
            mobiles.leaves.get_mut(second.id)?.parts_mut(),
        )),
        (ForestKind::Static, ForestKind::Static) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::contact::CollisionState;
    use crate::collision::shapes::TransformDelta;
    use approx::assert_relative_eq;
    use glam::{Quat, Vec3};
    use std::collections::HashMap;

    fn unit_box(center: Vec3) -> Shape<Vec3> {
        Shape::cuboid(center, Quat::IDENTITY, Vec3::splat(0.5))
    }

    #[test]
    fn static_pairs_are_never_candidates() {
        let mut space: CollisionSpace<Vec3> =
            CollisionSpace::new(SpaceConfig::with_capacities(4, 4, 8));
        space.insert_static(LmntId::new(0, 0), unit_box(Vec3::ZERO)).unwrap();
        space.insert_static(LmntId::new(0, 1), unit_box(Vec3::new(0.5, 0.0, 0.0))).unwrap();
        assert_eq!(space.find_candidates().unwrap(), 0);
    }

    #[test]
    fn candidate_order_follows_element_ids() {
        let mut space: CollisionSpace<Vec3> =
            CollisionSpace::new(SpaceConfig::with_capacities(4, 4, 8));
        let fixed = space.insert_static(LmntId::new(0, 0), unit_box(Vec3::ZERO)).unwrap();
        let moving = space
            .insert_mobile(LmntId::new(5, 0), unit_box(Vec3::new(0.5, 0.0, 0.0)))
            .unwrap();

        assert_eq!(space.find_candidates().unwrap(), 1);
        let candidate = space.candidates()[0];
        assert_eq!(candidate.first, fixed);
        assert_eq!(candidate.second, moving);
        assert_eq!(candidate.key, PairKey::new(LmntId::new(5, 0), LmntId::new(0, 0)));
    }

    #[test]
    fn tick_fills_phase_stats() {
        let mut space: CollisionSpace<Vec3> =
            CollisionSpace::new(SpaceConfig::with_capacities(4, 4, 8));
        space.insert_static(LmntId::new(0, 0), unit_box(Vec3::ZERO)).unwrap();
        space.insert_mobile(LmntId::new(1, 0), unit_box(Vec3::new(0.5, 0.0, 0.0))).unwrap();
        space.tick(&mut ()).unwrap();

        let stats = *space.stats();
        assert_eq!(stats.candidate_count, 1);
        assert_eq!(stats.collision_count, 1);
        assert_eq!(
            stats.total_time(),
            stats.refit_time + stats.broad_phase_time + stats.narrow_phase_time
        );
    }

    #[test]
    fn start_persist_end_cycle() {
        let mut space: CollisionSpace<Vec3> =
            CollisionSpace::new(SpaceConfig::with_capacities(4, 4, 8));
        let a = LmntId::new(1, 0);
        let b = LmntId::new(2, 0);
        space.insert_static(a, unit_box(Vec3::ZERO)).unwrap();
        let handle = space.insert_mobile(b, unit_box(Vec3::new(0.8, 0.0, 0.0))).unwrap();

        let out = space.tick(&mut ()).unwrap();
        assert_eq!(out.collisions_count(), 1);
        assert_eq!(out.collisions[0].state, CollisionState::Start);
        assert_relative_eq!(out.collisions[0].manifold.normal, Vec3::X, epsilon = 1e-5);
        assert_eq!(space.last_collision(handle), Some(PairKey::new(a, b)));

        let out = space.tick(&mut ()).unwrap();
        assert_eq!(out.collisions_count(), 0);
        assert_eq!(out.detachments_count(), 0);
        assert_eq!(space.record().len(), 1);

        let mut moves = HashMap::new();
        moves.insert(b, TransformDelta::translation(Vec3::new(5.0, 0.0, 0.0)));
        let out = space.tick(&mut moves).unwrap();
        assert_eq!(out.collisions_count(), 0);
        assert_eq!(out.detachments_count(), 1);
        assert_eq!(out.detachments[0].key, PairKey::new(a, b));
        assert!(space.record().is_empty());
        assert_eq!(space.last_collision(handle), None);
    }

    #[test]
    fn candidate_overflow_is_reported() {
        let mut config = SpaceConfig::with_capacities(4, 8, 8);
        config.max_candidates = 2;
        let mut space: CollisionSpace<Vec3> = CollisionSpace::new(config);
        for n in 0..4 {
            space
                .insert_mobile(LmntId::new(n, 0), unit_box(Vec3::new(n as f32 * 0.1, 0.0, 0.0)))
                .unwrap();
        }
        assert!(matches!(
            space.find_candidates(),
            Err(CollisionError::CapacityExhausted { capacity: 2, .. })
        ));
    }

    #[test]
    fn removed_element_detaches() {
        let mut space: CollisionSpace<Vec3> =
            CollisionSpace::new(SpaceConfig::with_capacities(4, 4, 8));
        space.insert_static(LmntId::new(0, 0), unit_box(Vec3::ZERO)).unwrap();
        let handle = space
            .insert_mobile(LmntId::new(1, 0), unit_box(Vec3::new(0.5, 0.0, 0.0)))
            .unwrap();
        assert_eq!(space.tick(&mut ()).unwrap().collisions_count(), 1);

        space.remove(handle).unwrap();
        assert!(matches!(space.remove(handle), Err(CollisionError::InvalidHandle(_))));
        let out = space.tick(&mut ()).unwrap();
        assert_eq!(out.detachments_count(), 1);
    }

    #[test]
    fn empty_space_ray_misses() {
        let space: CollisionSpace<Vec3> = CollisionSpace::new(SpaceConfig::default());
        assert!(!space.ray_collision_data(Vec3::ZERO, Vec3::X).has_collided);
    }
}
