//! Ordered record of colliding pairs driving start / persist / end events.

use std::collections::btree_map::{BTreeMap, Entry};

use crate::collision::contact::{
    CollisionData, CollisionState, CollisionsData, ContactManifold, PairKey,
};
use crate::error::{CollisionError, Result};
use crate::utils::math::SpaceVector;

#[derive(Debug, Clone)]
pub struct CollisionRecord<V> {
    entries: BTreeMap<PairKey, CollisionData<V>>,
    capacity: usize,
}

impl<V: SpaceVector> CollisionRecord<V> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, key: &PairKey) -> Option<&CollisionData<V>> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CollisionData<V>> + '_ {
        self.entries.values()
    }

    /// Records a confirmed contact for `key`.
    ///
    /// New keys start in [`CollisionState::Start`]; a key left in `End` by the
    /// previous drain is promoted to `Persist`. The manifold is refreshed either way.
    pub fn insert_or_fetch(
        &mut self,
        key: PairKey,
        manifold: &ContactManifold<V>,
    ) -> Result<&mut CollisionData<V>> {
        let len = self.entries.len();
        match self.entries.entry(key) {
            Entry::Occupied(entry) => {
                let data = entry.into_mut();
                if data.state == CollisionState::End {
                    data.state = CollisionState::Persist;
                }
                data.manifold.clone_from(manifold);
                Ok(data)
            }
            Entry::Vacant(entry) => {
                if len >= self.capacity {
                    return Err(CollisionError::CapacityExhausted {
                        pool: "collision record",
                        capacity: self.capacity,
                    });
                }
                Ok(entry.insert(CollisionData::new(key, manifold.clone())))
            }
        }
    }

    /// Walks the record once in key order: `Start` entries are reported as
    /// collisions, `End` entries (not re-confirmed since the last drain) are
    /// reported as detachments and erased, and every surviving entry is left
    /// in `End` awaiting re-confirmation.
    pub fn drain_into(&mut self, output: &mut CollisionsData<V>) -> Result<()> {
        output.clear();
        let limit = output.collisions.capacity().min(output.detachments.capacity());
        if self.entries.len() > limit {
            return Err(CollisionError::CapacityExhausted {
                pool: "collision output",
                capacity: limit,
            });
        }

        self.entries.retain(|_, data| match data.state {
            CollisionState::Start => {
                output.collisions.push(data.clone());
                data.state = CollisionState::End;
                true
            }
            CollisionState::Persist => {
                data.state = CollisionState::End;
                true
            }
            CollisionState::End => {
                output.detachments.push(data.clone());
                false
            }
        });
        Ok(())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::contact::LmntId;
    use glam::Vec3;

    fn key(a: u32, b: u32) -> PairKey {
        PairKey::new(LmntId::new(a, 0), LmntId::new(b, 0))
    }

    #[test]
    fn single_tick_overlap_emits_start_then_end() {
        let mut record = CollisionRecord::<Vec3>::with_capacity(4);
        let mut out = CollisionsData::with_capacity(4);
        let manifold = ContactManifold::default();

        record.insert_or_fetch(key(1, 2), &manifold).unwrap();
        record.drain_into(&mut out).unwrap();
        assert_eq!(out.collisions_count(), 1);
        assert_eq!(out.collisions[0].state, CollisionState::Start);
        assert_eq!(out.detachments_count(), 0);

        record.drain_into(&mut out).unwrap();
        assert_eq!(out.collisions_count(), 0);
        assert_eq!(out.detachments_count(), 1);
        assert!(record.is_empty());

        record.drain_into(&mut out).unwrap();
        assert_eq!(out.detachments_count(), 0);
    }

    #[test]
    fn reconfirmed_pair_persists_silently() {
        let mut record = CollisionRecord::<Vec3>::with_capacity(4);
        let mut out = CollisionsData::with_capacity(4);
        let manifold = ContactManifold::default();

        record.insert_or_fetch(key(1, 2), &manifold).unwrap();
        record.drain_into(&mut out).unwrap();
        for _ in 0..3 {
            let data = record.insert_or_fetch(key(2, 1), &manifold).unwrap();
            assert_eq!(data.state, CollisionState::Persist);
            record.drain_into(&mut out).unwrap();
            assert_eq!(out.collisions_count() + out.detachments_count(), 0);
        }
        record.drain_into(&mut out).unwrap();
        assert_eq!(out.detachments_count(), 1);
    }

    #[test]
    fn full_record_rejects_new_keys() {
        let mut record = CollisionRecord::<Vec3>::with_capacity(1);
        let manifold = ContactManifold::default();
        record.insert_or_fetch(key(1, 2), &manifold).unwrap();
        assert!(record.insert_or_fetch(key(1, 2), &manifold).is_ok());
        assert!(matches!(
            record.insert_or_fetch(key(1, 3), &manifold),
            Err(CollisionError::CapacityExhausted { .. })
        ));
    }
}
