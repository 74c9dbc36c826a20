use std::collections::HashMap;
use std::hash::BuildHasher;

use crate::collision::contact::LmntId;
use crate::collision::shapes::TransformDelta;
use crate::utils::math::SpaceVector;

/// Source of per-tick motion for mobile elements.
///
/// The refit pass asks once per mobile leaf; returning `None` leaves the
/// element where it is. A delta handed out is considered consumed.
pub trait MobilityInterface<V: SpaceVector> {
    fn take_delta(&mut self, id: LmntId) -> Option<TransformDelta<V>>;
}

/// No element moves.
impl<V: SpaceVector> MobilityInterface<V> for () {
    fn take_delta(&mut self, _id: LmntId) -> Option<TransformDelta<V>> {
        None
    }
}

impl<V: SpaceVector, S: BuildHasher> MobilityInterface<V>
    for HashMap<LmntId, TransformDelta<V>, S>
{
    fn take_delta(&mut self, id: LmntId) -> Option<TransformDelta<V>> {
        self.remove(&id)
    }
}
