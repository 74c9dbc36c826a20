use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::error::{CollisionError, Result};

/// Unique identifier with generation tracking to prevent stale references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct GenerationalId {
    pub index: usize,
    pub generation: u32,
}

impl GenerationalId {
    pub fn new(index: usize, generation: u32) -> Self {
        Self { index, generation }
    }
}

/// Fixed-capacity generational pool.
///
/// Slots never move once handed out and the backing storage is reserved up
/// front, so acquiring never reallocates. Acquiring past `capacity` fails
/// instead of growing.
#[derive(Debug, Clone)]
pub struct Pool<T> {
    name: &'static str,
    items: Vec<Option<T>>,
    generations: Vec<u32>,
    free_list: VecDeque<usize>,
    capacity: usize,
    len: usize,
}

impl<T> Pool<T> {
    pub fn with_capacity(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            items: Vec::with_capacity(capacity),
            generations: Vec::with_capacity(capacity),
            free_list: VecDeque::with_capacity(capacity),
            capacity,
            len: 0,
        }
    }

    pub fn acquire(&mut self, item: T) -> Result<GenerationalId> {
        if let Some(index) = self.free_list.pop_front() {
            let generation = self.generations[index];
            self.items[index] = Some(item);
            self.len += 1;
            return Ok(GenerationalId::new(index, generation));
        }

        if self.items.len() >= self.capacity {
            return Err(CollisionError::CapacityExhausted {
                pool: self.name,
                capacity: self.capacity,
            });
        }

        let index = self.items.len();
        self.items.push(Some(item));
        self.generations.push(0);
        self.len += 1;
        Ok(GenerationalId::new(index, 0))
    }

    pub fn release(&mut self, id: GenerationalId) -> Result<T> {
        if !self.is_valid(id) {
            return Err(CollisionError::InvalidHandle(id));
        }
        let item = self.items[id.index]
            .take()
            .ok_or(CollisionError::InvalidHandle(id))?;
        self.generations[id.index] = self.generations[id.index].wrapping_add(1);
        self.free_list.push_back(id.index);
        self.len -= 1;
        Ok(item)
    }

    pub fn get(&self, id: GenerationalId) -> Option<&T> {
        if self.is_valid(id) {
            self.items.get(id.index).and_then(|slot| slot.as_ref())
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, id: GenerationalId) -> Option<&mut T> {
        if self.is_valid(id) {
            self.items.get_mut(id.index).and_then(|slot| slot.as_mut())
        } else {
            None
        }
    }

    pub fn get2_mut(
        &mut self,
        id_a: GenerationalId,
        id_b: GenerationalId,
    ) -> Option<(&mut T, &mut T)> {
        if id_a.index == id_b.index {
            return None;
        }

        if !self.is_valid(id_a) || !self.is_valid(id_b) {
            return None;
        }

        let (first, second, flipped) = if id_a.index < id_b.index {
            (id_a, id_b, false)
        } else {
            (id_b, id_a, true)
        };

        let (left, right) = self.items.split_at_mut(second.index);
        let first_slot = left.get_mut(first.index).and_then(|slot| slot.as_mut())?;
        let second_slot = right.get_mut(0).and_then(|slot| slot.as_mut())?;

        if flipped {
            Some((second_slot, first_slot))
        } else {
            Some((first_slot, second_slot))
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = GenerationalId> + '_ {
        self.items.iter().enumerate().filter_map(|(index, slot)| {
            slot.as_ref()
                .map(|_| GenerationalId::new(index, self.generations[index]))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (GenerationalId, &T)> + '_ {
        self.items.iter().enumerate().filter_map(|(index, slot)| {
            slot.as_ref()
                .map(|item| (GenerationalId::new(index, self.generations[index]), item))
        })
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.items.iter_mut().filter_map(|slot| slot.as_mut())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_valid(&self, id: GenerationalId) -> bool {
        self.generations
            .get(id.index)
            .copied()
            .map(|gen| gen == id.generation && self.items[id.index].is_some())
            .unwrap_or(false)
    }
}

impl<T> std::ops::Index<GenerationalId> for Pool<T> {
    type Output = T;

    fn index(&self, id: GenerationalId) -> &T {
        match self.get(id) {
            Some(item) => item,
            None => panic!("{} pool: stale handle {id:?}", self.name),
        }
    }
}

impl<T> std::ops::IndexMut<GenerationalId> for Pool<T> {
    fn index_mut(&mut self, id: GenerationalId) -> &mut T {
        let name = self.name;
        match self.get_mut(id) {
            Some(item) => item,
            None => panic!("{name} pool: stale handle {id:?}"),
        }
    }
}
