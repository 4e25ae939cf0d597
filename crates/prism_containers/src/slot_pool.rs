//! A fixed-capacity array of slots that hands out generation-stamped keys
//! and recycles freed slots in first-in first-out order.

use bytemuck::{Pod, Zeroable};
use std::{cmp, collections::VecDeque, fmt};

/// A fixed-capacity array of slots holding values of type `V`.
///
/// The number of slots is decided when the pool is created and never changes.
/// Each slot has an associated "generation" that is advanced every time a new
/// value is placed in the slot. The generation is contained in the
/// [`SlotKey`] returned on insertion, and every access compares the key's
/// generation to the current generation of the slot, rejecting the access if
/// they differ. A key thus becomes permanently stale once its value has been
/// removed, even if the slot is later reused for a different value.
///
/// Freed slots are queued and reused in the order they were freed, so that
/// generation advances are spread over all slots of the pool.
#[derive(Clone, Debug)]
pub struct SlotPool<V> {
    slots: Vec<Slot<V>>,
    free_slot_indices: VecDeque<u32>,
}

/// A key into a [`SlotPool`].
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Zeroable, Pod)]
pub struct SlotKey {
    generation: Generation,
    idx: u32,
}

/// The generation of a slot in a [`SlotPool`]. The zero generation is never
/// handed out in a key and marks a slot that has never held a value.
///
/// The generation wraps around from [`u32::MAX`] to the first generation, so
/// a key that has been stale for 2^32 - 1 reuses of its slot compares equal
/// to a live key again.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Zeroable, Pod)]
pub struct Generation(u32);

#[derive(Clone, Debug)]
struct Slot<V> {
    generation: Generation,
    value: Option<V>,
}

impl<V> SlotPool<V> {
    /// Creates a new pool with the given number of slots, all of them free.
    ///
    /// # Panics
    /// If the capacity exceeds [`u32::MAX`].
    pub fn with_capacity(capacity: usize) -> Self {
        let n_slots = u32::try_from(capacity).expect("Slot pool capacity exceeds u32::MAX");
        Self {
            slots: (0..n_slots).map(|_| Slot::unused()).collect(),
            free_slot_indices: (0..n_slots).collect(),
        }
    }

    /// Returns the total number of slots in the pool.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free_slot_indices.len()
    }

    /// Whether no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of free slots.
    pub fn n_free_slots(&self) -> usize {
        self.free_slot_indices.len()
    }

    /// Whether every slot is occupied.
    pub fn is_full(&self) -> bool {
        self.free_slot_indices.is_empty()
    }

    /// Places the given value in the least recently freed slot and returns a
    /// key stamped with the slot's new generation.
    ///
    /// # Returns
    /// [`None`] if there is no free slot. The value is dropped in that case.
    pub fn insert(&mut self, value: V) -> Option<SlotKey> {
        let idx = self.free_slot_indices.pop_front()?;
        let slot = &mut self.slots[idx as usize];
        debug_assert!(slot.value.is_none());

        slot.generation = slot.generation.next();
        slot.value = Some(value);

        Some(SlotKey::new(slot.generation, idx))
    }

    /// Returns a reference to the value for the given key.
    ///
    /// # Panics
    /// If the key:
    /// - Refers to a slot that is currently free or has been reused.
    /// - Is illegal (see [`SlotKey::dummy`]).
    /// - Has an out of bounds index (in which case it belongs to a different
    ///   pool).
    pub fn value(&self, key: SlotKey) -> &V {
        self.get_value(key)
            .expect("Tried to access free or reused slot")
    }

    /// Returns a mutable reference to the value for the given key.
    ///
    /// # Panics
    /// See [`Self::value`].
    pub fn value_mut(&mut self, key: SlotKey) -> &mut V {
        self.get_value_mut(key)
            .expect("Tried to access free or reused slot")
    }

    /// Returns a reference to the value for the given key, or [`None`] if the
    /// value has been removed.
    ///
    /// # Panics
    /// If the key is illegal or its index is out of bounds.
    pub fn get_value(&self, key: SlotKey) -> Option<&V> {
        self.checked_slot(key).get_value(key.generation)
    }

    /// Returns a mutable reference to the value for the given key, or
    /// [`None`] if the value has been removed.
    ///
    /// # Panics
    /// If the key is illegal or its index is out of bounds.
    pub fn get_value_mut(&mut self, key: SlotKey) -> Option<&mut V> {
        assert!(key.is_legal(), "Tried to use illegal slot key");
        self.slots[key.idx_usize()].get_value_mut(key.generation)
    }

    /// Whether a value exists for the given key.
    ///
    /// # Panics
    /// If the key is illegal or its index is out of bounds.
    pub fn contains(&self, key: SlotKey) -> bool {
        self.checked_slot(key).get_value(key.generation).is_some()
    }

    /// Removes and returns the value for the given key, and queues the slot
    /// for reuse.
    ///
    /// # Returns
    /// [`None`] if the value had already been removed.
    ///
    /// # Panics
    /// If the key is illegal or its index is out of bounds.
    pub fn remove(&mut self, key: SlotKey) -> Option<V> {
        assert!(key.is_legal(), "Tried to use illegal slot key");
        let slot = &mut self.slots[key.idx_usize()];
        if slot.generation != key.generation {
            return None;
        }
        let value = slot.value.take()?;
        self.free_slot_indices.push_back(key.idx);
        Some(value)
    }

    /// Returns an iterator over the keys and values of all occupied slots.
    pub fn iter(&self) -> impl Iterator<Item = (SlotKey, &V)> {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            slot.value
                .as_ref()
                .map(|value| (SlotKey::new(slot.generation, idx as u32), value))
        })
    }

    /// Removes all values, freeing every occupied slot.
    pub fn clear(&mut self) {
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if slot.value.take().is_some() {
                self.free_slot_indices.push_back(idx as u32);
            }
        }
    }

    fn checked_slot(&self, key: SlotKey) -> &Slot<V> {
        assert!(key.is_legal(), "Tried to use illegal slot key");
        &self.slots[key.idx_usize()]
    }
}

impl SlotKey {
    /// Creates an illegal dummy key that will never be returned from a
    /// [`SlotPool`] and produces a panic if actually used with one.
    pub const fn dummy() -> Self {
        Self {
            generation: Generation::UNUSED,
            idx: 0,
        }
    }

    fn new(generation: Generation, idx: u32) -> Self {
        assert!(!generation.is_unused());
        Self { generation, idx }
    }

    /// Returns the index of the slot the key refers to.
    pub fn idx(&self) -> u32 {
        self.idx
    }

    /// Returns the generation stamped into the key.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Illegal keys can be created through [`Self::dummy`] or
    /// [`Zeroable::zeroed`]. They will never be returned by a `SlotPool`.
    pub fn is_legal(&self) -> bool {
        !self.generation.is_unused()
    }

    fn idx_usize(&self) -> usize {
        self.idx as usize
    }
}

impl Ord for SlotKey {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        self.idx
            .cmp(&other.idx)
            .then(self.generation.0.cmp(&other.generation.0))
    }
}

impl PartialOrd for SlotKey {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.idx, self.generation.0)
    }
}

impl<V> Slot<V> {
    fn unused() -> Self {
        Self {
            generation: Generation::UNUSED,
            value: None,
        }
    }

    fn get_value(&self, generation: Generation) -> Option<&V> {
        if self.generation == generation {
            self.value.as_ref()
        } else {
            None
        }
    }

    fn get_value_mut(&mut self, generation: Generation) -> Option<&mut V> {
        if self.generation == generation {
            self.value.as_mut()
        } else {
            None
        }
    }
}

impl Generation {
    const UNUSED: Self = Self(0);
    const FIRST: Self = Self(1);

    /// Returns the raw generation counter.
    pub fn value(&self) -> u32 {
        self.0
    }

    fn is_unused(&self) -> bool {
        self.0 == 0
    }

    fn next(&self) -> Self {
        if self.0 < u32::MAX {
            Self(self.0 + 1)
        } else {
            Self::FIRST // Skip the unused generation on overflow
        }
    }
}
