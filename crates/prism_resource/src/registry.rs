//! Registry of created resources, for lookup by locator and removal by
//! label.

use crate::{Locator, ResourceId, ResourceLabel};
use prism_containers::{HashMap, hash_map::Entry};

/// Keeps track of every created resource's [`Locator`] and [`ResourceId`].
///
/// Resources with shared locators can be looked up by locator, which is what
/// lets repeated requests for the same named resource share one instance.
/// All resources can be removed in bulk by the label they were created with.
///
/// Entries are stored contiguously. Each index map points into the entry
/// list; removal swaps the last entry into the removed position and retargets
/// the moved entry's index map slots.
#[derive(Clone, Debug, Default)]
pub struct ResourceRegistry {
    entries: Vec<RegistryEntry>,
    locator_index: HashMap<Locator, usize>,
    id_index: HashMap<ResourceId, usize>,
}

#[derive(Clone, Debug)]
struct RegistryEntry {
    locator: Locator,
    id: ResourceId,
}

impl ResourceRegistry {
    /// Creates an empty registry with room for the given number of entries
    /// before reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            locator_index: HashMap::with_capacity_and_hasher(capacity, Default::default()),
            id_index: HashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Returns the number of registered resources.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registers the resource with the given locator and ID.
    ///
    /// # Panics
    /// - If the ID is invalid or already registered.
    /// - If the locator is shared and already registered.
    pub fn add(&mut self, locator: Locator, id: ResourceId) {
        assert!(id.is_valid(), "Tried to register invalid resource ID");

        let entry_idx = self.entries.len();

        match self.id_index.entry(id) {
            Entry::Occupied(_) => panic!("Resource {id} registered twice"),
            Entry::Vacant(entry) => {
                entry.insert(entry_idx);
            }
        }

        if locator.is_shared() {
            match self.locator_index.entry(locator.clone()) {
                Entry::Occupied(_) => {
                    self.id_index.remove(&id);
                    panic!("Shared resource locator {locator} registered twice");
                }
                Entry::Vacant(entry) => {
                    entry.insert(entry_idx);
                }
            }
        }

        self.entries.push(RegistryEntry { locator, id });
    }

    /// Returns the ID of the resource registered under the given shared
    /// locator, or the invalid ID if there is none or the locator is not
    /// shared.
    pub fn lookup(&self, locator: &Locator) -> ResourceId {
        if !locator.is_shared() {
            return ResourceId::invalid();
        }
        self.locator_index
            .get(locator)
            .map_or_else(ResourceId::invalid, |&entry_idx| {
                self.entries[entry_idx].id
            })
    }

    /// Whether the resource with the given ID is registered.
    pub fn contains(&self, id: ResourceId) -> bool {
        self.id_index.contains_key(&id)
    }

    /// Returns the locator the resource with the given ID was registered with.
    pub fn locator(&self, id: ResourceId) -> Option<&Locator> {
        self.id_index
            .get(&id)
            .map(|&entry_idx| &self.entries[entry_idx].locator)
    }

    /// Returns the ID of the entry at the given position.
    ///
    /// # Panics
    /// If the index is out of bounds.
    pub fn id_by_index(&self, index: usize) -> ResourceId {
        self.entries[index].id
    }

    /// Removes every resource whose ID carries the given label, or every
    /// resource if the label is [`ResourceLabel::ALL`].
    ///
    /// # Returns
    /// The IDs of the removed resources, in removal order (last registered
    /// first).
    pub fn remove(&mut self, label: ResourceLabel) -> Vec<ResourceId> {
        let mut removed_ids = Vec::new();

        // Scanning from the back means the entry swapped into a removed
        // position has always been visited already
        for entry_idx in (0..self.entries.len()).rev() {
            if !label.matches(self.entries[entry_idx].id.label()) {
                continue;
            }

            let removed_entry = self.entries.swap_remove(entry_idx);
            self.id_index.remove(&removed_entry.id);
            if removed_entry.locator.is_shared() {
                self.locator_index.remove(&removed_entry.locator);
            }

            if let Some(moved_entry) = self.entries.get(entry_idx) {
                if let Some(idx) = self.id_index.get_mut(&moved_entry.id) {
                    *idx = entry_idx;
                }
                if moved_entry.locator.is_shared() {
                    if let Some(idx) = self.locator_index.get_mut(&moved_entry.locator) {
                        *idx = entry_idx;
                    }
                }
            }

            removed_ids.push(removed_entry.id);
        }

        debug_assert!(self.check_integrity());

        removed_ids
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.locator_index.clear();
        self.id_index.clear();
    }

    /// Verifies that both index maps agree with the entry list: every indexed
    /// position holds an entry with the indexing key, and every entry is
    /// indexed.
    pub fn check_integrity(&self) -> bool {
        let n_shared = self
            .entries
            .iter()
            .filter(|entry| entry.locator.is_shared())
            .count();

        self.id_index.len() == self.entries.len()
            && self.locator_index.len() == n_shared
            && self.id_index.iter().all(|(id, &entry_idx)| {
                self.entries
                    .get(entry_idx)
                    .is_some_and(|entry| entry.id == *id)
            })
            && self.locator_index.iter().all(|(locator, &entry_idx)| {
                self.entries
                    .get(entry_idx)
                    .is_some_and(|entry| entry.locator == *locator)
            })
    }
}
