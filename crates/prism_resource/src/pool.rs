//! Fixed-capacity pools of resources of one type.

use crate::{ResourceId, ResourceInfo, ResourceLabel, ResourcePoolInfo, ResourceState, ResourceType};
use anyhow::Result;
use prism_containers::{SlotKey, SlotPool};

/// A fixed-capacity pool of resources of type `R`, together with the
/// lifecycle state of each slot.
///
/// Slots are handed out as [`ResourceId`]s by [`Self::alloc_id`]. A slot holds
/// a resource only once creation has succeeded; allocated slots that are
/// still pending, or whose creation failed, hold just their state.
///
/// Running out of slots is a configuration error: the pool sizes are decided
/// up front, so [`Self::alloc_id`] panics rather than reporting it.
#[derive(Debug)]
pub struct ResourcePool<R> {
    resource_type: ResourceType,
    slots: SlotPool<ResourceSlot<R>>,
}

#[derive(Debug)]
struct ResourceSlot<R> {
    state: ResourceState,
    label: ResourceLabel,
    resource: Option<R>,
}

impl<R> ResourcePool<R> {
    /// Creates a pool with the given number of slots for resources of the
    /// given type.
    pub fn new(resource_type: ResourceType, capacity: usize) -> Self {
        assert!(resource_type.is_valid());
        Self {
            resource_type,
            slots: SlotPool::with_capacity(capacity),
        }
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    pub fn n_free_slots(&self) -> usize {
        self.slots.n_free_slots()
    }

    /// Reserves a slot in the [`Initial`](ResourceState::Initial) state and
    /// returns an ID for it tagged with the given label.
    ///
    /// # Panics
    /// If every slot is in use.
    pub fn alloc_id(&mut self, label: ResourceLabel) -> ResourceId {
        let Some(key) = self.slots.insert(ResourceSlot {
            state: ResourceState::Initial,
            label,
            resource: None,
        }) else {
            panic!(
                "Resource pool for type {} exhausted (size {})",
                self.resource_type,
                self.slots.capacity()
            );
        };
        ResourceId::new(self.resource_type, key, label)
    }

    /// Whether the given ID refers to a live slot in this pool.
    pub fn contains(&self, id: ResourceId) -> bool {
        self.slots.contains(self.slot_key(id))
    }

    /// Returns the state of the slot for the given ID, or
    /// [`ResourceState::Invalid`] if the ID is stale.
    pub fn query_state(&self, id: ResourceId) -> ResourceState {
        self.slots
            .get_value(self.slot_key(id))
            .map_or(ResourceState::Invalid, |slot| slot.state)
    }

    /// Returns information about the resource with the given ID.
    pub fn query_info(&self, id: ResourceId) -> ResourceInfo {
        self.slots
            .get_value(self.slot_key(id))
            .map_or_else(ResourceInfo::invalid, |slot| ResourceInfo {
                state: slot.state,
                label: slot.label,
                resource_type: self.resource_type,
            })
    }

    /// Returns slot usage and state counts for the pool. Visits every slot.
    pub fn query_pool_info(&self) -> ResourcePoolInfo {
        let mut info = ResourcePoolInfo {
            resource_type: Some(self.resource_type),
            n_slots: self.slots.capacity(),
            n_used_slots: self.slots.len(),
            n_free_slots: self.slots.n_free_slots(),
            ..Default::default()
        };
        for (_, slot) in self.slots.iter() {
            info.record_state(slot.state);
        }
        info
    }

    /// Returns the resource with the given ID, or [`None`] if the ID is
    /// stale or the resource has not been successfully created.
    pub fn get_resource(&self, id: ResourceId) -> Option<&R> {
        self.slots
            .get_value(self.slot_key(id))
            .and_then(|slot| slot.resource.as_ref())
    }

    /// Returns the resource with the given ID mutably, or [`None`] if the ID
    /// is stale or the resource has not been successfully created.
    pub fn get_resource_mut(&mut self, id: ResourceId) -> Option<&mut R> {
        let key = self.slot_key(id);
        self.slots
            .get_value_mut(key)
            .and_then(|slot| slot.resource.as_mut())
    }

    /// Returns the resource with the given ID.
    ///
    /// # Panics
    /// If the ID is stale or the resource has not been successfully created.
    pub fn resource(&self, id: ResourceId) -> &R {
        self.get_resource(id)
            .unwrap_or_else(|| panic!("No live resource for ID {id}"))
    }

    /// Sets the state of the slot for the given ID.
    ///
    /// # Panics
    /// If the ID is stale.
    pub fn update_state(&mut self, id: ResourceId, state: ResourceState) {
        self.live_slot_mut(id).state = state;
    }

    /// Stores the given resource in the slot for the given ID and sets the
    /// slot's state.
    ///
    /// # Panics
    /// If the ID is stale.
    pub fn assign(&mut self, id: ResourceId, resource: R, state: ResourceState) {
        let slot = self.live_slot_mut(id);
        slot.resource = Some(resource);
        slot.state = state;
    }

    /// Frees the slot for the given ID and returns the resource it held, if
    /// any. Does nothing for a stale ID.
    pub fn unassign(&mut self, id: ResourceId) -> Option<R> {
        self.slots
            .remove(self.slot_key(id))
            .and_then(|slot| slot.resource)
    }

    /// Allocates a slot and creates the resource in it synchronously with
    /// the given closure. The slot ends up [`Valid`](ResourceState::Valid)
    /// if the closure succeeds and [`Failed`](ResourceState::Failed)
    /// otherwise. Failures are logged, not returned.
    ///
    /// # Panics
    /// If every slot is in use.
    pub fn create_with(
        &mut self,
        label: ResourceLabel,
        create: impl FnOnce() -> Result<R>,
    ) -> ResourceId {
        let id = self.alloc_id(label);
        self.update_state(id, ResourceState::Setup);
        self.init_slot(id, create);
        id
    }

    /// Allocates a slot in the [`Pending`](ResourceState::Pending) state for
    /// a resource whose data will arrive later.
    ///
    /// # Panics
    /// If every slot is in use.
    pub fn prepare_async(&mut self, label: ResourceLabel) -> ResourceId {
        let id = self.alloc_id(label);
        self.update_state(id, ResourceState::Pending);
        id
    }

    /// Creates the resource for a slot prepared with
    /// [`Self::prepare_async`] with the given closure.
    ///
    /// The slot may have been destroyed while its data was loading. In that
    /// case the closure is not called, nothing in the pool changes, and
    /// [`ResourceState::Invalid`] is returned.
    pub fn init_async_with(
        &mut self,
        id: ResourceId,
        create: impl FnOnce() -> Result<R>,
    ) -> ResourceState {
        if !self.contains(id) {
            prism_log::warn!("Resource {id} destroyed before its data finished loading");
            return ResourceState::Invalid;
        }
        self.init_slot(id, create)
    }

    /// Marks a slot prepared with [`Self::prepare_async`] as failed.
    ///
    /// Like [`Self::init_async_with`], this does nothing and returns
    /// [`ResourceState::Invalid`] if the slot has been destroyed.
    pub fn failed_async(&mut self, id: ResourceId) -> ResourceState {
        if !self.contains(id) {
            prism_log::warn!("Resource {id} destroyed before its data failed to load");
            return ResourceState::Invalid;
        }
        self.update_state(id, ResourceState::Failed);
        ResourceState::Failed
    }

    /// Frees the slot for the given ID, passing the resource it held to the
    /// given closure if the resource was successfully created.
    pub fn destroy_with(&mut self, id: ResourceId, destroy: impl FnOnce(R)) {
        if let Some(resource) = self.unassign(id) {
            destroy(resource);
        }
    }

    fn init_slot(&mut self, id: ResourceId, create: impl FnOnce() -> Result<R>) -> ResourceState {
        match create() {
            Ok(resource) => {
                self.assign(id, resource, ResourceState::Valid);
                ResourceState::Valid
            }
            Err(error) => {
                prism_log::warn!("Failed to create resource {id}: {error:#}");
                self.update_state(id, ResourceState::Failed);
                ResourceState::Failed
            }
        }
    }

    fn live_slot_mut(&mut self, id: ResourceId) -> &mut ResourceSlot<R> {
        let key = self.slot_key(id);
        self.slots
            .get_value_mut(key)
            .unwrap_or_else(|| panic!("Tried to modify destroyed resource {id}"))
    }

    fn slot_key(&self, id: ResourceId) -> SlotKey {
        assert_eq!(
            id.resource_type(),
            self.resource_type,
            "Resource ID {id} used with pool of wrong type"
        );
        id.slot_key()
    }
}
