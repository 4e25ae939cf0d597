//! Interfaces between the resource container and the pools that build
//! resources.

use crate::{Locator, ResourceId, ResourceInfo, ResourceLabel, ResourcePoolInfo, ResourceState, ResourceType};
use std::fmt;

/// Description of a resource to create, carrying the [`Locator`] the resource
/// is registered under.
pub trait ResourceSetup {
    fn locator(&self) -> &Locator;
}

/// Access to the pools of every resource type managed by a
/// [`ResourceContainer`](crate::ResourceContainer).
pub trait ResourcePools {
    /// Tears down the resource with the given ID and frees its slot. Does
    /// nothing if the ID is stale.
    fn destroy_resource(&mut self, id: ResourceId);

    /// Returns information about the resource with the given ID. The state is
    /// [`ResourceState::Invalid`] if the ID is stale.
    fn query_resource_info(&self, id: ResourceId) -> ResourceInfo;

    /// Returns usage information for the pool of the given resource type.
    fn query_pool_info(&self, resource_type: ResourceType) -> ResourcePoolInfo;

    /// Returns the number of free slots in the pool of the given resource
    /// type.
    fn query_free_slots(&self, resource_type: ResourceType) -> usize;
}

/// Pools able to create resources described by setups of type `S`
/// synchronously.
pub trait ResourceFactory<S: ResourceSetup>: ResourcePools {
    /// Allocates a slot and creates the resource described by the setup in
    /// it, from the given data if any. The returned ID refers to a slot that
    /// is either [`Valid`](ResourceState::Valid) or
    /// [`Failed`](ResourceState::Failed).
    ///
    /// # Panics
    /// If the pool for the resource type is exhausted.
    fn create_resource(
        &mut self,
        setup: &S,
        data: Option<&[u8]>,
        label: ResourceLabel,
    ) -> ResourceId;
}

/// Pools able to create resources described by setups of type `S` from data
/// that arrives after the slot has been reserved.
///
/// The slot may be destroyed, and even reused, while the data is in flight.
/// Both completion methods must then leave the pool untouched and return
/// [`ResourceState::Invalid`].
pub trait AsyncResourceFactory<S: ResourceSetup>: ResourcePools {
    /// Reserves a [`Pending`](ResourceState::Pending) slot.
    ///
    /// # Panics
    /// If the pool for the resource type is exhausted.
    fn prepare_async(&mut self, setup: &S, label: ResourceLabel) -> ResourceId;

    /// Creates the resource for a slot reserved with
    /// [`prepare_async`](Self::prepare_async) from the loaded data.
    fn init_async(&mut self, id: ResourceId, setup: &S, data: &[u8]) -> ResourceState;

    /// Marks a slot reserved with [`prepare_async`](Self::prepare_async) as
    /// failed.
    fn failed_async(&mut self, id: ResourceId) -> ResourceState;
}

/// A resource whose data is loaded asynchronously, driven by polling.
///
/// A loader is started once by the container and then polled once per frame
/// until it no longer reports [`ResourceState::Pending`].
pub trait ResourceLoader<P: ?Sized>: fmt::Debug {
    /// Returns the locator the loaded resource is registered under.
    fn locator(&self) -> &Locator;

    /// Reserves a pending slot in the given pools, tagged with the given
    /// label, and issues whatever requests are needed to obtain the data.
    /// Must not block.
    fn start(&mut self, pools: &mut P, label: ResourceLabel) -> ResourceId;

    /// Advances loading and returns the resulting state of the resource.
    /// Returns the resolved state without side effects once loading has
    /// finished.
    fn continue_loading(&mut self, pools: &mut P) -> ResourceState;

    /// Abandons loading. Does nothing once loading has finished.
    fn cancel(&mut self);
}
