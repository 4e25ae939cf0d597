//! Container tying the label stack, registry and pools together.

use crate::{
    Locator, ResourceFactory, ResourceId, ResourceInfo, ResourceLabel, ResourceLabelStack,
    ResourceLoader, ResourcePoolInfo, ResourcePools, ResourceRegistry, ResourceSetup,
    ResourceState, ResourceType,
};
use std::mem;

/// Front end for creating, loading and destroying resources.
///
/// Every resource is tagged with the label on top of the container's label
/// stack and registered under its locator. Requests for a shared locator that
/// is already registered return the existing resource. Resources are
/// destroyed in bulk by label, either immediately or deferred until the next
/// [`garbage_collect`](Self::garbage_collect).
#[derive(Debug)]
pub struct ResourceContainer<P: ResourcePools> {
    label_stack: ResourceLabelStack,
    registry: ResourceRegistry,
    pools: P,
    pending_loaders: Vec<Box<dyn ResourceLoader<P>>>,
    destroy_queue: Vec<ResourceId>,
}

impl<P: ResourcePools> ResourceContainer<P> {
    /// Creates a container managing the given pools.
    pub fn new(pools: P, label_stack_capacity: usize, registry_capacity: usize) -> Self {
        Self {
            label_stack: ResourceLabelStack::new(label_stack_capacity),
            registry: ResourceRegistry::with_capacity(registry_capacity),
            pools,
            pending_loaders: Vec::new(),
            destroy_queue: Vec::new(),
        }
    }

    /// Whether the container has not been discarded.
    pub fn is_valid(&self) -> bool {
        self.label_stack.is_valid()
    }

    pub fn pools(&self) -> &P {
        &self.pools
    }

    pub fn pools_mut(&mut self) -> &mut P {
        &mut self.pools
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Generates a new label and makes it the active one.
    pub fn push_new_label(&mut self) -> ResourceLabel {
        self.label_stack.push_new_label()
    }

    /// Makes the given label the active one.
    pub fn push_label(&mut self, label: ResourceLabel) {
        self.label_stack.push_label(label);
    }

    pub fn pop_label(&mut self) -> ResourceLabel {
        self.label_stack.pop_label()
    }

    pub fn peek_label(&self) -> ResourceLabel {
        self.label_stack.peek_label()
    }

    /// Returns the ID of the resource registered under the given shared
    /// locator, or the invalid ID.
    pub fn lookup(&self, locator: &Locator) -> ResourceId {
        self.assert_valid();
        self.registry.lookup(locator)
    }

    /// Creates the resource described by the setup, or returns the existing
    /// resource if the setup's locator is shared and already registered.
    ///
    /// Creation failures are not reported here; the slot of a resource that
    /// could not be created is [`Failed`](ResourceState::Failed).
    pub fn create<S>(&mut self, setup: &S) -> ResourceId
    where
        S: ResourceSetup,
        P: ResourceFactory<S>,
    {
        self.create_from(setup, None)
    }

    /// Like [`create`](Self::create), but builds the resource from the given
    /// data.
    pub fn create_with_data<S>(&mut self, setup: &S, data: &[u8]) -> ResourceId
    where
        S: ResourceSetup,
        P: ResourceFactory<S>,
    {
        self.create_from(setup, Some(data))
    }

    fn create_from<S>(&mut self, setup: &S, data: Option<&[u8]>) -> ResourceId
    where
        S: ResourceSetup,
        P: ResourceFactory<S>,
    {
        self.assert_valid();

        let existing_id = self.registry.lookup(setup.locator());
        if existing_id.is_valid() {
            return existing_id;
        }

        let label = self.label_stack.peek_label();
        let id = self.pools.create_resource(setup, data, label);
        self.registry.add(setup.locator().clone(), id);
        id
    }

    /// Starts the given loader and tracks it until it resolves, or returns the
    /// existing resource if the loader's locator is shared and already
    /// registered (the loader is then dropped without being started).
    ///
    /// The returned ID refers to a [`Pending`](ResourceState::Pending) slot
    /// until [`update`](Self::update) has seen the loader finish.
    pub fn load<L>(&mut self, mut loader: L) -> ResourceId
    where
        L: ResourceLoader<P> + 'static,
    {
        self.assert_valid();

        let existing_id = self.registry.lookup(loader.locator());
        if existing_id.is_valid() {
            return existing_id;
        }

        let label = self.label_stack.peek_label();
        let id = loader.start(&mut self.pools, label);
        self.registry.add(loader.locator().clone(), id);

        prism_log::debug!("Started loading {} into {id}", loader.locator());
        self.pending_loaders.push(Box::new(loader));
        id
    }

    /// Polls every pending loader once and stops tracking the ones that are
    /// no longer pending.
    pub fn update(&mut self) {
        self.assert_valid();

        for loader_idx in (0..self.pending_loaders.len()).rev() {
            let state = self.pending_loaders[loader_idx].continue_loading(&mut self.pools);
            if state != ResourceState::Pending {
                let loader = self.pending_loaders.remove(loader_idx);
                prism_log::debug!("Finished loading {} ({state})", loader.locator());
            }
        }
    }

    /// Destroys every resource with the given label, or every resource if the
    /// label is [`ResourceLabel::ALL`].
    ///
    /// Loaders still working on a destroyed resource are left running and
    /// resolve to [`ResourceState::Invalid`].
    pub fn destroy(&mut self, label: ResourceLabel) {
        self.assert_valid();

        let ids = self.registry.remove(label);
        prism_log::debug!("Destroying {} resources with label {label}", ids.len());
        for id in ids {
            self.pools.destroy_resource(id);
        }
    }

    /// Unregisters every resource with the given label at once, so that
    /// lookups no longer find them, but postpones tearing them down until
    /// [`garbage_collect`](Self::garbage_collect).
    pub fn destroy_deferred(&mut self, label: ResourceLabel) {
        self.assert_valid();

        let ids = self.registry.remove(label);
        prism_log::debug!(
            "Deferring destruction of {} resources with label {label}",
            ids.len()
        );
        self.destroy_queue.extend(ids);
    }

    /// Tears down every resource whose destruction was deferred.
    pub fn garbage_collect(&mut self) {
        for id in mem::take(&mut self.destroy_queue) {
            self.pools.destroy_resource(id);
        }
    }

    /// Returns the number of resources awaiting garbage collection.
    pub fn n_deferred_destructions(&self) -> usize {
        self.destroy_queue.len()
    }

    pub fn query_resource_info(&self, id: ResourceId) -> ResourceInfo {
        self.assert_valid();
        self.pools.query_resource_info(id)
    }

    pub fn query_pool_info(&self, resource_type: ResourceType) -> ResourcePoolInfo {
        self.assert_valid();
        self.pools.query_pool_info(resource_type)
    }

    pub fn query_free_slots(&self, resource_type: ResourceType) -> usize {
        self.assert_valid();
        self.pools.query_free_slots(resource_type)
    }

    /// Returns the number of loaders that have not finished yet.
    pub fn n_pending_loaders(&self) -> usize {
        self.pending_loaders.len()
    }

    /// Cancels all loaders, destroys all resources and discards the label
    /// stack, leaving the container invalid.
    ///
    /// # Panics
    /// If labels pushed on the stack have not all been popped.
    pub fn discard(&mut self) {
        self.assert_valid();

        for loader in &mut self.pending_loaders {
            loader.cancel();
        }
        self.pending_loaders.clear();

        self.destroy(ResourceLabel::ALL);
        self.garbage_collect();
        self.registry.clear();
        self.label_stack.discard();
    }

    fn assert_valid(&self) {
        assert!(self.is_valid(), "Tried to use discarded resource container");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AsyncResourceFactory, ResourcePool};
    use anyhow::bail;
    use std::{cell::Cell, rc::Rc};

    const BLOB: ResourceType = ResourceType::new(0);

    #[derive(Clone, Debug)]
    struct BlobSetup {
        locator: Locator,
        fail: bool,
    }

    impl BlobSetup {
        fn shared(location: &str) -> Self {
            Self {
                locator: Locator::new(location),
                fail: false,
            }
        }

        fn non_shared(location: &str) -> Self {
            Self {
                locator: Locator::non_shared_at(location),
                fail: false,
            }
        }

        fn failing(location: &str) -> Self {
            Self {
                locator: Locator::new(location),
                fail: true,
            }
        }
    }

    impl ResourceSetup for BlobSetup {
        fn locator(&self) -> &Locator {
            &self.locator
        }
    }

    #[derive(Debug)]
    struct BlobPools {
        blobs: ResourcePool<Vec<u8>>,
        destroyed: Vec<ResourceId>,
    }

    impl BlobPools {
        fn new(capacity: usize) -> Self {
            Self {
                blobs: ResourcePool::new(BLOB, capacity),
                destroyed: Vec::new(),
            }
        }

        fn build(setup: &BlobSetup, data: &[u8]) -> anyhow::Result<Vec<u8>> {
            if setup.fail {
                bail!("Blob {} rejected", setup.locator);
            }
            Ok(data.to_vec())
        }
    }

    impl ResourcePools for BlobPools {
        fn destroy_resource(&mut self, id: ResourceId) {
            if self.blobs.contains(id) {
                self.destroyed.push(id);
            }
            self.blobs.unassign(id);
        }

        fn query_resource_info(&self, id: ResourceId) -> ResourceInfo {
            self.blobs.query_info(id)
        }

        fn query_pool_info(&self, _resource_type: ResourceType) -> ResourcePoolInfo {
            self.blobs.query_pool_info()
        }

        fn query_free_slots(&self, _resource_type: ResourceType) -> usize {
            self.blobs.n_free_slots()
        }
    }

    impl ResourceFactory<BlobSetup> for BlobPools {
        fn create_resource(
            &mut self,
            setup: &BlobSetup,
            data: Option<&[u8]>,
            label: ResourceLabel,
        ) -> ResourceId {
            self.blobs
                .create_with(label, || Self::build(setup, data.unwrap_or_default()))
        }
    }

    impl AsyncResourceFactory<BlobSetup> for BlobPools {
        fn prepare_async(&mut self, _setup: &BlobSetup, label: ResourceLabel) -> ResourceId {
            self.blobs.prepare_async(label)
        }

        fn init_async(&mut self, id: ResourceId, setup: &BlobSetup, data: &[u8]) -> ResourceState {
            self.blobs.init_async_with(id, || Self::build(setup, data))
        }

        fn failed_async(&mut self, id: ResourceId) -> ResourceState {
            self.blobs.failed_async(id)
        }
    }

    /// Loader whose data "arrives" when the test fills in the shared cell.
    #[derive(Debug)]
    struct BlobLoader {
        setup: BlobSetup,
        id: ResourceId,
        delivery: Rc<Cell<Option<Result<u8, ()>>>>,
        cancelled: Rc<Cell<bool>>,
        resolved: Option<ResourceState>,
    }

    impl BlobLoader {
        fn new(location: &str) -> (Self, Rc<Cell<Option<Result<u8, ()>>>>, Rc<Cell<bool>>) {
            let delivery = Rc::new(Cell::new(None));
            let cancelled = Rc::new(Cell::new(false));
            let loader = Self {
                setup: BlobSetup::shared(location),
                id: ResourceId::invalid(),
                delivery: Rc::clone(&delivery),
                cancelled: Rc::clone(&cancelled),
                resolved: None,
            };
            (loader, delivery, cancelled)
        }
    }

    impl<P: AsyncResourceFactory<BlobSetup>> ResourceLoader<P> for BlobLoader {
        fn locator(&self) -> &Locator {
            &self.setup.locator
        }

        fn start(&mut self, pools: &mut P, label: ResourceLabel) -> ResourceId {
            self.id = pools.prepare_async(&self.setup, label);
            self.id
        }

        fn continue_loading(&mut self, pools: &mut P) -> ResourceState {
            if let Some(state) = self.resolved {
                return state;
            }
            let state = match self.delivery.take() {
                None => return ResourceState::Pending,
                Some(Ok(byte)) => pools.init_async(self.id, &self.setup, &[byte]),
                Some(Err(())) => pools.failed_async(self.id),
            };
            self.resolved = Some(state);
            state
        }

        fn cancel(&mut self) {
            if self.resolved.is_none() {
                self.cancelled.set(true);
            }
        }
    }

    fn container() -> ResourceContainer<BlobPools> {
        ResourceContainer::new(BlobPools::new(8), 8, 8)
    }

    #[test]
    fn creating_same_shared_locator_twice_gives_same_resource() {
        let mut container = container();
        let first = container.create_with_data(&BlobSetup::shared("bla"), b"a");
        let second = container.create_with_data(&BlobSetup::shared("bla"), b"b");

        assert_eq!(first, second);
        assert_eq!(container.pools().blobs.resource(first), b"a");
        assert_eq!(container.query_free_slots(BLOB), 7);
        assert_eq!(container.lookup(&Locator::new("bla")), first);
    }

    #[test]
    fn creating_same_non_shared_locator_twice_gives_distinct_resources() {
        let mut container = container();
        let first = container.create(&BlobSetup::non_shared("blob"));
        let second = container.create(&BlobSetup::non_shared("blob"));

        assert_ne!(first, second);
        assert_eq!(container.query_pool_info(BLOB).n_valid, 2);
        assert_eq!(container.registry().len(), 2);
    }

    #[test]
    fn rejected_creation_gives_failed_resource() {
        let mut container = container();
        let id = container.create(&BlobSetup::failing("bad"));

        let info = container.query_resource_info(id);
        assert_eq!(info.state, ResourceState::Failed);
        assert_eq!(info.resource_type, BLOB);
        assert_eq!(container.lookup(&Locator::new("bad")), id);
    }

    #[test]
    fn resources_are_tagged_with_active_label() {
        let mut container = container();
        let default_id = container.create(&BlobSetup::shared("a"));
        let label = container.push_new_label();
        let labelled_id = container.create(&BlobSetup::shared("b"));
        assert_eq!(container.pop_label(), label);

        assert_eq!(container.query_resource_info(default_id).label, ResourceLabel::DEFAULT);
        assert_eq!(container.query_resource_info(labelled_id).label, label);
        assert_eq!(labelled_id.label(), label);
    }

    #[test]
    fn destroying_label_removes_only_its_resources() {
        let mut container = container();
        let kept_id = container.create(&BlobSetup::shared("kept"));
        let label = container.push_new_label();
        let first = container.create(&BlobSetup::shared("first"));
        let second = container.create(&BlobSetup::non_shared("second"));
        container.pop_label();

        container.destroy(label);

        assert_eq!(container.query_resource_info(first).state, ResourceState::Invalid);
        assert_eq!(container.query_resource_info(second).state, ResourceState::Invalid);
        assert_eq!(container.query_resource_info(kept_id).state, ResourceState::Valid);
        assert!(!container.lookup(&Locator::new("first")).is_valid());
        assert_eq!(container.pools().destroyed, vec![second, first]);
        assert!(container.registry().check_integrity());
    }

    #[test]
    fn deferred_destruction_unregisters_now_and_frees_slots_at_collection() {
        let mut container = container();
        let label = container.push_new_label();
        let id = container.create(&BlobSetup::shared("bla"));
        container.pop_label();

        container.destroy_deferred(label);

        assert!(!container.lookup(&Locator::new("bla")).is_valid());
        assert_eq!(container.query_resource_info(id).state, ResourceState::Valid);
        assert_eq!(container.n_deferred_destructions(), 1);

        // A new resource under the same locator does not collide with the
        // one awaiting collection
        let new_id = container.create(&BlobSetup::shared("bla"));
        assert_ne!(new_id, id);

        container.garbage_collect();

        assert_eq!(container.query_resource_info(id).state, ResourceState::Invalid);
        assert_eq!(container.query_resource_info(new_id).state, ResourceState::Valid);
        assert_eq!(container.n_deferred_destructions(), 0);
    }

    #[test]
    fn loading_gives_pending_resource_until_data_arrives() {
        let mut container = container();
        let (loader, delivery, _) = BlobLoader::new("async");
        let id = container.load(loader);

        assert_eq!(container.query_resource_info(id).state, ResourceState::Pending);
        container.update();
        assert_eq!(container.query_resource_info(id).state, ResourceState::Pending);
        assert_eq!(container.n_pending_loaders(), 1);

        delivery.set(Some(Ok(9)));
        container.update();

        assert_eq!(container.query_resource_info(id).state, ResourceState::Valid);
        assert_eq!(container.pools().blobs.resource(id), &[9]);
        assert_eq!(container.n_pending_loaders(), 0);
    }

    #[test]
    fn failed_load_gives_failed_resource() {
        let mut container = container();
        let (loader, delivery, _) = BlobLoader::new("async");
        let id = container.load(loader);

        delivery.set(Some(Err(())));
        container.update();

        assert_eq!(container.query_resource_info(id).state, ResourceState::Failed);
        assert_eq!(container.n_pending_loaders(), 0);
    }

    #[test]
    fn loading_registered_shared_locator_returns_existing_resource_without_starting() {
        let mut container = container();
        let existing_id = container.create(&BlobSetup::shared("async"));
        let (loader, _, _) = BlobLoader::new("async");

        assert_eq!(container.load(loader), existing_id);
        assert_eq!(container.n_pending_loaders(), 0);
    }

    #[test]
    fn load_completing_after_destruction_does_not_touch_new_occupant_of_slot() {
        let mut container = ResourceContainer::new(BlobPools::new(1), 8, 8);
        let label = container.push_new_label();
        let (loader, delivery, _) = BlobLoader::new("async");
        let stale_id = container.load(loader);
        container.pop_label();

        container.destroy(label);
        let new_id = container.create_with_data(&BlobSetup::shared("other"), b"new");
        assert_eq!(new_id.slot_idx(), stale_id.slot_idx());

        delivery.set(Some(Ok(1)));
        container.update();

        assert_eq!(container.n_pending_loaders(), 0);
        assert_eq!(container.query_resource_info(stale_id).state, ResourceState::Invalid);
        assert_eq!(container.query_resource_info(new_id).state, ResourceState::Valid);
        assert_eq!(container.pools().blobs.resource(new_id), b"new");
    }

    #[test]
    fn discarding_cancels_loaders_and_destroys_everything() {
        let mut container = container();
        container.create(&BlobSetup::shared("a"));
        let label = container.push_new_label();
        container.create(&BlobSetup::shared("b"));
        container.pop_label();
        container.destroy_deferred(label);
        let (loader, _, cancelled) = BlobLoader::new("async");
        container.load(loader);

        container.discard();

        assert!(!container.is_valid());
        assert!(cancelled.get());
        assert_eq!(container.n_pending_loaders(), 0);
        assert_eq!(container.pools().blobs.n_free_slots(), 8);
        assert_eq!(container.n_deferred_destructions(), 0);
    }

    #[test]
    #[should_panic(expected = "discarded")]
    fn creating_in_discarded_container_fails() {
        let mut container = container();
        container.discard();
        container.create(&BlobSetup::shared("a"));
    }
}
