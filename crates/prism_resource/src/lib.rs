//! Resource management.
//!
//! Resources live in fixed-capacity pools and are referred to by
//! generation-stamped [`ResourceId`]s. A [`ResourceContainer`] registers each
//! resource under a [`Locator`], so requests for the same shared locator
//! return the same resource, and tags it with the active [`ResourceLabel`],
//! so groups of resources can be destroyed together.

mod container;
mod factory;
mod id;
mod label;
mod locator;
mod pool;
mod registry;
mod state;

pub use container::ResourceContainer;
pub use factory::{
    AsyncResourceFactory, ResourceFactory, ResourceLoader, ResourcePools, ResourceSetup,
};
pub use id::{ResourceId, ResourceType};
pub use label::{ResourceLabel, ResourceLabelStack};
pub use locator::Locator;
pub use pool::ResourcePool;
pub use registry::ResourceRegistry;
pub use state::{ResourceInfo, ResourcePoolInfo, ResourceState};
