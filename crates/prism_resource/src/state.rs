//! Resource lifecycle states and diagnostics.

use crate::{ResourceLabel, ResourceType};
use std::fmt;

/// The lifecycle state of the resource in a pool slot.
///
/// A slot moves from [`Initial`](Self::Initial) to
/// [`Setup`](Self::Setup) during synchronous creation, or to
/// [`Pending`](Self::Pending) while asynchronous loading is outstanding, and
/// ends up [`Valid`](Self::Valid) or [`Failed`](Self::Failed) until the
/// resource is destroyed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceState {
    /// The slot has been allocated but nothing has been done with it.
    Initial,
    /// The resource is being created synchronously.
    Setup,
    /// The resource is waiting for asynchronously loaded data.
    Pending,
    /// The resource was created and can be used.
    Valid,
    /// Creating the resource failed. The resource must not be used.
    Failed,
    /// The ID does not refer to a live resource.
    Invalid,
}

/// Information about a single resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceInfo {
    pub state: ResourceState,
    pub label: ResourceLabel,
    pub resource_type: ResourceType,
}

/// Information about the pool for one resource type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResourcePoolInfo {
    pub resource_type: Option<ResourceType>,
    pub n_slots: usize,
    pub n_used_slots: usize,
    pub n_free_slots: usize,
    pub n_initial: usize,
    pub n_setup: usize,
    pub n_pending: usize,
    pub n_valid: usize,
    pub n_failed: usize,
}

impl ResourceState {
    /// Whether the state is final until the resource is destroyed.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Valid | Self::Failed)
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initial => "initial",
            Self::Setup => "setup",
            Self::Pending => "pending",
            Self::Valid => "valid",
            Self::Failed => "failed",
            Self::Invalid => "invalid",
        };
        f.write_str(name)
    }
}

impl ResourceInfo {
    /// Returns the information reported for an ID that does not refer to a
    /// live resource.
    pub fn invalid() -> Self {
        Self {
            state: ResourceState::Invalid,
            label: ResourceLabel::INVALID,
            resource_type: ResourceType::INVALID,
        }
    }
}

impl ResourcePoolInfo {
    pub(crate) fn record_state(&mut self, state: ResourceState) {
        match state {
            ResourceState::Initial => self.n_initial += 1,
            ResourceState::Setup => self.n_setup += 1,
            ResourceState::Pending => self.n_pending += 1,
            ResourceState::Valid => self.n_valid += 1,
            ResourceState::Failed => self.n_failed += 1,
            ResourceState::Invalid => {}
        }
    }
}
