//! Resource identifiers.

use crate::ResourceLabel;
use bytemuck::{Pod, Zeroable};
use prism_containers::SlotKey;
use std::fmt;

/// Tag identifying a type of resource, and thereby the pool its slots live in.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Zeroable, Pod)]
pub struct ResourceType(u16);

/// Identifier for a resource in a pool.
///
/// The ID holds the resource type, the index of the pool slot the resource
/// lives in, the generation ("unique stamp") of the slot at the time the ID
/// was allocated, and the label that was active when the resource was
/// created. The ID only refers to a live resource while its generation matches
/// the current generation of the slot, so an ID retained after its resource
/// was destroyed will never resolve to whatever occupies the slot later.
///
/// IDs are plain values with no ownership of the resource they refer to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceId {
    slot: SlotKey,
    resource_type: ResourceType,
    label: ResourceLabel,
}

impl ResourceType {
    /// Tag of the invalid resource ID.
    pub const INVALID: Self = Self(u16::MAX);

    /// Creates a resource type with the given tag.
    ///
    /// # Panics
    /// If the tag equals the tag of [`Self::INVALID`].
    pub const fn new(tag: u16) -> Self {
        assert!(tag != u16::MAX, "Resource type tag is reserved");
        Self(tag)
    }

    pub const fn tag(&self) -> u16 {
        self.0
    }

    pub const fn is_valid(&self) -> bool {
        self.0 != Self::INVALID.0
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "invalid")
        }
    }
}

impl ResourceId {
    /// Returns the ID that never refers to a resource. Used as the "not
    /// found" result of lookups.
    pub const fn invalid() -> Self {
        Self {
            slot: SlotKey::dummy(),
            resource_type: ResourceType::INVALID,
            label: ResourceLabel::INVALID,
        }
    }

    /// Creates an ID for the resource of the given type in the pool slot
    /// identified by the given key.
    ///
    /// # Panics
    /// If the resource type is invalid or the slot key is illegal.
    pub fn new(resource_type: ResourceType, slot: SlotKey, label: ResourceLabel) -> Self {
        assert!(resource_type.is_valid(), "Tried to create ID of invalid type");
        assert!(slot.is_legal(), "Tried to create ID with illegal slot key");
        Self {
            slot,
            resource_type,
            label,
        }
    }

    /// Whether this is not the [`invalid`](Self::invalid) ID. A valid ID may
    /// still refer to a resource that has been destroyed.
    pub fn is_valid(&self) -> bool {
        self.resource_type.is_valid()
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    /// Returns the key of the pool slot holding the resource.
    pub fn slot_key(&self) -> SlotKey {
        self.slot
    }

    /// Returns the index of the pool slot holding the resource.
    pub fn slot_idx(&self) -> u32 {
        self.slot.idx()
    }

    /// Returns the generation of the slot at the time the ID was allocated.
    pub fn unique_stamp(&self) -> u32 {
        self.slot.generation().value()
    }

    /// Returns the label that was active when the resource was created.
    pub fn label(&self) -> ResourceLabel {
        self.label
    }
}

impl Default for ResourceId {
    fn default() -> Self {
        Self::invalid()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(
                f,
                "{}/{}:{} ({})",
                self.resource_type,
                self.slot_idx(),
                self.unique_stamp(),
                self.label
            )
        } else {
            write!(f, "invalid")
        }
    }
}
