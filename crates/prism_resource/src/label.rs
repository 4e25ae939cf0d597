//! Resource labels and the label stack.

use bytemuck::{Pod, Zeroable};
use std::fmt;

/// A tag stamped on every resource at creation time, used to destroy groups
/// of resources together.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Zeroable, Pod)]
pub struct ResourceLabel(u32);

/// A stack of [`ResourceLabel`]s. Resources are tagged with the label on top
/// of the stack when they are created.
///
/// The stack starts out holding [`ResourceLabel::DEFAULT`], which stays at the
/// bottom until the stack is discarded.
#[derive(Clone, Debug)]
pub struct ResourceLabelStack {
    labels: Vec<ResourceLabel>,
    n_generated_labels: u32,
}

impl ResourceLabel {
    /// A label that never tags a resource.
    pub const INVALID: Self = Self(u32::MAX);
    /// A label matching every resource when destroying by label.
    pub const ALL: Self = Self(u32::MAX - 1);
    /// The label active when no other label has been pushed. Generated labels
    /// are always smaller than this.
    pub const DEFAULT: Self = Self(0x7FFF_FFFF);

    /// Returns the raw label value.
    pub const fn value(&self) -> u32 {
        self.0
    }

    pub const fn is_valid(&self) -> bool {
        self.0 != Self::INVALID.0
    }

    /// Whether resources tagged with the given label are selected by this
    /// label, which holds if the labels are equal or this is
    /// [`Self::ALL`].
    pub fn matches(&self, resource_label: Self) -> bool {
        *self == Self::ALL || *self == resource_label
    }
}

impl fmt::Display for ResourceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::INVALID => write!(f, "invalid"),
            Self::ALL => write!(f, "all"),
            Self::DEFAULT => write!(f, "default"),
            Self(value) => write!(f, "{value}"),
        }
    }
}

impl ResourceLabelStack {
    /// Creates a new stack with room for the given number of labels before
    /// reallocating, holding only [`ResourceLabel::DEFAULT`].
    pub fn new(capacity: usize) -> Self {
        let mut labels = Vec::with_capacity(capacity.max(1));
        labels.push(ResourceLabel::DEFAULT);
        Self {
            labels,
            n_generated_labels: 0,
        }
    }

    /// Whether the stack has not been discarded.
    pub fn is_valid(&self) -> bool {
        !self.labels.is_empty()
    }

    /// Returns the number of labels on the stack, including the default one.
    pub fn depth(&self) -> usize {
        self.labels.len()
    }

    /// Generates a new label, pushes it and returns it.
    ///
    /// # Panics
    /// - If the stack has been discarded.
    /// - If all labels below [`ResourceLabel::DEFAULT`] have been generated.
    pub fn push_new_label(&mut self) -> ResourceLabel {
        assert!(
            self.n_generated_labels < ResourceLabel::DEFAULT.0,
            "Exhausted resource labels"
        );
        let label = ResourceLabel(self.n_generated_labels);
        self.n_generated_labels += 1;
        self.push_label(label);
        label
    }

    /// Pushes the given label, typically one generated earlier, so that
    /// resources created now share it with resources created before.
    ///
    /// # Panics
    /// - If the stack has been discarded.
    /// - If the label is [`ResourceLabel::INVALID`] or [`ResourceLabel::ALL`].
    pub fn push_label(&mut self, label: ResourceLabel) {
        assert!(self.is_valid(), "Tried to push label on discarded stack");
        assert!(
            label.is_valid() && label != ResourceLabel::ALL,
            "Tried to push reserved resource label {label}"
        );
        self.labels.push(label);
    }

    /// Pops and returns the label on top of the stack.
    ///
    /// # Panics
    /// If only the default label is left on the stack.
    pub fn pop_label(&mut self) -> ResourceLabel {
        assert!(
            self.labels.len() > 1,
            "Tried to pop the default resource label"
        );
        self.labels.pop().unwrap_or(ResourceLabel::INVALID)
    }

    /// Returns the label on top of the stack.
    ///
    /// # Panics
    /// If the stack has been discarded.
    pub fn peek_label(&self) -> ResourceLabel {
        *self
            .labels
            .last()
            .expect("Tried to peek label on discarded stack")
    }

    /// Pops the default label, leaving the stack empty and invalid.
    ///
    /// # Panics
    /// If labels other than the default one are still on the stack.
    pub fn discard(&mut self) {
        assert_eq!(
            self.labels.as_slice(),
            &[ResourceLabel::DEFAULT],
            "Unbalanced resource label pushes at discard"
        );
        self.labels.clear();
    }
}
