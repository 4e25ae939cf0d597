//! Vertex attributes, formats and layouts.

use anyhow::{Result, anyhow};
use bitflags::bitflags;
use std::fmt;

/// Semantic of a vertex component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum VertexAttr {
    Position,
    Normal,
    TexCoord0,
    TexCoord1,
    TexCoord2,
    TexCoord3,
    Tangent,
    Binormal,
    Weights,
    Indices,
    Color0,
    Color1,
    Instance0,
    Instance1,
    Instance2,
    Instance3,
}

/// Data format of a vertex component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum VertexFormat {
    Float,
    Float2,
    Float3,
    Float4,
    Byte4,
    Byte4N,
    UByte4,
    UByte4N,
    Short2,
    Short2N,
    Short4,
    Short4N,
    UInt10_2N,
}

bitflags! {
    /// Bitflag encoding a set of [`VertexAttr`]s.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct VertexAttrSet: u16 {
        const POSITION   = 1 << 0;
        const NORMAL     = 1 << 1;
        const TEXCOORD0  = 1 << 2;
        const TEXCOORD1  = 1 << 3;
        const TEXCOORD2  = 1 << 4;
        const TEXCOORD3  = 1 << 5;
        const TANGENT    = 1 << 6;
        const BINORMAL   = 1 << 7;
        const WEIGHTS    = 1 << 8;
        const INDICES    = 1 << 9;
        const COLOR0     = 1 << 10;
        const COLOR1     = 1 << 11;
        const INSTANCE0  = 1 << 12;
        const INSTANCE1  = 1 << 13;
        const INSTANCE2  = 1 << 14;
        const INSTANCE3  = 1 << 15;
    }
}

/// One component of a [`VertexLayout`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VertexComponent {
    pub attr: VertexAttr,
    pub format: VertexFormat,
}

/// Describes how the components of a vertex are laid out in memory. The
/// components are tightly packed in the order they were added.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    components: Vec<VertexComponent>,
    attrs: VertexAttrSet,
}

impl VertexAttr {
    /// The number of vertex attributes.
    pub const COUNT: usize = 16;

    /// All vertex attributes, ordered by their code.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Position,
        Self::Normal,
        Self::TexCoord0,
        Self::TexCoord1,
        Self::TexCoord2,
        Self::TexCoord3,
        Self::Tangent,
        Self::Binormal,
        Self::Weights,
        Self::Indices,
        Self::Color0,
        Self::Color1,
        Self::Instance0,
        Self::Instance1,
        Self::Instance2,
        Self::Instance3,
    ];

    /// Returns the attribute with the given code.
    pub fn from_code(code: u32) -> Result<Self> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or_else(|| anyhow!("Invalid vertex attribute code {code}"))
    }

    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Returns the [`VertexAttrSet`] containing only this attribute.
    pub fn flag(&self) -> VertexAttrSet {
        VertexAttrSet::from_bits_truncate(1 << self.code())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::Normal => "normal",
            Self::TexCoord0 => "texcoord0",
            Self::TexCoord1 => "texcoord1",
            Self::TexCoord2 => "texcoord2",
            Self::TexCoord3 => "texcoord3",
            Self::Tangent => "tangent",
            Self::Binormal => "binormal",
            Self::Weights => "weights",
            Self::Indices => "indices",
            Self::Color0 => "color0",
            Self::Color1 => "color1",
            Self::Instance0 => "instance0",
            Self::Instance1 => "instance1",
            Self::Instance2 => "instance2",
            Self::Instance3 => "instance3",
        }
    }
}

impl fmt::Display for VertexAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl VertexFormat {
    pub const COUNT: usize = 13;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Float,
        Self::Float2,
        Self::Float3,
        Self::Float4,
        Self::Byte4,
        Self::Byte4N,
        Self::UByte4,
        Self::UByte4N,
        Self::Short2,
        Self::Short2N,
        Self::Short4,
        Self::Short4N,
        Self::UInt10_2N,
    ];

    /// Returns the format with the given code.
    pub fn from_code(code: u32) -> Result<Self> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or_else(|| anyhow!("Invalid vertex format code {code}"))
    }

    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Returns the number of bytes a component of this format occupies.
    pub fn byte_size(&self) -> usize {
        match self {
            Self::Float => 4,
            Self::Float2 => 8,
            Self::Float3 => 12,
            Self::Float4 => 16,
            Self::Byte4
            | Self::Byte4N
            | Self::UByte4
            | Self::UByte4N
            | Self::Short2
            | Self::Short2N
            | Self::UInt10_2N => 4,
            Self::Short4 | Self::Short4N => 8,
        }
    }
}

impl fmt::Display for VertexFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for VertexAttrSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ ")?;
        for attr in VertexAttr::ALL {
            if self.contains(attr.flag()) {
                write!(f, "`{attr}` ")?;
            }
        }
        write!(f, "}}")
    }
}

impl VertexComponent {
    pub fn new(attr: VertexAttr, format: VertexFormat) -> Self {
        Self { attr, format }
    }

    pub fn byte_size(&self) -> usize {
        self.format.byte_size()
    }
}

impl VertexLayout {
    /// The maximum number of components in a layout.
    pub const MAX_COMPONENTS: usize = VertexAttr::COUNT;

    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a component for the given attribute and format.
    ///
    /// # Panics
    /// If the layout already has a component for the attribute.
    pub fn add(&mut self, attr: VertexAttr, format: VertexFormat) -> &mut Self {
        self.add_component(VertexComponent::new(attr, format))
    }

    /// Appends the given component.
    ///
    /// # Panics
    /// If the layout already has a component for the component's attribute.
    pub fn add_component(&mut self, component: VertexComponent) -> &mut Self {
        assert!(
            !self.contains(component.attr),
            "Vertex layout already has a {} component",
            component.attr
        );
        self.attrs |= component.attr.flag();
        self.components.push(component);
        self
    }

    pub fn clear(&mut self) {
        self.components.clear();
        self.attrs = VertexAttrSet::empty();
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn n_components(&self) -> usize {
        self.components.len()
    }

    pub fn components(&self) -> &[VertexComponent] {
        &self.components
    }

    /// Returns the set of attributes present in the layout.
    pub fn attrs(&self) -> VertexAttrSet {
        self.attrs
    }

    pub fn contains(&self, attr: VertexAttr) -> bool {
        self.attrs.contains(attr.flag())
    }

    /// Returns the index of the component for the given attribute.
    pub fn component_index(&self, attr: VertexAttr) -> Option<usize> {
        self.components
            .iter()
            .position(|component| component.attr == attr)
    }

    /// Returns the size of one vertex in bytes.
    pub fn byte_size(&self) -> usize {
        self.components.iter().map(VertexComponent::byte_size).sum()
    }

    /// Returns the offset in bytes of the component with the given index from
    /// the start of a vertex.
    ///
    /// # Panics
    /// If the index is out of bounds.
    pub fn component_byte_offset(&self, component_idx: usize) -> usize {
        assert!(component_idx < self.components.len());
        self.components[..component_idx]
            .iter()
            .map(VertexComponent::byte_size)
            .sum()
    }
}

impl fmt::Display for VertexLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for component in &self.components {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", component.attr, component.format)?;
            first = false;
        }
        Ok(())
    }
}
