//! Mesh setups.

use crate::VertexLayout;
use anyhow::{Result, anyhow};
use prism_resource::{Locator, ResourceSetup};
use std::fmt;

/// The maximum number of primitive groups in a mesh.
pub const MAX_PRIMITIVE_GROUPS: usize = 16;

/// Type of the elements in a mesh's index buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum IndexType {
    /// The mesh has no index buffer.
    #[default]
    None,
    Index16,
    Index32,
}

/// How the vertices or indices of a mesh are assembled into primitives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Points,
    Lines,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
}

/// How often the contents of a mesh buffer are expected to be updated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Usage {
    #[default]
    Immutable,
    Dynamic,
    Stream,
}

/// Where the data for a mesh comes from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MeshSource {
    /// Loaded asynchronously from the location of the setup's locator.
    File,
    /// Supplied along with the setup when the mesh is created.
    #[default]
    Data,
    /// No initial data; buffers are allocated and filled in later.
    Empty,
}

/// A range of elements drawn with a single draw call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PrimitiveGroup {
    pub base_element: u32,
    pub n_elements: u32,
}

/// Describes a mesh to create.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeshSetup {
    pub locator: Locator,
    pub source: MeshSource,
    /// IO lane to load file data on.
    pub io_lane: usize,
    pub vertex_usage: Usage,
    pub index_usage: Usage,
    pub n_vertices: u32,
    pub n_indices: u32,
    pub index_type: IndexType,
    pub layout: VertexLayout,
    pub primitive_type: PrimitiveType,
    /// Offset in bytes of the vertex data in the supplied data.
    pub data_vertex_offset: usize,
    /// Offset in bytes of the index data in the supplied data.
    pub data_index_offset: usize,
    primitive_groups: Vec<PrimitiveGroup>,
}

impl IndexType {
    /// Returns the size of one index in bytes, or zero for
    /// [`IndexType::None`].
    pub fn byte_size(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Index16 => 2,
            Self::Index32 => 4,
        }
    }
}

impl PrimitiveType {
    /// Returns the primitive type with the given mesh file code.
    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            0 => Ok(Self::Points),
            1 => Ok(Self::Lines),
            3 => Ok(Self::LineStrip),
            4 => Ok(Self::Triangles),
            5 => Ok(Self::TriangleStrip),
            _ => Err(anyhow!("Invalid primitive type code {code}")),
        }
    }

    /// Returns the mesh file code for the primitive type.
    pub fn code(&self) -> u32 {
        match self {
            Self::Points => 0,
            Self::Lines => 1,
            Self::LineStrip => 3,
            Self::Triangles => 4,
            Self::TriangleStrip => 5,
        }
    }
}

impl PrimitiveGroup {
    pub fn new(base_element: u32, n_elements: u32) -> Self {
        Self {
            base_element,
            n_elements,
        }
    }
}

impl MeshSetup {
    /// Creates a setup for loading the mesh at the locator's location on the
    /// given IO lane. The file determines the layout, counts and primitive
    /// groups.
    pub fn from_file(locator: Locator, io_lane: usize) -> Self {
        Self {
            locator,
            source: MeshSource::File,
            io_lane,
            ..Self::blank()
        }
    }

    /// Creates a setup for loading the mesh at the given locator, taking
    /// everything else from the given blueprint.
    pub fn from_file_with_blueprint(locator: Locator, blueprint: &Self) -> Self {
        Self {
            locator,
            source: MeshSource::File,
            ..blueprint.clone()
        }
    }

    /// Creates a setup for a mesh whose data is supplied at creation. The
    /// caller fills in the layout, counts, offsets and primitive groups.
    pub fn from_data() -> Self {
        Self::blank()
    }

    /// Creates a setup for a mesh whose data will be supplied at creation,
    /// taking everything but the source from the given blueprint.
    pub fn from_data_with_blueprint(blueprint: &Self) -> Self {
        Self {
            source: MeshSource::Data,
            ..blueprint.clone()
        }
    }

    /// Creates a setup for a mesh with buffers of the given sizes and no
    /// initial data.
    ///
    /// # Panics
    /// If `n_vertices` is zero.
    pub fn empty(
        n_vertices: u32,
        vertex_usage: Usage,
        index_type: IndexType,
        n_indices: u32,
        index_usage: Usage,
    ) -> Self {
        assert!(n_vertices > 0, "Empty mesh needs at least one vertex");
        Self {
            source: MeshSource::Empty,
            vertex_usage,
            index_usage,
            n_vertices,
            n_indices,
            index_type,
            ..Self::blank()
        }
    }

    fn blank() -> Self {
        Self {
            locator: Locator::non_shared(),
            source: MeshSource::Data,
            io_lane: 0,
            vertex_usage: Usage::default(),
            index_usage: Usage::default(),
            n_vertices: 0,
            n_indices: 0,
            index_type: IndexType::None,
            layout: VertexLayout::new(),
            primitive_type: PrimitiveType::default(),
            data_vertex_offset: 0,
            data_index_offset: 0,
            primitive_groups: Vec::new(),
        }
    }

    /// Appends a primitive group.
    ///
    /// # Panics
    /// If the setup already has [`MAX_PRIMITIVE_GROUPS`] groups.
    pub fn add_primitive_group(&mut self, group: PrimitiveGroup) {
        assert!(
            self.primitive_groups.len() < MAX_PRIMITIVE_GROUPS,
            "Mesh setup cannot have more than {MAX_PRIMITIVE_GROUPS} primitive groups"
        );
        self.primitive_groups.push(group);
    }

    pub fn clear_primitive_groups(&mut self) {
        self.primitive_groups.clear();
    }

    pub fn primitive_groups(&self) -> &[PrimitiveGroup] {
        &self.primitive_groups
    }

    pub fn n_primitive_groups(&self) -> usize {
        self.primitive_groups.len()
    }

    /// Returns the size in bytes of the vertex data described by the setup.
    pub fn vertex_data_size(&self) -> usize {
        self.n_vertices as usize * self.layout.byte_size()
    }

    /// Returns the size in bytes of the index data described by the setup.
    pub fn index_data_size(&self) -> usize {
        self.n_indices as usize * self.index_type.byte_size()
    }
}

impl ResourceSetup for MeshSetup {
    fn locator(&self) -> &Locator {
        &self.locator
    }
}

impl fmt::Display for MeshSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "locator: {}", self.locator)?;
        writeln!(f, "vertices: {} ({})", self.n_vertices, self.layout)?;
        writeln!(f, "indices: {} ({:?})", self.n_indices, self.index_type)?;
        writeln!(f, "primitive type: {:?}", self.primitive_type)?;
        writeln!(
            f,
            "data offsets: vertices {}, indices {}",
            self.data_vertex_offset, self.data_index_offset
        )?;
        for (group_idx, group) in self.primitive_groups.iter().enumerate() {
            writeln!(
                f,
                "primitive group {group_idx}: base {}, count {}",
                group.base_element, group.n_elements
            )?;
        }
        Ok(())
    }
}
