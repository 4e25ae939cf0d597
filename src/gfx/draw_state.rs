//! Bundles of resources applied together before drawing.

use prism_resource::ResourceId;

/// The pipeline, meshes and textures used by subsequent draws.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrawState {
    pub pipeline: ResourceId,
    /// The meshes supplying vertex data. The first mesh's primitive groups
    /// are what draw calls refer to.
    pub meshes: Vec<ResourceId>,
    pub textures: Vec<ResourceId>,
}

impl DrawState {
    /// The maximum number of meshes in a draw state.
    pub const MAX_MESHES: usize = 4;

    /// Creates a draw state drawing the given mesh with the given pipeline.
    pub fn new(pipeline: ResourceId, mesh: ResourceId) -> Self {
        Self {
            pipeline,
            meshes: vec![mesh],
            textures: Vec::new(),
        }
    }

    /// Adds a mesh supplying additional vertex data, such as per-instance
    /// data.
    ///
    /// # Panics
    /// If the draw state already has [`Self::MAX_MESHES`] meshes.
    pub fn with_mesh(mut self, mesh: ResourceId) -> Self {
        assert!(
            self.meshes.len() < Self::MAX_MESHES,
            "Draw state cannot have more than {} meshes",
            Self::MAX_MESHES
        );
        self.meshes.push(mesh);
        self
    }

    /// Adds a texture bound for subsequent draws.
    pub fn with_texture(mut self, texture: ResourceId) -> Self {
        self.textures.push(texture);
        self
    }
}
