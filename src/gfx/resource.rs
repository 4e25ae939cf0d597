//! Graphics resource types and their pools.

use crate::gfx::{
    backend::{BackendHandle, GfxBackend},
    config::ResourcePoolSizes,
};
use anyhow::{Result, anyhow, bail};
use prism_mesh::{
    IndexType, MeshSetup, MeshSource, PrimitiveGroup, PrimitiveType, Usage, VertexLayout,
};
use prism_resource::{
    AsyncResourceFactory, Locator, ResourceFactory, ResourceId, ResourceInfo, ResourceLabel,
    ResourcePool, ResourcePoolInfo, ResourcePools, ResourceSetup, ResourceState, ResourceType,
};
use std::fmt;

/// The types of graphics resources.
#[derive(Debug)]
pub struct GfxResourceType;

impl GfxResourceType {
    pub const MESH: ResourceType = ResourceType::new(0);
    pub const TEXTURE: ResourceType = ResourceType::new(1);
    pub const SHADER: ResourceType = ResourceType::new(2);
    pub const PIPELINE: ResourceType = ResourceType::new(3);
    pub const PASS: ResourceType = ResourceType::new(4);

    pub const ALL: [ResourceType; 5] = [
        Self::MESH,
        Self::TEXTURE,
        Self::SHADER,
        Self::PIPELINE,
        Self::PASS,
    ];

    pub fn name(resource_type: ResourceType) -> &'static str {
        match resource_type {
            Self::MESH => "mesh",
            Self::TEXTURE => "texture",
            Self::SHADER => "shader",
            Self::PIPELINE => "pipeline",
            Self::PASS => "pass",
            _ => "unknown",
        }
    }
}

/// Pixel format of a texture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    #[default]
    Rgba8,
    Rgba16F,
    Rgba32F,
    R32F,
    Depth,
    DepthStencil,
}

/// Describes a texture to create.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureSetup {
    pub locator: Locator,
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    /// Whether the texture can be attached to a render pass.
    pub render_target: bool,
}

/// Describes a shader program to create.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderSetup {
    pub locator: Locator,
    pub vertex_source: String,
    pub fragment_source: String,
}

/// Describes a pipeline to create.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineSetup {
    pub locator: Locator,
    pub shader: ResourceId,
    pub layout: VertexLayout,
    pub primitive_type: PrimitiveType,
    pub depth_test: bool,
    pub alpha_blending: bool,
}

/// Describes a render pass to create.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassSetup {
    pub locator: Locator,
    pub color_attachments: Vec<ResourceId>,
    pub depth_stencil_attachment: Option<ResourceId>,
}

#[derive(Debug)]
pub(crate) struct Mesh {
    pub(crate) handle: BackendHandle,
    pub(crate) primitive_groups: Vec<PrimitiveGroup>,
    pub(crate) vertex_buffer: MeshBuffer,
    pub(crate) index_buffer: Option<MeshBuffer>,
}

/// Which buffer of a mesh an update targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum MeshBufferKind {
    Vertex,
    Index,
}

#[derive(Debug)]
pub(crate) struct MeshBuffer {
    usage: Usage,
    byte_size: usize,
    last_update_frame: Option<u64>,
}

#[derive(Debug)]
pub(crate) struct Texture {
    pub(crate) handle: BackendHandle,
}

#[derive(Debug)]
pub(crate) struct Shader {
    pub(crate) handle: BackendHandle,
}

#[derive(Debug)]
pub(crate) struct Pipeline {
    pub(crate) handle: BackendHandle,
}

#[derive(Debug)]
pub(crate) struct Pass {
    pub(crate) handle: BackendHandle,
}

/// The pools for every graphics resource type, together with the backend
/// that creates the objects backing the resources.
#[derive(Debug)]
pub struct GfxResourcePools<B> {
    backend: B,
    meshes: ResourcePool<Mesh>,
    textures: ResourcePool<Texture>,
    shaders: ResourcePool<Shader>,
    pipelines: ResourcePool<Pipeline>,
    passes: ResourcePool<Pass>,
}

impl Mesh {
    /// Returns the buffer of the given kind.
    ///
    /// # Panics
    /// If indices are requested from a mesh without an index buffer.
    pub(crate) fn buffer_mut(&mut self, id: ResourceId, kind: MeshBufferKind) -> &mut MeshBuffer {
        match kind {
            MeshBufferKind::Vertex => &mut self.vertex_buffer,
            MeshBufferKind::Index => self
                .index_buffer
                .as_mut()
                .unwrap_or_else(|| panic!("Mesh {id} has no index buffer to update")),
        }
    }
}

impl fmt::Display for MeshBufferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => write!(f, "vertex"),
            Self::Index => write!(f, "index"),
        }
    }
}

impl MeshBuffer {
    fn new(usage: Usage, byte_size: usize) -> Self {
        Self {
            usage,
            byte_size,
            last_update_frame: None,
        }
    }

    /// Records an update of the first `n_bytes` of the buffer in the given
    /// frame.
    ///
    /// # Panics
    /// - If the buffer is immutable.
    /// - If `n_bytes` is zero or exceeds the size of the buffer.
    /// - If the buffer was already updated in the same frame.
    pub(crate) fn record_update(
        &mut self,
        id: ResourceId,
        kind: MeshBufferKind,
        n_bytes: usize,
        frame_index: u64,
    ) {
        assert_ne!(
            self.usage,
            Usage::Immutable,
            "Tried to update immutable {kind} buffer of mesh {id}"
        );
        assert!(
            n_bytes > 0 && n_bytes <= self.byte_size,
            "Tried to update {kind} buffer of mesh {id} with {n_bytes} bytes, buffer has {}",
            self.byte_size
        );
        assert_ne!(
            self.last_update_frame,
            Some(frame_index),
            "Tried to update {kind} buffer of mesh {id} twice in frame {frame_index}"
        );
        self.last_update_frame = Some(frame_index);
    }
}

impl PixelFormat {
    /// Returns the number of bytes per pixel.
    pub fn byte_size(&self) -> usize {
        match self {
            Self::Rgba8 | Self::R32F | Self::Depth | Self::DepthStencil => 4,
            Self::Rgba16F => 8,
            Self::Rgba32F => 16,
        }
    }

    pub fn is_depth(&self) -> bool {
        matches!(self, Self::Depth | Self::DepthStencil)
    }
}

impl TextureSetup {
    /// Creates a setup for a texture whose pixel data is supplied at creation.
    pub fn from_pixel_data(locator: Locator, width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        Self {
            locator,
            width,
            height,
            pixel_format,
            render_target: false,
        }
    }

    /// Creates a setup for a texture that render passes can render into.
    pub fn render_target(locator: Locator, width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        Self {
            render_target: true,
            ..Self::from_pixel_data(locator, width, height, pixel_format)
        }
    }

    /// Returns the size in bytes of the pixel data for the texture.
    pub fn data_size(&self) -> usize {
        self.width as usize * self.height as usize * self.pixel_format.byte_size()
    }
}

impl ShaderSetup {
    pub fn new(
        locator: Locator,
        vertex_source: impl Into<String>,
        fragment_source: impl Into<String>,
    ) -> Self {
        Self {
            locator,
            vertex_source: vertex_source.into(),
            fragment_source: fragment_source.into(),
        }
    }
}

impl PipelineSetup {
    /// Creates a setup for a pipeline using the given shader for triangles
    /// with the given vertex layout, with depth testing and without blending.
    pub fn new(locator: Locator, shader: ResourceId, layout: VertexLayout) -> Self {
        Self {
            locator,
            shader,
            layout,
            primitive_type: PrimitiveType::Triangles,
            depth_test: true,
            alpha_blending: false,
        }
    }
}

impl PassSetup {
    pub fn new(
        locator: Locator,
        color_attachments: Vec<ResourceId>,
        depth_stencil_attachment: Option<ResourceId>,
    ) -> Self {
        Self {
            locator,
            color_attachments,
            depth_stencil_attachment,
        }
    }
}

impl ResourceSetup for TextureSetup {
    fn locator(&self) -> &Locator {
        &self.locator
    }
}

impl ResourceSetup for ShaderSetup {
    fn locator(&self) -> &Locator {
        &self.locator
    }
}

impl ResourceSetup for PipelineSetup {
    fn locator(&self) -> &Locator {
        &self.locator
    }
}

impl ResourceSetup for PassSetup {
    fn locator(&self) -> &Locator {
        &self.locator
    }
}

impl<B: GfxBackend> GfxResourcePools<B> {
    pub(crate) fn new(backend: B, sizes: &ResourcePoolSizes) -> Self {
        Self {
            backend,
            meshes: ResourcePool::new(GfxResourceType::MESH, sizes.mesh),
            textures: ResourcePool::new(GfxResourceType::TEXTURE, sizes.texture),
            shaders: ResourcePool::new(GfxResourceType::SHADER, sizes.shader),
            pipelines: ResourcePool::new(GfxResourceType::PIPELINE, sizes.pipeline),
            passes: ResourcePool::new(GfxResourceType::PASS, sizes.pass),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub(crate) fn mesh(&self, id: ResourceId) -> Option<&Mesh> {
        if id.resource_type() != GfxResourceType::MESH {
            return None;
        }
        self.meshes.get_resource(id)
    }

    pub(crate) fn texture(&self, id: ResourceId) -> Option<&Texture> {
        if id.resource_type() != GfxResourceType::TEXTURE {
            return None;
        }
        self.textures.get_resource(id)
    }

    pub(crate) fn pipeline(&self, id: ResourceId) -> Option<&Pipeline> {
        if id.resource_type() != GfxResourceType::PIPELINE {
            return None;
        }
        self.pipelines.get_resource(id)
    }

    pub(crate) fn pass(&self, id: ResourceId) -> Option<&Pass> {
        if id.resource_type() != GfxResourceType::PASS {
            return None;
        }
        self.passes.get_resource(id)
    }

    pub(crate) fn mesh_mut(&mut self, id: ResourceId) -> Option<&mut Mesh> {
        if id.resource_type() != GfxResourceType::MESH {
            return None;
        }
        self.meshes.get_resource_mut(id)
    }

    fn create_mesh(backend: &mut B, setup: &MeshSetup, data: Option<&[u8]>) -> Result<Mesh> {
        validate_mesh(setup, data)?;
        let handle = backend.create_mesh(setup, data)?;
        Ok(Mesh {
            handle,
            primitive_groups: setup.primitive_groups().to_vec(),
            vertex_buffer: MeshBuffer::new(setup.vertex_usage, setup.vertex_data_size()),
            index_buffer: (setup.index_type != IndexType::None)
                .then(|| MeshBuffer::new(setup.index_usage, setup.index_data_size())),
        })
    }

    fn valid_texture_handle(&self, id: ResourceId) -> Result<BackendHandle> {
        self.texture(id)
            .map(|texture| texture.handle)
            .ok_or_else(|| anyhow!("Attachment texture {id} is not valid"))
    }
}

impl<B: GfxBackend> ResourcePools for GfxResourcePools<B> {
    fn destroy_resource(&mut self, id: ResourceId) {
        let backend = &mut self.backend;
        let resource_type = id.resource_type();
        match resource_type {
            GfxResourceType::MESH => self
                .meshes
                .destroy_with(id, |mesh| backend.destroy(resource_type, mesh.handle)),
            GfxResourceType::TEXTURE => self
                .textures
                .destroy_with(id, |texture| backend.destroy(resource_type, texture.handle)),
            GfxResourceType::SHADER => self
                .shaders
                .destroy_with(id, |shader| backend.destroy(resource_type, shader.handle)),
            GfxResourceType::PIPELINE => self
                .pipelines
                .destroy_with(id, |pipeline| backend.destroy(resource_type, pipeline.handle)),
            GfxResourceType::PASS => self
                .passes
                .destroy_with(id, |pass| backend.destroy(resource_type, pass.handle)),
            _ => panic!("Tried to destroy resource {id} of unknown type"),
        }
    }

    fn query_resource_info(&self, id: ResourceId) -> ResourceInfo {
        match id.resource_type() {
            GfxResourceType::MESH => self.meshes.query_info(id),
            GfxResourceType::TEXTURE => self.textures.query_info(id),
            GfxResourceType::SHADER => self.shaders.query_info(id),
            GfxResourceType::PIPELINE => self.pipelines.query_info(id),
            GfxResourceType::PASS => self.passes.query_info(id),
            _ => ResourceInfo::invalid(),
        }
    }

    fn query_pool_info(&self, resource_type: ResourceType) -> ResourcePoolInfo {
        match resource_type {
            GfxResourceType::MESH => self.meshes.query_pool_info(),
            GfxResourceType::TEXTURE => self.textures.query_pool_info(),
            GfxResourceType::SHADER => self.shaders.query_pool_info(),
            GfxResourceType::PIPELINE => self.pipelines.query_pool_info(),
            GfxResourceType::PASS => self.passes.query_pool_info(),
            _ => ResourcePoolInfo::default(),
        }
    }

    fn query_free_slots(&self, resource_type: ResourceType) -> usize {
        match resource_type {
            GfxResourceType::MESH => self.meshes.n_free_slots(),
            GfxResourceType::TEXTURE => self.textures.n_free_slots(),
            GfxResourceType::SHADER => self.shaders.n_free_slots(),
            GfxResourceType::PIPELINE => self.pipelines.n_free_slots(),
            GfxResourceType::PASS => self.passes.n_free_slots(),
            _ => 0,
        }
    }
}

impl<B: GfxBackend> ResourceFactory<MeshSetup> for GfxResourcePools<B> {
    fn create_resource(
        &mut self,
        setup: &MeshSetup,
        data: Option<&[u8]>,
        label: ResourceLabel,
    ) -> ResourceId {
        let backend = &mut self.backend;
        self.meshes
            .create_with(label, || Self::create_mesh(backend, setup, data))
    }
}

impl<B: GfxBackend> AsyncResourceFactory<MeshSetup> for GfxResourcePools<B> {
    fn prepare_async(&mut self, _setup: &MeshSetup, label: ResourceLabel) -> ResourceId {
        self.meshes.prepare_async(label)
    }

    fn init_async(&mut self, id: ResourceId, setup: &MeshSetup, data: &[u8]) -> ResourceState {
        let backend = &mut self.backend;
        self.meshes
            .init_async_with(id, || Self::create_mesh(backend, setup, Some(data)))
    }

    fn failed_async(&mut self, id: ResourceId) -> ResourceState {
        self.meshes.failed_async(id)
    }
}

impl<B: GfxBackend> ResourceFactory<TextureSetup> for GfxResourcePools<B> {
    fn create_resource(
        &mut self,
        setup: &TextureSetup,
        data: Option<&[u8]>,
        label: ResourceLabel,
    ) -> ResourceId {
        let backend = &mut self.backend;
        self.textures.create_with(label, || {
            if setup.width == 0 || setup.height == 0 {
                bail!("Texture {} has zero extent", setup.locator);
            }
            if let Some(data) = data {
                if data.len() < setup.data_size() {
                    bail!(
                        "Texture {} needs {} bytes of pixel data, got {}",
                        setup.locator,
                        setup.data_size(),
                        data.len()
                    );
                }
            }
            let handle = backend.create_texture(setup, data)?;
            Ok(Texture { handle })
        })
    }
}

impl<B: GfxBackend> ResourceFactory<ShaderSetup> for GfxResourcePools<B> {
    fn create_resource(
        &mut self,
        setup: &ShaderSetup,
        _data: Option<&[u8]>,
        label: ResourceLabel,
    ) -> ResourceId {
        let backend = &mut self.backend;
        self.shaders.create_with(label, || {
            let handle = backend.create_shader(setup)?;
            Ok(Shader { handle })
        })
    }
}

impl<B: GfxBackend> ResourceFactory<PipelineSetup> for GfxResourcePools<B> {
    fn create_resource(
        &mut self,
        setup: &PipelineSetup,
        _data: Option<&[u8]>,
        label: ResourceLabel,
    ) -> ResourceId {
        let shader_handle = if setup.shader.resource_type() == GfxResourceType::SHADER {
            self.shaders
                .get_resource(setup.shader)
                .map(|shader| shader.handle)
        } else {
            None
        };

        let backend = &mut self.backend;
        self.pipelines.create_with(label, || {
            let shader_handle = shader_handle.ok_or_else(|| {
                anyhow!(
                    "Shader {} of pipeline {} is not valid",
                    setup.shader,
                    setup.locator
                )
            })?;
            let handle = backend.create_pipeline(setup, shader_handle)?;
            Ok(Pipeline { handle })
        })
    }
}

impl<B: GfxBackend> ResourceFactory<PassSetup> for GfxResourcePools<B> {
    fn create_resource(
        &mut self,
        setup: &PassSetup,
        _data: Option<&[u8]>,
        label: ResourceLabel,
    ) -> ResourceId {
        let attachments = self.pass_attachment_handles(setup);

        let backend = &mut self.backend;
        self.passes.create_with(label, || {
            let (color_handles, depth_stencil_handle) = attachments?;
            let handle = backend.create_pass(setup, &color_handles, depth_stencil_handle)?;
            Ok(Pass { handle })
        })
    }
}

impl<B: GfxBackend> GfxResourcePools<B> {
    fn pass_attachment_handles(
        &self,
        setup: &PassSetup,
    ) -> Result<(Vec<BackendHandle>, Option<BackendHandle>)> {
        if setup.color_attachments.is_empty() {
            bail!("Pass {} has no color attachments", setup.locator);
        }
        let color_handles = setup
            .color_attachments
            .iter()
            .map(|&id| self.valid_texture_handle(id))
            .collect::<Result<Vec<_>>>()?;
        let depth_stencil_handle = setup
            .depth_stencil_attachment
            .map(|id| self.valid_texture_handle(id))
            .transpose()?;
        Ok((color_handles, depth_stencil_handle))
    }
}

/// Checks that a mesh setup is consistent and that the given data covers the
/// vertex and index ranges it describes.
fn validate_mesh(setup: &MeshSetup, data: Option<&[u8]>) -> Result<()> {
    if setup.n_vertices == 0 {
        bail!("Mesh {} has no vertices", setup.locator);
    }
    if setup.layout.is_empty() {
        bail!("Mesh {} has no vertex layout", setup.locator);
    }
    if setup.n_indices > 0 && setup.index_type == IndexType::None {
        bail!("Mesh {} has indices but no index type", setup.locator);
    }

    let n_elements = if setup.index_type == IndexType::None {
        setup.n_vertices
    } else {
        setup.n_indices
    };
    for group in setup.primitive_groups() {
        if u64::from(group.base_element) + u64::from(group.n_elements) > u64::from(n_elements) {
            bail!(
                "Primitive group ({}, {}) exceeds the {n_elements} elements of mesh {}",
                group.base_element,
                group.n_elements,
                setup.locator
            );
        }
    }

    match (setup.source, data) {
        (MeshSource::File, _) => {
            bail!("Mesh {} must be loaded, not created", setup.locator);
        }
        (MeshSource::Data, None) => {
            bail!("Mesh {} was created without data", setup.locator);
        }
        (MeshSource::Data, Some(data)) => {
            let Some(vertex_end) = setup
                .data_vertex_offset
                .checked_add(setup.vertex_data_size())
            else {
                bail!("Vertex data offset of mesh {} is out of range", setup.locator);
            };
            if vertex_end > data.len() {
                bail!(
                    "Vertex data of mesh {} ends at byte {vertex_end}, beyond the {} supplied bytes",
                    setup.locator,
                    data.len()
                );
            }
            if setup.index_type == IndexType::None {
                return Ok(());
            }
            let Some(index_end) = setup
                .data_index_offset
                .checked_add(setup.index_data_size())
            else {
                bail!("Index data offset of mesh {} is out of range", setup.locator);
            };
            if index_end > data.len() {
                bail!(
                    "Index data of mesh {} ends at byte {index_end}, beyond the {} supplied bytes",
                    setup.locator,
                    data.len()
                );
            }
        }
        (MeshSource::Empty, _) => {}
    }

    Ok(())
}
