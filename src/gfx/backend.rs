//! Interface to the graphics API doing the actual work.

use crate::gfx::resource::{PassSetup, PipelineSetup, ShaderSetup, TextureSetup};
use anyhow::Result;
use prism_mesh::MeshSetup;
use prism_resource::ResourceType;
use std::fmt;

/// Opaque handle to an object created by a [`GfxBackend`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackendHandle(pub u64);

/// A rectangle in framebuffer pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// What to do with the attachments of a pass when it begins.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PassAction {
    /// Color to clear the color attachments to, or [`None`] to keep their
    /// contents.
    pub clear_color: Option<[f32; 4]>,
    /// Depth to clear the depth attachment to, or [`None`] to keep it.
    pub clear_depth: Option<f32>,
    /// Stencil value to clear the stencil attachment to, or [`None`] to keep
    /// it.
    pub clear_stencil: Option<u8>,
}

/// A graphics API. Creates and destroys the objects backing resources and
/// executes the commands of the render loop.
///
/// Creation methods return an error when the API rejects the object; the
/// error ends up as a failed resource, never as a failed frame.
pub trait GfxBackend: fmt::Debug {
    /// Creates vertex and index buffers for the mesh described by the setup,
    /// filled from `data` at the setup's data offsets if given.
    fn create_mesh(&mut self, setup: &MeshSetup, data: Option<&[u8]>) -> Result<BackendHandle>;

    /// Creates the texture described by the setup, filled with `data` if
    /// given.
    fn create_texture(&mut self, setup: &TextureSetup, data: Option<&[u8]>)
    -> Result<BackendHandle>;

    /// Compiles and links the shader program described by the setup.
    fn create_shader(&mut self, setup: &ShaderSetup) -> Result<BackendHandle>;

    /// Creates the pipeline described by the setup, using the given shader
    /// program.
    fn create_pipeline(
        &mut self,
        setup: &PipelineSetup,
        shader: BackendHandle,
    ) -> Result<BackendHandle>;

    /// Creates the render pass described by the setup, rendering into the
    /// given attachment textures.
    fn create_pass(
        &mut self,
        setup: &PassSetup,
        color_attachments: &[BackendHandle],
        depth_stencil_attachment: Option<BackendHandle>,
    ) -> Result<BackendHandle>;

    /// Overwrites the start of the vertex buffer of the given mesh with
    /// `data`.
    fn update_vertices(&mut self, mesh: BackendHandle, data: &[u8]);

    /// Overwrites the start of the index buffer of the given mesh with
    /// `data`.
    fn update_indices(&mut self, mesh: BackendHandle, data: &[u8]);

    /// Destroys the object for a resource of the given type.
    fn destroy(&mut self, resource_type: ResourceType, handle: BackendHandle);

    /// Begins rendering into the given pass, or into the default framebuffer
    /// if `pass` is [`None`].
    fn begin_pass(&mut self, pass: Option<BackendHandle>, action: &PassAction);

    fn apply_viewport(&mut self, rect: PixelRect, origin_top_left: bool);

    fn apply_scissor_rect(&mut self, rect: PixelRect, origin_top_left: bool);

    /// Binds the given pipeline, meshes and textures for subsequent draws.
    fn apply_draw_state(
        &mut self,
        pipeline: BackendHandle,
        meshes: &[BackendHandle],
        textures: &[BackendHandle],
    );

    /// Draws the given range of elements of the bound meshes, instanced the
    /// given number of times.
    fn draw(&mut self, base_element: u32, n_elements: u32, n_instances: u32);

    fn end_pass(&mut self);

    /// Presents the frame.
    fn commit_frame(&mut self);
}

impl fmt::Display for BackendHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl PixelRect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl PassAction {
    /// Clears color to the given value, depth to 1 and stencil to 0.
    pub fn clear(color: [f32; 4]) -> Self {
        Self {
            clear_color: Some(color),
            clear_depth: Some(1.0),
            clear_stencil: Some(0),
        }
    }

    /// Keeps the current contents of all attachments.
    pub fn load() -> Self {
        Self {
            clear_color: None,
            clear_depth: None,
            clear_stencil: None,
        }
    }
}

impl Default for PassAction {
    fn default() -> Self {
        Self::clear([0.5, 0.5, 0.5, 1.0])
    }
}
