//! A backend that records commands instead of rendering.

use crate::gfx::{
    backend::{BackendHandle, GfxBackend, PassAction, PixelRect},
    resource::{GfxResourceType, PassSetup, PipelineSetup, ShaderSetup, TextureSetup},
};
use anyhow::{Result, bail};
use prism_containers::{HashMap, HashSet};
use prism_mesh::MeshSetup;
use prism_resource::{Locator, ResourceType};

/// A [`GfxBackend`] without a graphics API behind it. Every command is
/// recorded, and creation can be made to fail for chosen locations.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    commands: Vec<BackendCommand>,
    live_objects: HashMap<BackendHandle, ResourceType>,
    rejected_locations: HashSet<String>,
    next_handle: u64,
    n_committed_frames: u64,
}

/// A command received by a [`HeadlessBackend`].
#[derive(Clone, Debug, PartialEq)]
pub enum BackendCommand {
    Create {
        resource_type: ResourceType,
        location: String,
        handle: BackendHandle,
    },
    Destroy {
        resource_type: ResourceType,
        handle: BackendHandle,
    },
    UpdateVertices {
        mesh: BackendHandle,
        n_bytes: usize,
    },
    UpdateIndices {
        mesh: BackendHandle,
        n_bytes: usize,
    },
    BeginPass {
        pass: Option<BackendHandle>,
        action: PassAction,
    },
    ApplyViewport(PixelRect),
    ApplyScissorRect(PixelRect),
    ApplyDrawState {
        pipeline: BackendHandle,
        meshes: Vec<BackendHandle>,
        textures: Vec<BackendHandle>,
    },
    Draw {
        base_element: u32,
        n_elements: u32,
        n_instances: u32,
    },
    EndPass,
    CommitFrame,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes creation of every resource whose locator has the given location
    /// fail.
    pub fn reject_location(&mut self, location: impl Into<String>) {
        self.rejected_locations.insert(location.into());
    }

    /// Returns every command recorded so far.
    pub fn commands(&self) -> &[BackendCommand] {
        &self.commands
    }

    /// Returns and forgets the commands recorded so far.
    pub fn take_commands(&mut self) -> Vec<BackendCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Returns the number of created objects that have not been destroyed.
    pub fn n_live_objects(&self) -> usize {
        self.live_objects.len()
    }

    /// Returns the number of live objects for the given resource type.
    pub fn n_live_objects_of_type(&self, resource_type: ResourceType) -> usize {
        self.live_objects
            .values()
            .filter(|&&object_type| object_type == resource_type)
            .count()
    }

    pub fn n_committed_frames(&self) -> u64 {
        self.n_committed_frames
    }

    /// Returns the number of draw commands recorded so far.
    pub fn n_draws(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, BackendCommand::Draw { .. }))
            .count()
    }

    fn assert_live(&self, handle: BackendHandle) {
        assert!(
            self.live_objects.contains_key(&handle),
            "Headless backend asked to update unknown object {handle}"
        );
    }

    fn create(&mut self, resource_type: ResourceType, locator: &Locator) -> Result<BackendHandle> {
        if self.rejected_locations.contains(locator.location()) {
            bail!(
                "Headless backend rejects {} {}",
                GfxResourceType::name(resource_type),
                locator
            );
        }
        self.next_handle += 1;
        let handle = BackendHandle(self.next_handle);
        self.live_objects.insert(handle, resource_type);
        self.commands.push(BackendCommand::Create {
            resource_type,
            location: locator.location().to_owned(),
            handle,
        });
        Ok(handle)
    }
}

impl GfxBackend for HeadlessBackend {
    fn create_mesh(&mut self, setup: &MeshSetup, _data: Option<&[u8]>) -> Result<BackendHandle> {
        self.create(GfxResourceType::MESH, &setup.locator)
    }

    fn create_texture(
        &mut self,
        setup: &TextureSetup,
        _data: Option<&[u8]>,
    ) -> Result<BackendHandle> {
        self.create(GfxResourceType::TEXTURE, &setup.locator)
    }

    fn create_shader(&mut self, setup: &ShaderSetup) -> Result<BackendHandle> {
        self.create(GfxResourceType::SHADER, &setup.locator)
    }

    fn create_pipeline(
        &mut self,
        setup: &PipelineSetup,
        _shader: BackendHandle,
    ) -> Result<BackendHandle> {
        self.create(GfxResourceType::PIPELINE, &setup.locator)
    }

    fn create_pass(
        &mut self,
        setup: &PassSetup,
        _color_attachments: &[BackendHandle],
        _depth_stencil_attachment: Option<BackendHandle>,
    ) -> Result<BackendHandle> {
        self.create(GfxResourceType::PASS, &setup.locator)
    }

    fn update_vertices(&mut self, mesh: BackendHandle, data: &[u8]) {
        self.assert_live(mesh);
        self.commands.push(BackendCommand::UpdateVertices {
            mesh,
            n_bytes: data.len(),
        });
    }

    fn update_indices(&mut self, mesh: BackendHandle, data: &[u8]) {
        self.assert_live(mesh);
        self.commands.push(BackendCommand::UpdateIndices {
            mesh,
            n_bytes: data.len(),
        });
    }

    fn destroy(&mut self, resource_type: ResourceType, handle: BackendHandle) {
        let removed_type = self.live_objects.remove(&handle);
        assert_eq!(
            removed_type,
            Some(resource_type),
            "Headless backend asked to destroy unknown object {handle}"
        );
        self.commands.push(BackendCommand::Destroy {
            resource_type,
            handle,
        });
    }

    fn begin_pass(&mut self, pass: Option<BackendHandle>, action: &PassAction) {
        self.commands.push(BackendCommand::BeginPass {
            pass,
            action: *action,
        });
    }

    fn apply_viewport(&mut self, rect: PixelRect, _origin_top_left: bool) {
        self.commands.push(BackendCommand::ApplyViewport(rect));
    }

    fn apply_scissor_rect(&mut self, rect: PixelRect, _origin_top_left: bool) {
        self.commands.push(BackendCommand::ApplyScissorRect(rect));
    }

    fn apply_draw_state(
        &mut self,
        pipeline: BackendHandle,
        meshes: &[BackendHandle],
        textures: &[BackendHandle],
    ) {
        self.commands.push(BackendCommand::ApplyDrawState {
            pipeline,
            meshes: meshes.to_vec(),
            textures: textures.to_vec(),
        });
    }

    fn draw(&mut self, base_element: u32, n_elements: u32, n_instances: u32) {
        self.commands.push(BackendCommand::Draw {
            base_element,
            n_elements,
            n_instances,
        });
    }

    fn end_pass(&mut self) {
        self.commands.push(BackendCommand::EndPass);
    }

    fn commit_frame(&mut self) {
        self.n_committed_frames += 1;
        self.commands.push(BackendCommand::CommitFrame);
    }
}
