//! Graphics context: resource management and the render loop.

pub mod backend;
pub mod config;
pub mod draw_state;
pub mod frame;
pub mod headless;
pub mod resource;

pub use backend::{BackendHandle, GfxBackend, PassAction, PixelRect};
pub use config::{GfxConfig, ResourcePoolSizes};
pub use draw_state::DrawState;
pub use frame::GfxFrameInfo;
pub use headless::{BackendCommand, HeadlessBackend};
pub use resource::{
    GfxResourcePools, GfxResourceType, PassSetup, PipelineSetup, PixelFormat, ShaderSetup,
    TextureSetup,
};

use resource::MeshBufferKind;

use anyhow::Result;
use prism_io::IoQueue;
use prism_mesh::{MeshLoader, MeshSetup, PrimitiveGroup};
use prism_resource::{
    Locator, ResourceContainer, ResourceFactory, ResourceId, ResourceInfo, ResourceLabel,
    ResourcePoolInfo, ResourceSetup, ResourceType,
};
use std::{thread, time::Instant};

/// The graphics context.
///
/// Owns the resources of every graphics resource type together with the
/// backend they live in, and drives the per-frame render loop:
///
/// ```text
/// begin_pass -> (apply_draw_state -> draw*)* -> end_pass   (repeated)
/// commit_frame
/// ```
///
/// Commands referring to resources that are not valid, such as meshes that
/// are still loading, are skipped rather than reported.
#[derive(Debug)]
pub struct Gfx<B: GfxBackend> {
    config: GfxConfig,
    container: ResourceContainer<GfxResourcePools<B>>,
    io: IoQueue,
    pass_state: PassState,
    applied_draw_state: Option<AppliedDrawState>,
    current_frame: GfxFrameInfo,
    last_frame: GfxFrameInfo,
    last_commit_time: Instant,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PassState {
    Closed,
    Open { skipped: bool },
}

#[derive(Debug)]
struct AppliedDrawState {
    primitive_groups: Vec<PrimitiveGroup>,
}

impl<B: GfxBackend> Gfx<B> {
    /// Creates a graphics context rendering with the given backend and
    /// loading resource data through the given IO queue.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: GfxConfig, backend: B, io: IoQueue) -> Result<Self> {
        config.validate()?;

        let pools = GfxResourcePools::new(backend, &config.resource_pool_sizes);
        let container = ResourceContainer::new(
            pools,
            config.resource_label_stack_capacity,
            config.resource_registry_capacity,
        );

        prism_log::info!(
            "Created graphics context with {} IO lanes",
            io.n_lanes()
        );

        Ok(Self {
            config,
            container,
            io,
            pass_state: PassState::Closed,
            applied_draw_state: None,
            current_frame: GfxFrameInfo::for_frame(0),
            last_frame: GfxFrameInfo::default(),
            last_commit_time: Instant::now(),
        })
    }

    pub fn config(&self) -> &GfxConfig {
        &self.config
    }

    /// Returns the IO queue resource data is loaded through.
    pub fn io(&self) -> &IoQueue {
        &self.io
    }

    pub fn backend(&self) -> &B {
        self.container.pools().backend()
    }

    pub fn backend_mut(&mut self) -> &mut B {
        self.container.pools_mut().backend_mut()
    }

    /// Generates a new resource label and makes it the active one. Every
    /// resource created or loaded until the label is popped gets this label.
    pub fn push_resource_label(&mut self) -> ResourceLabel {
        self.container.push_new_label()
    }

    /// Makes the given, previously generated label the active one.
    pub fn push_resource_label_explicit(&mut self, label: ResourceLabel) {
        self.container.push_label(label);
    }

    /// Restores the previously active label and returns the popped one.
    ///
    /// # Panics
    /// If no label has been pushed.
    pub fn pop_resource_label(&mut self) -> ResourceLabel {
        self.container.pop_label()
    }

    /// Creates a resource from the given setup, or returns the existing
    /// resource registered under the setup's shared locator.
    ///
    /// # Panics
    /// If the pool for the resource type is full.
    pub fn create_resource<S>(&mut self, setup: &S) -> ResourceId
    where
        S: ResourceSetup,
        GfxResourcePools<B>: ResourceFactory<S>,
    {
        self.container.create(setup)
    }

    /// Like [`Self::create_resource`], but fills the resource with the given
    /// data.
    pub fn create_resource_with_data<S>(&mut self, setup: &S, data: &[u8]) -> ResourceId
    where
        S: ResourceSetup,
        GfxResourcePools<B>: ResourceFactory<S>,
    {
        self.container.create_with_data(setup, data)
    }

    /// Starts loading the mesh file named by the setup's locator. The
    /// returned mesh is pending until the data has been read and parsed,
    /// which is checked for in [`Self::commit_frame`].
    ///
    /// # Panics
    /// If the setup is not for loading from a file.
    pub fn load_resource(&mut self, setup: MeshSetup) -> ResourceId {
        let loader = MeshLoader::new(setup, self.io.clone());
        self.container.load(loader)
    }

    /// Returns the resource registered under the given shared locator, or
    /// the invalid ID.
    pub fn lookup_resource(&self, locator: &Locator) -> ResourceId {
        self.container.lookup(locator)
    }

    /// Destroys every resource with the given label at the end of the
    /// current frame. The resources can no longer be looked up, but remain
    /// usable by commands already issued this frame.
    pub fn destroy_resources(&mut self, label: ResourceLabel) {
        self.container.destroy_deferred(label);
    }

    /// Destroys every resource with the given label right away.
    pub fn destroy_resources_immediately(&mut self, label: ResourceLabel) {
        self.container.destroy(label);
    }

    pub fn query_resource_info(&self, id: ResourceId) -> ResourceInfo {
        self.container.query_resource_info(id)
    }

    pub fn query_resource_pool_info(&self, resource_type: ResourceType) -> ResourcePoolInfo {
        self.container.query_pool_info(resource_type)
    }

    pub fn query_free_resource_slots(&self, resource_type: ResourceType) -> usize {
        self.container.query_free_slots(resource_type)
    }

    /// Returns the number of resources still being loaded.
    pub fn n_pending_loads(&self) -> usize {
        self.container.n_pending_loaders()
    }

    /// Overwrites the start of the vertex buffer of the given mesh with
    /// `data`. Nothing happens if the mesh is not valid.
    ///
    /// # Panics
    /// - If the vertex buffer of the mesh is immutable.
    /// - If `data` is empty or larger than the vertex buffer.
    /// - If the vertex buffer was already updated this frame.
    pub fn update_vertices(&mut self, mesh: ResourceId, data: &[u8]) {
        self.update_mesh_buffer(mesh, MeshBufferKind::Vertex, data);
    }

    /// Overwrites the start of the index buffer of the given mesh with
    /// `data`. Nothing happens if the mesh is not valid.
    ///
    /// # Panics
    /// - If the mesh has no index buffer, or it is immutable.
    /// - If `data` is empty or larger than the index buffer.
    /// - If the index buffer was already updated this frame.
    pub fn update_indices(&mut self, mesh: ResourceId, data: &[u8]) {
        self.update_mesh_buffer(mesh, MeshBufferKind::Index, data);
    }

    /// Begins a pass rendering into the default framebuffer.
    ///
    /// # Panics
    /// If a pass is already open.
    pub fn begin_pass(&mut self, action: &PassAction) {
        self.assert_no_open_pass("begin a pass");
        self.container.pools_mut().backend_mut().begin_pass(None, action);
        self.open_pass(false);
    }

    /// Begins a pass rendering into the attachments of the given pass
    /// resource. If the pass resource is not valid, everything up to the
    /// matching [`Self::end_pass`] is skipped.
    ///
    /// # Panics
    /// If a pass is already open.
    pub fn begin_offscreen_pass(&mut self, pass: ResourceId, action: &PassAction) {
        self.assert_no_open_pass("begin a pass");

        let pools = self.container.pools_mut();
        let handle = pools.pass(pass).map(|pass| pass.handle);
        match handle {
            Some(handle) => {
                pools.backend_mut().begin_pass(Some(handle), action);
                self.open_pass(false);
            }
            None => {
                prism_log::debug!("Skipping pass {pass}, which is not valid");
                self.open_pass(true);
            }
        }
    }

    /// # Panics
    /// If no pass is open.
    pub fn apply_viewport(&mut self, rect: PixelRect, origin_top_left: bool) {
        if self.pass_is_active("apply a viewport") {
            self.backend_mut().apply_viewport(rect, origin_top_left);
        }
    }

    /// # Panics
    /// If no pass is open.
    pub fn apply_scissor_rect(&mut self, rect: PixelRect, origin_top_left: bool) {
        if self.pass_is_active("apply a scissor rectangle") {
            self.backend_mut().apply_scissor_rect(rect, origin_top_left);
        }
    }

    /// Binds the resources of the given draw state for subsequent draws.
    ///
    /// If any of the resources is not valid, nothing is bound and subsequent
    /// draws are skipped until a draw state with only valid resources is
    /// applied.
    ///
    /// # Panics
    /// If no pass is open.
    pub fn apply_draw_state(&mut self, draw_state: &DrawState) {
        self.applied_draw_state = None;

        if !self.pass_is_active("apply a draw state") {
            self.current_frame.n_skipped_draw_states += 1;
            return;
        }

        let pools = self.container.pools_mut();

        let pipeline = pools.pipeline(draw_state.pipeline).map(|pipeline| pipeline.handle);
        let meshes: Option<Vec<_>> = draw_state
            .meshes
            .iter()
            .map(|&id| pools.mesh(id))
            .collect();
        let textures: Option<Vec<_>> = draw_state
            .textures
            .iter()
            .map(|&id| pools.texture(id).map(|texture| texture.handle))
            .collect();

        let (Some(pipeline), Some(meshes), Some(textures)) = (pipeline, meshes, textures) else {
            prism_log::trace!("Skipping draw state with resources that are not valid");
            self.current_frame.n_skipped_draw_states += 1;
            return;
        };

        let primitive_groups = meshes
            .first()
            .map(|mesh| mesh.primitive_groups.clone())
            .unwrap_or_default();
        let mesh_handles: Vec<_> = meshes.iter().map(|mesh| mesh.handle).collect();

        pools
            .backend_mut()
            .apply_draw_state(pipeline, &mesh_handles, &textures);

        self.applied_draw_state = Some(AppliedDrawState { primitive_groups });
        self.current_frame.n_applied_draw_states += 1;
    }

    /// Draws the primitive group with the given index in the first mesh of
    /// the applied draw state.
    ///
    /// # Panics
    /// If no pass is open.
    pub fn draw(&mut self, primitive_group_idx: usize) {
        self.draw_instanced(primitive_group_idx, 1);
    }

    /// Like [`Self::draw`], but draws the given number of instances.
    ///
    /// # Panics
    /// If no pass is open.
    pub fn draw_instanced(&mut self, primitive_group_idx: usize, n_instances: u32) {
        self.assert_open_pass("draw");

        let Some(applied) = &self.applied_draw_state else {
            self.current_frame.n_skipped_draws += 1;
            return;
        };
        let Some(&group) = applied.primitive_groups.get(primitive_group_idx) else {
            prism_log::warn!(
                "Skipping draw of primitive group {primitive_group_idx}, mesh has only {}",
                applied.primitive_groups.len()
            );
            self.current_frame.n_skipped_draws += 1;
            return;
        };

        self.submit_draw(group, n_instances);
    }

    /// Draws the given range of elements of the meshes in the applied draw
    /// state, whether or not the range is one of their primitive groups.
    ///
    /// # Panics
    /// If no pass is open.
    pub fn draw_group(&mut self, group: PrimitiveGroup) {
        self.assert_open_pass("draw");

        if self.applied_draw_state.is_none() {
            self.current_frame.n_skipped_draws += 1;
            return;
        }

        self.submit_draw(group, 1);
    }

    /// Ends the open pass.
    ///
    /// # Panics
    /// If no pass is open.
    pub fn end_pass(&mut self) {
        if self.pass_is_active("end a pass") {
            self.backend_mut().end_pass();
        }
        self.pass_state = PassState::Closed;
        self.applied_draw_state = None;
    }

    /// Ends the frame: presents it, destroys resources whose destruction was
    /// deferred, and advances resources that are loading.
    ///
    /// # Panics
    /// If a pass is open.
    pub fn commit_frame(&mut self) {
        self.assert_no_open_pass("commit the frame");

        self.backend_mut().commit_frame();
        self.container.garbage_collect();
        prism_log::with_trace_logging!("Updating resource loaders"; self.container.update());

        let now = Instant::now();
        self.current_frame.duration = now - self.last_commit_time;
        self.last_commit_time = now;

        prism_log::trace!("Committed {}", self.current_frame);

        let next_frame = GfxFrameInfo::for_frame(self.current_frame.frame_index + 1);
        self.last_frame = std::mem::replace(&mut self.current_frame, next_frame);
    }

    /// Returns the statistics of the last committed frame.
    pub fn frame_info(&self) -> &GfxFrameInfo {
        &self.last_frame
    }

    /// Returns the index of the frame being recorded. The first frame has
    /// index 0.
    pub fn frame_index(&self) -> u64 {
        self.current_frame.frame_index
    }

    /// Cancels all loading, destroys all resources and shuts the context
    /// down.
    ///
    /// # Panics
    /// If a pass is open or resource labels are still pushed.
    pub fn discard(mut self) {
        self.discard_resources();
    }

    fn discard_resources(&mut self) {
        self.assert_no_open_pass("discard the graphics context");
        let n_resources = self.container.registry().len();
        prism_log::with_timing_info_logging!(
            "Discarding {} graphics resources", n_resources;
            self.container.discard()
        );
    }

    fn submit_draw(&mut self, group: PrimitiveGroup, n_instances: u32) {
        self.container
            .pools_mut()
            .backend_mut()
            .draw(group.base_element, group.n_elements, n_instances);

        self.current_frame.n_draws += 1;
        self.current_frame.n_instances += u64::from(n_instances);
    }

    fn update_mesh_buffer(&mut self, id: ResourceId, kind: MeshBufferKind, data: &[u8]) {
        let frame_index = self.current_frame.frame_index;
        let pools = self.container.pools_mut();

        let Some(mesh) = pools.mesh_mut(id) else {
            prism_log::debug!("Skipping {kind} update of mesh {id}, which is not valid");
            return;
        };
        mesh.buffer_mut(id, kind)
            .record_update(id, kind, data.len(), frame_index);
        let handle = mesh.handle;

        let backend = pools.backend_mut();
        match kind {
            MeshBufferKind::Vertex => backend.update_vertices(handle, data),
            MeshBufferKind::Index => backend.update_indices(handle, data),
        }
        self.current_frame.n_buffer_updates += 1;
    }

    fn open_pass(&mut self, skipped: bool) {
        self.pass_state = PassState::Open { skipped };
        self.applied_draw_state = None;
        if skipped {
            self.current_frame.n_skipped_passes += 1;
        } else {
            self.current_frame.n_passes += 1;
        }
    }

    /// Whether commands should reach the backend, which is the case in an
    /// open pass that is not skipped.
    fn pass_is_active(&self, action: &str) -> bool {
        self.assert_open_pass(action);
        self.pass_state == PassState::Open { skipped: false }
    }

    fn assert_open_pass(&self, action: &str) {
        assert!(
            matches!(self.pass_state, PassState::Open { .. }),
            "Tried to {action} without an open pass"
        );
    }

    fn assert_no_open_pass(&self, action: &str) {
        assert_eq!(
            self.pass_state,
            PassState::Closed,
            "Tried to {action} while a pass is open"
        );
    }
}

impl<B: GfxBackend> Drop for Gfx<B> {
    fn drop(&mut self) {
        if self.container.is_valid() && !thread::panicking() {
            self.pass_state = PassState::Closed;
            self.discard_resources();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_io::{IoConfig, MemoryFileSystem};
    use prism_mesh::{IndexType, Usage, VertexAttr, VertexFormat, VertexLayout};
    use std::sync::Arc;

    fn create_gfx() -> Gfx<HeadlessBackend> {
        let io = IoQueue::manual(&IoConfig::default(), Arc::new(MemoryFileSystem::new()));
        Gfx::new(GfxConfig::default(), HeadlessBackend::new(), io).unwrap()
    }

    fn position_layout() -> VertexLayout {
        let mut layout = VertexLayout::default();
        layout.add(VertexAttr::Position, VertexFormat::Float3);
        layout
    }

    fn quad_setup(location: &str) -> MeshSetup {
        let mut setup = MeshSetup::from_data();
        setup.locator = Locator::new(location);
        setup.n_vertices = 4;
        setup.n_indices = 6;
        setup.index_type = IndexType::Index16;
        setup.layout = position_layout();
        setup.data_index_offset = 48;
        setup.add_primitive_group(PrimitiveGroup::new(0, 6));
        setup.add_primitive_group(PrimitiveGroup::new(3, 3));
        setup
    }

    fn create_draw_state(gfx: &mut Gfx<HeadlessBackend>) -> DrawState {
        let shader = gfx.create_resource(&ShaderSetup::new(Locator::new("shader"), "vs", "fs"));
        let pipeline = gfx.create_resource(&PipelineSetup::new(
            Locator::new("pipeline"),
            shader,
            position_layout(),
        ));
        let mesh = gfx.create_resource_with_data(&quad_setup("quad"), &[0; 60]);
        DrawState::new(pipeline, mesh)
    }

    fn dynamic_quad_setup(location: &str) -> MeshSetup {
        let mut setup = MeshSetup::empty(4, Usage::Dynamic, IndexType::Index16, 6, Usage::Stream);
        setup.locator = Locator::new(location);
        setup.layout = position_layout();
        setup.add_primitive_group(PrimitiveGroup::new(0, 6));
        setup
    }

    fn buffer_updates(gfx: &Gfx<HeadlessBackend>) -> Vec<BackendCommand> {
        gfx.backend()
            .commands()
            .iter()
            .filter(|command| {
                matches!(
                    command,
                    BackendCommand::UpdateVertices { .. } | BackendCommand::UpdateIndices { .. }
                )
            })
            .cloned()
            .collect()
    }

    #[test]
    fn creating_gfx_with_invalid_config_fails() {
        let mut config = GfxConfig::default();
        config.resource_pool_sizes.mesh = 0;
        let io = IoQueue::manual(&config.io, Arc::new(MemoryFileSystem::new()));
        assert!(Gfx::new(config, HeadlessBackend::new(), io).is_err());
    }

    #[test]
    fn draws_with_valid_draw_state_reach_backend() {
        let mut gfx = create_gfx();
        let draw_state = create_draw_state(&mut gfx);

        gfx.begin_pass(&PassAction::default());
        gfx.apply_draw_state(&draw_state);
        gfx.draw(0);
        gfx.draw_instanced(1, 5);
        gfx.end_pass();
        gfx.commit_frame();

        let draws: Vec<_> = gfx
            .backend()
            .commands()
            .iter()
            .filter(|command| matches!(command, BackendCommand::Draw { .. }))
            .cloned()
            .collect();
        assert_eq!(
            draws,
            vec![
                BackendCommand::Draw {
                    base_element: 0,
                    n_elements: 6,
                    n_instances: 1
                },
                BackendCommand::Draw {
                    base_element: 3,
                    n_elements: 3,
                    n_instances: 5
                },
            ]
        );

        let info = gfx.frame_info();
        assert_eq!(info.frame_index, 0);
        assert_eq!(info.n_passes, 1);
        assert_eq!(info.n_applied_draw_states, 1);
        assert_eq!(info.n_draws, 2);
        assert_eq!(info.n_instances, 6);
        assert_eq!(gfx.frame_index(), 1);
    }

    #[test]
    fn draw_state_with_failed_pipeline_skips_draws() {
        let mut gfx = create_gfx();
        let mut draw_state = create_draw_state(&mut gfx);
        draw_state.pipeline = gfx.create_resource(&PipelineSetup::new(
            Locator::new("pipeline_without_shader"),
            ResourceId::invalid(),
            position_layout(),
        ));

        gfx.begin_pass(&PassAction::default());
        gfx.apply_draw_state(&draw_state);
        gfx.draw(0);
        gfx.end_pass();
        gfx.commit_frame();

        assert_eq!(gfx.backend().n_draws(), 0);
        assert_eq!(gfx.frame_info().n_skipped_draw_states, 1);
        assert_eq!(gfx.frame_info().n_skipped_draws, 1);
    }

    #[test]
    fn valid_draw_state_after_invalid_one_enables_draws_again() {
        let mut gfx = create_gfx();
        let draw_state = create_draw_state(&mut gfx);
        let broken = DrawState::new(draw_state.pipeline, ResourceId::invalid());

        gfx.begin_pass(&PassAction::default());
        gfx.apply_draw_state(&broken);
        gfx.draw(0);
        gfx.apply_draw_state(&draw_state);
        gfx.draw(0);
        gfx.end_pass();

        assert_eq!(gfx.backend().n_draws(), 1);
        gfx.commit_frame();
    }

    #[test]
    fn draw_of_missing_primitive_group_is_skipped() {
        let mut gfx = create_gfx();
        let draw_state = create_draw_state(&mut gfx);

        gfx.begin_pass(&PassAction::default());
        gfx.apply_draw_state(&draw_state);
        gfx.draw(2);
        gfx.end_pass();
        gfx.commit_frame();

        assert_eq!(gfx.backend().n_draws(), 0);
        assert_eq!(gfx.frame_info().n_skipped_draws, 1);
    }

    #[test]
    fn offscreen_pass_that_is_not_valid_is_skipped_entirely() {
        let mut gfx = create_gfx();
        let draw_state = create_draw_state(&mut gfx);
        let pass = gfx.create_resource(&PassSetup::new(Locator::new("pass"), Vec::new(), None));
        gfx.backend_mut().take_commands();

        gfx.begin_offscreen_pass(pass, &PassAction::default());
        gfx.apply_viewport(PixelRect::new(0, 0, 64, 64), true);
        gfx.apply_draw_state(&draw_state);
        gfx.draw(0);
        gfx.end_pass();
        gfx.commit_frame();

        assert_eq!(gfx.backend().commands(), &[BackendCommand::CommitFrame]);
        assert_eq!(gfx.frame_info().n_skipped_passes, 1);
        assert_eq!(gfx.frame_info().n_passes, 0);
    }

    #[test]
    fn offscreen_pass_renders_into_its_attachments() {
        let mut gfx = create_gfx();
        let color = gfx.create_resource(&TextureSetup::render_target(
            Locator::new("color"),
            64,
            64,
            PixelFormat::Rgba8,
        ));
        let depth = gfx.create_resource(&TextureSetup::render_target(
            Locator::new("depth"),
            64,
            64,
            PixelFormat::Depth,
        ));
        let pass = gfx.create_resource(&PassSetup::new(
            Locator::new("pass"),
            vec![color],
            Some(depth),
        ));
        assert_eq!(
            gfx.query_resource_info(pass).state,
            prism_resource::ResourceState::Valid
        );

        gfx.begin_offscreen_pass(pass, &PassAction::load());
        gfx.end_pass();
        gfx.commit_frame();

        assert_eq!(gfx.frame_info().n_passes, 1);
        assert!(gfx.backend().commands().iter().any(|command| matches!(
            command,
            BackendCommand::BeginPass { pass: Some(_), .. }
        )));
    }

    #[test]
    fn deferred_destruction_happens_at_commit() {
        let mut gfx = create_gfx();
        let label = gfx.push_resource_label();
        let draw_state = create_draw_state(&mut gfx);
        gfx.pop_resource_label();
        assert_eq!(gfx.backend().n_live_objects(), 3);

        gfx.destroy_resources(label);
        assert!(!gfx.lookup_resource(&Locator::new("quad")).is_valid());

        gfx.begin_pass(&PassAction::default());
        gfx.apply_draw_state(&draw_state);
        gfx.draw(0);
        gfx.end_pass();
        assert_eq!(gfx.backend().n_live_objects(), 3);

        gfx.commit_frame();
        assert_eq!(gfx.backend().n_draws(), 1);
        assert_eq!(gfx.backend().n_live_objects(), 0);
    }

    #[test]
    fn discarding_gfx_with_live_resources_destroys_them_once() {
        let mut gfx = create_gfx();
        create_draw_state(&mut gfx);
        gfx.destroy_resources_immediately(ResourceLabel::ALL);
        assert_eq!(gfx.backend().n_live_objects(), 0);
        gfx.discard();
    }

    #[test]
    fn empty_dynamic_mesh_can_be_filled_once_per_frame() {
        let mut gfx = create_gfx();
        let mesh = gfx.create_resource(&dynamic_quad_setup("dynamic"));
        assert_eq!(
            gfx.query_resource_info(mesh).state,
            prism_resource::ResourceState::Valid
        );

        gfx.update_vertices(mesh, &[0; 48]);
        gfx.update_indices(mesh, &[0; 12]);
        gfx.commit_frame();
        gfx.update_vertices(mesh, &[0; 24]);
        gfx.commit_frame();

        let handle = gfx.container.pools().mesh(mesh).unwrap().handle;
        assert_eq!(
            buffer_updates(&gfx),
            vec![
                BackendCommand::UpdateVertices {
                    mesh: handle,
                    n_bytes: 48
                },
                BackendCommand::UpdateIndices {
                    mesh: handle,
                    n_bytes: 12
                },
                BackendCommand::UpdateVertices {
                    mesh: handle,
                    n_bytes: 24
                },
            ]
        );
        assert_eq!(gfx.frame_info().n_buffer_updates, 1);
    }

    #[test]
    fn updating_mesh_that_is_not_valid_does_nothing() {
        let mut gfx = create_gfx();
        let label = gfx.push_resource_label();
        let mesh = gfx.create_resource(&dynamic_quad_setup("dynamic"));
        gfx.pop_resource_label();
        gfx.destroy_resources_immediately(label);

        gfx.update_vertices(mesh, &[0; 48]);
        gfx.update_vertices(ResourceId::invalid(), &[0; 48]);

        assert!(buffer_updates(&gfx).is_empty());
    }

    #[test]
    #[should_panic(expected = "immutable vertex buffer")]
    fn updating_immutable_vertices_panics() {
        let mut gfx = create_gfx();
        let mesh = gfx.create_resource_with_data(&quad_setup("quad"), &[0; 60]);
        gfx.update_vertices(mesh, &[0; 48]);
    }

    #[test]
    #[should_panic(expected = "with 49 bytes")]
    fn updating_vertices_beyond_buffer_panics() {
        let mut gfx = create_gfx();
        let mesh = gfx.create_resource(&dynamic_quad_setup("dynamic"));
        gfx.update_vertices(mesh, &[0; 49]);
    }

    #[test]
    #[should_panic(expected = "twice in frame 0")]
    fn updating_vertices_twice_in_one_frame_panics() {
        let mut gfx = create_gfx();
        let mesh = gfx.create_resource(&dynamic_quad_setup("dynamic"));
        gfx.update_vertices(mesh, &[0; 48]);
        gfx.update_vertices(mesh, &[0; 48]);
    }

    #[test]
    #[should_panic(expected = "has no index buffer")]
    fn updating_indices_of_mesh_without_index_buffer_panics() {
        let mut gfx = create_gfx();
        let mut setup = MeshSetup::empty(4, Usage::Dynamic, IndexType::None, 0, Usage::Immutable);
        setup.layout = position_layout();
        let mesh = gfx.create_resource(&setup);
        gfx.update_indices(mesh, &[0; 12]);
    }

    #[test]
    fn drawing_explicit_group_uses_its_range() {
        let mut gfx = create_gfx();
        let draw_state = create_draw_state(&mut gfx);

        gfx.begin_pass(&PassAction::default());
        gfx.draw_group(PrimitiveGroup::new(0, 3));
        gfx.apply_draw_state(&draw_state);
        gfx.draw_group(PrimitiveGroup::new(1, 4));
        gfx.end_pass();
        gfx.commit_frame();

        assert!(gfx.backend().commands().contains(&BackendCommand::Draw {
            base_element: 1,
            n_elements: 4,
            n_instances: 1
        }));
        assert_eq!(gfx.frame_info().n_draws, 1);
        assert_eq!(gfx.frame_info().n_skipped_draws, 1);
    }

    #[test]
    #[should_panic(expected = "while a pass is open")]
    fn beginning_pass_inside_pass_panics() {
        let mut gfx = create_gfx();
        gfx.begin_pass(&PassAction::default());
        gfx.begin_pass(&PassAction::default());
    }

    #[test]
    #[should_panic(expected = "without an open pass")]
    fn ending_pass_without_open_pass_panics() {
        let mut gfx = create_gfx();
        gfx.end_pass();
    }

    #[test]
    #[should_panic(expected = "without an open pass")]
    fn applying_draw_state_outside_pass_panics() {
        let mut gfx = create_gfx();
        let draw_state = create_draw_state(&mut gfx);
        gfx.apply_draw_state(&draw_state);
    }

    #[test]
    #[should_panic(expected = "while a pass is open")]
    fn committing_frame_inside_pass_panics() {
        let mut gfx = create_gfx();
        gfx.begin_pass(&PassAction::default());
        gfx.commit_frame();
    }
}
