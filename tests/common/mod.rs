#![allow(dead_code)]

use prism::{
    gfx::{DrawState, Gfx, GfxConfig, HeadlessBackend, PipelineSetup, ShaderSetup},
    prism_io::{IoQueue, MemoryFileSystem},
    prism_mesh::{
        IndexType, MeshSetup, PrimitiveGroup, Usage, VertexAttr, VertexFormat, VertexLayout, omsh,
    },
    prism_resource::{Locator, ResourceId},
};
use std::{path::PathBuf, sync::Arc};

pub struct Harness {
    pub gfx: Gfx<HeadlessBackend>,
    pub io: IoQueue,
    pub fs: Arc<MemoryFileSystem>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(GfxConfig::default())
    }

    pub fn with_config(mut config: GfxConfig) -> Self {
        config
            .io
            .assigns
            .insert("res:".to_string(), PathBuf::from("assets"));
        let fs = Arc::new(MemoryFileSystem::new());
        let io = IoQueue::manual(&config.io, fs.clone());
        let gfx = Gfx::new(config, HeadlessBackend::new(), io.clone()).unwrap();
        Self { gfx, io, fs }
    }

    /// Stores the given file under the `res:` assign.
    pub fn add_asset(&self, name: &str, data: Vec<u8>) {
        self.fs.insert(PathBuf::from("assets").join(name), data);
    }

    /// Lets the IO lanes handle everything submitted so far and ends the
    /// frame, so that loaders see the results.
    pub fn finish_io_and_commit(&mut self) {
        self.io.process_queued();
        self.gfx.commit_frame();
    }
}

pub fn position_layout() -> VertexLayout {
    let mut layout = VertexLayout::default();
    layout.add(VertexAttr::Position, VertexFormat::Float3);
    layout
}

/// Returns the bytes of an OMSH file for a cube with 24 vertices and 36
/// indices in one primitive group.
pub fn cube_omsh() -> Vec<u8> {
    let mut setup = MeshSetup::empty(24, Usage::Immutable, IndexType::Index16, 36, Usage::Immutable);
    setup.layout = position_layout();
    setup.add_primitive_group(PrimitiveGroup::new(0, 36));

    let vertex_data: Vec<u8> = (0..24 * 3)
        .flat_map(|idx| (idx as f32).to_le_bytes())
        .collect();
    let index_data: Vec<u8> = (0..36_u16)
        .flat_map(|idx| (idx % 24).to_le_bytes())
        .collect();

    omsh::write(&setup, &vertex_data, &index_data)
}

/// Returns a setup and data for a triangle with one primitive group.
pub fn triangle(locator: Locator) -> (MeshSetup, Vec<u8>) {
    let mut setup = MeshSetup::from_data();
    setup.locator = locator;
    setup.n_vertices = 3;
    setup.layout = position_layout();
    setup.add_primitive_group(PrimitiveGroup::new(0, 3));
    (setup, vec![0; 36])
}

pub fn create_pipeline(gfx: &mut Gfx<HeadlessBackend>) -> ResourceId {
    let shader = gfx.create_resource(&ShaderSetup::new(Locator::new("shader"), "vs", "fs"));
    gfx.create_resource(&PipelineSetup::new(
        Locator::new("pipeline"),
        shader,
        position_layout(),
    ))
}

pub fn create_triangle_draw_state(gfx: &mut Gfx<HeadlessBackend>) -> DrawState {
    let pipeline = create_pipeline(gfx);
    let (setup, data) = triangle(Locator::new("triangle"));
    let mesh = gfx.create_resource_with_data(&setup, &data);
    DrawState::new(pipeline, mesh)
}
