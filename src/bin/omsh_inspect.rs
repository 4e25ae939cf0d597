use anyhow::{Context, Result, bail};
use clap::Parser;
use prism::{
    gfx::{Gfx, GfxConfig, GfxResourceType, HeadlessBackend},
    prism_io::{IoQueue, LocalFileSystem},
    prism_mesh::{MeshSetup, omsh},
    prism_resource::{Locator, ResourceState},
};
use std::{path::PathBuf, sync::Arc};

#[derive(Parser, Debug)]
#[command(about = "Inspect an OMSH mesh file", long_about = None)]
struct Args {
    /// URL or path of the mesh file. URLs may start with an assign from the
    /// configuration, like `res:`
    url: String,

    /// Path to RON configuration file to use
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum number of frames to wait for the mesh to load
    #[arg(long, default_value_t = 1000)]
    max_frames: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(file_path) => GfxConfig::from_ron_file(file_path)?,
        None => GfxConfig::default(),
    };

    let io = IoQueue::new(&config.io, Arc::new(LocalFileSystem))?;

    let path = io.resolve_url(&args.url);
    let bytes =
        std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mut setup = MeshSetup::from_data();
    setup.locator = Locator::new(args.url.as_str());
    omsh::parse(&bytes, &mut setup)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    println!("{} ({} bytes)", path.display(), bytes.len());
    print!("{setup}");

    load_with_headless_backend(config, io, &args.url, args.max_frames)
}

/// Loads the mesh through a graphics context the way an application would,
/// and reports the state it ends up in.
fn load_with_headless_backend(
    config: GfxConfig,
    io: IoQueue,
    url: &str,
    max_frames: u64,
) -> Result<()> {
    let mut gfx = Gfx::new(config, HeadlessBackend::new(), io)?;
    let mesh = gfx.load_resource(MeshSetup::from_file(Locator::new(url), 0));

    let state = loop {
        let state = gfx.query_resource_info(mesh).state;
        if state != ResourceState::Pending {
            break state;
        }
        if gfx.frame_index() >= max_frames {
            bail!("Mesh was still loading after {max_frames} frames");
        }
        gfx.commit_frame();
        std::thread::yield_now();
    };

    println!(
        "loaded as {mesh}: {state} after {} frames ({} {} objects in backend)",
        gfx.frame_index(),
        gfx.backend().n_live_objects_of_type(GfxResourceType::MESH),
        GfxResourceType::name(GfxResourceType::MESH)
    );

    gfx.discard();

    if state != ResourceState::Valid {
        bail!("Loading the mesh failed");
    }
    Ok(())
}
