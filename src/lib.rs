//! Resource lifecycle management and render loop.

pub mod gfx;

pub use prism_containers;
pub use prism_io;
pub use prism_log;
pub use prism_mesh;
pub use prism_resource;
