//! Mesh setups, vertex layouts and the OMSH mesh file format.

pub mod loader;
pub mod omsh;
mod setup;
mod vertex;

pub use loader::{MeshLoader, MeshLoaderState, OnMeshLoaded};
pub use setup::{
    IndexType, MAX_PRIMITIVE_GROUPS, MeshSetup, MeshSource, PrimitiveGroup, PrimitiveType, Usage,
};
pub use vertex::{VertexAttr, VertexAttrSet, VertexComponent, VertexFormat, VertexLayout};
