//! CPU geometry: path parsing and triangulation, per-item meshes and symbol
//! outlines.

pub mod item;
pub mod path;
pub mod simplify;
pub mod symbols;

pub use item::{build_item_mesh, geometry_for_item, GeomSlot, ItemGeometry, MeshData};
pub use path::{build_path_geometry, contours, geometry_for_path, PathCache, PathGeometry};
