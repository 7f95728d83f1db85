//! Data structures for meshes, print parameters and estimates

mod estimate;
mod mesh;
mod params;

pub use estimate::{Complexity, CostBreakdown, FileInfo, PrintEstimate, format_money};
pub use mesh::{BoundingBox, Mesh, Triangle};
pub use params::{MAX_INFILL, MIN_INFILL, Material, PrintParameters, Quality};
