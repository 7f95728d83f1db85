//! Geometric analysis of triangle meshes
//!
//! This module derives the quantities the estimator prices from:
//! - Enclosed volume (signed and absolute)
//! - Axis-aligned bounding box
//! - Surface area
//! - Complexity tier
//!
//! Volumes are computed with the divergence theorem, summing the signed
//! tetrahedra spanned by each triangle and the origin. The result is exact for
//! closed, consistently wound meshes and only an approximation otherwise.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ComplexityThresholds;
use crate::model::{BoundingBox, Complexity, Mesh};

/// Cubic millimeters per cubic centimeter
pub const MM3_PER_CM3: f64 = 1000.0;

/// Smallest volume used as the denominator of the triangle density
const MIN_DENSITY_VOLUME_CM3: f64 = 1e-6;

/// Everything the estimator needs to know about a mesh
///
/// Computed once per upload and cached, so re-pricing with different
/// parameters never re-parses or re-walks the geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshAnalysis {
    /// Number of triangles
    pub triangle_count: usize,
    /// Bounding box minimum corner in millimeters
    pub bbox_min: [f64; 3],
    /// Bounding box maximum corner in millimeters
    pub bbox_max: [f64; 3],
    /// Signed volume in mm³; negative when the winding is inverted
    pub signed_volume_mm3: f64,
    /// Absolute volume in mm³
    pub volume_mm3: f64,
    /// Absolute volume in cm³
    pub volume_cm3: f64,
    /// Total triangle area in mm²
    pub surface_area_mm2: f64,
    /// Complexity tier
    pub complexity: Complexity,
    /// The bounding box has zero extent along at least one axis
    pub degenerate: bool,
}

impl MeshAnalysis {
    /// The bounding box of the analyzed mesh
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox {
            min: Point3::from(self.bbox_min),
            max: Point3::from(self.bbox_max),
        }
    }

    /// Bounding box size along x, y, z in millimeters
    pub fn dimensions_mm(&self) -> [f64; 3] {
        let extent = self.bounding_box().extent();
        [extent.x, extent.y, extent.z]
    }

    /// True when the winding of the mesh encloses a negative volume
    pub fn is_inverted(&self) -> bool {
        self.signed_volume_mm3 < 0.0
    }
}

/// Compute the axis-aligned bounding box of a mesh
pub fn compute_bounding_box(mesh: &Mesh) -> BoundingBox {
    let mut positions = mesh.positions();
    // A Mesh always holds at least one triangle
    let first = positions.next().copied().unwrap_or_else(Point3::origin);
    let (min, max) = positions.fold((first, first), |(min, max), p| {
        (min.inf(p), max.sup(p))
    });
    BoundingBox { min, max }
}

/// Compute the signed volume of a mesh in mm³ using the divergence theorem
///
/// For a watertight mesh with outward-facing winding the volume is positive.
/// A negative result indicates inverted triangles.
pub fn compute_signed_volume(mesh: &Mesh) -> f64 {
    mesh.triangles()
        .iter()
        .map(|t| {
            let [a, b, c] = &t.vertices;
            a.coords.dot(&b.coords.cross(&c.coords))
        })
        .sum::<f64>()
        / 6.0
}

/// Compute the absolute volume of a mesh in cm³
pub fn compute_volume_cm3(mesh: &Mesh) -> f64 {
    compute_signed_volume(mesh).abs() / MM3_PER_CM3
}

/// Compute the total surface area of a mesh in mm²
pub fn compute_surface_area(mesh: &Mesh) -> f64 {
    mesh.triangles().iter().map(|t| t.area()).sum()
}

/// Classify a mesh into a complexity tier
///
/// The tier is the higher of two buckets: one on the raw triangle count and
/// one on triangles per cm³. For a fixed volume the result never decreases as
/// the triangle count grows.
pub fn classify_complexity(
    triangle_count: usize,
    volume_cm3: f64,
    thresholds: &ComplexityThresholds,
) -> Complexity {
    let by_count = if triangle_count >= thresholds.high_triangles {
        Complexity::High
    } else if triangle_count >= thresholds.medium_triangles {
        Complexity::Medium
    } else {
        Complexity::Low
    };

    let density = triangle_count as f64 / volume_cm3.max(MIN_DENSITY_VOLUME_CM3);
    let by_density = if density >= thresholds.high_density {
        Complexity::High
    } else if density >= thresholds.medium_density {
        Complexity::Medium
    } else {
        Complexity::Low
    };

    by_count.max(by_density)
}

/// Analyze a mesh
///
/// # Example
///
/// ```
/// use nalgebra::Point3;
/// use printquote::config::ComplexityThresholds;
/// use printquote::mesh_ops::analyze;
/// use printquote::{Mesh, Triangle};
///
/// let mesh = Mesh::from_triangles(vec![Triangle::new(
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(10.0, 0.0, 0.0),
///     Point3::new(0.0, 10.0, 0.0),
/// )])
/// .unwrap();
/// let analysis = analyze(&mesh, &ComplexityThresholds::default());
/// assert_eq!(analysis.triangle_count, 1);
/// assert_eq!(analysis.dimensions_mm(), [10.0, 10.0, 0.0]);
/// ```
pub fn analyze(mesh: &Mesh, thresholds: &ComplexityThresholds) -> MeshAnalysis {
    let bbox = compute_bounding_box(mesh);
    let signed_volume_mm3 = compute_signed_volume(mesh);
    let volume_mm3 = signed_volume_mm3.abs();
    let volume_cm3 = volume_mm3 / MM3_PER_CM3;
    let triangle_count = mesh.triangle_count();

    if signed_volume_mm3 < 0.0 {
        warn!(
            signed_volume_mm3,
            "mesh winding is inverted; using absolute volume"
        );
    }
    let degenerate = bbox.is_degenerate();
    if degenerate {
        debug!("mesh is flat along at least one axis");
    }

    let analysis = MeshAnalysis {
        triangle_count,
        bbox_min: bbox.min.into(),
        bbox_max: bbox.max.into(),
        signed_volume_mm3,
        volume_mm3,
        volume_cm3,
        surface_area_mm2: compute_surface_area(mesh),
        complexity: classify_complexity(triangle_count, volume_cm3, thresholds),
        degenerate,
    };
    debug!(
        triangles = analysis.triangle_count,
        volume_cm3 = analysis.volume_cm3,
        complexity = %analysis.complexity,
        "analyzed mesh"
    );
    analysis
}
