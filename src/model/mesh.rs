//! Triangle meshes and their bounding boxes

use nalgebra::{Point3, Vector3};

use crate::error::{Error, Result};

/// A single mesh triangle with its three vertex positions
///
/// Positions are in millimeters. The normal is whatever the source file
/// declared; it is never trusted for volume computation.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    /// Vertex positions in file order (winding matters for signed volume)
    pub vertices: [Point3<f64>; 3],
    /// Declared facet normal, if the file carried a usable one
    pub normal: Option<Vector3<f64>>,
}

impl Triangle {
    /// Create a new triangle without a declared normal
    pub fn new(a: Point3<f64>, b: Point3<f64>, c: Point3<f64>) -> Self {
        Self {
            vertices: [a, b, c],
            normal: None,
        }
    }

    /// Create a new triangle with a declared normal
    pub fn with_normal(a: Point3<f64>, b: Point3<f64>, c: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self {
            vertices: [a, b, c],
            normal: Some(normal),
        }
    }

    /// Unnormalized face normal `(b - a) × (c - a)`; its length is twice the area
    pub fn cross(&self) -> Vector3<f64> {
        let [a, b, c] = &self.vertices;
        (b - a).cross(&(c - a))
    }

    /// Area of the triangle
    pub fn area(&self) -> f64 {
        0.5 * self.cross().norm()
    }

    /// Unit face normal computed from the winding, or `None` for degenerate triangles
    pub fn computed_normal(&self) -> Option<Vector3<f64>> {
        self.cross().try_normalize(f64::EPSILON)
    }

    fn is_finite(&self) -> bool {
        self.vertices
            .iter()
            .all(|p| p.x.is_finite() && p.y.is_finite() && p.z.is_finite())
    }
}

/// A triangle mesh loaded from an upload
///
/// A `Mesh` always holds at least one triangle and every vertex position is
/// finite; [`Mesh::from_triangles`] is the only way to build one.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    triangles: Vec<Triangle>,
}

impl Mesh {
    /// Build a mesh, rejecting empty input and non-finite positions
    ///
    /// # Errors
    /// - [`Error::EmptyMesh`] when `triangles` is empty
    /// - [`Error::CorruptGeometry`] when any coordinate is NaN or infinite
    pub fn from_triangles(triangles: Vec<Triangle>) -> Result<Self> {
        if triangles.is_empty() {
            return Err(Error::EmptyMesh);
        }
        if let Some(index) = triangles.iter().position(|t| !t.is_finite()) {
            return Err(Error::CorruptGeometry(format!(
                "triangle {} has a non-finite vertex coordinate",
                index
            )));
        }
        Ok(Self { triangles })
    }

    /// The triangles of this mesh
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Number of triangles (always at least one)
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Iterate over every vertex position, three per triangle
    pub fn positions(&self) -> impl Iterator<Item = &Point3<f64>> {
        self.triangles.iter().flat_map(|t| t.vertices.iter())
    }
}

/// An axis-aligned bounding box in millimeters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner
    pub min: Point3<f64>,
    /// Maximum corner
    pub max: Point3<f64>,
}

impl BoundingBox {
    /// Size along each axis
    pub fn extent(&self) -> Vector3<f64> {
        self.max - self.min
    }

    /// Size along each axis, with every component raised to at least `min_extent`
    pub fn guarded_extent(&self, min_extent: f64) -> Vector3<f64> {
        self.extent().map(|e| e.max(min_extent))
    }

    /// True when the box is flat along at least one axis
    pub fn is_degenerate(&self) -> bool {
        self.extent().iter().any(|&e| e <= 0.0)
    }
}
