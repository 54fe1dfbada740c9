//! Point and vertex attribute types

use nalgebra::{Point3, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D point with double precision coordinates
pub type Point3d = Point3<f64>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// A 3D vector with double precision components
pub type Vector3d = Vector3<f64>;

/// A 2D vector with floating point components, used for texture coordinates
pub type Vector2f = Vector2<f32>;

/// One vertex record as handed over by an importer.
///
/// Normals and texture coordinates are optional and carried through
/// simplification untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Point3f,
    pub normal: Option<Vector3f>,
    pub uv: Option<Vector2f>,
}

impl Vertex {
    /// Create a vertex with only a position
    pub fn new(position: Point3f) -> Self {
        Self {
            position,
            normal: None,
            uv: None,
        }
    }

    /// Attach a normal
    pub fn with_normal(mut self, normal: Vector3f) -> Self {
        self.normal = Some(normal);
        self
    }

    /// Attach texture coordinates
    pub fn with_uv(mut self, uv: Vector2f) -> Self {
        self.uv = Some(uv);
        self
    }
}

impl Default for Vertex {
    fn default() -> Self {
        Self::new(Point3f::origin())
    }
}

impl From<Point3f> for Vertex {
    fn from(position: Point3f) -> Self {
        Self::new(position)
    }
}
