//! Procedural closed and open test shapes
//!
//! All closed shapes are wound counter-clockwise when seen from outside, so
//! every directed edge appears exactly once and pairs with its reverse.

use crate::mesh::IndexedMesh;
use crate::point::Point3f;

/// Regular-ish tetrahedron: 4 vertices, 4 faces.
pub fn tetrahedron() -> IndexedMesh {
    IndexedMesh::from_positions_and_triangles(
        vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(0.5, 1.0, 0.0),
            Point3f::new(0.5, 0.5, 1.0),
        ],
        &[[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
    )
}

/// Unit cube: 8 vertices, 12 triangles.
pub fn cube() -> IndexedMesh {
    IndexedMesh::from_positions_and_triangles(
        vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(1.0, 1.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
            Point3f::new(0.0, 0.0, 1.0),
            Point3f::new(1.0, 0.0, 1.0),
            Point3f::new(1.0, 1.0, 1.0),
            Point3f::new(0.0, 1.0, 1.0),
        ],
        &[
            // z = 0
            [0, 2, 1],
            [0, 3, 2],
            // z = 1
            [4, 5, 6],
            [4, 6, 7],
            // y = 0
            [0, 1, 5],
            [0, 5, 4],
            // y = 1
            [3, 7, 6],
            [3, 6, 2],
            // x = 0
            [0, 4, 7],
            [0, 7, 3],
            // x = 1
            [1, 2, 6],
            [1, 6, 5],
        ],
    )
}

/// Flat `size` x `size` vertex grid in the z = 0 plane, open at its border.
pub fn grid(size: u32) -> IndexedMesh {
    height_field(size, |_, _| 0.0)
}

/// Grid displaced by `sin(x) * sin(y)`, a smooth open surface with curvature.
pub fn bumpy_grid(size: u32) -> IndexedMesh {
    let span = (size.max(2) - 1) as f32;
    height_field(size, |x, y| {
        let fx = x / span * std::f32::consts::PI;
        let fy = y / span * std::f32::consts::PI;
        fx.sin() * fy.sin() * 2.0
    })
}

fn height_field(size: u32, height: impl Fn(f32, f32) -> f32) -> IndexedMesh {
    let size = size.max(2);
    let mut positions = Vec::with_capacity((size * size) as usize);
    for y in 0..size {
        for x in 0..size {
            positions.push(Point3f::new(x as f32, y as f32, height(x as f32, y as f32)));
        }
    }

    let mut triangles = Vec::with_capacity(((size - 1) * (size - 1) * 2) as usize);
    for y in 0..(size - 1) {
        for x in 0..(size - 1) {
            let tl = y * size + x;
            let tr = tl + 1;
            let bl = (y + 1) * size + x;
            let br = bl + 1;
            triangles.push([tl, bl, tr]);
            triangles.push([tr, bl, br]);
        }
    }
    IndexedMesh::from_positions_and_triangles(positions, &triangles)
}

/// Closed UV sphere of unit radius with single-vertex poles.
///
/// `rings` is the number of latitude bands (at least 2), `segments` the number
/// of longitude slices (at least 3). The result has
/// `2 + (rings - 1) * segments` vertices.
pub fn uv_sphere(rings: u32, segments: u32) -> IndexedMesh {
    let rings = rings.max(2);
    let segments = segments.max(3);

    let mut positions = Vec::with_capacity((2 + (rings - 1) * segments) as usize);
    positions.push(Point3f::new(0.0, 1.0, 0.0));
    for i in 1..rings {
        let theta = std::f32::consts::PI * i as f32 / rings as f32;
        for j in 0..segments {
            let phi = std::f32::consts::TAU * j as f32 / segments as f32;
            positions.push(Point3f::new(
                theta.sin() * phi.cos(),
                theta.cos(),
                theta.sin() * phi.sin(),
            ));
        }
    }
    positions.push(Point3f::new(0.0, -1.0, 0.0));

    let north = 0;
    let south = positions.len() as u32 - 1;
    let ring = |i: u32, j: u32| 1 + (i - 1) * segments + j % segments;

    let mut triangles = Vec::with_capacity((2 * segments * (rings - 1)) as usize);
    for j in 0..segments {
        triangles.push([north, ring(1, j + 1), ring(1, j)]);
    }
    for i in 1..(rings - 1) {
        for j in 0..segments {
            let a = ring(i, j);
            let b = ring(i, j + 1);
            let c = ring(i + 1, j);
            let d = ring(i + 1, j + 1);
            triangles.push([a, b, d]);
            triangles.push([a, d, c]);
        }
    }
    for j in 0..segments {
        triangles.push([ring(rings - 1, j), ring(rings - 1, j + 1), south]);
    }

    IndexedMesh::from_positions_and_triangles(positions, &triangles)
}
