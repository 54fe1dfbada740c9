//! Integration tests for qemesh-simplification
//!
//! These tests run whole simplifications through the public API and check
//! the output meshes against the guarantees callers rely on.

use qemesh_core::{primitives, Error, IndexedMesh, StructuralError, Vector3f};
use qemesh_simplification::*;
use std::collections::{HashMap, HashSet};
use std::ops::ControlFlow;

/// Every directed edge appears at most once and every index is in range.
fn assert_oriented_manifold(mesh: &IndexedMesh) {
    let mut directed = HashSet::new();
    for [a, b, c] in mesh.triangles() {
        for index in [a, b, c] {
            assert!((index as usize) < mesh.vertex_count(), "index {index} out of range");
        }
        assert!(a != b && b != c && c != a, "degenerate triangle {a} {b} {c}");
        for edge in [(a, b), (b, c), (c, a)] {
            assert!(directed.insert(edge), "duplicate directed edge {edge:?}");
        }
    }
}

/// Every directed edge has its reverse, so the surface has no border.
fn assert_closed(mesh: &IndexedMesh) {
    let directed: HashSet<(u32, u32)> = mesh
        .triangles()
        .flat_map(|[a, b, c]| [(a, b), (b, c), (c, a)])
        .collect();
    for &(a, b) in &directed {
        assert!(directed.contains(&(b, a)), "edge {a}->{b} is open");
    }
}

fn signed_volume(mesh: &IndexedMesh) -> f32 {
    mesh.triangles()
        .map(|[a, b, c]| {
            let pa = mesh.vertices[a as usize].position.coords;
            let pb = mesh.vertices[b as usize].position.coords;
            let pc = mesh.vertices[c as usize].position.coords;
            pa.dot(&pb.cross(&pc)) / 6.0
        })
        .sum()
}

#[test]
fn test_cube_to_six_vertices() -> anyhow::Result<()> {
    let simplifier = EdgeCollapseSimplifier::new();
    let report = simplifier.simplify_with_report(&primitives::cube(), 6)?;

    assert_eq!(report.state, EngineState::Converged);
    assert_eq!(report.mesh.vertex_count(), 6);
    // Closed genus-0 surface: F = 2V - 4.
    assert_eq!(report.mesh.face_count(), 8);
    assert!(report.mesh.indices.iter().all(|&i| i < 6));
    assert_oriented_manifold(&report.mesh);
    assert_closed(&report.mesh);
    Ok(())
}

#[test]
fn test_tetrahedron_target_equal_is_identity() -> anyhow::Result<()> {
    let tetrahedron = primitives::tetrahedron();
    let report = EdgeCollapseSimplifier::new().simplify_with_report(&tetrahedron, 4)?;
    assert_eq!(report.state, EngineState::Converged);
    assert_eq!(report.mesh, tetrahedron);
    Ok(())
}

#[test]
fn test_tetrahedron_below_floor_is_exhausted() -> anyhow::Result<()> {
    let tetrahedron = primitives::tetrahedron();
    let report = EdgeCollapseSimplifier::new().simplify_with_report(&tetrahedron, 3)?;
    assert_eq!(report.state, EngineState::Exhausted);
    assert_eq!(report.mesh.vertex_count(), 4);
    assert_eq!(report.mesh.face_count(), 4);
    Ok(())
}

#[test]
fn test_larger_target_returns_input() {
    let sphere = primitives::uv_sphere(6, 8);
    let result = EdgeCollapseSimplifier::new().simplify_to(&sphere, 1000).unwrap();
    assert_eq!(result, sphere);
}

#[test]
fn test_zero_target_is_invalid() {
    let err = EdgeCollapseSimplifier::new()
        .simplify_to(&primitives::cube(), 0)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidTarget { target: 0, .. }));
}

#[test]
fn test_sphere_terminates_as_manifold() {
    let sphere = primitives::uv_sphere(12, 16);
    let simplifier = EdgeCollapseSimplifier::new();
    for target in [150, 60, 20, 8, 4] {
        let report = simplifier.simplify_with_report(&sphere, target).unwrap();
        assert_eq!(report.state, EngineState::Converged, "target {target}");
        assert_eq!(report.mesh.vertex_count(), target as usize);
        assert_oriented_manifold(&report.mesh);
        assert_closed(&report.mesh);
        assert_eq!(report.mesh.face_count(), 2 * report.mesh.vertex_count() - 4);
    }
}

#[test]
fn test_closed_and_open_surfaces_reach_four_vertices() {
    let cases = [
        ("cube", primitives::cube(), MergePolicy::Optimal),
        ("cube", primitives::cube(), MergePolicy::Midpoint),
        ("bumpy grid", primitives::bumpy_grid(12), MergePolicy::Optimal),
    ];
    for (name, mesh, policy) in cases {
        let simplifier = EdgeCollapseSimplifier::with_config(
            SimplifyConfig::default().with_merge_policy(policy),
        );
        let report = simplifier.simplify_with_report(&mesh, 4).unwrap();
        assert_eq!(report.state, EngineState::Converged, "{name} {policy:?}");
        assert_eq!(report.mesh.vertex_count(), 4, "{name} {policy:?}");
        assert_oriented_manifold(&report.mesh);
    }
}

#[test]
fn test_sphere_keeps_its_volume_sign() {
    let sphere = primitives::uv_sphere(12, 16);
    let result = EdgeCollapseSimplifier::new().simplify_to(&sphere, 40).unwrap();
    let before = signed_volume(&sphere);
    let after = signed_volume(&result);
    assert!(before > 0.0);
    assert!(after > 0.5 * before, "volume collapsed from {before} to {after}");
}

#[test]
fn test_open_surface_stays_manifold() {
    let grid = primitives::bumpy_grid(12);
    let report = EdgeCollapseSimplifier::new().simplify_with_report(&grid, 30).unwrap();
    assert_eq!(report.state, EngineState::Converged);
    assert_eq!(report.mesh.vertex_count(), 30);
    assert_oriented_manifold(&report.mesh);
    assert_eq!(report.stats.collapses, grid.vertex_count() - 30);
}

#[test]
fn test_non_manifold_input_is_rejected() {
    let mut cube = primitives::cube();
    cube.indices.extend_from_slice(&[0, 2, 1]);
    let err = EdgeCollapseSimplifier::new().simplify_to(&cube, 6).unwrap_err();
    assert!(matches!(
        err,
        Error::Structural(StructuralError::NonManifoldEdge { .. })
    ));
}

#[test]
fn test_degenerate_input_is_rejected() {
    let mut cube = primitives::cube();
    cube.indices[3..6].copy_from_slice(&[4, 4, 5]);
    let err = EdgeCollapseSimplifier::new().simplify_to(&cube, 6).unwrap_err();
    assert!(matches!(
        err,
        Error::Structural(StructuralError::DegenerateFace { face: 1 })
    ));
}

#[test]
fn test_winding_repair_accepts_flipped_triangle() {
    let mut grid = primitives::grid(6);
    // Reverse the first triangle of the second row.
    grid.indices.swap(30, 31);
    assert!(EdgeCollapseSimplifier::new().simplify_to(&grid, 20).is_err());

    let config = SimplifyConfig::default().with_winding(WindingRepair::FlipConflicting);
    let result = EdgeCollapseSimplifier::with_config(config)
        .simplify_to(&grid, 20)
        .unwrap();
    assert_oriented_manifold(&result);
}

#[test]
fn test_engine_steps_are_observable() -> anyhow::Result<()> {
    let sphere = primitives::uv_sphere(8, 12);
    let mut engine = SimplificationEngine::from_indexed(&sphere, 30, SimplifyConfig::default())?;
    assert_eq!(engine.state(), EngineState::Ready);

    let mut live_counts = Vec::new();
    let state = engine.run_with(|stats| {
        live_counts.push(stats.live_vertices);
        ControlFlow::Continue(())
    })?;
    assert!(state.is_terminal());

    assert!(live_counts.windows(2).all(|w| w[1] <= w[0]));
    assert!(live_counts.iter().all(|&live| live >= 30));
    let mesh = engine.export()?;
    assert_oriented_manifold(&mesh);
    assert_eq!(mesh.vertex_count(), engine.stats().live_vertices);
    Ok(())
}

#[test]
fn test_surviving_vertices_keep_normals_and_order() {
    let mut sphere = primitives::uv_sphere(8, 12);
    let normals: Vec<Vector3f> = sphere.positions().map(|p| p.coords.normalize()).collect();
    sphere.set_normals(&normals);

    let result = EdgeCollapseSimplifier::new().simplify_to(&sphere, 30).unwrap();
    let original: HashMap<[u32; 3], usize> = sphere
        .vertices
        .iter()
        .enumerate()
        .map(|(i, v)| (v.normal.unwrap().map(f32::to_bits).into(), i))
        .collect();

    let mut last = None;
    for vertex in &result.vertices {
        let normal = vertex.normal.expect("normal carried through");
        let index = original[&<[u32; 3]>::from(normal.map(f32::to_bits))];
        assert!(last.map_or(true, |prev| index > prev), "vertex order changed");
        last = Some(index);
    }
}

#[test]
fn test_midpoint_policy_keeps_points_inside_hull() {
    let config = SimplifyConfig::default().with_merge_policy(MergePolicy::Midpoint);
    let sphere = primitives::uv_sphere(8, 12);
    let result = EdgeCollapseSimplifier::with_config(config)
        .simplify_to(&sphere, 24)
        .unwrap();
    for p in result.positions() {
        assert!(p.coords.norm() <= 1.0 + 1e-5);
    }
}
