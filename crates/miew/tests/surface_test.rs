//! End-to-end surface tests through the one-call builders.

use std::collections::HashMap;

use miew::*;

/// Disjoint-set forest over vertex ids.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (a, b) = (self.find(a), self.find(b));
        if a != b {
            self.parent[a] = b;
        }
    }
}

/// Connected components of the mesh, treating coincident vertices as one.
fn count_components(mesh: &SurfaceMesh) -> usize {
    let n = mesh.num_vertices();
    let mut sets = UnionFind::new(n);

    let mut by_position: HashMap<[i64; 3], usize> = HashMap::new();
    for i in 0..n {
        let key = (mesh.position(i) * 1000.0).round().to_array().map(|c| c as i64);
        let first = *by_position.entry(key).or_insert(i);
        sets.union(i, first);
    }
    for [a, b, c] in mesh.triangles() {
        sets.union(a as usize, b as usize);
        sets.union(b as usize, c as usize);
    }

    let mut roots: Vec<usize> = (0..n).map(|i| sets.find(i)).collect();
    roots.sort_unstable();
    roots.dedup();
    roots.len()
}

fn two_atoms(distance: f32) -> PackedAtoms {
    let mut atoms = PackedAtoms::new();
    atoms.push(Vec3::ZERO, 1.5, Vec3::new(1.0, 0.0, 0.0), AtomId(0));
    atoms.push(Vec3::new(distance, 0.0, 0.0), 1.5, Vec3::new(0.0, 0.0, 1.0), AtomId(1));
    atoms
}

/// Grid spacing 0.5, Gaussian cut-off 3, isovalue 0.5.
fn high_settings() -> Settings {
    Settings::from_json(r#"{"resolution": "High", "quick_surf": {"iso_value": 0.5, "scale": 1.0}}"#)
        .unwrap()
}

#[test]
fn test_overlapping_atoms_form_one_blob() {
    let settings = high_settings();
    let params = settings.quick_surf_params();
    assert_eq!(params.grid_spacing, 0.5);
    assert_eq!(params.gauss_lim, 3.0);

    let mesh = build_quick_surface(&two_atoms(2.0), &settings, None).unwrap();
    assert!(mesh.num_triangles() > 0);
    mesh.validate_indices().unwrap();
    assert_eq!(count_components(&mesh), 1);

    let bbox = mesh.bounding_box();
    assert!(bbox.min.x < -1.0 && bbox.max.x > 3.0);
}

#[test]
fn test_distant_atoms_form_two_blobs() {
    let mesh = build_quick_surface(&two_atoms(12.0), &high_settings(), None).unwrap();
    assert_eq!(count_components(&mesh), 2);
}

#[test]
fn test_surface_buffers() {
    let mesh = build_quick_surface(&two_atoms(2.0), &high_settings(), None).unwrap();
    assert_eq!(mesh.normals.len(), mesh.positions.len());
    assert_eq!(mesh.colors.len(), mesh.positions.len());
    for i in 0..mesh.num_vertices() {
        assert!((mesh.normal(i).length() - 1.0).abs() < 1e-4, "vertex {i}");
    }
    assert_eq!(mesh.position_bytes().len(), mesh.positions.len() * 4);
    assert_eq!(mesh.index_bytes().len(), mesh.indices.len() * 4);
}

#[test]
fn test_rebuild_is_identical() {
    let atoms = two_atoms(2.0);
    let settings = high_settings();
    let a = build_quick_surface(&atoms, &settings, None).unwrap();
    let b = build_quick_surface(&atoms, &settings, None).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_isovalue_above_field_is_empty() {
    let mut settings = high_settings();
    settings.quick_surf.iso_value = 100.0;
    let mesh = build_quick_surface(&two_atoms(2.0), &settings, None).unwrap();
    assert!(mesh.is_empty());
    assert!(mesh.positions.is_empty());
    assert!(mesh.indices.is_empty());
}

#[test]
fn test_selector_keeps_one_side() {
    let atoms = two_atoms(2.0);
    let settings = high_settings();
    let full = build_quick_surface(&atoms, &settings, None).unwrap();

    let only_first = |id: AtomId| id == AtomId(0);
    let part = build_quick_surface(&atoms, &settings, Some(&only_first)).unwrap();
    part.validate_indices().unwrap();
    assert!(part.num_triangles() > 0);
    assert!(part.num_vertices() < full.num_vertices());
    assert!(part.num_triangles() < full.num_triangles());
    for i in 0..part.num_vertices() {
        assert!(part.position(i).x < 1.5 + 1e-3);
    }
}

#[test]
fn test_contact_surface() {
    let mut atoms = PackedAtoms::new();
    atoms.push(Vec3::new(1.0, 2.0, 3.0), 1.6, Vec3::new(0.2, 0.8, 0.2), AtomId(7));

    let mesh = build_contact_surface(&atoms, &Settings::default(), None).unwrap();
    mesh.validate_indices().unwrap();
    assert!(mesh.num_triangles() > 0);
    assert_eq!(count_components(&mesh), 1);
    assert!(mesh.bounding_box().contains(Vec3::new(1.0, 2.0, 3.0)));
    for c in mesh.colors.chunks_exact(3) {
        assert!((c[1] - 0.8).abs() < 1e-3);
    }
}

#[test]
fn test_no_atoms() {
    let atoms = PackedAtoms::new();
    assert!(build_quick_surface(&atoms, &Settings::default(), None).unwrap().is_empty());
    assert!(build_contact_surface(&atoms, &Settings::default(), None).unwrap().is_empty());
}
