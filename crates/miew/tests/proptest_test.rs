//! Property tests over random atom sets and chunk selections.

use std::collections::BTreeSet;

use miew::*;
use proptest::prelude::*;

fn atom_strategy() -> impl Strategy<Value = (Vec3, f32)> {
    (-4.0f32..4.0, -4.0f32..4.0, -4.0f32..4.0, 1.0f32..2.0)
        .prop_map(|(x, y, z, r)| (Vec3::new(x, y, z), r))
}

fn pack(spheres: &[(Vec3, f32)]) -> PackedAtoms {
    let mut atoms = PackedAtoms::with_capacity(spheres.len());
    for (i, &(p, r)) in spheres.iter().enumerate() {
        let shade = i as f32 / spheres.len() as f32;
        atoms.push(p, r, Vec3::new(shade, 1.0 - shade, 0.5), AtomId(i as u32));
    }
    atoms
}

fn coarse_settings() -> Settings {
    Settings {
        resolution: Resolution::Low,
        ..Settings::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn quick_surface_indices_are_valid(spheres in prop::collection::vec(atom_strategy(), 1..6)) {
        let mesh = build_quick_surface(&pack(&spheres), &coarse_settings(), None).unwrap();
        prop_assert!(mesh.validate_indices().is_ok());
        prop_assert_eq!(mesh.indices.len() % 3, 0);
        prop_assert_eq!(mesh.normals.len(), mesh.positions.len());
        prop_assert_eq!(mesh.colors.len(), mesh.positions.len());
    }

    #[test]
    fn selection_never_adds_geometry(
        spheres in prop::collection::vec(atom_strategy(), 2..6),
        keep in prop::collection::btree_set(0u32..6, 0..6),
    ) {
        let atoms = pack(&spheres);
        let settings = coarse_settings();
        let full = build_quick_surface(&atoms, &settings, None).unwrap();
        let kept: BTreeSet<AtomId> = keep.into_iter().map(AtomId).collect();
        let part = build_quick_surface(&atoms, &settings, Some(&kept)).unwrap();
        prop_assert!(part.validate_indices().is_ok());
        prop_assert!(part.num_vertices() <= full.num_vertices());
        prop_assert!(part.num_triangles() <= full.num_triangles());
    }

    #[test]
    fn contact_surface_indices_are_valid(spheres in prop::collection::vec(atom_strategy(), 1..4)) {
        let mesh = build_contact_surface(&pack(&spheres), &coarse_settings(), None).unwrap();
        prop_assert!(mesh.validate_indices().is_ok());
        prop_assert_eq!(mesh.colors.len(), mesh.positions.len());
    }

    #[test]
    fn cylinder_subset_groups_halves(
        count in 1usize..8,
        picks in prop::collection::btree_set(0usize..16, 0..10),
    ) {
        let mut bonds = InstancedCylinders::new(count, 4, false, false);
        for i in 0..count {
            let begin = Vec3::new(i as f32, 0.0, 0.0);
            bonds.set_item(i, begin, begin + Vec3::Y, 0.1).unwrap();
            bonds.set_color(i, Vec3::ONE, Vec3::ONE).unwrap();
        }
        let chunks: Vec<usize> = picks.into_iter().filter(|&c| c < 2 * count).collect();
        let subset = bonds.get_subset(&chunks).unwrap();

        let instances: BTreeSet<usize> = chunks.iter().map(|c| c / 2).collect();
        prop_assert_eq!(subset.instance_count(), instances.len());
        prop_assert_eq!(subset.attribute("matVector1").unwrap().len(), 4 * instances.len());
        prop_assert_eq!(subset.alpha().len(), instances.len());

        let hidden = subset.attribute("color").unwrap().iter()
            .chain(subset.attribute("color2").unwrap())
            .filter(|&&c| c == HIDDEN_HALF)
            .count();
        prop_assert_eq!(hidden, 2 * instances.len() - chunks.len());
    }
}
