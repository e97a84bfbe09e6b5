//! Instanced atoms and bonds built from settings, picked with rays.

use miew::*;

/// Three atoms in a row joined by two bonds.
fn chain(settings: &Settings) -> (InstancedSpheres, InstancedCylinders) {
    let centers = [Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), Vec3::new(4.0, 0.0, 0.0)];
    let colors = [Vec3::X, Vec3::Y, Vec3::Z];

    let mut spheres = new_spheres(centers.len(), settings);
    for (i, (&c, &rgb)) in centers.iter().zip(&colors).enumerate() {
        spheres.set_item(i, c, 0.5).unwrap();
        spheres.set_color(i, rgb).unwrap();
    }

    let mut bonds = new_cylinders(2, settings, true);
    for i in 0..2 {
        bonds.set_item(i, centers[i], centers[i + 1], 0.15).unwrap();
        bonds.set_color(i, colors[i], colors[i + 1]).unwrap();
    }
    bonds.finalize();
    (spheres, bonds)
}

#[test]
fn test_templates_follow_resolution() {
    let mut settings = Settings::default();
    settings.resolution = Resolution::High;
    let (spheres, bonds) = chain(&settings);
    // 12 radial segments, 3 rings, no caps
    assert_eq!(bonds.base_mesh().num_vertices(), 36);
    // 16 segments pole to pole, 32 around, seam duplicated
    assert_eq!(spheres.base_mesh().num_vertices(), 33 * 17);
    assert!(!bonds.uses_z_sprites());

    settings.instancing.z_sprites = true;
    let (spheres, bonds) = chain(&settings);
    assert!(spheres.uses_z_sprites() && bonds.uses_z_sprites());
    assert_eq!(bonds.attribute("invmatVector2").unwrap().len(), 8);
}

#[test]
fn test_picking_atoms_and_bond_halves() {
    let (spheres, bonds) = chain(&Settings::default());

    let mut hits = spheres.raycast(&Ray::new(Vec3::new(2.0, 0.0, 10.0), Vec3::NEG_Z));
    sort_by_distance(&mut hits);
    assert_eq!(hits[0].chunk_idx, 1);
    assert!((hits[0].distance - 9.5).abs() < 1e-4);

    // between atoms 1 and 2, closer to atom 2: the end half of bond 1
    let hits = bonds.raycast(&Ray::new(Vec3::new(3.5, 0.01, 10.0), Vec3::NEG_Z));
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|h| h.chunk_idx == 3));

    assert!(bonds
        .raycast(&Ray::new(Vec3::new(2.0, 5.0, 10.0), Vec3::NEG_Z))
        .is_empty());
}

#[test]
fn test_highlight_subset() {
    let (spheres, bonds) = chain(&Settings::default());

    // the picked half and its atom
    let bond_part = bonds.get_subset(&[3]).unwrap();
    assert_eq!(bond_part.instance_count(), 1);
    assert_eq!(bond_part.attribute("color").unwrap()[0], HIDDEN_HALF);
    assert_eq!(bond_part.attribute("color2").unwrap(), &[0.0, 0.0, 1.0]);
    assert_eq!(bond_part.bounding_box(), bonds.bounding_box());

    let atom = spheres.get_subset(&[2]).unwrap();
    assert_eq!(atom.attribute("offset").unwrap(), &[4.0, 0.0, 0.0, 0.5]);
}

#[test]
fn test_fading_and_capacity() {
    let (mut spheres, mut bonds) = chain(&Settings::default());
    bonds.set_opacity(&[0, 3], 0.5).unwrap();
    assert_eq!(bonds.alpha(), &[0.5, 0.5]);
    spheres.set_opacity(&[1], 0.2).unwrap();
    assert_eq!(spheres.alpha(), &[1.0, 0.2, 1.0]);

    assert!(matches!(
        bonds.set_item(2, Vec3::ZERO, Vec3::X, 0.1),
        Err(MiewError::IndexOutOfRange { index: 2, count: 2 })
    ));
    assert!(spheres.set_opacity(&[3], 0.5).is_err());
}

#[test]
fn test_upload_bytes() {
    let (spheres, bonds) = chain(&Settings::default());
    for name in ["matVector1", "matVector2", "matVector3"] {
        assert_eq!(bonds.attribute_bytes(name).unwrap().len(), 2 * 4 * 4);
    }
    assert_eq!(bonds.attribute_bytes("alphaColor").unwrap().len(), 2 * 4);
    assert_eq!(spheres.attribute_bytes("offset").unwrap().len(), 3 * 4 * 4);
    assert!(bonds.attribute_bytes("offset").is_none());
}
