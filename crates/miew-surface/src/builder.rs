//! Surface building: grid fit, field computation, extraction, fusion, coloring.
//!
//! A [`SurfaceAlgorithm`] turns atoms into a density field, a color field and,
//! when visibility filtering is requested, a dominant-atom map. The
//! [`VolumeSurfaceBuilder`] runs the rest of the pipeline the same way for
//! every algorithm.

use std::time::Instant;

use miew_core::{
    AtomId, FusionSettings, PackedAtoms, Result, SurfaceMesh, VisibilitySelector, Volume,
};

use crate::colorizer::AtomField;
use crate::grid::GridLayout;
use crate::marching_cubes::IsoSurface;

/// Fields sampled on the grid of a [`GridLayout`].
#[derive(Debug, Clone)]
pub struct SurfaceFields {
    /// Scalar field whose isosurface is extracted.
    pub density: Volume,
    /// RGB field sampled at each vertex.
    pub colors: Volume,
    /// Contribution of the dominant atom at each voxel.
    pub atom_weights: Option<Volume>,
    /// Dominant atom at each voxel, indexed like `atom_weights`.
    pub atom_map: Option<Vec<Option<AtomId>>>,
}

impl SurfaceFields {
    /// Zeroed fields for `layout`, with a dominant-atom map if `track_atoms`.
    pub fn new(layout: &GridLayout, track_atoms: bool) -> Result<Self> {
        let bbox = layout.bbox();
        let density = Volume::new(layout.dims, bbox, 1)?;
        let colors = Volume::new(layout.dims, bbox, 3)?;
        let (atom_weights, atom_map) = if track_atoms {
            (
                Some(Volume::new(layout.dims, bbox, 1)?),
                Some(vec![None; layout.num_voxels()]),
            )
        } else {
            (None, None)
        };
        Ok(Self {
            density,
            colors,
            atom_weights,
            atom_map,
        })
    }

    /// The dominant-atom data, if it was tracked.
    #[must_use]
    pub fn atom_field(&self) -> Option<AtomField<'_>> {
        match (&self.atom_weights, &self.atom_map) {
            (Some(weights), Some(atoms)) => Some(AtomField { weights, atoms }),
            _ => None,
        }
    }
}

/// Computes the fields a surface is extracted from.
pub trait SurfaceAlgorithm {
    /// Short name used in log messages.
    fn name(&self) -> &'static str;

    /// Requested voxel size; the grid fit may enlarge it for very large atoms.
    fn grid_spacing(&self) -> f32;

    /// Radius multiplier used when padding the grid.
    fn rad_scale(&self) -> f32;

    /// Level of the extracted surface.
    fn iso_value(&self) -> f32;

    /// Fills the fields for `atoms` on `layout`.
    fn compute_surface(
        &self,
        atoms: &PackedAtoms,
        layout: &GridLayout,
        track_atoms: bool,
    ) -> Result<SurfaceFields>;
}

/// Runs a [`SurfaceAlgorithm`] through extraction, fusion and coloring.
#[derive(Debug, Clone)]
pub struct VolumeSurfaceBuilder<A> {
    algorithm: A,
    fusion: FusionSettings,
}

impl<A: SurfaceAlgorithm> VolumeSurfaceBuilder<A> {
    pub fn new(algorithm: A) -> Self {
        Self {
            algorithm,
            fusion: FusionSettings::default(),
        }
    }

    /// Sets the vertex fusion window.
    #[must_use]
    pub fn fusion(mut self, offset: usize, len: usize) -> Self {
        self.fusion = FusionSettings { offset, len };
        self
    }

    pub fn algorithm(&self) -> &A {
        &self.algorithm
    }

    /// Builds the surface of `atoms`.
    ///
    /// With a selector, vertices owned by unselected atoms are dropped.
    /// No atoms, or a field that never reaches the isovalue, give an empty mesh.
    pub fn build(
        &self,
        atoms: &PackedAtoms,
        selector: Option<&dyn VisibilitySelector>,
    ) -> Result<SurfaceMesh> {
        atoms.validate()?;
        let name = self.algorithm.name();
        if atoms.is_empty() {
            log::warn!("{name}: no atoms, building an empty surface");
            return Ok(SurfaceMesh::default());
        }

        let start = Instant::now();
        let layout = GridLayout::fit(atoms, self.algorithm.grid_spacing(), self.algorithm.rad_scale())?;
        log::debug!(
            "{name}: {} atoms on a {:?} grid, spacing {}",
            atoms.len(),
            layout.dims,
            layout.grid_spacing
        );

        let fields = self
            .algorithm
            .compute_surface(atoms, &layout, selector.is_some())?;
        log::debug!("{name}: fields computed in {:?}", start.elapsed());

        let mut surface = IsoSurface::new();
        surface.compute(&fields.density, layout.origin, self.algorithm.iso_value(), 1)?;
        surface.vertex_fusion(self.fusion.offset, self.fusion.len);
        if surface.num_triangles() > 0 {
            surface.set_color_vol_tex(&fields.colors, fields.atom_field(), selector)?;
        }

        log::debug!(
            "{name}: {} vertices, {} triangles in {:?}",
            surface.num_vertices(),
            surface.num_triangles(),
            start.elapsed()
        );
        Ok(surface.into_mesh())
    }
}
