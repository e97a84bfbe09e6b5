//! Packed atom-sphere input.
//!
//! Surface algorithms read atoms as three parallel arrays: `(x, y, z, radius)`
//! quadruples, `(r, g, b)` colors, and the [`AtomId`] each sphere came from.
//! The pipeline never mutates them; algorithms that need shifted positions
//! make their own copy.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{MiewError, Result};

/// Index of an atom in the caller's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AtomId(pub u32);

impl AtomId {
    /// The raw arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for AtomId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Packed atom spheres with per-atom colors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackedAtoms {
    /// `(x, y, z, radius)` per atom.
    pub pos_rad: Vec<f32>,
    /// `(r, g, b)` per atom.
    pub colors: Vec<f32>,
    /// Source atom per sphere.
    pub atoms: Vec<AtomId>,
}

impl PackedAtoms {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty set with room for `n` atoms.
    pub fn with_capacity(n: usize) -> Self {
        Self {
            pos_rad: Vec::with_capacity(n * 4),
            colors: Vec::with_capacity(n * 3),
            atoms: Vec::with_capacity(n),
        }
    }

    /// Appends an atom.
    pub fn push(&mut self, pos: Vec3, radius: f32, color: Vec3, id: AtomId) {
        self.pos_rad.extend_from_slice(&[pos.x, pos.y, pos.z, radius]);
        self.colors.extend_from_slice(&color.to_array());
        self.atoms.push(id);
    }

    /// Moves atom `idx`.
    pub fn set_item(&mut self, idx: usize, pos: Vec3, radius: f32) -> Result<()> {
        let count = self.len();
        let slot = self
            .pos_rad
            .get_mut(idx * 4..idx * 4 + 4)
            .ok_or_else(|| MiewError::out_of_range(idx, count))?;
        slot.copy_from_slice(&[pos.x, pos.y, pos.z, radius]);
        Ok(())
    }

    /// Recolors atom `idx`.
    pub fn set_color(&mut self, idx: usize, color: Vec3) -> Result<()> {
        let count = self.len();
        let slot = self
            .colors
            .get_mut(idx * 3..idx * 3 + 3)
            .ok_or_else(|| MiewError::out_of_range(idx, count))?;
        slot.copy_from_slice(&color.to_array());
        Ok(())
    }

    /// Number of atoms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    /// Returns true if there are no atoms.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    #[must_use]
    pub fn position(&self, i: usize) -> Vec3 {
        Vec3::from_slice(&self.pos_rad[i * 4..i * 4 + 3])
    }

    #[must_use]
    pub fn radius(&self, i: usize) -> f32 {
        self.pos_rad[i * 4 + 3]
    }

    #[must_use]
    pub fn color(&self, i: usize) -> Vec3 {
        Vec3::from_slice(&self.colors[i * 3..i * 3 + 3])
    }

    /// Per-component minimum and maximum of `(x, y, z, radius)`.
    ///
    /// Returns infinities for an empty set.
    #[must_use]
    pub fn min_max(&self) -> ([f32; 4], [f32; 4]) {
        let mut lo = [f32::INFINITY; 4];
        let mut hi = [f32::NEG_INFINITY; 4];
        for quad in self.pos_rad.chunks_exact(4) {
            for c in 0..4 {
                lo[c] = lo[c].min(quad[c]);
                hi[c] = hi[c].max(quad[c]);
            }
        }
        (lo, hi)
    }

    /// Checks that the three arrays describe the same number of atoms and
    /// that every position and radius is finite.
    pub fn validate(&self) -> Result<()> {
        let n = self.atoms.len();
        if self.pos_rad.len() != n * 4 {
            return Err(MiewError::SizeMismatch {
                expected: n * 4,
                actual: self.pos_rad.len(),
            });
        }
        if self.colors.len() != n * 3 {
            return Err(MiewError::SizeMismatch {
                expected: n * 3,
                actual: self.colors.len(),
            });
        }
        if let Some(i) = self.pos_rad.iter().position(|v| !v.is_finite()) {
            return Err(MiewError::InvalidParameter(format!(
                "atom {} has a non-finite position or radius",
                i / 4
            )));
        }
        Ok(())
    }
}
