//! Settings for surface building and instanced geometry.
//!
//! Settings serialize to JSON. Missing fields fall back to their defaults, so
//! a partial document such as `{"resolution": "High"}` is a valid settings file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MiewError, Result};

/// Geometry resolution preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Resolution {
    Poor,
    Low,
    #[default]
    Medium,
    High,
    Ultra,
}

/// A value that depends on the active [`Resolution`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerResolution<T> {
    pub poor: T,
    pub low: T,
    pub medium: T,
    pub high: T,
    pub ultra: T,
}

impl<T: Copy> PerResolution<T> {
    /// Creates a table from values ordered poor to ultra.
    pub fn new(values: [T; 5]) -> Self {
        let [poor, low, medium, high, ultra] = values;
        Self {
            poor,
            low,
            medium,
            high,
            ultra,
        }
    }

    /// Value for the given resolution.
    #[must_use]
    pub fn get(&self, resolution: Resolution) -> T {
        match resolution {
            Resolution::Poor => self.poor,
            Resolution::Low => self.low,
            Resolution::Medium => self.medium,
            Resolution::High => self.high,
            Resolution::Ultra => self.ultra,
        }
    }
}

/// Gaussian-density surface settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuickSurfSettings {
    /// Density level of the extracted surface.
    pub iso_value: f32,
    /// Atom radius multiplier.
    pub scale: f32,
    /// Kernel cutoff in units of the scaled radius.
    pub gauss_lim: PerResolution<f32>,
    /// Voxel size in angstroms.
    pub grid_spacing: PerResolution<f32>,
}

impl Default for QuickSurfSettings {
    fn default() -> Self {
        Self {
            iso_value: 0.5,
            scale: 1.0,
            gauss_lim: PerResolution::new([1.5, 2.0, 2.5, 3.0, 4.0]),
            grid_spacing: PerResolution::new([2.0, 1.5, 1.0, 0.5, 0.25]),
        }
    }
}

/// Contact surface settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactSurfSettings {
    /// Solvent probe radius.
    pub probe_radius: f32,
    /// Distance level of the extracted surface.
    pub iso_value: f32,
    /// Probe placements sampled around each torus.
    pub probe_positions: usize,
    /// Grid points per angstrom.
    pub poly_complexity: PerResolution<f32>,
}

impl Default for ContactSurfSettings {
    fn default() -> Self {
        Self {
            probe_radius: 1.4,
            iso_value: 1.5,
            probe_positions: 30,
            poly_complexity: PerResolution::new([0.5, 1.0, 1.5, 1.75, 2.0]),
        }
    }
}

/// Look-back window for merging coincident vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionSettings {
    pub offset: usize,
    pub len: usize,
}

impl Default for FusionSettings {
    fn default() -> Self {
        Self { offset: 9, len: 9 }
    }
}

/// Instanced sphere and cylinder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstancingSettings {
    /// Whether instances also carry inverse transform rows for impostor rendering.
    pub z_sprites: bool,
    /// Radial segments of bond cylinders.
    pub cylinder_segments: PerResolution<u32>,
    /// Segments of atom spheres from pole to pole; twice as many run around.
    pub sphere_segments: PerResolution<u32>,
}

impl Default for InstancingSettings {
    fn default() -> Self {
        Self {
            z_sprites: false,
            cylinder_segments: PerResolution::new([3, 4, 6, 12, 32]),
            sphere_segments: PerResolution::new([4, 6, 8, 16, 32]),
        }
    }
}

/// All settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub resolution: Resolution,
    pub quick_surf: QuickSurfSettings,
    pub contact_surf: ContactSurfSettings,
    pub fusion: FusionSettings,
    pub instancing: InstancingSettings,
}

fn is_positive(v: f32) -> bool {
    v.is_finite() && v > 0.0
}

/// Resolved Gaussian-density parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuickSurfParams {
    pub iso_value: f32,
    pub rad_scale: f32,
    pub gauss_lim: f32,
    pub grid_spacing: f32,
}

impl QuickSurfParams {
    /// Rejects values the splatter cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !is_positive(self.grid_spacing) {
            return Err(MiewError::InvalidParameter(format!(
                "grid spacing must be positive, got {}",
                self.grid_spacing
            )));
        }
        if self.iso_value == 0.0 || !self.iso_value.is_finite() {
            return Err(MiewError::InvalidParameter(format!(
                "iso value must be finite and non-zero, got {}",
                self.iso_value
            )));
        }
        if !is_positive(self.rad_scale) || !is_positive(self.gauss_lim) {
            return Err(MiewError::InvalidParameter(format!(
                "radius scale and gauss limit must be positive, got {} and {}",
                self.rad_scale, self.gauss_lim
            )));
        }
        Ok(())
    }
}

/// Resolved contact surface parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactSurfParams {
    pub probe_radius: f32,
    pub iso_value: f32,
    pub probe_positions: usize,
    /// Grid points per angstrom; the grid spacing is its reciprocal.
    pub scale_factor: f32,
}

impl ContactSurfParams {
    /// Rejects values the projector cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !is_positive(self.scale_factor) {
            return Err(MiewError::InvalidParameter(format!(
                "scale factor must be positive, got {}",
                self.scale_factor
            )));
        }
        if self.probe_radius < 0.0 || self.probe_positions == 0 {
            return Err(MiewError::InvalidParameter(format!(
                "bad probe: radius {}, {} positions",
                self.probe_radius, self.probe_positions
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn grid_spacing(&self) -> f32 {
        1.0 / self.scale_factor
    }
}

impl Settings {
    /// Parses settings from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes settings to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reads settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json(&text)?;
        log::debug!("loaded settings from {}", path.as_ref().display());
        Ok(settings)
    }

    /// Writes settings to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Gaussian-density parameters at the current resolution.
    #[must_use]
    pub fn quick_surf_params(&self) -> QuickSurfParams {
        let qs = &self.quick_surf;
        QuickSurfParams {
            iso_value: qs.iso_value,
            rad_scale: qs.scale,
            gauss_lim: qs.gauss_lim.get(self.resolution),
            grid_spacing: qs.grid_spacing.get(self.resolution),
        }
    }

    /// Contact surface parameters at the current resolution.
    #[must_use]
    pub fn contact_surf_params(&self) -> ContactSurfParams {
        let cs = &self.contact_surf;
        ContactSurfParams {
            probe_radius: cs.probe_radius,
            iso_value: cs.iso_value,
            probe_positions: cs.probe_positions,
            scale_factor: cs.poly_complexity.get(self.resolution),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.resolution, Resolution::Medium);
        assert_eq!(settings.fusion, FusionSettings { offset: 9, len: 9 });

        let qs = settings.quick_surf_params();
        assert_eq!(qs.iso_value, 0.5);
        assert_eq!(qs.gauss_lim, 2.5);
        assert_eq!(qs.grid_spacing, 1.0);
        assert!(qs.validate().is_ok());

        let cs = settings.contact_surf_params();
        assert_eq!(cs.scale_factor, 1.5);
        assert!((cs.grid_spacing() - 1.0 / 1.5).abs() < 1e-6);
        assert!(cs.validate().is_ok());
    }

    #[test]
    fn test_resolution_lookup() {
        let table = PerResolution::new([1, 2, 3, 4, 5]);
        assert_eq!(table.get(Resolution::Poor), 1);
        assert_eq!(table.get(Resolution::Ultra), 5);
    }

    #[test]
    fn test_partial_json() {
        let settings =
            Settings::from_json(r#"{"resolution": "High", "quick_surf": {"iso_value": 0.8}}"#)
                .unwrap();
        assert_eq!(settings.resolution, Resolution::High);
        assert_eq!(settings.quick_surf.iso_value, 0.8);
        assert_eq!(settings.quick_surf.scale, 1.0);
        assert_eq!(settings.quick_surf_params().grid_spacing, 0.5);
        assert_eq!(settings.contact_surf.probe_positions, 30);
    }

    #[test]
    fn test_json_round_trip() {
        let mut settings = Settings::default();
        settings.instancing.z_sprites = true;
        settings.fusion.len = 4;
        let back = Settings::from_json(&settings.to_json().unwrap()).unwrap();
        assert!(back.instancing.z_sprites);
        assert_eq!(back.fusion.len, 4);
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            Settings::from_json("{not json"),
            Err(MiewError::JsonError(_))
        ));
    }

    #[test]
    fn test_invalid_params() {
        let mut qs = Settings::default().quick_surf_params();
        qs.grid_spacing = 0.0;
        assert!(matches!(qs.validate(), Err(MiewError::InvalidParameter(_))));
        qs.grid_spacing = 1.0;
        qs.iso_value = 0.0;
        assert!(qs.validate().is_err());
    }
}
