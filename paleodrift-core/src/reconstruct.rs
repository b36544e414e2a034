//! Field reconstruction across one time interval.
//!
//! Between two adjacent slices the land/sea configuration drifts, so a field
//! value is only reconstructable where the mask agrees at both endpoints.
//! A coastline-crossing cell is marked invalid rather than interpolated;
//! values are never fabricated across a land/sea transition.
//!
//! Interpolation policy is per field: temperature blends the endpoints
//! linearly, while precipitation and salinity are non-additive across a
//! changing domain and take the later endpoint unchanged.

use std::path::PathBuf;

use tracing::debug;

use crate::bathymetry::{BathymetryProvider, MaskGrid};
use crate::errors::ReconstructionError;
use crate::grid::FieldGrid;
use crate::timeline::Ma;
use crate::xyz;

/// A scalar field tracked by the reconstruction pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Temperature,
    Precipitation,
    Salinity,
}

/// The three fields reconstructed for every interval of a run.
pub const TRACKED_FIELDS: [Field; 3] = [Field::Temperature, Field::Precipitation, Field::Salinity];

/// How endpoint values combine into the reconstructed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationPolicy {
    /// Mean of the two endpoints; the interval midpoint estimate.
    Linear,
    /// The later endpoint unchanged; used where blending is not physical.
    LaterEndpoint,
}

impl Field {
    /// Directory and file-stem name of the field.
    pub fn name(&self) -> &'static str {
        match self {
            Field::Temperature => "temperature",
            Field::Precipitation => "precipitation",
            Field::Salinity => "salinity",
        }
    }

    pub fn policy(&self) -> InterpolationPolicy {
        match self {
            Field::Temperature => InterpolationPolicy::Linear,
            Field::Precipitation | Field::Salinity => InterpolationPolicy::LaterEndpoint,
        }
    }

    /// Whether the field is only meaningful over open water.
    ///
    /// Salinity requires sea at both endpoints; the atmosphere fields only
    /// require the land/sea class not to change across the interval.
    pub fn requires_sea(&self) -> bool {
        matches!(self, Field::Salinity)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One reconstructed field over one adjacent interval.
#[derive(Debug)]
pub struct ReconstructedInterval {
    pub field: Field,
    pub time_a: Ma,
    pub time_b: Ma,
    pub variant: String,
    pub grid: FieldGrid,
    /// Where the grid was persisted.
    pub path: PathBuf,
}

/// Reconstructs fields between adjacent slices for a fixed mask variant.
#[derive(Debug)]
pub struct ReconstructionEngine {
    provider: BathymetryProvider,
    sim_output_dir: PathBuf,
    recon_output_dir: PathBuf,
}

impl ReconstructionEngine {
    pub fn new(
        provider: BathymetryProvider,
        sim_output_dir: impl Into<PathBuf>,
        recon_output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            provider,
            sim_output_dir: sim_output_dir.into(),
            recon_output_dir: recon_output_dir.into(),
        }
    }

    /// Simulator output location for a field at a time slice.
    pub fn input_path(&self, field: Field, time: Ma) -> PathBuf {
        self.sim_output_dir
            .join(field.name())
            .join(format!("{time}Ma_{}.xyz", field.name()))
    }

    /// Persisted reconstruction location, keyed by `(field, time_a, variant)`.
    pub fn output_path(&self, field: Field, time_a: Ma) -> PathBuf {
        let variant = &self.provider.variant().name;
        self.recon_output_dir.join(field.name()).join(format!(
            "{time_a}Ma_{}_reconstructed_{variant}.xyz",
            field.name()
        ))
    }

    /// Reconstruct `field` over the adjacent interval `(time_a, time_b)` and
    /// persist the result.
    ///
    /// Re-running with unchanged inputs rewrites a bit-identical grid.
    pub fn reconstruct(
        &self,
        field: Field,
        time_a: Ma,
        time_b: Ma,
    ) -> Result<ReconstructedInterval, ReconstructionError> {
        let mask_a = self.provider.load_mask(time_a)?;
        let mask_b = self.provider.load_mask(time_b)?;
        if mask_a.shape() != mask_b.shape() {
            return Err(ReconstructionError::MaskMismatch {
                time_a,
                time_b,
                shape_a: mask_a.shape(),
                shape_b: mask_b.shape(),
            });
        }

        let grid_a = self.load_input(field, time_a, &mask_a)?;
        let grid_b = self.load_input(field, time_b, &mask_b)?;

        let (n_lat, n_lon) = mask_a.shape();
        let mut result = FieldGrid::filled(grid_b.lats().to_vec(), grid_b.lons().to_vec(), f64::NAN);
        for j in 0..n_lat {
            for k in 0..n_lon {
                if !cell_consistent(field, &mask_a, &mask_b, j, k) {
                    continue;
                }
                match reconstruct_cell(field.policy(), grid_a.value(j, k), grid_b.value(j, k)) {
                    Some(value) => result.set(j, k, value),
                    None => result.invalidate(j, k),
                }
            }
        }

        let path = self.output_path(field, time_a);
        xyz::write_grid(&path, &result)?;
        debug!(
            %field,
            time_a,
            time_b,
            valid = result.valid_count(),
            "reconstructed interval"
        );

        Ok(ReconstructedInterval {
            field,
            time_a,
            time_b,
            variant: self.provider.variant().name.clone(),
            grid: result,
            path,
        })
    }

    fn load_input(
        &self,
        field: Field,
        time: Ma,
        mask: &MaskGrid,
    ) -> Result<FieldGrid, ReconstructionError> {
        let path = self.input_path(field, time);
        if !path.exists() {
            return Err(ReconstructionError::MissingInput {
                field: field.name(),
                time,
                path,
            });
        }
        let grid = xyz::read_grid(&path)?;
        if grid.shape() != mask.shape() {
            return Err(ReconstructionError::GridMismatch {
                field: field.name(),
                time,
                grid: grid.shape(),
                mask: mask.shape(),
            });
        }
        Ok(grid)
    }
}

/// Mask agreement for one cell, per field semantics.
fn cell_consistent(field: Field, mask_a: &MaskGrid, mask_b: &MaskGrid, j: usize, k: usize) -> bool {
    if !mask_a.is_defined(j, k) || !mask_b.is_defined(j, k) {
        return false;
    }
    if field.requires_sea() {
        mask_a.is_sea(j, k) && mask_b.is_sea(j, k)
    } else {
        mask_a.is_sea(j, k) == mask_b.is_sea(j, k)
    }
}

/// Combine endpoint values; `None` when a required endpoint is itself invalid.
fn reconstruct_cell(
    policy: InterpolationPolicy,
    value_a: Option<f64>,
    value_b: Option<f64>,
) -> Option<f64> {
    match policy {
        InterpolationPolicy::Linear => Some(0.5 * (value_a? + value_b?)),
        InterpolationPolicy::LaterEndpoint => value_b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bathymetry::{write_mask, MaskVariant};
    use approx::assert_relative_eq;
    use ndarray::array;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// 1x4 world: columns are (sea/sea, land/land, sea->land, land->sea).
    fn fixture(dir: &Path) -> ReconstructionEngine {
        let variant = MaskVariant::new("golonka", dir.join("topo"), "Golonka");

        let lats = vec![0.0];
        let lons = vec![0.0, 90.0, 180.0, 270.0];
        let mask_a = MaskGrid::new(FieldGrid::new(
            lats.clone(),
            lons.clone(),
            array![[-1000.0, 500.0, -200.0, 80.0]],
        ));
        let mask_b = MaskGrid::new(FieldGrid::new(
            lats.clone(),
            lons.clone(),
            array![[-900.0, 480.0, 120.0, -40.0]],
        ));
        write_mask(&variant.mask_path(0), &mask_a).unwrap();
        write_mask(&variant.mask_path(1), &mask_b).unwrap();

        let sim_dir = dir.join("output");
        let engine = ReconstructionEngine::new(
            BathymetryProvider::new(variant),
            &sim_dir,
            &sim_dir,
        );

        for field in TRACKED_FIELDS {
            let offset = match field {
                Field::Temperature => 10.0,
                Field::Precipitation => 100.0,
                Field::Salinity => 30.0,
            };
            for time in [0, 1] {
                let values = FieldGrid::new(
                    lats.clone(),
                    lons.clone(),
                    array![[
                        offset + time as f64,
                        offset + 1.0 + time as f64,
                        offset + 2.0 + time as f64,
                        offset + 3.0 + time as f64,
                    ]],
                );
                xyz::write_grid(&engine.input_path(field, time), &values).unwrap();
            }
        }
        engine
    }

    #[test]
    fn temperature_blends_endpoints_where_mask_agrees() {
        let dir = TempDir::new().unwrap();
        let engine = fixture(dir.path());

        let interval = engine.reconstruct(Field::Temperature, 0, 1).unwrap();
        // Sea at both endpoints: midpoint of 10 and 11.
        assert_relative_eq!(interval.grid.value(0, 0).unwrap(), 10.5);
        // Land at both endpoints: still valid for an atmosphere field.
        assert_relative_eq!(interval.grid.value(0, 1).unwrap(), 11.5);
    }

    #[test]
    fn coastline_crossings_are_invalid_never_fabricated() {
        let dir = TempDir::new().unwrap();
        let engine = fixture(dir.path());

        for field in TRACKED_FIELDS {
            let interval = engine.reconstruct(field, 0, 1).unwrap();
            assert_eq!(interval.grid.value(0, 2), None, "{field}: sea -> land");
            assert_eq!(interval.grid.value(0, 3), None, "{field}: land -> sea");
        }
    }

    #[test]
    fn salinity_requires_sea_at_both_endpoints() {
        let dir = TempDir::new().unwrap();
        let engine = fixture(dir.path());

        let interval = engine.reconstruct(Field::Salinity, 0, 1).unwrap();
        // Sea/sea cell takes the later endpoint, not a blend.
        assert_relative_eq!(interval.grid.value(0, 0).unwrap(), 31.0);
        // Land/land is consistent for atmosphere fields but not for salinity.
        assert_eq!(interval.grid.value(0, 1), None);
    }

    #[test]
    fn precipitation_takes_the_later_endpoint() {
        let dir = TempDir::new().unwrap();
        let engine = fixture(dir.path());

        let interval = engine.reconstruct(Field::Precipitation, 0, 1).unwrap();
        assert_relative_eq!(interval.grid.value(0, 0).unwrap(), 101.0);
    }

    #[test]
    fn missing_simulator_output_is_reported_per_endpoint() {
        let dir = TempDir::new().unwrap();
        let engine = fixture(dir.path());
        fs::remove_file(engine.input_path(Field::Salinity, 1)).unwrap();

        let err = engine.reconstruct(Field::Salinity, 0, 1).unwrap_err();
        assert!(
            matches!(
                err,
                ReconstructionError::MissingInput {
                    field: "salinity",
                    time: 1,
                    ..
                }
            ),
            "{err}"
        );
    }

    #[test]
    fn incompatible_mask_shapes_are_rejected() {
        let dir = TempDir::new().unwrap();
        let engine = fixture(dir.path());

        // Overwrite the second mask with a smaller grid.
        let small = MaskGrid::new(FieldGrid::filled(vec![0.0], vec![0.0], -5.0));
        write_mask(&engine.provider.variant().mask_path(1), &small).unwrap();

        let err = engine.reconstruct(Field::Temperature, 0, 1).unwrap_err();
        assert!(matches!(err, ReconstructionError::MaskMismatch { .. }), "{err}");
    }

    #[test]
    fn reconstruction_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let engine = fixture(dir.path());

        let first = engine.reconstruct(Field::Temperature, 0, 1).unwrap();
        let bytes_first = fs::read(&first.path).unwrap();
        let second = engine.reconstruct(Field::Temperature, 0, 1).unwrap();
        let bytes_second = fs::read(&second.path).unwrap();
        assert_eq!(bytes_first, bytes_second);
    }

    #[test]
    fn output_is_keyed_by_field_time_and_variant() {
        let dir = TempDir::new().unwrap();
        let engine = fixture(dir.path());

        let interval = engine.reconstruct(Field::Temperature, 0, 1).unwrap();
        assert!(interval
            .path
            .ends_with("temperature/0Ma_temperature_reconstructed_golonka.xyz"));
        assert!(interval.path.exists());
    }
}
