//! Land/sea mask resolution from the paleo-bathymetry dataset.
//!
//! The dataset is a directory of per-time elevation grids named
//! `<time>Ma_<suffix>.xyz`, where the suffix identifies the reconstruction
//! variant. The provider is read-only and deterministic: the same time and
//! variant always yield the same mask.

use std::path::{Path, PathBuf};

use crate::config::RunVariant;
use crate::errors::ReconstructionError;
use crate::grid::FieldGrid;
use crate::timeline::Ma;
use crate::xyz;

/// The bathymetry dataset selected for a whole run.
#[derive(Debug, Clone)]
pub struct MaskVariant {
    pub name: String,
    pub topo_dir: PathBuf,
    pub suffix: String,
}

impl MaskVariant {
    pub fn new(name: impl Into<String>, topo_dir: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            topo_dir: topo_dir.into(),
            suffix: suffix.into(),
        }
    }

    pub fn from_run_variant(name: &str, variant: &RunVariant) -> Self {
        Self::new(name, variant.topo_dir.clone(), variant.topo_suffix.clone())
    }

    pub fn mask_path(&self, time: Ma) -> PathBuf {
        self.topo_dir.join(format!("{time}Ma_{}.xyz", self.suffix))
    }
}

/// Elevation grid interpreted as a land/sea mask.
///
/// Elevation below zero is sea. A cell with no elevation value is undefined
/// and never counts as either class.
#[derive(Debug, Clone)]
pub struct MaskGrid {
    elevation: FieldGrid,
}

impl MaskGrid {
    pub fn new(elevation: FieldGrid) -> Self {
        Self { elevation }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.elevation.shape()
    }

    pub fn is_defined(&self, j: usize, k: usize) -> bool {
        self.elevation.is_valid(j, k)
    }

    pub fn is_sea(&self, j: usize, k: usize) -> bool {
        self.elevation.value(j, k).is_some_and(|e| e < 0.0)
    }

    pub fn is_land(&self, j: usize, k: usize) -> bool {
        self.elevation.value(j, k).is_some_and(|e| e >= 0.0)
    }

    pub fn elevation(&self) -> &FieldGrid {
        &self.elevation
    }
}

/// Resolves masks for a fixed [`MaskVariant`].
#[derive(Debug)]
pub struct BathymetryProvider {
    variant: MaskVariant,
}

impl BathymetryProvider {
    pub fn new(variant: MaskVariant) -> Self {
        Self { variant }
    }

    pub fn variant(&self) -> &MaskVariant {
        &self.variant
    }

    /// Load the mask for `time`.
    ///
    /// An absent dataset file is reported as missing input: reconstruction
    /// for that interval cannot proceed, but the run can.
    pub fn load_mask(&self, time: Ma) -> Result<MaskGrid, ReconstructionError> {
        let path = self.variant.mask_path(time);
        if !path.exists() {
            return Err(ReconstructionError::MissingInput {
                field: "bathymetry",
                time,
                path,
            });
        }
        let elevation = xyz::read_grid(&path)?;
        Ok(MaskGrid::new(elevation))
    }
}

/// Write a mask grid for tests and tooling.
pub fn write_mask(path: &Path, mask: &MaskGrid) -> Result<(), ReconstructionError> {
    xyz::write_grid(path, mask.elevation()).map_err(ReconstructionError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::tempdir;

    fn variant(dir: &Path) -> MaskVariant {
        MaskVariant::new("golonka", dir, "Golonka")
    }

    #[test]
    fn mask_path_follows_dataset_naming() {
        let variant = variant(Path::new("data/topo"));
        assert_eq!(
            variant.mask_path(140),
            PathBuf::from("data/topo/140Ma_Golonka.xyz")
        );
    }

    #[test]
    fn classifies_sea_land_and_undefined_cells() {
        let elevation = FieldGrid::new(
            vec![0.0],
            vec![0.0, 1.0, 2.0],
            array![[-4000.0, 350.0, f64::NAN]],
        );
        let mask = MaskGrid::new(elevation);

        assert!(mask.is_sea(0, 0));
        assert!(!mask.is_land(0, 0));

        assert!(mask.is_land(0, 1));
        assert!(!mask.is_sea(0, 1));

        assert!(!mask.is_defined(0, 2));
        assert!(!mask.is_sea(0, 2));
        assert!(!mask.is_land(0, 2));
    }

    #[test]
    fn loads_mask_for_a_time_slice() {
        let dir = tempdir().unwrap();
        let variant = variant(dir.path());
        let mask = MaskGrid::new(FieldGrid::new(
            vec![10.0, -10.0],
            vec![0.0, 120.0],
            array![[-100.0, 20.0], [-3000.0, -1.0]],
        ));
        write_mask(&variant.mask_path(30), &mask).unwrap();

        let provider = BathymetryProvider::new(variant);
        let loaded = provider.load_mask(30).unwrap();
        assert_eq!(loaded.shape(), (2, 2));
        assert!(loaded.is_sea(1, 1));
        assert!(loaded.is_land(0, 1));
    }

    #[test]
    fn missing_dataset_file_is_missing_input() {
        let dir = tempdir().unwrap();
        let provider = BathymetryProvider::new(variant(dir.path()));

        let err = provider.load_mask(999).unwrap_err();
        assert!(
            matches!(
                err,
                ReconstructionError::MissingInput {
                    field: "bathymetry",
                    time: 999,
                    ..
                }
            ),
            "{err}"
        );
    }
}
