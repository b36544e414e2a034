//! Gridded field values on a regular lat/lon grid.
//!
//! Cells that are not physically meaningful carry NaN and are reported as
//! invalid; they are never silently zero. The NaN encoding matches the
//! on-disk `.xyz` representation, so a grid round-trips without a separate
//! validity layer.

use ndarray::Array2;

/// A 2-D scalar field on a regular lat-major grid.
///
/// Rows are latitudes, columns longitudes, matching the row ordering of the
/// `.xyz` files the solvers and datasets use.
#[derive(Debug, Clone)]
pub struct FieldGrid {
    lats: Vec<f64>,
    lons: Vec<f64>,
    values: Array2<f64>,
}

impl FieldGrid {
    /// Build a grid from coordinate axes and values.
    ///
    /// # Panics
    ///
    /// Panics if `values` is not `(lats.len(), lons.len())`.
    pub fn new(lats: Vec<f64>, lons: Vec<f64>, values: Array2<f64>) -> Self {
        assert_eq!(
            values.dim(),
            (lats.len(), lons.len()),
            "grid values do not match the coordinate axes"
        );
        Self { lats, lons, values }
    }

    /// A grid with every cell set to `fill`.
    pub fn filled(lats: Vec<f64>, lons: Vec<f64>, fill: f64) -> Self {
        let values = Array2::from_elem((lats.len(), lons.len()), fill);
        Self::new(lats, lons, values)
    }

    /// `(n_lat, n_lon)`
    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Raw cell value, NaN if the cell is invalid.
    pub fn raw(&self, j: usize, k: usize) -> f64 {
        self.values[[j, k]]
    }

    /// Cell value, `None` if the cell is invalid.
    pub fn value(&self, j: usize, k: usize) -> Option<f64> {
        let v = self.values[[j, k]];
        (!v.is_nan()).then_some(v)
    }

    pub fn is_valid(&self, j: usize, k: usize) -> bool {
        !self.values[[j, k]].is_nan()
    }

    pub fn set(&mut self, j: usize, k: usize, value: f64) {
        self.values[[j, k]] = value;
    }

    /// Mark a cell as invalid/undefined.
    pub fn invalidate(&mut self, j: usize, k: usize) {
        self.values[[j, k]] = f64::NAN;
    }

    /// Number of valid cells.
    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_nan()).count()
    }
}
