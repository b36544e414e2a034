//! Batch map generation over the finished time series.
//!
//! Runs once, after the full simulation+reconstruction loop. The stage is
//! idempotent per `(field, time)` and writes only inside its map output
//! directory. Rendering backends sit behind [`MapRenderer`]; the built-in
//! renderer produces plain grayscale PGM rasters.
//!
//! Grids missing for some time slice (a degraded run) are skipped and
//! counted, never fatal: the stage reports what it could not draw instead of
//! failing the run.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::errors::MapError;
use crate::grid::FieldGrid;
use crate::timeline::TimeSequence;
use crate::xyz;

/// Atmosphere field subdirectories rendered after a run.
pub const ATM_MAP_FIELDS: &[&str] = &[
    "temperature",
    "v_velocity",
    "w_velocity",
    "water_vapour",
    "precipitation",
    "precipitable_water",
    "topography",
    "velocity",
];

/// Hydrosphere field subdirectories rendered after a run.
pub const HYD_MAP_FIELDS: &[&str] = &[
    "temperature",
    "v_velocity",
    "w_velocity",
    "salinity",
    "bottom_water",
    "upwelling",
    "downwelling",
    "velocity",
];

/// A rendering backend for one grid.
pub trait MapRenderer: Send + Sync {
    /// File extension of the produced artifact.
    fn extension(&self) -> &'static str;

    fn render(&self, grid: &FieldGrid, out_path: &Path) -> Result<(), MapError>;
}

/// Grayscale PGM renderer.
///
/// Valid cells are min-max scaled to 1..=255; invalid cells render as 0 so
/// missing data stays visually distinct from any physical value.
#[derive(Debug, Default)]
pub struct PgmRenderer;

impl MapRenderer for PgmRenderer {
    fn extension(&self) -> &'static str {
        "pgm"
    }

    fn render(&self, grid: &FieldGrid, out_path: &Path) -> Result<(), MapError> {
        let (n_lat, n_lon) = grid.shape();
        let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
        for &v in grid.values() {
            if !v.is_nan() {
                lo = lo.min(v);
                hi = hi.max(v);
            }
        }
        let span = if hi > lo { hi - lo } else { 1.0 };

        let io_err = |source| MapError::Io {
            path: out_path.to_path_buf(),
            source,
        };
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut out = Vec::with_capacity(n_lat * n_lon * 4);
        writeln!(out, "P2\n{n_lon} {n_lat}\n255").map_err(io_err)?;
        for j in 0..n_lat {
            let row: Vec<String> = (0..n_lon)
                .map(|k| match grid.value(j, k) {
                    Some(v) => (1.0 + 254.0 * (v - lo) / span).round().to_string(),
                    None => "0".to_string(),
                })
                .collect();
            writeln!(out, "{}", row.join(" ")).map_err(io_err)?;
        }
        fs::write(out_path, out).map_err(io_err)
    }
}

/// One field set to render: which subdirectories, from where, to where.
#[derive(Debug, Clone)]
pub struct MapSet {
    pub fields: Vec<String>,
    pub sim_output_dir: PathBuf,
    pub map_output_dir: PathBuf,
}

impl MapSet {
    pub fn new(
        fields: &[&str],
        sim_output_dir: impl Into<PathBuf>,
        map_output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            sim_output_dir: sim_output_dir.into(),
            map_output_dir: map_output_dir.into(),
        }
    }
}

/// What the stage drew and what it had to skip.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MapSummary {
    pub rendered: usize,
    pub skipped: usize,
}

/// The batch map-generation stage.
pub struct MapStage {
    renderer: Box<dyn MapRenderer>,
    sets: Vec<MapSet>,
}

impl MapStage {
    pub fn new(renderer: Box<dyn MapRenderer>, sets: Vec<MapSet>) -> Self {
        Self { renderer, sets }
    }

    /// Render every field/time artifact for the finished run.
    ///
    /// Fields are independent and render in parallel.
    pub fn create_all_maps(&self, times: &TimeSequence) -> Result<MapSummary, MapError> {
        let mut total = MapSummary::default();
        for set in &self.sets {
            let per_field: Vec<MapSummary> = set
                .fields
                .par_iter()
                .map(|field| self.render_field(set, field, times))
                .collect::<Result<_, MapError>>()?;
            for summary in per_field {
                total.rendered += summary.rendered;
                total.skipped += summary.skipped;
            }
        }
        info!(
            rendered = total.rendered,
            skipped = total.skipped,
            "map generation complete"
        );
        Ok(total)
    }

    fn render_field(
        &self,
        set: &MapSet,
        field: &str,
        times: &TimeSequence,
    ) -> Result<MapSummary, MapError> {
        let mut summary = MapSummary::default();
        for &time in times.times() {
            let input = set
                .sim_output_dir
                .join(field)
                .join(format!("{time}Ma_{field}.xyz"));
            if !input.exists() {
                debug!(field, time, "no grid to render, skipping");
                summary.skipped += 1;
                continue;
            }
            let grid = xyz::read_grid(&input)?;
            let out_path = set
                .map_output_dir
                .join(field)
                .join(format!("{time}Ma_{field}.{}", self.renderer.extension()));
            self.renderer.render(&grid, &out_path)?;
            summary.rendered += 1;
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_field(dir: &Path, field: &str, time: i64) {
        let mut grid = FieldGrid::filled(vec![10.0, -10.0], vec![0.0, 90.0], 5.0);
        grid.set(0, 0, -3.0);
        grid.invalidate(1, 1);
        xyz::write_grid(
            &dir.join(field).join(format!("{time}Ma_{field}.xyz")),
            &grid,
        )
        .unwrap();
    }

    #[test]
    fn renders_available_grids_and_counts_missing_ones() {
        let dir = TempDir::new().unwrap();
        let sim_dir = dir.path().join("output");
        let map_dir = dir.path().join("maps");
        write_field(&sim_dir, "temperature", 0);
        write_field(&sim_dir, "temperature", 1);
        write_field(&sim_dir, "salinity", 0);
        // salinity at 1 Ma is missing: degraded run.

        let stage = MapStage::new(
            Box::new(PgmRenderer),
            vec![MapSet::new(&["temperature", "salinity"], &sim_dir, &map_dir)],
        );
        let times = TimeSequence::new(0, 1, 1).unwrap();

        let summary = stage.create_all_maps(&times).unwrap();
        assert_eq!(summary, MapSummary { rendered: 3, skipped: 1 });
        assert!(map_dir.join("temperature/1Ma_temperature.pgm").exists());
        assert!(!map_dir.join("salinity/1Ma_salinity.pgm").exists());
    }

    #[test]
    fn rerendering_regenerates_the_same_artifact() {
        let dir = TempDir::new().unwrap();
        let sim_dir = dir.path().join("output");
        let map_dir = dir.path().join("maps");
        write_field(&sim_dir, "temperature", 0);

        let stage = MapStage::new(
            Box::new(PgmRenderer),
            vec![MapSet::new(&["temperature"], &sim_dir, &map_dir)],
        );
        let times = TimeSequence::new(0, 0, 1).unwrap();

        stage.create_all_maps(&times).unwrap();
        let artifact = map_dir.join("temperature/0Ma_temperature.pgm");
        let first = fs::read(&artifact).unwrap();
        stage.create_all_maps(&times).unwrap();
        assert_eq!(first, fs::read(&artifact).unwrap());
    }

    #[test]
    fn invalid_cells_render_as_zero() {
        let dir = TempDir::new().unwrap();
        let artifact = dir.path().join("map.pgm");
        let mut grid = FieldGrid::filled(vec![0.0], vec![0.0, 1.0], 4.0);
        grid.invalidate(0, 1);

        PgmRenderer.render(&grid, &artifact).unwrap();
        let contents = fs::read_to_string(&artifact).unwrap();
        let last_line = contents.lines().last().unwrap();
        assert_eq!(last_line, "1 0");
    }

    #[test]
    fn corrupt_grid_surfaces_as_map_error() {
        let dir = TempDir::new().unwrap();
        let sim_dir = dir.path().join("output");
        let field_dir = sim_dir.join("temperature");
        fs::create_dir_all(&field_dir).unwrap();
        fs::write(field_dir.join("0Ma_temperature.xyz"), "garbage line\n").unwrap();

        let stage = MapStage::new(
            Box::new(PgmRenderer),
            vec![MapSet::new(&["temperature"], &sim_dir, dir.path().join("maps"))],
        );
        let times = TimeSequence::new(0, 0, 1).unwrap();

        assert!(matches!(
            stage.create_all_maps(&times),
            Err(MapError::Grid(_))
        ));
    }
}
