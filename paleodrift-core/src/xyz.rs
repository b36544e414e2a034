//! The `lon lat value` text grid format used throughout the pipeline.
//!
//! Bathymetry datasets, solver outputs and reconstructed grids all use this
//! layout: one whitespace-separated row per cell, latitude-major with
//! longitude varying fastest, `NaN` for invalid cells. The writer is
//! deterministic so that re-running a reconstruction with unchanged inputs
//! produces bit-identical files.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use thiserror::Error;

use crate::grid::FieldGrid;

#[derive(Debug, Error)]
pub enum XyzError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: malformed row: {message}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("{}: inconsistent grid layout: {message}", path.display())]
    Shape { path: PathBuf, message: String },

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Read a grid file, inferring the lat/lon dimensions from the row layout.
pub fn read_grid(path: &Path) -> Result<FieldGrid, XyzError> {
    let contents = fs::read_to_string(path).map_err(|source| XyzError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut rows: Vec<(f64, f64, f64)> = Vec::new();
    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tokens = line.split_whitespace();
        let mut next = |what: &str| -> Result<f64, XyzError> {
            let token = tokens.next().ok_or_else(|| XyzError::Malformed {
                path: path.to_path_buf(),
                line: idx + 1,
                message: format!("missing {what} column"),
            })?;
            token.parse().map_err(|_| XyzError::Malformed {
                path: path.to_path_buf(),
                line: idx + 1,
                message: format!("unparseable {what} value {token:?}"),
            })
        };
        let lon = next("longitude")?;
        let lat = next("latitude")?;
        let value = next("data")?;
        if tokens.next().is_some() {
            return Err(XyzError::Malformed {
                path: path.to_path_buf(),
                line: idx + 1,
                message: "trailing columns".to_string(),
            });
        }
        rows.push((lon, lat, value));
    }

    if rows.is_empty() {
        return Err(XyzError::Shape {
            path: path.to_path_buf(),
            message: "no data rows".to_string(),
        });
    }

    // Longitude varies fastest: the first latitude's run length is the row
    // width of the whole grid.
    let first_lat = rows[0].1;
    let n_lon = rows.iter().take_while(|r| r.1 == first_lat).count();
    if rows.len() % n_lon != 0 {
        return Err(XyzError::Shape {
            path: path.to_path_buf(),
            message: format!("{} rows do not tile a width of {}", rows.len(), n_lon),
        });
    }
    let n_lat = rows.len() / n_lon;

    let lons: Vec<f64> = rows[..n_lon].iter().map(|r| r.0).collect();
    let lats: Vec<f64> = rows.iter().step_by(n_lon).map(|r| r.1).collect();

    let mut values = Array2::zeros((n_lat, n_lon));
    for j in 0..n_lat {
        for k in 0..n_lon {
            let (lon, lat, value) = rows[j * n_lon + k];
            if lon != lons[k] || lat != lats[j] {
                return Err(XyzError::Shape {
                    path: path.to_path_buf(),
                    message: format!(
                        "coordinates ({lon}, {lat}) break the grid layout at row {}",
                        j * n_lon + k + 1
                    ),
                });
            }
            values[[j, k]] = value;
        }
    }

    Ok(FieldGrid::new(lats, lons, values))
}

/// Write a grid file, creating parent directories as needed.
///
/// The output is byte-deterministic for a given grid.
pub fn write_grid(path: &Path, grid: &FieldGrid) -> Result<(), XyzError> {
    let mut out = String::new();
    for (j, &lat) in grid.lats().iter().enumerate() {
        for (k, &lon) in grid.lons().iter().enumerate() {
            // `{:.6}` renders NaN as "NaN", which parses back as invalid.
            writeln!(out, "{} {} {:.6}", lon, lat, grid.raw(j, k)).unwrap();
        }
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| XyzError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, out).map_err(|source| XyzError::Write {
        path: path.to_path_buf(),
        source,
    })
}
