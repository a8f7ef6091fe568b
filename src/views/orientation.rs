//! Flux × orientation matrix: where each terminal stream's weight goes.

use indexmap::IndexMap;
use serde::Serialize;

use super::nested::CategoryRow;

/// One flux, with its weight per orientation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FluxOrientationRow {
    pub flux: String,
    #[serde(flatten)]
    pub values: IndexMap<String, f64>,
}

impl FluxOrientationRow {
    /// Weight sent to `orientation`, zero when absent.
    pub fn get(&self, orientation: &str) -> f64 {
        self.values.get(orientation).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.values.values().sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FluxOrientationMatrix {
    /// Orientation columns, in the order the rows first use them.
    pub orientations: Vec<String>,
    pub rows: Vec<FluxOrientationRow>,
}

impl FluxOrientationMatrix {
    pub fn row(&self, flux: &str) -> Option<&FluxOrientationRow> {
        self.rows.iter().find(|r| r.flux == flux)
    }
}

/// Sum rows per `(flux, orientation)` and pivot into one row per flux.
///
/// Cells are ranked by weight, largest first; fluxes and orientations then
/// appear in the order of their heaviest cell. Rows without a flux use their
/// category; rows without an orientation go to `NON DEFINI`.
pub fn build_flux_orientation_matrix(rows: &[CategoryRow]) -> FluxOrientationMatrix {
    let mut cells: IndexMap<(&str, &str), f64> = IndexMap::new();
    for row in rows {
        *cells
            .entry((row.flux_label(), row.orientation_label()))
            .or_insert(0.0) += row.value;
    }
    let mut cells: Vec<((&str, &str), f64)> = cells.into_iter().collect();
    cells.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut orientations: Vec<String> = Vec::new();
    let mut pivot: IndexMap<&str, IndexMap<String, f64>> = IndexMap::new();
    for ((flux, orientation), value) in cells {
        if !orientations.iter().any(|o| *o == orientation) {
            orientations.push(orientation.to_string());
        }
        pivot
            .entry(flux)
            .or_default()
            .insert(orientation.to_string(), value);
    }

    FluxOrientationMatrix {
        orientations,
        rows: pivot
            .into_iter()
            .map(|(flux, values)| FluxOrientationRow {
                flux: flux.to_string(),
                values,
            })
            .collect(),
    }
}
