use indexmap::IndexMap;
use serde::Serialize;

use crate::data::model::{PeriodAggregate, SiteAggregate, TOTAL_KEY};

/// Field name of the single-value series.
pub const TOTAL_FIELD: &str = "total";

// ---------------------------------------------------------------------------
// SeriesPoint – one period of a multi-field series
// ---------------------------------------------------------------------------

/// One period with named numeric fields, serialized flat:
/// `{"period": "JANVIER", "total": 15.0}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub period: String,
    #[serde(flatten)]
    pub values: IndexMap<String, f64>,
}

impl SeriesPoint {
    pub fn new(period: impl Into<String>) -> Self {
        SeriesPoint {
            period: period.into(),
            values: IndexMap::new(),
        }
    }

    pub fn with(mut self, field: impl Into<String>, value: f64) -> Self {
        self.values.insert(field.into(), value);
        self
    }

    /// Field value, zero when absent.
    pub fn get(&self, field: &str) -> f64 {
        self.values.get(field).copied().unwrap_or(0.0)
    }
}

fn selected_sites<'a>(agg: &'a PeriodAggregate, site: Option<&str>) -> Vec<&'a SiteAggregate> {
    match site {
        Some(name) => agg.site(name).into_iter().collect(),
        None => agg.sites.values().collect(),
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Sum of every site's `TOTAL` for each label of `months_order`.
pub fn build_global_monthly_series(agg: &PeriodAggregate) -> Vec<SeriesPoint> {
    agg.months_order
        .iter()
        .map(|period| {
            let total = agg.sites.values().map(|s| s.period_value(period, TOTAL_KEY)).sum();
            SeriesPoint::new(period.clone()).with(TOTAL_FIELD, total)
        })
        .collect()
}

/// `TOTAL` per period for one site. An unknown site yields zeros.
pub fn build_site_monthly_series(agg: &PeriodAggregate, site: &str) -> Vec<SeriesPoint> {
    let found = agg.site(site);
    agg.months_order
        .iter()
        .map(|period| {
            let total = found.map_or(0.0, |s| s.period_value(period, TOTAL_KEY));
            SeriesPoint::new(period.clone()).with(TOTAL_FIELD, total)
        })
        .collect()
}

/// Per-period sums of each named column, over all sites or just `site`.
pub fn build_column_series<S: AsRef<str>>(
    agg: &PeriodAggregate,
    columns: &[S],
    site: Option<&str>,
) -> Vec<SeriesPoint> {
    let sites = selected_sites(agg, site);
    agg.months_order
        .iter()
        .map(|period| {
            columns.iter().fold(SeriesPoint::new(period.clone()), |point, column| {
                let column = column.as_ref();
                let value = sites.iter().map(|s| s.period_value(period, column)).sum();
                point.with(column, value)
            })
        })
        .collect()
}

/// Trailing moving average of `fields`.
///
/// The window for index `i` covers `series[i + 1 - window ..= i]`, shrinking
/// near the start instead of zero-padding. A window of 0 behaves as 1, which
/// is the identity. Fields not listed are copied through.
pub fn smooth_series<S: AsRef<str>>(
    series: &[SeriesPoint],
    fields: &[S],
    window: usize,
) -> Vec<SeriesPoint> {
    let window = window.max(1);
    series
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let slice = &series[(i + 1).saturating_sub(window)..=i];
            let mut smoothed = point.clone();
            for field in fields {
                let field = field.as_ref();
                let sum: f64 = slice.iter().map(|p| p.get(field)).sum();
                smoothed.values.insert(field.to_string(), sum / slice.len() as f64);
            }
            smoothed
        })
        .collect()
}

/// Periods whose `total` is positive.
pub fn months_with_data(series: &[SeriesPoint]) -> Vec<String> {
    series
        .iter()
        .filter(|p| p.get(TOTAL_FIELD) > 0.0)
        .map(|p| p.period.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::data::model::{CategoryTotals, ColumnLayout};
    use approx::assert_relative_eq;

    fn sample() -> PeriodAggregate {
        let layout = ColumnLayout::new(["MEUBLES", "ELECTRO"], ["DECHETS ULTIMES"]);
        let mut a = BTreeMap::new();
        a.insert("JANVIER".to_string(), CategoryTotals::from_columns(&layout, [("MEUBLES", 3.0)]));
        a.insert(
            "FEVRIER".to_string(),
            CategoryTotals::from_columns(&layout, [("MEUBLES", 1.0), ("ELECTRO", 2.0)]),
        );
        let mut b = BTreeMap::new();
        b.insert(
            "JANVIER".to_string(),
            CategoryTotals::from_columns(&layout, [("ELECTRO", 4.0), ("DECHETS ULTIMES", 9.0)]),
        );
        PeriodAggregate::new(layout.clone())
            .with_site("Sanssac", SiteAggregate::from_monthly(&layout, a))
            .with_site("Polignac", SiteAggregate::from_monthly(&layout, b))
            .with_months_order(["JANVIER", "FEVRIER", "MARS"])
    }

    fn totals(series: &[SeriesPoint], field: &str) -> Vec<f64> {
        series.iter().map(|p| p.get(field)).collect()
    }

    #[test]
    fn global_series_follows_months_order() {
        let series = build_global_monthly_series(&sample());
        let periods: Vec<&str> = series.iter().map(|p| p.period.as_str()).collect();
        assert_eq!(periods, ["JANVIER", "FEVRIER", "MARS"]);
        assert_eq!(totals(&series, TOTAL_FIELD), [7.0, 3.0, 0.0]);
    }

    #[test]
    fn site_series_and_unknown_site() {
        let agg = sample();
        let polignac = build_site_monthly_series(&agg, "Polignac");
        assert_eq!(totals(&polignac, TOTAL_FIELD), [4.0, 0.0, 0.0]);
        let nowhere = build_site_monthly_series(&agg, "Nowhere");
        assert_eq!(totals(&nowhere, TOTAL_FIELD), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn column_series_per_flux() {
        let agg = sample();
        let series = build_column_series(&agg, &["MEUBLES", "DECHETS ULTIMES"], None);
        assert_eq!(totals(&series, "MEUBLES"), [3.0, 1.0, 0.0]);
        assert_eq!(totals(&series, "DECHETS ULTIMES"), [9.0, 0.0, 0.0]);

        let one = build_column_series(&agg, &["ELECTRO"], Some("Sanssac"));
        assert_eq!(totals(&one, "ELECTRO"), [0.0, 2.0, 0.0]);
    }

    #[test]
    fn smoothing_uses_shrinking_trailing_window() {
        let series: Vec<SeriesPoint> = [2.0, 4.0, 6.0, 8.0]
            .iter()
            .enumerate()
            .map(|(i, v)| {
                SeriesPoint::new(format!("P{i}"))
                    .with(TOTAL_FIELD, *v)
                    .with("other", 1.0)
            })
            .collect();
        let smoothed = smooth_series(&series, &[TOTAL_FIELD], 3);
        let values = totals(&smoothed, TOTAL_FIELD);
        assert_relative_eq!(values[0], 2.0);
        assert_relative_eq!(values[1], 3.0);
        assert_relative_eq!(values[2], 4.0);
        assert_relative_eq!(values[3], 6.0);
        assert_eq!(totals(&smoothed, "other"), [1.0; 4]);
    }

    #[test]
    fn window_one_and_zero_are_identity() {
        let series = build_global_monthly_series(&sample());
        assert_eq!(smooth_series(&series, &[TOTAL_FIELD], 1), series);
        assert_eq!(smooth_series(&series, &[TOTAL_FIELD], 0), series);
        assert!(smooth_series::<&str>(&[], &[TOTAL_FIELD], 7).is_empty());
    }

    #[test]
    fn months_with_data_skips_empty_periods() {
        let series = build_global_monthly_series(&sample());
        assert_eq!(months_with_data(&series), ["JANVIER", "FEVRIER"]);
    }
}
