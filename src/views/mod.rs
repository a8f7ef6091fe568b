//! Derived views: pure projections of a [`PeriodAggregate`] that dashboard
//! panels read.
//!
//! ```text
//!   PeriodAggregate
//!        │
//!        ├── series      monthly / per-column series, smoothing
//!        ├── breakdown   category, final flux and site rankings
//!        ├── percentage  site share of each column
//!        ├── calendar    whole-week day cells, buckets, gaps, anomalies
//!        ├── nested      category → sub-category rings
//!        └── orientation flux × orientation matrix
//! ```
//!
//! Nothing here caches: callers re-invoke a builder whenever an input or a
//! parameter (smoothing window, granularity, selection) changes.
pub mod breakdown;
pub mod calendar;
pub mod nested;
pub mod orientation;
pub mod percentage;
pub mod series;

use indexmap::IndexMap;
use serde::Serialize;

use crate::color::ColorMap;
use crate::config::ColorScheme;
use crate::data::model::{CategoryTotals, PeriodAggregate};
use crate::data::period::{build_range_label, format_du_au_range};

use self::breakdown::{
    breakdown_from, build_category_breakdown, build_final_flux_breakdown, build_site_comparison,
    build_site_ranking, BreakdownEntry, SiteComparison,
};
use self::percentage::{build_percentage_table, PercentageTable};
use self::series::{
    build_column_series, build_global_monthly_series, build_site_monthly_series, months_with_data,
    smooth_series, SeriesPoint, TOTAL_FIELD,
};

// ---------------------------------------------------------------------------
// DashboardViews – everything one page of panels reads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardViews {
    /// Site name, or `None` for the all-sites view.
    pub site: Option<String>,
    pub dataset_year: Option<String>,
    pub range_label: String,
    pub totals: CategoryTotals,
    pub monthly: Vec<SeriesPoint>,
    pub monthly_smoothed: Vec<SeriesPoint>,
    pub category_series: Vec<SeriesPoint>,
    pub category_series_smoothed: Vec<SeriesPoint>,
    pub final_flux_series: Vec<SeriesPoint>,
    pub final_flux_series_smoothed: Vec<SeriesPoint>,
    pub category_breakdown: Vec<BreakdownEntry>,
    pub final_flux_breakdown: Vec<BreakdownEntry>,
    /// All-sites view only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_ranking: Option<Vec<BreakdownEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_comparison: Option<Vec<SiteComparison>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentages: Option<PercentageTable>,
    pub colors: IndexMap<String, String>,
}

impl DashboardViews {
    /// Build the views for the whole aggregate (`site = None`) or one site.
    /// An unknown site name yields the site layout with zero values.
    pub fn build(
        agg: &PeriodAggregate,
        site: Option<&str>,
        window: usize,
        scheme: &ColorScheme,
    ) -> Self {
        let categories = agg.category_columns();
        let fluxes = agg.final_fluxes();

        let (totals, monthly) = match site {
            Some(name) => (
                agg.site(name).map(|s| s.total.clone()).unwrap_or_default(),
                build_site_monthly_series(agg, name),
            ),
            None => (agg.global_totals(), build_global_monthly_series(agg)),
        };
        let (category_breakdown, final_flux_breakdown) = match site {
            Some(_) => (breakdown_from(&totals, categories), breakdown_from(&totals, fluxes)),
            None => (build_category_breakdown(agg), build_final_flux_breakdown(agg)),
        };

        let category_series = build_column_series(agg, categories, site);
        let final_flux_series = build_column_series(agg, fluxes, site);

        let range_label = agg.date_range_label.clone().unwrap_or_else(|| {
            let with_data = months_with_data(&monthly);
            format_du_au_range(&build_range_label(&with_data, agg.dataset_year.as_deref()))
        });

        let mut colors = ColorMap::cycling(categories, &scheme.palette);
        colors.extend(&ColorMap::final_fluxes(fluxes, &scheme.final_flux));

        DashboardViews {
            site: site.map(str::to_string),
            dataset_year: agg.dataset_year.clone(),
            range_label,
            totals,
            monthly_smoothed: smooth_series(&monthly, &[TOTAL_FIELD], window),
            monthly,
            category_series_smoothed: smooth_series(&category_series, categories, window),
            category_series,
            final_flux_series_smoothed: smooth_series(&final_flux_series, fluxes, window),
            final_flux_series,
            category_breakdown,
            final_flux_breakdown,
            site_ranking: site.is_none().then(|| build_site_ranking(agg)),
            site_comparison: site.is_none().then(|| build_site_comparison(agg)),
            percentages: site.is_none().then(|| build_percentage_table(agg)),
            colors: colors.to_hex_map(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::data::model::{ColumnLayout, SiteAggregate};
    use crate::data::period::canonical_months;

    fn sample() -> PeriodAggregate {
        let layout = ColumnLayout::new(["MEUBLES", "ELECTRO"], ["DECHETS ULTIMES"]);
        let mut monthly = BTreeMap::new();
        monthly.insert(
            "FEVRIER".to_string(),
            CategoryTotals::from_columns(&layout, [("MEUBLES", 2.0), ("DECHETS ULTIMES", 1.0)]),
        );
        monthly.insert(
            "AVRIL".to_string(),
            CategoryTotals::from_columns(&layout, [("ELECTRO", 5.0)]),
        );
        let mut agg = PeriodAggregate::new(layout.clone())
            .with_site("Sanssac", SiteAggregate::from_monthly(&layout, monthly))
            .with_months_order(canonical_months());
        agg.dataset_year = Some("2025".into());
        agg
    }

    #[test]
    fn global_views() {
        let views = DashboardViews::build(&sample(), None, 7, &ColorScheme::default());
        assert_eq!(views.site, None);
        assert_eq!(views.range_label, "DU Fevrier 2025 AU Avril 2025");
        assert_eq!(views.monthly.len(), 12);
        assert_eq!(views.totals.total, 7.0);
        assert_eq!(views.category_breakdown[0], BreakdownEntry::new("ELECTRO", 5.0));
        assert_eq!(views.final_flux_breakdown[0].value, 1.0);
        assert!(views.percentages.is_some());
        assert_eq!(views.site_comparison.as_ref().map(Vec::len), Some(1));
        assert_eq!(views.site_ranking.as_ref().map(|r| r[0].name.as_str()), Some("Sanssac"));
        assert_eq!(views.colors.get("MEUBLES").map(String::as_str), Some("#3b82f6"));
        assert_eq!(views.colors.get("DECHETS ULTIMES").map(String::as_str), Some("#6b7280"));
    }

    #[test]
    fn site_views_skip_global_tables() {
        let mut agg = sample();
        agg.date_range_label = Some("DU 01/01/2025 au 30/06/2025".into());
        let views = DashboardViews::build(&agg, Some("Sanssac"), 1, &ColorScheme::default());
        assert_eq!(views.site.as_deref(), Some("Sanssac"));
        assert_eq!(views.range_label, "DU 01/01/2025 au 30/06/2025");
        assert!(views.percentages.is_none());
        assert!(views.site_comparison.is_none());
        assert!(views.site_ranking.is_none());
        assert_eq!(views.monthly_smoothed, views.monthly);
        assert_eq!(views.category_series[3].get("ELECTRO"), 5.0);
    }
}
