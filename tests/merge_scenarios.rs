use std::collections::BTreeMap;

use approx::assert_relative_eq;

use collecte_stats::config::ColorScheme;
use collecte_stats::data::loader::{load_aggregate, write_json};
use collecte_stats::data::model::{
    CategoryTotals, ColumnLayout, PeriodAggregate, SiteAggregate, TOTAL_KEY,
};
use collecte_stats::data::period::canonical_months;
use collecte_stats::merge::merge;
use collecte_stats::views::series::{build_global_monthly_series, TOTAL_FIELD};
use collecte_stats::views::DashboardViews;

/// Single-site, single-month aggregate `{X: {period: {C1: value}}}`.
fn half(period: &str, value: f64) -> PeriodAggregate {
    let layout = ColumnLayout::with_default_fluxes(["C1"]);
    let mut monthly = BTreeMap::new();
    monthly.insert(period.to_string(), CategoryTotals::from_columns(&layout, [("C1", value)]));
    PeriodAggregate::new(layout.clone())
        .with_site("X", SiteAggregate::from_monthly(&layout, monthly))
        .with_months_order([period])
}

#[test]
fn two_halves_sum_into_one_year() {
    let a = half("JANVIER", 10.0);
    let b = half("FEVRIER", 5.0);
    let merged = merge(Some(&a), Some(&b)).unwrap();

    let x = merged.site("X").unwrap();
    assert_relative_eq!(x.total.get("C1"), 15.0);
    assert_relative_eq!(x.total.get(TOTAL_KEY), 15.0);
    assert_eq!(merged.months_order, canonical_months());
    assert_eq!(merged.months_order.len(), 12);

    // inputs untouched
    assert_eq!(a.months_order, ["JANVIER"]);
    assert_relative_eq!(a.site("X").unwrap().total.total, 10.0);
}

#[test]
fn global_series_of_merged_year() {
    let merged = merge(Some(&half("JANVIER", 10.0)), Some(&half("FEVRIER", 5.0))).unwrap();
    let series = build_global_monthly_series(&merged);

    assert_eq!(series.len(), 12);
    assert_eq!(series[0].period, "JANVIER");
    assert_relative_eq!(series[0].get(TOTAL_FIELD), 10.0);
    assert_relative_eq!(series[1].get(TOTAL_FIELD), 5.0);
    assert!(series[2..].iter().all(|p| p.get(TOTAL_FIELD) == 0.0));
}

#[test]
fn absent_side_returns_the_other() {
    let a = half("JANVIER", 10.0);
    assert_eq!(merge(Some(&a), None), Some(a.clone()));
    assert_eq!(merge(None, Some(&a)), Some(a));
    assert_eq!(merge(None, None), None);
}

#[test]
fn shared_month_is_summed() {
    let merged = merge(Some(&half("JUIN", 10.0)), Some(&half("JUIN", 2.5))).unwrap();
    let x = merged.site("X").unwrap();
    assert_relative_eq!(x.period_value("JUIN", "C1"), 12.5);
    assert_relative_eq!(x.total.total, 12.5);
}

#[test]
fn files_through_merge_and_views() {
    let dir = tempfile::tempdir().unwrap();
    let s1 = dir.path().join("s1.json");
    let s2 = dir.path().join("s2.json");
    write_json(&half("JANVIER", 10.0), Some(&s1)).unwrap();
    std::fs::write(
        &s2,
        r#"{"success": true, "stats": {
            "dechetteries": {"X": {
                "months": {"FEVRIER": {"C1": 5, "TOTAL": 5}},
                "total": {"C1": 5, "TOTAL": 5}
            }},
            "category_columns": ["C1"],
            "months_order": ["FEVRIER"],
            "dataset_year": 2025
        }}"#,
    )
    .unwrap();

    let a = load_aggregate(&s1).unwrap();
    let b = load_aggregate(&s2).unwrap();
    let merged = merge(Some(&a), Some(&b)).unwrap();
    assert_eq!(merged.dataset_year.as_deref(), Some("2025"));

    let views = DashboardViews::build(&merged, None, 3, &ColorScheme::default());
    assert_relative_eq!(views.totals.total, 15.0);
    assert_eq!(views.range_label, "DU Janvier 2025 AU Fevrier 2025");
    assert_relative_eq!(views.monthly_smoothed[1].get(TOTAL_FIELD), 7.5);
    let percentages = views.percentages.unwrap();
    assert_relative_eq!(percentages.row("X").unwrap().total, 100.0);
}
