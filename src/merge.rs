//! Combine two period aggregates (typically two half-years) into one.

use chrono::Datelike;
use indexmap::IndexMap;
use log::debug;

use crate::data::model::{CategoryTotals, ColumnLayout, PeriodAggregate, SiteAggregate};
use crate::data::period::canonical_months;

/// Merge two optional snapshots.
///
/// One side absent returns a copy of the other; both absent returns `None`.
/// Inputs are never modified.
pub fn merge(a: Option<&PeriodAggregate>, b: Option<&PeriodAggregate>) -> Option<PeriodAggregate> {
    match (a, b) {
        (None, None) => None,
        (Some(a), None) => Some(a.clone()),
        (None, Some(b)) => Some(b.clone()),
        (Some(a), Some(b)) => Some(merge_pair(a, b)),
    }
}

/// Merge two present snapshots into a new annual snapshot.
pub fn merge_pair(a: &PeriodAggregate, b: &PeriodAggregate) -> PeriodAggregate {
    let columns = resolve_columns(&a.columns, &b.columns);

    let mut sites: IndexMap<String, SiteAggregate> =
        IndexMap::with_capacity(a.sites.len() + b.sites.len());
    for (name, site_a) in &a.sites {
        let merged = match b.sites.get(name) {
            Some(site_b) => merge_site(site_a, site_b, &columns),
            None => site_a.clone(),
        };
        sites.insert(name.clone(), merged);
    }
    for (name, site_b) in &b.sites {
        if !sites.contains_key(name) {
            sites.insert(name.clone(), site_b.clone());
        }
    }

    let dataset_year = a
        .dataset_year
        .clone()
        .or_else(|| b.dataset_year.clone())
        .or_else(|| a.date_start.map(|d| d.year().to_string()));

    let merged = PeriodAggregate {
        site_count: Some(sites.len()),
        sites,
        columns,
        months_order: canonical_months(),
        dataset_year,
        date_start: a.date_start.or(b.date_start),
        date_end: b.date_end.or(a.date_end),
        date_range_label: a.date_range_label.clone().or_else(|| b.date_range_label.clone()),
    };

    debug!(
        "merged {} + {} sites into {} (TOTAL {:.1})",
        a.sites.len(),
        b.sites.len(),
        merged.sites.len(),
        merged.global_totals().total
    );
    merged
}

/// Columns of `a` when it has any, otherwise those of `b`.
///
/// Not a union: categories only `b` tracks are dropped when `a` has its own.
fn resolve_columns(a: &ColumnLayout, b: &ColumnLayout) -> ColumnLayout {
    let categories = if a.categories().is_empty() {
        b.categories()
    } else {
        a.categories()
    };
    let final_fluxes = if a.final_fluxes().is_empty() {
        b.final_fluxes()
    } else {
        a.final_fluxes()
    };
    ColumnLayout::new(categories.iter().cloned(), final_fluxes.iter().cloned())
}

/// Merge one site present in both inputs and recompute its `total`.
///
/// Periods found on one side are copied; periods found on both are summed
/// field by field.
pub fn merge_site(
    a: &SiteAggregate,
    b: &SiteAggregate,
    columns: &ColumnLayout,
) -> SiteAggregate {
    let mut monthly = a.monthly.clone();
    for (period, totals) in &b.monthly {
        monthly
            .entry(period.clone())
            .and_modify(|existing| existing.accumulate(totals))
            .or_insert_with(|| totals.clone());
    }
    SiteAggregate::from_monthly(columns, monthly)
}

/// Field-wise sum of two totals records, `TOTAL` included.
pub fn merge_totals(x: &CategoryTotals, y: &CategoryTotals) -> CategoryTotals {
    let mut sum = x.clone();
    sum.accumulate(y);
    sum
}
