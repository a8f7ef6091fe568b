use serde::Serialize;

use crate::data::model::{CategoryTotals, PeriodAggregate};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownEntry {
    pub name: String,
    pub value: f64,
}

impl BreakdownEntry {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        BreakdownEntry {
            name: name.into(),
            value,
        }
    }
}

/// Largest first. Stable, so ties keep their input order.
pub(crate) fn sort_descending(entries: &mut [BreakdownEntry]) {
    entries.sort_by(|a, b| b.value.total_cmp(&a.value));
}

/// Values of `labels` read from `totals`, sorted descending.
pub fn breakdown_from<S: AsRef<str>>(totals: &CategoryTotals, labels: &[S]) -> Vec<BreakdownEntry> {
    let mut entries: Vec<BreakdownEntry> = labels
        .iter()
        .map(|label| BreakdownEntry::new(label.as_ref(), totals.get(label.as_ref())))
        .collect();
    sort_descending(&mut entries);
    entries
}

/// Global weight per category column (final fluxes excluded).
pub fn build_category_breakdown(agg: &PeriodAggregate) -> Vec<BreakdownEntry> {
    breakdown_from(&agg.global_totals(), agg.category_columns())
}

/// Global weight per final flux.
pub fn build_final_flux_breakdown(agg: &PeriodAggregate) -> Vec<BreakdownEntry> {
    breakdown_from(&agg.global_totals(), agg.final_fluxes())
}

/// Sites by `TOTAL`, largest first.
pub fn build_site_ranking(agg: &PeriodAggregate) -> Vec<BreakdownEntry> {
    let mut entries: Vec<BreakdownEntry> = agg
        .sites
        .iter()
        .map(|(name, site)| BreakdownEntry::new(name.as_str(), site.total.total))
        .collect();
    sort_descending(&mut entries);
    entries
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteComparison {
    pub site: String,
    pub total: f64,
    /// `total` minus the mean site total.
    pub delta_vs_average: f64,
}

/// Each site's `TOTAL` against the mean over all sites, largest first.
pub fn build_site_comparison(agg: &PeriodAggregate) -> Vec<SiteComparison> {
    let ranking = build_site_ranking(agg);
    if ranking.is_empty() {
        return Vec::new();
    }
    let average = ranking.iter().map(|e| e.value).sum::<f64>() / ranking.len() as f64;
    ranking
        .into_iter()
        .map(|entry| SiteComparison {
            delta_vs_average: entry.value - average,
            total: entry.value,
            site: entry.name,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::data::model::{ColumnLayout, SiteAggregate};
    use approx::assert_relative_eq;

    fn sample() -> PeriodAggregate {
        let layout = ColumnLayout::new(
            ["MEUBLES", "ELECTRO", "LIVRES"],
            ["MASSICOT", "DECHETS ULTIMES"],
        );
        let site = |pairs: &[(&str, f64)]| {
            let mut monthly = BTreeMap::new();
            monthly.insert(
                "MAI".to_string(),
                CategoryTotals::from_columns(&layout, pairs.iter().copied()),
            );
            SiteAggregate::from_monthly(&layout, monthly)
        };
        let a = site(&[("MEUBLES", 5.0), ("ELECTRO", 1.0), ("MASSICOT", 2.0)]);
        let b = site(&[("ELECTRO", 7.0), ("DECHETS ULTIMES", 3.0)]);
        PeriodAggregate::new(layout.clone()).with_site("Sanssac", a).with_site("Polignac", b)
    }

    #[test]
    fn categories_sorted_descending() {
        let breakdown = build_category_breakdown(&sample());
        let names: Vec<&str> = breakdown.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["ELECTRO", "MEUBLES", "LIVRES"]);
        assert_relative_eq!(breakdown[0].value, 8.0);
        assert_relative_eq!(breakdown[2].value, 0.0);
    }

    #[test]
    fn final_fluxes_are_a_separate_breakdown() {
        let breakdown = build_final_flux_breakdown(&sample());
        assert_eq!(
            breakdown,
            [BreakdownEntry::new("DECHETS ULTIMES", 3.0), BreakdownEntry::new("MASSICOT", 2.0)]
        );
    }

    #[test]
    fn ties_keep_column_order() {
        let mut entries = vec![
            BreakdownEntry::new("A", 1.0),
            BreakdownEntry::new("B", 2.0),
            BreakdownEntry::new("C", 1.0),
        ];
        sort_descending(&mut entries);
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["B", "A", "C"]);
    }

    #[test]
    fn site_ranking_and_comparison() {
        let agg = sample();
        let ranking = build_site_ranking(&agg);
        assert_eq!(ranking[0], BreakdownEntry::new("Polignac", 7.0));
        assert_eq!(ranking[1], BreakdownEntry::new("Sanssac", 6.0));

        let comparison = build_site_comparison(&agg);
        assert_relative_eq!(comparison[0].delta_vs_average, 0.5);
        assert_relative_eq!(comparison[1].delta_vs_average, -0.5);
        assert!(build_site_comparison(&PeriodAggregate::default()).is_empty());
    }
}
