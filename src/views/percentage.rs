use indexmap::IndexMap;
use serde::Serialize;

use crate::data::model::PeriodAggregate;

/// `value / denominator * 100`, or `0` when the denominator is zero.
pub fn percentage(value: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        value / denominator * 100.0
    }
}

/// One site's share of each global column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentageRow {
    pub site: String,
    #[serde(flatten)]
    pub values: IndexMap<String, f64>,
    /// Share of the grand total.
    #[serde(rename = "TOTAL")]
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentageTable {
    pub columns: Vec<String>,
    pub rows: Vec<PercentageRow>,
}

impl PercentageTable {
    /// Sum of one column across all rows (100 for any column with weight).
    pub fn column_sum(&self, column: &str) -> f64 {
        self.rows.iter().map(|r| r.values.get(column).copied().unwrap_or(0.0)).sum()
    }

    pub fn row(&self, site: &str) -> Option<&PercentageRow> {
        self.rows.iter().find(|r| r.site == site)
    }
}

/// Per-site percentage of each category column's global total, in site order.
pub fn build_percentage_table(agg: &PeriodAggregate) -> PercentageTable {
    let global = agg.global_totals();
    let columns = agg.category_columns().to_vec();
    let rows = agg
        .sites
        .iter()
        .map(|(name, site)| PercentageRow {
            site: name.clone(),
            values: columns
                .iter()
                .map(|c| (c.clone(), percentage(site.total.get(c), global.get(c))))
                .collect(),
            total: percentage(site.total.total, global.total),
        })
        .collect();
    PercentageTable { columns, rows }
}
