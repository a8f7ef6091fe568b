use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Synthetic key holding the sum of the category columns.
pub const TOTAL_KEY: &str = "TOTAL";

/// Terminal streams tracked outside the ordinary `TOTAL` when an input does
/// not list its own.
pub const DEFAULT_FINAL_FLUXES: [&str; 3] = ["MASSICOT", "DEMANTELEMENT", "DECHETS ULTIMES"];

// ---------------------------------------------------------------------------
// CategoryTotals – weights per column label
// ---------------------------------------------------------------------------

/// Weights keyed by column label, plus the synthetic `TOTAL`.
///
/// Serialized as one flat object: `{"MEUBLES": 12.0, "TOTAL": 12.0}`.
/// Missing labels read as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotals {
    #[serde(rename = "TOTAL", default)]
    pub total: f64,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

impl CategoryTotals {
    /// Build a record from `(label, weight)` pairs, deriving `TOTAL` from the
    /// labels that are category columns of `layout`. A `TOTAL` pair is ignored.
    pub fn from_columns<I, S>(layout: &ColumnLayout, pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let values: BTreeMap<String, f64> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v))
            .filter(|(k, _)| k != TOTAL_KEY)
            .collect();
        let total = layout
            .categories()
            .iter()
            .map(|c| values.get(c).copied().unwrap_or(0.0))
            .sum();
        CategoryTotals { total, values }
    }

    /// Weight for `label`; `TOTAL` maps to the synthetic total.
    pub fn get(&self, label: &str) -> f64 {
        if label == TOTAL_KEY {
            return self.total;
        }
        self.values.get(label).copied().unwrap_or(0.0)
    }

    /// Field-wise add `other` into `self`, `TOTAL` included.
    pub fn accumulate(&mut self, other: &CategoryTotals) {
        for (label, value) in &other.values {
            *self.values.entry(label.clone()).or_insert(0.0) += value;
        }
        self.total += other.total;
    }

    /// Rebuild a totals record from scratch over `entries`.
    ///
    /// Every category column and final flux of `layout` is summed across the
    /// entries. `TOTAL` is the sum of the category fields only. Labels outside
    /// the layout are dropped.
    pub fn recompute<'a, I>(layout: &ColumnLayout, entries: I) -> Self
    where
        I: IntoIterator<Item = &'a CategoryTotals>,
    {
        let mut values: BTreeMap<String, f64> =
            layout.labels().map(|l| (l.to_string(), 0.0)).collect();
        for entry in entries {
            for label in layout.labels() {
                if let Some(slot) = values.get_mut(label) {
                    *slot += entry.get(label);
                }
            }
        }
        let total = layout.categories().iter().map(|c| values[c.as_str()]).sum();
        CategoryTotals { total, values }
    }

    /// Whether any field, `TOTAL` included, carries a positive weight.
    pub fn has_weight(&self) -> bool {
        self.total > 0.0 || self.values.values().any(|v| *v > 0.0)
    }
}

// ---------------------------------------------------------------------------
// SiteAggregate – one collection site
// ---------------------------------------------------------------------------

/// Weights for one site, bucketed by period label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteAggregate {
    /// Period label → totals for that period.
    #[serde(default, alias = "months")]
    pub monthly: BTreeMap<String, CategoryTotals>,
    /// Field-wise sum of `monthly`.
    #[serde(default)]
    pub total: CategoryTotals,
}

impl SiteAggregate {
    /// Build a site from its monthly entries, deriving `total`.
    pub fn from_monthly(layout: &ColumnLayout, monthly: BTreeMap<String, CategoryTotals>) -> Self {
        let total = CategoryTotals::recompute(layout, monthly.values());
        SiteAggregate { monthly, total }
    }

    /// Value of `column` for period `period`, zero when absent.
    pub fn period_value(&self, period: &str, column: &str) -> f64 {
        self.monthly.get(period).map_or(0.0, |t| t.get(column))
    }
}

// ---------------------------------------------------------------------------
// ColumnLayout – category columns vs final fluxes
// ---------------------------------------------------------------------------

/// Ordered category columns and final fluxes. The two lists never share a
/// label: `new` removes final fluxes from the categories.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnLayout {
    #[serde(rename = "category_columns")]
    categories: Vec<String>,
    final_fluxes: Vec<String>,
}

impl ColumnLayout {
    pub fn new<C, F>(categories: C, final_fluxes: F) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        F: IntoIterator,
        F::Item: Into<String>,
    {
        let final_fluxes = dedup(final_fluxes.into_iter().map(Into::into));
        let flux_set: BTreeSet<&str> = final_fluxes.iter().map(String::as_str).collect();
        let categories = dedup(
            categories
                .into_iter()
                .map(Into::into)
                .filter(|c: &String| !flux_set.contains(c.as_str())),
        );
        ColumnLayout {
            categories,
            final_fluxes,
        }
    }

    /// Categories with the documented default final fluxes.
    pub fn with_default_fluxes<C>(categories: C) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self::new(categories, DEFAULT_FINAL_FLUXES)
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn final_fluxes(&self) -> &[String] {
        &self.final_fluxes
    }

    /// Category columns followed by final fluxes.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().chain(self.final_fluxes.iter()).map(String::as_str)
    }

    pub fn is_category(&self, label: &str) -> bool {
        self.categories.iter().any(|c| c == label)
    }

    pub fn is_final_flux(&self, label: &str) -> bool {
        self.final_fluxes.iter().any(|f| f == label)
    }
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self::new(Vec::<String>::new(), DEFAULT_FINAL_FLUXES)
    }
}

fn dedup<I: Iterator<Item = String>>(items: I) -> Vec<String> {
    let mut seen = BTreeSet::new();
    items.filter(|item| seen.insert(item.clone())).collect()
}

// ---------------------------------------------------------------------------
// PeriodAggregate – the snapshot for one time window
// ---------------------------------------------------------------------------

/// Immutable snapshot of weights by site, period label and column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "PeriodAggregateRecord")]
pub struct PeriodAggregate {
    /// Site name → aggregate, in source order.
    pub sites: IndexMap<String, SiteAggregate>,
    #[serde(flatten)]
    pub columns: ColumnLayout,
    /// Period labels in display order, each at most once.
    pub months_order: Vec<String>,
    pub dataset_year: Option<String>,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub date_range_label: Option<String>,
    /// Advisory only; `sites.len()` is authoritative.
    pub site_count: Option<usize>,
}

impl PeriodAggregate {
    pub fn new(columns: ColumnLayout) -> Self {
        PeriodAggregate {
            columns,
            ..Default::default()
        }
    }

    pub fn with_site(mut self, name: impl Into<String>, site: SiteAggregate) -> Self {
        self.sites.insert(name.into(), site);
        self.site_count = Some(self.sites.len());
        self
    }

    pub fn with_months_order<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.months_order = dedup(labels.into_iter().map(Into::into));
        self
    }

    pub fn category_columns(&self) -> &[String] {
        self.columns.categories()
    }

    pub fn final_fluxes(&self) -> &[String] {
        self.columns.final_fluxes()
    }

    pub fn site(&self, name: &str) -> Option<&SiteAggregate> {
        self.sites.get(name)
    }

    pub fn site_names(&self) -> impl Iterator<Item = &str> {
        self.sites.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Sum of every site's `total`, per category column and final flux.
    /// The grand `TOTAL` is the sum of the sites' `TOTAL`s.
    pub fn global_totals(&self) -> CategoryTotals {
        let mut values: BTreeMap<String, f64> =
            self.columns.labels().map(|l| (l.to_string(), 0.0)).collect();
        let mut total = 0.0;
        for site in self.sites.values() {
            for (label, slot) in values.iter_mut() {
                *slot += site.total.get(label);
            }
            total += site.total.total;
        }
        CategoryTotals { total, values }
    }
}

// -- Wire record: accepts the upstream key names and normalizes on the way in --

#[derive(Deserialize)]
#[serde(untagged)]
enum YearRepr {
    Text(String),
    Number(i64),
}

impl From<YearRepr> for String {
    fn from(year: YearRepr) -> Self {
        match year {
            YearRepr::Text(s) => s,
            YearRepr::Number(n) => n.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct PeriodAggregateRecord {
    #[serde(default, alias = "dechetteries")]
    sites: IndexMap<String, SiteAggregate>,
    #[serde(default, alias = "categoryColumns")]
    category_columns: Vec<String>,
    #[serde(default, alias = "finalFluxes")]
    final_fluxes: Option<Vec<String>>,
    #[serde(default, alias = "monthsOrder")]
    months_order: Vec<String>,
    #[serde(default, alias = "datasetYear")]
    dataset_year: Option<YearRepr>,
    #[serde(default, alias = "dateStart")]
    date_start: Option<NaiveDate>,
    #[serde(default, alias = "dateEnd")]
    date_end: Option<NaiveDate>,
    #[serde(default, alias = "date_range", alias = "dateRangeLabel")]
    date_range_label: Option<String>,
    #[serde(default, alias = "num_dechetteries", alias = "siteCount")]
    site_count: Option<usize>,
}

impl From<PeriodAggregateRecord> for PeriodAggregate {
    fn from(record: PeriodAggregateRecord) -> Self {
        let columns = match record.final_fluxes {
            Some(fluxes) => ColumnLayout::new(record.category_columns, fluxes),
            None => ColumnLayout::with_default_fluxes(record.category_columns),
        };
        PeriodAggregate {
            sites: record.sites,
            columns,
            months_order: dedup(record.months_order.into_iter()),
            dataset_year: record.dataset_year.map(String::from),
            date_start: record.date_start,
            date_end: record.date_end,
            date_range_label: record.date_range_label,
            site_count: record.site_count,
        }
    }
}
