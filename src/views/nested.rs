//! Two-level category / sub-category breakdown for the double-ring chart.
//!
//! The inner ring is emitted in the outer ring's order so every inner wedge
//! sits under its parent.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::breakdown::{sort_descending, BreakdownEntry};

pub const UNCATEGORIZED: &str = "Non catégorisé";
pub const UNSPECIFIED: &str = "Non spécifié";
pub const UNDEFINED_ORIENTATION: &str = "NON DEFINI";

/// One raw `(category, subcategory, value)` triple, optionally tagged with
/// the flux it belongs to and where that flux is sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryRow {
    #[serde(default, alias = "categorie")]
    pub category: Option<String>,
    #[serde(default, alias = "sous_categorie")]
    pub subcategory: Option<String>,
    #[serde(default, alias = "total", alias = "poids")]
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flux: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<String>,
}

impl CategoryRow {
    pub fn new(category: &str, subcategory: &str, value: f64) -> Self {
        CategoryRow {
            category: Some(category.to_string()),
            subcategory: Some(subcategory.to_string()),
            value,
            ..Default::default()
        }
    }

    pub fn with_flux(mut self, flux: &str, orientation: &str) -> Self {
        self.flux = Some(flux.to_string());
        self.orientation = Some(orientation.to_string());
        self
    }

    pub(crate) fn category_label(&self) -> &str {
        label_or(self.category.as_deref(), UNCATEGORIZED)
    }

    fn subcategory_label(&self) -> &str {
        label_or(self.subcategory.as_deref(), UNSPECIFIED)
    }

    /// The flux, or the category when no flux is given.
    pub(crate) fn flux_label(&self) -> &str {
        label_or(self.flux.as_deref(), self.category_label())
    }

    pub(crate) fn orientation_label(&self) -> &str {
        label_or(self.orientation.as_deref(), UNDEFINED_ORIENTATION)
    }
}

fn label_or<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => fallback,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubcategoryEntry {
    pub name: String,
    pub category: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NestedBreakdown {
    /// Categories, largest first.
    pub outer: Vec<BreakdownEntry>,
    /// Sub-categories grouped under their category, in `outer` order.
    pub inner: Vec<SubcategoryEntry>,
}

impl NestedBreakdown {
    pub fn outer_total(&self) -> f64 {
        self.outer.iter().map(|e| e.value).sum()
    }

    pub fn inner_total(&self) -> f64 {
        self.inner.iter().map(|e| e.value).sum()
    }
}

/// Outer ring summed by category; inner ring aligned beneath it.
pub fn build_nested_category_breakdown(rows: &[CategoryRow]) -> NestedBreakdown {
    let mut by_category: IndexMap<&str, f64> = IndexMap::new();
    for row in rows {
        *by_category.entry(row.category_label()).or_insert(0.0) += row.value;
    }
    let mut outer: Vec<BreakdownEntry> = by_category
        .into_iter()
        .map(|(name, value)| BreakdownEntry::new(name, value))
        .collect();
    sort_descending(&mut outer);

    let inner = align_subcategories(&outer, rows);
    NestedBreakdown { outer, inner }
}

/// Sub-category entries ordered under a given outer ring.
///
/// Each `(category, subcategory)` pair is summed and sorted descending inside
/// its category. Categories are walked in `outer` order, dropping entries
/// without weight; groups whose category is missing from `outer` are
/// appended last, in first-seen order.
pub fn align_subcategories(
    outer: &[BreakdownEntry],
    rows: &[CategoryRow],
) -> Vec<SubcategoryEntry> {
    let mut groups: IndexMap<&str, IndexMap<&str, f64>> = IndexMap::new();
    for row in rows {
        *groups
            .entry(row.category_label())
            .or_default()
            .entry(row.subcategory_label())
            .or_insert(0.0) += row.value;
    }

    let sorted: IndexMap<&str, Vec<SubcategoryEntry>> = groups
        .into_iter()
        .map(|(category, subs)| {
            let mut entries: Vec<SubcategoryEntry> = subs
                .into_iter()
                .map(|(name, value)| SubcategoryEntry {
                    name: name.to_string(),
                    category: category.to_string(),
                    value,
                })
                .collect();
            entries.sort_by(|a, b| b.value.total_cmp(&a.value));
            (category, entries)
        })
        .collect();

    let weighted = |entries: &Vec<SubcategoryEntry>| {
        entries
            .iter()
            .filter(|e| e.value > 0.0)
            .cloned()
            .collect::<Vec<_>>()
    };

    let mut inner = Vec::new();
    for entry in outer {
        if let Some(entries) = sorted.get(entry.name.as_str()) {
            inner.extend(weighted(entries));
        }
    }
    for (category, entries) in &sorted {
        if !outer.iter().any(|e| e.name == *category) {
            inner.extend(weighted(entries));
        }
    }
    inner
}
