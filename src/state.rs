use crate::config::{ColorScheme, ViewConfig};
use crate::data::model::PeriodAggregate;
use crate::data::names::NameIndex;
use crate::merge::merge;
use crate::views::DashboardViews;

// ---------------------------------------------------------------------------
// Dashboard state
// ---------------------------------------------------------------------------

/// Caller-held selection state. Holds inputs only; views are rebuilt from
/// scratch on every [`DashboardState::views`] call.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// Loaded or merged aggregate (None until one is set).
    pub aggregate: Option<PeriodAggregate>,

    /// Site names of `aggregate`, normalized for lookup.
    names: NameIndex,

    /// Reserved keys from the config, reapplied to every new index.
    reserved_keys: Vec<String>,

    /// Current selection: a reserved key or a canonical site name.
    pub selected_key: String,

    pub smoothing_window: usize,

    pub colors: ColorScheme,

    /// Status / warning message for the front end.
    pub status_message: Option<String>,
}

impl Default for DashboardState {
    fn default() -> Self {
        let config = ViewConfig::default();
        Self::with_scheme(&config, ColorScheme::default())
    }
}

impl DashboardState {
    pub fn new(config: &ViewConfig) -> Result<Self, crate::error::ConfigError> {
        config.validate()?;
        Ok(Self::with_scheme(config, config.color_scheme()?))
    }

    fn with_scheme(config: &ViewConfig, colors: ColorScheme) -> Self {
        let reserved_keys = config.reserved_keys.clone();
        DashboardState {
            aggregate: None,
            names: NameIndex::default().with_reserved(reserved_keys.clone()),
            selected_key: reserved_keys.first().cloned().unwrap_or_default(),
            reserved_keys,
            smoothing_window: config.smoothing_window,
            colors,
            status_message: None,
        }
    }

    /// Ingest a new aggregate and re-resolve the current selection against it.
    pub fn set_aggregate(&mut self, aggregate: PeriodAggregate) {
        self.names =
            NameIndex::new(aggregate.site_names()).with_reserved(self.reserved_keys.clone());
        log::info!(
            "aggregate set: {} sites, {} periods",
            aggregate.sites.len(),
            aggregate.months_order.len()
        );
        self.aggregate = Some(aggregate);
        self.status_message = None;
        let key = self.selected_key.clone();
        self.select(&key);
    }

    /// Merge two half-period snapshots and ingest the result. With neither
    /// present the state is cleared.
    pub fn set_periods(
        &mut self,
        first: Option<&PeriodAggregate>,
        second: Option<&PeriodAggregate>,
    ) {
        match merge(first, second) {
            Some(merged) => self.set_aggregate(merged),
            None => {
                self.aggregate = None;
                self.names = NameIndex::default().with_reserved(self.reserved_keys.clone());
                self.status_message = Some("Aucune donnée chargée".to_string());
            }
        }
    }

    /// Select a site (accent- and case-insensitive) or a reserved key.
    /// Unknown names fall back to the first reserved key with a status
    /// message.
    pub fn select(&mut self, key: &str) {
        let fallback = self.reserved_keys.first().cloned().unwrap_or_default();
        if self.names.is_reserved(key) {
            self.selected_key = key.to_string();
        } else if let Some(name) = self.names.find(key) {
            self.selected_key = name.to_string();
        } else if self.aggregate.is_some() {
            log::warn!("unknown site '{key}', falling back to '{fallback}'");
            self.status_message = Some(format!("Site inconnu : {key}"));
            self.selected_key = fallback;
        } else {
            // Nothing loaded yet: keep the key so it resolves once data arrives.
            self.selected_key = key.to_string();
        }
        log::debug!("selection: {}", self.selected_key);
    }

    /// A window of 0 is stored as 1.
    pub fn set_smoothing_window(&mut self, window: usize) {
        self.smoothing_window = window.max(1);
    }

    /// The selected site name, or `None` for a reserved key.
    pub fn selected_site(&self) -> Option<&str> {
        if self.names.is_reserved(&self.selected_key) {
            None
        } else {
            Some(self.selected_key.as_str())
        }
    }

    /// Views for the current selection, or `None` until data is set.
    pub fn views(&self) -> Option<DashboardViews> {
        let aggregate = self.aggregate.as_ref()?;
        Some(DashboardViews::build(
            aggregate,
            self.selected_site(),
            self.smoothing_window,
            &self.colors,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::data::model::{CategoryTotals, ColumnLayout, SiteAggregate};

    fn aggregate(sites: &[&str]) -> PeriodAggregate {
        let layout = ColumnLayout::with_default_fluxes(["MEUBLES"]);
        let mut monthly = BTreeMap::new();
        monthly.insert(
            "JANVIER".to_string(),
            CategoryTotals::from_columns(&layout, [("MEUBLES", 1.0)]),
        );
        sites.iter().fold(PeriodAggregate::new(layout.clone()), |agg, name| {
            agg.with_site(*name, SiteAggregate::from_monthly(&layout, monthly.clone()))
        })
    }

    #[test]
    fn selection_resolves_loose_spelling() {
        let mut state = DashboardState::default();
        state.set_aggregate(aggregate(&["Pépinière", "St Germain"]));
        assert_eq!(state.selected_key, "global");
        assert_eq!(state.selected_site(), None);

        state.select("PEPINIERE");
        assert_eq!(state.selected_site(), Some("Pépinière"));
        state.select("st-germain");
        assert_eq!(state.selected_site(), Some("St Germain"));
        assert!(state.status_message.is_none());
    }

    #[test]
    fn unknown_site_falls_back_to_global() {
        let mut state = DashboardState::default();
        state.set_aggregate(aggregate(&["Sanssac"]));
        state.select("Polignac");
        assert_eq!(state.selected_key, "global");
        assert!(state.status_message.is_some());
    }

    #[test]
    fn selection_made_before_loading_applies_later() {
        let mut state = DashboardState::default();
        state.select("sanssac");
        assert!(state.views().is_none());
        state.set_aggregate(aggregate(&["Sanssac"]));
        assert_eq!(state.selected_site(), Some("Sanssac"));
        let views = state.views().unwrap();
        assert_eq!(views.site.as_deref(), Some("Sanssac"));
    }

    #[test]
    fn set_periods_merges_and_clears() {
        let mut state = DashboardState::default();
        let a = aggregate(&["Sanssac"]);
        let b = aggregate(&["Polignac"]);
        state.set_periods(Some(&a), Some(&b));
        assert_eq!(state.aggregate.as_ref().map(|agg| agg.sites.len()), Some(2));

        state.set_periods(None, None);
        assert!(state.aggregate.is_none());
        assert!(state.views().is_none());
    }

    #[test]
    fn config_drives_window_and_reserved_keys() {
        let config = ViewConfig {
            smoothing_window: 3,
            reserved_keys: vec!["tous".into()],
            ..Default::default()
        };
        let mut state = DashboardState::new(&config).unwrap();
        assert_eq!(state.selected_key, "tous");
        state.set_smoothing_window(0);
        assert_eq!(state.smoothing_window, 1);

        let bad = ViewConfig {
            smoothing_window: 0,
            ..Default::default()
        };
        assert!(DashboardState::new(&bad).is_err());
    }
}
