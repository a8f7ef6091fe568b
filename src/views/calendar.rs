//! Daily views: calendar heat-map cells, granularity buckets and gaps.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::data::model::PeriodAggregate;
use crate::data::period::PeriodLabel;
use crate::error::ConfigError;

use super::series::{SeriesPoint, TOTAL_FIELD};

/// Monday = 0 .. Sunday = 6.
pub fn weekday_index(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_monday()
}

// ---------------------------------------------------------------------------
// Calendar heat-map
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub weekday: u32,
    pub value: f64,
    /// `value / max` over the emitted days, 0 when that max is 0.
    pub intensity: f64,
    /// False for the padding days that complete the first and last weeks.
    pub in_range: bool,
}

/// `first..=last`, without stepping past the ends of the date range.
fn days_inclusive(first: NaiveDate, last: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let count = (last - first).num_days().max(-1) + 1;
    (0..count).filter_map(move |offset| first.checked_add_signed(Duration::days(offset)))
}

/// Whole weeks covering `start..=end`, Monday first.
///
/// Days inside the range take their value from `daily` (zero when absent);
/// padding days outside the range are zero. `start > end`, or a week that
/// would run past the representable dates, gives no days.
pub fn build_calendar_series(
    daily: &BTreeMap<NaiveDate, f64>,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<CalendarDay> {
    if start > end {
        return Vec::new();
    }
    let first = start.checked_sub_signed(Duration::days(i64::from(weekday_index(start))));
    let last = end.checked_add_signed(Duration::days(i64::from(6 - weekday_index(end))));
    let (Some(first), Some(last)) = (first, last) else {
        return Vec::new();
    };

    let cells: Vec<(NaiveDate, f64, bool)> = days_inclusive(first, last)
        .map(|date| {
            let in_range = date >= start && date <= end;
            let value = if in_range {
                daily.get(&date).copied().unwrap_or(0.0)
            } else {
                0.0
            };
            (date, value, in_range)
        })
        .collect();

    let max = cells.iter().map(|(_, v, _)| *v).fold(0.0, f64::max);
    cells
        .into_iter()
        .map(|(date, value, in_range)| CalendarDay {
            date,
            weekday: weekday_index(date),
            value,
            intensity: if max > 0.0 { value / max } else { 0.0 },
            in_range,
        })
        .collect()
}

/// Calendar days grouped into Monday..Sunday rows.
pub fn calendar_weeks(days: &[CalendarDay]) -> impl Iterator<Item = &[CalendarDay]> {
    days.chunks(7)
}

/// Daily sums of `column` over all sites (or one) for every ISO-day label in
/// `months_order`. Other labels are ignored.
pub fn daily_column_series(
    agg: &PeriodAggregate,
    column: &str,
    site: Option<&str>,
) -> BTreeMap<NaiveDate, f64> {
    let mut daily = BTreeMap::new();
    for period in &agg.months_order {
        let Some(date) = PeriodLabel::parse(period).day() else {
            continue;
        };
        let value: f64 = match site {
            Some(name) => agg.site(name).map_or(0.0, |s| s.period_value(period, column)),
            None => agg.sites.values().map(|s| s.period_value(period, column)).sum(),
        };
        *daily.entry(date).or_insert(0.0) += value;
    }
    daily
}

// ---------------------------------------------------------------------------
// Granularity buckets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Day,
    Week,
    Month,
}

impl Granularity {
    /// Bucket label for `date`: `2025-03-12`, `2025-W10` (Monday-first week
    /// number) or `2025-03`.
    pub fn label(self, date: NaiveDate) -> String {
        match self {
            Granularity::Day => date.format("%Y-%m-%d").to_string(),
            Granularity::Week => date.format("%Y-W%W").to_string(),
            Granularity::Month => date.format("%Y-%m").to_string(),
        }
    }
}

impl FromStr for Granularity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" | "jour" => Ok(Granularity::Day),
            "week" | "semaine" => Ok(Granularity::Week),
            "month" | "mois" => Ok(Granularity::Month),
            _ => Err(ConfigError::InvalidGranularity(s.to_string())),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
        };
        f.write_str(name)
    }
}

/// Sum a daily series into ascending buckets with a `total` field.
pub fn bucket_daily_series(
    daily: &BTreeMap<NaiveDate, f64>,
    granularity: Granularity,
) -> Vec<SeriesPoint> {
    let mut buckets: BTreeMap<String, f64> = BTreeMap::new();
    for (date, value) in daily {
        *buckets.entry(granularity.label(*date)).or_insert(0.0) += value;
    }
    buckets
        .into_iter()
        .map(|(period, total)| SeriesPoint::new(period).with(TOTAL_FIELD, total))
        .collect()
}

/// [`bucket_daily_series`] for each site on its own, in site order.
pub fn bucket_site_series(
    agg: &PeriodAggregate,
    column: &str,
    granularity: Granularity,
) -> IndexMap<String, Vec<SeriesPoint>> {
    agg.site_names()
        .map(|name| {
            let daily = daily_column_series(agg, column, Some(name));
            (name.to_string(), bucket_daily_series(&daily, granularity))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Missing days
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingDays {
    pub site: String,
    pub missing_days: Vec<NaiveDate>,
}

/// For daily aggregates: per site, the days between the first and last day
/// with any weight (across all sites) on which that site recorded nothing.
pub fn find_missing_days(agg: &PeriodAggregate) -> Vec<MissingDays> {
    let active: Vec<(&str, BTreeSet<NaiveDate>)> = agg
        .sites
        .iter()
        .map(|(name, site)| {
            let days = site
                .monthly
                .iter()
                .filter(|(_, totals)| totals.has_weight())
                .filter_map(|(label, _)| PeriodLabel::parse(label).day())
                .collect();
            (name.as_str(), days)
        })
        .collect();

    let first = active.iter().filter_map(|(_, days)| days.first()).min().copied();
    let last = active.iter().filter_map(|(_, days)| days.last()).max().copied();
    let (Some(first), Some(last)) = (first, last) else {
        return Vec::new();
    };

    active
        .into_iter()
        .map(|(name, days)| MissingDays {
            site: name.to_string(),
            missing_days: days_inclusive(first, last)
                .filter(|d| !days.contains(d))
                .collect(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Anomalies
// ---------------------------------------------------------------------------

/// One unusually heavy `(day, site, column)` weight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub date: NaiveDate,
    pub site: String,
    pub column: String,
    pub value: f64,
}

/// The `limit` heaviest daily weights over every site and every category
/// column or final flux, largest first. Only ISO-day periods with a
/// positive weight are considered; ties keep site, then day, then column
/// order.
pub fn find_anomalies(agg: &PeriodAggregate, limit: usize) -> Vec<Anomaly> {
    let mut found = Vec::new();
    for (site, aggregate) in &agg.sites {
        for (label, totals) in &aggregate.monthly {
            let Some(date) = PeriodLabel::parse(label).day() else {
                continue;
            };
            for column in agg.columns.labels() {
                let value = totals.get(column);
                if value > 0.0 {
                    found.push(Anomaly {
                        date,
                        site: site.clone(),
                        column: column.to_string(),
                        value,
                    });
                }
            }
        }
    }
    found.sort_by(|a, b| b.value.total_cmp(&a.value));
    found.truncate(limit);
    found
}
