//! Period labels: the canonical month axis and the human labels dashboards
//! print for days, weeks, months and ranges.

use chrono::{Datelike, NaiveDate};

use super::names::strip_diacritics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthInfo {
    /// Upper-case, accent-free key used in aggregates.
    pub key: &'static str,
    /// Display label.
    pub label: &'static str,
    /// Zero-based calendar index.
    pub index: usize,
}

pub static MONTHS: [MonthInfo; 12] = [
    MonthInfo {
        key: "JANVIER",
        label: "Janvier",
        index: 0,
    },
    MonthInfo {
        key: "FEVRIER",
        label: "Fevrier",
        index: 1,
    },
    MonthInfo {
        key: "MARS",
        label: "Mars",
        index: 2,
    },
    MonthInfo {
        key: "AVRIL",
        label: "Avril",
        index: 3,
    },
    MonthInfo {
        key: "MAI",
        label: "Mai",
        index: 4,
    },
    MonthInfo {
        key: "JUIN",
        label: "Juin",
        index: 5,
    },
    MonthInfo {
        key: "JUILLET",
        label: "Juillet",
        index: 6,
    },
    MonthInfo {
        key: "AOUT",
        label: "Aout",
        index: 7,
    },
    MonthInfo {
        key: "SEPTEMBRE",
        label: "Septembre",
        index: 8,
    },
    MonthInfo {
        key: "OCTOBRE",
        label: "Octobre",
        index: 9,
    },
    MonthInfo {
        key: "NOVEMBRE",
        label: "Novembre",
        index: 10,
    },
    MonthInfo {
        key: "DECEMBRE",
        label: "Decembre",
        index: 11,
    },
];

/// Long month names as printed in `fr-FR` dates.
const FRENCH_MONTHS: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];

/// The twelve month keys, January first.
pub fn canonical_months() -> Vec<String> {
    MONTHS.iter().map(|m| m.key.to_string()).collect()
}

pub fn normalize_month_key(value: &str) -> String {
    strip_diacritics(&value.to_uppercase())
}

pub fn month_info(value: &str) -> Option<&'static MonthInfo> {
    let key = normalize_month_key(value);
    MONTHS.iter().find(|m| m.key == key)
}

/// `"2025"` for a single-year window, `"2024-2025"` when it straddles years.
pub fn dataset_year_for(start: NaiveDate, end: NaiveDate) -> String {
    if start.year() == end.year() {
        start.year().to_string()
    } else {
        format!("{}-{}", start.year(), end.year())
    }
}

// ---------------------------------------------------------------------------
// Label classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum PeriodLabel {
    /// `YYYY-MM-DD`
    Day(NaiveDate),
    /// `YYYY-MM`
    Month { year: i32, month: u32 },
    /// `YYYY-Www`
    Week { year: i32, week: u32 },
    /// A month name such as `FEVRIER` or `Février`.
    Named(&'static MonthInfo),
    Other(String),
}

fn digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

impl PeriodLabel {
    pub fn parse(value: &str) -> Self {
        let bytes = value.as_bytes();
        if value.len() == 10 && bytes[4] == b'-' && bytes[7] == b'-' {
            if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
                return PeriodLabel::Day(date);
            }
        }
        if value.len() == 7 && bytes[4] == b'-' && digits(&value[..4]) && digits(&value[5..]) {
            let year = value[..4].parse().unwrap_or_default();
            let month: u32 = value[5..].parse().unwrap_or_default();
            if (1..=12).contains(&month) {
                return PeriodLabel::Month { year, month };
            }
        }
        if value.len() == 8 && bytes[4] == b'-' && (bytes[5] == b'W' || bytes[5] == b'w') {
            if digits(&value[..4]) && digits(&value[6..]) {
                let year = value[..4].parse().unwrap_or_default();
                let week = value[6..].parse().unwrap_or_default();
                return PeriodLabel::Week { year, week };
            }
        }
        match month_info(value) {
            Some(info) => PeriodLabel::Named(info),
            None => PeriodLabel::Other(value.to_string()),
        }
    }

    pub fn day(&self) -> Option<NaiveDate> {
        match self {
            PeriodLabel::Day(date) => Some(*date),
            _ => None,
        }
    }
}

fn format_day(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

fn format_month(year: i32, month: u32) -> String {
    format!("{} {year}", FRENCH_MONTHS[(month as usize - 1) % 12])
}

/// Display label for a period: `12/03/2025`, `mars 2025`,
/// `Semaine 05 2025`, `Fevrier 2025`.
pub fn format_period(value: &str, year: Option<&str>) -> String {
    match PeriodLabel::parse(value) {
        PeriodLabel::Day(date) => format_day(date),
        PeriodLabel::Month { year, month } => format_month(year, month),
        PeriodLabel::Week { year, week } => format!("Semaine {week:02} {year}"),
        PeriodLabel::Named(info) => match year {
            Some(y) if !y.is_empty() => format!("{} {y}", info.label),
            _ => info.label.to_string(),
        },
        PeriodLabel::Other(s) => s,
    }
}

/// Like [`format_period`], but a named month with a year reads as its first
/// day: `01 Fevrier 2025`.
pub fn format_exact_date(value: &str, year: Option<&str>) -> String {
    match PeriodLabel::parse(value) {
        PeriodLabel::Named(info) => match year {
            Some(y) if !y.is_empty() => format!("01 {} {y}", info.label),
            _ => info.label.to_string(),
        },
        _ => format_period(value, year),
    }
}

/// `start → end` over a set of period labels.
///
/// ISO days sort chronologically; anything else sorts by calendar month with
/// unknown labels last. With no labels the year alone is returned.
pub fn build_range_label<S: AsRef<str>>(labels: &[S], year: Option<&str>) -> String {
    if labels.is_empty() {
        return year.unwrap_or_default().to_string();
    }
    let mut sorted: Vec<&str> = labels.iter().map(AsRef::as_ref).collect();
    let all_days = sorted.iter().all(|l| matches!(PeriodLabel::parse(l), PeriodLabel::Day(_)));

    let format: fn(&str, Option<&str>) -> String = if all_days {
        sorted.sort_unstable();
        format_exact_date
    } else {
        sorted.sort_by_key(|l| month_info(l).map_or(999, |m| m.index));
        format_period
    };

    let start = sorted[0];
    let end = sorted[sorted.len() - 1];
    if start == end {
        return format(start, year);
    }
    format!("{} → {}", format(start, year), format(end, year))
}

/// Rewrite `a → b` as `DU a AU b`. Labels already starting with `DU ` are
/// returned as-is.
pub fn format_du_au_range(label: &str) -> String {
    if label.is_empty() {
        return String::new();
    }
    if label.to_uppercase().starts_with("DU ") {
        return label.to_string();
    }
    let parts: Vec<&str> = label.split('→').map(str::trim).filter(|p| !p.is_empty()).collect();
    match parts.as_slice() {
        [start, end] => format!("DU {start} AU {end}"),
        _ => format!("DU {label}"),
    }
}
