use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde_json::json;

use collecte_stats::color::{subcategory_colors, to_hex, ColorMap};
use collecte_stats::config::ViewConfig;
use collecte_stats::data::loader::{load_aggregate, load_category_rows, write_json};
use collecte_stats::data::model::{PeriodAggregate, TOTAL_KEY};
use collecte_stats::data::names::NameIndex;
use collecte_stats::merge::merge;
use collecte_stats::state::DashboardState;
use collecte_stats::views::calendar::{
    bucket_daily_series, bucket_site_series, build_calendar_series, daily_column_series,
    find_anomalies, find_missing_days, Granularity,
};
use collecte_stats::views::nested::build_nested_category_breakdown;
use collecte_stats::views::orientation::build_flux_orientation_matrix;

#[derive(Debug, Parser)]
#[command(
    name = "collecte-stats",
    about = "Merge collection aggregates and derive dashboard views",
    version
)]
struct Cli {
    /// View config (JSON): smoothing window, reserved keys, colours.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write JSON here instead of stdout.
    #[arg(short, long, global = true, value_name = "FILE")]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Merge two half-period aggregates into one.
    Merge {
        first: PathBuf,
        second: Option<PathBuf>,
    },
    /// Every dashboard view for the whole aggregate or one site.
    Views {
        aggregate: PathBuf,
        /// Second half-period, merged before building views.
        #[arg(long)]
        second: Option<PathBuf>,
        /// Site name (accent/case-insensitive) or a reserved key.
        #[arg(long, default_value = "global")]
        site: String,
        /// Overrides the configured smoothing window.
        #[arg(long)]
        window: Option<usize>,
    },
    /// Whole-week calendar cells for a daily aggregate.
    Calendar {
        aggregate: PathBuf,
        #[arg(long, default_value = TOTAL_KEY)]
        column: String,
        #[arg(long)]
        site: Option<String>,
        /// First day (YYYY-MM-DD); defaults to the aggregate's start.
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Last day (YYYY-MM-DD); defaults to the aggregate's end.
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// Daily values summed into day, week or month buckets.
    Buckets {
        aggregate: PathBuf,
        #[arg(long, default_value = TOTAL_KEY)]
        column: String,
        #[arg(long)]
        site: Option<String>,
        #[arg(long, default_value = "day")]
        granularity: Granularity,
        /// One bucket series per site instead of the summed one.
        #[arg(long, conflicts_with = "site")]
        per_site: bool,
    },
    /// Category / sub-category rings from raw rows (CSV, JSON or Parquet).
    Nested { rows: PathBuf },
    /// Resolve a selection key against an aggregate's site names.
    Resolve { aggregate: PathBuf, key: String },
    /// Days without data, per site, for a daily aggregate.
    MissingDays { aggregate: PathBuf },
    /// Heaviest (day, site, column) values of a daily aggregate.
    Anomalies {
        aggregate: PathBuf,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Flux × orientation matrix from raw rows (CSV, JSON or Parquet).
    FluxMatrix { rows: PathBuf },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config =
        ViewConfig::load_or_default(cli.config.as_deref()).context("loading view config")?;
    let output = cli.output.as_deref();

    match cli.command {
        Command::Merge { first, second } => {
            let a = load_aggregate(&first)?;
            let b = second.as_deref().map(load_aggregate).transpose()?;
            let merged = merge(Some(&a), b.as_ref()).unwrap_or(a);
            write_json(&merged, output)
        }
        Command::Views {
            aggregate,
            second,
            site,
            window,
        } => {
            let a = load_aggregate(&aggregate)?;
            let b = second.as_deref().map(load_aggregate).transpose()?;

            let mut state = DashboardState::new(&config)?;
            state.set_periods(Some(&a), b.as_ref());
            state.select(&site);
            if let Some(window) = window {
                state.set_smoothing_window(window);
            }
            if let Some(message) = &state.status_message {
                log::warn!("{message}");
            }
            let views = state.views().context("no aggregate loaded")?;
            write_json(&views, output)
        }
        Command::Calendar {
            aggregate,
            column,
            site,
            start,
            end,
        } => {
            let agg = load_aggregate(&aggregate)?;
            let site = resolve_site(&agg, &config, site.as_deref());
            let daily = daily_column_series(&agg, &column, site.as_deref());
            let start = start
                .or(agg.date_start)
                .or_else(|| daily.keys().next().copied())
                .context("no start date: pass --start")?;
            let end = end
                .or(agg.date_end)
                .or_else(|| daily.keys().next_back().copied())
                .context("no end date: pass --end")?;
            write_json(&build_calendar_series(&daily, start, end), output)
        }
        Command::Buckets {
            aggregate,
            column,
            site,
            granularity,
            per_site,
        } => {
            let agg = load_aggregate(&aggregate)?;
            if per_site {
                return write_json(&bucket_site_series(&agg, &column, granularity), output);
            }
            let site = resolve_site(&agg, &config, site.as_deref());
            let daily = daily_column_series(&agg, &column, site.as_deref());
            write_json(&bucket_daily_series(&daily, granularity), output)
        }
        Command::Nested { rows } => {
            let rows = load_category_rows(&rows)?;
            let nested = build_nested_category_breakdown(&rows);
            let scheme = config.color_scheme()?;
            let outer_names: Vec<&str> = nested.outer.iter().map(|e| e.name.as_str()).collect();
            let outer_colors = ColorMap::cycling(&outer_names, &scheme.palette);
            let inner_colors: Vec<String> = subcategory_colors(&nested.inner, &outer_colors)
                .into_iter()
                .map(to_hex)
                .collect();
            write_json(
                &json!({
                    "outer": nested.outer,
                    "inner": nested.inner,
                    "outer_colors": outer_colors.to_hex_map(),
                    "inner_colors": inner_colors,
                }),
                output,
            )
        }
        Command::Resolve { aggregate, key } => {
            let agg = load_aggregate(&aggregate)?;
            let index = site_index(&agg, &config);
            write_json(
                &json!({
                    "key": &key,
                    "resolved": index.resolve(&key),
                    "reserved": index.is_reserved(&key),
                    "known": index.contains(&key),
                }),
                output,
            )
        }
        Command::MissingDays { aggregate } => {
            let agg = load_aggregate(&aggregate)?;
            write_json(&find_missing_days(&agg), output)
        }
        Command::Anomalies { aggregate, limit } => {
            let agg = load_aggregate(&aggregate)?;
            write_json(&find_anomalies(&agg, limit), output)
        }
        Command::FluxMatrix { rows } => {
            let rows = load_category_rows(&rows)?;
            write_json(&build_flux_orientation_matrix(&rows), output)
        }
    }
}

/// Canonical site name for `key`, or `None` for no key, a reserved key or
/// an unknown site (all sites).
fn resolve_site(
    agg: &PeriodAggregate,
    config: &ViewConfig,
    key: Option<&str>,
) -> Option<String> {
    let key = key?;
    let index = site_index(agg, config);
    if index.is_reserved(key) {
        return None;
    }
    let site = index.find(key).map(str::to_string);
    if site.is_none() {
        log::warn!("unknown site '{key}', using all sites");
    }
    site
}

fn site_index(agg: &PeriodAggregate, config: &ViewConfig) -> NameIndex {
    NameIndex::new(agg.site_names()).with_reserved(config.reserved_keys.iter().cloned())
}
