//! Merge and derived-view engine for waste-collection weight dashboards.
//!
//! Two half-period [`PeriodAggregate`](data::model::PeriodAggregate)
//! snapshots are combined with [`merge::merge`]; the [`views`] builders then
//! project the result into the series, breakdowns, tables and calendars a
//! dashboard draws.

pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod merge;
pub mod state;
pub mod views;
