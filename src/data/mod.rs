//! Data layer: core types, name lookup, period labels and loading.
//!
//! Architecture:
//! ```text
//!  .json aggregates        .csv / .json / .parquet rows
//!        │                          │
//!        ▼                          ▼
//!   ┌──────────┐              ┌──────────┐
//!   │  loader   │              │  loader   │  → Vec<CategoryRow>
//!   └──────────┘              └──────────┘
//!        │
//!        ▼
//!   ┌─────────────────┐
//!   │ PeriodAggregate  │  sites → periods → column weights
//!   └─────────────────┘
//!        │
//!        ├── names    normalized site lookup
//!        └── period   month axis and range labels
//! ```

pub mod loader;
pub mod model;
pub mod names;
pub mod period;
