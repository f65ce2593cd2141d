//! Dashboard period filtering and KPI aggregation.
//!
//! The dashboard shows three things derived from the same inputs: a table of
//! rows, the KPI cards and two charts. The pure parts live here so they can
//! be tested without a backend:
//!
//! - [`filter`] - the month/year/status selection and the table rows it keeps
//! - [`kpi`] - which source each KPI card reads, and the local recomputation
//! - [`chart`] - reduction of the snapshot into chart series
//!
//! [`DashboardController`] ties them to the [`ApiClient`](crate::ApiClient).

pub mod chart;
mod controller;
pub mod filter;
pub mod kpi;

pub use chart::{ChartSeries, monthly_trend, supplier_breakdown};
pub use controller::{DashboardController, DashboardView};
pub use filter::{DashboardFilter, DashboardRow, RowKind, filtered_rows};
pub use kpi::{KpiKey, KpiValue, KpiValues, get_kpi_value, resolve_kpi};
