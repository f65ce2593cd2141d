//! Dashboard snapshots and monthly reports.
//!
//! Both are computed server-side and only read here. The shapes below accept
//! what the backend sends today and fill the gaps older endpoints leave.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::SupplierId;
use super::lenient;
use super::money::Money;
use super::period::{Month, Year};
use crate::mapping::{self, FieldMap, Payload};

// ============================================================================
// Dashboard
// ============================================================================

fn opt_u32<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    Ok(lenient::opt_int(deserializer)?.and_then(|i| u32::try_from(i).ok()))
}

fn opt_i32<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Option<i32>, D::Error> {
    Ok(lenient::opt_int(deserializer)?.and_then(|i| i32::try_from(i).ok()))
}

/// The period a dashboard snapshot was computed for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct KpiPeriod {
    #[serde(deserialize_with = "opt_u32")]
    pub current_month: Option<u32>,
    #[serde(deserialize_with = "opt_i32")]
    pub current_year: Option<i32>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub month_name: Option<String>,
}

/// The period the backend says it filtered on, echoed back on filtered
/// requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FilterInfo {
    #[serde(deserialize_with = "opt_u32")]
    pub month: Option<u32>,
    #[serde(deserialize_with = "opt_i32")]
    pub year: Option<i32>,
}

/// Aggregates over one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PeriodTotals {
    pub total_invoices: Money,
    pub total_credit_notes: Money,
    pub net_amount: Money,
    #[serde(deserialize_with = "lenient::opt_count")]
    pub invoice_count: u64,
    #[serde(deserialize_with = "lenient::opt_count")]
    pub credit_note_count: u64,
}

/// Headline figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Overview {
    #[serde(deserialize_with = "lenient::opt_count")]
    pub total_suppliers: u64,
    pub current_month: PeriodTotals,
    pub year_to_date: PeriodTotals,
}

/// A supplier ranked by invoiced amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TopSupplier {
    #[serde(deserialize_with = "lenient::text_or_empty")]
    pub supplier_name: String,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub supplier_code: Option<String>,
    pub total_amount: Money,
}

/// One row of the backend's recent-invoices sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RecentInvoice {
    #[serde(deserialize_with = "lenient::opt_text")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient::text_or_empty")]
    pub invoice_number: String,
    #[serde(deserialize_with = "lenient::text_or_empty")]
    pub supplier_name: String,
    pub net_to_pay: Money,
    #[serde(deserialize_with = "opt_u32")]
    pub month: Option<u32>,
    #[serde(deserialize_with = "opt_i32")]
    pub year: Option<i32>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub status: Option<String>,
    #[serde(deserialize_with = "lenient::opt_datetime")]
    pub created_at: Option<NaiveDateTime>,
}

/// The dashboard snapshot returned by `/api/reports/dashboard/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DashboardKpi {
    pub period: KpiPeriod,
    pub overview: Overview,
    pub top_suppliers: Vec<TopSupplier>,
    pub recent_invoices: Vec<RecentInvoice>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub status: Option<String>,
    pub filter_info: Option<FilterInfo>,
}

impl DashboardKpi {
    /// Whether the period-scoped figures really are for the filtered period.
    ///
    /// The backend echoes the requested period in `filter_info` but has been
    /// seen to return the current month's figures regardless; when the echo
    /// and the snapshot's own period disagree the figures cannot be trusted.
    #[must_use]
    pub fn reflects_filter(&self) -> bool {
        let echo = self.filter_info.clone().unwrap_or_default();
        echo.month == self.period.current_month && echo.year == self.period.current_year
    }
}

// ============================================================================
// Monthly report
// ============================================================================

/// Supplier details embedded in a report row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSupplier {
    pub id: Option<SupplierId>,
    #[serde(deserialize_with = "lenient::text_or_empty")]
    pub name: String,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub address: Option<String>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub postal_code: Option<String>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub city: Option<String>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub phone: Option<String>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub email: Option<String>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub siret: Option<String>,
    #[serde(deserialize_with = "lenient::opt_flag")]
    pub is_active: Option<bool>,
}

impl Default for ReportSupplier {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            address: None,
            postal_code: None,
            city: None,
            phone: None,
            email: None,
            siret: None,
            is_active: Some(true),
        }
    }
}

impl ReportSupplier {
    /// Take a nested `supplier` object if present, else collect the flat
    /// `supplier_*` fields of the row.
    fn from_row(row: &Map<String, Value>) -> Result<Self, serde_json::Error> {
        let source = match row.get("supplier") {
            Some(nested @ Value::Object(_)) => mapping::SUPPLIER.canonicalize(nested.clone()),
            _ => {
                let flat: Map<String, Value> = row
                    .iter()
                    .filter_map(|(key, value)| {
                        key.strip_prefix("supplier_")
                            .map(|field| (field.to_owned(), value.clone()))
                    })
                    .collect();
                mapping::SUPPLIER.canonicalize(Value::Object(flat))
            }
        };
        serde_json::from_value(source)
    }
}

/// Per-supplier rollup within a monthly report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SupplierReport {
    #[serde(skip_deserializing)]
    pub supplier: ReportSupplier,
    #[serde(deserialize_with = "lenient::opt_count")]
    pub invoice_count: u64,
    pub total_amount: Money,
    #[serde(deserialize_with = "lenient::opt_count")]
    pub credit_note_count: u64,
    pub total_credit_amount: Money,
    pub net_amount: Money,
}

impl Payload for SupplierReport {
    const FIELDS: FieldMap = mapping::SUPPLIER_REPORT;

    fn from_payload(value: Value) -> Result<Self, serde_json::Error> {
        let value = Self::FIELDS.canonicalize(value);
        let supplier = match &value {
            Value::Object(row) => ReportSupplier::from_row(row)?,
            _ => ReportSupplier::default(),
        };
        let mut report: Self = serde_json::from_value(value)?;
        report.supplier = supplier;
        Ok(report)
    }
}

/// Monthly report for one (month, year).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MonthlyReport {
    #[serde(deserialize_with = "opt_u32")]
    pub month: Option<u32>,
    #[serde(deserialize_with = "opt_i32")]
    pub year: Option<i32>,
    pub total_invoices: Money,
    pub total_credit_notes: Money,
    pub total_invoices_amount: Money,
    pub total_credit_notes_amount: Money,
    pub net_to_pay: Money,
    #[serde(deserialize_with = "lenient::opt_count")]
    pub invoices_count: u64,
    #[serde(deserialize_with = "lenient::opt_count")]
    pub credit_notes_count: u64,
    #[serde(skip_deserializing)]
    pub supplier_breakdown: Vec<SupplierReport>,
}

impl Payload for MonthlyReport {
    const FIELDS: FieldMap = mapping::MONTHLY_REPORT;

    fn from_payload(value: Value) -> Result<Self, serde_json::Error> {
        let mut value = Self::FIELDS.canonicalize(value);
        let rows = match &mut value {
            Value::Object(object) => match object.remove("supplier_breakdown") {
                Some(Value::Array(rows)) => rows,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };
        let mut report: Self = serde_json::from_value(value)?;
        report.supplier_breakdown = rows
            .into_iter()
            .map(SupplierReport::from_payload)
            .collect::<Result<_, _>>()?;
        Ok(report)
    }
}

impl MonthlyReport {
    /// Fill what the backend left out.
    ///
    /// Month and year fall back to the requested ones. Each total and count
    /// that is missing or zero falls back to the sum over the supplier
    /// breakdown. `total_invoices` and `total_credit_notes` are taken as sent.
    #[must_use]
    pub fn with_fallbacks(mut self, month: Month, year: Year) -> Self {
        self.month = self.month.or(Some(month.number()));
        self.year = self.year.or(Some(year.value()));

        let rows = &self.supplier_breakdown;
        if self.total_invoices_amount.is_zero() {
            self.total_invoices_amount = rows.iter().map(|r| r.total_amount).sum();
        }
        if self.total_credit_notes_amount.is_zero() {
            self.total_credit_notes_amount = rows.iter().map(|r| r.total_credit_amount).sum();
        }
        if self.net_to_pay.is_zero() {
            self.net_to_pay = rows.iter().map(|r| r.net_amount).sum();
        }
        if self.invoices_count == 0 {
            self.invoices_count = rows.iter().map(|r| r.invoice_count).sum();
        }
        if self.credit_notes_count == 0 {
            self.credit_notes_count = rows.iter().map(|r| r.credit_note_count).sum();
        }
        self
    }

    /// `Mars 2024`, or whatever is known of the period.
    #[must_use]
    pub fn period_label(&self) -> String {
        let month = self
            .month
            .and_then(|m| Month::new(m).ok())
            .map(Month::name_fr);
        match (month, self.year) {
            (Some(m), Some(y)) => format!("{m} {y}"),
            (Some(m), None) => m.to_owned(),
            (None, Some(y)) => y.to_string(),
            (None, None) => String::new(),
        }
    }
}

/// Signed percentage with one decimal: `+12.5%`, `-3.0%`.
#[must_use]
pub fn format_evolution(evolution: f64) -> String {
    let evolution = if evolution.is_finite() { evolution } else { 0.0 };
    let sign = if evolution >= 0.0 { "+" } else { "" };
    format!("{sign}{evolution:.1}%")
}
