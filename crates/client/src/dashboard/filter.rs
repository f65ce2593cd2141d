//! Dashboard filter selection and the table rows it keeps.

use chrono::NaiveDate;
use officine_core::{
    CreditNote, DashboardKpi, Invoice, Money, PeriodFilter, QuickPeriod, RecentInvoice,
    StatusBucket,
};

/// Prefix the backend gives credit note numbers.
const CREDIT_NOTE_PREFIX: &str = "AV";

/// What a dashboard row stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowKind {
    Invoice,
    CreditNote,
}

/// One row of the dashboard table: an invoice or a credit note reduced to
/// what the table and the KPI recomputation need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardRow {
    pub kind: RowKind,
    pub id: Option<String>,
    pub number: String,
    pub supplier_name: String,
    pub date: Option<NaiveDate>,
    pub amount: Money,
    /// Raw backend status.
    pub status: Option<String>,
}

impl DashboardRow {
    /// Whether the row counts as a credit note in the KPIs. Rows whose number
    /// carries the credit note prefix count as credit notes whatever their
    /// source.
    #[must_use]
    pub fn is_credit_note(&self) -> bool {
        self.kind == RowKind::CreditNote || self.number.starts_with(CREDIT_NOTE_PREFIX)
    }

    #[must_use]
    pub fn bucket(&self) -> Option<StatusBucket> {
        self.status.as_deref().and_then(StatusBucket::classify)
    }
}

impl From<&Invoice> for DashboardRow {
    fn from(invoice: &Invoice) -> Self {
        let amount = if invoice.total_amount.is_zero() {
            invoice.net_to_pay
        } else {
            invoice.total_amount
        };
        Self {
            kind: RowKind::Invoice,
            id: Some(invoice.id.to_string()),
            number: invoice.invoice_number.clone(),
            supplier_name: invoice.supplier.name.clone(),
            date: invoice.effective_date(),
            amount,
            status: invoice.raw_status.clone(),
        }
    }
}

impl From<&CreditNote> for DashboardRow {
    fn from(note: &CreditNote) -> Self {
        Self {
            kind: RowKind::CreditNote,
            id: Some(note.id.to_string()),
            number: note.credit_note_number.clone(),
            supplier_name: note.supplier_name.clone().unwrap_or_default(),
            date: note.effective_date(),
            amount: note.amount,
            status: note.raw_status.clone(),
        }
    }
}

impl From<&RecentInvoice> for DashboardRow {
    fn from(recent: &RecentInvoice) -> Self {
        let kind = if recent.invoice_number.starts_with(CREDIT_NOTE_PREFIX) {
            RowKind::CreditNote
        } else {
            RowKind::Invoice
        };
        let date = recent.created_at.map(|dt| dt.date()).or_else(|| {
            recent
                .year
                .zip(recent.month)
                .and_then(|(y, m)| NaiveDate::from_ymd_opt(y, m, 1))
        });
        Self {
            kind,
            id: recent.id.clone(),
            number: recent.invoice_number.clone(),
            supplier_name: recent.supplier_name.clone(),
            date,
            amount: recent.net_to_pay,
            status: recent.status.clone(),
        }
    }
}

/// The dashboard selection: a month/year period and a status bucket, each
/// optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DashboardFilter {
    pub period: PeriodFilter,
    pub status: Option<StatusBucket>,
}

impl DashboardFilter {
    /// A filter selecting nothing.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            period: PeriodFilter::none(),
            status: None,
        }
    }

    /// Replace the period with a quick preset expanded as of `today`.
    #[must_use]
    pub fn with_quick_period(self, preset: QuickPeriod, today: NaiveDate) -> Self {
        Self {
            period: preset.resolve(today),
            ..self
        }
    }

    #[must_use]
    pub const fn with_status(self, status: Option<StatusBucket>) -> Self {
        Self { status, ..self }
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.period.is_active() || self.status.is_some()
    }

    fn matches(&self, row: &DashboardRow) -> bool {
        self.period.matches(row.date)
            && self
                .status
                .is_none_or(|wanted| row.bucket() == Some(wanted))
    }
}

/// Rows of the dashboard table for `filter`.
///
/// With no filter the table shows the snapshot's recent invoices sample. With
/// one, it shows every matching invoice followed by every matching credit
/// note. Rows without a date never pass a period, rows with an unrecognized
/// status never pass a status.
#[must_use]
pub fn filtered_rows(
    filter: &DashboardFilter,
    snapshot: Option<&DashboardKpi>,
    invoices: &[Invoice],
    credit_notes: &[CreditNote],
) -> Vec<DashboardRow> {
    if !filter.is_active() {
        return snapshot
            .map(|kpi| kpi.recent_invoices.iter().map(DashboardRow::from).collect())
            .unwrap_or_default();
    }
    invoices
        .iter()
        .map(DashboardRow::from)
        .chain(credit_notes.iter().map(DashboardRow::from))
        .filter(|row| filter.matches(row))
        .collect()
}
