//! KPI card values.
//!
//! Each card reads one of three sources: the global snapshot, the snapshot
//! fetched for the selected period, or a recomputation over the filtered
//! table rows when the backend figures cannot be trusted for the selection.

use core::fmt;

use officine_core::{DashboardKpi, Money, PeriodTotals};

use super::filter::{DashboardFilter, DashboardRow};

/// The figures shown on the dashboard cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KpiKey {
    TotalSuppliers,
    InvoiceCount,
    CreditNoteCount,
    TotalInvoices,
    TotalCreditNotes,
    NetAmount,
}

impl KpiKey {
    pub const ALL: [Self; 6] = [
        Self::TotalSuppliers,
        Self::InvoiceCount,
        Self::CreditNoteCount,
        Self::TotalInvoices,
        Self::TotalCreditNotes,
        Self::NetAmount,
    ];

    /// Backend field name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TotalSuppliers => "total_suppliers",
            Self::InvoiceCount => "invoice_count",
            Self::CreditNoteCount => "credit_note_count",
            Self::TotalInvoices => "total_invoices",
            Self::TotalCreditNotes => "total_credit_notes",
            Self::NetAmount => "net_amount",
        }
    }

    /// Card title.
    #[must_use]
    pub const fn label_fr(self) -> &'static str {
        match self {
            Self::TotalSuppliers => "Fournisseurs",
            Self::InvoiceCount => "Nombre de factures",
            Self::CreditNoteCount => "Nombre d'avoirs",
            Self::TotalInvoices => "Total factures",
            Self::TotalCreditNotes => "Total avoirs",
            Self::NetAmount => "Net à payer",
        }
    }

    fn read(self, totals: &PeriodTotals) -> KpiValue {
        match self {
            Self::TotalSuppliers => KpiValue::Count(0),
            Self::InvoiceCount => KpiValue::Count(totals.invoice_count),
            Self::CreditNoteCount => KpiValue::Count(totals.credit_note_count),
            Self::TotalInvoices => KpiValue::Amount(totals.total_invoices),
            Self::TotalCreditNotes => KpiValue::Amount(totals.total_credit_notes),
            Self::NetAmount => KpiValue::Amount(totals.net_amount),
        }
    }

    fn recompute(self, rows: &[DashboardRow]) -> KpiValue {
        let (credit_notes, invoices): (Vec<&DashboardRow>, Vec<&DashboardRow>) =
            rows.iter().partition(|row| row.is_credit_note());
        let total = |rows: &[&DashboardRow]| rows.iter().map(|r| r.amount).sum::<Money>();
        match self {
            Self::TotalSuppliers => KpiValue::Count(0),
            Self::InvoiceCount => KpiValue::Count(invoices.len() as u64),
            Self::CreditNoteCount => KpiValue::Count(credit_notes.len() as u64),
            Self::TotalInvoices => KpiValue::Amount(total(&invoices)),
            Self::TotalCreditNotes => KpiValue::Amount(total(&credit_notes)),
            Self::NetAmount => KpiValue::Amount(total(&invoices) - total(&credit_notes)),
        }
    }
}

impl fmt::Display for KpiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A KPI figure: a count or an amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KpiValue {
    Count(u64),
    Amount(Money),
}

impl KpiValue {
    /// The figure as a float; never NaN or infinite.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64(self) -> f64 {
        let value = match self {
            Self::Count(n) => n as f64,
            Self::Amount(m) => m.to_f64(),
        };
        if value.is_finite() { value } else { 0.0 }
    }
}

impl fmt::Display for KpiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::Amount(m) => f.write_str(&m.format()),
        }
    }
}

/// Resolve one card.
///
/// - The supplier count always comes from the global snapshot.
/// - With a status filter, figures are recomputed from `rows`: the backend
///   does not filter by status.
/// - With a period filter, the period snapshot is used when it really covers
///   the period, otherwise figures are recomputed from `rows`. Until the
///   period snapshot arrives every figure is zero.
/// - With no filter, the global snapshot's current month is used.
#[must_use]
pub fn resolve_kpi(
    key: KpiKey,
    global: Option<&DashboardKpi>,
    dynamic: Option<&DashboardKpi>,
    filter: &DashboardFilter,
    rows: &[DashboardRow],
) -> KpiValue {
    if key == KpiKey::TotalSuppliers {
        return KpiValue::Count(global.map_or(0, |kpi| kpi.overview.total_suppliers));
    }
    if filter.status.is_some() {
        return key.recompute(rows);
    }
    if filter.period.is_active() {
        return match dynamic {
            None => key.read(&PeriodTotals::default()),
            Some(kpi) if kpi.reflects_filter() => key.read(&kpi.overview.current_month),
            Some(_) => key.recompute(rows),
        };
    }
    global.map_or_else(
        || key.read(&PeriodTotals::default()),
        |kpi| key.read(&kpi.overview.current_month),
    )
}

/// [`resolve_kpi`] as a plain number.
#[must_use]
pub fn get_kpi_value(
    key: KpiKey,
    global: Option<&DashboardKpi>,
    dynamic: Option<&DashboardKpi>,
    filter: &DashboardFilter,
    rows: &[DashboardRow],
) -> f64 {
    resolve_kpi(key, global, dynamic, filter, rows).to_f64()
}

/// Every card, resolved together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KpiValues {
    /// Period the cards are labelled with.
    pub period_label: String,
    pub values: Vec<(KpiKey, KpiValue)>,
}

impl KpiValues {
    #[must_use]
    pub fn resolve(
        global: Option<&DashboardKpi>,
        dynamic: Option<&DashboardKpi>,
        filter: &DashboardFilter,
        rows: &[DashboardRow],
    ) -> Self {
        Self {
            period_label: filter.period.label(),
            values: KpiKey::ALL
                .iter()
                .map(|&key| (key, resolve_kpi(key, global, dynamic, filter, rows)))
                .collect(),
        }
    }

    #[must_use]
    pub fn get(&self, key: KpiKey) -> Option<KpiValue> {
        self.values
            .iter()
            .find_map(|&(k, value)| (k == key).then_some(value))
    }
}
