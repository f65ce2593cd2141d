//! Chart series derived from a dashboard snapshot.

use std::collections::BTreeMap;

use officine_core::{Money, RecentInvoice, TopSupplier};

/// Labels with a parallel sequence of values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChartSeries {
    /// Dataset name shown in the legend.
    pub label: &'static str,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl ChartSeries {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// `(label, value)` pairs in order.
    pub fn points(&self) -> impl Iterator<Item = (&str, f64)> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

/// Net to pay per month over the recent invoices sample, keyed `YYYY-MM`
/// and sorted chronologically. Rows without a month or year are grouped
/// under `0000-00`.
#[must_use]
pub fn monthly_trend(recent: &[RecentInvoice]) -> ChartSeries {
    let mut by_month: BTreeMap<String, Money> = BTreeMap::new();
    for invoice in recent {
        let key = format!(
            "{:04}-{:02}",
            invoice.year.unwrap_or_default(),
            invoice.month.unwrap_or_default()
        );
        *by_month.entry(key).or_insert(Money::ZERO) += invoice.net_to_pay;
    }
    let (labels, values) = by_month
        .into_iter()
        .map(|(key, total)| (key, total.to_f64()))
        .unzip();
    ChartSeries {
        label: "Net à payer",
        labels,
        values,
    }
}

/// Top suppliers as sent by the backend, in its order.
#[must_use]
pub fn supplier_breakdown(top: &[TopSupplier]) -> ChartSeries {
    let (labels, values) = top
        .iter()
        .map(|s| (s.supplier_name.clone(), s.total_amount.to_f64()))
        .unzip();
    ChartSeries {
        label: "Montant",
        labels,
        values,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recent() -> Vec<RecentInvoice> {
        serde_json::from_value(json!([
            {"invoice_number": "F-3", "net_to_pay": "10.50", "month": 3, "year": 2024},
            {"invoice_number": "F-1", "net_to_pay": 100, "month": 11, "year": 2023},
            {"invoice_number": "F-2", "net_to_pay": "4.50", "month": "3", "year": "2024"},
            {"invoice_number": "F-4", "net_to_pay": "abc", "month": 1, "year": 2024}
        ]))
        .unwrap()
    }

    #[test]
    fn test_monthly_trend_groups_and_sorts() {
        let series = monthly_trend(&recent());
        assert_eq!(series.label, "Net à payer");
        assert_eq!(series.labels, ["2023-11", "2024-01", "2024-03"]);
        assert_eq!(series.values, [100.0, 0.0, 15.0]);
    }

    #[test]
    fn test_monthly_trend_is_idempotent() {
        let recent = recent();
        assert_eq!(monthly_trend(&recent), monthly_trend(&recent));
        assert!(monthly_trend(&[]).is_empty());
    }

    #[test]
    fn test_supplier_breakdown_keeps_backend_order() {
        let top: Vec<TopSupplier> = serde_json::from_value(json!([
            {"supplier_name": "Biopharm", "total_amount": "1200"},
            {"supplier_name": "Sud Médical", "total_amount": 300}
        ]))
        .unwrap();
        let series = supplier_breakdown(&top);
        assert_eq!(series.label, "Montant");
        assert_eq!(
            series.points().collect::<Vec<_>>(),
            [("Biopharm", 1200.0), ("Sud Médical", 300.0)]
        );
    }
}
