//! In-memory filters for the entity lists.
//!
//! Lists are fetched once and filtered locally. Criteria combine: a row is
//! shown only if it passes every active one.

use chrono::NaiveDate;
use officine_core::{CreditNote, CreditNoteStatus, Invoice, InvoiceStatus, QuickPeriod, Supplier};

/// Filters of the invoice list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceListFilter {
    /// Matched against the invoice number and supplier name.
    pub search: String,
    pub status: Option<InvoiceStatus>,
    /// Calendar period of the invoice date, with real quarters. Invoices
    /// without a date never match.
    pub period: Option<QuickPeriod>,
}

impl InvoiceListFilter {
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.search.trim().is_empty() || self.status.is_some() || self.period.is_some()
    }

    #[must_use]
    pub fn matches(&self, invoice: &Invoice, today: NaiveDate) -> bool {
        if !invoice.matches_search(&self.search) {
            return false;
        }
        if self.status.is_some_and(|status| invoice.status != status) {
            return false;
        }
        match self.period {
            Some(period) => invoice
                .invoice_date
                .is_some_and(|date| period.contains(today, date)),
            None => true,
        }
    }

    /// Rows passing the filter, in their original order.
    #[must_use]
    pub fn apply<'a>(&self, invoices: &'a [Invoice], today: NaiveDate) -> Vec<&'a Invoice> {
        invoices
            .iter()
            .filter(|invoice| self.matches(invoice, today))
            .collect()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Filters of the credit note list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreditNoteListFilter {
    pub search: String,
    pub status: Option<CreditNoteStatus>,
}

impl CreditNoteListFilter {
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.search.trim().is_empty() || self.status.is_some()
    }

    #[must_use]
    pub fn matches(&self, note: &CreditNote) -> bool {
        note.matches_search(&self.search) && self.status.is_none_or(|status| note.status == status)
    }

    #[must_use]
    pub fn apply<'a>(&self, notes: &'a [CreditNote]) -> Vec<&'a CreditNote> {
        notes.iter().filter(|note| self.matches(note)).collect()
    }
}

/// Suppliers matching `query` on name, city, email, SIRET or phone.
#[must_use]
pub fn search_suppliers<'a>(suppliers: &'a [Supplier], query: &str) -> Vec<&'a Supplier> {
    suppliers
        .iter()
        .filter(|supplier| supplier.matches_search(query))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use officine_core::Payload;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 14).unwrap()
    }

    fn invoices() -> Vec<Invoice> {
        [
            json!({"id": 1, "invoice_number": "F-001", "supplier_name": "Biopharm", "invoice_date": "2024-05-02", "status": "PENDING"}),
            json!({"id": 2, "invoice_number": "F-002", "supplier_name": "Sud Médical", "invoice_date": "2024-04-20", "status": "PAID"}),
            json!({"id": 3, "invoice_number": "F-003", "supplier_name": "Biopharm", "invoice_date": "2024-01-10", "status": "PAID"}),
            json!({"id": 4, "invoice_number": "F-004", "supplier_name": "Biopharm", "status": "DRAFT", "created_at": "2024-05-01T10:00:00Z"}),
        ]
        .into_iter()
        .map(|v| Invoice::from_payload(v).unwrap())
        .collect()
    }

    fn numbers(rows: &[&Invoice]) -> Vec<String> {
        rows.iter().map(|i| i.invoice_number.clone()).collect()
    }

    #[test]
    fn test_no_filter_keeps_everything() {
        let invoices = invoices();
        let filter = InvoiceListFilter::default();
        assert!(!filter.is_active());
        assert_eq!(filter.apply(&invoices, today()).len(), 4);
    }

    #[test]
    fn test_search_and_status_combine() {
        let invoices = invoices();
        let filter = InvoiceListFilter {
            search: " biopharm ".to_owned(),
            status: Some(InvoiceStatus::Paid),
            period: None,
        };
        assert_eq!(numbers(&filter.apply(&invoices, today())), ["F-003"]);
    }

    #[test]
    fn test_period_uses_invoice_date_only() {
        let invoices = invoices();
        let mut filter = InvoiceListFilter {
            period: Some(QuickPeriod::Current),
            ..InvoiceListFilter::default()
        };
        assert_eq!(numbers(&filter.apply(&invoices, today())), ["F-001"]);

        filter.period = Some(QuickPeriod::Quarter);
        assert_eq!(numbers(&filter.apply(&invoices, today())), ["F-001", "F-002"]);

        filter.period = Some(QuickPeriod::Year);
        assert_eq!(filter.apply(&invoices, today()).len(), 3);

        filter.reset();
        assert!(!filter.is_active());
    }

    #[test]
    fn test_credit_note_filter() {
        let notes: Vec<CreditNote> = [
            json!({"id": 1, "credit_note_number": "AV-1", "status": "APPLIED", "reason": "Retour"}),
            json!({"id": 2, "credit_note_number": "AV-2", "status": "PENDING", "motif": "Remise"}),
        ]
        .into_iter()
        .map(|v| CreditNote::from_payload(v).unwrap())
        .collect();

        let filter = CreditNoteListFilter {
            search: String::new(),
            status: Some(CreditNoteStatus::Pending),
        };
        assert_eq!(filter.apply(&notes)[0].credit_note_number, "AV-2");

        let filter = CreditNoteListFilter {
            search: "retour".to_owned(),
            status: None,
        };
        assert_eq!(filter.apply(&notes)[0].credit_note_number, "AV-1");
    }

    #[test]
    fn test_search_suppliers() {
        let suppliers: Vec<Supplier> = [
            json!({"id": 1, "name": "Biopharm", "city": "Alger"}),
            json!({"id": 2, "name": "Sud Médical", "city": "Oran", "siret": "12345"}),
        ]
        .into_iter()
        .map(|v| Supplier::from_payload(v).unwrap())
        .collect();
        assert_eq!(search_suppliers(&suppliers, "ORAN")[0].name, "Sud Médical");
        assert_eq!(search_suppliers(&suppliers, "123").len(), 1);
        assert_eq!(search_suppliers(&suppliers, "  ").len(), 2);
    }
}
