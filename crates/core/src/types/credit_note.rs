//! Credit notes (avoirs) issued by suppliers against invoices.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::date::to_api_date;
use super::id::{CreditNoteId, InvoiceId, SupplierId};
use super::invoice::Invoice;
use super::lenient;
use super::money::Money;
use super::status::{CreditNoteStatus, InvoiceStatus};
use super::supplier::Supplier;
use crate::mapping::{self, FieldMap, Payload};

/// The invoice a credit note is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InvoiceRef {
    pub id: Option<InvoiceId>,
    pub invoice_number: Option<String>,
}

impl InvoiceRef {
    /// Gather the invoice reference from a canonicalized credit note object:
    /// flat `invoice_id`/`invoice_number` first, then a nested `invoice`
    /// object or bare id.
    #[must_use]
    pub fn from_credit_note_object(object: &Map<String, Value>) -> Option<Self> {
        let flat = |key: &str| object.get(key).and_then(lenient::text);
        if let Some(id) = flat("invoice_id") {
            return Some(Self {
                id: Some(InvoiceId::new(id)),
                invoice_number: flat("invoice_number"),
            });
        }
        match object.get("invoice") {
            Some(Value::Object(nested)) => {
                let inner = |key: &str| nested.get(key).and_then(lenient::text);
                Some(Self {
                    id: inner("id").map(InvoiceId::new),
                    invoice_number: inner("invoice_number")
                        .or_else(|| inner("invoiceNumber"))
                        .or_else(|| flat("invoice_number")),
                })
            }
            Some(scalar) => lenient::text(scalar).map(|id| Self {
                id: Some(InvoiceId::new(id)),
                invoice_number: flat("invoice_number"),
            }),
            None => None,
        }
    }
}

/// A credit note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditNote {
    pub id: CreditNoteId,
    #[serde(default, deserialize_with = "lenient::text_or_empty")]
    pub credit_note_number: String,
    #[serde(default, skip_deserializing)]
    pub invoice: Option<InvoiceRef>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub supplier_name: Option<String>,
    #[serde(default)]
    pub amount: Money,
    #[serde(default, deserialize_with = "lenient::text_or_empty")]
    pub reason: String,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub credit_note_date: Option<NaiveDate>,
    #[serde(default, skip_deserializing)]
    pub status: CreditNoteStatus,
    /// Status exactly as the backend sent it, used for dashboard bucketing.
    #[serde(default, skip_deserializing)]
    pub raw_status: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_datetime")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "lenient::opt_datetime")]
    pub updated_at: Option<NaiveDateTime>,
}

impl Payload for CreditNote {
    const FIELDS: FieldMap = mapping::CREDIT_NOTE;

    fn from_payload(value: Value) -> Result<Self, serde_json::Error> {
        let value = Self::FIELDS.canonicalize(value);
        let (invoice, status, raw_status) = match &value {
            Value::Object(object) => (
                InvoiceRef::from_credit_note_object(object),
                resolve_status(object),
                object.get("status").and_then(lenient::text),
            ),
            _ => (None, CreditNoteStatus::default(), None),
        };
        let mut note: Self = serde_json::from_value(value)?;
        note.invoice = invoice;
        note.status = status;
        note.raw_status = raw_status;
        Ok(note)
    }
}

/// An explicit status wins; otherwise `is_active` decides, and a note with
/// neither is treated as inactive.
fn resolve_status(object: &Map<String, Value>) -> CreditNoteStatus {
    if let Some(raw) = object.get("status").and_then(lenient::text) {
        return raw.parse().unwrap_or_default();
    }
    let active = object
        .get("is_active")
        .and_then(lenient::flag)
        .unwrap_or(false);
    CreditNoteStatus::from_active_flag(active)
}

impl CreditNote {
    /// The date the note is filed under: its credit date, else the day it was
    /// created.
    #[must_use]
    pub fn effective_date(&self) -> Option<NaiveDate> {
        self.credit_note_date
            .or_else(|| self.created_at.map(|dt| dt.date()))
    }

    /// Number of the linked invoice, when known.
    #[must_use]
    pub fn invoice_number(&self) -> Option<&str> {
        self.invoice
            .as_ref()
            .and_then(|i| i.invoice_number.as_deref())
    }

    /// Local search over note number, linked invoice number and reason.
    #[must_use]
    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty()
            || self.credit_note_number.to_lowercase().contains(&query)
            || self.reason.to_lowercase().contains(&query)
            || self
                .invoice_number()
                .is_some_and(|n| n.to_lowercase().contains(&query))
    }
}

/// Create/update form for a credit note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditNoteInput {
    pub credit_note_number: String,
    pub invoice: Option<InvoiceId>,
    pub credit_note_date: NaiveDate,
    pub amount: Money,
    pub reason: String,
}

impl CreditNoteInput {
    /// A blank form dated `today`.
    #[must_use]
    pub const fn new(today: NaiveDate) -> Self {
        Self {
            credit_note_number: String::new(),
            invoice: None,
            credit_note_date: today,
            amount: Money::ZERO,
            reason: String::new(),
        }
    }

    /// Prefill from an existing note.
    #[must_use]
    pub fn from_credit_note(note: &CreditNote, today: NaiveDate) -> Self {
        Self {
            credit_note_number: note.credit_note_number.clone(),
            invoice: note.invoice.as_ref().and_then(|i| i.id.clone()),
            credit_note_date: note.credit_note_date.unwrap_or(today),
            amount: note.amount,
            reason: note.reason.clone(),
        }
    }

    /// Request body.
    ///
    /// The backend wants the supplier id alongside the invoice. It is found
    /// by matching the chosen invoice's supplier name against the supplier
    /// list, and sent as `null` when there is no match.
    #[must_use]
    pub fn to_payload(&self, invoices: &[Invoice], suppliers: &[Supplier]) -> Value {
        let supplier = self.resolve_supplier(invoices, suppliers);
        json!({
            "invoice": self.invoice,
            "supplier": supplier,
            "credit_note_number": self.credit_note_number,
            "credit_note_date": to_api_date(self.credit_note_date),
            "amount": self.amount,
            "reason": self.reason,
        })
    }

    fn resolve_supplier(&self, invoices: &[Invoice], suppliers: &[Supplier]) -> Option<SupplierId> {
        let chosen = self.invoice.as_ref()?;
        let invoice = invoices.iter().find(|i| &i.id == chosen)?;
        if invoice.supplier.name.is_empty() {
            return None;
        }
        suppliers
            .iter()
            .find(|s| s.name == invoice.supplier.name)
            .map(|s| s.id.clone())
    }
}

/// Invoices a credit note may be attached to: everything not cancelled.
pub fn selectable_invoices(invoices: &[Invoice]) -> impl Iterator<Item = &Invoice> {
    invoices
        .iter()
        .filter(|i| i.status != InvoiceStatus::Cancelled)
}

/// Partial update applying a credit note.
#[must_use]
pub fn apply_payload() -> Value {
    json!({ "status": CreditNoteStatus::Applied })
}
