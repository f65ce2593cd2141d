//! Supplier invoices.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::date::to_api_date;
use super::id::{InvoiceId, SupplierId};
use super::lenient;
use super::money::Money;
use super::status::{InvoiceStatus, StatusBucket};
use crate::mapping::{self, FieldMap, Payload};

/// The supplier an invoice belongs to, as far as the invoice payload tells.
///
/// List endpoints send flat `supplier_name`/`supplier_code` fields, detail
/// endpoints a nested object or just the supplier's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SupplierRef {
    pub id: Option<SupplierId>,
    pub name: String,
    pub code: Option<String>,
}

impl SupplierRef {
    /// Gather the supplier reference from a canonicalized invoice object.
    #[must_use]
    pub fn from_invoice_object(object: &Map<String, Value>) -> Self {
        let flat = |key: &str| object.get(key).and_then(lenient::text);
        match object.get("supplier") {
            Some(Value::Object(nested)) => {
                let inner = |key: &str| nested.get(key).and_then(lenient::text);
                Self {
                    id: inner("id").or_else(|| flat("supplier_id")).map(SupplierId::new),
                    name: inner("name")
                        .or_else(|| flat("supplier_name"))
                        .unwrap_or_default(),
                    code: inner("code").or_else(|| flat("supplier_code")),
                }
            }
            scalar => Self {
                id: scalar
                    .and_then(lenient::text)
                    .or_else(|| flat("supplier_id"))
                    .map(SupplierId::new),
                name: flat("supplier_name").unwrap_or_default(),
                code: flat("supplier_code"),
            },
        }
    }
}

/// A supplier invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    #[serde(default, deserialize_with = "lenient::text_or_empty")]
    pub invoice_number: String,
    #[serde(default, skip_deserializing)]
    pub supplier: SupplierRef,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub invoice_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub total_amount: Money,
    #[serde(default)]
    pub vat_amount: Money,
    #[serde(default)]
    pub net_to_pay: Money,
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: InvoiceStatus,
    /// Status exactly as the backend sent it (`status`, else
    /// `payment_status`), used for dashboard bucketing.
    #[serde(default, skip_deserializing)]
    pub raw_status: Option<String>,
    #[serde(default, deserialize_with = "paid_flag")]
    pub is_paid: bool,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub paid_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_datetime")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "lenient::opt_datetime")]
    pub updated_at: Option<NaiveDateTime>,
}

fn lenient_status<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<InvoiceStatus, D::Error> {
    Ok(lenient::opt_text(deserializer)?
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_default())
}

fn paid_flag<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(lenient::opt_flag(deserializer)?.unwrap_or(false))
}

impl Payload for Invoice {
    const FIELDS: FieldMap = mapping::INVOICE;

    fn from_payload(value: Value) -> Result<Self, serde_json::Error> {
        let value = Self::FIELDS.canonicalize(value);
        let (supplier, raw_status) = match &value {
            Value::Object(object) => (
                SupplierRef::from_invoice_object(object),
                object.get("status").and_then(lenient::text),
            ),
            _ => (SupplierRef::default(), None),
        };
        let mut invoice: Self = serde_json::from_value(value)?;
        invoice.supplier = supplier;
        invoice.raw_status = raw_status;
        Ok(invoice)
    }
}

impl Invoice {
    /// The date the invoice is filed under: its invoice date, else the day it
    /// was created.
    #[must_use]
    pub fn effective_date(&self) -> Option<NaiveDate> {
        self.invoice_date
            .or_else(|| self.created_at.map(|dt| dt.date()))
    }

    /// Dashboard status bucket of the raw backend status.
    #[must_use]
    pub fn bucket(&self) -> Option<StatusBucket> {
        self.raw_status.as_deref().and_then(StatusBucket::classify)
    }

    /// Local search over invoice number and supplier name.
    #[must_use]
    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty()
            || self.invoice_number.to_lowercase().contains(&query)
            || self.supplier.name.to_lowercase().contains(&query)
    }

    /// Whether the invoice can still be marked as paid.
    #[must_use]
    pub fn is_payable(&self) -> bool {
        !matches!(self.status, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }
}

/// Create/update form for an invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceInput {
    pub invoice_number: String,
    pub supplier: Option<SupplierId>,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub net_to_pay: Money,
    pub status: InvoiceStatus,
    pub notes: String,
}

impl InvoiceInput {
    /// A blank draft dated `today`.
    #[must_use]
    pub const fn new(today: NaiveDate) -> Self {
        Self {
            invoice_number: String::new(),
            supplier: None,
            invoice_date: today,
            due_date: None,
            net_to_pay: Money::ZERO,
            status: InvoiceStatus::Draft,
            notes: String::new(),
        }
    }

    /// Prefill from an existing invoice.
    #[must_use]
    pub fn from_invoice(invoice: &Invoice, today: NaiveDate) -> Self {
        Self {
            invoice_number: invoice.invoice_number.clone(),
            supplier: invoice.supplier.id.clone(),
            invoice_date: invoice.invoice_date.unwrap_or(today),
            due_date: invoice.due_date,
            net_to_pay: invoice.net_to_pay,
            status: invoice.status,
            notes: invoice.notes.clone().unwrap_or_default(),
        }
    }

    /// Request body: snake_case keys, plus the camelCase duplicates older
    /// endpoints expect. `due_date` is left out entirely when unset.
    #[must_use]
    pub fn to_payload(&self) -> Value {
        let invoice_date = to_api_date(self.invoice_date);
        let mut body = json!({
            "invoice_number": self.invoice_number,
            "supplier": self.supplier,
            "invoice_date": invoice_date,
            "net_to_pay": self.net_to_pay,
            "status": self.status,
            "notes": self.notes,
            "invoiceNumber": self.invoice_number,
            "supplierId": self.supplier,
            "invoiceDate": invoice_date,
            "netToPay": self.net_to_pay,
        });
        if let (Some(due), Value::Object(object)) = (self.due_date, &mut body) {
            let due = to_api_date(due);
            object.insert("due_date".to_owned(), Value::String(due.clone()));
            object.insert("dueDate".to_owned(), Value::String(due));
        }
        body
    }
}

/// Partial update marking an invoice as paid at `paid_at`.
#[must_use]
pub fn mark_paid_payload(paid_at: NaiveDateTime) -> Value {
    json!({
        "status": InvoiceStatus::Paid,
        "isPaid": true,
        "paidDate": paid_at.and_utc().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    })
}
