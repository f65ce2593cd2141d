//! Declarative field-name tables.
//!
//! The backend has shipped several spellings of the same field over time
//! (`invoice_number` / `invoiceNumber`, `reason` / `motif`). Each entity
//! declares one [`FieldMap`] listing the canonical key and its aliases; the map
//! is applied once to the raw JSON object before deserializing, so the models
//! only ever see canonical keys.
//!
//! Resolution follows "first present wins": the canonical key is used unless
//! it is absent or `null`, then each alias in order.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// One canonical key and the aliases that may stand in for it.
pub type FieldAliases = (&'static str, &'static [&'static str]);

/// A per-entity alias table.
#[derive(Debug, Clone, Copy)]
pub struct FieldMap {
    entries: &'static [FieldAliases],
}

impl FieldMap {
    /// Build a map from a static table.
    #[must_use]
    pub const fn new(entries: &'static [FieldAliases]) -> Self {
        Self { entries }
    }

    /// Rewrite an object so every known field sits under its canonical key.
    ///
    /// Aliases are removed once resolved; unknown keys pass through untouched.
    /// Non-object values are returned as-is.
    #[must_use]
    pub fn canonicalize(&self, value: Value) -> Value {
        match value {
            Value::Object(mut object) => {
                for (canonical, aliases) in self.entries {
                    let resolved = resolve(&mut object, canonical, aliases);
                    if let Some(found) = resolved {
                        object.insert((*canonical).to_owned(), found);
                    }
                }
                Value::Object(object)
            }
            other => other,
        }
    }

    /// Look up a field by canonical name in a raw object, honoring aliases.
    #[must_use]
    pub fn get<'a>(&self, object: &'a Map<String, Value>, canonical: &str) -> Option<&'a Value> {
        let aliases = self
            .entries
            .iter()
            .find(|(key, _)| *key == canonical)
            .map_or(&[][..], |(_, aliases)| *aliases);
        std::iter::once(canonical)
            .chain(aliases.iter().copied())
            .filter_map(|key| object.get(key))
            .find(|v| !v.is_null())
    }
}

fn resolve(
    object: &mut Map<String, Value>,
    canonical: &str,
    aliases: &[&str],
) -> Option<Value> {
    let mut found = object.remove(canonical).filter(|v| !v.is_null());
    for alias in aliases {
        let candidate = object.remove(*alias).filter(|v| !v.is_null());
        if found.is_none() {
            found = candidate;
        }
    }
    found
}

/// A model decoded from a backend payload through its [`FieldMap`].
pub trait Payload: DeserializeOwned {
    /// The alias table for this entity.
    const FIELDS: FieldMap;

    /// Decode one raw JSON object.
    ///
    /// # Errors
    ///
    /// Returns an error if the canonicalized object does not fit the model.
    fn from_payload(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Self::FIELDS.canonicalize(value))
    }
}

// ============================================================================
// Entity Tables
// ============================================================================

/// Supplier fields.
pub const SUPPLIER: FieldMap = FieldMap::new(&[
    ("postal_code", &["postalCode", "code_postal"]),
    ("is_active", &["isActive", "active"]),
    ("code", &["supplier_code"]),
    ("created_at", &["createdAt"]),
    ("updated_at", &["updatedAt"]),
]);

/// Invoice fields.
pub const INVOICE: FieldMap = FieldMap::new(&[
    ("invoice_number", &["invoiceNumber", "number"]),
    ("invoice_date", &["invoiceDate", "date"]),
    ("due_date", &["dueDate"]),
    ("total_amount", &["totalAmount"]),
    ("vat_amount", &["vatAmount"]),
    ("net_to_pay", &["netToPay"]),
    ("status", &["payment_status"]),
    ("is_paid", &["isPaid"]),
    ("paid_date", &["paidDate"]),
    ("supplier_name", &["supplierName"]),
    ("supplier_code", &["supplierCode"]),
    ("supplier_id", &["supplierId"]),
    ("created_at", &["createdAt"]),
    ("updated_at", &["updatedAt"]),
]);

/// Credit note fields.
pub const CREDIT_NOTE: FieldMap = FieldMap::new(&[
    ("credit_note_number", &["creditNoteNumber", "number"]),
    ("credit_note_date", &["creditDate", "credit_date", "date"]),
    ("reason", &["motif"]),
    ("invoice_id", &["invoiceId"]),
    ("invoice_number", &["invoiceNumber"]),
    ("supplier_name", &["supplierName"]),
    ("is_active", &["isActive"]),
    ("created_at", &["createdAt"]),
    ("updated_at", &["updatedAt"]),
]);

/// Monthly report fields.
pub const MONTHLY_REPORT: FieldMap = FieldMap::new(&[
    ("month", &["mois", "report_month"]),
    ("year", &["annee", "report_year"]),
    ("supplier_breakdown", &["supplierBreakdown"]),
    ("total_invoices", &["totalInvoices"]),
    ("total_credit_notes", &["totalCreditNotes"]),
    ("total_invoices_amount", &["totalInvoicesAmount"]),
    ("total_credit_notes_amount", &["totalCreditNotesAmount"]),
    ("net_to_pay", &["netToPay"]),
    ("invoices_count", &["invoicesCount"]),
    ("credit_notes_count", &["creditNotesCount"]),
]);

/// Per-supplier report row fields.
pub const SUPPLIER_REPORT: FieldMap = FieldMap::new(&[
    ("invoice_count", &["invoiceCount"]),
    ("total_amount", &["totalAmount"]),
    ("credit_note_count", &["creditNoteCount"]),
    ("total_credit_amount", &["totalCreditAmount"]),
    ("net_amount", &["netAmount"]),
]);

/// User profile fields.
pub const USER: FieldMap = FieldMap::new(&[
    ("first_name", &["firstName"]),
    ("last_name", &["lastName"]),
    ("is_active", &["isActive"]),
    ("pharmacy_name", &["pharmacyName"]),
]);
