//! Backend error extraction and client-side form checks.
//!
//! Validation is the backend's job. The checks here only catch obvious
//! mistakes before a round-trip; the backend's own field errors are what the
//! user ultimately sees, extracted by [`extract_error_message`].

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use crate::types::{CreditNoteInput, Email, InvoiceInput, SupplierInput};

/// One field-level problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Field name as the backend spells it, or `non_field_errors`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_owned(),
            message: message.into(),
        }
    }
}

fn join_messages(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        _ => None,
    }
}

/// Pick the message to show for an error body.
///
/// Priority: the form's primary field (`invoice_number`, ...) as a list,
/// then `detail`, then `message`, then `non_field_errors`, then the first
/// key holding a string or list. Returns `None` when nothing usable is found.
#[must_use]
pub fn extract_error_message(body: &Value, primary_field: Option<&str>) -> Option<String> {
    let Value::Object(object) = body else {
        return match body {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            _ => None,
        };
    };

    if let Some(message) = primary_field
        .and_then(|field| object.get(field))
        .filter(|v| v.is_array())
        .and_then(join_messages)
    {
        return Some(message);
    }
    for key in ["detail", "message"] {
        if let Some(Value::String(s)) = object.get(key)
            && !s.is_empty()
        {
            return Some(s.clone());
        }
    }
    if let Some(message) = object
        .get("non_field_errors")
        .filter(|v| v.is_array())
        .and_then(join_messages)
    {
        return Some(message);
    }
    object.values().next().and_then(join_messages)
}

/// All field errors in a DRF-style body (`{"field": ["msg", ...]}`).
#[must_use]
pub fn field_errors(body: &Value) -> Vec<ValidationError> {
    let Value::Object(object) = body else {
        return Vec::new();
    };
    object
        .iter()
        .filter(|(key, _)| !matches!(key.as_str(), "detail" | "message" | "status" | "code"))
        .filter_map(|(field, value)| {
            join_messages(value).map(|message| ValidationError::new(field, message))
        })
        .collect()
}

// ============================================================================
// Form checks
// ============================================================================

/// Minimum credit note amount.
const MIN_CREDIT_AMOUNT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Check a supplier form: name required, email well-formed when given.
///
/// # Errors
///
/// Returns every problem found.
pub fn check_supplier(input: &SupplierInput) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    if input.name.trim().is_empty() {
        errors.push(ValidationError::new("name", "Le nom est requis"));
    }
    if !input.email.trim().is_empty() && Email::parse(&input.email).is_err() {
        errors.push(ValidationError::new("email", "Adresse email invalide"));
    }
    finish(errors)
}

/// Check an invoice form: number and supplier required.
///
/// # Errors
///
/// Returns every problem found.
pub fn check_invoice(input: &InvoiceInput) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    if input.invoice_number.trim().is_empty() {
        errors.push(ValidationError::new(
            "invoice_number",
            "Le numéro de facture est requis",
        ));
    }
    if input.supplier.is_none() {
        errors.push(ValidationError::new("supplier", "Le fournisseur est requis"));
    }
    finish(errors)
}

/// Check a credit note form: number and invoice required, amount at least
/// 0.01.
///
/// # Errors
///
/// Returns every problem found.
pub fn check_credit_note(input: &CreditNoteInput) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    if input.credit_note_number.trim().is_empty() {
        errors.push(ValidationError::new(
            "credit_note_number",
            "Le numéro d'avoir est requis",
        ));
    }
    if input.invoice.is_none() {
        errors.push(ValidationError::new("invoice", "La facture est requise"));
    }
    if input.amount.amount() < MIN_CREDIT_AMOUNT {
        errors.push(ValidationError::new(
            "amount",
            "Le montant doit être supérieur ou égal à 0,01",
        ));
    }
    finish(errors)
}

fn finish(errors: Vec<ValidationError>) -> Result<(), Vec<ValidationError>> {
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
