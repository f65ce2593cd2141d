//! Backend endpoints, one file per resource.
//!
//! Each file extends [`ApiClient`](crate::ApiClient) with the calls for its
//! resource. Bodies are normalized with [`Envelope`](officine_core::Envelope)
//! and decoded through the entity's field map before they leave this module.

mod auth;
mod credit_notes;
mod invoices;
mod reports;
mod suppliers;

pub use auth::ConnectionStatus;
pub use suppliers::SupplierPage;

use officine_core::ValidationError;

use crate::error::ApiError;

/// Turn failed client-side form checks into an error. `status` is 0 because
/// no request was sent.
pub(crate) fn local_validation(fields: Vec<ValidationError>) -> ApiError {
    let message = fields
        .first()
        .map_or_else(String::new, |e| e.message.clone());
    ApiError::Validation {
        status: 0,
        message,
        fields,
    }
}

/// Show the message for `field` first when the backend flagged it.
pub(crate) fn prefer_field(err: ApiError, field: &str) -> ApiError {
    match err {
        ApiError::Validation {
            status,
            message,
            fields,
        } => {
            let message = fields
                .iter()
                .find(|e| e.field == field)
                .map_or(message, |e| e.message.clone());
            ApiError::Validation {
                status,
                message,
                fields,
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(field: &str, message: &str) -> ValidationError {
        ValidationError {
            field: field.to_owned(),
            message: message.to_owned(),
        }
    }

    #[test]
    fn test_prefer_field() {
        let err = ApiError::Validation {
            status: 400,
            message: "Requis.".to_owned(),
            fields: vec![field("supplier", "Requis."), field("invoice_number", "Existe déjà.")],
        };
        assert_eq!(
            prefer_field(err, "invoice_number").user_message(),
            "Existe déjà."
        );
        assert!(matches!(
            prefer_field(ApiError::Unauthorized, "invoice_number"),
            ApiError::Unauthorized
        ));
    }

    #[test]
    fn test_local_validation() {
        let err = local_validation(vec![field("name", "Le nom est requis")]);
        assert_eq!(err.user_message(), "Le nom est requis");
        assert_eq!(err.status(), Some(0));
    }
}
