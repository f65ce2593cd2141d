//! Supplier endpoints.

use officine_core::validation::check_supplier;
use officine_core::{Envelope, Supplier, SupplierId, SupplierInput, decode_all};
use serde_json::Value;
use tracing::instrument;

use super::{local_validation, prefer_field};
use crate::api::ApiClient;
use crate::error::ApiError;

/// One page of the supplier list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplierPage {
    pub items: Vec<Supplier>,
    /// Total across all pages, when the backend reports it.
    pub count: Option<u64>,
    pub page: u32,
    pub page_size: u32,
    pub has_next: bool,
}

impl SupplierPage {
    /// Number of pages, when the total is known.
    #[must_use]
    pub fn total_pages(&self) -> Option<u64> {
        let size = u64::from(self.page_size.max(1));
        self.count.map(|count| count.div_ceil(size).max(1))
    }
}

impl ApiClient {
    /// Fetch one page of suppliers.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or a row is malformed.
    #[instrument(skip(self))]
    pub async fn list_suppliers(&self, page: u32, page_size: u32) -> Result<SupplierPage, ApiError> {
        let page = page.max(1);
        let path = format!("/api/suppliers/?page={page}&page_size={page_size}");
        let envelope = Envelope::normalize(self.get::<Value>(&path).await?);
        let has_next = envelope.next().is_some();
        let count = match &envelope {
            Envelope::Page { count, .. } => *count,
            Envelope::Single(_) => None,
        };
        Ok(SupplierPage {
            items: envelope.decode_items()?,
            count,
            page,
            page_size,
            has_next,
        })
    }

    /// Fetch every supplier, following pagination.
    ///
    /// # Errors
    ///
    /// Returns error if the first request fails or a row is malformed.
    #[instrument(skip(self))]
    pub async fn list_all_suppliers(&self) -> Result<Vec<Supplier>, ApiError> {
        Ok(decode_all(self.fetch_all("/api/suppliers/").await?)?)
    }

    /// Fetch one supplier.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the supplier does not exist.
    #[instrument(skip(self), fields(supplier_id = %id))]
    pub async fn get_supplier(&self, id: &SupplierId) -> Result<Supplier, ApiError> {
        let body: Value = self.get(&format!("/api/suppliers/{id}/")).await?;
        decode_or_not_found(body, &format!("/api/suppliers/{id}/"))
    }

    /// Create a supplier.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the form is incomplete or the backend rejects
    /// it.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_supplier(&self, input: &SupplierInput) -> Result<Supplier, ApiError> {
        check_supplier(input).map_err(local_validation)?;
        let body: Value = self
            .post("/api/suppliers/", input)
            .await
            .map_err(|e| prefer_field(e, "name"))?;
        let supplier: Supplier = Envelope::normalize(body).decode_single()?;
        tracing::info!(supplier_id = %supplier.id, "Supplier created");
        Ok(supplier)
    }

    /// Replace a supplier's fields.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the form is incomplete or the backend rejects
    /// it, `NotFound` if the supplier is gone.
    #[instrument(skip(self, input), fields(supplier_id = %id))]
    pub async fn update_supplier(
        &self,
        id: &SupplierId,
        input: &SupplierInput,
    ) -> Result<Supplier, ApiError> {
        check_supplier(input).map_err(local_validation)?;
        let path = format!("/api/suppliers/{id}/");
        let body: Value = self
            .put(&path, input)
            .await
            .map_err(|e| prefer_field(e, "name"))?;
        Ok(Envelope::normalize(body).decode_single()?)
    }

    /// Delete a supplier.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self), fields(supplier_id = %id))]
    pub async fn delete_supplier(&self, id: &SupplierId) -> Result<(), ApiError> {
        self.delete(&format!("/api/suppliers/{id}/")).await?;
        tracing::info!("Supplier deleted");
        Ok(())
    }
}

/// Decode a detail body; an empty body is treated as a missing entity.
pub(super) fn decode_or_not_found<T: officine_core::Payload>(
    body: Value,
    path: &str,
) -> Result<T, ApiError> {
    match Envelope::normalize(body) {
        Envelope::Single(Value::Null) => Err(ApiError::NotFound(path.to_owned())),
        envelope => Ok(envelope.decode_single()?),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_total_pages() {
        let page = SupplierPage {
            items: Vec::new(),
            count: Some(41),
            page: 1,
            page_size: 20,
            has_next: true,
        };
        assert_eq!(page.total_pages(), Some(3));
        let empty = SupplierPage {
            count: Some(0),
            ..page.clone()
        };
        assert_eq!(empty.total_pages(), Some(1));
        let unknown = SupplierPage { count: None, ..page };
        assert_eq!(unknown.total_pages(), None);
    }

    #[test]
    fn test_decode_or_not_found() {
        let err = decode_or_not_found::<Supplier>(json!({"data": null}), "/api/suppliers/4/")
            .unwrap_err();
        assert!(err.is_not_found());
        let supplier: Supplier =
            decode_or_not_found(json!({"data": {"id": 4, "name": "Biopharm"}}), "/x").unwrap();
        assert_eq!(supplier.name, "Biopharm");
    }
}
