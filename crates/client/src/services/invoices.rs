//! Invoice endpoints.

use chrono::NaiveDateTime;
use officine_core::invoice::mark_paid_payload;
use officine_core::validation::check_invoice;
use officine_core::{Envelope, Invoice, InvoiceId, InvoiceInput, decode_all, selectable_invoices};
use serde_json::Value;
use tracing::instrument;

use super::suppliers::decode_or_not_found;
use super::{local_validation, prefer_field};
use crate::api::ApiClient;
use crate::error::ApiError;

/// Field whose backend message is shown first on a rejected form.
const PRIMARY_FIELD: &str = "invoice_number";

impl ApiClient {
    /// Fetch every invoice, following pagination.
    ///
    /// # Errors
    ///
    /// Returns error if the first request fails or a row is malformed.
    #[instrument(skip(self))]
    pub async fn list_invoices(&self) -> Result<Vec<Invoice>, ApiError> {
        let invoices: Vec<Invoice> = decode_all(self.fetch_all("/api/invoices/").await?)?;
        tracing::debug!(count = invoices.len(), "Invoices loaded");
        Ok(invoices)
    }

    /// Invoices a credit note may be attached to: everything but cancelled
    /// ones, fetched with one large page.
    ///
    /// # Errors
    ///
    /// Returns error if the first request fails or a row is malformed.
    #[instrument(skip(self))]
    pub async fn list_selectable_invoices(&self) -> Result<Vec<Invoice>, ApiError> {
        let all: Vec<Invoice> = decode_all(self.fetch_all("/api/invoices/?page_size=10000").await?)?;
        Ok(selectable_invoices(&all).cloned().collect())
    }

    /// Fetch one invoice.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the invoice does not exist.
    #[instrument(skip(self), fields(invoice_id = %id))]
    pub async fn get_invoice(&self, id: &InvoiceId) -> Result<Invoice, ApiError> {
        let path = format!("/api/invoices/{id}/");
        let body: Value = self.get(&path).await?;
        decode_or_not_found(body, &path)
    }

    /// Create an invoice.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the form is incomplete or the backend rejects
    /// it.
    #[instrument(skip(self, input), fields(invoice_number = %input.invoice_number))]
    pub async fn create_invoice(&self, input: &InvoiceInput) -> Result<Invoice, ApiError> {
        check_invoice(input).map_err(local_validation)?;
        let body: Value = self
            .post("/api/invoices/", &input.to_payload())
            .await
            .map_err(|e| prefer_field(e, PRIMARY_FIELD))?;
        let invoice: Invoice = Envelope::normalize(body).decode_single()?;
        tracing::info!(invoice_id = %invoice.id, "Invoice created");
        Ok(invoice)
    }

    /// Replace an invoice's fields.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the form is incomplete or the backend rejects
    /// it, `NotFound` if the invoice is gone.
    #[instrument(skip(self, input), fields(invoice_id = %id))]
    pub async fn update_invoice(
        &self,
        id: &InvoiceId,
        input: &InvoiceInput,
    ) -> Result<Invoice, ApiError> {
        check_invoice(input).map_err(local_validation)?;
        let body: Value = self
            .put(&format!("/api/invoices/{id}/"), &input.to_payload())
            .await
            .map_err(|e| prefer_field(e, PRIMARY_FIELD))?;
        Ok(Envelope::normalize(body).decode_single()?)
    }

    /// Delete an invoice.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self), fields(invoice_id = %id))]
    pub async fn delete_invoice(&self, id: &InvoiceId) -> Result<(), ApiError> {
        self.delete(&format!("/api/invoices/{id}/")).await?;
        tracing::info!("Invoice deleted");
        Ok(())
    }

    /// Propose the PAID status, paid at `paid_at`. The backend decides
    /// whether the transition is allowed.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or the transition is refused.
    #[instrument(skip(self), fields(invoice_id = %id))]
    pub async fn mark_invoice_paid(
        &self,
        id: &InvoiceId,
        paid_at: NaiveDateTime,
    ) -> Result<(), ApiError> {
        let _: Value = self
            .patch(&format!("/api/invoices/{id}/"), &mark_paid_payload(paid_at))
            .await?;
        tracing::info!("Invoice marked as paid");
        Ok(())
    }
}
