//! Credit note endpoints.

use officine_core::credit_note::apply_payload;
use officine_core::validation::check_credit_note;
use officine_core::{
    CreditNote, CreditNoteId, CreditNoteInput, Envelope, Invoice, Supplier, decode_all,
};
use serde_json::Value;
use tracing::instrument;

use super::suppliers::decode_or_not_found;
use super::{local_validation, prefer_field};
use crate::api::ApiClient;
use crate::error::ApiError;

const PRIMARY_FIELD: &str = "credit_note_number";

impl ApiClient {
    /// Fetch every credit note, following pagination.
    ///
    /// # Errors
    ///
    /// Returns error if the first request fails or a row is malformed.
    #[instrument(skip(self))]
    pub async fn list_credit_notes(&self) -> Result<Vec<CreditNote>, ApiError> {
        Ok(decode_all(self.fetch_all("/api/credit-notes/").await?)?)
    }

    /// Fetch one credit note.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the credit note does not exist.
    #[instrument(skip(self), fields(credit_note_id = %id))]
    pub async fn get_credit_note(&self, id: &CreditNoteId) -> Result<CreditNote, ApiError> {
        let path = format!("/api/credit-notes/{id}/");
        let body: Value = self.get(&path).await?;
        decode_or_not_found(body, &path)
    }

    /// Create a credit note.
    ///
    /// `invoices` and `suppliers` are the lists the form was filled from;
    /// they resolve the supplier sent alongside the invoice.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the form is incomplete or the backend rejects
    /// it.
    #[instrument(skip_all, fields(credit_note_number = %input.credit_note_number))]
    pub async fn create_credit_note(
        &self,
        input: &CreditNoteInput,
        invoices: &[Invoice],
        suppliers: &[Supplier],
    ) -> Result<CreditNote, ApiError> {
        check_credit_note(input).map_err(local_validation)?;
        let body: Value = self
            .post("/api/credit-notes/", &input.to_payload(invoices, suppliers))
            .await
            .map_err(|e| prefer_field(e, PRIMARY_FIELD))?;
        let note: CreditNote = Envelope::normalize(body).decode_single()?;
        tracing::info!(credit_note_id = %note.id, "Credit note created");
        Ok(note)
    }

    /// Replace a credit note's fields.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the form is incomplete or the backend rejects
    /// it, `NotFound` if the credit note is gone.
    #[instrument(skip_all, fields(credit_note_id = %id))]
    pub async fn update_credit_note(
        &self,
        id: &CreditNoteId,
        input: &CreditNoteInput,
        invoices: &[Invoice],
        suppliers: &[Supplier],
    ) -> Result<CreditNote, ApiError> {
        check_credit_note(input).map_err(local_validation)?;
        let body: Value = self
            .put(
                &format!("/api/credit-notes/{id}/"),
                &input.to_payload(invoices, suppliers),
            )
            .await
            .map_err(|e| prefer_field(e, PRIMARY_FIELD))?;
        Ok(Envelope::normalize(body).decode_single()?)
    }

    /// Delete a credit note.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    #[instrument(skip(self), fields(credit_note_id = %id))]
    pub async fn delete_credit_note(&self, id: &CreditNoteId) -> Result<(), ApiError> {
        self.delete(&format!("/api/credit-notes/{id}/")).await?;
        tracing::info!("Credit note deleted");
        Ok(())
    }

    /// Propose the APPLIED status.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or the transition is refused.
    #[instrument(skip(self), fields(credit_note_id = %id))]
    pub async fn apply_credit_note(&self, id: &CreditNoteId) -> Result<(), ApiError> {
        let _: Value = self
            .patch(&format!("/api/credit-notes/{id}/"), &apply_payload())
            .await?;
        tracing::info!("Credit note applied");
        Ok(())
    }
}
