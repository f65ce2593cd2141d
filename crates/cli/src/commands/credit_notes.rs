//! Credit note commands.

use std::path::Path;

use officine_client::CreditNoteListFilter;
use officine_client::pdf::credit_note_pdf;
use officine_core::{CreditNoteId, CreditNoteInput, Operation, format_date};

use super::{CommandError, Context};
use crate::output;

/// List credit notes matching `filter`.
///
/// # Errors
///
/// Returns error if the list cannot be fetched.
pub async fn list(ctx: &Context, filter: &CreditNoteListFilter) -> Result<(), CommandError> {
    ctx.client.guard(Operation::ListCreditNotes).await?;
    let notes = ctx.client.list_credit_notes().await?;

    let rows: Vec<Vec<String>> = filter
        .apply(&notes)
        .into_iter()
        .map(|note| {
            vec![
                note.id.to_string(),
                note.credit_note_number.clone(),
                note.invoice_number().unwrap_or_default().to_owned(),
                note.supplier_name.clone().unwrap_or_default(),
                format_date(note.credit_note_date),
                note.amount.format(),
                note.status.label_fr().to_owned(),
            ]
        })
        .collect();
    output::table(
        &["ID", "Numéro", "Facture", "Fournisseur", "Date", "Montant", "Statut"],
        &rows,
    );
    Ok(())
}

/// Show a credit note.
///
/// # Errors
///
/// Returns error if the credit note does not exist.
pub async fn show(ctx: &Context, id: &str) -> Result<(), CommandError> {
    ctx.client.guard(Operation::ViewCreditNote).await?;
    let note = ctx.client.get_credit_note(&CreditNoteId::new(id)).await?;

    output::title(&format!("Avoir {}", note.credit_note_number));
    output::field("Facture", note.invoice_number().unwrap_or_default());
    output::field("Fournisseur", note.supplier_name.as_deref().unwrap_or_default());
    output::field("Date", &format_date(note.credit_note_date));
    output::field("Montant", &note.amount.format());
    output::field("Motif", &note.reason);
    output::field("Statut", note.status.label_fr());
    Ok(())
}

/// Create a credit note. The supplier is taken from the linked invoice.
///
/// # Errors
///
/// Returns error if the form is incomplete or rejected.
pub async fn create(ctx: &Context, input: &CreditNoteInput) -> Result<(), CommandError> {
    ctx.client.guard(Operation::CreateCreditNote).await?;
    let (invoices, suppliers) = tokio::try_join!(
        ctx.client.list_selectable_invoices(),
        ctx.client.list_all_suppliers()
    )?;
    let note = ctx
        .client
        .create_credit_note(input, &invoices, &suppliers)
        .await?;
    output::message(&format!(
        "Avoir créé: {} ({})",
        note.credit_note_number, note.id
    ));
    Ok(())
}

/// Mark a credit note as applied.
///
/// # Errors
///
/// Returns error if the backend refuses the transition.
pub async fn apply(ctx: &Context, id: &str) -> Result<(), CommandError> {
    ctx.client.guard(Operation::EditCreditNote).await?;
    ctx.client
        .apply_credit_note(&CreditNoteId::new(id))
        .await?;
    output::message("Avoir appliqué");
    Ok(())
}

/// Delete a credit note.
///
/// # Errors
///
/// Returns error if the credit note does not exist.
pub async fn delete(ctx: &Context, id: &str) -> Result<(), CommandError> {
    ctx.client.guard(Operation::DeleteCreditNote).await?;
    ctx.client
        .delete_credit_note(&CreditNoteId::new(id))
        .await?;
    output::message("Avoir supprimé");
    Ok(())
}

/// Write a credit note PDF into `dir`.
///
/// # Errors
///
/// Returns error if the credit note cannot be fetched or the file written.
pub async fn export(ctx: &Context, id: &str, dir: &Path) -> Result<(), CommandError> {
    ctx.client.guard(Operation::ViewCreditNote).await?;
    let note = ctx.client.get_credit_note(&CreditNoteId::new(id)).await?;
    let path = credit_note_pdf(&note, &ctx.config.pharmacy)?.write_to(dir)?;
    output::message(&format!("PDF généré: {}", path.display()));
    Ok(())
}
