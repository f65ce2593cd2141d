//! Invoice commands.

use std::path::Path;

use officine_client::InvoiceListFilter;
use officine_client::pdf::invoice_pdf;
use officine_core::{Invoice, InvoiceId, InvoiceInput, Operation, format_date};

use super::{CommandError, Context};
use crate::output;

fn status_label(invoice: &Invoice) -> String {
    if invoice.is_paid {
        "Payée".to_owned()
    } else {
        invoice.status.label_fr().to_owned()
    }
}

/// List invoices matching `filter`.
///
/// # Errors
///
/// Returns error if the list cannot be fetched.
pub async fn list(ctx: &Context, filter: &InvoiceListFilter) -> Result<(), CommandError> {
    ctx.client.guard(Operation::ListInvoices).await?;
    let invoices = ctx.client.list_invoices().await?;

    let rows: Vec<Vec<String>> = filter
        .apply(&invoices, Context::today())
        .into_iter()
        .map(|invoice| {
            vec![
                invoice.id.to_string(),
                invoice.invoice_number.clone(),
                invoice.supplier.name.clone(),
                format_date(invoice.invoice_date),
                invoice.net_to_pay.format(),
                status_label(invoice),
            ]
        })
        .collect();
    output::table(
        &["ID", "Numéro", "Fournisseur", "Date", "Net à payer", "Statut"],
        &rows,
    );
    if filter.is_active() {
        output::message(&format!("{} sur {} factures", rows.len(), invoices.len()));
    }
    Ok(())
}

/// Show an invoice.
///
/// # Errors
///
/// Returns error if the invoice does not exist.
pub async fn show(ctx: &Context, id: &str) -> Result<(), CommandError> {
    ctx.client.guard(Operation::ViewInvoice).await?;
    let invoice = ctx.client.get_invoice(&InvoiceId::new(id)).await?;

    output::title(&format!("Facture {}", invoice.invoice_number));
    output::field("Fournisseur", &invoice.supplier.name);
    output::field("Date", &format_date(invoice.invoice_date));
    output::field("Échéance", &format_date(invoice.due_date));
    output::field("Montant total", &invoice.total_amount.format());
    output::field("TVA", &invoice.vat_amount.format());
    output::field("Net à payer", &invoice.net_to_pay.format());
    output::field("Statut", &status_label(&invoice));
    output::field("Payée le", &format_date(invoice.paid_date));
    output::field("Notes", invoice.notes.as_deref().unwrap_or_default());
    Ok(())
}

/// Create an invoice.
///
/// # Errors
///
/// Returns error if the form is incomplete or rejected.
pub async fn create(ctx: &Context, input: &InvoiceInput) -> Result<(), CommandError> {
    ctx.client.guard(Operation::CreateInvoice).await?;
    let invoice = ctx.client.create_invoice(input).await?;
    output::message(&format!(
        "Facture créée: {} ({})",
        invoice.invoice_number, invoice.id
    ));
    Ok(())
}

/// Mark an invoice as paid now.
///
/// # Errors
///
/// Returns error if the invoice is already paid or the backend refuses.
pub async fn pay(ctx: &Context, id: &str) -> Result<(), CommandError> {
    ctx.client.guard(Operation::EditInvoice).await?;
    let id = InvoiceId::new(id);
    let invoice = ctx.client.get_invoice(&id).await?;
    if !invoice.is_payable() {
        return Err(CommandError::InvalidArgument(format!(
            "invoice {} is already paid",
            invoice.invoice_number
        )));
    }
    ctx.client
        .mark_invoice_paid(&id, chrono::Local::now().naive_local())
        .await?;
    output::message("Facture marquée comme payée");
    Ok(())
}

/// Delete an invoice.
///
/// # Errors
///
/// Returns error if the invoice does not exist.
pub async fn delete(ctx: &Context, id: &str) -> Result<(), CommandError> {
    ctx.client.guard(Operation::DeleteInvoice).await?;
    ctx.client.delete_invoice(&InvoiceId::new(id)).await?;
    output::message("Facture supprimée");
    Ok(())
}

/// Write an invoice PDF into `dir`.
///
/// # Errors
///
/// Returns error if the invoice cannot be fetched or the file written.
pub async fn export(ctx: &Context, id: &str, dir: &Path) -> Result<(), CommandError> {
    ctx.client.guard(Operation::ViewInvoice).await?;
    let invoice = ctx.client.get_invoice(&InvoiceId::new(id)).await?;

    let supplier = match &invoice.supplier.id {
        Some(supplier_id) => match ctx.client.get_supplier(supplier_id).await {
            Ok(supplier) => Some(supplier),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e.into()),
        },
        None => None,
    };

    let document = invoice_pdf(&invoice, supplier.as_ref(), &ctx.config.pharmacy)?;
    let path = document.write_to(dir)?;
    output::message(&format!("PDF généré: {}", path.display()));
    Ok(())
}
