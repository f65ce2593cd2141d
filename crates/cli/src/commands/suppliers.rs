//! Supplier commands.

use officine_client::search_suppliers;
use officine_core::{Operation, Supplier, SupplierId, SupplierInput, format_date};

use super::{CommandError, Context};
use crate::output;

fn row(supplier: &Supplier) -> Vec<String> {
    vec![
        supplier.id.to_string(),
        supplier.name.clone(),
        supplier.city.clone().unwrap_or_default(),
        supplier.phone.clone().unwrap_or_default(),
        if supplier.is_active { "Actif" } else { "Inactif" }.to_owned(),
    ]
}

/// List one page of suppliers, optionally narrowed by a local search.
///
/// # Errors
///
/// Returns error if the page cannot be fetched.
pub async fn list(ctx: &Context, page: u32, search: Option<&str>) -> Result<(), CommandError> {
    ctx.client.guard(Operation::ListSuppliers).await?;
    let page = ctx
        .client
        .list_suppliers(page.max(1), ctx.config.page_size)
        .await?;

    let shown = search_suppliers(&page.items, search.unwrap_or_default());
    let rows: Vec<Vec<String>> = shown.into_iter().map(row).collect();
    output::table(&["ID", "Nom", "Ville", "Téléphone", "Statut"], &rows);

    let footer = match page.total_pages() {
        Some(total) => format!("Page {} sur {total}", page.page),
        None => format!("Page {}", page.page),
    };
    output::message(&footer);
    Ok(())
}

/// Show a supplier.
///
/// # Errors
///
/// Returns error if the supplier does not exist.
pub async fn show(ctx: &Context, id: &str) -> Result<(), CommandError> {
    ctx.client.guard(Operation::ViewSupplier).await?;
    let supplier = ctx.client.get_supplier(&SupplierId::new(id)).await?;

    output::title(&supplier.name);
    output::field("Code", supplier.code.as_deref().unwrap_or_default());
    output::field("Adresse", supplier.address.as_deref().unwrap_or_default());
    output::field("Code postal", supplier.postal_code.as_deref().unwrap_or_default());
    output::field("Ville", supplier.city.as_deref().unwrap_or_default());
    output::field("Téléphone", supplier.phone.as_deref().unwrap_or_default());
    output::field("Email", supplier.email.as_deref().unwrap_or_default());
    output::field("SIRET", supplier.siret.as_deref().unwrap_or_default());
    output::field(
        "Statut",
        if supplier.is_active { "Actif" } else { "Inactif" },
    );
    output::field(
        "Créé le",
        &format_date(supplier.created_at.map(|dt| dt.date())),
    );
    Ok(())
}

/// Create a supplier.
///
/// # Errors
///
/// Returns error if the form is rejected.
pub async fn create(ctx: &Context, input: &SupplierInput) -> Result<(), CommandError> {
    ctx.client.guard(Operation::CreateSupplier).await?;
    let supplier = ctx.client.create_supplier(input).await?;
    output::message(&format!(
        "Fournisseur créé: {} ({})",
        supplier.name, supplier.id
    ));
    Ok(())
}

/// Delete a supplier.
///
/// # Errors
///
/// Returns error if the supplier does not exist or cannot be deleted.
pub async fn delete(ctx: &Context, id: &str) -> Result<(), CommandError> {
    ctx.client.guard(Operation::DeleteSupplier).await?;
    ctx.client.delete_supplier(&SupplierId::new(id)).await?;
    output::message("Fournisseur supprimé");
    Ok(())
}
