//! Supplier, invoice and credit note round trips against the fake backend.

#![allow(clippy::unwrap_used)]

use chrono::NaiveDate;
use officine_client::{ApiError, InvoiceListFilter};
use officine_core::{
    CreditNoteId, CreditNoteInput, CreditNoteStatus, InvoiceId, InvoiceInput, InvoiceStatus,
    Money, QuickPeriod, SupplierId, SupplierInput,
};
use officine_integration_tests::{Collection, FakeBackend, PHARMACIST};
use serde_json::json;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn seed_invoices(backend: &FakeBackend, count: usize) {
    for n in 1..=count {
        backend.seed(
            Collection::Invoices,
            json!({
                "invoice_number": format!("F-{n:03}"),
                "supplier_name": "Biopharm",
                "invoice_date": "2024-03-05",
                "net_to_pay": "100.00",
                "status": "PENDING",
            }),
        );
    }
}

// ============================================================================
// Pagination
// ============================================================================

#[tokio::test]
async fn test_list_follows_absolute_next_links() {
    let backend = FakeBackend::spawn().await.unwrap();
    seed_invoices(&backend, 5);
    backend.with_state(|state| state.page_size = 2);
    let client = backend.signed_in(PHARMACIST).await.unwrap();

    let invoices = client.list_invoices().await.unwrap();

    let numbers: Vec<&str> = invoices.iter().map(|i| i.invoice_number.as_str()).collect();
    assert_eq!(numbers, ["F-001", "F-002", "F-003", "F-004", "F-005"]);
    assert_eq!(
        backend.requests_to("/api/invoices/"),
        [
            "GET /api/invoices/",
            "GET /api/invoices/?page=2&page_size=2",
            "GET /api/invoices/?page=3&page_size=2",
        ]
    );
}

#[tokio::test]
async fn test_failed_follow_up_page_keeps_partial_results() {
    let backend = FakeBackend::spawn().await.unwrap();
    seed_invoices(&backend, 5);
    backend.with_state(|state| {
        state.page_size = 2;
        state.failing_pages.insert((Collection::Invoices, 2));
    });
    let client = backend.signed_in(PHARMACIST).await.unwrap();

    let invoices = client.list_invoices().await.unwrap();

    assert_eq!(invoices.len(), 2);
}

#[tokio::test]
async fn test_failed_first_page_is_an_error() {
    let backend = FakeBackend::spawn().await.unwrap();
    seed_invoices(&backend, 1);
    backend.with_state(|state| {
        state.failing_pages.insert((Collection::Invoices, 1));
    });
    let client = backend.signed_in(PHARMACIST).await.unwrap();

    let err = client.list_invoices().await.unwrap_err();

    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_supplier_page_metadata() {
    let backend = FakeBackend::spawn().await.unwrap();
    for name in ["Biopharm", "Saidal", "Hikma"] {
        backend.seed(Collection::Suppliers, json!({"name": name, "city": "Alger"}));
    }
    let client = backend.signed_in(PHARMACIST).await.unwrap();

    let first = client.list_suppliers(1, 2).await.unwrap();
    assert_eq!(first.items.len(), 2);
    assert_eq!(first.count, Some(3));
    assert!(first.has_next);
    assert_eq!(first.total_pages(), Some(2));

    let second = client.list_suppliers(2, 2).await.unwrap();
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].name, "Hikma");
    assert!(!second.has_next);

    let all = client.list_all_suppliers().await.unwrap();
    assert_eq!(all.len(), 3);
}

// ============================================================================
// Suppliers
// ============================================================================

#[tokio::test]
async fn test_supplier_crud() {
    let backend = FakeBackend::spawn().await.unwrap();
    let client = backend.signed_in(PHARMACIST).await.unwrap();

    let mut input = SupplierInput::new("Biopharm");
    input.city = "Alger".to_owned();
    input.set_postal_code("16000");
    let created = client.create_supplier(&input).await.unwrap();
    assert_eq!(created.name, "Biopharm");
    assert_eq!(created.postal_code.as_deref(), Some("16000"));
    assert!(created.is_active);

    input.set_active(false);
    input.phone = "021 00 00 00".to_owned();
    let updated = client.update_supplier(&created.id, &input).await.unwrap();
    assert!(!updated.is_active);
    assert_eq!(updated.phone.as_deref(), Some("021 00 00 00"));

    let fetched = client.get_supplier(&created.id).await.unwrap();
    assert_eq!(fetched, updated);

    client.delete_supplier(&created.id).await.unwrap();
    let gone = client.get_supplier(&created.id).await.unwrap_err();
    assert!(gone.is_not_found());
}

#[tokio::test]
async fn test_supplier_without_name_is_rejected_locally() {
    let backend = FakeBackend::spawn().await.unwrap();
    let client = backend.signed_in(PHARMACIST).await.unwrap();

    let err = client
        .create_supplier(&SupplierInput::new("  "))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Validation { .. }));
    assert!(backend.requests_to("/api/suppliers/").is_empty());
}

// ============================================================================
// Invoices
// ============================================================================

#[tokio::test]
async fn test_invoice_create_and_mark_paid() {
    let backend = FakeBackend::spawn().await.unwrap();
    let supplier = backend.seed(Collection::Suppliers, json!({"name": "Biopharm"}));
    let client = backend.signed_in(PHARMACIST).await.unwrap();

    let mut input = InvoiceInput::new(ymd(2024, 3, 5));
    input.invoice_number = "F-2024-001".to_owned();
    input.supplier = Some(SupplierId::from(i64::try_from(supplier).unwrap()));
    input.net_to_pay = Money::from_centimes(150_000);
    input.status = InvoiceStatus::Pending;
    let invoice = client.create_invoice(&input).await.unwrap();

    assert_eq!(invoice.invoice_number, "F-2024-001");
    assert_eq!(invoice.supplier.name, "Biopharm");
    assert_eq!(invoice.net_to_pay, Money::from_centimes(150_000));
    assert_eq!(invoice.invoice_date, Some(ymd(2024, 3, 5)));
    assert!(invoice.is_payable());

    let paid_at = ymd(2024, 3, 20).and_hms_opt(10, 0, 0).unwrap();
    client.mark_invoice_paid(&invoice.id, paid_at).await.unwrap();

    let reloaded = client.get_invoice(&invoice.id).await.unwrap();
    assert_eq!(reloaded.status, InvoiceStatus::Paid);
    assert!(reloaded.is_paid);
    assert!(!reloaded.is_payable());
}

#[tokio::test]
async fn test_duplicate_invoice_number_reports_field_error() {
    let backend = FakeBackend::spawn().await.unwrap();
    let supplier = backend.seed(Collection::Suppliers, json!({"name": "Biopharm"}));
    seed_invoices(&backend, 1);
    let client = backend.signed_in(PHARMACIST).await.unwrap();

    let mut input = InvoiceInput::new(ymd(2024, 3, 5));
    input.invoice_number = "F-001".to_owned();
    input.supplier = Some(SupplierId::new(supplier.to_string()));
    input.net_to_pay = Money::from_centimes(1000);
    let err = client.create_invoice(&input).await.unwrap_err();

    let ApiError::Validation { fields, .. } = err else {
        panic!("expected a validation error, got {err:?}");
    };
    assert!(fields.iter().any(|f| f.field == "invoice_number"));
}

#[tokio::test]
async fn test_missing_invoice_is_not_found() {
    let backend = FakeBackend::spawn().await.unwrap();
    let client = backend.signed_in(PHARMACIST).await.unwrap();

    let err = client
        .get_invoice(&InvoiceId::new("999"))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_invoice_list_filter_over_fetched_rows() {
    let backend = FakeBackend::spawn().await.unwrap();
    for (number, date, status) in [
        ("F-001", "2024-03-05", "PAID"),
        ("F-002", "2024-02-10", "PENDING"),
        ("F-003", "2024-03-18", "PENDING"),
    ] {
        backend.seed(
            Collection::Invoices,
            json!({
                "invoice_number": number,
                "supplier_name": "Saidal",
                "invoice_date": date,
                "net_to_pay": 10,
                "status": status,
            }),
        );
    }
    let client = backend.signed_in(PHARMACIST).await.unwrap();
    let invoices = client.list_invoices().await.unwrap();

    let filter = InvoiceListFilter {
        search: String::new(),
        status: Some(InvoiceStatus::Pending),
        period: Some(QuickPeriod::Current),
    };
    let shown: Vec<&str> = filter
        .apply(&invoices, ymd(2024, 3, 20))
        .iter()
        .map(|i| i.invoice_number.as_str())
        .collect();

    assert_eq!(shown, ["F-003"]);
}

// ============================================================================
// Credit notes
// ============================================================================

#[tokio::test]
async fn test_credit_note_lifecycle() {
    let backend = FakeBackend::spawn().await.unwrap();
    let supplier = backend.seed(Collection::Suppliers, json!({"name": "Biopharm"}));
    let invoice = backend.seed(
        Collection::Invoices,
        json!({
            "invoice_number": "F-010",
            "supplier": supplier,
            "supplier_name": "Biopharm",
            "invoice_date": "2024-03-05",
            "net_to_pay": "500.00",
            "status": "PENDING",
        }),
    );
    let client = backend.signed_in(PHARMACIST).await.unwrap();

    let invoices = client.list_selectable_invoices().await.unwrap();
    let suppliers = client.list_all_suppliers().await.unwrap();

    let mut input = CreditNoteInput::new(ymd(2024, 3, 12));
    input.credit_note_number = "AV-001".to_owned();
    input.invoice = Some(InvoiceId::new(invoice.to_string()));
    input.amount = Money::from_centimes(5_000);
    input.reason = "Produits périmés".to_owned();
    let note = client
        .create_credit_note(&input, &invoices, &suppliers)
        .await
        .unwrap();

    assert_eq!(note.credit_note_number, "AV-001");
    assert_eq!(note.invoice_number(), Some("F-010"));
    assert_eq!(note.status, CreditNoteStatus::Pending);

    let stored_supplier = backend.with_state(|state| state.credit_notes[0]["supplier"].clone());
    assert_eq!(stored_supplier, json!(supplier));

    client.apply_credit_note(&note.id).await.unwrap();
    let applied = client.get_credit_note(&note.id).await.unwrap();
    assert_eq!(applied.status, CreditNoteStatus::Applied);

    client.delete_credit_note(&note.id).await.unwrap();
    assert!(client.list_credit_notes().await.unwrap().is_empty());
    let gone = client
        .get_credit_note(&CreditNoteId::new(note.id.as_str()))
        .await
        .unwrap_err();
    assert!(gone.is_not_found());
}
