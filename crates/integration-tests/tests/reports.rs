//! Monthly report and document export against the fake backend.

#![allow(clippy::unwrap_used)]

use chrono::NaiveDate;
use officine_client::PharmacyInfo;
use officine_client::pdf::{credit_note_pdf, invoice_pdf, monthly_report_pdf};
use officine_core::{InvoiceId, Money, Month, Year};
use officine_integration_tests::{Collection, FakeBackend, PHARMACIST};
use serde_json::json;

fn march() -> (Month, Year) {
    (Month::new(3).unwrap(), Year::new(2024).unwrap())
}

#[tokio::test]
async fn test_monthly_report_fills_missing_totals_from_breakdown() {
    let backend = FakeBackend::spawn().await.unwrap();
    backend.with_state(|state| {
        state.monthly_report = json!({
            "success": true,
            "data": {
                "supplierBreakdown": [
                    {
                        "supplier": {"id": 1, "name": "Biopharm"},
                        "invoiceCount": 2,
                        "totalAmount": "1500.00",
                        "creditNoteCount": 1,
                        "totalCreditAmount": "100.00",
                        "netAmount": "1400.00"
                    },
                    {
                        "supplier": {"id": 2, "name": "Saidal"},
                        "invoice_count": 1,
                        "total_amount": 250,
                        "credit_note_count": 0,
                        "total_credit_amount": 0,
                        "net_amount": 250
                    }
                ]
            }
        });
    });
    let client = backend.signed_in(PHARMACIST).await.unwrap();
    let (month, year) = march();

    let report = client.monthly_report(month, year).await.unwrap();

    assert_eq!(report.month, Some(3));
    assert_eq!(report.year, Some(2024));
    assert_eq!(report.invoices_count, 3);
    assert_eq!(report.credit_notes_count, 1);
    assert_eq!(report.total_invoices_amount, Money::from_centimes(175_000));
    assert_eq!(report.total_credit_notes_amount, Money::from_centimes(10_000));
    assert_eq!(report.net_to_pay, Money::from_centimes(165_000));
    assert_eq!(report.period_label(), "Mars 2024");
    assert_eq!(
        backend.requests_to("/api/reports/monthly/"),
        ["GET /api/reports/monthly/?month=03&year=2024"]
    );
}

#[tokio::test]
async fn test_sent_totals_are_kept() {
    let backend = FakeBackend::spawn().await.unwrap();
    backend.with_state(|state| {
        state.monthly_report = json!({
            "month": 3,
            "year": 2024,
            "net_to_pay": "999.00",
            "invoices_count": 9,
            "supplier_breakdown": [
                {"supplier": {"name": "Biopharm"}, "invoice_count": 1, "net_amount": 10}
            ]
        });
    });
    let client = backend.signed_in(PHARMACIST).await.unwrap();
    let (month, year) = march();

    let report = client.monthly_report(month, year).await.unwrap();

    assert_eq!(report.invoices_count, 9);
    assert_eq!(report.net_to_pay, Money::from_centimes(99_900));
}

#[tokio::test]
async fn test_empty_report_falls_back_to_requested_period() {
    let backend = FakeBackend::spawn().await.unwrap();
    let client = backend.signed_in(PHARMACIST).await.unwrap();
    let (month, year) = march();

    let report = client.monthly_report(month, year).await.unwrap();

    assert_eq!(report.period_label(), "Mars 2024");
    assert!(report.supplier_breakdown.is_empty());
    assert!(report.net_to_pay.is_zero());

    let document = monthly_report_pdf(&report, NaiveDate::from_ymd_opt(2024, 4, 1).unwrap())
        .unwrap();
    assert_eq!(document.file_name, "rapport_03_2024.pdf");
    assert!(document.bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_export_fetched_documents() {
    let backend = FakeBackend::spawn().await.unwrap();
    let supplier = backend.seed(
        Collection::Suppliers,
        json!({"name": "Biopharm", "address": "12 rue Didouche", "city": "Alger"}),
    );
    let invoice = backend.seed(
        Collection::Invoices,
        json!({
            "invoice_number": "F-2024/007",
            "supplier": {"id": supplier, "name": "Biopharm"},
            "invoice_date": "2024-03-05",
            "total_amount": "1190.00",
            "vat_amount": "190.00",
            "net_to_pay": "1190.00",
            "status": "PENDING",
        }),
    );
    backend.seed(
        Collection::CreditNotes,
        json!({
            "credit_note_number": "AV-001",
            "invoice": {"id": invoice, "invoice_number": "F-2024/007"},
            "supplier_name": "Biopharm",
            "credit_note_date": "2024-03-12",
            "amount": "100.00",
            "reason": "Produits périmés",
            "status": "APPLIED",
        }),
    );
    let client = backend.signed_in(PHARMACIST).await.unwrap();
    let pharmacy = PharmacyInfo::default();

    let fetched = client
        .get_invoice(&InvoiceId::new(invoice.to_string()))
        .await
        .unwrap();
    let supplier = client
        .get_supplier(fetched.supplier.id.as_ref().unwrap())
        .await
        .unwrap();
    let document = invoice_pdf(&fetched, Some(&supplier), &pharmacy).unwrap();
    assert_eq!(document.file_name, "facture_F-2024_007.pdf");
    assert!(document.bytes.starts_with(b"%PDF"));

    let notes = client.list_credit_notes().await.unwrap();
    let document = credit_note_pdf(&notes[0], &pharmacy).unwrap();
    assert_eq!(document.file_name, "avoir_AV-001.pdf");

    let dir = std::env::temp_dir().join(format!("officine-pdf-{}", uuid::Uuid::new_v4()));
    let path = document.write_to(&dir).unwrap();
    assert!(path.ends_with("avoir_AV-001.pdf"));
    assert!(std::fs::read(&path).unwrap().starts_with(b"%PDF"));
    let _ = std::fs::remove_dir_all(dir);
}
