//! Dashboard controller against the fake backend: period snapshots, KPI
//! recomputation and superseded fetches.

#![allow(clippy::unwrap_used, clippy::float_cmp)]

use std::time::Duration;

use officine_client::dashboard::KpiKey;
use officine_client::{DashboardController, DashboardFilter};
use officine_core::{Money, Month, PeriodFilter, StatusBucket, Year};
use officine_integration_tests::{Collection, FakeBackend, PHARMACIST, PeriodSnapshot};
use serde_json::{Value, json};

fn global_snapshot() -> Value {
    json!({
        "period": {"current_month": 3, "current_year": 2024, "month_name": "Mars"},
        "overview": {
            "total_suppliers": 4,
            "current_month": {
                "total_invoices": "1500.00",
                "total_credit_notes": "100.00",
                "net_amount": "1400.00",
                "invoice_count": 3,
                "credit_note_count": 1
            },
            "year_to_date": {"invoice_count": 12}
        },
        "top_suppliers": [
            {"supplier_name": "Biopharm", "total_amount": "1000.00"},
            {"supplier_name": "Saidal", "total_amount": "500.00"}
        ],
        "recent_invoices": [
            {
                "id": "1",
                "invoice_number": "F-001",
                "supplier_name": "Biopharm",
                "net_to_pay": "1000.00",
                "month": 3,
                "year": 2024,
                "status": "PAID",
                "created_at": "2024-03-05T10:00:00"
            },
            {
                "id": "3",
                "invoice_number": "F-003",
                "supplier_name": "Saidal",
                "net_to_pay": "500.00",
                "month": 3,
                "year": 2024,
                "status": "OVERDUE",
                "created_at": "2024-03-18T09:30:00"
            }
        ]
    })
}

fn period_snapshot(month: u32, year: i32, invoice_count: u64, echo_month: u32) -> Value {
    json!({
        "period": {"current_month": month, "current_year": year},
        "overview": {
            "total_suppliers": 4,
            "current_month": {
                "total_invoices": "9000.00",
                "net_amount": "9000.00",
                "invoice_count": invoice_count
            }
        },
        "filter_info": {"month": echo_month, "year": year}
    })
}

async fn seeded_backend() -> FakeBackend {
    let backend = FakeBackend::spawn().await.unwrap();
    for (number, date, amount, status) in [
        ("F-001", "2024-03-05", "1000.00", "PAID"),
        ("F-002", "2024-02-10", "300.00", "PENDING"),
        ("F-003", "2024-03-18", "500.00", "OVERDUE"),
    ] {
        backend.seed(
            Collection::Invoices,
            json!({
                "invoice_number": number,
                "supplier_name": "Biopharm",
                "invoice_date": date,
                "net_to_pay": amount,
                "status": status,
            }),
        );
    }
    backend.seed(
        Collection::CreditNotes,
        json!({
            "credit_note_number": "AV-001",
            "invoice_number": "F-001",
            "supplier_name": "Biopharm",
            "credit_note_date": "2024-03-12",
            "amount": "100.00",
            "status": "PENDING",
        }),
    );
    backend.with_state(|state| state.dashboard = global_snapshot());
    backend
}

async fn loaded_controller(backend: &FakeBackend) -> DashboardController {
    let client = backend.signed_in(PHARMACIST).await.unwrap();
    let controller = DashboardController::new(client);
    controller.load().await.unwrap();
    controller
}

fn period(month: u32, year: i32) -> DashboardFilter {
    DashboardFilter {
        period: PeriodFilter {
            month: Some(Month::new(month).unwrap()),
            year: Some(Year::new(year).unwrap()),
        },
        status: None,
    }
}

fn numbers(controller: &DashboardController) -> Vec<String> {
    controller
        .view()
        .rows
        .into_iter()
        .map(|row| row.number)
        .collect()
}

#[tokio::test]
async fn test_unfiltered_dashboard_uses_global_snapshot() {
    let backend = seeded_backend().await;
    let controller = loaded_controller(&backend).await;

    let view = controller.view();
    assert_eq!(numbers(&controller), ["F-001", "F-003"]);
    assert_eq!(
        view.kpis.get(KpiKey::InvoiceCount).unwrap().to_f64(),
        3.0
    );
    assert_eq!(view.kpis.get(KpiKey::TotalSuppliers).unwrap().to_f64(), 4.0);
    assert_eq!(view.kpis.get(KpiKey::NetAmount).unwrap().to_f64(), 1400.0);

    assert_eq!(view.monthly.labels, ["2024-03"]);
    assert_eq!(view.monthly.values, [1500.0]);
    assert_eq!(view.suppliers.labels, ["Biopharm", "Saidal"]);
}

#[tokio::test]
async fn test_period_snapshot_is_trusted_when_echo_matches() {
    let backend = seeded_backend().await;
    backend.with_state(|state| {
        state.period_dashboards.insert(
            "02/2024".to_owned(),
            PeriodSnapshot {
                body: period_snapshot(2, 2024, 7, 2),
                delay: Duration::ZERO,
            },
        );
    });
    let controller = loaded_controller(&backend).await;

    controller.set_filter(period(2, 2024)).await.unwrap();

    assert_eq!(numbers(&controller), ["F-002"]);
    let view = controller.view();
    assert_eq!(view.kpis.get(KpiKey::InvoiceCount).unwrap().to_f64(), 7.0);
    assert_eq!(view.kpis.get(KpiKey::TotalSuppliers).unwrap().to_f64(), 4.0);
    assert_eq!(controller.kpi_period_label(), "Février 2024");
    assert!(
        backend
            .requests_to("/api/reports/dashboard/")
            .contains(&"GET /api/reports/dashboard/?month=02&year=2024".to_owned())
    );
}

#[tokio::test]
async fn test_mismatched_period_snapshot_is_recomputed_from_rows() {
    let backend = seeded_backend().await;
    backend.with_state(|state| {
        // Figures claim to be for February although March was asked.
        state.period_dashboards.insert(
            "03/2024".to_owned(),
            PeriodSnapshot {
                body: period_snapshot(2, 2024, 7, 3),
                delay: Duration::ZERO,
            },
        );
    });
    let controller = loaded_controller(&backend).await;

    controller.set_filter(period(3, 2024)).await.unwrap();

    assert_eq!(numbers(&controller), ["F-001", "F-003", "AV-001"]);
    let kpis = controller.view().kpis;
    assert_eq!(kpis.get(KpiKey::InvoiceCount).unwrap().to_f64(), 2.0);
    assert_eq!(kpis.get(KpiKey::CreditNoteCount).unwrap().to_f64(), 1.0);
    assert_eq!(kpis.get(KpiKey::TotalInvoices).unwrap().to_f64(), 1500.0);
    assert_eq!(kpis.get(KpiKey::NetAmount).unwrap().to_f64(), 1400.0);
}

#[tokio::test]
async fn test_status_filter_recomputes_without_fetching() {
    let backend = seeded_backend().await;
    let controller = loaded_controller(&backend).await;
    let before = backend.requests_to("/api/reports/dashboard/").len();

    controller.select_status(Some(StatusBucket::Paid));

    assert_eq!(numbers(&controller), ["F-001"]);
    let kpis = controller.view().kpis;
    assert_eq!(kpis.get(KpiKey::InvoiceCount).unwrap().to_f64(), 1.0);
    assert_eq!(kpis.get(KpiKey::CreditNoteCount).unwrap().to_f64(), 0.0);
    assert_eq!(
        kpis.get(KpiKey::TotalInvoices).unwrap().to_f64(),
        Money::from_centimes(100_000).to_f64()
    );
    assert_eq!(backend.requests_to("/api/reports/dashboard/").len(), before);
}

#[tokio::test]
async fn test_superseded_period_fetch_is_discarded() {
    let backend = seeded_backend().await;
    backend.with_state(|state| {
        state.period_dashboards.insert(
            "01/2024".to_owned(),
            PeriodSnapshot {
                body: period_snapshot(1, 2024, 11, 1),
                delay: Duration::from_millis(400),
            },
        );
        state.period_dashboards.insert(
            "02/2024".to_owned(),
            PeriodSnapshot {
                body: period_snapshot(2, 2024, 7, 2),
                delay: Duration::ZERO,
            },
        );
    });
    let controller = loaded_controller(&backend).await;

    let slow = controller.set_filter(period(1, 2024));
    let fast = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        controller.set_filter(period(2, 2024)).await
    };
    let (slow, fast) = tokio::join!(slow, fast);
    slow.unwrap();
    fast.unwrap();

    // Give an unaborted slow answer time to land.
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(controller.filter(), period(2, 2024));
    assert_eq!(
        controller
            .view()
            .kpis
            .get(KpiKey::InvoiceCount)
            .unwrap()
            .to_f64(),
        7.0
    );
}

#[tokio::test]
async fn test_reset_returns_to_recent_invoices() {
    let backend = seeded_backend().await;
    let controller = loaded_controller(&backend).await;
    controller.set_filter(period(2, 2024)).await.unwrap();
    controller.select_status(Some(StatusBucket::Pending));

    controller.reset_filters();

    assert_eq!(controller.filter(), DashboardFilter::none());
    assert_eq!(numbers(&controller), ["F-001", "F-003"]);
    assert_eq!(
        controller
            .view()
            .kpis
            .get(KpiKey::InvoiceCount)
            .unwrap()
            .to_f64(),
        3.0
    );
}

#[tokio::test]
async fn test_failed_list_leaves_rows_empty_but_loads() {
    let backend = seeded_backend().await;
    backend.with_state(|state| {
        state.failing_pages.insert((Collection::CreditNotes, 1));
    });
    let controller = loaded_controller(&backend).await;

    controller.select_status(Some(StatusBucket::Pending));

    assert_eq!(numbers(&controller), ["F-002"]);
}
