//! Dashboard state: loads data, applies filter changes and keeps only the latest KPI fetch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use officine_core::{
    CreditNote, DashboardKpi, Invoice, Month, PeriodFilter, QuickPeriod, StatusBucket,
};
use tokio::task::AbortHandle;
use tracing::instrument;

use super::chart::{ChartSeries, monthly_trend, supplier_breakdown};
use super::filter::{DashboardFilter, DashboardRow, filtered_rows};
use super::kpi::KpiValues;
use crate::api::ApiClient;
use crate::error::ApiError;

// ============================================================================
// State
// ============================================================================

#[derive(Debug, Default)]
struct DashboardState {
    /// Unfiltered snapshot.
    global: Option<DashboardKpi>,
    /// Snapshot for the selected period.
    dynamic: Option<DashboardKpi>,
    invoices: Vec<Invoice>,
    credit_notes: Vec<CreditNote>,
    filter: DashboardFilter,
    rows: Vec<DashboardRow>,
}

impl DashboardState {
    fn reapply(&mut self) {
        self.rows = filtered_rows(
            &self.filter,
            self.global.as_ref(),
            &self.invoices,
            &self.credit_notes,
        );
    }

    fn view(&self) -> DashboardView {
        let (monthly, suppliers) = self.global.as_ref().map_or_else(
            || (ChartSeries::default(), ChartSeries::default()),
            |kpi| {
                (
                    monthly_trend(&kpi.recent_invoices),
                    supplier_breakdown(&kpi.top_suppliers),
                )
            },
        );
        DashboardView {
            filter: self.filter,
            rows: self.rows.clone(),
            kpis: KpiValues::resolve(
                self.global.as_ref(),
                self.dynamic.as_ref(),
                &self.filter,
                &self.rows,
            ),
            monthly,
            suppliers,
        }
    }
}

/// Everything the dashboard displays, as of one moment.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub filter: DashboardFilter,
    pub rows: Vec<DashboardRow>,
    pub kpis: KpiValues,
    pub monthly: ChartSeries,
    pub suppliers: ChartSeries,
}

// ============================================================================
// Controller
// ============================================================================

/// Drives the dashboard: loads its data, applies filter changes and keeps
/// the KPI snapshot in step with the selected period.
///
/// Only the latest period selection may update the KPIs. Each period change
/// bumps a generation counter and aborts the fetch started for the previous
/// one; a response that still lands for an older generation is dropped.
///
/// Cloning is cheap; clones share state.
#[derive(Clone)]
pub struct DashboardController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    client: ApiClient,
    state: Mutex<DashboardState>,
    generation: AtomicU64,
    kpi_task: Mutex<Option<AbortHandle>>,
}

impl ControllerInner {
    fn state(&self) -> MutexGuard<'_, DashboardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new generation and abort the KPI fetch of the previous one.
    /// Called with the state lock held so a finishing fetch sees either the
    /// old generation and state or the new ones.
    fn next_generation(&self) -> u64 {
        if let Some(previous) = self
            .kpi_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            previous.abort();
        }
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl DashboardController {
    #[must_use]
    pub fn new(client: ApiClient) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                client,
                state: Mutex::new(DashboardState::default()),
                generation: AtomicU64::new(0),
                kpi_task: Mutex::new(None),
            }),
        }
    }

    /// Load the global snapshot, every invoice and every credit note
    /// concurrently. Each completion reapplies the current filter.
    ///
    /// A failed list leaves that list empty and is only logged.
    ///
    /// # Errors
    ///
    /// Returns the snapshot error if the snapshot could not be loaded, or
    /// `Unauthorized` if any request was rejected for credentials.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<(), ApiError> {
        let client = &self.inner.client;

        let snapshot = async {
            let result = client.dashboard(&PeriodFilter::none()).await;
            let mut state = self.inner.state();
            match result {
                Ok(kpi) => {
                    state.global = Some(kpi);
                    state.reapply();
                    Ok(())
                }
                Err(e) => Err(e),
            }
        };
        let invoices = async {
            let result = client.list_invoices().await;
            let (invoices, outcome) = keep_or_empty(result, "invoices");
            let mut state = self.inner.state();
            state.invoices = invoices;
            state.reapply();
            outcome
        };
        let credit_notes = async {
            let result = client.list_credit_notes().await;
            let (notes, outcome) = keep_or_empty(result, "credit notes");
            let mut state = self.inner.state();
            state.credit_notes = notes;
            state.reapply();
            outcome
        };

        let (snapshot, invoices, credit_notes) = tokio::join!(snapshot, invoices, credit_notes);
        invoices?;
        credit_notes?;
        snapshot?;
        tracing::debug!("Dashboard loaded");
        Ok(())
    }

    /// Select `filter`. The table is updated at once; when the period changed
    /// the KPI snapshot for the new period is fetched before returning.
    ///
    /// Returns `Ok` without touching the KPIs if a later selection superseded
    /// this one while its fetch was in flight.
    ///
    /// # Errors
    ///
    /// Returns error if the period snapshot could not be fetched; the KPIs
    /// then read zero until the next selection.
    #[instrument(skip(self), fields(period = %filter.period.label()))]
    pub async fn set_filter(&self, filter: DashboardFilter) -> Result<(), ApiError> {
        let generation = {
            let mut state = self.inner.state();
            let period_changed = state.filter.period != filter.period;
            state.filter = filter;
            state.reapply();
            if !period_changed {
                return Ok(());
            }
            state.dynamic = None;
            self.inner.next_generation()
        };
        if !filter.period.is_active() {
            return Ok(());
        }
        self.fetch_period_kpis(filter.period, generation).await
    }

    /// Select a quick period preset as of `today`, keeping the status filter.
    ///
    /// # Errors
    ///
    /// See [`DashboardController::set_filter`].
    pub async fn select_quick_period(
        &self,
        preset: QuickPeriod,
        today: NaiveDate,
    ) -> Result<(), ApiError> {
        let filter = self.filter().with_quick_period(preset, today);
        self.set_filter(filter).await
    }

    /// Change the status filter. Never fetches.
    pub fn select_status(&self, status: Option<StatusBucket>) {
        let mut state = self.inner.state();
        state.filter = state.filter.with_status(status);
        state.reapply();
    }

    /// Back to the unfiltered dashboard: recent invoices and the global
    /// figures. Any KPI fetch in flight is abandoned.
    pub fn reset_filters(&self) {
        let mut state = self.inner.state();
        state.filter = DashboardFilter::none();
        state.dynamic = None;
        state.reapply();
        self.inner.next_generation();
    }

    async fn fetch_period_kpis(&self, period: PeriodFilter, generation: u64) -> Result<(), ApiError> {
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let result = inner.client.dashboard(&period).await;
            let mut state = inner.state();
            if inner.generation.load(Ordering::SeqCst) != generation {
                tracing::debug!(generation, "Discarding superseded dashboard snapshot");
                return Ok(());
            }
            match result {
                Ok(kpi) => {
                    state.dynamic = Some(kpi);
                    Ok(())
                }
                Err(e) => {
                    state.dynamic = None;
                    Err(e)
                }
            }
        });

        {
            // Register unless a newer selection already started.
            let state = self.inner.state();
            if self.inner.generation.load(Ordering::SeqCst) == generation {
                *self
                    .inner
                    .kpi_task
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(task.abort_handle());
            } else {
                task.abort();
            }
            drop(state);
        }

        match task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => {
                tracing::debug!(generation, "Dashboard snapshot fetch cancelled");
                Ok(())
            }
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        }
    }

    /// Current filter.
    #[must_use]
    pub fn filter(&self) -> DashboardFilter {
        self.inner.state().filter
    }

    /// Current rows, KPIs and charts.
    #[must_use]
    pub fn view(&self) -> DashboardView {
        self.inner.state().view()
    }

    /// Label of the KPI cards: `Mars 2024`, `Mars`, `2024` or `ce mois`.
    #[must_use]
    pub fn kpi_period_label(&self) -> String {
        self.inner.state().filter.period.label()
    }

    /// Month picker entries: two-digit value and French name.
    #[must_use]
    pub fn month_choices() -> Vec<(String, &'static str)> {
        Month::all().map(|m| (m.padded(), m.name_fr())).collect()
    }

    /// Year picker entries, newest first.
    #[must_use]
    pub fn year_choices(today: NaiveDate) -> Vec<i32> {
        officine_core::year_choices(today)
    }
}

impl std::fmt::Debug for DashboardController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardController")
            .field("generation", &self.inner.generation.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Keep a loaded list, or fall back to an empty one. Credential failures
/// are still reported.
fn keep_or_empty<T>(
    result: Result<Vec<T>, ApiError>,
    what: &str,
) -> (Vec<T>, Result<(), ApiError>) {
    match result {
        Ok(rows) => (rows, Ok(())),
        Err(e @ ApiError::Unauthorized) => (Vec::new(), Err(e)),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load {what} for the dashboard");
            (Vec::new(), Ok(()))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::session::Session;
    use officine_core::Payload;
    use serde_json::json;

    /// A controller whose client points at a closed port. Only paths that
    /// never reach the network may be exercised with it.
    fn offline() -> DashboardController {
        let config = ClientConfig::for_base_url("http://127.0.0.1:9").unwrap();
        DashboardController::new(ApiClient::new(&config, Session::in_memory()).unwrap())
    }

    fn seed(controller: &DashboardController) {
        let mut state = controller.inner.state();
        state.global = Some(
            serde_json::from_value(json!({
                "overview": {"total_suppliers": 4, "current_month": {"net_amount": 75}},
                "top_suppliers": [{"supplier_name": "Biopharm", "total_amount": 75}],
                "recent_invoices": [{"invoice_number": "F-9", "net_to_pay": 75, "month": 5, "year": 2024}]
            }))
            .unwrap(),
        );
        state.invoices = vec![
            Invoice::from_payload(json!({"id": 1, "invoice_number": "F-1", "invoice_date": "2024-03-05", "net_to_pay": 100, "status": "PENDING"})).unwrap(),
            Invoice::from_payload(json!({"id": 2, "invoice_number": "F-2", "invoice_date": "2024-03-09", "net_to_pay": 40, "status": "PAID"})).unwrap(),
        ];
        state.reapply();
    }

    #[test]
    fn test_unfiltered_view() {
        let controller = offline();
        seed(&controller);
        let view = controller.view();
        assert_eq!(view.rows.len(), 1);
        assert_eq!(view.rows[0].number, "F-9");
        assert_eq!(view.monthly.labels, ["2024-05"]);
        assert_eq!(view.suppliers.labels, ["Biopharm"]);
        assert_eq!(view.kpis.period_label, "ce mois");
        assert_eq!(controller.kpi_period_label(), "ce mois");
    }

    #[tokio::test]
    async fn test_status_change_does_not_fetch() {
        let controller = offline();
        seed(&controller);
        let before = controller.inner.generation.load(Ordering::SeqCst);

        controller.select_status(Some(StatusBucket::Paid));
        let filter = controller.filter();
        controller.set_filter(filter).await.unwrap();

        assert_eq!(controller.inner.generation.load(Ordering::SeqCst), before);
        let view = controller.view();
        assert_eq!(view.rows.len(), 1);
        assert_eq!(view.rows[0].number, "F-2");
        assert_eq!(
            view.kpis.get(crate::dashboard::KpiKey::TotalInvoices).unwrap().to_string(),
            "40,00 DA"
        );
    }

    #[test]
    fn test_reset_filters() {
        let controller = offline();
        seed(&controller);
        controller.select_status(Some(StatusBucket::Pending));
        {
            let mut state = controller.inner.state();
            state.filter.period = PeriodFilter::from_selection("03", "2024").unwrap();
            state.dynamic = state.global.clone();
        }
        let before = controller.inner.generation.load(Ordering::SeqCst);

        controller.reset_filters();

        assert_eq!(controller.filter(), DashboardFilter::none());
        assert!(controller.inner.state().dynamic.is_none());
        assert_eq!(controller.inner.generation.load(Ordering::SeqCst), before + 1);
        assert_eq!(controller.view().rows[0].number, "F-9");
    }

    #[test]
    fn test_picker_choices() {
        let months = DashboardController::month_choices();
        assert_eq!(months.len(), 12);
        assert_eq!(months[0], ("01".to_owned(), "Janvier"));
        let years = DashboardController::year_choices(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(years.first(), Some(&2029));
    }

    #[test]
    fn test_keep_or_empty() {
        let (rows, outcome) = keep_or_empty::<u8>(Err(ApiError::NotFound("/x".to_owned())), "x");
        assert!(rows.is_empty());
        assert!(outcome.is_ok());
        let (_, outcome) = keep_or_empty::<u8>(Err(ApiError::Unauthorized), "x");
        assert!(matches!(outcome, Err(ApiError::Unauthorized)));
    }
}
