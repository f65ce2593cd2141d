//! Dashboard and monthly report endpoints.

use officine_core::{DashboardKpi, Envelope, Month, MonthlyReport, Payload, PeriodFilter, Year};
use serde_json::Value;
use tracing::instrument;

use crate::api::ApiClient;
use crate::error::ApiError;

/// Build `base` with `pairs` as query string.
fn with_query(base: &str, pairs: &[(&str, String)]) -> String {
    if pairs.is_empty() {
        return base.to_owned();
    }
    let query: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{base}?{}", query.join("&"))
}

impl ApiClient {
    /// Fetch the dashboard snapshot, scoped to `filter` when it is active.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or the body is malformed.
    #[instrument(skip(self), fields(period = %filter.label()))]
    pub async fn dashboard(&self, filter: &PeriodFilter) -> Result<DashboardKpi, ApiError> {
        let path = with_query("/api/reports/dashboard/", &filter.query_pairs());
        let body: Value = self.get(&path).await?;
        let snapshot = match Envelope::normalize(body).into_single()? {
            Value::Null => DashboardKpi::default(),
            value => serde_json::from_value(value)?,
        };
        Ok(snapshot)
    }

    /// Fetch the monthly report for `month`/`year`, filling missing totals
    /// from the supplier breakdown.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or the body is malformed.
    #[instrument(skip(self), fields(month = %month, year = %year))]
    pub async fn monthly_report(&self, month: Month, year: Year) -> Result<MonthlyReport, ApiError> {
        let path = format!(
            "/api/reports/monthly/?month={}&year={}",
            month.padded(),
            year.value()
        );
        let body: Value = self.get(&path).await?;
        let report = match Envelope::normalize(body).into_single()? {
            Value::Null => MonthlyReport::default(),
            value => MonthlyReport::from_payload(value)?,
        };
        Ok(report.with_fallbacks(month, year))
    }
}
