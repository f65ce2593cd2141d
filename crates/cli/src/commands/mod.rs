//! Command implementations.

pub mod auth;
pub mod credit_notes;
pub mod dashboard;
pub mod invoices;
pub mod suppliers;

use chrono::NaiveDate;
use officine_client::{
    ApiClient, ApiError, ClientConfig, FileSessionStore, PdfError, Session, SessionError,
};
use officine_core::{Money, parse_display_date};
use thiserror::Error;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{message}: {0}", message = .0.user_message())]
    Api(#[from] ApiError),

    #[error(transparent)]
    Pdf(#[from] PdfError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Backend unreachable: {0}")]
    Unreachable(String),
}

/// Shared state for one CLI invocation.
pub struct Context {
    pub client: ApiClient,
    pub config: ClientConfig,
}

impl Context {
    /// Build the client over the on-disk session and restore it.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub async fn new(config: ClientConfig) -> Result<Self, CommandError> {
        let session = Session::new(FileSessionStore::new(config.session_path.clone()));
        if session.restore().await {
            tracing::debug!("Session restored");
        }
        let client = ApiClient::new(&config, session)?;
        Ok(Self { client, config })
    }

    /// Local calendar date.
    pub fn today() -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// Parse an amount such as `1234,56` or `1 234.56`.
///
/// # Errors
///
/// Returns error if the text is not a number or is negative.
pub fn parse_amount(text: &str) -> Result<Money, String> {
    let normalized: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    match normalized.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(Money::parse_lenient(&normalized)),
        Ok(_) => Err(format!("amount must be positive: {text}")),
        Err(_) => Err(format!("not an amount: {text}")),
    }
}

/// Parse `DD/MM/YYYY` or `YYYY-MM-DD`.
///
/// # Errors
///
/// Returns error if the text matches neither format.
pub fn parse_date(text: &str) -> Result<NaiveDate, String> {
    parse_display_date(text).ok_or_else(|| format!("expected DD/MM/YYYY or YYYY-MM-DD: {text}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_accepts_french_decimal() {
        assert_eq!(parse_amount("1 234,56").unwrap(), Money::from_centimes(123_456));
        assert_eq!(parse_amount("10").unwrap(), Money::from_centimes(1000));
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("-5").is_err());
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(parse_date("15/03/2024").unwrap(), expected);
        assert_eq!(parse_date("2024-03-15").unwrap(), expected);
        assert!(parse_date("March 15").is_err());
    }
}
