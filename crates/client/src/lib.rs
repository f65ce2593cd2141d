//! Officine Client - REST client and back-office logic.
//!
//! This crate talks to the Officine backend and holds everything the front
//! ends share on top of it:
//!
//! - [`api`] - HTTP wrapper: auth header, envelopes, pagination, loading flag
//! - [`session`] - Token and profile persistence, role checks
//! - [`services`] - Endpoints for suppliers, invoices, credit notes, reports
//!   and auth
//! - [`listing`] - Local search and filters over entity lists
//! - [`dashboard`] - Period filtering, KPI resolution and chart series
//! - [`pdf`] - Invoice, credit note and monthly report documents
//!
//! # Credentials
//!
//! The bearer token lives only in [`Session`]. A 401 from any endpoint clears
//! it before the error reaches the caller.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod listing;
pub mod pdf;
pub mod services;
pub mod session;

pub use api::ApiClient;
pub use config::{ClientConfig, ConfigError, PharmacyInfo};
pub use dashboard::{DashboardController, DashboardFilter, DashboardView};
pub use error::{ApiError, PdfError};
pub use listing::{CreditNoteListFilter, InvoiceListFilter, search_suppliers};
pub use pdf::Document;
pub use services::{ConnectionStatus, SupplierPage};
pub use session::{
    FileSessionStore, MemorySessionStore, Session, SessionError, SessionStore, StoredSession,
};
