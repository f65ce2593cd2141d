//! Core types for Officine.
//!
//! This module provides the canonical client-side view models. Every entity is
//! built from a backend payload through its field-mapping table, so the rest of
//! the code never sees snake_case/camelCase variants.

pub mod credit_note;
pub mod date;
pub mod email;
pub mod id;
pub mod invoice;
pub mod lenient;
pub mod money;
pub mod period;
pub mod report;
pub mod status;
pub mod supplier;
pub mod user;

pub use credit_note::{CreditNote, CreditNoteInput, InvoiceRef, selectable_invoices};
pub use date::{format_date, parse_api_date, parse_api_datetime, parse_display_date, to_api_date};
pub use email::{Email, EmailError};
pub use id::*;
pub use invoice::{Invoice, InvoiceInput, SupplierRef};
pub use money::{Money, format_currency};
pub use period::{MONTH_NAMES_FR, Month, PeriodError, PeriodFilter, QuickPeriod, Year, year_choices};
pub use report::{
    DashboardKpi, FilterInfo, KpiPeriod, MonthlyReport, Overview, PeriodTotals, RecentInvoice,
    ReportSupplier, SupplierReport, TopSupplier, format_evolution,
};
pub use status::*;
pub use supplier::{Supplier, SupplierInput};
pub use user::{
    Access, AuthResponse, LoginRequest, Operation, RegisterRequest, RoleParseError, User, UserRole,
};
