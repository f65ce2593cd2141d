//! Officine Core - Domain types for the pharmacy back-office client.
//!
//! This crate provides the types shared by every Officine component:
//! - `client` - REST client, session handling, dashboard aggregation, PDF export
//! - `cli` - Command-line front end over the client
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no storage. Backend payloads are turned into canonical models here,
//! once, so everything downstream sees a single shape.
//!
//! # Modules
//!
//! - [`types`] - Entities, identifiers, money, statuses, periods and roles
//! - [`envelope`] - Normalization of the `{data}` / `{results, next}` / bare shapes
//! - [`mapping`] - Declarative field-name tables applied to raw payloads
//! - [`validation`] - Backend error-message extraction and form checks

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod envelope;
pub mod mapping;
pub mod types;
pub mod validation;

pub use envelope::{Envelope, EnvelopeError, continuation_path, decode_all};
pub use mapping::{FieldMap, Payload};
pub use types::*;
pub use validation::{ValidationError, extract_error_message, field_errors};
