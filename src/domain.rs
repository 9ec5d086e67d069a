//! Domain models for request tracking.
//!
//! This module contains the request record, the pure derivations the
//! dashboard is built from, and the rules applied when a single field of a
//! request changes.

/// Request records and their identifiers.
pub mod request;
pub use request::{
    FollowUp, NewFollowUp, NewRequest, Priority, ReminderFrequency, Request, RequestDraft,
    RequestId, Status, UnknownVariant,
};

mod config;
pub use config::Config;

/// Lateness and status badges.
pub mod badge;
pub use badge::{is_late, status_badge, Badge, BadgeStyle};

/// Filtering of the request list.
pub mod filter;
pub use filter::{filter, FilterParams};

/// Dashboard aggregates.
pub mod kpi;
pub use kpi::{compute_kpis, Kpis};

/// Single-field update rules.
pub mod update;
pub use update::{apply_field_update, FieldUpdate, FieldValueError, Patch, UpdatePolicy};

mod validation;
pub use validation::ValidationError;

use chrono::NaiveDate;

/// The current date on the local calendar.
///
/// Derivations take the date as an argument; this is what callers pass in.
#[must_use]
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
