//! Request tracking for support teams.
//!
//! Requests are markdown documents stored in a directory. The [`domain`]
//! module derives dashboard figures (lateness, badges, filters, KPIs) and
//! applies the field update rules; [`storage`] persists requests and
//! accounts; [`Dashboard`] ties a store to the in-memory collection.

pub mod domain;
pub use domain::{
    Config, FieldUpdate, FilterParams, FollowUp, Kpis, NewFollowUp, NewRequest, Patch, Priority,
    ReminderFrequency, Request, RequestId, Status, UpdatePolicy, ValidationError,
};

/// Session and credential handling.
pub mod auth;
pub use auth::{AuthError, AuthProvider, Session};

/// The stateful dashboard over a request store.
pub mod dashboard;
pub use dashboard::Dashboard;

/// Filesystem storage for requests and accounts.
pub mod storage;
pub use storage::{Directory, LocalAuth, RequestStore, StoreError};
