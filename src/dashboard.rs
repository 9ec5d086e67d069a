//! The in-memory request collection and the operations that change it.
//!
//! A [`Dashboard`] owns a [`RequestStore`] and the last successfully loaded
//! snapshot of its requests. Every mutation goes to the store first and
//! then reloads, so the snapshot always reflects what was persisted.

use chrono::NaiveDate;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    domain::{
        compute_kpis, filter, FieldUpdate, FieldValueError, FilterParams, Kpis, NewFollowUp,
        NewRequest, Patch, Request, RequestId, UpdatePolicy, ValidationError,
    },
    storage::{RequestStore, StoreError},
};

/// Requests loaded from a store, kept in the store's order (newest first).
#[derive(Debug)]
pub struct Dashboard<S> {
    store: S,
    policy: UpdatePolicy,
    requests: Vec<Request>,
}

impl<S: RequestStore> Dashboard<S> {
    /// Loads the requests from `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial listing fails.
    pub fn open(store: S, policy: UpdatePolicy) -> Result<Self, Error> {
        let mut dashboard = Self {
            store,
            policy,
            requests: Vec::new(),
        };
        dashboard.reload()?;
        Ok(dashboard)
    }

    /// Re-reads the collection from the store.
    ///
    /// On failure the previous snapshot is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be listed.
    #[instrument(level = "debug", skip(self))]
    pub fn reload(&mut self) -> Result<(), Error> {
        self.requests = self.store.list_requests()?;
        Ok(())
    }

    /// The current snapshot, newest first.
    #[must_use]
    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Looks up a request in the snapshot.
    #[must_use]
    pub fn get(&self, id: RequestId) -> Option<&Request> {
        self.requests.iter().find(|request| request.id == id)
    }

    /// Finds the single request whose identifier starts with `prefix`.
    ///
    /// A full identifier, with or without hyphens, also works.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownRequest`] if nothing matches and
    /// [`Error::AmbiguousRequest`] if several requests do.
    pub fn resolve(&self, prefix: &str) -> Result<&Request, Error> {
        let needle: String = prefix
            .trim()
            .chars()
            .filter(|c| *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        if needle.is_empty() {
            return Err(Error::UnknownRequest(prefix.to_string()));
        }

        let mut matches = self
            .requests
            .iter()
            .filter(|request| request.id.as_uuid().simple().to_string().starts_with(&needle));

        match (matches.next(), matches.count()) {
            (None, _) => Err(Error::UnknownRequest(prefix.to_string())),
            (Some(request), 0) => Ok(request),
            (Some(_), others) => Err(Error::AmbiguousRequest {
                prefix: prefix.to_string(),
                count: others + 1,
            }),
        }
    }

    /// The requests matching `params`, in snapshot order.
    #[must_use]
    pub fn filtered(&self, params: &FilterParams) -> Vec<&Request> {
        filter(&self.requests, params)
    }

    /// Aggregates over the whole snapshot.
    #[must_use]
    pub fn kpis(&self, today: NaiveDate) -> Kpis {
        compute_kpis(&self.requests, today)
    }

    /// Validates and persists a new request, then reloads.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] without touching the store if a required
    /// field is blank.
    #[instrument(level = "debug", skip(self, request))]
    pub fn create(
        &mut self,
        request: NewRequest,
        created_by: Option<Uuid>,
    ) -> Result<RequestId, Error> {
        let draft = request.validate()?;
        let id = self.store.create_request(draft, created_by)?;
        self.reload()?;
        Ok(id)
    }

    /// Applies the update policy to one field edit and persists the result.
    ///
    /// Returns the patch that was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is not in the snapshot or the store
    /// rejects the write.
    #[instrument(level = "debug", skip(self))]
    pub fn update_field(
        &mut self,
        id: RequestId,
        update: FieldUpdate,
        today: NaiveDate,
    ) -> Result<Patch, Error> {
        let request = self
            .get(id)
            .ok_or_else(|| Error::UnknownRequest(id.to_string()))?;
        let patch = self.policy.apply(request, update, today);
        self.store.update_request_fields(id, &patch)?;
        self.reload()?;
        Ok(patch)
    }

    /// Like [`Dashboard::update_field`], from a field name and raw value.
    ///
    /// Returns `Ok(None)` and writes nothing if the field is not editable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldValue`] if the value does not parse.
    pub fn update_named_field(
        &mut self,
        id: RequestId,
        field: &str,
        value: &str,
        today: NaiveDate,
    ) -> Result<Option<Patch>, Error> {
        match FieldUpdate::from_named(field, value)? {
            Some(update) => self.update_field(id, update, today).map(Some),
            None => Ok(None),
        }
    }

    /// Validates and appends a follow-up, then reloads.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] without touching the store if the person
    /// or action is blank.
    #[instrument(level = "debug", skip(self, follow_up))]
    pub fn add_follow_up(&mut self, id: RequestId, follow_up: NewFollowUp) -> Result<(), Error> {
        let follow_up = follow_up.validate()?;
        self.store.add_follow_up(id, follow_up)?;
        self.reload()
    }

    /// Deletes a request and its follow-ups, then reloads.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot delete the request.
    #[instrument(level = "debug", skip(self))]
    pub fn delete(&mut self, id: RequestId) -> Result<(), Error> {
        self.store.delete_request(id)?;
        self.reload()
    }
}

/// Errors raised by [`Dashboard`] operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input was rejected before reaching the store.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A raw field value could not be parsed.
    #[error(transparent)]
    FieldValue(#[from] FieldValueError),

    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// No request matches the identifier.
    #[error("no request matches '{0}'")]
    UnknownRequest(String),

    /// Several requests match the identifier prefix.
    #[error("'{prefix}' matches {count} requests, use a longer prefix")]
    AmbiguousRequest {
        /// The prefix as given.
        prefix: String,
        /// How many requests it matches.
        count: usize,
    },
}
