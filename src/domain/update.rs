//! The rules applied when one field of a request is edited.
//!
//! An edit is expressed as a [`FieldUpdate`]. The [`UpdatePolicy`] turns it
//! into a [`Patch`]: the edited field plus whatever the workflow derives from
//! it. Persisting the patch is the store's business.

use chrono::NaiveDate;
use serde::Serialize;

use super::{Priority, ReminderFrequency, Request, Status, UnknownVariant};

/// A single-field edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    /// Set the assignee. An empty string unassigns.
    Assignee(String),
    /// Set the workflow status.
    Status(Status),
    /// Set or clear the deadline.
    Deadline(Option<NaiveDate>),
    /// Set or clear the closure date.
    ClosedOn(Option<NaiveDate>),
    /// Set the priority.
    Priority(Priority),
}

impl FieldUpdate {
    /// Builds an update from a field name and a raw value.
    ///
    /// Field names are the storage keys (`assignee`, `statut`, `deadline`,
    /// `date_cloture`, `priority`), their camel-case forms, or English
    /// aliases. Dates are `YYYY-MM-DD`; an empty value or `none` clears them.
    ///
    /// Returns `Ok(None)` for a field that cannot be edited this way.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be parsed for a known field.
    pub fn from_named(field: &str, value: &str) -> Result<Option<Self>, FieldValueError> {
        let update = match field.trim() {
            "assignee" => Self::Assignee(value.trim().to_string()),
            "statut" | "status" => Self::Status(value.parse()?),
            "deadline" => Self::Deadline(parse_optional_date(value)?),
            "dateCloture" | "date_cloture" | "closed_on" | "closed-on" => {
                Self::ClosedOn(parse_optional_date(value)?)
            }
            "priority" => Self::Priority(value.parse()?),
            other => {
                tracing::debug!(field = other, "ignoring update to an unmapped field");
                return Ok(None);
            }
        };
        Ok(Some(update))
    }

    /// The storage key of the edited field.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::Assignee(_) => "assignee",
            Self::Status(_) => "statut",
            Self::Deadline(_) => "deadline",
            Self::ClosedOn(_) => "date_cloture",
            Self::Priority(_) => "priority",
        }
    }
}

fn parse_optional_date(value: &str) -> Result<Option<NaiveDate>, FieldValueError> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|source| FieldValueError::Date {
            value: value.to_string(),
            source,
        })
}

/// A value that could not be parsed for its field.
#[derive(Debug, thiserror::Error)]
pub enum FieldValueError {
    /// Not a known status or priority.
    #[error(transparent)]
    Variant(#[from] UnknownVariant),

    /// Not a `YYYY-MM-DD` date.
    #[error("invalid date '{value}', expected YYYY-MM-DD")]
    Date {
        /// The rejected input.
        value: String,
        /// Why chrono rejected it.
        #[source]
        source: chrono::ParseError,
    },
}

/// The changed fields of a request.
///
/// Serializes to the storage keys, omitting untouched fields. A cleared
/// optional field serializes as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Patch {
    /// New assignee; empty means unassigned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    /// New status.
    #[serde(rename = "statut", skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    /// New deadline, `Some(None)` to clear.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<Option<NaiveDate>>,
    /// New closure date, `Some(None)` to clear.
    #[serde(rename = "date_cloture", skip_serializing_if = "Option::is_none")]
    pub closed_on: Option<Option<NaiveDate>>,
    /// New priority.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// New reminder cadence, `Some(None)` to clear.
    #[serde(rename = "frequence_rappel", skip_serializing_if = "Option::is_none")]
    pub reminder: Option<Option<ReminderFrequency>>,
}

impl Patch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Request {
    /// Writes the fields present in `patch` onto this request.
    pub fn apply_patch(&mut self, patch: &Patch) {
        if let Some(assignee) = &patch.assignee {
            let assignee = assignee.trim();
            self.assignee = (!assignee.is_empty()).then(|| assignee.to_string());
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(deadline) = patch.deadline {
            self.deadline = deadline;
        }
        if let Some(closed_on) = patch.closed_on {
            self.closed_on = closed_on;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(reminder) = patch.reminder {
            self.reminder = reminder;
        }
    }
}

/// Workflow rules applied to single-field edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdatePolicy {
    /// Derive the status from assignment changes.
    ///
    /// When set, assigning a pending request starts it and unassigning any
    /// request sends it back to pending. When unset, assignment and status
    /// are edited independently.
    pub infer_status_from_assignee: bool,
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        Self {
            infer_status_from_assignee: true,
        }
    }
}

impl UpdatePolicy {
    /// Computes the patch for `update` on `request`.
    ///
    /// Closing a request stamps `today` as its closure date unless it already
    /// has one, and clears its reminder. Re-opening leaves both alone.
    #[must_use]
    pub fn apply(self, request: &Request, update: FieldUpdate, today: NaiveDate) -> Patch {
        let mut patch = Patch::default();

        match update {
            FieldUpdate::Assignee(assignee) => {
                let assignee = assignee.trim().to_string();
                if self.infer_status_from_assignee {
                    if assignee.is_empty() {
                        patch.status = Some(Status::Pending);
                    } else if request.status == Status::Pending {
                        patch.status = Some(Status::InProgress);
                    }
                }
                patch.assignee = Some(assignee);
            }
            FieldUpdate::Status(status) => {
                if status.is_closed() {
                    if request.closed_on.is_none() {
                        patch.closed_on = Some(Some(today));
                    }
                    patch.reminder = Some(None);
                }
                patch.status = Some(status);
            }
            FieldUpdate::Deadline(deadline) => patch.deadline = Some(deadline),
            FieldUpdate::ClosedOn(closed_on) => patch.closed_on = Some(closed_on),
            FieldUpdate::Priority(priority) => patch.priority = Some(priority),
        }

        patch
    }
}

/// [`UpdatePolicy::apply`] with the default policy.
#[must_use]
pub fn apply_field_update(request: &Request, update: FieldUpdate, today: NaiveDate) -> Patch {
    UpdatePolicy::default().apply(request, update, today)
}
