use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use non_empty_string::NonEmptyString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{required, required_line, ValidationError};

/// Globally unique, stable identifier of a request.
///
/// Assigned by the store when the request is created.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generates a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// The first eight hex digits, enough to tell requests apart on screen.
    #[must_use]
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// A label that did not name any variant of a closed set.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Workflow state of a request.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Status {
    /// Received, nobody is working on it yet.
    #[default]
    #[serde(rename = "En attente")]
    Pending,
    /// Someone is working on it.
    #[serde(rename = "En cours")]
    InProgress,
    /// Done.
    #[serde(rename = "Clôturé")]
    Closed,
}

impl Status {
    /// Every status, in workflow order.
    pub const ALL: [Self; 3] = [Self::Pending, Self::InProgress, Self::Closed];

    /// The label shown to users and written to storage.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "En attente",
            Self::InProgress => "En cours",
            Self::Closed => "Clôturé",
        }
    }

    /// Whether this is the terminal state.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Status {
    type Err = UnknownVariant;

    /// Accepts the stored label or an English alias, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en attente" | "pending" => Ok(Self::Pending),
            "en cours" | "in progress" | "in-progress" => Ok(Self::InProgress),
            "clôturé" | "cloturé" | "cloture" | "closed" => Ok(Self::Closed),
            _ => Err(UnknownVariant::new("status", s)),
        }
    }
}

/// Urgency of a request.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Priority {
    /// Can wait.
    #[serde(rename = "Basse")]
    Low,
    /// The default.
    #[default]
    #[serde(rename = "Moyenne")]
    Medium,
    /// Should be picked up soon.
    #[serde(rename = "Haute")]
    High,
    /// Drop everything.
    #[serde(rename = "Urgente")]
    Urgent,
}

impl Priority {
    /// Every priority, lowest first.
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Urgent];

    /// The label shown to users and written to storage.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Basse",
            Self::Medium => "Moyenne",
            Self::High => "Haute",
            Self::Urgent => "Urgente",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Priority {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basse" | "low" => Ok(Self::Low),
            "moyenne" | "medium" => Ok(Self::Medium),
            "haute" | "high" => Ok(Self::High),
            "urgente" | "urgent" => Ok(Self::Urgent),
            _ => Err(UnknownVariant::new("priority", s)),
        }
    }
}

/// How often the assignee should be reminded about an open request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReminderFrequency {
    /// Every day.
    #[serde(rename = "Quotidien")]
    Daily,
    /// Every week.
    #[serde(rename = "Hebdomadaire")]
    Weekly,
    /// Twice a month.
    #[serde(rename = "Bimensuel")]
    SemiMonthly,
    /// Every month.
    #[serde(rename = "Mensuel")]
    Monthly,
}

impl ReminderFrequency {
    /// The label shown to users and written to storage.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Daily => "Quotidien",
            Self::Weekly => "Hebdomadaire",
            Self::SemiMonthly => "Bimensuel",
            Self::Monthly => "Mensuel",
        }
    }
}

impl fmt::Display for ReminderFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ReminderFrequency {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "quotidien" | "daily" => Ok(Self::Daily),
            "hebdomadaire" | "weekly" => Ok(Self::Weekly),
            "bimensuel" | "semi-monthly" | "semimonthly" => Ok(Self::SemiMonthly),
            "mensuel" | "monthly" => Ok(Self::Monthly),
            _ => Err(UnknownVariant::new("reminder frequency", s)),
        }
    }
}

/// An entry in the action log of a request.
///
/// Follow-ups are only ever appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowUp {
    /// When the action happened.
    pub date: NaiveDate,
    /// Who took the action.
    pub person: NonEmptyString,
    /// What was done.
    pub action: NonEmptyString,
}

/// A tracked unit of support work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Store-assigned identifier.
    pub id: RequestId,
    /// The day the request came in. Never re-derived.
    pub received: NaiveDate,
    /// One-line summary.
    pub title: NonEmptyString,
    /// Free-form details.
    pub description: NonEmptyString,
    /// Who asked for it.
    pub requester: NonEmptyString,
    /// Who is handling it. `None` when unassigned.
    pub assignee: Option<String>,
    /// Workflow state.
    pub status: Status,
    /// Urgency.
    pub priority: Priority,
    /// Optional due date. Many requests never get one.
    pub deadline: Option<NaiveDate>,
    /// The day the request was closed, if recorded.
    ///
    /// Survives re-opening until someone edits it.
    pub closed_on: Option<NaiveDate>,
    /// Reminder cadence; cleared when the request is closed.
    pub reminder: Option<ReminderFrequency>,
    /// Action log, oldest first.
    pub follow_ups: Vec<FollowUp>,
    /// When the record was created. Listings are sorted on this.
    pub created_at: DateTime<Utc>,
    /// The account that created the record, if known.
    pub created_by: Option<Uuid>,
}

impl Request {
    /// Builds the record a store persists for a validated draft.
    #[must_use]
    pub fn from_draft(
        id: RequestId,
        draft: RequestDraft,
        created_at: DateTime<Utc>,
        created_by: Option<Uuid>,
    ) -> Self {
        let RequestDraft {
            received,
            title,
            description,
            requester,
            assignee,
            status,
            priority,
            deadline,
            reminder,
        } = draft;

        Self {
            id,
            received,
            title,
            description,
            requester,
            assignee,
            status,
            priority,
            deadline,
            closed_on: None,
            reminder,
            follow_ups: Vec::new(),
            created_at,
            created_by,
        }
    }

    /// The assignee, if there is a non-empty one.
    #[must_use]
    pub fn assignee(&self) -> Option<&str> {
        self.assignee
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Whether the request is closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.status.is_closed()
    }
}

/// Form input for a new request, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRequest {
    /// The day the request came in.
    pub received: NaiveDate,
    /// Required.
    pub title: String,
    /// Required.
    pub description: String,
    /// Required.
    pub requester: String,
    /// Optional; empty means unassigned.
    pub assignee: String,
    /// Initial workflow state.
    pub status: Status,
    /// Initial urgency.
    pub priority: Priority,
    /// Optional due date.
    pub deadline: Option<NaiveDate>,
    /// Optional reminder cadence.
    pub reminder: Option<ReminderFrequency>,
}

impl NewRequest {
    /// A blank form received on `received`, with the usual defaults.
    #[must_use]
    pub fn new(received: NaiveDate) -> Self {
        Self {
            received,
            title: String::new(),
            description: String::new(),
            requester: String::new(),
            assignee: String::new(),
            status: Status::default(),
            priority: Priority::default(),
            deadline: None,
            reminder: None,
        }
    }

    /// Checks the required fields.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingField`] naming the first of title,
    /// description or requester that is blank.
    pub fn validate(self) -> Result<RequestDraft, ValidationError> {
        let assignee = self.assignee.trim();
        Ok(RequestDraft {
            received: self.received,
            title: required_line("title", &self.title)?,
            description: required("description", &self.description)?,
            requester: required_line("demandeur", &self.requester)?,
            assignee: (!assignee.is_empty()).then(|| assignee.to_string()),
            status: self.status,
            priority: self.priority,
            deadline: self.deadline,
            reminder: self.reminder,
        })
    }
}

/// A validated [`NewRequest`], ready to hand to a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDraft {
    received: NaiveDate,
    title: NonEmptyString,
    description: NonEmptyString,
    requester: NonEmptyString,
    assignee: Option<String>,
    status: Status,
    priority: Priority,
    deadline: Option<NaiveDate>,
    reminder: Option<ReminderFrequency>,
}

impl RequestDraft {
    /// The title the request will be created with.
    #[must_use]
    pub fn title(&self) -> &str {
        self.title.as_str()
    }
}

/// Form input for a follow-up, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFollowUp {
    /// When the action happened.
    pub date: NaiveDate,
    /// Required.
    pub person: String,
    /// Required.
    pub action: String,
}

impl NewFollowUp {
    /// Checks the required fields.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingField`] if the person or action is
    /// blank.
    pub fn validate(self) -> Result<FollowUp, ValidationError> {
        Ok(FollowUp {
            date: self.date,
            person: required_line("personne", &self.person)?,
            action: required("action", &self.action)?,
        })
    }
}
