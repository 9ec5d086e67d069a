use chrono::NaiveDate;
use serde::Serialize;

use super::{Request, Status};

/// Whether `request` is past its deadline on `today`.
///
/// Closed requests and requests without a deadline are never late. A
/// deadline falling on `today` is not late yet.
#[must_use]
pub fn is_late(request: &Request, today: NaiveDate) -> bool {
    !request.is_closed() && request.deadline.is_some_and(|deadline| deadline < today)
}

/// How a badge should be styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BadgeStyle {
    /// Past its deadline, whatever the status.
    Overdue,
    /// Waiting for someone to pick it up.
    Pending,
    /// Being worked on.
    InProgress,
    /// Done.
    Closed,
}

impl From<Status> for BadgeStyle {
    fn from(status: Status) -> Self {
        match status {
            Status::Pending => Self::Pending,
            Status::InProgress => Self::InProgress,
            Status::Closed => Self::Closed,
        }
    }
}

/// The status badge shown next to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Badge {
    /// Text of the badge.
    pub label: String,
    /// Style key of the badge.
    pub style: BadgeStyle,
}

/// Derives the badge for `request` on `today`.
///
/// Lateness wins over everything else; open requests without a deadline are
/// flagged as such; otherwise the badge is the status itself.
#[must_use]
pub fn status_badge(request: &Request, today: NaiveDate) -> Badge {
    if is_late(request, today) {
        return Badge {
            label: "En retard".to_string(),
            style: BadgeStyle::Overdue,
        };
    }

    let label = if request.deadline.is_none() && !request.is_closed() {
        format!("{} (sans deadline)", request.status)
    } else {
        request.status.to_string()
    };

    Badge {
        label,
        style: request.status.into(),
    }
}
