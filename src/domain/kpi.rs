use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::{is_late, Priority, Request, Status};

/// Aggregate figures for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    /// Number of requests.
    pub total: usize,
    /// Requests with status [`Status::Closed`].
    pub closed: usize,
    /// Requests with status [`Status::InProgress`].
    pub in_progress: usize,
    /// Requests with status [`Status::Pending`].
    pub pending: usize,
    /// Share of closed requests, in percent, to one decimal. Zero when there
    /// are no requests.
    pub closure_rate: f64,
    /// Mean days from reception to closure over the requests that have both
    /// dates, to one decimal. Zero when none do.
    pub avg_processing_days: f64,
    /// Requests past their deadline.
    pub late: usize,
    /// Open requests per priority. Every priority is present.
    pub by_priority: BTreeMap<Priority, usize>,
    /// Open requests per assignee. Unassigned requests are not counted.
    pub by_assignee: BTreeMap<String, usize>,
}

/// Computes the dashboard figures for `requests` as of `today`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compute_kpis(requests: &[Request], today: NaiveDate) -> Kpis {
    let mut kpis = Kpis {
        total: requests.len(),
        closed: 0,
        in_progress: 0,
        pending: 0,
        closure_rate: 0.0,
        avg_processing_days: 0.0,
        late: 0,
        by_priority: Priority::ALL.into_iter().map(|p| (p, 0)).collect(),
        by_assignee: BTreeMap::new(),
    };

    let mut processed = 0_usize;
    let mut processing_days = 0_i64;

    for request in requests {
        match request.status {
            Status::Closed => kpis.closed += 1,
            Status::InProgress => kpis.in_progress += 1,
            Status::Pending => kpis.pending += 1,
        }

        if let Some(closed_on) = request.closed_on {
            processed += 1;
            processing_days += (closed_on - request.received).num_days();
        }

        if is_late(request, today) {
            kpis.late += 1;
        }

        if request.is_closed() {
            continue;
        }
        *kpis.by_priority.entry(request.priority).or_insert(0) += 1;
        if let Some(assignee) = request.assignee() {
            *kpis.by_assignee.entry(assignee.to_string()).or_insert(0) += 1;
        }
    }

    if kpis.total > 0 {
        kpis.closure_rate = round_one_decimal(kpis.closed as f64 / kpis.total as f64 * 100.0);
    }
    if processed > 0 {
        kpis.avg_processing_days = round_one_decimal(processing_days as f64 / processed as f64);
    }

    kpis
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
