use std::path::PathBuf;

use backlog::{
    domain::{is_late, status_badge, today, Badge},
    FilterParams, Priority, Request, Status,
};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::instrument;

use super::{
    open_dashboard, parse_date,
    terminal::{is_narrow, paint_badge, truncate, Colorize},
};

/// Command arguments for `backlog list`.
#[derive(Debug, Parser)]
#[command(about = "List requests, newest first")]
pub struct List {
    /// Case-insensitive text to find in title, description, assignee or
    /// requester.
    #[arg(long, short, default_value = "")]
    search: String,

    /// Only requests with this status.
    #[arg(long)]
    status: Option<Status>,

    /// Only requests with this priority.
    #[arg(long)]
    priority: Option<Priority>,

    /// Received on or after this date (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    from: Option<NaiveDate>,

    /// Received on or before this date (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    to: Option<NaiveDate>,

    /// Only requests past their deadline.
    #[arg(long)]
    late: bool,

    /// Output format (default: table).
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,

    /// Suppress headers and format rows for scripting.
    #[arg(long)]
    quiet: bool,

    /// Limit number of rows returned.
    #[arg(long)]
    limit: Option<usize>,
}

/// Supported output formats.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// One line of the listing.
#[derive(Debug, Serialize)]
struct Row<'a> {
    id: String,
    received: NaiveDate,
    title: &'a str,
    requester: &'a str,
    assignee: Option<&'a str>,
    priority: Priority,
    deadline: Option<NaiveDate>,
    badge: Badge,
    late: bool,
    follow_ups: usize,
}

impl<'a> Row<'a> {
    fn new(request: &'a Request, today: NaiveDate) -> Self {
        Self {
            id: request.id.to_string(),
            received: request.received,
            title: request.title.as_str(),
            requester: request.requester.as_str(),
            assignee: request.assignee(),
            priority: request.priority,
            deadline: request.deadline,
            badge: status_badge(request, today),
            late: is_late(request, today),
            follow_ups: request.follow_ups.len(),
        }
    }
}

impl List {
    fn params(&self) -> FilterParams {
        FilterParams {
            search: self.search.clone(),
            status: self.status,
            priority: self.priority,
            from: self.from,
            to: self.to,
        }
    }

    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let (dashboard, _session) = open_dashboard(root)?;
        let today = today();

        let rows: Vec<Row> = dashboard
            .filtered(&self.params())
            .into_iter()
            .map(|request| Row::new(request, today))
            .filter(|row| !self.late || row.late)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect();

        match self.output {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
            OutputFormat::Table if self.quiet => {
                for row in &rows {
                    println!("{}\t{}\t{}", row.id, row.badge.label, row.title);
                }
            }
            OutputFormat::Table => output_table(&rows, dashboard.requests().len()),
        }

        Ok(())
    }
}

fn output_table(rows: &[Row], total: usize) {
    if rows.is_empty() {
        println!("No matching requests.");
        return;
    }

    let title_width = if is_narrow() { 24 } else { 40 };
    println!(
        "{:<8}  {:<10}  {:<28}  {:<8}  {:<title_width$}  {}",
        "ID", "Received", "Status", "Priority", "Title", "Assignee"
    );
    for row in rows {
        let id = &row.id[..8];
        println!(
            "{}  {:<10}  {}  {:<8}  {:<title_width$}  {}",
            id.dim(),
            row.received,
            paint_badge(&row.badge, 28),
            row.priority.label(),
            truncate(row.title, title_width),
            row.assignee.unwrap_or("–"),
        );
    }
    println!();
    println!("{}", format!("{} of {total} requests", rows.len()).dim());
}

#[cfg(test)]
mod tests {
    use backlog::{NewRequest, RequestId};
    use chrono::Utc;

    use super::*;

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn request(deadline: Option<NaiveDate>) -> Request {
        let draft = NewRequest {
            title: "Forklift battery".to_string(),
            description: "Replace it".to_string(),
            requester: "Warehouse".to_string(),
            deadline,
            ..NewRequest::new(day("2024-01-02"))
        }
        .validate()
        .unwrap();
        Request::from_draft(RequestId::generate(), draft, Utc::now(), None)
    }

    #[test]
    fn row_carries_the_derived_badge() {
        let request = request(Some(day("2024-01-10")));
        let row = Row::new(&request, day("2024-01-15"));

        assert!(row.late);
        assert_eq!(row.badge.label, "En retard");
        assert_eq!(row.assignee, None);
    }

    #[test]
    fn rows_serialize_with_storage_labels() {
        let request = request(None);
        let row = Row::new(&request, day("2024-01-15"));
        let json = serde_json::to_value(&row).unwrap();

        assert_eq!(json["badge"]["label"], "En attente (sans deadline)");
        assert_eq!(json["badge"]["style"], "pending");
        assert_eq!(json["priority"], "Moyenne");
    }
}
