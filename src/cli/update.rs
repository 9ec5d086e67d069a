use std::path::PathBuf;

use backlog::{domain::today, FieldUpdate, Patch};
use chrono::NaiveDate;
use clap::Parser;
use tracing::instrument;

use super::{
    open_dashboard, parse_date,
    terminal::Colorize,
};

#[derive(Debug, Parser)]
#[command(about = "Edit fields of a request")]
pub struct Update {
    /// The request id, or a unique prefix of it
    id: String,

    /// Field assignments, applied in order. Nothing is changed if any
    /// value is invalid.
    ///
    /// Fields: assignee, statut (status), priority, deadline, date_cloture
    /// (closed_on). Dates are YYYY-MM-DD; an empty value or 'none' clears
    /// them. An empty assignee unassigns.
    #[arg(value_name = "FIELD=VALUE", required = true, value_parser = parse_assignment)]
    assignments: Vec<(String, String)>,

    /// The date the change is made on (YYYY-MM-DD), defaults to today
    #[arg(long, value_parser = parse_date)]
    today: Option<NaiveDate>,
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    let (field, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{s}'"))?;
    Ok((field.trim().to_string(), value.to_string()))
}

/// Parses every assignment, reporting all invalid values at once.
fn parse_updates(assignments: &[(String, String)]) -> anyhow::Result<Vec<FieldUpdate>> {
    let mut updates = Vec::with_capacity(assignments.len());
    let mut errors = Vec::new();

    for (field, value) in assignments {
        match FieldUpdate::from_named(field, value) {
            Ok(Some(update)) => updates.push(update),
            Ok(None) => tracing::warn!("'{field}' cannot be edited with 'update', ignoring it"),
            Err(error) => errors.push(format!("{field}: {error}")),
        }
    }

    if !errors.is_empty() {
        anyhow::bail!("nothing was changed:\n  {}", errors.join("\n  "));
    }
    Ok(updates)
}

impl Update {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let updates = parse_updates(&self.assignments)?;

        let (mut dashboard, _session) = open_dashboard(root)?;
        let id = dashboard.resolve(&self.id)?.id;
        let today = self.today.unwrap_or_else(today);

        for update in updates {
            let patch = dashboard.update_field(id, update, today)?;
            println!("{}", describe(&patch).success());
        }

        Ok(())
    }
}

/// A one-line summary of what a patch changed.
fn describe(patch: &Patch) -> String {
    fn date(value: Option<NaiveDate>) -> String {
        value.map_or_else(|| "none".to_string(), |date| date.to_string())
    }

    let mut changes = Vec::new();
    if let Some(assignee) = &patch.assignee {
        if assignee.is_empty() {
            changes.push("unassigned".to_string());
        } else {
            changes.push(format!("assignee → {assignee}"));
        }
    }
    if let Some(status) = patch.status {
        changes.push(format!("status → {status}"));
    }
    if let Some(priority) = patch.priority {
        changes.push(format!("priority → {priority}"));
    }
    if let Some(deadline) = patch.deadline {
        changes.push(format!("deadline → {}", date(deadline)));
    }
    if let Some(closed_on) = patch.closed_on {
        changes.push(format!("closed on → {}", date(closed_on)));
    }
    if patch.reminder.is_some() {
        changes.push("reminder cleared".to_string());
    }
    changes.join(", ")
}
