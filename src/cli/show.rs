use std::path::PathBuf;

use backlog::{
    domain::{is_late, status_badge, today},
    Request,
};
use chrono::NaiveDate;
use clap::Parser;
use serde_json::json;
use tracing::instrument;

use super::{
    open_dashboard,
    terminal::{paint_badge, Colorize},
};

#[derive(Debug, Parser)]
#[command(about = "Display a request with its follow-ups")]
pub struct Show {
    /// The request id, or a unique prefix of it
    id: String,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "pretty")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Pretty,
    Json,
}

impl Show {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let (dashboard, _session) = open_dashboard(root)?;
        let request = dashboard.resolve(&self.id)?;
        let today = today();

        match self.output {
            OutputFormat::Pretty => output_pretty(request, today),
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&to_json(request, today))?);
            }
        }

        Ok(())
    }
}

fn output_pretty(request: &Request, today: NaiveDate) {
    let badge = status_badge(request, today);

    println!("# {}", request.title);
    println!("{}  {}\n", request.id.to_string().dim(), paint_badge(&badge, 0));

    println!("{}", "Details".dim());
    println!("  Received:   {}", request.received);
    println!("  Requester:  {}", request.requester);
    println!("  Assignee:   {}", request.assignee().unwrap_or("–"));
    println!("  Priority:   {}", request.priority);
    match request.deadline {
        Some(deadline) if is_late(request, today) => {
            println!("  Deadline:   {}", deadline.to_string().danger());
        }
        Some(deadline) => println!("  Deadline:   {deadline}"),
        None => println!("  Deadline:   {}", "none".dim()),
    }
    if let Some(closed_on) = request.closed_on {
        println!("  Closed on:  {closed_on}");
    }
    if let Some(reminder) = request.reminder {
        println!("  Reminder:   {reminder}");
    }

    println!("\n{}", "Description".dim());
    for line in request.description.as_str().lines() {
        println!("  {line}");
    }

    println!("\n{}", format!("Follow-ups ({})", request.follow_ups.len()).dim());
    if request.follow_ups.is_empty() {
        println!("  (none)");
    }
    for follow_up in &request.follow_ups {
        println!(
            "  {}  {}: {}",
            follow_up.date, follow_up.person, follow_up.action
        );
    }
}

fn to_json(request: &Request, today: NaiveDate) -> serde_json::Value {
    let follow_ups: Vec<_> = request
        .follow_ups
        .iter()
        .map(|follow_up| {
            json!({
                "date": follow_up.date,
                "personne": follow_up.person.as_str(),
                "action": follow_up.action.as_str(),
            })
        })
        .collect();

    json!({
        "id": request.id,
        "date_reception": request.received,
        "title": request.title.as_str(),
        "description": request.description.as_str(),
        "demandeur": request.requester.as_str(),
        "assignee": request.assignee(),
        "statut": request.status,
        "priority": request.priority,
        "deadline": request.deadline,
        "date_cloture": request.closed_on,
        "frequence_rappel": request.reminder,
        "created_at": request.created_at,
        "badge": status_badge(request, today),
        "late": is_late(request, today),
        "follow_ups": follow_ups,
    })
}
