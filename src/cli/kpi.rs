use std::path::PathBuf;

use backlog::{domain::today, Kpis, Priority};
use clap::Parser;
use tracing::instrument;

use super::{
    open_dashboard,
    terminal::{is_narrow, Colorize},
};

#[derive(Debug, Parser, Default)]
#[command(about = "Show request counts, closure rate and workload")]
pub struct Kpi {
    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,

    /// Suppress headers and format for scripting
    #[arg(long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl Kpi {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let (dashboard, _session) = open_dashboard(root)?;
        let kpis = dashboard.kpis(today());

        match self.output {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&kpis)?),
            OutputFormat::Table if self.quiet => println!("{}", quiet_line(&kpis)),
            OutputFormat::Table if kpis.total == 0 => {
                println!("No requests yet. Create one with 'backlog add'.");
            }
            OutputFormat::Table => output_table(&kpis),
        }

        Ok(())
    }
}

fn quiet_line(kpis: &Kpis) -> String {
    format!(
        "total={} pending={} in_progress={} closed={} late={} closure_rate={:.1} avg_days={:.1}",
        kpis.total,
        kpis.pending,
        kpis.in_progress,
        kpis.closed,
        kpis.late,
        kpis.closure_rate,
        kpis.avg_processing_days
    )
}

fn output_table(kpis: &Kpis) {
    println!("Requests");
    println!("{}", "────────".dim());
    println!("  Total:        {}", kpis.total);
    println!("  Pending:      {}", kpis.pending.to_string().warning());
    println!("  In progress:  {}", kpis.in_progress.to_string().info());
    println!("  Closed:       {}", kpis.closed.to_string().success());
    if kpis.late > 0 {
        println!("  Late:         {}", kpis.late.to_string().danger());
    } else {
        println!("  Late:         0");
    }
    println!();
    println!("  Closure rate:        {:.1}%", kpis.closure_rate);
    println!("  Avg processing time: {:.1} days", kpis.avg_processing_days);

    println!();
    println!("Open by priority");
    println!("{}", "────────────────".dim());
    for priority in Priority::ALL.iter().rev() {
        let count = kpis.by_priority.get(priority).copied().unwrap_or_default();
        println!("  {:<9} {count}", priority.label());
    }

    if kpis.by_assignee.is_empty() {
        return;
    }
    println!();
    println!("Open by assignee");
    println!("{}", "────────────────".dim());
    let mut workload: Vec<_> = kpis.by_assignee.iter().collect();
    workload.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    let width = if is_narrow() { 16 } else { 28 };
    for (assignee, count) in workload {
        println!(
            "  {:<width$} {count}",
            super::terminal::truncate(assignee, width)
        );
    }
}
