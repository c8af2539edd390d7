use std::path::Path;

use helpdesk::{
    desk::{OperatorDashboard, QueueEntry, TechnicianDashboard},
    domain::{ResolutionTime, UserId},
};

use super::{
    OutputFormat, desk, open, print_json,
    terminal::{self, Colorize},
    truncate,
};

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Desk-wide distributions, critical incidents and technician load
    Operator,
    /// A technician's counts, queue and consultations
    Technician(Technician),
}

impl Command {
    pub fn run(self, root: &Path, output: OutputFormat) -> anyhow::Result<()> {
        let directory = open(root)?;
        let desk = desk(&directory);
        match self {
            Self::Operator => {
                let dashboard = desk.operator_dashboard()?;
                match output {
                    OutputFormat::Json => print_json(&dashboard),
                    OutputFormat::Text => {
                        print_operator(&dashboard);
                        Ok(())
                    }
                }
            }
            Self::Technician(Technician { id }) => {
                let dashboard = desk.technician_dashboard(id)?;
                match output {
                    OutputFormat::Json => print_json(&dashboard),
                    OutputFormat::Text => {
                        print_technician(&dashboard);
                        Ok(())
                    }
                }
            }
        }
    }
}

#[derive(Debug, clap::Parser)]
pub struct Technician {
    /// The technician's id
    id: UserId,
}

fn print_operator(dashboard: &OperatorDashboard) {
    let metrics = &dashboard.metrics;
    println!("Tickets");
    println!("{}", "───────".dim());
    println!(
        "Total {}  incidents {}  requests {}  resolved {}  pending {}",
        metrics.total, metrics.incidents, metrics.service_requests, metrics.resolved, metrics.pending
    );
    println!("Unassigned: {}", count(dashboard.unassigned));
    println!("Average resolution: {}", average(dashboard.average_resolution));

    println!("\n{}", "By state".dim());
    for (state, n) in &metrics.by_state {
        println!("  {:<12} {n}", state.as_str());
    }
    println!("\n{}", "By urgency".dim());
    for (urgency, n) in &metrics.by_urgency {
        println!("  {:<12} {n}", urgency.as_str());
    }

    println!("\n{}", "Critical incidents".dim());
    if dashboard.critical.is_empty() {
        println!("  {} ✅", "none".success());
    }
    for entry in &dashboard.critical {
        print_entry(entry);
    }

    println!("\n{}", "Technician load".dim());
    for load in &dashboard.workload {
        let id = load.technician.id.map_or_else(|| "-".to_string(), |id| id.to_string());
        println!("  #{id:<4} {:<24} {}", load.technician.name, load.open);
    }
}

fn print_technician(dashboard: &TechnicianDashboard) {
    println!("{}", dashboard.technician.name);
    println!("{}", "─".repeat(dashboard.technician.name.chars().count()).dim());
    println!(
        "Assigned {}  in progress {}  resolved {}",
        dashboard.assigned, dashboard.in_progress, dashboard.resolved
    );
    println!("Average resolution: {}", average(dashboard.average_resolution));

    println!("\n{}", "Queue".dim());
    if dashboard.queue.is_empty() {
        println!("  {} ✅", "empty".success());
    }
    for entry in &dashboard.queue {
        print_entry(entry);
    }

    if !dashboard.consultations.is_empty() {
        println!("\n{}", "Consultations".dim());
        for entry in &dashboard.consultations {
            print_entry(entry);
        }
    }
}

fn print_entry(entry: &QueueEntry) {
    let id = entry.id.map_or_else(|| "-".to_string(), |id| id.to_string());
    println!(
        "  #{id:<4} {:>4}  {} {} {}  {}",
        entry.priority,
        terminal::state(entry.state),
        terminal::urgency(entry.urgency),
        truncate(&entry.title, 40),
        format!("{}d, last activity {}", entry.days_since_creation, entry.last_activity.format("%Y-%m-%d")).dim()
    );
}

fn count(n: usize) -> String {
    if n == 0 {
        n.to_string().success()
    } else {
        n.to_string().warning()
    }
}

fn average(time: Option<ResolutionTime>) -> String {
    time.map_or_else(|| "–".dim(), |time| time.to_string())
}
