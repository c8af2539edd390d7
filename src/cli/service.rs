use std::path::Path;

use chrono::NaiveDate;
use helpdesk::{
    domain::{ServiceId, UserId},
    storage::ServiceDocument,
};
use tracing::instrument;

use super::{
    OutputFormat,
    args::{ServiceKindArg, parse_date},
    desk, open, print_json, save,
    terminal::Colorize,
    ticket::report,
};

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// List a requester's services
    List(List),
    /// Request a new service
    Activate(Activate),
    /// Request the cancellation of a service
    Cancel(Cancel),
}

impl Command {
    pub fn run(self, root: &Path, output: OutputFormat) -> anyhow::Result<()> {
        match self {
            Self::List(command) => command.run(root, output),
            Self::Activate(command) => command.run(root, output),
            Self::Cancel(command) => command.run(root, output),
        }
    }
}

#[derive(Debug, clap::Parser)]
pub struct List {
    /// The requester
    #[arg(long = "as", value_name = "USER")]
    actor: UserId,
}

impl List {
    fn run(self, root: &Path, output: OutputFormat) -> anyhow::Result<()> {
        let directory = open(root)?;
        let services = desk(&directory).services_of(self.actor)?;
        if output == OutputFormat::Json {
            let services: Vec<_> = services.into_iter().map(ServiceDocument::from).collect();
            return print_json(&services);
        }

        if services.is_empty() {
            println!("No services.");
        }
        for service in &services {
            let id = service.id().map_or_else(|| "-".to_string(), |id| id.to_string());
            let line = format!("#{id} {service}");
            if service.is_active() {
                println!("{line}");
            } else {
                println!("{}", line.dim());
            }
            println!(
                "    {}",
                format!(
                    "active since {} ({} days)",
                    service.activated_at().format("%Y-%m-%d"),
                    service.days_since_activation()
                )
                .dim()
            );
        }
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Activate {
    /// The kind of service wanted
    #[arg(value_enum)]
    kind: ServiceKindArg,

    /// The requester
    #[arg(long = "as", value_name = "USER")]
    actor: UserId,

    /// The plan or package wanted
    #[arg(long)]
    plan: String,

    /// Where to install the service
    #[arg(long)]
    address: String,

    /// Anything else the installer should know
    #[arg(long)]
    comments: Option<String>,
}

impl Activate {
    #[instrument(skip(root, output))]
    fn run(self, root: &Path, output: OutputFormat) -> anyhow::Result<()> {
        let directory = open(root)?;
        let ticket = desk(&directory).request_activation(
            self.actor,
            self.kind.into(),
            &self.plan,
            &self.address,
            self.comments.as_deref(),
        )?;
        save(&directory)?;
        report(&ticket, "Filed", output)
    }
}

#[derive(Debug, clap::Parser)]
pub struct Cancel {
    /// The service to cancel
    id: ServiceId,

    /// The requester owning the service
    #[arg(long = "as", value_name = "USER")]
    actor: UserId,

    /// Why the service is no longer wanted
    #[arg(long)]
    reason: String,

    /// When the service should stop (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    date: NaiveDate,

    /// Anything else worth knowing
    #[arg(long)]
    comments: Option<String>,
}

impl Cancel {
    #[instrument(skip(root, output))]
    fn run(self, root: &Path, output: OutputFormat) -> anyhow::Result<()> {
        let directory = open(root)?;
        let ticket = desk(&directory).request_cancellation(
            self.id,
            self.actor,
            &self.reason,
            self.date,
            self.comments.as_deref(),
        )?;
        save(&directory)?;
        report(&ticket, "Filed", output)
    }
}
