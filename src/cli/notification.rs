use std::path::Path;

use helpdesk::{
    Notification,
    domain::{NotificationId, UserId},
    storage::NotificationDocument,
};
use serde_json::json;
use tracing::instrument;

use super::{OutputFormat, desk, open, print_json, save, terminal::Colorize};

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// List a supervisor's notifications, newest first
    List(List),
    /// Mark a notification read
    Read(Read),
    /// Mark every notification read
    ReadAll(ReadAll),
    /// Count read and unread notifications
    Summary(Summary),
}

impl Command {
    pub fn run(self, root: &Path, output: OutputFormat) -> anyhow::Result<()> {
        match self {
            Self::List(command) => command.run(root, output),
            Self::Read(command) => command.run(root, output),
            Self::ReadAll(command) => command.run(root, output),
            Self::Summary(command) => command.run(root, output),
        }
    }
}

#[derive(Debug, clap::Parser)]
pub struct List {
    /// The supervisor
    #[arg(long = "as", value_name = "USER")]
    actor: UserId,

    /// Only unread notifications
    #[arg(long, conflicts_with = "read")]
    unread: bool,

    /// Only read notifications
    #[arg(long)]
    read: bool,

    /// Page number, from 1
    #[arg(long, default_value_t = 1)]
    page: usize,

    /// Page size; defaults to the configured size
    #[arg(long)]
    size: Option<usize>,
}

impl List {
    fn run(self, root: &Path, output: OutputFormat) -> anyhow::Result<()> {
        let read = match (self.read, self.unread) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        let directory = open(root)?;
        let page = desk(&directory).notifications(self.actor, read, self.page, self.size)?;

        if output == OutputFormat::Json {
            let pages = page.pages();
            let notifications: Vec<_> = page
                .items
                .into_iter()
                .map(NotificationDocument::from)
                .collect();
            return print_json(&json!({
                "notifications": notifications,
                "total": page.total,
                "page": page.page.number(),
                "pages": pages,
            }));
        }

        if page.items.is_empty() {
            println!("No notifications.");
            return Ok(());
        }
        for notification in &page.items {
            print_notification(notification);
        }
        println!(
            "{}",
            format!(
                "page {} of {} ({} notifications)",
                page.page.number(),
                page.pages(),
                page.total
            )
            .dim()
        );
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Read {
    /// The notification's id
    id: NotificationId,

    /// The supervisor it is addressed to
    #[arg(long = "as", value_name = "USER")]
    actor: UserId,
}

impl Read {
    #[instrument(skip(root, output))]
    fn run(self, root: &Path, output: OutputFormat) -> anyhow::Result<()> {
        let directory = open(root)?;
        let notification = desk(&directory).mark_read(self.id, self.actor)?;
        save(&directory)?;
        match output {
            OutputFormat::Json => print_json(&NotificationDocument::from(notification)),
            OutputFormat::Text => {
                print_notification(&notification);
                Ok(())
            }
        }
    }
}

#[derive(Debug, clap::Parser)]
pub struct ReadAll {
    /// The supervisor
    #[arg(long = "as", value_name = "USER")]
    actor: UserId,
}

impl ReadAll {
    #[instrument(skip(root, output))]
    fn run(self, root: &Path, output: OutputFormat) -> anyhow::Result<()> {
        let directory = open(root)?;
        let count = desk(&directory).mark_all_read(self.actor)?;
        save(&directory)?;
        match output {
            OutputFormat::Json => print_json(&json!({ "marked": count })),
            OutputFormat::Text => {
                println!("{}", format!("Marked {count} notifications read").success());
                Ok(())
            }
        }
    }
}

#[derive(Debug, clap::Parser)]
pub struct Summary {
    /// The supervisor
    #[arg(long = "as", value_name = "USER")]
    actor: UserId,
}

impl Summary {
    fn run(self, root: &Path, output: OutputFormat) -> anyhow::Result<()> {
        let directory = open(root)?;
        let summary = desk(&directory).notification_summary(self.actor)?;
        match output {
            OutputFormat::Json => print_json(&summary),
            OutputFormat::Text => {
                let unread = summary.unread.to_string();
                println!(
                    "Unread: {}",
                    if summary.unread == 0 {
                        unread.success()
                    } else {
                        unread.warning()
                    }
                );
                println!("Read:   {}", summary.read);
                println!("Total:  {}", summary.total);
                Ok(())
            }
        }
    }
}

fn print_notification(notification: &Notification) {
    let id = notification
        .id()
        .map_or_else(|| "-".to_string(), |id| id.to_string());
    let marker = if notification.is_read() {
        " ".to_string()
    } else {
        "●".info()
    };
    println!(
        "{marker} #{id} {} {}",
        notification
            .generated_at()
            .format("%Y-%m-%d %H:%M")
            .to_string()
            .dim(),
        notification.description()
    );
}
