use std::path::{Path, PathBuf};

mod args;
mod init;
mod notification;
mod report;
mod service;
mod terminal;
mod ticket;
mod user;

use anyhow::Context as _;
use clap::{ArgAction, ValueEnum};
use helpdesk::{Directory, HelpDesk, storage::MemoryStore};
use serde::Serialize;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The path to the root of the help desk directory
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

/// How results are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human readable, coloured when the terminal supports it.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);
        self.command.run(&self.root, self.output)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Initialise an empty help desk
    Init(init::Command),

    /// Register, list and organise users
    #[command(subcommand)]
    User(user::Command),

    /// File, route and close tickets
    #[command(subcommand)]
    Ticket(ticket::Command),

    /// Inspect services and request activations or cancellations
    #[command(subcommand)]
    Service(service::Command),

    /// Read supervisor notifications
    #[command(subcommand)]
    Notification(notification::Command),

    /// Dashboards for operators and technicians
    #[command(subcommand)]
    Report(report::Command),
}

impl Command {
    fn run(self, root: &Path, output: OutputFormat) -> anyhow::Result<()> {
        match self {
            Self::Init(command) => command.run(root),
            Self::User(command) => command.run(root, output),
            Self::Ticket(command) => command.run(root, output),
            Self::Service(command) => command.run(root, output),
            Self::Notification(command) => command.run(root, output),
            Self::Report(command) => command.run(root, output),
        }
    }
}

/// Opens the help desk directory at `root`.
fn open(root: &Path) -> anyhow::Result<Directory> {
    Directory::open(root.to_path_buf())
        .with_context(|| format!("failed to open help desk at {}", root.display()))
}

/// A desk over the directory's store.
fn desk(directory: &Directory) -> HelpDesk<'_, MemoryStore> {
    HelpDesk::new(directory.store(), directory.config().clone())
}

/// Persists the directory after a mutating command.
fn save(directory: &Directory) -> anyhow::Result<()> {
    directory
        .save()
        .with_context(|| format!("failed to save help desk at {}", directory.root().display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Shortens `text` to at most `width` characters, marking the cut.
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
