use std::path::Path;

use helpdesk::{
    Event, Ticket,
    desk::NewTicket,
    domain::{Comment, TicketId, TicketKind, UserId},
    storage::{CommentDocument, EventDocument, TicketDocument, TicketFilter},
};
use serde_json::json;
use tracing::instrument;

use super::{
    OutputFormat,
    args::{CategoryArg, RequestArg, StateArg, TicketTypeArg, UrgencyArg},
    desk, open, print_json, save, terminal,
    terminal::{Colorize, is_narrow},
    truncate,
};

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// File an incident or a service request
    Create(Create),
    /// Show a ticket with its comments and history
    Show(Show),
    /// List tickets visible to a user
    List(List),
    /// The work queue, highest priority first
    Queue(Queue),
    /// Assign a technician
    Assign(Assign),
    /// Move a ticket to a different technician
    Reassign(Reassign),
    /// Hand a ticket to another technician for consultation
    Derive(Derive),
    /// Resolve a ticket
    Resolve(Resolve),
    /// Reopen a resolved ticket
    Reopen(Reopen),
    /// Comment on a ticket
    Comment(AddComment),
    /// Show a ticket's audit trail
    History(History),
}

impl Command {
    pub fn run(self, root: &Path, output: OutputFormat) -> anyhow::Result<()> {
        match self {
            Self::Create(command) => command.run(root, output),
            Self::Show(command) => command.run(root, output),
            Self::List(command) => command.run(root, output),
            Self::Queue(command) => command.run(root, output),
            Self::Assign(command) => command.run(root, output),
            Self::Reassign(command) => command.run(root, output),
            Self::Derive(command) => command.run(root, output),
            Self::Resolve(command) => command.run(root, output),
            Self::Reopen(command) => command.run(root, output),
            Self::Comment(command) => command.run(root, output),
            Self::History(command) => command.run(root, output),
        }
    }
}

#[derive(Debug, clap::Parser)]
pub struct Create {
    /// The requester filing the ticket
    #[arg(long = "as", value_name = "USER")]
    actor: UserId,

    /// Short summary
    #[arg(long, short)]
    title: String,

    /// Full description
    #[arg(long, short)]
    description: String,

    /// Urgency of an incident
    #[arg(long, value_enum, required_unless_present = "request")]
    urgency: Option<UrgencyArg>,

    /// Category of an incident
    #[arg(long, value_enum, default_value = "unreachable", conflicts_with = "request")]
    category: CategoryArg,

    /// File a service request of this category instead of an incident
    #[arg(long, value_enum, conflicts_with = "urgency")]
    request: Option<RequestArg>,
}

impl Create {
    #[instrument(skip(self, root, output), fields(title = %self.title))]
    fn run(self, root: &Path, output: OutputFormat) -> anyhow::Result<()> {
        let kind = match (self.request, self.urgency) {
            (Some(category), _) => TicketKind::ServiceRequest {
                category: category.into(),
            },
            (None, Some(urgency)) => TicketKind::Incident {
                urgency: urgency.into(),
                category: self.category.into(),
            },
            (None, None) => anyhow::bail!("an incident needs an --urgency"),
        };

        let directory = open(root)?;
        let ticket = desk(&directory).create_ticket(
            self.actor,
            NewTicket {
                title: self.title,
                description: self.description,
                kind,
            },
        )?;
        save(&directory)?;
        report(&ticket, "Filed", output)
    }
}

#[derive(Debug, clap::Parser)]
pub struct Show {
    /// The ticket's id
    id: TicketId,

    /// The user looking at the ticket
    #[arg(long = "as", value_name = "USER")]
    actor: UserId,
}

impl Show {
    fn run(self, root: &Path, output: OutputFormat) -> anyhow::Result<()> {
        let directory = open(root)?;
        let ticket = desk(&directory).ticket(self.id, self.actor)?;
        match output {
            OutputFormat::Json => print_json(&TicketDocument::from(ticket)),
            OutputFormat::Text => {
                print_ticket(&ticket);
                Ok(())
            }
        }
    }
}

#[derive(Debug, clap::Parser)]
pub struct List {
    /// The user listing tickets; requesters and technicians only see their own
    #[arg(long = "as", value_name = "USER")]
    actor: UserId,

    /// Only tickets in this state
    #[arg(long, value_enum)]
    state: Option<StateArg>,

    /// Only tickets of this type
    #[arg(long = "type", value_enum)]
    ticket_type: Option<TicketTypeArg>,

    /// Only incidents of this urgency
    #[arg(long, value_enum)]
    urgency: Option<UrgencyArg>,

    /// Only tickets assigned to this technician
    #[arg(long)]
    technician: Option<UserId>,

    /// Hide resolved tickets
    #[arg(long)]
    unresolved: bool,

    /// Page number, from 1
    #[arg(long, default_value_t = 1)]
    page: usize,

    /// Page size; defaults to the configured size
    #[arg(long)]
    size: Option<usize>,
}

impl List {
    fn run(self, root: &Path, output: OutputFormat) -> anyhow::Result<()> {
        let directory = open(root)?;
        let filter = TicketFilter {
            state: self.state.map(Into::into),
            ticket_type: self.ticket_type.map(Into::into),
            urgency: self.urgency.map(Into::into),
            requester: None,
            technician: self.technician,
            unresolved: self.unresolved,
        };
        let page = desk(&directory).list_tickets(self.actor, filter, self.page, self.size)?;

        if output == OutputFormat::Json {
            let tickets: Vec<_> = page.items.iter().cloned().map(TicketDocument::from).collect();
            return print_json(&json!({
                "tickets": tickets,
                "total": page.total,
                "page": page.page.number(),
                "pages": page.pages(),
            }));
        }

        print_table(&page.items);
        println!(
            "{}",
            format!("page {} of {} ({} tickets)", page.page.number(), page.pages(), page.total).dim()
        );
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Queue {
    /// Only tickets in this state; defaults to every unresolved ticket
    #[arg(long, value_enum)]
    state: Option<StateArg>,

    /// How many tickets to show; defaults to the configured queue length
    #[arg(long)]
    limit: Option<usize>,
}

impl Queue {
    fn run(self, root: &Path, output: OutputFormat) -> anyhow::Result<()> {
        let directory = open(root)?;
        let tickets = desk(&directory).prioritized(self.state.map(Into::into), self.limit)?;
        match output {
            OutputFormat::Json => {
                let tickets: Vec<_> = tickets
                    .iter()
                    .map(|ticket| {
                        json!({
                            "ticket": TicketDocument::from(ticket.clone()),
                            "priority": ticket.priority(),
                        })
                    })
                    .collect();
                print_json(&tickets)
            }
            OutputFormat::Text => {
                print_table(&tickets);
                Ok(())
            }
        }
    }
}

#[derive(Debug, clap::Parser)]
pub struct Assign {
    /// The ticket's id
    id: TicketId,

    /// The technician to assign
    #[arg(long)]
    technician: UserId,

    /// The operator assigning
    #[arg(long = "as", value_name = "USER")]
    actor: UserId,

    /// A note to leave on the ticket
    #[arg(long)]
    comment: Option<String>,
}

impl Assign {
    #[instrument(skip(root, output))]
    fn run(self, root: &Path, output: OutputFormat) -> anyhow::Result<()> {
        let directory = open(root)?;
        let ticket = desk(&directory).assign(
            self.id,
            self.technician,
            self.actor,
            self.comment.as_deref(),
        )?;
        save(&directory)?;
        report(&ticket, "Assigned", output)
    }
}

#[derive(Debug, clap::Parser)]
pub struct Reassign {
    /// The ticket's id
    id: TicketId,

    /// The technician taking over
    #[arg(long)]
    technician: UserId,

    /// The operator reassigning
    #[arg(long = "as", value_name = "USER")]
    actor: UserId,

    /// Why the ticket changes hands
    #[arg(long)]
    reason: String,
}

impl Reassign {
    #[instrument(skip(root, output))]
    fn run(self, root: &Path, output: OutputFormat) -> anyhow::Result<()> {
        let directory = open(root)?;
        let ticket =
            desk(&directory).reassign(self.id, self.technician, self.actor, &self.reason)?;
        save(&directory)?;
        report(&ticket, "Reassigned", output)
    }
}

#[derive(Debug, clap::Parser)]
pub struct Derive {
    /// The ticket's id
    id: TicketId,

    /// The technician to consult
    #[arg(long)]
    to: UserId,

    /// The assigned technician
    #[arg(long = "as", value_name = "USER")]
    actor: UserId,

    /// What the other technician should look at
    #[arg(long)]
    reason: String,
}

impl Derive {
    #[instrument(skip(root, output))]
    fn run(self, root: &Path, output: OutputFormat) -> anyhow::Result<()> {
        let directory = open(root)?;
        let ticket = desk(&directory).derive(self.id, self.actor, self.to, &self.reason)?;
        save(&directory)?;
        report(&ticket, "Derived", output)
    }
}

#[derive(Debug, clap::Parser)]
pub struct Resolve {
    /// The ticket's id
    id: TicketId,

    /// The assigned technician
    #[arg(long = "as", value_name = "USER")]
    actor: UserId,

    /// A closing note
    #[arg(long)]
    comment: Option<String>,
}

impl Resolve {
    #[instrument(skip(root, output))]
    fn run(self, root: &Path, output: OutputFormat) -> anyhow::Result<()> {
        let directory = open(root)?;
        let ticket = desk(&directory).resolve(self.id, self.actor, self.comment.as_deref())?;
        save(&directory)?;
        report(&ticket, "Resolved", output)
    }
}

#[derive(Debug, clap::Parser)]
pub struct Reopen {
    /// The ticket's id
    id: TicketId,

    /// The user reopening
    #[arg(long = "as", value_name = "USER")]
    actor: UserId,

    /// Why the resolution did not hold
    #[arg(long)]
    reason: String,
}

impl Reopen {
    #[instrument(skip(root, output))]
    fn run(self, root: &Path, output: OutputFormat) -> anyhow::Result<()> {
        let directory = open(root)?;
        let ticket = desk(&directory).reopen(self.id, self.actor, &self.reason)?;
        save(&directory)?;
        report(&ticket, "Reopened", output)
    }
}

#[derive(Debug, clap::Parser)]
pub struct AddComment {
    /// The ticket's id
    id: TicketId,

    /// The comment
    text: String,

    /// The author
    #[arg(long = "as", value_name = "USER")]
    actor: UserId,
}

impl AddComment {
    #[instrument(skip(self, root, output), fields(id = self.id))]
    fn run(self, root: &Path, output: OutputFormat) -> anyhow::Result<()> {
        let directory = open(root)?;
        let comment = desk(&directory).add_comment(self.id, self.actor, &self.text)?;
        save(&directory)?;
        match output {
            OutputFormat::Json => print_json(&CommentDocument::from(comment)),
            OutputFormat::Text => {
                println!("{}", format!("Commented on ticket #{}", self.id).success());
                Ok(())
            }
        }
    }
}

#[derive(Debug, clap::Parser)]
pub struct History {
    /// The ticket's id
    id: TicketId,

    /// The user looking at the ticket
    #[arg(long = "as", value_name = "USER")]
    actor: UserId,
}

impl History {
    fn run(self, root: &Path, output: OutputFormat) -> anyhow::Result<()> {
        let directory = open(root)?;
        let events = desk(&directory).history(self.id, self.actor)?;
        match output {
            OutputFormat::Json => {
                let events: Vec<_> = events.into_iter().map(EventDocument::from).collect();
                print_json(&events)
            }
            OutputFormat::Text => {
                for event in &events {
                    print_event(event);
                }
                Ok(())
            }
        }
    }
}

/// Prints the outcome of a mutating command.
pub(super) fn report(ticket: &Ticket, verb: &str, output: OutputFormat) -> anyhow::Result<()> {
    match output {
        OutputFormat::Json => print_json(&TicketDocument::from(ticket.clone())),
        OutputFormat::Text => {
            println!("{}", format!("{verb} {ticket}").success());
            println!("  State: {}", terminal::state(ticket.state()));
            if let Some(technician) = ticket.assigned_technician() {
                println!("  Technician: {}", technician.name);
            }
            Ok(())
        }
    }
}

fn print_table(tickets: &[Ticket]) {
    if tickets.is_empty() {
        println!("No tickets found.");
        return;
    }
    let narrow = is_narrow();
    if !narrow {
        println!(
            "{:<5} {:<10} {:<11} {:<10} {:>8}  Title",
            "Id", "Type", "State", "Urgency", "Priority"
        );
    }
    for ticket in tickets {
        let id = ticket.id().map_or_else(|| "-".to_string(), |id| id.to_string());
        if narrow {
            println!(
                "#{id} {} {}",
                terminal::state(ticket.state()),
                truncate(ticket.title(), 40)
            );
        } else {
            // colour codes would break the padding, so pad before colouring
            println!(
                "{id:<5} {:<10} {} {} {:>8}  {}",
                ticket.ticket_type().as_str(),
                terminal::state(ticket.state()) + &pad(ticket.state().as_str(), 11),
                terminal::urgency(ticket.urgency())
                    + &pad(ticket.urgency().map_or("–", |u| u.as_str()), 10),
                ticket.priority(),
                truncate(ticket.title(), 48)
            );
        }
    }
}

fn pad(text: &str, width: usize) -> String {
    " ".repeat(width.saturating_sub(text.chars().count()))
}

fn print_ticket(ticket: &Ticket) {
    println!("# {ticket}");
    println!("{}\n", ticket.description());

    println!("{}", "Details".dim());
    println!("  State:      {}", terminal::state(ticket.state()));
    println!("  Category:   {}", ticket.category());
    if ticket.urgency().is_some() {
        println!("  Urgency:    {}", terminal::urgency(ticket.urgency()));
    }
    println!("  Priority:   {}", ticket.priority());
    println!("  Requester:  {}", ticket.requester().name);
    if let Some(technician) = ticket.assigned_technician() {
        println!("  Technician: {}", technician.name);
    }
    println!(
        "  Created:    {} ({} days ago)",
        ticket.created_at().format("%Y-%m-%d %H:%M"),
        ticket.days_since_creation()
    );
    if let Some(resolution) = ticket.resolution_time() {
        println!("  Resolved in {resolution}");
    }

    if !ticket.comments().is_empty() {
        println!("\n{}", "Comments".dim());
        for comment in ticket.comments() {
            print_comment(comment);
        }
    }

    println!("\n{}", "History".dim());
    for event in ticket.history() {
        print_event(event);
    }
}

fn print_comment(comment: &Comment) {
    println!(
        "  {} {}: {}",
        comment.created_at().format("%Y-%m-%d %H:%M").to_string().dim(),
        comment.author().name,
        comment.text()
    );
}

fn print_event(event: &Event) {
    println!(
        "  {} {} {}",
        event.occurred_at().format("%Y-%m-%d %H:%M").to_string().dim(),
        event.title().info(),
        event.description()
    );
}
