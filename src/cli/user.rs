use std::path::Path;

use helpdesk::{
    User,
    desk::{NewRole, NewService, Registration},
    domain::UserId,
    storage::UserFilter,
};
use serde_json::json;
use tracing::instrument;

use super::{
    OutputFormat,
    args::{UserKindArg, parse_service},
    desk, open, print_json, save,
    terminal::{Colorize, is_narrow},
};

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Register a user
    Add(Add),
    /// Show a user
    Show(Show),
    /// List users
    List(List),
    /// Make a supervisor supervise an operator or technician
    Supervise(Supervise),
}

impl Command {
    pub fn run(self, root: &Path, output: OutputFormat) -> anyhow::Result<()> {
        match self {
            Self::Add(command) => command.run(root, output),
            Self::Show(command) => command.run(root, output),
            Self::List(command) => command.run(root, output),
            Self::Supervise(command) => command.run(root, output),
        }
    }
}

#[derive(Debug, clap::Parser)]
pub struct Add {
    /// The role of the new user
    #[arg(value_enum)]
    role: UserKindArg,

    /// Display name
    #[arg(long)]
    name: String,

    /// Email address; staff need a corporate address
    #[arg(long)]
    email: String,

    /// Password hash, stored as given
    #[arg(long)]
    password_hash: String,

    /// Subscribed service as KIND:NUMBER (requesters, repeatable)
    #[arg(long = "service", value_parser = parse_service)]
    services: Vec<NewService>,

    /// Specialty label (technicians, repeatable)
    #[arg(long = "specialty")]
    specialties: Vec<String>,
}

impl Add {
    #[instrument(skip(self, root, output), fields(email = %self.email))]
    fn run(self, root: &Path, output: OutputFormat) -> anyhow::Result<()> {
        let directory = open(root)?;
        let role = match self.role {
            UserKindArg::Requester => NewRole::Requester {
                services: self.services,
            },
            UserKindArg::Operator => NewRole::Operator,
            UserKindArg::Technician => NewRole::Technician {
                specialties: self.specialties,
            },
            UserKindArg::Supervisor => NewRole::Supervisor,
        };
        let user = desk(&directory).register_user(Registration {
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            role,
        })?;
        save(&directory)?;

        match output {
            OutputFormat::Json => print_json(&user_json(&user)),
            OutputFormat::Text => {
                println!(
                    "{}",
                    format!("Registered {} #{}", user.kind(), id(&user)).success()
                );
                Ok(())
            }
        }
    }
}

#[derive(Debug, clap::Parser)]
pub struct Show {
    /// The user's id
    id: UserId,
}

impl Show {
    fn run(self, root: &Path, output: OutputFormat) -> anyhow::Result<()> {
        let directory = open(root)?;
        let user = desk(&directory).user(self.id)?;
        match output {
            OutputFormat::Json => print_json(&user_json(&user)),
            OutputFormat::Text => {
                print_user(&user);
                Ok(())
            }
        }
    }
}

#[derive(Debug, clap::Parser)]
pub struct List {
    /// Only users of this kind
    #[arg(long, value_enum)]
    kind: Option<UserKindArg>,

    /// Only technicians with this specialty
    #[arg(long)]
    specialty: Option<String>,

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
        let filter = UserFilter {
            kind: self.kind.map(Into::into),
            specialty: self.specialty,
        };
        let page = desk(&directory).list_users(&filter, self.page, self.size)?;

        if output == OutputFormat::Json {
            let users: Vec<_> = page.items.iter().map(user_json).collect();
            return print_json(&json!({
                "users": users,
                "total": page.total,
                "page": page.page.number(),
                "pages": page.pages(),
            }));
        }

        if page.items.is_empty() {
            println!("No users found.");
            return Ok(());
        }
        let narrow = is_narrow();
        if !narrow {
            println!("{:<5} {:<12} {:<24} Email", "Id", "Kind", "Name");
        }
        for user in &page.items {
            if narrow {
                println!("#{} {} <{}>", id(user), user.name(), user.email());
            } else {
                println!(
                    "{:<5} {:<12} {:<24} {}",
                    id(user),
                    user.kind(),
                    user.name(),
                    user.email().as_str().dim()
                );
            }
        }
        println!(
            "{}",
            format!("page {} of {} ({} users)", page.page.number(), page.pages(), page.total).dim()
        );
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Supervise {
    /// The supervisor's id
    #[arg(long)]
    supervisor: UserId,

    /// The operator's or technician's id
    #[arg(long)]
    employee: UserId,
}

impl Supervise {
    #[instrument(skip(root, output))]
    fn run(self, root: &Path, output: OutputFormat) -> anyhow::Result<()> {
        let directory = open(root)?;
        let supervisor = desk(&directory).add_supervisee(self.supervisor, self.employee)?;
        save(&directory)?;
        match output {
            OutputFormat::Json => print_json(&user_json(&supervisor)),
            OutputFormat::Text => {
                println!(
                    "{}",
                    format!("{} now supervises user #{}", supervisor.name(), self.employee)
                        .success()
                );
                Ok(())
            }
        }
    }
}

fn id(user: &User) -> String {
    user.id().map_or_else(|| "-".to_string(), |id| id.to_string())
}

fn print_user(user: &User) {
    println!("# {} {}", id(user), user.name());
    println!("  Kind:    {}", user.kind());
    println!("  Email:   {}", user.email());
    println!("  Created: {}", user.created_at().format("%Y-%m-%d %H:%M"));
    if let Some(last) = user.last_access() {
        println!("  Seen:    {}", last.format("%Y-%m-%d %H:%M"));
    }
    if !user.services().is_empty() {
        println!("\n{}", "Services".dim());
        for service in user.services() {
            println!("  • {service}");
        }
    }
    let specialties: Vec<&str> = user.specialties().collect();
    if !specialties.is_empty() {
        println!("\n{}", "Specialties".dim());
        println!("  {}", specialties.join(", "));
    }
    let supervised: Vec<String> = user
        .supervised_operators()
        .chain(user.supervised_technicians())
        .map(|id| format!("#{id}"))
        .collect();
    if !supervised.is_empty() {
        println!("\n{}", "Supervises".dim());
        println!("  {}", supervised.join(", "));
    }
}

fn user_json(user: &User) -> serde_json::Value {
    let services: Vec<_> = user
        .services()
        .iter()
        .map(|service| {
            json!({
                "id": service.id(),
                "kind": service.kind(),
                "number": service.number(),
                "active": service.is_active(),
            })
        })
        .collect();
    json!({
        "id": user.id(),
        "name": user.name(),
        "email": user.email().as_str(),
        "kind": user.kind(),
        "created_at": user.created_at(),
        "last_access": user.last_access(),
        "services": services,
        "specialties": user.specialties().collect::<Vec<_>>(),
        "supervises": user
            .supervised_operators()
            .chain(user.supervised_technicians())
            .collect::<Vec<_>>(),
    })
}
