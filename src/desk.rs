//! The help desk service layer.
//!
//! [`HelpDesk`] turns requests from an outer surface (the CLI, here) into
//! domain operations. Every mutating operation follows the same shape: load
//! the entities involved, check the acting user's permissions, call the
//! lifecycle method, append the matching events, persist the ticket, and
//! finally hand the persisted events to the [`Notifier`].

use crate::{
    domain::{Config, Notifier, Ticket, TicketId, User, UserId, UserKind},
    storage::{Page, Store},
};

mod assignment;
mod comments;
mod error;
mod notifications;
mod reports;
mod services;
mod tickets;
mod users;

pub use error::Error;
pub use notifications::NotificationSummary;
pub use reports::{OperatorDashboard, QueueEntry, TechnicianDashboard, TechnicianLoad};
pub use tickets::NewTicket;
pub use users::{NewRole, NewService, Registration};

/// Result type of desk operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The help desk, over a store.
#[derive(Debug)]
pub struct HelpDesk<'s, S> {
    store: &'s S,
    config: Config,
}

impl<'s, S: Store> HelpDesk<'s, S> {
    /// A desk over `store`.
    #[must_use]
    pub const fn new(store: &'s S, config: Config) -> Self {
        Self { store, config }
    }

    /// The desk's configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The backing store.
    #[must_use]
    pub const fn store(&self) -> &'s S {
        self.store
    }

    fn notifier(&self) -> Notifier<'s> {
        Notifier::new(self.store, self.store, self.store)
    }

    fn page(&self, number: usize, size: Option<usize>) -> Page {
        Page::new(number, self.config.page_size(size))
    }

    fn require_user(&self, id: UserId) -> Result<User> {
        self.store
            .user(id)?
            .ok_or_else(|| Error::not_found("user", id))
    }

    fn require_kind(&self, id: UserId, kind: UserKind) -> Result<User> {
        self.store
            .user(id)?
            .filter(|user| user.kind() == kind)
            .ok_or_else(|| Error::not_found(&kind.as_str().to_lowercase(), id))
    }

    fn require_ticket(&self, id: TicketId) -> Result<Ticket> {
        self.store
            .ticket(id)?
            .ok_or_else(|| Error::not_found("ticket", id))
    }

    /// Persists `ticket` and notifies supervisors of its last `new_events`
    /// events, using the persisted copies so they carry their ids.
    fn commit(&self, ticket: Ticket, new_events: usize) -> Result<Ticket> {
        let saved = self.store.save_ticket(ticket)?;
        let fresh = saved.events().len().saturating_sub(new_events);
        let notifier = self.notifier();
        for event in &saved.events()[fresh..] {
            tracing::info!(
                ticket = saved.id(),
                state = %saved.state(),
                event = %event.event_type(),
                "{}",
                event.description()
            );
            notifier.notify(event)?;
        }
        Ok(saved)
    }
}
