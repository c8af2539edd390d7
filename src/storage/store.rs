//! Storage collaborators.
//!
//! The traits here are what the desk and the [`Notifier`](crate::domain::Notifier)
//! need from persistence: keyed lookups, upserts that allocate ids, and a few
//! listing and aggregate queries. All methods take `&self`; implementations
//! provide their own interior locking.

use std::{collections::BTreeMap, fmt, io, path::PathBuf};

use serde::Serialize;

use crate::domain::{
    self, Email, Notification, NotificationId, Service, ServiceId, State, Ticket, TicketId,
    TicketType, Urgency, User, UserId, UserKind,
};

/// Failures raised by a store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing files failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored document no longer satisfies the domain's invariants.
    #[error("corrupt document: {0}")]
    Corrupt(#[from] domain::Error),

    /// No help desk has been initialised at the given path.
    #[error("no help desk found at {}", .0.display())]
    NotInitialised(PathBuf),

    /// A help desk already exists at the given path.
    #[error("a help desk already exists at {}", .0.display())]
    AlreadyInitialised(PathBuf),
}

/// The named counters ids are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Sequence {
    /// User ids.
    User,
    /// Ticket ids.
    Ticket,
    /// Service ids.
    Service,
    /// Notification ids.
    Notification,
    /// Comment ids.
    Comment,
    /// Event ids.
    Event,
}

impl Sequence {
    /// Every sequence.
    pub const ALL: [Self; 6] = [
        Self::User,
        Self::Ticket,
        Self::Service,
        Self::Notification,
        Self::Comment,
        Self::Event,
    ];

    /// The counter's persisted name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::User => "usuario_id",
            Self::Ticket => "requerimiento_id",
            Self::Service => "servicio_id",
            Self::Notification => "notificacion_id",
            Self::Comment => "comentario_id",
            Self::Event => "evento_id",
        }
    }

    /// Looks a sequence up by its persisted name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A one-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    number: usize,
    size: usize,
}

impl Page {
    /// A page of `size` items. Page numbers start at 1; zero is treated as 1,
    /// as is a zero size.
    #[must_use]
    pub fn new(number: usize, size: usize) -> Self {
        Self {
            number: number.max(1),
            size: size.max(1),
        }
    }

    /// A single page holding everything.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            number: 1,
            size: usize::MAX,
        }
    }

    /// The one-based page number.
    #[must_use]
    pub const fn number(self) -> usize {
        self.number
    }

    /// The page size.
    #[must_use]
    pub const fn size(self) -> usize {
        self.size
    }

    /// The number of items skipped before this page.
    #[must_use]
    pub const fn offset(self) -> usize {
        (self.number - 1).saturating_mul(self.size)
    }

    /// Cuts this page out of an already-ordered sequence.
    pub fn slice<T>(self, items: impl IntoIterator<Item = T>) -> Paged<T> {
        let mut total = 0;
        let mut kept = Vec::new();
        for (index, item) in items.into_iter().enumerate() {
            total += 1;
            if index >= self.offset() && kept.len() < self.size {
                kept.push(item);
            }
        }
        Paged {
            items: kept,
            total,
            page: self,
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(1, 20)
    }
}

/// One page of results plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paged<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// How many items matched in total.
    pub total: usize,
    /// The page that was requested.
    pub page: Page,
}

impl<T> Paged<T> {
    /// The number of pages needed to show every match.
    #[must_use]
    pub const fn pages(&self) -> usize {
        self.total.div_ceil(self.page.size)
    }

    /// Maps the items, keeping the paging information.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paged<U> {
        Paged {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
        }
    }
}

/// Criteria for listing tickets. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketFilter {
    /// Only tickets in this state.
    pub state: Option<State>,
    /// Only tickets of this type.
    pub ticket_type: Option<TicketType>,
    /// Only incidents of this urgency.
    pub urgency: Option<Urgency>,
    /// Only tickets filed by this requester.
    pub requester: Option<UserId>,
    /// Only tickets assigned to this technician.
    pub technician: Option<UserId>,
    /// Only tickets that are not resolved.
    pub unresolved: bool,
}

impl TicketFilter {
    /// Whether `ticket` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, ticket: &Ticket) -> bool {
        self.state.is_none_or(|state| ticket.state() == state)
            && self
                .ticket_type
                .is_none_or(|kind| ticket.ticket_type() == kind)
            && self
                .urgency
                .is_none_or(|urgency| ticket.urgency() == Some(urgency))
            && self
                .requester
                .is_none_or(|id| ticket.requester().id == Some(id))
            && self.technician.is_none_or(|id| {
                ticket
                    .assigned_technician()
                    .is_some_and(|assigned| assigned.id == Some(id))
            })
            && !(self.unresolved && ticket.state() == State::Resolved)
    }
}

/// Criteria for listing users.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    /// Only users of this kind.
    pub kind: Option<UserKind>,
    /// Only technicians with this specialty.
    pub specialty: Option<String>,
}

impl UserFilter {
    /// Whether `user` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, user: &User) -> bool {
        self.kind.is_none_or(|kind| user.kind() == kind)
            && self
                .specialty
                .as_deref()
                .is_none_or(|specialty| user.has_specialty(specialty))
    }
}

/// Aggregate ticket counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TicketMetrics {
    /// Every ticket.
    pub total: usize,
    /// Incidents.
    pub incidents: usize,
    /// Service requests.
    pub service_requests: usize,
    /// Resolved tickets.
    pub resolved: usize,
    /// Tickets not resolved.
    pub pending: usize,
    /// Ticket count per state. Every state is present.
    pub by_state: BTreeMap<State, usize>,
    /// Incident count per urgency. Every urgency is present.
    pub by_urgency: BTreeMap<Urgency, usize>,
}

impl TicketMetrics {
    /// Tallies the given tickets.
    pub fn tally<'a>(tickets: impl IntoIterator<Item = &'a Ticket>) -> Self {
        let mut metrics = Self {
            by_state: State::ALL.into_iter().map(|s| (s, 0)).collect(),
            by_urgency: [Urgency::Critical, Urgency::Important, Urgency::Minor]
                .into_iter()
                .map(|u| (u, 0))
                .collect(),
            ..Self::default()
        };
        for ticket in tickets {
            metrics.total += 1;
            match ticket.ticket_type() {
                TicketType::Incident => metrics.incidents += 1,
                TicketType::ServiceRequest => metrics.service_requests += 1,
            }
            if ticket.state() == State::Resolved {
                metrics.resolved += 1;
            } else {
                metrics.pending += 1;
            }
            *metrics.by_state.entry(ticket.state()).or_default() += 1;
            if let Some(urgency) = ticket.urgency() {
                *metrics.by_urgency.entry(urgency).or_default() += 1;
            }
        }
        metrics
    }
}

/// Atomically hands out the next value of a named counter.
pub trait SequenceGenerator {
    /// Returns the next id from `sequence`. The first id is 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the counter cannot be advanced.
    fn next_id(&self, sequence: Sequence) -> Result<u64, StoreError>;
}

/// Persistence for users.
///
/// Requesters are returned with their services attached.
pub trait UserStore {
    /// Finds a user by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Finds a user by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn user_by_email(&self, email: &Email) -> Result<Option<User>, StoreError>;

    /// Whether any user has this email.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn email_exists(&self, email: &Email) -> Result<bool, StoreError> {
        Ok(self.user_by_email(email)?.is_some())
    }

    /// Inserts or replaces a user, allocating an id if it has none.
    ///
    /// A requester's services are not written here; see
    /// [`ServiceStore::save_service`].
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn save_user(&self, user: User) -> Result<User, StoreError>;

    /// Lists users in id order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn list_users(&self, filter: &UserFilter, page: Page) -> Result<Paged<User>, StoreError>;

    /// Every supervisor whose supervised operators or technicians include
    /// `employee`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn supervisors_of(&self, employee: UserId) -> Result<Vec<User>, StoreError>;
}

/// Persistence for tickets, including their comments and events.
pub trait TicketStore {
    /// Finds a ticket by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn ticket(&self, id: TicketId) -> Result<Option<Ticket>, StoreError>;

    /// Inserts or replaces a ticket.
    ///
    /// Allocates ids for the ticket and for any comment or event that lacks
    /// one, and stamps the ticket id onto them.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn save_ticket(&self, ticket: Ticket) -> Result<Ticket, StoreError>;

    /// Lists matching tickets, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn list_tickets(&self, filter: &TicketFilter, page: Page) -> Result<Paged<Ticket>, StoreError>;

    /// Aggregate counts over every ticket.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn metrics(&self) -> Result<TicketMetrics, StoreError>;

    /// Unresolved critical incidents, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn critical_pending(&self) -> Result<Vec<Ticket>, StoreError>;
}

/// Persistence for subscribed services.
pub trait ServiceStore {
    /// Finds a service by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn service(&self, id: ServiceId) -> Result<Option<Service>, StoreError>;

    /// Every service owned by `owner`, in id order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn services_of(&self, owner: UserId) -> Result<Vec<Service>, StoreError>;

    /// Inserts or replaces a service, allocating an id if it has none.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn save_service(&self, service: Service) -> Result<Service, StoreError>;
}

/// Persistence for supervisor notifications.
pub trait NotificationStore {
    /// Finds a notification by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn notification(&self, id: NotificationId) -> Result<Option<Notification>, StoreError>;

    /// Inserts or replaces a notification, allocating an id if it has none.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn save_notification(&self, notification: Notification) -> Result<Notification, StoreError>;

    /// A supervisor's notifications, newest first, optionally filtered by
    /// read flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn notifications_for(
        &self,
        supervisor: UserId,
        read: Option<bool>,
        page: Page,
    ) -> Result<Paged<Notification>, StoreError>;

    /// Counts a supervisor's notifications, optionally filtered by read flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn count_for(&self, supervisor: UserId, read: Option<bool>) -> Result<usize, StoreError> {
        Ok(self.notifications_for(supervisor, read, Page::all())?.total)
    }
}

/// Everything the desk needs from persistence.
pub trait Store:
    UserStore + TicketStore + ServiceStore + NotificationStore + SequenceGenerator
{
}

impl<T> Store for T where
    T: UserStore + TicketStore + ServiceStore + NotificationStore + SequenceGenerator
{
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(Page::new(1, 2), &[1, 2])]
    #[test_case(Page::new(2, 2), &[3, 4])]
    #[test_case(Page::new(3, 2), &[5])]
    #[test_case(Page::new(4, 2), &[])]
    #[test_case(Page::new(0, 0), &[1])]
    fn slicing(page: Page, expected: &[u32]) {
        let paged = page.slice(1..=5);
        assert_eq!(paged.items, expected);
        assert_eq!(paged.total, 5);
    }

    #[test]
    fn page_count() {
        assert_eq!(Page::new(1, 2).slice(1..=5).pages(), 3);
        assert_eq!(Page::all().slice(1..=5).pages(), 1);
        assert_eq!(Page::new(1, 2).slice(Vec::<u8>::new()).pages(), 0);
    }

    #[test]
    fn sequence_names_round_trip() {
        for sequence in Sequence::ALL {
            assert_eq!(Sequence::from_name(sequence.name()), Some(sequence));
        }
        assert_eq!(Sequence::from_name("nope"), None);
    }
}
