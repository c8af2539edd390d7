//! Domain model for the help desk.
//!
//! Users, tickets and their audit trail, plus the rules that govern them:
//! the ticket state machine, priority scoring, role-based permissions and the
//! fan-out of events to supervisors. Nothing in here performs I/O except
//! [`Notifier`], which writes through the store traits it is handed.

/// Persisted id of a [`User`].
pub type UserId = u64;
/// Persisted id of a [`Ticket`].
pub type TicketId = u64;
/// Persisted id of a [`Comment`].
pub type CommentId = u64;
/// Persisted id of an [`Event`].
pub type EventId = u64;
/// Persisted id of a [`Notification`].
pub type NotificationId = u64;
/// Persisted id of a [`Service`].
pub type ServiceId = u64;

mod comment;
pub use comment::{Comment, MIN_COMMENT_LEN};
pub(crate) use comment::validate_text as validate_comment_text;

mod config;
pub use config::Config;

/// Email addresses.
pub mod email;
pub use email::Email;

mod error;
pub use error::Error;

mod event;
pub use event::{Event, EventKind, EventType};

mod factory;
pub use factory::{EventArgs, EventFactory};

mod notification;
pub use notification::Notification;

mod notifier;
pub use notifier::Notifier;

pub mod ordering;

mod service;
pub use service::{Service, ServiceKind};

pub mod ticket;
pub use ticket::{
    IncidentCategory, RequestCategory, ResolutionTime, State, Ticket, TicketKind, TicketType,
    Urgency,
};

pub(crate) mod user;
pub use user::{Role, User, UserKind, UserRef};
