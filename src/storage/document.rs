//! Wire representation of stored entities.
//!
//! Each domain entity has a matching serde document. Conversion into a
//! document is infallible; conversion back re-runs the domain's validation so
//! a hand-edited data file cannot smuggle in an invalid entity.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{
        self, Comment, CommentId, Email, Event, EventId, EventKind, IncidentCategory,
        Notification, NotificationId, RequestCategory, Role, Service, ServiceId, ServiceKind,
        State, Ticket, TicketId, TicketKind, Urgency, User, UserId, UserKind, UserRef,
    },
    storage::{Sequence, Snapshot},
};

/// The full contents of a data file.
///
/// Versioned the same way as the configuration file, so the layout can evolve
/// without breaking existing data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_version")]
pub enum DataDocument {
    /// The first layout.
    #[serde(rename = "1")]
    V1 {
        /// Counter values keyed by sequence name.
        #[serde(default)]
        sequences: BTreeMap<String, u64>,
        /// Users.
        #[serde(default)]
        users: Vec<UserDocument>,
        /// Services.
        #[serde(default)]
        services: Vec<ServiceDocument>,
        /// Tickets.
        #[serde(default)]
        tickets: Vec<TicketDocument>,
        /// Notifications.
        #[serde(default)]
        notifications: Vec<NotificationDocument>,
    },
}

impl Default for DataDocument {
    fn default() -> Self {
        Self::from(Snapshot::default())
    }
}

impl From<Snapshot> for DataDocument {
    fn from(snapshot: Snapshot) -> Self {
        Self::V1 {
            sequences: snapshot
                .sequences
                .into_iter()
                .map(|(sequence, value)| (sequence.name().to_string(), value))
                .collect(),
            users: snapshot.users.into_iter().map(Into::into).collect(),
            services: snapshot.services.into_iter().map(Into::into).collect(),
            tickets: snapshot.tickets.into_iter().map(Into::into).collect(),
            notifications: snapshot.notifications.into_iter().map(Into::into).collect(),
        }
    }
}

impl TryFrom<DataDocument> for Snapshot {
    type Error = domain::Error;

    fn try_from(document: DataDocument) -> Result<Self, Self::Error> {
        let DataDocument::V1 {
            sequences,
            users,
            services,
            tickets,
            notifications,
        } = document;

        let sequences = sequences
            .into_iter()
            .filter_map(|(name, value)| {
                let sequence = Sequence::from_name(&name);
                if sequence.is_none() {
                    tracing::warn!(%name, "ignoring unknown sequence");
                }
                Some((sequence?, value))
            })
            .collect();

        Ok(Self {
            sequences,
            users: collect(users)?,
            services: collect(services)?,
            tickets: collect(tickets)?,
            notifications: collect(notifications)?,
        })
    }
}

fn collect<D, T>(documents: Vec<D>) -> Result<Vec<T>, domain::Error>
where
    T: TryFrom<D, Error = domain::Error>,
{
    documents.into_iter().map(T::try_from).collect()
}

/// A stored user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDocument {
    id: Option<UserId>,
    name: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
    last_access: Option<DateTime<Utc>>,
    #[serde(rename = "tipo")]
    kind: UserKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    specialties: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    supervised_operators: Vec<UserId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    supervised_technicians: Vec<UserId>,
}

impl From<User> for UserDocument {
    fn from(user: User) -> Self {
        let kind = user.kind();
        let (specialties, supervised_operators, supervised_technicians) = match user.role {
            Role::Technician { specialties } => {
                (specialties.into_iter().collect(), Vec::new(), Vec::new())
            }
            Role::Supervisor {
                operators,
                technicians,
            } => (
                Vec::new(),
                operators.into_iter().collect(),
                technicians.into_iter().collect(),
            ),
            Role::Requester { .. } | Role::Operator => (Vec::new(), Vec::new(), Vec::new()),
        };
        Self {
            id: user.id,
            name: user.name,
            email: user.email.as_str().to_string(),
            password_hash: user.password_hash,
            created_at: user.created_at,
            last_access: user.last_access,
            kind,
            specialties,
            supervised_operators,
            supervised_technicians,
        }
    }
}

impl TryFrom<UserDocument> for User {
    type Error = domain::Error;

    fn try_from(document: UserDocument) -> Result<Self, Self::Error> {
        let role = match document.kind {
            UserKind::Requester => Role::Requester {
                services: Vec::new(),
            },
            UserKind::Operator => Role::Operator,
            UserKind::Technician => Role::Technician {
                specialties: document.specialties.into_iter().collect(),
            },
            UserKind::Supervisor => Role::Supervisor {
                operators: document.supervised_operators.into_iter().collect(),
                technicians: document.supervised_technicians.into_iter().collect(),
            },
        };
        let mut user = Self::new(
            document.id,
            document.name,
            Email::new(document.email)?,
            document.password_hash,
            role,
        )?;
        user.created_at = document.created_at;
        user.last_access = document.last_access;
        Ok(user)
    }
}

/// A stored service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDocument {
    id: Option<ServiceId>,
    #[serde(rename = "tipo")]
    kind: ServiceKind,
    number: String,
    owner: UserId,
    active: bool,
    activated_at: DateTime<Utc>,
}

impl From<Service> for ServiceDocument {
    fn from(service: Service) -> Self {
        Self {
            id: service.id,
            kind: service.kind,
            number: service.number,
            owner: service.owner,
            active: service.active,
            activated_at: service.activated_at,
        }
    }
}

impl TryFrom<ServiceDocument> for Service {
    type Error = domain::Error;

    fn try_from(document: ServiceDocument) -> Result<Self, Self::Error> {
        let mut service = Self::new(document.id, document.kind, document.number, document.owner)?;
        service.active = document.active;
        service.activated_at = document.activated_at;
        Ok(service)
    }
}

/// Subtype-specific ticket fields, tagged by ticket type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tipo")]
enum KindDocument {
    #[serde(rename = "INCIDENTE")]
    Incident {
        urgency: Urgency,
        category: IncidentCategory,
    },
    #[serde(rename = "SOLICITUD")]
    ServiceRequest { category: RequestCategory },
}

impl From<TicketKind> for KindDocument {
    fn from(kind: TicketKind) -> Self {
        match kind {
            TicketKind::Incident { urgency, category } => Self::Incident { urgency, category },
            TicketKind::ServiceRequest { category } => Self::ServiceRequest { category },
        }
    }
}

impl From<KindDocument> for TicketKind {
    fn from(kind: KindDocument) -> Self {
        match kind {
            KindDocument::Incident { urgency, category } => Self::Incident { urgency, category },
            KindDocument::ServiceRequest { category } => Self::ServiceRequest { category },
        }
    }
}

/// A stored ticket, with its comments and events inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketDocument {
    id: Option<TicketId>,
    title: String,
    description: String,
    requester: UserRef,
    state: State,
    assigned_technician: Option<UserRef>,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    comments: Vec<CommentDocument>,
    #[serde(default)]
    events: Vec<EventDocument>,
    #[serde(flatten)]
    kind: KindDocument,
}

impl From<Ticket> for TicketDocument {
    fn from(ticket: Ticket) -> Self {
        Self {
            id: ticket.id,
            title: ticket.title,
            description: ticket.description,
            requester: ticket.requester,
            state: ticket.state,
            assigned_technician: ticket.assigned_technician,
            created_at: ticket.created_at,
            resolved_at: ticket.resolved_at,
            comments: ticket.comments.into_iter().map(Into::into).collect(),
            events: ticket.events.into_iter().map(Into::into).collect(),
            kind: ticket.kind.into(),
        }
    }
}

impl TryFrom<TicketDocument> for Ticket {
    type Error = domain::Error;

    fn try_from(document: TicketDocument) -> Result<Self, Self::Error> {
        domain::ticket::validate_details(&document.title, &document.description)?;
        if document.state == State::Resolved && document.resolved_at.is_none() {
            return Err(domain::Error::validation(
                "a resolved ticket must record when it was resolved",
            ));
        }
        Ok(Self {
            id: document.id,
            title: document.title,
            description: document.description,
            requester: document.requester,
            state: document.state,
            assigned_technician: document.assigned_technician,
            created_at: document.created_at,
            resolved_at: document.resolved_at,
            comments: collect(document.comments)?,
            events: collect(document.events)?,
            kind: document.kind.into(),
        })
    }
}

/// A stored comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentDocument {
    id: Option<CommentId>,
    text: String,
    author: UserRef,
    ticket: Option<TicketId>,
    created_at: DateTime<Utc>,
}

impl From<Comment> for CommentDocument {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            text: comment.text,
            author: comment.author,
            ticket: comment.ticket,
            created_at: comment.created_at,
        }
    }
}

impl TryFrom<CommentDocument> for Comment {
    type Error = domain::Error;

    fn try_from(document: CommentDocument) -> Result<Self, Self::Error> {
        domain::validate_comment_text(&document.text)?;
        Ok(Self {
            id: document.id,
            text: document.text,
            author: document.author,
            ticket: document.ticket,
            created_at: document.created_at,
        })
    }
}

/// Variant payload of an event, tagged by event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tipo")]
enum EventKindDocument {
    #[serde(rename = "CREACION")]
    Creation,
    #[serde(rename = "ASIGNACION")]
    Assignment { technician: UserRef },
    #[serde(rename = "DERIVACION")]
    Derivation {
        origin: UserRef,
        destination: UserRef,
        reason: String,
    },
    #[serde(rename = "RESOLUCION")]
    Resolution,
    #[serde(rename = "REAPERTURA")]
    Reopening { reason: String },
    #[serde(rename = "COMENTARIO")]
    Comment { comment: CommentDocument },
}

/// A stored event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDocument {
    id: Option<EventId>,
    title: String,
    description: String,
    responsible: UserRef,
    ticket: Option<TicketId>,
    occurred_at: DateTime<Utc>,
    #[serde(flatten)]
    kind: EventKindDocument,
}

impl From<Event> for EventDocument {
    fn from(event: Event) -> Self {
        let kind = match event.kind {
            EventKind::Creation => EventKindDocument::Creation,
            EventKind::Assignment { technician } => EventKindDocument::Assignment { technician },
            EventKind::Derivation {
                origin,
                destination,
                reason,
            } => EventKindDocument::Derivation {
                origin,
                destination,
                reason,
            },
            EventKind::Resolution => EventKindDocument::Resolution,
            EventKind::Reopening { reason } => EventKindDocument::Reopening { reason },
            EventKind::Comment { comment } => EventKindDocument::Comment {
                comment: comment.into(),
            },
        };
        Self {
            id: event.id,
            title: event.title,
            description: event.description,
            responsible: event.responsible,
            ticket: event.ticket,
            occurred_at: event.occurred_at,
            kind,
        }
    }
}

impl TryFrom<EventDocument> for Event {
    type Error = domain::Error;

    fn try_from(document: EventDocument) -> Result<Self, Self::Error> {
        let kind = match document.kind {
            EventKindDocument::Creation => EventKind::Creation,
            EventKindDocument::Assignment { technician } => EventKind::Assignment { technician },
            EventKindDocument::Derivation {
                origin,
                destination,
                reason,
            } => EventKind::Derivation {
                origin,
                destination,
                reason,
            },
            EventKindDocument::Resolution => EventKind::Resolution,
            EventKindDocument::Reopening { reason } => EventKind::Reopening { reason },
            EventKindDocument::Comment { comment } => EventKind::Comment {
                comment: comment.try_into()?,
            },
        };
        Ok(Self {
            id: document.id,
            title: document.title,
            description: document.description,
            responsible: document.responsible,
            ticket: document.ticket,
            occurred_at: document.occurred_at,
            kind,
        })
    }
}

/// A stored notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationDocument {
    id: Option<NotificationId>,
    event: EventDocument,
    supervisor: UserId,
    generated_at: DateTime<Utc>,
    read: bool,
    read_at: Option<DateTime<Utc>>,
}

impl From<Notification> for NotificationDocument {
    fn from(notification: Notification) -> Self {
        Self {
            id: notification.id,
            event: notification.event.into(),
            supervisor: notification.supervisor,
            generated_at: notification.generated_at,
            read: notification.read,
            read_at: notification.read_at,
        }
    }
}

impl TryFrom<NotificationDocument> for Notification {
    type Error = domain::Error;

    fn try_from(document: NotificationDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: document.id,
            event: document.event.try_into()?,
            supervisor: document.supervisor,
            generated_at: document.generated_at,
            read: document.read,
            read_at: document.read_at,
        })
    }
}
