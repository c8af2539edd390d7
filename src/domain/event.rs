//! The audit trail.
//!
//! Every state-changing action on a ticket is recorded as an [`Event`]. The
//! common fields (title, description, responsible actor, timestamp) live on
//! the struct; the variant-specific payload lives in [`EventKind`].

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Comment, Error, EventId, Ticket, TicketId, User, UserRef};

/// Discriminant of [`EventKind`]. This is the tag the
/// [`EventFactory`](crate::domain::EventFactory) dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// The ticket was created.
    #[serde(rename = "CREACION")]
    Creation,
    /// A technician was assigned or reassigned.
    #[serde(rename = "ASIGNACION")]
    Assignment,
    /// The ticket was handed to another technician.
    #[serde(rename = "DERIVACION")]
    Derivation,
    /// The ticket was resolved.
    #[serde(rename = "RESOLUCION")]
    Resolution,
    /// The ticket was reopened.
    #[serde(rename = "REAPERTURA")]
    Reopening,
    /// A comment was added.
    #[serde(rename = "COMENTARIO")]
    Comment,
}

impl EventType {
    /// Every event type.
    pub const ALL: [Self; 6] = [
        Self::Creation,
        Self::Assignment,
        Self::Derivation,
        Self::Resolution,
        Self::Reopening,
        Self::Comment,
    ];

    /// The wire spelling of the tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Creation => "CREACION",
            Self::Assignment => "ASIGNACION",
            Self::Derivation => "DERIVACION",
            Self::Resolution => "RESOLUCION",
            Self::Reopening => "REAPERTURA",
            Self::Comment => "COMENTARIO",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidArgument(format!("unknown event type '{s}'")))
    }
}

/// Variant-specific payload of an [`Event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// See [`EventType::Creation`].
    Creation,
    /// See [`EventType::Assignment`].
    Assignment {
        /// The technician now assigned.
        technician: UserRef,
    },
    /// See [`EventType::Derivation`].
    Derivation {
        /// The technician handing off.
        origin: UserRef,
        /// The technician receiving the ticket.
        destination: UserRef,
        /// Why the ticket was derived.
        reason: String,
    },
    /// See [`EventType::Resolution`].
    Resolution,
    /// See [`EventType::Reopening`].
    Reopening {
        /// Why the ticket was reopened.
        reason: String,
    },
    /// See [`EventType::Comment`].
    Comment {
        /// The comment that was added.
        comment: Comment,
    },
}

impl EventKind {
    /// The discriminant.
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::Creation => EventType::Creation,
            Self::Assignment { .. } => EventType::Assignment,
            Self::Derivation { .. } => EventType::Derivation,
            Self::Resolution => EventType::Resolution,
            Self::Reopening { .. } => EventType::Reopening,
            Self::Comment { .. } => EventType::Comment,
        }
    }
}

/// An immutable record of an action taken on a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub(crate) id: Option<EventId>,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) responsible: UserRef,
    pub(crate) ticket: Option<TicketId>,
    pub(crate) occurred_at: DateTime<Utc>,
    pub(crate) kind: EventKind,
}

impl Event {
    fn build(
        responsible: &User,
        ticket: &Ticket,
        at: Option<DateTime<Utc>>,
        title: &str,
        description: String,
        kind: EventKind,
    ) -> Self {
        Self {
            id: None,
            title: title.to_string(),
            description,
            responsible: responsible.to_ref(),
            ticket: ticket.id(),
            occurred_at: at.unwrap_or_else(Utc::now),
            kind,
        }
    }

    /// Records the creation of `ticket`.
    #[must_use]
    pub fn creation(responsible: &User, ticket: &Ticket, at: Option<DateTime<Utc>>) -> Self {
        Self::build(
            responsible,
            ticket,
            at,
            "Ticket created",
            format!("Created by {}", responsible.name()),
            EventKind::Creation,
        )
    }

    /// Records the assignment of `technician` to `ticket`.
    #[must_use]
    pub fn assignment(
        responsible: &User,
        ticket: &Ticket,
        technician: &User,
        at: Option<DateTime<Utc>>,
    ) -> Self {
        Self::build(
            responsible,
            ticket,
            at,
            "Technician assigned",
            format!(
                "Assigned to {} by {}",
                technician.name(),
                responsible.name()
            ),
            EventKind::Assignment {
                technician: technician.to_ref(),
            },
        )
    }

    /// Records a derivation from `origin` to `destination`.
    #[must_use]
    pub fn derivation(
        responsible: &User,
        ticket: &Ticket,
        origin: &User,
        destination: &User,
        reason: impl Into<String>,
        at: Option<DateTime<Utc>>,
    ) -> Self {
        Self::build(
            responsible,
            ticket,
            at,
            "Ticket derived",
            format!("Derived from {} to {}", origin.name(), destination.name()),
            EventKind::Derivation {
                origin: origin.to_ref(),
                destination: destination.to_ref(),
                reason: reason.into(),
            },
        )
    }

    /// Records the resolution of `ticket`.
    #[must_use]
    pub fn resolution(responsible: &User, ticket: &Ticket, at: Option<DateTime<Utc>>) -> Self {
        Self::build(
            responsible,
            ticket,
            at,
            "Ticket resolved",
            format!("Resolved by {}", responsible.name()),
            EventKind::Resolution,
        )
    }

    /// Records the reopening of `ticket`.
    #[must_use]
    pub fn reopening(
        responsible: &User,
        ticket: &Ticket,
        reason: impl Into<String>,
        at: Option<DateTime<Utc>>,
    ) -> Self {
        let reason = reason.into();
        Self::build(
            responsible,
            ticket,
            at,
            "Ticket reopened",
            format!("Reopened by {}: {reason}", responsible.name()),
            EventKind::Reopening { reason },
        )
    }

    /// Records a new comment on `ticket`.
    #[must_use]
    pub fn comment(
        responsible: &User,
        ticket: &Ticket,
        comment: Comment,
        at: Option<DateTime<Utc>>,
    ) -> Self {
        Self::build(
            responsible,
            ticket,
            at,
            "Comment added",
            format!("{} commented", responsible.name()),
            EventKind::Comment { comment },
        )
    }

    /// The persisted id, if saved.
    #[must_use]
    pub const fn id(&self) -> Option<EventId> {
        self.id
    }

    /// A short fixed title for the event's variant.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// A one-line summary fixed at construction.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The actor who performed the action.
    #[must_use]
    pub const fn responsible(&self) -> &UserRef {
        &self.responsible
    }

    /// The owning ticket's id.
    #[must_use]
    pub const fn ticket(&self) -> Option<TicketId> {
        self.ticket
    }

    /// When the action happened.
    #[must_use]
    pub const fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    /// The variant payload.
    #[must_use]
    pub const fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// The variant tag.
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        self.kind.event_type()
    }

    /// A full sentence naming the actor, the ticket and the variant details.
    #[must_use]
    pub fn detailed_description(&self) -> String {
        let actor = &self.responsible.name;
        let ticket = TicketLabel(self.ticket);
        match &self.kind {
            EventKind::Creation => format!("{actor} created ticket {ticket}"),
            EventKind::Assignment { technician } => {
                format!("{actor} assigned ticket {ticket} to {}", technician.name)
            }
            EventKind::Derivation {
                origin,
                destination,
                reason,
            } => format!(
                "{actor} derived ticket {ticket} from {} to {}: {reason}",
                origin.name, destination.name
            ),
            EventKind::Resolution => format!("{actor} resolved ticket {ticket}"),
            EventKind::Reopening { reason } => {
                format!("{actor} reopened ticket {ticket}: {reason}")
            }
            EventKind::Comment { comment } => {
                format!("{actor} commented on ticket {ticket}: {}", comment.text())
            }
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.occurred_at.format("%Y-%m-%d %H:%M"),
            self.title,
            self.description
        )
    }
}

struct TicketLabel(Option<TicketId>);

impl fmt::Display for TicketLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(id) => write!(f, "#{id}"),
            None => f.write_str("(unsaved)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::domain::{
        IncidentCategory, Urgency,
        user::tests::{operator, requester, technician},
    };

    fn ticket() -> Ticket {
        Ticket::incident(
            Some(3),
            "SIM blocked",
            "My SIM card shows PUK required",
            &requester(1),
            Urgency::Important,
            IncidentCategory::SimBlocked,
        )
        .unwrap()
    }

    #[test]
    fn assignment_describes_both_parties() {
        let op = operator(2);
        let tech = technician(4);
        let event = Event::assignment(&op, &ticket(), &tech, None);

        assert_eq!(event.event_type(), EventType::Assignment);
        assert_eq!(event.title(), "Technician assigned");
        assert_eq!(event.description(), "Assigned to Tomas Tech 4 by Oscar Operator");
        assert_eq!(
            event.detailed_description(),
            "Oscar Operator assigned ticket #3 to Tomas Tech 4"
        );
        assert_eq!(event.ticket(), Some(3));
        assert!(event.id().is_none());
    }

    #[test]
    fn derivation_carries_reason() {
        let origin = technician(4);
        let destination = technician(5);
        let event = Event::derivation(&origin, &ticket(), &origin, &destination, "radio link", None);

        let EventKind::Derivation { reason, .. } = event.kind() else {
            panic!("expected a derivation");
        };
        assert_eq!(reason, "radio link");
        assert_eq!(event.description(), "Derived from Tomas Tech 4 to Tomas Tech 5");
    }

    #[test]
    fn explicit_timestamp_is_kept() {
        let at = Utc::now() - chrono::Duration::days(1);
        let event = Event::resolution(&technician(4), &ticket(), Some(at));
        assert_eq!(event.occurred_at(), at);
    }

    #[test]
    fn unsaved_ticket_label() {
        let mut ticket = ticket();
        ticket.id = None;
        let event = Event::creation(&requester(1), &ticket, None);
        assert_eq!(
            event.detailed_description(),
            "Rita Requester created ticket (unsaved)"
        );
    }

    #[test_case("CREACION", EventType::Creation)]
    #[test_case("asignacion", EventType::Assignment)]
    #[test_case("Reapertura", EventType::Reopening)]
    fn parses_tags(tag: &str, expected: EventType) {
        assert_eq!(tag.parse::<EventType>().unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_tag() {
        assert!(matches!(
            "CLOSURE".parse::<EventType>(),
            Err(Error::InvalidArgument(_))
        ));
    }
}
