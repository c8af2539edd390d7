//! Building audit events from their type.
//!
//! [`EventFactory::create`] checks that the arguments a given
//! [`EventType`] needs are present before constructing the [`Event`].

use chrono::{DateTime, Utc};

use crate::domain::{Comment, Error, Event, EventType, Ticket, User};

/// Contextual arguments for [`EventFactory::create`].
///
/// Which fields are required depends on the event type:
///
/// | type          | required                          |
/// |---------------|-----------------------------------|
/// | `Creation`    | -                                 |
/// | `Assignment`  | `technician`                      |
/// | `Derivation`  | `origin`, `destination`, `reason` |
/// | `Resolution`  | -                                 |
/// | `Reopening`   | `reason`                          |
/// | `Comment`     | `comment`                         |
///
/// Fields that a type does not use are ignored.
#[derive(Debug, Default, Clone)]
pub struct EventArgs<'a> {
    technician: Option<&'a User>,
    origin: Option<&'a User>,
    destination: Option<&'a User>,
    reason: Option<String>,
    comment: Option<Comment>,
    at: Option<DateTime<Utc>>,
}

impl<'a> EventArgs<'a> {
    /// No arguments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the assigned technician.
    #[must_use]
    pub const fn technician(mut self, technician: &'a User) -> Self {
        self.technician = Some(technician);
        self
    }

    /// Sets the derivation origin.
    #[must_use]
    pub const fn origin(mut self, origin: &'a User) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Sets the derivation destination.
    #[must_use]
    pub const fn destination(mut self, destination: &'a User) -> Self {
        self.destination = Some(destination);
        self
    }

    /// Sets the reason for a derivation or reopening.
    #[must_use]
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn comment(mut self, comment: Comment) -> Self {
        self.comment = Some(comment);
        self
    }

    /// Overrides the event timestamp.
    #[must_use]
    pub const fn at(mut self, at: DateTime<Utc>) -> Self {
        self.at = Some(at);
        self
    }
}

/// Builds [`Event`]s from a type tag.
///
/// Events are always built without an id; the store allocates one when the
/// owning ticket is saved.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventFactory;

impl EventFactory {
    /// Builds an event of the given type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if a field required by
    /// `event_type` is missing from `args`.
    pub fn create(
        event_type: EventType,
        ticket: &Ticket,
        responsible: &User,
        args: EventArgs<'_>,
    ) -> Result<Event, Error> {
        let EventArgs {
            technician,
            origin,
            destination,
            reason,
            comment,
            at,
        } = args;

        let event = match event_type {
            EventType::Creation => Event::creation(responsible, ticket, at),
            EventType::Assignment => {
                let technician = required(technician, event_type, "technician")?;
                Event::assignment(responsible, ticket, technician, at)
            }
            EventType::Derivation => {
                let origin = required(origin, event_type, "origin")?;
                let destination = required(destination, event_type, "destination")?;
                let reason = required(reason, event_type, "reason")?;
                Event::derivation(responsible, ticket, origin, destination, reason, at)
            }
            EventType::Resolution => Event::resolution(responsible, ticket, at),
            EventType::Reopening => {
                let reason = required(reason, event_type, "reason")?;
                Event::reopening(responsible, ticket, reason, at)
            }
            EventType::Comment => {
                let comment = required(comment, event_type, "comment")?;
                Event::comment(responsible, ticket, comment, at)
            }
        };
        Ok(event)
    }

    /// Like [`EventFactory::create`], but takes the type as its wire tag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the tag is unknown or a required
    /// field is missing.
    pub fn create_from_tag(
        tag: &str,
        ticket: &Ticket,
        responsible: &User,
        args: EventArgs<'_>,
    ) -> Result<Event, Error> {
        Self::create(tag.parse()?, ticket, responsible, args)
    }
}

fn required<T>(value: Option<T>, event_type: EventType, field: &str) -> Result<T, Error> {
    value.ok_or_else(|| {
        Error::InvalidArgument(format!("a {event_type} event requires a {field}"))
    })
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::domain::{
        EventKind, RequestCategory,
        user::tests::{operator, requester, technician},
    };

    fn ticket() -> Ticket {
        Ticket::service_request(
            Some(11),
            "Add broadband",
            "I want to subscribe to broadband internet",
            &requester(1),
            RequestCategory::Activation,
        )
        .unwrap()
    }

    #[test_case(EventType::Creation)]
    #[test_case(EventType::Resolution)]
    fn types_without_extras(event_type: EventType) {
        let event =
            EventFactory::create(event_type, &ticket(), &operator(2), EventArgs::new()).unwrap();
        assert_eq!(event.event_type(), event_type);
        assert!(event.id().is_none());
    }

    #[test_case(EventType::Assignment; "assignment needs a technician")]
    #[test_case(EventType::Derivation; "derivation needs origin and destination")]
    #[test_case(EventType::Reopening; "reopening needs a reason")]
    #[test_case(EventType::Comment; "comment needs a comment")]
    fn missing_extras_are_rejected(event_type: EventType) {
        assert!(matches!(
            EventFactory::create(event_type, &ticket(), &operator(2), EventArgs::new()),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn derivation_requires_every_field() {
        let origin = technician(4);
        let destination = technician(5);
        let partial = EventArgs::new().origin(&origin).destination(&destination);
        assert!(
            EventFactory::create(EventType::Derivation, &ticket(), &origin, partial).is_err()
        );

        let full = EventArgs::new()
            .origin(&origin)
            .destination(&destination)
            .reason("needs a field visit");
        let event = EventFactory::create(EventType::Derivation, &ticket(), &origin, full).unwrap();
        assert!(matches!(event.kind(), EventKind::Derivation { .. }));
    }

    #[test]
    fn comment_event_embeds_the_comment() {
        let author = requester(1);
        let ticket = ticket();
        let comment = Comment::new(None, "any update please?", &author, &ticket).unwrap();
        let event = EventFactory::create(
            EventType::Comment,
            &ticket,
            &author,
            EventArgs::new().comment(comment.clone()),
        )
        .unwrap();
        assert_eq!(event.kind(), &EventKind::Comment { comment });
    }

    #[test]
    fn tags_are_parsed() {
        let tech = technician(4);
        let event = EventFactory::create_from_tag(
            "ASIGNACION",
            &ticket(),
            &operator(2),
            EventArgs::new().technician(&tech),
        )
        .unwrap();
        assert_eq!(event.event_type(), EventType::Assignment);

        assert!(matches!(
            EventFactory::create_from_tag("ESCALADO", &ticket(), &operator(2), EventArgs::new()),
            Err(Error::InvalidArgument(_))
        ));
    }
}
