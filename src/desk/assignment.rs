use tracing::instrument;

use crate::{
    desk::{Error, HelpDesk, Result},
    domain::{
        Comment, EventArgs, EventFactory, EventType, Ticket, TicketId, User, UserId, UserKind,
    },
    storage::Store,
};

impl<S: Store> HelpDesk<'_, S> {
    /// Assigns a technician to a new or assigned ticket, optionally leaving
    /// a comment from the operator.
    ///
    /// The comment is attached before the assignment and is covered by the
    /// assignment event rather than an event of its own.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the ticket, technician or operator is missing
    /// - [`Error::Unauthorized`] if `operator` may not assign
    /// - [`domain::Error::InvalidState`](crate::domain::Error::InvalidState)
    ///   if the ticket is past assignment
    #[instrument(skip(self, comment))]
    pub fn assign(
        &self,
        id: TicketId,
        technician: UserId,
        operator: UserId,
        comment: Option<&str>,
    ) -> Result<Ticket> {
        let operator = self.require_assigner(operator)?;
        let technician = self.require_kind(technician, UserKind::Technician)?;
        let mut ticket = self.require_ticket(id)?;

        if let Some(text) = comment {
            let comment = Comment::new(None, text, &operator, &ticket)?;
            ticket.add_comment(comment)?;
        }
        ticket.assign_technician(&technician, &operator)?;
        let event = EventFactory::create(
            EventType::Assignment,
            &ticket,
            &operator,
            EventArgs::new().technician(&technician),
        )?;
        ticket.add_event(event);
        self.commit(ticket, 1)
    }

    /// Moves an assigned ticket to a different technician.
    ///
    /// The change is recorded as an assignment event; the reason is only
    /// logged.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the ticket, technician or operator is missing
    /// - [`Error::Unauthorized`] if `operator` may not reassign
    /// - [`domain::Error::InvalidState`](crate::domain::Error::InvalidState)
    ///   if nobody is assigned yet
    /// - [`domain::Error::Validation`](crate::domain::Error::Validation) if
    ///   the technician is already the assignee
    #[instrument(skip(self))]
    pub fn reassign(
        &self,
        id: TicketId,
        technician: UserId,
        operator: UserId,
        reason: &str,
    ) -> Result<Ticket> {
        let operator = self.require_user(operator)?;
        if !operator.can_reassign() {
            return Err(Error::unauthorized(format!(
                "{} may not reassign technicians",
                operator.name()
            )));
        }
        let technician = self.require_kind(technician, UserKind::Technician)?;
        let mut ticket = self.require_ticket(id)?;
        let previous = ticket.assigned_technician().map(|user| user.name.clone());

        ticket.reassign_technician(&technician, &operator)?;
        tracing::info!(ticket = id, ?previous, reason, "reassigning");
        let event = EventFactory::create(
            EventType::Assignment,
            &ticket,
            &operator,
            EventArgs::new().technician(&technician),
        )?;
        ticket.add_event(event);
        self.commit(ticket, 1)
    }

    /// Hands a ticket from its assigned technician to another one for
    /// consultation, moving it in progress.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the ticket or either technician is missing
    /// - [`Error::Unauthorized`] unless `origin` is the assignee
    /// - [`domain::Error::Validation`](crate::domain::Error::Validation) if
    ///   `destination` is `origin`
    #[instrument(skip(self))]
    pub fn derive(
        &self,
        id: TicketId,
        origin: UserId,
        destination: UserId,
        reason: &str,
    ) -> Result<Ticket> {
        let origin = self.require_kind(origin, UserKind::Technician)?;
        let destination = self.require_kind(destination, UserKind::Technician)?;
        let mut ticket = self.require_ticket(id)?;
        if !origin.can_derive(&ticket) {
            return Err(Error::unauthorized(format!(
                "{} is not assigned to ticket {id}",
                origin.name()
            )));
        }

        ticket.derive_to_technician(&destination, &origin, reason)?;
        let event = EventFactory::create(
            EventType::Derivation,
            &ticket,
            &origin,
            EventArgs::new()
                .origin(&origin)
                .destination(&destination)
                .reason(reason),
        )?;
        ticket.add_event(event);
        self.commit(ticket, 1)
    }

    fn require_assigner(&self, id: UserId) -> Result<User> {
        let user = self.require_user(id)?;
        if user.can_assign() {
            Ok(user)
        } else {
            Err(Error::unauthorized(format!(
                "{} may not assign technicians",
                user.name()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        desk::tests::{incident, seeded},
        domain::{self, Event, EventKind, State, Urgency},
        storage::MemoryStore,
    };

    #[test]
    fn assignment_with_comment() {
        let store = MemoryStore::new();
        let (desk, cast) = seeded(&store);
        let id = incident(&desk, cast.requester, Urgency::Important).id().unwrap();

        let ticket = desk
            .assign(id, cast.technician, cast.operator, Some("Fibre outage in the area"))
            .unwrap();
        assert_eq!(ticket.state(), State::Assigned);
        assert_eq!(
            ticket.assigned_technician().and_then(|t| t.id),
            Some(cast.technician)
        );
        assert_eq!(ticket.comments().len(), 1);
        assert_eq!(ticket.comments()[0].author().id, Some(cast.operator));
        // the assignment event covers the operator's note
        let types: Vec<_> = ticket.events().iter().map(Event::event_type).collect();
        assert_eq!(types, vec![EventType::Creation, EventType::Assignment]);
        assert!(ticket.comments()[0].created_at() <= ticket.events()[1].occurred_at());
    }

    #[test]
    fn only_operators_assign() {
        let store = MemoryStore::new();
        let (desk, cast) = seeded(&store);
        let id = incident(&desk, cast.requester, Urgency::Minor).id().unwrap();

        assert!(matches!(
            desk.assign(id, cast.technician, cast.supervisor, None),
            Err(Error::Unauthorized(_))
        ));
        assert!(matches!(
            desk.assign(id, cast.operator, cast.operator, None),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn reassignment() {
        let store = MemoryStore::new();
        let (desk, cast) = seeded(&store);
        let id = incident(&desk, cast.requester, Urgency::Minor).id().unwrap();

        assert!(matches!(
            desk.reassign(id, cast.technician, cast.operator, "workload"),
            Err(Error::Domain(domain::Error::InvalidState(_)))
        ));

        desk.assign(id, cast.technician, cast.operator, None).unwrap();
        assert!(matches!(
            desk.reassign(id, cast.other_technician, cast.technician, "workload"),
            Err(Error::Unauthorized(_))
        ));
        assert!(matches!(
            desk.reassign(id, cast.technician, cast.operator, "workload"),
            Err(Error::Domain(domain::Error::Validation(_)))
        ));

        let ticket = desk
            .reassign(id, cast.other_technician, cast.operator, "workload")
            .unwrap();
        assert_eq!(
            ticket.assigned_technician().and_then(|t| t.id),
            Some(cast.other_technician)
        );
        assert_eq!(
            ticket.events().last().map(Event::event_type),
            Some(EventType::Assignment)
        );
    }

    #[test]
    fn derivation_keeps_the_assignee() {
        let store = MemoryStore::new();
        let (desk, cast) = seeded(&store);
        let id = incident(&desk, cast.requester, Urgency::Critical).id().unwrap();
        desk.assign(id, cast.technician, cast.operator, None).unwrap();

        assert!(matches!(
            desk.derive(id, cast.other_technician, cast.technician, "second opinion"),
            Err(Error::Unauthorized(_))
        ));
        assert!(matches!(
            desk.derive(id, cast.technician, cast.technician, "second opinion"),
            Err(Error::Domain(domain::Error::Validation(_)))
        ));

        let ticket = desk
            .derive(id, cast.technician, cast.other_technician, "needs a fibre splice")
            .unwrap();
        assert_eq!(ticket.state(), State::InProgress);
        assert_eq!(
            ticket.assigned_technician().and_then(|t| t.id),
            Some(cast.technician)
        );
        let Some(EventKind::Derivation { destination, reason, .. }) =
            ticket.events().last().map(Event::kind)
        else {
            panic!("expected a derivation event");
        };
        assert_eq!(destination.id, Some(cast.other_technician));
        assert_eq!(reason, "needs a fibre splice");
    }
}
