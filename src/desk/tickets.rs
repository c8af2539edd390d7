use chrono::Utc;
use tracing::instrument;

use crate::{
    desk::{Error, HelpDesk, Result},
    domain::{
        Comment, Event, EventArgs, EventFactory, EventType, State, Ticket, TicketId, TicketKind,
        UserId, UserKind, ordering,
    },
    storage::{Page, Paged, Store, TicketFilter},
};

/// A ticket to be filed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    /// Short summary.
    pub title: String,
    /// Full description.
    pub description: String,
    /// Incident or service request, with its subtype fields.
    pub kind: TicketKind,
}

impl<S: Store> HelpDesk<'_, S> {
    /// Files a ticket on behalf of a requester.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] unless `requester` is a registered requester
    /// - [`domain::Error::Validation`](crate::domain::Error::Validation) if
    ///   the title or description is too short
    #[instrument(skip(self, ticket), fields(title = %ticket.title))]
    pub fn create_ticket(&self, requester: UserId, ticket: NewTicket) -> Result<Ticket> {
        let requester = self.require_kind(requester, UserKind::Requester)?;
        let mut ticket = Ticket::new(
            None,
            ticket.title,
            ticket.description,
            &requester,
            ticket.kind,
        )?;
        let event =
            EventFactory::create(EventType::Creation, &ticket, &requester, EventArgs::new())?;
        ticket.add_event(event);
        self.commit(ticket, 1)
    }

    /// Looks a ticket up on behalf of `viewer`.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the ticket or the viewer is missing
    /// - [`Error::Unauthorized`] if the viewer may not see the ticket
    pub fn ticket(&self, id: TicketId, viewer: UserId) -> Result<Ticket> {
        let viewer = self.require_user(viewer)?;
        let ticket = self.require_ticket(id)?;
        if !viewer.can_view(&ticket) {
            return Err(Error::unauthorized(format!(
                "{} may not view ticket {id}",
                viewer.name()
            )));
        }
        Ok(ticket)
    }

    /// Lists tickets visible to `viewer`, newest first.
    ///
    /// Requesters only ever see their own tickets and technicians only the
    /// tickets assigned to them, whatever the filter says.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the viewer is missing.
    pub fn list_tickets(
        &self,
        viewer: UserId,
        mut filter: TicketFilter,
        page: usize,
        size: Option<usize>,
    ) -> Result<Paged<Ticket>> {
        let viewer = self.require_user(viewer)?;
        match viewer.kind() {
            UserKind::Requester => filter.requester = viewer.id(),
            UserKind::Technician => filter.technician = viewer.id(),
            UserKind::Operator | UserKind::Supervisor => {}
        }
        Ok(self.store.list_tickets(&filter, self.page(page, size))?)
    }

    /// The work queue: tickets in `state` (or every unresolved ticket),
    /// highest priority first.
    ///
    /// `limit` defaults to the configured queue length.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn prioritized(&self, state: Option<State>, limit: Option<usize>) -> Result<Vec<Ticket>> {
        let filter = TicketFilter {
            state,
            unresolved: state.is_none(),
            ..TicketFilter::default()
        };
        let mut tickets = self.store.list_tickets(&filter, Page::all())?.items;
        tickets.sort_by(ordering::by_priority(Utc::now()));
        tickets.truncate(limit.unwrap_or(self.config.priority_queue_limit));
        Ok(tickets)
    }

    /// Resolves a ticket, optionally leaving a closing comment first.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the ticket or technician is missing
    /// - [`Error::Unauthorized`] unless the technician is the assignee
    /// - [`domain::Error::InvalidState`](crate::domain::Error::InvalidState)
    ///   if the ticket is already resolved
    #[instrument(skip(self, comment))]
    pub fn resolve(
        &self,
        id: TicketId,
        technician: UserId,
        comment: Option<&str>,
    ) -> Result<Ticket> {
        let technician = self.require_kind(technician, UserKind::Technician)?;
        let mut ticket = self.require_ticket(id)?;
        if !technician.can_resolve(&ticket) {
            return Err(Error::unauthorized(format!(
                "{} is not assigned to ticket {id}",
                technician.name()
            )));
        }

        let mut new_events = 0;
        if let Some(text) = comment {
            let comment = Comment::new(None, text, &technician, &ticket)?;
            ticket.add_comment(comment.clone())?;
            let event = EventFactory::create(
                EventType::Comment,
                &ticket,
                &technician,
                EventArgs::new().comment(comment),
            )?;
            ticket.add_event(event);
            new_events += 1;
        }

        ticket.resolve(&technician)?;
        let event =
            EventFactory::create(EventType::Resolution, &ticket, &technician, EventArgs::new())?;
        ticket.add_event(event);
        self.commit(ticket, new_events + 1)
    }

    /// Reopens a resolved ticket.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the ticket or user is missing
    /// - [`Error::Unauthorized`] if the user may not view the ticket
    /// - [`domain::Error::InvalidState`](crate::domain::Error::InvalidState)
    ///   unless the ticket is resolved
    /// - [`domain::Error::Validation`](crate::domain::Error::Validation) if
    ///   the reason is too short
    #[instrument(skip(self))]
    pub fn reopen(&self, id: TicketId, user: UserId, reason: &str) -> Result<Ticket> {
        let user = self.require_user(user)?;
        let mut ticket = self.require_ticket(id)?;
        if !user.can_view(&ticket) {
            return Err(Error::unauthorized(format!(
                "{} may not reopen ticket {id}",
                user.name()
            )));
        }

        ticket.reopen(&user, reason)?;
        let event = EventFactory::create(
            EventType::Reopening,
            &ticket,
            &user,
            EventArgs::new().reason(reason),
        )?;
        ticket.add_event(event);
        self.commit(ticket, 1)
    }

    /// A ticket's audit trail in time order, on behalf of `viewer`.
    ///
    /// # Errors
    ///
    /// See [`HelpDesk::ticket`].
    pub fn history(&self, id: TicketId, viewer: UserId) -> Result<Vec<Event>> {
        let ticket = self.ticket(id, viewer)?;
        Ok(ticket.history().into_iter().cloned().collect())
    }
}
