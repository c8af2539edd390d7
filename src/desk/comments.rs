use tracing::instrument;

use crate::{
    desk::{Error, HelpDesk, Result},
    domain::{Comment, EventArgs, EventFactory, EventType, TicketId, UserId},
    storage::Store,
};

impl<S: Store> HelpDesk<'_, S> {
    /// Comments on a ticket and returns the saved comment.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the ticket or author is missing
    /// - [`Error::Unauthorized`] if the author may not comment on the ticket
    /// - [`domain::Error::InvalidState`](crate::domain::Error::InvalidState)
    ///   if the ticket is resolved
    /// - [`domain::Error::Validation`](crate::domain::Error::Validation) if
    ///   the text is too short
    #[instrument(skip(self, text))]
    pub fn add_comment(&self, id: TicketId, author: UserId, text: &str) -> Result<Comment> {
        let author = self.require_user(author)?;
        let mut ticket = self.require_ticket(id)?;
        if !author.can_comment(&ticket) {
            return Err(Error::unauthorized(format!(
                "{} may not comment on ticket {id}",
                author.name()
            )));
        }

        let comment = Comment::new(None, text, &author, &ticket)?;
        ticket.add_comment(comment.clone())?;
        let event = EventFactory::create(
            EventType::Comment,
            &ticket,
            &author,
            EventArgs::new().comment(comment),
        )?;
        ticket.add_event(event);

        let saved = self.commit(ticket, 1)?;
        saved
            .comments()
            .last()
            .cloned()
            .ok_or_else(|| Error::not_found("comment on ticket", id))
    }

    /// A ticket's comments, oldest first.
    ///
    /// # Errors
    ///
    /// See [`HelpDesk::ticket`].
    pub fn comments(&self, id: TicketId, viewer: UserId) -> Result<Vec<Comment>> {
        let mut comments = self.ticket(id, viewer)?.comments().to_vec();
        comments.sort_by_key(Comment::created_at);
        Ok(comments)
    }
}
