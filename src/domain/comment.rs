//! Comments left on tickets.

use chrono::{DateTime, Utc};

use crate::domain::{CommentId, Error, Ticket, TicketId, User, UserRef};

/// Minimum length of a comment, in characters, after trimming.
pub const MIN_COMMENT_LEN: usize = 5;

/// A comment left on a ticket. The text cannot change after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub(crate) id: Option<CommentId>,
    pub(crate) text: String,
    pub(crate) author: UserRef,
    pub(crate) ticket: Option<TicketId>,
    pub(crate) created_at: DateTime<Utc>,
}

impl Comment {
    /// Creates a comment by `author` on `ticket`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the trimmed text is shorter than
    /// [`MIN_COMMENT_LEN`] characters.
    pub fn new(
        id: Option<CommentId>,
        text: impl Into<String>,
        author: &User,
        ticket: &Ticket,
    ) -> Result<Self, Error> {
        let text = text.into();
        validate_text(&text)?;
        Ok(Self {
            id,
            text,
            author: author.to_ref(),
            ticket: ticket.id(),
            created_at: Utc::now(),
        })
    }

    /// The persisted id, if saved.
    #[must_use]
    pub const fn id(&self) -> Option<CommentId> {
        self.id
    }

    /// The comment text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Who wrote it.
    #[must_use]
    pub const fn author(&self) -> &UserRef {
        &self.author
    }

    /// The owning ticket's id.
    #[must_use]
    pub const fn ticket(&self) -> Option<TicketId> {
        self.ticket
    }

    /// When it was written.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

pub(crate) fn validate_text(text: &str) -> Result<(), Error> {
    if text.trim().chars().count() < MIN_COMMENT_LEN {
        return Err(Error::validation(format!(
            "a comment must be at least {MIN_COMMENT_LEN} characters long"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::domain::{RequestCategory, user::tests::requester};

    fn ticket(author: &User) -> Ticket {
        Ticket::service_request(
            Some(7),
            "Cancel TV",
            "Please cancel my television service",
            author,
            RequestCategory::Cancellation,
        )
        .unwrap()
    }

    #[test_case("hi"; "too short")]
    #[test_case("   ok    "; "short once trimmed")]
    fn rejects_short_text(text: &str) {
        let author = requester(1);
        assert!(matches!(
            Comment::new(None, text, &author, &ticket(&author)),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn records_author_and_ticket() {
        let author = requester(1);
        let comment = Comment::new(None, "When will this be done?", &author, &ticket(&author)).unwrap();
        assert_eq!(comment.ticket(), Some(7));
        assert_eq!(comment.author().id, Some(1));
        assert_eq!(comment.text(), "When will this be done?");
        assert!(comment.id().is_none());
    }
}
