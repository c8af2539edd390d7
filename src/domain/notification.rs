//! Notifications addressed to supervisors.

use chrono::{DateTime, Utc};

use crate::domain::{Error, Event, NotificationId, User, UserId, UserKind};

/// Alerts a supervisor about an event performed by one of their supervisees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub(crate) id: Option<NotificationId>,
    pub(crate) event: Event,
    pub(crate) supervisor: UserId,
    pub(crate) generated_at: DateTime<Utc>,
    pub(crate) read: bool,
    pub(crate) read_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// Creates an unread notification of `event` for `supervisor`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `supervisor` is unsaved or is not a
    /// supervisor.
    pub fn new(
        id: Option<NotificationId>,
        event: Event,
        supervisor: &User,
    ) -> Result<Self, Error> {
        if supervisor.kind() != UserKind::Supervisor {
            return Err(Error::validation(format!(
                "notifications target supervisors, not {}",
                supervisor.kind()
            )));
        }
        let Some(supervisor) = supervisor.id() else {
            return Err(Error::validation("cannot notify an unsaved supervisor"));
        };
        Ok(Self {
            id,
            event,
            supervisor,
            generated_at: Utc::now(),
            read: false,
            read_at: None,
        })
    }

    /// The persisted id, if saved.
    #[must_use]
    pub const fn id(&self) -> Option<NotificationId> {
        self.id
    }

    /// The event being reported.
    #[must_use]
    pub const fn event(&self) -> &Event {
        &self.event
    }

    /// The target supervisor's id.
    #[must_use]
    pub const fn supervisor(&self) -> UserId {
        self.supervisor
    }

    /// When the notification was generated.
    #[must_use]
    pub const fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// Whether it has been read.
    #[must_use]
    pub const fn is_read(&self) -> bool {
        self.read
    }

    /// When it was first read.
    #[must_use]
    pub const fn read_at(&self) -> Option<DateTime<Utc>> {
        self.read_at
    }

    /// Marks the notification read. Only the first call records a time.
    pub fn mark_read(&mut self) {
        self.mark_read_at(Utc::now());
    }

    /// Marks the notification read at `at`. Only the first call records a
    /// time.
    pub fn mark_read_at(&mut self, at: DateTime<Utc>) {
        if !self.read {
            self.read = true;
            self.read_at = Some(at);
        }
    }

    /// The event's detailed description.
    #[must_use]
    pub fn description(&self) -> String {
        self.event.detailed_description()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::domain::{
        IncidentCategory, Ticket, Urgency,
        user::tests::{operator, requester, supervisor},
    };

    fn event() -> Event {
        let ticket = Ticket::incident(
            Some(5),
            "Phone lost",
            "My phone was stolen on the train",
            &requester(1),
            Urgency::Critical,
            IncidentCategory::EquipmentLoss,
        )
        .unwrap();
        Event::creation(&operator(2), &ticket, None)
    }

    #[test]
    fn targets_only_saved_supervisors() {
        assert!(matches!(
            Notification::new(None, event(), &operator(2)),
            Err(Error::Validation(_))
        ));

        let mut unsaved = supervisor(9);
        unsaved.id = None;
        assert!(Notification::new(None, event(), &unsaved).is_err());

        let notification = Notification::new(None, event(), &supervisor(9)).unwrap();
        assert_eq!(notification.supervisor(), 9);
        assert!(!notification.is_read());
    }

    #[test]
    fn first_read_wins() {
        let mut notification = Notification::new(Some(1), event(), &supervisor(9)).unwrap();
        let first = Utc::now();
        notification.mark_read_at(first);
        notification.mark_read_at(first + Duration::hours(1));
        assert!(notification.is_read());
        assert_eq!(notification.read_at(), Some(first));
    }

    #[test]
    fn description_comes_from_event() {
        let notification = Notification::new(Some(1), event(), &supervisor(9)).unwrap();
        assert_eq!(notification.description(), "Oscar Operator created ticket #5");
    }
}
