//! Supervisor notifications fanned out from audit events.

use crate::{
    domain::{Event, Notification},
    storage::{NotificationStore, Sequence, SequenceGenerator, StoreError, UserStore},
};

/// Fans events out to the supervisors of whoever performed them.
///
/// The notifier holds no state of its own; it is built over the stores it
/// reads supervisors from and writes notifications to.
#[derive(Clone, Copy)]
pub struct Notifier<'a> {
    users: &'a dyn UserStore,
    notifications: &'a dyn NotificationStore,
    sequences: &'a dyn SequenceGenerator,
}

impl<'a> Notifier<'a> {
    /// A notifier over the given collaborators.
    #[must_use]
    pub const fn new(
        users: &'a dyn UserStore,
        notifications: &'a dyn NotificationStore,
        sequences: &'a dyn SequenceGenerator,
    ) -> Self {
        Self {
            users,
            notifications,
            sequences,
        }
    }

    /// Creates and persists one notification per supervisor of the event's
    /// responsible actor.
    ///
    /// An actor nobody supervises (or one that was never saved) produces no
    /// notifications.
    ///
    /// # Errors
    ///
    /// Returns an error if a store cannot be read or written.
    pub fn notify(&self, event: &Event) -> Result<Vec<Notification>, StoreError> {
        let Some(actor) = event.responsible().id else {
            return Ok(Vec::new());
        };
        let supervisors = self.users.supervisors_of(actor)?;
        if supervisors.is_empty() {
            tracing::debug!(actor, "no supervisors to notify");
            return Ok(Vec::new());
        }

        let mut sent = Vec::with_capacity(supervisors.len());
        for supervisor in &supervisors {
            let id = self.sequences.next_id(Sequence::Notification)?;
            let notification = Notification::new(Some(id), event.clone(), supervisor)?;
            sent.push(self.notifications.save_notification(notification)?);
        }
        tracing::debug!(actor, count = sent.len(), event = %event.event_type(), "notified supervisors");
        Ok(sent)
    }
}

impl std::fmt::Debug for Notifier<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            IncidentCategory, Ticket, Urgency, User,
            user::tests::{operator, requester, supervisor, technician},
        },
        storage::{MemoryStore, Page},
    };

    fn event_by(actor: &User) -> Event {
        let ticket = Ticket::incident(
            Some(1),
            "Line cut",
            "The landline has no tone since the storm",
            &requester(1),
            Urgency::Critical,
            IncidentCategory::ServiceUnreachable,
        )
        .unwrap();
        Event::creation(actor, &ticket, None)
    }

    fn notifier(store: &MemoryStore) -> Notifier<'_> {
        Notifier::new(store, store, store)
    }

    #[test]
    fn supervised_operator_notifies_their_supervisor() {
        let store = MemoryStore::new();
        let op = store.save_user(operator(2)).unwrap();
        let mut sup = supervisor(10);
        sup.add_supervisee(&op).unwrap();
        store.save_user(sup).unwrap();

        let event = event_by(&op);
        let sent = notifier(&store).notify(&event).unwrap();

        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].supervisor(), 10);
        assert_eq!(sent[0].event(), &event);
        assert_eq!(sent[0].id(), Some(1));
        assert_eq!(store.count_for(10, Some(false)).unwrap(), 1);
    }

    #[test]
    fn unsupervised_actor_produces_nothing() {
        let store = MemoryStore::new();
        let tech = store.save_user(technician(4)).unwrap();
        store.save_user(supervisor(10)).unwrap();

        let sent = notifier(&store).notify(&event_by(&tech)).unwrap();
        assert!(sent.is_empty());
        assert_eq!(store.notifications_for(10, None, Page::all()).unwrap().total, 0);
    }

    #[test]
    fn every_supervisor_is_notified() {
        let store = MemoryStore::new();
        let tech = store.save_user(technician(4)).unwrap();
        for id in [10, 11] {
            let mut sup = supervisor(id);
            sup.add_supervisee(&tech).unwrap();
            store.save_user(sup).unwrap();
        }

        let sent = notifier(&store).notify(&event_by(&tech)).unwrap();
        let targets: Vec<_> = sent.iter().map(Notification::supervisor).collect();
        assert_eq!(targets, vec![10, 11]);
        let ids: Vec<_> = sent.iter().filter_map(Notification::id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn unsaved_actor_produces_nothing() {
        let store = MemoryStore::new();
        let mut op = operator(2);
        op.id = None;
        assert!(notifier(&store).notify(&event_by(&op)).unwrap().is_empty());
    }
}
