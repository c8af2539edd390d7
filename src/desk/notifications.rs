use chrono::Utc;
use serde::Serialize;
use tracing::instrument;

use crate::{
    desk::{Error, HelpDesk, Result},
    domain::{Notification, NotificationId, UserId, UserKind},
    storage::{Page, Paged, Store},
};

/// Notification counts for one supervisor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NotificationSummary {
    /// Every notification.
    pub total: usize,
    /// Not yet read.
    pub unread: usize,
    /// Already read.
    pub read: usize,
}

impl<S: Store> HelpDesk<'_, S> {
    /// A supervisor's notifications, newest first, optionally filtered by
    /// read flag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] unless `supervisor` is a supervisor.
    pub fn notifications(
        &self,
        supervisor: UserId,
        read: Option<bool>,
        page: usize,
        size: Option<usize>,
    ) -> Result<Paged<Notification>> {
        self.require_kind(supervisor, UserKind::Supervisor)?;
        Ok(self
            .store
            .notifications_for(supervisor, read, self.page(page, size))?)
    }

    /// Marks one notification read. Reading it again changes nothing.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the notification is missing
    /// - [`Error::Unauthorized`] if it belongs to another supervisor
    #[instrument(skip(self))]
    pub fn mark_read(&self, id: NotificationId, supervisor: UserId) -> Result<Notification> {
        let mut notification = self
            .store
            .notification(id)?
            .ok_or_else(|| Error::not_found("notification", id))?;
        if notification.supervisor() != supervisor {
            return Err(Error::unauthorized(format!(
                "notification {id} is not addressed to user {supervisor}"
            )));
        }
        if notification.is_read() {
            return Ok(notification);
        }
        notification.mark_read();
        Ok(self.store.save_notification(notification)?)
    }

    /// Marks every unread notification of a supervisor read, returning how
    /// many changed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] unless `supervisor` is a supervisor.
    #[instrument(skip(self))]
    pub fn mark_all_read(&self, supervisor: UserId) -> Result<usize> {
        self.require_kind(supervisor, UserKind::Supervisor)?;
        let unread = self
            .store
            .notifications_for(supervisor, Some(false), Page::all())?
            .items;
        let now = Utc::now();
        let count = unread.len();
        for mut notification in unread {
            notification.mark_read_at(now);
            self.store.save_notification(notification)?;
        }
        tracing::info!(supervisor, count, "marked notifications read");
        Ok(count)
    }

    /// Counts a supervisor's notifications.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] unless `supervisor` is a supervisor.
    pub fn notification_summary(&self, supervisor: UserId) -> Result<NotificationSummary> {
        self.require_kind(supervisor, UserKind::Supervisor)?;
        let total = self.store.count_for(supervisor, None)?;
        let unread = self.store.count_for(supervisor, Some(false))?;
        Ok(NotificationSummary {
            total,
            unread,
            read: total - unread,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        desk::tests::{incident, seeded},
        domain::Urgency,
        storage::MemoryStore,
    };

    #[test]
    fn reading_notifications() {
        let store = MemoryStore::new();
        let (desk, cast) = seeded(&store);
        let id = incident(&desk, cast.requester, Urgency::Critical).id().unwrap();
        desk.assign(id, cast.technician, cast.operator, None).unwrap();
        desk.add_comment(id, cast.technician, "On my way to the site").unwrap();

        let summary = desk.notification_summary(cast.supervisor).unwrap();
        assert_eq!(
            summary,
            NotificationSummary {
                total: 2,
                unread: 2,
                read: 0
            }
        );

        let newest = desk.notifications(cast.supervisor, None, 1, None).unwrap().items[0].clone();
        let notification_id = newest.id().unwrap();
        let read = desk.mark_read(notification_id, cast.supervisor).unwrap();
        assert!(read.is_read());
        let first_read = read.read_at();
        assert_eq!(
            desk.mark_read(notification_id, cast.supervisor).unwrap().read_at(),
            first_read
        );

        assert_eq!(desk.notifications(cast.supervisor, Some(false), 1, None).unwrap().total, 1);
        assert_eq!(desk.mark_all_read(cast.supervisor).unwrap(), 1);
        assert_eq!(desk.mark_all_read(cast.supervisor).unwrap(), 0);
        assert_eq!(desk.notification_summary(cast.supervisor).unwrap().read, 2);
    }

    #[test]
    fn notifications_are_private() {
        let store = MemoryStore::new();
        let (desk, cast) = seeded(&store);
        let id = incident(&desk, cast.requester, Urgency::Minor).id().unwrap();
        desk.assign(id, cast.technician, cast.operator, None).unwrap();
        let notification = desk.notifications(cast.supervisor, None, 1, None).unwrap().items[0].clone();

        assert!(matches!(
            desk.mark_read(notification.id().unwrap(), cast.operator),
            Err(Error::Unauthorized(_))
        ));
        assert!(matches!(
            desk.notifications(cast.operator, None, 1, None),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(desk.mark_read(999, cast.supervisor), Err(Error::NotFound(_))));
    }
}
