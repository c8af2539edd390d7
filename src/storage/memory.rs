//! An in-memory store.
//!
//! [`MemoryStore`] implements every store trait over ordered maps guarded by
//! `parking_lot` locks. It is the backing store of a
//! [`Directory`](crate::storage::Directory), which snapshots it to disk.

use std::collections::BTreeMap;

use parking_lot::{Mutex, RwLock};

use crate::{
    domain::{
        Email, EventKind, Notification, NotificationId, Role, Service, ServiceId, State, Ticket,
        TicketId, Urgency, User, UserId, ordering,
    },
    storage::{
        NotificationStore, Page, Paged, Sequence, SequenceGenerator, ServiceStore, StoreError,
        TicketFilter, TicketMetrics, TicketStore, UserFilter, UserStore,
    },
};

/// Every entity held by a [`MemoryStore`], in a form that can be moved in
/// and out of it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Current value of each counter.
    pub sequences: BTreeMap<Sequence, u64>,
    /// Users, with requesters' services detached.
    pub users: Vec<User>,
    /// Services.
    pub services: Vec<Service>,
    /// Tickets.
    pub tickets: Vec<Ticket>,
    /// Notifications.
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    services: BTreeMap<ServiceId, Service>,
    tickets: BTreeMap<TicketId, Ticket>,
    notifications: BTreeMap<NotificationId, Notification>,
}

impl Tables {
    fn hydrate(&self, mut user: User) -> User {
        if let (Role::Requester { services }, Some(id)) = (&mut user.role, user.id) {
            *services = self
                .services
                .values()
                .filter(|service| service.owner == id)
                .cloned()
                .collect();
        }
        user
    }
}

/// A thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    sequences: Mutex<BTreeMap<Sequence, u64>>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store from a snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let Snapshot {
            sequences,
            users,
            services,
            tickets,
            notifications,
        } = snapshot;

        let tables = Tables {
            users: users
                .into_iter()
                .filter_map(|user| Some((user.id?, user)))
                .collect(),
            services: services
                .into_iter()
                .filter_map(|service| Some((service.id?, service)))
                .collect(),
            tickets: tickets
                .into_iter()
                .filter_map(|ticket| Some((ticket.id?, ticket)))
                .collect(),
            notifications: notifications
                .into_iter()
                .filter_map(|notification| Some((notification.id?, notification)))
                .collect(),
        };

        Self {
            tables: RwLock::new(tables),
            sequences: Mutex::new(sequences),
        }
    }

    /// Copies every entity out of the store.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let tables = self.tables.read();
        Snapshot {
            sequences: self.sequences.lock().clone(),
            users: tables.users.values().cloned().collect(),
            services: tables.services.values().cloned().collect(),
            tickets: tables.tickets.values().cloned().collect(),
            notifications: tables.notifications.values().cloned().collect(),
        }
    }

    fn allocate(&self, id: Option<u64>, sequence: Sequence) -> Result<u64, StoreError> {
        match id {
            Some(id) => Ok(id),
            None => self.next_id(sequence),
        }
    }

    fn stamp_ticket(&self, ticket: &mut Ticket) -> Result<TicketId, StoreError> {
        let id = self.allocate(ticket.id, Sequence::Ticket)?;
        ticket.id = Some(id);

        for comment in &mut ticket.comments {
            comment.id = Some(self.allocate(comment.id, Sequence::Comment)?);
            comment.ticket = Some(id);
        }
        for event in &mut ticket.events {
            event.id = Some(self.allocate(event.id, Sequence::Event)?);
            event.ticket = Some(id);
            if let EventKind::Comment { comment } = &mut event.kind {
                // the embedded copy shares the id of the comment it mirrors
                if comment.id.is_none() {
                    comment.id = ticket
                        .comments
                        .iter()
                        .find(|c| c.created_at == comment.created_at && c.text == comment.text)
                        .and_then(|c| c.id);
                }
                comment.ticket = Some(id);
            }
        }
        Ok(id)
    }
}

impl SequenceGenerator for MemoryStore {
    fn next_id(&self, sequence: Sequence) -> Result<u64, StoreError> {
        let mut sequences = self.sequences.lock();
        let counter = sequences.entry(sequence).or_insert(0);
        *counter += 1;
        tracing::debug!(%sequence, id = *counter, "allocated id");
        Ok(*counter)
    }
}

impl UserStore for MemoryStore {
    fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read();
        Ok(tables.users.get(&id).cloned().map(|u| tables.hydrate(u)))
    }

    fn user_by_email(&self, email: &Email) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .users
            .values()
            .find(|user| user.email == *email)
            .cloned()
            .map(|u| tables.hydrate(u)))
    }

    fn save_user(&self, mut user: User) -> Result<User, StoreError> {
        let id = self.allocate(user.id, Sequence::User)?;
        user.id = Some(id);

        let mut stored = user.clone();
        if let Role::Requester { services } = &mut stored.role {
            services.clear();
        }

        let mut tables = self.tables.write();
        tables.users.insert(id, stored);
        tracing::debug!(id, kind = %user.kind(), "saved user");
        Ok(tables.hydrate(user))
    }

    fn list_users(&self, filter: &UserFilter, page: Page) -> Result<Paged<User>, StoreError> {
        let tables = self.tables.read();
        let matching = tables
            .users
            .values()
            .filter(|user| filter.matches(user))
            .cloned()
            .map(|u| tables.hydrate(u));
        Ok(page.slice(matching))
    }

    fn supervisors_of(&self, employee: UserId) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .users
            .values()
            .filter(|user| user.supervises_id(employee))
            .cloned()
            .collect())
    }
}

impl TicketStore for MemoryStore {
    fn ticket(&self, id: TicketId) -> Result<Option<Ticket>, StoreError> {
        Ok(self.tables.read().tickets.get(&id).cloned())
    }

    fn save_ticket(&self, mut ticket: Ticket) -> Result<Ticket, StoreError> {
        let id = self.stamp_ticket(&mut ticket)?;
        self.tables.write().tickets.insert(id, ticket.clone());
        tracing::debug!(id, state = %ticket.state(), "saved ticket");
        Ok(ticket)
    }

    fn list_tickets(&self, filter: &TicketFilter, page: Page) -> Result<Paged<Ticket>, StoreError> {
        let tables = self.tables.read();
        let mut matching: Vec<&Ticket> = tables
            .tickets
            .values()
            .filter(|ticket| filter.matches(ticket))
            .collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(page.slice(matching.into_iter().cloned()))
    }

    fn metrics(&self) -> Result<TicketMetrics, StoreError> {
        Ok(TicketMetrics::tally(self.tables.read().tickets.values()))
    }

    fn critical_pending(&self) -> Result<Vec<Ticket>, StoreError> {
        let tables = self.tables.read();
        let mut critical: Vec<Ticket> = tables
            .tickets
            .values()
            .filter(|t| t.urgency() == Some(Urgency::Critical) && t.state() != State::Resolved)
            .cloned()
            .collect();
        critical.sort_by(ordering::by_age);
        Ok(critical)
    }
}

impl ServiceStore for MemoryStore {
    fn service(&self, id: ServiceId) -> Result<Option<Service>, StoreError> {
        Ok(self.tables.read().services.get(&id).cloned())
    }

    fn services_of(&self, owner: UserId) -> Result<Vec<Service>, StoreError> {
        Ok(self
            .tables
            .read()
            .services
            .values()
            .filter(|service| service.owner == owner)
            .cloned()
            .collect())
    }

    fn save_service(&self, mut service: Service) -> Result<Service, StoreError> {
        let id = self.allocate(service.id, Sequence::Service)?;
        service.id = Some(id);
        self.tables.write().services.insert(id, service.clone());
        tracing::debug!(id, owner = service.owner, "saved service");
        Ok(service)
    }
}

impl NotificationStore for MemoryStore {
    fn notification(&self, id: NotificationId) -> Result<Option<Notification>, StoreError> {
        Ok(self.tables.read().notifications.get(&id).cloned())
    }

    fn save_notification(&self, mut notification: Notification) -> Result<Notification, StoreError> {
        let id = self.allocate(notification.id, Sequence::Notification)?;
        notification.id = Some(id);
        self.tables
            .write()
            .notifications
            .insert(id, notification.clone());
        tracing::debug!(id, supervisor = notification.supervisor, "saved notification");
        Ok(notification)
    }

    fn notifications_for(
        &self,
        supervisor: UserId,
        read: Option<bool>,
        page: Page,
    ) -> Result<Paged<Notification>, StoreError> {
        let tables = self.tables.read();
        let mut matching: Vec<&Notification> = tables
            .notifications
            .values()
            .filter(|n| n.supervisor == supervisor && read.is_none_or(|read| n.read == read))
            .collect();
        matching.sort_by(|a, b| {
            b.generated_at
                .cmp(&a.generated_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(page.slice(matching.into_iter().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use chrono::Duration;

    use super::*;
    use crate::domain::{
        Comment, Event, IncidentCategory, RequestCategory, ServiceKind, TicketType,
        user::tests::{operator, requester, supervisor, technician},
    };

    fn incident(owner: &User, urgency: Urgency) -> Ticket {
        Ticket::incident(
            None,
            "Cannot browse",
            "Every web page times out since yesterday",
            owner,
            urgency,
            IncidentCategory::ServiceUnreachable,
        )
        .unwrap()
    }

    fn unsaved(mut user: User) -> User {
        user.id = None;
        user
    }

    #[test]
    fn sequences_start_at_one_and_are_independent() {
        let store = MemoryStore::new();
        assert_eq!(store.next_id(Sequence::User).unwrap(), 1);
        assert_eq!(store.next_id(Sequence::User).unwrap(), 2);
        assert_eq!(store.next_id(Sequence::Ticket).unwrap(), 1);
    }

    #[test]
    fn sequences_are_unique_across_threads() {
        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    (0..100)
                        .map(|_| store.next_id(Sequence::Event).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 400);
    }

    #[test]
    fn save_user_allocates_and_keeps_ids() {
        let store = MemoryStore::new();
        let saved = store.save_user(unsaved(operator(1))).unwrap();
        assert_eq!(saved.id(), Some(1));

        let again = store.save_user(saved.clone()).unwrap();
        assert_eq!(again.id(), Some(1));
        assert_eq!(store.list_users(&UserFilter::default(), Page::all()).unwrap().total, 1);
        assert_eq!(
            store.user_by_email(saved.email()).unwrap().unwrap().id(),
            Some(1)
        );
        assert!(store.email_exists(saved.email()).unwrap());
    }

    #[test]
    fn requesters_are_hydrated_with_services() {
        let store = MemoryStore::new();
        let owner = store.save_user(unsaved(requester(1))).unwrap();
        let owner_id = owner.id().unwrap();
        store
            .save_service(Service::new(None, ServiceKind::Broadband, "ACC-00001", owner_id).unwrap())
            .unwrap();
        store
            .save_service(Service::new(None, ServiceKind::Television, "TV-000002", 99).unwrap())
            .unwrap();

        let loaded = store.user(owner_id).unwrap().unwrap();
        assert_eq!(loaded.services().len(), 1);
        assert!(loaded.has_service(ServiceKind::Broadband));
        assert_eq!(store.services_of(owner_id).unwrap().len(), 1);
    }

    #[test]
    fn user_listing_filters() {
        let store = MemoryStore::new();
        store.save_user(operator(1)).unwrap();
        store.save_user(technician(2)).unwrap();
        let mut other = technician(3);
        other.add_specialty("satelital").unwrap();
        store.save_user(other).unwrap();

        let filter = UserFilter {
            kind: Some(crate::domain::UserKind::Technician),
            specialty: None,
        };
        assert_eq!(store.list_users(&filter, Page::all()).unwrap().total, 2);

        let filter = UserFilter {
            kind: None,
            specialty: Some("satelital".to_string()),
        };
        let found = store.list_users(&filter, Page::all()).unwrap();
        assert_eq!(found.items[0].id(), Some(3));
    }

    #[test]
    fn supervisors_of_matches_either_set() {
        let store = MemoryStore::new();
        let op = operator(1);
        let tech = technician(2);
        let mut both = supervisor(10);
        both.add_supervisee(&op).unwrap();
        both.add_supervisee(&tech).unwrap();
        let mut techs_only = supervisor(11);
        techs_only.add_supervisee(&tech).unwrap();
        for user in [op, tech, both, techs_only] {
            store.save_user(user).unwrap();
        }

        let ids = |employee| {
            store
                .supervisors_of(employee)
                .unwrap()
                .iter()
                .filter_map(User::id)
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(1), vec![10]);
        assert_eq!(ids(2), vec![10, 11]);
        assert!(ids(10).is_empty());
    }

    #[test]
    fn save_ticket_stamps_children() {
        let store = MemoryStore::new();
        let owner = requester(1);
        let mut ticket = incident(&owner, Urgency::Minor);
        ticket.add_event(Event::creation(&owner, &ticket, None));
        let comment = Comment::new(None, "Please hurry up", &owner, &ticket).unwrap();
        ticket.add_comment(comment.clone()).unwrap();
        ticket.add_event(Event::comment(&owner, &ticket, comment, None));

        let saved = store.save_ticket(ticket).unwrap();
        let id = saved.id().unwrap();

        assert_eq!(saved.comments()[0].id(), Some(1));
        assert_eq!(saved.comments()[0].ticket(), Some(id));
        let event_ids: Vec<_> = saved.events().iter().filter_map(Event::id).collect();
        assert_eq!(event_ids, vec![1, 2]);
        assert!(saved.events().iter().all(|e| e.ticket() == Some(id)));
        let EventKind::Comment { comment } = saved.events()[1].kind() else {
            panic!("expected a comment event");
        };
        assert_eq!(comment.id(), Some(1));

        assert_eq!(store.ticket(id).unwrap().unwrap(), saved);
    }

    #[test]
    fn listing_is_newest_first_and_paged() {
        let store = MemoryStore::new();
        let owner = requester(1);
        for age in [3, 1, 2] {
            let mut ticket = incident(&owner, Urgency::Minor);
            ticket.created_at -= Duration::days(age);
            store.save_ticket(ticket).unwrap();
        }

        let page = store
            .list_tickets(&TicketFilter::default(), Page::new(1, 2))
            .unwrap();
        assert_eq!(page.total, 3);
        let ids: Vec<_> = page.items.iter().filter_map(Ticket::id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn listing_filters() {
        let store = MemoryStore::new();
        let owner = requester(1);
        let tech = technician(4);

        let mut assigned = incident(&owner, Urgency::Critical);
        assigned.assign_technician(&tech, &operator(2)).unwrap();
        store.save_ticket(assigned).unwrap();
        store.save_ticket(incident(&requester(7), Urgency::Minor)).unwrap();
        store
            .save_ticket(
                Ticket::service_request(
                    None,
                    "Port my number",
                    "I want to move my mobile line here",
                    &owner,
                    RequestCategory::Activation,
                )
                .unwrap(),
            )
            .unwrap();

        let count = |filter: TicketFilter| store.list_tickets(&filter, Page::all()).unwrap().total;
        assert_eq!(count(TicketFilter::default()), 3);
        assert_eq!(
            count(TicketFilter {
                requester: Some(1),
                ..TicketFilter::default()
            }),
            2
        );
        assert_eq!(
            count(TicketFilter {
                technician: Some(4),
                ..TicketFilter::default()
            }),
            1
        );
        assert_eq!(
            count(TicketFilter {
                ticket_type: Some(TicketType::ServiceRequest),
                ..TicketFilter::default()
            }),
            1
        );
        assert_eq!(
            count(TicketFilter {
                state: Some(State::New),
                urgency: Some(Urgency::Minor),
                ..TicketFilter::default()
            }),
            1
        );
    }

    #[test]
    fn metrics_and_critical_queue() {
        let store = MemoryStore::new();
        let owner = requester(1);
        let tech = technician(4);

        let mut old = incident(&owner, Urgency::Critical);
        old.created_at -= Duration::days(4);
        store.save_ticket(old).unwrap();
        store.save_ticket(incident(&owner, Urgency::Critical)).unwrap();

        let mut done = incident(&owner, Urgency::Critical);
        done.assign_technician(&tech, &operator(2)).unwrap();
        done.resolve(&tech).unwrap();
        store.save_ticket(done).unwrap();
        store.save_ticket(incident(&owner, Urgency::Minor)).unwrap();

        let metrics = store.metrics().unwrap();
        assert_eq!(metrics.total, 4);
        assert_eq!(metrics.incidents, 4);
        assert_eq!(metrics.service_requests, 0);
        assert_eq!(metrics.resolved, 1);
        assert_eq!(metrics.pending, 3);
        assert_eq!(metrics.by_state[&State::New], 3);
        assert_eq!(metrics.by_state[&State::InProgress], 0);
        assert_eq!(metrics.by_urgency[&Urgency::Critical], 3);

        let ids: Vec<_> = store
            .critical_pending()
            .unwrap()
            .iter()
            .filter_map(Ticket::id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn notifications_by_supervisor_and_read_flag() {
        let store = MemoryStore::new();
        let owner = requester(1);
        let ticket = incident(&owner, Urgency::Minor);
        let sup = supervisor(10);

        for _ in 0..3 {
            let event = Event::creation(&owner, &ticket, None);
            store
                .save_notification(Notification::new(None, event, &sup).unwrap())
                .unwrap();
        }
        let mut first = store.notification(1).unwrap().unwrap();
        first.mark_read();
        store.save_notification(first).unwrap();

        assert_eq!(store.count_for(10, None).unwrap(), 3);
        assert_eq!(store.count_for(10, Some(false)).unwrap(), 2);
        assert_eq!(store.count_for(10, Some(true)).unwrap(), 1);
        assert_eq!(store.count_for(11, None).unwrap(), 0);

        let page = store.notifications_for(10, None, Page::new(1, 2)).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.pages(), 2);
    }

    #[test]
    fn snapshot_round_trip() {
        let store = MemoryStore::new();
        store.save_user(unsaved(requester(1))).unwrap();
        store.save_ticket(incident(&requester(1), Urgency::Minor)).unwrap();

        let copy = MemoryStore::from_snapshot(store.snapshot());
        assert_eq!(copy.snapshot(), store.snapshot());
        // counters carry over
        assert_eq!(copy.next_id(Sequence::User).unwrap(), 2);
    }
}
