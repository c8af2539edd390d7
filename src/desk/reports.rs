use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    desk::{HelpDesk, Result},
    domain::{
        Event, EventKind, ResolutionTime, State, Ticket, TicketId, Urgency, UserId, UserKind, UserRef,
        ordering,
    },
    storage::{Page, Store, TicketFilter, TicketMetrics, UserFilter},
};

/// One line of a work queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueEntry {
    /// Ticket id.
    pub id: Option<TicketId>,
    /// Ticket title.
    pub title: String,
    /// Current state.
    pub state: State,
    /// Urgency, for incidents.
    pub urgency: Option<Urgency>,
    /// Priority score at the time of the report.
    pub priority: i64,
    /// Whole days since the ticket was filed.
    pub days_since_creation: i64,
    /// When the last event happened, or when the ticket was filed.
    pub last_activity: DateTime<Utc>,
}

impl QueueEntry {
    fn new(ticket: &Ticket, now: DateTime<Utc>) -> Self {
        Self {
            id: ticket.id(),
            title: ticket.title().to_string(),
            state: ticket.state(),
            urgency: ticket.urgency(),
            priority: ticket.priority_at(now),
            days_since_creation: ticket.days_since_creation_at(now),
            last_activity: ticket
                .events()
                .iter()
                .map(Event::occurred_at)
                .max()
                .unwrap_or_else(|| ticket.created_at()),
        }
    }
}

/// How many open tickets a technician holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TechnicianLoad {
    /// The technician.
    pub technician: UserRef,
    /// Unresolved tickets assigned to them.
    pub open: usize,
}

/// The operator's overview of the desk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperatorDashboard {
    /// Ticket totals and distributions.
    pub metrics: TicketMetrics,
    /// Tickets nobody is assigned to yet.
    pub unassigned: usize,
    /// Unresolved critical incidents, oldest first.
    pub critical: Vec<QueueEntry>,
    /// Open tickets per technician, busiest first.
    pub workload: Vec<TechnicianLoad>,
    /// Mean time to resolution over every resolved ticket.
    pub average_resolution: Option<ResolutionTime>,
}

/// A technician's overview of their own work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TechnicianDashboard {
    /// The technician.
    pub technician: UserRef,
    /// Every ticket assigned to them.
    pub assigned: usize,
    /// Assigned tickets in progress.
    pub in_progress: usize,
    /// Assigned tickets resolved.
    pub resolved: usize,
    /// Mean time to resolution of their resolved tickets.
    pub average_resolution: Option<ResolutionTime>,
    /// Their unresolved tickets, highest priority first.
    pub queue: Vec<QueueEntry>,
    /// Unresolved tickets other technicians derived to them.
    pub consultations: Vec<QueueEntry>,
}

impl<S: Store> HelpDesk<'_, S> {
    /// Desk-wide metrics for operators.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn operator_dashboard(&self) -> Result<OperatorDashboard> {
        let now = Utc::now();
        let metrics = self.store.metrics()?;
        let unassigned = metrics.by_state.get(&State::New).copied().unwrap_or_default();
        let critical = self
            .store
            .critical_pending()?
            .iter()
            .map(|ticket| QueueEntry::new(ticket, now))
            .collect();

        let tickets = self
            .store
            .list_tickets(&TicketFilter::default(), Page::all())?
            .items;
        let technicians = UserFilter {
            kind: Some(UserKind::Technician),
            specialty: None,
        };
        let mut workload: Vec<TechnicianLoad> = self
            .store
            .list_users(&technicians, Page::all())?
            .items
            .iter()
            .map(|technician| TechnicianLoad {
                technician: technician.to_ref(),
                open: tickets
                    .iter()
                    .filter(|t| t.state() != State::Resolved && is_assigned(t, technician.id()))
                    .count(),
            })
            .collect();
        workload.sort_by(|a, b| b.open.cmp(&a.open));

        Ok(OperatorDashboard {
            metrics,
            unassigned,
            critical,
            workload,
            average_resolution: average_resolution(&tickets),
        })
    }

    /// Counts and the open queue of one technician.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::desk::Error::NotFound) unless
    /// `technician` is a technician.
    pub fn technician_dashboard(&self, technician: UserId) -> Result<TechnicianDashboard> {
        let now = Utc::now();
        let user = self.require_kind(technician, UserKind::Technician)?;
        let all = self
            .store
            .list_tickets(&TicketFilter::default(), Page::all())?
            .items;
        let assigned: Vec<&Ticket> = all
            .iter()
            .filter(|t| is_assigned(t, Some(technician)))
            .collect();

        let count = |state| assigned.iter().filter(|t| t.state() == state).count();
        let resolved: Vec<Ticket> = assigned
            .iter()
            .filter(|t| t.state() == State::Resolved)
            .map(|t| (*t).clone())
            .collect();

        let mut open: Vec<&Ticket> = assigned
            .iter()
            .copied()
            .filter(|t| t.state() != State::Resolved)
            .collect();
        let by_priority = ordering::by_priority(now);
        open.sort_by(|a, b| by_priority(*a, *b));

        let mut consultations: Vec<&Ticket> = all
            .iter()
            .filter(|t| t.state() != State::Resolved && is_derived_to(t, technician))
            .collect();
        consultations.sort_by(|a, b| by_priority(*a, *b));

        Ok(TechnicianDashboard {
            technician: user.to_ref(),
            assigned: assigned.len(),
            in_progress: count(State::InProgress),
            resolved: resolved.len(),
            average_resolution: average_resolution(&resolved),
            queue: open.into_iter().map(|t| QueueEntry::new(t, now)).collect(),
            consultations: consultations
                .into_iter()
                .map(|t| QueueEntry::new(t, now))
                .collect(),
        })
    }
}

fn is_assigned(ticket: &Ticket, technician: Option<UserId>) -> bool {
    technician.is_some()
        && ticket
            .assigned_technician()
            .is_some_and(|assigned| assigned.id == technician)
}

fn is_derived_to(ticket: &Ticket, technician: UserId) -> bool {
    ticket.events().iter().any(|event| {
        matches!(
            event.kind(),
            EventKind::Derivation { destination, .. } if destination.id == Some(technician)
        )
    })
}

fn average_resolution(tickets: &[Ticket]) -> Option<ResolutionTime> {
    let hours: Vec<i64> = tickets
        .iter()
        .filter_map(Ticket::resolution_time)
        .map(ResolutionTime::total_hours)
        .collect();
    let count = i64::try_from(hours.len()).ok().filter(|&n| n > 0)?;
    Some(ResolutionTime::from_hours(hours.iter().sum::<i64>() / count))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::{
        desk::tests::{incident, seeded},
        storage::{MemoryStore, TicketStore},
    };

    #[test]
    fn operator_dashboard() {
        let store = MemoryStore::new();
        let (desk, cast) = seeded(&store);
        let critical = incident(&desk, cast.requester, Urgency::Critical).id().unwrap();
        incident(&desk, cast.requester, Urgency::Minor);
        let resolved = incident(&desk, cast.requester, Urgency::Critical).id().unwrap();
        desk.assign(critical, cast.technician, cast.operator, None).unwrap();
        desk.assign(resolved, cast.technician, cast.operator, None).unwrap();

        let mut ticket = store.ticket(resolved).unwrap().unwrap();
        ticket.created_at -= Duration::hours(30);
        store.save_ticket(ticket).unwrap();
        desk.resolve(resolved, cast.technician, None).unwrap();

        let dashboard = desk.operator_dashboard().unwrap();
        assert_eq!(dashboard.metrics.total, 3);
        assert_eq!(dashboard.unassigned, 1);
        assert_eq!(dashboard.critical.len(), 1);
        assert_eq!(dashboard.critical[0].id, Some(critical));
        assert_eq!(dashboard.critical[0].priority, 100);
        assert_eq!(dashboard.workload[0].technician.id, Some(cast.technician));
        assert_eq!(dashboard.workload[0].open, 1);
        assert_eq!(dashboard.workload[1].open, 0);
        assert_eq!(
            dashboard.average_resolution,
            Some(ResolutionTime { days: 1, hours: 6 })
        );
    }

    #[test]
    fn technician_dashboard() {
        let store = MemoryStore::new();
        let (desk, cast) = seeded(&store);
        let minor = incident(&desk, cast.requester, Urgency::Minor).id().unwrap();
        let critical = incident(&desk, cast.requester, Urgency::Critical).id().unwrap();
        let done = incident(&desk, cast.requester, Urgency::Important).id().unwrap();
        for id in [minor, critical, done] {
            desk.assign(id, cast.technician, cast.operator, None).unwrap();
        }
        desk.derive(minor, cast.technician, cast.other_technician, "needs a second look")
            .unwrap();
        desk.resolve(done, cast.technician, None).unwrap();

        let dashboard = desk.technician_dashboard(cast.technician).unwrap();
        assert_eq!(dashboard.assigned, 3);
        assert_eq!(dashboard.in_progress, 1);
        assert_eq!(dashboard.resolved, 1);
        assert!(dashboard.average_resolution.is_some());
        let queue: Vec<_> = dashboard.queue.iter().filter_map(|e| e.id).collect();
        assert_eq!(queue, vec![critical, minor]);
        assert!(dashboard.consultations.is_empty());

        let other = desk.technician_dashboard(cast.other_technician).unwrap();
        assert_eq!(other.assigned, 0);
        assert_eq!(other.consultations.len(), 1);
        assert_eq!(other.consultations[0].id, Some(minor));

        assert!(desk.technician_dashboard(cast.operator).is_err());
    }
}
