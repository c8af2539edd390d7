//! Comparators for work queues.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::domain::Ticket;

/// Orders tickets by descending priority as of `now`, oldest first on ties.
///
/// `now` is fixed up front so that every comparison in one sort agrees.
pub fn by_priority(now: DateTime<Utc>) -> impl Fn(&Ticket, &Ticket) -> Ordering {
    move |a, b| {
        b.priority_at(now)
            .cmp(&a.priority_at(now))
            .then_with(|| by_age(a, b))
    }
}

/// Orders tickets oldest first.
#[must_use]
pub fn by_age(a: &Ticket, b: &Ticket) -> Ordering {
    a.created_at().cmp(&b.created_at())
}
