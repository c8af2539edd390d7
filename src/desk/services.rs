use std::fmt::Write as _;

use chrono::NaiveDate;
use tracing::instrument;

use crate::{
    desk::{Error, HelpDesk, NewTicket, Result},
    domain::{RequestCategory, Service, ServiceId, ServiceKind, Ticket, TicketKind, UserId, UserKind},
    storage::Store,
};

impl<S: Store> HelpDesk<'_, S> {
    /// The services a requester subscribes to.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] unless `requester` is a requester.
    pub fn services_of(&self, requester: UserId) -> Result<Vec<Service>> {
        self.require_kind(requester, UserKind::Requester)?;
        Ok(self.store.services_of(requester)?)
    }

    /// Files a service request to activate a new service.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] unless `requester` is a requester.
    #[instrument(skip(self, comments))]
    pub fn request_activation(
        &self,
        requester: UserId,
        kind: ServiceKind,
        plan: &str,
        address: &str,
        comments: Option<&str>,
    ) -> Result<Ticket> {
        let mut description = format!("Plan: {plan}\nInstallation address: {address}");
        append_comments(&mut description, comments);
        self.create_ticket(
            requester,
            NewTicket {
                title: format!("Service activation request: {kind}"),
                description,
                kind: TicketKind::ServiceRequest {
                    category: RequestCategory::Activation,
                },
            },
        )
    }

    /// Files a service request to cancel one of the requester's services.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if the service or requester is missing
    /// - [`Error::Unauthorized`] if the service belongs to someone else
    #[instrument(skip(self, comments))]
    pub fn request_cancellation(
        &self,
        service: ServiceId,
        requester: UserId,
        reason: &str,
        desired_date: NaiveDate,
        comments: Option<&str>,
    ) -> Result<Ticket> {
        let service = self
            .store
            .service(service)?
            .ok_or_else(|| Error::not_found("service", service))?;
        if service.owner() != requester {
            return Err(Error::unauthorized(format!(
                "user {requester} does not own service {}",
                service.number()
            )));
        }

        let mut description = format!(
            "Service: {} ({})\nReason: {reason}\nDesired cancellation date: {desired_date}",
            service.kind(),
            service.number()
        );
        append_comments(&mut description, comments);
        self.create_ticket(
            requester,
            NewTicket {
                title: format!("Service cancellation request: {}", service.kind()),
                description,
                kind: TicketKind::ServiceRequest {
                    category: RequestCategory::Cancellation,
                },
            },
        )
    }
}

fn append_comments(description: &mut String, comments: Option<&str>) {
    if let Some(comments) = comments.filter(|c| !c.trim().is_empty()) {
        let _ = write!(description, "\nComments: {comments}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        desk::tests::seeded,
        domain::{EventType, State},
        storage::MemoryStore,
    };

    #[test]
    fn activation_request() {
        let store = MemoryStore::new();
        let (desk, cast) = seeded(&store);
        let ticket = desk
            .request_activation(
                cast.requester,
                ServiceKind::Television,
                "Premium HD",
                "Av. Siempre Viva 742",
                Some("Weekday mornings only"),
            )
            .unwrap();

        assert!(ticket.is_activation());
        assert_eq!(ticket.state(), State::New);
        assert_eq!(ticket.title(), "Service activation request: TELEVISION");
        assert_eq!(
            ticket.description(),
            "Plan: Premium HD\nInstallation address: Av. Siempre Viva 742\nComments: Weekday mornings only"
        );
        assert_eq!(ticket.events()[0].event_type(), EventType::Creation);
    }

    #[test]
    fn cancellation_request() {
        let store = MemoryStore::new();
        let (desk, cast) = seeded(&store);
        let service = desk.services_of(cast.requester).unwrap()[0].clone();
        let date = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();

        let ticket = desk
            .request_cancellation(service.id().unwrap(), cast.requester, "Moving abroad", date, None)
            .unwrap();
        assert!(ticket.is_cancellation());
        assert_eq!(
            ticket.description(),
            "Service: INTERNET_BANDA_ANCHA (ACC-10001)\nReason: Moving abroad\nDesired cancellation date: 2026-12-31"
        );
    }

    #[test]
    fn cancelling_someone_elses_service() {
        let store = MemoryStore::new();
        let (desk, cast) = seeded(&store);
        let service = desk.services_of(cast.requester).unwrap()[0].clone();
        let date = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();

        assert!(matches!(
            desk.request_cancellation(service.id().unwrap(), cast.operator, "Not mine", date, None),
            Err(Error::Unauthorized(_))
        ));
        assert!(matches!(
            desk.request_cancellation(999, cast.requester, "Ghost service", date, None),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(desk.services_of(cast.operator), Err(Error::NotFound(_))));
    }
}
