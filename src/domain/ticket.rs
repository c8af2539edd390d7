//! Tickets and their lifecycle.
//!
//! A [`Ticket`] is either an incident (a problem with an existing service) or
//! a service request (activation or cancellation of a service). Both share
//! the same state machine:
//!
//! ```text
//! New -> Assigned -> InProgress -> Resolved -> Reopened
//!          ^  |                                  |
//!          +--+ (re-assign)                      +--> (reassign / derive / resolve again)
//! ```
//!
//! There is no terminal state. Lifecycle methods validate the current state
//! and the acting user, mutate the ticket, and return an error on violation.
//! Appending the matching [`Event`] is the caller's responsibility.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Comment, Error, Event, TicketId, User, UserRef};

/// Minimum length of a ticket title, in characters.
pub const MIN_TITLE_LEN: usize = 5;
/// Minimum length of a ticket description, in characters.
pub const MIN_DESCRIPTION_LEN: usize = 10;
/// Minimum length of a reopening reason, in characters.
pub const MIN_REOPEN_REASON_LEN: usize = 10;

/// Lifecycle state of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum State {
    /// Freshly created, nobody assigned.
    #[serde(rename = "NUEVO")]
    New,
    /// A technician has been assigned.
    #[serde(rename = "ASIGNADO")]
    Assigned,
    /// Being worked on, typically after a derivation.
    #[serde(rename = "EN_PROCESO")]
    InProgress,
    /// Resolved by the assigned technician.
    #[serde(rename = "RESUELTO")]
    Resolved,
    /// Reopened after resolution.
    #[serde(rename = "REABIERTO")]
    Reopened,
}

impl State {
    /// Every state, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::New,
        Self::Assigned,
        Self::InProgress,
        Self::Resolved,
        Self::Reopened,
    ];

    /// The wire spelling of the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "NUEVO",
            Self::Assigned => "ASIGNADO",
            Self::InProgress => "EN_PROCESO",
            Self::Resolved => "RESUELTO",
            Self::Reopened => "REABIERTO",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Urgency of an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Urgency {
    /// Weight 100.
    #[serde(rename = "CRITICO")]
    Critical,
    /// Weight 50.
    #[serde(rename = "IMPORTANTE")]
    Important,
    /// Weight 10.
    #[serde(rename = "MENOR")]
    Minor,
}

impl Urgency {
    /// The numeric weight used in priority scoring.
    #[must_use]
    pub const fn weight(self) -> i64 {
        match self {
            Self::Critical => 100,
            Self::Important => 50,
            Self::Minor => 10,
        }
    }

    /// The wire spelling of the urgency.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "CRITICO",
            Self::Important => "IMPORTANTE",
            Self::Minor => "MENOR",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IncidentCategory {
    /// The service cannot be reached.
    #[serde(rename = "SERVICIO_INACCESIBLE")]
    ServiceUnreachable,
    /// The SIM card is blocked.
    #[serde(rename = "BLOQUEO_SIM")]
    SimBlocked,
    /// Equipment was lost or destroyed.
    #[serde(rename = "PERDIDA_DESTRUCCION_EQUIPOS")]
    EquipmentLoss,
}

impl IncidentCategory {
    /// The wire spelling of the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ServiceUnreachable => "SERVICIO_INACCESIBLE",
            Self::SimBlocked => "BLOQUEO_SIM",
            Self::EquipmentLoss => "PERDIDA_DESTRUCCION_EQUIPOS",
        }
    }
}

/// Category of a service request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RequestCategory {
    /// Activate a new service.
    #[serde(rename = "ALTA_SERVICIO")]
    Activation,
    /// Cancel an existing service.
    #[serde(rename = "BAJA_SERVICIO")]
    Cancellation,
}

impl RequestCategory {
    /// The wire spelling of the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Activation => "ALTA_SERVICIO",
            Self::Cancellation => "BAJA_SERVICIO",
        }
    }
}

/// Discriminant of [`TicketKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TicketType {
    /// See [`TicketKind::Incident`].
    #[serde(rename = "INCIDENTE")]
    Incident,
    /// See [`TicketKind::ServiceRequest`].
    #[serde(rename = "SOLICITUD")]
    ServiceRequest,
}

impl TicketType {
    /// The wire spelling of the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Incident => "INCIDENTE",
            Self::ServiceRequest => "SOLICITUD",
        }
    }
}

impl fmt::Display for TicketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subtype-specific data of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketKind {
    /// A problem report.
    Incident {
        /// How urgent the problem is.
        urgency: Urgency,
        /// What kind of problem it is.
        category: IncidentCategory,
    },
    /// A service activation or cancellation request.
    ServiceRequest {
        /// Activation or cancellation.
        category: RequestCategory,
    },
}

impl TicketKind {
    /// The discriminant.
    #[must_use]
    pub const fn ticket_type(self) -> TicketType {
        match self {
            Self::Incident { .. } => TicketType::Incident,
            Self::ServiceRequest { .. } => TicketType::ServiceRequest,
        }
    }

    /// The wire spelling of the subtype's category.
    #[must_use]
    pub const fn category(self) -> &'static str {
        match self {
            Self::Incident { category, .. } => category.as_str(),
            Self::ServiceRequest { category } => category.as_str(),
        }
    }
}

/// Time elapsed between creation and resolution, truncated to whole hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ResolutionTime {
    /// Whole days.
    pub days: i64,
    /// Remaining whole hours (0..24).
    pub hours: i64,
}

impl ResolutionTime {
    pub(crate) const fn from_hours(total: i64) -> Self {
        Self {
            days: total / 24,
            hours: total % 24,
        }
    }

    /// The total number of whole hours.
    #[must_use]
    pub const fn total_hours(self) -> i64 {
        self.days * 24 + self.hours
    }
}

impl fmt::Display for ResolutionTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.days == 0 {
            write!(f, "{} hours", self.hours)
        } else {
            write!(f, "{} days {} hours", self.days, self.hours)
        }
    }
}

/// A help-desk ticket.
///
/// Owns its comments and its audit trail of events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub(crate) id: Option<TicketId>,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) requester: UserRef,
    pub(crate) state: State,
    pub(crate) assigned_technician: Option<UserRef>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) resolved_at: Option<DateTime<Utc>>,
    pub(crate) comments: Vec<Comment>,
    pub(crate) events: Vec<Event>,
    pub(crate) kind: TicketKind,
}

impl Ticket {
    /// Creates a new ticket in state [`State::New`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the title is shorter than
    /// [`MIN_TITLE_LEN`] or the description shorter than
    /// [`MIN_DESCRIPTION_LEN`] characters.
    pub fn new(
        id: Option<TicketId>,
        title: impl Into<String>,
        description: impl Into<String>,
        requester: &User,
        kind: TicketKind,
    ) -> Result<Self, Error> {
        let title = title.into();
        let description = description.into();
        validate_details(&title, &description)?;

        Ok(Self {
            id,
            title,
            description,
            requester: requester.to_ref(),
            state: State::New,
            assigned_technician: None,
            created_at: Utc::now(),
            resolved_at: None,
            comments: Vec::new(),
            events: Vec::new(),
            kind,
        })
    }

    /// Creates a new incident.
    ///
    /// # Errors
    ///
    /// See [`Ticket::new`].
    pub fn incident(
        id: Option<TicketId>,
        title: impl Into<String>,
        description: impl Into<String>,
        requester: &User,
        urgency: Urgency,
        category: IncidentCategory,
    ) -> Result<Self, Error> {
        Self::new(
            id,
            title,
            description,
            requester,
            TicketKind::Incident { urgency, category },
        )
    }

    /// Creates a new service request.
    ///
    /// # Errors
    ///
    /// See [`Ticket::new`].
    pub fn service_request(
        id: Option<TicketId>,
        title: impl Into<String>,
        description: impl Into<String>,
        requester: &User,
        category: RequestCategory,
    ) -> Result<Self, Error> {
        Self::new(
            id,
            title,
            description,
            requester,
            TicketKind::ServiceRequest { category },
        )
    }

    // --- accessors ---

    /// The persisted id, if saved.
    #[must_use]
    pub const fn id(&self) -> Option<TicketId> {
        self.id
    }

    /// The title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The requester who filed the ticket. Never changes.
    #[must_use]
    pub const fn requester(&self) -> &UserRef {
        &self.requester
    }

    /// The current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> State {
        self.state
    }

    /// The technician currently assigned, if any.
    #[must_use]
    pub const fn assigned_technician(&self) -> Option<&UserRef> {
        self.assigned_technician.as_ref()
    }

    /// When the ticket was created.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the ticket was resolved. Cleared on reopening.
    #[must_use]
    pub const fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    /// Comments, in insertion order.
    #[must_use]
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    /// Events, in insertion order. See [`Ticket::history`] for time order.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Subtype-specific data.
    #[must_use]
    pub const fn kind(&self) -> TicketKind {
        self.kind
    }

    /// The subtype discriminant.
    #[must_use]
    pub const fn ticket_type(&self) -> TicketType {
        self.kind.ticket_type()
    }

    /// The wire spelling of the category.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        self.kind.category()
    }

    /// The incident urgency, if this is an incident.
    #[must_use]
    pub const fn urgency(&self) -> Option<Urgency> {
        match self.kind {
            TicketKind::Incident { urgency, .. } => Some(urgency),
            TicketKind::ServiceRequest { .. } => None,
        }
    }

    /// Whether this is an incident of critical urgency.
    #[must_use]
    pub fn is_critical(&self) -> bool {
        self.urgency() == Some(Urgency::Critical)
    }

    /// Whether this is a service activation request.
    #[must_use]
    pub const fn is_activation(&self) -> bool {
        matches!(
            self.kind,
            TicketKind::ServiceRequest {
                category: RequestCategory::Activation
            }
        )
    }

    /// Whether this is a service cancellation request.
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(
            self.kind,
            TicketKind::ServiceRequest {
                category: RequestCategory::Cancellation
            }
        )
    }

    // --- lifecycle ---

    /// Assigns a technician, moving the ticket to [`State::Assigned`].
    ///
    /// Assigning the same technician twice from `Assigned` is allowed and has
    /// no further effect. The roles of `technician` and `operator` are the
    /// caller's to check.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless the ticket is `New` or
    /// `Assigned`.
    pub fn assign_technician(&mut self, technician: &User, operator: &User) -> Result<(), Error> {
        if !matches!(self.state, State::New | State::Assigned) {
            return Err(Error::invalid_state(format!(
                "cannot assign a technician in state {}",
                self.state
            )));
        }

        tracing::trace!(operator = operator.name(), "assignment accepted");
        self.assigned_technician = Some(technician.to_ref());
        self.state = State::Assigned;
        Ok(())
    }

    /// Replaces the assigned technician. The state is unchanged.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] if no technician is assigned
    /// - [`Error::Validation`] if the new technician is the current one
    pub fn reassign_technician(&mut self, technician: &User, operator: &User) -> Result<(), Error> {
        let Some(current) = &self.assigned_technician else {
            return Err(Error::invalid_state("no technician assigned to reassign"));
        };
        if technician.is(current) {
            return Err(Error::validation(
                "the new technician must differ from the current one",
            ));
        }

        tracing::trace!(operator = operator.name(), "reassignment accepted");
        self.assigned_technician = Some(technician.to_ref());
        Ok(())
    }

    /// Hands the ticket to another technician for interconsultation, moving
    /// it to [`State::InProgress`].
    ///
    /// Only the assigned technician may derive. The assignment itself is not
    /// changed; the reason is recorded by the caller in the derivation event.
    ///
    /// # Errors
    ///
    /// - [`Error::PermissionDenied`] if `origin` is not the assigned
    ///   technician
    /// - [`Error::Validation`] if `destination` is `origin`
    pub fn derive_to_technician(
        &mut self,
        destination: &User,
        origin: &User,
        reason: &str,
    ) -> Result<(), Error> {
        if !self.is_assigned_to(origin) {
            return Err(Error::permission_denied(
                "only the assigned technician can derive the ticket",
            ));
        }
        if destination.is(&origin.to_ref()) {
            return Err(Error::validation("cannot derive to the same technician"));
        }

        tracing::trace!(reason, "derivation accepted");
        self.state = State::InProgress;
        Ok(())
    }

    /// Marks the ticket resolved now.
    ///
    /// # Errors
    ///
    /// - [`Error::PermissionDenied`] if `technician` is not the assigned
    ///   technician
    /// - [`Error::InvalidState`] if the ticket is already resolved
    pub fn resolve(&mut self, technician: &User) -> Result<(), Error> {
        self.resolve_at(technician, Utc::now())
    }

    /// Marks the ticket resolved at the given instant.
    ///
    /// # Errors
    ///
    /// See [`Ticket::resolve`].
    pub fn resolve_at(&mut self, technician: &User, at: DateTime<Utc>) -> Result<(), Error> {
        if !self.is_assigned_to(technician) {
            return Err(Error::permission_denied(
                "only the assigned technician can resolve the ticket",
            ));
        }
        if self.state == State::Resolved {
            return Err(Error::invalid_state("the ticket is already resolved"));
        }

        self.state = State::Resolved;
        self.resolved_at = Some(at);
        Ok(())
    }

    /// Reopens a resolved ticket, clearing its resolution time.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] unless the ticket is resolved
    /// - [`Error::Validation`] if the reason is shorter than
    ///   [`MIN_REOPEN_REASON_LEN`] characters
    pub fn reopen(&mut self, user: &User, reason: &str) -> Result<(), Error> {
        if self.state != State::Resolved {
            return Err(Error::invalid_state(
                "only resolved tickets can be reopened",
            ));
        }
        if reason.chars().count() < MIN_REOPEN_REASON_LEN {
            return Err(Error::validation(format!(
                "the reason must be at least {MIN_REOPEN_REASON_LEN} characters long"
            )));
        }

        tracing::trace!(user = user.name(), "reopening accepted");
        self.state = State::Reopened;
        self.resolved_at = None;
        Ok(())
    }

    /// Appends a comment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the ticket is resolved.
    pub fn add_comment(&mut self, comment: Comment) -> Result<(), Error> {
        if self.state == State::Resolved {
            return Err(Error::invalid_state(
                "cannot comment on a resolved ticket",
            ));
        }
        self.comments.push(comment);
        Ok(())
    }

    /// Appends an event to the audit trail.
    pub fn add_event(&mut self, event: Event) {
        self.events.push(event);
    }

    // --- derived values ---

    /// Whole days since creation, as of `now`.
    #[must_use]
    pub fn days_since_creation_at(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days()
    }

    /// Whole days since creation.
    #[must_use]
    pub fn days_since_creation(&self) -> i64 {
        self.days_since_creation_at(Utc::now())
    }

    /// Priority score as of `now`; higher is more urgent.
    ///
    /// Incidents score their urgency weight plus their age in days. Service
    /// requests are queued purely by age.
    #[must_use]
    pub fn priority_at(&self, now: DateTime<Utc>) -> i64 {
        let days = self.days_since_creation_at(now);
        match self.kind {
            TicketKind::Incident { urgency, .. } => urgency.weight() + days,
            TicketKind::ServiceRequest { .. } => days,
        }
    }

    /// Priority score as of now.
    #[must_use]
    pub fn priority(&self) -> i64 {
        self.priority_at(Utc::now())
    }

    /// Time from creation to resolution, or `None` if unresolved.
    #[must_use]
    pub fn resolution_time(&self) -> Option<ResolutionTime> {
        let resolved_at = self.resolved_at?;
        let hours = (resolved_at - self.created_at).num_hours();
        Some(ResolutionTime::from_hours(hours))
    }

    /// The audit trail sorted by time, oldest first.
    ///
    /// The sort is stable; events with equal timestamps keep insertion order.
    #[must_use]
    pub fn history(&self) -> Vec<&Event> {
        let mut events: Vec<&Event> = self.events.iter().collect();
        events.sort_by_key(|event| event.occurred_at());
        events
    }

    fn is_assigned_to(&self, user: &User) -> bool {
        self.assigned_technician
            .as_ref()
            .is_some_and(|assigned| user.is(assigned))
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{} #{id}: {}", self.ticket_type(), self.title),
            None => write!(f, "{} (unsaved): {}", self.ticket_type(), self.title),
        }
    }
}

pub(crate) fn validate_details(title: &str, description: &str) -> Result<(), Error> {
    validate_text(title, MIN_TITLE_LEN, "title")?;
    validate_text(description, MIN_DESCRIPTION_LEN, "description")
}

fn validate_text(value: &str, min: usize, field: &str) -> Result<(), Error> {
    if value.chars().count() < min {
        return Err(Error::validation(format!(
            "the {field} must be at least {min} characters long"
        )));
    }
    Ok(())
}
