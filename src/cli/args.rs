//! Command-line spellings of domain enums.

use chrono::NaiveDate;
use clap::ValueEnum;
use helpdesk::{
    desk::NewService,
    domain::{IncidentCategory, RequestCategory, ServiceKind, State, TicketType, Urgency, UserKind},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UserKindArg {
    Requester,
    Operator,
    Technician,
    Supervisor,
}

impl From<UserKindArg> for UserKind {
    fn from(kind: UserKindArg) -> Self {
        match kind {
            UserKindArg::Requester => Self::Requester,
            UserKindArg::Operator => Self::Operator,
            UserKindArg::Technician => Self::Technician,
            UserKindArg::Supervisor => Self::Supervisor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ServiceKindArg {
    Mobile,
    Broadband,
    Television,
}

impl From<ServiceKindArg> for ServiceKind {
    fn from(kind: ServiceKindArg) -> Self {
        match kind {
            ServiceKindArg::Mobile => Self::MobilePhone,
            ServiceKindArg::Broadband => Self::Broadband,
            ServiceKindArg::Television => Self::Television,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StateArg {
    New,
    Assigned,
    InProgress,
    Resolved,
    Reopened,
}

impl From<StateArg> for State {
    fn from(state: StateArg) -> Self {
        match state {
            StateArg::New => Self::New,
            StateArg::Assigned => Self::Assigned,
            StateArg::InProgress => Self::InProgress,
            StateArg::Resolved => Self::Resolved,
            StateArg::Reopened => Self::Reopened,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UrgencyArg {
    Critical,
    Important,
    Minor,
}

impl From<UrgencyArg> for Urgency {
    fn from(urgency: UrgencyArg) -> Self {
        match urgency {
            UrgencyArg::Critical => Self::Critical,
            UrgencyArg::Important => Self::Important,
            UrgencyArg::Minor => Self::Minor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CategoryArg {
    Unreachable,
    SimBlocked,
    EquipmentLoss,
}

impl From<CategoryArg> for IncidentCategory {
    fn from(category: CategoryArg) -> Self {
        match category {
            CategoryArg::Unreachable => Self::ServiceUnreachable,
            CategoryArg::SimBlocked => Self::SimBlocked,
            CategoryArg::EquipmentLoss => Self::EquipmentLoss,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RequestArg {
    Activation,
    Cancellation,
}

impl From<RequestArg> for RequestCategory {
    fn from(category: RequestArg) -> Self {
        match category {
            RequestArg::Activation => Self::Activation,
            RequestArg::Cancellation => Self::Cancellation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TicketTypeArg {
    Incident,
    Request,
}

impl From<TicketTypeArg> for TicketType {
    fn from(kind: TicketTypeArg) -> Self {
        match kind {
            TicketTypeArg::Incident => Self::Incident,
            TicketTypeArg::Request => Self::ServiceRequest,
        }
    }
}

/// Parses `KIND:NUMBER`, e.g. `broadband:ACC-10001`.
pub fn parse_service(s: &str) -> Result<NewService, String> {
    let (kind, number) = s
        .split_once(':')
        .ok_or_else(|| format!("expected KIND:NUMBER, got '{s}'"))?;
    let kind = ServiceKindArg::from_str(kind.trim(), true)?;
    Ok(NewService {
        kind: kind.into(),
        number: number.trim().to_string(),
    })
}

/// Parses an ISO 8601 date (`YYYY-MM-DD`).
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("invalid date '{s}': {e}"))
}
