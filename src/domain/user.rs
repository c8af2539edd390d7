//! Users and the role-based permission predicates that gate every desk
//! operation.

use std::{collections::BTreeSet, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Email, Error, Service, ServiceKind, Ticket, UserId};

/// The capability set a user holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UserKind {
    /// Files tickets and owns services.
    #[serde(rename = "SOLICITANTE")]
    Requester,
    /// Staff that assigns technicians.
    #[serde(rename = "OPERADOR")]
    Operator,
    /// Staff that resolves and derives assigned tickets.
    #[serde(rename = "TECNICO")]
    Technician,
    /// Monitors operators and technicians.
    #[serde(rename = "SUPERVISOR")]
    Supervisor,
}

impl UserKind {
    /// Whether the kind is a support-staff role that requires a corporate
    /// email.
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Operator | Self::Technician)
    }

    /// The wire spelling of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requester => "SOLICITANTE",
            Self::Operator => "OPERADOR",
            Self::Technician => "TECNICO",
            Self::Supervisor => "SUPERVISOR",
        }
    }
}

impl fmt::Display for UserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Variant-specific state of a [`User`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// An end customer.
    Requester {
        /// Services the requester is subscribed to.
        services: Vec<Service>,
    },
    /// Support staff that triages and assigns.
    Operator,
    /// Support staff that works tickets.
    Technician {
        /// Free-form specialty labels.
        specialties: BTreeSet<String>,
    },
    /// Monitors a set of operators and technicians.
    Supervisor {
        /// Ids of supervised operators.
        operators: BTreeSet<UserId>,
        /// Ids of supervised technicians.
        technicians: BTreeSet<UserId>,
    },
}

impl Role {
    /// The discriminant of this role.
    #[must_use]
    pub const fn kind(&self) -> UserKind {
        match self {
            Self::Requester { .. } => UserKind::Requester,
            Self::Operator => UserKind::Operator,
            Self::Technician { .. } => UserKind::Technician,
            Self::Supervisor { .. } => UserKind::Supervisor,
        }
    }
}

/// A registered user of the help desk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub(crate) id: Option<UserId>,
    pub(crate) name: String,
    pub(crate) email: Email,
    pub(crate) password_hash: String,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) last_access: Option<DateTime<Utc>>,
    pub(crate) role: Role,
}

impl User {
    /// Creates a user with the given role.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEmail`] if the role is a staff role and the
    /// email is not corporate.
    pub fn new(
        id: Option<UserId>,
        name: impl Into<String>,
        email: Email,
        password_hash: impl Into<String>,
        role: Role,
    ) -> Result<Self, Error> {
        if role.kind().is_staff() && !email.is_corporate() {
            return Err(Error::InvalidEmail(format!(
                "staff must use a corporate address, got '{email}'"
            )));
        }

        Ok(Self {
            id,
            name: name.into(),
            email,
            password_hash: password_hash.into(),
            created_at: Utc::now(),
            last_access: None,
            role,
        })
    }

    /// Creates a requester with no subscribed services.
    #[must_use]
    pub fn requester(
        id: Option<UserId>,
        name: impl Into<String>,
        email: Email,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            email,
            password_hash: password_hash.into(),
            created_at: Utc::now(),
            last_access: None,
            role: Role::Requester {
                services: Vec::new(),
            },
        }
    }

    /// Creates an operator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEmail`] if the email is not corporate.
    pub fn operator(
        id: Option<UserId>,
        name: impl Into<String>,
        email: Email,
        password_hash: impl Into<String>,
    ) -> Result<Self, Error> {
        Self::new(id, name, email, password_hash, Role::Operator)
    }

    /// Creates a technician with the given specialties.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEmail`] if the email is not corporate.
    pub fn technician(
        id: Option<UserId>,
        name: impl Into<String>,
        email: Email,
        password_hash: impl Into<String>,
        specialties: impl IntoIterator<Item = String>,
    ) -> Result<Self, Error> {
        Self::new(
            id,
            name,
            email,
            password_hash,
            Role::Technician {
                specialties: specialties.into_iter().collect(),
            },
        )
    }

    /// Creates a supervisor with no supervisees.
    #[must_use]
    pub fn supervisor(
        id: Option<UserId>,
        name: impl Into<String>,
        email: Email,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            email,
            password_hash: password_hash.into(),
            created_at: Utc::now(),
            last_access: None,
            role: Role::Supervisor {
                operators: BTreeSet::new(),
                technicians: BTreeSet::new(),
            },
        }
    }

    /// The persisted id, if the user has been saved.
    #[must_use]
    pub const fn id(&self) -> Option<UserId> {
        self.id
    }

    /// The display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The email address.
    #[must_use]
    pub const fn email(&self) -> &Email {
        &self.email
    }

    /// The stored password hash.
    #[must_use]
    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    /// When the user was created.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the user last accessed the desk.
    #[must_use]
    pub const fn last_access(&self) -> Option<DateTime<Utc>> {
        self.last_access
    }

    /// The variant-specific state.
    #[must_use]
    pub const fn role(&self) -> &Role {
        &self.role
    }

    /// The role discriminant.
    #[must_use]
    pub const fn kind(&self) -> UserKind {
        self.role.kind()
    }

    /// A lightweight reference suitable for embedding in tickets and events.
    #[must_use]
    pub fn to_ref(&self) -> UserRef {
        UserRef {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind(),
        }
    }

    /// Whether this user and `other` are the same persisted user.
    ///
    /// Unsaved users never match anything.
    #[must_use]
    pub fn is(&self, other: &UserRef) -> bool {
        self.id.is_some() && self.id == other.id
    }

    /// Records an access at the current time.
    pub fn touch_last_access(&mut self) {
        self.last_access = Some(Utc::now());
    }

    /// Changes the display name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::User`] if the new name is shorter than three
    /// characters.
    pub fn rename(&mut self, name: impl Into<String>) -> Result<(), Error> {
        let name = name.into();
        if name.chars().count() < 3 {
            return Err(Error::User(
                "name must be at least 3 characters long".to_string(),
            ));
        }
        self.name = name;
        Ok(())
    }

    // --- permission predicates ---

    /// Whether the user may view the ticket.
    #[must_use]
    pub fn can_view(&self, ticket: &Ticket) -> bool {
        match self.role {
            Role::Requester { .. } => self.is(ticket.requester()),
            Role::Operator | Role::Supervisor { .. } => true,
            Role::Technician { .. } => ticket
                .assigned_technician()
                .is_some_and(|assigned| self.is(assigned)),
        }
    }

    /// Whether the user may comment on the ticket.
    #[must_use]
    pub fn can_comment(&self, ticket: &Ticket) -> bool {
        match self.role {
            Role::Supervisor { .. } => false,
            _ => self.can_view(ticket),
        }
    }

    /// Whether the user may assign technicians.
    #[must_use]
    pub const fn can_assign(&self) -> bool {
        matches!(self.role, Role::Operator)
    }

    /// Whether the user may reassign technicians.
    #[must_use]
    pub const fn can_reassign(&self) -> bool {
        self.can_assign()
    }

    /// Whether the user may resolve the ticket.
    #[must_use]
    pub fn can_resolve(&self, ticket: &Ticket) -> bool {
        matches!(self.role, Role::Technician { .. }) && self.can_view(ticket)
    }

    /// Whether the user may derive the ticket to another technician.
    #[must_use]
    pub fn can_derive(&self, ticket: &Ticket) -> bool {
        self.can_resolve(ticket)
    }

    // --- requester ---

    /// The services a requester subscribes to. Empty for other roles.
    #[must_use]
    pub fn services(&self) -> &[Service] {
        match &self.role {
            Role::Requester { services } => services.as_slice(),
            _ => &[],
        }
    }

    /// Whether a requester subscribes to a service of the given kind.
    #[must_use]
    pub fn has_service(&self, kind: ServiceKind) -> bool {
        self.services().iter().any(|s| s.kind() == kind)
    }

    /// Adds a service to a requester's subscriptions.
    ///
    /// Returns `false` if an equal service was already present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::User`] if the user is not a requester.
    pub fn add_service(&mut self, service: Service) -> Result<bool, Error> {
        let Role::Requester { services } = &mut self.role else {
            return Err(Error::User(format!(
                "only requesters subscribe to services, not {}",
                self.role.kind()
            )));
        };
        if services.contains(&service) {
            return Ok(false);
        }
        services.push(service);
        Ok(true)
    }

    // --- technician ---

    /// A technician's specialties. Empty for other roles.
    pub fn specialties(&self) -> impl Iterator<Item = &str> {
        let specialties = match &self.role {
            Role::Technician { specialties } => Some(specialties),
            _ => None,
        };
        specialties.into_iter().flatten().map(String::as_str)
    }

    /// Whether a technician has the given specialty.
    #[must_use]
    pub fn has_specialty(&self, specialty: &str) -> bool {
        self.specialties().any(|s| s == specialty)
    }

    /// Adds a specialty to a technician.
    ///
    /// Returns `false` if it was already present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::User`] if the user is not a technician.
    pub fn add_specialty(&mut self, specialty: impl Into<String>) -> Result<bool, Error> {
        match &mut self.role {
            Role::Technician { specialties } => Ok(specialties.insert(specialty.into())),
            role => Err(Error::User(format!(
                "only technicians have specialties, not {}",
                role.kind()
            ))),
        }
    }

    // --- supervisor ---

    /// Whether this supervisor supervises `employee`.
    ///
    /// Operators are matched against the supervised-operator set and
    /// technicians against the supervised-technician set. Always `false` for
    /// non-supervisors and for other employee roles.
    #[must_use]
    pub fn supervises(&self, employee: &User) -> bool {
        let (Role::Supervisor {
            operators,
            technicians,
        }, Some(id)) = (&self.role, employee.id)
        else {
            return false;
        };
        match employee.kind() {
            UserKind::Operator => operators.contains(&id),
            UserKind::Technician => technicians.contains(&id),
            UserKind::Requester | UserKind::Supervisor => false,
        }
    }

    /// Whether the id appears in either of this supervisor's supervised sets.
    #[must_use]
    pub fn supervises_id(&self, id: UserId) -> bool {
        match &self.role {
            Role::Supervisor {
                operators,
                technicians,
            } => operators.contains(&id) || technicians.contains(&id),
            _ => false,
        }
    }

    /// Adds an operator or technician to this supervisor's supervised sets.
    ///
    /// Returns `false` if the employee was already supervised.
    ///
    /// # Errors
    ///
    /// - [`Error::User`] if this user is not a supervisor
    /// - [`Error::Validation`] if the employee is unsaved or is not an
    ///   operator or technician
    pub fn add_supervisee(&mut self, employee: &User) -> Result<bool, Error> {
        let Role::Supervisor {
            operators,
            technicians,
        } = &mut self.role
        else {
            return Err(Error::User(format!(
                "only supervisors supervise employees, not {}",
                self.role.kind()
            )));
        };
        let Some(id) = employee.id else {
            return Err(Error::validation("cannot supervise an unsaved user"));
        };
        match employee.kind() {
            UserKind::Operator => Ok(operators.insert(id)),
            UserKind::Technician => Ok(technicians.insert(id)),
            kind => Err(Error::validation(format!(
                "only operators and technicians can be supervised, not {kind}"
            ))),
        }
    }

    /// Ids of the operators this supervisor supervises.
    pub fn supervised_operators(&self) -> impl Iterator<Item = UserId> + '_ {
        let set = match &self.role {
            Role::Supervisor { operators, .. } => Some(operators),
            _ => None,
        };
        set.into_iter().flatten().copied()
    }

    /// Ids of the technicians this supervisor supervises.
    pub fn supervised_technicians(&self) -> impl Iterator<Item = UserId> + '_ {
        let set = match &self.role {
            Role::Supervisor { technicians, .. } => Some(technicians),
            _ => None,
        };
        set.into_iter().flatten().copied()
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.email)
    }
}

/// A snapshot of a user's identity, embedded in tickets, comments and events.
///
/// Users are referenced, not owned, by the entities that mention them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    /// The referenced user's id.
    pub id: Option<UserId>,
    /// The user's name at the time the reference was taken.
    pub name: String,
    /// The user's role.
    pub kind: UserKind,
}

impl UserRef {
    /// Whether both references point at the same persisted user.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self.id.is_some() && self.id == other.id
    }
}

impl From<&User> for UserRef {
    fn from(user: &User) -> Self {
        user.to_ref()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::{IncidentCategory, Ticket, Urgency};

    pub(crate) fn requester(id: UserId) -> User {
        User::requester(
            Some(id),
            "Rita Requester",
            Email::new(format!("rita{id}@example.com")).unwrap(),
            "hash",
        )
    }

    pub(crate) fn operator(id: UserId) -> User {
        User::operator(
            Some(id),
            "Oscar Operator",
            Email::new(format!("oscar{id}@comunicarlos.com.ar")).unwrap(),
            "hash",
        )
        .unwrap()
    }

    pub(crate) fn technician(id: UserId) -> User {
        User::technician(
            Some(id),
            format!("Tomas Tech {id}"),
            Email::new(format!("tomas{id}@comunicarlos.com.ar")).unwrap(),
            "hash",
            ["fibra".to_string()],
        )
        .unwrap()
    }

    pub(crate) fn supervisor(id: UserId) -> User {
        User::supervisor(
            Some(id),
            "Sara Supervisor",
            Email::new(format!("sara{id}@comunicarlos.com.ar")).unwrap(),
            "hash",
        )
    }

    fn ticket_for(owner: &User) -> Ticket {
        Ticket::incident(
            Some(100),
            "No internet",
            "The connection has been down since morning",
            owner,
            Urgency::Important,
            IncidentCategory::ServiceUnreachable,
        )
        .unwrap()
    }

    #[test]
    fn staff_require_corporate_email() {
        let email = Email::new("oscar@gmail.com").unwrap();
        assert!(matches!(
            User::operator(None, "Oscar", email.clone(), "h"),
            Err(Error::InvalidEmail(_))
        ));
        assert!(matches!(
            User::technician(None, "Tomas", email.clone(), "h", Vec::new()),
            Err(Error::InvalidEmail(_))
        ));
        // requesters and supervisors have no such constraint
        User::requester(None, "Rita", email.clone(), "h");
        User::supervisor(None, "Sara", email, "h");
    }

    #[test]
    fn requester_sees_only_own_tickets() {
        let owner = requester(1);
        let stranger = requester(2);
        let ticket = ticket_for(&owner);

        assert!(owner.can_view(&ticket));
        assert!(owner.can_comment(&ticket));
        assert!(!stranger.can_view(&ticket));
        assert!(!stranger.can_comment(&ticket));
    }

    #[test]
    fn operator_sees_everything_and_assigns() {
        let op = operator(3);
        let ticket = ticket_for(&requester(1));
        assert!(op.can_view(&ticket));
        assert!(op.can_comment(&ticket));
        assert!(op.can_assign());
        assert!(op.can_reassign());
        assert!(!op.can_resolve(&ticket));
    }

    #[test]
    fn technician_sees_only_assigned_tickets() {
        let op = operator(3);
        let assigned = technician(4);
        let other = technician(5);
        let mut ticket = ticket_for(&requester(1));

        assert!(!assigned.can_view(&ticket));

        ticket.assign_technician(&assigned, &op).unwrap();

        assert!(assigned.can_view(&ticket));
        assert!(assigned.can_comment(&ticket));
        assert!(assigned.can_resolve(&ticket));
        assert!(assigned.can_derive(&ticket));
        assert!(!assigned.can_assign());

        assert!(!other.can_view(&ticket));
        assert!(!other.can_resolve(&ticket));
    }

    #[test]
    fn supervisor_views_but_never_comments() {
        let sup = supervisor(6);
        let ticket = ticket_for(&requester(1));
        assert!(sup.can_view(&ticket));
        assert!(!sup.can_comment(&ticket));
    }

    #[test]
    fn supervision_is_role_aware() {
        let mut sup = supervisor(6);
        let op = operator(3);
        let tech = technician(4);

        assert!(sup.add_supervisee(&op).unwrap());
        assert!(!sup.add_supervisee(&op).unwrap());

        assert!(sup.supervises(&op));
        assert!(!sup.supervises(&tech));
        assert!(sup.supervises_id(3));

        sup.add_supervisee(&tech).unwrap();
        assert!(sup.supervises(&tech));
        assert_eq!(sup.supervised_operators().collect::<Vec<_>>(), vec![3]);
        assert_eq!(sup.supervised_technicians().collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn cannot_supervise_requesters() {
        let mut sup = supervisor(6);
        assert!(matches!(
            sup.add_supervisee(&requester(1)),
            Err(Error::Validation(_))
        ));
        let mut op = operator(3);
        assert!(matches!(
            op.add_supervisee(&technician(4)),
            Err(Error::User(_))
        ));
    }

    #[test]
    fn rename_requires_three_characters() {
        let mut user = requester(1);
        assert!(matches!(user.rename("Al"), Err(Error::User(_))));
        user.rename("Alba").unwrap();
        assert_eq!(user.name(), "Alba");
    }

    #[test]
    fn specialties() {
        let mut tech = technician(4);
        assert!(tech.has_specialty("fibra"));
        assert!(tech.add_specialty("movil").unwrap());
        assert!(!tech.add_specialty("movil").unwrap());
        assert!(tech.has_specialty("movil"));
        assert!(requester(1).add_specialty("x").is_err());
    }

    #[test]
    fn unsaved_users_never_match() {
        let a = User::requester(None, "A", Email::new("a@example.com").unwrap(), "h");
        let b = User::requester(None, "B", Email::new("b@example.com").unwrap(), "h");
        assert!(!a.is(&b.to_ref()));
        assert!(!a.to_ref().same_as(&b.to_ref()));
    }
}
