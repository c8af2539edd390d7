use std::collections::BTreeSet;

use tracing::instrument;

use crate::{
    desk::{Error, HelpDesk, Result},
    domain::{self, Email, Role, Service, ServiceKind, User, UserId},
    storage::{Paged, Store, UserFilter},
};

/// A service to subscribe a new requester to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewService {
    /// Which kind of service.
    pub kind: ServiceKind,
    /// The line or account number.
    pub number: String,
}

/// The role of a user being registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewRole {
    /// A requester; must subscribe to at least one service.
    Requester {
        /// Services to subscribe to.
        services: Vec<NewService>,
    },
    /// An operator.
    Operator,
    /// A technician.
    Technician {
        /// Specialty labels.
        specialties: Vec<String>,
    },
    /// A supervisor, initially supervising nobody.
    Supervisor,
}

/// A request to register a user.
///
/// The password hash is stored as given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Display name.
    pub name: String,
    /// Email address; must be unique.
    pub email: String,
    /// Opaque password hash.
    pub password_hash: String,
    /// The role to register.
    pub role: NewRole,
}

impl<S: Store> HelpDesk<'_, S> {
    /// Registers a user, and a requester's services.
    ///
    /// # Errors
    ///
    /// - [`Error::Conflict`] if the email is already registered
    /// - [`domain::Error::InvalidEmail`] if the email is malformed, or is not
    ///   corporate for an operator or technician
    /// - [`domain::Error::Validation`] if a requester registers no services
    /// - [`domain::Error::Service`] if a service number is invalid
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub fn register_user(&self, registration: Registration) -> Result<User> {
        let Registration {
            name,
            email,
            password_hash,
            role,
        } = registration;

        let email = Email::new(email)?;
        if self.store.email_exists(&email)? {
            return Err(Error::Conflict(format!("email {email} is already registered")));
        }

        let (role, services) = match role {
            NewRole::Requester { services } => {
                if services.is_empty() {
                    return Err(domain::Error::validation(
                        "a requester must subscribe to at least one service",
                    )
                    .into());
                }
                // validate every service before anything is written
                for service in &services {
                    Service::new(None, service.kind, service.number.as_str(), 0)?;
                }
                (
                    Role::Requester {
                        services: Vec::new(),
                    },
                    services,
                )
            }
            NewRole::Operator => (Role::Operator, Vec::new()),
            NewRole::Technician { specialties } => (
                Role::Technician {
                    specialties: specialties.into_iter().collect(),
                },
                Vec::new(),
            ),
            NewRole::Supervisor => (
                Role::Supervisor {
                    operators: BTreeSet::new(),
                    technicians: BTreeSet::new(),
                },
                Vec::new(),
            ),
        };

        let user = User::new(None, name, email, password_hash, role)?;
        let user = self.store.save_user(user)?;
        let Some(id) = user.id() else {
            return Ok(user);
        };

        for service in services {
            self.store
                .save_service(Service::new(None, service.kind, service.number, id)?)?;
        }

        tracing::info!(id, kind = %user.kind(), "registered user");
        self.require_user(id)
    }

    /// Looks a user up.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such user.
    pub fn user(&self, id: UserId) -> Result<User> {
        self.require_user(id)
    }

    /// Lists users in id order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn list_users(
        &self,
        filter: &UserFilter,
        page: usize,
        size: Option<usize>,
    ) -> Result<Paged<User>> {
        Ok(self.store.list_users(filter, self.page(page, size))?)
    }

    /// Makes `supervisor` supervise `employee`.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if either user is missing
    /// - [`domain::Error::User`] if `supervisor` is not a supervisor
    /// - [`domain::Error::Validation`] if `employee` is not an operator or a
    ///   technician
    #[instrument(skip(self))]
    pub fn add_supervisee(&self, supervisor: UserId, employee: UserId) -> Result<User> {
        let mut supervisor = self.require_user(supervisor)?;
        let employee = self.require_user(employee)?;
        if supervisor.add_supervisee(&employee)? {
            tracing::info!(
                supervisor = supervisor.id(),
                employee = employee.id(),
                "added supervisee"
            );
        }
        Ok(self.store.save_user(supervisor)?)
    }

    /// Records an access by the user now.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such user.
    pub fn touch_last_access(&self, id: UserId) -> Result<User> {
        let mut user = self.require_user(id)?;
        user.touch_last_access();
        Ok(self.store.save_user(user)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        desk::tests::{register, seeded},
        domain::UserKind,
        storage::{MemoryStore, ServiceStore},
    };

    fn registration(email: &str, role: NewRole) -> Registration {
        Registration {
            name: "Someone".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role,
        }
    }

    #[test]
    fn requester_is_registered_with_services() {
        let store = MemoryStore::new();
        let (desk, cast) = seeded(&store);
        let requester = desk.user(cast.requester).unwrap();
        assert_eq!(requester.kind(), UserKind::Requester);
        assert!(requester.has_service(ServiceKind::Broadband));
        assert_eq!(store.services_of(cast.requester).unwrap().len(), 1);
    }

    #[test]
    fn duplicate_email_conflicts() {
        let store = MemoryStore::new();
        let (desk, _) = seeded(&store);
        let result = desk.register_user(registration("oscar@comunicarlos.com.ar", NewRole::Operator));
        assert!(matches!(result, Err(Error::Conflict(_))));
    }

    #[test]
    fn requester_without_services_is_rejected() {
        let store = MemoryStore::new();
        let (desk, _) = seeded(&store);
        let result = desk.register_user(registration(
            "new@example.com",
            NewRole::Requester {
                services: Vec::new(),
            },
        ));
        assert!(matches!(
            result,
            Err(Error::Domain(domain::Error::Validation(_)))
        ));
    }

    #[test]
    fn invalid_service_writes_nothing() {
        let store = MemoryStore::new();
        let desk = HelpDesk::new(&store, crate::domain::Config::default());
        let result = desk.register_user(registration(
            "new@example.com",
            NewRole::Requester {
                services: vec![NewService {
                    kind: ServiceKind::Television,
                    number: "12".to_string(),
                }],
            },
        ));
        assert!(matches!(
            result,
            Err(Error::Domain(domain::Error::Service(_)))
        ));
        assert_eq!(desk.list_users(&UserFilter::default(), 1, None).unwrap().total, 0);
    }

    #[test]
    fn staff_need_corporate_email() {
        let store = MemoryStore::new();
        let (desk, _) = seeded(&store);
        let result = desk.register_user(registration(
            "tech@gmail.com",
            NewRole::Technician {
                specialties: Vec::new(),
            },
        ));
        assert!(matches!(
            result,
            Err(Error::Domain(domain::Error::InvalidEmail(_)))
        ));
    }

    #[test]
    fn supervision_is_persisted() {
        let store = MemoryStore::new();
        let (desk, cast) = seeded(&store);
        let supervisor = desk.user(cast.supervisor).unwrap();
        assert!(supervisor.supervises(&desk.user(cast.operator).unwrap()));
        assert!(!supervisor.supervises(&desk.user(cast.other_technician).unwrap()));

        assert!(matches!(
            desk.add_supervisee(cast.supervisor, cast.requester),
            Err(Error::Domain(domain::Error::Validation(_)))
        ));
        assert!(matches!(
            desk.add_supervisee(cast.operator, cast.technician),
            Err(Error::Domain(domain::Error::User(_)))
        ));
    }

    #[test]
    fn listing_filters_by_kind() {
        let store = MemoryStore::new();
        let (desk, _) = seeded(&store);
        let filter = UserFilter {
            kind: Some(UserKind::Technician),
            specialty: None,
        };
        let page = desk.list_users(&filter, 1, Some(1)).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.pages(), 2);
    }

    #[test]
    fn last_access_is_recorded() {
        let store = MemoryStore::new();
        let desk = HelpDesk::new(&store, crate::domain::Config::default());
        let id = register(&desk, "Sara", "sara@example.com", NewRole::Supervisor);
        assert!(desk.user(id).unwrap().last_access().is_none());
        assert!(desk.touch_last_access(id).unwrap().last_access().is_some());
    }
}
