use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Error, ServiceId, UserId};

/// The kinds of service a requester can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ServiceKind {
    /// Mobile telephony.
    #[serde(rename = "TELEFONIA_CELULAR")]
    MobilePhone,
    /// Broadband internet.
    #[serde(rename = "INTERNET_BANDA_ANCHA")]
    Broadband,
    /// Television.
    #[serde(rename = "TELEVISION")]
    Television,
}

impl ServiceKind {
    /// The wire spelling of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MobilePhone => "TELEFONIA_CELULAR",
            Self::Broadband => "INTERNET_BANDA_ANCHA",
            Self::Television => "TELEVISION",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A service subscribed by a requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub(crate) id: Option<ServiceId>,
    pub(crate) kind: ServiceKind,
    pub(crate) number: String,
    pub(crate) owner: UserId,
    pub(crate) active: bool,
    pub(crate) activated_at: DateTime<Utc>,
}

impl Service {
    /// Creates an active service activated now.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Service`] if the service number is shorter than five
    /// characters.
    pub fn new(
        id: Option<ServiceId>,
        kind: ServiceKind,
        number: impl Into<String>,
        owner: UserId,
    ) -> Result<Self, Error> {
        let number = number.into();
        if number.chars().count() < 5 {
            return Err(Error::Service(
                "service number must be at least 5 characters long".to_string(),
            ));
        }
        Ok(Self {
            id,
            kind,
            number,
            owner,
            active: true,
            activated_at: Utc::now(),
        })
    }

    /// The persisted id, if saved.
    #[must_use]
    pub const fn id(&self) -> Option<ServiceId> {
        self.id
    }

    /// The service kind.
    #[must_use]
    pub const fn kind(&self) -> ServiceKind {
        self.kind
    }

    /// The service (line, account) number.
    #[must_use]
    pub fn number(&self) -> &str {
        &self.number
    }

    /// The owning requester.
    #[must_use]
    pub const fn owner(&self) -> UserId {
        self.owner
    }

    /// Whether the service is active.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// When the service was activated.
    #[must_use]
    pub const fn activated_at(&self) -> DateTime<Utc> {
        self.activated_at
    }

    /// Activates an inactive service.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Service`] if the service is already active.
    pub fn activate(&mut self) -> Result<(), Error> {
        if self.active {
            return Err(Error::Service("service is already active".to_string()));
        }
        self.active = true;
        Ok(())
    }

    /// Deactivates an active service.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Service`] if the service is already inactive.
    pub fn deactivate(&mut self) -> Result<(), Error> {
        if !self.active {
            return Err(Error::Service("service is already inactive".to_string()));
        }
        self.active = false;
        Ok(())
    }

    /// Whole days elapsed since activation, as of `now`.
    #[must_use]
    pub fn days_since_activation_at(&self, now: DateTime<Utc>) -> i64 {
        (now - self.activated_at).num_days()
    }

    /// Whole days elapsed since activation.
    #[must_use]
    pub fn days_since_activation(&self) -> i64 {
        self.days_since_activation_at(Utc::now())
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.active { "active" } else { "inactive" };
        write!(f, "{} ({}) - {status}", self.kind, self.number)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn number_must_have_five_characters() {
        assert!(matches!(
            Service::new(None, ServiceKind::Broadband, "1234", 1),
            Err(Error::Service(_))
        ));
        let service = Service::new(None, ServiceKind::Broadband, "12345", 1).unwrap();
        assert!(service.is_active());
    }

    #[test]
    fn activation_toggles_and_rejects_repeats() {
        let mut service = Service::new(None, ServiceKind::Television, "TV-0001", 1).unwrap();
        assert!(service.activate().is_err());
        service.deactivate().unwrap();
        assert!(!service.is_active());
        assert!(service.deactivate().is_err());
        service.activate().unwrap();
        assert!(service.is_active());
    }

    #[test]
    fn days_since_activation() {
        let service = Service::new(None, ServiceKind::MobilePhone, "11-5555-0000", 1).unwrap();
        let later = service.activated_at() + Duration::days(3) + Duration::hours(5);
        assert_eq!(service.days_since_activation_at(later), 3);
    }

    #[test]
    fn display() {
        let mut service = Service::new(None, ServiceKind::Broadband, "ACC-991", 1).unwrap();
        service.deactivate().unwrap();
        assert_eq!(service.to_string(), "INTERNET_BANDA_ANCHA (ACC-991) - inactive");
    }
}
