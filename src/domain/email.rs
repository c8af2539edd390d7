use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;

use crate::domain::Error;

/// The mail domain every staff account must belong to.
pub const CORPORATE_DOMAIN: &str = "comunicarlos.com.ar";

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("email pattern is a valid regex")
});

/// A syntactically valid email address.
///
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Email(String);

impl Email {
    /// Parses and validates an email address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEmail`] if the address is malformed.
    pub fn new(value: impl Into<String>) -> Result<Self, Error> {
        let value = value.into();
        if EMAIL_PATTERN.is_match(&value) {
            Ok(Self(value))
        } else {
            Err(Error::InvalidEmail(format!("malformed address '{value}'")))
        }
    }

    /// Whether the address belongs to [`CORPORATE_DOMAIN`].
    #[must_use]
    pub fn is_corporate(&self) -> bool {
        self.is_in_domain(CORPORATE_DOMAIN)
    }

    /// Whether the address belongs to the given mail domain.
    #[must_use]
    pub fn is_in_domain(&self, domain: &str) -> bool {
        let domain = domain.trim_start_matches('@');
        self.0
            .rsplit_once('@')
            .is_some_and(|(_, host)| host == domain)
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Email {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Email {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
