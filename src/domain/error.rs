/// Failures raised by domain operations.
///
/// Each variant is a distinct, named condition. The domain never recovers from
/// these itself; callers decide how to surface them.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// The requested transition is not legal from the ticket's current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The acting user does not satisfy the operation's ownership constraint.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// An input value failed a structural or business-rule check.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An email address is malformed or not allowed for the user's role.
    #[error("invalid email: {0}")]
    InvalidEmail(String),

    /// A subscribed service violated one of its invariants.
    #[error("service error: {0}")]
    Service(String),

    /// A user entity violated one of its invariants.
    #[error("user error: {0}")]
    User(String),

    /// A required argument was missing or unrecognised.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    pub(crate) fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub(crate) fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
