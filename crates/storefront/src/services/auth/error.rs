//! Authentication error types.

use thiserror::Error;

/// Errors that can occur during one-time-code login.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] bazaar_core::EmailError),

    /// Code does not match the one issued.
    #[error("invalid login code")]
    InvalidCode,

    /// Code was issued but its lifetime has passed.
    #[error("login code has expired")]
    CodeExpired,

    /// No code was requested for this email.
    #[error("no login code was requested for this email")]
    NoPendingCode,

    /// Too many wrong guesses; the code has been burned.
    #[error("too many attempts, request a new code")]
    TooManyAttempts,
}
