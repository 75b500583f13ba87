//! One-time-code authentication.
//!
//! There is no account backend: [`OtpAuthService::request_code`] issues a
//! 6-digit code and hands it back for "delivery" (the CLI prints it), and
//! [`OtpAuthService::verify`] exchanges it for a [`Session`] with a random
//! bearer token. Pending codes live in memory only.

mod error;

pub use error::AuthError;

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use bazaar_core::{Email, UserId};

use crate::config::OtpConfig;
use crate::models::{CurrentUser, Session};

/// Digits in a login code.
const CODE_LENGTH: usize = 6;

/// Random bytes in a bearer token.
const TOKEN_BYTES: usize = 32;

/// A code issued to an email address.
pub struct IssuedCode {
    pub email: Email,
    code: SecretString,
    pub expires_at: DateTime<Utc>,
}

impl IssuedCode {
    /// The code to deliver to the user.
    #[must_use]
    pub fn code(&self) -> &str {
        self.code.expose_secret()
    }
}

impl std::fmt::Debug for IssuedCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedCode")
            .field("email", &self.email.masked())
            .field("code", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

struct PendingCode {
    code: SecretString,
    expires_at: DateTime<Utc>,
    failed_attempts: u32,
}

/// Mocked passwordless login.
pub struct OtpAuthService {
    config: OtpConfig,
    pending: Mutex<HashMap<Email, PendingCode>>,
}

impl OtpAuthService {
    #[must_use]
    pub fn new(config: OtpConfig) -> Self {
        Self {
            config,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a fresh code for `email`, replacing any earlier one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    #[instrument(skip_all)]
    pub fn request_code(&self, email: &str) -> Result<IssuedCode, AuthError> {
        let email = Email::parse(email)?;
        let code = generate_code();
        let expires_at = self.expiry(Utc::now());

        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                email.clone(),
                PendingCode {
                    code: SecretString::from(code.clone()),
                    expires_at,
                    failed_attempts: 0,
                },
            );

        tracing::info!(email = %email.masked(), %expires_at, "Login code issued");
        Ok(IssuedCode {
            email,
            code: SecretString::from(code),
            expires_at,
        })
    }

    /// Exchange a code for a session. A matching or expired code is consumed.
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidEmail` if the email format is invalid
    /// - `AuthError::NoPendingCode` if no code was requested
    /// - `AuthError::CodeExpired` if the code's lifetime has passed
    /// - `AuthError::InvalidCode` on a wrong guess
    /// - `AuthError::TooManyAttempts` once the guess limit is reached
    #[instrument(skip_all)]
    pub fn verify(&self, email: &str, code: &str) -> Result<Session, AuthError> {
        let email = Email::parse(email)?;
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);

        let entry = pending.get_mut(&email).ok_or(AuthError::NoPendingCode)?;

        if Utc::now() >= entry.expires_at {
            pending.remove(&email);
            return Err(AuthError::CodeExpired);
        }

        if entry.code.expose_secret() != code.trim() {
            entry.failed_attempts += 1;
            if entry.failed_attempts >= self.config.max_attempts {
                pending.remove(&email);
                tracing::warn!(email = %email.masked(), "Login code burned after repeated failures");
                return Err(AuthError::TooManyAttempts);
            }
            return Err(AuthError::InvalidCode);
        }

        pending.remove(&email);
        drop(pending);

        let user = CurrentUser {
            id: UserId::generate(),
            email,
        };
        tracing::info!(user_id = %user.id, "User signed in");
        Ok(Session::new(user, SecretString::from(generate_token())))
    }

    fn expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        TimeDelta::from_std(self.config.ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Zero-padded numeric code.
fn generate_code() -> String {
    let n: u32 = rand::rng().random_range(0..1_000_000);
    format!("{n:06}")
}

/// URL-safe random bearer token.
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn service() -> OtpAuthService {
        OtpAuthService::new(OtpConfig::default())
    }

    #[test]
    fn test_code_is_six_digits() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(URL_SAFE_NO_PAD.decode(&a).unwrap().len(), TOKEN_BYTES);
    }

    #[test]
    fn test_verify_issues_session() {
        let auth = service();
        let issued = auth.request_code(" Shopper@Example.com ").unwrap();

        let session = auth.verify("shopper@example.com", issued.code()).unwrap();
        assert_eq!(session.user.email.as_str(), "shopper@example.com");
        assert!(!session.bearer_token().is_empty());
    }

    #[test]
    fn test_code_is_single_use() {
        let auth = service();
        let issued = auth.request_code("shopper@example.com").unwrap();
        auth.verify("shopper@example.com", issued.code()).unwrap();

        assert_eq!(
            auth.verify("shopper@example.com", issued.code()).unwrap_err(),
            AuthError::NoPendingCode
        );
    }

    #[test]
    fn test_wrong_code_then_burn() {
        let auth = OtpAuthService::new(OtpConfig {
            max_attempts: 2,
            ..OtpConfig::default()
        });
        let issued = auth.request_code("shopper@example.com").unwrap();

        assert_eq!(
            auth.verify("shopper@example.com", "nope").unwrap_err(),
            AuthError::InvalidCode
        );
        assert_eq!(
            auth.verify("shopper@example.com", "nope").unwrap_err(),
            AuthError::TooManyAttempts
        );
        // The correct code no longer works either
        assert_eq!(
            auth.verify("shopper@example.com", issued.code()).unwrap_err(),
            AuthError::NoPendingCode
        );
    }

    #[test]
    fn test_expired_code() {
        let auth = OtpAuthService::new(OtpConfig {
            ttl: Duration::ZERO,
            ..OtpConfig::default()
        });
        let issued = auth.request_code("shopper@example.com").unwrap();

        assert_eq!(
            auth.verify("shopper@example.com", issued.code()).unwrap_err(),
            AuthError::CodeExpired
        );
    }

    #[test]
    fn test_new_request_replaces_old_code() {
        let auth = service();
        let first = auth.request_code("shopper@example.com").unwrap();
        let second = auth.request_code("shopper@example.com").unwrap();

        if first.code() != second.code() {
            assert_eq!(
                auth.verify("shopper@example.com", first.code()).unwrap_err(),
                AuthError::InvalidCode
            );
        }
        assert!(auth.verify("shopper@example.com", second.code()).is_ok());
    }

    #[test]
    fn test_invalid_email_rejected() {
        let auth = service();
        assert!(matches!(
            auth.request_code("not-an-email"),
            Err(AuthError::InvalidEmail(_))
        ));
        assert_eq!(
            auth.verify("nobody@example.com", "123456").unwrap_err(),
            AuthError::NoPendingCode
        );
    }

    #[test]
    fn test_issued_code_debug_is_redacted() {
        let issued = service().request_code("shopper@example.com").unwrap();
        let debug = format!("{issued:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains(&format!("\"{}\"", issued.code())));
        assert!(!debug.contains("shopper@"));
    }
}
