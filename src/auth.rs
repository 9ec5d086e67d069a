//! Login sessions and password rotation.
//!
//! The [`AuthProvider`] trait is the seam to whatever holds the credentials.
//! [`crate::storage::LocalAuth`] is the file-backed implementation.

use std::io;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::ValidationError;

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Account identifier; recorded as the creator of new requests.
    pub user_id: Uuid,
    /// Login email.
    pub email: String,
    /// Name to show, if the account has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// When the user logged in.
    pub started: DateTime<Utc>,
}

impl Session {
    /// The display name, falling back to the email.
    #[must_use]
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }
}

/// Something that can authenticate users.
pub trait AuthProvider {
    /// Checks the credentials and opens a session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if the email is unknown or
    /// the password is wrong.
    fn login(&mut self, email: &str, password: &str) -> Result<Session, AuthError>;

    /// Ends the current session, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    fn logout(&mut self) -> Result<(), AuthError>;

    /// The current session, or `None` if nobody is logged in.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SessionExpired`] if the session is too old.
    fn current_session(&self) -> Result<Option<Session>, AuthError>;

    /// Replaces the password of the logged-in user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotAuthenticated`] without a session and
    /// [`AuthError::InvalidCredentials`] if `current` is wrong.
    fn change_password(&mut self, current: &str, new: &str) -> Result<(), AuthError>;
}

/// Errors raised by an [`AuthProvider`].
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown email or wrong password.
    #[error("incorrect email or password")]
    InvalidCredentials,

    /// The operation needs a logged-in user.
    #[error("not logged in")]
    NotAuthenticated,

    /// The session is older than the configured lifetime.
    #[error("session expired, please log in again")]
    SessionExpired,

    /// An account with this email exists already.
    #[error("an account already exists for '{0}'")]
    DuplicateAccount(String),

    /// The input was rejected before reaching the backend.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The credential files could not be read or written.
    #[error("failed to access credentials")]
    Io(#[from] io::Error),

    /// The credential files are malformed.
    #[error("malformed credentials file")]
    Yaml(#[from] serde_yaml::Error),
}

/// The password change form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordChange {
    /// The password in use.
    pub current: String,
    /// The replacement.
    pub new: String,
    /// The replacement, typed again.
    pub confirm: String,
}

impl PasswordChange {
    /// Checks the form without contacting the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the confirmation differs from the new password or
    /// the new password is shorter than `min_length` characters.
    pub fn validate(&self, min_length: usize) -> Result<(), ValidationError> {
        if self.new != self.confirm {
            return Err(ValidationError::PasswordMismatch);
        }
        check_password_length(&self.new, min_length)
    }
}

pub(crate) fn check_password_length(password: &str, min_length: usize) -> Result<(), ValidationError> {
    if password.chars().count() < min_length {
        return Err(ValidationError::PasswordTooShort(min_length));
    }
    Ok(())
}

/// Validates `change` and, if it passes, asks `auth` to apply it.
///
/// # Errors
///
/// Returns [`AuthError::Validation`] without touching the backend if the form
/// is invalid, otherwise whatever [`AuthProvider::change_password`] returns.
pub fn rotate_password<A: AuthProvider + ?Sized>(
    auth: &mut A,
    change: &PasswordChange,
    min_length: usize,
) -> Result<(), AuthError> {
    change.validate(min_length)?;
    auth.change_password(&change.current, &change.new)?;
    tracing::info!("password changed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts backend calls so tests can check validation happens first.
    #[derive(Default)]
    struct Recorder {
        changes: usize,
    }

    impl AuthProvider for Recorder {
        fn login(&mut self, _email: &str, _password: &str) -> Result<Session, AuthError> {
            Err(AuthError::InvalidCredentials)
        }

        fn logout(&mut self) -> Result<(), AuthError> {
            Ok(())
        }

        fn current_session(&self) -> Result<Option<Session>, AuthError> {
            Ok(None)
        }

        fn change_password(&mut self, _current: &str, _new: &str) -> Result<(), AuthError> {
            self.changes += 1;
            Ok(())
        }
    }

    fn change(new: &str, confirm: &str) -> PasswordChange {
        PasswordChange {
            current: "old-secret".to_string(),
            new: new.to_string(),
            confirm: confirm.to_string(),
        }
    }

    #[test]
    fn mismatched_confirmation_is_rejected_before_the_backend() {
        let mut auth = Recorder::default();
        let error = rotate_password(&mut auth, &change("abcdefgh", "abcdefgX"), 6).unwrap_err();
        assert!(matches!(
            error,
            AuthError::Validation(ValidationError::PasswordMismatch)
        ));
        assert_eq!(auth.changes, 0);
    }

    #[test]
    fn short_password_is_rejected() {
        assert_eq!(
            change("abc", "abc").validate(6),
            Err(ValidationError::PasswordTooShort(6))
        );
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        assert_eq!(change("éééééé", "éééééé").validate(6), Ok(()));
    }

    #[test]
    fn valid_change_reaches_the_backend() {
        let mut auth = Recorder::default();
        rotate_password(&mut auth, &change("abcdefgh", "abcdefgh"), 6).unwrap();
        assert_eq!(auth.changes, 1);
    }

    #[test]
    fn session_name_falls_back_to_email() {
        let session = Session {
            user_id: Uuid::new_v4(),
            email: "agent@example.com".to_string(),
            display_name: None,
            started: Utc::now(),
        };
        assert_eq!(session.name(), "agent@example.com");
    }
}
