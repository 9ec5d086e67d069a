//! File-backed credentials.
//!
//! Accounts live in `.backlog/accounts.yaml`, each with a random salt and the
//! SHA-256 digest of salt and password. The open session is kept in
//! `.backlog/session.yaml`.

use std::{
    io,
    path::{Path, PathBuf},
};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::instrument;
use uuid::Uuid;

use super::SETTINGS_DIR;
use crate::{
    auth::{check_password_length, AuthError, AuthProvider, Session},
    domain::Config,
};

/// Credentials stored next to the backlog.
#[derive(Debug, Clone)]
pub struct LocalAuth {
    accounts_path: PathBuf,
    session_path: PathBuf,
    session_ttl: chrono::Duration,
    min_password_length: usize,
}

impl LocalAuth {
    /// Credentials of the backlog at `root`.
    #[must_use]
    pub fn new(root: &Path, config: &Config) -> Self {
        let settings = root.join(SETTINGS_DIR);
        Self {
            accounts_path: settings.join("accounts.yaml"),
            session_path: settings.join("session.yaml"),
            session_ttl: config.session_ttl(),
            min_password_length: config.min_password_length(),
        }
    }

    /// Registers a new account and returns its identifier.
    ///
    /// Emails are compared case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::DuplicateAccount`] if the email is taken, or a
    /// validation error if the password is too short.
    #[instrument(level = "debug", skip(self, password))]
    pub fn add_account(
        &mut self,
        email: &str,
        display_name: Option<String>,
        password: &str,
    ) -> Result<Uuid, AuthError> {
        check_password_length(password, self.min_password_length)?;

        let email = normalise_email(email);
        let mut accounts = self.load_accounts()?;
        if accounts.iter().any(|account| account.email == email) {
            return Err(AuthError::DuplicateAccount(email));
        }

        let id = Uuid::new_v4();
        let salt = Uuid::new_v4().simple().to_string();
        accounts.push(Account {
            id,
            digest: digest(&salt, password),
            salt,
            email,
            display_name,
        });
        self.save_accounts(&accounts)?;
        tracing::info!("Added account {id}");
        Ok(id)
    }

    fn load_accounts(&self) -> Result<Vec<Account>, AuthError> {
        match std::fs::read_to_string(&self.accounts_path) {
            Ok(content) => {
                let AccountsFile::V1 { accounts } = serde_yaml::from_str(&content)?;
                Ok(accounts)
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(error) => Err(error.into()),
        }
    }

    fn save_accounts(&self, accounts: &[Account]) -> Result<(), AuthError> {
        let file = AccountsFile::V1 {
            accounts: accounts.to_vec(),
        };
        write_yaml(&self.accounts_path, &file)
    }
}

impl AuthProvider for LocalAuth {
    #[instrument(level = "debug", skip(self, password))]
    fn login(&mut self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = normalise_email(email);
        let accounts = self.load_accounts()?;
        let account = accounts
            .iter()
            .find(|account| account.email == email)
            .filter(|account| account.verify(password))
            .ok_or(AuthError::InvalidCredentials)?;

        let session = Session {
            user_id: account.id,
            email: account.email.clone(),
            display_name: account.display_name.clone(),
            started: Utc::now(),
        };
        write_yaml(&self.session_path, &session)?;
        tracing::info!("Logged in as {}", session.email);
        Ok(session)
    }

    fn logout(&mut self) -> Result<(), AuthError> {
        match std::fs::remove_file(&self.session_path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }

    fn current_session(&self) -> Result<Option<Session>, AuthError> {
        let content = match std::fs::read_to_string(&self.session_path) {
            Ok(content) => content,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };
        let session: Session = serde_yaml::from_str(&content)?;

        if Utc::now() - session.started >= self.session_ttl {
            tracing::debug!(
                "Session of {} started at {} has expired",
                session.email,
                session.started
            );
            return Err(AuthError::SessionExpired);
        }
        Ok(Some(session))
    }

    #[instrument(level = "debug", skip_all)]
    fn change_password(&mut self, current: &str, new: &str) -> Result<(), AuthError> {
        let session = self.current_session()?.ok_or(AuthError::NotAuthenticated)?;
        check_password_length(new, self.min_password_length)?;

        let mut accounts = self.load_accounts()?;
        let account = accounts
            .iter_mut()
            .find(|account| account.id == session.user_id)
            .filter(|account| account.verify(current))
            .ok_or(AuthError::InvalidCredentials)?;

        account.salt = Uuid::new_v4().simple().to_string();
        account.digest = digest(&account.salt, new);
        self.save_accounts(&accounts)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Account {
    id: Uuid,
    email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    salt: String,
    digest: String,
}

impl Account {
    fn verify(&self, password: &str) -> bool {
        digest(&self.salt, password) == self.digest
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum AccountsFile {
    #[serde(rename = "1")]
    V1 {
        #[serde(default)]
        accounts: Vec<Account>,
    },
}

fn normalise_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<(), AuthError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_yaml::to_string(value)?)?;
    Ok(())
}
