use std::{
    io,
    path::{Path, PathBuf},
};

use crate::domain::{Config, FollowUp, Patch, Request, RequestDraft, RequestId};

mod accounts;
pub mod directory;
/// Markdown serialization for requests.
pub mod markdown;

pub use accounts::LocalAuth;
pub use directory::Directory;
pub use markdown::{LoadError, MarkdownRequest};

/// Name of the directory holding configuration and credentials.
pub const SETTINGS_DIR: &str = ".backlog";

/// Name of the directory holding one file per request.
pub const REQUESTS_DIR: &str = "requests";

/// Path of the configuration file for the backlog at `root`.
#[must_use]
pub fn config_path(root: &Path) -> PathBuf {
    root.join(SETTINGS_DIR).join("config.toml")
}

/// Loads the configuration of the backlog at `root`, falling back to the
/// defaults if there is none.
#[must_use]
pub fn load_config(root: &Path) -> Config {
    Config::load(&config_path(root)).unwrap_or_else(|e| {
        tracing::debug!("Failed to load config: {e}");
        Config::default()
    })
}

/// The authoritative collection of requests.
///
/// Stores do not apply business rules: the patch handed to
/// [`RequestStore::update_request_fields`] is written as is.
pub trait RequestStore {
    /// Every request with its follow-ups, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the requests cannot be read.
    fn list_requests(&self) -> Result<Vec<Request>, StoreError>;

    /// Persists a new request and returns its identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be written.
    fn create_request(
        &mut self,
        draft: RequestDraft,
        created_by: Option<uuid::Uuid>,
    ) -> Result<RequestId, StoreError>;

    /// Writes the fields present in `patch`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if there is no such request.
    fn update_request_fields(&mut self, id: RequestId, patch: &Patch) -> Result<(), StoreError>;

    /// Deletes a request together with its follow-ups.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if there is no such request.
    fn delete_request(&mut self, id: RequestId) -> Result<(), StoreError>;

    /// Appends a follow-up to a request.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if there is no such request.
    fn add_follow_up(&mut self, id: RequestId, follow_up: FollowUp) -> Result<(), StoreError>;
}

/// Errors raised by a [`RequestStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No request with this identifier.
    #[error("request {0} not found")]
    NotFound(RequestId),

    /// A request file exists but could not be loaded.
    #[error("failed to load {}", .path.display())]
    Load {
        /// The offending file.
        path: PathBuf,
        /// What went wrong.
        #[source]
        source: LoadError,
    },

    /// Files in the requests directory that are not valid requests.
    #[error("unrecognised files: {}", display_paths(.0))]
    Unrecognised(Vec<PathBuf>),

    /// The store could not be written to.
    #[error("failed to write to the request store")]
    Io(#[from] io::Error),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
