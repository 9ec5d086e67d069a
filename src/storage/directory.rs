//! A filesystem backed store of requests
//!
//! Each request lives in `requests/<uuid>.md` under the backlog root, with
//! its follow-ups in the frontmatter. Deleting the file deletes both.

use std::{
    ffi::OsStr,
    io,
    path::{Path, PathBuf},
};

use chrono::Utc;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::instrument;
use walkdir::WalkDir;

use super::{load_config, LoadError, MarkdownRequest, RequestStore, StoreError, REQUESTS_DIR};
use crate::domain::{Config, FollowUp, Patch, Request, RequestDraft, RequestId};

/// A filesystem backed store of requests.
#[derive(Debug, Clone)]
pub struct Directory {
    /// The root of the backlog.
    root: PathBuf,
    config: Config,
}

impl Directory {
    /// Opens the backlog at `root`, reading its configuration if present.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        let config = load_config(&root);
        Self::with_config(root, config)
    }

    /// Opens the backlog at `root` with an explicit configuration.
    #[must_use]
    pub const fn with_config(root: PathBuf, config: Config) -> Self {
        Self { root, config }
    }

    /// The backlog root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The configuration in effect.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    fn requests_dir(&self) -> PathBuf {
        self.root.join(REQUESTS_DIR)
    }

    fn path_for(&self, id: RequestId) -> PathBuf {
        self.requests_dir().join(format!("{id}.md"))
    }

    fn load(&self, id: RequestId) -> Result<Request, StoreError> {
        let path = self.path_for(id);
        match load_request(&path) {
            Ok(request) => Ok(request),
            Err(LoadError::NotFound) => Err(StoreError::NotFound(id)),
            Err(source) => Err(StoreError::Load { path, source }),
        }
    }

    fn save(&self, request: &Request) -> Result<(), StoreError> {
        MarkdownRequest::from(request).save_to_path(&self.path_for(request.id))?;
        Ok(())
    }
}

impl RequestStore for Directory {
    /// Loads every request file.
    ///
    /// If `allow_unrecognised` is set in the configuration, files that cannot
    /// be parsed are skipped with a warning; otherwise they fail the listing.
    #[instrument(level = "debug", skip(self))]
    fn list_requests(&self) -> Result<Vec<Request>, StoreError> {
        let paths = collect_markdown_paths(&self.requests_dir());

        let (requests, failures): (Vec<_>, Vec<_>) = paths
            .par_iter()
            .map(|path| load_request(path).map_err(|error| (path.clone(), error)))
            .partition(Result::is_ok);

        let mut requests: Vec<Request> = requests.into_iter().filter_map(Result::ok).collect();
        let failures: Vec<(PathBuf, LoadError)> =
            failures.into_iter().filter_map(Result::err).collect();

        if !failures.is_empty() {
            for (path, error) in &failures {
                tracing::warn!("Skipping {}: {error}", path.display());
            }
            if !self.config.allow_unrecognised {
                return Err(StoreError::Unrecognised(
                    failures.into_iter().map(|(path, _)| path).collect(),
                ));
            }
        }

        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tracing::debug!("Loaded {} requests", requests.len());
        Ok(requests)
    }

    #[instrument(level = "debug", skip_all)]
    fn create_request(
        &mut self,
        draft: RequestDraft,
        created_by: Option<uuid::Uuid>,
    ) -> Result<RequestId, StoreError> {
        let id = RequestId::generate();
        let request = Request::from_draft(id, draft, Utc::now(), created_by);
        self.save(&request)?;
        tracing::info!("Added request: {id}");
        Ok(id)
    }

    #[instrument(level = "debug", skip(self))]
    fn update_request_fields(&mut self, id: RequestId, patch: &Patch) -> Result<(), StoreError> {
        let mut request = self.load(id)?;
        request.apply_patch(patch);
        self.save(&request)
    }

    #[instrument(level = "debug", skip(self))]
    fn delete_request(&mut self, id: RequestId) -> Result<(), StoreError> {
        std::fs::remove_file(self.path_for(id)).map_err(|error| match error.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound(id),
            _ => StoreError::Io(error),
        })?;
        tracing::info!("Deleted request: {id}");
        Ok(())
    }

    #[instrument(level = "debug", skip(self, follow_up))]
    fn add_follow_up(&mut self, id: RequestId, follow_up: FollowUp) -> Result<(), StoreError> {
        let mut request = self.load(id)?;
        request.follow_ups.push(follow_up);
        self.save(&request)
    }
}

fn load_request(path: &Path) -> Result<Request, LoadError> {
    Request::try_from(MarkdownRequest::load_from_path(path)?)
}

fn collect_markdown_paths(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        tracing::debug!("No requests directory at {}", dir.display());
        return Vec::new();
    }

    WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(error) => {
                tracing::warn!("Failed to read directory entry: {error}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| path.extension() == Some(OsStr::new("md")))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tempfile::TempDir;

    use super::*;
    use crate::domain::{NewFollowUp, NewRequest, Status};

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn draft(title: &str) -> RequestDraft {
        NewRequest {
            title: title.to_string(),
            description: format!("{title}, please."),
            requester: "Quality".to_string(),
            ..NewRequest::new(day("2024-02-01"))
        }
        .validate()
        .unwrap()
    }

    fn setup() -> (TempDir, Directory) {
        let tmp = TempDir::new().unwrap();
        let directory = Directory::new(tmp.path().to_path_buf());
        (tmp, directory)
    }

    #[test]
    fn empty_backlog_lists_nothing() {
        let (_tmp, directory) = setup();
        assert!(directory.list_requests().unwrap().is_empty());
    }

    #[test]
    fn create_then_list_newest_first() {
        let (_tmp, mut directory) = setup();
        let first = directory.create_request(draft("Calibrate scale"), None).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = directory.create_request(draft("Replace filter"), None).unwrap();

        let ids: Vec<_> = directory
            .list_requests()
            .unwrap()
            .into_iter()
            .map(|request| request.id)
            .collect();
        assert_eq!(ids, [second, first]);
    }

    #[test]
    fn update_writes_patch() {
        let (_tmp, mut directory) = setup();
        let id = directory.create_request(draft("Calibrate scale"), None).unwrap();
        let patch = Patch {
            assignee: Some("Nadia".to_string()),
            status: Some(Status::InProgress),
            ..Patch::default()
        };

        directory.update_request_fields(id, &patch).unwrap();

        let request = directory.load(id).unwrap();
        assert_eq!(request.assignee(), Some("Nadia"));
        assert_eq!(request.status, Status::InProgress);
    }

    #[test]
    fn follow_ups_are_appended_in_order() {
        let (_tmp, mut directory) = setup();
        let id = directory.create_request(draft("Calibrate scale"), None).unwrap();
        for action in ["Called the vendor", "Booked a technician"] {
            let follow_up = NewFollowUp {
                date: day("2024-02-02"),
                person: "Nadia".to_string(),
                action: action.to_string(),
            }
            .validate()
            .unwrap();
            directory.add_follow_up(id, follow_up).unwrap();
        }

        let actions: Vec<_> = directory
            .load(id)
            .unwrap()
            .follow_ups
            .iter()
            .map(|follow_up| follow_up.action.to_string())
            .collect();
        assert_eq!(actions, ["Called the vendor", "Booked a technician"]);
    }

    #[test]
    fn delete_removes_the_request() {
        let (_tmp, mut directory) = setup();
        let id = directory.create_request(draft("Calibrate scale"), None).unwrap();

        directory.delete_request(id).unwrap();

        assert!(directory.list_requests().unwrap().is_empty());
        assert!(matches!(
            directory.delete_request(id),
            Err(StoreError::NotFound(missing)) if missing == id
        ));
    }

    #[test]
    fn missing_request_is_not_found() {
        let (_tmp, mut directory) = setup();
        let id = RequestId::generate();
        assert!(matches!(
            directory.update_request_fields(id, &Patch::default()),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn unparsable_files_fail_the_listing_by_default() {
        let (tmp, mut directory) = setup();
        directory.create_request(draft("Calibrate scale"), None).unwrap();
        let junk = tmp.path().join(REQUESTS_DIR).join("notes.md");
        std::fs::write(&junk, "just some notes\n").unwrap();

        match directory.list_requests() {
            Err(StoreError::Unrecognised(paths)) => assert_eq!(paths, [junk]),
            other => panic!("expected unrecognised files, got {other:?}"),
        }
    }

    #[test]
    fn unparsable_files_are_skipped_when_allowed() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.allow_unrecognised = true;
        let mut directory = Directory::with_config(tmp.path().to_path_buf(), config);
        directory.create_request(draft("Calibrate scale"), None).unwrap();
        std::fs::write(tmp.path().join(REQUESTS_DIR).join("notes.md"), "notes\n").unwrap();

        assert_eq!(directory.list_requests().unwrap().len(), 1);
    }

    #[test]
    fn records_the_creator() {
        let (_tmp, mut directory) = setup();
        let creator = uuid::Uuid::new_v4();
        let id = directory
            .create_request(draft("Calibrate scale"), Some(creator))
            .unwrap();
        assert_eq!(directory.load(id).unwrap().created_by, Some(creator));
    }
}
