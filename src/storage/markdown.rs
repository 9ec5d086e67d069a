use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use chrono::{DateTime, NaiveDate, Utc};
use non_empty_string::NonEmptyString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{FollowUp, Priority, ReminderFrequency, Request, RequestId, Status};

/// A request serialized in markdown format with YAML frontmatter.
///
/// The first heading holds the title and everything after it is the
/// description.
#[derive(Debug, Clone)]
pub struct MarkdownRequest {
    frontmatter: FrontMatter,
    title: String,
    body: String,
}

impl MarkdownRequest {
    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let frontmatter = serde_yaml::to_string(&self.frontmatter).map_err(io::Error::other)?;

        let result = format!("---\n{frontmatter}---\n# {}\n\n{}\n", self.title, self.body);

        writer.write_all(result.as_bytes())
    }

    pub(crate) fn read<R: BufRead>(reader: &mut R) -> Result<Self, LoadError> {
        let mut lines = reader.lines();

        // Ensure frontmatter starts correctly
        let first_line = lines
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "Empty input"))?
            .map_err(LoadError::from)?;

        if first_line.trim() != "---" {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Expected frontmatter starting with '---'",
            )
            .into());
        }

        // Collect lines until next '---'. Block scalars in the YAML are
        // indented, so only a delimiter at the start of a line ends it.
        let frontmatter = lines
            .by_ref()
            .map_while(|line| match line {
                Ok(content) if content.trim_end() == "---" => None,
                Ok(content) => Some(Ok(content)),
                Err(e) => Some(Err(e)),
            })
            .collect::<Result<Vec<_>, _>>()?
            .join("\n");

        let content = lines.collect::<Result<Vec<_>, _>>()?.join("\n");

        let frontmatter: FrontMatter = serde_yaml::from_str(&frontmatter)?;
        let (title, body) = parse_content(&content)?;

        Ok(Self {
            frontmatter,
            title,
            body,
        })
    }

    /// The identifier recorded in the frontmatter.
    #[must_use]
    pub const fn id(&self) -> RequestId {
        self.frontmatter.id
    }

    /// Writes the request to a file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written to.
    pub fn save_to_path(&self, file_path: &Path) -> io::Result<()> {
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = File::create(file_path)?;
        let mut writer = BufWriter::new(file);
        self.write(&mut writer)?;
        writer.flush()
    }

    /// Reads a request from a file.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::NotFound`] if there is no such file, or another
    /// variant if it cannot be read or parsed.
    pub fn load_from_path(file_path: &Path) -> Result<Self, LoadError> {
        let file = File::open(file_path).map_err(|io_error| match io_error.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound,
            _ => LoadError::Io(io_error),
        })?;

        let mut reader = BufReader::new(file);
        Self::read(&mut reader)
    }
}

/// Splits markdown content into the title (first heading) and the body.
fn parse_content(content: &str) -> Result<(String, String), LoadError> {
    let (heading_line_idx, line) = content
        .lines()
        .enumerate()
        .find(|(_, line)| line.trim().starts_with('#'))
        .ok_or(LoadError::MissingTitle)?;

    let title = line.trim().trim_start_matches('#').trim().to_string();

    let body = content
        .lines()
        .skip(heading_line_idx + 1)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();

    Ok((title, body))
}

/// Errors that can occur when loading a request from markdown.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The request file was not found.
    #[error("request file not found")]
    NotFound,
    /// An I/O error occurred.
    #[error("failed to read request file")]
    Io(#[from] io::Error),
    /// The YAML frontmatter could not be parsed.
    #[error("malformed frontmatter")]
    Yaml(#[from] serde_yaml::Error),
    /// There is no heading to take the title from.
    #[error("no title heading found")]
    MissingTitle,
    /// A required field is empty.
    #[error("required field '{0}' is empty")]
    EmptyField(&'static str),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(from = "FrontMatterVersion")]
#[serde(into = "FrontMatterVersion")]
struct FrontMatter {
    id: RequestId,
    created_at: DateTime<Utc>,
    created_by: Option<Uuid>,
    received: NaiveDate,
    requester: String,
    assignee: Option<String>,
    status: Status,
    priority: Priority,
    deadline: Option<NaiveDate>,
    closed_on: Option<NaiveDate>,
    reminder: Option<ReminderFrequency>,
    follow_ups: Vec<FollowUpRecord>,
}

/// A follow-up in the serialized format.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
struct FollowUpRecord {
    date: NaiveDate,
    #[serde(rename = "personne")]
    person: String,
    action: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum FrontMatterVersion {
    #[serde(rename = "1")]
    V1 {
        id: RequestId,
        created_at: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        created_by: Option<Uuid>,
        #[serde(rename = "date_reception")]
        received: NaiveDate,
        #[serde(rename = "demandeur")]
        requester: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        assignee: Option<String>,
        #[serde(rename = "statut")]
        status: Status,
        priority: Priority,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        deadline: Option<NaiveDate>,
        #[serde(
            rename = "date_cloture",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        closed_on: Option<NaiveDate>,
        #[serde(
            rename = "frequence_rappel",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        reminder: Option<ReminderFrequency>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        follow_ups: Vec<FollowUpRecord>,
    },
}

impl From<FrontMatterVersion> for FrontMatter {
    fn from(version: FrontMatterVersion) -> Self {
        match version {
            FrontMatterVersion::V1 {
                id,
                created_at,
                created_by,
                received,
                requester,
                assignee,
                status,
                priority,
                deadline,
                closed_on,
                reminder,
                follow_ups,
            } => Self {
                id,
                created_at,
                created_by,
                received,
                requester,
                assignee,
                status,
                priority,
                deadline,
                closed_on,
                reminder,
                follow_ups,
            },
        }
    }
}

impl From<FrontMatter> for FrontMatterVersion {
    fn from(front_matter: FrontMatter) -> Self {
        let FrontMatter {
            id,
            created_at,
            created_by,
            received,
            requester,
            assignee,
            status,
            priority,
            deadline,
            closed_on,
            reminder,
            follow_ups,
        } = front_matter;
        Self::V1 {
            id,
            created_at,
            created_by,
            received,
            requester,
            assignee,
            status,
            priority,
            deadline,
            closed_on,
            reminder,
            follow_ups,
        }
    }
}

impl From<&Request> for MarkdownRequest {
    fn from(req: &Request) -> Self {
        let frontmatter = FrontMatter {
            id: req.id,
            created_at: req.created_at,
            created_by: req.created_by,
            received: req.received,
            requester: req.requester.to_string(),
            assignee: req.assignee().map(str::to_string),
            status: req.status,
            priority: req.priority,
            deadline: req.deadline,
            closed_on: req.closed_on,
            reminder: req.reminder,
            follow_ups: req
                .follow_ups
                .iter()
                .map(|follow_up| FollowUpRecord {
                    date: follow_up.date,
                    person: follow_up.person.to_string(),
                    action: follow_up.action.to_string(),
                })
                .collect(),
        };

        Self {
            frontmatter,
            title: req.title.to_string(),
            body: req.description.to_string(),
        }
    }
}

fn non_empty(field: &'static str, value: String) -> Result<NonEmptyString, LoadError> {
    NonEmptyString::new(value).map_err(|_| LoadError::EmptyField(field))
}

impl TryFrom<MarkdownRequest> for Request {
    type Error = LoadError;

    fn try_from(req: MarkdownRequest) -> Result<Self, Self::Error> {
        let MarkdownRequest {
            frontmatter:
                FrontMatter {
                    id,
                    created_at,
                    created_by,
                    received,
                    requester,
                    assignee,
                    status,
                    priority,
                    deadline,
                    closed_on,
                    reminder,
                    follow_ups,
                },
            title,
            body,
        } = req;

        let follow_ups = follow_ups
            .into_iter()
            .map(|FollowUpRecord { date, person, action }| {
                Ok(FollowUp {
                    date,
                    person: non_empty("personne", person)?,
                    action: non_empty("action", action)?,
                })
            })
            .collect::<Result<_, LoadError>>()?;

        Ok(Self {
            id,
            received,
            title: non_empty("title", title)?,
            description: non_empty("description", body)?,
            requester: non_empty("demandeur", requester)?,
            assignee: assignee.filter(|name| !name.trim().is_empty()),
            status,
            priority,
            deadline,
            closed_on,
            reminder,
            follow_ups,
            created_at,
            created_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use chrono::TimeZone;

    use super::*;
    use crate::domain::NewRequest;

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn sample_request() -> Request {
        let draft = NewRequest {
            title: "Forklift battery".to_string(),
            description: "The battery of forklift 2 no longer holds a charge.\n\nSee the log."
                .to_string(),
            requester: "Warehouse".to_string(),
            assignee: "Youssef".to_string(),
            status: Status::InProgress,
            priority: Priority::High,
            deadline: Some(day("2024-06-30")),
            reminder: Some(ReminderFrequency::SemiMonthly),
            ..NewRequest::new(day("2024-06-01"))
        }
        .validate()
        .unwrap();
        let mut request = Request::from_draft(
            "9b2f1c3e-5a4d-4e6f-8a7b-0c1d2e3f4a5b".parse().unwrap(),
            draft,
            Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap(),
            None,
        );
        request.follow_ups.push(
            crate::domain::NewFollowUp {
                date: day("2024-06-03"),
                person: "Youssef".to_string(),
                action: "Ordered a replacement".to_string(),
            }
            .validate()
            .unwrap(),
        );
        request
    }

    fn write_to_string(markdown: &MarkdownRequest) -> String {
        let mut buffer = Vec::new();
        markdown.write(&mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn markdown_round_trip() {
        let request = sample_request();
        let text = write_to_string(&MarkdownRequest::from(&request));

        let parsed = MarkdownRequest::read(&mut Cursor::new(text)).unwrap();
        assert_eq!(Request::try_from(parsed).unwrap(), request);
    }

    #[test]
    fn writes_storage_keys() {
        let text = write_to_string(&MarkdownRequest::from(&sample_request()));

        assert!(text.starts_with("---\n_version:"));
        assert!(text.contains("date_reception:"));
        assert!(text.contains("demandeur: Warehouse\n"));
        assert!(text.contains("statut: En cours\n"));
        assert!(text.contains("frequence_rappel: Bimensuel\n"));
        assert!(text.contains("personne: Youssef\n"));
        assert!(!text.contains("date_cloture"));
        assert!(text.contains("---\n# Forklift battery\n\nThe battery"));
    }

    #[test]
    fn reads_minimal_frontmatter() {
        let text = "---\n_version: '1'\nid: 9b2f1c3e-5a4d-4e6f-8a7b-0c1d2e3f4a5b\ncreated_at: 2024-06-01T09:30:00Z\ndate_reception: 2024-06-01\ndemandeur: Warehouse\nstatut: En attente\npriority: Basse\n---\n# Shelf label\n\nReprint the labels.\n";
        let request = Request::try_from(MarkdownRequest::read(&mut Cursor::new(text)).unwrap())
            .unwrap();

        assert_eq!(request.status, Status::Pending);
        assert_eq!(request.priority, Priority::Low);
        assert_eq!(request.assignee, None);
        assert_eq!(request.deadline, None);
        assert!(request.follow_ups.is_empty());
        assert_eq!(request.title.as_str(), "Shelf label");
        assert_eq!(request.description.as_str(), "Reprint the labels.");
    }

    #[test]
    fn multi_line_follow_up_survives_round_trip() {
        let mut request = sample_request();
        request.follow_ups.push(
            crate::domain::NewFollowUp {
                date: day("2024-06-05"),
                person: "Youssef".to_string(),
                action: "Called vendor\n---\nWaiting on quote".to_string(),
            }
            .validate()
            .unwrap(),
        );
        let text = write_to_string(&MarkdownRequest::from(&request));

        let parsed = Request::try_from(MarkdownRequest::read(&mut Cursor::new(text)).unwrap())
            .unwrap();
        assert_eq!(
            parsed.follow_ups[1].action.as_str(),
            "Called vendor\n---\nWaiting on quote"
        );
        assert_eq!(parsed, request);
    }

    #[test]
    fn indented_delimiter_does_not_end_frontmatter() {
        let text = "---\n_version: '1'\nid: 9b2f1c3e-5a4d-4e6f-8a7b-0c1d2e3f4a5b\ncreated_at: 2024-06-01T09:30:00Z\ndate_reception: 2024-06-01\ndemandeur: Warehouse\nstatut: En attente\npriority: Basse\nfollow_ups:\n- date: 2024-06-02\n  personne: Sam\n  action: |-\n    Checked stock\n    ---\n    None left\n---\n# Shelf label\n\nReprint the labels.\n";
        let request = Request::try_from(MarkdownRequest::read(&mut Cursor::new(text)).unwrap())
            .unwrap();

        assert_eq!(
            request.follow_ups[0].action.as_str(),
            "Checked stock\n---\nNone left"
        );
        assert_eq!(request.title.as_str(), "Shelf label");
    }

    #[test]
    fn invalid_frontmatter_start() {
        let result = MarkdownRequest::read(&mut Cursor::new("# Title\n\nBody\n"));
        assert!(matches!(result, Err(LoadError::Io(_))));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let text = "---\n_version: '2'\n---\n# Title\n\nBody\n";
        let result = MarkdownRequest::read(&mut Cursor::new(text));
        assert!(matches!(result, Err(LoadError::Yaml(_))));
    }

    #[test]
    fn missing_heading_is_rejected() {
        let mut text = write_to_string(&MarkdownRequest::from(&sample_request()));
        text = text.replace("# Forklift battery", "Forklift battery");
        let result = MarkdownRequest::read(&mut Cursor::new(text));
        assert!(matches!(result, Err(LoadError::MissingTitle)));
    }

    #[test]
    fn empty_description_is_rejected() {
        let text = "---\n_version: '1'\nid: 9b2f1c3e-5a4d-4e6f-8a7b-0c1d2e3f4a5b\ncreated_at: 2024-06-01T09:30:00Z\ndate_reception: 2024-06-01\ndemandeur: Warehouse\nstatut: En attente\npriority: Basse\n---\n# Shelf label\n";
        let parsed = MarkdownRequest::read(&mut Cursor::new(text)).unwrap();
        assert!(matches!(
            Request::try_from(parsed),
            Err(LoadError::EmptyField("description"))
        ));
    }

    #[test]
    fn save_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("request.md");
        let request = sample_request();

        MarkdownRequest::from(&request).save_to_path(&path).unwrap();
        let loaded = MarkdownRequest::load_from_path(&path).unwrap();

        assert_eq!(loaded.id(), request.id);
        assert_eq!(Request::try_from(loaded).unwrap(), request);
    }

    #[test]
    fn load_nonexistent_file() {
        let tmp = tempfile::tempdir().unwrap();
        let result = MarkdownRequest::load_from_path(&tmp.path().join("missing.md"));
        assert!(matches!(result, Err(LoadError::NotFound)));
    }
}
