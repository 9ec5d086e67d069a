use std::path::{Path, PathBuf};

mod account;
mod kpi;
mod list;
mod show;
mod terminal;
mod update;

use account::Account;
use anyhow::Context;
use backlog::{
    auth::{rotate_password, PasswordChange},
    domain::{today, Priority, ReminderFrequency, Status},
    storage::{config_path, load_config, REQUESTS_DIR, SETTINGS_DIR},
    AuthError, AuthProvider, Dashboard, Directory, LocalAuth, NewFollowUp, NewRequest, Session,
};
use chrono::NaiveDate;
use clap::ArgAction;
use kpi::Kpi;
use list::List;
use show::Show;
use tracing::instrument;
use update::Update;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global=true)]
    verbose: u8,

    /// The path to the root of the backlog
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        self.command
            .unwrap_or_else(|| Command::Kpi(Kpi::default()))
            .run(self.root)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Show dashboard figures (default)
    Kpi(Kpi),

    /// Initialize a new backlog
    Init,

    /// Manage accounts
    Account(Account),

    /// Log in
    Login(Login),

    /// End the current session
    Logout,

    /// Show who is logged in
    Whoami,

    /// Change the password of the logged-in account
    Passwd(Passwd),

    /// Create a new request
    Add(Add),

    /// List requests with filters
    List(List),

    /// Show a request and its follow-ups
    Show(Show),

    /// Edit fields of a request
    ///
    /// Assigning a pending request starts it, unassigning sends it back to
    /// pending, and closing stamps the closure date.
    Update(Update),

    /// Record an action taken on a request
    FollowUp(FollowUp),

    /// Delete a request and its follow-ups
    Delete(Delete),

    /// Show or modify configuration settings
    Config(Config),
}

impl Command {
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        match self {
            Self::Kpi(command) => command.run(root)?,
            Self::Init => Init::run(&root)?,
            Self::Account(command) => command.run(&root)?,
            Self::Login(command) => command.run(&root)?,
            Self::Logout => logout(&root)?,
            Self::Whoami => whoami(&root)?,
            Self::Passwd(command) => command.run(&root)?,
            Self::Add(command) => command.run(root)?,
            Self::List(command) => command.run(root)?,
            Self::Show(command) => command.run(root)?,
            Self::Update(command) => command.run(root)?,
            Self::FollowUp(command) => command.run(root)?,
            Self::Delete(command) => command.run(root)?,
            Self::Config(command) => command.run(&root)?,
        }
        Ok(())
    }
}

/// Parse a `YYYY-MM-DD` date.
fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{s}', expected YYYY-MM-DD: {e}"))
}

fn local_auth(root: &Path) -> LocalAuth {
    LocalAuth::new(root, &load_config(root))
}

/// The current session, or an error telling the user to log in.
fn require_session(root: &Path) -> anyhow::Result<Session> {
    local_auth(root)
        .current_session()
        .context("run 'backlog login' to start a new session")?
        .ok_or(AuthError::NotAuthenticated)
        .context("run 'backlog login' first")
}

/// Loads the backlog for a logged-in user.
fn open_dashboard(root: PathBuf) -> anyhow::Result<(Dashboard<Directory>, Session)> {
    let session = require_session(&root)?;
    let directory = Directory::new(root);
    let policy = directory.config().update_policy();
    let dashboard = Dashboard::open(directory, policy)?;
    Ok((dashboard, session))
}

/// Reads a password from the flag if given, otherwise from the terminal.
fn password_or_prompt(password: Option<String>, prompt: &str) -> anyhow::Result<String> {
    match password {
        Some(password) => Ok(password),
        None => Ok(dialoguer::Password::new().with_prompt(prompt).interact()?),
    }
}

#[derive(Debug, clap::Parser)]
pub struct Init {}

impl Init {
    #[instrument]
    fn run(root: &Path) -> anyhow::Result<()> {
        use std::fs;

        let settings_dir = root.join(SETTINGS_DIR);
        if settings_dir.exists() {
            anyhow::bail!("Backlog already initialized (found existing {SETTINGS_DIR} directory)");
        }

        fs::create_dir_all(&settings_dir)
            .with_context(|| format!("Failed to create {SETTINGS_DIR} directory"))?;

        backlog::Config::default()
            .save(&config_path(root))
            .map_err(|e| anyhow::anyhow!("Failed to create config.toml: {e}"))?;

        fs::create_dir_all(root.join(REQUESTS_DIR))
            .with_context(|| format!("Failed to create {REQUESTS_DIR} directory"))?;

        println!("Initialized backlog in {}", root.display());
        println!("  Created: {SETTINGS_DIR}/config.toml");
        println!("  Created: {REQUESTS_DIR}/");
        println!();
        println!("Next steps:");
        println!("  backlog account add you@example.com --name \"Your Name\"");
        println!("  backlog login you@example.com");

        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Login {
    /// The account email
    email: String,

    /// The password; prompted for if omitted
    #[arg(long)]
    password: Option<String>,
}

impl Login {
    #[instrument(skip(self))]
    fn run(self, root: &Path) -> anyhow::Result<()> {
        use terminal::Colorize;

        let password = password_or_prompt(self.password, "Password")?;
        let session = local_auth(root).login(&self.email, &password)?;
        println!("{}", format!("Logged in as {}", session.name()).success());
        Ok(())
    }
}

#[instrument]
fn logout(root: &Path) -> anyhow::Result<()> {
    local_auth(root).logout()?;
    println!("Logged out");
    Ok(())
}

#[instrument]
fn whoami(root: &Path) -> anyhow::Result<()> {
    use terminal::Colorize;

    let session = require_session(root)?;
    println!("{} <{}>", session.name(), session.email);
    println!(
        "{}",
        format!("since {}", session.started.format("%Y-%m-%d %H:%M UTC")).dim()
    );
    Ok(())
}

#[derive(Debug, clap::Parser)]
pub struct Passwd {
    /// The current password; prompted for if omitted
    #[arg(long)]
    current: Option<String>,

    /// The new password; prompted for, with confirmation, if omitted
    #[arg(long)]
    new: Option<String>,
}

impl Passwd {
    #[instrument(skip(self))]
    fn run(self, root: &Path) -> anyhow::Result<()> {
        use terminal::Colorize;

        let config = load_config(root);
        let mut auth = LocalAuth::new(root, &config);
        require_session(root)?;

        let current = password_or_prompt(self.current, "Current password")?;
        let (new, confirm) = match self.new {
            Some(new) => (new.clone(), new),
            None => (
                dialoguer::Password::new()
                    .with_prompt("New password")
                    .interact()?,
                dialoguer::Password::new()
                    .with_prompt("Confirm new password")
                    .interact()?,
            ),
        };

        let change = PasswordChange {
            current,
            new,
            confirm,
        };
        rotate_password(&mut auth, &change, config.min_password_length())?;
        println!("{}", "Password changed".success());
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Add {
    /// One-line summary
    #[arg(long, short)]
    title: String,

    /// What is being asked for
    #[arg(long, short)]
    description: String,

    /// Who asked
    #[arg(long)]
    requester: String,

    /// Who handles it
    #[arg(long, short, default_value = "")]
    assignee: String,

    /// Initial status
    #[arg(long, short, default_value_t = Status::Pending)]
    status: Status,

    /// Urgency (Basse, Moyenne, Haute, Urgente)
    #[arg(long, short, default_value_t = Priority::Medium)]
    priority: Priority,

    /// Due date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    deadline: Option<NaiveDate>,

    /// Reminder cadence (Quotidien, Hebdomadaire, Bimensuel, Mensuel)
    #[arg(long)]
    reminder: Option<ReminderFrequency>,

    /// Reception date (YYYY-MM-DD), defaults to today
    #[arg(long, value_parser = parse_date)]
    received: Option<NaiveDate>,
}

impl Add {
    #[instrument(skip(self))]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        use terminal::Colorize;

        let (mut dashboard, session) = open_dashboard(root)?;

        let request = NewRequest {
            title: self.title,
            description: self.description,
            requester: self.requester,
            assignee: self.assignee,
            status: self.status,
            priority: self.priority,
            deadline: self.deadline,
            reminder: self.reminder,
            ..NewRequest::new(self.received.unwrap_or_else(today))
        };

        let id = dashboard.create(request, Some(session.user_id))?;
        println!("{}", format!("Added request {}", id.short()).success());
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct FollowUp {
    /// The request id, or a unique prefix of it
    id: String,

    /// What was done
    action: String,

    /// Who did it, defaults to the logged-in user
    #[arg(long)]
    person: Option<String>,

    /// When it was done (YYYY-MM-DD), defaults to today
    #[arg(long, value_parser = parse_date)]
    date: Option<NaiveDate>,
}

impl FollowUp {
    #[instrument(skip(self))]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        use terminal::Colorize;

        let (mut dashboard, session) = open_dashboard(root)?;
        let id = dashboard.resolve(&self.id)?.id;

        let follow_up = NewFollowUp {
            date: self.date.unwrap_or_else(today),
            person: self.person.unwrap_or_else(|| session.name().to_string()),
            action: self.action,
        };
        dashboard.add_follow_up(id, follow_up)?;

        println!("{}", format!("Recorded follow-up on {}", id.short()).success());
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Delete {
    /// The request id, or a unique prefix of it
    id: String,

    /// Skip the confirmation prompt
    #[arg(long, short)]
    yes: bool,
}

impl Delete {
    #[instrument(skip(self))]
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        use terminal::Colorize;

        let (mut dashboard, _session) = open_dashboard(root)?;
        let request = dashboard.resolve(&self.id)?;
        let id = request.id;

        if !self.yes {
            println!(
                "Will delete {} \"{}\" and its {} follow-up(s)",
                id.short(),
                request.title,
                request.follow_ups.len()
            );
            let confirmed = dialoguer::Confirm::new()
                .with_prompt("Proceed?")
                .default(false)
                .interact()?;
            if !confirmed {
                println!("Cancelled");
                return Ok(());
            }
        }

        dashboard.delete(id)?;
        println!("{}", format!("Deleted request {}", id.short()).success());
        Ok(())
    }
}

#[derive(Debug, clap::Parser)]
pub struct Config {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Debug, clap::Parser)]
enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key to set
        key: String,

        /// Value to set
        value: String,
    },
}

impl Config {
    #[instrument]
    fn run(self, root: &Path) -> anyhow::Result<()> {
        use terminal::Colorize;

        let path = config_path(root);
        let mut config = if path.exists() {
            backlog::Config::load(&path).map_err(|e| anyhow::anyhow!("{e}"))?
        } else {
            backlog::Config::default()
        };

        match self.command {
            ConfigCommand::Show => {
                println!("Configuration:");
                println!("  allow_unrecognised: {}", config.allow_unrecognised);
                println!(
                    "  infer_status_from_assignee: {}",
                    config.infer_status_from_assignee
                );
                println!("  min_password_length: {}", config.min_password_length());
                println!(
                    "  session_ttl_hours: {}",
                    config.session_ttl().num_hours()
                );
            }
            ConfigCommand::Set { key, value } => {
                let parse_bool = |value: &str| {
                    value
                        .parse::<bool>()
                        .map_err(|_| anyhow::anyhow!("Value must be 'true' or 'false'"))
                };
                let parse_number = |value: &str| {
                    value
                        .parse::<u32>()
                        .map_err(|_| anyhow::anyhow!("Value must be a whole number"))
                };

                match key.as_str() {
                    "allow_unrecognised" => config.allow_unrecognised = parse_bool(&value)?,
                    "infer_status_from_assignee" => {
                        config.infer_status_from_assignee = parse_bool(&value)?;
                    }
                    "min_password_length" => {
                        config.set_min_password_length(parse_number(&value)?);
                    }
                    "session_ttl_hours" => config.set_session_ttl_hours(parse_number(&value)?),
                    _ => {
                        return Err(anyhow::anyhow!(
                            "Unknown configuration key: '{key}'\nSupported keys: \
                             allow_unrecognised, infer_status_from_assignee, \
                             min_password_length, session_ttl_hours",
                        ));
                    }
                }

                config.save(&path).map_err(|e| anyhow::anyhow!("{e}"))?;
                println!("{}", format!("Set {key} = {value}").success());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use backlog::RequestStore;
    use tempfile::{tempdir, TempDir};

    use super::*;

    const EMAIL: &str = "agent@example.com";
    const PASSWORD: &str = "s3cret!";

    /// An initialized backlog with one account, logged in.
    pub(super) fn logged_in() -> TempDir {
        let tmp = tempdir().unwrap();
        Init::run(tmp.path()).unwrap();
        local_auth(tmp.path())
            .add_account(EMAIL, Some("Agent".to_string()), PASSWORD)
            .unwrap();
        Login {
            email: EMAIL.to_string(),
            password: Some(PASSWORD.to_string()),
        }
        .run(tmp.path())
        .unwrap();
        tmp
    }

    pub(super) fn add(title: &str) -> Add {
        Add {
            title: title.to_string(),
            description: "Details".to_string(),
            requester: "Warehouse".to_string(),
            assignee: String::new(),
            status: Status::Pending,
            priority: Priority::High,
            deadline: None,
            reminder: None,
            received: Some("2024-03-01".parse().unwrap()),
        }
    }

    fn stored(root: &Path) -> Vec<backlog::Request> {
        Directory::new(root.to_path_buf()).list_requests().unwrap()
    }

    #[test]
    fn init_creates_the_layout() {
        let tmp = tempdir().unwrap();
        Init::run(tmp.path()).unwrap();

        assert!(config_path(tmp.path()).exists());
        assert!(tmp.path().join(REQUESTS_DIR).is_dir());
        assert!(Init::run(tmp.path()).is_err());
    }

    #[test]
    fn commands_require_a_session() {
        let tmp = tempdir().unwrap();
        Init::run(tmp.path()).unwrap();

        let error = add("Forklift").run(tmp.path().to_path_buf()).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<AuthError>(),
            Some(AuthError::NotAuthenticated)
        ));
        assert!(stored(tmp.path()).is_empty());
    }

    #[test]
    fn add_records_the_creator() {
        let tmp = logged_in();
        add("Forklift").run(tmp.path().to_path_buf()).unwrap();

        let requests = stored(tmp.path());
        assert_eq!(requests.len(), 1);
        let session = require_session(tmp.path()).unwrap();
        assert_eq!(requests[0].created_by, Some(session.user_id));
        assert_eq!(requests[0].priority, Priority::High);
    }

    #[test]
    fn follow_up_defaults_to_the_session_name() {
        let tmp = logged_in();
        add("Forklift").run(tmp.path().to_path_buf()).unwrap();
        let id = stored(tmp.path())[0].id;

        FollowUp {
            id: id.short(),
            action: "Called the vendor".to_string(),
            person: None,
            date: Some("2024-03-02".parse().unwrap()),
        }
        .run(tmp.path().to_path_buf())
        .unwrap();

        let follow_ups = &stored(tmp.path())[0].follow_ups;
        assert_eq!(follow_ups.len(), 1);
        assert_eq!(follow_ups[0].person.as_str(), "Agent");
    }

    #[test]
    fn delete_with_yes_skips_the_prompt() {
        let tmp = logged_in();
        add("Forklift").run(tmp.path().to_path_buf()).unwrap();
        let id = stored(tmp.path())[0].id;

        Delete {
            id: id.to_string(),
            yes: true,
        }
        .run(tmp.path().to_path_buf())
        .unwrap();

        assert!(stored(tmp.path()).is_empty());
    }

    #[test]
    fn logout_then_whoami_fails() {
        let tmp = logged_in();
        whoami(tmp.path()).unwrap();
        logout(tmp.path()).unwrap();
        assert!(whoami(tmp.path()).is_err());
    }

    #[test]
    fn passwd_rotates_the_password() {
        let tmp = logged_in();
        Passwd {
            current: Some(PASSWORD.to_string()),
            new: Some("n3w-secret".to_string()),
        }
        .run(tmp.path())
        .unwrap();

        let mut auth = local_auth(tmp.path());
        assert!(auth.login(EMAIL, PASSWORD).is_err());
        assert!(auth.login(EMAIL, "n3w-secret").is_ok());
    }

    #[test]
    fn config_set_updates_the_file() {
        let tmp = tempdir().unwrap();
        Init::run(tmp.path()).unwrap();

        Config {
            command: ConfigCommand::Set {
                key: "infer_status_from_assignee".to_string(),
                value: "false".to_string(),
            },
        }
        .run(tmp.path())
        .unwrap();

        assert!(!load_config(tmp.path()).infer_status_from_assignee);
        assert!(Config {
            command: ConfigCommand::Set {
                key: "digits".to_string(),
                value: "3".to_string(),
            },
        }
        .run(tmp.path())
        .is_err());
    }
}
