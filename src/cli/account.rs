use std::path::Path;

use clap::Parser;
use tracing::instrument;

use super::{local_auth, terminal::Colorize};

#[derive(Debug, Parser)]
pub struct Account {
    #[command(subcommand)]
    command: AccountCommand,
}

#[derive(Debug, Parser)]
enum AccountCommand {
    /// Register a new account
    Add {
        /// Login email
        email: String,

        /// Name shown on follow-ups and in `whoami`
        #[arg(long)]
        name: Option<String>,

        /// The password; prompted for, with confirmation, if omitted
        #[arg(long)]
        password: Option<String>,
    },
}

impl Account {
    #[instrument(skip(self))]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        match self.command {
            AccountCommand::Add {
                email,
                name,
                password,
            } => {
                let password = match password {
                    Some(password) => password,
                    None => dialoguer::Password::new()
                        .with_prompt("Password")
                        .with_confirmation("Confirm password", "Passwords do not match")
                        .interact()?,
                };
                let name = name.map(|name| name.trim().to_string()).filter(|name| !name.is_empty());

                local_auth(root).add_account(&email, name, &password)?;
                println!("{}", format!("Added account {}", email.trim()).success());
            }
        }
        Ok(())
    }
}
