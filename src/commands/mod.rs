mod calendar;
mod config_cmd;
mod diet;
mod profile;
mod user;
mod workout;

pub use calendar::CalendarCommand;
pub use config_cmd::ConfigCommand;
pub use diet::DietCommand;
pub use profile::ProfileCommand;
pub use user::UserCommand;
pub use workout::WorkoutCommand;

use clap::{Args, ValueEnum};
use futures::StreamExt;
use std::io::{self, Write};

use fitpal::db::{LiveQuery, Store, StoreError};
use fitpal::viewmodel::UserViewModel;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Account credentials for user-scoped commands
#[derive(Args)]
pub struct Credentials {
    /// Account email
    #[arg(long)]
    pub email: String,

    /// Account password
    #[arg(long)]
    pub password: String,
}

impl Credentials {
    /// Signs in and returns the account id.
    pub async fn sign_in(&self, store: &Store) -> Result<i64, Box<dyn std::error::Error>> {
        let users = UserViewModel::new(store);
        let user = users.login(&self.email, &self.password).await?;
        Ok(user.id.ok_or("Signed-in account has no id")?)
    }
}

/// Current result of a live query.
pub async fn snapshot<S: Default>(mut query: LiveQuery<S>) -> Result<S, StoreError> {
    Ok(query.next().await.transpose()?.unwrap_or_default())
}

/// Asks for confirmation on stdin unless `force` is set.
pub fn confirm(prompt: &str, force: bool) -> io::Result<bool> {
    if force {
        return Ok(true);
    }
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}
