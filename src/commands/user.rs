use clap::{Args, Subcommand};

use super::{confirm, Credentials};
use fitpal::db::Store;
use fitpal::viewmodel::UserViewModel;

#[derive(Args)]
pub struct UserCommand {
    #[command(subcommand)]
    pub command: UserSubcommand,
}

#[derive(Subcommand)]
pub enum UserSubcommand {
    /// Create a new account
    Register {
        #[command(flatten)]
        credentials: Credentials,
    },

    /// Delete an account and all of its data
    Delete {
        #[command(flatten)]
        credentials: Credentials,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl UserCommand {
    pub async fn run(&self, store: &Store) -> Result<(), Box<dyn std::error::Error>> {
        let users = UserViewModel::new(store);

        match &self.command {
            UserSubcommand::Register { credentials } => {
                let user = users
                    .register(&credentials.email, &credentials.password)
                    .await?;
                println!("Registered {}", user);
                Ok(())
            }

            UserSubcommand::Delete { credentials, force } => {
                let user = users
                    .login(&credentials.email, &credentials.password)
                    .await?;

                let prompt = format!(
                    "Delete account '{}' with all plans, events and profile?",
                    user.email
                );
                if !confirm(&prompt, *force)? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                users.delete_account().await?;
                println!("Deleted account: {}", user.email);
                Ok(())
            }
        }
    }
}
