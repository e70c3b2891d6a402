use clap::{Args, Subcommand};

use super::{Credentials, OutputFormat};
use fitpal::db::Store;
use fitpal::models::UserDetail;
use fitpal::repository::UserDetailRepository;
use fitpal::viewmodel::UserDetailViewModel;

#[derive(Args)]
pub struct ProfileCommand {
    #[command(flatten)]
    pub credentials: Credentials,

    #[command(subcommand)]
    pub command: ProfileSubcommand,
}

#[derive(Subcommand)]
pub enum ProfileSubcommand {
    /// Show the profile
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Create or change profile fields
    Set {
        #[arg(long)]
        age: Option<i32>,

        /// Height in centimetres
        #[arg(long)]
        height: Option<f64>,

        /// Weight in kilograms
        #[arg(long)]
        weight: Option<f64>,

        #[arg(long)]
        birthday: Option<String>,

        #[arg(long)]
        gender: Option<String>,

        #[arg(long)]
        goal: Option<String>,
    },
}

impl ProfileCommand {
    pub async fn run(&self, store: &Store) -> Result<(), Box<dyn std::error::Error>> {
        let user_id = self.credentials.sign_in(store).await?;
        let repo = UserDetailRepository::new(store);

        match &self.command {
            ProfileSubcommand::Show { format } => {
                let Some(detail) = repo.get(user_id).await? else {
                    println!("No profile yet. Use 'profile set' to create one.");
                    return Ok(());
                };
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&detail)?);
                    }
                    OutputFormat::Text => {
                        println!("{}", detail);
                    }
                }
                Ok(())
            }

            ProfileSubcommand::Set {
                age,
                height,
                weight,
                birthday,
                gender,
                goal,
            } => {
                let has_updates = age.is_some()
                    || height.is_some()
                    || weight.is_some()
                    || birthday.is_some()
                    || gender.is_some()
                    || goal.is_some();
                if !has_updates {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let mut detail = repo
                    .get(user_id)
                    .await?
                    .unwrap_or_else(|| UserDetail::new(user_id));
                if let Some(age) = age {
                    detail.age = *age;
                }
                if let Some(height) = height {
                    detail.height = *height;
                }
                if let Some(weight) = weight {
                    detail.weight = *weight;
                }
                if let Some(birthday) = birthday {
                    detail.birthday = birthday.clone();
                }
                if let Some(gender) = gender {
                    detail.gender = gender.clone();
                }
                if let Some(goal) = goal {
                    detail.goal = goal.clone();
                }

                let vm = UserDetailViewModel::new(store);
                vm.set_current_user(user_id);
                vm.save(detail.clone()).wait().await?;
                println!("Saved profile:");
                println!("{}", detail);
                Ok(())
            }
        }
    }
}
