use clap::{Args, Subcommand};

use super::{confirm, snapshot, Credentials, OutputFormat};
use fitpal::db::Store;
use fitpal::models::{DietPlan, MealType};
use fitpal::repository::DietPlanRepository;
use fitpal::viewmodel::DietPlanViewModel;

#[derive(Args)]
pub struct DietCommand {
    #[command(flatten)]
    pub credentials: Credentials,

    #[command(subcommand)]
    pub command: DietSubcommand,
}

#[derive(Subcommand)]
pub enum DietSubcommand {
    /// Add a food to a meal
    Add {
        food: String,

        /// Meal (breakfast, lunch, dinner)
        #[arg(long, short)]
        meal: MealType,
    },

    /// List diet entries
    List {
        /// Only show one meal
        #[arg(long, short)]
        meal: Option<MealType>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Delete a diet entry
    Delete {
        /// Entry ID
        id: i64,
    },

    /// Delete every diet entry
    Clear {
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl DietCommand {
    pub async fn run(&self, store: &Store) -> Result<(), Box<dyn std::error::Error>> {
        let user_id = self.credentials.sign_in(store).await?;
        let vm = DietPlanViewModel::new(store);
        vm.set_current_user(user_id);

        match &self.command {
            DietSubcommand::Add { food, meal } => {
                if food.trim().is_empty() {
                    return Err("Food cannot be empty".into());
                }
                let plan = vm.add(food.trim(), *meal).wait().await?;
                println!("Added to {}: {}", plan.meal_type, plan.food);
                Ok(())
            }

            DietSubcommand::List { meal, format } => {
                let query = match meal {
                    Some(meal) => vm.by_meal_type(*meal)?,
                    None => vm.stream()?,
                };
                let plans = snapshot(query).await?;
                print_plans(&plans, format)
            }

            DietSubcommand::Delete { id } => {
                let plan = match DietPlanRepository::new(store).get(*id).await? {
                    Some(plan) if plan.user_id == user_id => plan,
                    _ => return Err(format!("Diet entry not found: {}", id).into()),
                };
                vm.delete(plan.clone()).wait().await?;
                println!("Deleted diet entry: {}", plan.food);
                Ok(())
            }

            DietSubcommand::Clear { force } => {
                if !confirm("Delete all diet entries?", *force)? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }
                let removed = vm.delete_all().wait().await?;
                println!("Deleted {} diet entries", removed);
                Ok(())
            }
        }
    }
}

fn print_plans(plans: &[DietPlan], format: &OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    if plans.is_empty() {
        println!("No diet entries found");
        return Ok(());
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(plans)?);
        }
        OutputFormat::Text => {
            println!("{:<6}  {:<9}  FOOD", "ID", "MEAL");
            println!("{}", "-".repeat(50));
            for plan in plans {
                println!(
                    "{:<6}  {:<9}  {}",
                    plan.id.unwrap_or_default(),
                    plan.meal_type.to_string(),
                    plan.food
                );
            }
            println!("\nTotal: {} entries", plans.len());
        }
    }
    Ok(())
}
