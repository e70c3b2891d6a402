use clap::{Args, Subcommand};

use super::{confirm, snapshot, Credentials, OutputFormat};
use fitpal::db::Store;
use fitpal::models::WorkoutPlan;
use fitpal::repository::WorkoutPlanRepository;
use fitpal::viewmodel::WorkoutPlanViewModel;

#[derive(Args)]
pub struct WorkoutCommand {
    #[command(flatten)]
    pub credentials: Credentials,

    #[command(subcommand)]
    pub command: WorkoutSubcommand,
}

#[derive(Subcommand)]
pub enum WorkoutSubcommand {
    /// Add a workout to the checklist
    Add {
        /// What to do, e.g. "Back squat 5x5"
        content: String,

        /// Number of sets to complete
        #[arg(long, default_value = "1")]
        sets: i32,
    },

    /// List workouts, newest first
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Find workouts whose description contains a term
    Search {
        term: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Record one completed set
    Done {
        /// Workout ID
        id: i64,
    },

    /// Delete a workout
    Delete {
        /// Workout ID
        id: i64,
    },

    /// Delete every workout
    Clear {
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl WorkoutCommand {
    pub async fn run(&self, store: &Store) -> Result<(), Box<dyn std::error::Error>> {
        let user_id = self.credentials.sign_in(store).await?;
        let vm = WorkoutPlanViewModel::new(store);
        vm.set_current_user(user_id);

        match &self.command {
            WorkoutSubcommand::Add { content, sets } => {
                if content.trim().is_empty() {
                    return Err("Workout description cannot be empty".into());
                }
                if *sets < 1 {
                    return Err("Sets must be at least 1".into());
                }
                let plan = vm.add(content.trim(), *sets).wait().await?;
                println!("Added workout #{}:", plan.id.unwrap_or_default());
                println!("{}", plan);
                Ok(())
            }

            WorkoutSubcommand::List { format } => {
                let plans = snapshot(vm.stream()?).await?;
                print_plans(&plans, format)
            }

            WorkoutSubcommand::Search { term, format } => {
                let plans = snapshot(vm.search(term)?).await?;
                print_plans(&plans, format)
            }

            WorkoutSubcommand::Done { id } => {
                let plan = find(store, user_id, *id).await?;
                if plan.is_complete() {
                    println!("Already complete: {}", plan);
                    return Ok(());
                }
                let plan = vm.record_set(plan).wait().await?;
                println!("{}", plan);
                Ok(())
            }

            WorkoutSubcommand::Delete { id } => {
                let plan = find(store, user_id, *id).await?;
                vm.delete(plan.clone()).wait().await?;
                println!("Deleted workout: {}", plan.content);
                Ok(())
            }

            WorkoutSubcommand::Clear { force } => {
                if !confirm("Delete all workouts?", *force)? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }
                let removed = vm.delete_all().wait().await?;
                println!("Deleted {} workout(s)", removed);
                Ok(())
            }
        }
    }
}

async fn find(
    store: &Store,
    user_id: i64,
    id: i64,
) -> Result<WorkoutPlan, Box<dyn std::error::Error>> {
    match WorkoutPlanRepository::new(store).get(id).await? {
        Some(plan) if plan.user_id == user_id => Ok(plan),
        _ => Err(format!("Workout not found: {}", id).into()),
    }
}

fn print_plans(
    plans: &[WorkoutPlan],
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    if plans.is_empty() {
        println!("No workouts found");
        return Ok(());
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(plans)?);
        }
        OutputFormat::Text => {
            println!("{:<6}  {:<40}  PROGRESS", "ID", "WORKOUT");
            println!("{}", "-".repeat(60));
            for plan in plans {
                let content = if plan.content.chars().count() > 40 {
                    format!("{}...", plan.content.chars().take(37).collect::<String>())
                } else {
                    plan.content.clone()
                };
                println!(
                    "{:<6}  {:<40}  {}/{}",
                    plan.id.unwrap_or_default(),
                    content,
                    plan.completed_sets,
                    plan.target_sets
                );
            }
            println!("\nTotal: {} workout(s)", plans.len());
        }
    }
    Ok(())
}
