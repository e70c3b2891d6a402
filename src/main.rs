use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{
    CalendarCommand, ConfigCommand, DietCommand, ProfileCommand, UserCommand, WorkoutCommand,
};
use fitpal::config::Config;
use fitpal::db::Store;

#[derive(Parser)]
#[command(name = "fitpal")]
#[command(version)]
#[command(about = "Track workouts, meals and training sessions", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage accounts
    User(UserCommand),

    /// Show or edit the profile
    Profile(ProfileCommand),

    /// Manage the workout checklist
    Workout(WorkoutCommand),

    /// Manage the diet checklist
    Diet(DietCommand),

    /// Manage calendar sessions
    Calendar(CalendarCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fitpal=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = Config::load(cli.config)?;

    let Some(command) = cli.command else {
        println!("Use --help to see available commands");
        return Ok(());
    };

    if let Commands::Config(cmd) = &command {
        return cmd.run(&config);
    }

    let store = Store::get_instance(&config.database_path.value).await?;
    match command {
        Commands::User(cmd) => cmd.run(store).await,
        Commands::Profile(cmd) => cmd.run(store).await,
        Commands::Workout(cmd) => cmd.run(store).await,
        Commands::Diet(cmd) => cmd.run(store).await,
        Commands::Calendar(cmd) => cmd.run(store, &config).await,
        Commands::Config(cmd) => cmd.run(&config),
    }
}
