use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use std::sync::Arc;

use super::{confirm, snapshot, Credentials, OutputFormat};
use fitpal::config::Config;
use fitpal::db::Store;
use fitpal::models::CalendarEvent;
use fitpal::remote::{AccountHandle, GoogleCalendarClient, RemoteOutcome, TimeWindow};
use fitpal::repository::CalendarEventRepository;
use fitpal::viewmodel::CalendarViewModel;

#[derive(Args)]
pub struct CalendarCommand {
    #[command(flatten)]
    pub credentials: Credentials,

    #[command(subcommand)]
    pub command: CalendarSubcommand,
}

#[derive(Subcommand)]
pub enum CalendarSubcommand {
    /// Schedule a session
    Add {
        summary: String,

        /// Start time (RFC 3339, e.g. 2025-06-01T07:00:00Z)
        #[arg(long)]
        start: DateTime<Utc>,

        /// End time (RFC 3339)
        #[arg(long)]
        end: DateTime<Utc>,
    },

    /// List sessions in start order
    List {
        /// Only sessions starting at or after this time
        #[arg(long, requires = "to")]
        from: Option<DateTime<Utc>>,

        /// Only sessions starting before this time
        #[arg(long, requires = "from")]
        to: Option<DateTime<Utc>>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Mark a session as finished
    Finish {
        /// Event ID
        id: i64,

        /// Mark as not finished instead
        #[arg(long)]
        undo: bool,
    },

    /// Delete a session
    Delete {
        /// Event ID
        id: i64,
    },

    /// Delete every session
    Clear {
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Copy events from the remote calendar
    Sync,

    /// Create an event on the remote calendar
    Push {
        title: String,

        /// Start time (RFC 3339)
        #[arg(long)]
        start: DateTime<Utc>,

        /// End time (RFC 3339)
        #[arg(long)]
        end: DateTime<Utc>,
    },
}

impl CalendarCommand {
    pub async fn run(
        &self,
        store: &Store,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let user_id = self.credentials.sign_in(store).await?;
        let service = Arc::new(GoogleCalendarClient::new(config.calendar.base_url()));
        let vm = CalendarViewModel::new(store, service);
        vm.set_current_user(user_id);

        match &self.command {
            CalendarSubcommand::Add {
                summary,
                start,
                end,
            } => {
                check_span(start, end)?;
                let event = vm
                    .add(summary.trim(), &start.to_rfc3339(), &end.to_rfc3339())
                    .wait()
                    .await?;
                println!("Added event #{}:", event.id.unwrap_or_default());
                println!("{}", event);
                Ok(())
            }

            CalendarSubcommand::List { from, to, format } => {
                let query = match (from, to) {
                    (Some(from), Some(to)) => vm.between(&from.to_rfc3339(), &to.to_rfc3339())?,
                    _ => vm.stream()?,
                };
                let events = snapshot(query).await?;
                print_events(&events, format)
            }

            CalendarSubcommand::Finish { id, undo } => {
                let event = find(store, user_id, *id).await?;
                let event = vm.set_finished(event, !undo).wait().await?;
                println!("{}", event);
                Ok(())
            }

            CalendarSubcommand::Delete { id } => {
                let event = find(store, user_id, *id).await?;
                vm.delete(event.clone()).wait().await?;
                println!("Deleted event: {}", event.summary);
                Ok(())
            }

            CalendarSubcommand::Clear { force } => {
                if !confirm("Delete all calendar events?", *force)? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }
                let removed = vm.delete_all().wait().await?;
                println!("Deleted {} event(s)", removed);
                Ok(())
            }

            CalendarSubcommand::Sync => {
                let account = self.account(config)?;
                let window = TimeWindow::around(Utc::now(), config.calendar.sync_window_days);
                match vm.sync_from_remote(account, window).wait().await? {
                    RemoteOutcome::Ready(added) => println!("Synced {} new event(s)", added),
                    RemoteOutcome::Empty => println!("No remote events in range"),
                    outcome => return Err(describe(outcome).into()),
                }
                Ok(())
            }

            CalendarSubcommand::Push { title, start, end } => {
                check_span(start, end)?;
                let account = self.account(config)?;
                match vm
                    .push_remote(account, title.trim().to_string(), *start, *end)
                    .wait()
                    .await?
                {
                    RemoteOutcome::Ready(()) | RemoteOutcome::Empty => {
                        println!("Created remote event: {}", title.trim());
                        Ok(())
                    }
                    outcome => Err(describe(outcome).into()),
                }
            }
        }
    }

    fn account(&self, config: &Config) -> Result<AccountHandle, Box<dyn std::error::Error>> {
        match &config.calendar.access_token {
            Some(token) if config.calendar.is_configured() => {
                Ok(AccountHandle::new(&self.credentials.email, token))
            }
            _ => Err("Remote calendar not configured. Set calendar.access_token or FITPAL_CALENDAR_TOKEN.".into()),
        }
    }
}

fn check_span(start: &DateTime<Utc>, end: &DateTime<Utc>) -> Result<(), Box<dyn std::error::Error>> {
    if end <= start {
        return Err("End time must be after start time".into());
    }
    Ok(())
}

fn describe<T>(outcome: RemoteOutcome<T>) -> String {
    match outcome {
        RemoteOutcome::NeedsReauthorization => {
            "Calendar access expired or was revoked; refresh the access token".to_string()
        }
        RemoteOutcome::Unavailable(reason) => format!("Calendar service unavailable: {}", reason),
        RemoteOutcome::Ready(_) | RemoteOutcome::Empty => String::new(),
    }
}

async fn find(
    store: &Store,
    user_id: i64,
    id: i64,
) -> Result<CalendarEvent, Box<dyn std::error::Error>> {
    match CalendarEventRepository::new(store).get(id).await? {
        Some(event) if event.user_id == user_id => Ok(event),
        _ => Err(format!("Event not found: {}", id).into()),
    }
}

fn print_events(
    events: &[CalendarEvent],
    format: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    if events.is_empty() {
        println!("No events found");
        return Ok(());
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(events)?);
        }
        OutputFormat::Text => {
            println!("{:<6}  {}", "ID", "EVENT");
            println!("{}", "-".repeat(70));
            for event in events {
                println!("{:<6}  {}", event.id.unwrap_or_default(), event);
            }
            println!("\nTotal: {} event(s)", events.len());
        }
    }
    Ok(())
}
