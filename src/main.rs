//! PoolMate
//!
//! Command-line triggers for the scheduling backend. An external cron runs
//! `poolmate assign-pools` daily and `poolmate send-reminders` twice a day.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use PoolMate::{
    config::Settings,
    database::{create_pool, run_migrations, DatabasePool, DatabaseService, EventStore},
    jobs::AssignPoolsJob,
    scheduling::{NotificationCascade, PoolAssignmentEngine, ReminderScheduler, RunWindow},
    services::ServiceFactory,
    utils::logging,
};

#[derive(Parser)]
#[command(name = "poolmate", version, about = "Pool assignment and reminders for fitness events")]
struct Cli {
    /// Configuration file, extension optional
    #[arg(short, long, default_value = "config")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Assign pools for every unassigned event dated tomorrow
    AssignPools,
    /// Send same-day reminders for the given run window
    SendReminders {
        #[arg(short, long, value_enum)]
        window: RunWindow,
    },
    /// Attach trainers to an event, inviting them if its pool exists
    AddTrainers {
        #[arg(short, long)]
        event: i64,
        #[arg(short, long = "trainer", required = true)]
        trainers: Vec<i64>,
    },
    /// Apply database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::from_file(&cli.config).context("failed to load configuration")?;
    settings.validate()?;

    // Held until exit so buffered log lines are flushed
    let _guard = logging::init_logging(&settings.logging)?;
    info!("Starting {}", PoolMate::info());

    let db_pool = create_pool(&settings.database).await.context("database is unreachable")?;

    match cli.command {
        Command::Migrate => {
            run_migrations(&db_pool).await?;
        }
        Command::AssignPools => {
            let (store, services, cascade) = components(&settings, db_pool)?;
            let engine = PoolAssignmentEngine::new(store, services.meeting_provider, cascade, settings.scheduling.clone());
            let summary = AssignPoolsJob::new(engine).run().await?;
            print_json(&summary)?;
        }
        Command::SendReminders { window } => {
            let (store, _, cascade) = components(&settings, db_pool)?;
            let scheduler = ReminderScheduler::new(store, cascade, &settings.scheduling);
            let summary = scheduler.send_due_reminders(window).await?;
            print_json(&summary)?;
        }
        Command::AddTrainers { event, trainers } => {
            let (store, services, cascade) = components(&settings, db_pool)?;
            let engine = PoolAssignmentEngine::new(store, services.meeting_provider, cascade, settings.scheduling.clone());
            let addition = engine.add_trainers(event, &trainers).await?;
            print_json(&addition)?;
        }
    }

    Ok(())
}

/// Store, provider clients and cascade shared by the triggers
fn components(settings: &Settings, db_pool: DatabasePool) -> Result<(Arc<dyn EventStore>, ServiceFactory, NotificationCascade)> {
    let store: Arc<dyn EventStore> = Arc::new(DatabaseService::new(db_pool, &settings.database));
    let services = ServiceFactory::new(settings)?;
    let cascade = NotificationCascade::new(
        services.notification_sender.clone(),
        services.url_shortener.clone(),
        &settings.scheduling,
    );
    Ok((store, services, cascade))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
