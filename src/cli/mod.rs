pub mod history;
pub mod output;
pub mod watch;

use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use history::{process_history_command, HistoryCommand};
use tokio::sync::mpsc;
use tracing::{info, level_filters::LevelFilter};

use crate::{
    persistence::{writer::StorageWriter, PersistenceModule},
    storage::kv::FileKeyValueStorage,
    store::{
        entities::{EventKind, EventSource},
        sleep::SleepTransition,
        EventLogStore, StoreConfig, DEFAULT_EVENT_RETENTION,
    },
    utils::{
        clock::DefaultClock,
        dir::create_application_default_path,
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Daymark", version, long_about = None)]
#[command(about = "Keeps a local log of phone unlocks and sleep times", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(long = "log-filter", global = true, help = "Log level written to the log files")]
    log: Option<LevelFilter>,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console", global = true)]
    log_console: bool,
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_EVENT_RETENTION,
        help = "How many of the most recent unlock events to keep"
    )]
    retention: usize,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Log an unlock right now")]
    Unlock,
    #[command(about = "Log going to sleep")]
    Sleep,
    #[command(about = "Log waking up")]
    Wake,
    #[command(about = "Show how many unlocks were logged today")]
    Today,
    #[command(about = "Show unlocks grouped by day")]
    History {
        #[command(flatten)]
        command: HistoryCommand,
    },
    #[command(about = "Show sleep records", name = "sleep-log")]
    SleepLog,
    #[command(about = "Show tracking state and the last logged action")]
    Status,
    #[command(about = "Turn automatic unlock tracking on or off")]
    Tracking {
        #[arg(value_enum)]
        state: Toggle,
    },
    #[command(
        about = "Read app state names (active, background, inactive) from stdin and log an unlock every time the app comes back to the foreground"
    )]
    Watch,
    #[command(about = "Delete every logged event")]
    Clear {
        #[arg(long, help = "Don't ask for confirmation")]
        yes: bool,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = args.dir.clone().map_or_else(create_application_default_path, Ok)?;
    enable_logging(CLI_PREFIX, &app_dir, args.log, args.log_console)?;

    let storage = FileKeyValueStorage::new(app_dir.join("slots"))?;
    let config = StoreConfig {
        event_retention: Some(args.retention),
        ..Default::default()
    };

    let (sender, receiver) = mpsc::unbounded_channel();
    let persistence = PersistenceModule::new(receiver, StorageWriter::new(&storage));
    let store = EventLogStore::load(&storage, Box::new(DefaultClock), config, sender).await;

    // Dropping the store closes the channel, which lets persistence finish its backlog and stop.
    let (command_result, persistence_result) = tokio::join!(
        async move {
            let mut store = store;
            execute(args.commands, &mut store).await
        },
        persistence.run(),
    );

    persistence_result?;
    command_result
}

async fn execute(command: Commands, store: &mut EventLogStore) -> Result<()> {
    match command {
        Commands::Unlock => {
            let event = store.record_event(EventKind::Unlock, EventSource::Manual);
            output::print_recorded(&event, store);
        }
        Commands::Sleep => {
            let record = store.record_sleep_transition(SleepTransition::Sleep);
            output::print_sleep_record(&record, store.clock());
            if store.open_sleep_records() > 1 {
                println!(
                    "{} sleep records are still waiting for a wake time",
                    store.open_sleep_records()
                );
            }
        }
        Commands::Wake => {
            let record = store.record_sleep_transition(SleepTransition::Wake);
            output::print_sleep_record(&record, store.clock());
        }
        Commands::Today => println!("{}", store.today_count()),
        Commands::History { command } => process_history_command(command, store)?,
        Commands::SleepLog => {
            if store.sleep_records().is_empty() {
                println!("No sleep records yet");
            }
            for record in store.sleep_records() {
                output::print_sleep_record(record, store.clock());
            }
        }
        Commands::Status => output::print_status(store),
        Commands::Tracking { state } => {
            store.set_tracking(matches!(state, Toggle::On));
            println!("Tracking is {}", store.tracking());
        }
        Commands::Watch => watch::watch_stdin(store).await?,
        Commands::Clear { yes } => {
            if yes || confirm("This deletes every logged event and cannot be undone. Continue?")? {
                store.clear_all();
                println!("Cleared");
            } else {
                info!("Clear was cancelled");
                println!("Nothing was deleted");
            }
        }
    }
    Ok(())
}

fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
