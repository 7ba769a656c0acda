//! Binary entrypoint for the mudcore server.
//!
//! Commands:
//! - `start [--bind <addr>]` - build the default world and accept TCP players
//! - `init` - write a starter `config.toml` and create the data directory
//! - `status` - print the effective configuration and stored player count
//!
//! See the library crate docs for module-level details: `mudcore::`.
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use mudcore::config::Config;
use mudcore::mud::{SledPlayerStore, World};

#[derive(Parser)]
#[command(name = "mudcore")]
#[command(about = "Live-session core of a text-based multiplayer world")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the world server
    Start {
        /// Listen address, overriding `server.bind`
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Write a default configuration file
    Init,
    /// Show configuration and storage summary
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { bind } => {
            let mut config = Config::load(&cli.config).await?;
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            init_logging(&Some(config.clone()), cli.verbose);
            info!("Starting mudcore v{}", env!("CARGO_PKG_VERSION"));

            let store = SledPlayerStore::open(&config.storage.data_dir)?;
            let world = World::new(config.clone(), Arc::new(store));
            world.build_default().await?;
            mudcore::net::serve(world, &config.server.bind).await?;
        }
        Commands::Init => {
            init_logging(&None, cli.verbose);
            info!("Initializing new mudcore configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
            let cfg = Config::default();
            tokio::fs::create_dir_all(&cfg.storage.data_dir).await?;
            info!("Data directory ready at {}", cfg.storage.data_dir);
        }
        Commands::Status => {
            let config = Config::load(&cli.config).await?;
            init_logging(&Some(config.clone()), cli.verbose);
            println!("mudcore v{}", env!("CARGO_PKG_VERSION"));
            println!("  bind:            {}", config.server.bind);
            println!("  start room:      {}", config.world.start_room_text);
            println!("  delivery policy: {:?}", config.delivery.policy);
            println!(
                "  queues:          commands={} inbox={} events={} actions={}",
                config.limits.command_queue,
                config.limits.stimulus_inbox,
                config.limits.room_events,
                config.limits.room_actions
            );
            let store = SledPlayerStore::open(&config.storage.data_dir)?;
            println!("  stored players:  {}", store.player_count());
        }
    }

    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let configured = config
        .as_ref()
        .and_then(|cfg| cfg.logging.level.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Info);
    let base_level = match verbosity {
        0 => configured,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let file = config
        .as_ref()
        .and_then(|cfg| cfg.logging.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

    if let Some(f) = file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Only echo to the console when someone is watching it
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
