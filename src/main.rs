//! Binary entrypoint for the Roombox CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml` and the demo `rooms.json`
//! - `check` - validate the room schemas and report the start room
//! - `render [--room <name>] [--out <path>]` - compile a room against empty state
//! - `play --script <path> [--out <path>]` - replay raw action messages through a frame
//!
//! See the library crate docs for module‑level details: `roombox::`.
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{error, info, warn};

use roombox::compiler::RoomCompiler;
use roombox::config::Config;
use roombox::controller::{LogAlerts, TransitionController};
use roombox::logutil::escape_log;
use roombox::rooms::loader::{load_rooms_from_json, save_rooms_to_json};
use roombox::rooms::{demo_rooms, RoomRegistry, RoomSchema};
use roombox::sandbox::NativeFrames;
use roombox::state::StateMap;
use roombox::store::HostStateStore;

#[derive(Parser)]
#[command(name = "roombox")]
#[command(about = "Host runtime for sandboxed room documents")]
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
    /// Write a default configuration and the demo room set
    Init,
    /// Validate room schemas
    Check,
    /// Compile a room against empty state
    Render {
        /// Room to render (defaults to the start room)
        #[arg(short, long)]
        room: Option<String>,
        /// Write the document here instead of stdout
        #[arg(short, long)]
        out: Option<String>,
    },
    /// Replay a JSON-lines file of raw action messages
    Play {
        /// One JSON message per line; blank lines and `#` comments are skipped
        #[arg(short, long)]
        script: String,
        /// Write the final mounted document here
        #[arg(short, long)]
        out: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Init writes the config, so it starts from defaults
    let config = match cli.command {
        Commands::Init => Config::default(),
        _ => Config::load(&cli.config).await?,
    };
    init_logging(&config, cli.verbose);

    match cli.command {
        Commands::Init => {
            info!("Initializing new roombox configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
            save_rooms_to_json(&config.rooms.schema_file, &demo_rooms())?;
            info!("Demo rooms written to {}", config.rooms.schema_file);
        }
        Commands::Check => {
            let schemas = load_schemas(&config)?;
            let registry = RoomRegistry::build(schemas, config.host.start_room_policy)
                .map_err(|e| fatal(e.into()))?;
            println!("{} rooms OK", registry.len());
            for name in registry.names() {
                let marker = if name == registry.start_room() { " (start)" } else { "" };
                println!("  {}{}", name, marker);
            }
        }
        Commands::Render { room, out } => {
            let schemas = load_schemas(&config)?;
            let registry = RoomRegistry::build(schemas, config.host.start_room_policy)
                .map_err(|e| fatal(e.into()))?;
            let name = room.unwrap_or_else(|| registry.start_room().to_string());
            let schema = registry
                .get(&name)
                .ok_or_else(|| anyhow!("No room named '{}'", name))?;
            let compiled = RoomCompiler::new(config.host.parent_origin.clone()).compile(
                schema,
                &StateMap::new(),
                &StateMap::new(),
            );
            write_document(out.as_deref(), compiled.document()).await?;
        }
        Commands::Play { script, out } => {
            let schemas = load_schemas(&config)?;
            let store = HostStateStore::initialize_with(schemas, config.host.start_room_policy)
                .map_err(|e| fatal(e.into()))?;
            let mut controller = TransitionController::start(
                store,
                RoomCompiler::new(config.host.parent_origin.clone()),
                NativeFrames::new(),
                LogAlerts,
            )?;

            let contents = tokio::fs::read_to_string(&script)
                .await
                .map_err(|e| anyhow!("Failed to read script {}: {}", script, e))?;
            for (lineno, line) in contents.lines().enumerate() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                let raw: serde_json::Value = match serde_json::from_str(line) {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(
                            "{}:{}: not JSON ({}): {}",
                            script,
                            lineno + 1,
                            e,
                            escape_log(line)
                        );
                        continue;
                    }
                };
                match controller.host_mut().frame_mut() {
                    Some(frame) => frame.post_message(raw),
                    None => return Err(anyhow!("No frame mounted")),
                }
                controller.pump()?;
            }

            let snapshot = controller.store().snapshot();
            println!("room: {}", snapshot.current_room);
            println!("inventory: {}", snapshot.inventory.to_snapshot());
            println!("roomState: {}", snapshot.room_state.to_snapshot());
            println!("stats: {:?}", controller.stats());
            if let (Some(path), Some(doc)) = (out.as_deref(), controller.mounted()) {
                write_document(Some(path), doc.document()).await?;
            }
        }
    }
    Ok(())
}

fn load_schemas(config: &Config) -> Result<Vec<RoomSchema>> {
    load_rooms_from_json(&config.rooms.schema_file).map_err(|e| fatal(e.into()))
}

/// Surface an initialization failure as an alert before exiting.
fn fatal(err: anyhow::Error) -> anyhow::Error {
    error!(target: "alert", "ERROR: {}", err);
    err
}

async fn write_document(out: Option<&str>, document: &str) -> Result<()> {
    match out {
        Some(path) => {
            tokio::fs::write(path, document)
                .await
                .map_err(|e| anyhow!("Failed to write {}: {}", path, e))?;
            info!("Document written to {}", path);
        }
        None => println!("{}", document),
    }
    Ok(())
}

fn init_logging(config: &Config, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config.logging.level_filter(),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let file = config.logging.file.as_ref().and_then(|path| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .ok()
    });
    match file {
        Some(f) => {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
            // Mirror to the console only when attached to a terminal
            let is_tty = atty::is(atty::Stream::Stderr);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!(
                    "{} [{}] {}: {}",
                    ts,
                    record.level(),
                    record.target(),
                    record.args()
                );
                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| {
                writeln!(
                    fmt,
                    "{} [{}] {}: {}",
                    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                    record.level(),
                    record.target(),
                    record.args()
                )
            });
        }
    }
    let _ = builder.try_init();
}
