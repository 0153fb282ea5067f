//! statusdeck: command-line entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Resolve effective log level (CLI `-v` flags > env > config)
//!   4. Init logger once
//!   5. Load the service registry
//!   6. Build fetcher → dispatcher → fan-out
//!   7. Run the selected command (`check`, `service <NAME>`, `serve`)

use std::path::PathBuf;

use tracing::info;

use statusdeck::bootstrap::logger;
use statusdeck::config;
use statusdeck::dispatch::Dispatcher;
use statusdeck::error::AppError;
use statusdeck::fanout::FanOut;
use statusdeck::fetch::Fetcher;
use statusdeck::registry::Registry;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // .env is optional.
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let mut config = config::load(args.config_path.as_deref())?;
    if let Some(path) = args.registry_path {
        config.registry_path = path;
    }

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    let force_cli_level = args.log_level.is_some();

    logger::init(effective_log_level, force_cli_level, config.log_file.as_deref())?;

    let registry = Registry::load(&config.registry_path)?;
    info!(
        registry = %config.registry_path.display(),
        services = registry.len(),
        concurrency = config.fetch.concurrency,
        "statusdeck starting"
    );

    let fetcher = Fetcher::new(&config.fetch)?;
    let fanout = FanOut::new(Dispatcher::new(fetcher.clone()), config.fetch.concurrency);

    let command = args.command.unwrap_or(if config.server.enabled {
        Command::Serve
    } else {
        Command::Check
    });

    match command {
        Command::Check => {
            let results = fanout.fetch_all(registry.entries()).await;
            print_json(&results)
        }
        Command::Service(name) => match fanout.fetch_one(&registry, &name).await {
            Some(status) => print_json(&status),
            None => Err(AppError::Registry(format!("no service named '{name}'"))),
        },
        Command::Serve => serve(config, registry, fanout, fetcher).await,
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), AppError> {
    let out = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    println!("{out}");
    Ok(())
}

#[cfg(feature = "server")]
async fn serve(
    config: config::Config,
    registry: Registry,
    fanout: FanOut,
    fetcher: Fetcher,
) -> Result<(), AppError> {
    use statusdeck::cache::StatusCache;
    use statusdeck::server::{self, ServerState};
    use tokio_util::sync::CancellationToken;

    let shutdown = CancellationToken::new();

    // Ctrl-C cancels the shared token; the server and refresh loop follow it.
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, shutting down");
            ctrlc_token.cancel();
        }
    });

    let cache = StatusCache::new(fanout, registry, config.cache.clone());
    let state = ServerState { cache, fetcher };
    server::run(&config.server, state, shutdown).await
}

#[cfg(not(feature = "server"))]
async fn serve(
    _config: config::Config,
    _registry: Registry,
    _fanout: FanOut,
    _fetcher: Fetcher,
) -> Result<(), AppError> {
    Err(AppError::Server("built without the `server` feature".into()))
}

// ── CLI ───────────────────────────────────────────────────────────────────────

enum Command {
    Check,
    Service(String),
    Serve,
}

struct CliArgs {
    log_level: Option<&'static str>,
    config_path: Option<String>,
    registry_path: Option<PathBuf>,
    command: Option<Command>,
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut config_path = None;
    let mut registry_path = None;
    let mut command = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: statusdeck [OPTIONS] [COMMAND]");
                println!();
                println!("Commands:");
                println!("  check                      Fetch every registered service once and print JSON (default)");
                println!("  service <NAME>             Fetch a single service by name and print JSON");
                println!("  serve                      Run the HTTP read API and same-origin proxy");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("  -r, --registry <PATH>      Path to the service registry JSON");
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                std::process::exit(0);
            }
            "-f" | "--config" => {
                if let Some(path) = iter.next() {
                    config_path = Some(path);
                } else {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            }
            "-r" | "--registry" => {
                if let Some(path) = iter.next() {
                    registry_path = Some(config::expand_home(&path));
                } else {
                    eprintln!("error: -r/--registry requires a path argument");
                    std::process::exit(1);
                }
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            "check" => command = Some(Command::Check),
            "serve" => command = Some(Command::Serve),
            "service" => {
                if let Some(name) = iter.next() {
                    command = Some(Command::Service(name));
                } else {
                    eprintln!("error: service requires a NAME argument");
                    std::process::exit(1);
                }
            }
            other => {
                eprintln!("error: unrecognised argument '{other}' (see --help)");
                std::process::exit(1);
            }
        }
    }

    CliArgs {
        log_level: logger::verbosity_level(verbosity),
        config_path,
        registry_path,
        command,
    }
}
