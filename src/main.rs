//! gerrit-ssh - Gerrit event streaming and administration over SSH.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gerrit_ssh::admin::ReviewCommand;
use gerrit_ssh::config::{ConfigLoader, GerritConfig};
use gerrit_ssh::display;
use gerrit_ssh::watcher::WatcherStatus;
use gerrit_ssh::GerritClient;

#[derive(Parser)]
#[command(
    name = "gerrit-ssh",
    about = "Gerrit event streaming and administration over SSH",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (default: search .gerrit-ssh.toml, then the user config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Gerrit host name.
    #[arg(long, global = true)]
    host: Option<String>,

    /// SSH user name.
    #[arg(long, short = 'u', global = true)]
    user: Option<String>,

    /// SSH port.
    #[arg(long, short = 'p', global = true)]
    port: Option<u16>,

    /// SSH identity file.
    #[arg(long, short = 'i', global = true)]
    keyfile: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow `gerrit stream-events`, reconnecting on failure.
    StreamEvents {
        /// Connect attempts per reconnect; zero or negative retries forever.
        #[arg(long)]
        attempts: Option<i64>,
        /// Seconds between attempts and between reconnects.
        #[arg(long)]
        retry_delay: Option<f64>,
        /// Print events as raw JSON lines.
        #[arg(long)]
        raw: bool,
    },
    /// Print the server version.
    Version,
    /// List projects.
    LsProjects {
        /// Include project descriptions.
        #[arg(short, long)]
        description: bool,
    },
    /// List groups.
    LsGroups {
        /// Include group details.
        #[arg(long)]
        verbose_groups: bool,
    },
    /// List installed plugins.
    Plugins,
    /// Run a change query and print every result line.
    Query {
        /// Gerrit query, e.g. `status:open project:infra/tools`.
        query: String,
    },
    /// Review a change.
    Review {
        /// Change number with patch set (`12345,2`) or a commit.
        change: String,
        /// Project of the change.
        #[arg(long)]
        project: String,
        /// Review message.
        #[arg(short, long)]
        message: Option<String>,
        /// Label vote as `name=value`, e.g. `code-review=+2`.
        #[arg(long = "label", value_parser = parse_label)]
        labels: Vec<(String, String)>,
        /// Bare flags such as `submit` or `abandon`.
        #[arg(long = "flag")]
        flags: Vec<String>,
    },
}

fn parse_label(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected name=value, got `{s}`"))
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(cli: &Cli) -> Result<GerritConfig, Box<dyn std::error::Error>> {
    let loader = match &cli.config {
        Some(path) => ConfigLoader::with_path(path.clone()),
        None => ConfigLoader::new(),
    };
    let mut config = loader.load()?;
    if let Some(host) = &cli.host {
        config.hostname.clone_from(host);
    }
    if let Some(user) = &cli.user {
        config.username.clone_from(user);
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(keyfile) = &cli.keyfile {
        config.keyfile = Some(keyfile.clone());
    }
    Ok(config)
}

async fn stream_events(
    mut client: GerritClient,
    config: &GerritConfig,
    attempts: Option<i64>,
    retry_delay: Option<f64>,
    raw: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    client.start_watching(
        attempts.unwrap_or(config.watcher.connection_attempts),
        retry_delay.unwrap_or(config.watcher.retry_delay_secs),
    )?;
    let Some(tracker) = client.status_tracker() else {
        return Ok(());
    };
    let mut status = tracker.subscribe();
    let initial = *status.borrow_and_update();
    display::print_status(initial);
    let mut dead = initial == WatcherStatus::Dead;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    while !dead {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted, stopping event watcher");
                break;
            }
            event = client.get_event() => display::print_event(&event, raw),
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *status.borrow_and_update();
                display::print_status(current);
                dead = current == WatcherStatus::Dead;
            }
        }
    }

    while let Some(event) = client.try_get_event() {
        display::print_event(&event, raw);
    }
    client.stop_watching().await?;
    Ok(())
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&cli)?;
    let client = GerritClient::new(&config)?;

    match cli.command {
        Commands::StreamEvents {
            attempts,
            retry_delay,
            raw,
        } => stream_events(client, &config, attempts, retry_delay, raw).await?,
        Commands::Version => println!("{}", client.get_version().await?),
        Commands::LsProjects { description } => {
            for project in client.list_projects(description).await? {
                println!("{project}");
            }
        }
        Commands::LsGroups { verbose_groups } => {
            for group in client.list_groups(verbose_groups).await? {
                println!("{group}");
            }
        }
        Commands::Plugins => {
            for plugin in client.list_plugins().await? {
                println!("{plugin}");
            }
        }
        Commands::Query { query } => {
            for row in client.bulk_query(&query).await? {
                println!("{}", serde_json::Value::Object(row));
            }
        }
        Commands::Review {
            change,
            project,
            message,
            labels,
            flags,
        } => {
            let mut review = ReviewCommand::new(change, project);
            if let Some(message) = message {
                review = review.message(message);
            }
            for (name, value) in labels {
                review = review.label(name, value);
            }
            for flag in flags {
                review = review.flag(flag);
            }
            let stderr = client.review(&review).await?;
            if !stderr.trim().is_empty() {
                eprintln!("{}", stderr.trim_end());
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            display::print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
