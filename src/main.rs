use auditsync::cli::run::RunOptions;
use auditsync::config::resolve_config_path;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "auditsync")]
#[command(about = "Incremental Zendesk audit log collector", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one collection pass for every configured source
    Run {
        /// Only collect the source with this id
        #[arg(long)]
        source: Option<String>,

        /// Print entries and keep watermarks in memory
        #[arg(long)]
        dry_run: bool,
    },
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Init {
        #[arg(long)]
        stdout: bool,
    },
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so `--dry-run` output on stdout stays clean JSON lines
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auditsync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.as_deref());

    match cli.command {
        Some(Commands::Run { source, dry_run }) => {
            auditsync::cli::run::run(config_path, RunOptions { source, dry_run }).await?;
        }
        None => {
            auditsync::cli::run::run(config_path, RunOptions::default()).await?;
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init { stdout } => {
                auditsync::cli::config::init(stdout)?;
            }
            ConfigAction::Validate => {
                auditsync::cli::config::validate(config_path)?;
            }
        },
    }

    Ok(())
}
