//! NoOps CLI - Entry Point
//!
//! Drives deployments on the NoOps platform: uploads a stack file, then
//! serves the brain's commands until the deployment finishes.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use futures::FutureExt;
use secrecy::SecretString;
use tracing::{debug, info};

use noops::app::options::AppOptions;
use noops::app::run::{render_deployments, App, ShutdownSignal};
use noops::deploy::docker::DockerCli;
use noops::deploy::upload::HttpUploader;
use noops::filesys::file::File;
use noops::http::client::HttpClient;
use noops::logs::{init_logging, LogOptions};
use noops::storage::layout::StorageLayout;
use noops::storage::settings::{Settings, TOKEN_ENV_VAR};
use noops::utils::version_info;
use noops::workers::poller::WaitOutcome;

#[derive(Parser)]
#[command(name = "noops")]
#[command(about = "The NoOps cli used to manage deployments", long_about = None)]
struct Cli {
    /// Settings file (default: ~/.noops/settings.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Bearer token for the brain API
    #[arg(long, global = true, env = TOKEN_ENV_VAR, hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a stack file to the specified environment
    Deploy {
        /// The environment to deploy to
        #[arg(short = 'e', long = "env")]
        env: String,

        /// The location of your stack file
        #[arg(short, long, default_value = "stack.yml")]
        file: PathBuf,

        #[command(flatten)]
        poll: PollArgs,
    },

    /// Watch a deployment via polling
    Watch {
        /// The deployment ID you want to watch
        #[arg(short, long)]
        deployment: String,

        #[command(flatten)]
        poll: PollArgs,
    },

    /// List active deployments
    Deployments {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print version information
    Version,
}

#[derive(Args)]
struct PollArgs {
    /// Seconds between polls
    #[arg(long)]
    interval: Option<u64>,

    /// Seconds to wait for the deployment before giving up
    #[arg(long)]
    expiry: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!("{}", serde_json::to_string_pretty(&version_info())?);
        return Ok(());
    }

    // Retrieve the settings file
    let settings_file = match &cli.config {
        Some(path) => File::new(path),
        None => StorageLayout::default().settings_file(),
    };
    let mut settings = Settings::load(&settings_file).await?;
    settings.apply_env(|key| std::env::var(key).ok())?;

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        json_format: settings.log_json,
    };
    if let Err(e) = init_logging(log_options) {
        eprintln!("Failed to initialize logging: {e}");
    }
    debug!("Using settings from {}", settings_file.path().display());

    let options = AppOptions::from_settings(&settings);
    let http_client = match cli.token.filter(|t| !t.is_empty()) {
        Some(token) => HttpClient::with_token(&options.brain_base_url, SecretString::from(token))?,
        None => HttpClient::new(&options.brain_base_url)?,
    };
    info!("Using brain at {}", http_client.base_url());

    let build_app = |options: AppOptions| -> Result<App> {
        Ok(App::new(
            Arc::new(http_client),
            Arc::new(DockerCli::new()),
            Arc::new(HttpUploader::new()?),
            options,
        ))
    };

    match cli.command {
        Commands::Deploy { env, file, poll } => {
            let app = build_app(options.with_poll_overrides(poll.interval, poll.expiry))?;
            let outcome = app
                .deploy(&env, &file, shutdown_signal())
                .await
                .with_context(|| format!("deployment to {} failed", env))?;
            report(outcome);
        }
        Commands::Watch { deployment, poll } => {
            let app = build_app(options.with_poll_overrides(poll.interval, poll.expiry))?;
            let outcome = app
                .watch(&deployment, shutdown_signal())
                .await
                .with_context(|| format!("watching deployment {} failed", deployment))?;
            report(outcome);
        }
        Commands::Deployments { json } => {
            let app = build_app(options)?;
            let deployments = app.list_deployments().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&deployments)?);
            } else {
                println!("{}", render_deployments(&deployments));
            }
        }
        Commands::Version => {}
    }

    Ok(())
}

fn report(outcome: WaitOutcome) {
    match outcome {
        WaitOutcome::Finished(command) => {
            debug!("Finished by command {}", command.id);
            println!("\nDeployment complete.");
        }
        WaitOutcome::AlreadyFinished => {
            println!("\nDeployment already complete.");
        }
    }
}

fn shutdown_signal() -> ShutdownSignal {
    await_shutdown_signal().boxed()
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("SIGTERM received, shutting down...");
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl+C received, shutting down...");
                }
            }
            return;
        }
    }

    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Ctrl+C received, shutting down...");
    } else {
        // no way to listen for signals, never cancel
        std::future::pending::<()>().await;
    }
}
