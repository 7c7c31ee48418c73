#![forbid(unsafe_code)]

//! `job-relay-ctl`: terminal client for `job-relay`.
//!
//! Submits one prompt, prints each progress update as it arrives and exits
//! with the session's outcome. Ctrl-c stops listening without failing.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};

use job_relay::client::{self, JobSession, SessionState};
use job_relay::config::{GlobalConfig, TransportPreference};
use job_relay::models::progress::ProgressUpdate;
use job_relay::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "job-relay-ctl",
    about = "Terminal client for the job-relay server",
    version,
    long_about = None
)]
struct Cli {
    /// Path to the TOML configuration file (only `[client]` is used).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured server URL.
    #[arg(long)]
    server_url: Option<String>,

    /// Override the configured reception strategy.
    #[arg(long, value_enum)]
    transport: Option<TransportPreference>,

    /// Log output format (text or json). Logs go to stderr.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a job and stream its progress.
    Run {
        /// Task for the agent.
        prompt: String,
    },

    /// Check that the server answers.
    Health,
}

fn main() -> ExitCode {
    let args = Cli::parse();
    if let Err(err) = init_tracing(args.log_format) {
        eprintln!("Error: {err}");
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error: failed to build tokio runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(args)) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Cli) -> Result<ExitCode> {
    let mut config = match &args.config {
        Some(path) => GlobalConfig::load_from_path(path)?,
        None => GlobalConfig::default(),
    };
    if let Some(url) = args.server_url {
        config.client.server_url = url;
    }
    if let Some(transport) = args.transport {
        config.client.transport = transport;
    }

    match args.command {
        Command::Run { prompt } => run_job(&config, &prompt).await,
        Command::Health => check_health(&config).await,
    }
}

async fn run_job(config: &GlobalConfig, prompt: &str) -> Result<ExitCode> {
    let transport = client::connect(&config.client)?;
    let mut session = JobSession::new(transport, config.client.server_url.clone());

    let job_id = session.start(prompt)?;
    eprintln!("job {job_id} started via {}", session.transport_kind());

    let canceller = session.canceller();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel();
        }
    });

    while let Some(update) = session.recv().await {
        print_update(&update);
    }
    interrupt.abort();

    let tokens = session.total_tokens();
    match session.state() {
        SessionState::Completed => {
            println!(
                "tokens: input={} output={} total={}",
                tokens.input,
                tokens.output,
                tokens.total()
            );
            Ok(ExitCode::SUCCESS)
        }
        SessionState::Cancelled => {
            eprintln!("cancelled");
            Ok(ExitCode::SUCCESS)
        }
        state => {
            eprintln!("{}", session.error().unwrap_or("job did not complete"));
            tracing::debug!(%state, "session ended without completing");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn check_health(config: &GlobalConfig) -> Result<ExitCode> {
    let url = format!("{}/health", config.client.server_url.trim_end_matches('/'));
    let response = reqwest::get(&url).await?;
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        println!("{}", body.trim());
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("server answered {status}");
        Ok(ExitCode::FAILURE)
    }
}

fn print_update(update: &ProgressUpdate) {
    let stamp = update.timestamp.format("%H:%M:%S");
    let marker = if update.is_terminal() { "=" } else { "-" };
    for message in &update.messages {
        println!("[{stamp}] {marker} {message}");
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
