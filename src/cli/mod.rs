use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use getappt_core::{Config, ConfigError, DeliveryError};
use getappt_ews::{Credentials, EwsClient, EwsError, ExchangeVersion};

use crate::delivery::Delivery;

pub mod appointments;
pub mod availability;
pub mod init;

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Fetch the next upcoming appointments of every user (default)
    Appointments,
    /// Fetch free/busy availability of all users in one batched query
    Availability,
    /// Write a default configuration file
    Init,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Set output to verbose messages
    #[arg(short, long, action, global = true, default_value = "false")]
    pub verbose: bool,

    /// Enable protocol tracing output
    #[arg(short, long, action, global = true, default_value = "false")]
    pub trace: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();

    getappt_core::init_logging(args.verbose, args.trace.then_some(getappt_ews::TRACE_TARGET));

    let stdout = std::io::stdout();
    execute(&args, &mut stdout.lock()).await
}

/// Run one invocation, writing user-facing output to `out`.
pub async fn execute<W: Write>(args: &Cli, out: &mut W) -> Result<()> {
    let command = args.command.unwrap_or(Command::Appointments);

    if command == Command::Init {
        return init::run(args.config.as_deref(), out);
    }

    let config = Config::load_validated(args.config.as_deref())
        .context("Failed to load configuration")?;
    let users = config.exchange.user_list()?;
    let client = build_client(&config, args.trace)?;

    if args.verbose {
        writeln!(out, "Using '{}' as server URL", client.endpoint())?;
    }

    let json = match command {
        Command::Availability => availability::run(&client, &users, &config.availability).await?,
        _ => appointments::run(&client, &users, &config.appointments).await?,
    };

    let delivery = Delivery::from_config(&config.delivery);
    if args.verbose && delivery.is_put() {
        writeln!(out, "{}", json)?;
    }
    delivery
        .deliver(&json, args.verbose, out)
        .await
        .context("Failed to deliver calendar data")?;

    Ok(())
}

fn build_client(config: &Config, trace: bool) -> Result<EwsClient> {
    let exchange = &config.exchange;

    let credentials = match (&exchange.token, &exchange.username) {
        (Some(token), _) if !token.is_empty() => Some(Credentials::Bearer(token.clone())),
        (_, Some(username)) if !username.is_empty() => Some(Credentials::Basic {
            username: username.clone(),
            password: exchange.password.clone().unwrap_or_default(),
        }),
        _ => None,
    };

    let version: ExchangeVersion = exchange.version.parse()?;
    let client = EwsClient::new(&exchange.server_url, credentials, version)?.with_trace(trace);
    Ok(client)
}

/// Short, actionable hint for the first recognised error in the chain.
pub fn user_hint(err: &anyhow::Error) -> Option<String> {
    err.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<ConfigError>() {
            return Some(e.user_message().to_string());
        }
        if let Some(e) = cause.downcast_ref::<DeliveryError>() {
            return Some(e.user_message().to_string());
        }
        cause.downcast_ref::<EwsError>().map(EwsError::user_message)
    })
}
