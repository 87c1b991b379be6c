mod config;
mod console;
mod logging;
mod sink;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use common::{Error, Result};
use probe::{IcmpEcho, Prober};
use ssh::Session;
use sweep::{Orchestrator, ScanSettings, ScanState, validate_interface};

use config::{ConnectionArgs, SweepArgs};
use console::{ConsoleObserver, LogListener};
use sink::JsonLinesSink;

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "linkscan", version, about = "Radio link sweep over SSH")]
struct Args {
    /// Print every command and response
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sweep frequencies, protocols and channel widths, then restore the
    /// original configuration
    Scan {
        #[command(flatten)]
        connection: ConnectionArgs,
        #[command(flatten)]
        sweep: SweepArgs,
    },
    /// Read the current link telemetry once
    Status {
        #[command(flatten)]
        connection: ConnectionArgs,
        /// Address to ping; defaults to the peer's last-ip
        #[arg(long)]
        ping_target: Option<std::net::IpAddr>,
    },
    /// List the device's wireless interfaces
    Interfaces {
        #[command(flatten)]
        connection: ConnectionArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to a rolling file; stdout carries results.
    let _log_guard = logging::init_logging();

    let result = match &args.command {
        Command::Scan { connection, sweep } => run_scan(connection, sweep, args.verbose).await,
        Command::Status {
            connection,
            ping_target,
        } => run_status(connection, *ping_target, args.verbose).await,
        Command::Interfaces { connection } => run_interfaces(connection).await,
    };

    if let Err(e) = &result {
        error!(%e, "command failed");
    }
    result
}

/// Resolve credentials and open the session.
async fn connect(settings: &mut ScanSettings) -> Result<Session> {
    config::ensure_password(settings).await?;

    let mut session = Session::new()
        .with_listener(Arc::new(LogListener))
        .with_liveness_command(settings.liveness_command.as_str());
    info!(host = %settings.host, port = settings.port, "connecting");
    if !session
        .connect(settings.credentials(), settings.connect_timeout())
        .await
    {
        let reason = session
            .last_failure()
            .map(|f| f.report.to_string())
            .unwrap_or_else(|| "unknown error".into());
        return Err(Error::Connection(reason));
    }
    Ok(session)
}

/// ICMP sockets may be unavailable to unprivileged users; probes then count
/// as lost instead of stopping the scan.
fn echo_transport() -> Prober<Option<IcmpEcho>> {
    let echo = match IcmpEcho::new() {
        Ok(echo) => Some(echo),
        Err(e) => {
            warn!(%e, "ICMP unavailable, ping results will show total loss");
            eprintln!("warning: {e}");
            None
        }
    };
    Prober::new(echo)
}

/// Cancel `token` on the first Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("stopping after the current command, restoring settings...");
            token.cancel();
        }
    });
}

async fn run_scan(connection: &ConnectionArgs, sweep: &SweepArgs, verbose: bool) -> Result<()> {
    let mut settings = config::resolve(connection, Some(sweep))?;
    settings.validate()?;
    let output = sweep
        .output
        .clone()
        .unwrap_or_else(config::default_output_dir);

    let session = connect(&mut settings).await?;
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let mut scan = Orchestrator::new(settings, session, echo_transport())
        .with_observer(Arc::new(ConsoleObserver { verbose }))
        .with_sink(Box::new(JsonLinesSink::new(&output)))
        .with_cancel(cancel);

    let outcome = scan.run().await;
    scan.into_shell().disconnect().await;
    let outcome = outcome?;

    info!(state = %outcome.state, emitted = outcome.emitted, "scan finished");
    eprintln!(
        "{}: {} results written to {}",
        outcome.state,
        outcome.emitted,
        output.display()
    );

    match (outcome.state, outcome.failure) {
        (ScanState::Failed, Some(report)) => Err(Error::SessionLost(report.to_string())),
        (ScanState::Failed, None) => Err(Error::SessionLost("scan failed".into())),
        _ => Ok(()),
    }
}

async fn run_status(
    connection: &ConnectionArgs,
    ping_target: Option<std::net::IpAddr>,
    verbose: bool,
) -> Result<()> {
    let mut settings = config::resolve(connection, None)?;
    if ping_target.is_some() {
        settings.ping_target = ping_target;
    }

    let session = connect(&mut settings).await?;
    let mut orchestrator = Orchestrator::new(settings, session, echo_transport())
        .with_observer(Arc::new(ConsoleObserver { verbose }));

    let status = orchestrator.query_status().await;
    orchestrator.into_shell().disconnect().await;

    println!("{}", serde_json::to_string_pretty(&status?)?);
    Ok(())
}

async fn run_interfaces(connection: &ConnectionArgs) -> Result<()> {
    let mut settings = config::resolve(connection, None)?;
    let mut session = connect(&mut settings).await?;

    let check = validate_interface(&mut session, &settings, &settings.interface).await;
    session.disconnect().await;

    if let Some(error) = &check.error {
        if check.available.is_empty() {
            return Err(Error::Channel(error.clone()));
        }
    }

    for name in &check.available {
        let marker = if name.eq_ignore_ascii_case(&settings.interface) {
            "*"
        } else {
            " "
        };
        println!("{marker} {name}");
    }

    if check.is_valid {
        eprintln!("interface '{}' found", settings.interface);
        Ok(())
    } else {
        Err(check.into_error(&settings.interface))
    }
}
