//! Settings resolution: optional JSON file, then command-line overrides,
//! then an interactive password prompt if nothing else supplied one.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::Args;
use tracing::{debug, info};

use common::{Error, Result};
use sweep::ScanSettings;

#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// JSON settings file; command-line flags override its values
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Router address
    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    #[arg(long, short = 'u')]
    pub user: Option<String>,

    /// SSH password (prompted for when neither this nor a key is given)
    #[arg(long, env = "LINKSCAN_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Private key tried before password authentication
    #[arg(long, short = 'i')]
    pub identity: Option<PathBuf>,

    /// Wireless interface to tune
    #[arg(long)]
    pub interface: Option<String>,

    /// Bound for connecting and the liveness check, in milliseconds
    #[arg(long)]
    pub connect_timeout_ms: Option<u64>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SweepArgs {
    /// First frequency in MHz
    #[arg(long)]
    pub start: Option<u32>,

    /// Last frequency in MHz (inclusive)
    #[arg(long)]
    pub end: Option<u32>,

    /// Frequency step in MHz
    #[arg(long)]
    pub step: Option<u32>,

    /// Wireless protocols to try, comma separated
    #[arg(long, value_delimiter = ',')]
    pub protocols: Option<Vec<String>>,

    /// Channel widths to try, comma separated
    #[arg(long = "widths", value_delimiter = ',')]
    pub channel_widths: Option<Vec<String>>,

    /// Minutes to wait after each change before measuring
    #[arg(long)]
    pub stabilize: Option<f64>,

    /// Address to ping; defaults to the peer's last-ip
    #[arg(long)]
    pub ping_target: Option<IpAddr>,

    #[arg(long)]
    pub ping_count: Option<u32>,

    /// Directory for result files
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Build settings from the optional file and the flags.
pub fn resolve(conn: &ConnectionArgs, sweep: Option<&SweepArgs>) -> Result<ScanSettings> {
    let mut settings = match &conn.config {
        Some(path) => ScanSettings::load(path)?,
        None => ScanSettings::default(),
    };

    apply_connection(&mut settings, conn);
    if let Some(sweep) = sweep {
        apply_sweep(&mut settings, sweep);
    }

    if settings.host.trim().is_empty() {
        return Err(Error::Config(
            "no host given (use --host or the settings file)".into(),
        ));
    }

    debug!(
        host = %settings.host,
        user = %settings.user,
        interface = %settings.interface,
        "resolved settings"
    );
    Ok(settings)
}

fn apply_connection(settings: &mut ScanSettings, conn: &ConnectionArgs) {
    override_with(&mut settings.host, conn.host.clone());
    override_with(&mut settings.port, conn.port);
    override_with(&mut settings.user, conn.user.clone());
    override_with(&mut settings.interface, conn.interface.clone());
    override_with(&mut settings.connect_timeout_ms, conn.connect_timeout_ms);
    if conn.password.is_some() {
        settings.password = conn.password.clone();
    }
    if conn.identity.is_some() {
        settings.identity_file = conn.identity.clone();
    }
}

fn apply_sweep(settings: &mut ScanSettings, sweep: &SweepArgs) {
    override_with(&mut settings.start_frequency, sweep.start);
    override_with(&mut settings.end_frequency, sweep.end);
    override_with(&mut settings.step, sweep.step);
    override_with(&mut settings.protocols, sweep.protocols.clone());
    override_with(&mut settings.channel_widths, sweep.channel_widths.clone());
    override_with(&mut settings.stabilization_minutes, sweep.stabilize);
    override_with(&mut settings.ping_count, sweep.ping_count);
    if sweep.ping_target.is_some() {
        settings.ping_target = sweep.ping_target;
    }
}

fn override_with<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

/// Ask for a password when no credential was configured. Runs the blocking
/// prompt off the async runtime.
pub async fn ensure_password(settings: &mut ScanSettings) -> Result<()> {
    if settings.password.is_some() || settings.identity_file.is_some() {
        return Ok(());
    }

    info!("no password or key configured, prompting");
    let prompt = format!("Password for {}@{}", settings.user, settings.host);
    let password = tokio::task::spawn_blocking(move || {
        dialoguer::Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
    })
    .await
    .map_err(|e| Error::Config(format!("password prompt failed: {e}")))?
    .map_err(|e| Error::Config(format!("password prompt failed: {e}")))?;

    settings.password = Some(password);
    Ok(())
}

/// Where result files go when `--output` is not given.
pub fn default_output_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("linkscan")
        .join("results")
}
