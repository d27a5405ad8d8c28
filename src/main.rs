//! cf-ddns - keep a Cloudflare A record in sync with your public IP.

use cf_ddns::config::Config;
use cf_ddns::detector::IpDetector;
use cf_ddns::providers::{CloudflareProvider, DnsProvider};
use cf_ddns::updater::{TickOutcome, Updater};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cf-ddns")]
#[command(about = "Keep a Cloudflare A record pointed at your public IPv4 address")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    settings: SettingsArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct SettingsArgs {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Cloudflare API token
    #[arg(long, env = "APIKey", global = true, hide_env_values = true)]
    api_key: Option<String>,

    /// Cloudflare zone ID
    #[arg(long, env = "Zone", global = true)]
    zone: Option<String>,

    /// Fully-qualified record name
    #[arg(long, env = "RecordName", global = true)]
    record_name: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll forever and update the record when the IP changes (default)
    Run {
        /// Check interval in seconds
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Run a single check/update pass and exit
    Once,

    /// Show the detected public IP and the record's current content
    Status,

    /// Print an example configuration file
    ExampleConfig,
}

fn get_config_path(cli_path: Option<PathBuf>) -> PathBuf {
    if let Some(path) = cli_path {
        return path;
    }

    let candidates = [
        dirs::config_dir().map(|p| p.join("cf-ddns/config.toml")),
        Some(PathBuf::from("/etc/cf-ddns/config.toml")),
        Some(PathBuf::from("config.toml")),
    ];

    for candidate in candidates.into_iter().flatten() {
        if candidate.exists() {
            return candidate;
        }
    }

    Config::default_path().unwrap_or_else(|_| PathBuf::from("config.toml"))
}

fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Load the config file, apply overrides and start logging.
fn load_config(args: SettingsArgs) -> anyhow::Result<Config> {
    let config_path = get_config_path(args.config);
    let mut config = Config::load_from(&config_path)?;
    config.merge_overrides(args.api_key, args.zone, args.record_name);

    init_logging(&config.log_level);
    tracing::debug!("Loaded {:?} from {}", config, config_path.display());

    let missing = config.missing_fields();
    if !missing.is_empty() {
        tracing::warn!("Missing settings: {}", missing.join(", "));
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run { interval: None }) {
        Commands::Run { interval } => {
            let mut config = load_config(cli.settings)?;
            if let Some(secs) = interval {
                config.set_interval(secs)?;
            }
            cmd_run(config).await?;
        }
        Commands::Once => cmd_once(load_config(cli.settings)?).await?,
        Commands::Status => cmd_status(load_config(cli.settings)?).await?,
        Commands::ExampleConfig => print!("{}", Config::example().to_toml()?),
    }

    Ok(())
}

fn build(config: &Config) -> anyhow::Result<(IpDetector, CloudflareProvider)> {
    let detector = IpDetector::with_services(config.ip_services.clone())?;
    let provider = CloudflareProvider::with_base_url(
        &config.api_token,
        config.zone_id.clone(),
        config.record_name.clone(),
        config.api_base_url.clone(),
    )?;
    Ok((detector, provider))
}

/// Resolve the record or exit: nothing can be updated without its ID.
async fn connect(config: &Config) -> anyhow::Result<Updater> {
    let (detector, provider) = build(config)?;

    match Updater::start(Box::new(detector), Box::new(provider), config.interval()).await {
        Ok(updater) => Ok(updater),
        Err(code) => std::process::exit(code),
    }
}

async fn cmd_run(config: Config) -> anyhow::Result<()> {
    let mut updater = connect(&config).await?;
    updater.run().await;
    Ok(())
}

async fn cmd_once(config: Config) -> anyhow::Result<()> {
    let mut updater = connect(&config).await?;

    match updater.tick().await {
        TickOutcome::Updated(_) | TickOutcome::Unchanged(_) => Ok(()),
        TickOutcome::FetchFailed => anyhow::bail!("could not detect public IP"),
        TickOutcome::UpdateFailed(ip) => anyhow::bail!("could not set record to {}", ip),
    }
}

async fn cmd_status(config: Config) -> anyhow::Result<()> {
    let (detector, provider) = build(&config)?;

    println!("cf-ddns Status");
    println!("==============\n");

    match detector.detect_ipv4().await {
        Ok(ip) => println!("Current Public IP: {}", ip),
        Err(e) => println!("Failed to detect IP: {}", e),
    }

    print!("{} (zone {}): ", provider.record_name(), config.zone_id);

    match provider.get_record().await {
        Ok(record) => println!(
            "{} [id {}, ttl {}, proxied {}]",
            record.content, record.id, record.ttl, record.proxied
        ),
        Err(e) => println!("error: {}", e),
    }

    Ok(())
}
