use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "dual-invest")]
#[command(about = "Scheduled savings redemption and dual-asset purchase", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true, default_value = "config/Config.toml")]
    config: String,

    /// Optional log file path (logs to file instead of stderr)
    #[arg(long, global = true, env = "DUAL_LOG_FILE")]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler: one run now, then every configured interval
    Run,
    /// Execute a single run (redemption then purchase) and exit
    Once,
    /// Execute only the redemption stage
    Redeem,
    /// Execute only the purchase stage
    Purchase,
    /// Print the merged configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    let config = dual_invest_core::ConfigLoader::load_from(&cli.config)?;

    match cli.command {
        Commands::Run => commands::run_daemon(&config).await?,
        Commands::Once => commands::run_once(&config).await?,
        Commands::Redeem => commands::run_redeem(&config).await?,
        Commands::Purchase => commands::run_purchase(&config).await?,
        Commands::ShowConfig => commands::show_config(&config)?,
    }

    Ok(())
}
