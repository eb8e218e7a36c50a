use clap::Parser;
use poly_edge::cli::{Cli, Commands};
use poly_edge::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration; a missing or broken file falls back to defaults
    let (config, load_error) = match Config::load(&cli.config) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    // Initialize telemetry
    poly_edge::telemetry::init_telemetry(&config.telemetry)?;
    if let Some(e) = load_error {
        tracing::warn!(path = %cli.config, error = %e, "Could not load config, using defaults");
    }

    match cli.command {
        Commands::Run(args) => {
            tracing::info!("Starting engine");
            args.execute(config).await?;
        }
        Commands::Discover(args) => {
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("# Effective configuration ({})", cli.config);
            println!("{}", toml::to_string_pretty(&config)?);
            for warning in config.trade.warnings() {
                println!("# warning: {warning}");
            }
        }
    }

    Ok(())
}
