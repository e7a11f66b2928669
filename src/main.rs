use anyhow::Context;
use clap::Parser;
use ohlc_collector::cli::{Cli, Commands};
use ohlc_collector::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Checkpoint inspection needs no configuration
    if let Commands::Checkpoints(args) = &cli.command {
        return args.execute().await;
    }

    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config))?;

    let _telemetry = ohlc_collector::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            tracing::info!("Starting collector");
            args.execute(&config).await?;
        }
        Commands::Once(args) => {
            tracing::info!("Running a single collection cycle");
            args.execute(&config).await?;
        }
        Commands::Checkpoints(_) => {}
        Commands::Config => {
            let collector = &config.collector;
            println!("Current configuration:");
            println!("  Period: {}s", collector.period_secs);
            println!("  Periods: {:?}", collector.periods);
            println!("  Default after: {}", collector.after);
            println!(
                "  Markets: {} exchanges, {} pairs",
                collector.markets.len(),
                collector.total_pairs()
            );
            for market in &collector.markets {
                println!("    {}: {}", market.exchange, market.pairs.join(", "));
            }
            println!("  API: {}", config.api.base_url);
            println!("  Sink: {:?}", config.sink.kind);
        }
    }

    Ok(())
}
