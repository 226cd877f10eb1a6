use anyhow::Context;
use clap::Parser;
use log::info;
use packaging_advisor::{app::Application, app::Command, services::outcome_payload, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Packaging material recommendations backed by past shipments.
#[derive(Parser, Debug)]
#[command(name = "packaging-advisor", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Logs go to stderr so stdout carries only the JSON payload
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "packaging_advisor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    info!("Loading configuration...");
    let outcome = match Config::load() {
        Ok(config) => match Application::new(&config) {
            Ok(app) => app.run(cli.command).await,
            Err(e) => Err(e),
        },
        Err(e) => Err(e),
    };

    let payload = outcome_payload(&outcome);
    let rendered = serde_json::to_string_pretty(&payload).context("Failed to render output")?;
    println!("{}", rendered);

    if outcome.is_err() {
        std::process::exit(1);
    }
    Ok(())
}
