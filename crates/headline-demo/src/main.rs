use clap::Parser;
use headline_core::{Prediction, RowOutcome};
use headline_demo::cli::{Cli, Commands};
use headline_demo::config::AppConfig;
use headline_demo::server::run_server;
use headline_demo::state::{AppState, LoadStatus};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Secrets may come from a .env file; a missing file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let common = cli.command.common().clone();
    init_logging(common.verbose);

    let config = AppConfig::load(&common.config)?;
    let state = AppState::new(config).await;

    match cli.command {
        Commands::Serve {
            port,
            address,
            preload,
            ..
        } => {
            let addr: SocketAddr = format!("{}:{}", address, port).parse()?;

            if preload {
                for report in state.load_reports().await {
                    if let LoadStatus::Failed { message, .. } = &report.status {
                        tracing::warn!(model = %report.name, "Preload failed: {}", message);
                    }
                }
            }

            println!();
            println!("  Headline Title Classifier");
            println!("  Models:  {}", model_names(&state));
            println!();
            println!("  Open http://{} in your browser", addr);
            println!();

            run_server(state, addr).await?;
        }

        Commands::Predict {
            headline, markdown, ..
        } => {
            let headline = headline.trim();
            if headline.is_empty() {
                anyhow::bail!("headline must not be empty");
            }

            let table = state.classify(headline).await;
            if markdown {
                for row in &table.rows {
                    match &row.outcome {
                        RowOutcome::Predicted { category, score } => {
                            let prediction = Prediction {
                                model_name: row.model_name.clone(),
                                category: category.clone(),
                                score: *score,
                            };
                            print!("{}", prediction.to_markdown());
                        }
                        RowOutcome::Failed { message, .. } => {
                            print!("__Model: {}__\n\nError: {}\n\n", row.model_name, message);
                        }
                    }
                }
            } else {
                println!("Headline: {}", table.headline);
                println!();
                print!("{}", table.to_text());
            }

            let failures = table.failures().count();
            if failures > 0 {
                anyhow::bail!("{} of {} models failed", failures, table.len());
            }
        }

        Commands::Fetch { .. } => {
            let mut failures = 0;
            for (name, outcome) in state.fetch_all().await {
                match outcome {
                    Ok(outcome) => println!("{}: {}", name, serde_json::to_string(&outcome)?),
                    Err(e) => {
                        failures += 1;
                        eprintln!("{}: {}", name, e);
                    }
                }
            }

            if failures > 0 {
                anyhow::bail!("{} models could not be fetched", failures);
            }
        }
    }

    Ok(())
}

fn model_names(state: &AppState) -> String {
    state
        .config
        .models
        .iter()
        .map(|m| m.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        "headline=debug,tower_http=debug"
    } else {
        "headline=info,tower_http=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
