//! Command-line entry point: one query in, one JSON meal plan out.

use clap::Parser;
use platewise::{Config, PlanOptions, PlanService, SourceId};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "platewise", version, about = "Generate a multi-day meal plan from a natural-language request")]
struct Cli {
    /// The request, e.g. "3-day vegetarian meal plan, no nuts, around 1800 calories"
    query: String,

    /// Recipe sources to use (local, mealdb). Defaults to all registered.
    #[arg(long, value_delimiter = ',')]
    sources: Vec<SourceId>,

    /// Skip the completion-service rerank even when one is configured.
    #[arg(long)]
    no_rerank: bool,

    /// Pretty-print the plan JSON.
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.runtime.log_level.clone())),
        )
        .with_writer(std::io::stderr)
        .init();

    let service = match PlanService::new(config) {
        Ok(service) => service,
        Err(err) => {
            eprintln!("startup error: {err}");
            std::process::exit(1);
        }
    };
    let options = PlanOptions {
        sources: cli.sources,
        skip_rerank: cli.no_rerank,
    };

    match service.generate_plan(&cli.query, &options).await {
        Ok(plan) => {
            let rendered = if cli.pretty {
                serde_json::to_string_pretty(&plan)
            } else {
                serde_json::to_string(&plan)
            };
            match rendered {
                Ok(json) => println!("{json}"),
                Err(err) => {
                    eprintln!("failed to serialize plan: {err}");
                    std::process::exit(1);
                }
            }
        }
        Err(err) => {
            eprintln!("{}: {err}", err.kind());
            // Request failures are the caller's to fix; everything else is
            // an operational problem.
            let code = if err.is_request_failure() { 2 } else { 1 };
            std::process::exit(code);
        }
    }
}
