//! Quarry CLI and REST API entry point.
//!
//! Binary name: `quarry`
//!
//! Parses CLI arguments, sets up tracing, opens the data directory, then
//! dispatches to the matching command handler or starts the REST API server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::run::Output;
use cli::{Cli, Commands};
use quarry_observe::{LogFormat, TracingOptions, init_tracing, shutdown_tracing};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut options = TracingOptions::default().with_verbosity(cli.verbose);
    if cli.quiet && cli.verbose == 0 {
        options.default_directive = "error".to_string();
    }
    if cli.log_json {
        options.format = LogFormat::Json;
    }
    options.otel = cli.otel;
    init_tracing(&options).map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = dispatch(cli).await;
    shutdown_tracing();
    result
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let output = Output {
        json: cli.json,
        quiet: cli.quiet,
    };

    // Commands that don't need app state
    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            generate(shell, &mut cmd, "quarry", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Query { topic, query } => {
            return cli::query::show_query(&topic, query, output);
        }
        _ => {}
    }

    let state = AppState::init().await?;

    match cli.command {
        Commands::Run { workflow, request } => {
            cli::run::run_workflow(&state, &workflow, request, output).await?;
        }

        Commands::Workflows => {
            cli::run::list_workflows(&state, output)?;
        }

        Commands::Runs { limit } => {
            cli::run::list_runs(&state, limit, output).await?;
        }

        Commands::Show { run_id } => {
            cli::run::show_run(&state, run_id, output).await?;
        }

        Commands::Resume { run_id } => {
            cli::run::resume_run(&state, run_id, output).await?;
        }

        Commands::Insights => {
            cli::query::show_insights(&state, output).await?;
        }

        Commands::Serve { host, port } => {
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} Quarry API listening on {}",
                console::style("*").green().bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            println!(
                "  {} {}",
                console::style("Data:").bold(),
                state.data_dir.display()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            println!("\n  Server stopped.");
        }

        Commands::Completions { .. } | Commands::Query { .. } => {}
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
