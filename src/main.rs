use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pollbot::cli::Cli;
use pollbot::config::PollServiceConfig;
use pollbot::polls::{issuer, sweeper, PollCommand, PollStore, StoreLimits};

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = match PollServiceConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load configuration: {err}");
            std::process::exit(1);
        }
    };
    let filter = cli.log_level.as_deref().unwrap_or(&config.log_level);
    init_tracing(filter);

    let store = Arc::new(PollStore::new(StoreLimits {
        max_polls: config.max_polls,
        max_codes_per_poll: config.max_codes_per_poll,
        code_length: config.code_length,
    }));

    let command_spec = PollCommand::spec();
    tracing::info!(
        command = command_spec.name,
        endpoint = %config.code_endpoint(),
        poll_timeout_secs = config.poll_timeout_secs,
        "poll service starting"
    );

    let sweep = sweeper::spawn(store.clone(), config.poll_timeout(), config.sweep_interval());

    tokio::select! {
        result = issuer::serve(&config, store.clone()) => {
            if let Err(err) = result {
                tracing::error!(error = %err, "code issuer exited");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    sweep.abort();
    tracing::info!(active_polls = store.active_polls(), "poll service stopped");
}
