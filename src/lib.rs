pub mod commands;
pub mod db;
pub mod entity;
pub mod error;
pub mod json_loader;
pub mod labels;
mod migrations;
pub mod services;
pub mod state;
pub mod store;
pub mod timeline;
pub mod types;

use commands::ReadResult;
use state::AppState;

/// Boot the app state and log a snapshot of the board.
pub fn run() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            log::error!("Failed to start async runtime: {e}");
            std::process::exit(1);
        }
    };

    runtime.block_on(async {
        let state = match AppState::new() {
            Ok(state) => state,
            Err(e) => {
                log::error!("Failed to initialize: {e}");
                std::process::exit(1);
            }
        };
        log::info!(
            "DealDesk ready ({:?} backend, latency {})",
            state.config.backend,
            if state.config.latency.enabled { "on" } else { "off" }
        );

        match commands::get_pipeline(&state).await {
            ReadResult::Success { data } => {
                for column in &data.columns {
                    log::info!(
                        "{:<15} {:>2} deals  {:>12.2}",
                        column.stage.as_str(),
                        column.count,
                        column.total_value
                    );
                }
                log::info!(
                    "Pipeline value {:.2}, {} active, average {:.2}",
                    data.summary.total_value,
                    data.summary.active_deals,
                    data.summary.average_deal_size
                );
            }
            ReadResult::Empty { message } => log::info!("{message}"),
            ReadResult::Error { error } => {
                log::error!("{} ({})", error.message, error.recovery_suggestion)
            }
        }
    });
}
