//! One publish run: fetch trending repositories, skip already-announced ones,
//! announce the rest to every configured relay and chat. Meant for cron.

use std::process::ExitCode;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use trending_relay::bootstrap::PublisherRuntime;
use trending_relay::config;
use trending_relay::fanout::RunReport;
use trending_relay::logging::init_tracing;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_tracing();

    let runtime = match config::load_default() {
        Ok(cfg) => PublisherRuntime::from_config(cfg).await,
        Err(e) => Err(e),
    };
    let runtime = match runtime {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %format!("{e:#}"), "publisher start-up failed");
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing in-flight publishes");
            on_signal.cancel();
        }
    });

    match runtime.run_once(&cancel).await {
        Ok(report) => {
            log_report(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            if let Some(report) = e.report() {
                log_report(report);
            }
            error!(error = %e, "publish run failed");
            ExitCode::FAILURE
        }
    }
}

fn log_report(report: &RunReport) {
    for (identity, err) in report.errors() {
        warn!(identity = %identity, error = %err, "item error");
    }
    info!(
        considered = report.considered,
        published = report.published().len(),
        deliveries_ok = report.deliveries_ok(),
        deliveries_failed = report.deliveries_failed(),
        cancelled = report.cancelled,
        "run report"
    );
}
