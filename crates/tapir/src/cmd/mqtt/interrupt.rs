//! Stop the MQTT engine on SIGINT/SIGTERM, then exit

use tapir_mqtt::{EngineCommand, stop_engine};
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

/// Spawn a task that stops the engine behind `commander` on the first
/// interrupt and exits the process with status 1
pub fn spawn(commander: mpsc::Sender<EngineCommand>) -> JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_interrupt().await;
        println!("SIGTERM interrupt received, sending stop signal to MQTT Engine");

        match stop_engine(&commander).await {
            Ok(resp) if resp.error => println!("Error: {}", resp.error_msg),
            Ok(resp) => println!("MQTT Engine: {}", resp.status),
            Err(e) => println!("Error: {e}"),
        }
        std::process::exit(1);
    })
}

/// Wait for SIGINT or SIGTERM
async fn wait_for_interrupt() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
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
