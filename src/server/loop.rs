// Server loop module
// Accept loop with graceful shutdown

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use super::signal::SignalHandler;
use crate::config;
use crate::logger;

/// Run the accept loop until a shutdown signal arrives.
///
/// Accepted connections are served on their own tasks; shutdown stops
/// accepting and returns, letting in-flight connections finish on their
/// tasks.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<config::AppState>,
    active_connections: Arc<AtomicUsize>,
    signals: Arc<SignalHandler>,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        // A signal that fired before this iteration parked on notified()
        // is only visible through the flag
        if signals
            .shutdown_requested
            .load(std::sync::atomic::Ordering::SeqCst)
        {
            return Ok(());
        }

        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = signals.shutdown.notified() => {
                let in_flight = active_connections.load(std::sync::atomic::Ordering::SeqCst);
                logger::log_shutdown(&format!(
                    "Stopping accept loop ({in_flight} connections in flight)"
                ));
                return Ok(());
            }
        }
    }
}
