// Signal handling module
//
// Supported signals:
// - SIGTERM: Graceful shutdown
// - SIGINT:  Graceful shutdown (Ctrl+C)
// Non-unix platforms only get Ctrl+C.

use crate::logger;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Shutdown state shared between the signal task and the accept loop
pub struct SignalHandler {
    shutdown: Notify,
    shutdown_requested: AtomicBool,
}

impl SignalHandler {
    pub fn new() -> Self {
        Self {
            shutdown: Notify::new(),
            shutdown_requested: AtomicBool::new(false),
        }
    }

    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
        // notify_one keeps a permit if nobody is waiting yet
        self.shutdown.notify_one();
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    /// Resolves once shutdown has been requested
    pub async fn wait(&self) {
        if self.is_shutdown_requested() {
            return;
        }
        self.shutdown.notified().await;
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Start signal handlers (Unix only)
///
/// Spawns a background task that requests shutdown on the first SIGTERM
/// or SIGINT. If registration fails it falls back to Ctrl+C.
#[cfg(unix)]
pub fn start_signal_handler(handler: Arc<SignalHandler>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let registered = signal(SignalKind::terminate())
            .and_then(|term| signal(SignalKind::interrupt()).map(|int| (term, int)));

        match registered {
            Ok((mut sigterm, mut sigint)) => {
                logger::log_verbose(&format!(
                    "[SIGNAL] SIGTERM and SIGINT handlers registered for pid {}",
                    std::process::id()
                ));
                tokio::select! {
                    _ = sigterm.recv() => logger::log_info("[SIGNAL] SIGTERM received, shutting down"),
                    _ = sigint.recv() => logger::log_info("[SIGNAL] SIGINT received, shutting down"),
                }
                handler.request_shutdown();
            }
            Err(e) => {
                logger::log_error(&format!("[SIGNAL] Failed to register handlers: {e}"));
                wait_for_ctrl_c(&handler).await;
            }
        }
    });
}

/// Fallback - only handles Ctrl+C
#[cfg(not(unix))]
pub fn start_signal_handler(handler: Arc<SignalHandler>) {
    tokio::spawn(async move {
        wait_for_ctrl_c(&handler).await;
    });
}

async fn wait_for_ctrl_c(handler: &SignalHandler) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            logger::log_info("[SIGNAL] Ctrl+C received, shutting down");
            handler.request_shutdown();
        }
        Err(e) => logger::log_error(&format!("[SIGNAL] Cannot listen for Ctrl+C: {e}")),
    }
}
