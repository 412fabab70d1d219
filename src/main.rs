use std::sync::Arc;

use clap::Parser;
use rootserve::cli::Cli;
use rootserve::config::{AppState, Config};
use rootserve::logger;
use rootserve::server::{self, SignalHandler};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cfg = Config::load(&cli)?;
    let _log_guard = logger::init(&cfg.logging)?;

    // Single-threaded event loop unless workers are configured
    let runtime = if let Some(workers) = cfg.server.workers {
        logger::log_verbose(&format!("[CONFIG] Using {workers} worker threads"));
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(workers.max(1))
            .enable_all()
            .build()?
    } else {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?
    };

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    cfg.validate();
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_reusable_listener(addr)?;

    let state = Arc::new(AppState::new(&cfg));
    let signals = Arc::new(SignalHandler::new());
    server::start_signal_handler(Arc::clone(&signals));

    logger::log_server_start(&listener.local_addr()?, &cfg);
    server::start_server_loop(listener, state, signals).await;
    Ok(())
}
