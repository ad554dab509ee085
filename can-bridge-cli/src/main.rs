//! CAN Bridge
//!
//! Brings up the gateway's CAN interfaces, then forwards and decodes frames
//! until SIGINT or SIGTERM. Exit code 0 after a signal-triggered shutdown,
//! 1 when startup fails.

use anyhow::{Context, Result};
use can_bridge_core::{bridge, IpLinkConfigurer, ShutdownToken};
use std::io;

mod config;
mod report;

use report::ReportWriter;

fn main() -> Result<()> {
    let config = config::resolve_config()?;

    // Initialize logging
    init_logging(config.logging.level_filter()?);

    log::info!("CAN Bridge v{} starting...", env!("CARGO_PKG_VERSION"));
    log::info!("Using bridge library v{}", can_bridge_core::VERSION);

    // Signals only raise the flag; the loop notices it within one poll timeout
    let shutdown = ShutdownToken::new();
    let handler_token = shutdown.clone();
    ctrlc::set_handler(move || handler_token.request())
        .context("Failed to install signal handler")?;

    let mut mux = bridge::start(&config.bridge, &mut IpLinkConfigurer::new(), shutdown)
        .context("CAN bridge startup failed")?;

    let mut report = ReportWriter::new(io::stdout(), io::stderr());
    mux.run(&mut |event| {
        if let Err(e) = report.write_event(&event) {
            log::warn!("Failed to write report line: {}", e);
        }
    })
    .context("CAN bridge stopped on a readiness error")?;

    Ok(())
}

/// Initialize logging: `RUST_LOG` wins over the configured default level
fn init_logging(level: log::LevelFilter) {
    use env_logger::Builder;
    use std::io::Write;

    Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
