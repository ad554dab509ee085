//! Bridge startup
//!
//! Startup is strictly ordered: every interface is configured before any
//! socket is opened, and the multiplexer only exists once every socket is
//! open. Any failure aborts startup; sockets opened so far are closed when
//! they are dropped.

use crate::bus::{Bus, LinkConfigurer, SocketBus};
use crate::config::{BridgeConfig, InterfaceConfig};
use crate::multiplexer::{BridgeState, Multiplexer, PollReadiness, Readiness, ShutdownToken};
use crate::routing::RoutingPolicy;
use crate::types::{OpenError, Result};

/// Bring up the configured interfaces on SocketCAN and return a running multiplexer
///
/// # Example
/// ```no_run
/// use can_bridge_core::{bridge, BridgeConfig, IpLinkConfigurer, ShutdownToken};
///
/// let shutdown = ShutdownToken::new();
/// let mut mux = bridge::start(&BridgeConfig::default(), &mut IpLinkConfigurer::new(), shutdown)
///     .unwrap();
/// mux.run(&mut |event| println!("{}", event)).unwrap();
/// ```
pub fn start<C: LinkConfigurer>(
    config: &BridgeConfig,
    configurer: &mut C,
    shutdown: ShutdownToken,
) -> Result<Multiplexer<SocketBus, PollReadiness>> {
    start_with(
        config,
        configurer,
        |interface| SocketBus::open(&interface.name, interface.bitrate),
        PollReadiness,
        shutdown,
    )
}

/// Startup with a caller-supplied bus constructor and readiness source
pub fn start_with<B, R, C, F>(
    config: &BridgeConfig,
    configurer: &mut C,
    mut open: F,
    readiness: R,
    shutdown: ShutdownToken,
) -> Result<Multiplexer<B, R>>
where
    B: Bus,
    R: Readiness<B>,
    C: LinkConfigurer,
    F: FnMut(&InterfaceConfig) -> std::result::Result<B, OpenError>,
{
    transition(BridgeState::Unconfigured);
    let routing = RoutingPolicy::from_config(config)?;

    log::info!("Configuring CAN interfaces...");
    for interface in &config.interfaces {
        configurer.configure(&interface.name, interface.bitrate)?;
    }
    transition(BridgeState::Configured);

    if !config.settle_delay().is_zero() {
        std::thread::sleep(config.settle_delay());
    }

    log::info!("Initializing CAN sockets...");
    let buses = config
        .interfaces
        .iter()
        .map(|interface| open(interface))
        .collect::<std::result::Result<Vec<B>, OpenError>>()?;
    log::info!("All CAN interfaces initialized successfully");

    let mux = Multiplexer::new(buses, routing, readiness, shutdown, config.poll_timeout());
    transition(mux.state());
    Ok(mux)
}

fn transition(state: BridgeState) {
    log::debug!("Bridge state: {:?}", state);
}
