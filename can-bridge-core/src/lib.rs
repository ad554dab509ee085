//! CAN Bridge Library
//!
//! Owns a fixed set of CAN interfaces, reads frames as they arrive, forwards
//! them according to a static routing table, and decodes a small set of
//! SAE J1939 messages (keypad button state, Torque/Speed Control 1).
//!
//! # Architecture
//!
//! - [`bus`]: the [`Bus`] trait, the SocketCAN handle and interface bring-up
//! - [`codec`]: the 16-byte raw frame layout and the J1939 decoders
//! - [`routing`]: source → (destination, decoder) table built from [`BridgeConfig`]
//! - [`multiplexer`]: the single-threaded readiness loop
//! - [`bridge`]: the startup sequence that produces a running multiplexer
//!
//! The library does NOT:
//! - Install signal handlers (set a [`ShutdownToken`] instead)
//! - Print anything (every step is reported as a [`BridgeEvent`])
//!
//! # Example Usage
//!
//! ```no_run
//! use can_bridge_core::{bridge, BridgeConfig, IpLinkConfigurer, ShutdownToken};
//!
//! let shutdown = ShutdownToken::new();
//! let config = BridgeConfig::default();
//!
//! let mut mux = bridge::start(&config, &mut IpLinkConfigurer::new(), shutdown.clone()).unwrap();
//! mux.run(&mut |event| println!("{}", event)).unwrap();
//! ```

// Public modules
pub mod bridge;
pub mod bus;
pub mod codec;
pub mod config;
pub mod multiplexer;
pub mod routing;
pub mod types;

// Re-export main types for convenience
pub use bus::{Bus, IpLinkConfigurer, LinkConfigurer, Pollable, SocketBus};
pub use codec::{ButtonBank, DecodeHook, FrameCodec};
pub use config::{BridgeConfig, InterfaceConfig, RouteConfig, MAX_POLL_TIMEOUT_MS};
pub use multiplexer::{BridgeState, Multiplexer, PollReadiness, Readiness, ShutdownToken};
pub use routing::{BusId, RoutingEntry, RoutingPolicy};
pub use types::{
    BridgeError, BridgeEvent, ButtonState, CanFrame, ConfigError, DecodedReport, KeypadReport,
    OpenError, RecvError, Result, SendError, TopologyError, TorqueSpeedReport, WaitError,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
