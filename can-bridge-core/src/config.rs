//! Bridge configuration types
//!
//! The bridge runs a fixed topology by default: three interfaces forwarding
//! in a ring, J1939 decoding on each. The topology is plain data so it can be
//! replaced from a configuration file without touching the multiplexer.

use crate::codec::DecodeHook;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest readiness wait `poll(2)` is asked for, in milliseconds
pub const MAX_POLL_TIMEOUT_MS: u64 = u16::MAX as u64;

/// Configuration for the bridge
///
/// In a configuration file the built-in routes only apply when neither
/// `interfaces` nor `routes` is given; a file that lists its own interfaces
/// starts from an empty routing table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BridgeConfigFile")]
pub struct BridgeConfig {
    /// Interfaces to bring up and open, in polling order
    pub interfaces: Vec<InterfaceConfig>,

    /// One route per source interface (interfaces without a route only report)
    pub routes: Vec<RouteConfig>,

    /// Readiness wait timeout in milliseconds (default: 1000ms)
    pub poll_timeout_ms: u64,

    /// Delay between interface bring-up and socket setup (default: 100ms)
    pub settle_delay_ms: u64,
}

/// On-disk shape of [`BridgeConfig`], with every field optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BridgeConfigFile {
    interfaces: Option<Vec<InterfaceConfig>>,
    routes: Option<Vec<RouteConfig>>,
    poll_timeout_ms: Option<u64>,
    settle_delay_ms: Option<u64>,
}

impl From<BridgeConfigFile> for BridgeConfig {
    fn from(file: BridgeConfigFile) -> Self {
        let defaults = BridgeConfig::default();
        let routes = match (&file.interfaces, file.routes) {
            (_, Some(routes)) => routes,
            (None, None) => defaults.routes,
            (Some(_), None) => Vec::new(),
        };
        Self {
            interfaces: file.interfaces.unwrap_or(defaults.interfaces),
            routes,
            poll_timeout_ms: file.poll_timeout_ms.unwrap_or(defaults.poll_timeout_ms),
            settle_delay_ms: file.settle_delay_ms.unwrap_or(defaults.settle_delay_ms),
        }
    }
}

/// A CAN interface and the bitrate it is brought up with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceConfig {
    pub name: String,
    pub bitrate: u32,
}

/// Forwarding target and decoder for frames from one interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Interface frames are read from
    pub source: String,
    /// Interface that receives a copy of each frame
    #[serde(default)]
    pub destination: Option<String>,
    /// Decoder applied to each frame
    #[serde(default)]
    pub decode: Option<DecodeHook>,
}

impl InterfaceConfig {
    pub fn new(name: impl Into<String>, bitrate: u32) -> Self {
        Self {
            name: name.into(),
            bitrate,
        }
    }
}

impl RouteConfig {
    /// A route that neither forwards nor decodes
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: None,
            decode: None,
        }
    }

    /// Builder method: forward frames to `destination`
    pub fn forward_to(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Builder method: decode frames with `hook`
    pub fn decode_with(mut self, hook: DecodeHook) -> Self {
        self.decode = Some(hook);
        self
    }
}

fn default_interfaces() -> Vec<InterfaceConfig> {
    vec![
        InterfaceConfig::new("canfd1", 250_000),
        InterfaceConfig::new("canfd2", 500_000),
        InterfaceConfig::new("canfd3", 500_000),
    ]
}

fn default_routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig::new("canfd1")
            .forward_to("canfd2")
            .decode_with(DecodeHook::J1939),
        RouteConfig::new("canfd2")
            .forward_to("canfd3")
            .decode_with(DecodeHook::J1939),
        RouteConfig::new("canfd3")
            .forward_to("canfd1")
            .decode_with(DecodeHook::J1939),
    ]
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            interfaces: default_interfaces(),
            routes: default_routes(),
            poll_timeout_ms: 1000,
            settle_delay_ms: 100,
        }
    }
}

impl BridgeConfig {
    /// Create the default three-interface ring configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration with no interfaces and no routes
    pub fn empty() -> Self {
        Self {
            interfaces: Vec::new(),
            routes: Vec::new(),
            ..Self::default()
        }
    }

    /// Builder method: add an interface
    pub fn add_interface(mut self, name: impl Into<String>, bitrate: u32) -> Self {
        self.interfaces.push(InterfaceConfig::new(name, bitrate));
        self
    }

    /// Builder method: add a route
    pub fn add_route(mut self, route: RouteConfig) -> Self {
        self.routes.push(route);
        self
    }

    /// Builder method: set the readiness wait timeout
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Builder method: set the settle delay after bring-up
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    /// True if the poll timeout fits what a single readiness wait accepts
    pub fn poll_timeout_within_limit(&self) -> bool {
        self.poll_timeout_ms <= MAX_POLL_TIMEOUT_MS
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}
