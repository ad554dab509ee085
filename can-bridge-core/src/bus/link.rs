//! Interface bring-up
//!
//! Bringing an interface to a bitrate is delegated to the host's link
//! management. The bridge only needs success or failure per interface.

use crate::types::ConfigError;
use std::process::{Command, Stdio};

/// Puts a named CAN interface up at a given bitrate
pub trait LinkConfigurer {
    fn configure(&mut self, interface: &str, bitrate: u32) -> Result<(), ConfigError>;
}

/// Configures interfaces with `ip link set`
///
/// Runs three commands: down, bitrate, up. A failing "down" is ignored (the
/// link may not be up yet) and a failing bitrate change is only logged; a
/// failing "up" fails the interface.
#[derive(Debug, Clone)]
pub struct IpLinkConfigurer {
    program: String,
}

impl IpLinkConfigurer {
    pub fn new() -> Self {
        Self::with_program("ip")
    }

    /// Use a different executable in place of `ip`
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, args: &[&str]) -> std::io::Result<std::process::ExitStatus> {
        log::debug!("Running: {} {}", self.program, args.join(" "));
        Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
    }
}

impl Default for IpLinkConfigurer {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkConfigurer for IpLinkConfigurer {
    fn configure(&mut self, interface: &str, bitrate: u32) -> Result<(), ConfigError> {
        log::info!("Configuring {}...", interface);

        if let Err(e) = self.run(&["link", "set", interface, "down"]) {
            log::debug!("Bringing {} down failed: {}", interface, e);
        }

        let bitrate_arg = bitrate.to_string();
        match self.run(&["link", "set", interface, "type", "can", "bitrate", &bitrate_arg]) {
            Ok(status) if status.success() => {}
            Ok(status) => log::warn!("Failed to configure {} bitrate ({})", interface, status),
            Err(e) => log::warn!("Failed to configure {} bitrate: {}", interface, e),
        }

        let status = self
            .run(&["link", "set", interface, "up"])
            .map_err(|source| ConfigError::Command {
                interface: interface.to_string(),
                source,
            })?;
        if !status.success() {
            return Err(ConfigError::LinkUp {
                interface: interface.to_string(),
                reason: status.to_string(),
            });
        }

        log::info!("  {} configured at {} bps", interface, bitrate);
        Ok(())
    }
}
