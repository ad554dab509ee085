//! Core types for the CAN bridge
//!
//! This module defines the frame type that travels through the bridge, the
//! events the multiplexer reports, and the error taxonomy shared by every
//! component. Runtime errors are contained and reported; only startup errors
//! are fatal.

use std::fmt;
use std::io;

/// Mask selecting the 29-bit identifier out of the raw 32-bit `can_id` field
pub const CAN_EFF_MASK: u32 = 0x1FFF_FFFF;
/// Extended frame format flag (bit 31 of the raw `can_id` field)
pub const CAN_EFF_FLAG: u32 = 0x8000_0000;
/// Maximum payload of a classic CAN frame
pub const CAN_MAX_DLEN: usize = 8;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// A classic CAN frame as read from (or written to) a raw CAN socket
///
/// The raw identifier keeps the control bits so forwarding reproduces the
/// frame bit-exact; [`CanFrame::id`] masks them off for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanFrame {
    raw_id: u32,
    len: u8,
    payload: [u8; CAN_MAX_DLEN],
}

impl CanFrame {
    /// Build a frame from a raw identifier and up to 8 data bytes
    ///
    /// Returns `None` when `data` is longer than a classic frame allows.
    pub fn new(raw_id: u32, data: &[u8]) -> Option<Self> {
        if data.len() > CAN_MAX_DLEN {
            return None;
        }
        let mut payload = [0u8; CAN_MAX_DLEN];
        payload[..data.len()].copy_from_slice(data);
        Some(Self {
            raw_id,
            len: data.len() as u8,
            payload,
        })
    }

    /// Build an extended (29-bit) frame, setting the extended flag
    pub fn extended(id: u32, data: &[u8]) -> Option<Self> {
        Self::new((id & CAN_EFF_MASK) | CAN_EFF_FLAG, data)
    }

    /// Build a frame from its wire parts, keeping trailing payload bytes as-is
    pub(crate) fn from_parts(raw_id: u32, len: u8, payload: [u8; CAN_MAX_DLEN]) -> Self {
        Self {
            raw_id,
            len,
            payload,
        }
    }

    /// Identifier with control bits masked off
    pub fn id(&self) -> u32 {
        self.raw_id & CAN_EFF_MASK
    }

    /// Identifier exactly as carried on the wire, flags included
    pub fn raw_id(&self) -> u32 {
        self.raw_id
    }

    /// True if the extended frame flag is set
    pub fn is_extended(&self) -> bool {
        self.raw_id & CAN_EFF_FLAG != 0
    }

    /// Data length code (0-8)
    pub fn dlc(&self) -> usize {
        self.len as usize
    }

    /// The valid data bytes
    pub fn data(&self) -> &[u8] {
        &self.payload[..self.dlc()]
    }

    /// The full 8-byte payload buffer, including bytes beyond the DLC
    pub fn payload(&self) -> &[u8; CAN_MAX_DLEN] {
        &self.payload
    }
}

impl fmt::Display for CanFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ID=0x{:03X} DLC={} Data:", self.id(), self.dlc())?;
        for byte in self.data() {
            write!(f, " {:02X}", byte)?;
        }
        Ok(())
    }
}

/// State of one keypad button after a keypad frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonState {
    /// Button index (0-7, button 0 is the least significant bit pair)
    pub index: usize,
    /// True if the button is held down
    pub pressed: bool,
    /// True if `pressed` differs from the previous keypad frame
    pub changed: bool,
}

/// Decoded keypad frame: all eight buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeypadReport {
    pub buttons: [ButtonState; 8],
}

impl KeypadReport {
    /// Buttons currently pressed, in index order
    pub fn pressed(&self) -> impl Iterator<Item = &ButtonState> {
        self.buttons.iter().filter(|b| b.pressed)
    }
}

impl fmt::Display for KeypadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypad:")?;
        let mut any = false;
        for button in self.pressed() {
            any = true;
            write!(f, " B{}", button.index + 1)?;
            if button.changed {
                write!(f, "(new)")?;
            }
        }
        if !any {
            write!(f, " none pressed")?;
        }
        Ok(())
    }
}

/// Decoded Torque/Speed Control 1 (TSC1) fields
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorqueSpeedReport {
    /// Override control mode byte, as received
    pub override_control_mode: u8,
    /// Requested speed in RPM (0.125 rpm/bit)
    pub requested_speed_rpm: f64,
    /// Requested torque in percent (raw - 125)
    pub requested_torque_percent: i16,
    /// Message priority (0-3)
    pub priority: u8,
}

impl fmt::Display for TorqueSpeedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TSC1: mode=0x{:02X} speed={:.3} rpm torque={}% priority={}",
            self.override_control_mode,
            self.requested_speed_rpm,
            self.requested_torque_percent,
            self.priority
        )
    }
}

/// Output of an application-layer decoder
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecodedReport {
    Keypad(KeypadReport),
    TorqueSpeed(TorqueSpeedReport),
}

impl fmt::Display for DecodedReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedReport::Keypad(report) => write!(f, "{}", report),
            DecodedReport::TorqueSpeed(report) => write!(f, "{}", report),
        }
    }
}

/// Events reported by the multiplexer, one per observable step
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    /// A frame was read from `source`
    Received { source: String, frame: CanFrame },

    /// A decode hook produced a report for the frame just received
    Decoded { source: String, report: DecodedReport },

    /// The frame was written to `destination`
    Forwarded { source: String, destination: String },

    /// Writing the frame to `destination` failed; the frame is dropped
    ForwardFailed {
        source: String,
        destination: String,
        reason: String,
    },

    /// Reading from `source` failed; the loop continues
    ReceiveFailed { source: String, reason: String },
}

impl fmt::Display for BridgeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeEvent::Received { source, frame } => write!(f, "[RX {}] {}", source, frame),
            BridgeEvent::Decoded { report, .. } => write!(f, "    {}", report),
            BridgeEvent::Forwarded { destination, .. } => {
                write!(f, "    -> Forwarded to {}", destination)
            }
            BridgeEvent::ForwardFailed {
                destination,
                reason,
                ..
            } => write!(f, "    -> Error forwarding to {}: {}", destination, reason),
            BridgeEvent::ReceiveFailed { source, reason } => {
                write!(f, "[RX {}] error: {}", source, reason)
            }
        }
    }
}

/// Interface bring-up failures (fatal at startup)
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to bring up {interface}: {reason}")]
    LinkUp { interface: String, reason: String },

    #[error("failed to run link command for {interface}: {source}")]
    Command {
        interface: String,
        #[source]
        source: io::Error,
    },
}

/// Socket setup failures (fatal at startup)
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error("{interface}: error creating socket: {source}")]
    SocketCreate {
        interface: String,
        #[source]
        source: io::Error,
    },

    #[error("{interface}: error getting interface index: {source}")]
    IndexLookup {
        interface: String,
        #[source]
        source: io::Error,
    },

    #[error("{interface}: error binding socket: {source}")]
    Bind {
        interface: String,
        #[source]
        source: io::Error,
    },

    #[error("{interface}: error switching socket to non-blocking mode: {source}")]
    NonBlocking {
        interface: String,
        #[source]
        source: io::Error,
    },
}

/// Per-frame receive outcomes other than a frame
#[derive(Debug, thiserror::Error)]
pub enum RecvError {
    /// Nothing to read right now; not a failure
    #[error("no frame ready")]
    WouldBlock,

    #[error("incomplete CAN frame received ({got} of {expected} bytes)")]
    IncompleteFrame { got: usize, expected: usize },

    #[error("malformed CAN frame: length {0} exceeds 8")]
    Malformed(u8),

    #[error("read failed: {0}")]
    Io(#[from] io::Error),

    #[error("handle is closed")]
    Closed,
}

/// Per-frame transmit failures (never fatal)
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("incomplete frame sent ({sent} of {expected} bytes)")]
    IncompleteWrite { sent: usize, expected: usize },

    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("handle is closed")]
    Closed,
}

/// Readiness wait failures
#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    /// The wait was interrupted by a signal; retry
    #[error("readiness wait interrupted")]
    Interrupted,

    #[error("select error: {0}")]
    Io(#[from] io::Error),
}

/// Invalid routing topology (rejected before bring-up)
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("route references unknown interface: {0}")]
    UnknownInterface(String),

    #[error("interface listed twice: {0}")]
    DuplicateInterface(String),

    #[error("more than one route for source interface: {0}")]
    DuplicateRoute(String),

    #[error("no interfaces configured")]
    Empty,
}

/// Umbrella error for the startup sequence and the run loop
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Failed to configure CAN interfaces: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to initialize CAN interfaces: {0}")]
    Open(#[from] OpenError),

    #[error("Invalid routing table: {0}")]
    Topology(#[from] TopologyError),

    #[error("Readiness wait failed: {0}")]
    Wait(#[from] WaitError),
}
