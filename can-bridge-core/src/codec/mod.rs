//! Frame codec
//!
//! Wire encode/decode of raw socket frames and the J1939 application
//! decoders. The only state is the keypad button memory.

pub mod j1939;
pub mod wire;

use crate::types::{CanFrame, DecodedReport};
use serde::{Deserialize, Serialize};

pub use j1939::{ButtonBank, KEYPAD_ID, TSC1_ID};

/// Which decoder a route applies to frames from its source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeHook {
    /// Keypad button messages only
    Keypad,
    /// Torque/Speed Control 1 only
    TorqueSpeed,
    /// Every known J1939 message
    J1939,
}

/// Stateful front end to the J1939 decoders
#[derive(Debug, Default)]
pub struct FrameCodec {
    buttons: ButtonBank,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `hook` over `frame`
    ///
    /// The identifiers are disjoint, so at most one report comes back.
    pub fn decode(&mut self, hook: DecodeHook, frame: &CanFrame) -> Option<DecodedReport> {
        let keypad = matches!(hook, DecodeHook::Keypad | DecodeHook::J1939);
        let torque_speed = matches!(hook, DecodeHook::TorqueSpeed | DecodeHook::J1939);

        match frame.id() {
            KEYPAD_ID if keypad => {
                j1939::decode_keypad(frame, &mut self.buttons).map(DecodedReport::Keypad)
            }
            TSC1_ID if torque_speed => {
                j1939::decode_torque_speed(frame).map(DecodedReport::TorqueSpeed)
            }
            _ => None,
        }
    }

    /// Button memory, for reporting
    pub fn buttons(&self) -> &ButtonBank {
        &self.buttons
    }
}
