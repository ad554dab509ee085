//! J1939 payload decoders
//!
//! Two application messages are understood:
//! - the proprietary keypad message (`0x18FF0280`), eight buttons packed as
//!   2-bit groups in a little-endian 16-bit field
//! - Torque/Speed Control 1 (`0x0C000003`)
//!
//! Both decoders only look at the masked identifier and the data bytes.

use crate::types::{ButtonState, CanFrame, KeypadReport, TorqueSpeedReport};
use byteorder::{ByteOrder, LittleEndian};

/// Keypad button state message identifier
pub const KEYPAD_ID: u32 = 0x18FF_0280;
/// Torque/Speed Control 1 message identifier
pub const TSC1_ID: u32 = 0x0C00_0003;

/// Minimum data length for a keypad frame
pub const KEYPAD_MIN_LEN: usize = 2;
/// Minimum data length for a TSC1 frame (the priority lives in byte 4)
pub const TSC1_MIN_LEN: usize = 5;

/// Number of buttons on the keypad
pub const BUTTON_COUNT: usize = 8;

const BUTTON_PRESSED: u16 = 0b01;
const SPEED_RESOLUTION_RPM: f64 = 0.125;
const TORQUE_OFFSET_PERCENT: i16 = 125;
const PRIORITY_MASK: u8 = 0b11;

/// Last known state of the eight keypad buttons
///
/// Starts with every button released. Only the keypad decoder writes to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ButtonBank {
    current: [bool; BUTTON_COUNT],
    changed: [bool; BUTTON_COUNT],
}

impl ButtonBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if button `index` was pressed on the last keypad frame
    pub fn is_pressed(&self, index: usize) -> bool {
        self.current.get(index).copied().unwrap_or(false)
    }

    /// True if button `index` changed on the last keypad frame
    pub fn changed(&self, index: usize) -> bool {
        self.changed.get(index).copied().unwrap_or(false)
    }

    /// Apply a new 16-bit keypad field and return the per-button result
    pub fn update(&mut self, field: u16) -> [ButtonState; BUTTON_COUNT] {
        let mut states = [ButtonState {
            index: 0,
            pressed: false,
            changed: false,
        }; BUTTON_COUNT];

        for (i, state) in states.iter_mut().enumerate() {
            let pressed = button_pressed(field, i);
            self.changed[i] = pressed != self.current[i];
            self.current[i] = pressed;

            *state = ButtonState {
                index: i,
                pressed,
                changed: self.changed[i],
            };
        }

        states
    }
}

/// Pressed state of bit group `index` of a keypad field
pub fn button_pressed(field: u16, index: usize) -> bool {
    (field >> (2 * index)) & 0b11 == BUTTON_PRESSED
}

/// Decode a keypad frame, updating `bank`
///
/// Returns `None` for other identifiers and for frames shorter than two bytes;
/// in that case `bank` is left untouched.
pub fn decode_keypad(frame: &CanFrame, bank: &mut ButtonBank) -> Option<KeypadReport> {
    if frame.id() != KEYPAD_ID {
        return None;
    }
    if frame.dlc() < KEYPAD_MIN_LEN {
        log::trace!("Keypad frame too short: {} bytes", frame.dlc());
        return None;
    }

    let field = LittleEndian::read_u16(&frame.data()[0..2]);
    Some(KeypadReport {
        buttons: bank.update(field),
    })
}

/// Decode a TSC1 frame
///
/// Pure function of the data bytes. Frames with fewer than five bytes are
/// rejected because the priority is read from byte 4.
pub fn decode_torque_speed(frame: &CanFrame) -> Option<TorqueSpeedReport> {
    if frame.id() != TSC1_ID {
        return None;
    }
    if frame.dlc() < TSC1_MIN_LEN {
        log::trace!("TSC1 frame too short: {} bytes", frame.dlc());
        return None;
    }

    let data = frame.data();
    let raw_speed = LittleEndian::read_u16(&data[1..3]);

    Some(TorqueSpeedReport {
        override_control_mode: data[0],
        requested_speed_rpm: f64::from(raw_speed) * SPEED_RESOLUTION_RPM,
        requested_torque_percent: i16::from(data[3]) - TORQUE_OFFSET_PERCENT,
        priority: data[4] & PRIORITY_MASK,
    })
}
