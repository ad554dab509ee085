//! Raw frame wire format
//!
//! Encodes and decodes the kernel's `struct can_frame`, the 16-byte record
//! exchanged with a `CAN_RAW` socket:
//!
//! | offset | size | field                                  |
//! |--------|------|----------------------------------------|
//! | 0      | 4    | `can_id` (host byte order, flags in 29-31) |
//! | 4      | 1    | `len` (0-8)                            |
//! | 5      | 3    | reserved (`__pad`, `__res0`, `len8_dlc`) |
//! | 8      | 8    | `data`                                 |

use crate::types::{CanFrame, RecvError, CAN_MAX_DLEN};
use byteorder::{ByteOrder, NativeEndian};

/// Size of one classic CAN frame on a raw socket
pub const CAN_MTU: usize = 16;

const ID_OFFSET: usize = 0;
const LEN_OFFSET: usize = 4;
const DATA_OFFSET: usize = 8;

/// Decode one complete wire frame
///
/// A length byte above 8 cannot come from a classic CAN socket and is
/// rejected instead of being clamped.
pub fn decode(buf: &[u8; CAN_MTU]) -> Result<CanFrame, RecvError> {
    let raw_id = NativeEndian::read_u32(&buf[ID_OFFSET..LEN_OFFSET]);
    let len = buf[LEN_OFFSET];
    if len as usize > CAN_MAX_DLEN {
        return Err(RecvError::Malformed(len));
    }

    let mut payload = [0u8; CAN_MAX_DLEN];
    payload.copy_from_slice(&buf[DATA_OFFSET..]);

    Ok(CanFrame::from_parts(raw_id, len, payload))
}

/// Encode a frame into its wire representation
///
/// Reserved bytes are written as zero; the payload buffer is copied whole so
/// a forwarded frame is byte-identical to the one received.
pub fn encode(frame: &CanFrame) -> [u8; CAN_MTU] {
    let mut buf = [0u8; CAN_MTU];
    NativeEndian::write_u32(&mut buf[ID_OFFSET..LEN_OFFSET], frame.raw_id());
    buf[LEN_OFFSET] = frame.dlc() as u8;
    buf[DATA_OFFSET..].copy_from_slice(frame.payload());
    buf
}
