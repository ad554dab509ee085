//! Bus handles
//!
//! A bus is one CAN interface the bridge reads from and writes to. The
//! multiplexer only sees the [`Bus`] trait, so the SocketCAN handle and the
//! in-memory doubles used by tests are interchangeable.

pub mod link;
pub mod socket;

use crate::types::{CanFrame, RecvError, SendError};
use std::os::fd::BorrowedFd;

pub use link::{IpLinkConfigurer, LinkConfigurer};
pub use socket::{read_frame, write_frame, SocketBus};

/// One CAN interface owned by the bridge
pub trait Bus {
    /// Interface name, used in every report line
    fn name(&self) -> &str;

    /// Read exactly one frame
    ///
    /// `RecvError::WouldBlock` means nothing was ready and is not a failure.
    fn receive(&mut self) -> Result<CanFrame, RecvError>;

    /// Write exactly one frame
    fn transmit(&mut self, frame: &CanFrame) -> Result<(), SendError>;

    /// Release the underlying resource. Calling it again is a no-op.
    fn close(&mut self);

    fn is_closed(&self) -> bool;
}

/// A bus that can take part in a `poll(2)` readiness wait
pub trait Pollable {
    /// Descriptor to wait on, `None` once the bus is closed
    fn poll_fd(&self) -> Option<BorrowedFd<'_>>;
}
