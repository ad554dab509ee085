//! SocketCAN bus handle
//!
//! Opens a `CAN_RAW` socket on a named interface in three distinct steps
//! (create, index lookup, bind) so a startup failure names the step that
//! failed. The socket is non-blocking; readiness comes from the multiplexer.

use super::{Bus, Pollable};
use crate::codec::wire::{self, CAN_MTU};
use crate::types::{CanFrame, OpenError, RecvError, SendError};
use nix::net::if_::if_nametoindex;
use socket2::{Domain, Protocol, Socket, Type};
use socketcan::CanAddr;
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, BorrowedFd};

/// A bound, non-blocking raw CAN socket
#[derive(Debug)]
pub struct SocketBus {
    name: String,
    socket: Option<Socket>,
}

impl SocketBus {
    /// Create, bind and configure a raw CAN socket on `interface`
    ///
    /// On failure the partially set up socket is closed before returning.
    pub fn open(interface: &str, bitrate: u32) -> Result<Self, OpenError> {
        let socket = Socket::new(
            Domain::from(libc::AF_CAN),
            Type::RAW,
            Some(Protocol::from(libc::CAN_RAW)),
        )
        .map_err(|source| OpenError::SocketCreate {
            interface: interface.to_string(),
            source,
        })?;

        let ifindex = if_nametoindex(interface).map_err(|errno| OpenError::IndexLookup {
            interface: interface.to_string(),
            source: io::Error::from(errno),
        })?;

        socket
            .bind(&CanAddr::new(ifindex).into_sock_addr())
            .map_err(|source| OpenError::Bind {
                interface: interface.to_string(),
                source,
            })?;

        socket
            .set_nonblocking(true)
            .map_err(|source| OpenError::NonBlocking {
                interface: interface.to_string(),
                source,
            })?;

        log::info!(
            "Initialized CAN interface: {} (index {}, {} bit/s)",
            interface,
            ifindex,
            bitrate
        );

        Ok(Self {
            name: interface.to_string(),
            socket: Some(socket),
        })
    }

}

/// Read one frame from a record-oriented reader
///
/// One `read` is one frame: a short read is never completed later, so it is
/// reported as `IncompleteFrame`. `EINTR` counts as "nothing ready".
pub fn read_frame<R: Read + ?Sized>(reader: &mut R) -> Result<CanFrame, RecvError> {
    let mut buf = [0u8; CAN_MTU];
    match reader.read(&mut buf) {
        Ok(n) if n == CAN_MTU => wire::decode(&buf),
        Ok(n) => Err(RecvError::IncompleteFrame {
            got: n,
            expected: CAN_MTU,
        }),
        Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => {
            Err(RecvError::WouldBlock)
        }
        Err(e) => Err(RecvError::Io(e)),
    }
}

/// Write one frame with a single `write`
pub fn write_frame<W: Write + ?Sized>(writer: &mut W, frame: &CanFrame) -> Result<(), SendError> {
    let sent = writer.write(&wire::encode(frame))?;
    if sent < CAN_MTU {
        return Err(SendError::IncompleteWrite {
            sent,
            expected: CAN_MTU,
        });
    }
    Ok(())
}

impl Bus for SocketBus {
    fn name(&self) -> &str {
        &self.name
    }

    fn receive(&mut self) -> Result<CanFrame, RecvError> {
        let socket = self.socket.as_mut().ok_or(RecvError::Closed)?;
        read_frame(socket)
    }

    fn transmit(&mut self, frame: &CanFrame) -> Result<(), SendError> {
        let socket = self.socket.as_mut().ok_or(SendError::Closed)?;
        write_frame(socket, frame)
    }

    fn close(&mut self) {
        if let Some(socket) = self.socket.take() {
            drop(socket);
            log::debug!("Closed CAN socket on {}", self.name);
        }
    }

    fn is_closed(&self) -> bool {
        self.socket.is_none()
    }
}

impl Pollable for SocketBus {
    fn poll_fd(&self) -> Option<BorrowedFd<'_>> {
        self.socket.as_ref().map(|socket| socket.as_fd())
    }
}
