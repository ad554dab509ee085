//! Frame multiplexer
//!
//! Waits for any bus to become readable, services every ready bus once per
//! wakeup, and stops when the shutdown token is set. The wait is bounded by
//! the poll timeout so a shutdown request is seen within one interval even on
//! a silent bus.
//!
//! Per ready bus:
//! 1. receive one frame (no draining loop, so one busy bus cannot starve the others)
//! 2. report it
//! 3. run the route's decode hook, if any
//! 4. transmit to the route's destination, if any
//!
//! Every runtime failure is reported and contained; only a readiness wait
//! failure other than an interrupted wait ends the loop.

use crate::bus::{Bus, Pollable};
use crate::codec::FrameCodec;
use crate::config::MAX_POLL_TIMEOUT_MS;
use crate::routing::{BusId, RoutingPolicy};
use crate::types::{BridgeEvent, RecvError, WaitError};
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle of the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Unconfigured,
    Configured,
    Running,
    Draining,
    Closed,
}

/// Cooperative shutdown flag shared with the signal path
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken(Arc<AtomicBool>);

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Source of readiness for a set of buses
pub trait Readiness<B> {
    /// Block until at least one bus is readable or `timeout` elapses
    ///
    /// Returns the ready buses in bus order; an empty list means timeout.
    fn wait(&mut self, buses: &[B], timeout: Duration) -> Result<Vec<BusId>, WaitError>;
}

/// Level-triggered readiness via `poll(2)`
#[derive(Debug, Default, Clone, Copy)]
pub struct PollReadiness;

impl<B: Pollable> Readiness<B> for PollReadiness {
    fn wait(&mut self, buses: &[B], timeout: Duration) -> Result<Vec<BusId>, WaitError> {
        let mut ids = Vec::with_capacity(buses.len());
        let mut fds = Vec::with_capacity(buses.len());
        for (index, bus) in buses.iter().enumerate() {
            if let Some(fd) = bus.poll_fd() {
                ids.push(BusId(index));
                fds.push(PollFd::new(fd, PollFlags::POLLIN));
            }
        }

        let timeout_ms = u16::try_from(timeout.as_millis()).unwrap_or(u16::MAX);
        match poll(&mut fds, PollTimeout::from(timeout_ms)) {
            Ok(0) => Ok(Vec::new()),
            Ok(_) => {
                let readable = PollFlags::POLLIN | PollFlags::POLLERR | PollFlags::POLLHUP;
                Ok(ids
                    .into_iter()
                    .zip(fds.iter())
                    .filter(|(_, fd)| fd.revents().map_or(false, |r| r.intersects(readable)))
                    .map(|(id, _)| id)
                    .collect())
            }
            Err(Errno::EINTR) => Err(WaitError::Interrupted),
            Err(errno) => Err(WaitError::Io(errno.into())),
        }
    }
}

/// The bridge's main loop and everything it owns at runtime
pub struct Multiplexer<B, R> {
    buses: Vec<B>,
    routing: RoutingPolicy,
    codec: FrameCodec,
    readiness: R,
    shutdown: ShutdownToken,
    timeout: Duration,
    state: BridgeState,
}

impl<B: Bus, R: Readiness<B>> Multiplexer<B, R> {
    /// Assemble a running multiplexer
    ///
    /// `buses[i]` must be the bus the routing table calls `BusId(i)`. A
    /// timeout above `MAX_POLL_TIMEOUT_MS` is capped with a warning.
    pub fn new(
        buses: Vec<B>,
        routing: RoutingPolicy,
        readiness: R,
        shutdown: ShutdownToken,
        timeout: Duration,
    ) -> Self {
        debug_assert_eq!(buses.len(), routing.len());
        let max = Duration::from_millis(MAX_POLL_TIMEOUT_MS);
        let timeout = if timeout > max {
            log::warn!(
                "Poll timeout of {} ms exceeds the {} ms limit, using {} ms",
                timeout.as_millis(),
                MAX_POLL_TIMEOUT_MS,
                MAX_POLL_TIMEOUT_MS
            );
            max
        } else {
            timeout
        };
        Self {
            buses,
            routing,
            codec: FrameCodec::new(),
            readiness,
            shutdown,
            timeout,
            state: BridgeState::Running,
        }
    }

    /// Run until shutdown is requested or the readiness wait fails
    ///
    /// All buses are closed before returning, whichever way the loop ends.
    pub fn run<F>(&mut self, sink: &mut F) -> Result<(), WaitError>
    where
        F: FnMut(BridgeEvent),
    {
        log::info!("Starting message routing...");

        let result = loop {
            if self.shutdown.is_requested() {
                log::info!("Shutdown requested");
                break Ok(());
            }
            match self.poll_once(sink) {
                Ok(_) => {}
                Err(WaitError::Interrupted) => continue,
                Err(e) => {
                    log::error!("{}", e);
                    break Err(e);
                }
            }
        };

        self.close();
        result
    }

    /// One wakeup: wait for readiness, then service each ready bus once
    ///
    /// Returns the number of buses serviced.
    pub fn poll_once<F>(&mut self, sink: &mut F) -> Result<usize, WaitError>
    where
        F: FnMut(BridgeEvent),
    {
        let ready = self.readiness.wait(&self.buses, self.timeout)?;
        if ready.is_empty() {
            log::trace!("Readiness wait timed out");
        }
        for &id in &ready {
            self.service(id, sink);
        }
        Ok(ready.len())
    }

    fn service<F>(&mut self, id: BusId, sink: &mut F)
    where
        F: FnMut(BridgeEvent),
    {
        let Some(bus) = self.buses.get_mut(id.0) else {
            log::warn!("Readiness reported unknown bus {:?}", id);
            return;
        };
        let source = bus.name().to_string();

        let frame = match bus.receive() {
            Ok(frame) => frame,
            Err(RecvError::WouldBlock) => {
                log::trace!("{}: nothing to read", source);
                return;
            }
            Err(e) => {
                log::warn!("Error reading from {}: {}", source, e);
                sink(BridgeEvent::ReceiveFailed {
                    source,
                    reason: e.to_string(),
                });
                return;
            }
        };

        sink(BridgeEvent::Received {
            source: source.clone(),
            frame,
        });

        let Some(entry) = self.routing.route(id).copied() else {
            return;
        };

        if let Some(hook) = entry.decode {
            if let Some(report) = self.codec.decode(hook, &frame) {
                sink(BridgeEvent::Decoded {
                    source: source.clone(),
                    report,
                });
            }
        }

        let Some(target) = entry.destination.and_then(|dst| self.buses.get_mut(dst.0)) else {
            return;
        };
        let destination = target.name().to_string();

        match target.transmit(&frame) {
            Ok(()) => {
                log::debug!("{} -> {}: 0x{:X}", source, destination, frame.id());
                sink(BridgeEvent::Forwarded {
                    source,
                    destination,
                });
            }
            Err(e) => {
                log::warn!("Error forwarding {} -> {}: {}", source, destination, e);
                sink(BridgeEvent::ForwardFailed {
                    source,
                    destination,
                    reason: e.to_string(),
                });
            }
        }
    }

    /// Close every bus exactly once
    pub fn close(&mut self) {
        if self.state == BridgeState::Closed {
            return;
        }
        self.state = BridgeState::Draining;
        log::info!("Shutting down...");
        for bus in &mut self.buses {
            bus.close();
        }
        self.state = BridgeState::Closed;
        log::info!("CAN bridge stopped");
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn buses(&self) -> &[B] {
        &self.buses
    }

    pub fn codec(&self) -> &FrameCodec {
        &self.codec
    }

    pub fn shutdown_token(&self) -> &ShutdownToken {
        &self.shutdown
    }
}
