//! Drives the multiplexer with real `poll(2)` readiness over socket pairs.
//!
//! A datagram socket pair behaves like a raw CAN socket at the boundary that
//! matters here: one write is delivered as one whole record. The bus end goes
//! through the same frame read/write path as `SocketBus`.

use can_bridge_core::bus::{read_frame, write_frame};
use can_bridge_core::codec::wire::{self, CAN_MTU};
use can_bridge_core::{
    BridgeConfig, BridgeEvent, Bus, CanFrame, Multiplexer, PollReadiness, Pollable, RecvError,
    RoutingPolicy, SendError, ShutdownToken,
};
use socket2::Socket;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::os::unix::net::UnixDatagram;
use std::thread;
use std::time::{Duration, Instant};

struct DatagramBus {
    name: String,
    socket: Option<Socket>,
}

impl DatagramBus {
    /// Bus end plus the "wire" end the test writes to and reads from
    fn pair(name: &str) -> (Self, UnixDatagram) {
        let (bus_end, wire_end) = UnixDatagram::pair().unwrap();
        bus_end.set_nonblocking(true).unwrap();
        wire_end.set_nonblocking(true).unwrap();
        (
            Self {
                name: name.to_string(),
                socket: Some(Socket::from(OwnedFd::from(bus_end))),
            },
            wire_end,
        )
    }
}

impl Bus for DatagramBus {
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
        self.socket.take();
    }

    fn is_closed(&self) -> bool {
        self.socket.is_none()
    }
}

impl Pollable for DatagramBus {
    fn poll_fd(&self) -> Option<BorrowedFd<'_>> {
        self.socket.as_ref().map(|s| s.as_fd())
    }
}

fn ring(timeout: Duration) -> (Multiplexer<DatagramBus, PollReadiness>, Vec<UnixDatagram>, ShutdownToken) {
    let config = BridgeConfig::default().with_poll_timeout(timeout);
    let routing = RoutingPolicy::from_config(&config).unwrap();
    let (buses, wires): (Vec<_>, Vec<_>) = config
        .interfaces
        .iter()
        .map(|i| DatagramBus::pair(&i.name))
        .unzip();
    let shutdown = ShutdownToken::new();
    let mux = Multiplexer::new(buses, routing, PollReadiness, shutdown.clone(), timeout);
    (mux, wires, shutdown)
}

#[test]
fn poll_forwards_readable_frames() {
    let (mut mux, wires, _shutdown) = ring(Duration::from_millis(500));
    let frame = CanFrame::extended(0x0C000003, &[0x10, 0x40, 0x01, 0x7D, 0x02]).unwrap();
    wires[0].send(&wire::encode(&frame)).unwrap();

    let mut events = Vec::new();
    assert_eq!(mux.poll_once(&mut |e| events.push(e)).unwrap(), 1);

    let mut buf = [0u8; CAN_MTU];
    assert_eq!(wires[1].recv(&mut buf).unwrap(), CAN_MTU);
    assert_eq!(buf, wire::encode(&frame));
    assert!(events
        .iter()
        .any(|e| matches!(e, BridgeEvent::Decoded { .. })));
}

#[test]
fn poll_times_out_on_silent_buses() {
    let (mut mux, _wires, _shutdown) = ring(Duration::from_millis(50));
    let started = Instant::now();
    assert_eq!(mux.poll_once(&mut |_| {}).unwrap(), 0);
    assert!(started.elapsed() >= Duration::from_millis(40));
}

#[test]
fn short_datagram_is_reported_as_incomplete() {
    let (mut mux, wires, _shutdown) = ring(Duration::from_millis(500));
    wires[2].send(&[0u8; 8]).unwrap();

    let mut events = Vec::new();
    mux.poll_once(&mut |e| events.push(e)).unwrap();
    match events.as_slice() {
        [BridgeEvent::ReceiveFailed { source, reason }] => {
            assert_eq!(source, "canfd3");
            assert!(reason.contains("incomplete"));
        }
        other => panic!("unexpected events: {:?}", other),
    }
}

#[test]
fn empty_socket_reads_as_nothing_ready() {
    let (mut bus, _wire) = DatagramBus::pair("canfd1");
    assert!(matches!(bus.receive(), Err(RecvError::WouldBlock)));

    bus.close();
    assert!(matches!(bus.receive(), Err(RecvError::Closed)));
    assert!(matches!(
        bus.transmit(&CanFrame::new(0x1, &[]).unwrap()),
        Err(SendError::Closed)
    ));
}

#[test]
fn shutdown_is_observed_within_one_timeout() {
    let timeout = Duration::from_millis(200);
    let (mut mux, _wires, shutdown) = ring(timeout);

    let signaller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        shutdown.request();
        Instant::now()
    });

    mux.run(&mut |_| {}).unwrap();
    let stopped = Instant::now();
    let requested = signaller.join().unwrap();

    assert!(stopped.duration_since(requested) <= timeout + Duration::from_millis(100));
    assert!(mux.buses().iter().all(|b| b.is_closed()));
}
