//! Shared test doubles for the integration tests
#![allow(dead_code)]

use can_bridge_core::{
    Bus, BusId, CanFrame, ConfigError, LinkConfigurer, Readiness, RecvError, SendError,
    ShutdownToken, WaitError,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;
use std::time::Duration;

/// Everything a test wants to see or control on an in-memory bus
#[derive(Debug, Default)]
pub struct BusState {
    pub inbox: VecDeque<Result<CanFrame, RecvError>>,
    pub sent: Vec<CanFrame>,
    pub transmit_attempts: usize,
    pub fail_transmit: bool,
    pub receives: usize,
    pub closes: usize,
}

/// In-memory bus; clones share state so the test keeps a handle after
/// moving the bus into the multiplexer
#[derive(Debug, Clone)]
pub struct MemoryBus {
    name: String,
    pub state: Rc<RefCell<BusState>>,
}

impl MemoryBus {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: Rc::new(RefCell::new(BusState::default())),
        }
    }

    pub fn inject(&self, frame: CanFrame) {
        self.state.borrow_mut().inbox.push_back(Ok(frame));
    }

    pub fn inject_error(&self, error: RecvError) {
        self.state.borrow_mut().inbox.push_back(Err(error));
    }

    pub fn pending(&self) -> usize {
        self.state.borrow().inbox.len()
    }

    pub fn sent(&self) -> Vec<CanFrame> {
        self.state.borrow().sent.clone()
    }

    pub fn set_fail_transmit(&self, fail: bool) {
        self.state.borrow_mut().fail_transmit = fail;
    }

    pub fn closes(&self) -> usize {
        self.state.borrow().closes
    }
}

impl Bus for MemoryBus {
    fn name(&self) -> &str {
        &self.name
    }

    fn receive(&mut self) -> Result<CanFrame, RecvError> {
        let mut state = self.state.borrow_mut();
        state.receives += 1;
        state.inbox.pop_front().unwrap_or(Err(RecvError::WouldBlock))
    }

    fn transmit(&mut self, frame: &CanFrame) -> Result<(), SendError> {
        let mut state = self.state.borrow_mut();
        state.transmit_attempts += 1;
        if state.fail_transmit {
            return Err(SendError::Io(io::Error::new(
                io::ErrorKind::Other,
                "Network is down",
            )));
        }
        state.sent.push(*frame);
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.state.borrow_mut();
        if state.closes == 0 {
            state.closes = 1;
        } else {
            panic!("{} closed twice", self.name);
        }
    }

    fn is_closed(&self) -> bool {
        self.state.borrow().closes > 0
    }
}

/// Reports every bus with queued input as ready
///
/// When nothing is queued the wait "times out"; after `idle_limit` idle
/// wakeups it raises the shutdown token, standing in for a signal.
pub struct ScriptedReadiness {
    pub shutdown: ShutdownToken,
    pub idle_limit: usize,
    pub idle: usize,
    pub timeouts: Vec<Duration>,
}

impl ScriptedReadiness {
    pub fn new(shutdown: ShutdownToken) -> Self {
        Self {
            shutdown,
            idle_limit: 1,
            idle: 0,
            timeouts: Vec::new(),
        }
    }
}

impl Readiness<MemoryBus> for ScriptedReadiness {
    fn wait(&mut self, buses: &[MemoryBus], timeout: Duration) -> Result<Vec<BusId>, WaitError> {
        self.timeouts.push(timeout);
        let ready: Vec<BusId> = buses
            .iter()
            .enumerate()
            .filter(|(_, bus)| bus.pending() > 0)
            .map(|(index, _)| BusId(index))
            .collect();

        if ready.is_empty() {
            self.idle += 1;
            if self.idle >= self.idle_limit {
                self.shutdown.request();
            }
        }
        Ok(ready)
    }
}

/// Link configurer that records calls into a shared journal
pub struct RecordingConfigurer {
    pub journal: Rc<RefCell<Vec<String>>>,
    pub fail_on: Option<String>,
}

impl RecordingConfigurer {
    pub fn new(journal: Rc<RefCell<Vec<String>>>) -> Self {
        Self {
            journal,
            fail_on: None,
        }
    }
}

impl LinkConfigurer for RecordingConfigurer {
    fn configure(&mut self, interface: &str, bitrate: u32) -> Result<(), ConfigError> {
        self.journal
            .borrow_mut()
            .push(format!("configure {} {}", interface, bitrate));
        if self.fail_on.as_deref() == Some(interface) {
            return Err(ConfigError::LinkUp {
                interface: interface.to_string(),
                reason: "exit status: 2".to_string(),
            });
        }
        Ok(())
    }
}
