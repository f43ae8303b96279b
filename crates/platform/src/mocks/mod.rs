//! Mock implementations for testing
//!
//! This module provides in-memory stand-ins for the platform traits so
//! drivers can be exercised on the host without hardware.

#![cfg(any(test, feature = "std"))]

use core::cell::RefCell;

use crate::peripheral::RegisterBus;
use crate::power::{SupplyEvent, SupplyEventSink};

/// Number of registers the mock device exposes
pub const MOCK_REGISTER_COUNT: usize = 32;

/// Capacity of the write log
pub const MOCK_LOG_DEPTH: usize = 64;

/// Error returned by [`MockRegisterBus`] when a failure is injected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBusError {
    /// Injected read failure
    ReadFailed,
    /// Injected write failure
    WriteFailed,
    /// Register address outside the mock register file
    OutOfRange(u8),
}

struct MockState {
    registers: [u8; MOCK_REGISTER_COUNT],
    writes: heapless::Vec<(u8, u8), MOCK_LOG_DEPTH>,
    reads: usize,
    fail_reads: bool,
    fail_writes: bool,
}

/// Mock register-file device
///
/// Interior mutability lets a test keep a shared reference for assertions
/// while the driver under test owns `&MockRegisterBus` as its bus.
pub struct MockRegisterBus {
    state: RefCell<MockState>,
}

impl MockRegisterBus {
    /// Create a mock with all registers zeroed
    pub fn new() -> Self {
        Self {
            state: RefCell::new(MockState {
                registers: [0; MOCK_REGISTER_COUNT],
                writes: heapless::Vec::new(),
                reads: 0,
                fail_reads: false,
                fail_writes: false,
            }),
        }
    }

    /// Set a register as the device would (not logged as a write)
    pub fn set_register(&self, register: u8, value: u8) {
        if let Some(slot) = self
            .state
            .borrow_mut()
            .registers
            .get_mut(usize::from(register))
        {
            *slot = value;
        }
    }

    /// Current register contents
    pub fn register(&self, register: u8) -> u8 {
        self.state
            .borrow()
            .registers
            .get(usize::from(register))
            .copied()
            .unwrap_or(0)
    }

    /// Every `(register, value)` written so far, oldest first
    pub fn writes(&self) -> heapless::Vec<(u8, u8), MOCK_LOG_DEPTH> {
        self.state.borrow().writes.clone()
    }

    /// Number of writes to `register`
    pub fn writes_to(&self, register: u8) -> usize {
        self.state
            .borrow()
            .writes
            .iter()
            .filter(|(r, _)| *r == register)
            .count()
    }

    /// Number of read transactions served
    pub fn read_count(&self) -> usize {
        self.state.borrow().reads
    }

    /// Forget logged writes and the read counter
    pub fn clear_log(&self) {
        let mut state = self.state.borrow_mut();
        state.writes.clear();
        state.reads = 0;
    }

    /// Make every subsequent read fail (or succeed again)
    pub fn fail_reads(&self, fail: bool) {
        self.state.borrow_mut().fail_reads = fail;
    }

    /// Make every subsequent write fail (or succeed again)
    pub fn fail_writes(&self, fail: bool) {
        self.state.borrow_mut().fail_writes = fail;
    }
}

impl Default for MockRegisterBus {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterBus for &MockRegisterBus {
    type Error = MockBusError;

    async fn read_registers(&mut self, register: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.fail_reads {
            return Err(MockBusError::ReadFailed);
        }
        let start = usize::from(register);
        let end = start.saturating_add(buf.len());
        let src = state
            .registers
            .get(start..end)
            .ok_or(MockBusError::OutOfRange(register))?;
        buf.copy_from_slice(src);
        state.reads = state.reads.saturating_add(1);
        Ok(())
    }

    async fn write_registers(&mut self, register: u8, data: &[u8]) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.fail_writes {
            return Err(MockBusError::WriteFailed);
        }
        let start = usize::from(register);
        let end = start.saturating_add(data.len());
        state
            .registers
            .get_mut(start..end)
            .ok_or(MockBusError::OutOfRange(register))?
            .copy_from_slice(data);
        for (offset, value) in data.iter().enumerate() {
            let reg = register.wrapping_add(u8::try_from(offset).unwrap_or(u8::MAX));
            // Log overflow drops the entry; tests stay far below the depth.
            let _ = state.writes.push((reg, *value));
        }
        Ok(())
    }
}

/// Sink that records supply events in arrival order
#[derive(Default)]
pub struct RecordingSink {
    events: heapless::Vec<SupplyEvent, MOCK_LOG_DEPTH>,
}

impl RecordingSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far
    pub fn events(&self) -> &[SupplyEvent] {
        &self.events
    }
}

impl SupplyEventSink for RecordingSink {
    fn supply_changed(&mut self, event: SupplyEvent) {
        let _ = self.events.push(event);
    }
}
