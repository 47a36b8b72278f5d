// Licensed under the Apache-2.0 license

//! Recording register block for host tests.
//!
//! Every register access is appended to [`MockRegisters::log`]. The target
//! answers read commands from a queue of canned bytes, and status behaviour
//! (busy period, TX back-pressure, unsent TX bytes, pending stop detections)
//! is scripted, both before the transaction and after its stop command.

use std::collections::VecDeque;

use crate::i2c::common::AddressWidth;
use crate::i2c::registers::{BusStatus, CommandKind, DataCommand, RegisterInterface};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Access {
    Status,
    AddressingMode(AddressWidth),
    TargetAddress(AddressWidth, u16),
    Enable,
    Command(DataCommand),
    ReadData,
    StopDetectPending,
    ClearStopDetect,
}

#[derive(Debug, Default)]
pub struct MockRegisters {
    pub log: Vec<Access>,
    busy_polls: u32,
    tx_full_polls: u32,
    tx_pending_polls: u32,
    settle: Option<(u32, u32)>,
    stop_detects: u32,
    responses: VecDeque<u8>,
    rx_fifo: VecDeque<u8>,
}

impl MockRegisters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report the controller busy for the next `polls` status reads.
    pub fn busy_for(&mut self, polls: u32) {
        self.busy_polls = polls;
    }

    /// Report the TX FIFO full for the next `polls` status reads.
    pub fn tx_full_for(&mut self, polls: u32) {
        self.tx_full_polls = polls;
    }

    /// Report the TX FIFO not yet empty for the next `polls` status reads.
    pub fn tx_pending_for(&mut self, polls: u32) {
        self.tx_pending_polls = polls;
    }

    /// Once a stop command is written, report busy for `busy_polls` and the
    /// TX FIFO not empty for `tx_pending_polls` status reads.
    pub fn settle_after_stop(&mut self, busy_polls: u32, tx_pending_polls: u32) {
        self.settle = Some((busy_polls, tx_pending_polls));
    }

    pub fn pending_stop_detects(&mut self, count: u32) {
        self.stop_detects = count;
    }

    /// Bytes the target returns, one per read command.
    pub fn queue_response(&mut self, bytes: &[u8]) {
        self.responses.extend(bytes);
    }

    /// Bytes already sitting in the RX FIFO.
    pub fn residual_rx(&mut self, bytes: &[u8]) {
        self.rx_fifo.extend(bytes);
    }

    pub fn rx_fifo_is_empty(&self) -> bool {
        self.rx_fifo.is_empty()
    }

    pub fn commands(&self) -> Vec<DataCommand> {
        self.log
            .iter()
            .filter_map(|access| match access {
                Access::Command(cmd) => Some(*cmd),
                _ => None,
            })
            .collect()
    }

    /// Index of the first access that changes controller state.
    pub fn first_mutation(&self) -> Option<usize> {
        self.log.iter().position(|access| {
            !matches!(
                access,
                Access::Status | Access::StopDetectPending | Access::ReadData
            )
        })
    }
}

impl RegisterInterface for MockRegisters {
    fn status(&mut self) -> BusStatus {
        self.log.push(Access::Status);
        let busy = self.busy_polls > 0;
        self.busy_polls = self.busy_polls.saturating_sub(1);
        let tx_full = self.tx_full_polls > 0;
        self.tx_full_polls = self.tx_full_polls.saturating_sub(1);
        let tx_pending = self.tx_pending_polls > 0;
        self.tx_pending_polls = self.tx_pending_polls.saturating_sub(1);
        BusStatus::from_flags(busy, !tx_full, !self.rx_fifo.is_empty(), !tx_pending)
    }

    fn set_addressing_mode(&mut self, width: AddressWidth) {
        self.log.push(Access::AddressingMode(width));
    }

    fn set_target_address(&mut self, width: AddressWidth, address: u16) {
        self.log.push(Access::TargetAddress(width, address));
    }

    fn enable(&mut self) {
        self.log.push(Access::Enable);
    }

    fn write_command(&mut self, cmd: DataCommand) {
        self.log.push(Access::Command(cmd));
        if cmd.kind == CommandKind::Read {
            let byte = self.responses.pop_front().unwrap_or(0xff);
            self.rx_fifo.push_back(byte);
        }
        if cmd.stop {
            if let Some((busy_polls, tx_pending_polls)) = self.settle.take() {
                self.busy_polls = busy_polls;
                self.tx_pending_polls = tx_pending_polls;
            }
        }
    }

    fn read_data(&mut self) -> u8 {
        self.log.push(Access::ReadData);
        self.rx_fifo.pop_front().unwrap_or(0)
    }

    fn stop_detect_pending(&mut self) -> bool {
        self.log.push(Access::StopDetectPending);
        self.stop_detects > 0
    }

    fn clear_stop_detect(&mut self) {
        self.log.push(Access::ClearStopDetect);
        self.stop_detects = self.stop_detects.saturating_sub(1);
    }
}
