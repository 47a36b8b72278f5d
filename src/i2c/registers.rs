// Licensed under the Apache-2.0 license

//! Register interface of the Serial IO (DesignWare-compatible) I2C controller.
//!
//! All bit-twiddling lives here. The transfer engine only talks to a
//! [`RegisterInterface`], which names the operations it needs on the
//! controller's bitfields; [`MmioRegisters`] is the volatile implementation
//! over the memory-mapped register block.

use core::ptr::NonNull;

use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use tock_registers::registers::{ReadOnly, ReadWrite};
use tock_registers::{register_bitfields, register_structs, LocalRegisterCopy};

use crate::i2c::common::AddressWidth;

register_bitfields![u32,
    pub CTL [
        ADDRESSING_MODE OFFSET(4) NUMBITS(1) [
            SevenBit = 0,
            TenBit = 1
        ],
    ],

    pub TAR_ADD [
        WIDTH OFFSET(12) NUMBITS(1) [
            SevenBit = 0,
            TenBit = 1
        ],
        IC_TAR OFFSET(0) NUMBITS(10) [],
    ],

    pub DATA_CMD [
        RESTART OFFSET(10) NUMBITS(1) [],
        STOP OFFSET(9) NUMBITS(1) [],
        CMD OFFSET(8) NUMBITS(1) [
            Write = 0,
            Read = 1
        ],
        DAT OFFSET(0) NUMBITS(8) [],
    ],

    pub INTR [
        STOP_DET OFFSET(9) NUMBITS(1) [],
    ],

    pub I2C_EN [
        ENABLE OFFSET(0) NUMBITS(1) [],
    ],

    pub I2C_STA [
        CA OFFSET(5) NUMBITS(1) [],
        RFNE OFFSET(3) NUMBITS(1) [],
        TFCE OFFSET(2) NUMBITS(1) [],
        TFNF OFFSET(1) NUMBITS(1) [],
    ],
];

register_structs! {
    SerialIoRegisters {
        (0x00 => ctl: ReadWrite<u32, CTL::Register>),
        (0x04 => tar_add: ReadWrite<u32, TAR_ADD::Register>),
        (0x08 => _reserved0),
        (0x10 => data_cmd: ReadWrite<u32, DATA_CMD::Register>),
        (0x14 => _reserved1),
        (0x34 => raw_intr_stat: ReadOnly<u32, INTR::Register>),
        (0x38 => _reserved2),
        (0x60 => clr_stop_det: ReadOnly<u32>),
        (0x64 => _reserved3),
        (0x6c => i2c_en: ReadWrite<u32, I2C_EN::Register>),
        (0x70 => i2c_sta: ReadOnly<u32, I2C_STA::Register>),
        (0x74 => @END),
    }
}

/// Snapshot of the `i2c_sta` register.
#[derive(Copy, Clone)]
pub struct BusStatus(LocalRegisterCopy<u32, I2C_STA::Register>);

impl BusStatus {
    #[must_use]
    pub fn from_bits(raw: u32) -> Self {
        Self(LocalRegisterCopy::new(raw))
    }

    /// Build a status word from its individual flags.
    #[must_use]
    pub fn from_flags(busy: bool, tx_not_full: bool, rx_not_empty: bool, tx_empty: bool) -> Self {
        let mut reg = LocalRegisterCopy::new(0);
        reg.modify(
            I2C_STA::CA.val(u32::from(busy))
                + I2C_STA::TFNF.val(u32::from(tx_not_full))
                + I2C_STA::RFNE.val(u32::from(rx_not_empty))
                + I2C_STA::TFCE.val(u32::from(tx_empty)),
        );
        Self(reg)
    }

    #[must_use]
    pub fn bits(&self) -> u32 {
        self.0.get()
    }

    /// Controller activity.
    #[must_use]
    pub fn busy(&self) -> bool {
        self.0.is_set(I2C_STA::CA)
    }

    #[must_use]
    pub fn tx_fifo_not_full(&self) -> bool {
        self.0.is_set(I2C_STA::TFNF)
    }

    #[must_use]
    pub fn rx_fifo_not_empty(&self) -> bool {
        self.0.is_set(I2C_STA::RFNE)
    }

    /// TX FIFO completely empty.
    #[must_use]
    pub fn tx_fifo_empty(&self) -> bool {
        self.0.is_set(I2C_STA::TFCE)
    }

    /// The bus is idle once the controller is inactive and has nothing left to send.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        !self.busy() && self.tx_fifo_empty()
    }
}

impl core::fmt::Debug for BusStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BusStatus")
            .field("busy", &self.busy())
            .field("tx_fifo_not_full", &self.tx_fifo_not_full())
            .field("rx_fifo_not_empty", &self.rx_fifo_not_empty())
            .field("tx_fifo_empty", &self.tx_fifo_empty())
            .finish()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CommandKind {
    /// Transmit the carried data byte.
    Write(u8),
    /// Clock one byte in from the target.
    Read,
}

/// One word pushed into the `data_cmd` register.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DataCommand {
    pub kind: CommandKind,
    pub restart: bool,
    pub stop: bool,
}

impl DataCommand {
    #[must_use]
    pub fn encode(&self) -> u32 {
        let mut word = LocalRegisterCopy::<u32, DATA_CMD::Register>::new(0);
        let kind = match self.kind {
            CommandKind::Write(byte) => DATA_CMD::CMD::Write + DATA_CMD::DAT.val(u32::from(byte)),
            CommandKind::Read => DATA_CMD::CMD::Read + DATA_CMD::DAT.val(0),
        };
        word.modify(
            kind + DATA_CMD::RESTART.val(u32::from(self.restart))
                + DATA_CMD::STOP.val(u32::from(self.stop)),
        );
        word.get()
    }
}

/// Named operations on the controller's registers.
///
/// Implementations perform each access exactly once, in call order; the
/// transfer engine relies on that to sequence the FIFO.
pub trait RegisterInterface {
    /// Read `i2c_sta`.
    fn status(&mut self) -> BusStatus;

    /// Read-modify-write the addressing-mode bit in `ctl`.
    fn set_addressing_mode(&mut self, width: AddressWidth);

    /// Write the target address and its width flag to `tar_add`.
    fn set_target_address(&mut self, width: AddressWidth, address: u16);

    /// Set the enable bit; idempotent.
    fn enable(&mut self);

    /// Push one command word into the TX FIFO.
    fn write_command(&mut self, cmd: DataCommand);

    /// Pop one received byte from the RX FIFO.
    fn read_data(&mut self) -> u8;

    /// Stop-detection bit of the raw interrupt status.
    fn stop_detect_pending(&mut self) -> bool;

    /// Read `clr_stop_det`, acknowledging a stop detection.
    fn clear_stop_detect(&mut self);
}

/// Volatile access to a memory-mapped Serial IO I2C register block.
pub struct MmioRegisters {
    base: NonNull<SerialIoRegisters>,
}

// SAFETY: the block is only reached through `&mut self`, and the bus lock in
// `BusController` serializes every user of one controller.
unsafe impl Send for MmioRegisters {}

impl MmioRegisters {
    /// Wrap the register block at `base`. Returns `None` for a null pointer.
    ///
    /// # Safety
    ///
    /// `base` must point to the controller's mapped register block, suitably
    /// aligned, valid for the lifetime of the returned value, and not wrapped
    /// by any other `MmioRegisters`.
    pub unsafe fn new(base: *mut u8) -> Option<Self> {
        NonNull::new(base.cast::<SerialIoRegisters>()).map(|base| Self { base })
    }

    fn regs(&self) -> &SerialIoRegisters {
        // SAFETY: guaranteed by the contract of `MmioRegisters::new`.
        unsafe { self.base.as_ref() }
    }
}

impl RegisterInterface for MmioRegisters {
    fn status(&mut self) -> BusStatus {
        BusStatus(self.regs().i2c_sta.extract())
    }

    fn set_addressing_mode(&mut self, width: AddressWidth) {
        let mode = match width {
            AddressWidth::SevenBit => CTL::ADDRESSING_MODE::SevenBit,
            AddressWidth::TenBit => CTL::ADDRESSING_MODE::TenBit,
        };
        self.regs().ctl.modify(mode);
    }

    fn set_target_address(&mut self, width: AddressWidth, address: u16) {
        let flag = match width {
            AddressWidth::SevenBit => TAR_ADD::WIDTH::SevenBit,
            AddressWidth::TenBit => TAR_ADD::WIDTH::TenBit,
        };
        self.regs()
            .tar_add
            .write(flag + TAR_ADD::IC_TAR.val(u32::from(address)));
    }

    fn enable(&mut self) {
        self.regs().i2c_en.modify(I2C_EN::ENABLE::SET);
    }

    fn write_command(&mut self, cmd: DataCommand) {
        self.regs().data_cmd.set(cmd.encode());
    }

    fn read_data(&mut self) -> u8 {
        // DAT is eight bits wide.
        self.regs().data_cmd.read(DATA_CMD::DAT) as u8
    }

    fn stop_detect_pending(&mut self) -> bool {
        self.regs().raw_intr_stat.is_set(INTR::STOP_DET)
    }

    fn clear_stop_detect(&mut self) {
        let _ = self.regs().clr_stop_det.get();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_command_layout() {
        let write = DataCommand {
            kind: CommandKind::Write(0xa5),
            restart: true,
            stop: false,
        };
        assert_eq!(write.encode(), (1 << 10) | 0xa5);

        let read = DataCommand {
            kind: CommandKind::Read,
            restart: false,
            stop: true,
        };
        assert_eq!(read.encode(), (1 << 9) | (1 << 8));
    }

    #[test]
    fn status_decodes_flags() {
        let status = BusStatus::from_bits((1 << 5) | (1 << 2));
        assert!(status.busy());
        assert!(status.tx_fifo_empty());
        assert!(!status.rx_fifo_not_empty());
        assert!(!status.is_idle());

        let draining = BusStatus::from_flags(false, true, false, false);
        assert!(!draining.busy());
        assert!(!draining.is_idle());

        let idle = BusStatus::from_flags(false, true, false, true);
        assert!(idle.is_idle());
        assert_eq!(idle.bits(), (1 << 1) | (1 << 2));
    }

    #[test]
    fn mmio_rejects_null_base() {
        // SAFETY: a null base is rejected before any access.
        assert!(unsafe { MmioRegisters::new(core::ptr::null_mut()) }.is_none());
    }

    #[test]
    fn mmio_programs_in_memory_block() {
        let mut block = [0u32; 0x74 / 4];
        block[0x70 / 4] = (1 << 3) | (1 << 2);
        block[0x10 / 4] = 0x3c;
        // SAFETY: `block` is a properly aligned buffer the size of the register block.
        let mut regs = unsafe { MmioRegisters::new(block.as_mut_ptr().cast()) }.unwrap();

        assert!(regs.status().rx_fifo_not_empty());
        assert_eq!(regs.read_data(), 0x3c);
        regs.set_addressing_mode(AddressWidth::TenBit);
        regs.set_target_address(AddressWidth::TenBit, 0x2a5);
        regs.enable();
        regs.write_command(DataCommand {
            kind: CommandKind::Write(0x11),
            restart: false,
            stop: true,
        });
        drop(regs);

        assert_eq!(block[0x00 / 4], 1 << 4);
        assert_eq!(block[0x04 / 4], (1 << 12) | 0x2a5);
        assert_eq!(block[0x6c / 4], 1);
        assert_eq!(block[0x10 / 4], (1 << 9) | 0x11);
    }
}
