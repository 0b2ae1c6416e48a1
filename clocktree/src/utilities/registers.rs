// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Register access layer used by every clock node.
//!
//! Clock nodes never touch memory directly. They go through a [`ClockIo`],
//! which pairs a [`RegisterBus`] (32-bit reads and writes at absolute
//! addresses) with an [`embedded_hal::delay::DelayNs`] used for settle delays
//! and for polling hardware status bits.
//!
//! Register fields are always described as `tock_registers` [`Field`]s, so
//! node implementations work on (mask, shift) pairs and never on magic
//! numbers.

use embedded_hal::delay::DelayNs;
use log::trace;

use crate::config::CONFIG;
use crate::ErrorCode;

pub use tock_registers::fields::{Field, FieldValue};
pub use tock_registers::{register_bitfields, LocalRegisterCopy, RegisterLongName};

/// Interval between two reads of a status register while polling.
pub const POLL_INTERVAL_US: u32 = 10;

/// Raw access to memory mapped control registers.
///
/// Implementations must not reorder accesses: the hardware has to observe
/// writes in program order.
pub trait RegisterBus {
    /// Read the 32-bit register at `addr`.
    fn read(&self, addr: usize) -> u32;

    /// Write `value` to the 32-bit register at `addr`.
    fn write(&self, addr: usize, value: u32);
}

impl<T: RegisterBus + ?Sized> RegisterBus for &T {
    fn read(&self, addr: usize) -> u32 {
        (**self).read(addr)
    }

    fn write(&self, addr: usize, value: u32) {
        (**self).write(addr, value);
    }
}

/// A register bus and a delay source, borrowed for the duration of one clock
/// operation.
pub struct ClockIo<'a> {
    bus: &'a dyn RegisterBus,
    delay: &'a mut dyn DelayNs,
}

impl<'a> ClockIo<'a> {
    pub fn new(bus: &'a dyn RegisterBus, delay: &'a mut dyn DelayNs) -> ClockIo<'a> {
        ClockIo { bus, delay }
    }

    pub fn read_raw(&self, addr: usize) -> u32 {
        self.bus.read(addr)
    }

    pub fn write_raw(&mut self, addr: usize, value: u32) {
        if CONFIG.trace_registers {
            trace!("clk: write {:#010x} <- {:#010x}", addr, value);
        }
        self.bus.write(addr, value);
    }

    /// Read a register into a local copy typed with its bitfield layout.
    pub fn read<R: RegisterLongName>(&self, addr: usize) -> LocalRegisterCopy<u32, R> {
        LocalRegisterCopy::new(self.read_raw(addr))
    }

    pub fn write<R: RegisterLongName>(&mut self, addr: usize, reg: LocalRegisterCopy<u32, R>) {
        self.write_raw(addr, reg.get());
    }

    /// Read-modify-write of the fields named in `field`. The rest of the
    /// register is preserved.
    pub fn modify<R: RegisterLongName>(&mut self, addr: usize, field: FieldValue<u32, R>) {
        let mut reg: LocalRegisterCopy<u32, R> = self.read(addr);
        reg.modify(field);
        self.write(addr, reg);
    }

    pub fn set_bits(&mut self, addr: usize, mask: u32) {
        let value = self.read_raw(addr);
        self.write_raw(addr, value | mask);
    }

    pub fn clear_bits(&mut self, addr: usize, mask: u32) {
        let value = self.read_raw(addr);
        self.write_raw(addr, value & !mask);
    }

    pub fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    /// Wait until every bit of `mask` reads as one.
    ///
    /// The register is sampled before the first delay, so a condition that
    /// already holds returns without sleeping. Otherwise the register is
    /// sampled every [`POLL_INTERVAL_US`] and `Timeout` is returned once more
    /// than `timeout_us` has been spent waiting, which is at most
    /// `timeout_us + POLL_INTERVAL_US`.
    pub fn poll_until(&mut self, addr: usize, mask: u32, timeout_us: u32) -> Result<(), ErrorCode> {
        self.poll(addr, mask, mask, timeout_us)
    }

    /// Wait until every bit of `mask` reads as zero. Same timing as
    /// [`ClockIo::poll_until`].
    pub fn poll_until_clear(
        &mut self,
        addr: usize,
        mask: u32,
        timeout_us: u32,
    ) -> Result<(), ErrorCode> {
        self.poll(addr, mask, 0, timeout_us)
    }

    fn poll(&mut self, addr: usize, mask: u32, expected: u32, timeout_us: u32) -> Result<(), ErrorCode> {
        let mut waited_us: u32 = 0;
        loop {
            if self.read_raw(addr) & mask == expected {
                return Ok(());
            }
            if waited_us >= timeout_us {
                return Err(ErrorCode::Timeout);
            }
            self.delay.delay_us(POLL_INTERVAL_US);
            waited_us = waited_us.saturating_add(POLL_INTERVAL_US);
        }
    }
}
