// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! CCM clock roots: a parent mux, an integer divider and an off bit in one
//! control register.
//!
//! The CCM applies root changes asynchronously. Every write is followed by a
//! wait on the BUSY bit of the root status register.

use log::warn;

use crate::hil::clock::{ClockMux, ClockNode};
use crate::utilities::registers::{register_bitfields, ClockIo, LocalRegisterCopy};
use crate::ErrorCode;

register_bitfields![u32,
    ROOT_CONTROL [
        /// Divide by DIV + 1
        DIV OFFSET(0) NUMBITS(8) [],
        MUX OFFSET(8) NUMBITS(3) [],
        OFF OFFSET(24) NUMBITS(1) []
    ],
    ROOT_STATUS [
        BUSY OFFSET(28) NUMBITS(1) []
    ]
];

const STATUS_OFFSET: usize = 0x4;

/// Time the CCM may take to apply a root change.
pub const ROOT_BUSY_TIMEOUT_US: u32 = 500;

const MAX_DIV: u64 = 256;

pub struct CompositeRoot {
    reg: usize,
    num_parents: usize,
    critical: bool,
}

impl CompositeRoot {
    pub const fn new(reg: usize, num_parents: usize, critical: bool) -> CompositeRoot {
        CompositeRoot {
            reg,
            num_parents,
            critical,
        }
    }

    fn control(&self, io: &ClockIo<'_>) -> LocalRegisterCopy<u32, ROOT_CONTROL::Register> {
        io.read(self.reg)
    }

    fn wait_idle(&self, io: &mut ClockIo<'_>) -> Result<(), ErrorCode> {
        let busy = ROOT_STATUS::BUSY.mask << ROOT_STATUS::BUSY.shift;
        io.poll_until_clear(self.reg + STATUS_OFFSET, busy, ROOT_BUSY_TIMEOUT_US)
            .inspect_err(|_| warn!("clock root {:#x}: busy after update", self.reg))
    }

    fn best_div(rate: u64, parent_rate: u64) -> u64 {
        if rate == 0 {
            return MAX_DIV;
        }
        ((parent_rate + rate / 2) / rate).clamp(1, MAX_DIV)
    }
}

impl ClockNode for CompositeRoot {
    fn enable(&self, io: &mut ClockIo<'_>) -> Result<(), ErrorCode> {
        io.modify(self.reg, ROOT_CONTROL::OFF::CLEAR);
        self.wait_idle(io)
    }

    fn disable(&self, io: &mut ClockIo<'_>) -> Result<(), ErrorCode> {
        if self.critical {
            warn!("clock root {:#x}: critical, not turning off", self.reg);
            return Ok(());
        }
        io.modify(self.reg, ROOT_CONTROL::OFF::SET);
        self.wait_idle(io)
    }

    fn is_enabled(&self, io: &ClockIo<'_>) -> bool {
        !self.control(io).is_set(ROOT_CONTROL::OFF)
    }

    fn recalc_rate(&self, io: &ClockIo<'_>, parent_rate: u64) -> u64 {
        let div = self.control(io).read(ROOT_CONTROL::DIV) as u64 + 1;
        parent_rate / div
    }

    fn round_rate(&self, _io: &ClockIo<'_>, rate: u64, parent_rate: u64) -> u64 {
        parent_rate / CompositeRoot::best_div(rate, parent_rate)
    }

    fn set_rate(&self, io: &mut ClockIo<'_>, rate: u64, parent_rate: u64) -> Result<(), ErrorCode> {
        if rate == 0 {
            return Err(ErrorCode::InvalidArgument);
        }
        let div = CompositeRoot::best_div(rate, parent_rate) - 1;
        io.modify(self.reg, ROOT_CONTROL::DIV.val(div as u32));
        self.wait_idle(io)
    }
}

impl ClockMux for CompositeRoot {
    fn parent_index(&self, io: &ClockIo<'_>) -> usize {
        self.control(io).read(ROOT_CONTROL::MUX) as usize
    }

    fn set_parent_index(&self, io: &mut ClockIo<'_>, index: usize) -> Result<(), ErrorCode> {
        if index >= self.num_parents {
            return Err(ErrorCode::InvalidArgument);
        }
        io.modify(self.reg, ROOT_CONTROL::MUX.val(index as u32));
        self.wait_idle(io)
    }
}

#[cfg(test)]
mod tests {
    use super::{CompositeRoot, ROOT_BUSY_TIMEOUT_US};
    use crate::hil::clock::{ClockMux, ClockNode};
    use crate::testing::FakeBus;
    use crate::utilities::registers::ClockIo;
    use crate::ErrorCode;

    const REG: usize = 0x4000_0c80;
    const OFF: u32 = 1 << 24;

    #[test]
    fn mux_selects_parent_and_keeps_divider() {
        let (bus, mut delay) = FakeBus::with_delay();
        bus.set(REG, 0x0000_0003);
        let mut io = ClockIo::new(&bus, &mut delay);
        let root = CompositeRoot::new(REG, 8, false);

        assert_eq!(root.parent_index(&io), 0);
        assert_eq!(root.set_parent_index(&mut io, 5), Ok(()));
        assert_eq!(root.parent_index(&io), 5);
        assert_eq!(bus.get(REG), 0x0000_0503);

        assert_eq!(
            root.set_parent_index(&mut io, 8),
            Err(ErrorCode::InvalidArgument)
        );
        assert_eq!(bus.get(REG), 0x0000_0503);
    }

    #[test]
    fn rate_divides_by_field_plus_one() {
        let (bus, mut delay) = FakeBus::with_delay();
        bus.set(REG, 0x0000_0001);
        let mut io = ClockIo::new(&bus, &mut delay);
        let root = CompositeRoot::new(REG, 8, false);

        assert_eq!(root.recalc_rate(&io, 24_000_000), 12_000_000);

        assert_eq!(root.round_rate(&io, 80_000_000, 480_000_000), 80_000_000);
        root.set_rate(&mut io, 80_000_000, 480_000_000).unwrap();
        assert_eq!(bus.get(REG) & 0xff, 5);
        assert_eq!(root.recalc_rate(&io, 480_000_000), 80_000_000);

        // Out of range requests saturate the divider.
        assert_eq!(root.round_rate(&io, 1, 480_000_000), 480_000_000 / 256);
        assert_eq!(root.round_rate(&io, 1_000_000_000, 480_000_000), 480_000_000);
        assert_eq!(
            root.set_rate(&mut io, 0, 480_000_000),
            Err(ErrorCode::InvalidArgument)
        );
    }

    #[test]
    fn critical_root_is_never_turned_off() {
        let (bus, mut delay) = FakeBus::with_delay();
        let mut io = ClockIo::new(&bus, &mut delay);
        let root = CompositeRoot::new(REG, 8, true);

        assert_eq!(root.disable(&mut io), Ok(()));
        assert_eq!(bus.write_count(), 0);
        assert!(root.is_enabled(&io));
    }

    #[test]
    fn off_bit_follows_enable_state() {
        let (bus, mut delay) = FakeBus::with_delay();
        bus.set(REG, OFF | 0x0201);
        let mut io = ClockIo::new(&bus, &mut delay);
        let root = CompositeRoot::new(REG, 8, false);

        assert!(!root.is_enabled(&io));
        root.enable(&mut io).unwrap();
        assert_eq!(bus.get(REG), 0x0201);
        root.disable(&mut io).unwrap();
        assert_eq!(bus.get(REG), OFF | 0x0201);
    }

    #[test]
    fn stuck_busy_times_out() {
        let (bus, mut delay) = FakeBus::with_delay();
        bus.set(REG + 4, 1 << 28);
        let mut io = ClockIo::new(&bus, &mut delay);
        let root = CompositeRoot::new(REG, 8, false);

        assert_eq!(root.set_parent_index(&mut io, 1), Err(ErrorCode::Timeout));
        // The selection was still written.
        assert_eq!(bus.get(REG), 0x0100);
        assert!(bus.now_us() >= ROOT_BUSY_TIMEOUT_US as u64);
    }
}
