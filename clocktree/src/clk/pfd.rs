// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Phase fractional dividers.
//!
//! Four PFDs share one register, one byte each. A PFD outputs
//! `parent * 18 / FRAC`. The register has SET and CLR aliases at `+4` and
//! `+8`, so a PFD is always updated without a read-modify-write of its
//! neighbours.

use crate::hil::clock::ClockNode;
use crate::utilities::registers::{register_bitfields, ClockIo};
use crate::ErrorCode;

register_bitfields![u32,
    PFD_BYTE [
        FRAC OFFSET(0) NUMBITS(6) [],
        CLKGATE OFFSET(7) NUMBITS(1) []
    ]
];

const SET: usize = 0x4;
const CLR: usize = 0x8;

const FRAC_MIN: u64 = 12;
const FRAC_MAX: u64 = 35;

pub struct Pfd {
    reg: usize,
    index: u8,
}

impl Pfd {
    /// PFD `index` (0..=3) of the register at `reg`.
    pub const fn new(reg: usize, index: u8) -> Pfd {
        Pfd { reg, index }
    }

    fn shift(&self) -> u32 {
        self.index as u32 * 8
    }

    fn frac(&self, io: &ClockIo<'_>) -> u64 {
        let byte = io.read_raw(self.reg) >> self.shift();
        (byte & (PFD_BYTE::FRAC.mask << PFD_BYTE::FRAC.shift)) as u64
    }

    fn gate_mask(&self) -> u32 {
        (PFD_BYTE::CLKGATE.mask << PFD_BYTE::CLKGATE.shift) << self.shift()
    }

    fn best_frac(rate: u64, parent_rate: u64) -> u64 {
        if rate == 0 {
            return FRAC_MAX;
        }
        let scaled = parent_rate * 18;
        let frac = (scaled + rate / 2) / rate;
        frac.clamp(FRAC_MIN, FRAC_MAX)
    }
}

impl ClockNode for Pfd {
    fn enable(&self, io: &mut ClockIo<'_>) -> Result<(), ErrorCode> {
        io.write_raw(self.reg + CLR, self.gate_mask());
        Ok(())
    }

    fn disable(&self, io: &mut ClockIo<'_>) -> Result<(), ErrorCode> {
        io.write_raw(self.reg + SET, self.gate_mask());
        Ok(())
    }

    fn is_enabled(&self, io: &ClockIo<'_>) -> bool {
        io.read_raw(self.reg) & self.gate_mask() == 0
    }

    fn recalc_rate(&self, io: &ClockIo<'_>, parent_rate: u64) -> u64 {
        match self.frac(io) {
            0 => 0,
            frac => parent_rate * 18 / frac,
        }
    }

    fn round_rate(&self, _io: &ClockIo<'_>, rate: u64, parent_rate: u64) -> u64 {
        parent_rate * 18 / Pfd::best_frac(rate, parent_rate)
    }

    fn set_rate(&self, io: &mut ClockIo<'_>, rate: u64, parent_rate: u64) -> Result<(), ErrorCode> {
        if rate == 0 {
            return Err(ErrorCode::InvalidArgument);
        }
        let frac = Pfd::best_frac(rate, parent_rate) as u32;
        let field = (PFD_BYTE::FRAC.mask << PFD_BYTE::FRAC.shift) << self.shift();
        io.write_raw(self.reg + CLR, field);
        io.write_raw(self.reg + SET, frac << self.shift());
        Ok(())
    }
}
