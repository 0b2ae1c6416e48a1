// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Fixed rate sources and fixed multiply/divide stages.

use crate::hil::clock::ClockNode;
use crate::utilities::registers::ClockIo;
use crate::ErrorCode;

/// A source with a constant rate, such as an oscillator.
pub struct FixedRate {
    rate: u64,
}

impl FixedRate {
    pub const fn new(rate: u64) -> FixedRate {
        FixedRate { rate }
    }
}

impl ClockNode for FixedRate {
    fn recalc_rate(&self, _io: &ClockIo<'_>, _parent_rate: u64) -> u64 {
        self.rate
    }
}

/// Output gate of a fixed factor stage: one bit of a control register,
/// set to let the clock through.
#[derive(Clone, Copy, Debug)]
pub struct OutputGate {
    pub reg: usize,
    pub bit: u8,
}

/// `parent * mult / div`, optionally behind an output gate bit.
pub struct FixedFactor {
    mult: u32,
    div: u32,
    gate: Option<OutputGate>,
}

impl FixedFactor {
    pub const fn new(mult: u32, div: u32) -> FixedFactor {
        FixedFactor {
            mult,
            div,
            gate: None,
        }
    }

    pub const fn gated(mult: u32, div: u32, gate: OutputGate) -> FixedFactor {
        FixedFactor {
            mult,
            div,
            gate: Some(gate),
        }
    }
}

impl ClockNode for FixedFactor {
    fn enable(&self, io: &mut ClockIo<'_>) -> Result<(), ErrorCode> {
        if let Some(gate) = self.gate {
            io.set_bits(gate.reg, 1 << gate.bit);
        }
        Ok(())
    }

    fn disable(&self, io: &mut ClockIo<'_>) -> Result<(), ErrorCode> {
        if let Some(gate) = self.gate {
            io.clear_bits(gate.reg, 1 << gate.bit);
        }
        Ok(())
    }

    fn is_enabled(&self, io: &ClockIo<'_>) -> bool {
        self.gate
            .map_or(true, |gate| io.read_raw(gate.reg) & (1 << gate.bit) != 0)
    }

    fn recalc_rate(&self, _io: &ClockIo<'_>, parent_rate: u64) -> u64 {
        if self.div == 0 {
            return 0;
        }
        parent_rate * self.mult as u64 / self.div as u64
    }
}

#[cfg(test)]
mod tests {
    use super::{FixedFactor, FixedRate, OutputGate};
    use crate::hil::clock::ClockNode;
    use crate::testing::FakeBus;
    use crate::utilities::registers::ClockIo;
    use crate::ErrorCode;

    #[test]
    fn fixed_rate_ignores_parent() {
        let (bus, mut delay) = FakeBus::with_delay();
        let mut io = ClockIo::new(&bus, &mut delay);
        let osc = FixedRate::new(24_000_000);

        assert_eq!(osc.recalc_rate(&io, 0), 24_000_000);
        assert_eq!(osc.set_rate(&mut io, 24_000_000, 0), Ok(()));
        assert_eq!(
            osc.set_rate(&mut io, 12_000_000, 0),
            Err(ErrorCode::UnsupportedRate)
        );
        assert!(osc.is_enabled(&io));
    }

    #[test]
    fn fixed_factor_scales_parent() {
        let (bus, mut delay) = FakeBus::with_delay();
        let io = ClockIo::new(&bus, &mut delay);

        assert_eq!(FixedFactor::new(25, 1).recalc_rate(&io, 16_000_000), 400_000_000);
        assert_eq!(FixedFactor::new(1, 5).recalc_rate(&io, 1_000_000_000), 200_000_000);
    }

    #[test]
    fn gated_output_toggles_its_bit_only() {
        const REG: usize = 0x2c0;
        let (bus, mut delay) = FakeBus::with_delay();
        bus.set(REG, 0x8000_0001);
        let mut io = ClockIo::new(&bus, &mut delay);
        let div2 = FixedFactor::gated(1, 2, OutputGate { reg: REG, bit: 25 });

        assert!(!div2.is_enabled(&io));
        div2.enable(&mut io).unwrap();
        assert!(div2.is_enabled(&io));
        assert_eq!(bus.get(REG), 0x8200_0001);

        div2.disable(&mut io).unwrap();
        assert_eq!(bus.get(REG), 0x8000_0001);
    }
}
