// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Single bit clock gates (the CCM low power clock gates).

use log::warn;

use crate::hil::clock::ClockNode;
use crate::utilities::registers::ClockIo;
use crate::ErrorCode;

pub struct Gate {
    reg: usize,
    bit: u8,
    critical: bool,
}

impl Gate {
    pub const fn new(reg: usize, bit: u8, critical: bool) -> Gate {
        Gate { reg, bit, critical }
    }

    fn mask(&self) -> u32 {
        1 << self.bit
    }
}

impl ClockNode for Gate {
    fn enable(&self, io: &mut ClockIo<'_>) -> Result<(), ErrorCode> {
        io.set_bits(self.reg, self.mask());
        Ok(())
    }

    /// # Errors
    ///
    /// `PermissionDenied` for a critical gate. The register is left untouched.
    fn disable(&self, io: &mut ClockIo<'_>) -> Result<(), ErrorCode> {
        if self.critical {
            warn!("clock gate {:#x}: critical, refusing to gate", self.reg);
            return Err(ErrorCode::PermissionDenied);
        }
        io.clear_bits(self.reg, self.mask());
        Ok(())
    }

    fn is_enabled(&self, io: &ClockIo<'_>) -> bool {
        io.read_raw(self.reg) & self.mask() != 0
    }

    fn recalc_rate(&self, _io: &ClockIo<'_>, parent_rate: u64) -> u64 {
        parent_rate
    }
}

#[cfg(test)]
mod tests {
    use super::Gate;
    use crate::hil::clock::ClockNode;
    use crate::testing::FakeBus;
    use crate::utilities::registers::ClockIo;
    use crate::ErrorCode;

    const REG: usize = 0x40cc_6ac0;

    #[test]
    fn enable_disable_toggle_bit() {
        let (bus, mut delay) = FakeBus::with_delay();
        bus.set(REG, 0xffff_0000);
        let mut io = ClockIo::new(&bus, &mut delay);
        let gate = Gate::new(REG, 0, false);

        assert!(!gate.is_enabled(&io));
        gate.enable(&mut io).unwrap();
        assert_eq!(bus.get(REG), 0xffff_0001);
        assert!(gate.is_enabled(&io));
        gate.disable(&mut io).unwrap();
        assert_eq!(bus.get(REG), 0xffff_0000);
        assert_eq!(gate.recalc_rate(&io, 24_000_000), 24_000_000);
    }

    #[test]
    fn critical_gate_refuses_disable() {
        let (bus, mut delay) = FakeBus::with_delay();
        bus.set(REG, 1);
        let mut io = ClockIo::new(&bus, &mut delay);
        let gate = Gate::new(REG, 0, true);

        assert_eq!(gate.disable(&mut io), Err(ErrorCode::PermissionDenied));
        assert_eq!(bus.write_count(), 0);
        assert!(gate.is_enabled(&io));
    }
}
