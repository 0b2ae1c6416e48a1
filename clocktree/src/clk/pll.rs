// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Anatop PLL clock nodes.
//!
//! Four PLL variants share one control register format but place their
//! powerup, enable and gate bits differently. The variant only selects a
//! [`PllLayout`] table and a rate formula; the power sequencing code is
//! shared.
//!
//! Power states, as seen in the control register:
//!
//! ```text
//!   unpowered --prepare--> powering --stable--> prepared --enable--> running
//!       ^                                          |  ^                 |
//!       +---------------- unprepare ---------------+  +---- disable ----+
//! ```
//!
//! `Pll1` has no powerup or stable phase and only gates its fixed 1 GHz
//! output.

use log::{debug, warn};

use crate::hil::clock::ClockNode;
use crate::utilities::registers::{register_bitfields, ClockIo, Field, LocalRegisterCopy};
use crate::ErrorCode;

register_bitfields![u32,
    pub PLL_CTRL [
        /// ARM PLL loop divider, in half steps
        ARM_DIV_SELECT OFFSET(0) NUMBITS(8) [],
        SYS_HOLD_RING_OFF OFFSET(11) NUMBITS(1) [],
        ARM_HOLD_RING_OFF OFFSET(12) NUMBITS(1) [],
        ARM_POWERUP OFFSET(13) NUMBITS(1) [],
        SYS_ENABLE_CLK OFFSET(13) NUMBITS(1) [],
        ARM_ENABLE_CLK OFFSET(14) NUMBITS(1) [],
        PLL1_GATE OFFSET(14) NUMBITS(1) [],
        /// Index into the ARM PLL post divider table
        ARM_POST_DIV_SEL OFFSET(15) NUMBITS(2) [],
        SYS3_POWERUP OFFSET(21) NUMBITS(1) [],
        SYS2_POWERUP OFFSET(23) NUMBITS(1) [],
        /// Set by hardware once the PLL output has settled
        STABLE OFFSET(29) NUMBITS(1) [],
        GATE OFFSET(30) NUMBITS(1) []
    ]
];

type CtrlField = Field<u32, PLL_CTRL::Register>;

/// Delay between gating the output and powering up the PLL.
pub const PLL_SETTLE_US: u32 = 30;

/// ARM PLL post dividers, indexed by `ARM_POST_DIV_SEL`.
const POST_DIV_TABLE: [u64; 4] = [2, 4, 8, 1];

const PLL1_RATE: u64 = 1_000_000_000;

/// How the ARM PLL is brought up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArmSequence {
    /// Gate, power up with the ring oscillator held, release the ring, wait
    /// for lock. Enable and gate are handled by `enable`/`disable`.
    RingHold,
    /// Power up, wait for lock, then set the clock enable bit. The output has
    /// no separate gate and `enable`/`disable` do nothing.
    Direct,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PllKind {
    /// Programmable ARM core PLL.
    Arm(ArmSequence),
    /// System PLL 2, 22 times its reference.
    Sys2,
    /// System PLL 3, 20 times its reference.
    Sys3,
    /// System PLL 1, fixed 1 GHz, gate only.
    Pll1,
}

/// Control register layout of one PLL variant.
pub struct PllLayout {
    pub powerup: Option<CtrlField>,
    pub enable: CtrlField,
    pub stable: CtrlField,
    pub gate: Option<CtrlField>,
    pub hold_ring_off: Option<CtrlField>,
    pub div: Option<CtrlField>,
    pub post_div: Option<CtrlField>,
    /// Time the PLL may take to lock after powerup.
    pub lock_timeout_us: u32,
}

const ARM_RING_HOLD_LAYOUT: PllLayout = PllLayout {
    powerup: Some(PLL_CTRL::ARM_POWERUP),
    enable: PLL_CTRL::ARM_ENABLE_CLK,
    stable: PLL_CTRL::STABLE,
    gate: Some(PLL_CTRL::GATE),
    hold_ring_off: Some(PLL_CTRL::ARM_HOLD_RING_OFF),
    div: Some(PLL_CTRL::ARM_DIV_SELECT),
    post_div: Some(PLL_CTRL::ARM_POST_DIV_SEL),
    lock_timeout_us: 60,
};

const ARM_DIRECT_LAYOUT: PllLayout = PllLayout {
    powerup: Some(PLL_CTRL::ARM_POWERUP),
    enable: PLL_CTRL::ARM_ENABLE_CLK,
    stable: PLL_CTRL::STABLE,
    gate: None,
    hold_ring_off: None,
    div: Some(PLL_CTRL::ARM_DIV_SELECT),
    post_div: Some(PLL_CTRL::ARM_POST_DIV_SEL),
    lock_timeout_us: 50,
};

const SYS2_LAYOUT: PllLayout = PllLayout {
    powerup: Some(PLL_CTRL::SYS2_POWERUP),
    enable: PLL_CTRL::SYS_ENABLE_CLK,
    stable: PLL_CTRL::STABLE,
    gate: Some(PLL_CTRL::GATE),
    hold_ring_off: Some(PLL_CTRL::SYS_HOLD_RING_OFF),
    div: None,
    post_div: None,
    lock_timeout_us: 500,
};

const SYS3_LAYOUT: PllLayout = PllLayout {
    powerup: Some(PLL_CTRL::SYS3_POWERUP),
    enable: PLL_CTRL::SYS_ENABLE_CLK,
    stable: PLL_CTRL::STABLE,
    gate: Some(PLL_CTRL::GATE),
    hold_ring_off: Some(PLL_CTRL::SYS_HOLD_RING_OFF),
    div: None,
    post_div: None,
    lock_timeout_us: 60,
};

const PLL1_LAYOUT: PllLayout = PllLayout {
    powerup: None,
    enable: PLL_CTRL::SYS_ENABLE_CLK,
    stable: PLL_CTRL::STABLE,
    gate: Some(PLL_CTRL::PLL1_GATE),
    hold_ring_off: None,
    div: None,
    post_div: None,
    lock_timeout_us: 0,
};

impl PllKind {
    pub fn layout(self) -> &'static PllLayout {
        match self {
            PllKind::Arm(ArmSequence::RingHold) => &ARM_RING_HOLD_LAYOUT,
            PllKind::Arm(ArmSequence::Direct) => &ARM_DIRECT_LAYOUT,
            PllKind::Sys2 => &SYS2_LAYOUT,
            PllKind::Sys3 => &SYS3_LAYOUT,
            PllKind::Pll1 => &PLL1_LAYOUT,
        }
    }
}

fn mask(field: CtrlField) -> u32 {
    field.mask << field.shift
}

pub struct Pll {
    reg: usize,
    kind: PllKind,
}

impl Pll {
    /// A PLL whose control register is at absolute address `reg`.
    pub const fn new(kind: PllKind, reg: usize) -> Pll {
        Pll { reg, kind }
    }

    fn ctrl(&self, io: &ClockIo<'_>) -> LocalRegisterCopy<u32, PLL_CTRL::Register> {
        io.read(self.reg)
    }

    fn wait_stable(&self, io: &mut ClockIo<'_>) -> Result<(), ErrorCode> {
        let layout = self.kind.layout();
        match io.poll_until(self.reg, mask(layout.stable), layout.lock_timeout_us) {
            Ok(()) => {
                debug!("pll {:#x} ({:?}): locked", self.reg, self.kind);
                Ok(())
            }
            Err(e) => {
                warn!(
                    "pll {:#x} ({:?}): no lock after {}us",
                    self.reg, self.kind, layout.lock_timeout_us
                );
                Err(e)
            }
        }
    }

    fn prepare_ring_hold(&self, io: &mut ClockIo<'_>, powerup: CtrlField) -> Result<(), ErrorCode> {
        let layout = self.kind.layout();
        let mut ctrl = self.ctrl(io);
        if ctrl.is_set(powerup) {
            return Ok(());
        }

        ctrl.modify(layout.stable.val(0) + layout.enable.val(0));
        if let Some(gate) = layout.gate {
            ctrl.modify(gate.val(1));
        }
        io.write(self.reg, ctrl);

        io.delay_us(PLL_SETTLE_US);

        ctrl.modify(powerup.val(1));
        if let Some(hold) = layout.hold_ring_off {
            ctrl.modify(hold.val(1));
        }
        io.write(self.reg, ctrl);

        io.delay_us(layout.lock_timeout_us / 2);

        if let Some(hold) = layout.hold_ring_off {
            ctrl.modify(hold.val(0));
            io.write(self.reg, ctrl);
        }

        self.wait_stable(io)
    }

    fn prepare_direct(&self, io: &mut ClockIo<'_>, powerup: CtrlField) -> Result<(), ErrorCode> {
        let layout = self.kind.layout();
        let mut ctrl = self.ctrl(io);
        ctrl.modify(layout.stable.val(0));
        if ctrl.is_set(layout.enable) {
            return Ok(());
        }

        ctrl.modify(powerup.val(1));
        io.write(self.reg, ctrl);

        self.wait_stable(io)?;

        ctrl.modify(layout.enable.val(1));
        io.write(self.reg, ctrl);
        Ok(())
    }
}

impl ClockNode for Pll {
    fn prepare(&self, io: &mut ClockIo<'_>) -> Result<(), ErrorCode> {
        let Some(powerup) = self.kind.layout().powerup else {
            return Ok(());
        };
        match self.kind {
            PllKind::Arm(ArmSequence::Direct) => self.prepare_direct(io, powerup),
            _ => self.prepare_ring_hold(io, powerup),
        }
    }

    fn unprepare(&self, io: &mut ClockIo<'_>) {
        let layout = self.kind.layout();
        let Some(powerup) = layout.powerup else {
            return;
        };
        let mut ctrl = self.ctrl(io);
        ctrl.modify(layout.stable.val(0) + layout.enable.val(0) + powerup.val(0));
        if let Some(gate) = layout.gate {
            ctrl.modify(gate.val(1));
        }
        io.write(self.reg, ctrl);
    }

    fn is_prepared(&self, io: &ClockIo<'_>) -> bool {
        let layout = self.kind.layout();
        match layout.powerup {
            Some(powerup) => {
                let ctrl = self.ctrl(io);
                ctrl.is_set(layout.stable) && ctrl.is_set(powerup)
            }
            None => true,
        }
    }

    fn enable(&self, io: &mut ClockIo<'_>) -> Result<(), ErrorCode> {
        if self.kind == PllKind::Arm(ArmSequence::Direct) {
            return Ok(());
        }
        let layout = self.kind.layout();
        let mut ctrl = self.ctrl(io);
        if let Some(powerup) = layout.powerup {
            if !ctrl.is_set(powerup) {
                return Err(ErrorCode::InvalidState);
            }
        }

        if !ctrl.is_set(layout.enable) {
            ctrl.modify(layout.enable.val(1));
            io.write(self.reg, ctrl);
        }
        if let Some(gate) = layout.gate {
            if ctrl.is_set(gate) {
                ctrl.modify(gate.val(0));
                io.write(self.reg, ctrl);
            }
        }
        Ok(())
    }

    fn disable(&self, io: &mut ClockIo<'_>) -> Result<(), ErrorCode> {
        if self.kind == PllKind::Arm(ArmSequence::Direct) {
            return Ok(());
        }
        let layout = self.kind.layout();
        let mut ctrl = self.ctrl(io);
        ctrl.modify(layout.enable.val(0));
        if let Some(gate) = layout.gate {
            ctrl.modify(gate.val(1));
        }
        io.write(self.reg, ctrl);
        Ok(())
    }

    fn is_enabled(&self, io: &ClockIo<'_>) -> bool {
        let layout = self.kind.layout();
        let ctrl = self.ctrl(io);
        let ungated = layout.gate.map_or(true, |gate| !ctrl.is_set(gate));
        let powered = match layout.powerup {
            Some(powerup) => ctrl.is_set(powerup) && ctrl.is_set(layout.stable),
            None => true,
        };
        ungated && powered && ctrl.is_set(layout.enable)
    }

    fn recalc_rate(&self, io: &ClockIo<'_>, parent_rate: u64) -> u64 {
        match self.kind {
            PllKind::Arm(_) => {
                let layout = self.kind.layout();
                let ctrl = self.ctrl(io);
                let div = layout.div.map_or(0, |f| ctrl.read(f)) as u64;
                let post_div_idx = layout.post_div.map_or(0, |f| ctrl.read(f)) as usize;
                // A reserved post divider encoding reports an unknown (zero)
                // rate rather than an error.
                match POST_DIV_TABLE.get(post_div_idx) {
                    Some(post_div) => parent_rate * (div / 2) / post_div,
                    None => 0,
                }
            }
            PllKind::Sys2 => parent_rate * 22,
            PllKind::Sys3 => parent_rate * 20,
            PllKind::Pll1 => PLL1_RATE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ArmSequence, Pll, PllKind, PLL_CTRL};
    use crate::hil::clock::ClockNode;
    use crate::testing::FakeBus;
    use crate::utilities::registers::ClockIo;
    use crate::ErrorCode;

    const REG: usize = 0x4000_0200;
    const OSC: u64 = 24_000_000;

    const STABLE: u32 = 1 << 29;
    const GATE: u32 = 1 << 30;

    fn powerup_mask(kind: PllKind) -> u32 {
        let f = kind.layout().powerup.unwrap();
        f.mask << f.shift
    }

    #[test]
    fn arm_rate_from_dividers() {
        let (bus, mut delay) = FakeBus::with_delay();
        // div = 100 (50 in half steps), post divider index 0 (divide by 2)
        bus.set(REG, 100);
        let io = ClockIo::new(&bus, &mut delay);
        let pll = Pll::new(PllKind::Arm(ArmSequence::RingHold), REG);

        assert_eq!(pll.recalc_rate(&io, OSC), 600_000_000);
        // Pure function of register state and parent rate.
        assert_eq!(pll.recalc_rate(&io, OSC), 600_000_000);

        // Post divider index 3 divides by 1.
        bus.set(REG, 100 | (3 << 15));
        assert_eq!(pll.recalc_rate(&io, OSC), 1_200_000_000);
    }

    #[test]
    fn arm_odd_divider_rounds_down_half_step() {
        let (bus, mut delay) = FakeBus::with_delay();
        bus.set(REG, 101 | (1 << 15));
        let io = ClockIo::new(&bus, &mut delay);
        let pll = Pll::new(PllKind::Arm(ArmSequence::Direct), REG);

        assert_eq!(pll.recalc_rate(&io, OSC), OSC * 50 / 4);
    }

    #[test]
    fn sys_pll_rates_are_fixed_multiples() {
        let (bus, mut delay) = FakeBus::with_delay();
        let mut io = ClockIo::new(&bus, &mut delay);
        let pll2 = Pll::new(PllKind::Sys2, REG);
        let pll3 = Pll::new(PllKind::Sys3, REG + 0x10);

        assert_eq!(pll2.recalc_rate(&io, OSC), 528_000_000);
        assert_eq!(pll3.recalc_rate(&io, OSC), 480_000_000);

        assert_eq!(pll2.set_rate(&mut io, 528_000_000, OSC), Ok(()));
        assert_eq!(
            pll2.set_rate(&mut io, 500_000_000, OSC),
            Err(ErrorCode::UnsupportedRate)
        );
        assert_eq!(pll2.round_rate(&io, 500_000_000, OSC), 528_000_000);
        assert_eq!(bus.write_count(), 0);
    }

    #[test]
    fn pll1_rate_ignores_parent() {
        let (bus, mut delay) = FakeBus::with_delay();
        bus.set(REG, 0xffff_ffff);
        let io = ClockIo::new(&bus, &mut delay);
        let pll = Pll::new(PllKind::Pll1, REG);

        for parent in [1, OSC, 999] {
            assert_eq!(pll.recalc_rate(&io, parent), 1_000_000_000);
        }
    }

    #[test]
    fn prepare_runs_power_sequence() {
        let kind = PllKind::Sys2;
        let (bus, mut delay) = FakeBus::with_delay();
        bus.add_pll_lock(REG, powerup_mask(kind), STABLE, Some(200));
        let mut io = ClockIo::new(&bus, &mut delay);
        let pll = Pll::new(kind, REG);

        assert!(!pll.is_prepared(&io));
        assert_eq!(pll.prepare(&mut io), Ok(()));
        assert!(pll.is_prepared(&io));

        let writes = bus.writes();
        assert_eq!(writes.len(), 3);
        // Gated with the enable bit low before powerup.
        assert_eq!(writes[0].1 & GATE, GATE);
        assert_eq!(writes[0].1 & (1 << 13), 0);
        // Powerup and ring hold together, then ring hold released.
        assert_eq!(writes[1].1 & ((1 << 23) | (1 << 11)), (1 << 23) | (1 << 11));
        assert_eq!(writes[2].1 & (1 << 11), 0);
        assert_eq!(writes[2].1 & (1 << 23), 1 << 23);

        // Settle delay, half the lock time, then polling.
        assert!(bus.now_us() >= 30 + 250);
        assert!(bus.now_us() <= 30 + 250 + 500 + 10);
    }

    #[test]
    fn prepare_twice_is_idempotent() {
        let kind = PllKind::Arm(ArmSequence::RingHold);
        let (bus, mut delay) = FakeBus::with_delay();
        bus.add_pll_lock(REG, powerup_mask(kind), STABLE, Some(40));
        let mut io = ClockIo::new(&bus, &mut delay);
        let pll = Pll::new(kind, REG);

        assert_eq!(pll.prepare(&mut io), Ok(()));
        bus.clear_log();
        let before = bus.now_us();

        assert_eq!(pll.prepare(&mut io), Ok(()));
        assert_eq!(bus.write_count(), 0);
        assert_eq!(bus.now_us(), before);
    }

    #[test]
    fn prepare_times_out_without_lock() {
        let kind = PllKind::Sys3;
        let (bus, mut delay) = FakeBus::with_delay();
        bus.add_pll_lock(REG, powerup_mask(kind), STABLE, None);
        let mut io = ClockIo::new(&bus, &mut delay);
        let pll = Pll::new(kind, REG);

        assert_eq!(pll.prepare(&mut io), Err(ErrorCode::Timeout));
        assert!(!pll.is_prepared(&io));
        // Hardware is left powered up; no rollback.
        assert_eq!(bus.get(REG) & (1 << 21), 1 << 21);
    }

    #[test]
    fn enable_requires_powerup() {
        let kind = PllKind::Sys3;
        let (bus, mut delay) = FakeBus::with_delay();
        bus.add_pll_lock(REG, powerup_mask(kind), STABLE, Some(20));
        let mut io = ClockIo::new(&bus, &mut delay);
        let pll = Pll::new(kind, REG);

        assert_eq!(pll.enable(&mut io), Err(ErrorCode::InvalidState));
        assert_eq!(bus.write_count(), 0);

        pll.prepare(&mut io).unwrap();
        assert!(!pll.is_enabled(&io));
        assert_eq!(pll.enable(&mut io), Ok(()));
        assert!(pll.is_enabled(&io));

        let ctrl = bus.get(REG);
        assert_eq!(ctrl & GATE, 0);
        assert_eq!(ctrl & (1 << 13), 1 << 13);

        assert_eq!(pll.disable(&mut io), Ok(()));
        assert!(!pll.is_enabled(&io));
        // Disabling does not power down.
        assert!(pll.is_prepared(&io));

        pll.unprepare(&mut io);
        assert!(!pll.is_prepared(&io));
        assert_eq!(bus.get(REG) & ((1 << 21) | (1 << 13) | STABLE), 0);
    }

    #[test]
    fn pll1_enables_without_powerup() {
        let (bus, mut delay) = FakeBus::with_delay();
        bus.set(REG, 1 << 14);
        let mut io = ClockIo::new(&bus, &mut delay);
        let pll = Pll::new(PllKind::Pll1, REG);

        assert!(pll.is_prepared(&io));
        assert_eq!(pll.prepare(&mut io), Ok(()));
        assert_eq!(bus.write_count(), 0);

        assert!(!pll.is_enabled(&io));
        assert_eq!(pll.enable(&mut io), Ok(()));
        assert!(pll.is_enabled(&io));
        assert_eq!(bus.get(REG), 1 << 13);

        pll.disable(&mut io).unwrap();
        assert_eq!(bus.get(REG), 1 << 14);
    }

    #[test]
    fn direct_arm_sequence_sets_enable_after_lock() {
        let kind = PllKind::Arm(ArmSequence::Direct);
        let (bus, mut delay) = FakeBus::with_delay();
        bus.add_pll_lock(REG, powerup_mask(kind), STABLE, Some(20));
        let mut io = ClockIo::new(&bus, &mut delay);
        let pll = Pll::new(kind, REG);

        assert_eq!(pll.prepare(&mut io), Ok(()));
        let writes = bus.writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].1 & (1 << 14), 0);
        assert_eq!(writes[1].1 & (1 << 14), 1 << 14);
        assert!(pll.is_enabled(&io));

        // Already enabled: nothing to do.
        bus.clear_log();
        assert_eq!(pll.prepare(&mut io), Ok(()));
        assert_eq!(bus.write_count(), 0);

        pll.unprepare(&mut io);
        assert_eq!(bus.get(REG) & ((1 << 13) | (1 << 14)), 0);
        assert_eq!(bus.get(REG) & (1 << 30), 0);
    }

    #[test]
    fn direct_arm_sequence_timeout_leaves_output_off() {
        let kind = PllKind::Arm(ArmSequence::Direct);
        let (bus, mut delay) = FakeBus::with_delay();
        bus.add_pll_lock(REG, powerup_mask(kind), STABLE, None);
        let mut io = ClockIo::new(&bus, &mut delay);
        let pll = Pll::new(kind, REG);

        assert_eq!(pll.prepare(&mut io), Err(ErrorCode::Timeout));
        // Powered up, but the output was never enabled.
        assert_eq!(bus.write_count(), 1);
        assert_eq!(bus.get(REG) & (1 << 13), 1 << 13);
        assert_eq!(bus.get(REG) & (1 << 14), 0);
        assert!(!pll.is_enabled(&io));
        assert!(bus.now_us() >= 50);
    }

    #[test]
    fn layouts_use_distinct_powerup_bits() {
        assert_eq!(
            PllKind::Sys2.layout().powerup.unwrap().shift,
            PLL_CTRL::SYS2_POWERUP.shift
        );
        assert_eq!(PllKind::Sys3.layout().powerup.unwrap().shift, 21);
        assert!(PllKind::Pll1.layout().powerup.is_none());
        assert_eq!(PllKind::Pll1.layout().gate.unwrap().shift, 14);
    }
}
