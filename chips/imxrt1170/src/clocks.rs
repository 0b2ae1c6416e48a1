// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! The i.MX RT1170 clock tree.
//!
//! The tree is registered in stages: oscillators, Anatop clocks, CCM roots,
//! CCM gates and last the clock group outputs. Each stage only refers to
//! clocks of earlier stages.
//!
//! `video_pll` and `audio_pll` are not driven by this crate. They are
//! registered as 0 Hz sources so that the roots that can select them resolve
//! all of their inputs.
//!
//! Usage
//! -----
//!
//! ```rust,ignore
//! let bus = unsafe { Mmio::new() };
//! let clocks = imxrt1170::clocks::init(bus, delay, &imxrt1170::clocks::BASES)?;
//! clocks.set_parent(ids::ROOT_LPUART1, ids::PLL3_DIV2)?;
//! clocks.prepare_enable(ids::LPUART1)?;
//! ```

use clocktree::clk::ClockFlags;
use clocktree::topology::{Bases, ClockDesc, ClockKind, Topology};
use clocktree::tree::ClockTree;
use clocktree::utilities::registers::RegisterBus;
use clocktree::ErrorCode;
use embedded_hal::delay::DelayNs;
use log::debug;

use crate::ids::{self, CLK_END};
use crate::{anatop, ccm};

/// Register block base addresses of the RT1170.
pub const BASES: Bases = Bases {
    ccm: 0x40CC_0000,
    anatop: 0x40C8_4000,
};

pub const OSC_RATE: u64 = 24_000_000;
pub const RCOSC_16M_RATE: u64 = 16_000_000;

const fn fixed(id: usize, name: &'static str, rate: u64) -> ClockDesc {
    ClockDesc {
        id,
        name,
        parents: &[],
        kind: ClockKind::FixedRate { rate },
        flags: ClockFlags::empty(),
    }
}

const fn factor(
    id: usize,
    name: &'static str,
    parents: &'static [&'static str],
    mult: u32,
    div: u32,
) -> ClockDesc {
    ClockDesc {
        id,
        name,
        parents,
        kind: ClockKind::FixedFactor { mult, div },
        flags: ClockFlags::empty(),
    }
}

const SOURCES: &[ClockDesc] = &[
    fixed(ids::DUMMY, "dummy", 0),
    fixed(ids::OSC, "osc", OSC_RATE),
    fixed(ids::RCOSC_16M, "rcosc16M", RCOSC_16M_RATE),
    factor(ids::RCOSC_48M, "rcosc48M", &["rcosc16M"], 3, 1),
    factor(ids::RCOSC_400M, "rcosc400M", &["rcosc16M"], 25, 1),
    factor(ids::RCOSC_48M_DIV2, "rcosc48M_div2", &["rcosc48M"], 1, 2),
    fixed(ids::VIDEO_PLL, "video_pll", 0),
    fixed(ids::AUDIO_PLL, "audio_pll", 0),
];

pub const TOPOLOGY: Topology = Topology {
    clock_count: CLK_END,
    stages: &[
        SOURCES,
        anatop::CLOCKS,
        ccm::ROOTS,
        ccm::GATES,
        ccm::GROUP_CLOCKS,
    ],
};

pub type Clocks<B, D> = ClockTree<B, D, CLK_END>;

/// Build the clock tree, program the fixed clock group dividers and keep the
/// critical clocks running.
///
/// # Errors
///
/// Any build error of [`ClockTree::build`], or the error of preparing or
/// enabling a critical clock.
pub fn init<B: RegisterBus, D: DelayNs>(
    bus: B,
    delay: D,
    bases: &Bases,
) -> Result<Clocks<B, D>, ErrorCode> {
    let clocks = ClockTree::build(bus, delay, bases, &TOPOLOGY)?;
    debug!("imxrt1170: {} clocks registered", clocks.len());

    clocks.with_io(|io| ccm::set_mipi_esc_group_divider(io, bases));
    clocks.protect_critical()?;
    Ok(clocks)
}

#[cfg(test)]
mod tests {
    use super::{init, Clocks, BASES, TOPOLOGY};
    use crate::anatop;
    use crate::ccm::{clock_group, clock_root, lpcg};
    use crate::ids;
    use clocktree::testing::{FakeBus, FakeDelay};
    use clocktree::ErrorCode;

    const STABLE: u32 = 1 << 29;

    fn anatop(offset: usize) -> usize {
        BASES.anatop + offset
    }

    fn ccm(offset: usize) -> usize {
        BASES.ccm + offset
    }

    fn bus() -> (FakeBus, FakeDelay) {
        let (bus, delay) = FakeBus::with_delay();
        bus.add_pll_lock(anatop(anatop::PLL_ARM_CTRL), 1 << 13, STABLE, Some(40));
        bus.add_pll_lock(anatop(anatop::PLL3_CTRL), 1 << 21, STABLE, Some(40));
        bus.add_pll_lock(anatop(anatop::PLL2_CTRL), 1 << 23, STABLE, Some(300));
        bus.add_set_clr_alias(anatop(anatop::PLL2_PFD));
        bus.add_set_clr_alias(anatop(anatop::PLL3_PFD));
        (bus, delay)
    }

    fn clocks(bus: &FakeBus, delay: FakeDelay) -> Clocks<&FakeBus, FakeDelay> {
        init(bus, delay, &BASES).unwrap()
    }

    #[test]
    fn every_identifier_is_named() {
        let (bus, delay) = bus();
        let clocks = clocks(&bus, delay);
        assert_eq!(clocks.len(), ids::CLK_END);

        for desc in TOPOLOGY.stages.iter().flat_map(|s| s.iter()) {
            assert_eq!(clocks.find(desc.name), Ok(desc.id), "{}", desc.name);
        }
        assert_eq!(clocks.find("pll3_div2"), Ok(ids::PLL3_DIV2));
        assert_eq!(clocks.find("hx8394"), Err(ErrorCode::NotFound));
    }

    #[test]
    fn reset_rates() {
        let (bus, delay) = bus();
        let clocks = clocks(&bus, delay);

        assert_eq!(clocks.rate(ids::OSC), Ok(24_000_000));
        assert_eq!(clocks.rate(ids::RCOSC_48M_DIV2), Ok(24_000_000));
        assert_eq!(clocks.rate(ids::RCOSC_400M), Ok(400_000_000));
        assert_eq!(clocks.rate(ids::PLL2), Ok(528_000_000));
        assert_eq!(clocks.rate(ids::PLL3), Ok(480_000_000));
        assert_eq!(clocks.rate(ids::PLL1), Ok(1_000_000_000));
        assert_eq!(clocks.rate(ids::PLL1_DIV5), Ok(200_000_000));
        assert_eq!(clocks.rate(ids::PLL1_DIV2), Ok(500_000_000));
        assert_eq!(clocks.rate(ids::PLL3_DIV2), Ok(240_000_000));
        assert_eq!(clocks.rate(ids::VIDEO_PLL), Ok(0));
        // All muxes at reset select rcosc48M_div2, undivided.
        assert_eq!(clocks.rate(ids::M7), Ok(24_000_000));
        assert_eq!(clocks.rate(ids::MIPI_DSI_TX_ESC), Ok(12_000_000));
    }

    #[test]
    fn init_programs_group_control_and_critical_gates() {
        let (bus, delay) = bus();
        let _clocks = clocks(&bus, delay);

        assert_eq!(bus.get(ccm(clock_group(1))), 0x0001_0001);
        assert_eq!(bus.get(ccm(lpcg(0))), 1);
        assert_eq!(bus.get(ccm(lpcg(33))), 1);
        assert_eq!(bus.get(ccm(lpcg(86))), 0);
    }

    #[test]
    fn critical_gate_cannot_be_disabled() {
        let (bus, delay) = bus();
        let clocks = clocks(&bus, delay);

        assert_eq!(clocks.disable(ids::M7), Err(ErrorCode::PermissionDenied));
        assert_eq!(bus.get(ccm(lpcg(0))), 1);
        assert_eq!(clocks.is_enabled(ids::M7), Ok(true));
    }

    #[test]
    fn lpuart1_from_pll3_div2() {
        let (bus, delay) = bus();
        let clocks = clocks(&bus, delay);

        clocks.set_parent(ids::ROOT_LPUART1, ids::PLL3_DIV2).unwrap();
        clocks.set_rate(ids::ROOT_LPUART1, 80_000_000).unwrap();
        assert_eq!(clocks.round_rate(ids::ROOT_LPUART1, 80_000_000), Ok(80_000_000));
        clocks.prepare_enable(ids::LPUART1).unwrap();

        assert_eq!(clocks.rate(ids::LPUART1), Ok(80_000_000));
        assert_eq!(clocks.is_prepared(ids::PLL3), Ok(true));
        assert_eq!(clocks.is_enabled(ids::PLL3), Ok(true));
        assert_eq!(bus.get(anatop(anatop::PLL3_CTRL)) & (1 << 3), 1 << 3);
        assert_eq!(bus.get(ccm(lpcg(86))), 1);
        assert_eq!(bus.get(ccm(clock_root(25))), (4 << 8) | 2);

        clocks.disable_unprepare(ids::LPUART1).unwrap();
        assert_eq!(bus.get(ccm(lpcg(86))), 0);
        assert_eq!(clocks.is_prepared(ids::PLL3), Ok(false));
    }

    #[test]
    fn m7_moves_to_arm_pll() {
        let (bus, delay) = bus();
        // 24 MHz * 100 / 2 / 2
        bus.set(anatop(anatop::PLL_ARM_CTRL), 100);
        let clocks = clocks(&bus, delay);

        clocks.set_parent(ids::ROOT_M7, ids::PLL_ARM).unwrap();
        assert_eq!(clocks.rate(ids::M7), Ok(600_000_000));
        // The critical root held its references, so they moved with it. The
        // other three critical roots still hold rcosc48M_div2.
        assert_eq!(clocks.is_enabled(ids::PLL_ARM), Ok(true));
        assert_eq!(clocks.enable_count(ids::RCOSC_48M_DIV2), Ok(3));
        assert_eq!(clocks.parent(ids::M7), Ok(Some(ids::ROOT_M7)));
    }

    #[test]
    fn m7_root_keeps_arm_pll_running() {
        let (bus, delay) = bus();
        bus.set(anatop(anatop::PLL_ARM_CTRL), 100);
        let clocks = clocks(&bus, delay);
        clocks.set_parent(ids::ROOT_M7, ids::PLL_ARM).unwrap();

        // The m7 gate keeps one reference, the protection the other.
        assert_eq!(clocks.disable(ids::ROOT_M7), Ok(()));
        assert_eq!(clocks.disable(ids::ROOT_M7), Err(ErrorCode::PermissionDenied));
        assert_eq!(clocks.enable_count(ids::ROOT_M7), Ok(1));
        assert_eq!(clocks.is_enabled(ids::ROOT_M7), Ok(true));
        assert_eq!(clocks.is_enabled(ids::PLL_ARM), Ok(true));
        assert_eq!(clocks.rate(ids::M7), Ok(600_000_000));
    }

    #[test]
    fn pfd_rate_is_programmable() {
        let (bus, delay) = bus();
        let clocks = clocks(&bus, delay);

        assert_eq!(clocks.rate(ids::PLL2_PFD2), Ok(0));
        clocks.set_rate(ids::PLL2_PFD2, 396_000_000).unwrap();
        assert_eq!(clocks.rate(ids::PLL2_PFD2), Ok(396_000_000));

        clocks.set_parent(ids::ROOT_USDHC1, ids::PLL2_PFD2).unwrap();
        clocks.set_rate(ids::ROOT_USDHC1, 198_000_000).unwrap();
        assert_eq!(clocks.rate(ids::USDHC1), Ok(198_000_000));
    }
}
