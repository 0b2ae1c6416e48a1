// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Anatop clocks: the system PLLs, their PFDs and their divided outputs.

use clocktree::clk::{ArmSequence, ClockFlags, PllKind};
use clocktree::topology::{ClockDesc, ClockKind, RegRef};

use crate::ids;

/// ARM PLL control register.
pub const PLL_ARM_CTRL: usize = 0x200;
/// System PLL 3 control register. Bit 3 gates the divide-by-2 output.
pub const PLL3_CTRL: usize = 0x210;
pub const PLL3_PFD: usize = 0x230;
/// System PLL 2 control register.
pub const PLL2_CTRL: usize = 0x240;
pub const PLL2_PFD: usize = 0x270;
/// System PLL 1 control register. Bits 25 and 26 gate the divide-by-2 and
/// divide-by-5 outputs.
pub const PLL1_CTRL: usize = 0x2c0;

const fn pll(id: usize, name: &'static str, kind: PllKind, offset: usize) -> ClockDesc {
    ClockDesc {
        id,
        name,
        parents: &["osc"],
        kind: ClockKind::Pll {
            kind,
            reg: RegRef::anatop(offset),
        },
        flags: ClockFlags::empty(),
    }
}

const fn pfd(
    id: usize,
    name: &'static str,
    parents: &'static [&'static str],
    offset: usize,
    index: u8,
) -> ClockDesc {
    ClockDesc {
        id,
        name,
        parents,
        kind: ClockKind::Pfd {
            reg: RegRef::anatop(offset),
            index,
        },
        flags: ClockFlags::empty(),
    }
}

const fn div_out(
    id: usize,
    name: &'static str,
    parents: &'static [&'static str],
    offset: usize,
    div: u32,
    bit: u8,
) -> ClockDesc {
    ClockDesc {
        id,
        name,
        parents,
        kind: ClockKind::PllOutput {
            reg: RegRef::anatop(offset),
            bit,
            mult: 1,
            div,
        },
        flags: ClockFlags::empty(),
    }
}

pub const CLOCKS: &[ClockDesc] = &[
    pll(ids::PLL_ARM, "pll_arm", PllKind::Arm(ArmSequence::RingHold), PLL_ARM_CTRL),
    pll(ids::PLL3, "pll3_sys", PllKind::Sys3, PLL3_CTRL),
    pll(ids::PLL2, "pll2_sys", PllKind::Sys2, PLL2_CTRL),
    pll(ids::PLL1, "pll1_sys", PllKind::Pll1, PLL1_CTRL),
    pfd(ids::PLL3_PFD0, "pll3_pfd0", &["pll3_sys"], PLL3_PFD, 0),
    pfd(ids::PLL3_PFD1, "pll3_pfd1", &["pll3_sys"], PLL3_PFD, 1),
    pfd(ids::PLL3_PFD2, "pll3_pfd2", &["pll3_sys"], PLL3_PFD, 2),
    pfd(ids::PLL3_PFD3, "pll3_pfd3", &["pll3_sys"], PLL3_PFD, 3),
    pfd(ids::PLL2_PFD0, "pll2_pfd0", &["pll2_sys"], PLL2_PFD, 0),
    pfd(ids::PLL2_PFD1, "pll2_pfd1", &["pll2_sys"], PLL2_PFD, 1),
    pfd(ids::PLL2_PFD2, "pll2_pfd2", &["pll2_sys"], PLL2_PFD, 2),
    pfd(ids::PLL2_PFD3, "pll2_pfd3", &["pll2_sys"], PLL2_PFD, 3),
    div_out(ids::PLL3_DIV2, "pll3_div2", &["pll3_sys"], PLL3_CTRL, 2, 3),
    div_out(ids::PLL1_DIV2, "pll1_div2", &["pll1_sys"], PLL1_CTRL, 2, 25),
    div_out(ids::PLL1_DIV5, "pll1_div5", &["pll1_sys"], PLL1_CTRL, 5, 26),
];
