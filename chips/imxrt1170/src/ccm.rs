// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Clock Controller Module: clock roots, low power clock gates (LPCG) and
//! clock group control.
//!
//! Every clock root selects one of eight inputs. The first four are the same
//! for all roots.

use clocktree::clk::ClockFlags;
use clocktree::topology::{Bases, ClockDesc, ClockKind, RegRef};
use clocktree::utilities::registers::ClockIo;
use tock_registers::{register_bitfields, LocalRegisterCopy};

use crate::ids;

register_bitfields![u32,
    CLOCK_GROUP_CONTROL [
        /// Divide the group clock by DIV0 + 1
        DIV0 OFFSET(0) NUMBITS(4) [],
        RSTDIV OFFSET(16) NUMBITS(8) [],
        OFF OFFSET(24) NUMBITS(1) []
    ]
];

/// Clock root `n` control register.
pub const fn clock_root(n: usize) -> usize {
    n * 0x80
}

/// LPCG `n` direct control register.
pub const fn lpcg(n: usize) -> usize {
    0x6000 + n * 0x20
}

/// Clock group `n` control register.
pub const fn clock_group(n: usize) -> usize {
    0x4000 + n * 0x80
}

const M7_SELS: &[&str] = &[
    "rcosc48M_div2", "osc", "rcosc400M", "rcosc16M",
    "pll_arm", "pll1_sys", "pll3_sys", "video_pll",
];
const BUS_SELS: &[&str] = &[
    "rcosc48M_div2", "osc", "rcosc400M", "rcosc16M",
    "pll3_sys", "pll1_div5", "pll2_sys", "pll2_pfd3",
];
const BUS_LPSR_SELS: &[&str] = &[
    "rcosc48M_div2", "osc", "rcosc400M", "rcosc16M",
    "pll3_pfd3", "pll3_sys", "pll2_sys", "pll1_div5",
];
const LPUART1_SELS: &[&str] = &[
    "rcosc48M_div2", "osc", "rcosc400M", "rcosc16M",
    "pll3_div2", "pll1_div5", "pll2_sys", "pll2_pfd3",
];
const GPT1_SELS: &[&str] = &[
    "rcosc48M_div2", "osc", "rcosc400M", "rcosc16M",
    "pll3_div2", "pll1_div5", "pll3_pfd2", "pll3_pfd3",
];
const USDHC1_SELS: &[&str] = &[
    "rcosc48M_div2", "osc", "rcosc400M", "rcosc16M",
    "pll2_pfd2", "pll2_pfd0", "pll1_div5", "pll_arm",
];
const SEMC_SELS: &[&str] = &[
    "rcosc48M_div2", "osc", "rcosc400M", "rcosc16M",
    "pll1_div5", "pll2_sys", "pll2_pfd1", "pll3_pfd0",
];
const ENET1_SELS: &[&str] = &[
    "rcosc48M_div2", "osc", "rcosc400M", "rcosc16M",
    "pll1_div2", "audio_pll", "pll1_div5", "pll2_pfd1",
];
const LPI2C1_4_SELS: &[&str] = &[
    "rcosc48M_div2", "osc", "rcosc400M", "rcosc16M",
    "pll3_div2", "pll1_div5", "pll2_sys", "pll2_pfd3",
];
const LPI2C5_6_SELS: &[&str] = &[
    "rcosc48M_div2", "osc", "rcosc400M", "rcosc16M",
    "pll3_pfd3", "pll3_sys", "pll2_pfd3", "pll1_div5",
];
const ELCDIF_SELS: &[&str] = &[
    "rcosc48M_div2", "osc", "rcosc400M", "rcosc16M",
    "pll2_sys", "pll2_pfd2", "pll3_pfd0", "video_pll",
];
const MIPI_DSI_SELS: &[&str] = &[
    "rcosc48M_div2", "osc", "rcosc400M", "rcosc16M",
    "pll2_sys", "pll2_pfd0", "pll3_pfd0", "video_pll",
];

const fn root(
    id: usize,
    name: &'static str,
    parents: &'static [&'static str],
    n: usize,
    flags: ClockFlags,
) -> ClockDesc {
    ClockDesc {
        id,
        name,
        parents,
        kind: ClockKind::Root {
            reg: RegRef::ccm(clock_root(n)),
        },
        flags,
    }
}

const fn gate(
    id: usize,
    name: &'static str,
    parents: &'static [&'static str],
    n: usize,
    flags: ClockFlags,
) -> ClockDesc {
    ClockDesc {
        id,
        name,
        parents,
        kind: ClockKind::Gate {
            reg: RegRef::ccm(lpcg(n)),
            bit: 0,
        },
        flags,
    }
}

const NONE: ClockFlags = ClockFlags::empty();
const CRITICAL: ClockFlags = ClockFlags::CRITICAL;

pub const ROOTS: &[ClockDesc] = &[
    root(ids::ROOT_M7, "m7_root", M7_SELS, 0, CRITICAL),
    root(ids::ROOT_BUS, "bus_root", BUS_SELS, 2, CRITICAL),
    root(ids::ROOT_BUS_LPSR, "bus_lpsr_root", BUS_LPSR_SELS, 3, CRITICAL),
    root(ids::ROOT_SEMC, "semc_root", SEMC_SELS, 4, CRITICAL),
    root(ids::ROOT_GPT1, "gpt1_root", GPT1_SELS, 14, NONE),
    root(ids::ROOT_LPUART1, "lpuart1_root", LPUART1_SELS, 25, NONE),
    root(ids::ROOT_LPI2C1, "lpi2c1_root", LPI2C1_4_SELS, 37, NONE),
    root(ids::ROOT_LPI2C2, "lpi2c2_root", LPI2C1_4_SELS, 38, NONE),
    root(ids::ROOT_LPI2C3, "lpi2c3_root", LPI2C1_4_SELS, 39, NONE),
    root(ids::ROOT_LPI2C4, "lpi2c4_root", LPI2C1_4_SELS, 40, NONE),
    root(ids::ROOT_LPI2C5, "lpi2c5_root", LPI2C5_6_SELS, 41, NONE),
    root(ids::ROOT_LPI2C6, "lpi2c6_root", LPI2C5_6_SELS, 42, NONE),
    root(ids::ROOT_ENET1, "enet1_root", ENET1_SELS, 51, NONE),
    root(ids::ROOT_USDHC1, "usdhc1_root", USDHC1_SELS, 58, NONE),
    root(ids::ROOT_ELCDIF, "elcdif_root", ELCDIF_SELS, 69, NONE),
    root(ids::ROOT_MIPI_REF, "mipi_ref_root", MIPI_DSI_SELS, 71, NONE),
    root(ids::ROOT_MIPI_ESC, "mipi_esc_root", MIPI_DSI_SELS, 72, NONE),
];

pub const GATES: &[ClockDesc] = &[
    gate(ids::M7, "m7", &["m7_root"], 0, CRITICAL),
    gate(ids::EDMA, "edma", &["bus_root"], 20, NONE),
    gate(ids::SEMC, "semc", &["semc_root"], 33, CRITICAL),
    gate(ids::GPT1, "gpt1", &["gpt1_root"], 64, NONE),
    gate(ids::LPUART1, "lpuart1", &["lpuart1_root"], 86, NONE),
    gate(ids::LPI2C1, "lpi2c1", &["lpi2c1_root"], 98, NONE),
    gate(ids::LPI2C2, "lpi2c2", &["lpi2c2_root"], 99, NONE),
    gate(ids::LPI2C3, "lpi2c3", &["lpi2c3_root"], 100, NONE),
    gate(ids::LPI2C4, "lpi2c4", &["lpi2c4_root"], 101, NONE),
    gate(ids::LPI2C5, "lpi2c5", &["lpi2c5_root"], 102, NONE),
    gate(ids::LPI2C6, "lpi2c6", &["lpi2c6_root"], 103, NONE),
    gate(ids::ENET1, "enet1", &["enet1_root"], 112, NONE),
    gate(ids::USB, "usb", &["bus_root"], 115, NONE),
    gate(ids::USDHC1, "usdhc1", &["usdhc1_root"], 117, NONE),
    gate(ids::ELCDIF, "elcdif", &["elcdif_root"], 129, NONE),
    gate(ids::MIPI_DSI, "mipi_dsi", &["mipi_ref_root"], 131, NONE),
];

/// Clock group 1 feeds the MIPI DSI escape clock. It is divided by two and
/// exposed as `mipi_tx_esc`.
pub const GROUP_CLOCKS: &[ClockDesc] = &[ClockDesc {
    id: ids::MIPI_DSI_TX_ESC,
    name: "mipi_tx_esc",
    parents: &["mipi_esc_root"],
    kind: ClockKind::FixedFactor { mult: 1, div: 2 },
    flags: NONE,
}];

/// Program clock group 1 to the divider `mipi_tx_esc` assumes.
pub fn set_mipi_esc_group_divider(io: &mut ClockIo<'_>, bases: &Bases) {
    let mut ctrl: LocalRegisterCopy<u32, CLOCK_GROUP_CONTROL::Register> = LocalRegisterCopy::new(0);
    ctrl.modify(
        CLOCK_GROUP_CONTROL::DIV0.val(1)
            + CLOCK_GROUP_CONTROL::RSTDIV.val(1)
            + CLOCK_GROUP_CONTROL::OFF::CLEAR,
    );
    io.write(RegRef::ccm(clock_group(1)).resolve(bases), ctrl);
}
