// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Static description of a clock tree.
//!
//! A chip describes its clocks as ordered stages of [`ClockDesc`] entries.
//! Parents are named, not numbered, and must appear in an earlier entry. The
//! registry turns the names into identifiers when the tree is built.
//!
//! Register locations are given as an offset into one of two register blocks
//! so that the tables are plain `const` data, independent of where the blocks
//! are mapped.

use crate::clk::{
    Clock, ClockFlags, ClockHw, CompositeRoot, FixedFactor, FixedRate, Gate, OutputGate, Pfd, Pll,
    PllKind, MAX_PARENTS,
};
use crate::hil::clock::ClockId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegBlock {
    /// Clock controller module: clock roots and gates.
    Ccm,
    /// Analog block: PLLs and PFDs.
    Anatop,
}

/// Base addresses of the register blocks.
#[derive(Clone, Copy, Debug)]
pub struct Bases {
    pub ccm: usize,
    pub anatop: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegRef {
    pub block: RegBlock,
    pub offset: usize,
}

impl RegRef {
    pub const fn ccm(offset: usize) -> RegRef {
        RegRef {
            block: RegBlock::Ccm,
            offset,
        }
    }

    pub const fn anatop(offset: usize) -> RegRef {
        RegRef {
            block: RegBlock::Anatop,
            offset,
        }
    }

    pub fn resolve(&self, bases: &Bases) -> usize {
        let base = match self.block {
            RegBlock::Ccm => bases.ccm,
            RegBlock::Anatop => bases.anatop,
        };
        base + self.offset
    }
}

#[derive(Clone, Copy, Debug)]
pub enum ClockKind {
    FixedRate { rate: u64 },
    FixedFactor { mult: u32, div: u32 },
    /// Fixed factor behind a gate bit of a PLL control register.
    PllOutput { reg: RegRef, bit: u8, mult: u32, div: u32 },
    Pll { kind: PllKind, reg: RegRef },
    Pfd { reg: RegRef, index: u8 },
    Root { reg: RegRef },
    Gate { reg: RegRef, bit: u8 },
}

impl ClockKind {
    /// Inclusive bounds on the number of parents a node of this kind takes.
    pub fn parent_range(&self) -> (usize, usize) {
        match self {
            ClockKind::FixedRate { .. } => (0, 0),
            ClockKind::Root { .. } => (1, MAX_PARENTS),
            _ => (1, 1),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ClockDesc {
    pub id: ClockId,
    pub name: &'static str,
    pub parents: &'static [&'static str],
    pub kind: ClockKind,
    pub flags: ClockFlags,
}

impl ClockDesc {
    /// Create the node, with parent names already resolved to `parents`.
    pub fn instantiate(&self, bases: &Bases, parents: heapless::Vec<ClockId, MAX_PARENTS>) -> Clock {
        let critical = self.flags.contains(ClockFlags::CRITICAL);
        let hw = match self.kind {
            ClockKind::FixedRate { rate } => ClockHw::FixedRate(FixedRate::new(rate)),
            ClockKind::FixedFactor { mult, div } => {
                ClockHw::FixedFactor(FixedFactor::new(mult, div))
            }
            ClockKind::PllOutput { reg, bit, mult, div } => ClockHw::FixedFactor(
                FixedFactor::gated(
                    mult,
                    div,
                    OutputGate {
                        reg: reg.resolve(bases),
                        bit,
                    },
                ),
            ),
            ClockKind::Pll { kind, reg } => ClockHw::Pll(Pll::new(kind, reg.resolve(bases))),
            ClockKind::Pfd { reg, index } => ClockHw::Pfd(Pfd::new(reg.resolve(bases), index)),
            ClockKind::Root { reg } => ClockHw::Root(CompositeRoot::new(
                reg.resolve(bases),
                parents.len(),
                critical,
            )),
            ClockKind::Gate { reg, bit } => {
                ClockHw::Gate(Gate::new(reg.resolve(bases), bit, critical))
            }
        };
        Clock::new(self.name, parents, self.flags, hw)
    }
}

/// A complete clock tree description.
pub struct Topology {
    /// Number of identifiers, `0..clock_count`. Every identifier must be
    /// populated by exactly one entry.
    pub clock_count: usize,
    /// Entries, registered in order.
    pub stages: &'static [&'static [ClockDesc]],
}
