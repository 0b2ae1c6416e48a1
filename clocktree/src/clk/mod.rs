// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Clock node types.
//!
//! Every node of a clock tree is a [`Clock`]: the configuration shared by all
//! node kinds (name, parents, flags) plus a [`ClockHw`] carrying the
//! kind-specific register layout. Nodes are immutable once built; all mutable
//! state lives in the hardware registers and in the reference counts held by
//! the tree.

pub mod composite;
pub mod fixed;
pub mod gate;
pub mod pfd;
pub mod pll;

use bitflags::bitflags;

use crate::hil::clock::{ClockId, ClockMux, ClockNode};
use crate::utilities::registers::ClockIo;
use crate::ErrorCode;

pub use self::composite::CompositeRoot;
pub use self::fixed::{FixedFactor, FixedRate, OutputGate};
pub use self::gate::Gate;
pub use self::pfd::Pfd;
pub use self::pll::{ArmSequence, Pll, PllKind};

/// Maximum number of selectable parents of a node.
pub const MAX_PARENTS: usize = 8;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ClockFlags: u32 {
        /// The clock must never be turned off.
        const CRITICAL = 1 << 0;
    }
}

/// Kind-specific part of a clock node.
pub enum ClockHw {
    FixedRate(FixedRate),
    FixedFactor(FixedFactor),
    Pll(Pll),
    Pfd(Pfd),
    Root(CompositeRoot),
    Gate(Gate),
}

impl ClockHw {
    fn node(&self) -> &dyn ClockNode {
        match self {
            ClockHw::FixedRate(n) => n,
            ClockHw::FixedFactor(n) => n,
            ClockHw::Pll(n) => n,
            ClockHw::Pfd(n) => n,
            ClockHw::Root(n) => n,
            ClockHw::Gate(n) => n,
        }
    }

    /// The parent selector, for nodes that have one.
    pub fn as_mux(&self) -> Option<&dyn ClockMux> {
        match self {
            ClockHw::Root(n) => Some(n),
            _ => None,
        }
    }
}

impl ClockNode for ClockHw {
    fn prepare(&self, io: &mut ClockIo<'_>) -> Result<(), ErrorCode> {
        self.node().prepare(io)
    }

    fn unprepare(&self, io: &mut ClockIo<'_>) {
        self.node().unprepare(io);
    }

    fn is_prepared(&self, io: &ClockIo<'_>) -> bool {
        self.node().is_prepared(io)
    }

    fn enable(&self, io: &mut ClockIo<'_>) -> Result<(), ErrorCode> {
        self.node().enable(io)
    }

    fn disable(&self, io: &mut ClockIo<'_>) -> Result<(), ErrorCode> {
        self.node().disable(io)
    }

    fn is_enabled(&self, io: &ClockIo<'_>) -> bool {
        self.node().is_enabled(io)
    }

    fn recalc_rate(&self, io: &ClockIo<'_>, parent_rate: u64) -> u64 {
        self.node().recalc_rate(io, parent_rate)
    }

    fn round_rate(&self, io: &ClockIo<'_>, rate: u64, parent_rate: u64) -> u64 {
        self.node().round_rate(io, rate, parent_rate)
    }

    fn set_rate(&self, io: &mut ClockIo<'_>, rate: u64, parent_rate: u64) -> Result<(), ErrorCode> {
        self.node().set_rate(io, rate, parent_rate)
    }
}

pub struct Clock {
    name: &'static str,
    parents: heapless::Vec<ClockId, MAX_PARENTS>,
    flags: ClockFlags,
    hw: ClockHw,
}

impl Clock {
    pub fn new(
        name: &'static str,
        parents: heapless::Vec<ClockId, MAX_PARENTS>,
        flags: ClockFlags,
        hw: ClockHw,
    ) -> Clock {
        Clock {
            name,
            parents,
            flags,
            hw,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// All possible parents, in selector order.
    pub fn parents(&self) -> &[ClockId] {
        &self.parents
    }

    pub fn flags(&self) -> ClockFlags {
        self.flags
    }

    pub fn is_critical(&self) -> bool {
        self.flags.contains(ClockFlags::CRITICAL)
    }

    pub fn hw(&self) -> &ClockHw {
        &self.hw
    }

    /// The parent currently feeding this clock. For a mux this is read from
    /// the hardware, and is `None` if the selector holds an index the tree
    /// does not model.
    pub fn current_parent(&self, io: &ClockIo<'_>) -> Option<ClockId> {
        match self.hw.as_mux() {
            Some(mux) => self.parents.get(mux.parent_index(io)).copied(),
            None => self.parents.first().copied(),
        }
    }
}
