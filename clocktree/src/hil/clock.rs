// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Interfaces for clock nodes and clock providers.
//!
//! A clock node only knows its own registers. It never looks at its parent:
//! the clock tree computes the parent rate and passes it in, and the tree is
//! responsible for enabling parents before children.
//!
//! The prepare/enable split follows the usual convention: `prepare` may block
//! for a long time (PLL lock), `enable` only flips gates.

use crate::utilities::registers::ClockIo;
use crate::ErrorCode;

/// Identifier of a clock in a clock tree. Identifiers are dense and start at
/// zero.
pub type ClockId = usize;

/// Operations every node of the clock tree supports.
pub trait ClockNode {
    /// Bring the node to a state where `enable` can succeed.
    fn prepare(&self, _io: &mut ClockIo<'_>) -> Result<(), ErrorCode> {
        Ok(())
    }

    /// Undo `prepare`. Never waits for the hardware.
    fn unprepare(&self, _io: &mut ClockIo<'_>) {}

    fn is_prepared(&self, _io: &ClockIo<'_>) -> bool {
        true
    }

    fn enable(&self, _io: &mut ClockIo<'_>) -> Result<(), ErrorCode> {
        Ok(())
    }

    fn disable(&self, _io: &mut ClockIo<'_>) -> Result<(), ErrorCode> {
        Ok(())
    }

    /// Whether the hardware currently lets the clock through.
    fn is_enabled(&self, _io: &ClockIo<'_>) -> bool {
        true
    }

    /// Output rate in Hz for the given parent rate.
    ///
    /// This must only depend on the current register contents and on
    /// `parent_rate`.
    fn recalc_rate(&self, io: &ClockIo<'_>, parent_rate: u64) -> u64;

    /// The rate `set_rate(rate)` would produce.
    fn round_rate(&self, io: &ClockIo<'_>, _rate: u64, parent_rate: u64) -> u64 {
        self.recalc_rate(io, parent_rate)
    }

    /// Reprogram the node for `rate`.
    ///
    /// Nodes without an adjustable rate accept exactly their current rate and
    /// refuse anything else with `UnsupportedRate`.
    fn set_rate(&self, io: &mut ClockIo<'_>, rate: u64, parent_rate: u64) -> Result<(), ErrorCode> {
        if rate == self.recalc_rate(io, parent_rate) {
            Ok(())
        } else {
            Err(ErrorCode::UnsupportedRate)
        }
    }
}

/// Nodes that select their input among several parents.
pub trait ClockMux {
    /// Index of the selected parent, as read from the hardware. The value may
    /// be out of range if the hardware holds a selection the tree does not
    /// model.
    fn parent_index(&self, io: &ClockIo<'_>) -> usize;

    /// Select parent `index`. Fails with `InvalidArgument` if the mux has no
    /// input `index`.
    fn set_parent_index(&self, io: &mut ClockIo<'_>, index: usize) -> Result<(), ErrorCode>;
}

/// Lookup of clocks by identifier, as used by the consumers of a clock tree.
pub trait ClockProvider {
    type Handle<'a>
    where
        Self: 'a;

    /// Return a handle to clock `id`, or `NotFound`.
    fn lookup(&self, id: ClockId) -> Result<Self::Handle<'_>, ErrorCode>;
}
