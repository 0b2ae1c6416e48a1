// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! The clock tree: an arena of [`Clock`] nodes indexed by [`ClockId`].
//!
//! Building
//! --------
//!
//! [`TreeBuilder::populate`] registers the entries of a [`Topology`] in
//! order. Parent names are resolved against the nodes registered so far, so a
//! forward or self reference fails with `UnresolvedParent` and the graph is
//! acyclic by construction. Any error releases every node registered so far,
//! newest first, and leaves the builder empty.
//!
//! Runtime
//! -------
//!
//! A [`ClockTree`] keeps a prepare count and an enable count per node. The
//! first `prepare` of a node prepares its current parent and then the node
//! itself; the last `unprepare` does the reverse. `enable`/`disable` work the
//! same way and require the node to be prepared. Rates are never cached: every
//! [`ClockTree::rate`] walks up to the root and reads the hardware.
//!
//! One lock covers the reference counts and every register sequence, so
//! operations on different clocks never interleave.
//!
//! Usage
//! -----
//!
//! ```rust,ignore
//! let tree: ClockTree<Mmio, Delay, CLK_END> =
//!     ClockTree::build(bus, delay, &bases, &TOPOLOGY)?;
//! tree.prepare_enable(LPUART1_GATE)?;
//! let rate = tree.rate(LPUART1_GATE)?;
//! ```

use embedded_hal::delay::DelayNs;
use log::{debug, warn};
use spin::Mutex;

use crate::clk::{Clock, MAX_PARENTS};
use crate::config::CONFIG;
use crate::hil::clock::{ClockId, ClockNode, ClockProvider};
use crate::topology::{Bases, ClockDesc, Topology};
use crate::utilities::registers::{ClockIo, RegisterBus};
use crate::ErrorCode;

#[derive(Clone, Copy, Debug, Default)]
struct Counts {
    prepare: u32,
    enable: u32,
}

/// Registers the nodes of a topology into an arena of `N` slots.
pub struct TreeBuilder<const N: usize> {
    nodes: [Option<Clock>; N],
    order: heapless::Vec<ClockId, N>,
    clock_count: usize,
}

impl<const N: usize> TreeBuilder<N> {
    pub fn new() -> TreeBuilder<N> {
        TreeBuilder {
            nodes: core::array::from_fn(|_| None),
            order: heapless::Vec::new(),
            clock_count: 0,
        }
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Register every entry of `topology`, then check that all of its
    /// identifiers were populated.
    ///
    /// # Errors
    ///
    /// * `AllocationFailure` if the topology declares more than `N` clocks.
    /// * `InvalidArgument` for an identifier outside the topology or a wrong
    ///   number of parents.
    /// * `DuplicateClock` for an identifier or a name used twice.
    /// * `UnresolvedParent` for a parent not registered earlier.
    /// * `NullNode` for a declared identifier no entry populated.
    ///
    /// On error nothing stays registered.
    pub fn populate(&mut self, bases: &Bases, topology: &Topology) -> Result<(), ErrorCode> {
        if topology.clock_count > N {
            warn!(
                "clock tree: {} clocks declared, room for {}",
                topology.clock_count, N
            );
            return Err(ErrorCode::AllocationFailure);
        }
        self.clock_count = topology.clock_count;

        for desc in topology.stages.iter().flat_map(|stage| stage.iter()) {
            if let Err(e) = self.register(bases, desc) {
                warn!("clock tree: {} registering {}", e, desc.name);
                self.rollback();
                return Err(e);
            }
        }

        if let Err(e) = self.check_all() {
            self.rollback();
            return Err(e);
        }
        Ok(())
    }

    /// Check that every declared identifier is populated.
    pub fn check_all(&self) -> Result<(), ErrorCode> {
        match self.nodes[..self.clock_count].iter().position(Option::is_none) {
            Some(id) => {
                warn!("clock tree: clock {} declared but never registered", id);
                Err(ErrorCode::NullNode)
            }
            None => Ok(()),
        }
    }

    fn find(&self, name: &str) -> Option<ClockId> {
        self.nodes
            .iter()
            .position(|node| node.as_ref().is_some_and(|clk| clk.name() == name))
    }

    fn register(&mut self, bases: &Bases, desc: &ClockDesc) -> Result<(), ErrorCode> {
        if desc.id >= self.clock_count {
            return Err(ErrorCode::InvalidArgument);
        }
        if self.nodes[desc.id].is_some() || self.find(desc.name).is_some() {
            return Err(ErrorCode::DuplicateClock);
        }
        let (min, max) = desc.kind.parent_range();
        if desc.parents.len() < min || desc.parents.len() > max {
            return Err(ErrorCode::InvalidArgument);
        }

        let mut parents: heapless::Vec<ClockId, MAX_PARENTS> = heapless::Vec::new();
        for name in desc.parents {
            let parent = self.find(name).ok_or(ErrorCode::UnresolvedParent)?;
            parents
                .push(parent)
                .map_err(|_| ErrorCode::InvalidArgument)?;
        }

        self.order
            .push(desc.id)
            .map_err(|_| ErrorCode::AllocationFailure)?;
        self.nodes[desc.id] = Some(desc.instantiate(bases, parents));

        if CONFIG.debug_tree_build {
            debug!("clock tree: registered {} as {}", desc.name, desc.id);
        }
        Ok(())
    }

    fn rollback(&mut self) {
        while let Some(id) = self.order.pop() {
            if let Some(clk) = self.nodes[id].take() {
                if CONFIG.debug_tree_build {
                    debug!("clock tree: released {}", clk.name());
                }
            }
        }
    }

    /// Hand the registered nodes over to a runnable tree.
    pub fn finish<B: RegisterBus, D: DelayNs>(self, bus: B, delay: D) -> ClockTree<B, D, N> {
        ClockTree {
            bus,
            nodes: self.nodes,
            count: self.clock_count,
            inner: Mutex::new(Inner {
                delay,
                counts: [Counts::default(); N],
            }),
        }
    }
}

struct Inner<D, const N: usize> {
    delay: D,
    counts: [Counts; N],
}

pub struct ClockTree<B: RegisterBus, D: DelayNs, const N: usize> {
    bus: B,
    nodes: [Option<Clock>; N],
    count: usize,
    inner: Mutex<Inner<D, N>>,
}

impl<B: RegisterBus, D: DelayNs, const N: usize> ClockTree<B, D, N> {
    /// Build a tree from `topology`. See [`TreeBuilder::populate`] for the
    /// possible errors.
    pub fn build(bus: B, delay: D, bases: &Bases, topology: &Topology) -> Result<Self, ErrorCode> {
        let mut builder = TreeBuilder::new();
        builder.populate(bases, topology)?;
        Ok(builder.finish(bus, delay))
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn get(&self, id: ClockId) -> Result<&Clock, ErrorCode> {
        self.nodes
            .get(id)
            .and_then(Option::as_ref)
            .ok_or(ErrorCode::NotFound)
    }

    /// Identifier of the clock called `name`.
    pub fn find(&self, name: &str) -> Result<ClockId, ErrorCode> {
        self.iter()
            .find(|(_, clk)| clk.name() == name)
            .map(|(id, _)| id)
            .ok_or(ErrorCode::NotFound)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClockId, &Clock)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(id, node)| node.as_ref().map(|clk| (id, clk)))
    }

    pub fn handle(&self, id: ClockId) -> Result<ClockHandle<'_, B, D, N>, ErrorCode> {
        self.get(id)?;
        Ok(ClockHandle { tree: self, id })
    }

    fn locked<R>(&self, f: impl FnOnce(&mut ClockIo<'_>, &mut [Counts; N]) -> R) -> R {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let mut io = ClockIo::new(&self.bus, &mut inner.delay);
        f(&mut io, &mut inner.counts)
    }

    /// Run `f` with raw register access, holding the tree lock.
    pub fn with_io<R>(&self, f: impl FnOnce(&mut ClockIo<'_>) -> R) -> R {
        self.locked(|io, _| f(io))
    }

    pub fn prepare_count(&self, id: ClockId) -> Result<u32, ErrorCode> {
        self.get(id)?;
        Ok(self.locked(|_, counts| counts[id].prepare))
    }

    pub fn enable_count(&self, id: ClockId) -> Result<u32, ErrorCode> {
        self.get(id)?;
        Ok(self.locked(|_, counts| counts[id].enable))
    }

    pub fn prepare(&self, id: ClockId) -> Result<(), ErrorCode> {
        self.locked(|io, counts| self.prepare_locked(io, counts, id))
    }

    /// # Errors
    ///
    /// * `InvalidState` if the clock is not prepared, or if this would drop
    ///   the last prepare reference of a clock that is still enabled.
    /// * `PermissionDenied` if this would drop the last prepare reference of
    ///   a critical clock.
    pub fn unprepare(&self, id: ClockId) -> Result<(), ErrorCode> {
        self.locked(|io, counts| self.unprepare_locked(io, counts, id))
    }

    /// # Errors
    ///
    /// `InvalidState` if the clock is not prepared.
    pub fn enable(&self, id: ClockId) -> Result<(), ErrorCode> {
        self.locked(|io, counts| self.enable_locked(io, counts, id))
    }

    /// # Errors
    ///
    /// * `InvalidState` if the clock is not enabled.
    /// * `PermissionDenied` if this would drop the last enable reference of a
    ///   critical clock. The clock and its parents stay enabled.
    ///
    /// Errors of the node itself leave the clock enabled.
    pub fn disable(&self, id: ClockId) -> Result<(), ErrorCode> {
        self.locked(|io, counts| self.disable_locked(io, counts, id))
    }

    pub fn prepare_enable(&self, id: ClockId) -> Result<(), ErrorCode> {
        self.locked(|io, counts| {
            self.prepare_locked(io, counts, id)?;
            if let Err(e) = self.enable_locked(io, counts, id) {
                if let Err(undo) = self.unprepare_locked(io, counts, id) {
                    warn!("clock tree: {} undoing prepare of {}", undo, id);
                }
                return Err(e);
            }
            Ok(())
        })
    }

    pub fn disable_unprepare(&self, id: ClockId) -> Result<(), ErrorCode> {
        self.locked(|io, counts| {
            self.disable_locked(io, counts, id)?;
            self.unprepare_locked(io, counts, id)
        })
    }

    /// Hardware state of the node itself, ignoring its parents.
    pub fn is_enabled(&self, id: ClockId) -> Result<bool, ErrorCode> {
        let clk = self.get(id)?;
        Ok(self.with_io(|io| clk.hw().is_enabled(io)))
    }

    pub fn is_prepared(&self, id: ClockId) -> Result<bool, ErrorCode> {
        let clk = self.get(id)?;
        Ok(self.with_io(|io| clk.hw().is_prepared(io)))
    }

    /// Current output rate in Hz. A mux whose selector points at a parent the
    /// tree does not model reports 0.
    pub fn rate(&self, id: ClockId) -> Result<u64, ErrorCode> {
        self.with_io(|io| self.rate_locked(io, id))
    }

    pub fn round_rate(&self, id: ClockId, rate: u64) -> Result<u64, ErrorCode> {
        let clk = self.get(id)?;
        self.with_io(|io| {
            let parent_rate = self.parent_rate_locked(io, clk)?;
            Ok(clk.hw().round_rate(io, rate, parent_rate))
        })
    }

    /// Reprogram clock `id` for `rate`. Only the node itself is changed; the
    /// parent keeps its rate.
    pub fn set_rate(&self, id: ClockId, rate: u64) -> Result<(), ErrorCode> {
        let clk = self.get(id)?;
        self.with_io(|io| {
            let parent_rate = self.parent_rate_locked(io, clk)?;
            clk.hw().set_rate(io, rate, parent_rate)
        })
    }

    /// The parent currently feeding clock `id`, `None` for a source or a mux
    /// selecting an unmodelled input.
    pub fn parent(&self, id: ClockId) -> Result<Option<ClockId>, ErrorCode> {
        let clk = self.get(id)?;
        Ok(self.with_io(|io| clk.current_parent(io)))
    }

    /// Switch the mux of clock `id` to `parent`.
    ///
    /// If `id` is prepared or enabled, the new parent is prepared and enabled
    /// before the switch and the old parent released after it. If the switch
    /// itself fails, the references stay with whichever input the selector
    /// reads back.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `id` has no mux or `parent` is not one of its
    /// inputs.
    pub fn set_parent(&self, id: ClockId, parent: ClockId) -> Result<(), ErrorCode> {
        let clk = self.get(id)?;
        let mux = clk.hw().as_mux().ok_or(ErrorCode::InvalidArgument)?;
        let index = clk
            .parents()
            .iter()
            .position(|&p| p == parent)
            .ok_or(ErrorCode::InvalidArgument)?;

        self.locked(|io, counts| {
            let old = clk.current_parent(io);
            if old == Some(parent) {
                return Ok(());
            }
            let held = counts[id];

            if held.prepare > 0 {
                self.prepare_locked(io, counts, parent)?;
            }
            if held.enable > 0 {
                if let Err(e) = self.enable_locked(io, counts, parent) {
                    self.release_locked(io, counts, parent, Counts { enable: 0, ..held });
                    return Err(e);
                }
            }
            if let Err(e) = mux.set_parent_index(io, index) {
                let stale = if clk.current_parent(io) == Some(parent) {
                    old
                } else {
                    Some(parent)
                };
                if let Some(stale) = stale {
                    self.release_locked(io, counts, stale, held);
                }
                return Err(e);
            }
            if let Some(old) = old {
                self.release_locked(io, counts, old, held);
            }
            Ok(())
        })
    }

    /// Prepare and enable every critical clock, so that no consumer can drop
    /// the last reference to one.
    pub fn protect_critical(&self) -> Result<(), ErrorCode> {
        for (id, clk) in self.iter() {
            if clk.is_critical() {
                debug!("clock tree: protecting {}", clk.name());
                self.prepare_enable(id)?;
            }
        }
        Ok(())
    }

    fn prepare_locked(
        &self,
        io: &mut ClockIo<'_>,
        counts: &mut [Counts; N],
        id: ClockId,
    ) -> Result<(), ErrorCode> {
        let clk = self.get(id)?;
        if counts[id].prepare == 0 {
            let parent = clk.current_parent(io);
            if let Some(parent) = parent {
                self.prepare_locked(io, counts, parent)?;
            }
            if let Err(e) = clk.hw().prepare(io) {
                if let Some(parent) = parent {
                    self.release_locked(io, counts, parent, Counts { prepare: 1, enable: 0 });
                }
                return Err(e);
            }
        }
        counts[id].prepare += 1;
        Ok(())
    }

    fn unprepare_locked(
        &self,
        io: &mut ClockIo<'_>,
        counts: &mut [Counts; N],
        id: ClockId,
    ) -> Result<(), ErrorCode> {
        let clk = self.get(id)?;
        let count = counts[id];
        if count.prepare == 0 || (count.prepare == 1 && count.enable > 0) {
            return Err(ErrorCode::InvalidState);
        }
        if count.prepare == 1 && clk.is_critical() {
            warn!("clock tree: {} is critical, keeping it prepared", clk.name());
            return Err(ErrorCode::PermissionDenied);
        }
        counts[id].prepare -= 1;
        if counts[id].prepare == 0 {
            let parent = clk.current_parent(io);
            clk.hw().unprepare(io);
            if let Some(parent) = parent {
                self.unprepare_locked(io, counts, parent)?;
            }
        }
        Ok(())
    }

    fn enable_locked(
        &self,
        io: &mut ClockIo<'_>,
        counts: &mut [Counts; N],
        id: ClockId,
    ) -> Result<(), ErrorCode> {
        let clk = self.get(id)?;
        if counts[id].prepare == 0 {
            return Err(ErrorCode::InvalidState);
        }
        if counts[id].enable == 0 {
            let parent = clk.current_parent(io);
            if let Some(parent) = parent {
                self.enable_locked(io, counts, parent)?;
            }
            if let Err(e) = clk.hw().enable(io) {
                if let Some(parent) = parent {
                    self.release_locked(io, counts, parent, Counts { prepare: 0, enable: 1 });
                }
                return Err(e);
            }
        }
        counts[id].enable += 1;
        Ok(())
    }

    fn disable_locked(
        &self,
        io: &mut ClockIo<'_>,
        counts: &mut [Counts; N],
        id: ClockId,
    ) -> Result<(), ErrorCode> {
        let clk = self.get(id)?;
        if counts[id].enable == 0 {
            return Err(ErrorCode::InvalidState);
        }
        if counts[id].enable > 1 {
            counts[id].enable -= 1;
            return Ok(());
        }
        if clk.is_critical() {
            warn!("clock tree: {} is critical, keeping it enabled", clk.name());
            return Err(ErrorCode::PermissionDenied);
        }

        let parent = clk.current_parent(io);
        clk.hw().disable(io)?;
        counts[id].enable = 0;
        match parent {
            Some(parent) => self.disable_locked(io, counts, parent),
            None => Ok(()),
        }
    }

    /// Drop the references a child held on `parent` (an enable reference if
    /// `held.enable > 0`, then a prepare reference if `held.prepare > 0`).
    /// Failures are logged, not returned: the caller is already unwinding or
    /// has completed its change.
    fn release_locked(
        &self,
        io: &mut ClockIo<'_>,
        counts: &mut [Counts; N],
        parent: ClockId,
        held: Counts,
    ) {
        if held.enable > 0 {
            if let Err(e) = self.disable_locked(io, counts, parent) {
                warn!("clock tree: {} disabling {}", e, parent);
            }
        }
        if held.prepare > 0 {
            if let Err(e) = self.unprepare_locked(io, counts, parent) {
                warn!("clock tree: {} unpreparing {}", e, parent);
            }
        }
    }

    fn parent_rate_locked(&self, io: &ClockIo<'_>, clk: &Clock) -> Result<u64, ErrorCode> {
        match clk.current_parent(io) {
            Some(parent) => self.rate_locked(io, parent),
            None => Ok(0),
        }
    }

    fn rate_locked(&self, io: &ClockIo<'_>, id: ClockId) -> Result<u64, ErrorCode> {
        let clk = self.get(id)?;
        if clk.hw().as_mux().is_some() && clk.current_parent(io).is_none() {
            return Ok(0);
        }
        let parent_rate = self.parent_rate_locked(io, clk)?;
        Ok(clk.hw().recalc_rate(io, parent_rate))
    }
}

/// A clock of a [`ClockTree`], as returned to consumers.
pub struct ClockHandle<'a, B: RegisterBus, D: DelayNs, const N: usize> {
    tree: &'a ClockTree<B, D, N>,
    id: ClockId,
}

impl<'a, B: RegisterBus, D: DelayNs, const N: usize> ClockHandle<'a, B, D, N> {
    pub fn id(&self) -> ClockId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.tree.get(self.id).map_or("", Clock::name)
    }

    pub fn prepare_enable(&self) -> Result<(), ErrorCode> {
        self.tree.prepare_enable(self.id)
    }

    pub fn disable_unprepare(&self) -> Result<(), ErrorCode> {
        self.tree.disable_unprepare(self.id)
    }

    pub fn enable(&self) -> Result<(), ErrorCode> {
        self.tree.enable(self.id)
    }

    pub fn disable(&self) -> Result<(), ErrorCode> {
        self.tree.disable(self.id)
    }

    pub fn is_enabled(&self) -> Result<bool, ErrorCode> {
        self.tree.is_enabled(self.id)
    }

    pub fn rate(&self) -> Result<u64, ErrorCode> {
        self.tree.rate(self.id)
    }

    pub fn set_rate(&self, rate: u64) -> Result<(), ErrorCode> {
        self.tree.set_rate(self.id, rate)
    }

    pub fn set_parent(&self, parent: ClockId) -> Result<(), ErrorCode> {
        self.tree.set_parent(self.id, parent)
    }
}

impl<B: RegisterBus, D: DelayNs, const N: usize> ClockProvider for ClockTree<B, D, N> {
    type Handle<'a> = ClockHandle<'a, B, D, N> where Self: 'a;

    fn lookup(&self, id: ClockId) -> Result<Self::Handle<'_>, ErrorCode> {
        self.handle(id)
    }
}
