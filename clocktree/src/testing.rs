// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! In-memory register bus for running clock code on a host.
//!
//! [`FakeBus`] stores registers in a map (unwritten registers read as zero),
//! records every write, and shares a simulated microsecond clock with
//! [`FakeDelay`]. Two pieces of hardware behaviour can be attached to
//! addresses:
//!
//! * a PLL lock model, which raises the stable bit once the powerup bits have
//!   been set for long enough;
//! * SET/CLR aliases at `+4`/`+8`, as used by the Anatop PFD registers.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use embedded_hal::delay::DelayNs;

use crate::utilities::registers::RegisterBus;

struct LockModel {
    addr: usize,
    powerup_mask: u32,
    stable_mask: u32,
    lock_us: Option<u64>,
    powered_at_ns: Option<u64>,
}

pub struct FakeBus {
    regs: RefCell<BTreeMap<usize, u32>>,
    log: RefCell<Vec<(usize, u32)>>,
    locks: RefCell<Vec<LockModel>>,
    aliases: RefCell<Vec<usize>>,
    now_ns: Rc<Cell<u64>>,
}

/// Delay source that advances the clock of the [`FakeBus`] it was created
/// with instead of sleeping.
pub struct FakeDelay {
    now_ns: Rc<Cell<u64>>,
}

impl FakeBus {
    pub fn with_delay() -> (FakeBus, FakeDelay) {
        let now_ns = Rc::new(Cell::new(0));
        let bus = FakeBus {
            regs: RefCell::new(BTreeMap::new()),
            log: RefCell::new(Vec::new()),
            locks: RefCell::new(Vec::new()),
            aliases: RefCell::new(Vec::new()),
            now_ns: now_ns.clone(),
        };
        (bus, FakeDelay { now_ns })
    }

    /// Preset a register without recording a write.
    pub fn set(&self, addr: usize, value: u32) {
        self.regs.borrow_mut().insert(addr, value);
    }

    /// Current register content, without running the lock models.
    pub fn get(&self, addr: usize) -> u32 {
        self.regs.borrow().get(&addr).copied().unwrap_or(0)
    }

    pub fn now_us(&self) -> u64 {
        self.now_ns.get() / 1000
    }

    /// Number of writes issued since creation or the last `clear_log`.
    pub fn write_count(&self) -> usize {
        self.log.borrow().len()
    }

    pub fn writes(&self) -> Vec<(usize, u32)> {
        self.log.borrow().clone()
    }

    pub fn clear_log(&self) {
        self.log.borrow_mut().clear();
    }

    /// Raise `stable_mask` at `addr` once all of `powerup_mask` has been set
    /// for `lock_us` microseconds. `None` models a PLL that never locks.
    pub fn add_pll_lock(&self, addr: usize, powerup_mask: u32, stable_mask: u32, lock_us: Option<u64>) {
        self.locks.borrow_mut().push(LockModel {
            addr,
            powerup_mask,
            stable_mask,
            lock_us,
            powered_at_ns: None,
        });
    }

    /// Make writes to `addr + 4` set bits and writes to `addr + 8` clear bits
    /// of the register at `addr`.
    pub fn add_set_clr_alias(&self, addr: usize) {
        self.aliases.borrow_mut().push(addr);
    }

    fn store(&self, addr: usize, value: u32) {
        self.regs.borrow_mut().insert(addr, value);
        let now = self.now_ns.get();
        for lock in self.locks.borrow_mut().iter_mut().filter(|l| l.addr == addr) {
            let powered = value & lock.powerup_mask == lock.powerup_mask;
            if !powered {
                lock.powered_at_ns = None;
            } else if lock.powered_at_ns.is_none() {
                lock.powered_at_ns = Some(now);
            }
        }
    }
}

impl RegisterBus for FakeBus {
    fn read(&self, addr: usize) -> u32 {
        let mut value = self.get(addr);
        let now = self.now_ns.get();
        for lock in self.locks.borrow().iter().filter(|l| l.addr == addr) {
            if let (Some(at), Some(lock_us)) = (lock.powered_at_ns, lock.lock_us) {
                if now - at >= lock_us * 1000 {
                    value |= lock.stable_mask;
                }
            }
        }
        self.regs.borrow_mut().insert(addr, value);
        value
    }

    fn write(&self, addr: usize, value: u32) {
        self.log.borrow_mut().push((addr, value));
        let set_target = addr.checked_sub(4);
        let clr_target = addr.checked_sub(8);
        let aliased = self.aliases.borrow().iter().find_map(|&base| {
            if Some(base) == set_target {
                Some((base, true))
            } else if Some(base) == clr_target {
                Some((base, false))
            } else {
                None
            }
        });
        match aliased {
            Some((base, true)) => self.store(base, self.get(base) | value),
            Some((base, false)) => self.store(base, self.get(base) & !value),
            None => self.store(addr, value),
        }
    }
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.now_ns.set(self.now_ns.get() + ns as u64);
    }

    fn delay_us(&mut self, us: u32) {
        self.now_ns.set(self.now_ns.get() + us as u64 * 1000);
    }
}
