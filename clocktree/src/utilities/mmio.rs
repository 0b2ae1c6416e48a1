// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Memory mapped implementation of [`RegisterBus`].

use core::ptr;

use super::registers::RegisterBus;

/// Direct volatile access to the physical address space.
///
/// Volatile accesses are never elided or reordered with respect to each other,
/// which is the only ordering the clock controller needs.
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// Create a bus that dereferences the addresses it is given.
    ///
    /// # Safety
    ///
    /// Every address later passed to `read` or `write` must be a valid,
    /// 4-byte aligned device register. In practice this means the clock tree
    /// must be built with the real CCM and Anatop base addresses of the SoC.
    pub const unsafe fn new() -> Mmio {
        Mmio { _private: () }
    }
}

impl RegisterBus for Mmio {
    fn read(&self, addr: usize) -> u32 {
        // Safety: guaranteed by the contract of `Mmio::new`.
        unsafe { ptr::read_volatile(addr as *const u32) }
    }

    fn write(&self, addr: usize, value: u32) {
        // Safety: guaranteed by the contract of `Mmio::new`.
        unsafe { ptr::write_volatile(addr as *mut u32, value) }
    }
}
