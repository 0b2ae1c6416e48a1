// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Clock tree engine for SoC clock controllers.
//!
//! A clock tree is a DAG of oscillators, PLLs, fractional dividers, clock
//! root muxes and peripheral gates. Chips describe their tree as static
//! [`topology`] tables; the [`tree`] module builds those tables into a
//! [`tree::ClockTree`] that reference counts enables and computes rates on
//! demand from the hardware registers.
//!
//! The crate is `no_std` and does not allocate. Registers are reached through
//! the [`utilities::registers::RegisterBus`] trait, so the same code runs on
//! hardware ([`utilities::mmio::Mmio`]) and against the in-memory bus of the
//! `testing` module.

#![no_std]

#[cfg(test)]
#[macro_use]
extern crate std;

#[cfg(any(test, feature = "testing"))]
extern crate alloc;

pub mod clk;
pub mod errorcode;
pub mod hil;
pub mod topology;
pub mod tree;
pub mod utilities;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

mod config;

pub use crate::errorcode::ErrorCode;
