// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Data structure for storing compile-time configuration options of the clock
//! tree.
//!
//! Configuration is a typed `const` object rather than scattered `#[cfg]`
//! blocks, so every code path is type-checked even when the option is off and
//! the compiler folds the disabled branches away.

/// Data structure holding compile-time configuration options.
///
/// To change the configuration, enable the matching cargo feature of the
/// `clocktree` crate from the board or chip crate.
pub(crate) struct Config {
    /// Whether every register write issued by a clock node is logged at
    /// `trace` level, with the address and the value written.
    pub(crate) trace_registers: bool,

    /// Whether the registry logs each node as it is registered and released
    /// while building the tree.
    pub(crate) debug_tree_build: bool,
}

/// The unique instance of `Config`. This is the only place in the crate where
/// cargo features are allowed to influence code.
pub(crate) const CONFIG: Config = Config {
    trace_registers: cfg!(feature = "trace_registers"),
    debug_tree_build: cfg!(feature = "debug_tree_build"),
};
