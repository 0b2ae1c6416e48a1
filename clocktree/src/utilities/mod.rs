// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Utility types shared by the clock nodes and the clock tree.

pub mod mmio;
pub mod registers;
