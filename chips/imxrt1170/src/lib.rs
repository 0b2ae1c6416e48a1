// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Clock tree of the NXP i.MX RT1170.

#![no_std]

pub mod anatop;
pub mod ccm;
pub mod clocks;
pub mod ids;
