// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Clock identifiers of the i.MX RT1170.

use clocktree::hil::clock::ClockId;

pub const DUMMY: ClockId = 0;
pub const OSC: ClockId = 1;
pub const RCOSC_16M: ClockId = 2;
pub const RCOSC_48M: ClockId = 3;
pub const RCOSC_400M: ClockId = 4;
pub const RCOSC_48M_DIV2: ClockId = 5;
pub const VIDEO_PLL: ClockId = 6;
pub const AUDIO_PLL: ClockId = 7;

pub const PLL_ARM: ClockId = 8;
pub const PLL3: ClockId = 9;
pub const PLL2: ClockId = 10;
pub const PLL1: ClockId = 11;
pub const PLL3_PFD0: ClockId = 12;
pub const PLL3_PFD1: ClockId = 13;
pub const PLL3_PFD2: ClockId = 14;
pub const PLL3_PFD3: ClockId = 15;
pub const PLL2_PFD0: ClockId = 16;
pub const PLL2_PFD1: ClockId = 17;
pub const PLL2_PFD2: ClockId = 18;
pub const PLL2_PFD3: ClockId = 19;
pub const PLL3_DIV2: ClockId = 20;
pub const PLL1_DIV2: ClockId = 21;
pub const PLL1_DIV5: ClockId = 22;

pub const ROOT_M7: ClockId = 23;
pub const ROOT_BUS: ClockId = 24;
pub const ROOT_BUS_LPSR: ClockId = 25;
pub const ROOT_SEMC: ClockId = 26;
pub const ROOT_GPT1: ClockId = 27;
pub const ROOT_LPUART1: ClockId = 28;
pub const ROOT_LPI2C1: ClockId = 29;
pub const ROOT_LPI2C2: ClockId = 30;
pub const ROOT_LPI2C3: ClockId = 31;
pub const ROOT_LPI2C4: ClockId = 32;
pub const ROOT_LPI2C5: ClockId = 33;
pub const ROOT_LPI2C6: ClockId = 34;
pub const ROOT_ENET1: ClockId = 35;
pub const ROOT_USDHC1: ClockId = 36;
pub const ROOT_ELCDIF: ClockId = 37;
pub const ROOT_MIPI_REF: ClockId = 38;
pub const ROOT_MIPI_ESC: ClockId = 39;

pub const M7: ClockId = 40;
pub const EDMA: ClockId = 41;
pub const SEMC: ClockId = 42;
pub const GPT1: ClockId = 43;
pub const LPUART1: ClockId = 44;
pub const LPI2C1: ClockId = 45;
pub const LPI2C2: ClockId = 46;
pub const LPI2C3: ClockId = 47;
pub const LPI2C4: ClockId = 48;
pub const LPI2C5: ClockId = 49;
pub const LPI2C6: ClockId = 50;
pub const ENET1: ClockId = 51;
pub const USB: ClockId = 52;
pub const USDHC1: ClockId = 53;
pub const ELCDIF: ClockId = 54;
pub const MIPI_DSI: ClockId = 55;
pub const MIPI_DSI_TX_ESC: ClockId = 56;

/// Number of clock identifiers.
pub const CLK_END: usize = 57;
