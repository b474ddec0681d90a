// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Wire formats of the loader protocols.
//!
//! These modules only build and check frames. Opening the line, pacing and
//! reading replies is left to the host tool (or a device-side loader).

pub mod ctbot;
pub mod nvc1;
pub mod nvc2;
