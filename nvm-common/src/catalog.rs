// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Target catalog for the loader protocol families.
//!
//! Each family owns a closed table of targets. A [`TargetId`] is only
//! meaningful to the family that issued it; nothing in the workspace
//! translates ids between families or does arithmetic on them.

use core::fmt;
use core::num::NonZeroU32;

/// Identifier of a target within one protocol family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(u8);

impl TargetId {
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    /// Raw value as sent on the wire.
    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Line speed. The unit is protocol-defined; all built-in families use baud.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Speed(NonZeroU32);

impl Speed {
    /// Returns `None` for zero.
    pub const fn new(value: u32) -> Option<Self> {
        match NonZeroU32::new(value) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

const fn baud(value: u32) -> Speed {
    match Speed::new(value) {
        Some(s) => s,
        None => panic!("catalog speeds must be non-zero"),
    }
}

// --- Target ids ---

pub const TARGET_NVC1_UART: TargetId = TargetId(1);
pub const TARGET_NVC1_ASURO: TargetId = TargetId(2);
pub const TARGET_NVC2_UART: TargetId = TargetId(1);
pub const TARGET_CTBOT: TargetId = TargetId(1);

/// One target known to a protocol family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetEntry {
    /// Symbolic name accepted on the command line.
    pub name: &'static str,
    pub id: TargetId,
    pub description: &'static str,
    /// Speed used when the caller names the target instead of a speed.
    pub default_speed: Speed,
    /// The target only ever runs at `default_speed`; a requested speed is ignored.
    pub fixed_speed: bool,
}

impl TargetEntry {
    /// Speed the link will actually run at for a requested speed.
    pub fn effective_speed(&self, requested: Speed) -> Speed {
        if self.fixed_speed {
            self.default_speed
        } else {
            requested
        }
    }
}

const NVC1_TARGETS: &[TargetEntry] = &[
    TargetEntry {
        name: "uart",
        id: TARGET_NVC1_UART,
        description: "AVR board on a plain UART",
        default_speed: baud(9600),
        fixed_speed: false,
    },
    TargetEntry {
        name: "asuro",
        id: TARGET_NVC1_ASURO,
        description: "Asuro robot through its IR transceiver (2400 baud)",
        default_speed: baud(2400),
        fixed_speed: true,
    },
];

const NVC2_TARGETS: &[TargetEntry] = &[TargetEntry {
    name: "uart",
    id: TARGET_NVC2_UART,
    description: "Board running the framed NanoVM loader",
    default_speed: baud(115_200),
    fixed_speed: false,
}];

const CTBOT_TARGETS: &[TargetEntry] = &[TargetEntry {
    name: "ctbot",
    id: TARGET_CTBOT,
    description: "c't-Bot with the text loader",
    default_speed: baud(115_200),
    fixed_speed: false,
}];

/// Loader protocol family. Each transfer strategy speaks exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Nvc1,
    Nvc2,
    CtBot,
}

impl Family {
    pub const ALL: [Family; 3] = [Family::Nvc1, Family::Nvc2, Family::CtBot];

    pub const fn name(self) -> &'static str {
        match self {
            Family::Nvc1 => "nvc1",
            Family::Nvc2 => "nvc2",
            Family::CtBot => "ctbot",
        }
    }

    /// All targets of this family. Never empty.
    pub const fn targets(self) -> &'static [TargetEntry] {
        match self {
            Family::Nvc1 => NVC1_TARGETS,
            Family::Nvc2 => NVC2_TARGETS,
            Family::CtBot => CTBOT_TARGETS,
        }
    }

    /// Target used when only a speed is given.
    pub const fn default_target(self) -> &'static TargetEntry {
        &self.targets()[0]
    }

    /// Look up a target by name (ASCII case-insensitive).
    pub fn lookup(self, name: &str) -> Result<&'static TargetEntry, UnknownTarget> {
        self.targets()
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
            .ok_or(UnknownTarget { family: self })
    }

    /// Look up a target by id.
    pub fn entry(self, id: TargetId) -> Result<&'static TargetEntry, UnknownTarget> {
        self.targets()
            .iter()
            .find(|t| t.id == id)
            .ok_or(UnknownTarget { family: self })
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A name or id that the family's catalog does not contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownTarget {
    pub family: Family,
}

impl fmt::Display for UnknownTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target not known to the {} family", self.family)
    }
}
