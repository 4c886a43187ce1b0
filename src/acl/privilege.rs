//! Privilege bitmask
//!
//! READ=1, WRITE=2, DELETE=4, combined with `|`. A mask satisfies a
//! requirement when `mask & required == required`.

use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Privilege(u8);

impl Privilege {
    pub const NONE: Privilege = Privilege(0);
    pub const READ: Privilege = Privilege(1);
    pub const WRITE: Privilege = Privilege(2);
    pub const DELETE: Privilege = Privilege(4);
    pub const ALL: Privilege = Privilege(7);

    /// Builds a mask from raw bits, dropping anything above DELETE.
    pub const fn from_bits(bits: u8) -> Self {
        Privilege(bits & Self::ALL.0)
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// True when every bit of `required` is present in `self`.
    pub const fn covers(&self, required: Privilege) -> bool {
        self.0 & required.0 == required.0
    }

    pub fn name(&self) -> &'static str {
        match self.0 {
            0 => "none",
            1 => "read",
            2 => "write",
            4 => "delete",
            7 => "all",
            _ => "mixed",
        }
    }
}

impl From<u8> for Privilege {
    fn from(bits: u8) -> Self {
        Privilege::from_bits(bits)
    }
}

impl From<Privilege> for u8 {
    fn from(privilege: Privilege) -> Self {
        privilege.0
    }
}

impl BitOr for Privilege {
    type Output = Privilege;

    fn bitor(self, rhs: Privilege) -> Privilege {
        Privilege(self.0 | rhs.0)
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.0)
    }
}
