//! Variable references.
//!
//! The S language has three kinds of variables: the single result `y`, the
//! inputs `x1, x2, ...` and the work variables `z1, z2, ...`. All of them
//! hold natural numbers and read as 0 until first written.

use std::fmt;
use std::str::FromStr;

use crate::LoadError;

/// Kind of a variable.
///
/// Declaration order is significant: it is the listing order used for
/// sorted variable views (result first, then inputs, then work variables).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VariableKind {
    Result,
    Input,
    Work,
}

impl VariableKind {
    /// Prefix character used in the textual form.
    #[inline]
    pub const fn prefix(self) -> char {
        match self {
            VariableKind::Result => 'y',
            VariableKind::Input => 'x',
            VariableKind::Work => 'z',
        }
    }
}

/// Reference to a variable: kind plus serial number.
///
/// The result variable always has serial 0; inputs and work variables are
/// numbered from 1. The derived ordering (kind, then serial) is the stable
/// listing order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariableRef {
    kind: VariableKind,
    serial: u32,
}

impl VariableRef {
    /// The result variable `y`.
    pub const RESULT: VariableRef = VariableRef {
        kind: VariableKind::Result,
        serial: 0,
    };

    /// Input variable `x<serial>`.
    #[inline]
    pub const fn input(serial: u32) -> Self {
        debug_assert!(serial > 0);
        VariableRef {
            kind: VariableKind::Input,
            serial,
        }
    }

    /// Work variable `z<serial>`.
    #[inline]
    pub const fn work(serial: u32) -> Self {
        debug_assert!(serial > 0);
        VariableRef {
            kind: VariableKind::Work,
            serial,
        }
    }

    #[inline]
    pub const fn kind(self) -> VariableKind {
        self.kind
    }

    #[inline]
    pub const fn serial(self) -> u32 {
        self.serial
    }

    #[inline]
    pub const fn is_result(self) -> bool {
        matches!(self.kind, VariableKind::Result)
    }

    #[inline]
    pub const fn is_input(self) -> bool {
        matches!(self.kind, VariableKind::Input)
    }

    #[inline]
    pub const fn is_work(self) -> bool {
        matches!(self.kind, VariableKind::Work)
    }

    /// Parse the textual form (`y`, `x3`, `z12`), case-insensitively.
    pub fn parse(text: &str) -> Result<Self, LoadError> {
        let invalid = || LoadError::InvalidVariable {
            text: text.to_owned(),
        };
        let trimmed = text.trim();
        let mut chars = trimmed.chars();
        let prefix = chars.next().ok_or_else(invalid)?.to_ascii_lowercase();
        let digits = chars.as_str();

        if prefix == 'y' {
            return if digits.is_empty() {
                Ok(Self::RESULT)
            } else {
                Err(invalid())
            };
        }

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let serial: u32 = digits.parse().map_err(|_| invalid())?;
        if serial == 0 {
            return Err(invalid());
        }
        match prefix {
            'x' => Ok(Self::input(serial)),
            'z' => Ok(Self::work(serial)),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for VariableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            VariableKind::Result => f.write_str("y"),
            kind => write!(f, "{}{}", kind.prefix(), self.serial),
        }
    }
}

impl FromStr for VariableRef {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for VariableRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for VariableRef {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
