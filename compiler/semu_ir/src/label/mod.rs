//! Label references.

use std::fmt;
use std::str::FromStr;

use crate::LoadError;

/// A jump target.
///
/// `Empty` marks an unlabeled instruction and, as a jump result, "fall
/// through to the next instruction". `Exit` terminates the program.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LabelRef {
    #[default]
    Empty,
    Numbered(u32),
    Exit,
}

impl LabelRef {
    /// Textual name of the exit label.
    pub const EXIT_NAME: &'static str = "EXIT";

    #[inline]
    pub const fn is_empty(self) -> bool {
        matches!(self, LabelRef::Empty)
    }

    #[inline]
    pub const fn is_exit(self) -> bool {
        matches!(self, LabelRef::Exit)
    }

    /// The label number, if this is a numbered label.
    #[inline]
    pub const fn number(self) -> Option<u32> {
        match self {
            LabelRef::Numbered(n) => Some(n),
            LabelRef::Empty | LabelRef::Exit => None,
        }
    }

    /// Parse `L<n>`, `EXIT`, or the empty string, case-insensitively.
    pub fn parse(text: &str) -> Result<Self, LoadError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(LabelRef::Empty);
        }
        if trimmed.eq_ignore_ascii_case(Self::EXIT_NAME) {
            return Ok(LabelRef::Exit);
        }
        let invalid = || LoadError::InvalidLabel {
            text: text.to_owned(),
        };
        let digits = trimmed
            .strip_prefix('L')
            .or_else(|| trimmed.strip_prefix('l'))
            .ok_or_else(invalid)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        match digits.parse::<u32>() {
            Ok(0) | Err(_) => Err(invalid()),
            Ok(n) => Ok(LabelRef::Numbered(n)),
        }
    }
}

impl fmt::Display for LabelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelRef::Empty => Ok(()),
            LabelRef::Numbered(n) => write!(f, "L{n}"),
            LabelRef::Exit => f.write_str(Self::EXIT_NAME),
        }
    }
}

impl FromStr for LabelRef {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for LabelRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for LabelRef {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
