use std::fmt::Display;

/// Denotes a program counter in an instruction sequence.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default)]
#[repr(transparent)]
pub struct ProgramCounter(u16);

impl ProgramCounter {
    /// Denotes the first instruction of a method.
    pub const ZERO: Self = Self(0);

    /// Creates a new program counter based on the given value with a given offset.
    /// # Errors
    /// - [`InvalidOffset::I32`] If the resulting value is too large to fit into a [`ProgramCounter`].
    pub fn offset(&self, offset: i32) -> Result<Self, InvalidOffset> {
        i32::from(self.0)
            .checked_add(offset)
            .and_then(|it| u16::try_from(it).ok())
            .map(Self)
            .ok_or(InvalidOffset::I32(offset))
    }

    /// Creates a new program counter based on the given value with a given offset (in [`i16`]).
    /// # Errors
    /// - [`InvalidOffset::I16`] If the resulting value is too large to fit into a [`ProgramCounter`].
    pub fn offset_i16(&self, offset: i16) -> Result<Self, InvalidOffset> {
        let result = i32::from(self.0) + i32::from(offset);
        u16::try_from(result)
            .map(Self)
            .map_err(|_| InvalidOffset::I16(offset))
    }

    /// Computes the signed distance from `self` to `target`.
    #[must_use]
    pub fn distance_to(&self, target: Self) -> i32 {
        i32::from(target.0) - i32::from(self.0)
    }

    /// Computes the signed distance from `self` to `target` as an [`i16`] branch offset.
    /// # Errors
    /// - [`InvalidOffset::I32`] If the distance does not fit into an [`i16`].
    pub fn distance_to_i16(&self, target: Self) -> Result<i16, InvalidOffset> {
        let distance = self.distance_to(target);
        i16::try_from(distance).map_err(|_| InvalidOffset::I32(distance))
    }
}

impl Display for ProgramCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:05}", self.0)
    }
}

impl From<u16> for ProgramCounter {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<ProgramCounter> for u16 {
    fn from(val: ProgramCounter) -> Self {
        val.0
    }
}

/// An error occurring when trying to offset a program counter.
#[derive(thiserror::Error, Debug)]
pub enum InvalidOffset {
    /// When the offset is given as an [`i16`].
    #[error("Invalid i16 offset {0}")]
    I16(i16),
    /// When the offset is given as an [`i32`].
    #[error("Invalid i32 offset {0}")]
    I32(i32),
}
