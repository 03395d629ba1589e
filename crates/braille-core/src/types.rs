use crate::config::ConfigError;
use std::fmt;
use std::str::FromStr;

/// Braille dot index (1..=6).
pub type DotIndex = u8;

pub const MIN_DOT: DotIndex = 1;
pub const MAX_DOT: DotIndex = 6;

/// First code point of the Unicode Braille Patterns block.
const BRAILLE_BLANK: u32 = 0x2800;

pub const fn is_valid_dot(dot: DotIndex) -> bool {
    dot >= MIN_DOT && dot <= MAX_DOT
}

/// A set of distinct dots forming one Braille cell.
///
/// Stored as a 6-bit set (bit `n - 1` for dot `n`), so two patterns built
/// from the same dots in any order are equal and always print in ascending
/// numeric order ("125", never "251").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct DotPattern(u8);

impl DotPattern {
    pub const EMPTY: Self = Self(0);

    /// Builds a pattern from dots in any order. Duplicates are rejected.
    pub fn from_dots<I>(dots: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = DotIndex>,
    {
        let mut pattern = Self::EMPTY;
        for dot in dots {
            if !is_valid_dot(dot) {
                return Err(ConfigError::DotOutOfRange(dot));
            }
            if pattern.contains(dot) {
                return Err(ConfigError::InvalidPattern(format!(
                    "dot {} repeated",
                    dot
                )));
            }
            pattern = pattern.with(dot);
        }
        Ok(pattern)
    }

    /// Returns a copy with `dot` added. Out-of-range dots are ignored.
    pub const fn with(self, dot: DotIndex) -> Self {
        if is_valid_dot(dot) {
            Self(self.0 | 1 << (dot - 1))
        } else {
            self
        }
    }

    pub const fn contains(self, dot: DotIndex) -> bool {
        is_valid_dot(dot) && self.0 & (1 << (dot - 1)) != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Dots in ascending numeric order.
    pub fn dots(self) -> impl Iterator<Item = DotIndex> {
        (MIN_DOT..=MAX_DOT).filter(move |d| self.contains(*d))
    }

    /// The matching character from the Unicode Braille Patterns block
    /// (U+2800..U+283F). An empty pattern is the blank cell.
    pub fn to_braille_char(self) -> char {
        char::from_u32(BRAILLE_BLANK + self.0 as u32).unwrap_or(' ')
    }
}

impl fmt::Display for DotPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for dot in self.dots() {
            write!(f, "{}", dot)?;
        }
        Ok(())
    }
}

impl FromStr for DotPattern {
    type Err = ConfigError;

    /// Parses a pattern key such as "125". Digits may come in any order.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ConfigError::InvalidPattern(s.to_string()));
        }
        let mut dots = Vec::with_capacity(s.len());
        for c in s.chars() {
            let dot = c
                .to_digit(10)
                .ok_or_else(|| ConfigError::InvalidPattern(s.to_string()))?;
            dots.push(dot as DotIndex);
        }
        Self::from_dots(dots)
    }
}

/// What the session did with a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Not a chord key; the input surface may handle it.
    Pass,
    /// Consumed without changing the word (chord still open, unrecognized
    /// chord, stray release, backspace on an empty word).
    Block,
    /// A chord resolved and this character was appended.
    Commit(char),
    /// Backspace removed this character.
    Erase(char),
}
