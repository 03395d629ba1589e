use crate::config::ConfigError;
use crate::types::{DotIndex, DotPattern};
use std::collections::HashMap;

/// English Braille alphabet, grade 1.
pub const ALPHABET: &[(&str, char)] = &[
    ("1", 'A'),
    ("12", 'B'),
    ("14", 'C'),
    ("145", 'D'),
    ("15", 'E'),
    ("124", 'F'),
    ("1245", 'G'),
    ("125", 'H'),
    ("24", 'I'),
    ("245", 'J'),
    ("13", 'K'),
    ("123", 'L'),
    ("134", 'M'),
    ("1345", 'N'),
    ("135", 'O'),
    ("1234", 'P'),
    ("12345", 'Q'),
    ("1235", 'R'),
    ("234", 'S'),
    ("2345", 'T'),
    ("136", 'U'),
    ("1236", 'V'),
    ("2456", 'W'),
    ("1346", 'X'),
    ("13456", 'Y'),
    ("1356", 'Z'),
];

lazy_static::lazy_static! {
    static ref BRAILLE_ALPHABET: DotPatternTable = DotPatternTable {
        map: ALPHABET
            .iter()
            .filter_map(|(key, c)| key.parse::<DotPattern>().ok().map(|p| (p, *c)))
            .collect(),
    };
}

/// Exact-match table from a dot pattern to the character it spells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotPatternTable {
    map: HashMap<DotPattern, char>,
}

impl Default for DotPatternTable {
    fn default() -> Self {
        Self::alphabet().clone()
    }
}

impl DotPatternTable {
    pub fn alphabet() -> &'static DotPatternTable {
        &BRAILLE_ALPHABET
    }

    pub fn from_entries<I, K>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, char)>,
        K: AsRef<str>,
    {
        let mut map = HashMap::new();
        for (key, c) in entries {
            let pattern: DotPattern = key.as_ref().parse()?;
            if map.insert(pattern, c).is_some() {
                return Err(ConfigError::DuplicatePattern(pattern.to_string()));
            }
        }
        Ok(Self { map })
    }

    /// Raw table entry for the pattern (upper case for the alphabet).
    pub fn lookup(&self, pattern: DotPattern) -> Option<char> {
        self.map.get(&pattern).copied()
    }

    /// Decoded (lower case) character for the pattern.
    pub fn decode_pattern(&self, pattern: DotPattern) -> Option<char> {
        self.lookup(pattern).map(|c| c.to_ascii_lowercase())
    }

    /// Decodes an unordered set of dots. A set with no exact entry, or with
    /// repeated or out-of-range dots, yields `None`.
    pub fn decode<I>(&self, dots: I) -> Option<char>
    where
        I: IntoIterator<Item = DotIndex>,
    {
        let pattern = DotPattern::from_dots(dots).ok()?;
        self.decode_pattern(pattern)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
