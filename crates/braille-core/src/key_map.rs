use crate::config::ConfigError;
use crate::types::{is_valid_dot, DotIndex};
use std::collections::HashMap;

/// Six-key entry: left hand D W Q for dots 1 2 3, right hand K O P for
/// dots 4 5 6.
pub const DEFAULT_KEY_MAP: &[(&str, DotIndex)] = &[
    ("d", 1),
    ("w", 2),
    ("q", 3),
    ("k", 4),
    ("o", 5),
    ("p", 6),
];

/// Named key that erases the last character. It can never be a chord key.
pub const BACKSPACE_KEY: &str = "backspace";

/// Key identifiers are compared case-insensitively ("D" and "d" are the
/// same physical key, "Backspace" and "backspace" the same named key).
pub fn normalize_key(raw: &str) -> String {
    raw.to_lowercase()
}

/// Injective mapping from chord keys to dot indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyToDotMap {
    map: HashMap<String, DotIndex>,
}

impl Default for KeyToDotMap {
    fn default() -> Self {
        Self {
            map: DEFAULT_KEY_MAP
                .iter()
                .map(|(k, d)| (k.to_string(), *d))
                .collect(),
        }
    }
}

impl KeyToDotMap {
    pub fn from_pairs<I, K>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, DotIndex)>,
        K: AsRef<str>,
    {
        let mut map = HashMap::new();
        let mut by_dot: HashMap<DotIndex, String> = HashMap::new();

        for (raw, dot) in pairs {
            let key = normalize_key(raw.as_ref());
            if key.is_empty() {
                return Err(ConfigError::EmptyKey);
            }
            if key == BACKSPACE_KEY {
                return Err(ConfigError::ReservedKey(key));
            }
            if !is_valid_dot(dot) {
                return Err(ConfigError::DotOutOfRange(dot));
            }
            if map.contains_key(&key) {
                return Err(ConfigError::DuplicateKey(key));
            }
            if let Some(first) = by_dot.get(&dot) {
                return Err(ConfigError::DuplicateDot {
                    dot,
                    first: first.clone(),
                    second: key,
                });
            }
            by_dot.insert(dot, key.clone());
            map.insert(key, dot);
        }

        Ok(Self { map })
    }

    /// Dot for a raw key identifier, or `None` for keys that take no part
    /// in chording (modifiers, navigation, other letters).
    pub fn map_key(&self, raw: &str) -> Option<DotIndex> {
        self.get(&normalize_key(raw))
    }

    /// Lookup for an identifier that is already normalized.
    pub(crate) fn get(&self, key: &str) -> Option<DotIndex> {
        self.map.get(key).copied()
    }

    pub fn key_for_dot(&self, dot: DotIndex) -> Option<&str> {
        self.map
            .iter()
            .find(|(_, d)| **d == dot)
            .map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
