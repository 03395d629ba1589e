use crate::types::DotPattern;

/// The word being typed and, index for index, the pattern that produced each
/// of its characters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordBuffer {
    word: String,
    history: Vec<DotPattern>,
}

impl WordBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, ch: char, pattern: DotPattern) {
        self.word.push(ch);
        self.history.push(pattern);
        debug_assert_eq!(self.word.chars().count(), self.history.len());
    }

    /// Removes the last character together with its pattern.
    pub fn backspace(&mut self) -> Option<(char, DotPattern)> {
        match (self.word.pop(), self.history.pop()) {
            (Some(ch), Some(pattern)) => Some((ch, pattern)),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.word.clear();
        self.history.clear();
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn history(&self) -> &[DotPattern] {
        &self.history
    }

    /// History as pattern keys ("125", "24", ...).
    pub fn history_keys(&self) -> Vec<String> {
        self.history.iter().map(DotPattern::to_string).collect()
    }

    /// Number of characters (equal to the number of patterns).
    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> DotPattern {
        s.parse().unwrap()
    }

    #[test]
    fn test_append() {
        let mut buf = WordBuffer::new();
        buf.append('b', p("12"));
        assert_eq!(buf.word(), "b");
        assert_eq!(buf.history_keys(), vec!["12"]);
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn test_backspace_down_to_empty() {
        let mut buf = WordBuffer::new();
        buf.append('h', p("125"));
        buf.append('i', p("24"));

        assert_eq!(buf.backspace(), Some(('i', p("24"))));
        assert_eq!(buf.word(), "h");
        assert_eq!(buf.history_keys(), vec!["125"]);

        assert_eq!(buf.backspace(), Some(('h', p("125"))));
        assert_eq!(buf.word(), "");
        assert!(buf.history().is_empty());

        // no-op on empty
        assert_eq!(buf.backspace(), None);
        assert!(buf.is_empty());
        assert_eq!(buf.word(), "");
    }

    #[test]
    fn test_clear() {
        let mut buf = WordBuffer::new();
        buf.append('a', p("1"));
        buf.append('b', p("12"));
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.word(), "");
        assert!(buf.history_keys().is_empty());
        buf.clear();
        assert!(buf.is_empty());
    }

    #[test]
    fn test_lengths_stay_aligned() {
        let mut buf = WordBuffer::new();
        for (i, (key, c)) in crate::dot_table::ALPHABET.iter().enumerate() {
            buf.append(c.to_ascii_lowercase(), p(key));
            assert_eq!(buf.word().chars().count(), buf.history().len());
            if i % 3 == 2 {
                buf.backspace();
                assert_eq!(buf.word().chars().count(), buf.history().len());
            }
        }
    }
}
