//! Character sets and collations.
//!
//! Only the handful of collations the expression core needs to reason about:
//! whether comparisons fold case, and how text is encoded into bytes when it
//! is converted to a binary type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Character set of a text value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharacterSet {
    Utf8mb4,
    Latin1,
    Binary,
}

impl CharacterSet {
    /// Encode `s` into this character set. Characters that cannot be
    /// represented become `?`, which is what MySQL does on conversion.
    pub fn encode(&self, s: &str) -> Vec<u8> {
        match self {
            CharacterSet::Utf8mb4 | CharacterSet::Binary => s.as_bytes().to_vec(),
            CharacterSet::Latin1 => s
                .chars()
                .map(|c| if (c as u32) <= 0xFF { c as u32 as u8 } else { b'?' })
                .collect(),
        }
    }

    /// Maximum number of bytes a single character may take.
    pub fn max_length(&self) -> usize {
        match self {
            CharacterSet::Utf8mb4 => 4,
            CharacterSet::Latin1 | CharacterSet::Binary => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CharacterSet::Utf8mb4 => "utf8mb4",
            CharacterSet::Latin1 => "latin1",
            CharacterSet::Binary => "binary",
        }
    }
}

/// Collation attached to text types.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collation {
    #[default]
    Utf8mb4_0900_ai_ci,
    Utf8mb4_0900_bin,
    Utf8mb4_general_ci,
    Utf8mb4_bin,
    Latin1_swedish_ci,
    Latin1_bin,
    Binary,
}

impl Collation {
    pub fn character_set(&self) -> CharacterSet {
        match self {
            Collation::Utf8mb4_0900_ai_ci
            | Collation::Utf8mb4_0900_bin
            | Collation::Utf8mb4_general_ci
            | Collation::Utf8mb4_bin => CharacterSet::Utf8mb4,
            Collation::Latin1_swedish_ci | Collation::Latin1_bin => CharacterSet::Latin1,
            Collation::Binary => CharacterSet::Binary,
        }
    }

    pub fn is_case_insensitive(&self) -> bool {
        matches!(
            self,
            Collation::Utf8mb4_0900_ai_ci
                | Collation::Utf8mb4_general_ci
                | Collation::Latin1_swedish_ci
        )
    }

    /// Compare two strings under this collation.
    pub fn compare(&self, a: &str, b: &str) -> std::cmp::Ordering {
        if self.is_case_insensitive() {
            let a = a.trim_end_matches(' ').to_lowercase();
            let b = b.trim_end_matches(' ').to_lowercase();
            a.cmp(&b)
        } else if *self == Collation::Binary {
            a.as_bytes().cmp(b.as_bytes())
        } else {
            a.trim_end_matches(' ').cmp(b.trim_end_matches(' '))
        }
    }

    /// Key used when hashing strings under this collation; equal keys must
    /// compare equal with [`Collation::compare`].
    pub fn sort_key(&self, s: &str) -> String {
        if self.is_case_insensitive() {
            s.trim_end_matches(' ').to_lowercase()
        } else if *self == Collation::Binary {
            s.to_string()
        } else {
            s.trim_end_matches(' ').to_string()
        }
    }

    /// Look up a collation by its SQL name, ignoring case.
    pub fn from_name(name: &str) -> Option<Collation> {
        const ALL: [Collation; 7] = [
            Collation::Utf8mb4_0900_ai_ci,
            Collation::Utf8mb4_0900_bin,
            Collation::Utf8mb4_general_ci,
            Collation::Utf8mb4_bin,
            Collation::Latin1_swedish_ci,
            Collation::Latin1_bin,
            Collation::Binary,
        ];
        ALL.into_iter().find(|c| c.name().eq_ignore_ascii_case(name))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Collation::Utf8mb4_0900_ai_ci => "utf8mb4_0900_ai_ci",
            Collation::Utf8mb4_0900_bin => "utf8mb4_0900_bin",
            Collation::Utf8mb4_general_ci => "utf8mb4_general_ci",
            Collation::Utf8mb4_bin => "utf8mb4_bin",
            Collation::Latin1_swedish_ci => "latin1_swedish_ci",
            Collation::Latin1_bin => "latin1_bin",
            Collation::Binary => "binary",
        }
    }
}

impl fmt::Display for Collation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn test_case_insensitive_compare() {
        let c = Collation::Utf8mb4_0900_ai_ci;
        assert_eq!(c.compare("ABC", "abc"), Ordering::Equal);
        assert_eq!(c.compare("abc ", "abc"), Ordering::Equal);
        assert_eq!(c.compare("abc", "abd"), Ordering::Less);
    }

    #[test]
    fn test_binary_compare() {
        let c = Collation::Utf8mb4_0900_bin;
        assert_eq!(c.compare("ABC", "abc"), Ordering::Less);
        assert_eq!(Collation::Binary.compare("a ", "a"), Ordering::Greater);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Collation::from_name("utf8mb4_bin"), Some(Collation::Utf8mb4_bin));
        assert_eq!(
            Collation::from_name("UTF8MB4_General_CI"),
            Some(Collation::Utf8mb4_general_ci)
        );
        assert_eq!(Collation::from_name("utf8mb4_klingon_ci"), None);
    }

    #[test]
    fn test_latin1_encoding() {
        let cs = Collation::Latin1_swedish_ci.character_set();
        assert_eq!(cs.encode("caf\u{e9}"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(cs.encode("\u{4e2d}"), vec![b'?']);
        assert_eq!(CharacterSet::Utf8mb4.encode("\u{e9}"), vec![0xC3, 0xA9]);
    }
}
