use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

// Eight digits are tried before six so `RJ01234567` keeps all of its digits.
static WORK_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([RBV])J([0-9]{8}|[0-9]{6})").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WorkPrefix {
    Rj,
    Bj,
    Vj,
}

impl WorkPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkPrefix::Rj => "RJ",
            WorkPrefix::Bj => "BJ",
            WorkPrefix::Vj => "VJ",
        }
    }

    fn from_letter(letter: &str) -> Option<Self> {
        match letter {
            "R" | "r" => Some(WorkPrefix::Rj),
            "B" | "b" => Some(WorkPrefix::Bj),
            "V" | "v" => Some(WorkPrefix::Vj),
            _ => None,
        }
    }
}

/// Canonical catalog identifier: `RJ`/`BJ`/`VJ` followed by 6 or 8 digits.
///
/// Digits are kept verbatim, so `RJ123456` and `RJ00123456` are distinct
/// identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkNumber {
    prefix: WorkPrefix,
    digits: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a work number: {0:?}")]
pub struct InvalidWorkNumber(pub String);

impl WorkNumber {
    /// Finds the leftmost work number anywhere in `name`.
    ///
    /// Surrounding text is ignored. Returns `None` when the name carries no
    /// work number, which is the normal case for non-library folders.
    pub fn extract(name: &str) -> Option<Self> {
        let caps = WORK_NUMBER_RE.captures(name)?;
        let prefix = WorkPrefix::from_letter(caps.get(1)?.as_str())?;
        Some(Self {
            prefix,
            digits: caps.get(2)?.as_str().to_string(),
        })
    }

    pub fn prefix(&self) -> WorkPrefix {
        self.prefix
    }

    pub fn digits(&self) -> &str {
        &self.digits
    }
}

impl FromStr for WorkNumber {
    type Err = InvalidWorkNumber;

    /// Strict parse: the whole string must be a single work number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match Self::extract(trimmed) {
            Some(work) if work.to_string().len() == trimmed.len() => Ok(work),
            _ => Err(InvalidWorkNumber(s.to_string())),
        }
    }
}

impl fmt::Display for WorkNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix.as_str(), self.digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn extract(name: &str) -> Option<String> {
        WorkNumber::extract(name).map(|w| w.to_string())
    }

    #[test]
    fn finds_number_anywhere_in_name() {
        assert_eq!(extract("RJ123456"), Some("RJ123456".into()));
        assert_eq!(extract("[サークル] 作品名 (RJ123456)"), Some("RJ123456".into()));
        assert_eq!(extract("RJ01234567 癒し系"), Some("RJ01234567".into()));
        assert_eq!(extract("foo_BJ654321_bar"), Some("BJ654321".into()));
        assert_eq!(extract("VJ012345"), Some("VJ012345".into()));
    }

    #[test]
    fn prefix_is_normalized_to_uppercase() {
        assert_eq!(extract("rj123456"), Some("RJ123456".into()));
        assert_eq!(extract("Bj00112233 extra"), Some("BJ00112233".into()));
    }

    #[test]
    fn leading_zeros_are_kept() {
        let work = WorkNumber::extract("RJ00012345").unwrap();
        assert_eq!(work.digits(), "00012345");
        assert_eq!(work.prefix(), WorkPrefix::Rj);
    }

    #[test]
    fn leftmost_match_wins() {
        assert_eq!(extract("RJ222222 (old RJ111111)"), Some("RJ222222".into()));
        assert_eq!(extract("VJ333333 RJ01234567"), Some("VJ333333".into()));
    }

    #[test]
    fn seven_digit_run_keeps_leading_six() {
        assert_eq!(extract("RJ1234567"), Some("RJ123456".into()));
    }

    #[test]
    fn names_without_a_number_are_misses() {
        assert_eq!(extract("Music"), None);
        assert_eq!(extract("RJ12345"), None);
        assert_eq!(extract("XJ123456"), None);
        assert_eq!(extract("RJ１２３４５６"), None);
        assert_eq!(extract(""), None);
    }

    #[test]
    fn six_and_eight_digit_forms_are_distinct() {
        let short = WorkNumber::extract("RJ123456").unwrap();
        let long = WorkNumber::extract("RJ00123456").unwrap();
        assert_ne!(short, long);
    }

    #[test]
    fn strict_parse_rejects_surrounding_text() {
        assert_eq!("rj123456".parse::<WorkNumber>().unwrap().to_string(), "RJ123456");
        assert!("RJ123456 extra".parse::<WorkNumber>().is_err());
        assert!("RJ1234567".parse::<WorkNumber>().is_err());
    }
}
