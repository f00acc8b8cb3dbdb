//! Date-sequenced record identifiers and the allocator that hands them out.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of digits in the per-day sequence suffix.
const SEQUENCE_DIGITS: usize = 5;
/// Number of characters in the `YYYYMMDD` date segment.
const DATE_DIGITS: usize = 8;
const MAX_SEQUENCE: u32 = 99_999;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocationError {
    #[error("unknown identifier prefix: {0:?}")]
    UnknownPrefix(String),
    #[error("malformed identifier {0:?}: expected <PREFIX><YYYYMMDD><5 digits>")]
    MalformedId(String),
    #[error("sequence exhausted for {prefix} on {day}")]
    SequenceExhausted { prefix: IdPrefix, day: NaiveDate },
}

/// The record kind encoded at the front of every identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdPrefix {
    Char,
    Loc,
    Story,
}

impl IdPrefix {
    pub const ALL: [IdPrefix; 3] = [Self::Char, Self::Loc, Self::Story];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Char => "CHAR",
            Self::Loc => "LOC",
            Self::Story => "STORY",
        }
    }
}

impl fmt::Display for IdPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdPrefix {
    type Err = AllocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|prefix| prefix.as_str() == s)
            .ok_or_else(|| AllocationError::UnknownPrefix(s.to_string()))
    }
}

/// A record identifier of the form `<PREFIX><YYYY><MM><DD><SEQ5>`,
/// e.g. `CHAR2025010100003`.
///
/// Serialized as a bare string so persisted files stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

/// The decoded components of an [`Identifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdParts {
    pub prefix: IdPrefix,
    pub day: NaiveDate,
    pub sequence: u32,
}

impl Identifier {
    /// Assemble an identifier from its parts. Does not check for collisions;
    /// use [`allocate`] for that.
    pub fn compose(prefix: IdPrefix, day: NaiveDate, sequence: u32) -> Self {
        Self(format!(
            "{}{}{:05}",
            prefix.as_str(),
            day.format("%Y%m%d"),
            sequence
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the prefix, day, and sequence, failing on anything that does not
    /// follow the identifier layout exactly.
    pub fn parts(&self) -> Result<IdParts, AllocationError> {
        let malformed = || AllocationError::MalformedId(self.0.clone());

        let prefix = IdPrefix::ALL
            .into_iter()
            .find(|p| self.0.starts_with(p.as_str()))
            .ok_or_else(malformed)?;
        let rest = &self.0[prefix.as_str().len()..];
        if rest.len() != DATE_DIGITS + SEQUENCE_DIGITS || !rest.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(malformed());
        }

        let day = NaiveDate::parse_from_str(&rest[..DATE_DIGITS], "%Y%m%d")
            .map_err(|_| malformed())?;
        let sequence = rest[DATE_DIGITS..].parse().map_err(|_| malformed())?;

        Ok(IdParts {
            prefix,
            day,
            sequence,
        })
    }

    /// True if this identifier carries the given prefix.
    pub fn has_prefix(&self, prefix: IdPrefix) -> bool {
        self.parts().map(|p| p.prefix == prefix).unwrap_or(false)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Identifier {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Allocate the next identifier for `prefix` on `today`.
///
/// Only identifiers minted on the same day with the same prefix take part:
/// the new sequence is one past the highest of them, or 1 if there are none.
/// A same-day identifier whose sequence suffix is not exactly five digits is
/// treated as corruption and fails the allocation rather than being skipped.
pub fn allocate<'a, I>(
    prefix: IdPrefix,
    existing: I,
    today: NaiveDate,
) -> Result<Identifier, AllocationError>
where
    I: IntoIterator<Item = &'a str>,
{
    let day_prefix = format!("{}{}", prefix.as_str(), today.format("%Y%m%d"));

    let mut highest: Option<u32> = None;
    for id in existing {
        let Some(suffix) = id.strip_prefix(day_prefix.as_str()) else {
            continue;
        };
        if suffix.len() != SEQUENCE_DIGITS || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AllocationError::MalformedId(id.to_string()));
        }
        let seq: u32 = suffix
            .parse()
            .map_err(|_| AllocationError::MalformedId(id.to_string()))?;
        highest = Some(highest.map_or(seq, |h| h.max(seq)));
    }

    let sequence = match highest {
        None => 1,
        Some(h) if h >= MAX_SEQUENCE => {
            return Err(AllocationError::SequenceExhausted { prefix, day: today })
        }
        Some(h) => h + 1,
    };

    Ok(Identifier::compose(prefix, today, sequence))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn first_allocation_of_the_day_is_one() {
        let id = allocate(IdPrefix::Char, [], day(2025, 1, 1)).unwrap();
        assert_eq!(id.as_str(), "CHAR2025010100001");
    }

    #[test]
    fn allocation_is_one_past_the_maximum() {
        let existing = [
            "STORY2025030400002",
            "STORY2025030400007",
            "STORY2025030400003",
        ];
        let id = allocate(IdPrefix::Story, existing, day(2025, 3, 4)).unwrap();
        assert_eq!(id.as_str(), "STORY2025030400008");
    }

    #[test]
    fn other_days_and_prefixes_are_ignored() {
        let existing = [
            "LOC2025030300009",
            "CHAR2025030400004",
            "LOC2024030400005",
        ];
        let id = allocate(IdPrefix::Loc, existing, day(2025, 3, 4)).unwrap();
        assert_eq!(id.as_str(), "LOC2025030400001");
    }

    #[test]
    fn every_prefix_allocates() {
        for prefix in IdPrefix::ALL {
            let first = allocate(prefix, [], day(2025, 12, 31)).unwrap();
            let second = allocate(prefix, [first.as_str()], day(2025, 12, 31)).unwrap();
            assert_eq!(first.parts().unwrap().sequence, 1);
            assert_eq!(second.parts().unwrap().sequence, 2);
            assert_eq!(second.parts().unwrap().prefix, prefix);
        }
    }

    #[test]
    fn malformed_same_day_suffix_fails() {
        let existing = ["CHAR2025010100001", "CHAR202501010000X"];
        let err = allocate(IdPrefix::Char, existing, day(2025, 1, 1)).unwrap_err();
        assert_eq!(
            err,
            AllocationError::MalformedId("CHAR202501010000X".to_string())
        );
    }

    #[test]
    fn overlong_same_day_suffix_fails() {
        let existing = ["CHAR20250101000012"];
        assert!(matches!(
            allocate(IdPrefix::Char, existing, day(2025, 1, 1)),
            Err(AllocationError::MalformedId(_))
        ));
    }

    #[test]
    fn exhausted_sequence_fails() {
        let existing = ["LOC2025010199999"];
        assert!(matches!(
            allocate(IdPrefix::Loc, existing, day(2025, 1, 1)),
            Err(AllocationError::SequenceExhausted { .. })
        ));
    }

    #[test]
    fn unknown_prefix_is_rejected() {
        assert_eq!(
            "PLANET".parse::<IdPrefix>(),
            Err(AllocationError::UnknownPrefix("PLANET".to_string()))
        );
        assert_eq!("STORY".parse::<IdPrefix>(), Ok(IdPrefix::Story));
    }

    #[test]
    fn parts_decode() {
        let id = Identifier::from("STORY2025010101100");
        let parts = id.parts().unwrap();
        assert_eq!(parts.prefix, IdPrefix::Story);
        assert_eq!(parts.day, day(2025, 1, 1));
        assert_eq!(parts.sequence, 1100);
        assert!(id.has_prefix(IdPrefix::Story));
        assert!(!id.has_prefix(IdPrefix::Char));
    }

    #[test]
    fn parts_reject_bad_dates_and_lengths() {
        assert!(Identifier::from("CHAR2025133100001").parts().is_err());
        assert!(Identifier::from("CHAR20250101").parts().is_err());
        assert!(Identifier::from("Hero").parts().is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = Identifier::from("LOC2025010100002");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"LOC2025010100002\"");
    }
}
