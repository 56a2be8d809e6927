//! Opaque identifiers used across the domain.
//!
//! Records are keyed either by a sequential integer or by a globally-unique
//! token, depending on how the backing store is configured. Domain code never
//! inspects which one it holds; it only compares, hashes and serializes.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Raw record identifier.
///
/// Serialized untagged: sequential ids as JSON numbers, tokens as strings.
/// Ordering puts all sequential ids before all tokens.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Sequential(u64),
    Token(Uuid),
}

impl RecordId {
    pub fn sequential(n: u64) -> Self {
        Self::Sequential(n)
    }

    /// Fresh globally-unique token (UUIDv7, time-ordered).
    pub fn token() -> Self {
        Self::Token(Uuid::now_v7())
    }

    pub fn as_sequence(&self) -> Option<u64> {
        match self {
            Self::Sequential(n) => Some(*n),
            Self::Token(_) => None,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential(n) => fmt::Display::fmt(n, f),
            Self::Token(uuid) => fmt::Display::fmt(uuid, f),
        }
    }
}

impl FromStr for RecordId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            return s
                .parse::<u64>()
                .map(Self::Sequential)
                .map_err(|e| DomainError::invalid_id(format!("{s}: {e}")));
        }
        Uuid::parse_str(s)
            .map(Self::Token)
            .map_err(|e| DomainError::invalid_id(format!("{s}: {e}")))
    }
}

impl From<Uuid> for RecordId {
    fn from(value: Uuid) -> Self {
        Self::Token(value)
    }
}

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        Self::Sequential(value)
    }
}

/// How a store allocates identifiers for new records.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum IdStrategy {
    /// `1, 2, 3, ...` continuing after the highest id already stored.
    #[default]
    Sequential,
    /// Time-ordered UUID tokens.
    Random,
}

impl FromStr for IdStrategy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" | "seq" => Ok(Self::Sequential),
            "random" | "uuid" | "token" => Ok(Self::Random),
            other => Err(DomainError::validation(format!(
                "unknown id strategy '{other}' (expected sequential or random)"
            ))),
        }
    }
}

/// Strongly-typed aggregate identifier backed by a [`RecordId`].
pub trait Identifier:
    Copy + Eq + Ord + core::hash::Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    fn from_record(id: RecordId) -> Self;

    fn record(&self) -> RecordId;
}

/// Declare a transparent newtype over [`RecordId`] implementing [`Identifier`].
#[macro_export]
macro_rules! record_id_newtype {
    ($(#[$meta:meta])* $vis:vis struct $t:ident;) => {
        $(#[$meta])*
        #[derive(
            Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash,
            ::serde::Serialize, ::serde::Deserialize,
        )]
        #[serde(transparent)]
        $vis struct $t(pub $crate::RecordId);

        impl $t {
            pub fn new(id: impl Into<$crate::RecordId>) -> Self {
                Self(id.into())
            }
        }

        impl $crate::Identifier for $t {
            fn from_record(id: $crate::RecordId) -> Self {
                Self(id)
            }

            fn record(&self) -> $crate::RecordId {
                self.0
            }
        }

        impl ::core::fmt::Display for $t {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl ::core::str::FromStr for $t {
            type Err = $crate::DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<$crate::RecordId>().map(Self)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_parse_as_sequential() {
        assert_eq!("42".parse::<RecordId>().unwrap(), RecordId::Sequential(42));
    }

    #[test]
    fn uuid_parses_as_token() {
        let uuid = Uuid::now_v7();
        assert_eq!(uuid.to_string().parse::<RecordId>().unwrap(), RecordId::Token(uuid));
    }

    #[test]
    fn garbage_is_invalid_id() {
        match "not-an-id".parse::<RecordId>() {
            Err(DomainError::InvalidId(_)) => {}
            other => panic!("expected InvalidId, got {other:?}"),
        }
        assert!("".parse::<RecordId>().is_err());
        assert!("99999999999999999999999".parse::<RecordId>().is_err());
    }

    #[test]
    fn serializes_untagged() {
        assert_eq!(serde_json::to_string(&RecordId::Sequential(7)).unwrap(), "7");

        let uuid = Uuid::now_v7();
        let json = serde_json::to_string(&RecordId::Token(uuid)).unwrap();
        assert_eq!(json, format!("\"{uuid}\""));
        assert_eq!(serde_json::from_str::<RecordId>(&json).unwrap(), RecordId::Token(uuid));
        assert_eq!(serde_json::from_str::<RecordId>("7").unwrap(), RecordId::Sequential(7));
    }

    #[test]
    fn sequential_sorts_before_tokens() {
        let mut ids = vec![RecordId::token(), RecordId::Sequential(10), RecordId::Sequential(2)];
        ids.sort();
        assert_eq!(ids[0], RecordId::Sequential(2));
        assert_eq!(ids[1], RecordId::Sequential(10));
        assert!(matches!(ids[2], RecordId::Token(_)));
    }

    #[test]
    fn id_strategy_parses_aliases() {
        assert_eq!("Sequential".parse::<IdStrategy>().unwrap(), IdStrategy::Sequential);
        assert_eq!("uuid".parse::<IdStrategy>().unwrap(), IdStrategy::Random);
        assert!("mongo".parse::<IdStrategy>().is_err());
    }

    record_id_newtype! {
        /// Test-only identifier.
        struct WidgetId;
    }

    #[test]
    fn newtype_round_trips_through_display() {
        let id = WidgetId::new(5u64);
        assert_eq!(id.to_string().parse::<WidgetId>().unwrap(), id);
        assert_eq!(WidgetId::from_record(id.record()), id);
    }
}
