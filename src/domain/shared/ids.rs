//! Identifier types shared across aggregates.
//!
//! Relational rows (users, posts, comments, replies) use auto-incrementing
//! `BIGINT` keys. Topics use a 12-byte globally ordered identifier: four
//! big-endian bytes of unix seconds, five random bytes fixed per process and
//! a three-byte wrapping counter. At the HTTP boundary it is rendered as a
//! 24-character lowercase hex string.

use super::errors::DomainError;
use chrono::{DateTime, TimeZone, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

/// User identifier.
pub type ActorId = i64;

lazy_static! {
    static ref PROCESS_UNIQUE: [u8; 5] = rand::random::<[u8; 5]>();
    static ref COUNTER: AtomicU32 = AtomicU32::new(rand::random::<u32>() & 0x00ff_ffff);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicId([u8; 12]);

impl TopicId {
    pub fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    pub fn generate_at(at: DateTime<Utc>) -> Self {
        let secs = at.timestamp().clamp(0, u32::MAX as i64) as u32;
        let count = COUNTER.fetch_add(1, Ordering::Relaxed) & 0x00ff_ffff;

        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&*PROCESS_UNIQUE);
        bytes[9..12].copy_from_slice(&count.to_be_bytes()[1..4]);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> [u8; 12] {
        self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn parse_hex(raw: &str) -> Result<Self, DomainError> {
        let raw = raw.trim();
        if raw.len() != 24 {
            return Err(DomainError::ValidationError(format!(
                "invalid topic id: {raw}"
            )));
        }
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(raw, &mut bytes)
            .map_err(|_| DomainError::ValidationError(format!("invalid topic id: {raw}")))?;
        Ok(Self(bytes))
    }

    /// Creation time embedded in the identifier.
    pub fn timestamp(&self) -> DateTime<Utc> {
        let secs = u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]]);
        Utc.timestamp_opt(secs as i64, 0)
            .single()
            .unwrap_or_default()
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for TopicId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s)
    }
}

impl Serialize for TopicId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for TopicId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse_hex(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip_keeps_24_chars() {
        let id = TopicId::generate();
        let hex = id.to_hex();
        assert_eq!(hex.len(), 24);
        assert_eq!(TopicId::parse_hex(&hex).unwrap(), id);
    }

    #[test]
    fn ids_are_ordered_by_creation_time() {
        let early = TopicId::generate_at(Utc.timestamp_opt(1_700_000_000, 0).unwrap());
        let late = TopicId::generate_at(Utc.timestamp_opt(1_700_000_100, 0).unwrap());
        assert!(early < late);
        assert_eq!(early.timestamp().timestamp(), 1_700_000_000);
    }

    #[test]
    fn ids_generated_in_the_same_second_differ() {
        let at = Utc::now();
        assert_ne!(TopicId::generate_at(at), TopicId::generate_at(at));
    }

    #[test]
    fn rejects_malformed_hex() {
        assert!(TopicId::parse_hex("abc").is_err());
        assert!(TopicId::parse_hex("zzzzzzzzzzzzzzzzzzzzzzzz").is_err());
    }
}
