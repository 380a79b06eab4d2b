use crate::domain::shared::{
    errors::DomainError,
    ids::{ActorId, TopicId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

/// The kind of relationship an actor holds with a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum EngagementKind {
    Like,
    Dislike,
    Favourite,
    Follow,
}

impl EngagementKind {
    pub const ALL: [EngagementKind; 4] = [Self::Like, Self::Dislike, Self::Favourite, Self::Follow];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Dislike => "dislike",
            Self::Favourite => "favourite",
            Self::Follow => "follow",
        }
    }

    /// The kind that cannot coexist with this one on the same target.
    pub fn opposing(&self) -> Option<EngagementKind> {
        match self {
            Self::Like => Some(Self::Dislike),
            Self::Dislike => Some(Self::Like),
            Self::Favourite | Self::Follow => None,
        }
    }
}

impl fmt::Display for EngagementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngagementKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(Self::Like),
            "dislike" => Ok(Self::Dislike),
            "favourite" => Ok(Self::Favourite),
            "follow" => Ok(Self::Follow),
            other => Err(DomainError::ValidationError(format!(
                "unknown engagement kind: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum TargetKind {
    Post,
    Comment,
    Reply,
    Topic,
    User,
}

impl TargetKind {
    pub const ALL: [TargetKind; 5] = [
        Self::Post,
        Self::Comment,
        Self::Reply,
        Self::Topic,
        Self::User,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
            Self::Reply => "reply",
            Self::Topic => "topic",
            Self::User => "user",
        }
    }

    /// Engagement kinds this target accepts.
    pub fn supported(&self) -> &'static [EngagementKind] {
        match self {
            Self::Post => &[EngagementKind::Like, EngagementKind::Favourite],
            Self::Comment | Self::Reply | Self::Topic => {
                &[EngagementKind::Like, EngagementKind::Dislike]
            }
            Self::User => &[EngagementKind::Follow],
        }
    }

    pub fn supports(&self, kind: EngagementKind) -> bool {
        self.supported().contains(&kind)
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(Self::Post),
            "comment" => Ok(Self::Comment),
            "reply" => Ok(Self::Reply),
            "topic" => Ok(Self::Topic),
            "user" => Ok(Self::User),
            other => Err(DomainError::ValidationError(format!(
                "unknown target kind: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetId {
    Numeric(i64),
    Object(TopicId),
}

impl TargetId {
    /// Textual key used for storage and logging.
    pub fn key(&self) -> String {
        match self {
            Self::Numeric(id) => id.to_string(),
            Self::Object(id) => id.to_hex(),
        }
    }

    pub fn as_numeric(&self) -> Option<i64> {
        match self {
            Self::Numeric(id) => Some(*id),
            Self::Object(_) => None,
        }
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Reference to an engageable entity.
///
/// Constructors pair topic targets with object ids and every other kind with
/// numeric ids; `parse` applies the same rule to raw input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetRef {
    pub kind: TargetKind,
    pub id: TargetId,
}

impl TargetRef {
    pub fn post(id: i64) -> Self {
        Self::numeric(TargetKind::Post, id)
    }

    pub fn comment(id: i64) -> Self {
        Self::numeric(TargetKind::Comment, id)
    }

    pub fn reply(id: i64) -> Self {
        Self::numeric(TargetKind::Reply, id)
    }

    pub fn user(id: ActorId) -> Self {
        Self::numeric(TargetKind::User, id)
    }

    pub fn topic(id: TopicId) -> Self {
        Self {
            kind: TargetKind::Topic,
            id: TargetId::Object(id),
        }
    }

    fn numeric(kind: TargetKind, id: i64) -> Self {
        Self {
            kind,
            id: TargetId::Numeric(id),
        }
    }

    /// Rebuilds a reference from its stored `(kind, key)` pair.
    pub fn parse(kind: TargetKind, key: &str) -> Result<Self, DomainError> {
        match kind {
            TargetKind::Topic => Ok(Self::topic(TopicId::parse_hex(key)?)),
            _ => key
                .parse::<i64>()
                .map(|id| Self::numeric(kind, id))
                .map_err(|_| DomainError::ValidationError(format!("invalid {kind} id: {key}"))),
        }
    }

    pub fn key(&self) -> String {
        self.id.key()
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngagementRecord {
    pub actor: ActorId,
    pub target: TargetRef,
    pub kind: EngagementKind,
    pub created_at: DateTime<Utc>,
}

impl EngagementRecord {
    pub fn new(actor: ActorId, target: TargetRef, kind: EngagementKind) -> Self {
        Self {
            actor,
            target,
            kind,
            created_at: Utc::now(),
        }
    }
}

/// Which engagements a given actor currently holds on a target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EngagementStatus {
    pub liked: bool,
    pub disliked: bool,
    pub favourited: bool,
    pub following: bool,
}

impl EngagementStatus {
    pub fn set(&mut self, kind: EngagementKind, held: bool) {
        match kind {
            EngagementKind::Like => self.liked = held,
            EngagementKind::Dislike => self.disliked = held,
            EngagementKind::Favourite => self.favourited = held,
            EngagementKind::Follow => self.following = held,
        }
    }
}

/// Denormalized counters of a target; kinds the target does not support stay 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EngagementCounts {
    pub likes: i64,
    pub dislikes: i64,
    pub favourites: i64,
    pub followers: i64,
}

impl EngagementCounts {
    pub fn set(&mut self, kind: EngagementKind, value: i64) {
        match kind {
            EngagementKind::Like => self.likes = value,
            EngagementKind::Dislike => self.dislikes = value,
            EngagementKind::Favourite => self.favourites = value,
            EngagementKind::Follow => self.followers = value,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// An opposing record existed and was removed in the same write.
    pub cleared_opposing: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub orphans_removed: u64,
    pub counters_fixed: u64,
}
