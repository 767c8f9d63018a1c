#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Wire and persisted record types for the data-flux ingestion pipeline.
//!
//! The paginated API serves one of three record kinds ([`User`], [`Track`],
//! [`ListenHistory`]) wrapped in a [`PageEnvelope`]. Once validated, each
//! record is stamped with the pipeline version that produced it and becomes
//! a [`PersistedRecord`].

use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// The API endpoints the ingestion pipeline knows how to process.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    /// `/users`
    #[serde(alias = "/users")]
    #[strum(to_string = "users", serialize = "/users")]
    Users,
    /// `/tracks`
    #[serde(alias = "/tracks")]
    #[strum(to_string = "tracks", serialize = "/tracks")]
    Tracks,
    /// `/listen_history`
    #[serde(alias = "/listen_history")]
    #[strum(to_string = "listen_history", serialize = "/listen_history")]
    ListenHistory,
}

impl Endpoint {
    /// Returns the URL path served by this endpoint (e.g. `"/users"`).
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Users => "/users",
            Self::Tracks => "/tracks",
            Self::ListenHistory => "/listen_history",
        }
    }

    /// Returns the kind of record this endpoint pages through.
    #[must_use]
    pub const fn record_kind(self) -> RecordKind {
        match self {
            Self::Users => RecordKind::User,
            Self::Tracks => RecordKind::Track,
            Self::ListenHistory => RecordKind::ListenHistory,
        }
    }
}

/// Discriminant for the three record variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecordKind {
    /// A [`User`] record.
    User,
    /// A [`Track`] record.
    Track,
    /// A [`ListenHistory`] record.
    ListenHistory,
}

impl RecordKind {
    /// Every kind, in structural-matching precedence order.
    pub const ALL: [Self; 3] = [Self::User, Self::Track, Self::ListenHistory];
}

/// A user as served by `/users`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier. Always positive.
    pub id: u64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub gender: Option<String>,
    /// Free-text genre list, not split.
    pub favorite_genres: Option<String>,
    /// Opaque creation timestamp.
    pub created_at: Option<String>,
    /// Opaque last-update timestamp.
    pub updated_at: Option<String>,
}

/// A music track as served by `/tracks`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Unique track identifier. Always positive.
    pub id: u64,
    pub name: Option<String>,
    pub artist: Option<String>,
    pub songwriters: Option<String>,
    /// Free-text duration (e.g. `"3:45"`), not parsed.
    pub duration: Option<String>,
    pub genres: Option<String>,
    pub album: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// A user's listen history as served by `/listen_history`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenHistory {
    /// The user this history belongs to. Always positive.
    pub user_id: u64,
    /// Track ids in listen order. An empty list is valid.
    pub items: Option<Vec<u64>>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// One validated record extracted from a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Record {
    User(User),
    Track(Track),
    ListenHistory(ListenHistory),
}

impl Record {
    /// Returns the variant discriminant.
    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        match self {
            Self::User(_) => RecordKind::User,
            Self::Track(_) => RecordKind::Track,
            Self::ListenHistory(_) => RecordKind::ListenHistory,
        }
    }
}

impl From<User> for Record {
    fn from(value: User) -> Self {
        Self::User(value)
    }
}

impl From<Track> for Record {
    fn from(value: Track) -> Self {
        Self::Track(value)
    }
}

impl From<ListenHistory> for Record {
    fn from(value: ListenHistory) -> Self {
        Self::ListenHistory(value)
    }
}

/// One validated page of API results.
///
/// `items` is never empty: an envelope without items fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageEnvelope {
    /// Count of all records across all pages.
    pub total: u64,
    /// 1-based page number.
    pub page: u64,
    /// Requested page size.
    pub size: u64,
    /// Total page count as reported by the source.
    pub pages: u64,
    pub items: Vec<Record>,
}

/// A [`User`] stamped with the pipeline version that ingested it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub version_id: NonZeroU64,
    pub id: u64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub gender: Option<String>,
    pub favorite_genres: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// A [`Track`] stamped with the pipeline version that ingested it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackData {
    pub version_id: NonZeroU64,
    pub id: u64,
    pub name: Option<String>,
    pub artist: Option<String>,
    pub songwriters: Option<String>,
    pub duration: Option<String>,
    pub genres: Option<String>,
    pub album: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// A [`ListenHistory`] stamped with the pipeline version that ingested it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenHistoryData {
    pub version_id: NonZeroU64,
    pub user_id: u64,
    pub items: Option<Vec<u64>>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// A record ready for storage.
///
/// Only produced by the record mapper, never directly from wire data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PersistedRecord {
    User(UserData),
    Track(TrackData),
    ListenHistory(ListenHistoryData),
}

impl PersistedRecord {
    /// Returns the pipeline version this record was stamped with.
    #[must_use]
    pub const fn version_id(&self) -> NonZeroU64 {
        match self {
            Self::User(data) => data.version_id,
            Self::Track(data) => data.version_id,
            Self::ListenHistory(data) => data.version_id,
        }
    }
}
