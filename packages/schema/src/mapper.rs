//! Converts validated wire records into persisted records.
//!
//! Mapping is total: every [`Record`] variant has exactly one mapping
//! function and dispatch is an exhaustive `match`, so a new variant without
//! a mapper does not compile.

use std::num::NonZeroU64;

use data_flux_schema_models::{
    ListenHistory, ListenHistoryData, PersistedRecord, Record, Track, TrackData, User, UserData,
};

/// Stamps a [`User`] with `version_id`.
#[must_use]
pub fn map_user(user: &User, version_id: NonZeroU64) -> UserData {
    UserData {
        version_id,
        id: user.id,
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        email: user.email.clone(),
        gender: user.gender.clone(),
        favorite_genres: user.favorite_genres.clone(),
        created_at: user.created_at.clone(),
        updated_at: user.updated_at.clone(),
    }
}

/// Stamps a [`Track`] with `version_id`.
#[must_use]
pub fn map_track(track: &Track, version_id: NonZeroU64) -> TrackData {
    TrackData {
        version_id,
        id: track.id,
        name: track.name.clone(),
        artist: track.artist.clone(),
        songwriters: track.songwriters.clone(),
        duration: track.duration.clone(),
        genres: track.genres.clone(),
        album: track.album.clone(),
        created_at: track.created_at.clone(),
        updated_at: track.updated_at.clone(),
    }
}

/// Stamps a [`ListenHistory`] with `version_id`.
#[must_use]
pub fn map_listen_history(history: &ListenHistory, version_id: NonZeroU64) -> ListenHistoryData {
    ListenHistoryData {
        version_id,
        user_id: history.user_id,
        items: history.items.clone(),
        created_at: history.created_at.clone(),
        updated_at: history.updated_at.clone(),
    }
}

/// Maps any [`Record`] to its persisted form.
#[must_use]
pub fn map(record: &Record, version_id: NonZeroU64) -> PersistedRecord {
    match record {
        Record::User(user) => PersistedRecord::User(map_user(user, version_id)),
        Record::Track(track) => PersistedRecord::Track(map_track(track, version_id)),
        Record::ListenHistory(history) => {
            PersistedRecord::ListenHistory(map_listen_history(history, version_id))
        }
    }
}

/// Maps a slice of records in order.
#[must_use]
pub fn map_all(records: &[Record], version_id: NonZeroU64) -> Vec<PersistedRecord> {
    records.iter().map(|record| map(record, version_id)).collect()
}
