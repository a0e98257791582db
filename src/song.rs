use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::normalization;

/// An ID in the catalog tables.
pub type SongId = i32;

/// A performer referenced by songs in the catalog.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Artist {
    /// The ID of the artist.
    pub id: SongId,

    /// The artist's name. Must be unique after normalization.
    pub name: String,
}

impl Artist {
    pub fn new(id: SongId, name: String) -> Self {
        Self { id, name }
    }
}

/// A request to create an artist.
#[derive(Clone, Debug, Deserialize)]
pub struct NewArtist {
    #[serde(deserialize_with = "normalization::deserialize")]
    pub name: String,
}

/// The blob-store keys attached to a song. Each is opaque to clients;
/// a usable URL only exists once the media gateway has signed it.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct SongFiles {
    /// The key of the cover image, if any.
    pub cover_image: Option<String>,

    /// The key of the full audio track, if any.
    pub audio_file: Option<String>,

    /// The key of the LRC lyric file, if any.
    pub lyric_file: Option<String>,
}

impl SongFiles {
    /// All present keys.
    pub fn keys(&self) -> Vec<&str> {
        [
            self.cover_image.as_deref(),
            self.audio_file.as_deref(),
            self.lyric_file.as_deref(),
        ]
        .iter()
        .flatten()
        .copied()
        .collect()
    }

    /// Pairs of (old, new) for each file-bearing attribute, used to find
    /// keys orphaned by a replacement.
    pub fn attribute_pairs<'a>(
        &'a self,
        new: &'a SongFiles,
    ) -> [(Option<&'a str>, Option<&'a str>); 3] {
        [
            (self.cover_image.as_deref(), new.cover_image.as_deref()),
            (self.audio_file.as_deref(), new.audio_file.as_deref()),
            (self.lyric_file.as_deref(), new.lyric_file.as_deref()),
        ]
    }
}

/// A single song in the catalog.
#[derive(Clone, Debug, Serialize)]
pub struct Song {
    /// The ID of the song.
    pub id: SongId,

    /// The title. Must be unique per artist after normalization.
    pub title: String,

    /// The artist who performs it.
    pub artist: Artist,

    /// The language the lyrics are in.
    pub language: String,

    /// The genre it falls into.
    pub genre: String,

    /// The length of the track in seconds.
    pub duration_seconds: i32,

    /// The blob-store keys attached to it.
    #[serde(flatten)]
    pub files: SongFiles,

    /// The times it was created and updated.
    #[serde(flatten)]
    pub times: Times,
}

/// A reduced view of a song used on list pages.
#[derive(Clone, Debug)]
pub struct SongSummary {
    pub id: SongId,
    pub title: String,
    pub artist_name: String,
    pub language: String,
    pub genre: String,
    pub duration_seconds: i32,
    pub cover_image: Option<String>,
}

/// The caller-supplied metadata for a song.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SongMetadata {
    /// The title provided.
    #[serde(deserialize_with = "normalization::deserialize")]
    pub title: String,

    /// The ID of the artist.
    pub artist_id: SongId,

    /// The language the lyrics are in.
    pub language: String,

    /// The genre it falls into.
    pub genre: String,

    /// The length of the track in seconds.
    pub duration_seconds: i32,
}

/// A song freshly inserted into the catalog, before any files are
/// attached.
#[derive(Clone, Debug)]
pub struct NewSong {
    /// The ID of the song.
    id: SongId,

    /// The times it was created and updated.
    times: Times,

    /// The caller-supplied metadata.
    metadata: SongMetadata,
}

impl NewSong {
    pub fn new(
        id: SongId,
        created_at: OffsetDateTime,
        updated_at: OffsetDateTime,
        metadata: SongMetadata,
    ) -> Self {
        NewSong {
            id,
            metadata,
            times: Times {
                created_at,
                updated_at,
            },
        }
    }

    pub fn id(&self) -> SongId {
        self.id
    }

    pub fn metadata(&self) -> &SongMetadata {
        &self.metadata
    }
}

/// Creation and modification times of a record.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Times {
    /// The date and time it was created.
    #[serde(with = "time::serde::timestamp")]
    pub created_at: OffsetDateTime,

    /// The date and time it was last modified.
    #[serde(with = "time::serde::timestamp")]
    pub updated_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::SongFiles;

    fn files(cover: Option<&str>, audio: Option<&str>, lyric: Option<&str>) -> SongFiles {
        SongFiles {
            cover_image: cover.map(String::from),
            audio_file: audio.map(String::from),
            lyric_file: lyric.map(String::from),
        }
    }

    #[test]
    fn keys_skips_missing_attributes() {
        assert!(files(None, None, None).keys().is_empty());
        assert_eq!(
            files(Some("a"), None, Some("c")).keys(),
            vec!["a", "c"]
        );
    }

    #[test]
    fn attribute_pairs_line_up() {
        let old = files(Some("cover-1"), Some("audio-1"), None);
        let new = files(Some("cover-2"), Some("audio-1"), Some("lyrics-1"));

        assert_eq!(
            old.attribute_pairs(&new),
            [
                (Some("cover-1"), Some("cover-2")),
                (Some("audio-1"), Some("audio-1")),
                (None, Some("lyrics-1")),
            ]
        );
    }
}
