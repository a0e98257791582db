use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::song::SongId;

/// A user's voice recording of a song. The audio key is private to the
/// owner; the gateway refuses to sign it for anyone else.
#[derive(Clone, Debug, Serialize)]
pub struct Recording {
    /// The ID of the recording.
    pub id: Uuid,

    /// The user who made it.
    pub user_id: Uuid,

    /// The song it was recorded against.
    pub song_id: SongId,

    /// The title of that song.
    pub song_title: String,

    /// The blob-store key of the audio, once uploaded.
    pub audio_file: Option<String>,

    /// The length of the take in seconds, if the client reported it.
    pub duration_seconds: Option<i32>,

    /// The date and time it was created.
    #[serde(with = "time::serde::timestamp")]
    pub created_at: OffsetDateTime,
}

/// The metadata for a single recording upload.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RecordingMetadata {
    /// The ID of the song the take was recorded against.
    pub song_id: SongId,

    /// The length of the take in seconds, if known.
    #[serde(default)]
    pub duration_seconds: Option<i32>,
}

/// A recording row freshly inserted, before its audio is attached.
#[derive(Clone, Debug)]
pub struct NewRecording {
    /// The ID of the recording.
    id: Uuid,

    /// The date and time it was created.
    created_at: OffsetDateTime,

    /// The user-submitted metadata.
    metadata: RecordingMetadata,
}

impl NewRecording {
    pub fn new(id: Uuid, created_at: OffsetDateTime, metadata: RecordingMetadata) -> Self {
        NewRecording {
            id,
            created_at,
            metadata,
        }
    }

    pub fn id(&self) -> &Uuid {
        &self.id
    }

    pub fn metadata(&self) -> &RecordingMetadata {
        &self.metadata
    }
}
