use serde::Serialize;
use warp::reject;

use crate::errors::BackendError;

#[derive(Debug)]
pub struct Rejection {
    pub(crate) context: Context,
    pub(crate) error: BackendError,
}

impl Rejection {
    pub fn new(context: Context, error: BackendError) -> Self {
        Rejection { context, error }
    }

    pub fn flatten(&self) -> FlattenedRejection {
        FlattenedRejection {
            context: self.context.clone(),
            message: format!("{}", self.error),
        }
    }
}

impl reject::Reject for Rejection {}

#[derive(Debug, Serialize)]
pub struct FlattenedRejection {
    #[serde(flatten)]
    pub(crate) context: Context,
    pub(crate) message: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Context {
    Artists {},
    ClearLyrics { id: String },
    CreateArtist {},
    CreateRecording {},
    CreateSong {},
    DeleteRecording { id: String },
    DeleteSong { id: String },
    Identity {},
    Media { key: String },
    Recordings {},
    ReplaceRecordingAudio { id: String },
    RetrieveSong { id: String },
    Songs {},
    UpdateSong { id: String },
}

impl Context {
    pub fn artists() -> Context {
        Context::Artists {}
    }

    pub fn clear_lyrics(id: String) -> Context {
        Context::ClearLyrics { id }
    }

    pub fn create_artist() -> Context {
        Context::CreateArtist {}
    }

    pub fn create_recording() -> Context {
        Context::CreateRecording {}
    }

    pub fn create_song() -> Context {
        Context::CreateSong {}
    }

    pub fn delete_recording(id: String) -> Context {
        Context::DeleteRecording { id }
    }

    pub fn delete_song(id: String) -> Context {
        Context::DeleteSong { id }
    }

    pub fn identity() -> Context {
        Context::Identity {}
    }

    pub fn media(key: String) -> Context {
        Context::Media { key }
    }

    pub fn recordings() -> Context {
        Context::Recordings {}
    }

    pub fn replace_recording_audio(id: String) -> Context {
        Context::ReplaceRecordingAudio { id }
    }

    pub fn retrieve_song(id: String) -> Context {
        Context::RetrieveSong { id }
    }

    pub fn songs() -> Context {
        Context::Songs {}
    }

    pub fn update_song(id: String) -> Context {
        Context::UpdateSong { id }
    }
}
