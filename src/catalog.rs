//! Application-level catalog operations.
//!
//! Everything that couples a record write to a side effect — lyric
//! re-derivation, blob garbage collection — happens here, in plain
//! sight of the caller, instead of being fired from persistence hooks.
//! Route handlers call these; so would any future admin surface.

use uuid::Uuid;

use log::debug;

use crate::environment::{Environment, SafeStore};
use crate::errors::BackendError;
use crate::identity::Identity;
use crate::io::{FilePart, RecordingUpload, SongPatch, SongUpload};
use crate::lifecycle;
use crate::lyrics::{self, LyricSync};
use crate::song::{SongFiles, SongId};

/// The outcome of a song create or update.
#[derive(Debug)]
pub struct SavedSong {
    pub id: SongId,
    pub files: SongFiles,
    pub lyrics: Option<LyricSync>,
}

/// The outcome of a recording create or audio replacement.
#[derive(Debug)]
pub struct SavedRecording {
    pub id: Uuid,
    pub audio_file: String,
}

/// Creates a song, saves its uploaded blobs and derives lyric lines
/// from the LRC part, if one was sent.
pub async fn create_song<O: SafeStore>(
    environment: &Environment<O>,
    upload: SongUpload,
) -> Result<SavedSong, BackendError> {
    let new_song = environment.db.insert_song(upload.metadata).await?;
    let id = new_song.id();

    debug!(environment.logger, "Created song"; "id" => id);

    let files = SongFiles {
        cover_image: save_file(environment, id, "cover", upload.cover.as_ref()).await?,
        audio_file: save_file(environment, id, "audio", upload.audio.as_ref()).await?,
        lyric_file: save_file(environment, id, "lyrics", upload.lrc.as_ref()).await?,
    };

    environment.db.update_song_files(id, &files).await?;

    let lyrics = match upload.lrc {
        Some(lrc) => Some(
            lyrics::sync_lyrics(&environment.logger, &environment.db, id, Some(&lrc.data[..])).await?,
        ),
        None => None,
    };

    Ok(SavedSong { id, files, lyrics })
}

/// Replaces any subset of a song's file attributes. Old blobs are
/// garbage-collected only after the record update has committed; a
/// changed lyric file triggers a full re-derivation of lyric lines.
pub async fn update_song<O: SafeStore>(
    environment: &Environment<O>,
    id: SongId,
    patch: SongPatch,
) -> Result<SavedSong, BackendError> {
    let song = environment
        .db
        .retrieve_song(id)
        .await?
        .ok_or(BackendError::NonExistentSong(id))?;

    let mut files = song.files.clone();

    if let Some(key) = save_file(environment, id, "cover", patch.cover.as_ref()).await? {
        files.cover_image = Some(key);
    }
    if let Some(key) = save_file(environment, id, "audio", patch.audio.as_ref()).await? {
        files.audio_file = Some(key);
    }
    if let Some(key) = save_file(environment, id, "lyrics", patch.lrc.as_ref()).await? {
        files.lyric_file = Some(key);
    }

    environment.db.update_song_files(id, &files).await?;

    for (old, new) in song.files.attribute_pairs(&files) {
        lifecycle::remove_replaced_file(&environment.logger, &environment.store, old, new).await;
    }

    let lyrics = match patch.lrc {
        Some(lrc) => Some(
            lyrics::sync_lyrics(&environment.logger, &environment.db, id, Some(&lrc.data[..])).await?,
        ),
        None => None,
    };

    Ok(SavedSong { id, files, lyrics })
}

/// Detaches a song's lyric file entirely: the attribute, the blob and
/// every derived lyric line.
pub async fn clear_song_lyrics<O: SafeStore>(
    environment: &Environment<O>,
    id: SongId,
) -> Result<(), BackendError> {
    let song = environment
        .db
        .retrieve_song(id)
        .await?
        .ok_or(BackendError::NonExistentSong(id))?;

    let mut files = song.files.clone();
    let old_key = files.lyric_file.take();

    environment.db.update_song_files(id, &files).await?;

    if let Some(key) = &old_key {
        lifecycle::remove_entity_files(&environment.logger, &environment.store, &[key.as_str()]).await?;
    }

    lyrics::sync_lyrics(&environment.logger, &environment.db, id, None).await?;

    Ok(())
}

/// Deletes a song, its derived lyric lines and every attached blob.
pub async fn delete_song<O: SafeStore>(
    environment: &Environment<O>,
    id: SongId,
) -> Result<(), BackendError> {
    let song = environment
        .db
        .retrieve_song(id)
        .await?
        .ok_or(BackendError::NonExistentSong(id))?;

    environment.db.delete_song(id).await?;

    lifecycle::remove_entity_files(
        &environment.logger,
        &environment.store,
        &song.files.keys(),
    )
    .await?;

    Ok(())
}

/// Creates a recording owned by the caller and attaches its audio.
pub async fn create_recording<O: SafeStore>(
    environment: &Environment<O>,
    identity: &Identity,
    upload: RecordingUpload,
) -> Result<SavedRecording, BackendError> {
    let song_id = upload.metadata.song_id;

    environment
        .db
        .retrieve_song(song_id)
        .await?
        .ok_or(BackendError::NonExistentSong(song_id))?;

    let new_recording = environment
        .db
        .insert_recording(&identity.user_id, upload.metadata)
        .await?;
    let id = *new_recording.id();

    let key = recording_key(&identity.user_id);
    environment
        .store
        .save(&key, upload.audio.content_type.clone(), upload.audio.data)
        .await?;
    environment.db.update_recording_audio(&id, &key).await?;

    debug!(environment.logger, "Created recording"; "id" => format!("{}", id), "song_id" => song_id);

    Ok(SavedRecording {
        id,
        audio_file: key,
    })
}

/// Replaces a recording's audio take. The previous blob is deleted once
/// the new key has committed.
pub async fn replace_recording_audio<O: SafeStore>(
    environment: &Environment<O>,
    identity: &Identity,
    id: &Uuid,
    audio: FilePart,
) -> Result<SavedRecording, BackendError> {
    let recording = environment
        .db
        .retrieve_recording(id)
        .await?
        .ok_or_else(|| BackendError::NonExistentRecording(*id))?;

    if recording.user_id != identity.user_id && !identity.admin {
        return Err(BackendError::Forbidden);
    }

    let key = recording_key(&recording.user_id);
    environment
        .store
        .save(&key, audio.content_type.clone(), audio.data)
        .await?;
    environment.db.update_recording_audio(id, &key).await?;

    lifecycle::remove_replaced_file(
        &environment.logger,
        &environment.store,
        recording.audio_file.as_deref(),
        Some(key.as_str()),
    )
    .await;

    Ok(SavedRecording {
        id: *id,
        audio_file: key,
    })
}

/// Deletes a recording and its audio blob. Only the owner (or an
/// admin) may do so.
pub async fn delete_recording<O: SafeStore>(
    environment: &Environment<O>,
    identity: &Identity,
    id: &Uuid,
) -> Result<(), BackendError> {
    let recording = environment
        .db
        .retrieve_recording(id)
        .await?
        .ok_or_else(|| BackendError::NonExistentRecording(*id))?;

    if recording.user_id != identity.user_id && !identity.admin {
        return Err(BackendError::Forbidden);
    }

    environment.db.delete_recording(id).await?;

    if let Some(key) = &recording.audio_file {
        lifecycle::remove_entity_files(&environment.logger, &environment.store, &[key.as_str()]).await?;
    }

    Ok(())
}

async fn save_file<O: SafeStore>(
    environment: &Environment<O>,
    song_id: SongId,
    kind: &str,
    part: Option<&FilePart>,
) -> Result<Option<String>, BackendError> {
    let part = match part {
        Some(part) => part,
        None => return Ok(None),
    };

    let key = format!("songs/{}/{}-{}", song_id, kind, Uuid::new_v4());

    environment
        .store
        .save(&key, part.content_type.clone(), part.data.clone())
        .await?;

    Ok(Some(key))
}

fn recording_key(user_id: &Uuid) -> String {
    // a fresh component per upload keeps replacement keys distinct, so
    // the lifecycle manager can tell old from new
    format!("recordings/{}/{}", user_id, Uuid::new_v4())
}
