use std::collections::HashMap;
use std::sync::Mutex;

use futures::future::{BoxFuture, FutureExt};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::Db;
use crate::errors::BackendError;
use crate::lrc::LyricLine;
use crate::recording::{NewRecording, Recording, RecordingMetadata};
use crate::song::{Artist, NewSong, Song, SongFiles, SongId, SongMetadata, SongSummary, Times};

/// An in-memory record store for tests. A single lock around the whole
/// state stands in for the per-song transaction the Postgres
/// implementation uses.
#[derive(Default)]
pub struct MockDb {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    next_id: SongId,
    artists: HashMap<SongId, String>,
    songs: HashMap<SongId, StoredSong>,
    lyric_lines: HashMap<SongId, Vec<LyricLine>>,
    recordings: HashMap<Uuid, StoredRecording>,
}

#[derive(Clone)]
struct StoredSong {
    metadata: SongMetadata,
    files: SongFiles,
    times: Times,
}

#[derive(Clone)]
struct StoredRecording {
    user_id: Uuid,
    metadata: RecordingMetadata,
    audio_file: Option<String>,
    created_at: OffsetDateTime,
}

impl MockDb {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn lyric_lines_for(&self, song_id: SongId) -> Vec<LyricLine> {
        self.state
            .lock()
            .unwrap()
            .lyric_lines
            .get(&song_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl State {
    fn allocate_id(&mut self) -> SongId {
        self.next_id += 1;
        self.next_id
    }

    fn recording_view(&self, id: &Uuid, stored: &StoredRecording) -> Recording {
        let song_title = self
            .songs
            .get(&stored.metadata.song_id)
            .map(|song| song.metadata.title.clone())
            .unwrap_or_default();

        Recording {
            id: *id,
            user_id: stored.user_id,
            song_id: stored.metadata.song_id,
            song_title,
            audio_file: stored.audio_file.clone(),
            duration_seconds: stored.metadata.duration_seconds,
            created_at: stored.created_at,
        }
    }
}

fn now_times() -> Times {
    let now = OffsetDateTime::now_utc();

    Times {
        created_at: now,
        updated_at: now,
    }
}

impl Db for MockDb {
    fn create_artist(&self, name: String) -> BoxFuture<Result<Artist, BackendError>> {
        let mut state = self.state.lock().unwrap();

        let result = if state.artists.values().any(|existing| existing == &name) {
            Err(BackendError::ArtistAlreadyExists)
        } else {
            let id = state.allocate_id();
            state.artists.insert(id, name.clone());
            Ok(Artist::new(id, name))
        };

        async move { result }.boxed()
    }

    fn retrieve_artists(&self) -> BoxFuture<Result<Vec<Artist>, BackendError>> {
        let state = self.state.lock().unwrap();

        let mut artists: Vec<Artist> = state
            .artists
            .iter()
            .map(|(id, name)| Artist::new(*id, name.clone()))
            .collect();
        artists.sort_by(|a, b| a.name.cmp(&b.name));

        async move { Ok(artists) }.boxed()
    }

    fn insert_song(&self, metadata: SongMetadata) -> BoxFuture<Result<NewSong, BackendError>> {
        let mut state = self.state.lock().unwrap();

        let id = state.allocate_id();
        let times = now_times();

        state.songs.insert(
            id,
            StoredSong {
                metadata: metadata.clone(),
                files: Default::default(),
                times: times.clone(),
            },
        );

        let new_song = NewSong::new(id, times.created_at, times.updated_at, metadata);

        async move { Ok(new_song) }.boxed()
    }

    fn retrieve_song(&self, id: SongId) -> BoxFuture<Result<Option<Song>, BackendError>> {
        let state = self.state.lock().unwrap();

        let song = state.songs.get(&id).map(|stored| Song {
            id,
            title: stored.metadata.title.clone(),
            artist: Artist::new(
                stored.metadata.artist_id,
                state
                    .artists
                    .get(&stored.metadata.artist_id)
                    .cloned()
                    .unwrap_or_default(),
            ),
            language: stored.metadata.language.clone(),
            genre: stored.metadata.genre.clone(),
            duration_seconds: stored.metadata.duration_seconds,
            files: stored.files.clone(),
            times: stored.times.clone(),
        });

        async move { Ok(song) }.boxed()
    }

    fn retrieve_songs(&self) -> BoxFuture<Result<Vec<SongSummary>, BackendError>> {
        let state = self.state.lock().unwrap();

        let mut songs: Vec<SongSummary> = state
            .songs
            .iter()
            .map(|(id, stored)| SongSummary {
                id: *id,
                title: stored.metadata.title.clone(),
                artist_name: state
                    .artists
                    .get(&stored.metadata.artist_id)
                    .cloned()
                    .unwrap_or_default(),
                language: stored.metadata.language.clone(),
                genre: stored.metadata.genre.clone(),
                duration_seconds: stored.metadata.duration_seconds,
                cover_image: stored.files.cover_image.clone(),
            })
            .collect();
        songs.sort_by(|a, b| a.title.cmp(&b.title));

        async move { Ok(songs) }.boxed()
    }

    fn update_song_files(
        &self,
        id: SongId,
        files: &SongFiles,
    ) -> BoxFuture<Result<(), BackendError>> {
        let mut state = self.state.lock().unwrap();

        let result = match state.songs.get_mut(&id) {
            Some(stored) => {
                stored.files = files.clone();
                stored.times.updated_at = OffsetDateTime::now_utc();
                Ok(())
            }
            None => Err(BackendError::NonExistentSong(id)),
        };

        async move { result }.boxed()
    }

    fn delete_song(&self, id: SongId) -> BoxFuture<Result<(), BackendError>> {
        let mut state = self.state.lock().unwrap();

        let result = match state.songs.remove(&id) {
            Some(_) => {
                state.lyric_lines.remove(&id);
                Ok(())
            }
            None => Err(BackendError::NonExistentSong(id)),
        };

        async move { result }.boxed()
    }

    fn replace_lyric_lines(
        &self,
        song_id: SongId,
        lines: &[LyricLine],
    ) -> BoxFuture<Result<(), BackendError>> {
        let mut state = self.state.lock().unwrap();

        state.lyric_lines.insert(song_id, lines.to_vec());

        async move { Ok(()) }.boxed()
    }

    fn retrieve_lyric_lines(
        &self,
        song_id: SongId,
    ) -> BoxFuture<Result<Vec<LyricLine>, BackendError>> {
        let lines = self.lyric_lines_for(song_id);

        async move { Ok(lines) }.boxed()
    }

    fn insert_recording(
        &self,
        user_id: &Uuid,
        metadata: RecordingMetadata,
    ) -> BoxFuture<Result<NewRecording, BackendError>> {
        let mut state = self.state.lock().unwrap();

        let id = Uuid::new_v4();
        let created_at = OffsetDateTime::now_utc();

        state.recordings.insert(
            id,
            StoredRecording {
                user_id: *user_id,
                metadata: metadata.clone(),
                audio_file: None,
                created_at,
            },
        );

        let new_recording = NewRecording::new(id, created_at, metadata);

        async move { Ok(new_recording) }.boxed()
    }

    fn retrieve_recording(&self, id: &Uuid) -> BoxFuture<Result<Option<Recording>, BackendError>> {
        let state = self.state.lock().unwrap();

        let recording = state
            .recordings
            .get(id)
            .map(|stored| state.recording_view(id, stored));

        async move { Ok(recording) }.boxed()
    }

    fn retrieve_recordings_for_user(
        &self,
        user_id: &Uuid,
    ) -> BoxFuture<Result<Vec<Recording>, BackendError>> {
        let state = self.state.lock().unwrap();

        let mut recordings: Vec<Recording> = state
            .recordings
            .iter()
            .filter(|(_, stored)| stored.user_id == *user_id)
            .map(|(id, stored)| state.recording_view(id, stored))
            .collect();
        recordings.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        async move { Ok(recordings) }.boxed()
    }

    fn update_recording_audio(&self, id: &Uuid, key: &str) -> BoxFuture<Result<(), BackendError>> {
        let mut state = self.state.lock().unwrap();

        let result = match state.recordings.get_mut(id) {
            Some(stored) => {
                stored.audio_file = Some(key.to_owned());
                Ok(())
            }
            None => Err(BackendError::NonExistentRecording(*id)),
        };

        async move { result }.boxed()
    }

    fn delete_recording(&self, id: &Uuid) -> BoxFuture<Result<(), BackendError>> {
        let mut state = self.state.lock().unwrap();

        let result = match state.recordings.remove(id) {
            Some(_) => Ok(()),
            None => Err(BackendError::NonExistentRecording(*id)),
        };

        async move { result }.boxed()
    }

    fn song_key_exists(&self, key: &str) -> BoxFuture<Result<bool, BackendError>> {
        let state = self.state.lock().unwrap();

        let exists = state
            .songs
            .values()
            .any(|stored| stored.files.keys().contains(&key));

        async move { Ok(exists) }.boxed()
    }

    fn recording_key_owned_by(
        &self,
        key: &str,
        user_id: &Uuid,
    ) -> BoxFuture<Result<bool, BackendError>> {
        let state = self.state.lock().unwrap();

        let owned = state.recordings.values().any(|stored| {
            stored.user_id == *user_id && stored.audio_file.as_deref() == Some(key)
        });

        async move { Ok(owned) }.boxed()
    }
}
