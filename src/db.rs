use futures::future::BoxFuture;
use uuid::Uuid;

use crate::errors::BackendError;
use crate::lrc::LyricLine;
use crate::recording::{NewRecording, Recording, RecordingMetadata};
use crate::song::{Artist, NewSong, Song, SongFiles, SongId, SongMetadata, SongSummary};

pub mod mock;

pub trait Db {
    fn create_artist(&self, name: String) -> BoxFuture<Result<Artist, BackendError>>;

    fn retrieve_artists(&self) -> BoxFuture<Result<Vec<Artist>, BackendError>>;

    fn insert_song(&self, metadata: SongMetadata) -> BoxFuture<Result<NewSong, BackendError>>;

    fn retrieve_song(&self, id: SongId) -> BoxFuture<Result<Option<Song>, BackendError>>;

    fn retrieve_songs(&self) -> BoxFuture<Result<Vec<SongSummary>, BackendError>>;

    /// Persists the song's file keys. The keys must already point at
    /// saved blobs; replaced blobs are only garbage-collected once this
    /// update has committed.
    fn update_song_files(
        &self,
        id: SongId,
        files: &SongFiles,
    ) -> BoxFuture<Result<(), BackendError>>;

    fn delete_song(&self, id: SongId) -> BoxFuture<Result<(), BackendError>>;

    /// Atomically replaces the song's derived lyric lines. Readers must
    /// observe the full old set or the full new set, never a mix.
    fn replace_lyric_lines(
        &self,
        song_id: SongId,
        lines: &[LyricLine],
    ) -> BoxFuture<Result<(), BackendError>>;

    /// The song's lyric lines in non-decreasing timestamp order.
    fn retrieve_lyric_lines(
        &self,
        song_id: SongId,
    ) -> BoxFuture<Result<Vec<LyricLine>, BackendError>>;

    fn insert_recording(
        &self,
        user_id: &Uuid,
        metadata: RecordingMetadata,
    ) -> BoxFuture<Result<NewRecording, BackendError>>;

    fn retrieve_recording(&self, id: &Uuid) -> BoxFuture<Result<Option<Recording>, BackendError>>;

    fn retrieve_recordings_for_user(
        &self,
        user_id: &Uuid,
    ) -> BoxFuture<Result<Vec<Recording>, BackendError>>;

    fn update_recording_audio(&self, id: &Uuid, key: &str) -> BoxFuture<Result<(), BackendError>>;

    fn delete_recording(&self, id: &Uuid) -> BoxFuture<Result<(), BackendError>>;

    /// Whether the key is attached to any song as cover, audio or lyric
    /// file. Song media is shareable among all authenticated users.
    fn song_key_exists(&self, key: &str) -> BoxFuture<Result<bool, BackendError>>;

    /// Whether the key is the audio of a recording owned by exactly this
    /// user.
    fn recording_key_owned_by(
        &self,
        key: &str,
        user_id: &Uuid,
    ) -> BoxFuture<Result<bool, BackendError>>;
}

pub use self::postgres::*;

mod postgres {
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use sqlx::postgres::{PgPool, PgRow};
    use time::OffsetDateTime;
    use uuid::Uuid;

    use crate::errors::BackendError;
    use crate::lrc::LyricLine;
    use crate::recording::{NewRecording, Recording, RecordingMetadata};
    use crate::song::{
        Artist, NewSong, Song, SongFiles, SongId, SongMetadata, SongSummary, Times,
    };

    const ARTISTS_NAME_CONSTRAINT: &str = "artists_name_key";

    pub struct PgDb {
        pool: PgPool,
    }

    impl PgDb {
        pub fn new(pool: PgPool) -> Self {
            PgDb { pool }
        }
    }

    // these can be simplified once async functions in traits are stabilized
    impl super::Db for PgDb {
        fn create_artist(&self, name: String) -> BoxFuture<Result<Artist, BackendError>> {
            async move {
                let query = sqlx::query_as(include_str!("queries/create_artist.sql"));

                let (id,): (SongId,) = query
                    .bind(&name)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(Artist::new(id, name))
            }
            .boxed()
        }

        fn retrieve_artists(&self) -> BoxFuture<Result<Vec<Artist>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/retrieve_artists.sql"));

                let artists = query
                    .try_map(|row: PgRow| {
                        Ok(Artist::new(try_get(&row, "id")?, try_get(&row, "name")?))
                    })
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(artists)
            }
            .boxed()
        }

        fn insert_song(&self, metadata: SongMetadata) -> BoxFuture<Result<NewSong, BackendError>> {
            async move {
                let query = sqlx::query_as(include_str!("queries/create_song.sql"));

                let (id, created_at, updated_at): (SongId, OffsetDateTime, OffsetDateTime) = query
                    .bind(&metadata.title)
                    .bind(metadata.artist_id)
                    .bind(&metadata.language)
                    .bind(&metadata.genre)
                    .bind(metadata.duration_seconds)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(NewSong::new(id, created_at, updated_at, metadata))
            }
            .boxed()
        }

        fn retrieve_song(&self, id: SongId) -> BoxFuture<Result<Option<Song>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/retrieve_song.sql"));

                let song: Option<Song> = query
                    .bind(id)
                    .try_map(|row: PgRow| new_song(&row))
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(song)
            }
            .boxed()
        }

        fn retrieve_songs(&self) -> BoxFuture<Result<Vec<SongSummary>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/retrieve_songs.sql"));

                let songs = query
                    .try_map(|row: PgRow| {
                        Ok(SongSummary {
                            id: try_get(&row, "id")?,
                            title: try_get(&row, "title")?,
                            artist_name: try_get(&row, "artist_name")?,
                            language: try_get(&row, "language")?,
                            genre: try_get(&row, "genre")?,
                            duration_seconds: try_get(&row, "duration_seconds")?,
                            cover_image: try_get(&row, "cover_image")?,
                        })
                    })
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(songs)
            }
            .boxed()
        }

        fn update_song_files(
            &self,
            id: SongId,
            files: &SongFiles,
        ) -> BoxFuture<Result<(), BackendError>> {
            let files = files.clone();

            async move {
                let query = sqlx::query(include_str!("queries/update_song_files.sql"));

                let count = query
                    .bind(id)
                    .bind(&files.cover_image)
                    .bind(&files.audio_file)
                    .bind(&files.lyric_file)
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?
                    .rows_affected();

                if count == 0 {
                    Err(BackendError::NonExistentSong(id))
                } else {
                    Ok(())
                }
            }
            .boxed()
        }

        fn delete_song(&self, id: SongId) -> BoxFuture<Result<(), BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/delete_song.sql"));

                let count = query
                    .bind(id)
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?
                    .rows_affected();

                if count == 0 {
                    Err(BackendError::NonExistentSong(id))
                } else {
                    Ok(())
                }
            }
            .boxed()
        }

        fn replace_lyric_lines(
            &self,
            song_id: SongId,
            lines: &[LyricLine],
        ) -> BoxFuture<Result<(), BackendError>> {
            let lines = lines.to_vec();

            async move {
                let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

                sqlx::query(include_str!("queries/delete_lyric_lines.sql"))
                    .bind(song_id)
                    .execute(&mut tx)
                    .await
                    .map_err(map_sqlx_error)?;

                for line in &lines {
                    sqlx::query(include_str!("queries/create_lyric_line.sql"))
                        .bind(song_id)
                        .bind(line.timestamp)
                        .bind(&line.text)
                        .execute(&mut tx)
                        .await
                        .map_err(map_sqlx_error)?;
                }

                tx.commit().await.map_err(map_sqlx_error)?;

                Ok(())
            }
            .boxed()
        }

        fn retrieve_lyric_lines(
            &self,
            song_id: SongId,
        ) -> BoxFuture<Result<Vec<LyricLine>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/retrieve_lyric_lines.sql"));

                let lines = query
                    .bind(song_id)
                    .try_map(|row: PgRow| {
                        Ok(LyricLine {
                            timestamp: try_get(&row, "timestamp")?,
                            text: try_get(&row, "text")?,
                        })
                    })
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(lines)
            }
            .boxed()
        }

        fn insert_recording(
            &self,
            user_id: &Uuid,
            metadata: RecordingMetadata,
        ) -> BoxFuture<Result<NewRecording, BackendError>> {
            let user_id = *user_id;

            async move {
                let query = sqlx::query_as(include_str!("queries/create_recording.sql"));

                let (id, created_at): (Uuid, OffsetDateTime) = query
                    .bind(user_id)
                    .bind(metadata.song_id)
                    .bind(metadata.duration_seconds)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(NewRecording::new(id, created_at, metadata))
            }
            .boxed()
        }

        fn retrieve_recording(
            &self,
            id: &Uuid,
        ) -> BoxFuture<Result<Option<Recording>, BackendError>> {
            let id = *id;

            async move {
                let query = sqlx::query(include_str!("queries/retrieve_recording.sql"));

                let recording = query
                    .bind(id)
                    .try_map(|row: PgRow| new_recording(&row))
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(recording)
            }
            .boxed()
        }

        fn retrieve_recordings_for_user(
            &self,
            user_id: &Uuid,
        ) -> BoxFuture<Result<Vec<Recording>, BackendError>> {
            let user_id = *user_id;

            async move {
                let query = sqlx::query(include_str!("queries/retrieve_recordings.sql"));

                let recordings = query
                    .bind(user_id)
                    .try_map(|row: PgRow| new_recording(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(recordings)
            }
            .boxed()
        }

        fn update_recording_audio(
            &self,
            id: &Uuid,
            key: &str,
        ) -> BoxFuture<Result<(), BackendError>> {
            let id = *id;
            let key = key.to_owned();

            async move {
                let query = sqlx::query(include_str!("queries/update_recording_audio.sql"));

                let count = query
                    .bind(id)
                    .bind(&key)
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?
                    .rows_affected();

                if count == 0 {
                    Err(BackendError::NonExistentRecording(id))
                } else {
                    Ok(())
                }
            }
            .boxed()
        }

        fn delete_recording(&self, id: &Uuid) -> BoxFuture<Result<(), BackendError>> {
            let id = *id;

            async move {
                let query = sqlx::query(include_str!("queries/delete_recording.sql"));

                let count = query
                    .bind(id)
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?
                    .rows_affected();

                if count == 0 {
                    Err(BackendError::NonExistentRecording(id))
                } else {
                    Ok(())
                }
            }
            .boxed()
        }

        fn song_key_exists(&self, key: &str) -> BoxFuture<Result<bool, BackendError>> {
            let key = key.to_owned();

            async move {
                let query = sqlx::query_as(include_str!("queries/song_key_exists.sql"));

                let (exists,): (bool,) = query
                    .bind(&key)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(exists)
            }
            .boxed()
        }

        fn recording_key_owned_by(
            &self,
            key: &str,
            user_id: &Uuid,
        ) -> BoxFuture<Result<bool, BackendError>> {
            let key = key.to_owned();
            let user_id = *user_id;

            async move {
                let query = sqlx::query_as(include_str!("queries/recording_key_owned.sql"));

                let (owned,): (bool,) = query
                    .bind(&key)
                    .bind(user_id)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(owned)
            }
            .boxed()
        }
    }

    fn new_song(row: &PgRow) -> Result<Song, sqlx::Error> {
        let created_at: OffsetDateTime = try_get(row, "created_at")?;
        let updated_at: OffsetDateTime = try_get(row, "updated_at")?;

        Ok(Song {
            id: try_get(row, "id")?,
            title: try_get(row, "title")?,
            artist: Artist::new(try_get(row, "artist_id")?, try_get(row, "artist_name")?),
            language: try_get(row, "language")?,
            genre: try_get(row, "genre")?,
            duration_seconds: try_get(row, "duration_seconds")?,
            files: SongFiles {
                cover_image: try_get(row, "cover_image")?,
                audio_file: try_get(row, "audio_file")?,
                lyric_file: try_get(row, "lyric_file")?,
            },
            times: Times {
                created_at,
                updated_at,
            },
        })
    }

    fn new_recording(row: &PgRow) -> Result<Recording, sqlx::Error> {
        Ok(Recording {
            id: try_get(row, "id")?,
            user_id: try_get(row, "user_id")?,
            song_id: try_get(row, "song_id")?,
            song_title: try_get(row, "song_title")?,
            audio_file: try_get(row, "audio_file")?,
            duration_seconds: try_get(row, "duration_seconds")?,
            created_at: try_get(row, "created_at")?,
        })
    }

    fn try_get<'a, T: sqlx::Type<sqlx::Postgres> + sqlx::decode::Decode<'a, sqlx::Postgres>>(
        row: &'a PgRow,
        column: &str,
    ) -> Result<T, sqlx::Error> {
        use sqlx::prelude::*;

        row.try_get(column)
    }

    fn map_sqlx_error(error: sqlx::Error) -> BackendError {
        use sqlx::Error;

        match error {
            Error::Database(ref e) if e.constraint() == Some(ARTISTS_NAME_CONSTRAINT) => {
                BackendError::ArtistAlreadyExists
            }
            _ => BackendError::Sqlx { source: error },
        }
    }
}
