use std::time::{Duration, Instant};

use log::debug;
use uuid::Uuid;
use warp::{
    filters::multipart::FormData,
    http::StatusCode,
    reject,
    reply::{json, with_header, with_status, Reply},
};

use crate::catalog;
use crate::environment::{Environment, SafeStore};
use crate::errors::BackendError;
use crate::gateway;
use crate::identity::Identity;
use crate::io;
use crate::routes::{
    query::MediaQuery,
    rejection::{Context, Rejection},
    response::{SongDetail, SongListItem, SuccessResponse},
};
use crate::song::{NewArtist, SongId};

const SERVER_TIMING_HEADER: &str = "server-timing";
type RouteResult = Result<Box<dyn Reply>, reject::Rejection>;

macro_rules! timed {
    ($($expression:stmt);+) => {
        let start = Instant::now();

        let result = { $($expression)+ };

        Ok(Box::new(with_header(
            result,
            SERVER_TIMING_HEADER,
            format_server_timing(start.elapsed()),
        )) as Box<dyn Reply>)
    };
}

pub async fn artists_list<O: SafeStore>(
    environment: Environment<O>,
    _identity: Identity,
) -> RouteResult {
    timed! {
        let artists = environment
            .db
            .retrieve_artists()
            .await
            .map_err(|e: BackendError| Rejection::new(Context::artists(), e))?;

        json(&SuccessResponse::Artists(artists))
    }
}

pub async fn artist_create<O: SafeStore>(
    environment: Environment<O>,
    identity: Identity,
    artist: NewArtist,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::create_artist(), e);

        require_admin(&identity).map_err(error_handler)?;

        let artist = environment
            .db
            .create_artist(artist.name)
            .await
            .map_err(error_handler)?;

        with_status(json(&artist), StatusCode::CREATED)
    }
}

pub async fn songs_list<O: SafeStore>(
    environment: Environment<O>,
    _identity: Identity,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::songs(), e);

        let summaries = environment
            .db
            .retrieve_songs()
            .await
            .map_err(error_handler)?;

        // list thumbnails are signed here with the longer list-page
        // TTL; everything else goes through the media gateway
        let songs = summaries
            .into_iter()
            .map(|summary| {
                let cover_url = match &summary.cover_image {
                    Some(key) => {
                        Some(environment.store.sign(key, environment.config.cover_ttl)?)
                    }
                    None => None,
                };

                Ok(SongListItem {
                    id: summary.id,
                    title: summary.title,
                    artist: summary.artist_name,
                    language: summary.language,
                    genre: summary.genre,
                    duration_seconds: summary.duration_seconds,
                    cover_url,
                })
            })
            .collect::<Result<Vec<_>, BackendError>>()
            .map_err(error_handler)?;

        json(&SuccessResponse::Songs { songs })
    }
}

pub async fn song_detail<O: SafeStore>(
    environment: Environment<O>,
    id: SongId,
    _identity: Identity,
) -> RouteResult {
    timed! {
        let error_handler =
            |e: BackendError| Rejection::new(Context::retrieve_song(id.to_string()), e);

        let option = environment
            .db
            .retrieve_song(id)
            .await
            .map_err(error_handler)?;

        match option {
            Some(song) => {
                let lyrics = environment
                    .db
                    .retrieve_lyric_lines(id)
                    .await
                    .map_err(error_handler)?;

                with_status(json(&SongDetail { song, lyrics }), StatusCode::OK)
            }
            None => with_status(json(&()), StatusCode::NOT_FOUND),
        }
    }
}

pub async fn song_create<O: SafeStore + 'static>(
    environment: Environment<O>,
    identity: Identity,
    content: FormData,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::create_song(), e);

        require_admin(&identity).map_err(error_handler)?;

        debug!(environment.logger, "Parsing song submission...");
        let upload = io::parse_song_upload(content).await.map_err(error_handler)?;

        let saved = catalog::create_song(&environment, upload)
            .await
            .map_err(error_handler)?;

        let response = SuccessResponse::SavedSong {
            id: saved.id,
            files: saved.files,
            lyric_lines: saved.lyrics.as_ref().map(|s| s.lines).unwrap_or(0),
        };

        Box::new(with_header(
            with_status(json(&response), StatusCode::CREATED),
            "location",
            environment.urls.song(saved.id).as_str(),
        )) as Box<dyn Reply>
    }
}

pub async fn song_update<O: SafeStore + 'static>(
    environment: Environment<O>,
    id: SongId,
    identity: Identity,
    content: FormData,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::update_song(id.to_string()), e);

        require_admin(&identity).map_err(error_handler)?;

        let patch = io::parse_song_patch(content).await.map_err(error_handler)?;

        let saved = catalog::update_song(&environment, id, patch)
            .await
            .map_err(error_handler)?;

        json(&SuccessResponse::SavedSong {
            id: saved.id,
            files: saved.files,
            lyric_lines: saved.lyrics.as_ref().map(|s| s.lines).unwrap_or(0),
        })
    }
}

pub async fn song_delete<O: SafeStore>(
    environment: Environment<O>,
    id: SongId,
    identity: Identity,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::delete_song(id.to_string()), e);

        require_admin(&identity).map_err(error_handler)?;

        debug!(environment.logger, "Deleting song..."; "id" => id);
        catalog::delete_song(&environment, id)
            .await
            .map_err(error_handler)?;

        StatusCode::NO_CONTENT
    }
}

pub async fn song_lyrics_clear<O: SafeStore>(
    environment: Environment<O>,
    id: SongId,
    identity: Identity,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::clear_lyrics(id.to_string()), e);

        require_admin(&identity).map_err(error_handler)?;

        catalog::clear_song_lyrics(&environment, id)
            .await
            .map_err(error_handler)?;

        StatusCode::NO_CONTENT
    }
}

pub async fn recordings_list<O: SafeStore>(
    environment: Environment<O>,
    identity: Identity,
) -> RouteResult {
    timed! {
        let recordings = environment
            .db
            .retrieve_recordings_for_user(&identity.user_id)
            .await
            .map_err(|e: BackendError| Rejection::new(Context::recordings(), e))?;

        json(&SuccessResponse::Recordings { recordings })
    }
}

pub async fn recording_create<O: SafeStore + 'static>(
    environment: Environment<O>,
    identity: Identity,
    content: FormData,
) -> RouteResult {
    timed! {
        let error_handler = |e: BackendError| Rejection::new(Context::create_recording(), e);

        debug!(environment.logger, "Parsing recording submission...");
        let upload = io::parse_recording_upload(content)
            .await
            .map_err(error_handler)?;

        let saved = catalog::create_recording(&environment, &identity, upload)
            .await
            .map_err(error_handler)?;

        let response = SuccessResponse::SavedRecording {
            id: saved.id.to_string(),
            audio_file: saved.audio_file,
        };

        Box::new(with_header(
            with_status(json(&response), StatusCode::CREATED),
            "location",
            environment.urls.recording(&saved.id).as_str(),
        )) as Box<dyn Reply>
    }
}

pub async fn recording_audio_replace<O: SafeStore + 'static>(
    environment: Environment<O>,
    id: Uuid,
    identity: Identity,
    content: FormData,
) -> RouteResult {
    timed! {
        let error_handler =
            |e: BackendError| Rejection::new(Context::replace_recording_audio(id.to_string()), e);

        let upload = io::parse_recording_audio(content)
            .await
            .map_err(error_handler)?;

        let saved = catalog::replace_recording_audio(&environment, &identity, &id, upload)
            .await
            .map_err(error_handler)?;

        json(&SuccessResponse::SavedRecording {
            id: saved.id.to_string(),
            audio_file: saved.audio_file,
        })
    }
}

pub async fn recording_delete<O: SafeStore>(
    environment: Environment<O>,
    id: Uuid,
    identity: Identity,
) -> RouteResult {
    timed! {
        let error_handler =
            |e: BackendError| Rejection::new(Context::delete_recording(id.to_string()), e);

        debug!(environment.logger, "Deleting recording..."; "id" => format!("{}", id));
        catalog::delete_recording(&environment, &identity, &id)
            .await
            .map_err(error_handler)?;

        StatusCode::NO_CONTENT
    }
}

pub async fn media<O: SafeStore>(
    environment: Environment<O>,
    identity: Identity,
    query: MediaQuery,
) -> RouteResult {
    timed! {
        let key = query.key.unwrap_or_default();

        let error_handler = |e: BackendError| Rejection::new(Context::media(key.clone()), e);

        let grant = gateway::resolve_media(&environment.db, &environment.store, &identity, &key)
            .await
            .map_err(error_handler)?;

        json(&SuccessResponse::Media(grant))
    }
}

fn require_admin(identity: &Identity) -> Result<(), BackendError> {
    if identity.admin {
        Ok(())
    } else {
        Err(BackendError::Forbidden)
    }
}

fn format_server_timing(seconds: Duration) -> String {
    format!("handler;dur={}", seconds.as_secs_f64() * 1000.0)
}
