use std::sync::Arc;

use log::{error, Logger};
use warp::http::StatusCode;
use warp::reject;
use warp::reply::{json, with_status, Json, WithStatus};

use crate::errors::BackendError;

pub mod admin;
mod handlers;
mod query;
mod rejection;
mod response;

pub use internal::*;

/// The maximum form data size to accept. This should be enforced by
/// the HTTP gateway, so on the Rust side it’s set to an unreasonably
/// large number.
const MAX_CONTENT_LENGTH: u64 = 2 * 1024 * 1024 * 1024;

pub async fn format_rejection(
    logger: Arc<Logger>,
    rej: reject::Rejection,
) -> Result<WithStatus<Json>, reject::Rejection> {
    if let Some(r) = rej.find::<rejection::Rejection>() {
        let e = &r.error;
        error!(logger, "Backend error"; "context" => ?r.context, "error" => ?r.error, "status" => %status_code_for(e), "message" => %r.error);
        let flattened = r.flatten();

        return Ok(with_status(json(&flattened), status_code_for(e)));
    }

    Err(rej)
}

fn status_code_for(e: &BackendError) -> StatusCode {
    use BackendError::*;

    match e {
        BadRequest { .. }
        | InvalidId { .. }
        | PartsMissing
        | MalformedUploadMetadata { .. }
        | MalformedFormSubmission { .. } => StatusCode::BAD_REQUEST,
        Unauthorized => StatusCode::UNAUTHORIZED,
        Forbidden => StatusCode::FORBIDDEN,
        NonExistentSong(..) | NonExistentRecording(..) => StatusCode::NOT_FOUND,
        ArtistAlreadyExists => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

mod internal {
    use uuid::Uuid;
    use warp::filters::multipart::form;
    use warp::filters::BoxedFilter;
    use warp::path::end;
    use warp::Filter;
    use warp::Reply;
    use warp::{delete, get as g, path as p, path::param as par, post, query};

    use super::rejection::{Context, Rejection};
    use super::{handlers, query as q, MAX_CONTENT_LENGTH};
    use crate::environment::Environment;
    use crate::errors::BackendError;
    use crate::identity::Identity;
    use crate::song::SongId;

    type Route = BoxedFilter<(Box<dyn Reply>,)>;

    /// Extracts the authenticated identity injected by the upstream
    /// auth proxy. Requests without one are rejected before any
    /// handler logic runs.
    fn identity() -> impl Filter<Extract = (Identity,), Error = warp::reject::Rejection> + Clone {
        warp::header::optional::<Uuid>("x-user-id")
            .and(warp::header::optional::<String>("x-user-admin"))
            .and_then(|user_id: Option<Uuid>, admin: Option<String>| async move {
                match user_id {
                    Some(user_id) => Ok(Identity::new(
                        user_id,
                        admin.as_deref() == Some("1"),
                    )),
                    None => Err(warp::reject::Rejection::from(Rejection::new(
                        Context::identity(),
                        BackendError::Unauthorized,
                    ))),
                }
            })
    }

    macro_rules! route_filter {
    ($route_variable:ident; $first:expr) => (let $route_variable = $route_variable.and($first););
    ($route_variable:ident; $first:expr, $($rest:expr),+) => (
        let $route_variable = $route_variable.and($first);
        route_filter!($route_variable; $($rest),+);
    )
}

    macro_rules! route {
    ($name:ident => $handler:ident, $route_variable:ident, $path:ident; $($filters:expr),+) => (
        pub fn $name<O: Clone + Send + Sync + 'static>(environment: Environment<O>) -> Route {
            let r = environment.urls.$path.clone();

            let $route_variable = warp::any()
                .map(move || environment.clone())
                .and(p(r));

            route_filter!($route_variable; $($filters),+);

            $route_variable.and_then(handlers::$handler)
                .boxed()
        }
    );
}

    route!(make_artists_list_route => artists_list, rt, artists_path; end(), g(), identity());
    route!(make_artist_create_route => artist_create, rt, artists_path; end(), post(), identity(), warp::body::json());
    route!(make_songs_list_route => songs_list, rt, songs_path; end(), g(), identity());
    route!(make_song_detail_route => song_detail, rt, songs_path; par::<SongId>(), end(), g(), identity());
    route!(make_song_create_route => song_create, rt, songs_path; end(), post(), identity(), form().max_length(MAX_CONTENT_LENGTH));
    route!(make_song_update_route => song_update, rt, songs_path; par::<SongId>(), end(), post(), identity(), form().max_length(MAX_CONTENT_LENGTH));
    route!(make_song_delete_route => song_delete, rt, songs_path; par::<SongId>(), end(), delete(), identity());
    route!(make_song_lyrics_clear_route => song_lyrics_clear, rt, songs_path; p!(SongId / "lyrics"), end(), delete(), identity());
    route!(make_recordings_list_route => recordings_list, rt, recordings_path; end(), g(), identity());
    route!(make_recording_create_route => recording_create, rt, recordings_path; end(), post(), identity(), form().max_length(MAX_CONTENT_LENGTH));
    route!(make_recording_audio_route => recording_audio_replace, rt, recordings_path; par::<Uuid>(), end(), post(), identity(), form().max_length(MAX_CONTENT_LENGTH));
    route!(make_recording_delete_route => recording_delete, rt, recordings_path; par::<Uuid>(), end(), delete(), identity());
    route!(make_media_route => media, rt, media_path; end(), g(), identity(), query::<q::MediaQuery>());
}
