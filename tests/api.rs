use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;
use warp::http::StatusCode;
use warp::{Filter, Reply};

use backend::db::mock::MockDb;
use backend::db::Db;
use backend::environment::{Config, Environment, VecStore};
use backend::routes;
use backend::store::mock::MockStore;
use backend::urls::Urls;

const BOUNDARY: &str = "thisisaboundary1234";
const COVER_TTL_SECONDS: u64 = 600;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SavedSongResponse {
    id: i32,
    cover_image: Option<String>,
    audio_file: Option<String>,
    lyric_file: Option<String>,
    lyric_lines: usize,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SongDetailResponse {
    id: i32,
    title: String,
    artist: ArtistResponse,
    language: String,
    genre: String,
    duration_seconds: i32,
    cover_image: Option<String>,
    audio_file: Option<String>,
    lyric_file: Option<String>,
    created_at: i64,
    updated_at: i64,
    lyrics: Vec<LyricLineResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ArtistResponse {
    id: i32,
    name: String,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct LyricLineResponse {
    timestamp: f64,
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MediaResponse {
    url: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SavedRecordingResponse {
    id: String,
    audio_file: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecordingsResponse {
    recordings: Vec<RecordingResponse>,
}

#[derive(Debug, Deserialize)]
struct RecordingResponse {
    id: String,
    user_id: String,
    song_id: i32,
}

struct Fixture {
    environment: Environment<()>,
    db: Arc<MockDb>,
    store: Arc<MockStore>,
    admin: Uuid,
}

fn fixture() -> Fixture {
    let logger = Arc::new(log::discard_logger());
    let db = Arc::new(MockDb::new());
    let store = Arc::new(MockStore::new());

    let wide_db: Arc<dyn Db + Send + Sync> = db.clone();
    let wide_store: Arc<VecStore<()>> = store.clone();

    let urls = Arc::new(Urls::new(
        "https://karaoke.test/",
        "artists",
        "songs",
        "recordings",
        "media",
    ));

    let environment = Environment::new(
        logger,
        wide_db,
        urls,
        wide_store,
        Config::new(COVER_TTL_SECONDS),
    );

    Fixture {
        environment,
        db,
        store,
        admin: Uuid::new_v4(),
    }
}

fn api(
    environment: Environment<()>,
) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    let logger = environment.logger.clone();

    routes::make_artists_list_route(environment.clone())
        .or(routes::make_artist_create_route(environment.clone()))
        .or(routes::make_songs_list_route(environment.clone()))
        .or(routes::make_song_lyrics_clear_route(environment.clone()))
        .or(routes::make_song_detail_route(environment.clone()))
        .or(routes::make_song_create_route(environment.clone()))
        .or(routes::make_song_update_route(environment.clone()))
        .or(routes::make_song_delete_route(environment.clone()))
        .or(routes::make_recordings_list_route(environment.clone()))
        .or(routes::make_recording_create_route(environment.clone()))
        .or(routes::make_recording_audio_route(environment.clone()))
        .or(routes::make_recording_delete_route(environment.clone()))
        .or(routes::make_media_route(environment))
        .recover(move |r| routes::format_rejection(logger.clone(), r))
}

fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = vec![];

    for (name, content_type, data) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"", name).as_bytes(),
        );

        if let Some(content_type) = content_type {
            body.extend_from_slice(format!("\r\nContent-Type: {}", content_type).as_bytes());
        }

        body.extend_from_slice(b"\r\n\r\n");
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    body
}

fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}

fn as_user(builder: warp::test::RequestBuilder, user: &Uuid) -> warp::test::RequestBuilder {
    builder.header("x-user-id", user.to_string())
}

fn as_admin(builder: warp::test::RequestBuilder, user: &Uuid) -> warp::test::RequestBuilder {
    as_user(builder, user).header("x-user-admin", "1")
}

async fn create_artist(fixture: &Fixture) -> i32 {
    let artist = fixture
        .db
        .create_artist("Carly Rae Jepsen".to_owned())
        .await
        .expect("create artist");

    artist.id
}

fn song_metadata_json(artist_id: i32) -> Vec<u8> {
    format!(
        r#"{{"title": "Call Me Maybe", "artist_id": {}, "language": "en", "genre": "pop", "duration_seconds": 193}}"#,
        artist_id
    )
    .into_bytes()
}

async fn create_song<F>(
    fixture: &Fixture,
    filter: &F,
    extra_parts: &[(&str, Option<&str>, &[u8])],
) -> SavedSongResponse
where
    F: Filter<Error = warp::Rejection> + 'static,
    F::Extract: Reply + Send,
{
    let artist_id = create_artist(fixture).await;

    let metadata = song_metadata_json(artist_id);
    let mut parts: Vec<(&str, Option<&str>, &[u8])> =
        vec![("metadata", Some("application/json"), &metadata)];
    parts.extend_from_slice(extra_parts);

    let body = multipart_body(&parts);

    let response = as_admin(warp::test::request(), &fixture.admin)
        .path("/songs")
        .method("POST")
        .header("content-type", multipart_content_type())
        .header("content-length", body.len())
        .body(body)
        .reply(filter)
        .await;

    assert_eq!(response.status(), StatusCode::CREATED, "create song: {:?}", response.body());

    serde_json::from_slice(response.body()).expect("parse song creation response")
}

async fn create_recording<F>(
    fixture: &Fixture,
    filter: &F,
    user: &Uuid,
    song_id: i32,
    audio: &[u8],
) -> SavedRecordingResponse
where
    F: Filter<Error = warp::Rejection> + 'static,
    F::Extract: Reply + Send,
{
    let metadata = format!(r#"{{"song_id": {}, "duration_seconds": 57}}"#, song_id).into_bytes();
    let body = multipart_body(&[
        ("metadata", Some("application/json"), &metadata),
        ("audio", Some("audio/webm"), audio),
    ]);

    let response = as_user(warp::test::request(), user)
        .path("/recordings")
        .method("POST")
        .header("content-type", multipart_content_type())
        .header("content-length", body.len())
        .body(body)
        .reply(filter)
        .await;

    assert_eq!(
        response.status(),
        StatusCode::CREATED,
        "create recording: {:?}",
        response.body()
    );

    serde_json::from_slice(response.body()).expect("parse recording creation response")
}

const LRC: &[u8] = b"[ar: Carly Rae Jepsen]\n[01:04]I threw a wish in the well\n[00:13.20][00:42]Don't ask me, I'll never tell\n[00:55]\n";

#[tokio::test]
async fn song_upload_derives_ordered_lyrics() {
    let fixture = fixture();
    let filter = api(fixture.environment.clone());

    let saved = create_song(
        &fixture,
        &filter,
        &[
            ("lrc", Some("text/plain"), LRC),
            ("audio", Some("audio/mpeg"), b"mp3-bytes"),
        ],
    )
    .await;

    assert_eq!(saved.lyric_lines, 3);
    assert!(saved.lyric_file.is_some());
    assert!(saved.audio_file.is_some());
    assert!(saved.cover_image.is_none());

    let response = as_user(warp::test::request(), &Uuid::new_v4())
        .path(&format!("/songs/{}", saved.id))
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::OK);

    let detail: SongDetailResponse =
        serde_json::from_slice(response.body()).expect("parse song detail");

    assert_eq!(detail.id, saved.id);
    assert_eq!(detail.title, "Call Me Maybe");
    assert_eq!(detail.artist.name, "Carly Rae Jepsen");
    assert_eq!(
        detail.lyrics,
        vec![
            LyricLineResponse {
                timestamp: 13.2,
                text: "Don't ask me, I'll never tell".to_owned(),
            },
            LyricLineResponse {
                timestamp: 42.0,
                text: "Don't ask me, I'll never tell".to_owned(),
            },
            LyricLineResponse {
                timestamp: 64.0,
                text: "I threw a wish in the well".to_owned(),
            },
        ]
    );
}

#[tokio::test]
async fn invalid_lyric_bytes_yield_zero_lines_but_keep_the_file() {
    let fixture = fixture();
    let filter = api(fixture.environment.clone());

    let saved = create_song(
        &fixture,
        &filter,
        &[("lrc", Some("text/plain"), &[0xff, 0xfe, 0x00, 0x9f])],
    )
    .await;

    assert_eq!(saved.lyric_lines, 0);
    assert!(saved.lyric_file.is_some());
    assert!(fixture.db.lyric_lines_for(saved.id).is_empty());
}

#[tokio::test]
async fn non_admins_cannot_manage_the_catalog() {
    let fixture = fixture();
    let filter = api(fixture.environment.clone());

    let artist_id = create_artist(&fixture).await;
    let metadata = song_metadata_json(artist_id);
    let body = multipart_body(&[("metadata", Some("application/json"), &metadata)]);

    let response = as_user(warp::test::request(), &Uuid::new_v4())
        .path("/songs")
        .method("POST")
        .header("content-type", multipart_content_type())
        .header("content-length", body.len())
        .body(body)
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn requests_without_identity_are_unauthorized() {
    let fixture = fixture();
    let filter = api(fixture.environment.clone());

    let response = warp::test::request().path("/songs").reply(&filter).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn media_gateway_signs_song_media_for_any_user() {
    let fixture = fixture();
    let filter = api(fixture.environment.clone());

    let saved = create_song(
        &fixture,
        &filter,
        &[
            ("cover", Some("image/jpeg"), b"jpeg-bytes"),
            ("audio", Some("audio/mpeg"), b"mp3-bytes"),
            ("lrc", Some("text/plain"), LRC),
        ],
    )
    .await;

    let stranger = Uuid::new_v4();

    for key in &[
        saved.cover_image.as_ref().expect("cover key"),
        saved.audio_file.as_ref().expect("audio key"),
        saved.lyric_file.as_ref().expect("lyric key"),
    ] {
        let response = as_user(warp::test::request(), &stranger)
            .path(&format!("/media?key={}", key))
            .reply(&filter)
            .await;

        assert_eq!(response.status(), StatusCode::OK, "{:?}", response.body());

        let media: MediaResponse =
            serde_json::from_slice(response.body()).expect("parse media response");

        assert_eq!(media.expires_in, 300);
        assert!(media.url.contains(key.as_str()));
    }
}

#[tokio::test]
async fn media_gateway_keeps_recordings_private() {
    let fixture = fixture();
    let filter = api(fixture.environment.clone());

    let saved_song = create_song(&fixture, &filter, &[]).await;

    let owner = Uuid::new_v4();
    let recording = create_recording(&fixture, &filter, &owner, saved_song.id, b"take-1").await;

    let own_response = as_user(warp::test::request(), &owner)
        .path(&format!("/media?key={}", recording.audio_file))
        .reply(&filter)
        .await;

    assert_eq!(own_response.status(), StatusCode::OK);

    let foreign_response = as_user(warp::test::request(), &Uuid::new_v4())
        .path(&format!("/media?key={}", recording.audio_file))
        .reply(&filter)
        .await;

    assert_eq!(foreign_response.status(), StatusCode::FORBIDDEN);

    // an unknown key looks exactly like a denied one
    let unknown_response = as_user(warp::test::request(), &owner)
        .path("/media?key=no/such/key")
        .reply(&filter)
        .await;

    assert_eq!(unknown_response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn media_gateway_requires_a_key() {
    let fixture = fixture();
    let filter = api(fixture.environment.clone());

    let response = as_user(warp::test::request(), &Uuid::new_v4())
        .path("/media")
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn replacing_song_audio_deletes_only_the_old_blob() {
    let fixture = fixture();
    let filter = api(fixture.environment.clone());

    let saved = create_song(
        &fixture,
        &filter,
        &[("audio", Some("audio/mpeg"), b"old-audio")],
    )
    .await;
    let old_key = saved.audio_file.expect("audio key");

    let body = multipart_body(&[("audio", Some("audio/mpeg"), b"new-audio")]);

    let response = as_admin(warp::test::request(), &fixture.admin)
        .path(&format!("/songs/{}", saved.id))
        .method("POST")
        .header("content-type", multipart_content_type())
        .header("content-length", body.len())
        .body(body)
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::OK, "{:?}", response.body());

    let updated: SavedSongResponse =
        serde_json::from_slice(response.body()).expect("parse update response");
    let new_key = updated.audio_file.expect("new audio key");

    assert_ne!(new_key, old_key);
    assert_eq!(fixture.store.deleted_keys(), vec![old_key]);
    assert!(fixture.store.contains(&new_key));
}

#[tokio::test]
async fn deleting_a_song_without_blobs_touches_the_store_not_at_all() {
    let fixture = fixture();
    let filter = api(fixture.environment.clone());

    let saved = create_song(&fixture, &filter, &[]).await;

    let response = as_admin(warp::test::request(), &fixture.admin)
        .path(&format!("/songs/{}", saved.id))
        .method("DELETE")
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(fixture.store.deleted_keys().is_empty());
}

#[tokio::test]
async fn deleting_a_song_removes_its_blobs_and_lyrics() {
    let fixture = fixture();
    let filter = api(fixture.environment.clone());

    let saved = create_song(
        &fixture,
        &filter,
        &[
            ("cover", Some("image/jpeg"), b"jpeg-bytes"),
            ("audio", Some("audio/mpeg"), b"mp3-bytes"),
            ("lrc", Some("text/plain"), LRC),
        ],
    )
    .await;

    let response = as_admin(warp::test::request(), &fixture.admin)
        .path(&format!("/songs/{}", saved.id))
        .method("DELETE")
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let mut deleted = fixture.store.deleted_keys();
    deleted.sort();
    let mut expected = vec![
        saved.cover_image.expect("cover key"),
        saved.audio_file.expect("audio key"),
        saved.lyric_file.expect("lyric key"),
    ];
    expected.sort();

    assert_eq!(deleted, expected);
    assert!(fixture.db.lyric_lines_for(saved.id).is_empty());
}

#[tokio::test]
async fn clearing_lyrics_clears_derived_lines_too() {
    let fixture = fixture();
    let filter = api(fixture.environment.clone());

    let saved = create_song(&fixture, &filter, &[("lrc", Some("text/plain"), LRC)]).await;
    assert_eq!(saved.lyric_lines, 3);
    let lyric_key = saved.lyric_file.expect("lyric key");

    let response = as_admin(warp::test::request(), &fixture.admin)
        .path(&format!("/songs/{}/lyrics", saved.id))
        .method("DELETE")
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(fixture.store.deleted_keys(), vec![lyric_key]);

    let detail_response = as_user(warp::test::request(), &Uuid::new_v4())
        .path(&format!("/songs/{}", saved.id))
        .reply(&filter)
        .await;

    let detail: SongDetailResponse =
        serde_json::from_slice(detail_response.body()).expect("parse song detail");

    assert!(detail.lyric_file.is_none());
    assert!(detail.lyrics.is_empty());
}

#[tokio::test]
async fn reuploading_identical_lyrics_is_idempotent() {
    let fixture = fixture();
    let filter = api(fixture.environment.clone());

    let saved = create_song(&fixture, &filter, &[("lrc", Some("text/plain"), LRC)]).await;
    let first = fixture.db.lyric_lines_for(saved.id);

    let body = multipart_body(&[("lrc", Some("text/plain"), LRC)]);
    let response = as_admin(warp::test::request(), &fixture.admin)
        .path(&format!("/songs/{}", saved.id))
        .method("POST")
        .header("content-type", multipart_content_type())
        .header("content-length", body.len())
        .body(body)
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(fixture.db.lyric_lines_for(saved.id), first);
}

#[tokio::test]
async fn recordings_are_listed_per_owner() {
    let fixture = fixture();
    let filter = api(fixture.environment.clone());

    let saved_song = create_song(&fixture, &filter, &[]).await;

    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    create_recording(&fixture, &filter, &alice, saved_song.id, b"alice-take").await;
    create_recording(&fixture, &filter, &bob, saved_song.id, b"bob-take").await;

    let response = as_user(warp::test::request(), &alice)
        .path("/recordings")
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::OK);

    let listed: RecordingsResponse =
        serde_json::from_slice(response.body()).expect("parse recordings response");

    assert_eq!(listed.recordings.len(), 1);
    assert_eq!(listed.recordings[0].user_id, alice.to_string());
    assert_eq!(listed.recordings[0].song_id, saved_song.id);
}

#[tokio::test]
async fn replacing_recording_audio_deletes_the_old_take() {
    let fixture = fixture();
    let filter = api(fixture.environment.clone());

    let saved_song = create_song(&fixture, &filter, &[]).await;

    let owner = Uuid::new_v4();
    let recording = create_recording(&fixture, &filter, &owner, saved_song.id, b"take-1").await;

    let body = multipart_body(&[("audio", Some("audio/webm"), b"take-2")]);
    let response = as_user(warp::test::request(), &owner)
        .path(&format!("/recordings/{}", recording.id))
        .method("POST")
        .header("content-type", multipart_content_type())
        .header("content-length", body.len())
        .body(body)
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::OK, "{:?}", response.body());

    let updated: SavedRecordingResponse =
        serde_json::from_slice(response.body()).expect("parse replacement response");

    assert_ne!(updated.audio_file, recording.audio_file);
    assert_eq!(fixture.store.deleted_keys(), vec![recording.audio_file]);
    assert!(fixture.store.contains(&updated.audio_file));
}

#[tokio::test]
async fn only_the_owner_or_an_admin_may_delete_a_recording() {
    let fixture = fixture();
    let filter = api(fixture.environment.clone());

    let saved_song = create_song(&fixture, &filter, &[]).await;

    let owner = Uuid::new_v4();
    let recording = create_recording(&fixture, &filter, &owner, saved_song.id, b"take-1").await;

    let foreign_response = as_user(warp::test::request(), &Uuid::new_v4())
        .path(&format!("/recordings/{}", recording.id))
        .method("DELETE")
        .reply(&filter)
        .await;

    assert_eq!(foreign_response.status(), StatusCode::FORBIDDEN);

    let owner_response = as_user(warp::test::request(), &owner)
        .path(&format!("/recordings/{}", recording.id))
        .method("DELETE")
        .reply(&filter)
        .await;

    assert_eq!(owner_response.status(), StatusCode::NO_CONTENT);
    assert_eq!(fixture.store.deleted_keys(), vec![recording.audio_file]);
}

#[tokio::test]
async fn song_list_carries_signed_cover_thumbnails() {
    let fixture = fixture();
    let filter = api(fixture.environment.clone());

    let saved = create_song(
        &fixture,
        &filter,
        &[("cover", Some("image/jpeg"), b"jpeg-bytes")],
    )
    .await;
    let cover_key = saved.cover_image.expect("cover key");

    let response = as_user(warp::test::request(), &Uuid::new_v4())
        .path("/songs")
        .reply(&filter)
        .await;

    assert_eq!(response.status(), StatusCode::OK);

    let listed: serde_json::Value =
        serde_json::from_slice(response.body()).expect("parse song list");
    let songs = listed["songs"].as_array().expect("songs array");

    assert_eq!(songs.len(), 1);

    let cover_url = songs[0]["cover_url"].as_str().expect("cover url");
    assert!(cover_url.contains(&cover_key));
    // the list page signs with its own, longer TTL
    assert!(cover_url.contains(&format!("expires={}", COVER_TTL_SECONDS)));
}
