use std::error::Error;
use std::sync::Arc;

use warp::Filter;

use backend::config::get_variable;
use backend::db::PgDb;
use backend::environment::{Config, Environment};
use backend::routes;
use backend::store::S3Store;
use backend::urls::Urls;
use futures::future::FutureExt;
use log::{info, initialize_logger};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    let logger = initialize_logger();

    let store = Arc::new(S3Store::from_env().expect("initialize S3 store from environment"));

    let main_port: u16 = get_variable("KARAOKE_PORT")
        .parse()
        .expect("parse KARAOKE_PORT as u16");
    let admin_port: u16 = get_variable("KARAOKE_ADMIN_PORT")
        .parse()
        .expect("parse KARAOKE_ADMIN_PORT as u16");

    info!(logger, "Starting..."; "main_port" => main_port, "admin_port" => admin_port);
    let logger = Arc::new(logger);

    info!(logger, "Creating database pool...");
    let connection_string = get_variable("KARAOKE_DB_CONNECTION_STRING");
    let pool = sqlx::Pool::connect(&connection_string)
        .await
        .expect("create database pool from KARAOKE_DB_CONNECTION_STRING");
    let db = Arc::new(PgDb::new(pool));

    let urls = Arc::new(Urls::new(
        get_variable("KARAOKE_BASE_URL"),
        get_variable("KARAOKE_ARTISTS_PATH"),
        get_variable("KARAOKE_SONGS_PATH"),
        get_variable("KARAOKE_RECORDINGS_PATH"),
        get_variable("KARAOKE_MEDIA_PATH"),
    ));

    let config = Config::new(
        get_variable("KARAOKE_COVER_TTL_SECONDS")
            .parse()
            .expect("parse KARAOKE_COVER_TTL_SECONDS as u64"),
    );
    let environment = Environment::new(logger.clone(), db, urls, store, config);

    let (termination_sender, mut termination_receiver) = mpsc::channel::<()>(1);

    let terminate = Arc::new(move || {
        let termination_sender = termination_sender.clone();

        async move {
            let termination_sender = termination_sender.clone();
            termination_sender.send(()).await.unwrap();
        }
        .boxed()
    });

    let should_terminate = async move {
        termination_receiver.recv().await;
    }
    .shared();

    let ctrlc = {
        let should_terminate = should_terminate.clone();
        let terminate = terminate.clone();

        let signal = tokio::signal::ctrl_c();

        async move {
            let terminate = terminate.clone();

            tokio::select! {
                _ = should_terminate => {},
                _ = signal => {
                    terminate().await;
                }
            }
        }
    };

    let main_server = {
        let should_terminate = should_terminate.clone();

        let logger2 = logger.clone();

        let artists_list_route = routes::make_artists_list_route(environment.clone());
        let artist_create_route = routes::make_artist_create_route(environment.clone());
        let songs_list_route = routes::make_songs_list_route(environment.clone());
        let song_detail_route = routes::make_song_detail_route(environment.clone());
        let song_create_route = routes::make_song_create_route(environment.clone());
        let song_update_route = routes::make_song_update_route(environment.clone());
        let song_delete_route = routes::make_song_delete_route(environment.clone());
        let song_lyrics_clear_route = routes::make_song_lyrics_clear_route(environment.clone());
        let recordings_list_route = routes::make_recordings_list_route(environment.clone());
        let recording_create_route = routes::make_recording_create_route(environment.clone());
        let recording_audio_route = routes::make_recording_audio_route(environment.clone());
        let recording_delete_route = routes::make_recording_delete_route(environment.clone());
        let media_route = routes::make_media_route(environment.clone());

        let routes = artists_list_route
            .or(artist_create_route)
            .or(songs_list_route)
            .or(song_lyrics_clear_route)
            .or(song_detail_route)
            .or(song_create_route)
            .or(song_update_route)
            .or(song_delete_route)
            .or(recordings_list_route)
            .or(recording_create_route)
            .or(recording_audio_route)
            .or(recording_delete_route)
            .or(media_route)
            .recover(move |r| routes::format_rejection(logger2.clone(), r));

        let (_, main_server) =
            warp::serve(routes).bind_with_graceful_shutdown(([0, 0, 0, 0], main_port), async {
                should_terminate.await;
            });

        main_server
    };

    let admin_server = {
        let should_terminate = should_terminate.clone();
        let terminate = terminate.clone();

        let routes = routes::admin::make_healthz_route(environment.clone()).or(
            routes::admin::make_termination_route(environment.clone(), terminate),
        );

        let (_, admin_server) =
            warp::serve(routes).bind_with_graceful_shutdown(([0, 0, 0, 0], admin_port), async {
                should_terminate.await;
            });

        admin_server
    };

    tokio::join!(ctrlc, main_server, admin_server);

    info!(logger, "Exiting gracefully...");

    Ok(())
}
