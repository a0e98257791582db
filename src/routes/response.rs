use serde::Serialize;
use url::Url;

use crate::gateway::MediaGrant;
use crate::lrc::LyricLine;
use crate::recording::Recording;
use crate::song::{Artist, Song, SongFiles, SongId};

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SuccessResponse<'a> {
    Artists(Vec<Artist>),
    Healthz {
        revision: Option<&'a str>,
        timestamp: Option<&'a str>,
        version: &'a str,
    },
    Media(MediaGrant),
    Recordings {
        recordings: Vec<Recording>,
    },
    SavedRecording {
        id: String,
        audio_file: String,
    },
    SavedSong {
        id: SongId,
        #[serde(flatten)]
        files: SongFiles,
        lyric_lines: usize,
    },
    Songs {
        songs: Vec<SongListItem>,
    },
}

/// A song detail page: the full record plus its ordered lyric lines.
#[derive(Debug, Serialize)]
pub struct SongDetail {
    #[serde(flatten)]
    pub song: Song,
    pub lyrics: Vec<LyricLine>,
}

/// One row of the song list page. The cover URL is pre-signed by the
/// list handler, a trusted internal caller of the URL issuer.
#[derive(Debug, Serialize)]
pub struct SongListItem {
    pub id: SongId,
    pub title: String,
    pub artist: String,
    pub language: String,
    pub genre: String,
    pub duration_seconds: i32,
    pub cover_url: Option<Url>,
}
