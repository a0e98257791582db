use url::Url;
use uuid::Uuid;

use crate::song::SongId;

/// Convenience wrapper for URL generation functions.
#[derive(Clone)]
pub struct Urls {
    /// Top-level URL, including trailing slash.
    base: Url,

    /// Path for all artist-catalog actions.
    pub(crate) artists_path: String,

    /// Path for all song-catalog actions.
    pub(crate) songs_path: String,

    /// Path for all recording actions.
    pub(crate) recordings_path: String,

    /// Path of the secure media gateway.
    pub(crate) media_path: String,
}

impl Urls {
    /// Create a new instance. The path arguments should *not* include
    /// trailing slashes.
    pub fn new(
        base: impl AsRef<str>,
        artists_path: impl Into<String>,
        songs_path: impl Into<String>,
        recordings_path: impl Into<String>,
        media_path: impl Into<String>,
    ) -> Self {
        let base =
            Url::parse(base.as_ref()).unwrap_or_else(|_| panic!("parse {} as URL", base.as_ref()));

        Urls {
            base,
            artists_path: artists_path.into(),
            songs_path: songs_path.into(),
            recordings_path: recordings_path.into(),
            media_path: media_path.into(),
        }
    }

    pub fn song(&self, id: SongId) -> Url {
        self.base
            .join(&format!("{}/{}", self.songs_path, id))
            .unwrap_or_else(|_| panic!("get URL for song {}", id))
    }

    pub fn recording(&self, id: &Uuid) -> Url {
        self.base
            .join(&format!("{}/{}", self.recordings_path, id))
            .unwrap_or_else(|_| panic!("get URL for recording {}", id))
    }
}
