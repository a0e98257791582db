//! Keeps a song's derived lyric lines consistent with its lyric file.
//!
//! The invariant: a song's stored lyric lines are exactly the parse of
//! its current lyric file. Whole-set replacement is delegated to
//! [`Db::replace_lyric_lines`], which is atomic from a reader's
//! perspective, so readers never observe a partially synced song.

use std::sync::Arc;

use log::{debug, warn, Logger};

use crate::db::Db;
use crate::errors::BackendError;
use crate::lrc;
use crate::song::SongId;

/// The result of a sync. A warning means the primary write still
/// succeeded but the lyric set is empty for a reason the operator
/// should know about.
#[derive(Debug)]
pub struct LyricSync {
    /// How many lyric lines the song now has.
    pub lines: usize,

    /// What went wrong, if anything.
    pub warning: Option<LyricSyncWarning>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LyricSyncWarning {
    /// The lyric file was not valid UTF-8. The song keeps the file but
    /// gets no lyric lines.
    InvalidText,
}

/// Re-derives the song's lyric lines from `content`, or clears them
/// when the lyric file has been removed (`None`).
///
/// A lyric file that fails to decode never fails the caller's save; the
/// song ends up with zero lines and the returned warning says why.
pub async fn sync_lyrics(
    logger: &Logger,
    db: &Arc<dyn Db + Send + Sync>,
    song_id: SongId,
    content: Option<&[u8]>,
) -> Result<LyricSync, BackendError> {
    let (events, warning) = match content {
        None => (vec![], None),
        Some(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => (lrc::parse(text), None),
            Err(_) => (vec![], Some(LyricSyncWarning::InvalidText)),
        },
    };

    db.replace_lyric_lines(song_id, &events).await?;

    if let Some(warning) = warning {
        warn!(logger, "Lyric file could not be decoded; no lyric lines derived"; "song_id" => song_id, "warning" => format!("{:?}", warning));
    } else {
        debug!(logger, "Synced lyric lines"; "song_id" => song_id, "lines" => events.len());
    }

    Ok(LyricSync {
        lines: events.len(),
        warning,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use log::discard_logger;

    use super::{sync_lyrics, LyricSyncWarning};
    use crate::db::mock::MockDb;
    use crate::db::Db;

    fn db() -> Arc<dyn Db + Send + Sync> {
        Arc::new(MockDb::new())
    }

    #[tokio::test]
    async fn derives_lines_from_content() {
        let db = db();

        let sync = sync_lyrics(&discard_logger(), &db, 1, Some(&b"[00:01]Hi\n[00:02]There"[..]))
            .await
            .expect("sync lyrics");

        assert_eq!(sync.lines, 2);
        assert!(sync.warning.is_none());
        assert_eq!(
            db.retrieve_lyric_lines(1).await.expect("retrieve").len(),
            2
        );
    }

    #[tokio::test]
    async fn resyncing_replaces_the_whole_set() {
        let db = db();
        let logger = discard_logger();

        sync_lyrics(&logger, &db, 1, Some(&b"[00:01]One\n[00:02]Two"[..]))
            .await
            .expect("first sync");
        let sync = sync_lyrics(&logger, &db, 1, Some(&b"[00:05]Only"[..]))
            .await
            .expect("second sync");

        assert_eq!(sync.lines, 1);

        let lines = db.retrieve_lyric_lines(1).await.expect("retrieve");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Only");
    }

    #[tokio::test]
    async fn resyncing_identical_content_is_idempotent() {
        let db = db();
        let logger = discard_logger();
        let content: &[u8] = b"[00:12.50]Hello\n[01:05]World";

        sync_lyrics(&logger, &db, 1, Some(content)).await.expect("first sync");
        let first = db.retrieve_lyric_lines(1).await.expect("retrieve");

        sync_lyrics(&logger, &db, 1, Some(content)).await.expect("second sync");
        let second = db.retrieve_lyric_lines(1).await.expect("retrieve");

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn invalid_text_yields_empty_set_and_warning() {
        let db = db();
        let logger = discard_logger();

        sync_lyrics(&logger, &db, 1, Some(&b"[00:01]Old"[..])).await.expect("seed");

        let sync = sync_lyrics(&logger, &db, 1, Some(&[0xff, 0xfe, 0x00][..]))
            .await
            .expect("sync invalid bytes");

        assert_eq!(sync.lines, 0);
        assert_eq!(sync.warning, Some(LyricSyncWarning::InvalidText));
        assert!(db.retrieve_lyric_lines(1).await.expect("retrieve").is_empty());
    }

    #[tokio::test]
    async fn clearing_removes_all_lines() {
        let db = db();
        let logger = discard_logger();

        sync_lyrics(&logger, &db, 1, Some(&b"[00:01]Old"[..])).await.expect("seed");
        let sync = sync_lyrics(&logger, &db, 1, None).await.expect("clear");

        assert_eq!(sync.lines, 0);
        assert!(sync.warning.is_none());
        assert!(db.retrieve_lyric_lines(1).await.expect("retrieve").is_empty());
    }
}
