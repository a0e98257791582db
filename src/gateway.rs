//! The secure media gateway: the only sanctioned path from a blob key
//! to a usable URL.
//!
//! Clients hold opaque storage keys. Possession of a key is never
//! sufficient: the gateway checks that the requesting user may access
//! the object behind it before minting a short-lived signed URL. Song
//! media is shareable among all authenticated users; recording audio is
//! private to its owner. A denied request is indistinguishable from a
//! request for a key that does not exist.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use url::Url;

use crate::db::Db;
use crate::environment::VecStore;
use crate::errors::BackendError;
use crate::identity::Identity;

/// How long a gateway-issued URL stays valid.
pub const MEDIA_URL_TTL: Duration = Duration::from_secs(300);

/// A signed URL plus its advertised lifetime in seconds.
#[derive(Clone, Debug, Serialize)]
pub struct MediaGrant {
    pub url: Url,
    pub expires_in: u64,
}

/// Authorizes `identity` against `key` and signs it on success.
pub async fn resolve_media<O>(
    db: &Arc<dyn Db + Send + Sync>,
    store: &Arc<VecStore<O>>,
    identity: &Identity,
    key: &str,
) -> Result<MediaGrant, BackendError> {
    if key.is_empty() {
        return Err(BackendError::bad_request("Missing key"));
    }

    let allowed = db.song_key_exists(key).await?
        || db.recording_key_owned_by(key, &identity.user_id).await?;

    if !allowed {
        return Err(BackendError::Forbidden);
    }

    let url = store.sign(key, MEDIA_URL_TTL)?;

    Ok(MediaGrant {
        url,
        expires_in: MEDIA_URL_TTL.as_secs(),
    })
}
