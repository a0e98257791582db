//! Garbage collection of blobs tied to catalog entity lifecycle.
//!
//! Two situations orphan a blob: the owning record is deleted, or a
//! file-bearing attribute is re-pointed at a new key. Deletion-driven
//! cleanup surfaces failures (a leaked blob is permanent otherwise);
//! replacement-driven cleanup is best-effort and only logs, because the
//! record update it follows has already committed.

use std::sync::Arc;

use log::{debug, warn, Logger};

use crate::environment::VecStore;
use crate::errors::BackendError;

/// Deletes every present blob of a deleted entity. Blobs already absent
/// from the store count as deleted; any other failure is returned so
/// the caller can surface or retry it.
pub async fn remove_entity_files<O>(
    logger: &Logger,
    store: &Arc<VecStore<O>>,
    keys: &[&str],
) -> Result<(), BackendError> {
    for key in keys {
        if store.exists(key).await? {
            store.delete(key).await?;
            debug!(logger, "Deleted blob of removed entity"; "key" => *key);
        }
    }

    Ok(())
}

/// Deletes the old blob behind a replaced attribute, once the owning
/// record's update has committed. Does nothing when the attribute is
/// new, unchanged, or cleared without a prior value. Failures are
/// logged and swallowed.
pub async fn remove_replaced_file<O>(
    logger: &Logger,
    store: &Arc<VecStore<O>>,
    old: Option<&str>,
    new: Option<&str>,
) {
    let old = match old {
        Some(old) if new != Some(old) => old,
        _ => return,
    };

    let result = async {
        if store.exists(old).await? {
            store.delete(old).await?;
        }

        Ok::<(), BackendError>(())
    }
    .await;

    match result {
        Ok(()) => debug!(logger, "Deleted replaced blob"; "key" => old),
        Err(e) => {
            warn!(logger, "Failed to delete replaced blob: {}", e; "key" => old);
        }
    }
}
