use std::sync::Arc;
use std::time::Duration;

use log::Logger;

use crate::db::Db;
use crate::store::Store;
use crate::urls::Urls;

pub type VecStore<O> = dyn Store<Output = O, Raw = Vec<u8>> + Send + Sync;

/// Marker for store output types that are safe to thread through warp
/// filters.
pub trait SafeStore: Clone + Send + Sync {}

impl<O: Clone + Send + Sync> SafeStore for O {}

/// Everything a request handler needs, injected explicitly. The blob
/// store in particular is a capability handed to each component rather
/// than a process-wide default.
#[derive(Clone)]
pub struct Environment<O: Clone + Send + Sync> {
    pub logger: Arc<Logger>,
    pub db: Arc<dyn Db + Send + Sync>,
    pub urls: Arc<Urls>,
    pub store: Arc<VecStore<O>>,
    pub config: Config,
}

impl<O: Clone + Send + Sync> Environment<O> {
    pub fn new(
        logger: Arc<Logger>,
        db: Arc<dyn Db + Send + Sync>,
        urls: Arc<Urls>,
        store: Arc<VecStore<O>>,
        config: Config,
    ) -> Self {
        Self {
            logger,
            db,
            urls,
            store,
            config,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// How long signed cover-thumbnail URLs on list pages stay valid.
    pub(crate) cover_ttl: Duration,
}

impl Config {
    pub fn new(cover_ttl_seconds: u64) -> Self {
        Self {
            cover_ttl: Duration::from_secs(cover_ttl_seconds),
        }
    }
}
