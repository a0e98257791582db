use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use url::Url;

use crate::errors::BackendError;
use crate::store::Store;

/// An in-memory store for tests. Records every delete so tests can
/// assert on garbage-collection behavior.
#[derive(Default)]
pub struct MockStore {
    pub map: RwLock<HashMap<String, Vec<u8>>>,
    pub deleted: RwLock<Vec<String>>,
}

impl MockStore {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.read().unwrap().contains_key(key)
    }

    pub fn deleted_keys(&self) -> Vec<String> {
        self.deleted.read().unwrap().clone()
    }
}

impl Store for MockStore {
    type Output = ();
    type Raw = Vec<u8>;

    fn exists(&self, key: &str) -> BoxFuture<Result<bool, BackendError>> {
        let present = self.contains(key);

        async move { Ok(present) }.boxed()
    }

    fn delete(&self, key: &str) -> BoxFuture<Result<(), BackendError>> {
        self.map.write().unwrap().remove(key);
        self.deleted.write().unwrap().push(key.to_owned());

        async { Ok(()) }.boxed()
    }

    fn save(
        &self,
        key: &str,
        _content_type: String,
        raw: Vec<u8>,
    ) -> BoxFuture<Result<(), BackendError>> {
        self.map.write().unwrap().insert(key.to_owned(), raw);

        async { Ok(()) }.boxed()
    }

    fn sign(&self, key: &str, ttl: Duration) -> Result<Url, BackendError> {
        let url = format!(
            "https://store.test/media/{}?expires={}",
            key,
            ttl.as_secs()
        );

        Url::parse(&url).map_err(|source| BackendError::UnableToParseSignedUrl { url, source })
    }
}
