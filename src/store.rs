use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use rusoto_core::Region;
use rusoto_credential::AwsCredentials;
use rusoto_s3::{
    DeleteObjectRequest, GetObjectRequest, HeadObjectError, HeadObjectRequest, PutObjectRequest,
    S3Client, StreamingBody, S3,
};
use url::Url;

use crate::errors::BackendError;

pub mod mock;

/// Client-side bound on every store call. The blob store has its own
/// timeouts, but an unresponsive endpoint must not wedge a request.
const CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// A blob store addressed by opaque string keys. Every component that
/// touches blobs receives one of these explicitly; there is no implicit
/// process-wide handle.
pub trait Store: Send + Sync {
    /// The type of successful save result.
    type Output;

    /// The type of raw data.
    type Raw;

    /// Checks whether the given object exists.
    fn exists(&self, key: &str) -> BoxFuture<Result<bool, BackendError>>;

    /// Deletes the given object.
    fn delete(&self, key: &str) -> BoxFuture<Result<(), BackendError>>;

    /// Saves the given data under the given key.
    fn save(
        &self,
        key: &str,
        content_type: String,
        raw: Self::Raw,
    ) -> BoxFuture<Result<Self::Output, BackendError>>;

    /// Produces a signed URL for the given object, valid for exactly
    /// `ttl` from now. Every call re-signs against the current clock.
    fn sign(&self, key: &str, ttl: Duration) -> Result<Url, BackendError>;
}

/// A store backed by an S3-compatible service.
pub struct S3Store {
    client: Arc<S3Client>,
    region: Region,
    credentials: AwsCredentials,
    bucket: String,
}

impl S3Store {
    /// Creates a new instance.
    pub fn new(
        client: Arc<S3Client>,
        region: Region,
        credentials: AwsCredentials,
        bucket: String,
    ) -> Self {
        Self {
            client,
            region,
            credentials,
            bucket,
        }
    }

    pub fn from_env() -> Result<Self, rusoto_core::request::TlsError> {
        use rusoto_core::request::HttpClient;
        use rusoto_credential::StaticProvider;

        use crate::config::get_variable;

        let access_key = get_variable("S3_ACCESS_KEY");
        let secret_access_key = get_variable("S3_SECRET_ACCESS_KEY");

        let region = Region::Custom {
            name: get_variable("S3_REGION_NAME"),
            endpoint: get_variable("S3_ENDPOINT"),
        };

        let bucket = get_variable("S3_BUCKET_NAME");

        let credentials = AwsCredentials::new(
            access_key.clone(),
            secret_access_key.clone(),
            None,
            None,
        );

        let client = Arc::new(S3Client::new_with(
            HttpClient::new()?,
            StaticProvider::new_minimal(access_key, secret_access_key),
            region.clone(),
        ));

        Ok(S3Store::new(client, region, credentials, bucket))
    }
}

impl Store for S3Store {
    type Output = ();
    type Raw = Vec<u8>;

    fn exists(&self, key: &str) -> BoxFuture<Result<bool, BackendError>> {
        with_retry(self, key.to_owned(), exists).boxed()
    }

    fn delete(&self, key: &str) -> BoxFuture<Result<(), BackendError>> {
        with_retry(self, key.to_owned(), delete).boxed()
    }

    fn save(
        &self,
        key: &str,
        content_type: String,
        raw: Vec<u8>,
    ) -> BoxFuture<Result<(), BackendError>> {
        upload(self, key.to_owned(), content_type, raw).boxed()
    }

    fn sign(&self, key: &str, ttl: Duration) -> Result<Url, BackendError> {
        use rusoto_s3::util::{PreSignedRequest, PreSignedRequestOption};

        let request = GetObjectRequest {
            bucket: self.bucket.clone(),
            key: key.to_owned(),
            ..Default::default()
        };

        let url = request.get_presigned_url(
            &self.region,
            &self.credentials,
            &PreSignedRequestOption { expires_in: ttl },
        );

        Url::parse(&url).map_err(|source| BackendError::UnableToParseSignedUrl { url, source })
    }
}

/// Runs a store call, retrying once if it failed with a timeout or a
/// dispatch error.
async fn with_retry<'a, T, F>(
    store: &'a S3Store,
    key: String,
    call: impl Fn(&'a S3Store, String) -> F,
) -> Result<T, BackendError>
where
    F: std::future::Future<Output = Result<T, BackendError>> + 'a,
{
    match call(store, key.clone()).await {
        Err(e) if e.is_transient() => call(store, key).await,
        other => other,
    }
}

async fn exists(store: &S3Store, key: String) -> Result<bool, BackendError> {
    use rusoto_core::RusotoError;

    let request = HeadObjectRequest {
        bucket: store.bucket.clone(),
        key,
        ..Default::default()
    };

    let result = tokio::time::timeout(CALL_TIMEOUT, store.client.head_object(request))
        .await
        .map_err(|_| BackendError::StoreTimeout)?;

    match result {
        Ok(_) => Ok(true),
        Err(RusotoError::Service(HeadObjectError::NoSuchKey(_))) => Ok(false),
        // S3 reports a missing key on HEAD as a bodyless 404
        Err(RusotoError::Unknown(response)) if response.status.as_u16() == 404 => Ok(false),
        Err(source) => Err(BackendError::HeadFailed { source }),
    }
}

async fn delete(store: &S3Store, key: String) -> Result<(), BackendError> {
    let request = DeleteObjectRequest {
        bucket: store.bucket.clone(),
        key,
        ..Default::default()
    };

    let result = tokio::time::timeout(CALL_TIMEOUT, store.client.delete_object(request))
        .await
        .map_err(|_| BackendError::StoreTimeout)?;

    result
        .map(|_| ())
        .map_err(|source| BackendError::DeleteFailed { source })
}

async fn upload(
    store: &S3Store,
    key: String,
    content_type: String,
    raw: Vec<u8>,
) -> Result<(), BackendError> {
    use std::convert::TryFrom;

    let len = i64::try_from(raw.len()).expect("raw data length must be within range of i64");

    let request = PutObjectRequest {
        body: Some(StreamingBody::from(raw)),
        bucket: store.bucket.clone(),
        content_length: Some(len),
        content_type: Some(content_type),
        key,
        ..Default::default()
    };

    let result = store.client.put_object(request).await;

    match result {
        Ok(_) => Ok(()),
        Err(source) => Err(BackendError::UploadFailed { source }),
    }
}
