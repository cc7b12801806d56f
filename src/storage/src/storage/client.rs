// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::request_options::RequestOptions;
use crate::builder::storage::UploadObject;
use crate::model::NewFile;
use crate::upload_source::{Payload, StreamingSource};
use crate::{Error, Result};
use b2_auth::authorizer::AccountAuthorizer;
use b2_auth::constants::{DEFAULT_ENDPOINT, ENDPOINT_VAR};
use b2_auth::credentials::Credentials;
use b2_auth::session::Session;
use b2_auth::session_cache::SessionCache;
use std::sync::Arc;
use std::time::Duration;

/// Implements a client for the Backblaze B2 native API.
///
/// # Example
/// ```
/// # use b2_storage::client::Storage;
/// # async fn sample() -> anyhow::Result<()> {
/// let client = Storage::builder().build().await?;
/// let file = client
///     .upload_object("my-bucket-id", "my-object", "hello world")
///     .send()
///     .await?;
/// println!("uploaded {file:?}");
/// # Ok(()) }
/// ```
///
/// # Configuration
///
/// To configure `Storage` use the `with_*` methods in the type returned by
/// [builder()][Storage::builder]. The default configuration should work for
/// most applications. Common configuration changes include
///
/// * [with_credentials()]: by default the client loads the application key
///   from the `B2_APPLICATION_KEY_ID` and `B2_APPLICATION_KEY` environment
///   variables.
/// * [with_endpoint()]: by default the client authorizes the account at
///   `https://api.backblazeb2.com`, or `B2_ENDPOINT` if set.
///
/// # Pooling and Cloning
///
/// `Storage` holds a connection pool internally, it is advised to
/// create one and then reuse it. You do not need to wrap `Storage` in
/// an [Rc](std::rc::Rc) or [Arc] to reuse it, because it already uses an `Arc`
/// internally.
///
/// [with_credentials()]: ClientBuilder::with_credentials
/// [with_endpoint()]: ClientBuilder::with_endpoint
#[derive(Clone, Debug)]
pub struct Storage {
    pub(crate) inner: Arc<StorageInner>,
}

#[derive(Clone, Debug)]
pub(crate) struct StorageInner {
    pub client: reqwest::Client,
    pub sessions: SessionCache,
    pub options: RequestOptions,
}

impl Storage {
    /// Returns a builder for [Storage].
    ///
    /// # Example
    /// ```
    /// # use b2_storage::client::Storage;
    /// # async fn sample() -> anyhow::Result<()> {
    /// let client = Storage::builder().build().await?;
    /// # Ok(()) }
    /// ```
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Uploads an object, choosing between a single request and a large file.
    ///
    /// # Example
    /// ```
    /// # use b2_storage::client::Storage;
    /// # async fn sample(client: &Storage) -> anyhow::Result<()> {
    /// let file = tokio::fs::File::open("my-data.tar").await?;
    /// let response = client
    ///     .upload_object("my-bucket-id", "backups/my-data.tar", file)
    ///     .with_content_type("application/x-tar")
    ///     .send()
    ///     .await?;
    /// println!("response details={response:?}");
    /// # Ok(()) }
    /// ```
    pub fn upload_object<B, O, T, P>(&self, bucket_id: B, file_name: O, payload: T) -> UploadObject<P>
    where
        B: Into<String>,
        O: Into<String>,
        T: Into<Payload<P>>,
        Payload<P>: StreamingSource,
    {
        UploadObject::new(self.inner.clone(), bucket_id, file_name, payload)
    }

    /// Returns the current session, authorizing the account if needed.
    ///
    /// Applications may use the session to inspect the part sizes advertised
    /// by the service, or the capabilities of the application key.
    pub async fn session(&self) -> Result<Arc<Session>> {
        self.inner.session().await
    }

    pub(crate) fn new(builder: ClientBuilder) -> Result<Self> {
        let client = builder
            .request_timeout
            .iter()
            .fold(reqwest::Client::builder(), |b, t| b.timeout(*t))
            .build()
            .map_err(Error::io)?;
        let credentials = match builder.credentials {
            Some(c) => c,
            None => b2_auth::credentials::Builder::default()
                .build()
                .map_err(Error::authentication)?,
        };
        let endpoint = builder
            .endpoint
            .or_else(|| std::env::var(ENDPOINT_VAR).ok().filter(|e| !e.is_empty()))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let authorizer = AccountAuthorizer::new(client.clone(), endpoint, credentials);
        let inner = StorageInner {
            client,
            sessions: SessionCache::new(authorizer),
            options: builder.default_options,
        };
        Ok(Self {
            inner: Arc::new(inner),
        })
    }
}

impl StorageInner {
    /// Returns a snapshot of the current session.
    pub(crate) async fn session(&self) -> Result<Arc<Session>> {
        self.sessions
            .session()
            .await
            .map_err(Error::authentication)
    }

    /// Rejects objects the application key cannot write.
    pub(crate) async fn check_write_scope(&self, file: &NewFile) -> Result<()> {
        let session = self.session().await?;
        if session.allows_bucket(&file.bucket_id) && session.allows_name(&file.file_name) {
            return Ok(());
        }
        Err(Error::invalid_argument(format!(
            "the application key cannot write {} in bucket {}",
            file.file_name, file.bucket_id
        )))
    }
}

/// A builder for [Storage].
///
/// ```
/// # use b2_storage::client::Storage;
/// # async fn sample() -> anyhow::Result<()> {
/// let builder = Storage::builder();
/// let client = builder
///     .with_endpoint("https://api.backblazeb2.com")
///     .with_concurrency(8)
///     .build()
///     .await?;
/// # Ok(()) }
/// ```
pub struct ClientBuilder {
    pub(crate) endpoint: Option<String>,
    pub(crate) credentials: Option<Credentials>,
    pub(crate) request_timeout: Option<Duration>,
    // Default options for uploads.
    pub(crate) default_options: RequestOptions,
}

impl ClientBuilder {
    pub(crate) fn new() -> Self {
        Self {
            endpoint: None,
            credentials: None,
            request_timeout: None,
            default_options: RequestOptions::new(),
        }
    }

    /// Creates a new client.
    ///
    /// Fails if no credentials are configured and the environment does not
    /// provide them. The account is authorized lazily, with the first request.
    pub async fn build(self) -> Result<Storage> {
        Storage::new(self)
    }

    /// Sets the endpoint for the authorize call.
    ///
    /// All other requests use the URLs returned by the service when the account
    /// is authorized.
    pub fn with_endpoint<V: Into<String>>(mut self, v: V) -> Self {
        self.endpoint = Some(v.into());
        self
    }

    /// Configures the application key.
    ///
    /// ```
    /// # use b2_storage::client::Storage;
    /// # async fn sample() -> anyhow::Result<()> {
    /// let credentials = b2_auth::credentials::Builder::default()
    ///     .with_key_id("my-key-id")
    ///     .with_application_key("my-application-key")
    ///     .build()?;
    /// let client = Storage::builder()
    ///     .with_credentials(credentials)
    ///     .build()
    ///     .await?;
    /// # Ok(()) }
    /// ```
    pub fn with_credentials<V: Into<Credentials>>(mut self, v: V) -> Self {
        self.credentials = Some(v.into());
        self
    }

    /// Sets a deadline for each request, including the time to send the data.
    ///
    /// Requests exceeding the deadline fail with an error where
    /// [is_timeout()][crate::Error::is_timeout] is true. The client does not
    /// retry them.
    pub fn with_request_timeout(mut self, v: Duration) -> Self {
        self.request_timeout = Some(v);
        self
    }

    /// Overrides the part size recommended by the service.
    ///
    /// The part size is never smaller than the minimum advertised by the
    /// service, nor larger than 5 GB.
    pub fn with_part_size(mut self, v: u64) -> Self {
        self.default_options.part_size = Some(v);
        self
    }

    /// Sets the maximum number of part uploads in flight for one large file.
    ///
    /// Each part is buffered in memory until it is uploaded, so memory usage
    /// grows with `concurrency * part_size`. The default is 4.
    pub fn with_concurrency(mut self, v: usize) -> Self {
        self.default_options.set_concurrency(v);
        self
    }

    /// Cancel large files started by `upload_object()` when the upload fails.
    ///
    /// Enabled by default. Disable it to resume the upload later with
    /// `list_parts()` or `resume_large_file()`.
    pub fn with_cancel_on_error(mut self, v: bool) -> Self {
        self.default_options.cancel_on_error = v;
        self
    }
}

const ENCODED_CHARS: percent_encoding::AsciiSet = percent_encoding::NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Percent-encodes object names and metadata values for use in headers.
///
/// The `/` separator is preserved.
pub(crate) fn enc(value: &str) -> String {
    percent_encoding::utf8_percent_encode(value, &ENCODED_CHARS).to_string()
}
