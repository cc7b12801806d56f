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

//! Contains the request builder for [upload_object()] and related types.
//!
//! [upload_object()]: crate::client::Storage::upload_object()

use super::client::StorageInner;
use super::large_file::{LargeFileSession, SessionState};
use super::part_reader::{PartPayload, PartReader};
use super::part_size::{PartSizeLimits, UploadStrategy, plan};
use super::request_options::RequestOptions;
use crate::error::UploadError;
use crate::model::{File, NewFile, Part};
use crate::upload_source::{Payload, StreamingSource};
use crate::{Error, Result};
use std::sync::Arc;
use tokio::task::JoinSet;

/// A request builder for uploads.
///
/// Objects up to the recommended part size are uploaded with a single
/// request. Larger objects, and objects of unknown size that turn out to be
/// larger, are uploaded as large files, with several parts in flight.
///
/// # Example
/// ```
/// # use b2_storage::client::Storage;
/// # async fn sample(client: &Storage) -> anyhow::Result<()> {
/// let file = tokio::fs::File::open("my-data.tar").await?;
/// let response = client
///     .upload_object("my-bucket-id", "backups/my-data.tar", file)
///     .with_concurrency(8)
///     .with_file_info([("src_last_modified_millis", "1700000000000")])
///     .send()
///     .await?;
/// println!("response details={response:?}");
/// # Ok(()) }
/// ```
pub struct UploadObject<T> {
    inner: Arc<StorageInner>,
    file: NewFile,
    payload: Payload<T>,
    options: RequestOptions,
    resume: Option<File>,
}

impl<T> UploadObject<T> {
    /// Sets the MIME type of the object.
    ///
    /// When not set, the service guesses the type from the file name.
    ///
    /// # Example
    /// ```
    /// # use b2_storage::client::Storage;
    /// # async fn sample(client: &Storage) -> anyhow::Result<()> {
    /// let response = client
    ///     .upload_object("my-bucket-id", "my-object", "hello world")
    ///     .with_content_type("text/plain")
    ///     .send()
    ///     .await?;
    /// println!("response details={response:?}");
    /// # Ok(()) }
    /// ```
    pub fn with_content_type<V: Into<String>>(mut self, v: V) -> Self {
        self.file.content_type = Some(v.into());
        self
    }

    /// Sets custom metadata for the object.
    ///
    /// The service allows at most 10 entries.
    pub fn with_file_info<I, K, V>(mut self, i: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.file.file_info = i.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    /// Overrides the part size for this upload.
    ///
    /// The value is still subject to the minimum part size advertised by the
    /// service.
    pub fn with_part_size(mut self, v: u64) -> Self {
        self.options.part_size = Some(v);
        self
    }

    /// Sets the maximum number of part uploads in flight.
    pub fn with_concurrency(mut self, v: usize) -> Self {
        self.options.set_concurrency(v);
        self
    }

    /// Cancel the large file if the upload fails.
    ///
    /// Only large files started by this upload are canceled. Disable this
    /// option to resume the upload later.
    pub fn with_cancel_on_error(mut self, v: bool) -> Self {
        self.options.cancel_on_error = v;
        self
    }

    /// Continues a large file started earlier.
    ///
    /// The client lists the parts already uploaded, skips their bytes in the
    /// payload, and uploads the rest. Parts after the first missing part are
    /// uploaded again.
    ///
    /// # Example
    /// ```
    /// # use b2_storage::client::Storage;
    /// # use b2_storage::model::File;
    /// # async fn sample(client: &Storage) -> anyhow::Result<()> {
    /// let file = tokio::fs::File::open("my-data.tar").await?;
    /// let unfinished = File::new().set_file_id("4_z-my-file-id");
    /// let response = client
    ///     .upload_object("my-bucket-id", "backups/my-data.tar", file)
    ///     .with_resume(unfinished)
    ///     .send()
    ///     .await?;
    /// println!("response details={response:?}");
    /// # Ok(()) }
    /// ```
    pub fn with_resume(mut self, v: File) -> Self {
        self.resume = Some(v);
        self
    }
}

impl<T> UploadObject<T>
where
    Payload<T>: StreamingSource,
{
    pub(crate) fn new<B, O, P>(inner: Arc<StorageInner>, bucket_id: B, file_name: O, payload: P) -> Self
    where
        B: Into<String>,
        O: Into<String>,
        P: Into<Payload<T>>,
    {
        let options = inner.options.clone();
        Self {
            inner,
            file: NewFile::new(bucket_id, file_name),
            payload: payload.into(),
            options,
            resume: None,
        }
    }

    /// Uploads the object.
    ///
    /// The upload strategy is chosen once, before any data is sent. On
    /// failure, any large file started by this call is canceled (unless
    /// disabled with [with_cancel_on_error()][Self::with_cancel_on_error])
    /// and the original error is returned.
    pub async fn send(self) -> Result<File> {
        let Self {
            inner,
            file,
            payload,
            options,
            resume,
        } = self;
        file.validate()?;
        let session = inner.session().await?;
        let limits = PartSizeLimits::from_session(&session).with_part_size(options.part_size);
        let driver = Driver {
            inner,
            file,
            options,
            limits,
        };
        match resume {
            Some(unfinished) => driver.resume(payload, unfinished).await,
            None => driver.upload(payload).await,
        }
    }
}

struct Driver {
    inner: Arc<StorageInner>,
    file: NewFile,
    options: RequestOptions,
    limits: PartSizeLimits,
}

impl Driver {
    async fn upload<S>(&self, payload: S) -> Result<File>
    where
        S: StreamingSource,
    {
        let hint = payload.size_hint().await.map_err(Error::ser)?;
        let mut reader = PartReader::new(payload);
        let Some(size) = hint.exact() else {
            // Read one part to find out if a single request is enough.
            let first = reader
                .next_part(self.limits.recommended())
                .await?
                .unwrap_or_default();
            if reader.is_exhausted().await? {
                return self.single_shot(first).await;
            }
            let part_size = self.limits.recommended();
            return self
                .multipart(None, reader, part_size, Some(first), None)
                .await;
        };
        match plan(size, &self.limits)? {
            UploadStrategy::SingleShot => {
                let data = reader.next_part(size).await?.unwrap_or_default();
                if !reader.is_exhausted().await? || data.len() != size {
                    return Err(Error::ser(UploadError::SizeMismatch {
                        expected: size,
                        got: reader.offset(),
                    }));
                }
                self.single_shot(data).await
            }
            UploadStrategy::Multipart {
                part_size,
                part_count,
            } => {
                tracing::debug!(size, part_size, part_count, "uploading as a large file");
                self.multipart(None, reader, part_size, None, Some(size))
                    .await
            }
        }
    }

    async fn resume<S>(&self, payload: S, unfinished: File) -> Result<File>
    where
        S: StreamingSource,
    {
        if !unfinished.file_name.is_empty() && unfinished.file_name != self.file.file_name {
            return Err(Error::invalid_argument(format!(
                "cannot resume large file {} named {}, the upload is for {}",
                unfinished.file_id, unfinished.file_name, self.file.file_name
            )));
        }
        let mut session = self.inner.resume_large_file(unfinished).await?;
        // All parts but the last have the same size.
        let part_size = session
            .manifest()
            .parts()
            .map(|p| p.content_length)
            .max()
            .unwrap_or(self.limits.recommended());
        let dropped = session.truncate_at_gap()?;
        if dropped != 0 {
            tracing::warn!(
                file_id = session.file_id(),
                dropped,
                next_part_number = session.next_part_number(),
                "uploading the parts after the first missing part again"
            );
        }
        let hint = payload.size_hint().await.map_err(Error::ser)?;
        let reader = PartReader::resume_at(payload, session.resume_offset()).await?;
        self.multipart(Some(session), reader, part_size, None, hint.exact())
            .await
    }

    async fn single_shot(&self, data: PartPayload) -> Result<File> {
        let target = self.inner.get_upload_url(&self.file.bucket_id).await?;
        let file = match self.inner.upload_file(&target, &self.file, &data).await {
            Err(e) if e.is_lease_expired() => {
                tracing::warn!(
                    bucket_id = %self.file.bucket_id,
                    "upload target rejected, leasing a new one: {e}"
                );
                let target = self.inner.get_upload_url(&self.file.bucket_id).await?;
                self.inner.upload_file(&target, &self.file, &data).await?
            }
            result => result?,
        };
        tracing::info!(
            file_id = %file.file_id,
            file_name = %file.file_name,
            content_length = file.content_length,
            "uploaded file"
        );
        Ok(file)
    }

    async fn multipart<S>(
        &self,
        resumed: Option<LargeFileSession>,
        mut reader: PartReader<S>,
        part_size: u64,
        first: Option<PartPayload>,
        expected: Option<u64>,
    ) -> Result<File>
    where
        S: StreamingSource,
    {
        let started_here = resumed.is_none();
        let mut session = match resumed {
            Some(s) => s,
            None => self.inner.start_large_file(&self.file).await?,
        };
        let result = match self
            .upload_parts(&mut session, &mut reader, part_size, first, expected)
            .await
        {
            Ok(()) => self.inner.finish_large_file(&mut session).await,
            Err(e) => Err(e),
        };
        let error = match result {
            Ok(file) => return Ok(file),
            Err(e) => e,
        };
        if self.options.cancel_on_error && started_here && session.state() == SessionState::Open {
            if let Err(cancel) = self.inner.cancel_large_file(&mut session).await {
                tracing::error!(
                    file_id = session.file_id(),
                    "cannot cancel large file after upload error: {cancel}"
                );
            }
        }
        Err(error)
    }

    async fn upload_parts<S>(
        &self,
        session: &mut LargeFileSession,
        reader: &mut PartReader<S>,
        part_size: u64,
        mut first: Option<PartPayload>,
        expected: Option<u64>,
    ) -> Result<()>
    where
        S: StreamingSource,
    {
        let size_mismatch = |got| {
            expected
                .filter(|e| *e != got)
                .map(|expected| Error::ser(UploadError::SizeMismatch { expected, got }))
        };
        // Dropping the set aborts any uploads still in flight.
        let mut tasks = JoinSet::new();
        let mut exhausted = false;
        loop {
            while !exhausted && tasks.len() < self.options.concurrency {
                let data = match first.take() {
                    Some(d) => Some(d),
                    None => reader.next_part(part_size).await?,
                };
                let Some(data) = data else {
                    exhausted = true;
                    break;
                };
                if let Some(e) = expected.filter(|e| reader.offset() > *e) {
                    return Err(Error::ser(UploadError::SizeMismatch {
                        expected: e,
                        got: reader.offset(),
                    }));
                }
                let part_number = session.assign_part_number()?;
                tasks.spawn(upload_part(
                    self.inner.clone(),
                    session.file_id().to_string(),
                    part_number,
                    data,
                ));
            }
            let Some(joined) = tasks.join_next().await else {
                break;
            };
            let part = joined.map_err(Error::io)??;
            session.record_part(part)?;
        }
        match size_mismatch(reader.offset()) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Uploads one part, leasing a new target once if the first is rejected.
async fn upload_part(
    inner: Arc<StorageInner>,
    file_id: String,
    part_number: u32,
    data: PartPayload,
) -> Result<Part> {
    let target = inner.get_upload_part_url(&file_id).await?;
    match inner.upload_part(&target, part_number, &data).await {
        Err(e) if e.is_lease_expired() => {
            tracing::warn!(
                file_id,
                part_number,
                "upload target rejected, leasing a new one: {e}"
            );
            let target = inner.get_upload_part_url(&file_id).await?;
            inner.upload_part(&target, part_number, &data).await
        }
        result => result,
    }
}
