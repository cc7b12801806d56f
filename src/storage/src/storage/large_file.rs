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

//! Uploads large files, one part at a time.

use super::checksum::Manifest;
use super::client::{Storage, StorageInner};
use super::part_reader::PartPayload;
use super::part_size::MAX_PART_COUNT;
use crate::error::UploadError;
use crate::model::{
    File, FileIdRequest, FinishLargeFileRequest, ListPartsRequest, ListPartsResponse,
    ListUnfinishedLargeFilesRequest, NewFile, Part, StartLargeFileRequest, UnfinishedLargeFiles,
    UploadTarget,
};
use crate::{Error, Result};
use http::{HeaderMap, HeaderValue};

/// The content type asking the service to guess the type from the file name.
pub(crate) const AUTO_CONTENT_TYPE: &str = "b2/x-auto";

/// The maximum page size for `list_parts()`.
pub const MAX_LIST_PARTS_COUNT: u32 = 1000;

/// The maximum page size for `list_unfinished_large_files()`.
pub const MAX_LIST_FILES_COUNT: u32 = 100;

/// The state of a [LargeFileSession].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Parts can be uploaded, and the file can be finished or canceled.
    Open,
    /// The file was finished, this is a terminal state.
    Finished,
    /// The file was canceled, this is a terminal state.
    Canceled,
}

/// An in-progress large file.
///
/// Created by [Storage::start_large_file] or [Storage::resume_large_file].
/// The session tracks the parts uploaded so far, and the next part number to
/// assign. It is not internally synchronized: applications uploading parts
/// from several tasks must record the parts from a single owner.
///
/// # Example
/// ```
/// # use b2_storage::client::Storage;
/// # use b2_storage::model::NewFile;
/// # use b2_storage::part_reader::PartPayload;
/// # async fn sample(client: &Storage) -> anyhow::Result<()> {
/// let mut session = client
///     .start_large_file(&NewFile::new("my-bucket-id", "my-object"))
///     .await?;
/// let target = client.get_upload_part_url(&session).await?;
/// let part_number = session.assign_part_number()?;
/// let part = client
///     .upload_part(&target, part_number, &PartPayload::from("the data"))
///     .await?;
/// session.record_part(part)?;
/// let file = client.finish_large_file(&mut session).await?;
/// println!("{file:?}");
/// # Ok(()) }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct LargeFileSession {
    file: File,
    manifest: Manifest,
    next_part_number: u32,
    minimum_part_size: u64,
    state: SessionState,
}

impl LargeFileSession {
    pub(crate) fn new(file: File, minimum_part_size: u64) -> Self {
        Self {
            file,
            manifest: Manifest::new(),
            next_part_number: 1,
            minimum_part_size,
            state: SessionState::Open,
        }
    }

    /// The large file identifier, assigned by the service.
    pub fn file_id(&self) -> &str {
        &self.file.file_id
    }

    /// The large file, as returned by the service when it was started.
    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The parts recorded so far.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// The part number returned by the next call to `assign_part_number()`.
    pub fn next_part_number(&self) -> u32 {
        self.next_part_number
    }

    /// The smallest size for all parts except the last.
    pub fn minimum_part_size(&self) -> u64 {
        self.minimum_part_size
    }

    /// The number of bytes already uploaded.
    ///
    /// For a resumed session this is the offset in the source where the
    /// upload continues.
    pub fn resume_offset(&self) -> u64 {
        self.manifest.total_len()
    }

    /// Assigns the next part number.
    ///
    /// Part numbers are assigned in strictly increasing order, starting at 1.
    pub fn assign_part_number(&mut self) -> Result<u32> {
        self.check_open("assign_part_number")?;
        let n = self.next_part_number;
        if u64::from(n) > MAX_PART_COUNT {
            return Err(Error::invalid_size(UploadError::TooManyParts {
                max: MAX_PART_COUNT,
            }));
        }
        self.next_part_number += 1;
        Ok(n)
    }

    /// Records a successfully uploaded part.
    ///
    /// Parts may be recorded in any order. Recording the same part number
    /// twice keeps the last value, matching the service behavior.
    pub fn record_part(&mut self, part: Part) -> Result<()> {
        self.check_open("record_part")?;
        if part.file_id != self.file.file_id {
            return Err(Error::invalid_argument(format!(
                "part {} belongs to file {}, not {}",
                part.part_number, part.file_id, self.file.file_id
            )));
        }
        self.next_part_number = self.next_part_number.max(part.part_number.saturating_add(1));
        let _ = self.manifest.insert(part);
        Ok(())
    }

    /// Drops the parts recorded after the first missing part.
    ///
    /// Parts uploaded concurrently complete in any order, so an interrupted
    /// upload may leave gaps. After this call the parts are contiguous, and
    /// the next part number is the first missing one. Uploading the dropped
    /// part numbers again replaces them in the service. Returns the number of
    /// parts dropped.
    pub fn truncate_at_gap(&mut self) -> Result<usize> {
        self.check_open("truncate_at_gap")?;
        let dropped = self.manifest.truncate_at_gap();
        self.next_part_number = self.manifest.last_part_number().unwrap_or(0) + 1;
        Ok(dropped.len())
    }

    fn check_open(&self, operation: &str) -> Result<()> {
        match self.state {
            SessionState::Open => Ok(()),
            state => Err(Error::session_closed(format!(
                "cannot {operation} on large file {}, the session is {state:?}",
                self.file.file_id
            ))),
        }
    }
}

impl Storage {
    /// Starts a large file.
    ///
    /// Fails with an error where
    /// [is_invalid_argument()][Error::is_invalid_argument] is true if the
    /// bucket or name are missing, or outside the scope of the application
    /// key. Errors from the service are returned unmodified.
    pub async fn start_large_file(&self, file: &NewFile) -> Result<LargeFileSession> {
        self.inner.start_large_file(file).await
    }

    /// Leases an upload target for the parts of `session`.
    ///
    /// Each call returns a new, independent target. Applications uploading
    /// parts in parallel should lease one target for each concurrent upload.
    pub async fn get_upload_part_url(&self, session: &LargeFileSession) -> Result<UploadTarget> {
        session.check_open("get_upload_part_url")?;
        self.inner.get_upload_part_url(session.file_id()).await
    }

    /// Uploads one part.
    ///
    /// On success returns the part, ready to be recorded in the session. If
    /// the service rejects the target token the error satisfies
    /// [is_lease_expired()][Error::is_lease_expired]; discard the target,
    /// lease a new one, and upload the part again.
    pub async fn upload_part(
        &self,
        target: &UploadTarget,
        part_number: u32,
        payload: &PartPayload,
    ) -> Result<Part> {
        self.inner.upload_part(target, part_number, payload).await
    }

    /// Finishes the large file, making it visible.
    ///
    /// The recorded parts must be contiguous starting at 1, and every part
    /// but the last must have at least the minimum part size. Otherwise the
    /// call fails with an error where
    /// [is_incomplete_upload()][Error::is_incomplete_upload] is true, before
    /// contacting the service, and the session remains open.
    pub async fn finish_large_file(&self, session: &mut LargeFileSession) -> Result<File> {
        self.inner.finish_large_file(session).await
    }

    /// Cancels the large file, discarding any uploaded parts.
    pub async fn cancel_large_file(&self, session: &mut LargeFileSession) -> Result<()> {
        self.inner.cancel_large_file(session).await
    }

    /// Returns one page of the parts uploaded for a large file.
    ///
    /// Use `next_part_number` in the response to request the next page. At
    /// most [MAX_LIST_PARTS_COUNT] parts are returned in each page.
    pub async fn list_parts(
        &self,
        file_id: &str,
        start_part_number: u32,
        max_part_count: u32,
    ) -> Result<ListPartsResponse> {
        self.inner
            .list_parts(file_id, start_part_number, max_part_count)
            .await
    }

    /// Rebuilds the session for a large file started earlier.
    ///
    /// Lists all the parts uploaded so far. The returned session continues
    /// after the largest part number found.
    ///
    /// # Example
    /// ```
    /// # use b2_storage::client::Storage;
    /// # use b2_storage::model::ListUnfinishedLargeFilesRequest;
    /// # async fn sample(client: &Storage) -> anyhow::Result<()> {
    /// let page = client
    ///     .list_unfinished_large_files(
    ///         ListUnfinishedLargeFilesRequest::new("my-bucket-id").set_name_prefix("backups/"),
    ///     )
    ///     .await?;
    /// for file in page.files {
    ///     let session = client.resume_large_file(file).await?;
    ///     println!("{} has {} parts", session.file_id(), session.manifest().len());
    /// }
    /// # Ok(()) }
    /// ```
    pub async fn resume_large_file(&self, file: File) -> Result<LargeFileSession> {
        self.inner.resume_large_file(file).await
    }

    /// Returns one page of the large files started but not finished or
    /// canceled.
    pub async fn list_unfinished_large_files(
        &self,
        request: ListUnfinishedLargeFilesRequest,
    ) -> Result<UnfinishedLargeFiles> {
        self.inner.list_unfinished_large_files(request).await
    }
}

impl StorageInner {
    pub(crate) async fn start_large_file(&self, file: &NewFile) -> Result<LargeFileSession> {
        file.validate()?;
        self.check_write_scope(file).await?;
        let request = StartLargeFileRequest {
            bucket_id: &file.bucket_id,
            file_name: &file.file_name,
            content_type: file.content_type.as_deref().unwrap_or(AUTO_CONTENT_TYPE),
            file_info: &file.file_info,
        };
        let started: File = self.api_call("b2_start_large_file", &request).await?;
        if started.file_id.is_empty() {
            return Err(Error::deser("missing fileId in start large file response"));
        }
        tracing::info!(
            file_id = %started.file_id,
            file_name = %started.file_name,
            "started large file"
        );
        let minimum = self.session().await?.absolute_minimum_part_size;
        Ok(LargeFileSession::new(started, minimum))
    }

    pub(crate) async fn get_upload_part_url(&self, file_id: &str) -> Result<UploadTarget> {
        let request = FileIdRequest { file_id };
        let target: UploadTarget = self.api_call("b2_get_upload_part_url", &request).await?;
        tracing::debug!(file_id, upload_url = %target.upload_url, "leased part upload target");
        Ok(target)
    }

    pub(crate) async fn upload_part(
        &self,
        target: &UploadTarget,
        part_number: u32,
        payload: &PartPayload,
    ) -> Result<Part> {
        if part_number == 0 || u64::from(part_number) > MAX_PART_COUNT {
            return Err(Error::invalid_argument(format!(
                "part number {part_number} is out of range, valid part numbers are 1..={MAX_PART_COUNT}"
            )));
        }
        let mut headers = HeaderMap::new();
        headers.insert(http::header::CONTENT_LENGTH, HeaderValue::from(payload.len()));
        headers.insert("X-Bz-Part-Number", HeaderValue::from(part_number));
        headers.insert(
            "X-Bz-Content-Sha1",
            HeaderValue::from_str(payload.sha1()).map_err(Error::ser)?,
        );
        tracing::debug!(
            file_id = ?target.file_id,
            part_number,
            bytes = payload.len(),
            "uploading part"
        );
        let part: Part = self
            .upload_call(target, headers, payload.to_body())
            .await?;
        if part.part_number != part_number {
            return Err(Error::deser(UploadError::UnexpectedPartNumber {
                got: part.part_number,
                want: part_number,
            }));
        }
        if part.content_sha1 != payload.sha1() {
            return Err(Error::deser(UploadError::ChecksumMismatch {
                part_number,
                got: part.content_sha1,
                want: payload.sha1().to_string(),
            }));
        }
        Ok(part)
    }

    pub(crate) async fn finish_large_file(&self, session: &mut LargeFileSession) -> Result<File> {
        session.check_open("finish_large_file")?;
        let part_sha1_array = session
            .manifest
            .validate(session.minimum_part_size)
            .map_err(Error::incomplete_upload)?;
        let parts = part_sha1_array.len();
        let request = FinishLargeFileRequest {
            file_id: session.file_id(),
            part_sha1_array,
        };
        let file: File = self.api_call("b2_finish_large_file", &request).await?;
        session.state = SessionState::Finished;
        tracing::info!(
            file_id = %file.file_id,
            file_name = %file.file_name,
            parts,
            content_length = file.content_length,
            "finished large file"
        );
        Ok(file)
    }

    pub(crate) async fn cancel_large_file(&self, session: &mut LargeFileSession) -> Result<()> {
        session.check_open("cancel_large_file")?;
        let request = FileIdRequest {
            file_id: session.file_id(),
        };
        let _: serde::de::IgnoredAny = self.api_call("b2_cancel_large_file", &request).await?;
        session.state = SessionState::Canceled;
        tracing::info!(file_id = session.file_id(), "canceled large file");
        Ok(())
    }

    pub(crate) async fn list_parts(
        &self,
        file_id: &str,
        start_part_number: u32,
        max_part_count: u32,
    ) -> Result<ListPartsResponse> {
        if file_id.is_empty() {
            return Err(Error::invalid_argument("missing file id"));
        }
        if start_part_number == 0 {
            return Err(Error::invalid_argument("part numbers start at 1"));
        }
        if !(1..=MAX_LIST_PARTS_COUNT).contains(&max_part_count) {
            return Err(Error::invalid_argument(format!(
                "max_part_count must be in 1..={MAX_LIST_PARTS_COUNT}, got {max_part_count}"
            )));
        }
        let request = ListPartsRequest {
            file_id,
            start_part_number,
            max_part_count,
        };
        tracing::debug!(file_id, start_part_number, max_part_count, "listing parts");
        self.api_call("b2_list_parts", &request).await
    }

    pub(crate) async fn resume_large_file(&self, file: File) -> Result<LargeFileSession> {
        if file.file_id.is_empty() {
            return Err(Error::invalid_argument("missing file id"));
        }
        let minimum = self.session().await?.absolute_minimum_part_size;
        let mut session = LargeFileSession::new(file, minimum);
        let mut start = Some(1_u32);
        while let Some(s) = start {
            let page = self
                .list_parts(session.file_id(), s, MAX_LIST_PARTS_COUNT)
                .await?;
            for mut part in page.parts {
                // Listed parts may omit the file id.
                if part.file_id.is_empty() {
                    part.file_id = session.file_id().to_string();
                }
                session.record_part(part)?;
            }
            // Guard against a cursor that does not advance.
            start = page.next_part_number.filter(|n| *n > s);
        }
        tracing::info!(
            file_id = session.file_id(),
            parts = session.manifest.len(),
            next_part_number = session.next_part_number,
            "resumed large file"
        );
        Ok(session)
    }

    pub(crate) async fn list_unfinished_large_files(
        &self,
        request: ListUnfinishedLargeFilesRequest,
    ) -> Result<UnfinishedLargeFiles> {
        if request.bucket_id.is_empty() {
            return Err(Error::invalid_argument("missing bucket id"));
        }
        if let Some(n) = request.max_file_count {
            if !(1..=MAX_LIST_FILES_COUNT).contains(&n) {
                return Err(Error::invalid_argument(format!(
                    "max_file_count must be in 1..={MAX_LIST_FILES_COUNT}, got {n}"
                )));
            }
        }
        self.api_call("b2_list_unfinished_large_files", &request)
            .await
    }
}
