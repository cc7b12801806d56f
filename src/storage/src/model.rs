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

//! The messages exchanged with the service.
//!
//! These are plain data records. They carry no behavior beyond setters and a
//! few local validation helpers.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The maximum length of an object name, in bytes.
pub const MAX_FILE_NAME_LENGTH: usize = 1024;

/// The maximum number of `fileInfo` entries for an object.
pub const MAX_FILE_INFO_ENTRIES: usize = 10;

/// An object (file) stored in a bucket.
///
/// The service returns this record when a single-shot upload completes, when
/// a large file is started or finished, and when listing unfinished large
/// files.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct File {
    /// The unique identifier of this version of the object.
    pub file_id: String,

    /// The object name.
    pub file_name: String,

    /// The account that owns the object.
    pub account_id: String,

    /// The bucket containing the object.
    pub bucket_id: String,

    /// The object size, in bytes. Zero for unfinished large files.
    pub content_length: u64,

    /// The SHA-1 of the object contents, hex encoded.
    ///
    /// The service reports `none` for large files, the checksums are per part.
    pub content_sha1: Option<String>,

    /// The MIME type of the object.
    pub content_type: Option<String>,

    /// Custom metadata.
    pub file_info: BTreeMap<String, String>,

    /// One of `start` (unfinished large file), `upload`, `hide` or `folder`.
    pub action: String,

    /// Milliseconds since the Unix epoch.
    pub upload_timestamp: i64,
}

impl File {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value of [file_id][File::file_id].
    pub fn set_file_id<T: Into<String>>(mut self, v: T) -> Self {
        self.file_id = v.into();
        self
    }

    /// Sets the value of [file_name][File::file_name].
    pub fn set_file_name<T: Into<String>>(mut self, v: T) -> Self {
        self.file_name = v.into();
        self
    }

    /// Sets the value of [bucket_id][File::bucket_id].
    pub fn set_bucket_id<T: Into<String>>(mut self, v: T) -> Self {
        self.bucket_id = v.into();
        self
    }

    /// Sets the value of [content_type][File::content_type].
    pub fn set_content_type<T: Into<String>>(mut self, v: T) -> Self {
        self.content_type = Some(v.into());
        self
    }
}

/// Describes an object to be created.
///
/// Used to start a large file, and to upload a small object in a single
/// request.
///
/// # Example
/// ```
/// # use b2_storage::model::NewFile;
/// let file = NewFile::new("my-bucket-id", "logs/2025/app.log")
///     .set_content_type("text/plain")
///     .set_file_info([("src_last_modified_millis", "1700000000000")]);
/// assert!(file.validate().is_ok());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct NewFile {
    /// The bucket receiving the object.
    pub bucket_id: String,

    /// The object name.
    pub file_name: String,

    /// The MIME type, the service guesses it from the name when unset.
    pub content_type: Option<String>,

    /// Custom metadata, stored with the object.
    pub file_info: BTreeMap<String, String>,
}

impl NewFile {
    pub fn new<B, N>(bucket_id: B, file_name: N) -> Self
    where
        B: Into<String>,
        N: Into<String>,
    {
        Self {
            bucket_id: bucket_id.into(),
            file_name: file_name.into(),
            ..Default::default()
        }
    }

    /// Sets the value of [content_type][NewFile::content_type].
    pub fn set_content_type<T: Into<String>>(mut self, v: T) -> Self {
        self.content_type = Some(v.into());
        self
    }

    /// Sets the value of [file_info][NewFile::file_info].
    pub fn set_file_info<T, K, V>(mut self, v: T) -> Self
    where
        T: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.file_info = v.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    /// Verifies the fields can be sent to the service.
    ///
    /// Fails with an error where
    /// [is_invalid_argument()][Error::is_invalid_argument] is true.
    pub fn validate(&self) -> crate::Result<()> {
        if self.bucket_id.is_empty() {
            return Err(Error::invalid_argument("missing bucket id"));
        }
        if self.file_name.is_empty() {
            return Err(Error::invalid_argument("missing file name"));
        }
        if self.file_name.len() > MAX_FILE_NAME_LENGTH {
            return Err(Error::invalid_argument(format!(
                "the file name has {} bytes, the maximum is {MAX_FILE_NAME_LENGTH}",
                self.file_name.len()
            )));
        }
        if self.file_info.len() > MAX_FILE_INFO_ENTRIES {
            return Err(Error::invalid_argument(format!(
                "the file info has {} entries, the maximum is {MAX_FILE_INFO_ENTRIES}",
                self.file_info.len()
            )));
        }
        Ok(())
    }
}

/// A leased destination for one upload.
///
/// Returned by `get_upload_url` (single-shot uploads) and
/// `get_upload_part_url` (large file parts). Once an upload against a target
/// fails the target must be discarded, and a new one leased.
///
/// The `Debug` output never includes the authorization token.
#[derive(Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadTarget {
    /// The bucket, set for single-shot upload targets.
    #[serde(default)]
    pub bucket_id: Option<String>,

    /// The large file, set for part upload targets.
    #[serde(default)]
    pub file_id: Option<String>,

    /// The URL receiving the data.
    pub upload_url: String,

    /// The token for [upload_url][UploadTarget::upload_url].
    pub authorization_token: String,
}

impl std::fmt::Debug for UploadTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadTarget")
            .field("bucket_id", &self.bucket_id)
            .field("file_id", &self.file_id)
            .field("upload_url", &self.upload_url)
            .field("authorization_token", &"[censored]")
            .finish()
    }
}

/// One uploaded part of a large file.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct Part {
    /// The large file containing this part.
    pub file_id: String,

    /// The 1-based part number.
    pub part_number: u32,

    /// The part size, in bytes.
    pub content_length: u64,

    /// The SHA-1 of the part contents, hex encoded.
    pub content_sha1: String,

    /// Milliseconds since the Unix epoch.
    pub upload_timestamp: i64,
}

impl Part {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value of [file_id][Part::file_id].
    pub fn set_file_id<T: Into<String>>(mut self, v: T) -> Self {
        self.file_id = v.into();
        self
    }

    /// Sets the value of [part_number][Part::part_number].
    pub fn set_part_number(mut self, v: u32) -> Self {
        self.part_number = v;
        self
    }

    /// Sets the value of [content_length][Part::content_length].
    pub fn set_content_length(mut self, v: u64) -> Self {
        self.content_length = v;
        self
    }

    /// Sets the value of [content_sha1][Part::content_sha1].
    pub fn set_content_sha1<T: Into<String>>(mut self, v: T) -> Self {
        self.content_sha1 = v.into();
        self
    }
}

/// One page of parts, as returned by `list_parts`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct ListPartsResponse {
    /// The parts, sorted by part number.
    pub parts: Vec<Part>,

    /// The cursor for the next page, `None` when there are no more parts.
    pub next_part_number: Option<u32>,
}

/// The request for `list_unfinished_large_files`.
///
/// # Example
/// ```
/// # use b2_storage::model::ListUnfinishedLargeFilesRequest;
/// let request = ListUnfinishedLargeFilesRequest::new("my-bucket-id")
///     .set_name_prefix("backups/")
///     .set_max_file_count(10);
/// ```
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct ListUnfinishedLargeFilesRequest {
    pub bucket_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_file_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_file_count: Option<u32>,
}

impl ListUnfinishedLargeFilesRequest {
    pub fn new<T: Into<String>>(bucket_id: T) -> Self {
        Self {
            bucket_id: bucket_id.into(),
            ..Default::default()
        }
    }

    /// Only return files whose names start with this prefix.
    pub fn set_name_prefix<T: Into<String>>(mut self, v: T) -> Self {
        self.name_prefix = Some(v.into());
        self
    }

    /// The cursor, as returned in a previous page.
    pub fn set_start_file_id<T: Into<String>>(mut self, v: T) -> Self {
        self.start_file_id = Some(v.into());
        self
    }

    /// The maximum number of files in the page.
    pub fn set_max_file_count(mut self, v: u32) -> Self {
        self.max_file_count = Some(v);
        self
    }
}

/// One page of unfinished large files.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
#[non_exhaustive]
pub struct UnfinishedLargeFiles {
    pub files: Vec<File>,

    /// The cursor for the next page, `None` when there are no more files.
    pub next_file_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StartLargeFileRequest<'a> {
    pub bucket_id: &'a str,
    pub file_name: &'a str,
    pub content_type: &'a str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub file_info: &'a BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileIdRequest<'a> {
    pub file_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FinishLargeFileRequest<'a> {
    pub file_id: &'a str,
    pub part_sha1_array: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListPartsRequest<'a> {
    pub file_id: &'a str,
    pub start_part_number: u32,
    pub max_part_count: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GetUploadUrlRequest<'a> {
    pub bucket_id: &'a str,
}
