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

//! Custom errors for the B2 storage client.
//!
//! The storage client defines additional error types. These are often returned
//! as the `source()` of an [Error][crate::Error].

/// The reasons a large file manifest cannot be finished.
///
/// Returned as the source of an [Error][crate::Error] where
/// [is_incomplete_upload()][crate::Error::is_incomplete_upload] is true.
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum ManifestError {
    #[error("the manifest is empty, upload at least one part before finishing")]
    Empty,

    #[error("part {0} is missing, parts must be contiguous starting at 1")]
    MissingPart(u32),

    #[error(
        "part {part_number} has {length} bytes, every part except the last requires at least {minimum} bytes"
    )]
    UndersizedPart {
        part_number: u32,
        length: u64,
        minimum: u64,
    },
}

/// Errors detected while uploading data.
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum UploadError {
    #[error("the SHA-1 checksums do not match for part {part_number}: got={got}, want={want}")]
    ChecksumMismatch {
        part_number: u32,
        got: String,
        want: String,
    },

    #[error("the service reports part number {got}, but we uploaded part number {want}")]
    UnexpectedPartNumber { got: u32, want: u32 },

    #[error("the data source produced {got} bytes, but its size hint promised {expected}")]
    SizeMismatch { expected: u64, got: u64 },

    #[error("the data ends after {got} bytes, but {uploaded} bytes were already uploaded")]
    SourceTooShort { uploaded: u64, got: u64 },

    #[error("the object requires more than {max} parts")]
    TooManyParts { max: u64 },

    #[error("the object has {size} bytes, the largest supported object has {max} bytes")]
    TooLarge { size: u64, max: u64 },
}
