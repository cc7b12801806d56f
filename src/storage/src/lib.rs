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

//! Backblaze B2 Client Library for Rust - Storage
//!
//! This crate contains traits, types, and functions to upload objects to
//! [Backblaze B2] using the native API. Most applications will use the
//! [Storage][client::Storage] client, and its
//! [upload_object()][client::Storage::upload_object] method, which chooses
//! between a single request and a large file, uploads the parts of large
//! files in parallel, and cancels large files that cannot be completed.
//!
//! Applications that need finer control, for example to persist the progress
//! of a large file and resume it from a different process, can use the large
//! file operations directly:
//!
//! * [start_large_file()][client::Storage::start_large_file]
//! * [get_upload_part_url()][client::Storage::get_upload_part_url]
//! * [upload_part()][client::Storage::upload_part]
//! * [finish_large_file()][client::Storage::finish_large_file]
//! * [cancel_large_file()][client::Storage::cancel_large_file]
//! * [list_parts()][client::Storage::list_parts]
//!
//! [Backblaze B2]: https://www.backblaze.com/cloud-storage

pub use b2_gax::Result;
pub use b2_gax::error::Error;

pub mod error;
pub mod model;
pub use crate::storage::checksum;
pub use crate::storage::part_reader;
pub use crate::storage::part_size;
pub use crate::storage::upload_source;

mod storage;

/// Clients to interact with Backblaze B2.
pub mod client {
    pub use crate::storage::client::Storage;
    pub use crate::storage::large_file::{
        LargeFileSession, MAX_LIST_FILES_COUNT, MAX_LIST_PARTS_COUNT, SessionState,
    };
}

/// Request builders.
pub mod builder {
    pub mod storage {
        pub use crate::storage::client::ClientBuilder;
        pub use crate::storage::upload_object::UploadObject;
    }
}
