// Copyright 2024 Google LLC
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

//! Common types shared by the Backblaze B2 client crates.
//!
//! This crate contains the error model used by the authorization and storage
//! crates. Most applications do not need to depend on it directly, the
//! storage crate re-exports the types applications need.

/// An alias of [std::result::Result] where the error is always [Error][crate::error::Error].
///
/// This is the result type used by all functions wrapping requests to the
/// service.
pub type Result<T> = std::result::Result<T, crate::error::Error>;

pub mod error;
