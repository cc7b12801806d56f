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

//! Authorization for the Backblaze B2 client crates.
//!
//! The service authorizes requests with a session token. Applications
//! exchange an application key (see [credentials]) for a [Session] using the
//! authorize call, and then attach the session token to each request.
//!
//! Session tokens expire, and the client only learns about it when the service
//! rejects a request. The [SessionCache] holds the current session, and
//! replaces it atomically when a request reports it as expired.
//!
//! [Session]: session::Session
//! [SessionCache]: session_cache::SessionCache

pub mod errors;

/// Types and functions to load application keys.
pub mod credentials;

/// The authorized session and its capability checks.
pub mod session;

/// The authorize call.
pub mod authorizer;

/// The atomically replaceable session holder.
pub mod session_cache;

/// Endpoints and environment variables.
pub mod constants;

/// A `Result` alias where the `Err` case is
/// `b2_auth::errors::CredentialsError`.
pub type Result<T> = std::result::Result<T, crate::errors::CredentialsError>;
