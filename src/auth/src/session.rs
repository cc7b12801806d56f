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

use crate::Result;
use crate::errors;
use http::HeaderValue;
use serde::Deserialize;

/// An authorized session for one account.
///
/// Sessions are returned by the authorize call and never modified afterwards.
/// A new authorization produces a brand new `Session`, which replaces the
/// previous one wholesale.
///
/// The session token is opaque. The client never inspects its expiration, an
/// expired token is only discovered when the service rejects a request.
#[derive(Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// The account identifier.
    pub account_id: String,

    /// The session token, required by all control-plane calls.
    pub authorization_token: String,

    /// The base URL for control-plane calls.
    pub api_url: String,

    /// The base URL for downloads.
    pub download_url: String,

    /// The part size recommended by the service, in bytes.
    pub recommended_part_size: u64,

    /// The smallest part size accepted by the service, in bytes.
    ///
    /// This applies to every part of a large file, except the last.
    pub absolute_minimum_part_size: u64,

    /// The capabilities and restrictions of the application key.
    #[serde(default)]
    pub allowed: Allowed,
}

/// The capabilities and scope restrictions of an application key.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Allowed {
    /// The granted capabilities, e.g. `writeFiles`.
    pub capabilities: Vec<String>,

    /// If set, the key can only access this bucket.
    pub bucket_id: Option<String>,

    /// The name of [bucket_id][Allowed::bucket_id], if set.
    pub bucket_name: Option<String>,

    /// If set, the key can only access objects whose name starts with this
    /// prefix.
    pub name_prefix: Option<String>,
}

impl Session {
    /// Returns true if the application key can access `bucket_id`.
    pub fn allows_bucket(&self, bucket_id: &str) -> bool {
        self.allowed
            .bucket_id
            .as_deref()
            .is_none_or(|b| b == bucket_id)
    }

    /// Returns true if the application key can access objects named `name`.
    pub fn allows_name(&self, name: &str) -> bool {
        self.allowed
            .name_prefix
            .as_deref()
            .is_none_or(|p| name.starts_with(p))
    }

    /// Returns true if the application key has the `capability`.
    pub fn has_capability(&self, capability: &str) -> bool {
        self.allowed.capabilities.iter().any(|c| c == capability)
    }

    /// The value of the `Authorization` header for control-plane calls.
    pub fn authorization_header(&self) -> Result<HeaderValue> {
        let mut value =
            HeaderValue::from_str(&self.authorization_token).map_err(errors::permanent)?;
        value.set_sensitive(true);
        Ok(value)
    }

    // A session must carry a token and every URL, anything else is an
    // unauthorized session and cannot be used.
    pub(crate) fn validate(self) -> Result<Self> {
        let missing = [
            ("authorizationToken", self.authorization_token.is_empty()),
            ("apiUrl", self.api_url.is_empty()),
            ("downloadUrl", self.download_url.is_empty()),
        ]
        .into_iter()
        .find_map(|(name, empty)| empty.then_some(name));
        match missing {
            Some(name) => Err(errors::permanent_from_msg(format!(
                "the authorize response is missing `{name}`"
            ))),
            None => Ok(self),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("account_id", &self.account_id)
            .field("authorization_token", &"[censored]")
            .field("api_url", &self.api_url)
            .field("download_url", &self.download_url)
            .field("recommended_part_size", &self.recommended_part_size)
            .field("absolute_minimum_part_size", &self.absolute_minimum_part_size)
            .field("allowed", &self.allowed)
            .finish()
    }
}
