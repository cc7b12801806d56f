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

use crate::error::Error;
use serde::{Deserialize, Serialize};

/// The error codes the service uses to reject an authorization token.
///
/// Both codes mean the same thing to the client: the token (account or upload
/// URL) must be replaced before the request can succeed.
pub const EXPIRED_TOKEN_CODES: [&str; 2] = ["expired_auth_token", "bad_auth_token"];

/// The error document returned by the service.
///
/// Every non-2xx response from the native API carries a JSON body with three
/// fields: the HTTP status repeated as a number, a short machine readable code,
/// and a human readable message.
///
/// ```
/// # use b2_gax::error::rpc::Status;
/// let status = Status::default()
///     .set_status(400)
///     .set_code("bad_request")
///     .set_message("Part number 0 is less than 1");
/// assert_eq!(status.code, "bad_request");
/// assert!(!status.is_expired_token());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
#[non_exhaustive]
pub struct Status {
    /// The HTTP status code, as reported in the body.
    pub status: u16,

    /// A machine readable error code, such as `bad_request` or
    /// `expired_auth_token`.
    pub code: String,

    /// A developer-facing error message, in English.
    pub message: String,
}

impl Status {
    /// Sets the value for [status][Status::status].
    pub fn set_status(mut self, v: u16) -> Self {
        self.status = v;
        self
    }

    /// Sets the value for [code][Status::code].
    pub fn set_code<T: Into<String>>(mut self, v: T) -> Self {
        self.code = v.into();
        self
    }

    /// Sets the value for [message][Status::message].
    pub fn set_message<T: Into<String>>(mut self, v: T) -> Self {
        self.message = v.into();
        self
    }

    /// Returns true if the service rejected the authorization token.
    pub fn is_expired_token(&self) -> bool {
        EXPIRED_TOKEN_CODES.contains(&self.code.as_str())
    }
}

impl TryFrom<&bytes::Bytes> for Status {
    type Error = Error;

    fn try_from(value: &bytes::Bytes) -> Result<Self, Self::Error> {
        let status = serde_json::from_slice::<Status>(value).map_err(Error::deser)?;
        // An empty object deserializes thanks to `#[serde(default)]`, but it
        // is not an error document.
        if status.code.is_empty() {
            return Err(Error::deser("missing `code` in error document"));
        }
        Ok(status)
    }
}
