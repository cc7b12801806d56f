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

//! Sends requests to the B2 native API.
//!
//! Control-plane calls use the session token, and are retried once when the
//! service reports the token as expired. Upload calls use the token of an
//! [UploadTarget], and report expired tokens as lease errors, the caller must
//! lease a new target before trying again.

use super::client::StorageInner;
use crate::model::UploadTarget;
use crate::{Error, Result};
use b2_auth::session::Session;
use b2_gax::error::rpc::Status;
use http::HeaderMap;
use serde::Serialize;
use serde::de::DeserializeOwned;

const API_PREFIX: &str = "/b2api/v2/";

/// Which token a request carries.
///
/// An expired session token is recoverable by authorizing the account again.
/// An expired upload token requires a new upload target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Scope {
    Session,
    Lease,
}

impl StorageInner {
    /// Makes a control-plane call, authorizing the account again if needed.
    ///
    /// If the service rejects the session token, the client authorizes the
    /// account once and repeats the call with the new token. The result of
    /// the second attempt is returned, whatever it is.
    pub(crate) async fn api_call<I, O>(&self, operation: &str, request: &I) -> Result<O>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let session = self.session().await?;
        match self.api_call_once(&session, operation, request).await {
            Err(e) if e.is_auth_expired() => {
                tracing::warn!(operation, "session token rejected, authorizing again: {e}");
                let fresh = self
                    .sessions
                    .refresh(&session)
                    .await
                    .map_err(Error::authentication)?;
                self.api_call_once(&fresh, operation, request).await
            }
            result => result,
        }
    }

    async fn api_call_once<I, O>(
        &self,
        session: &Session,
        operation: &str,
        request: &I,
    ) -> Result<O>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let url = format!("{}{API_PREFIX}{operation}", session.api_url);
        tracing::debug!(operation, "sending request");
        let authorization = session
            .authorization_header()
            .map_err(Error::authentication)?;
        let response = self
            .client
            .post(url)
            .header(http::header::AUTHORIZATION, authorization)
            .json(request)
            .send()
            .await
            .map_err(send_error)?;
        handle_response(response, Scope::Session).await
    }

    /// Sends data to a leased upload target.
    ///
    /// There is no automatic retry, the body may be a stream that cannot be
    /// replayed, and the target must be discarded after any failure.
    pub(crate) async fn upload_call<O>(
        &self,
        target: &UploadTarget,
        headers: HeaderMap,
        body: reqwest::Body,
    ) -> Result<O>
    where
        O: DeserializeOwned,
    {
        let authorization = http::HeaderValue::from_str(&target.authorization_token)
            .map(|mut v| {
                v.set_sensitive(true);
                v
            })
            .map_err(Error::ser)?;
        let response = self
            .client
            .post(target.upload_url.as_str())
            .headers(headers)
            .header(http::header::AUTHORIZATION, authorization)
            .body(body)
            .send()
            .await
            .map_err(send_error)?;
        handle_response(response, Scope::Lease).await
    }
}

async fn handle_response<O>(response: reqwest::Response, scope: Scope) -> Result<O>
where
    O: DeserializeOwned,
{
    if !response.status().is_success() {
        return to_http_error(response, scope).await;
    }
    let body = response.bytes().await.map_err(Error::io)?;
    serde_json::from_slice::<O>(&body).map_err(Error::deser)
}

/// Converts an unsuccessful response into an error.
///
/// Expired or invalid tokens become [Error::auth_expired] for session scoped
/// calls and [Error::lease_expired] for upload calls.
pub(crate) async fn to_http_error<O>(response: reqwest::Response, scope: Scope) -> Result<O> {
    let status_code = response.status().as_u16();
    let headers = response.headers().clone();
    let body = response.bytes().await.map_err(Error::io)?;

    let error = match Status::try_from(&body) {
        Ok(status) if status.is_expired_token() => match scope {
            Scope::Session => Error::auth_expired(status, Some(status_code), Some(headers)),
            Scope::Lease => Error::lease_expired(status, Some(status_code), Some(headers)),
        },
        Ok(status) => Error::service_with_http_metadata(status, Some(status_code), Some(headers)),
        Err(_) => Error::http(status_code, headers, body),
    };
    Err(error)
}

pub(crate) fn send_error(err: reqwest::Error) -> Error {
    match err {
        e if e.is_timeout() => Error::timeout(e),
        e if e.is_builder() => Error::ser(e),
        e => Error::io(e),
    }
}
