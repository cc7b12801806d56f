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
use crate::constants::AUTHORIZE_PATH;
use crate::credentials::Credentials;
use crate::errors::{self, CredentialsError};
use crate::session::Session;
use b2_gax::error::Error;
use b2_gax::error::rpc::Status;

/// Exchanges an application key for a [Session].
///
/// The storage client calls this once before the first request, and again
/// each time the service rejects the session token.
#[async_trait::async_trait]
pub trait Authorize: std::fmt::Debug + Send + Sync {
    async fn authorize(&self) -> Result<Session>;
}

/// Authorizes the account using the authorize call of the native API.
#[derive(Clone, Debug)]
pub struct AccountAuthorizer {
    client: reqwest::Client,
    endpoint: String,
    credentials: Credentials,
}

impl AccountAuthorizer {
    /// Creates a new authorizer.
    ///
    /// The `endpoint` is the scheme and host of the authorize call, e.g.
    /// `https://api.backblazeb2.com`.
    pub fn new<T: Into<String>>(
        client: reqwest::Client,
        endpoint: T,
        credentials: Credentials,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            credentials,
        }
    }
}

#[async_trait::async_trait]
impl Authorize for AccountAuthorizer {
    async fn authorize(&self) -> Result<Session> {
        let url = format!("{}{AUTHORIZE_PATH}", self.endpoint.trim_end_matches('/'));
        tracing::debug!(key_id = self.credentials.key_id(), "authorizing account");
        let response = self
            .client
            .get(url)
            .header(http::header::AUTHORIZATION, self.credentials.basic_header()?)
            .send()
            .await
            .map_err(errors::transient)?;
        if !response.status().is_success() {
            return Err(authorize_error(response).await);
        }
        let session = response
            .json::<Session>()
            .await
            .map_err(errors::permanent)?
            .validate()?;
        tracing::info!(
            account_id = %session.account_id,
            api_url = %session.api_url,
            "authorized account"
        );
        Ok(session)
    }
}

async fn authorize_error(response: reqwest::Response) -> CredentialsError {
    let code = response.status();
    let headers = response.headers().clone();
    let transient = errors::is_transient(code);
    let body = match response.bytes().await {
        Ok(b) => b,
        Err(e) => return CredentialsError::new(transient, e),
    };
    let error = match Status::try_from(&body) {
        Ok(status) => {
            Error::service_with_http_metadata(status, Some(code.as_u16()), Some(headers))
        }
        Err(_) => Error::http(code.as_u16(), headers, body),
    };
    CredentialsError::new(transient, error)
}
