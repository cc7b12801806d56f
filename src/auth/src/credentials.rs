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

//! Types and functions to load the application key used to authorize the
//! account.
//!
//! The service authorizes every account with an application key: a pair of
//! a key id and a secret key. The [Builder] loads the pair from explicit values
//! or from the environment.
//!
//! # Example
//! ```
//! # use b2_auth::credentials::Builder;
//! let credentials = Builder::default()
//!     .with_key_id("my-key-id")
//!     .with_application_key("my-secret-key")
//!     .build()?;
//! assert_eq!(credentials.key_id(), "my-key-id");
//! # Ok::<(), b2_auth::errors::CredentialsError>(())
//! ```

use crate::Result;
use crate::constants::{APPLICATION_KEY_VAR, KEY_ID_VAR};
use crate::errors;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::HeaderValue;

/// An application key, used to authorize the account.
///
/// The `Debug` output never includes the secret key.
#[derive(Clone, PartialEq)]
pub struct Credentials {
    key_id: String,
    application_key: String,
}

impl Credentials {
    /// The key id, also known as the account id for master keys.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// The value of the `Authorization` header for the authorize call.
    ///
    /// This is the HTTP basic authentication scheme over `keyId:key`.
    pub(crate) fn basic_header(&self) -> Result<HeaderValue> {
        let encoded = STANDARD.encode(format!("{}:{}", self.key_id, self.application_key));
        let mut value =
            HeaderValue::from_str(&format!("Basic {encoded}")).map_err(errors::permanent)?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("key_id", &self.key_id)
            .field("application_key", &"[censored]")
            .finish()
    }
}

/// A builder for [Credentials].
///
/// Values set explicitly take precedence over the `B2_APPLICATION_KEY_ID` and
/// `B2_APPLICATION_KEY` environment variables.
#[derive(Clone, Debug, Default)]
pub struct Builder {
    key_id: Option<String>,
    application_key: Option<String>,
}

impl Builder {
    /// Sets the key id.
    pub fn with_key_id<T: Into<String>>(mut self, v: T) -> Self {
        self.key_id = Some(v.into());
        self
    }

    /// Sets the secret application key.
    pub fn with_application_key<T: Into<String>>(mut self, v: T) -> Self {
        self.application_key = Some(v.into());
        self
    }

    /// Returns a [Credentials] instance with the configured settings.
    ///
    /// Fails if either value is missing or empty, both in the builder and in
    /// the environment. Such errors are never transient.
    pub fn build(self) -> Result<Credentials> {
        let key_id = resolve(self.key_id, KEY_ID_VAR)?;
        let application_key = resolve(self.application_key, APPLICATION_KEY_VAR)?;
        Ok(Credentials {
            key_id,
            application_key,
        })
    }
}

fn resolve(explicit: Option<String>, var: &str) -> Result<String> {
    explicit
        .or_else(|| std::env::var(var).ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            errors::permanent_from_msg(format!(
                "missing {var}, set the environment variable or configure the value explicitly"
            ))
        })
}

#[doc(hidden)]
pub mod testing {
    use super::Credentials;

    /// Credentials for tests, they do not authorize any real account.
    pub fn test_credentials() -> Credentials {
        Credentials {
            key_id: "test-key-id".to_string(),
            application_key: "test-application-key".to_string(),
        }
    }
}
