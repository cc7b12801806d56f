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

use std::error::Error;
use std::fmt::{Debug, Display, Formatter, Result};
use std::sync::Arc;

/// Represents an error loading credentials or authorizing the account.
///
/// The client may experience problems loading the application key, for
/// example when the environment variables are unset. It may also fail to
/// exchange the application key for a session, for example when the key is
/// revoked or the authorization endpoint is unreachable.
///
/// Applications rarely need to create instances of this error type, most
/// applications should only work with the [Error][crate::error::Error] type.
///
/// # Example
/// ```
/// # use b2_gax::error::CredentialsError;
/// let err = CredentialsError::from_msg(
///     true, "simulated transient error while authorizing the account");
/// assert!(err.is_transient());
/// assert!(format!("{err}").contains("simulated transient error"));
/// ```
#[derive(Clone, Debug)]
pub struct CredentialsError {
    /// If `true`, the operation that resulted in this error might succeed
    /// if attempted again.
    is_transient: bool,

    source: CredentialsErrorImpl,
}

#[derive(Clone, Debug)]
enum CredentialsErrorImpl {
    SimpleMessage(String),
    Source(Arc<dyn Error + Send + Sync>),
}

impl CredentialsError {
    /// Creates a new `CredentialsError` wrapping another error.
    ///
    /// # Example
    /// ```
    /// # use b2_gax::error::CredentialsError;
    /// let source = std::io::Error::other("connection refused");
    /// let err = CredentialsError::new(true, source);
    /// assert!(err.is_transient());
    /// assert!(format!("{err}").contains("connection refused"));
    /// ```
    pub fn new<T: Error + Send + Sync + 'static>(is_transient: bool, source: T) -> Self {
        CredentialsError {
            is_transient,
            source: CredentialsErrorImpl::Source(Arc::new(source)),
        }
    }

    /// Creates a new `CredentialsError` from a message.
    pub fn from_msg<T: Into<String>>(is_transient: bool, message: T) -> Self {
        CredentialsError {
            is_transient,
            source: CredentialsErrorImpl::SimpleMessage(message.into()),
        }
    }

    /// Returns `true` if the error is transient, i.e. the operation might
    /// succeed on a future attempt.
    pub fn is_transient(&self) -> bool {
        self.is_transient
    }
}

impl Error for CredentialsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.source {
            CredentialsErrorImpl::SimpleMessage(_) => None,
            CredentialsErrorImpl::Source(source) => Some(source.as_ref()),
        }
    }
}

const TRANSIENT_MSG: &str = "but future attempts may succeed";
const PERMANENT_MSG: &str = "and future attempts will not succeed";

impl Display for CredentialsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let msg = if self.is_transient {
            TRANSIENT_MSG
        } else {
            PERMANENT_MSG
        };
        match &self.source {
            CredentialsErrorImpl::SimpleMessage(m) => {
                write!(f, "cannot authorize the account, {msg}: {m}")
            }
            CredentialsErrorImpl::Source(s) => {
                write!(f, "cannot authorize the account, {msg}: {s}")
            }
        }
    }
}
