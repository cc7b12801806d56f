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

use super::CredentialsError;
use super::rpc::Status;
use http::HeaderMap;
use std::error::Error as StdError;

type BoxError = Box<dyn StdError + Send + Sync>;

/// The core error returned by all the B2 client crates.
///
/// The client reports errors from multiple sources. The application may supply
/// invalid arguments, the object may be too large for any upload method, the
/// service may reject a request, or the transport may be unable to complete a
/// request at all.
///
/// Most applications will just return the error or log it. Applications
/// driving large file uploads may need to interrogate the error to decide
/// whether to resume the upload (see `list_parts`) or to cancel it. This type
/// offers a series of predicates to determine the error kind, and accessors
/// for the most common error details. Applications can query the error
/// [source][std::error::Error::source] for deeper information.
///
/// # Example
/// ```
/// use b2_gax::error::Error;
/// match example_function() {
///     Err(e) if e.is_lease_expired() => { println!("get a new upload URL"); },
///     Err(e) if matches!(e.status(), Some(_)) => {
///         println!("service error {e}, debug using {:?}", e.status().unwrap());
///     },
///     Err(e) => { println!("some other error {e}"); },
///     Ok(_) => { println!("success, how boring"); },
/// }
///
/// fn example_function() -> Result<String, Error> {
///     // ... details omitted ...
///     # use b2_gax::error::rpc::Status;
///     # Err(Error::service(Status::default().set_status(404).set_code("not_found")))
/// }
/// ```
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    source: Option<BoxError>,
}

impl Error {
    /// Creates an error with the information returned by the service.
    ///
    /// # Example
    /// ```
    /// use b2_gax::error::Error;
    /// use b2_gax::error::rpc::Status;
    /// let status = Status::default().set_status(404).set_code("not_found");
    /// let error = Error::service(status.clone());
    /// assert_eq!(error.status(), Some(&status));
    /// ```
    pub fn service(status: Status) -> Self {
        Self::service_with_http_metadata(status, None, None)
    }

    /// Creates a service error including transport metadata.
    pub fn service_with_http_metadata(
        status: Status,
        status_code: Option<u16>,
        headers: Option<HeaderMap>,
    ) -> Self {
        let details = ServiceDetails {
            status_code,
            headers,
            status,
        };
        Self {
            kind: ErrorKind::Service(Box::new(details)),
            source: None,
        }
    }

    /// Creates an error representing a rejected session (account) token.
    pub fn auth_expired(status: Status, status_code: Option<u16>, headers: Option<HeaderMap>) -> Self {
        let details = ServiceDetails {
            status_code,
            headers,
            status,
        };
        Self {
            kind: ErrorKind::AuthExpired(Box::new(details)),
            source: None,
        }
    }

    /// The service rejected the session token.
    ///
    /// The client re-authorizes and retries once when this happens. If you
    /// see this error the retry failed too.
    ///
    /// # Troubleshooting
    ///
    /// A token that is rejected immediately after a fresh authorization
    /// usually indicates the application key was deleted or revoked.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self.kind, ErrorKind::AuthExpired(_))
    }

    /// Creates an error representing a rejected upload URL token.
    pub fn lease_expired(status: Status, status_code: Option<u16>, headers: Option<HeaderMap>) -> Self {
        let details = ServiceDetails {
            status_code,
            headers,
            status,
        };
        Self {
            kind: ErrorKind::LeaseExpired(Box::new(details)),
            source: None,
        }
    }

    /// The service rejected the token of an upload URL.
    ///
    /// Upload URLs are leased and short-lived. Discard the upload target,
    /// lease a new one, and upload the data again.
    pub fn is_lease_expired(&self) -> bool {
        matches!(self.kind, ErrorKind::LeaseExpired(_))
    }

    /// Creates an error representing an invalid or missing argument.
    ///
    /// # Example
    /// ```
    /// use std::error::Error as _;
    /// use b2_gax::error::Error;
    /// let error = Error::invalid_argument("missing file name");
    /// assert!(error.is_invalid_argument());
    /// assert!(error.source().is_some());
    /// ```
    pub fn invalid_argument<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::InvalidArgument,
            source: Some(source.into()),
        }
    }

    /// The application supplied a missing or malformed parameter.
    ///
    /// This is always detected locally, no request was sent.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self.kind, ErrorKind::InvalidArgument)
    }

    /// Creates an error representing an object size no upload method can carry.
    pub fn invalid_size<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::InvalidSize,
            source: Some(source.into()),
        }
    }

    /// The object is too large (or too small) for every upload method.
    ///
    /// This is always detected locally, no request was sent.
    pub fn is_invalid_size(&self) -> bool {
        matches!(self.kind, ErrorKind::InvalidSize)
    }

    /// Creates an error representing a manifest that cannot be finished.
    pub fn incomplete_upload<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::IncompleteUpload,
            source: Some(source.into()),
        }
    }

    /// The large file manifest is empty, has gaps, or has undersized parts.
    ///
    /// This is always detected locally, no request was sent. The session is
    /// still open: upload the missing parts and try again, or cancel it.
    pub fn is_incomplete_upload(&self) -> bool {
        matches!(self.kind, ErrorKind::IncompleteUpload)
    }

    /// Creates an error representing an operation on a terminal session.
    pub fn session_closed<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::SessionClosed,
            source: Some(source.into()),
        }
    }

    /// The large file session was already finished or canceled.
    ///
    /// This indicates a bug in the application. Start a new session.
    pub fn is_session_closed(&self) -> bool {
        matches!(self.kind, ErrorKind::SessionClosed)
    }

    /// Creates an error representing a timeout.
    pub fn timeout<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Timeout,
            source: Some(source.into()),
        }
    }

    /// The request could not be completed before its deadline.
    ///
    /// The orchestrator treats timeouts like any other transport failure: it
    /// does not retry them.
    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, ErrorKind::Timeout)
    }

    /// Creates an error representing a deserialization problem.
    pub fn deser<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Deserialization,
            source: Some(source.into()),
        }
    }

    /// The response could not be deserialized, or its contents are
    /// inconsistent with the request.
    pub fn is_deserialization(&self) -> bool {
        matches!(self.kind, ErrorKind::Deserialization)
    }

    /// Creates an error representing a serialization problem.
    pub fn ser<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Serialization,
            source: Some(source.into()),
        }
    }

    /// The request, or its payload, could not be serialized.
    ///
    /// This includes errors reading the data source of an upload.
    pub fn is_serialization(&self) -> bool {
        matches!(self.kind, ErrorKind::Serialization)
    }

    /// Cannot load the credentials or authorize the account.
    pub fn authentication(source: CredentialsError) -> Self {
        Self {
            kind: ErrorKind::Authentication,
            source: Some(source.into()),
        }
    }

    /// Could not authorize the account before sending the request.
    ///
    /// # Troubleshooting
    ///
    /// Verify `B2_APPLICATION_KEY_ID` and `B2_APPLICATION_KEY` (or the values
    /// given to the credentials builder) are set and correct.
    pub fn is_authentication(&self) -> bool {
        matches!(self.kind, ErrorKind::Authentication)
    }

    /// The [Status] payload associated with this error.
    ///
    /// This is set for remote rejections, including expired session tokens
    /// and expired upload URL tokens.
    pub fn status(&self) -> Option<&Status> {
        match &self.kind {
            ErrorKind::Service(d) | ErrorKind::AuthExpired(d) | ErrorKind::LeaseExpired(d) => {
                Some(&d.status)
            }
            _ => None,
        }
    }

    /// The HTTP status code, if any, associated with this error.
    pub fn http_status_code(&self) -> Option<u16> {
        match &self.kind {
            ErrorKind::Transport(d) => d.status_code,
            ErrorKind::Service(d) | ErrorKind::AuthExpired(d) | ErrorKind::LeaseExpired(d) => {
                d.status_code
            }
            _ => None,
        }
    }

    /// The headers, if any, associated with this error.
    pub fn http_headers(&self) -> Option<&HeaderMap> {
        match &self.kind {
            ErrorKind::Transport(d) => d.headers.as_ref(),
            ErrorKind::Service(d) | ErrorKind::AuthExpired(d) | ErrorKind::LeaseExpired(d) => {
                d.headers.as_ref()
            }
            _ => None,
        }
    }

    /// The payload, if any, associated with this error.
    ///
    /// Only set for HTTP errors whose body is not a service error document.
    pub fn http_payload(&self) -> Option<&bytes::Bytes> {
        match &self.kind {
            ErrorKind::Transport(d) => d.payload.as_ref(),
            _ => None,
        }
    }

    /// A problem reported by the transport layer, with a full HTTP response.
    pub fn http(status_code: u16, headers: HeaderMap, payload: bytes::Bytes) -> Self {
        let details = TransportDetails {
            status_code: Some(status_code),
            headers: Some(headers),
            payload: Some(payload),
        };
        Self {
            kind: ErrorKind::Transport(Box::new(details)),
            source: None,
        }
    }

    /// A problem in the transport layer without a full HTTP response.
    ///
    /// Examples include: a connection refused, or a connection broken after
    /// the request is sent.
    pub fn io<T: Into<BoxError>>(source: T) -> Self {
        let details = TransportDetails {
            status_code: None,
            headers: None,
            payload: None,
        };
        Self {
            kind: ErrorKind::Transport(Box::new(details)),
            source: Some(source.into()),
        }
    }

    /// A transport problem without any HTTP response.
    pub fn is_io(&self) -> bool {
        matches!(
        &self.kind,
        ErrorKind::Transport(d) if matches!(**d, TransportDetails {
            status_code: None,
            headers: None,
            payload: None,
        }))
    }

    /// A problem in the transport layer.
    ///
    /// # Troubleshooting
    ///
    /// This indicates the request did not complete, or completed with a
    /// response that is not a service error document, such as an error from a
    /// proxy. The state of the request in the service is unknown.
    pub fn is_transport(&self) -> bool {
        matches!(&self.kind, ErrorKind::Transport(_))
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.kind, &self.source) {
            (ErrorKind::InvalidArgument, Some(e)) => write!(f, "invalid argument: {e}"),
            (ErrorKind::InvalidSize, Some(e)) => {
                write!(f, "no upload method can carry this object: {e}")
            }
            (ErrorKind::IncompleteUpload, Some(e)) => {
                write!(f, "cannot finish the large file: {e}")
            }
            (ErrorKind::SessionClosed, Some(e)) => {
                write!(f, "the large file session is closed: {e}")
            }
            (ErrorKind::Serialization, Some(e)) => write!(f, "cannot serialize the request {e}"),
            (ErrorKind::Deserialization, Some(e)) => {
                write!(f, "cannot deserialize the response {e}")
            }
            (ErrorKind::Authentication, Some(e)) => {
                write!(f, "cannot authorize the account {e}")
            }
            (ErrorKind::Timeout, Some(e)) => {
                write!(f, "the request exceeded the request deadline {e}")
            }
            (ErrorKind::Transport(details), _) => details.display(self.source(), f),
            (ErrorKind::Service(d), _) => d.display("the service reports an error", f),
            (ErrorKind::AuthExpired(d), _) => {
                d.display("the service rejected the authorization token", f)
            }
            (ErrorKind::LeaseExpired(d), _) => {
                d.display("the service rejected the upload URL token", f)
            }
            (_, None) => unreachable!("no constructor allows this"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error))
    }
}

/// The type of error held by an [Error] instance.
#[derive(Debug)]
enum ErrorKind {
    InvalidArgument,
    InvalidSize,
    IncompleteUpload,
    SessionClosed,
    Serialization,
    Deserialization,
    Authentication,
    Timeout,
    Transport(Box<TransportDetails>),
    Service(Box<ServiceDetails>),
    AuthExpired(Box<ServiceDetails>),
    LeaseExpired(Box<ServiceDetails>),
}

#[derive(Debug)]
struct TransportDetails {
    status_code: Option<u16>,
    headers: Option<HeaderMap>,
    payload: Option<bytes::Bytes>,
}

impl TransportDetails {
    fn display(
        &self,
        source: Option<&(dyn StdError + 'static)>,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match (source, &self) {
            (
                _,
                TransportDetails {
                    status_code: Some(code),
                    payload: Some(p),
                    ..
                },
            ) => {
                if let Ok(message) = std::str::from_utf8(p.as_ref()) {
                    write!(f, "the HTTP transport reports a [{code}] error: {message}")
                } else {
                    write!(f, "the HTTP transport reports a [{code}] error: {p:?}")
                }
            }
            (Some(source), _) => {
                write!(f, "the transport reports an error: {source}")
            }
            (None, _) => unreachable!("no Error constructor allows this"),
        }
    }
}

#[derive(Debug)]
struct ServiceDetails {
    status_code: Option<u16>,
    headers: Option<HeaderMap>,
    status: Status,
}

impl ServiceDetails {
    fn display(&self, prefix: &str, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{prefix} [{}] with code {} described as: {}",
            self.status.status, self.status.code, self.status.message
        )
    }
}
