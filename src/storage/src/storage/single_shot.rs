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

use super::client::{Storage, StorageInner, enc};
use super::large_file::AUTO_CONTENT_TYPE;
use super::part_reader::PartPayload;
use crate::error::UploadError;
use crate::model::{File, GetUploadUrlRequest, NewFile, UploadTarget};
use crate::{Error, Result};
use http::{HeaderMap, HeaderName, HeaderValue};

impl Storage {
    /// Leases an upload target for single-request uploads into `bucket_id`.
    pub async fn get_upload_url(&self, bucket_id: &str) -> Result<UploadTarget> {
        self.inner.get_upload_url(bucket_id).await
    }

    /// Uploads a complete object in a single request.
    ///
    /// Fails with an error where
    /// [is_invalid_argument()][Error::is_invalid_argument] is true if the
    /// object is outside the scope of the application key. If the service rejects the target token the error satisfies
    /// [is_lease_expired()][Error::is_lease_expired]; discard the target,
    /// lease a new one, and try again.
    ///
    /// # Example
    /// ```
    /// # use b2_storage::client::Storage;
    /// # use b2_storage::model::NewFile;
    /// # use b2_storage::part_reader::PartPayload;
    /// # async fn sample(client: &Storage) -> anyhow::Result<()> {
    /// let target = client.get_upload_url("my-bucket-id").await?;
    /// let file = client
    ///     .upload_file(
    ///         &target,
    ///         &NewFile::new("my-bucket-id", "greetings/hello.txt").set_content_type("text/plain"),
    ///         &PartPayload::from("hello world"),
    ///     )
    ///     .await?;
    /// println!("{file:?}");
    /// # Ok(()) }
    /// ```
    pub async fn upload_file(
        &self,
        target: &UploadTarget,
        file: &NewFile,
        payload: &PartPayload,
    ) -> Result<File> {
        self.inner.upload_file(target, file, payload).await
    }
}

impl StorageInner {
    pub(crate) async fn get_upload_url(&self, bucket_id: &str) -> Result<UploadTarget> {
        if bucket_id.is_empty() {
            return Err(Error::invalid_argument("missing bucket id"));
        }
        let session = self.session().await?;
        if !session.allows_bucket(bucket_id) {
            return Err(Error::invalid_argument(format!(
                "the application key cannot write into bucket {bucket_id}"
            )));
        }
        let request = GetUploadUrlRequest { bucket_id };
        let target: UploadTarget = self.api_call("b2_get_upload_url", &request).await?;
        tracing::debug!(bucket_id, upload_url = %target.upload_url, "leased upload target");
        Ok(target)
    }

    pub(crate) async fn upload_file(
        &self,
        target: &UploadTarget,
        file: &NewFile,
        payload: &PartPayload,
    ) -> Result<File> {
        file.validate()?;
        self.check_write_scope(file).await?;
        let headers = upload_headers(file, payload)?;
        tracing::debug!(
            bucket_id = %file.bucket_id,
            file_name = %file.file_name,
            bytes = payload.len(),
            "uploading file"
        );
        let uploaded: File = self
            .upload_call(target, headers, payload.to_body())
            .await?;
        match uploaded.content_sha1.as_deref() {
            Some(got) if got != payload.sha1() => Err(Error::deser(UploadError::ChecksumMismatch {
                part_number: 1,
                got: got.to_string(),
                want: payload.sha1().to_string(),
            })),
            _ => Ok(uploaded),
        }
    }
}

fn upload_headers(file: &NewFile, payload: &PartPayload) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        "X-Bz-File-Name",
        HeaderValue::from_str(&enc(&file.file_name)).map_err(Error::ser)?,
    );
    headers.insert(
        http::header::CONTENT_TYPE,
        HeaderValue::from_str(file.content_type.as_deref().unwrap_or(AUTO_CONTENT_TYPE))
            .map_err(Error::invalid_argument)?,
    );
    headers.insert(http::header::CONTENT_LENGTH, HeaderValue::from(payload.len()));
    headers.insert(
        "X-Bz-Content-Sha1",
        HeaderValue::from_str(payload.sha1()).map_err(Error::ser)?,
    );
    for (key, value) in file.file_info.iter() {
        let name = HeaderName::from_bytes(format!("X-Bz-Info-{key}").as_bytes())
            .map_err(Error::invalid_argument)?;
        let value = HeaderValue::from_str(&enc(value)).map_err(Error::ser)?;
        headers.insert(name, value);
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::client::tests::{authorize_body, expect_authorize, test_builder, test_client};
    use httptest::responders::{json_encoded, status_code};
    use httptest::{Expectation, Server, matchers::*};
    use serde_json::json;

    type Result = anyhow::Result<()>;

    const HELLO_SHA1: &str = "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed";

    #[tokio::test]
    async fn get_upload_url() -> Result {
        let server = Server::run();
        expect_authorize(&server);
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/b2api/v2/b2_get_upload_url"),
                request::headers(contains(("authorization", "test-token"))),
                request::body(json_decoded(eq(json!({"bucketId": "test-bucket"})))),
            ])
            .times(1)
            .respond_with(json_encoded(json!({
                "bucketId": "test-bucket",
                "uploadUrl": "https://pod-1/b2api/v2/b2_upload_file/test-bucket",
                "authorizationToken": "upload-token",
            }))),
        );

        let client = test_client(&server).await?;
        let target = client.get_upload_url("test-bucket").await?;
        assert_eq!(target.bucket_id.as_deref(), Some("test-bucket"));
        assert_eq!(target.authorization_token, "upload-token");
        let fmt = format!("{target:?}");
        assert!(!fmt.contains("upload-token"), "{fmt}");
        Ok(())
    }

    #[tokio::test]
    async fn get_upload_url_outside_key_scope() -> Result {
        let server = Server::run();
        let mut body = authorize_body(&server, "test-token");
        body["allowed"]["bucketId"] = json!("other-bucket");
        server.expect(
            Expectation::matching(request::method_path(
                "GET",
                "/b2api/v2/b2_authorize_account",
            ))
            .times(1)
            .respond_with(json_encoded(body)),
        );

        let client = test_builder(&server).build().await?;
        let err = client
            .get_upload_url("test-bucket")
            .await
            .expect_err("bucket outside of key scope");
        assert!(err.is_invalid_argument(), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn upload_file() -> Result {
        let server = Server::run();
        expect_authorize(&server);
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/upload"),
                request::headers(contains(("authorization", "upload-token"))),
                request::headers(contains(("x-bz-file-name", "greetings/hello%20world.txt"))),
                request::headers(contains(("content-type", "b2/x-auto"))),
                request::headers(contains(("content-length", "11"))),
                request::headers(contains(("x-bz-content-sha1", HELLO_SHA1))),
                request::headers(contains(("x-bz-info-author", "J%20Doe"))),
                request::body("hello world"),
            ])
            .times(1)
            .respond_with(json_encoded(json!({
                "fileId": "test-file-id",
                "fileName": "greetings/hello world.txt",
                "bucketId": "test-bucket",
                "contentLength": 11,
                "contentSha1": HELLO_SHA1,
                "contentType": "text/plain",
                "fileInfo": {"author": "J Doe"},
                "action": "upload",
            }))),
        );

        let client = test_client(&server).await?;
        let target = UploadTarget {
            bucket_id: Some("test-bucket".to_string()),
            file_id: None,
            upload_url: format!("http://{}/upload", server.addr()),
            authorization_token: "upload-token".to_string(),
        };
        let file = NewFile::new("test-bucket", "greetings/hello world.txt")
            .set_file_info([("author", "J Doe")]);
        let got = client
            .upload_file(&target, &file, &PartPayload::from("hello world"))
            .await?;
        assert_eq!(got.file_id, "test-file-id");
        assert_eq!(got.content_length, 11);
        Ok(())
    }

    #[tokio::test]
    async fn upload_file_lease_expired() -> Result {
        let server = Server::run();
        expect_authorize(&server);
        server.expect(
            Expectation::matching(request::method_path("POST", "/upload"))
                .times(1)
                .respond_with(status_code(401).body(
                    json!({"status": 401, "code": "bad_auth_token", "message": "invalid"})
                        .to_string(),
                )),
        );

        let client = test_client(&server).await?;
        let target = UploadTarget {
            bucket_id: Some("test-bucket".to_string()),
            file_id: None,
            upload_url: format!("http://{}/upload", server.addr()),
            authorization_token: "upload-token".to_string(),
        };
        let err = client
            .upload_file(
                &target,
                &NewFile::new("test-bucket", "hello.txt"),
                &PartPayload::from("hello world"),
            )
            .await
            .expect_err("lease expired");
        assert!(err.is_lease_expired(), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn upload_file_outside_name_prefix() -> Result {
        let server = Server::run();
        let mut body = authorize_body(&server, "test-token");
        body["allowed"]["namePrefix"] = json!("backups/");
        server.expect(
            Expectation::matching(request::method_path(
                "GET",
                "/b2api/v2/b2_authorize_account",
            ))
            .times(1)
            .respond_with(json_encoded(body)),
        );
        server.expect(
            Expectation::matching(request::method_path("POST", "/upload"))
                .times(0)
                .respond_with(status_code(500)),
        );

        let client = test_builder(&server).build().await?;
        let target = UploadTarget {
            bucket_id: Some("test-bucket".to_string()),
            file_id: None,
            upload_url: format!("http://{}/upload", server.addr()),
            authorization_token: "upload-token".to_string(),
        };
        let err = client
            .upload_file(
                &target,
                &NewFile::new("test-bucket", "photos/hello.txt"),
                &PartPayload::from("hello world"),
            )
            .await
            .expect_err("name outside of key scope");
        assert!(err.is_invalid_argument(), "{err:?}");
        Ok(())
    }

    #[test]
    fn headers_invalid_info_key() {
        let file = NewFile::new("test-bucket", "hello.txt").set_file_info([("bad key", "v")]);
        let err = upload_headers(&file, &PartPayload::from("hello"))
            .expect_err("spaces are not valid in header names");
        assert!(err.is_invalid_argument(), "{err:?}");
    }

    #[test]
    fn headers_content_type() -> Result {
        let file = NewFile::new("test-bucket", "hello.txt").set_content_type("text/plain");
        let headers = upload_headers(&file, &PartPayload::from("hello"))?;
        assert_eq!(
            headers.get(http::header::CONTENT_TYPE),
            Some(&HeaderValue::from_static("text/plain"))
        );
        assert_eq!(
            headers.get(http::header::CONTENT_LENGTH),
            Some(&HeaderValue::from_static("5"))
        );
        Ok(())
    }
}
