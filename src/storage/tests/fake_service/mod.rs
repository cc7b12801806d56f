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

//! Helpers to emulate the B2 native API with `httptest`.

// Each test binary uses a different subset of the helpers.
#![allow(dead_code)]

use b2_storage::client::Storage;
use b2_storage::part_reader::PartPayload;
use httptest::responders::json_encoded;
use httptest::{Expectation, Server, matchers::*};
use serde_json::{Value, json};

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * KIB;
pub const FILE_ID: &str = "4_z-test-file-id";
pub const UPLOAD_PART_PATH: &str = "/b2api/v2/b2_upload_part/test";

pub fn authorize_body(server: &Server, token: &str, recommended: u64, minimum: u64) -> Value {
    json!({
        "accountId": "test-account",
        "authorizationToken": token,
        "apiUrl": format!("http://{}", server.addr()),
        "downloadUrl": format!("http://{}", server.addr()),
        "recommendedPartSize": recommended,
        "absoluteMinimumPartSize": minimum,
        "allowed": {"capabilities": ["writeFiles", "listFiles", "deleteFiles"]},
    })
}

pub fn expect_authorize(server: &Server, recommended: u64, minimum: u64) {
    server.expect(
        Expectation::matching(request::method_path(
            "GET",
            "/b2api/v2/b2_authorize_account",
        ))
        .times(1)
        .respond_with(json_encoded(authorize_body(
            server,
            "test-token",
            recommended,
            minimum,
        ))),
    );
}

pub async fn client(server: &Server) -> anyhow::Result<Storage> {
    let credentials = b2_auth::credentials::Builder::default()
        .with_key_id("test-key-id")
        .with_application_key("test-application-key")
        .build()?;
    let client = Storage::builder()
        .with_credentials(credentials)
        .with_endpoint(format!("http://{}", server.addr()))
        .build()
        .await?;
    Ok(client)
}

pub fn file_json() -> Value {
    json!({
        "fileId": FILE_ID,
        "fileName": "test-object",
        "bucketId": "test-bucket",
        "accountId": "test-account",
        "action": "start",
    })
}

pub fn expect_start(server: &Server) {
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/b2api/v2/b2_start_large_file"),
            request::body(json_decoded(eq(json!({
                "bucketId": "test-bucket",
                "fileName": "test-object",
                "contentType": "b2/x-auto",
            })))),
        ])
        .times(1)
        .respond_with(json_encoded(file_json())),
    );
}

pub fn expect_lease(server: &Server, times: usize) {
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/b2api/v2/b2_get_upload_part_url"),
            request::body(json_decoded(eq(json!({"fileId": FILE_ID})))),
        ])
        .times(times)
        .respond_with(json_encoded(json!({
            "fileId": FILE_ID,
            "uploadUrl": format!("http://{}{UPLOAD_PART_PATH}", server.addr()),
            "authorizationToken": "upload-token",
        }))),
    );
}

pub fn part_json(part_number: u32, payload: &PartPayload) -> Value {
    json!({
        "fileId": FILE_ID,
        "partNumber": part_number,
        "contentLength": payload.len(),
        "contentSha1": payload.sha1(),
        "uploadTimestamp": 1_700_000_000_000_i64,
    })
}

/// Expects each part exactly once, matching on the part number and checksum.
pub fn expect_parts(server: &Server, parts: &[PartPayload]) {
    for (n, payload) in (1_u32..).zip(parts) {
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", UPLOAD_PART_PATH),
                request::headers(contains(("authorization", "upload-token"))),
                request::headers(contains(("x-bz-part-number", n.to_string()))),
                request::headers(contains(("x-bz-content-sha1", payload.sha1().to_string()))),
                request::headers(contains(("content-length", payload.len().to_string()))),
            ])
            .times(1)
            .respond_with(json_encoded(part_json(n, payload))),
        );
    }
}

pub fn expect_finish(server: &Server, parts: &[PartPayload]) {
    let sha1: Vec<&str> = parts.iter().map(|p| p.sha1()).collect();
    let length: u64 = parts.iter().map(|p| p.len()).sum();
    let mut file = file_json();
    file["action"] = json!("upload");
    file["contentLength"] = json!(length);
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/b2api/v2/b2_finish_large_file"),
            request::body(json_decoded(eq(json!({
                "fileId": FILE_ID,
                "partSha1Array": sha1,
            })))),
        ])
        .times(1)
        .respond_with(json_encoded(file)),
    );
}

pub fn expect_cancel(server: &Server) {
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/b2api/v2/b2_cancel_large_file"),
            request::body(json_decoded(eq(json!({"fileId": FILE_ID})))),
        ])
        .times(1)
        .respond_with(json_encoded(file_json())),
    );
}

/// Deterministic test data.
pub fn test_data(len: u64) -> bytes::Bytes {
    (0..len).map(|i| (i % 251) as u8).collect::<Vec<u8>>().into()
}

/// Splits `data` into the parts the client should upload.
pub fn split(data: &bytes::Bytes, part_size: u64) -> Vec<PartPayload> {
    data.chunks(part_size as usize)
        .map(|c| PartPayload::from(bytes::Bytes::copy_from_slice(c)))
        .collect()
}
