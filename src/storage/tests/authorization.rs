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

mod fake_service;

#[cfg(test)]
mod tests {
    use super::fake_service::*;
    use b2_storage::model::NewFile;
    use httptest::responders::{Responder, json_encoded, status_code};
    use httptest::{Expectation, Server, cycle, matchers::*};
    use serde_json::json;

    type Result = anyhow::Result<()>;

    fn expired() -> impl Responder {
        status_code(401).body(
            json!({"status": 401, "code": "expired_auth_token", "message": "token expired"})
                .to_string(),
        )
    }

    fn expect_authorize_twice(server: &Server) {
        server.expect(
            Expectation::matching(request::method_path(
                "GET",
                "/b2api/v2/b2_authorize_account",
            ))
            .times(2)
            .respond_with(cycle![
                json_encoded(authorize_body(server, "token-1", 5 * KIB, 5 * KIB)),
                json_encoded(authorize_body(server, "token-2", 5 * KIB, 5 * KIB)),
            ]),
        );
    }

    #[tokio::test]
    async fn start_refreshes_once() -> Result {
        let server = Server::run();
        expect_authorize_twice(&server);
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/b2api/v2/b2_start_large_file"),
                request::headers(contains(("authorization", "token-1"))),
            ])
            .times(1)
            .respond_with(expired()),
        );
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/b2api/v2/b2_start_large_file"),
                request::headers(contains(("authorization", "token-2"))),
            ])
            .times(1)
            .respond_with(json_encoded(file_json())),
        );

        let client = client(&server).await?;
        let session = client
            .start_large_file(&NewFile::new("test-bucket", "test-object"))
            .await?;
        assert_eq!(session.file_id(), FILE_ID);
        assert_eq!(client.session().await?.authorization_token, "token-2");
        Ok(())
    }

    #[tokio::test]
    async fn expired_twice() -> Result {
        let server = Server::run();
        expect_authorize_twice(&server);
        // Exactly two attempts, there is no third one.
        server.expect(
            Expectation::matching(request::method_path(
                "POST",
                "/b2api/v2/b2_start_large_file",
            ))
            .times(2)
            .respond_with(expired()),
        );

        let client = client(&server).await?;
        let err = client
            .start_large_file(&NewFile::new("test-bucket", "test-object"))
            .await
            .expect_err("the token is rejected twice");
        assert!(err.is_auth_expired(), "{err:?}");
        assert_eq!(
            err.status().map(|s| s.code.as_str()),
            Some("expired_auth_token")
        );
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_refresh() -> Result {
        const CALLS: usize = 8;
        let server = Server::run();
        expect_authorize_twice(&server);
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/b2api/v2/b2_list_parts"),
                request::headers(contains(("authorization", "token-1"))),
            ])
            // Calls starting after the refresh already use `token-2`.
            .times(1..=CALLS)
            .respond_with(expired()),
        );
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/b2api/v2/b2_list_parts"),
                request::headers(contains(("authorization", "token-2"))),
            ])
            .times(CALLS)
            .respond_with(json_encoded(json!({"parts": [], "nextPartNumber": null}))),
        );

        let client = client(&server).await?;
        // Authorize before starting the calls, the first calls use `token-1`.
        assert_eq!(client.session().await?.authorization_token, "token-1");
        let calls = (0..CALLS).map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.list_parts(FILE_ID, 1, 100).await })
        });
        for handle in calls.collect::<Vec<_>>() {
            let page = handle.await??;
            assert!(page.parts.is_empty(), "{page:?}");
        }
        Ok(())
    }
}
