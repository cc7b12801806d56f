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
    use b2_storage::client::SessionState;
    use b2_storage::model::{File, NewFile};
    use b2_storage::part_reader::PartPayload;
    use httptest::responders::{json_encoded, status_code};
    use httptest::{Expectation, Server, matchers::*};
    use serde_json::json;

    type Result = anyhow::Result<()>;

    #[tokio::test]
    async fn happy_path() -> Result {
        let data = test_data(12 * MIB);
        let parts = split(&data, 5 * MIB);
        assert_eq!(
            parts.iter().map(|p| p.len()).collect::<Vec<_>>(),
            vec![5 * MIB, 5 * MIB, 2 * MIB]
        );

        let server = Server::run();
        expect_authorize(&server, 5 * MIB, 5 * MIB);
        expect_start(&server);
        expect_lease(&server, 3);
        expect_parts(&server, &parts);
        expect_finish(&server, &parts);

        let client = client(&server).await?;
        let mut session = client
            .start_large_file(&NewFile::new("test-bucket", "test-object"))
            .await?;
        for payload in parts.iter() {
            let target = client.get_upload_part_url(&session).await?;
            let part_number = session.assign_part_number()?;
            let part = client.upload_part(&target, part_number, payload).await?;
            assert_eq!(part.content_sha1, payload.sha1());
            session.record_part(part)?;
        }
        let file = client.finish_large_file(&mut session).await?;
        assert_eq!(file.file_id, FILE_ID);
        assert_eq!(file.content_length, 12 * MIB);
        assert_eq!(session.state(), SessionState::Finished);
        Ok(())
    }

    #[tokio::test]
    async fn out_of_order_completion() -> Result {
        let data = test_data(12 * KIB);
        let parts = split(&data, 5 * KIB);

        let server = Server::run();
        expect_authorize(&server, 5 * KIB, 5 * KIB);
        expect_start(&server);
        expect_lease(&server, 3);
        expect_parts(&server, &parts);
        expect_finish(&server, &parts);

        let client = client(&server).await?;
        let mut session = client
            .start_large_file(&NewFile::new("test-bucket", "test-object"))
            .await?;
        let numbers = [
            session.assign_part_number()?,
            session.assign_part_number()?,
            session.assign_part_number()?,
        ];
        // Upload and record the parts in reverse order.
        for (n, payload) in numbers.iter().zip(parts.iter()).rev() {
            let target = client.get_upload_part_url(&session).await?;
            let part = client.upload_part(&target, *n, payload).await?;
            session.record_part(part)?;
        }
        let file = client.finish_large_file(&mut session).await?;
        assert_eq!(file.file_id, FILE_ID);
        Ok(())
    }

    #[tokio::test]
    async fn finish_with_gap() -> Result {
        let data = test_data(20 * KIB);
        let parts = split(&data, 5 * KIB);

        let server = Server::run();
        expect_authorize(&server, 5 * KIB, 5 * KIB);
        expect_start(&server);
        expect_lease(&server, 3);
        // Upload parts 1, 2 and 4.
        expect_parts(&server, &parts[0..2]);
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", UPLOAD_PART_PATH),
                request::headers(contains(("x-bz-part-number", "4"))),
            ])
            .times(1)
            .respond_with(json_encoded(part_json(4, &parts[3]))),
        );

        let client = client(&server).await?;
        let mut session = client
            .start_large_file(&NewFile::new("test-bucket", "test-object"))
            .await?;
        for (n, payload) in [(1, &parts[0]), (2, &parts[1]), (4, &parts[3])] {
            let target = client.get_upload_part_url(&session).await?;
            let part = client.upload_part(&target, n, payload).await?;
            session.record_part(part)?;
        }
        let err = client
            .finish_large_file(&mut session)
            .await
            .expect_err("part 3 is missing");
        assert!(err.is_incomplete_upload(), "{err:?}");
        assert_eq!(session.state(), SessionState::Open);
        Ok(())
    }

    #[tokio::test]
    async fn undersized_part_rejected_by_service() -> Result {
        let payload = PartPayload::from(test_data(2 * KIB));

        let server = Server::run();
        expect_authorize(&server, 5 * KIB, 5 * KIB);
        expect_start(&server);
        expect_lease(&server, 1);
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", UPLOAD_PART_PATH),
                request::headers(contains(("content-length", "2048"))),
            ])
            .times(1)
            .respond_with(status_code(400).body(
                json!({
                    "status": 400,
                    "code": "bad_request",
                    "message": "Part is smaller than the minimum part size"
                })
                .to_string(),
            )),
        );

        let client = client(&server).await?;
        let mut session = client
            .start_large_file(&NewFile::new("test-bucket", "test-object"))
            .await?;
        let target = client.get_upload_part_url(&session).await?;
        let part_number = session.assign_part_number()?;
        let err = client
            .upload_part(&target, part_number, &payload)
            .await
            .expect_err("the service rejects the part");
        let status = err.status().expect("the service error is preserved");
        assert_eq!(status.code, "bad_request");
        assert_eq!(status.message, "Part is smaller than the minimum part size");
        assert_eq!(err.http_status_code(), Some(400));
        Ok(())
    }

    #[tokio::test]
    async fn cancel_mid_upload() -> Result {
        let data = test_data(15 * KIB);
        let parts = split(&data, 5 * KIB);

        let server = Server::run();
        expect_authorize(&server, 5 * KIB, 5 * KIB);
        expect_start(&server);
        expect_lease(&server, 2);
        expect_parts(&server, &parts[0..2]);
        expect_cancel(&server);

        let client = client(&server).await?;
        let mut session = client
            .start_large_file(&NewFile::new("test-bucket", "test-object"))
            .await?;
        for payload in parts[0..2].iter() {
            let target = client.get_upload_part_url(&session).await?;
            let part_number = session.assign_part_number()?;
            let part = client.upload_part(&target, part_number, payload).await?;
            session.record_part(part)?;
        }
        client.cancel_large_file(&mut session).await?;
        assert_eq!(session.state(), SessionState::Canceled);

        let err = client
            .finish_large_file(&mut session)
            .await
            .expect_err("the session is terminal");
        assert!(err.is_session_closed(), "{err:?}");
        let err = client
            .get_upload_part_url(&session)
            .await
            .expect_err("the session is terminal");
        assert!(err.is_session_closed(), "{err:?}");
        let err = session
            .assign_part_number()
            .expect_err("the session is terminal");
        assert!(err.is_session_closed(), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn independent_leases() -> Result {
        let payload = PartPayload::from(test_data(5 * KIB));

        let server = Server::run();
        expect_authorize(&server, 5 * KIB, 5 * KIB);
        expect_start(&server);
        server.expect(
            Expectation::matching(request::method_path(
                "POST",
                "/b2api/v2/b2_get_upload_part_url",
            ))
            .times(2)
            .respond_with(httptest::cycle![
                json_encoded(json!({
                    "fileId": FILE_ID,
                    "uploadUrl": format!("http://{}/upload/a", server.addr()),
                    "authorizationToken": "token-a",
                })),
                json_encoded(json!({
                    "fileId": FILE_ID,
                    "uploadUrl": format!("http://{}/upload/b", server.addr()),
                    "authorizationToken": "token-b",
                })),
            ]),
        );
        // The first lease expires, the second one still works.
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/upload/a"),
                request::headers(contains(("authorization", "token-a"))),
            ])
            .times(1)
            .respond_with(status_code(401).body(
                json!({"status": 401, "code": "expired_auth_token", "message": "expired"})
                    .to_string(),
            )),
        );
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/upload/b"),
                request::headers(contains(("authorization", "token-b"))),
            ])
            .times(1)
            .respond_with(json_encoded(part_json(1, &payload))),
        );

        let client = client(&server).await?;
        let session = client
            .start_large_file(&NewFile::new("test-bucket", "test-object"))
            .await?;
        let a = client.get_upload_part_url(&session).await?;
        let b = client.get_upload_part_url(&session).await?;
        assert_ne!(a, b);
        let err = client
            .upload_part(&a, 1, &payload)
            .await
            .expect_err("lease a expired");
        assert!(err.is_lease_expired(), "{err:?}");
        let part = client.upload_part(&b, 1, &payload).await?;
        assert_eq!(part.part_number, 1);
        Ok(())
    }

    #[tokio::test]
    async fn resume_after_crash() -> Result {
        let data = test_data(15 * KIB);
        let parts = split(&data, 5 * KIB);

        let server = Server::run();
        expect_authorize(&server, 5 * KIB, 5 * KIB);
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/b2api/v2/b2_list_parts"),
                request::body(json_decoded(eq(json!({
                    "fileId": FILE_ID,
                    "startPartNumber": 1,
                    "maxPartCount": 1000,
                })))),
            ])
            .times(1)
            .respond_with(json_encoded(json!({
                "parts": [part_json(1, &parts[0]), part_json(2, &parts[1])],
                "nextPartNumber": null,
            }))),
        );
        expect_lease(&server, 1);
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", UPLOAD_PART_PATH),
                request::headers(contains(("x-bz-part-number", "3"))),
            ])
            .times(1)
            .respond_with(json_encoded(part_json(3, &parts[2]))),
        );
        expect_finish(&server, &parts);

        let client = client(&server).await?;
        let unfinished = File::new().set_file_id(FILE_ID);
        let mut session = client.resume_large_file(unfinished).await?;
        let checksums: Vec<&str> = session
            .manifest()
            .parts()
            .map(|p| p.content_sha1.as_str())
            .collect();
        assert_eq!(checksums, vec![parts[0].sha1(), parts[1].sha1()]);
        assert_eq!(session.resume_offset(), 10 * KIB);

        let target = client.get_upload_part_url(&session).await?;
        let part_number = session.assign_part_number()?;
        assert_eq!(part_number, 3);
        let part = client.upload_part(&target, part_number, &parts[2]).await?;
        session.record_part(part)?;
        let file = client.finish_large_file(&mut session).await?;
        assert_eq!(file.content_length, 15 * KIB);
        Ok(())
    }

    #[tokio::test]
    async fn resume_and_finish_from_listed_parts() -> Result {
        let data = test_data(15 * KIB);
        let parts = split(&data, 5 * KIB);

        let server = Server::run();
        expect_authorize(&server, 5 * KIB, 5 * KIB);
        // The listed parts carry no file id.
        let listed: Vec<_> = (1_u32..)
            .zip(&parts)
            .map(|(n, p)| {
                json!({"partNumber": n, "contentLength": p.len(), "contentSha1": p.sha1()})
            })
            .collect();
        server.expect(
            Expectation::matching(request::method_path("POST", "/b2api/v2/b2_list_parts"))
                .times(1)
                .respond_with(json_encoded(json!({
                    "parts": listed,
                    "nextPartNumber": null,
                }))),
        );
        expect_finish(&server, &parts);

        let client = client(&server).await?;
        let mut session = client
            .resume_large_file(File::new().set_file_id(FILE_ID))
            .await?;
        assert_eq!(session.next_part_number(), 4);
        assert_eq!(session.resume_offset(), 15 * KIB);
        let file = client.finish_large_file(&mut session).await?;
        assert_eq!(file.content_length, 15 * KIB);
        assert_eq!(session.state(), SessionState::Finished);
        Ok(())
    }
}
