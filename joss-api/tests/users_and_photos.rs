mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use joss_shared::clients::EmailKind;

use common::{multipart, spawn_app};

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 0];

#[tokio::test]
async fn user_can_read_and_update_own_account_by_path_and_query() {
    let app = spawn_app();
    let (id, token) = app.signed_in_user("alice", "alice@example.com").await;

    let res = app.get(&format!("/users/{id}"), Some(&token)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["email"], "alice@example.com");
    assert!(res.body["data"].get("password_hash").is_none());

    let res = app
        .json(
            Method::PUT,
            &format!("/users?id={id}"),
            json!({ "username": "alice_renamed", "password": "ignored1234" }),
            Some(&token),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["username"], "alice_renamed");

    let res = app.get(&format!("/users?id={id}"), Some(&token)).await;
    assert_eq!(res.body["data"]["username"], "alice_renamed");
}

#[tokio::test]
async fn changing_email_requires_verifying_the_new_address() {
    let app = spawn_app();
    let (id, token) = app.signed_in_user("alice", "alice@example.com").await;
    let verify = app.last_token(EmailKind::Verification, "alice@example.com");
    app.get(&format!("/auth/verify-email?token={verify}"), None).await;

    let res = app
        .json(
            Method::PUT,
            &format!("/users/{id}"),
            json!({ "email": "Alice.New@Example.com" }),
            Some(&token),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["email"], "alice.new@example.com");
    assert_eq!(res.body["data"]["is_verified"], false);

    let link = app.last_token(EmailKind::Verification, "alice.new@example.com");
    let res = app.get(&format!("/auth/verify-email?token={link}"), None).await;
    assert_eq!(res.location(), "http://app.test/login?verified=true");

    let res = app.get("/profile", Some(&token)).await;
    assert_eq!(res.body["data"]["is_verified"], true);
}

#[tokio::test]
async fn email_change_rejects_taken_or_malformed_addresses() {
    let app = spawn_app();
    let (id, token) = app.signed_in_user("alice", "alice@example.com").await;
    app.signed_in_user("bob", "bob@example.com").await;
    let sent = app.outbox.sent().len();

    let res = app
        .json(
            Method::PUT,
            &format!("/users/{id}"),
            json!({ "email": "BOB@example.com" }),
            Some(&token),
        )
        .await;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.body["error"]["code"], "E1002");

    let res = app
        .json(
            Method::PUT,
            &format!("/users/{id}"),
            json!({ "email": "not-an-email" }),
            Some(&token),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"]["details"]["email"][0], "invalid email format");

    let res = app.get("/profile", Some(&token)).await;
    assert_eq!(res.body["data"]["email"], "alice@example.com");
    assert_eq!(app.outbox.sent().len(), sent);
}

#[tokio::test]
async fn user_cannot_touch_another_account() {
    let app = spawn_app();
    let (alice, _) = app.signed_in_user("alice", "alice@example.com").await;
    let (_, bob_token) = app.signed_in_user("bob", "bob@example.com").await;

    let res = app.get(&format!("/users/{alice}"), Some(&bob_token)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .json(
            Method::DELETE,
            &format!("/users?id={alice}"),
            json!({}),
            Some(&bob_token),
        )
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn query_routes_require_a_valid_id() {
    let app = spawn_app();
    let (_, token) = app.signed_in_user("alice", "alice@example.com").await;

    assert_eq!(app.get("/users", Some(&token)).await.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        app.get("/users?id=not-a-uuid", Some(&token)).await.status,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn deleted_account_is_gone() {
    let app = spawn_app();
    let (id, token) = app.signed_in_user("alice", "alice@example.com").await;

    let res = app
        .json(Method::DELETE, &format!("/users/{id}"), json!({}), Some(&token))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "user deleted");

    // The session is still cryptographically valid but the account is not.
    let res = app.get("/profile", Some(&token)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn photos_upload_and_list_newest_first() {
    let app = spawn_app();
    let (id, token) = app.signed_in_user("alice", "alice@example.com").await;

    let res = app
        .upload("/photos", &token, multipart(Some(("image/png", PNG)), None))
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["data"]["title"], "Uploaded Photo");
    assert_eq!(res.body["data"]["account_id"], id.as_str());
    let url = res.body["data"]["url"].as_str().unwrap();
    assert!(url.starts_with("http://blobs.test/"));
    assert!(url.ends_with(".png"));

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let res = app
        .upload(
            "/photos",
            &token,
            multipart(Some(("image/jpeg", &b"\xff\xd8\xff\xe0jpeg"[..])), Some("Beach")),
        )
        .await;
    assert_eq!(res.status, StatusCode::CREATED);

    let res = app.get("/photos", Some(&token)).await;
    assert_eq!(res.status, StatusCode::OK);
    let photos = res.body["data"].as_array().unwrap();
    assert_eq!(photos.len(), 2);
    assert_eq!(photos[0]["title"], "Beach");
    assert_eq!(photos[1]["title"], "Uploaded Photo");
}

#[tokio::test]
async fn photo_upload_rejects_bad_input() {
    let app = spawn_app();
    let (_, token) = app.signed_in_user("alice", "alice@example.com").await;

    let res = app
        .upload("/photos", &token, multipart(Some(("text/plain", &b"hello"[..])), None))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app.upload("/photos", &token, multipart(None, Some("no file"))).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let oversized = vec![0u8; 2 * 1024 * 1024];
    let res = app
        .upload("/photos", &token, multipart(Some(("image/png", oversized.as_slice())), None))
        .await;
    assert_eq!(res.status, StatusCode::PAYLOAD_TOO_LARGE);

    let res = app.get("/photos", Some(&token)).await;
    assert!(res.body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn profile_picture_upload_updates_avatar() {
    let app = spawn_app();
    let (_, token) = app.signed_in_user("alice", "alice@example.com").await;

    let res = app
        .upload(
            "/upload/profile-picture",
            &token,
            multipart(Some(("image/webp", &b"RIFF0000WEBP"[..])), None),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "profile picture updated");
    let avatar = res.body["data"]["avatar_url"].as_str().unwrap().to_string();
    assert!(avatar.ends_with(".webp"));

    let profile = app.get("/profile", Some(&token)).await;
    assert_eq!(profile.body["data"]["avatar_url"], avatar.as_str());
}

#[tokio::test]
async fn uploads_require_a_session() {
    let app = spawn_app();

    let res = app.get("/photos", None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_reports_store_and_blobs() {
    let app = spawn_app();

    let res = app.get("/health", None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "healthy");
    assert_eq!(res.body["service"], "joss-api");
}

#[tokio::test]
async fn metrics_are_absent_without_a_recorder() {
    let app = spawn_app();

    assert_eq!(app.get("/metrics", None).await.status, StatusCode::NOT_FOUND);
}
