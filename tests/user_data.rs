//! Library and invite routes keyed by `x-user-id`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;

mod common;
use common::{app, get, post_json, send, test_config, with_user};

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn library_requires_identity() {
    let app = app(test_config("http://127.0.0.1:9"));

    let (status, _, body) = send(&app, get("/api/library")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"status": "error", "error": "Authentication required"}));

    let (status, _, _) = send(
        &app,
        post_json("/api/invite", json!({"email": "friend@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn library_save_list_delete() {
    let app = app(test_config("http://127.0.0.1:9"));

    let (status, _, body) = send(
        &app,
        with_user(
            post_json(
                "/api/library",
                json!({
                    "url": "https://fal.media/up.png",
                    "mediaType": "image",
                    "prompt": "koi",
                    "title": "Neon Koi"
                }),
            ),
            "alice",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let id = body["item"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["item"]["media_type"], "image");

    let (_, _, body) = send(&app, with_user(get("/api/library"), "alice")).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["total"], 1);

    let (_, _, body) = send(&app, with_user(get("/api/library"), "bob")).await;
    assert_eq!(body["items"], json!([]));

    let (status, _, _) = send(
        &app,
        with_user(delete(&format!("/api/library?id={id}")), "bob"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, body) = send(
        &app,
        with_user(delete(&format!("/api/library?id={id}")), "alice"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "success"}));

    let (status, _, _) = send(
        &app,
        with_user(delete(&format!("/api/library?id={id}")), "alice"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn library_validates_input() {
    let app = app(test_config("http://127.0.0.1:9"));

    let (status, _, _) = send(
        &app,
        with_user(
            post_json("/api/library", json!({"url": "not a url", "media_type": "image"})),
            "alice",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(
        &app,
        with_user(
            post_json("/api/library", json!({"url": "https://x.io/a.gif", "media_type": "gif"})),
            "alice",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) = send(&app, with_user(delete("/api/library?id=nope"), "alice")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "id must be a UUID");
}

#[tokio::test]
async fn invite_create_and_redeem() {
    let app = app(test_config("http://127.0.0.1:9"));

    let (status, _, body) = send(
        &app,
        with_user(post_json("/api/invite", json!({"email": "not-an-email"})), "alice"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "A valid email is required");

    let (status, _, body) = send(
        &app,
        with_user(post_json("/api/invite", json!({"email": "Friend@Example.com"})), "alice"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["invite"]["email"], "friend@example.com");
    let code = body["invite"]["code"].as_str().unwrap().to_string();

    let (status, _, _) = send(
        &app,
        with_user(post_json("/api/invite", json!({"email": "friend@example.com"})), "carol"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _, _) = send(
        &app,
        with_user(post_json("/api/invite/redeem", json!({"code": code})), "alice"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) = send(
        &app,
        with_user(post_json("/api/invite/redeem", json!({"code": code})), "bob"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["invite"]["redeemed_by"], "bob");

    let (status, _, _) = send(
        &app,
        with_user(post_json("/api/invite/redeem", json!({"code": code})), "dave"),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _, _) = send(
        &app,
        with_user(post_json("/api/invite/redeem", json!({"code": "ZZZZZZZZ"})), "dave"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
