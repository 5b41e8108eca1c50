//! HTTP-level tests for stars, reorder, captions, deletion and comments.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, TestApp, OWNER, VIEWER};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Create a gallery with `count` confirmed images; returns `(gallery_id, image_ids)`.
async fn gallery_with_images(app: &TestApp, count: usize) -> (i64, Vec<i64>) {
    let gallery_id = app.create_gallery("Shared").await;
    let files: Vec<(String, &str, u64)> = (0..count)
        .map(|i| (format!("{i}.jpg"), "image/jpeg", 100))
        .collect();
    let files: Vec<(&str, &str, u64)> = files
        .iter()
        .map(|(name, content_type, size)| (name.as_str(), *content_type, *size))
        .collect();

    let json = body_json(app.negotiate(gallery_id, &files).await).await;
    let targets = json["data"].as_array().unwrap();
    let ids = targets
        .iter()
        .map(|target| {
            app.complete_upload(target, 100);
            target["image_id"].as_i64().unwrap()
        })
        .collect();

    let read = app
        .get(OWNER, &format!("/api/v1/galleries/{gallery_id}/images"))
        .await;
    assert_eq!(read.status(), StatusCode::OK);
    (gallery_id, ids)
}

async fn listed_ids(app: &TestApp, user: &str, gallery_id: i64) -> Vec<i64> {
    let json = body_json(
        app.get(user, &format!("/api/v1/galleries/{gallery_id}/images"))
            .await,
    )
    .await;
    json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|image| image["id"].as_i64().unwrap())
        .collect()
}

// ---------------------------------------------------------------------------
// Test: starring is idempotent and viewer-relative
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn star_toggle_is_idempotent(pool: PgPool) {
    let app = build_test_app(pool);
    let (gallery_id, ids) = gallery_with_images(&app, 1).await;
    let uri = format!("/api/v1/images/{}/star", ids[0]);

    let first = body_json(app.post_json(VIEWER, &uri, json!({})).await).await;
    assert_eq!(first["data"]["starred"], true);
    assert_eq!(first["data"]["changed"], true);

    let second = body_json(app.post_json(VIEWER, &uri, json!({})).await).await;
    assert_eq!(second["data"]["starred"], true);
    assert_eq!(second["data"]["changed"], false);

    let viewer = body_json(
        app.get(VIEWER, &format!("/api/v1/galleries/{gallery_id}/images"))
            .await,
    )
    .await;
    assert_eq!(viewer["data"][0]["starred"], true);
    let owner = body_json(
        app.get(OWNER, &format!("/api/v1/galleries/{gallery_id}/images"))
            .await,
    )
    .await;
    assert_eq!(owner["data"][0]["starred"], false);

    let removed = body_json(app.delete(VIEWER, &uri).await).await;
    assert_eq!(removed["data"]["starred"], false);
    assert_eq!(removed["data"]["changed"], true);
    let again = body_json(app.delete(VIEWER, &uri).await).await;
    assert_eq!(again["data"]["changed"], false);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn starring_a_pending_upload_is_404(pool: PgPool) {
    let app = build_test_app(pool);
    let gallery_id = app.create_gallery("Trip").await;
    let json = body_json(app.negotiate(gallery_id, &[("A.jpg", "image/jpeg", 10)]).await).await;
    let image_id = json["data"][0]["image_id"].as_i64().unwrap();

    let response = app
        .post_json(OWNER, &format!("/api/v1/images/{image_id}/star"), json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: reorder persists and rejects non-permutations
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn reorder_persists_new_order(pool: PgPool) {
    let app = build_test_app(pool);
    let (gallery_id, ids) = gallery_with_images(&app, 3).await;
    let reversed: Vec<i64> = ids.iter().rev().copied().collect();

    let response = app
        .put_json(
            OWNER,
            &format!("/api/v1/galleries/{gallery_id}/order"),
            json!({ "image_ids": reversed }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(listed_ids(&app, OWNER, gallery_id).await, reversed);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn reorder_rejects_incomplete_order(pool: PgPool) {
    let app = build_test_app(pool);
    let (gallery_id, ids) = gallery_with_images(&app, 3).await;

    let response = app
        .put_json(
            OWNER,
            &format!("/api/v1/galleries/{gallery_id}/order"),
            json!({ "image_ids": [ids[1], ids[0]] }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let duplicate = app
        .put_json(
            OWNER,
            &format!("/api/v1/galleries/{gallery_id}/order"),
            json!({ "image_ids": [ids[0], ids[0], ids[1]] }),
        )
        .await;
    assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);

    assert_eq!(listed_ids(&app, OWNER, gallery_id).await, ids);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn reorder_requires_owner(pool: PgPool) {
    let app = build_test_app(pool);
    let (gallery_id, ids) = gallery_with_images(&app, 2).await;

    let response = app
        .put_json(
            VIEWER,
            &format!("/api/v1/galleries/{gallery_id}/order"),
            json!({ "image_ids": [ids[1], ids[0]] }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Test: caption update and soft delete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn caption_update_and_delete(pool: PgPool) {
    let app = build_test_app(pool);
    let (gallery_id, ids) = gallery_with_images(&app, 2).await;

    let updated = app
        .patch_json(
            OWNER,
            &format!("/api/v1/images/{}", ids[0]),
            json!({ "caption": "Sunset" }),
        )
        .await;
    assert_eq!(updated.status(), StatusCode::OK);
    assert_eq!(body_json(updated).await["data"]["caption"], "Sunset");

    let forbidden = app
        .delete(VIEWER, &format!("/api/v1/images/{}", ids[0]))
        .await;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let deleted = app.delete(OWNER, &format!("/api/v1/images/{}", ids[0])).await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    assert_eq!(listed_ids(&app, OWNER, gallery_id).await, vec![ids[1]]);
}

// ---------------------------------------------------------------------------
// Test: comments update the durable comment count
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn comments_are_listed_and_counted(pool: PgPool) {
    let app = build_test_app(pool);
    let (gallery_id, ids) = gallery_with_images(&app, 1).await;
    let uri = format!("/api/v1/images/{}/comments", ids[0]);

    let created = app
        .post_json(VIEWER, &uri, json!({ "body": "  Lovely light  " }))
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    assert_eq!(body_json(created).await["data"]["body"], "Lovely light");

    let blank = app.post_json(VIEWER, &uri, json!({ "body": "   " })).await;
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);

    let listed = body_json(app.get(OWNER, &uri).await).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
    assert_eq!(listed["data"][0]["author_id"], VIEWER);

    let gallery = body_json(
        app.get(OWNER, &format!("/api/v1/galleries/{gallery_id}/images"))
            .await,
    )
    .await;
    assert_eq!(gallery["data"][0]["comment_count"], 1);
}

// ---------------------------------------------------------------------------
// Test: gallery CRUD ownership
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn gallery_crud_enforces_ownership(pool: PgPool) {
    let app = build_test_app(pool);
    let gallery_id = app.create_gallery("Mine").await;

    let renamed = app
        .patch_json(
            VIEWER,
            &format!("/api/v1/galleries/{gallery_id}"),
            json!({ "name": "Theirs" }),
        )
        .await;
    assert_eq!(renamed.status(), StatusCode::FORBIDDEN);

    let listed = body_json(app.get(OWNER, "/api/v1/galleries").await).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
    let other = body_json(app.get(VIEWER, "/api/v1/galleries").await).await;
    assert!(other["data"].as_array().unwrap().is_empty());

    let deleted = app
        .delete(OWNER, &format!("/api/v1/galleries/{gallery_id}"))
        .await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    let gone = app
        .get(OWNER, &format!("/api/v1/galleries/{gallery_id}"))
        .await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn empty_gallery_name_is_rejected(pool: PgPool) {
    let app = build_test_app(pool);
    let response = app
        .post_json(OWNER, "/api/v1/galleries", json!({ "name": "  " }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
