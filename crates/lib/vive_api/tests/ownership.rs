//! Ownership guard and role-gated writes over posts, comments and users.

mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};

use common::{Registered, TestApp};

struct World {
    app: TestApp,
    alice: Registered,
    bob: Registered,
    boss: Registered,
    post_id: i64,
}

/// Boss creates a category, Bob posts in it.
async fn world() -> World {
    let app = TestApp::new();
    let alice = app.register("Alice", "alice@example.com").await;
    let bob = app.register("Bob", "bob@example.com").await;
    let boss = app.register("Boss", "boss@admin.com").await;

    let (status, category) = app
        .call(
            "POST",
            "/api/categories",
            Some(&boss.token),
            Some(json!({"categoryTitle": "Music", "categoryDescription": "Concerts and gigs"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{category}");
    let category_id = category["categoryId"].as_i64().unwrap();

    let (status, post) = app
        .call(
            "POST",
            &format!("/api/user/{}/category/{category_id}/posts", bob.user_id),
            Some(&bob.token),
            Some(json!({"postTitle": "Jazz night", "content": "Friday at the park"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{post}");
    let post_id = post["postId"].as_i64().unwrap();

    World {
        app,
        alice,
        bob,
        boss,
        post_id,
    }
}

async fn comment(w: &World, token: &str, content: &str) -> i64 {
    let (status, body) = w
        .app
        .call(
            "POST",
            &format!("/api/posts/{}/comments", w.post_id),
            Some(token),
            Some(json!({"content": content})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn stranger_cannot_delete_comment_but_admin_can() {
    let w = world().await;
    let comment_id = comment(&w, &w.bob.token, "See you there").await;
    let uri = format!("/api/comments/{comment_id}");

    let (status, body) = w.app.call("DELETE", &uri, Some(&w.alice.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body,
        json!({"error": "FORBIDDEN", "message": "No tienes permisos para eliminar este comentario"})
    );

    let (status, _) = w.app.call("DELETE", &uri, Some(&w.boss.token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = w.app.call("GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn only_author_edits_comment() {
    let w = world().await;
    let comment_id = comment(&w, &w.bob.token, "See you there").await;
    let uri = format!("/api/comments/{comment_id}");

    let (status, body) = w
        .app
        .call("PUT", &uri, Some(&w.alice.token), Some(json!({"content": "hijacked"})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "No tienes permisos para editar este comentario");

    let (status, body) = w
        .app
        .call("PUT", &uri, Some(&w.bob.token), Some(json!({"content": "See you at 8"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "See you at 8");
    assert!(body["editedDate"].is_string());
}

#[tokio::test]
async fn replies_nest_and_are_public() {
    let w = world().await;
    let parent = comment(&w, &w.bob.token, "Who is playing?").await;

    let (status, reply) = w
        .app
        .call(
            "POST",
            &format!("/api/comments/{parent}/replies"),
            Some(&w.alice.token),
            Some(json!({"content": "A local trio"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reply["parentCommentId"], parent);

    let (status, thread) = w
        .app
        .call("GET", &format!("/api/posts/{}/comments", w.post_id), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let thread = thread.as_array().unwrap();
    assert_eq!(thread.len(), 1);
    assert_eq!(thread[0]["replies"][0]["content"], "A local trio");

    // Admins hold no USER role, so they cannot reply.
    let (status, _) = w
        .app
        .call(
            "POST",
            &format!("/api/comments/{parent}/replies"),
            Some(&w.boss.token),
            Some(json!({"content": "Moderator here"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn post_ownership() {
    let w = world().await;
    let uri = format!("/api/posts/{}", w.post_id);

    let (status, _) = w
        .app
        .call(
            "PUT",
            &uri,
            Some(&w.alice.token),
            Some(json!({"postTitle": "Mine now", "content": "hijacked"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = w
        .app
        .call(
            "PUT",
            &uri,
            Some(&w.bob.token),
            Some(json!({"postTitle": "Jazz night (moved)", "content": "Saturday"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["postTitle"], "Jazz night (moved)");

    let (status, _) = w.app.call("DELETE", &uri, Some(&w.alice.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = w.app.call("DELETE", &uri, Some(&w.boss.token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = w.app.call("GET", &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn posts_cannot_be_created_for_someone_else() {
    let w = world().await;
    let (status, _) = w
        .app
        .call(
            "POST",
            &format!("/api/user/{}/category/1/posts", w.bob.user_id),
            Some(&w.alice.token),
            Some(json!({"postTitle": "Fake", "content": "Posted as Bob"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn public_post_reads() {
    let w = world().await;
    for uri in [
        "/api/posts".to_string(),
        format!("/api/posts/{}", w.post_id),
        "/api/posts/search?keyword=jazz".to_string(),
        format!("/api/user/{}/posts", w.bob.user_id),
    ] {
        let (status, body) = w.app.call("GET", &uri, None, None).await;
        assert_eq!(status, StatusCode::OK, "{uri}: {body}");
    }
    let (_, found) = w
        .app
        .call("GET", "/api/posts/search?keyword=JAZZ", None, None)
        .await;
    assert_eq!(found.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn category_writes_are_admin_only() {
    let w = world().await;
    let (status, body) = w
        .app
        .call(
            "POST",
            "/api/categories",
            Some(&w.alice.token),
            Some(json!({"categoryTitle": "Food", "categoryDescription": "Street food fairs"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FORBIDDEN");

    let (status, body) = w
        .app
        .call(
            "POST",
            "/api/categories",
            Some(&w.boss.token),
            Some(json!({"categoryTitle": "Fo", "categoryDescription": "short"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn profile_updates_are_owner_only_and_roles_admin_only() {
    let w = world().await;
    let alice_uri = format!("/api/users/{}", w.alice.user_id);

    let (status, _) = w
        .app
        .call("PUT", &alice_uri, Some(&w.bob.token), Some(json!({"name": "Mallory"})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = w
        .app
        .call(
            "PUT",
            &alice_uri,
            Some(&w.alice.token),
            Some(json!({"about": "I organise street concerts"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["about"], "I organise street concerts");

    let (status, _) = w
        .app
        .call("PUT", &alice_uri, Some(&w.alice.token), Some(json!({"roles": ["ADMIN"]})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = w
        .app
        .call("PUT", &alice_uri, Some(&w.boss.token), Some(json!({"roles": ["USER", "ADMIN"]})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["roles"], json!(["USER", "ADMIN"]));
}

#[tokio::test]
async fn user_deletion_is_admin_only() {
    let w = world().await;
    let alice_uri = format!("/api/users/{}", w.alice.user_id);

    let (status, _) = w.app.call("DELETE", &alice_uri, Some(&w.alice.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body): (StatusCode, Value) =
        w.app.call("DELETE", &alice_uri, Some(&w.boss.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = w.app.call("GET", &alice_uri, Some(&w.bob.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn over_length_input_is_a_validation_error() {
    let w = world().await;
    let (status, body) = w
        .app
        .call(
            "POST",
            &format!("/api/posts/{}/comments", w.post_id),
            Some(&w.alice.token),
            Some(json!({"content": "a".repeat(1001)})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let (status, _) = w
        .app
        .call(
            "PUT",
            &format!("/api/posts/{}", w.post_id),
            Some(&w.bob.token),
            Some(json!({"postTitle": "t".repeat(101), "content": "Saturday"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn long_reply_chain_renders_and_deletes() {
    let w = world().await;
    let root = comment(&w, &w.bob.token, "Who is playing?").await;
    let mut parent = root;
    for _ in 0..60 {
        let (status, reply) = w
            .app
            .call(
                "POST",
                &format!("/api/comments/{parent}/replies"),
                Some(&w.alice.token),
                Some(json!({"content": "and then?"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        parent = reply["id"].as_i64().unwrap();
    }

    let (status, thread) = w
        .app
        .call("GET", &format!("/api/posts/{}/comments", w.post_id), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let mut depth = 0;
    let mut node = &thread[0];
    while let Some(next) = node["replies"].get(0) {
        node = next;
        depth += 1;
    }
    assert!(depth < 60);

    let (status, _) = w
        .app
        .call("DELETE", &format!("/api/comments/{root}"), Some(&w.bob.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, thread) = w
        .app
        .call("GET", &format!("/api/posts/{}/comments", w.post_id), None, None)
        .await;
    assert_eq!(thread, json!([]));
}
