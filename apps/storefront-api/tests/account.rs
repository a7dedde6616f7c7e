//! Address book, cards, favorites, notifications and content over HTTP.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use common::TestApp;

fn address(title: &str, is_default: bool) -> Value {
    json!({
        "address_title": title,
        "full_name": "Ada Lovelace",
        "phone": "5550001122",
        "city": "Izmir",
        "district": "Konak",
        "address_line": "1 Analytical St",
        "is_default": is_default
    })
}

fn defaults(list: &Value) -> Vec<(String, bool)> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|a| {
            (
                a["address_title"].as_str().unwrap().to_string(),
                a["is_default"].as_bool().unwrap(),
            )
        })
        .collect()
}

#[tokio::test]
async fn test_address_book_keeps_one_default() {
    let app = TestApp::new().await;
    let (_, token) = app.customer().await;
    let (_, stranger) = app.customer().await;

    let (status, body) = app.post("/api/addresses", Some(&token), address("Home", false)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["is_default"], true);
    let home = body["id"].as_i64().unwrap();

    let (status, body) = app.post("/api/addresses", Some(&token), address("Work", true)).await;
    assert_eq!(status, StatusCode::CREATED);
    let work = body["id"].as_i64().unwrap();

    let (_, list) = app.get("/api/addresses", Some(&token)).await;
    assert_eq!(
        defaults(&list),
        vec![("Work".to_string(), true), ("Home".to_string(), false)]
    );

    let mut missing = address("Cabin", false);
    missing.as_object_mut().unwrap().remove("city");
    let (status, _) = app.post("/api/addresses", Some(&token), missing).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get(&format!("/api/addresses/{home}"), Some(&stranger)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.delete(&format!("/api/addresses/{home}"), Some(&stranger)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .put(&format!("/api/addresses/{home}"), Some(&token), address("Home Sweet Home", false))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["address_title"], "Home Sweet Home");

    let (status, _) = app
        .call(Method::POST, &format!("/api/addresses/{home}/set-default"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, list) = app.get("/api/addresses", Some(&token)).await;
    assert_eq!(defaults(&list)[0], ("Home Sweet Home".to_string(), true));
    assert_eq!(defaults(&list).iter().filter(|(_, d)| *d).count(), 1);

    // Deleting the default promotes the oldest remaining address.
    let (status, _) = app.delete(&format!("/api/addresses/{home}"), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.get(&format!("/api/addresses/{work}"), Some(&token)).await;
    assert_eq!(body["is_default"], true);
}

#[tokio::test]
async fn test_cards() {
    let app = TestApp::new().await;
    let (_, token) = app.customer().await;
    let (_, stranger) = app.customer().await;

    let card = |last4: &str, month: i64| {
        json!({
            "card_holder_name": "Ada Lovelace",
            "last_four_digits": last4,
            "card_type": "visa",
            "expiry_month": month,
            "expiry_year": 29
        })
    };

    let (status, _) = app.post("/api/cards", Some(&token), card("42a2", 1)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.post("/api/cards", Some(&token), card("4242", 13)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .post("/api/cards", Some(&token), json!({ "last_four_digits": "4242" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.post("/api/cards", Some(&token), card("4242", 12)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["last_four_digits"], "4242");
    assert!(body.get("user_id").is_none());
    let id = body["id"].as_i64().unwrap();

    let (_, list) = app.get("/api/cards", Some(&token)).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, _) = app.delete(&format!("/api/cards/{id}"), Some(&stranger)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.delete(&format!("/api/cards/{id}"), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_favorites() {
    let app = TestApp::new().await;
    let (_, token) = app.customer().await;
    let (_, admin) = app.admin().await;
    let mug = app.product("Mug", 1200, 5).await;
    let uri = format!("/api/favorites/{}", mug.id);
    let check = format!("/api/favorites/check/{}", mug.id);

    let (_, body) = app.get(&check, Some(&token)).await;
    assert_eq!(body, json!({ "isFavorite": false }));

    let (status, body) = app.call(Method::POST, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["favoriteId"].is_i64());

    let (status, _) = app.call(Method::POST, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.call(Method::POST, "/api/favorites/999", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app.get(&check, Some(&token)).await;
    assert_eq!(body, json!({ "isFavorite": true }));
    let (_, list) = app.get("/api/favorites", Some(&token)).await;
    assert_eq!(list[0]["name"], "Mug");
    assert!(list[0]["favorited_at"].is_string());

    let (status, _) = app.get("/api/favorites", Some(&admin)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, body) = app.get(&check, Some(&admin)).await;
    assert_eq!(body, json!({ "isFavorite": false }));

    let (status, _) = app.delete(&uri, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.delete(&uri, Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_notification_inbox() {
    let app = TestApp::new().await;
    let (_, token) = app.customer().await;
    let (_, other) = app.customer().await;
    let (admin_user, admin) = app.admin().await;

    let (status, _) = app
        .post("/api/notifications/announce", Some(&admin), json!({ "title": "Hi" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .post("/api/notifications/announce", Some(&token), json!({ "title": "Hi", "message": "x" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post(
            "/api/notifications/announce",
            Some(&admin),
            json!({ "title": "Opening hours", "message": "Open on Sunday" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (_, body) = app
        .post(
            "/api/notifications/campaign",
            Some(&admin),
            json!({ "title": "Spring sale", "message": "20% off", "campaignCode": "SPRING20" }),
        )
        .await;
    assert_eq!(body["count"], 2);

    let (status, page) = app.get("/api/notifications?limit=10", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 2);
    assert_eq!(page["unreadCount"], 2);
    let newest = &page["notifications"][0];
    assert_eq!(newest["type"], "campaign");
    assert_eq!(newest["title"], "🎉 Spring sale");
    assert_eq!(newest["campaign_code"], "SPRING20");
    assert_eq!(newest["sender"]["id"], admin_user.id.as_str());
    assert_eq!(newest["sender"]["firstName"], "Ada");
    let id = newest["id"].as_i64().unwrap();

    let (status, _) = app
        .call(Method::PUT, &format!("/api/notifications/{id}/read"), Some(&other), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .call(Method::PUT, &format!("/api/notifications/{id}/read"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get("/api/notifications/unread-count", Some(&token)).await;
    assert_eq!(body, json!({ "count": 1 }));
    let (_, page) = app.get("/api/notifications?unreadOnly=true", Some(&token)).await;
    assert_eq!(page["notifications"].as_array().unwrap().len(), 1);

    let (_, body) = app
        .call(Method::PUT, "/api/notifications/mark-all-read", Some(&token), None)
        .await;
    assert_eq!(body["count"], 1);

    let (status, _) = app.delete(&format!("/api/notifications/{id}"), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.delete(&format!("/api/notifications/{id}"), Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The sender is excluded and admins are not customers.
    let page = app.db().notifications().list(&admin_user.id, 50, 0, false).await.unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn test_notification_preferences() {
    let app = TestApp::new().await;
    let (_, token) = app.customer().await;

    let (status, prefs) = app.get("/api/notifications/preferences", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(prefs["campaign_notifications"], true);
    assert_eq!(prefs["order_status_updates"], true);

    let (status, prefs) = app
        .put(
            "/api/notifications/preferences",
            Some(&token),
            json!({ "campaign_notifications": false }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(prefs["campaign_notifications"], false);
    assert_eq!(prefs["order_status_updates"], true);
}

#[tokio::test]
async fn test_question_and_answer_flow() {
    let app = TestApp::new().await;
    let (asker, token) = app.customer().await;
    let (admin_user, admin) = app.admin().await;

    let (status, _) = app
        .post("/api/content/faq/question", Some(&token), json!({ "question": "  " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .post("/api/content/faq/question", None, json!({ "question": "Hello?" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .post(
            "/api/content/faq/question",
            Some(&token),
            json!({ "question": "Do you ship abroad?" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_i64().unwrap();

    let page = app.wait_for_notifications(&admin_user.id, 1).await;
    assert_eq!(page["notifications"][0]["type"], "new_question");
    assert_eq!(page["notifications"][0]["question_id"], id);

    // Unpublished until answered.
    let (_, published) = app.get("/api/content/faq", None).await;
    assert_eq!(published, json!([]));
    let (_, all) = app.get("/api/content/faq/all", Some(&admin)).await;
    assert_eq!(all[0]["email"], asker.email.as_str());
    assert_eq!(all[0]["is_user_question"], true);

    let (status, body) = app
        .put(
            &format!("/api/content/faq/{id}"),
            Some(&admin),
            json!({ "question": "Do you ship abroad?", "answer": "Yes, across the EU.", "is_published": true }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_published"], true);

    let page = app.wait_for_notifications(&asker.id, 1).await;
    assert_eq!(page["notifications"][0]["type"], "question_answer");
    assert!(page["notifications"][0]["message"]
        .as_str()
        .unwrap()
        .ends_with("Answer: Yes, across the EU."));

    let (_, published) = app.get("/api/content/faq", None).await;
    assert_eq!(published[0]["answer"], "Yes, across the EU.");

    let (status, _) = app
        .put("/api/content/faq/999", Some(&admin), json!({ "question": "?" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.delete(&format!("/api/content/faq/{id}"), Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_pages_and_help() {
    let app = TestApp::new().await;
    let (_, admin) = app.admin().await;

    let (status, _) = app.get("/api/content/page/about", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .put("/api/content/page/about", Some(&admin), json!({ "content": "<p>Hi</p>" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.get("/api/content/page/about", None).await;
    assert_eq!(body["content"], "<p>Hi</p>");
    assert!(body["updated_at"].is_string());

    let (_, help) = app.get("/api/content/help", None).await;
    assert_eq!(help["phone"], "");
    assert_eq!(help["email"], "");

    let (status, _) = app
        .put("/api/content/help", Some(&admin), json!({ "phone": "555", "email": "help@example.com" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, help) = app.get("/api/content/help", None).await;
    assert_eq!(help["email"], "help@example.com");

    let (status, body) = app
        .post("/api/content/faq", Some(&admin), json!({ "question": "Returns?", "answer": "30 days" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["id"].is_i64());
    let (_, published) = app.get("/api/content/faq", None).await;
    assert_eq!(published[0]["question"], "Returns?");
}
