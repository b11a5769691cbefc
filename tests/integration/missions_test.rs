// Mission listing and lookup through the HTTP surface

use rstest::rstest;

use super::test_harness::{body_json, mission, TestApp, TABLE};

fn ids(body: &serde_json::Value) -> Vec<String> {
    body["missions"]
        .as_array()
        .expect("missions array")
        .iter()
        .map(|m| m["id"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn test_first_page_has_count_items_and_token() {
    let app = TestApp::new();
    app.seed_missions(5);

    let response = app.get("/missions?count=2").await;
    assert_eq!(response.status, 200);
    assert_eq!(response.header("Content-Type"), Some("application/json"));

    let body = body_json(response).await;
    assert_eq!(ids(&body), vec!["m-000", "m-001"]);
    let token = body["nextToken"].as_str().expect("nextToken");
    assert!(!token.is_empty());
}

#[tokio::test]
async fn test_following_tokens_walks_every_row_once() {
    let app = TestApp::new();
    app.seed_missions(5);

    let first = body_json(app.get("/missions?count=2").await).await;
    let token = first["nextToken"].as_str().unwrap().to_string();

    let second = body_json(
        app.get(&format!("/missions?count=2&nextToken={}", urlencoding::encode(&token)))
            .await,
    )
    .await;
    assert_eq!(ids(&second), vec!["m-002", "m-003"]);

    let token = second["nextToken"].as_str().unwrap().to_string();
    let last = body_json(
        app.get(&format!("/missions?count=2&nextToken={}", urlencoding::encode(&token)))
            .await,
    )
    .await;
    assert_eq!(ids(&last), vec!["m-004"]);
    assert!(last.get("nextToken").is_none());
}

#[tokio::test]
async fn test_default_page_size_is_ten() {
    let app = TestApp::new();
    app.seed_missions(12);

    let body = body_json(app.get("/missions").await).await;
    assert_eq!(ids(&body).len(), 10);
    assert!(body["nextToken"].is_string());
}

#[tokio::test]
async fn test_empty_table_returns_empty_list() {
    let app = TestApp::new();

    let body = body_json(app.get("/missions").await).await;
    assert_eq!(body, serde_json::json!({ "missions": [] }));
}

#[tokio::test]
async fn test_empty_next_token_means_first_page() {
    let app = TestApp::new();
    app.seed_missions(3);

    let body = body_json(app.get("/missions?count=1&nextToken=").await).await;
    assert_eq!(ids(&body), vec!["m-000"]);
}

#[tokio::test]
async fn test_count_above_ceiling_is_clamped() {
    let app = TestApp::new();
    app.seed_missions(105);

    let body = body_json(app.get("/missions?count=500").await).await;
    assert_eq!(ids(&body).len(), 100);
}

#[rstest]
#[case("0")]
#[case("-1")]
#[case("abc")]
#[case("2.5")]
#[tokio::test]
async fn test_invalid_count_is_rejected(#[case] count: &str) {
    let app = TestApp::new();
    app.seed_missions(3);

    let response = app.get(&format!("/missions?count={}", count)).await;
    assert_eq!(response.status, 400);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "error": "invalid count" })
    );
}

#[rstest]
#[case("%%%not-base64")]
#[case("bm90IGpzb24")] // "not json"
#[case("e30")] // "{}": no key attribute
#[case("eyJuYW1lIjp7IlMiOiJ4In19")] // wrong key attribute
#[tokio::test]
async fn test_bad_token_is_rejected(#[case] token: &str) {
    let app = TestApp::new();
    app.seed_missions(3);

    let response = app
        .get(&format!("/missions?nextToken={}", urlencoding::encode(token)))
        .await;
    assert_eq!(response.status, 400);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "error": "invalid pagination token" })
    );
}

#[tokio::test]
async fn test_get_mission_returns_record() {
    let app = TestApp::new();
    app.seed_missions(2);

    let response = app.get("/mission/m-001").await;
    assert_eq!(response.status, 200);

    let body = body_json(response).await;
    let expected = serde_json::to_value(mission("m-001")).unwrap();
    assert_eq!(body, expected);
}

#[tokio::test]
async fn test_unknown_mission_is_404() {
    let app = TestApp::new();
    app.seed_missions(2);

    let response = app.get("/mission/does-not-exist").await;
    assert_eq!(response.status, 404);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "error": "mission not found" })
    );
}

#[tokio::test]
async fn test_mission_without_id_is_400() {
    let app = TestApp::new();

    let response = app.get("/mission/").await;
    assert_eq!(response.status, 400);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "error": "missing id" })
    );
}

#[tokio::test]
async fn test_store_outage_does_not_leak_detail() {
    let app = TestApp::new();
    app.seed_missions(2);
    app.kv.set_unavailable(true);

    let response = app.get("/missions").await;
    assert_eq!(response.status, 500);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "error": "failed to retrieve missions" })
    );

    let response = app.get("/mission/m-000").await;
    assert_eq!(response.status, 500);
    assert_eq!(
        body_json(response).await,
        serde_json::json!({ "error": "failed to retrieve mission" })
    );
    assert_eq!(app.kv.item_count(TABLE), 2);
}
