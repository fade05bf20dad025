use std::sync::Arc;

use axum::body::Body;
use axum::extract::Json as AxumJson;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use nutrilog::app::build_app;
use nutrilog::config::AppConfig;
use nutrilog::state::AppState;
use nutrilog::storage::MemoryKv;

async fn spawn_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn state_with(usda_base: Option<&str>, chat_base: Option<&str>) -> AppState {
    let mut cfg = AppConfig::for_tests();
    if let Some(base) = usda_base {
        cfg.usda.api_key = Some("test-key".into());
        cfg.usda.base_url = base.to_string();
        cfg.usda.timeout_secs = 2;
    }
    if let Some(base) = chat_base {
        cfg.chat.api_key = Some("sk-test".into());
        cfg.chat.base_url = base.to_string();
        cfg.chat.timeout_secs = 2;
    }
    AppState::from_parts(Arc::new(cfg), Arc::new(MemoryKv::new())).unwrap()
}

fn get_req(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_req(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(res: Response) -> Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok_with_timestamp() {
    let app = build_app(AppState::fake());
    let res = app.oneshot(get_req("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["ok"], true);
    assert!(body["time"].as_str().unwrap().contains('T'));
}

// --- proxy: search ---

#[tokio::test]
async fn search_with_empty_query_is_a_400() {
    let app = build_app(AppState::fake());
    let res = app
        .oneshot(json_req("POST", "/api/usda/search", json!({ "query": "  " })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn short_query_returns_empty_foods_without_calling_upstream() {
    // An unroutable upstream: any attempt to call it would not return 200.
    let state = state_with(Some("http://127.0.0.1:1"), None);
    let app = build_app(state);
    let res = app
        .oneshot(json_req("POST", "/api/usda/search", json!({ "query": "a" })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await, json!({ "foods": [] }));
}

#[tokio::test]
async fn search_without_configured_key_is_a_500() {
    let app = build_app(AppState::fake());
    let res = app
        .oneshot(json_req("POST", "/api/usda/search", json!({ "query": "apple" })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(res).await;
    assert!(body["error"].as_str().unwrap().contains("USDA_API_KEY"));
}

#[tokio::test]
async fn search_passes_upstream_payload_through() {
    let stub = Router::new().route(
        "/foods/search",
        post(|AxumJson(body): AxumJson<Value>| async move {
            assert_eq!(body["query"], "apple");
            AxumJson(json!({ "foods": [{ "fdcId": 171688, "description": "Apples, raw" }] }))
        }),
    );
    let base = spawn_stub(stub).await;
    let app = build_app(state_with(Some(&base), None));

    let res = app
        .oneshot(json_req("POST", "/api/usda/search", json!({ "query": "apple" })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["foods"][0]["description"], "Apples, raw");
}

#[tokio::test]
async fn upstream_error_status_is_passed_through() {
    let stub = Router::new().route(
        "/foods/search",
        post(|| async { (StatusCode::NOT_FOUND, AxumJson(json!({ "message": "no such" }))) }),
    );
    let base = spawn_stub(stub).await;
    let app = build_app(state_with(Some(&base), None));

    let res = app
        .oneshot(json_req("POST", "/api/usda/search", json!({ "query": "apple" })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = body_json(res).await;
    assert_eq!(body["status"], 404);
    assert_eq!(body["details"]["message"], "no such");
}

#[tokio::test]
async fn non_json_success_body_maps_to_502() {
    let stub = Router::new().route("/foods/search", post(|| async { "<html>oops</html>" }));
    let base = spawn_stub(stub).await;
    let app = build_app(state_with(Some(&base), None));

    let res = app
        .oneshot(json_req("POST", "/api/usda/search", json!({ "query": "apple" })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(res).await;
    assert!(body["error"].as_str().unwrap().contains("non-JSON"));
}

#[tokio::test]
async fn food_detail_is_passed_through() {
    let stub = Router::new().route(
        "/food/:id",
        get(|| async { AxumJson(json!({ "fdcId": 171688, "description": "Apples, raw" })) }),
    );
    let base = spawn_stub(stub).await;
    let app = build_app(state_with(Some(&base), None));

    let res = app.oneshot(get_req("/api/usda/food/171688")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["description"], "Apples, raw");
}

// --- proxy: chat ---

#[tokio::test]
async fn chat_without_backend_answers_501_with_text_key() {
    let app = build_app(AppState::fake());
    let res = app
        .oneshot(json_req("POST", "/api/chat", json!({ "message": "hello" })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body_json(res).await, json!({ "text": "" }));
}

#[tokio::test]
async fn chat_with_empty_message_is_a_400_with_text_key() {
    let app = build_app(AppState::fake());
    let res = app
        .oneshot(json_req("POST", "/api/chat", json!({ "message": "" })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = body_json(res).await;
    assert_eq!(body["text"], "");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn chat_relays_the_assistant_text() {
    let stub = Router::new().route(
        "/chat/completions",
        post(|| async {
            AxumJson(json!({
                "choices": [{ "message": { "role": "assistant", "content": "Eat more protein." } }]
            }))
        }),
    );
    let base = spawn_stub(stub).await;
    let app = build_app(state_with(None, Some(&base)));

    let res = app
        .oneshot(json_req("POST", "/api/chat", json!({ "message": "tips?" })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await, json!({ "text": "Eat more protein." }));
}

// --- tracker flow ---

fn apple_detail_stub() -> Router {
    Router::new().route(
        "/food/:id",
        get(|| async {
            AxumJson(json!({
                "fdcId": 171688,
                "description": "Apples, raw, with skin",
                "dataType": "SR Legacy",
                "foodNutrients": [
                    { "nutrient": { "name": "Energy", "unitName": "kcal" }, "amount": 52.0 },
                    { "nutrient": { "name": "Protein", "unitName": "g" }, "amount": 0.26 },
                    { "nutrient": { "name": "Carbohydrate, by difference", "unitName": "g" }, "amount": 13.81 },
                    { "nutrient": { "name": "Total lipid (fat)", "unitName": "g" }, "amount": 0.17 },
                ],
            }))
        }),
    )
}

#[tokio::test]
async fn day_lifecycle_add_save_list_delete() {
    let base = spawn_stub(apple_detail_stub()).await;
    let app = build_app(state_with(Some(&base), None));

    // Fresh day: defaults, no items.
    let res = app.clone().oneshot(get_req("/api/day")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let day = body_json(res).await;
    assert_eq!(day["dailyGoal"], 2000);
    assert_eq!(day["totals"]["calories"], 0);

    // Set a goal and some steps.
    let res = app
        .clone()
        .oneshot(json_req(
            "PATCH",
            "/api/day",
            json!({ "dailyGoal": 1900, "steps": 10000, "mode": "Cut" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let day = body_json(res).await;
    assert_eq!(day["dailyGoal"], 1900);
    assert_eq!(day["mode"], "Cut");

    // Add 200 g of apple to breakfast.
    let res = app
        .clone()
        .oneshot(json_req(
            "POST",
            "/api/day/foods",
            json!({ "meal": "Breakfast", "fdcId": 171688, "grams": 200 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let day = body_json(res).await;
    assert_eq!(day["mealLog"]["Breakfast"][0]["kcal"], 104.0);
    assert_eq!(day["totals"]["calories"], 104);
    assert_eq!(day["remaining"], 1796);

    // Save the day.
    let res = app
        .clone()
        .oneshot(json_req("POST", "/api/day/save", json!({})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let record = body_json(res).await;
    let date_key = record["dateKey"].as_str().unwrap().to_string();
    assert_eq!(record["totals"]["calories"], 104);
    assert_eq!(record["burned"], 400);

    // It shows up in history.
    let res = app.clone().oneshot(get_req("/api/days")).await.unwrap();
    let listing = body_json(res).await;
    assert_eq!(listing.as_array().unwrap().len(), 1);
    assert_eq!(listing[0]["dateKey"], date_key.as_str());
    assert_eq!(listing[0]["items"], 1);

    let res = app
        .clone()
        .oneshot(get_req(&format!("/api/days/{date_key}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let saved = body_json(res).await;
    assert_eq!(saved["mealLog"]["Breakfast"][0]["description"], "Apples, raw, with skin");

    // Export carries the whole map.
    let res = app.clone().oneshot(get_req("/api/export")).await.unwrap();
    let export = body_json(res).await;
    assert!(export.get(&date_key).is_some());

    // Delete it; selection falls back to today's key.
    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/days/{date_key}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let outcome = body_json(res).await;
    assert_eq!(outcome["nextSelected"], date_key.as_str());

    // History is empty again and the draft fell back to empty state.
    let res = app.clone().oneshot(get_req("/api/days")).await.unwrap();
    assert_eq!(body_json(res).await.as_array().unwrap().len(), 0);
    let res = app.clone().oneshot(get_req("/api/day")).await.unwrap();
    assert_eq!(body_json(res).await["totals"]["calories"], 0);
}

#[tokio::test]
async fn saving_twice_keeps_the_same_meal_data() {
    let base = spawn_stub(apple_detail_stub()).await;
    let app = build_app(state_with(Some(&base), None));

    let res = app
        .clone()
        .oneshot(json_req(
            "POST",
            "/api/day/foods",
            json!({ "meal": "Lunch", "fdcId": "171688", "grams": 100 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let first = body_json(
        app.clone()
            .oneshot(json_req("POST", "/api/day/save", json!({})))
            .await
            .unwrap(),
    )
    .await;
    let second = body_json(
        app.clone()
            .oneshot(json_req("POST", "/api/day/save", json!({})))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(first["mealLog"], second["mealLog"]);
    assert_eq!(first["totals"], second["totals"]);
}

#[tokio::test]
async fn clear_day_resets_the_draft_but_keeps_history() {
    let base = spawn_stub(apple_detail_stub()).await;
    let app = build_app(state_with(Some(&base), None));

    app.clone()
        .oneshot(json_req(
            "POST",
            "/api/day/foods",
            json!({ "meal": "Dinner", "fdcId": 171688, "grams": 100 }),
        ))
        .await
        .unwrap();
    app.clone()
        .oneshot(json_req("POST", "/api/day/save", json!({})))
        .await
        .unwrap();

    let res = app
        .clone()
        .oneshot(json_req("POST", "/api/day/clear", json!({})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["totals"]["calories"], 0);

    let res = app.clone().oneshot(get_req("/api/days")).await.unwrap();
    assert_eq!(body_json(res).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn removing_a_missing_item_is_a_404() {
    let app = build_app(AppState::fake());
    let res = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/day/foods/Breakfast/3")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

// --- analytics & metrics ---

#[tokio::test]
async fn analytics_summary_has_a_seven_day_window() {
    let app = build_app(AppState::fake());
    let res = app.oneshot(get_req("/api/analytics")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["last7"].as_array().unwrap().len(), 7);
    assert_eq!(body["dailyGoal"], 2000);
    assert_eq!(body["hasToday"], false);
}

#[tokio::test]
async fn metrics_endpoint_computes_bmi_and_suggestion() {
    let app = build_app(AppState::fake());
    let res = app
        .oneshot(get_req("/api/metrics?heightCm=170&weightKg=70&mode=Maintain"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["bmi"], 24.2);
    assert_eq!(body["category"], "Normal");
    assert_eq!(body["suggestedCalories"], 1925);
    assert_eq!(body["targets"]["carbs"], 220);

    let res = build_app(AppState::fake())
        .oneshot(get_req("/api/metrics?mode=Hover"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
