use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use crate::integration::common::{
    TEST_API_KEY, critical_vitals, normal_vitals, setup_test_app, setup_test_app_with_auth,
};

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn predict_request(vitals: &serde_json::Value) -> Request<Body> {
    Request::post("/predict")
        .header("content-type", "application/json")
        .body(Body::from(vitals.to_string()))
        .unwrap()
}

#[tokio::test]
async fn root_returns_welcome() {
    let app = setup_test_app();

    let (status, json) = send(&app, Request::get("/").body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["message"].as_str().unwrap().contains("Welcome"));
}

#[tokio::test]
async fn health_returns_200() {
    let app = setup_test_app();

    let (status, json) = send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["model"], "vitals-rules");
    assert_eq!(json["queue_length"], 0);
}

#[tokio::test]
async fn predict_admits_patient() {
    let app = setup_test_app();

    let (status, json) = send(&app, predict_request(&critical_vitals())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["risk_level"], "high");
    assert_eq!(json["queue_position"], 1);
    assert_eq!(json["estimated_wait_time"], 0);
    assert!(json["patient_id"].as_str().unwrap().starts_with("patient_1_"));
    assert_eq!(json["details"]["heart_rate"], 130);

    let (_, health) = send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(health["queue_length"], 1);
}

#[tokio::test]
async fn predict_rejects_out_of_range_vitals() {
    let app = setup_test_app();
    let mut vitals = normal_vitals();
    vitals["Oxygen_Saturation"] = serde_json::json!(140);

    let (status, json) = send(&app, predict_request(&vitals)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"], "validation_error");
    assert!(json["message"].as_str().unwrap().contains("oxygen_saturation"));
}

#[tokio::test]
async fn predict_rejects_missing_fields() {
    let app = setup_test_app();
    let mut vitals = normal_vitals();
    vitals.as_object_mut().unwrap().remove("Heart_Rate");

    let (status, json) = send(&app, predict_request(&vitals)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"], "validation_error");
}

#[tokio::test]
async fn oversized_body_returns_413() {
    let app = setup_test_app();
    let body = "x".repeat(128 * 1024);

    let response = app
        .oneshot(
            Request::post("/predict")
                .header("content-type", "application/json")
                .header("content-length", body.len())
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn oversized_body_without_length_returns_413() {
    let app = setup_test_app();
    let body = "x".repeat(128 * 1024);

    // No Content-Length header: the limit trips while the body is read
    let (status, json) = send(
        &app,
        Request::post("/predict")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json["error"], "payload_too_large");
}

#[tokio::test]
async fn predict_accepts_trailing_slash() {
    let app = setup_test_app();

    let request = Request::post("/predict/")
        .header("content-type", "application/json")
        .body(Body::from(normal_vitals().to_string()))
        .unwrap();
    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["risk_level"], "low");

    let (status, _) = send(&app, Request::get("/queue/").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn queue_orders_by_priority() {
    let app = setup_test_app();

    send(&app, predict_request(&normal_vitals())).await;
    send(&app, predict_request(&critical_vitals())).await;

    let (status, json) = send(&app, Request::get("/queue").body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::OK);
    let queue = json.as_array().unwrap();
    assert_eq!(queue.len(), 2);
    assert_eq!(queue[0]["risk_level"], "high");
    assert_eq!(queue[0]["queue_position"], 1);
    assert!(queue[0]["scheduling_action"].is_null());
    assert_eq!(queue[1]["risk_level"], "low");
    assert_eq!(queue[1]["queue_position"], 2);
    assert!(queue[1]["scheduling_action"].is_string());
    assert!(
        queue[0]["priority_score"].as_f64().unwrap() > queue[1]["priority_score"].as_f64().unwrap()
    );
}

#[tokio::test]
async fn next_patient_on_empty_queue_returns_404() {
    let app = setup_test_app();

    let (status, json) =
        send(&app, Request::get("/queue/next").body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn next_patient_dequeues_highest_priority() {
    let app = setup_test_app();

    send(&app, predict_request(&normal_vitals())).await;
    let (_, admitted) = send(&app, predict_request(&critical_vitals())).await;

    let (status, json) =
        send(&app, Request::get("/queue/next").body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["patient_id"], admitted["patient_id"]);

    let (_, queue) = send(&app, Request::get("/queue").body(Body::empty()).unwrap()).await;
    let queue = queue.as_array().unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0]["risk_level"], "low");
    assert_eq!(queue[0]["queue_position"], 1);
}

#[tokio::test]
async fn update_priorities_reports_counts() {
    let app = setup_test_app();

    let (status, json) = send(
        &app,
        Request::post("/queue/update-priorities")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "No patients in queue");

    send(&app, predict_request(&normal_vitals())).await;
    send(&app, predict_request(&critical_vitals())).await;

    let (status, json) = send(
        &app,
        Request::post("/queue/update-priorities")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["high_priority_count"], 1);
    assert_eq!(json["medium_priority_count"], 0);
    assert_eq!(json["low_priority_count"], 1);
}

#[tokio::test]
async fn clear_empties_queue() {
    let app = setup_test_app();

    send(&app, predict_request(&normal_vitals())).await;
    send(&app, predict_request(&normal_vitals())).await;

    let (status, json) = send(
        &app,
        Request::delete("/queue/clear").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Cleared 2 patients from queue");

    let (_, queue) = send(&app, Request::get("/queue").body(Body::empty()).unwrap()).await;
    assert!(queue.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn feedback_updates_policy() {
    let app = setup_test_app();

    let (_, admitted) = send(&app, predict_request(&normal_vitals())).await;
    let patient_id = admitted["patient_id"].as_str().unwrap();

    let uri = format!(
        "/feedback?patient_id={patient_id}&actual_wait_time=20&satisfaction_score=0.9&resource_utilization=0.8"
    );
    let (status, json) = send(&app, Request::post(uri).body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["learned"], true);
    assert_eq!(json["patient_id"], patient_id);
    assert_eq!(json["outcome"]["actual_wait_time"], 20);
    assert!(json["reward"].is_number());

    let (_, policy) = send(&app, Request::get("/policy").body(Body::empty()).unwrap()).await;
    assert_eq!(policy["feedback_received"], 1);
    assert!(policy["states"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn feedback_for_unknown_patient_is_accepted() {
    let app = setup_test_app();

    let (status, json) = send(
        &app,
        Request::post("/feedback?patient_id=nobody&actual_wait_time=5&satisfaction_score=0.5")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["learned"], false);
    assert_eq!(json["message"], "Feedback received");
    assert_eq!(json["outcome"]["resource_utilization"], 0.5);
}

#[tokio::test]
async fn feedback_rejects_out_of_range_score() {
    let app = setup_test_app();

    let (status, json) = send(
        &app,
        Request::post("/feedback?patient_id=p&actual_wait_time=5&satisfaction_score=1.5")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"], "validation_error");
}

#[tokio::test]
async fn feedback_rejects_missing_params() {
    let app = setup_test_app();

    let (status, _) = send(
        &app,
        Request::post("/feedback?patient_id=p").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn clear_without_api_key_returns_401() {
    let app = setup_test_app_with_auth();

    let (status, json) = send(
        &app,
        Request::delete("/queue/clear").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "unauthorized");
}

#[tokio::test]
async fn wrong_api_key_returns_401() {
    let app = setup_test_app_with_auth();

    let (status, _) = send(
        &app,
        Request::delete("/queue/clear")
            .header("authorization", "Bearer wrong-key")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn clear_with_api_key_succeeds() {
    let app = setup_test_app_with_auth();

    let (status, _) = send(
        &app,
        Request::delete("/queue/clear")
            .header("authorization", format!("Bearer {TEST_API_KEY}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn public_routes_skip_auth() {
    let app = setup_test_app_with_auth();

    let (status, _) = send(&app, predict_request(&normal_vitals())).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn openapi_json_lists_routes() {
    let app = setup_test_app();

    let (status, json) =
        send(&app, Request::get("/openapi.json").body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["info"]["title"], "Triage API");
    assert!(json["paths"]["/predict"].is_object());
    assert!(json["paths"]["/feedback"].is_object());
    assert!(json["components"]["securitySchemes"]["bearer"].is_object());
}

#[tokio::test]
async fn docs_redirects_to_swagger_ui() {
    let app = setup_test_app();

    let response = app
        .oneshot(Request::get("/docs").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(response.headers()["location"], "/docs/");
}

#[tokio::test]
async fn swagger_ui_is_served() {
    let app = setup_test_app();

    let response = app
        .oneshot(Request::get("/docs/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn redoc_is_served() {
    let app = setup_test_app();

    let response = app
        .oneshot(Request::get("/redoc").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&body).contains("redoc"));
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = setup_test_app();

    let response = app
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
