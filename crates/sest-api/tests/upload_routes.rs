use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use sest_api::{AppStateInner, router};
use sest_codec::Encoding;
use sest_core::ParsePolicy;
use sest_db::{Database, NewChannel};
use sest_types::models::Channel;

const ADMIN_TOKEN: &str = "test-admin-token";

struct TestApp {
    app: Router,
    db: Arc<Database>,
    channel: Channel,
}

fn test_app(policy: ParsePolicy, admin_token: Option<&str>) -> TestApp {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let user = db.create_user("test").unwrap();
    let channel = db
        .create_channel(&NewChannel {
            id: Some(1234),
            user_id: user.id,
            number_fields: 2,
            notification_email: None,
        })
        .unwrap();

    let state = Arc::new(AppStateInner::new(
        db.clone(),
        policy,
        admin_token.map(str::to_string),
    ));

    TestApp {
        app: router(state),
        db,
        channel,
    }
}

fn form_upload(channel_id: i64, key: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(format!("/{}/upload/", channel_id))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(key) = key {
        builder = builder.header("X-Write-API-Key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn admin(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_TOKEN));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn key_of(t: &TestApp) -> String {
    t.channel.write_key.to_string()
}

#[tokio::test]
async fn upload_single_field() {
    let t = test_app(ParsePolicy::Lenient, None);
    let key = key_of(&t);

    let (status, body) = send(&t.app, form_upload(1234, Some(&key), "field2=45")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["channel_id"], 1234);
    assert_eq!(body["fields"], 1);

    let records = t.db.get_records(1234, 10).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(body["record_id"], records[0].id);
}

#[tokio::test]
async fn upload_without_trailing_slash() {
    let t = test_app(ParsePolicy::Lenient, None);
    let req = Request::builder()
        .method(Method::POST)
        .uri("/1234/upload")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header("X-Write-API-Key", key_of(&t))
        .body(Body::from("field1=7"))
        .unwrap();

    let (status, _) = send(&t.app, req).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn upload_json_body() {
    let t = test_app(ParsePolicy::Lenient, None);
    t.db.set_field_encoding(1234, 1, &Encoding::Boolean).unwrap();
    t.db.set_field_encoding(1234, 2, &Encoding::Float).unwrap();

    let req = Request::builder()
        .method(Method::POST)
        .uri("/1234/upload/")
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-Write-API-Key", key_of(&t))
        .body(Body::from(json!({ "field1": true, "field2": 2.5 }).to_string()))
        .unwrap();

    let (status, body) = send(&t.app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fields"], 2);
    assert_eq!(body["unvalidated"], json!([]));

    let req = Request::builder()
        .method(Method::POST)
        .uri("/1234/upload/")
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-Write-API-Key", key_of(&t))
        .body(Body::from(json!({ "field1": [1, 2] }).to_string()))
        .unwrap();
    let (status, _) = send(&t.app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn validation_failures_are_not_acceptable() {
    let t = test_app(ParsePolicy::Lenient, None);
    let key = key_of(&t);

    let (status, body) = send(&t.app, form_upload(1234, Some(&key), "")).await;
    assert_eq!(status, StatusCode::NOT_ACCEPTABLE);
    assert!(body["error"].is_string());

    let (status, _) = send(
        &t.app,
        form_upload(1234, Some(&key), "field1=1&field2=1&field3=1&field4=1"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_ACCEPTABLE);

    let (status, _) = send(&t.app, form_upload(1234, Some(&key), "temperature=1")).await;
    assert_eq!(status, StatusCode::NOT_ACCEPTABLE);

    assert!(t.db.get_records(1234, 10).unwrap().is_empty());
}

#[tokio::test]
async fn bodiless_post_is_an_empty_submission() {
    let t = test_app(ParsePolicy::Lenient, None);

    let req = Request::builder()
        .method(Method::POST)
        .uri("/1234/upload/")
        .header("X-Write-API-Key", key_of(&t))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&t.app, req).await;
    assert_eq!(status, StatusCode::NOT_ACCEPTABLE);

    let req = Request::builder()
        .method(Method::POST)
        .uri("/1234/upload/")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, "0")
        .header("X-Write-API-Key", key_of(&t))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&t.app, req).await;
    assert_eq!(status, StatusCode::NOT_ACCEPTABLE);

    assert!(t.db.get_records(1234, 10).unwrap().is_empty());
}

#[tokio::test]
async fn upload_multipart_body() {
    let t = test_app(ParsePolicy::Lenient, None);
    let body = "--XX\r\n\
                Content-Disposition: form-data; name=\"field2\"\r\n\
                \r\n\
                45\r\n\
                --XX--\r\n";

    let req = Request::builder()
        .method(Method::POST)
        .uri("/1234/upload/")
        .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XX")
        .header("X-Write-API-Key", key_of(&t))
        .body(Body::from(body))
        .unwrap();
    let (status, body) = send(&t.app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fields"], 1);

    let records = t.db.get_records(1234, 10).unwrap();
    let fields = t.db.get_fields_for_records(&[records[0].id]).unwrap();
    assert_eq!(fields[0].field_no, 2);
    assert_eq!(fields[0].raw.as_str(), "45");
}

#[tokio::test]
async fn auth_failures_are_bad_request() {
    let t = test_app(ParsePolicy::Lenient, None);
    let stranger = Uuid::new_v4().to_string();

    let (status, wrong_key) = send(&t.app, form_upload(1234, Some(&stranger), "field2=45")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&t.app, form_upload(1234, None, "field2=45")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, unknown_channel) =
        send(&t.app, form_upload(9999, Some(&stranger), "field2=45")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_key, unknown_channel);

    assert!(t.db.get_records(1234, 10).unwrap().is_empty());
}

#[tokio::test]
async fn upload_requires_post() {
    let t = test_app(ParsePolicy::Lenient, None);
    let req = Request::builder()
        .method(Method::GET)
        .uri("/1234/upload/")
        .header("X-Write-API-Key", key_of(&t))
        .body(Body::empty())
        .unwrap();

    let (status, _) = send(&t.app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn lenient_upload_reports_unvalidated_slots() {
    let t = test_app(ParsePolicy::Lenient, None);
    t.db.set_field_encoding(1234, 2, &Encoding::Float).unwrap();

    let (status, body) = send(&t.app, form_upload(1234, Some(&key_of(&t)), "field2=asdf")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unvalidated"], json!([2]));
}

#[tokio::test]
async fn strict_upload_rejects_bad_values() {
    let t = test_app(ParsePolicy::Strict, None);
    t.db.set_field_encoding(1234, 2, &Encoding::Float).unwrap();

    let (status, _) = send(&t.app, form_upload(1234, Some(&key_of(&t)), "field2=asdf")).await;
    assert_eq!(status, StatusCode::NOT_ACCEPTABLE);
    assert!(t.db.get_records(1234, 10).unwrap().is_empty());
}

#[tokio::test]
async fn admin_routes_need_configured_token() {
    let t = test_app(ParsePolicy::Lenient, None);
    let (status, _) = send(&t.app, admin(Method::GET, "/channels/1234", None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let t = test_app(ParsePolicy::Lenient, Some(ADMIN_TOKEN));
    let req = Request::builder()
        .uri("/channels/1234")
        .header(header::AUTHORIZATION, "Bearer nope")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&t.app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::builder().uri("/channels/1234").body(Body::empty()).unwrap();
    let (status, _) = send(&t.app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&t.app, admin(Method::GET, "/channels/1234", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["number_fields"], 2);
}

#[tokio::test]
async fn channel_lifecycle() {
    let t = test_app(ParsePolicy::Lenient, Some(ADMIN_TOKEN));

    let (status, user) = send(
        &t.app,
        admin(Method::POST, "/users", Some(json!({ "nick": "sensor-owner" }))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let user_id = user["id"].as_i64().unwrap();

    let (status, channel) = send(
        &t.app,
        admin(
            Method::POST,
            "/channels",
            Some(json!({ "user_id": user_id, "id": 55, "number_fields": 3 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(channel["id"], 55);
    let first_key = channel["write_key"].as_str().unwrap().to_string();

    let (status, _) = send(
        &t.app,
        admin(
            Method::POST,
            "/channels",
            Some(json!({ "user_id": user_id, "id": 55, "number_fields": 3 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &t.app,
        admin(
            Method::POST,
            "/channels",
            Some(json!({ "user_id": user_id, "number_fields": 9 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &t.app,
        admin(
            Method::POST,
            "/channels",
            Some(json!({ "user_id": 4242, "number_fields": 1 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, rotated) = send(&t.app, admin(Method::POST, "/channels/55/write_key", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(rotated["write_key"].as_str().unwrap(), first_key);

    let (status, _) = send(&t.app, form_upload(55, Some(&first_key), "field1=1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&t.app, admin(Method::DELETE, "/channels/55", None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&t.app, admin(Method::DELETE, "/channels/55", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn set_encoding_accepts_known_names_only() {
    let t = test_app(ParsePolicy::Lenient, Some(ADMIN_TOKEN));

    let (status, body) = send(
        &t.app,
        admin(Method::PUT, "/channels/1234/fields/2", Some(json!({ "encoding": "float" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["encoding"], "float");

    let (status, body) = send(
        &t.app,
        admin(Method::PUT, "/channels/1234/fields/2", Some(json!({ "encoding": "asdf" }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("boolean, int, float"));

    let (status, _) = send(
        &t.app,
        admin(Method::PUT, "/channels/1234/fields/3", Some(json!({ "encoding": "int" }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &t.app,
        admin(Method::PUT, "/channels/77/fields/1", Some(json!({ "encoding": "int" }))),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn records_listing_reports_decode_errors_per_field() {
    let t = test_app(ParsePolicy::Lenient, Some(ADMIN_TOKEN));
    t.db.set_field_encoding(1234, 1, &Encoding::Float).unwrap();
    t.db.set_field_encoding(1234, 2, &Encoding::from("asdf")).unwrap();

    let (status, _) = send(
        &t.app,
        form_upload(1234, Some(&key_of(&t)), "field1=1.25&field2=3.141592"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&t.app, admin(Method::GET, "/channels/1234/records", None)).await;
    assert_eq!(status, StatusCode::OK);
    let fields = &body[0]["fields"];
    assert_eq!(fields[0]["field_no"], 1);
    assert_eq!(fields[0]["value"], 1.25);
    assert!(fields[0].get("error").is_none());
    assert_eq!(fields[1]["raw"], "3.141592");
    assert_eq!(fields[1]["error"]["kind"], "unsupported_encoding");
    assert!(fields[1].get("value").is_none());
}

#[tokio::test]
async fn single_field_read_is_strict() {
    let t = test_app(ParsePolicy::Lenient, Some(ADMIN_TOKEN));
    t.db.set_field_encoding(1234, 1, &Encoding::Int).unwrap();
    t.db.set_field_encoding(1234, 2, &Encoding::Float).unwrap();

    let (_, upload) = send(
        &t.app,
        form_upload(1234, Some(&key_of(&t)), "field1=12&field2=asdf"),
    )
    .await;
    let record_id = upload["record_id"].as_i64().unwrap();

    let uri = format!("/channels/1234/records/{}/fields/1", record_id);
    let (status, body) = send(&t.app, admin(Method::GET, &uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["value"], 12);

    let uri = format!("/channels/1234/records/{}/fields/2", record_id);
    let (status, _) = send(&t.app, admin(Method::GET, &uri, None)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    t.db.set_field_encoding(1234, 1, &Encoding::from("mystery")).unwrap();
    let uri = format!("/channels/1234/records/{}/fields/1", record_id);
    let (status, _) = send(&t.app, admin(Method::GET, &uri, None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn health_is_public() {
    let t = test_app(ParsePolicy::Lenient, None);
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&t.app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
