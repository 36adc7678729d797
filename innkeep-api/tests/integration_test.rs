use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use innkeep_api::{app, AppState};
use innkeep_catalog::{PricingConfig, PricingEngine};
use innkeep_core::payment::signature_header;
use innkeep_core::{BookingNotifier, BookingView, RoomId, RoomType};
use innkeep_notify::TextReceiptRenderer;
use innkeep_reservation::{MockPaymentGateway, PaymentOrchestrator, ReservationEngine};
use innkeep_store::MemoryStore;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const WEBHOOK_SECRET: &str = "whsec_test";

#[derive(Default)]
struct RecordingNotifier(Mutex<Vec<String>>);

impl BookingNotifier for RecordingNotifier {
    fn booking_committed(&self, view: BookingView) {
        self.0.lock().unwrap().push(view.booking.booking_ref);
    }
}

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    notifier: Arc<RecordingNotifier>,
}

async fn test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let branch = store.add_branch("Luxe Goa", "GA").await;
    store.add_room(branch.id, "101", RoomType::Standard).await;
    store.add_room(branch.id, "102", RoomType::Standard).await;
    store.add_room_with_id(RoomId(7), branch.id, "204", RoomType::Deluxe).await;
    store.set_price(RoomType::Standard, 200_000, "inr").await;
    store.set_price(RoomType::Deluxe, 350_000, "inr").await;

    let notifier = Arc::new(RecordingNotifier::default());
    let pricing = PricingEngine::new(store.clone(), PricingConfig::default());
    let engine = Arc::new(ReservationEngine::new(store.clone(), store.clone(), pricing, notifier.clone()));
    let payments = Arc::new(
        PaymentOrchestrator::new(Arc::new(MockPaymentGateway::new()), engine.clone(), WEBHOOK_SECRET, 300).unwrap(),
    );

    let router = app(AppState {
        engine,
        payments,
        receipts: Arc::new(TextReceiptRenderer::new("inr")),
        hotel_name: "Luxe Hotels".to_string(),
    });
    TestApp { router, store, notifier }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = send(router, Request::get(uri).body(Body::empty()).unwrap()).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn post_json(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, body) = send(router, request).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn standard_booking() -> Value {
    json!({
        "customerName": "Asha Rao",
        "phoneNumber": "9876543210",
        "email": "asha@example.com",
        "branchId": 1,
        "roomType": "standard",
        "checkInDate": "2024-01-01",
        "checkOutDate": "2024-01-03"
    })
}

const AVAILABILITY_URI: &str =
    "/api/availability?branchId=1&roomType=STANDARD&checkIn=2024-01-01&checkOut=2024-01-03";

#[tokio::test]
async fn test_ping() {
    let t = test_app().await;
    let (status, body) = send(&t.router, Request::get("/api/ping").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"pong");
}

#[tokio::test]
async fn test_direct_booking_until_sold_out() {
    let t = test_app().await;

    let (status, body) = post_json(&t.router, "/api/bookings", standard_booking()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["bookingId"].as_str().is_some());

    let (_, availability) = get_json(&t.router, AVAILABILITY_URI).await;
    assert_eq!(availability, json!({ "available": true, "totalRooms": 2, "bookedRooms": 1 }));

    let (status, _) = post_json(&t.router, "/api/bookings", standard_booking()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = post_json(&t.router, "/api/bookings", standard_booking()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().is_some());

    let (_, availability) = get_json(&t.router, AVAILABILITY_URI).await;
    assert_eq!(availability["available"], json!(false));
    assert_eq!(availability["bookedRooms"], json!(2));
    assert_eq!(availability["message"], json!("Not available, consider changing filters"));

    let (_, rooms) = get_json(
        &t.router,
        "/api/rooms/available?branchId=1&roomType=STANDARD&checkIn=2024-01-02&checkOut=2024-01-05",
    )
    .await;
    assert_eq!(rooms, json!([]));
}

#[tokio::test]
async fn test_booking_validation_errors() {
    let t = test_app().await;

    let mut bad_email = standard_booking();
    bad_email["email"] = json!("asha-at-example");
    let (status, _) = post_json(&t.router, "/api/bookings", bad_email).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut bad_type = standard_booking();
    bad_type["roomType"] = json!("PENTHOUSE");
    let (status, body) = post_json(&t.router, "/api/bookings", bad_type).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Invalid room type"));

    let mut backwards = standard_booking();
    backwards["checkOutDate"] = json!("2023-12-30");
    let (status, _) = post_json(&t.router, "/api/bookings", backwards).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(t.store.bookings().await.is_empty());
}

#[tokio::test]
async fn test_malformed_bodies_and_queries_return_json_errors() {
    let t = test_app().await;

    let mut no_email = standard_booking();
    no_email.as_object_mut().unwrap().remove("email");
    let (status, body) = post_json(&t.router, "/api/bookings", no_email).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("email"));

    let mut bad_date = standard_booking();
    bad_date["checkInDate"] = json!("01/01/2024");
    let (status, body) = post_json(&t.router, "/api/bookings", bad_date).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let request = Request::post("/api/bookings")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, raw) = send(&t.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&raw).unwrap();
    assert!(body["error"].is_string());

    let (status, body) = post_json(&t.router, "/api/payments/sessions", json!({ "roomId": 101 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = get_json(
        &t.router,
        "/api/availability?branchId=1&roomType=STANDARD&checkIn=tomorrow&checkOut=2024-01-03",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Validation failed"));

    let (status, body) = get_json(&t.router, "/api/rooms/available?branchId=1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    assert!(t.store.bookings().await.is_empty());
}

#[tokio::test]
async fn test_summary_receipt_and_cancel() {
    let t = test_app().await;
    let (_, created) = post_json(&t.router, "/api/bookings", standard_booking()).await;
    let id = created["bookingId"].as_str().unwrap().to_string();

    let (status, summary) = get_json(&t.router, &format!("/api/bookings/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["bookingId"], json!(id));
    assert_eq!(summary["branchName"], json!("Luxe Goa"));
    assert_eq!(summary["roomNumber"], json!("101"));
    assert_eq!(summary["price"], json!(400_000));
    assert_eq!(summary["status"], json!("ACTIVE"));

    let response = t
        .router
        .clone()
        .oneshot(Request::get(format!("/api/bookings/{}/receipt", id)).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        format!("attachment; filename=receipt_{}.txt", id).as_str()
    );

    let cancel = || Request::post(format!("/api/bookings/{}/cancel", id)).body(Body::empty()).unwrap();
    let (status, _) = send(&t.router, cancel()).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&t.router, cancel()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get_json(&t.router, "/api/bookings/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

fn signed_webhook(payload: &Value, secret: &str) -> Request<Body> {
    let body = payload.to_string();
    let signature = signature_header(body.as_bytes(), secret, chrono::Utc::now().timestamp()).unwrap();
    Request::post("/api/payments/webhook")
        .header("Stripe-Signature", signature)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_payment_session_then_duplicate_webhook_books_once() {
    let t = test_app().await;

    let (status, session) = post_json(
        &t.router,
        "/api/payments/sessions",
        json!({
            "customerName": "Asha Rao",
            "phoneNumber": "9876543210",
            "email": "asha@example.com",
            "roomId": 7,
            "checkInDate": "2024-02-01",
            "checkOutDate": "2024-02-04"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["quote"]["priceMinor"], json!(1_050_000));
    assert_eq!(session["amountDue"]["totalMinor"], json!(1_050_000 + 189_000 + 25_000));
    assert!(session.get("bookingId").is_none());
    assert!(t.store.bookings().await.is_empty());

    let session_id = session["sessionId"].as_str().unwrap().to_string();
    let (status, _) = get_json(&t.router, &format!("/api/payments/sessions/{}/booking", session_id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let event = json!({
        "id": "evt_1",
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": session_id,
            "metadata": {
                "customerName": "Asha Rao",
                "phoneNumber": "9876543210",
                "email": "asha@example.com",
                "roomId": "7",
                "checkInDate": "2024-02-01",
                "checkOutDate": "2024-02-04"
            }
        } }
    });

    let (status, first) = send(&t.router, signed_webhook(&event, WEBHOOK_SECRET)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, second) = send(&t.router, signed_webhook(&event, WEBHOOK_SECRET)).await;
    assert_eq!(status, StatusCode::OK);

    let first: Value = serde_json::from_slice(&first).unwrap();
    let second: Value = serde_json::from_slice(&second).unwrap();
    assert!(first["bookingId"].as_str().is_some());
    assert_eq!(first["bookingId"], second["bookingId"]);
    assert_eq!(t.store.bookings().await.len(), 1);
    assert_eq!(t.notifier.0.lock().unwrap().len(), 1);

    let (status, booking) = get_json(&t.router, &format!("/api/payments/sessions/{}/booking", session_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(booking["bookingId"], first["bookingId"]);
    assert_eq!(booking["roomNumber"], json!("204"));
}

#[tokio::test]
async fn test_webhook_rejects_bad_signatures_and_ignores_other_events() {
    let t = test_app().await;
    let event = json!({
        "id": "evt_2",
        "type": "checkout.session.completed",
        "data": { "object": { "id": "cs_forged", "metadata": { "roomId": "7" } } }
    });

    let (status, _) = send(&t.router, signed_webhook(&event, "whsec_wrong")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let unsigned = Request::post("/api/payments/webhook").body(Body::from(event.to_string())).unwrap();
    let (status, _) = send(&t.router, unsigned).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let other = json!({
        "id": "evt_3",
        "type": "charge.refunded",
        "data": { "object": { "id": "ch_1" } }
    });
    let (status, body) = send(&t.router, signed_webhook(&other, WEBHOOK_SECRET)).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({ "received": true }));

    assert!(t.store.bookings().await.is_empty());
}

#[tokio::test]
async fn test_prices_listed_cheapest_first() {
    let t = test_app().await;
    let (status, prices) = get_json(&t.router, "/api/prices").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(prices[0]["roomType"], json!("STANDARD"));
    assert_eq!(prices[0]["nightlyRateMinor"], json!(200_000));
    assert_eq!(prices[1]["roomType"], json!("DELUXE"));
}
