//! # Routes
//!
//! ```text
//! GET    /health
//! POST   /invoices                      create
//! GET    /invoices                      list (filters in query string)
//! GET    /invoices/statistics
//! GET    /invoices/revenue?start_date=&end_date=
//! GET    /invoices/number/{invoice_number}
//! GET    /invoices/order/{order_id}
//! GET    /invoices/{id}
//! PUT    /invoices/{id}                 partial update (pending only)
//! DELETE /invoices/{id}                 pending only
//! PATCH  /invoices/{id}/promotion       { promotion_id }
//! PATCH  /invoices/{id}/paid            { payment_method, promotion_id? }
//! PATCH  /invoices/{id}/cancel
//! ```

pub mod health;
pub mod invoices;

use axum::{
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;

use crate::error::ApiResponse;
use crate::state::AppState;

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/invoices",
            post(invoices::create_invoice).get(invoices::list_invoices),
        )
        .route("/invoices/statistics", get(invoices::statistics))
        .route("/invoices/revenue", get(invoices::revenue))
        .route("/invoices/number/{invoice_number}", get(invoices::get_by_number))
        .route("/invoices/order/{order_id}", get(invoices::get_by_order))
        .route(
            "/invoices/{id}",
            get(invoices::get_invoice)
                .put(invoices::update_invoice)
                .delete(invoices::delete_invoice),
        )
        .route("/invoices/{id}/promotion", patch(invoices::apply_promotion))
        .route("/invoices/{id}/paid", patch(invoices::mark_as_paid))
        .route("/invoices/{id}/cancel", patch(invoices::cancel_invoice))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> (StatusCode, Json<ApiResponse<()>>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse {
            success: false,
            data: None,
            message: "Route not found".to_string(),
            code: "NOT_FOUND".to_string(),
        }),
    )
}

// =============================================================================
// Router Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use chrono::Utc;
    use serde_json::{json, Value};
    use tavola_core::{Customer, Order, StaffUser, TaxRate, UserRole};
    use tavola_db::{Database, DbConfig};
    use tower::ServiceExt;

    async fn app() -> Router {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();

        db.staff()
            .insert(&StaffUser {
                id: "cashier".to_string(),
                full_name: "Front Desk".to_string(),
                role: UserRole::Cashier,
                is_active: true,
            })
            .await
            .unwrap();
        db.customers()
            .insert(&Customer {
                id: "c-1".to_string(),
                name: "Regular".to_string(),
                phone: None,
                points: 20,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        for id in ["o-1", "o-2"] {
            db.orders()
                .insert(&Order {
                    id: id.to_string(),
                    customer_id: Some("c-1".to_string()),
                    table_id: Some("T4".to_string()),
                    status: "served".to_string(),
                    created_at: now,
                })
                .await
                .unwrap();
        }

        router(AppState::new(db, TaxRate::from_percentage(10.0)))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn create_body(order_id: &str) -> Value {
        json!({
            "order_id": order_id,
            "staff_id": "cashier",
            "subtotal_cents": 10_000_000,
            "payment_method": "cash",
            "points_used": 5
        })
    }

    #[tokio::test]
    async fn test_health() {
        let app = app().await;
        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["database"], true);
    }

    #[tokio::test]
    async fn test_invoice_lifecycle() {
        let app = app().await;

        let (status, body) = send(&app, Method::POST, "/invoices", Some(create_body("o-1"))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        // default tax rate from state
        assert_eq!(body["data"]["tax_cents"], 1_000_000);
        assert_eq!(body["data"]["total_cents"], 11_000_000);
        assert_eq!(body["data"]["points_earned"], 11);
        let id = body["data"]["id"].as_str().unwrap().to_string();
        let number = body["data"]["invoice_number"].as_str().unwrap().to_string();
        assert!(number.starts_with("INV-"));

        let (status, body) = send(&app, Method::GET, &format!("/invoices/number/{number}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], id.as_str());

        let (status, body) = send(&app, Method::GET, "/invoices/order/o-1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], id.as_str());

        let (status, body) = send(
            &app,
            Method::PATCH,
            &format!("/invoices/{id}/paid"),
            Some(json!({ "payment_method": "e-wallet" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["invoice"]["payment_status"], "paid");
        assert_eq!(body["data"]["invoice"]["payment_method"], "e-wallet");
        assert_eq!(body["data"]["soft_failures"], json!([]));

        let (status, body) = send(
            &app,
            Method::PATCH,
            &format!("/invoices/{id}/paid"),
            Some(json!({ "payment_method": "cash" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_STATE_TRANSITION");

        let (status, _) = send(&app, Method::PATCH, &format!("/invoices/{id}/cancel"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::DELETE, &format!("/invoices/{id}"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, Method::GET, "/invoices/statistics", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["paid_count"], 1);
        assert_eq!(body["data"]["total_revenue_cents"], 11_000_000);
    }

    #[tokio::test]
    async fn test_create_errors() {
        let app = app().await;

        let (status, body) = send(&app, Method::POST, "/invoices", Some(create_body("ghost"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");

        let (status, _) = send(&app, Method::POST, "/invoices", Some(create_body("o-1"))).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = send(&app, Method::POST, "/invoices", Some(create_body("o-1"))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);

        let mut greedy = create_body("o-2");
        greedy["points_used"] = json!(500);
        let (status, body) = send(&app, Method::POST, "/invoices", Some(greedy)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INSUFFICIENT_BALANCE");
        assert_eq!(body["message"], "Customer has only 20 points, requested 500");

        let (status, body) = send(
            &app,
            Method::POST,
            "/invoices",
            Some(json!({ "order_id": "o-2" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_update_cancel_delete() {
        let app = app().await;
        let (_, body) = send(&app, Method::POST, "/invoices", Some(create_body("o-1"))).await;
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            Method::PUT,
            &format!("/invoices/{id}"),
            Some(json!({ "discount_cents": 1_000_000, "notes": "birthday" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_cents"], 10_000_000);
        assert_eq!(body["data"]["notes"], "birthday");

        let (status, body) = send(&app, Method::PATCH, &format!("/invoices/{id}/cancel"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["payment_status"], "cancelled");

        let (_, body) = send(&app, Method::POST, "/invoices", Some(create_body("o-2"))).await;
        let second = body["data"]["id"].as_str().unwrap().to_string();
        let (status, _) = send(&app, Method::DELETE, &format!("/invoices/{second}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, Method::GET, &format!("/invoices/{second}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_apply_unknown_promotion() {
        let app = app().await;
        let (_, body) = send(&app, Method::POST, "/invoices", Some(create_body("o-1"))).await;
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, _) = send(
            &app,
            Method::PATCH,
            &format!("/invoices/{id}/promotion"),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            Method::PATCH,
            &format!("/invoices/{id}/promotion"),
            Some(json!({ "promotion_id": "nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Promotion not found: nope");
    }

    #[tokio::test]
    async fn test_listing_and_revenue() {
        let app = app().await;
        send(&app, Method::POST, "/invoices", Some(create_body("o-1"))).await;
        send(&app, Method::POST, "/invoices", Some(create_body("o-2"))).await;

        let (status, body) = send(&app, Method::GET, "/invoices?payment_status=pending", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);

        let (status, body) = send(&app, Method::GET, "/invoices?payment_status=void", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (status, _) = send(&app, Method::GET, "/invoices/revenue?start_date=2026-01-01", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let today = Utc::now().date_naive();
        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/invoices/revenue?start_date={today}&end_date={today}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        // nothing paid yet
        assert_eq!(body["data"], json!([]));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = app().await;
        let (status, body) = send(&app, Method::GET, "/receipts", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }
}
