//! HTTP surface
//!
//! Thin axum layer over [`OrderLifecycleManager`]. Every response carries a
//! `success` flag; failures add a `message`.

mod auth;
mod extract;
mod handlers;

pub use auth::{USER_EMAIL, USER_ID, USER_NAME, USER_ROLE};

use std::sync::Arc;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::error;
use crate::{LifecycleError, OrderError, OrderLifecycleManager};

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<OrderLifecycleManager>,
    pub razorpay_key_id: String,
}

impl AppState {
    pub fn new(lifecycle: OrderLifecycleManager, razorpay_key_id: impl Into<String>) -> Self {
        Self { lifecycle: Arc::new(lifecycle), razorpay_key_id: razorpay_key_id.into() }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v1/orders", post(handlers::create_order))
        .route("/api/v1/orders/mine", get(handlers::my_orders))
        .route("/api/v1/orders/:id", get(handlers::get_order))
        .route("/api/v1/orders/:id/verify-payment", post(handlers::verify_payment))
        .route("/api/v1/orders/:id/cancel", post(handlers::cancel_order))
        .route("/api/v1/orders/:id/return", post(handlers::request_return))
        .route("/api/v1/admin/orders", get(handlers::all_orders))
        .route("/api/v1/admin/orders/:id/status", put(handlers::update_status))
        .route("/api/v1/admin/orders/:id/shipping-status", put(handlers::update_shipping_status))
        .route("/api/v1/admin/orders/:id/tracking", put(handlers::set_tracking))
        .route("/api/v1/admin/orders/:id/return-decision", put(handlers::decide_return))
        .route("/api/v1/admin/orders/:id/return-pickup", post(handlers::complete_pickup))
        .route("/api/v1/admin/orders/:id/refund", post(handlers::refund))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

impl LifecycleError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            LifecycleError::OrderNotFound(_) => StatusCode::NOT_FOUND,
            LifecycleError::Forbidden | LifecycleError::Order(OrderError::NotOwner) => StatusCode::FORBIDDEN,
            LifecycleError::EmptyCart
            | LifecycleError::InsufficientStock { .. }
            | LifecycleError::InvalidSignature
            | LifecycleError::Validation(_) => StatusCode::BAD_REQUEST,
            LifecycleError::Order(_) => StatusCode::CONFLICT,
            LifecycleError::Gateway(_) => StatusCode::BAD_GATEWAY,
            LifecycleError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for LifecycleError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            LifecycleError::Storage(e) => {
                error!(error = %e, "storage failure");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({"success": false, "message": message}))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;
    use crate::domain::aggregates::{Cart, Product};
    use crate::domain::value_objects::{Money, Quantity};
    use crate::gateway::{GatewayError, GatewayOrder, GatewayRefund, PaymentGateway, SignatureVerifier};
    use crate::notify::TracingNotifier;
    use crate::service::LifecyclePolicy;
    use crate::store::{MemoryCarts, MemoryCatalog, MemoryOrders};

    struct OfflineGateway;

    #[async_trait]
    impl PaymentGateway for OfflineGateway {
        async fn create_order(&self, _: &Money, _: &str) -> Result<GatewayOrder, GatewayError> {
            Err(GatewayError::Unavailable("offline".into()))
        }

        async fn refund(&self, _: &str, _: &Money) -> Result<GatewayRefund, GatewayError> {
            Err(GatewayError::Unavailable("offline".into()))
        }
    }

    async fn app_with_cart(user_id: Uuid) -> Router {
        let carts = Arc::new(MemoryCarts::new());
        let catalog = Arc::new(MemoryCatalog::new());
        let product = Product::create("Chikankari Kurta", Money::rupees(1450)).with_size("S", 4);
        carts.put(Cart::with_items(user_id, vec![product.cart_item("S", None, Quantity::new(1).unwrap())])).await;
        catalog.put(product).await;

        let manager = OrderLifecycleManager::new(
            Arc::new(MemoryOrders::new()), carts, catalog, Arc::new(OfflineGateway),
            SignatureVerifier::new("secret"), Arc::new(TracingNotifier), LifecyclePolicy::default(),
        );
        router(AppState::new(manager, "rzp_test_key"))
    }

    fn checkout_body(method: &str) -> Body {
        Body::from(json!({
            "shipping_address": {
                "full_name": "Meera Iyer",
                "phone": "9876543210",
                "address": "12 MG Road",
                "city": "Bengaluru",
                "state": "Karnataka",
                "postal_code": "560001",
                "country": "India"
            },
            "payment_method": method
        }).to_string())
    }

    fn as_user(builder: axum::http::request::Builder, user_id: Uuid, role: &str) -> axum::http::request::Builder {
        builder
            .header(USER_ID, user_id.to_string())
            .header(USER_NAME, "Meera Iyer")
            .header(USER_EMAIL, "meera@example.in")
            .header(USER_ROLE, role)
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = app_with_cart(Uuid::new_v4()).await;
        let response = app.oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_cod_checkout_returns_created_order() {
        let user = Uuid::new_v4();
        let app = app_with_cart(user).await;
        let request = as_user(Request::post("/api/v1/orders"), user, "customer")
            .header("content-type", "application/json")
            .body(checkout_body("cod"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["order"]["order_status"], "confirmed");
        assert!(body.get("gateway_order").is_none());
    }

    #[tokio::test]
    async fn test_gateway_outage_maps_to_bad_gateway() {
        let user = Uuid::new_v4();
        let app = app_with_cart(user).await;
        let request = as_user(Request::post("/api/v1/orders"), user, "customer")
            .header("content-type", "application/json")
            .body(checkout_body("razorpay"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(response).await["success"], false);
    }

    #[tokio::test]
    async fn test_missing_identity_is_unauthorized() {
        let app = app_with_cart(Uuid::new_v4()).await;
        let response = app
            .oneshot(Request::get("/api/v1/orders/mine").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_customer_cannot_use_admin_routes() {
        let user = Uuid::new_v4();
        let app = app_with_cart(user).await;
        let request = as_user(Request::put(format!("/api/v1/admin/orders/{}/status", Uuid::new_v4())), user, "customer")
            .header("content-type", "application/json")
            .body(Body::from(json!({"status": "confirmed"}).to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Admin access required");
    }

    #[tokio::test]
    async fn test_unknown_order_is_not_found() {
        let user = Uuid::new_v4();
        let app = app_with_cart(user).await;
        let request = as_user(Request::get(format!("/api/v1/orders/{}", Uuid::new_v4())), user, "customer")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_body_uses_error_envelope() {
        let user = Uuid::new_v4();
        let app = app_with_cart(user).await;
        let request = as_user(Request::post("/api/v1/orders"), user, "customer")
            .header("content-type", "application/json")
            .body(checkout_body("paypal"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("paypal"));
    }

    #[tokio::test]
    async fn test_non_uuid_order_id_uses_error_envelope() {
        let user = Uuid::new_v4();
        let app = app_with_cart(user).await;
        let request = as_user(Request::get("/api/v1/orders/not-a-uuid"), user, "customer")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["success"], false);
    }

    #[test]
    fn test_state_conflicts_map_to_409() {
        let err = LifecycleError::Order(OrderError::AlreadyDelivered);
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(LifecycleError::Order(OrderError::NotOwner).status_code(), StatusCode::FORBIDDEN);
    }
}
