use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use uuid::Uuid;
use crate::domain::aggregates::Order;
use crate::service::{
    Actor, CancelOrderCommand, CheckoutCommand, ReturnDecisionCommand, ReturnOrderCommand, ShippingStatusCommand,
    TrackingCommand, UpdateStatusCommand, VerifyPaymentCommand,
};
use crate::LifecycleError;
use super::extract::{Json as Body, Path};
use super::AppState;

type ApiResult<T> = Result<T, LifecycleError>;

fn order_body(order: Order) -> Json<Value> { Json(json!({"success": true, "order": order})) }

pub async fn health() -> Json<Value> {
    Json(json!({"status": "healthy", "service": "kurta-orders"}))
}

pub async fn create_order(State(s): State<AppState>, actor: Actor, Body(cmd): Body<CheckoutCommand>) -> ApiResult<(StatusCode, Json<Value>)> {
    let outcome = s.lifecycle.checkout(&actor, cmd).await?;
    let body = match outcome.gateway_order {
        Some(gateway_order) => json!({
            "success": true, "order": outcome.order, "gateway_order": gateway_order, "key_id": s.razorpay_key_id,
        }),
        None => json!({"success": true, "order": outcome.order}),
    };
    Ok((StatusCode::CREATED, Json(body)))
}

pub async fn my_orders(State(s): State<AppState>, actor: Actor) -> ApiResult<Json<Value>> {
    let orders = s.lifecycle.list_orders_for(&actor).await?;
    Ok(Json(json!({"success": true, "orders": orders})))
}

pub async fn get_order(State(s): State<AppState>, actor: Actor, Path(id): Path<Uuid>) -> ApiResult<Json<Value>> {
    Ok(order_body(s.lifecycle.get_order(&actor, id).await?))
}

pub async fn verify_payment(State(s): State<AppState>, actor: Actor, Path(id): Path<Uuid>, Body(cmd): Body<VerifyPaymentCommand>) -> ApiResult<Json<Value>> {
    Ok(order_body(s.lifecycle.verify_payment(&actor, id, cmd).await?))
}

pub async fn cancel_order(State(s): State<AppState>, actor: Actor, Path(id): Path<Uuid>, Body(cmd): Body<CancelOrderCommand>) -> ApiResult<Json<Value>> {
    Ok(order_body(s.lifecycle.cancel_order(&actor, id, cmd).await?))
}

pub async fn request_return(State(s): State<AppState>, actor: Actor, Path(id): Path<Uuid>, Body(cmd): Body<ReturnOrderCommand>) -> ApiResult<Json<Value>> {
    Ok(order_body(s.lifecycle.request_return(&actor, id, cmd).await?))
}

pub async fn all_orders(State(s): State<AppState>, actor: Actor) -> ApiResult<Json<Value>> {
    let orders = s.lifecycle.list_all_orders(&actor).await?;
    Ok(Json(json!({"success": true, "orders": orders})))
}

pub async fn update_status(State(s): State<AppState>, actor: Actor, Path(id): Path<Uuid>, Body(cmd): Body<UpdateStatusCommand>) -> ApiResult<Json<Value>> {
    Ok(order_body(s.lifecycle.update_status(&actor, id, cmd).await?))
}

pub async fn update_shipping_status(State(s): State<AppState>, actor: Actor, Path(id): Path<Uuid>, Body(cmd): Body<ShippingStatusCommand>) -> ApiResult<Json<Value>> {
    Ok(order_body(s.lifecycle.update_shipping_status(&actor, id, cmd).await?))
}

pub async fn set_tracking(State(s): State<AppState>, actor: Actor, Path(id): Path<Uuid>, Body(cmd): Body<TrackingCommand>) -> ApiResult<Json<Value>> {
    Ok(order_body(s.lifecycle.set_tracking_number(&actor, id, cmd).await?))
}

pub async fn decide_return(State(s): State<AppState>, actor: Actor, Path(id): Path<Uuid>, Body(cmd): Body<ReturnDecisionCommand>) -> ApiResult<Json<Value>> {
    Ok(order_body(s.lifecycle.decide_return(&actor, id, cmd).await?))
}

pub async fn complete_pickup(State(s): State<AppState>, actor: Actor, Path(id): Path<Uuid>) -> ApiResult<Json<Value>> {
    Ok(order_body(s.lifecycle.complete_return_pickup(&actor, id).await?))
}

pub async fn refund(State(s): State<AppState>, actor: Actor, Path(id): Path<Uuid>) -> ApiResult<Json<Value>> {
    Ok(order_body(s.lifecycle.refund_order(&actor, id).await?))
}
