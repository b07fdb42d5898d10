//! Order endpoints. All of them act on the authenticated customer's orders
//! only; someone else's order id answers 404.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use eshop_core::gateway::InitializeData;
use eshop_core::{NewOrder, OrderSnapshot};
use eshop_payments::Placement;

use crate::auth::Customer;
use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/orders", post(create_order).get(list_orders))
        .route("/api/orders/{order_id}", get(get_order))
        .route("/api/orders/{order_id}/payments", post(retry_payment))
}

#[derive(Debug, Serialize)]
struct OrderCreated {
    order_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_data: Option<InitializeData>,
}

/// `POST /api/orders`
async fn create_order(
    State(state): State<AppState>,
    customer: Customer,
    payload: Result<Json<NewOrder>, JsonRejection>,
) -> Result<ApiResponse<OrderCreated>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let placement = state
        .checkout
        .place_order(&customer.id, &customer.email, &request, state.order_numbers.as_ref())
        .await?;

    Ok(match placement {
        Placement::NoPaymentRequired { order } => ApiResponse::created(
            OrderCreated {
                order_id: order.order.id,
                payment_data: None,
            },
            "NoPaymentRequired: Order created successfully",
        ),
        Placement::AwaitingPayment { order, payment } => ApiResponse::created(
            OrderCreated {
                order_id: order.order.id,
                payment_data: Some(payment),
            },
            "Order created successfully.",
        ),
    })
}

/// `GET /api/orders`
async fn list_orders(
    State(state): State<AppState>,
    customer: Customer,
) -> Result<ApiResponse<Vec<OrderSnapshot>>, ApiError> {
    let orders = state.db.orders().list_for_customer(&customer.id).await?;
    Ok(ApiResponse::ok(orders, "Orders retrieved successfully."))
}

/// `GET /api/orders/{order_id}`
async fn get_order(
    State(state): State<AppState>,
    customer: Customer,
    Path(order_id): Path<String>,
) -> Result<ApiResponse<OrderSnapshot>, ApiError> {
    let order = state
        .db
        .orders()
        .get_for_customer(&customer.id, &order_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;
    Ok(ApiResponse::ok(order, "Order retrieved successfully."))
}

/// `POST /api/orders/{order_id}/payments`
async fn retry_payment(
    State(state): State<AppState>,
    customer: Customer,
    Path(order_id): Path<String>,
) -> Result<ApiResponse<OrderCreated>, ApiError> {
    let payment = state
        .checkout
        .retry_payment(&customer.id, &customer.email, &order_id)
        .await?;
    Ok(ApiResponse::created(
        OrderCreated {
            order_id,
            payment_data: Some(payment),
        },
        "Payment initialized successfully.",
    ))
}

#[cfg(test)]
mod tests {
    use crate::test_support::{app, bearer, order_body, product, send};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::Value;

    fn post_json(uri: &str, token: &str, body: &Value) -> Request<Body> {
        Request::post(uri)
            .header(header::AUTHORIZATION, token)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str, token: &str) -> Request<Body> {
        Request::get(uri)
            .header(header::AUTHORIZATION, token)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_order_starts_payment() {
        let app = app().await;
        let p = product(&app.db, 5, 2, 150_000).await;

        let (status, json) =
            send(&app.router, post_json("/api/orders", &bearer("cust-1"), &order_body(&p, 3))).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["status"], 201);
        assert_eq!(json["message"], "Order created successfully.");
        let reference = json["data"]["payment_data"]["reference"].as_str().unwrap();
        assert!(reference.starts_with("ref_"));

        let order_id = json["data"]["order_id"].as_str().unwrap();
        let stored = app.db.orders().get_by_id(order_id).await.unwrap().unwrap();
        assert_eq!(stored.customer_id, "cust-1");
        assert_eq!(stored.total_quantity, 3);
        let stock = app.db.products().get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(stock.stock_quantity, 2);
    }

    #[tokio::test]
    async fn test_free_order_needs_no_payment() {
        let app = app().await;
        let p = product(&app.db, 5, 1, 0).await;

        let (status, json) =
            send(&app.router, post_json("/api/orders", &bearer("cust-1"), &order_body(&p, 1))).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["message"], "NoPaymentRequired: Order created successfully");
        assert!(json["data"]["order_id"].is_string());
        assert!(json["data"].get("payment_data").is_none());
    }

    #[tokio::test]
    async fn test_validation_error_names_the_field() {
        let app = app().await;
        let p = product(&app.db, 5, 2, 1_000).await;

        let (status, json) =
            send(&app.router, post_json("/api/orders", &bearer("cust-1"), &order_body(&p, 1))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(
            json["errors"]["items[0].quantity"][0],
            "Min order quantity (MOQ) for this product is 2"
        );
        assert!(app.db.orders().list_for_customer("cust-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let app = app().await;
        let body = serde_json::json!({ "items": "nope" });

        let (status, json) = send(&app.router, post_json("/api/orders", &bearer("cust-1"), &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn test_requires_bearer_token() {
        let app = app().await;

        let request = Request::get("/api/orders").body(Body::empty()).unwrap();
        let (status, json) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["code"], "UNAUTHORIZED");

        let (status, _) = send(&app.router, get("/api/orders", "Bearer not.a.jwt")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_orders_are_scoped_to_customer() {
        let app = app().await;
        let p = product(&app.db, 10, 1, 1_000).await;

        let (_, created) =
            send(&app.router, post_json("/api/orders", &bearer("cust-1"), &order_body(&p, 2))).await;
        let order_id = created["data"]["order_id"].as_str().unwrap().to_string();

        let (status, json) = send(&app.router, get("/api/orders", &bearer("cust-1"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Orders retrieved successfully.");
        assert_eq!(json["data"].as_array().unwrap().len(), 1);

        let (status, json) = send(&app.router, get(&format!("/api/orders/{order_id}"), &bearer("cust-1"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["id"], order_id.as_str());
        assert_eq!(json["data"]["total_amount"], 2_000);
        assert_eq!(json["data"]["payment_status"], "pending");

        let (_, json) = send(&app.router, get("/api/orders", &bearer("cust-2"))).await;
        assert!(json["data"].as_array().unwrap().is_empty());

        let (status, _) = send(&app.router, get(&format!("/api/orders/{order_id}"), &bearer("cust-2"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_retry_payment_opens_new_attempt() {
        let app = app().await;
        let p = product(&app.db, 10, 1, 1_000).await;

        let (_, created) =
            send(&app.router, post_json("/api/orders", &bearer("cust-1"), &order_body(&p, 1))).await;
        let order_id = created["data"]["order_id"].as_str().unwrap().to_string();
        let reference = created["data"]["payment_data"]["reference"].as_str().unwrap().to_string();

        let uri = format!("/api/orders/{order_id}/payments");
        let (status, json) = send(&app.router, post_json(&uri, &bearer("cust-1"), &Value::Null)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_ne!(json["data"]["payment_data"]["reference"], reference.as_str());

        app.db.payments().apply_gateway_success(&reference).await.unwrap();
        let (_, snapshot) = send(&app.router, get(&format!("/api/orders/{order_id}"), &bearer("cust-1"))).await;
        assert_eq!(snapshot["data"]["payment_status"], "pending");

        let (status, _) = send(&app.router, post_json(&uri, &bearer("cust-2"), &Value::Null)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
