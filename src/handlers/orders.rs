use std::str::FromStr;

use actix_web::{http::header, web, HttpResponse};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::application::order_service::DynOrderService;
use crate::domain::errors::DomainError;
use crate::domain::order::{Cursor, LineItem, NewOrder, Order, Page};
use crate::errors::AppError;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct LineItemRequest {
    pub item_id: String,
    pub quantity: u32,
    /// Decimal price as a string to avoid floating-point issues, e.g. "9.99"
    #[serde(default)]
    pub unit_price: Option<String>,
}

/// Body of both `POST /orders` and `PUT /orders/{id}`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderRequest {
    pub customer_id: Uuid,
    pub line_items: Vec<LineItemRequest>,
}

impl TryFrom<OrderRequest> for NewOrder {
    type Error = DomainError;

    fn try_from(body: OrderRequest) -> Result<Self, Self::Error> {
        let line_items = body
            .line_items
            .into_iter()
            .map(|item| {
                let unit_price = item
                    .unit_price
                    .as_deref()
                    .map(|raw| {
                        BigDecimal::from_str(raw).map_err(|e| {
                            DomainError::InvalidInput(format!("Invalid unit_price '{raw}': {e}"))
                        })
                    })
                    .transpose()?;
                Ok(LineItem {
                    item_id: item.item_id,
                    quantity: item.quantity,
                    unit_price,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        Ok(NewOrder {
            customer_id: body.customer_id,
            line_items,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LineItemResponse {
    pub item_id: String,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub order_id: u64,
    pub customer_id: Uuid,
    pub line_items: Vec<LineItemResponse>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.order_id,
            customer_id: order.customer_id,
            line_items: order
                .line_items
                .into_iter()
                .map(|item| LineItemResponse {
                    item_id: item.item_id,
                    quantity: item.quantity,
                    unit_price: item.unit_price.map(|price| price.to_string()),
                })
                .collect(),
            created_at: order.created_at,
        }
    }
}

// ── Pagination ───────────────────────────────────────────────────────────────

const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListOrdersParams {
    /// Cursor returned by the previous page. Defaults to 0 (start).
    #[serde(default)]
    pub offset: u64,
    /// Number of orders to scan for. Defaults to 20, maximum 100.
    #[serde(default = "default_size")]
    pub size: u64,
}

fn default_size() -> u64 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    /// Pass back as `offset` to continue; 0 means the listing is complete.
    pub cursor: u64,
}

/// Accepts only the canonical decimal form, so `+7` and `007` are rejected.
fn parse_order_id(raw: &str) -> Result<u64, AppError> {
    raw.parse::<u64>()
        .ok()
        .filter(|order_id| order_id.to_string() == raw)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid order id '{raw}'")))
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /
pub async fn index() -> HttpResponse {
    HttpResponse::Ok().finish()
}

/// GET /health
///
/// Reports whether the order store answers.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Store reachable"),
        (status = 503, description = "Store unreachable"),
    ),
    tag = "health"
)]
pub async fn health(service: web::Data<DynOrderService>) -> Result<HttpResponse, AppError> {
    web::block(move || service.health())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(json!({ "status": "ok" })))
}

/// POST /orders
///
/// Creates an order with a freshly assigned identifier and creation time.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = OrderRequest,
    responses(
        (status = 201, description = "Order created successfully", body = OrderResponse),
        (status = 400, description = "Malformed body or unit price"),
        (status = 409, description = "Identifier collision"),
        (status = 500, description = "Internal server error"),
        (status = 503, description = "Order store unavailable"),
    ),
    tag = "orders"
)]
pub async fn create_order(
    service: web::Data<DynOrderService>,
    body: web::Json<OrderRequest>,
) -> Result<HttpResponse, AppError> {
    let new_order = NewOrder::try_from(body.into_inner())?;

    let order = web::block(move || service.create_order(new_order))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, format!("/orders/{}", order.order_id)))
        .json(OrderResponse::from(order)))
}

/// GET /orders
///
/// Returns one page of orders and the cursor to fetch the next one.
/// Listing is not a snapshot: orders created or deleted while paging may be
/// missed or returned twice.
#[utoipa::path(
    get,
    path = "/orders",
    params(ListOrdersParams),
    responses(
        (status = 200, description = "One page of orders", body = ListOrdersResponse),
        (status = 500, description = "Internal server error"),
        (status = 503, description = "Order store unavailable"),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    service: web::Data<DynOrderService>,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = Page {
        offset: Cursor::new(params.offset),
        size: params.size.clamp(1, MAX_PAGE_SIZE),
    };

    let result = web::block(move || service.list_orders(page))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ListOrdersResponse {
        items: result.orders.into_iter().map(OrderResponse::from).collect(),
        cursor: result.cursor.position(),
    }))
}

/// GET /orders/{id}
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = String, Path, description = "Order identifier (unsigned 64-bit integer)"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 400, description = "Malformed order id"),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
        (status = 503, description = "Order store unavailable"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    service: web::Data<DynOrderService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let order_id = parse_order_id(&path.into_inner())?;

    let order = web::block(move || service.get_order(order_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// PUT /orders/{id}
///
/// Replaces the customer and line items of an existing order. Never creates.
#[utoipa::path(
    put,
    path = "/orders/{id}",
    request_body = OrderRequest,
    params(
        ("id" = String, Path, description = "Order identifier (unsigned 64-bit integer)"),
    ),
    responses(
        (status = 200, description = "Order updated", body = OrderResponse),
        (status = 400, description = "Malformed order id, body or unit price"),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
        (status = 503, description = "Order store unavailable"),
    ),
    tag = "orders"
)]
pub async fn update_order(
    service: web::Data<DynOrderService>,
    path: web::Path<String>,
    body: web::Json<OrderRequest>,
) -> Result<HttpResponse, AppError> {
    let order_id = parse_order_id(&path.into_inner())?;
    let changes = NewOrder::try_from(body.into_inner())?;

    let order = web::block(move || service.update_order(order_id, changes))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// DELETE /orders/{id}
#[utoipa::path(
    delete,
    path = "/orders/{id}",
    params(
        ("id" = String, Path, description = "Order identifier (unsigned 64-bit integer)"),
    ),
    responses(
        (status = 204, description = "Order deleted"),
        (status = 400, description = "Malformed order id"),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
        (status = 503, description = "Order store unavailable"),
    ),
    tag = "orders"
)]
pub async fn delete_order(
    service: web::Data<DynOrderService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let order_id = parse_order_id(&path.into_inner())?;

    web::block(move || service.delete_order(order_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::NoContent().finish())
}
