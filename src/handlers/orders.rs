use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::{CheckoutLine, CheckoutRequest};
use crate::domain::order::{
    Actor, ActorRole, HistoryEntry, ItemStatus, Order, OrderItem, OrderScope, PaymentMethod,
    ShippingAddress, VendorNotification,
};
use crate::errors::AppError;
use crate::state::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShippingAddressDto {
    pub name: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

impl From<ShippingAddressDto> for ShippingAddress {
    fn from(dto: ShippingAddressDto) -> Self {
        ShippingAddress {
            name: dto.name,
            phone: dto.phone,
            street: dto.street,
            city: dto.city,
            state: dto.state,
            postal_code: dto.postal_code,
        }
    }
}

impl From<ShippingAddress> for ShippingAddressDto {
    fn from(address: ShippingAddress) -> Self {
        ShippingAddressDto {
            name: address.name,
            phone: address.phone,
            street: address.street,
            city: address.city,
            state: address.state,
            postal_code: address.postal_code,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub items: Vec<CreateOrderItemRequest>,
    pub shipping_address: ShippingAddressDto,
    /// `cod` or `gateway`
    pub payment_method: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateOrderResponse {
    pub order_id: Uuid,
    /// Remote intent id the client opens the payment modal with.
    pub gateway_order_ref: Option<String>,
    /// Decimal amount as a string, e.g. "1300.00"
    pub amount: String,
    pub currency: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryEntryResponse {
    pub status: String,
    pub changed_at: String,
    pub changed_by: String,
}

impl<S: std::fmt::Display> From<&HistoryEntry<S>> for HistoryEntryResponse {
    fn from(entry: &HistoryEntry<S>) -> Self {
        HistoryEntryResponse {
            status: entry.status.to_string(),
            changed_at: entry.changed_at.to_rfc3339(),
            changed_by: entry.changed_by.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub vendor_id: Option<Uuid>,
    pub vendor_name: Option<String>,
    pub title: String,
    pub image: Option<String>,
    pub quantity: i32,
    pub price: String,
    pub status: String,
    pub history: Vec<HistoryEntryResponse>,
    /// Present on vendor views only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_vendor_item: Option<bool>,
}

impl OrderItemResponse {
    fn new(item: &OrderItem, vendor: Option<Uuid>) -> Self {
        OrderItemResponse {
            id: item.id,
            product_id: item.product_id,
            vendor_id: item.vendor_id,
            vendor_name: item.vendor_name.clone(),
            title: item.title.clone(),
            image: item.image.clone(),
            quantity: item.quantity,
            price: item.price.to_string(),
            status: item.status.to_string(),
            history: item.history.iter().map(HistoryEntryResponse::from).collect(),
            is_vendor_item: vendor.map(|v| item.vendor_id == Some(v)),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub item_id: Uuid,
    pub vendor_id: Uuid,
    pub old_status: String,
    pub new_status: String,
    pub created_at: String,
    pub seen_by_admin: bool,
}

impl From<&VendorNotification> for NotificationResponse {
    fn from(n: &VendorNotification) -> Self {
        NotificationResponse {
            id: n.id,
            item_id: n.item_id,
            vendor_id: n.vendor_id,
            old_status: n.old_status.to_string(),
            new_status: n.new_status.to_string(),
            created_at: n.created_at.to_rfc3339(),
            seen_by_admin: n.seen_by_admin,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub items: Vec<OrderItemResponse>,
    pub total_amount: String,
    pub payment_status: String,
    pub payment_method: String,
    pub gateway_order_ref: Option<String>,
    pub transaction_id: Option<String>,
    pub order_status: String,
    pub history: Vec<HistoryEntryResponse>,
    pub shipping_address: ShippingAddressDto,
    pub created_at: String,
    pub updated_at: String,
    /// Admin views only: vendor changes awaiting acknowledgement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_notifications: Option<Vec<NotificationResponse>>,
    /// Admin views only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_notifications: Option<Vec<NotificationResponse>>,
}

impl OrderResponse {
    /// Shapes an order for the portal of `actor`.
    pub fn for_actor(order: &Order, actor: &Actor) -> Self {
        let vendor = (actor.role == ActorRole::Vendor).then_some(actor.id);
        let (pending, acknowledged) = if actor.role == ActorRole::Admin {
            let (seen, unseen): (Vec<_>, Vec<_>) = order
                .vendor_notifications
                .iter()
                .partition(|n| n.seen_by_admin);
            (
                Some(unseen.into_iter().map(NotificationResponse::from).collect()),
                Some(seen.into_iter().map(NotificationResponse::from).collect()),
            )
        } else {
            (None, None)
        };

        OrderResponse {
            id: order.id,
            customer_id: order.customer_id,
            items: order
                .items
                .iter()
                .map(|item| OrderItemResponse::new(item, vendor))
                .collect(),
            total_amount: order.total_amount.to_string(),
            payment_status: order.payment_status.as_str().to_string(),
            payment_method: order.payment_method.as_str().to_string(),
            gateway_order_ref: order.gateway_order_ref.clone(),
            transaction_id: order.transaction_id.clone(),
            order_status: order.order_status.to_string(),
            history: order.history.iter().map(HistoryEntryResponse::from).collect(),
            shipping_address: order.shipping_address.clone().into(),
            created_at: order.created_at.to_rfc3339(),
            updated_at: order.updated_at.to_rfc3339(),
            pending_notifications: pending,
            acknowledged_notifications: acknowledged,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusUpdateRequest {
    /// One of `placed`, `processing`, `shipped`, `delivered`, `cancelled`
    pub status: String,
    /// Admin-only bypass of the transition rules.
    #[serde(rename = "override", default)]
    pub admin_override: bool,
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListOrdersParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

async fn list_scoped(
    state: &AppState,
    actor: Actor,
    scope: OrderScope,
    params: ListOrdersParams,
) -> Result<HttpResponse, AppError> {
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);

    let result = state.orders.list_orders(actor, scope, page, limit).await?;

    Ok(HttpResponse::Ok().json(ListOrdersResponse {
        items: result
            .items
            .iter()
            .map(|order| OrderResponse::for_actor(order, &actor))
            .collect(),
        total: result.total,
        page,
        limit,
    }))
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Snapshots catalog prices into a new order. Gateway orders also get a
/// remote payment intent; if the gateway cannot be reached nothing is stored.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = CreateOrderResponse),
        (status = 400, description = "Invalid order"),
        (status = 401, description = "Missing identity"),
        (status = 403, description = "Not a customer"),
        (status = 503, description = "Payment gateway unavailable, retry"),
    ),
    tag = "orders"
)]
pub async fn create_order(
    state: web::Data<AppState>,
    actor: Actor,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let payment_method: PaymentMethod = body.payment_method.parse()?;

    let receipt = state
        .checkout
        .create_order(
            actor,
            CheckoutRequest {
                items: body
                    .items
                    .into_iter()
                    .map(|i| CheckoutLine {
                        product_id: i.product_id,
                        quantity: i.quantity,
                    })
                    .collect(),
                shipping_address: body.shipping_address.into(),
                payment_method,
            },
        )
        .await?;

    Ok(HttpResponse::Created().json(CreateOrderResponse {
        order_id: receipt.order_id,
        gateway_order_ref: receipt.gateway_order_ref,
        amount: receipt.amount.with_scale(2).to_string(),
        currency: receipt.currency,
    }))
}

/// GET /orders/{id}
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 403, description = "Order not visible to caller"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order = state.orders.get_order(actor, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::for_actor(&order, &actor)))
}

/// GET /orders/my
///
/// The caller's own orders, newest first. Gateway orders still awaiting
/// payment are not listed.
#[utoipa::path(
    get,
    path = "/orders/my",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
        (status = 403, description = "Not a customer"),
    ),
    tag = "orders"
)]
pub async fn list_my_orders(
    state: web::Data<AppState>,
    actor: Actor,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    list_scoped(&state, actor, OrderScope::Customer(actor.id), query.into_inner()).await
}

/// GET /orders/admin
#[utoipa::path(
    get,
    path = "/orders/admin",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
        (status = 403, description = "Not an admin"),
    ),
    tag = "orders"
)]
pub async fn list_admin_orders(
    state: web::Data<AppState>,
    actor: Actor,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    if actor.role != ActorRole::Admin {
        return Err(AppError::Forbidden("admin listing requires admin role".to_string()));
    }
    list_scoped(&state, actor, OrderScope::All, query.into_inner()).await
}

/// GET /orders/vendor
///
/// Orders containing at least one of the vendor's items. Every item carries
/// `is_vendor_item`.
#[utoipa::path(
    get,
    path = "/orders/vendor",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
        (status = 403, description = "Not a vendor"),
    ),
    tag = "orders"
)]
pub async fn list_vendor_orders(
    state: web::Data<AppState>,
    actor: Actor,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    list_scoped(&state, actor, OrderScope::Vendor(actor.id), query.into_inner()).await
}

/// PUT /orders/{order_id}/items/{item_id}/status
#[utoipa::path(
    put,
    path = "/orders/{order_id}/items/{item_id}/status",
    params(
        ("order_id" = Uuid, Path, description = "Order UUID"),
        ("item_id" = Uuid, Path, description = "Order item UUID"),
    ),
    request_body = StatusUpdateRequest,
    responses(
        (status = 200, description = "Item updated", body = OrderResponse),
        (status = 400, description = "Unknown status"),
        (status = 403, description = "Role may not make this change"),
        (status = 404, description = "Order or item not found"),
        (status = 409, description = "Illegal transition or payment pending"),
    ),
    tag = "orders"
)]
pub async fn update_item_status(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<StatusUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    let (order_id, item_id) = path.into_inner();
    let status: ItemStatus = body.status.parse()?;

    let order = state
        .fulfillment
        .set_item_status(actor, order_id, item_id, status, body.admin_override)
        .await?;
    Ok(HttpResponse::Ok().json(OrderResponse::for_actor(&order, &actor)))
}

/// PUT /orders/{order_id}/status
///
/// Admin only. Cascades to every item and acknowledges all pending vendor
/// notifications of the order.
#[utoipa::path(
    put,
    path = "/orders/{order_id}/status",
    params(
        ("order_id" = Uuid, Path, description = "Order UUID"),
    ),
    request_body = StatusUpdateRequest,
    responses(
        (status = 200, description = "Order updated", body = OrderResponse),
        (status = 400, description = "Unknown status"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Illegal transition or payment pending"),
    ),
    tag = "orders"
)]
pub async fn update_order_status(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<Uuid>,
    body: web::Json<StatusUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    let status: ItemStatus = body.status.parse()?;

    let order = state
        .fulfillment
        .set_order_status(actor, path.into_inner(), status, body.admin_override)
        .await?;
    Ok(HttpResponse::Ok().json(OrderResponse::for_actor(&order, &actor)))
}

/// PUT /orders/{order_id}/notifications/{notification_id}/ack
#[utoipa::path(
    put,
    path = "/orders/{order_id}/notifications/{notification_id}/ack",
    params(
        ("order_id" = Uuid, Path, description = "Order UUID"),
        ("notification_id" = Uuid, Path, description = "Vendor notification UUID"),
    ),
    responses(
        (status = 200, description = "Notification acknowledged", body = OrderResponse),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "Order or notification not found"),
    ),
    tag = "notifications"
)]
pub async fn acknowledge_notification(
    state: web::Data<AppState>,
    actor: Actor,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
    let (order_id, notification_id) = path.into_inner();
    let order = state
        .fulfillment
        .acknowledge_notification(actor, order_id, notification_id)
        .await?;
    Ok(HttpResponse::Ok().json(OrderResponse::for_actor(&order, &actor)))
}
