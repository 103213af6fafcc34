pub mod actor;
pub mod notifications;
pub mod orders;
pub mod payments;

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Marketplace orders",
        description = "Order lifecycle, fulfillment and payment reconciliation"
    ),
    paths(
        orders::create_order,
        orders::get_order,
        orders::list_my_orders,
        orders::list_admin_orders,
        orders::list_vendor_orders,
        orders::update_item_status,
        orders::update_order_status,
        orders::acknowledge_notification,
        notifications::pending_notifications,
        payments::verify_payment,
        payments::payment_return,
        payments::payment_webhook,
    ),
    components(schemas(
        orders::CreateOrderItemRequest,
        orders::CreateOrderRequest,
        orders::CreateOrderResponse,
        orders::ShippingAddressDto,
        orders::HistoryEntryResponse,
        orders::OrderItemResponse,
        orders::NotificationResponse,
        orders::OrderResponse,
        orders::StatusUpdateRequest,
        orders::ListOrdersResponse,
        notifications::PendingNotificationResponse,
        payments::VerifyPaymentRequest,
        payments::VerifyPaymentResponse,
        payments::WebhookResponse,
    )),
    tags(
        (name = "orders", description = "Checkout, order views and fulfillment"),
        (name = "notifications", description = "Vendor change queue"),
        (name = "payments", description = "Payment reconciliation"),
    )
)]
pub struct ApiDoc;
