use bigdecimal::BigDecimal;
use chrono::Utc;
use uuid::Uuid;

use super::order::{
    ActorRole, HistoryEntry, ItemStatus, Order, OrderItem, OrderStatus, PaymentMethod,
    PaymentStatus, ShippingAddress,
};

pub fn address() -> ShippingAddress {
    ShippingAddress {
        name: "Asha Rao".into(),
        phone: "9876543210".into(),
        street: "12 MG Road".into(),
        city: "Pune".into(),
        state: "MH".into(),
        postal_code: "411001".into(),
    }
}

pub fn item(vendor_id: Option<Uuid>, price: i64, quantity: i32) -> OrderItem {
    OrderItem {
        id: Uuid::new_v4(),
        product_id: Uuid::new_v4(),
        vendor_id,
        vendor_name: vendor_id.map(|_| "Acme Textiles".to_string()),
        title: "Cotton kurta".into(),
        image: None,
        quantity,
        price: BigDecimal::from(price),
        status: ItemStatus::Placed,
        history: vec![HistoryEntry::new(
            ItemStatus::Placed,
            ActorRole::Customer,
            Utc::now(),
        )],
    }
}

/// A freshly checked-out single-item order.
pub fn sample_order(method: PaymentMethod) -> Order {
    let now = Utc::now();
    let items = vec![item(Some(Uuid::new_v4()), 500, 2)];
    let (order_status, gateway_order_ref) = match method {
        PaymentMethod::Cod => (OrderStatus::Placed, None),
        PaymentMethod::Gateway => (
            OrderStatus::AwaitingPayment,
            Some(format!("order_{}", Uuid::new_v4().simple())),
        ),
    };
    let mut order = Order {
        id: Uuid::new_v4(),
        customer_id: Uuid::new_v4(),
        items,
        total_amount: BigDecimal::from(0),
        payment_status: PaymentStatus::Pending,
        payment_method: method,
        gateway_order_ref,
        gateway_payment_ref: None,
        gateway_signature: None,
        transaction_id: None,
        order_status,
        history: vec![HistoryEntry::new(order_status, ActorRole::System, now)],
        vendor_notifications: Vec::new(),
        shipping_address: address(),
        created_at: now,
        updated_at: now,
    };
    order.total_amount = order.computed_total();
    order
}

/// A cash-on-delivery order with one item from each of two vendors.
pub fn two_vendor_order() -> (Order, Uuid, Uuid) {
    let vendor_a = Uuid::new_v4();
    let vendor_b = Uuid::new_v4();
    let mut order = sample_order(PaymentMethod::Cod);
    order.items = vec![item(Some(vendor_a), 500, 2), item(Some(vendor_b), 300, 1)];
    order.total_amount = order.computed_total();
    (order, vendor_a, vendor_b)
}
