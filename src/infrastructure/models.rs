use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::{order_history, order_items, orders, products, vendor_notifications};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub total_amount: BigDecimal,
    pub payment_status: String,
    pub payment_method: String,
    pub gateway_order_ref: Option<String>,
    pub gateway_payment_ref: Option<String>,
    pub gateway_signature: Option<String>,
    pub transaction_id: Option<String>,
    pub order_status: String,
    pub ship_name: String,
    pub ship_phone: String,
    pub ship_street: String,
    pub ship_city: String,
    pub ship_state: String,
    pub ship_postal_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, Insertable)]
#[diesel(table_name = order_items)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub product_id: Uuid,
    pub vendor_id: Option<Uuid>,
    pub vendor_name: Option<String>,
    pub title: String,
    pub image: Option<String>,
    pub quantity: i32,
    pub price: BigDecimal,
    pub status: String,
}

/// One history entry. `item_id` is `None` for order-level entries.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_history)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct HistoryRow {
    pub id: i64,
    pub order_id: Uuid,
    pub item_id: Option<Uuid>,
    pub status: String,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_history)]
pub struct NewHistoryRow<'a> {
    pub order_id: Uuid,
    pub item_id: Option<Uuid>,
    pub status: &'a str,
    pub changed_by: &'a str,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, Insertable)]
#[diesel(table_name = vendor_notifications)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NotificationRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub item_id: Uuid,
    pub vendor_id: Uuid,
    pub old_status: String,
    pub new_status: String,
    pub seen_by_admin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub id: Uuid,
    pub title: String,
    pub image: Option<String>,
    pub price: BigDecimal,
    pub vendor_id: Option<Uuid>,
    pub vendor_name: Option<String>,
}
