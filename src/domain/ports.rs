use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;
use super::order::{
    ListResult, Order, OrderChange, OrderQuery, OrderStatus, PaymentCapture, PendingNotification,
};

/// Planner handed to [`OrderStore::apply`]: inspects the locked, current order
/// and decides which changes to write.
pub type ChangePlan<'a> = &'a dyn Fn(&Order) -> Result<Vec<OrderChange>, DomainError>;

#[derive(Debug, Clone)]
pub enum PaymentTransition {
    /// This call moved the order from `pending` to `paid`.
    Applied {
        order: Order,
        previous_status: OrderStatus,
    },
    /// Payment had already been recorded; nothing was written.
    AlreadyPaid(Order),
}

pub trait OrderStore: Send + Sync + 'static {
    fn insert(&self, order: &Order) -> Result<(), DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError>;
    fn find_by_gateway_ref(&self, gateway_order_ref: &str) -> Result<Option<Order>, DomainError>;
    fn list(&self, query: &OrderQuery) -> Result<ListResult, DomainError>;

    /// Atomic compare-and-set of `payment_status` from `pending` to `paid`,
    /// recording the capture and a single `placed` history entry.
    fn mark_paid(
        &self,
        id: Uuid,
        capture: &PaymentCapture,
        at: DateTime<Utc>,
    ) -> Result<PaymentTransition, DomainError>;

    /// Runs `plan` against the order while holding it exclusively, then writes
    /// the planned changes in the same atomic unit. Returns the updated order.
    fn apply(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        plan: ChangePlan<'_>,
    ) -> Result<Order, DomainError>;

    fn pending_notifications(&self) -> Result<Vec<PendingNotification>, DomainError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductSnapshot {
    pub id: Uuid,
    pub title: String,
    pub image: Option<String>,
    pub price: BigDecimal,
    pub vendor_id: Option<Uuid>,
    pub vendor_name: Option<String>,
}

/// Read-only view of the product catalog, consulted only at checkout.
pub trait Catalog: Send + Sync + 'static {
    fn get_product(&self, id: Uuid) -> Result<Option<ProductSnapshot>, DomainError>;
}
