//! In-process adapters. A single mutex around the aggregate map gives the
//! same per-order atomicity as the row lock in the Postgres store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, RwLock};

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{ListResult, Order, OrderQuery, PaymentCapture, PendingNotification};
use crate::domain::ports::{Catalog, ChangePlan, OrderStore, PaymentTransition, ProductSnapshot};

#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: Mutex<HashMap<Uuid, Order>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.orders.lock().map(|o| o.is_empty()).unwrap_or(true)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, Order>>, DomainError> {
        self.orders
            .lock()
            .map_err(|_| DomainError::Internal("order store lock poisoned".to_string()))
    }
}

impl OrderStore for InMemoryOrderStore {
    fn insert(&self, order: &Order) -> Result<(), DomainError> {
        let mut orders = self.lock()?;
        if orders.contains_key(&order.id) {
            return Err(DomainError::Internal(format!(
                "order {} already exists",
                order.id
            )));
        }
        orders.insert(order.id, order.clone());
        Ok(())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        Ok(self.lock()?.get(&id).cloned())
    }

    fn find_by_gateway_ref(&self, gateway_order_ref: &str) -> Result<Option<Order>, DomainError> {
        Ok(self
            .lock()?
            .values()
            .find(|o| o.gateway_order_ref.as_deref() == Some(gateway_order_ref))
            .cloned())
    }

    fn list(&self, query: &OrderQuery) -> Result<ListResult, DomainError> {
        let orders = self.lock()?;
        let mut matching: Vec<&Order> = orders.values().filter(|o| query.matches(o)).collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(ListResult {
            total: matching.len() as i64,
            items: matching
                .into_iter()
                .skip(query.offset().max(0) as usize)
                .take(query.limit.max(0) as usize)
                .cloned()
                .collect(),
        })
    }

    fn mark_paid(
        &self,
        id: Uuid,
        capture: &PaymentCapture,
        at: DateTime<Utc>,
    ) -> Result<PaymentTransition, DomainError> {
        let mut orders = self.lock()?;
        let order = orders.get_mut(&id).ok_or(DomainError::NotFound("Order"))?;
        let previous_status = order.order_status;

        if order.record_payment(capture, at) {
            Ok(PaymentTransition::Applied {
                order: order.clone(),
                previous_status,
            })
        } else {
            Ok(PaymentTransition::AlreadyPaid(order.clone()))
        }
    }

    fn apply(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        plan: ChangePlan<'_>,
    ) -> Result<Order, DomainError> {
        let mut orders = self.lock()?;
        let order = orders.get_mut(&id).ok_or(DomainError::NotFound("Order"))?;
        let changes = plan(&*order)?;
        order.apply_all(&changes, at);
        Ok(order.clone())
    }

    fn pending_notifications(&self) -> Result<Vec<PendingNotification>, DomainError> {
        let orders = self.lock()?;
        let mut pending: Vec<PendingNotification> = orders
            .values()
            .flat_map(|order| {
                order.pending_notifications().map(move |n| {
                    let item = order.item(n.item_id);
                    PendingNotification {
                        order_id: order.id,
                        notification_id: n.id,
                        item_id: n.item_id,
                        product_title: item.map(|i| i.title.clone()),
                        vendor_id: n.vendor_id,
                        vendor_name: item.and_then(|i| i.vendor_name.clone()),
                        old_status: n.old_status,
                        new_status: n.new_status,
                        created_at: n.created_at,
                    }
                })
            })
            .collect();
        pending.sort_by_key(|n| n.created_at);
        Ok(pending)
    }
}

#[derive(Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<Uuid, ProductSnapshot>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, product: ProductSnapshot) {
        if let Ok(mut products) = self.products.write() {
            products.insert(product.id, product);
        }
    }

    pub fn set_price(&self, id: Uuid, price: BigDecimal) {
        if let Ok(mut products) = self.products.write() {
            if let Some(product) = products.get_mut(&id) {
                product.price = price;
            }
        }
    }
}

impl Catalog for InMemoryCatalog {
    fn get_product(&self, id: Uuid) -> Result<Option<ProductSnapshot>, DomainError> {
        self.products
            .read()
            .map(|products| products.get(&id).cloned())
            .map_err(|_| DomainError::Internal("catalog lock poisoned".to_string()))
    }
}
