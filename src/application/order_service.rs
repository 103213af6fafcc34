use std::sync::Arc;

use uuid::Uuid;

use super::blocking;
use crate::domain::errors::DomainError;
use crate::domain::order::{Actor, ActorRole, ListResult, Order, OrderQuery, OrderScope};
use crate::domain::ports::OrderStore;

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn OrderStore>,
}

impl OrderService {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    pub async fn get_order(&self, actor: Actor, id: Uuid) -> Result<Order, DomainError> {
        let store = Arc::clone(&self.store);
        let order = blocking(move || store.find_by_id(id))
            .await?
            .ok_or(DomainError::NotFound("Order"))?;

        let visible = match actor.role {
            ActorRole::Admin => true,
            ActorRole::Customer => order.customer_id == actor.id,
            ActorRole::Vendor => order.has_vendor_items(actor.id),
            ActorRole::System => false,
        };
        if !visible {
            return Err(DomainError::Forbidden(format!(
                "{} may not view order {}",
                actor.role, id
            )));
        }
        Ok(order)
    }

    /// Lists settled orders in `scope`, newest first. Callers may only list
    /// their own scope; `OrderScope::All` is for admins.
    pub async fn list_orders(
        &self,
        actor: Actor,
        scope: OrderScope,
        page: i64,
        limit: i64,
    ) -> Result<ListResult, DomainError> {
        let permitted = match (actor.role, scope) {
            (ActorRole::Customer, OrderScope::Customer(id)) => id == actor.id,
            (ActorRole::Vendor, OrderScope::Vendor(id)) => id == actor.id,
            (ActorRole::Admin, _) => true,
            _ => false,
        };
        if !permitted {
            return Err(DomainError::Forbidden(format!(
                "{} may not list these orders",
                actor.role
            )));
        }

        let query = OrderQuery { scope, page, limit };
        let store = Arc::clone(&self.store);
        blocking(move || store.list(&query)).await
    }
}
