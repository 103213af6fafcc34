use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::blocking;
use crate::domain::errors::DomainError;
use crate::domain::order::{Actor, ActorRole, ItemStatus, Order, PendingNotification};
use crate::domain::ports::OrderStore;
use crate::domain::status::{plan_acknowledgement, plan_item_status, plan_order_status};

/// Fulfillment status changes and the vendor notification queue.
#[derive(Clone)]
pub struct FulfillmentService {
    store: Arc<dyn OrderStore>,
}

impl FulfillmentService {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    pub async fn set_item_status(
        &self,
        actor: Actor,
        order_id: Uuid,
        item_id: Uuid,
        status: ItemStatus,
        admin_override: bool,
    ) -> Result<Order, DomainError> {
        let store = Arc::clone(&self.store);
        let order = blocking(move || {
            let now = Utc::now();
            store.apply(order_id, now, &move |order| {
                plan_item_status(order, item_id, status, &actor, admin_override, now)
            })
        })
        .await?;

        log::info!(
            "Item {} of order {} set to {} by {}{}",
            item_id,
            order_id,
            status,
            actor.role,
            if admin_override { " (override)" } else { "" }
        );
        Ok(order)
    }

    pub async fn set_order_status(
        &self,
        actor: Actor,
        order_id: Uuid,
        status: ItemStatus,
        admin_override: bool,
    ) -> Result<Order, DomainError> {
        let store = Arc::clone(&self.store);
        let order = blocking(move || {
            let now = Utc::now();
            store.apply(order_id, now, &move |order| {
                plan_order_status(order, status, &actor, admin_override, now)
            })
        })
        .await?;

        log::info!(
            "Order {} set to {} by {}{}",
            order_id,
            status,
            actor.role,
            if admin_override { " (override)" } else { "" }
        );
        Ok(order)
    }

    pub async fn acknowledge_notification(
        &self,
        actor: Actor,
        order_id: Uuid,
        notification_id: Uuid,
    ) -> Result<Order, DomainError> {
        let store = Arc::clone(&self.store);
        blocking(move || {
            store.apply(order_id, Utc::now(), &move |order| {
                plan_acknowledgement(order, notification_id, &actor)
            })
        })
        .await
    }

    /// Unacknowledged vendor changes across all orders, oldest first.
    pub async fn pending_notifications(
        &self,
        actor: Actor,
    ) -> Result<Vec<PendingNotification>, DomainError> {
        if actor.role != ActorRole::Admin {
            return Err(DomainError::Forbidden(
                "only admins may review vendor notifications".to_string(),
            ));
        }
        let store = Arc::clone(&self.store);
        blocking(move || store.pending_notifications()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{OrderStatus, PaymentMethod};
    use crate::domain::testing::{sample_order, two_vendor_order};
    use crate::infrastructure::memory::InMemoryOrderStore;

    use ItemStatus::*;

    fn service_with(order: &Order) -> (FulfillmentService, Arc<InMemoryOrderStore>) {
        let store = Arc::new(InMemoryOrderStore::new());
        store.insert(order).unwrap();
        (FulfillmentService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn vendor_then_admin_scenario() {
        let (order, vendor_a, _) = two_vendor_order();
        let item_a = order.items[0].id;
        let (service, _) = service_with(&order);
        let admin = Actor::admin(uuid::Uuid::new_v4());

        let updated = service
            .set_item_status(Actor::vendor(vendor_a), order.id, item_a, Processing, false)
            .await
            .unwrap();
        assert_eq!(updated.item(item_a).unwrap().status, Processing);

        let pending = service.pending_notifications(admin).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].order_id, order.id);
        assert_eq!(pending[0].item_id, item_a);
        assert_eq!(pending[0].old_status, Placed);
        assert_eq!(pending[0].new_status, Processing);
        assert_eq!(pending[0].vendor_id, vendor_a);

        let shipped = service
            .set_order_status(admin, order.id, Shipped, false)
            .await
            .unwrap();
        assert_eq!(shipped.order_status, OrderStatus::Shipped);
        assert!(shipped.items.iter().all(|i| i.status == Shipped));
        assert!(shipped.vendor_notifications.iter().all(|n| n.seen_by_admin));
        assert!(service.pending_notifications(admin).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn explicit_acknowledgement_is_idempotent() {
        let (order, vendor_a, _) = two_vendor_order();
        let item_a = order.items[0].id;
        let (service, _) = service_with(&order);
        let admin = Actor::admin(uuid::Uuid::new_v4());

        let updated = service
            .set_item_status(Actor::vendor(vendor_a), order.id, item_a, Processing, false)
            .await
            .unwrap();
        let notification = updated.vendor_notifications[0].id;

        for _ in 0..2 {
            let acked = service
                .acknowledge_notification(admin, order.id, notification)
                .await
                .unwrap();
            assert!(acked.vendor_notifications[0].seen_by_admin);
        }
        assert!(service.pending_notifications(admin).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejected_change_leaves_stored_order_untouched() {
        let (order, vendor_a, _) = two_vendor_order();
        let item_a = order.items[0].id;
        let (service, store) = service_with(&order);
        let admin = Actor::admin(uuid::Uuid::new_v4());

        service
            .set_item_status(admin, order.id, item_a, Delivered, false)
            .await
            .unwrap();
        let err = service
            .set_item_status(Actor::vendor(vendor_a), order.id, item_a, Shipped, false)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::IllegalTransition { .. }));

        let stored = store.find_by_id(order.id).unwrap().unwrap();
        let item = stored.item(item_a).unwrap();
        assert_eq!(item.status, Delivered);
        assert_eq!(item.history.len(), 2);
        assert!(stored.vendor_notifications.is_empty());
    }

    #[tokio::test]
    async fn unpaid_gateway_order_is_payment_pending() {
        let order = sample_order(PaymentMethod::Gateway);
        let item = order.items[0].id;
        let vendor = order.items[0].vendor_id.unwrap();
        let (service, _) = service_with(&order);

        let err = service
            .set_item_status(Actor::vendor(vendor), order.id, item, Processing, false)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::PaymentPending));
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let (service, _) = service_with(&sample_order(PaymentMethod::Cod));
        let err = service
            .set_order_status(
                Actor::admin(uuid::Uuid::new_v4()),
                uuid::Uuid::new_v4(),
                Processing,
                false,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound("Order")));
    }

    #[tokio::test]
    async fn notification_queue_is_admin_only() {
        let (service, _) = service_with(&sample_order(PaymentMethod::Cod));
        let err = service
            .pending_notifications(Actor::vendor(uuid::Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }
}
