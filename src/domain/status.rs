//! Order and item status state machine.
//!
//! Every fulfillment transition is decided by [`verdict`], a single table keyed
//! on `(current, requested, role)`. The `plan_*` functions turn an allowed
//! request into the list of [`OrderChange`]s the store writes atomically.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;
use super::order::{
    Actor, ActorRole, HistoryEntry, ItemStatus, Order, OrderChange, OrderStatus, PaymentStatus,
    VendorNotification,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    /// The role may never request this status.
    Forbidden,
    /// The role may request it, but not from the current status.
    Illegal,
}

pub fn verdict(current: ItemStatus, requested: ItemStatus, role: ActorRole) -> Verdict {
    use ItemStatus::*;

    match (role, current, requested) {
        (ActorRole::System, _, _) => Verdict::Forbidden,
        (ActorRole::Customer, _, to) if to != Cancelled => Verdict::Forbidden,
        (ActorRole::Vendor, _, Placed | Delivered) => Verdict::Forbidden,
        (_, Delivered | Cancelled, _) => Verdict::Illegal,
        (_, Placed | Processing, Cancelled) => Verdict::Allow,
        (_, _, Cancelled) => Verdict::Illegal,
        (_, from, to) if to.rank() > from.rank() => Verdict::Allow,
        _ => Verdict::Illegal,
    }
}

/// Checks a transition, honoring an admin override as a bypass of the table.
pub fn authorize(
    current: ItemStatus,
    requested: ItemStatus,
    role: ActorRole,
    admin_override: bool,
) -> Result<(), DomainError> {
    if admin_override {
        if role != ActorRole::Admin {
            return Err(DomainError::Forbidden(
                "only admins may override status rules".to_string(),
            ));
        }
        if current == requested {
            return Err(DomainError::illegal(current, requested));
        }
        return Ok(());
    }
    match verdict(current, requested, role) {
        Verdict::Allow => Ok(()),
        Verdict::Forbidden => Err(DomainError::Forbidden(format!(
            "{role} may not set status '{requested}'"
        ))),
        Verdict::Illegal => Err(DomainError::illegal(current, requested)),
    }
}

fn ensure_payment_settled(order: &Order, admin_override: bool) -> Result<(), DomainError> {
    if order.awaits_payment() && !admin_override {
        return Err(DomainError::PaymentPending);
    }
    Ok(())
}

fn ensure_override_allowed(actor: &Actor, admin_override: bool) -> Result<(), DomainError> {
    if admin_override && actor.role != ActorRole::Admin {
        return Err(DomainError::Forbidden(
            "only admins may override status rules".to_string(),
        ));
    }
    Ok(())
}

pub fn plan_item_status(
    order: &Order,
    item_id: Uuid,
    requested: ItemStatus,
    actor: &Actor,
    admin_override: bool,
    now: DateTime<Utc>,
) -> Result<Vec<OrderChange>, DomainError> {
    ensure_override_allowed(actor, admin_override)?;
    let item = order
        .item(item_id)
        .ok_or(DomainError::NotFound("Order item"))?;

    match actor.role {
        ActorRole::Customer if order.customer_id != actor.id => {
            return Err(DomainError::Forbidden(
                "order belongs to another customer".to_string(),
            ))
        }
        ActorRole::Vendor if item.vendor_id != Some(actor.id) => {
            return Err(DomainError::Forbidden(
                "item belongs to another vendor".to_string(),
            ))
        }
        _ => {}
    }

    ensure_payment_settled(order, admin_override)?;
    authorize(item.status, requested, actor.role, admin_override)?;

    let mut changes = vec![
        OrderChange::SetItemStatus {
            item_id,
            status: requested,
        },
        OrderChange::AppendItemHistory {
            item_id,
            entry: HistoryEntry::new(requested, actor.role, now),
        },
    ];

    match actor.role {
        ActorRole::Vendor => changes.push(OrderChange::AddNotification(VendorNotification {
            id: Uuid::new_v4(),
            item_id,
            vendor_id: actor.id,
            old_status: item.status,
            new_status: requested,
            created_at: now,
            seen_by_admin: false,
        })),
        ActorRole::Admin => {
            // An admin write on the item settles what vendors reported for it.
            let seen: Vec<Uuid> = order
                .pending_notifications()
                .filter(|n| n.item_id == item_id)
                .map(|n| n.id)
                .collect();
            if !seen.is_empty() {
                changes.push(OrderChange::AcknowledgeNotifications(seen));
            }
        }
        _ => {}
    }

    Ok(changes)
}

pub fn plan_order_status(
    order: &Order,
    requested: ItemStatus,
    actor: &Actor,
    admin_override: bool,
    now: DateTime<Utc>,
) -> Result<Vec<OrderChange>, DomainError> {
    if actor.role != ActorRole::Admin {
        return Err(DomainError::Forbidden(
            "only admins may set order status".to_string(),
        ));
    }
    ensure_payment_settled(order, admin_override)?;
    if let Some(current) = order.order_status.fulfillment() {
        authorize(current, requested, actor.role, admin_override)?;
    }

    let mut changes = vec![
        OrderChange::SetOrderStatus(OrderStatus::from(requested)),
        OrderChange::AppendOrderHistory(HistoryEntry::new(
            OrderStatus::from(requested),
            actor.role,
            now,
        )),
    ];

    for item in &order.items {
        if item.status == requested {
            continue;
        }
        // Cancelled items drop out of fulfillment.
        if item.status == ItemStatus::Cancelled && !admin_override {
            continue;
        }
        authorize(item.status, requested, actor.role, admin_override)?;
        changes.push(OrderChange::SetItemStatus {
            item_id: item.id,
            status: requested,
        });
        changes.push(OrderChange::AppendItemHistory {
            item_id: item.id,
            entry: HistoryEntry::new(requested, actor.role, now),
        });
    }

    let pending: Vec<Uuid> = order.pending_notifications().map(|n| n.id).collect();
    if !pending.is_empty() {
        changes.push(OrderChange::AcknowledgeNotifications(pending));
    }

    Ok(changes)
}

pub fn plan_acknowledgement(
    order: &Order,
    notification_id: Uuid,
    actor: &Actor,
) -> Result<Vec<OrderChange>, DomainError> {
    if actor.role != ActorRole::Admin {
        return Err(DomainError::Forbidden(
            "only admins may acknowledge vendor notifications".to_string(),
        ));
    }
    let notification = order
        .vendor_notifications
        .iter()
        .find(|n| n.id == notification_id)
        .ok_or(DomainError::NotFound("Vendor notification"))?;

    if notification.seen_by_admin {
        return Ok(Vec::new());
    }
    Ok(vec![OrderChange::AcknowledgeNotifications(vec![
        notification_id,
    ])])
}

/// Cancels an order whose checkout signature failed to verify. Paid or
/// already-cancelled orders are left alone.
pub fn plan_payment_failure(order: &Order, now: DateTime<Utc>) -> Vec<OrderChange> {
    if order.payment_status != PaymentStatus::Pending
        || order.order_status == OrderStatus::Cancelled
    {
        return Vec::new();
    }
    vec![
        OrderChange::SetOrderStatus(OrderStatus::Cancelled),
        OrderChange::AppendOrderHistory(HistoryEntry::new(
            OrderStatus::Cancelled,
            ActorRole::System,
            now,
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::PaymentMethod;
    use crate::domain::testing::{sample_order, two_vendor_order};

    use ItemStatus::*;

    fn apply(order: &mut Order, changes: Vec<OrderChange>) {
        order.apply_all(&changes, Utc::now());
    }

    // ── transition table ─────────────────────────────────────────────────────

    #[test]
    fn forward_path_is_allowed_for_admin() {
        assert_eq!(verdict(Placed, Processing, ActorRole::Admin), Verdict::Allow);
        assert_eq!(verdict(Processing, Shipped, ActorRole::Admin), Verdict::Allow);
        assert_eq!(verdict(Shipped, Delivered, ActorRole::Admin), Verdict::Allow);
        assert_eq!(verdict(Placed, Delivered, ActorRole::Admin), Verdict::Allow);
    }

    #[test]
    fn backward_and_unchanged_moves_are_illegal() {
        assert_eq!(verdict(Shipped, Processing, ActorRole::Admin), Verdict::Illegal);
        assert_eq!(verdict(Processing, Placed, ActorRole::Admin), Verdict::Illegal);
        assert_eq!(verdict(Shipped, Shipped, ActorRole::Vendor), Verdict::Illegal);
    }

    #[test]
    fn terminal_states_have_no_outgoing_transitions() {
        for role in [ActorRole::Customer, ActorRole::Vendor, ActorRole::Admin] {
            assert_ne!(verdict(Delivered, Cancelled, role), Verdict::Allow);
            assert_ne!(verdict(Cancelled, Processing, role), Verdict::Allow);
        }
    }

    #[test]
    fn cancellation_only_from_placed_or_processing() {
        assert_eq!(verdict(Placed, Cancelled, ActorRole::Customer), Verdict::Allow);
        assert_eq!(verdict(Processing, Cancelled, ActorRole::Vendor), Verdict::Allow);
        assert_eq!(verdict(Shipped, Cancelled, ActorRole::Admin), Verdict::Illegal);
    }

    #[test]
    fn customer_may_only_cancel() {
        assert_eq!(verdict(Placed, Processing, ActorRole::Customer), Verdict::Forbidden);
        assert_eq!(verdict(Shipped, Delivered, ActorRole::Customer), Verdict::Forbidden);
    }

    #[test]
    fn vendor_may_not_deliver() {
        assert_eq!(verdict(Shipped, Delivered, ActorRole::Vendor), Verdict::Forbidden);
        assert_eq!(verdict(Placed, Shipped, ActorRole::Vendor), Verdict::Allow);
    }

    #[test]
    fn system_never_drives_fulfillment() {
        assert_eq!(verdict(Placed, Processing, ActorRole::System), Verdict::Forbidden);
    }

    #[test]
    fn override_is_admin_only() {
        assert!(authorize(Delivered, Placed, ActorRole::Admin, true).is_ok());
        let err = authorize(Delivered, Placed, ActorRole::Vendor, true).unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    // ── item planning ────────────────────────────────────────────────────────

    #[test]
    fn vendor_change_updates_item_and_queues_notification() {
        let (mut order, vendor_a, _) = two_vendor_order();
        let item_id = order.items[0].id;

        let changes = plan_item_status(
            &order,
            item_id,
            Shipped,
            &Actor::vendor(vendor_a),
            false,
            Utc::now(),
        )
        .unwrap();
        apply(&mut order, changes);

        let item = order.item(item_id).unwrap();
        assert_eq!(item.status, Shipped);
        assert_eq!(item.history.last().unwrap().changed_by, ActorRole::Vendor);
        assert_eq!(order.vendor_notifications.len(), 1);
        let note = &order.vendor_notifications[0];
        assert_eq!((note.old_status, note.new_status), (Placed, Shipped));
        assert!(!note.seen_by_admin);
    }

    #[test]
    fn vendor_cannot_touch_another_vendors_item() {
        let (order, _, vendor_b) = two_vendor_order();
        let err = plan_item_status(
            &order,
            order.items[0].id,
            Processing,
            &Actor::vendor(vendor_b),
            false,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[test]
    fn customer_cancels_own_item_without_notification() {
        let mut order = sample_order(PaymentMethod::Cod);
        let customer = Actor::customer(order.customer_id);
        let item_id = order.items[0].id;

        let changes =
            plan_item_status(&order, item_id, Cancelled, &customer, false, Utc::now()).unwrap();
        apply(&mut order, changes);

        assert_eq!(order.item(item_id).unwrap().status, Cancelled);
        assert!(order.vendor_notifications.is_empty());
    }

    #[test]
    fn customer_cannot_cancel_someone_elses_order() {
        let order = sample_order(PaymentMethod::Cod);
        let err = plan_item_status(
            &order,
            order.items[0].id,
            Cancelled,
            &Actor::customer(Uuid::new_v4()),
            false,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[test]
    fn cancelling_delivered_item_is_rejected_and_history_untouched() {
        let mut order = sample_order(PaymentMethod::Cod);
        let admin = Actor::admin(Uuid::new_v4());
        let item_id = order.items[0].id;
        let changes =
            plan_item_status(&order, item_id, Delivered, &admin, false, Utc::now()).unwrap();
        apply(&mut order, changes);
        let history_before = order.item(item_id).unwrap().history.clone();

        let err = plan_item_status(
            &order,
            item_id,
            Cancelled,
            &Actor::customer(order.customer_id),
            false,
            Utc::now(),
        )
        .unwrap_err();

        assert!(matches!(err, DomainError::IllegalTransition { .. }));
        assert_eq!(order.item(item_id).unwrap().history, history_before);
    }

    #[test]
    fn admin_item_write_acknowledges_that_items_notifications() {
        let (mut order, vendor_a, vendor_b) = two_vendor_order();
        let first = order.items[0].id;
        let second = order.items[1].id;
        for (item, vendor) in [(first, vendor_a), (second, vendor_b)] {
            let changes = plan_item_status(
                &order,
                item,
                Processing,
                &Actor::vendor(vendor),
                false,
                Utc::now(),
            )
            .unwrap();
            apply(&mut order, changes);
        }

        let admin = Actor::admin(Uuid::new_v4());
        let changes =
            plan_item_status(&order, first, Shipped, &admin, false, Utc::now()).unwrap();
        apply(&mut order, changes);

        let pending: Vec<Uuid> = order.pending_notifications().map(|n| n.item_id).collect();
        assert_eq!(pending, vec![second]);
    }

    #[test]
    fn unpaid_gateway_order_rejects_fulfillment() {
        let order = sample_order(PaymentMethod::Gateway);
        let vendor = order.items[0].vendor_id.unwrap();
        let err = plan_item_status(
            &order,
            order.items[0].id,
            Processing,
            &Actor::vendor(vendor),
            false,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::PaymentPending));
    }

    #[test]
    fn unknown_item_is_not_found() {
        let order = sample_order(PaymentMethod::Cod);
        let err = plan_item_status(
            &order,
            Uuid::new_v4(),
            Processing,
            &Actor::admin(Uuid::new_v4()),
            false,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    // ── order planning ───────────────────────────────────────────────────────

    #[test]
    fn order_write_cascades_and_acknowledges_everything() {
        let (mut order, vendor_a, _) = two_vendor_order();
        let first = order.items[0].id;
        let changes = plan_item_status(
            &order,
            first,
            Shipped,
            &Actor::vendor(vendor_a),
            false,
            Utc::now(),
        )
        .unwrap();
        apply(&mut order, changes);

        let changes = plan_order_status(
            &order,
            Delivered,
            &Actor::admin(Uuid::new_v4()),
            false,
            Utc::now(),
        )
        .unwrap();
        apply(&mut order, changes);

        assert_eq!(order.order_status, OrderStatus::Delivered);
        assert!(order.items.iter().all(|i| i.status == Delivered));
        assert!(order.vendor_notifications.iter().all(|n| n.seen_by_admin));
        assert_eq!(
            order.history.last().unwrap().status,
            OrderStatus::Delivered
        );
    }

    #[test]
    fn order_write_skips_cancelled_items() {
        let (mut order, _, _) = two_vendor_order();
        let cancelled = order.items[1].id;
        let changes = plan_item_status(
            &order,
            cancelled,
            Cancelled,
            &Actor::customer(order.customer_id),
            false,
            Utc::now(),
        )
        .unwrap();
        apply(&mut order, changes);
        let history_len = order.item(cancelled).unwrap().history.len();

        let changes = plan_order_status(
            &order,
            Shipped,
            &Actor::admin(Uuid::new_v4()),
            false,
            Utc::now(),
        )
        .unwrap();
        apply(&mut order, changes);

        assert_eq!(order.items[0].status, Shipped);
        let skipped = order.item(cancelled).unwrap();
        assert_eq!(skipped.status, Cancelled);
        assert_eq!(skipped.history.len(), history_len);
    }

    #[test]
    fn order_write_rejects_illegal_item_move_as_a_whole() {
        let (mut order, _, _) = two_vendor_order();
        let admin = Actor::admin(Uuid::new_v4());
        let shipped = order.items[0].id;
        let changes = plan_item_status(&order, shipped, Shipped, &admin, false, Utc::now()).unwrap();
        apply(&mut order, changes);

        let err = plan_order_status(&order, Cancelled, &admin, false, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::IllegalTransition { .. }));
    }

    #[test]
    fn order_write_is_admin_only() {
        let order = sample_order(PaymentMethod::Cod);
        let err = plan_order_status(
            &order,
            Processing,
            &Actor::customer(order.customer_id),
            false,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[test]
    fn admin_override_reopens_terminal_order() {
        let mut order = sample_order(PaymentMethod::Cod);
        let admin = Actor::admin(Uuid::new_v4());
        let changes = plan_order_status(&order, Cancelled, &admin, false, Utc::now()).unwrap();
        apply(&mut order, changes);

        assert!(plan_order_status(&order, Processing, &admin, false, Utc::now()).is_err());
        let changes = plan_order_status(&order, Processing, &admin, true, Utc::now()).unwrap();
        apply(&mut order, changes);
        assert_eq!(order.order_status, OrderStatus::Processing);
        assert!(order.items.iter().all(|i| i.status == Processing));
    }

    #[test]
    fn item_histories_stay_monotone_through_a_full_lifecycle() {
        let (mut order, vendor_a, _) = two_vendor_order();
        let admin = Actor::admin(Uuid::new_v4());
        let item = order.items[0].id;
        for (status, actor) in [
            (Processing, Actor::vendor(vendor_a)),
            (Shipped, Actor::vendor(vendor_a)),
            (Delivered, admin),
        ] {
            let changes = plan_item_status(&order, item, status, &actor, false, Utc::now()).unwrap();
            apply(&mut order, changes);
        }

        let ranks: Vec<u8> = order
            .item(item)
            .unwrap()
            .history
            .iter()
            .map(|e| e.status.rank())
            .collect();
        assert!(ranks.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(ranks.len(), 4);
    }

    // ── acknowledgement / payment failure ────────────────────────────────────

    #[test]
    fn acknowledging_twice_is_a_no_op() {
        let (mut order, vendor_a, _) = two_vendor_order();
        let changes = plan_item_status(
            &order,
            order.items[0].id,
            Processing,
            &Actor::vendor(vendor_a),
            false,
            Utc::now(),
        )
        .unwrap();
        apply(&mut order, changes);
        let id = order.vendor_notifications[0].id;
        let admin = Actor::admin(Uuid::new_v4());

        let changes = plan_acknowledgement(&order, id, &admin).unwrap();
        apply(&mut order, changes);
        assert!(order.vendor_notifications[0].seen_by_admin);
        assert!(plan_acknowledgement(&order, id, &admin).unwrap().is_empty());
    }

    #[test]
    fn payment_failure_cancels_once() {
        let mut order = sample_order(PaymentMethod::Gateway);
        let changes = plan_payment_failure(&order, Utc::now());
        assert_eq!(changes.len(), 2);
        apply(&mut order, changes);
        assert_eq!(order.order_status, OrderStatus::Cancelled);
        assert!(plan_payment_failure(&order, Utc::now()).is_empty());
    }
}
