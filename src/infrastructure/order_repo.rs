use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    ActorRole, HistoryEntry, ItemStatus, ListResult, Order, OrderChange, OrderItem, OrderQuery,
    OrderScope, OrderStatus, PaymentCapture, PaymentMethod, PaymentStatus, PendingNotification,
    ShippingAddress, VendorNotification,
};
use crate::domain::ports::{ChangePlan, OrderStore, PaymentTransition};
use crate::schema::{order_history, order_items, orders, vendor_notifications};

use super::models::{HistoryRow, NewHistoryRow, NotificationRow, OrderItemRow, OrderRow};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

/// Parses a stored enum column. A value the domain does not know is a
/// storage fault, not caller input.
fn column<T>(value: &str) -> Result<T, DomainError>
where
    T: FromStr<Err = DomainError>,
{
    value
        .parse()
        .map_err(|e: DomainError| DomainError::Internal(format!("corrupt order row: {e}")))
}

// ── Row mapping ──────────────────────────────────────────────────────────────

fn order_row(order: &Order) -> OrderRow {
    let address = &order.shipping_address;
    OrderRow {
        id: order.id,
        customer_id: order.customer_id,
        total_amount: order.total_amount.clone(),
        payment_status: order.payment_status.as_str().to_string(),
        payment_method: order.payment_method.as_str().to_string(),
        gateway_order_ref: order.gateway_order_ref.clone(),
        gateway_payment_ref: order.gateway_payment_ref.clone(),
        gateway_signature: order.gateway_signature.clone(),
        transaction_id: order.transaction_id.clone(),
        order_status: order.order_status.as_str().to_string(),
        ship_name: address.name.clone(),
        ship_phone: address.phone.clone(),
        ship_street: address.street.clone(),
        ship_city: address.city.clone(),
        ship_state: address.state.clone(),
        ship_postal_code: address.postal_code.clone(),
        created_at: order.created_at,
        updated_at: order.updated_at,
    }
}

fn item_rows(order: &Order) -> Vec<OrderItemRow> {
    order
        .items
        .iter()
        .enumerate()
        .map(|(position, item)| OrderItemRow {
            id: item.id,
            order_id: order.id,
            position: position as i32,
            product_id: item.product_id,
            vendor_id: item.vendor_id,
            vendor_name: item.vendor_name.clone(),
            title: item.title.clone(),
            image: item.image.clone(),
            quantity: item.quantity,
            price: item.price.clone(),
            status: item.status.as_str().to_string(),
        })
        .collect()
}

fn history_rows(order: &Order) -> Vec<NewHistoryRow<'static>> {
    let order_level = order.history.iter().map(|entry| NewHistoryRow {
        order_id: order.id,
        item_id: None,
        status: entry.status.as_str(),
        changed_by: entry.changed_by.as_str(),
        changed_at: entry.changed_at,
    });
    let item_level = order.items.iter().flat_map(|item| {
        item.history.iter().map(move |entry| NewHistoryRow {
            order_id: order.id,
            item_id: Some(item.id),
            status: entry.status.as_str(),
            changed_by: entry.changed_by.as_str(),
            changed_at: entry.changed_at,
        })
    });
    order_level.chain(item_level).collect()
}

fn notification_row(order_id: Uuid, n: &VendorNotification) -> NotificationRow {
    NotificationRow {
        id: n.id,
        order_id,
        item_id: n.item_id,
        vendor_id: n.vendor_id,
        old_status: n.old_status.as_str().to_string(),
        new_status: n.new_status.as_str().to_string(),
        seen_by_admin: n.seen_by_admin,
        created_at: n.created_at,
    }
}

fn notification(row: NotificationRow) -> Result<VendorNotification, DomainError> {
    Ok(VendorNotification {
        id: row.id,
        item_id: row.item_id,
        vendor_id: row.vendor_id,
        old_status: column(&row.old_status)?,
        new_status: column(&row.new_status)?,
        created_at: row.created_at,
        seen_by_admin: row.seen_by_admin,
    })
}

fn assemble(
    row: OrderRow,
    items: Vec<OrderItemRow>,
    history: Vec<HistoryRow>,
    notifications: Vec<NotificationRow>,
) -> Result<Order, DomainError> {
    let mut order_history: Vec<HistoryEntry<OrderStatus>> = Vec::new();
    let mut item_history: HashMap<Uuid, Vec<HistoryEntry<ItemStatus>>> = HashMap::new();
    for entry in history {
        let changed_by: ActorRole = column(&entry.changed_by)?;
        match entry.item_id {
            None => order_history.push(HistoryEntry::new(
                column(&entry.status)?,
                changed_by,
                entry.changed_at,
            )),
            Some(item_id) => item_history.entry(item_id).or_default().push(HistoryEntry::new(
                column(&entry.status)?,
                changed_by,
                entry.changed_at,
            )),
        }
    }

    let items = items
        .into_iter()
        .map(|item| {
            Ok(OrderItem {
                history: item_history.remove(&item.id).unwrap_or_default(),
                status: column(&item.status)?,
                id: item.id,
                product_id: item.product_id,
                vendor_id: item.vendor_id,
                vendor_name: item.vendor_name,
                title: item.title,
                image: item.image,
                quantity: item.quantity,
                price: item.price,
            })
        })
        .collect::<Result<Vec<_>, DomainError>>()?;

    Ok(Order {
        id: row.id,
        customer_id: row.customer_id,
        items,
        total_amount: row.total_amount,
        payment_status: column::<PaymentStatus>(&row.payment_status)?,
        payment_method: column::<PaymentMethod>(&row.payment_method)?,
        gateway_order_ref: row.gateway_order_ref,
        gateway_payment_ref: row.gateway_payment_ref,
        gateway_signature: row.gateway_signature,
        transaction_id: row.transaction_id,
        order_status: column(&row.order_status)?,
        history: order_history,
        vendor_notifications: notifications
            .into_iter()
            .map(notification)
            .collect::<Result<Vec<_>, DomainError>>()?,
        shipping_address: ShippingAddress {
            name: row.ship_name,
            phone: row.ship_phone,
            street: row.ship_street,
            city: row.ship_city,
            state: row.ship_state,
            postal_code: row.ship_postal_code,
        },
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

/// Loads the child rows of `rows` in three queries and stitches the aggregates.
fn hydrate(conn: &mut PgConnection, rows: Vec<OrderRow>) -> Result<Vec<Order>, DomainError> {
    let items = OrderItemRow::belonging_to(&rows)
        .select(OrderItemRow::as_select())
        .order(order_items::position.asc())
        .load(conn)?;
    let history = HistoryRow::belonging_to(&rows)
        .select(HistoryRow::as_select())
        .order(order_history::id.asc())
        .load(conn)?;
    let notifications = NotificationRow::belonging_to(&rows)
        .select(NotificationRow::as_select())
        .order(vendor_notifications::created_at.asc())
        .load(conn)?;

    let items = items.grouped_by(&rows);
    let history = history.grouped_by(&rows);
    let notifications = notifications.grouped_by(&rows);

    rows.into_iter()
        .zip(items)
        .zip(history)
        .zip(notifications)
        .map(|(((row, items), history), notifications)| {
            assemble(row, items, history, notifications)
        })
        .collect()
}

fn load_one(conn: &mut PgConnection, row: Option<OrderRow>) -> Result<Option<Order>, DomainError> {
    match row {
        Some(row) => Ok(hydrate(conn, vec![row])?.pop()),
        None => Ok(None),
    }
}

fn scoped(scope: OrderScope) -> orders::BoxedQuery<'static, Pg> {
    let settled = orders::payment_status
        .eq(PaymentStatus::Paid.as_str())
        .or(orders::payment_method.eq(PaymentMethod::Cod.as_str()));
    let query = orders::table.filter(settled).into_boxed();

    match scope {
        OrderScope::Customer(customer_id) => query.filter(orders::customer_id.eq(customer_id)),
        OrderScope::Vendor(vendor_id) => query.filter(
            orders::id.eq_any(
                order_items::table
                    .filter(order_items::vendor_id.eq(vendor_id))
                    .select(order_items::order_id),
            ),
        ),
        OrderScope::All => query,
    }
}

fn history_insert(
    conn: &mut PgConnection,
    order_id: Uuid,
    item_id: Option<Uuid>,
    status: &str,
    changed_by: ActorRole,
    changed_at: DateTime<Utc>,
) -> QueryResult<usize> {
    diesel::insert_into(order_history::table)
        .values(&NewHistoryRow {
            order_id,
            item_id,
            status,
            changed_by: changed_by.as_str(),
            changed_at,
        })
        .execute(conn)
}

/// Writes one planned change as a targeted update or an append.
fn write_change(conn: &mut PgConnection, order_id: Uuid, change: &OrderChange) -> QueryResult<()> {
    match change {
        OrderChange::SetOrderStatus(status) => {
            diesel::update(orders::table.find(order_id))
                .set(orders::order_status.eq(status.as_str()))
                .execute(conn)?;
        }
        OrderChange::SetItemStatus { item_id, status } => {
            diesel::update(
                order_items::table
                    .filter(order_items::id.eq(*item_id))
                    .filter(order_items::order_id.eq(order_id)),
            )
            .set(order_items::status.eq(status.as_str()))
            .execute(conn)?;
        }
        OrderChange::AppendOrderHistory(entry) => {
            history_insert(
                conn,
                order_id,
                None,
                entry.status.as_str(),
                entry.changed_by,
                entry.changed_at,
            )?;
        }
        OrderChange::AppendItemHistory { item_id, entry } => {
            history_insert(
                conn,
                order_id,
                Some(*item_id),
                entry.status.as_str(),
                entry.changed_by,
                entry.changed_at,
            )?;
        }
        OrderChange::AddNotification(n) => {
            diesel::insert_into(vendor_notifications::table)
                .values(&notification_row(order_id, n))
                .execute(conn)?;
        }
        OrderChange::AcknowledgeNotifications(ids) => {
            diesel::update(
                vendor_notifications::table
                    .filter(vendor_notifications::order_id.eq(order_id))
                    .filter(vendor_notifications::id.eq_any(ids.clone())),
            )
            .set(vendor_notifications::seen_by_admin.eq(true))
            .execute(conn)?;
        }
    }
    Ok(())
}

// ── Store ────────────────────────────────────────────────────────────────────

/// Postgres order store. Children live in their own tables but are only ever
/// written inside a transaction holding the order row lock.
pub struct DieselOrderStore {
    pool: DbPool,
}

impl DieselOrderStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OrderStore for DieselOrderStore {
    fn insert(&self, order: &Order) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            diesel::insert_into(orders::table)
                .values(&order_row(order))
                .execute(conn)?;

            let items = item_rows(order);
            if !items.is_empty() {
                diesel::insert_into(order_items::table)
                    .values(&items)
                    .execute(conn)?;
            }

            let history = history_rows(order);
            if !history.is_empty() {
                diesel::insert_into(order_history::table)
                    .values(&history)
                    .execute(conn)?;
            }

            let notifications: Vec<NotificationRow> = order
                .vendor_notifications
                .iter()
                .map(|n| notification_row(order.id, n))
                .collect();
            if !notifications.is_empty() {
                diesel::insert_into(vendor_notifications::table)
                    .values(&notifications)
                    .execute(conn)?;
            }
            Ok(())
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = orders::table
            .find(id)
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;
        load_one(&mut conn, row)
    }

    fn find_by_gateway_ref(&self, gateway_order_ref: &str) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = orders::table
            .filter(orders::gateway_order_ref.eq(gateway_order_ref))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;
        load_one(&mut conn, row)
    }

    fn list(&self, query: &OrderQuery) -> Result<ListResult, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = scoped(query.scope).count().get_result(conn)?;

            let rows = scoped(query.scope)
                .select(OrderRow::as_select())
                .order(orders::created_at.desc())
                .limit(query.limit)
                .offset(query.offset())
                .load(conn)?;

            Ok(ListResult {
                items: hydrate(conn, rows)?,
                total,
            })
        })
    }

    fn mark_paid(
        &self,
        id: Uuid,
        capture: &PaymentCapture,
        at: DateTime<Utc>,
    ) -> Result<PaymentTransition, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let row = orders::table
                .find(id)
                .select(OrderRow::as_select())
                .for_update()
                .first(conn)
                .optional()?;
            let mut order = load_one(conn, row)?.ok_or(DomainError::NotFound("Order"))?;
            let previous_status = order.order_status;

            if !order.record_payment(capture, at) {
                return Ok(PaymentTransition::AlreadyPaid(order));
            }

            let updated = diesel::update(
                orders::table
                    .filter(orders::id.eq(id))
                    .filter(orders::payment_status.eq(PaymentStatus::Pending.as_str())),
            )
            .set((
                orders::payment_status.eq(PaymentStatus::Paid.as_str()),
                orders::gateway_payment_ref.eq(Some(capture.gateway_payment_ref.as_str())),
                orders::transaction_id.eq(Some(capture.transaction_id.as_str())),
                orders::gateway_signature.eq(capture.signature.as_deref()),
                orders::order_status.eq(order.order_status.as_str()),
                orders::updated_at.eq(at),
            ))
            .execute(conn)?;
            if updated != 1 {
                return Err(DomainError::Internal(format!(
                    "payment status of order {id} changed under row lock"
                )));
            }

            if order.order_status != previous_status {
                history_insert(
                    conn,
                    id,
                    None,
                    order.order_status.as_str(),
                    ActorRole::System,
                    at,
                )?;
            }

            Ok(PaymentTransition::Applied {
                order,
                previous_status,
            })
        })
    }

    fn apply(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        plan: ChangePlan<'_>,
    ) -> Result<Order, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let row = orders::table
                .find(id)
                .select(OrderRow::as_select())
                .for_update()
                .first(conn)
                .optional()?;
            let mut order = load_one(conn, row)?.ok_or(DomainError::NotFound("Order"))?;

            let changes = plan(&order)?;
            if changes.is_empty() {
                return Ok(order);
            }
            for change in &changes {
                write_change(conn, id, change)?;
            }
            diesel::update(orders::table.find(id))
                .set(orders::updated_at.eq(at))
                .execute(conn)?;

            order.apply_all(&changes, at);
            Ok(order)
        })
    }

    fn pending_notifications(&self) -> Result<Vec<PendingNotification>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows: Vec<(NotificationRow, String, Option<String>)> = vendor_notifications::table
            .inner_join(order_items::table)
            .filter(vendor_notifications::seen_by_admin.eq(false))
            .order(vendor_notifications::created_at.asc())
            .select((
                NotificationRow::as_select(),
                order_items::title,
                order_items::vendor_name,
            ))
            .load(&mut conn)?;

        rows.into_iter()
            .map(|(row, title, vendor_name)| {
                Ok(PendingNotification {
                    order_id: row.order_id,
                    notification_id: row.id,
                    item_id: row.item_id,
                    product_title: Some(title),
                    vendor_id: row.vendor_id,
                    vendor_name,
                    old_status: column(&row.old_status)?,
                    new_status: column(&row.new_status)?,
                    created_at: row.created_at,
                })
            })
            .collect()
    }
}
