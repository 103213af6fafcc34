use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

// ── Status enums ─────────────────────────────────────────────────────────────

/// Fulfillment status of a single line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Placed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl ItemStatus {
    pub const ALL: [ItemStatus; 5] = [
        ItemStatus::Placed,
        ItemStatus::Processing,
        ItemStatus::Shipped,
        ItemStatus::Delivered,
        ItemStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Placed => "placed",
            ItemStatus::Processing => "processing",
            ItemStatus::Shipped => "shipped",
            ItemStatus::Delivered => "delivered",
            ItemStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ItemStatus::Delivered | ItemStatus::Cancelled)
    }

    /// Position on the forward path `placed < processing < shipped < delivered`.
    /// `Cancelled` sorts last.
    pub fn rank(self) -> u8 {
        match self {
            ItemStatus::Placed => 0,
            ItemStatus::Processing => 1,
            ItemStatus::Shipped => 2,
            ItemStatus::Delivered => 3,
            ItemStatus::Cancelled => 4,
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::InvalidInput(format!("unknown status '{s}'")))
    }
}

/// Order-level rollup status. `AwaitingPayment` only exists at order level:
/// a gateway order sits there until reconciliation places it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    AwaitingPayment,
    Placed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::AwaitingPayment => "awaiting_payment",
            other => other.fulfillment().map(ItemStatus::as_str).unwrap_or_default(),
        }
    }

    /// The fulfillment status this order status corresponds to, if any.
    pub fn fulfillment(self) -> Option<ItemStatus> {
        match self {
            OrderStatus::AwaitingPayment => None,
            OrderStatus::Placed => Some(ItemStatus::Placed),
            OrderStatus::Processing => Some(ItemStatus::Processing),
            OrderStatus::Shipped => Some(ItemStatus::Shipped),
            OrderStatus::Delivered => Some(ItemStatus::Delivered),
            OrderStatus::Cancelled => Some(ItemStatus::Cancelled),
        }
    }
}

impl From<ItemStatus> for OrderStatus {
    fn from(status: ItemStatus) -> Self {
        match status {
            ItemStatus::Placed => OrderStatus::Placed,
            ItemStatus::Processing => OrderStatus::Processing,
            ItemStatus::Shipped => OrderStatus::Shipped,
            ItemStatus::Delivered => OrderStatus::Delivered,
            ItemStatus::Cancelled => OrderStatus::Cancelled,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "awaiting_payment" => Ok(OrderStatus::AwaitingPayment),
            other => other.parse::<ItemStatus>().map(OrderStatus::from),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            other => Err(DomainError::InvalidInput(format!(
                "unknown payment status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery.
    Cod,
    Gateway,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Cod => "cod",
            PaymentMethod::Gateway => "gateway",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cod" => Ok(PaymentMethod::Cod),
            "gateway" | "razorpay" => Ok(PaymentMethod::Gateway),
            other => Err(DomainError::InvalidInput(format!(
                "unknown payment method '{other}'"
            ))),
        }
    }
}

// ── Actors ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Customer,
    Vendor,
    Admin,
    /// Payment reconciliation; never arrives over HTTP.
    System,
}

impl ActorRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ActorRole::Customer => "customer",
            ActorRole::Vendor => "vendor",
            ActorRole::Admin => "admin",
            ActorRole::System => "system",
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(ActorRole::Customer),
            "vendor" => Ok(ActorRole::Vendor),
            "admin" => Ok(ActorRole::Admin),
            "system" => Ok(ActorRole::System),
            other => Err(DomainError::InvalidInput(format!("unknown role '{other}'"))),
        }
    }
}

/// An authenticated caller, as established upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(id: Uuid, role: ActorRole) -> Self {
        Self { id, role }
    }

    pub fn customer(id: Uuid) -> Self {
        Self::new(id, ActorRole::Customer)
    }

    pub fn vendor(id: Uuid) -> Self {
        Self::new(id, ActorRole::Vendor)
    }

    pub fn admin(id: Uuid) -> Self {
        Self::new(id, ActorRole::Admin)
    }
}

// ── Aggregate ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry<S> {
    pub status: S,
    pub changed_at: DateTime<Utc>,
    pub changed_by: ActorRole,
}

impl<S> HistoryEntry<S> {
    pub fn new(status: S, changed_by: ActorRole, changed_at: DateTime<Utc>) -> Self {
        Self {
            status,
            changed_at,
            changed_by,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub name: String,
    pub phone: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

impl ShippingAddress {
    pub fn validate(&self) -> Result<(), DomainError> {
        let fields = [
            ("name", &self.name),
            ("phone", &self.phone),
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("postal_code", &self.postal_code),
        ];
        match fields.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(DomainError::InvalidInput(format!(
                "shipping address is missing '{field}'"
            ))),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub vendor_id: Option<Uuid>,
    pub vendor_name: Option<String>,
    pub title: String,
    pub image: Option<String>,
    pub quantity: i32,
    /// Unit price captured when the order was created.
    pub price: BigDecimal,
    pub status: ItemStatus,
    pub history: Vec<HistoryEntry<ItemStatus>>,
}

impl OrderItem {
    pub fn line_total(&self) -> BigDecimal {
        &self.price * BigDecimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorNotification {
    pub id: Uuid,
    pub item_id: Uuid,
    pub vendor_id: Uuid,
    pub old_status: ItemStatus,
    pub new_status: ItemStatus,
    pub created_at: DateTime<Utc>,
    pub seen_by_admin: bool,
}

/// Gateway references written by the reconciliation transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentCapture {
    pub gateway_payment_ref: String,
    pub transaction_id: String,
    pub signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub items: Vec<OrderItem>,
    pub total_amount: BigDecimal,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub gateway_order_ref: Option<String>,
    pub gateway_payment_ref: Option<String>,
    pub gateway_signature: Option<String>,
    pub transaction_id: Option<String>,
    pub order_status: OrderStatus,
    pub history: Vec<HistoryEntry<OrderStatus>>,
    pub vendor_notifications: Vec<VendorNotification>,
    pub shipping_address: ShippingAddress,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single additive mutation of an order, planned against its current state.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderChange {
    SetOrderStatus(OrderStatus),
    SetItemStatus {
        item_id: Uuid,
        status: ItemStatus,
    },
    AppendOrderHistory(HistoryEntry<OrderStatus>),
    AppendItemHistory {
        item_id: Uuid,
        entry: HistoryEntry<ItemStatus>,
    },
    AddNotification(VendorNotification),
    AcknowledgeNotifications(Vec<Uuid>),
}

impl Order {
    pub fn item(&self, item_id: Uuid) -> Option<&OrderItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    pub fn pending_notifications(&self) -> impl Iterator<Item = &VendorNotification> {
        self.vendor_notifications.iter().filter(|n| !n.seen_by_admin)
    }

    /// Gateway order whose payment has not been confirmed.
    pub fn awaits_payment(&self) -> bool {
        self.payment_method == PaymentMethod::Gateway
            && self.payment_status == PaymentStatus::Pending
    }

    /// Visible in the regular order listings: paid, or cash on delivery.
    pub fn is_settled(&self) -> bool {
        self.payment_status == PaymentStatus::Paid || self.payment_method == PaymentMethod::Cod
    }

    pub fn has_vendor_items(&self, vendor_id: Uuid) -> bool {
        self.items
            .iter()
            .any(|item| item.vendor_id == Some(vendor_id))
    }

    pub fn computed_total(&self) -> BigDecimal {
        self.items
            .iter()
            .fold(BigDecimal::zero(), |acc, item| acc + item.line_total())
    }

    /// Whether a captured payment moves the order to `placed`. Only orders
    /// still awaiting payment, or cancelled by the system after a failed
    /// payment, are re-placed; a status an admin chose is kept.
    pub fn placed_by_payment(&self) -> bool {
        match self.order_status {
            OrderStatus::AwaitingPayment => true,
            OrderStatus::Cancelled => self.history.last().is_some_and(|h| {
                h.status == OrderStatus::Cancelled && h.changed_by == ActorRole::System
            }),
            _ => false,
        }
    }

    /// Compare-and-set `pending -> paid`. Returns `false` when payment was
    /// already recorded, leaving the order untouched.
    pub fn record_payment(&mut self, capture: &PaymentCapture, at: DateTime<Utc>) -> bool {
        if self.payment_status != PaymentStatus::Pending {
            return false;
        }
        let placed = self.placed_by_payment();
        self.payment_status = PaymentStatus::Paid;
        self.gateway_payment_ref = Some(capture.gateway_payment_ref.clone());
        self.transaction_id = Some(capture.transaction_id.clone());
        self.gateway_signature = capture.signature.clone();
        if placed {
            self.order_status = OrderStatus::Placed;
            self.history
                .push(HistoryEntry::new(OrderStatus::Placed, ActorRole::System, at));
        }
        self.updated_at = at;
        true
    }

    pub fn apply(&mut self, change: &OrderChange) {
        match change {
            OrderChange::SetOrderStatus(status) => self.order_status = *status,
            OrderChange::SetItemStatus { item_id, status } => {
                if let Some(item) = self.items.iter_mut().find(|i| i.id == *item_id) {
                    item.status = *status;
                }
            }
            OrderChange::AppendOrderHistory(entry) => self.history.push(entry.clone()),
            OrderChange::AppendItemHistory { item_id, entry } => {
                if let Some(item) = self.items.iter_mut().find(|i| i.id == *item_id) {
                    item.history.push(entry.clone());
                }
            }
            OrderChange::AddNotification(notification) => {
                self.vendor_notifications.push(notification.clone())
            }
            OrderChange::AcknowledgeNotifications(ids) => {
                for notification in self
                    .vendor_notifications
                    .iter_mut()
                    .filter(|n| ids.contains(&n.id))
                {
                    notification.seen_by_admin = true;
                }
            }
        }
    }

    pub fn apply_all(&mut self, changes: &[OrderChange], at: DateTime<Utc>) {
        for change in changes {
            self.apply(change);
        }
        if !changes.is_empty() {
            self.updated_at = at;
        }
    }
}

// ── Read models ──────────────────────────────────────────────────────────────

/// Flattened pending notification, as listed for admins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingNotification {
    pub order_id: Uuid,
    pub notification_id: Uuid,
    pub item_id: Uuid,
    pub product_title: Option<String>,
    pub vendor_id: Uuid,
    pub vendor_name: Option<String>,
    pub old_status: ItemStatus,
    pub new_status: ItemStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    Customer(Uuid),
    Vendor(Uuid),
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderQuery {
    pub scope: OrderScope,
    pub page: i64,
    pub limit: i64,
}

impl OrderQuery {
    /// Rows to skip. Saturates so an oversized page reads past the end
    /// instead of wrapping negative.
    pub fn offset(&self) -> i64 {
        self.page
            .max(1)
            .saturating_sub(1)
            .saturating_mul(self.limit.max(0))
    }

    /// Whether `order` belongs in this query's result set.
    pub fn matches(&self, order: &Order) -> bool {
        order.is_settled()
            && match self.scope {
                OrderScope::Customer(id) => order.customer_id == id,
                OrderScope::Vendor(id) => order.has_vendor_items(id),
                OrderScope::All => true,
            }
    }
}

#[derive(Debug, Clone)]
pub struct ListResult {
    pub items: Vec<Order>,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_status_parses_every_variant() {
        for status in ItemStatus::ALL {
            assert_eq!(status.as_str().parse::<ItemStatus>().unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_invalid_input() {
        let err = "returned".parse::<ItemStatus>().unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[test]
    fn order_status_round_trips_awaiting_payment() {
        let status: OrderStatus = "awaiting_payment".parse().unwrap();
        assert_eq!(status, OrderStatus::AwaitingPayment);
        assert_eq!(status.to_string(), "awaiting_payment");
        assert_eq!(status.fulfillment(), None);
    }

    #[test]
    fn legacy_gateway_name_parses_as_gateway() {
        assert_eq!(
            "razorpay".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::Gateway
        );
    }

    #[test]
    fn blank_address_field_is_rejected() {
        let address = ShippingAddress {
            name: "Asha".into(),
            phone: "9999999999".into(),
            street: "  ".into(),
            city: "Pune".into(),
            state: "MH".into(),
            postal_code: "411001".into(),
        };
        let err = address.validate().unwrap_err();
        assert!(err.to_string().contains("street"));
    }

    #[test]
    fn oversized_page_offset_saturates() {
        let query = OrderQuery {
            scope: OrderScope::All,
            page: i64::MAX,
            limit: 100,
        };
        assert_eq!(query.offset(), i64::MAX);

        let first = OrderQuery { page: 1, ..query };
        assert_eq!(first.offset(), 0);
        let third = OrderQuery { page: 3, limit: 20, ..query };
        assert_eq!(third.offset(), 40);
    }

    fn capture() -> PaymentCapture {
        PaymentCapture {
            gateway_payment_ref: "pay_late".into(),
            transaction_id: "pay_late".into(),
            signature: None,
        }
    }

    #[test]
    fn payment_after_system_cancel_places_order() {
        let mut order = crate::domain::testing::sample_order(PaymentMethod::Gateway);
        order.order_status = OrderStatus::Cancelled;
        order.history.push(HistoryEntry::new(
            OrderStatus::Cancelled,
            ActorRole::System,
            Utc::now(),
        ));

        assert!(order.record_payment(&capture(), Utc::now()));
        assert_eq!(order.order_status, OrderStatus::Placed);
        assert_eq!(order.history.last().map(|h| h.status), Some(OrderStatus::Placed));
    }

    #[test]
    fn payment_keeps_status_chosen_by_admin() {
        for status in [OrderStatus::Cancelled, OrderStatus::Shipped] {
            let mut order = crate::domain::testing::sample_order(PaymentMethod::Gateway);
            order.order_status = status;
            order
                .history
                .push(HistoryEntry::new(status, ActorRole::Admin, Utc::now()));
            let history_len = order.history.len();

            assert!(order.record_payment(&capture(), Utc::now()));
            assert_eq!(order.payment_status, PaymentStatus::Paid);
            assert_eq!(order.order_status, status);
            assert_eq!(order.history.len(), history_len);
        }
    }
}
