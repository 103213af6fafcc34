use std::sync::Arc;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::blocking;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    Actor, ActorRole, HistoryEntry, ItemStatus, Order, OrderItem, OrderStatus, PaymentMethod,
    PaymentStatus, ShippingAddress,
};
use crate::domain::ports::{Catalog, OrderStore};
use crate::gateway::{PaymentGateway, RemoteIntent};

#[derive(Debug, Clone)]
pub struct CheckoutLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutLine>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub order_id: Uuid,
    pub gateway_order_ref: Option<String>,
    pub amount: BigDecimal,
    pub currency: String,
}

#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn OrderStore>,
    catalog: Arc<dyn Catalog>,
    gateway: Arc<dyn PaymentGateway>,
    currency: String,
}

impl CheckoutService {
    pub fn new(
        store: Arc<dyn OrderStore>,
        catalog: Arc<dyn Catalog>,
        gateway: Arc<dyn PaymentGateway>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            store,
            catalog,
            gateway,
            currency: currency.into(),
        }
    }

    /// Creates an order from catalog snapshots. Gateway orders get a remote
    /// intent first; if the gateway cannot be reached nothing is persisted.
    pub async fn create_order(
        &self,
        actor: Actor,
        request: CheckoutRequest,
    ) -> Result<CheckoutReceipt, DomainError> {
        if actor.role != ActorRole::Customer {
            return Err(DomainError::Forbidden(
                "only customers may place orders".to_string(),
            ));
        }
        validate(&request)?;

        let now = Utc::now();
        let catalog = Arc::clone(&self.catalog);
        let lines = request.items.clone();
        let items = blocking(move || snapshot_items(catalog.as_ref(), &lines, now)).await?;
        let total = items
            .iter()
            .fold(BigDecimal::zero(), |acc, item| acc + item.line_total());

        let order_id = Uuid::new_v4();
        let intent = match request.payment_method {
            PaymentMethod::Gateway => Some(
                self.gateway
                    .create_remote_intent(&total, &self.currency, &order_id.to_string())
                    .await
                    .map_err(|e| {
                        log::warn!("Checkout aborted, could not open gateway intent: {}", e);
                        DomainError::from(e)
                    })?,
            ),
            PaymentMethod::Cod => None,
        };

        let order = build_order(
            order_id,
            actor.id,
            items,
            total,
            request,
            intent.as_ref(),
            now,
        );
        let receipt = CheckoutReceipt {
            order_id,
            gateway_order_ref: order.gateway_order_ref.clone(),
            amount: order.total_amount.clone(),
            currency: self.currency.clone(),
        };

        let store = Arc::clone(&self.store);
        blocking(move || store.insert(&order)).await?;

        log::info!(
            "Created order {} for customer {} ({} {})",
            receipt.order_id,
            actor.id,
            receipt.amount,
            receipt.currency
        );
        Ok(receipt)
    }
}

fn validate(request: &CheckoutRequest) -> Result<(), DomainError> {
    if request.items.is_empty() {
        return Err(DomainError::InvalidInput("order has no items".to_string()));
    }
    if let Some(line) = request.items.iter().find(|l| l.quantity <= 0) {
        return Err(DomainError::InvalidInput(format!(
            "quantity for product {} must be positive",
            line.product_id
        )));
    }
    request.shipping_address.validate()
}

fn snapshot_items(
    catalog: &dyn Catalog,
    lines: &[CheckoutLine],
    now: DateTime<Utc>,
) -> Result<Vec<OrderItem>, DomainError> {
    lines
        .iter()
        .map(|line| {
            let product = catalog.get_product(line.product_id)?.ok_or_else(|| {
                DomainError::InvalidInput(format!("unknown product {}", line.product_id))
            })?;
            if product.price <= BigDecimal::zero() {
                return Err(DomainError::InvalidInput(format!(
                    "product {} has no valid price",
                    product.id
                )));
            }
            Ok(OrderItem {
                id: Uuid::new_v4(),
                product_id: product.id,
                vendor_id: product.vendor_id,
                vendor_name: product.vendor_name,
                title: product.title,
                image: product.image,
                quantity: line.quantity,
                price: product.price,
                status: ItemStatus::Placed,
                history: vec![HistoryEntry::new(
                    ItemStatus::Placed,
                    ActorRole::Customer,
                    now,
                )],
            })
        })
        .collect()
}

fn build_order(
    id: Uuid,
    customer_id: Uuid,
    items: Vec<OrderItem>,
    total_amount: BigDecimal,
    request: CheckoutRequest,
    intent: Option<&RemoteIntent>,
    now: DateTime<Utc>,
) -> Order {
    let (order_status, created_by) = match request.payment_method {
        PaymentMethod::Gateway => (OrderStatus::AwaitingPayment, ActorRole::System),
        PaymentMethod::Cod => (OrderStatus::Placed, ActorRole::Customer),
    };
    Order {
        id,
        customer_id,
        items,
        total_amount,
        payment_status: PaymentStatus::Pending,
        payment_method: request.payment_method,
        gateway_order_ref: intent.map(|i| i.gateway_order_ref.clone()),
        gateway_payment_ref: None,
        gateway_signature: None,
        transaction_id: None,
        order_status,
        history: vec![HistoryEntry::new(order_status, created_by, now)],
        vendor_notifications: Vec::new(),
        shipping_address: request.shipping_address,
        created_at: now,
        updated_at: now,
    }
}
