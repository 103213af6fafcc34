use actix_web::{web, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::order::{Actor, PendingNotification};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct PendingNotificationResponse {
    pub order_id: Uuid,
    pub notification_id: Uuid,
    pub item_id: Uuid,
    pub product_title: Option<String>,
    pub vendor_id: Uuid,
    pub vendor_name: Option<String>,
    pub old_status: String,
    pub new_status: String,
    pub created_at: String,
}

impl From<PendingNotification> for PendingNotificationResponse {
    fn from(n: PendingNotification) -> Self {
        PendingNotificationResponse {
            order_id: n.order_id,
            notification_id: n.notification_id,
            item_id: n.item_id,
            product_title: n.product_title,
            vendor_id: n.vendor_id,
            vendor_name: n.vendor_name,
            old_status: n.old_status.to_string(),
            new_status: n.new_status.to_string(),
            created_at: n.created_at.to_rfc3339(),
        }
    }
}

/// GET /notifications/pending
///
/// Vendor status changes no admin has acknowledged yet, oldest first.
#[utoipa::path(
    get,
    path = "/notifications/pending",
    responses(
        (status = 200, description = "Pending vendor notifications", body = [PendingNotificationResponse]),
        (status = 403, description = "Not an admin"),
    ),
    tag = "notifications"
)]
pub async fn pending_notifications(
    state: web::Data<AppState>,
    actor: Actor,
) -> Result<HttpResponse, AppError> {
    let pending = state.fulfillment.pending_notifications(actor).await?;
    let body: Vec<PendingNotificationResponse> = pending
        .into_iter()
        .map(PendingNotificationResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(body))
}
