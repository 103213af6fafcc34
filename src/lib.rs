pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod gateway;
pub mod handlers;
pub mod infrastructure;
pub mod schema;
pub mod state;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use config::AppConfig;
pub use db::{create_pool, DbPool};
pub use state::AppState;

use handlers::{notifications, orders, payments};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), domain::errors::DomainError> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)
        .map(|_| ())
        .map_err(|e| domain::errors::DomainError::Internal(format!("migrations: {e}")))
}

/// Registers every route. Literal `/orders/...` segments are declared before
/// `/orders/{id}` so they are not captured as ids.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/orders")
            .route("", web::post().to(orders::create_order))
            .route("/my", web::get().to(orders::list_my_orders))
            .route("/admin", web::get().to(orders::list_admin_orders))
            .route("/vendor", web::get().to(orders::list_vendor_orders))
            .route("/{id}", web::get().to(orders::get_order))
            .route("/{id}/status", web::put().to(orders::update_order_status))
            .route(
                "/{order_id}/items/{item_id}/status",
                web::put().to(orders::update_item_status),
            )
            .route(
                "/{order_id}/notifications/{notification_id}/ack",
                web::put().to(orders::acknowledge_notification),
            ),
    )
    .service(
        web::scope("/notifications")
            .route("/pending", web::get().to(notifications::pending_notifications)),
    )
    .service(
        web::scope("/payments")
            .route("/verify", web::post().to(payments::verify_payment))
            .route("/return", web::get().to(payments::payment_return))
            .route("/webhook", web::post().to(payments::payment_webhook)),
    );
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    state: AppState,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let openapi = handlers::ApiDoc::openapi();
    let state = web::Data::new(state);

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(configure)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
