pub mod assembly;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod numbering;
pub mod repo;
pub mod schema;
pub mod uploads;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use db::{create_pool, DbPool};
pub use uploads::BillStore;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::purchase::health,
        handlers::purchase::create_purchase,
        handlers::purchase::list_purchases,
    ),
    components(schemas(
        handlers::purchase::CreatePurchaseResponse,
        handlers::purchase::PurchaseOrderResponse,
        handlers::purchase::ListPurchasesResponse,
    )),
    tags(
        (name = "purchase", description = "Purchase order recording"),
        (name = "health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) {
    let mut conn = pool.get().expect("Failed to get DB connection for migrations");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run database migrations");
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// Uploaded bills are written to `upload_dir` and served back statically
/// under `/uploads`. The caller is responsible for `.await`-ing (or
/// `tokio::spawn`-ing) the returned server.
pub fn build_server(
    pool: DbPool,
    host: &str,
    port: u16,
    upload_dir: &str,
) -> std::io::Result<actix_web::dev::Server> {
    let store = BillStore::new(upload_dir);
    let upload_dir = upload_dir.to_string();
    let openapi = ApiDoc::openapi();

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(store.clone()))
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .service(
                web::scope("/api")
                    .route("/health", web::get().to(handlers::purchase::health))
                    .route("/purchase", web::post().to(handlers::purchase::create_purchase))
                    .route("/purchase", web::get().to(handlers::purchase::list_purchases)),
            )
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
            .service(actix_files::Files::new("/uploads", upload_dir.clone()))
    })
    .bind((host.to_string(), port))?
    .run())
}
